//! Event dispatch from the rendering surface to control handlers

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::context::ControlContext;
use crate::control::ControlId;
use crate::error::{Result, RuntimeError};
use crate::lifecycle::{panic_error, LifecycleState, Phase};
use crate::tree::ControlTree;
use crate::value::PropValue;

impl ControlTree {
    /// Invoke `control`'s handler for `event`
    ///
    /// Unknown controls are an error. Events for controls that are not
    /// mounted, or that have no handler for `event`, are dropped. A failing
    /// handler is reported to diagnostics and does not propagate.
    pub fn dispatch_event(&mut self, control: ControlId, event: &str, payload: &PropValue) -> Result<()> {
        let node = self
            .nodes
            .get(control)
            .ok_or(RuntimeError::UnknownControl(control))?;

        if node.state != LifecycleState::Mounted {
            tracing::debug!(control = %control, event, state = ?node.state, "event dropped: not mounted");
            return Ok(());
        }

        let Some(handler) = node.handlers.get(event).cloned() else {
            tracing::debug!(control = %control, event, "event dropped: no handler");
            return Ok(());
        };

        tracing::debug!(control = %control, event, "dispatching event");
        let outcome = {
            let mut cx = ControlContext::new(self, control);
            catch_unwind(AssertUnwindSafe(|| handler(&mut cx, payload)))
        };

        let error = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => err,
            Err(panic) => panic_error(panic),
        };
        self.report(control, Phase::Handler, &error);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::control::ControlSpec;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::lifecycle::Phase;
    use crate::render::RecordingRenderer;
    use crate::tree::ControlTree;
    use crate::value::PropValue;
    use crate::RuntimeError;

    fn tree() -> (ControlTree, RecordingRenderer, CollectingDiagnostics) {
        let recorder = RecordingRenderer::new();
        let diagnostics = CollectingDiagnostics::new();
        let tree = ControlTree::with_config(Default::default(), recorder.clone(), diagnostics.clone());
        (tree, recorder, diagnostics)
    }

    #[test]
    fn test_handler_mutates_and_updates() {
        let (mut tree, recorder, _) = tree();
        let root = tree
            .mount_root(ControlSpec::new("input").on("change", |cx, payload| {
                cx.set("value", payload.clone());
                cx.update();
                Ok(())
            }))
            .unwrap();
        recorder.clear();

        tree.dispatch_event(root, "change", &PropValue::from("abc")).unwrap();

        let patch = recorder.last().unwrap();
        assert_eq!(patch.changes[&root]["value"], PropValue::from("abc"));
    }

    #[test]
    fn test_missing_handler_is_ignored() {
        let (mut tree, recorder, diagnostics) = tree();
        let root = tree.mount_root(ControlSpec::new("text")).unwrap();
        recorder.clear();

        assert!(tree.dispatch_event(root, "click", &PropValue::Null).is_ok());
        assert!(recorder.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unmounted_target_is_ignored() {
        let (mut tree, _, _) = tree();
        tree.mount_root(ControlSpec::new("root")).unwrap();

        let detached = tree.create(ControlSpec::new("button").on("click", |_, _| {
            panic!("must not run");
        }));
        assert!(tree.dispatch_event(detached, "click", &PropValue::Null).is_ok());
    }

    #[test]
    fn test_unknown_control_is_an_error() {
        let (mut tree, _, _) = tree();
        let root = tree.mount_root(ControlSpec::new("root")).unwrap();
        tree.unmount_root();
        tree.purge_disposed();

        assert_eq!(
            tree.dispatch_event(root, "click", &PropValue::Null),
            Err(RuntimeError::UnknownControl(root))
        );
    }

    #[test]
    fn test_handler_failures_are_reported() {
        let (mut tree, _, diagnostics) = tree();
        let root = tree
            .mount_root(
                ControlSpec::new("button")
                    .on("fail", |_, _| Err(anyhow::anyhow!("rejected")))
                    .on("panic", |_, _| panic!("handler blew up")),
            )
            .unwrap();

        tree.dispatch_event(root, "fail", &PropValue::Null).unwrap();
        tree.dispatch_event(root, "panic", &PropValue::Null).unwrap();

        let reports = diagnostics.reports();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.phase == Phase::Handler && r.control == root));
        assert!(reports[1].message.contains("handler blew up"));
    }
}
