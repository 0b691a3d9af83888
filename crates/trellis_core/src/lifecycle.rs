//! Lifecycle state machine
//!
//! ```text
//! Created ──mount──▶ Mounted ──remove──▶ Unmounting ──tasks drained──▶ Disposed
//! ```
//!
//! - **Created → Mounted** when the control and all of its ancestors become
//!   reachable from the active root. `init` runs first (once), then the state
//!   flips to Mounted, then `did_mount` runs. Traversal is pre-order: a parent
//!   mounts before its children, including children synthesized by `init`.
//! - When a subtree is attached under a mounted parent, `init` runs across
//!   the whole subtree before the link to the parent is written, so the
//!   subtree's own root sees no parent in `init`. A root mount (or a subtree
//!   built under a detached parent) runs `init` during the mount walk.
//! - **Mounted → Unmounting** when the control or an ancestor is detached.
//!   `will_unmount` runs, then all of the control's tasks are cancelled. If
//!   the control is detached from inside one of its own hooks, `will_unmount`
//!   runs as soon as that hook returns.
//! - **Unmounting → Disposed** once every task of the control has returned.
//!   Controls without live tasks are disposed immediately.
//!
//! Hook failures (errors and panics) are contained per control: they are
//! reported to diagnostics and the transition completes anyway.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::composite::ControlBehavior;
use crate::context::ControlContext;
use crate::control::ControlId;
use crate::tree::ControlTree;

/// Lifecycle state of a control
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Created,
    Mounted,
    Unmounting,
    Disposed,
}

impl LifecycleState {
    pub fn is_mounted(&self) -> bool {
        matches!(self, LifecycleState::Mounted)
    }

    /// Unmounting or Disposed
    pub fn is_detached(&self) -> bool {
        matches!(self, LifecycleState::Unmounting | LifecycleState::Disposed)
    }
}

/// Where a reported failure happened
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Init,
    DidMount,
    WillUnmount,
    Handler,
    Task,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::DidMount => "did_mount",
            Phase::WillUnmount => "will_unmount",
            Phase::Handler => "handler",
            Phase::Task => "task",
        };
        f.write_str(name)
    }
}

/// Turn a caught panic payload into an error
pub(crate) fn panic_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    anyhow::anyhow!("panicked: {message}")
}

impl ControlTree {
    /// Run `init` now if it has not run yet
    ///
    /// Composite children are normally synthesized at first mount; calling
    /// this builds them while the control is still detached.
    pub fn initialize(&mut self, id: ControlId) {
        let needs_init = self
            .nodes
            .get(id)
            .is_some_and(|n| !n.initialized && n.state == LifecycleState::Created);
        if !needs_init {
            return;
        }

        if let Some(node) = self.nodes.get_mut(id) {
            node.initialized = true;
        }
        self.run_hook(id, Phase::Init);
    }

    /// Run `init` across a detached subtree, pre-order
    pub(crate) fn initialize_subtree(&mut self, id: ControlId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            self.initialize(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
    }

    /// Mount `id` and its subtree, pre-order
    pub(crate) fn mount_subtree(&mut self, id: ControlId) {
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if self.state(current) != Some(LifecycleState::Created) {
                continue;
            }

            self.initialize(current);

            // init may have detached or disposed the control
            if self.state(current) != Some(LifecycleState::Created) {
                continue;
            }

            if let Some(node) = self.nodes.get_mut(current) {
                node.state = LifecycleState::Mounted;
            }
            self.coordinator.note_mounted(current);
            tracing::debug!(control = %current, kind = self.kind_name(current).unwrap_or(""), "mounted");

            self.run_hook(current, Phase::DidMount);

            if self.state(current) == Some(LifecycleState::Mounted) {
                stack.extend(self.children(current).iter().rev().copied());
            }
        }
    }

    /// Unmount `id` and its subtree, pre-order
    ///
    /// Controls whose tasks all returned are disposed before this returns;
    /// the rest stay Unmounting until the runtime drains their tasks.
    pub(crate) fn unmount_subtree(&mut self, id: ControlId) {
        let mut stack = vec![id];
        let mut unmounted = Vec::new();

        while let Some(current) = stack.pop() {
            if self.state(current) != Some(LifecycleState::Mounted) {
                continue;
            }

            if let Some(node) = self.nodes.get_mut(current) {
                node.state = LifecycleState::Unmounting;
            }
            tracing::debug!(control = %current, "unmounting");

            self.run_hook(current, Phase::WillUnmount);

            let cancelled = self.tasks.cancel_all(current);
            if cancelled > 0 {
                tracing::debug!(control = %current, tasks = cancelled, "tasks cancelled");
            }

            unmounted.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }

        for control in unmounted {
            self.try_dispose(control);
        }
    }

    /// Dispose an Unmounting control whose tasks have all returned
    pub(crate) fn try_dispose(&mut self, id: ControlId) -> bool {
        let settled = self
            .nodes
            .get(id)
            .is_some_and(|n| n.state == LifecycleState::Unmounting && !n.hook_running);
        if !settled || self.tasks.live_count(id) > 0 {
            return false;
        }

        if let Some(node) = self.nodes.get_mut(id) {
            node.state = LifecycleState::Disposed;
            node.handlers.clear();
            node.behavior = None;
        }
        self.coordinator.forget(id);
        tracing::debug!(control = %id, "disposed");
        true
    }

    /// Dispose every Unmounting control that has no live tasks left
    pub fn settle_unmounting(&mut self) -> usize {
        let pending: Vec<ControlId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.state == LifecycleState::Unmounting)
            .map(|(id, _)| id)
            .collect();

        pending
            .into_iter()
            .filter(|id| self.try_dispose(*id))
            .count()
    }

    /// Controls still waiting for their tasks to return
    pub fn unmounting(&self) -> Vec<ControlId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.state == LifecycleState::Unmounting)
            .map(|(id, _)| id)
            .collect()
    }

    /// Invoke one lifecycle hook inside the control's failure domain
    ///
    /// A hook requested while another hook of the same control holds the
    /// behavior is queued and runs once that hook returns.
    fn run_hook(&mut self, id: ControlId, phase: Phase) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let Some(mut behavior) = node.behavior.take() else {
            if node.hook_running {
                node.deferred_hooks.push(phase);
            }
            return;
        };
        node.hook_running = true;

        self.invoke_hook(id, phase, behavior.as_mut());

        let mut replayed = false;
        loop {
            let next = match self.nodes.get_mut(id) {
                Some(node) if !node.deferred_hooks.is_empty() => node.deferred_hooks.remove(0),
                _ => break,
            };
            replayed = true;
            self.invoke_hook(id, next, behavior.as_mut());
        }

        let settle = match self.nodes.get_mut(id) {
            Some(node) => {
                node.hook_running = false;
                if node.state != LifecycleState::Disposed {
                    node.behavior = Some(behavior);
                }
                replayed && node.state == LifecycleState::Unmounting
            }
            None => false,
        };
        if settle {
            self.try_dispose(id);
        }
    }

    fn invoke_hook(&mut self, id: ControlId, phase: Phase, behavior: &mut dyn ControlBehavior) {
        let outcome = {
            let mut cx = ControlContext::new(self, id);
            catch_unwind(AssertUnwindSafe(|| match phase {
                Phase::Init => behavior.init(&mut cx),
                Phase::DidMount => behavior.did_mount(&mut cx),
                Phase::WillUnmount => behavior.will_unmount(&mut cx),
                Phase::Handler | Phase::Task => Ok(()),
            }))
        };

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => panic_error(payload),
        };
        self.report(id, phase, &error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::Hooks;
    use crate::control::ControlSpec;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::error::{InvalidTree, RuntimeError};
    use crate::render::RecordingRenderer;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging(name: &str, log: &Log) -> ControlSpec {
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        let (n1, n2, n3) = (name.to_string(), name.to_string(), name.to_string());
        ControlSpec::new(name).behavior(
            Hooks::new()
                .init(move |_| {
                    a.borrow_mut().push(format!("init:{n1}"));
                    Ok(())
                })
                .did_mount(move |_| {
                    b.borrow_mut().push(format!("did_mount:{n2}"));
                    Ok(())
                })
                .will_unmount(move |_| {
                    c.borrow_mut().push(format!("will_unmount:{n3}"));
                    Ok(())
                }),
        )
    }

    fn tree() -> (ControlTree, CollectingDiagnostics) {
        let diagnostics = CollectingDiagnostics::new();
        let tree = ControlTree::with_config(
            Default::default(),
            RecordingRenderer::new(),
            diagnostics.clone(),
        );
        (tree, diagnostics)
    }

    #[test]
    fn test_mount_order_is_pre_order_and_init_first() {
        let log: Log = Rc::default();
        let (mut tree, _) = tree();

        let root = tree
            .mount_root(logging("root", &log).child(logging("a", &log)).child(logging("b", &log)))
            .unwrap();

        assert_eq!(tree.state(root), Some(LifecycleState::Mounted));
        assert_eq!(
            *log.borrow(),
            vec![
                "init:root",
                "did_mount:root",
                "init:a",
                "did_mount:a",
                "init:b",
                "did_mount:b"
            ]
        );
    }

    #[test]
    fn test_init_runs_once_even_when_initialized_eagerly() {
        let log: Log = Rc::default();
        let (mut tree, _) = tree();
        let root = tree.mount_root(ControlSpec::new("root")).unwrap();

        let child = tree.create(logging("child", &log));
        tree.initialize(child);
        tree.initialize(child);
        tree.add_child(root, child).unwrap();

        assert_eq!(*log.borrow(), vec!["init:child", "did_mount:child"]);
    }

    #[test]
    fn test_unmount_runs_will_unmount_and_disposes() {
        let log: Log = Rc::default();
        let (mut tree, _) = tree();
        let root = tree.mount_root(ControlSpec::new("root")).unwrap();
        let child = tree.create(logging("child", &log).child(logging("leaf", &log)));
        tree.add_child(root, child).unwrap();
        let leaf = tree.children(child)[0];
        log.borrow_mut().clear();

        tree.remove_child(root, child).unwrap();

        assert_eq!(*log.borrow(), vec!["will_unmount:child", "will_unmount:leaf"]);
        assert_eq!(tree.state(child), Some(LifecycleState::Disposed));
        assert_eq!(tree.state(leaf), Some(LifecycleState::Disposed));
    }

    #[test]
    fn test_hook_failure_is_contained() {
        let log: Log = Rc::default();
        let (mut tree, diagnostics) = tree();

        let failing = ControlSpec::new("failing").behavior(
            Hooks::new()
                .did_mount(|_| anyhow::bail!("boom"))
                .will_unmount(|_| panic!("unmount panic")),
        );

        let root = tree
            .mount_root(
                ControlSpec::new("root")
                    .child(failing)
                    .child(logging("sibling", &log)),
            )
            .unwrap();

        let children = tree.children(root).to_vec();
        assert_eq!(tree.state(children[0]), Some(LifecycleState::Mounted));
        assert_eq!(tree.state(children[1]), Some(LifecycleState::Mounted));
        assert!(log.borrow().contains(&"did_mount:sibling".to_string()));

        tree.clear_children(root).unwrap();
        assert_eq!(tree.state(children[0]), Some(LifecycleState::Disposed));
        assert_eq!(tree.state(children[1]), Some(LifecycleState::Disposed));
        assert!(log.borrow().contains(&"will_unmount:sibling".to_string()));

        let reports = diagnostics.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].phase, Phase::DidMount);
        assert!(reports[0].message.contains("boom"));
        assert_eq!(reports[1].phase, Phase::WillUnmount);
        assert!(reports[1].message.contains("unmount panic"));
    }

    #[test]
    fn test_init_failure_still_mounts() {
        let (mut tree, diagnostics) = tree();
        let root = tree
            .mount_root(
                ControlSpec::new("root")
                    .behavior(Hooks::new().init(|_| Err(anyhow::anyhow!("bad props")))),
            )
            .unwrap();

        assert_eq!(tree.state(root), Some(LifecycleState::Mounted));
        assert_eq!(diagnostics.reports()[0].phase, Phase::Init);
    }

    #[test]
    fn test_disposed_control_is_never_remounted() {
        let (mut tree, _) = tree();
        let root = tree.mount_root(ControlSpec::new("root")).unwrap();
        let child = tree.create(ControlSpec::new("child"));

        tree.add_child(root, child).unwrap();
        tree.remove_child(root, child).unwrap();
        assert_eq!(tree.state(child), Some(LifecycleState::Disposed));

        let err = tree.add_child(root, child).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::InvalidTree(InvalidTree::Detached {
                control: child,
                state: LifecycleState::Disposed
            })
        );
        assert_eq!(tree.state(child), Some(LifecycleState::Disposed));
        assert_eq!(tree.parent(child), None);
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn test_init_runs_before_child_is_linked() {
        let log: Log = Rc::default();
        let (mut tree, _) = tree();
        let root = tree.mount_root(ControlSpec::new("root")).unwrap();

        let (a, b) = (log.clone(), log.clone());
        let child = tree.create(
            ControlSpec::new("child")
                .behavior(
                    Hooks::new()
                        .init(move |cx| {
                            a.borrow_mut().push(format!("init parent={:?}", cx.parent()));
                            Ok(())
                        })
                        .did_mount(move |cx| {
                            b.borrow_mut().push(format!("did_mount parent={:?}", cx.parent()));
                            Ok(())
                        }),
                )
                .child(logging("leaf", &log)),
        );
        tree.add_child(root, child).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "init parent=None".to_string(),
                "init:leaf".to_string(),
                format!("did_mount parent={:?}", Some(root)),
                "did_mount:leaf".to_string(),
            ]
        );
    }

    #[test]
    fn test_self_removal_in_did_mount_runs_will_unmount() {
        let log: Log = Rc::default();
        let (mut tree, diagnostics) = tree();
        let root = tree.mount_root(ControlSpec::new("root")).unwrap();

        let (a, b) = (log.clone(), log.clone());
        let child = tree.create(
            ControlSpec::new("transient").behavior(
                Hooks::new()
                    .did_mount(move |cx| {
                        a.borrow_mut().push("did_mount".to_string());
                        cx.remove_self()?;
                        Ok(())
                    })
                    .will_unmount(move |_| {
                        b.borrow_mut().push("will_unmount".to_string());
                        Ok(())
                    }),
            ),
        );
        tree.add_child(root, child).unwrap();

        assert_eq!(*log.borrow(), vec!["did_mount", "will_unmount"]);
        assert_eq!(tree.state(child), Some(LifecycleState::Disposed));
        assert!(tree.children(root).is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_panic_message_extraction() {
        let err = panic_error(Box::new("static"));
        assert_eq!(err.to_string(), "panicked: static");
        let err = panic_error(Box::new(String::from("owned")));
        assert_eq!(err.to_string(), "panicked: owned");
        let err = panic_error(Box::new(5u8));
        assert!(err.to_string().contains("non-string"));
    }
}
