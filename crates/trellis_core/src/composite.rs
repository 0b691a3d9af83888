//! Lifecycle behavior for controls
//!
//! Composite controls build their children inside [`ControlBehavior::init`],
//! which runs exactly once before the control is first mounted. `init` must
//! not rely on a parent being present: it may run eagerly through
//! `ControlTree::initialize` while the control is still detached.
//!
//! Hooks return `anyhow::Result`. Errors and panics are reported to the
//! diagnostics collaborator and never escape the control that raised them.

use crate::context::ControlContext;

/// Capability interface for lifecycle hooks
///
/// All hooks default to no-ops, so a behavior only implements what it needs.
///
/// # Example
///
/// ```ignore
/// struct TaskRow;
///
/// impl ControlBehavior for TaskRow {
///     fn init(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
///         let label = cx.prop_str("label").unwrap_or_default();
///         cx.create_child(checkbox(&label, false))?;
///         cx.create_child(button("delete"))?;
///         Ok(())
///     }
/// }
/// ```
pub trait ControlBehavior {
    /// Build children from the control's declared properties
    fn init(&mut self, _cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The control became reachable from the active root
    fn did_mount(&mut self, _cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The control is leaving the live tree; its tasks are cancelled right after
    fn will_unmount(&mut self, _cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

type Hook = Box<dyn FnMut(&mut ControlContext<'_>) -> anyhow::Result<()>>;

/// A [`ControlBehavior`] assembled from closures
///
/// ```ignore
/// let behavior = Hooks::new()
///     .init(|cx| { cx.create_child(text("hi"))?; Ok(()) })
///     .did_mount(|cx| { cx.spawn(tick_loop)?; Ok(()) });
/// ```
#[derive(Default)]
pub struct Hooks {
    init: Option<Hook>,
    did_mount: Option<Hook>,
    will_unmount: Option<Hook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut ControlContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.init = Some(Box::new(f));
        self
    }

    pub fn did_mount<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut ControlContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.did_mount = Some(Box::new(f));
        self
    }

    pub fn will_unmount<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut ControlContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.will_unmount = Some(Box::new(f));
        self
    }
}

impl ControlBehavior for Hooks {
    fn init(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        match self.init.as_mut() {
            Some(f) => f(cx),
            None => Ok(()),
        }
    }

    fn did_mount(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        match self.did_mount.as_mut() {
            Some(f) => f(cx),
            None => Ok(()),
        }
    }

    fn will_unmount(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        match self.will_unmount.as_mut() {
            Some(f) => f(cx),
            None => Ok(()),
        }
    }
}
