//! Trellis Runtime
//!
//! The host that owns the control tree, feeds it events and clock ticks, and
//! polls the cooperative tasks of its controls.
//!
//! All work happens on one thread. Every entry point (`dispatch_event`,
//! `advance`, `with_tree`, ...) finishes by draining tasks until none of
//! them can make further progress, then disposes unmounting controls whose
//! tasks have all returned.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::config::RuntimeConfig;
use crate::control::{ControlId, ControlSpec};
use crate::coordinator::CoordinatorStats;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::Result;
use crate::lifecycle::{panic_error, Phase};
use crate::render::Renderer;
use crate::task::{TaskId, TaskStats};
use crate::timer::TickClock;
use crate::tree::{ControlTree, TreeStats};
use crate::value::PropValue;

/// The Trellis runtime - owns the control tree and drives its tasks
///
/// Disposed controls stay in the arena, inspectable by id, until
/// [`ControlTree::purge_disposed`] runs. Long-lived hosts that keep adding
/// and removing controls either call it themselves or enable
/// `purge_disposed` in [`RuntimeConfig`] to purge after every drain.
pub struct Runtime {
    tree: Rc<RefCell<ControlTree>>,
}

impl Runtime {
    pub fn new(renderer: impl Renderer + 'static) -> Self {
        Self::with_config(RuntimeConfig::default(), renderer, TracingDiagnostics)
    }

    pub fn with_config(
        config: RuntimeConfig,
        renderer: impl Renderer + 'static,
        diagnostics: impl Diagnostics + 'static,
    ) -> Self {
        let tree = Rc::new_cyclic(|handle| {
            let mut tree = ControlTree::with_config(config, renderer, diagnostics);
            tree.handle = handle.clone();
            RefCell::new(tree)
        });
        Self { tree }
    }

    /// Create and mount the root control
    pub fn mount_root(&self, spec: ControlSpec) -> Result<ControlId> {
        let root = self.tree.borrow_mut().mount_root(spec)?;
        self.run_until_stalled();
        Ok(root)
    }

    /// Unmount the whole tree, cancelling every task
    pub fn unmount_root(&self) {
        self.tree.borrow_mut().unmount_root();
        self.run_until_stalled();
    }

    /// Mutate the tree, then drain tasks
    pub fn with_tree<R>(&self, f: impl FnOnce(&mut ControlTree) -> R) -> R {
        let result = f(&mut self.tree.borrow_mut());
        self.run_until_stalled();
        result
    }

    /// Read the tree without driving tasks
    pub fn inspect<R>(&self, f: impl FnOnce(&ControlTree) -> R) -> R {
        f(&self.tree.borrow())
    }

    /// Deliver an event from the rendering surface
    pub fn dispatch_event(
        &self,
        control: ControlId,
        event: &str,
        payload: impl Into<PropValue>,
    ) -> Result<()> {
        let payload = payload.into();
        let result = self.tree.borrow_mut().dispatch_event(control, event, &payload);
        self.run_until_stalled();
        result
    }

    /// Advance the cooperative clock tick by tick, draining tasks after each
    pub fn advance(&self, ticks: u64) {
        let clock = self.clock();
        for _ in 0..ticks {
            let now = clock.tick();
            tracing::trace!(tick = now, "clock advanced");
            self.run_until_stalled();
        }
    }

    pub fn clock(&self) -> TickClock {
        self.tree.borrow().clock.clone()
    }

    pub fn now(&self) -> u64 {
        self.tree.borrow().clock.now()
    }

    /// Poll tasks until a pass neither finishes nor spawns any
    ///
    /// Returns the number of tasks that finished.
    pub fn run_until_stalled(&self) -> usize {
        let (max_passes, stall_polls, purge) = {
            let tree = self.tree.borrow();
            let config = &tree.config;
            (config.max_drain_passes, config.cancel_stall_polls, config.purge_disposed)
        };

        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut finished = 0;

        for _ in 0..max_passes {
            let (ids, spawned_before) = {
                let tree = self.tree.borrow();
                (tree.tasks.task_ids(), tree.tasks.spawned_total())
            };
            if ids.is_empty() {
                break;
            }

            let mut progressed = false;
            for id in ids {
                if self.poll_task(id, &mut cx, stall_polls) {
                    finished += 1;
                    progressed = true;
                }
            }

            if !progressed && self.tree.borrow().tasks.spawned_total() == spawned_before {
                break;
            }
        }

        let mut tree = self.tree.borrow_mut();
        let disposed = tree.settle_unmounting();
        if disposed > 0 {
            tracing::debug!(disposed, "settled unmounting controls");
        }
        if purge {
            let purged = tree.purge_disposed();
            if purged > 0 {
                tracing::trace!(purged, "disposed controls purged");
            }
        }
        finished
    }

    /// Poll one task with the tree unborrowed; true if it finished
    fn poll_task(&self, id: TaskId, cx: &mut Context<'_>, stall_polls: u32) -> bool {
        let Some(mut future) = self.tree.borrow_mut().tasks.take_future(id) else {
            return false;
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(cx)));

        let mut tree = self.tree.borrow_mut();
        let error = match outcome {
            Ok(Poll::Pending) => {
                tree.tasks.restore(id, future);
                if let Some(owner) = tree.tasks.take_stall(id, stall_polls) {
                    let error = anyhow::anyhow!(
                        "task still running {stall_polls} polls after cancellation"
                    );
                    tree.report(owner, Phase::Task, &error);
                }
                return false;
            }
            Ok(Poll::Ready(Ok(()))) => None,
            Ok(Poll::Ready(Err(err))) => Some(err),
            Err(panic) => Some(panic_error(panic)),
        };

        if let Some(owner) = tree.tasks.finish(id) {
            tracing::debug!(owner = %owner, task = ?id, "task finished");
            if let Some(error) = error {
                tree.report(owner, Phase::Task, &error);
            }
            tree.try_dispose(owner);
        }
        true
    }

    /// Get statistics about the runtime
    pub fn stats(&self) -> RuntimeStats {
        let tree = self.tree.borrow();
        RuntimeStats {
            tree: tree.stats(),
            tasks: tree.tasks.stats(),
            patches: tree.coordinator.stats(),
            now: tree.clock.now(),
        }
    }
}

/// Statistics about the runtime
#[derive(Debug, Clone)]
pub struct RuntimeStats {
    pub tree: TreeStats,
    pub tasks: TaskStats,
    pub patches: CoordinatorStats,
    pub now: u64,
}
