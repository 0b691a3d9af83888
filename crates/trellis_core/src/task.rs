//! Cooperative tasks bound to a control's mounted lifetime
//!
//! A task is a future owned by exactly one control. It can only be spawned
//! while its owner is mounted, and every task of a control is cancelled when
//! the control starts unmounting. Cancellation is flag based: the task sees
//! its [`CancellationToken`] cleared at the next suspension point (sleeps
//! resolve early once cancelled) and is expected to return. The owner is not
//! disposed until all of its tasks have returned.
//!
//! Tasks are stored here and polled by [`Runtime`](crate::runtime::Runtime)
//! on the single runtime thread. While a task is being polled its future is
//! taken out of the scheduler, so the task body can borrow the tree through
//! [`TaskContext::with_control`].

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::context::ControlContext;
use crate::control::ControlId;
use crate::error::{Result, RuntimeError};
use crate::lifecycle::LifecycleState;
use crate::timer::{CancellationToken, Guarded, Sleep, TickClock, YieldNow};
use crate::tree::ControlTree;

new_key_type! {
    /// Handle to a spawned task
    pub struct TaskId;
}

pub(crate) type TaskFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;

/// Everything a task body can reach
pub struct TaskContext {
    owner: ControlId,
    token: CancellationToken,
    clock: TickClock,
    tree: Weak<RefCell<ControlTree>>,
}

impl TaskContext {
    pub fn owner(&self) -> ControlId {
        self.owner
    }

    /// False once the owner started unmounting
    pub fn is_running(&self) -> bool {
        self.token.is_running()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Current tick of the cooperative clock
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Suspend for `ticks`; resolves early when cancelled
    pub fn sleep(&self, ticks: u64) -> Sleep {
        Sleep::new(self.clock.clone(), ticks, self.token.clone())
    }

    /// Suspend until the next scheduler pass
    pub fn yield_now(&self) -> YieldNow {
        YieldNow::default()
    }

    /// Await `future`, giving up with `None` when cancelled
    pub fn guard<F: Future>(&self, future: F) -> Guarded<F> {
        Guarded::new(future, self.token.clone())
    }

    /// Run a synchronous segment against the owning control
    ///
    /// Returns `None` when the task is cancelled, the runtime is gone, or the
    /// tree is busy (a task is never polled while the tree is borrowed, so
    /// the last case means the task was polled from inside a handler).
    pub fn with_control<R>(&self, f: impl FnOnce(&mut ControlContext<'_>) -> R) -> Option<R> {
        if self.token.is_cancelled() {
            return None;
        }

        let shared = self.tree.upgrade()?;
        let Ok(mut tree) = shared.try_borrow_mut() else {
            tracing::warn!(owner = %self.owner, "task touched the tree while it was borrowed");
            return None;
        };

        if !tree.contains(self.owner) {
            return None;
        }

        let mut cx = ControlContext::new(&mut tree, self.owner);
        Some(f(&mut cx))
    }
}

/// Caller-side handle to a spawned task
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: TaskId,
    owner: ControlId,
    token: CancellationToken,
    finished: Rc<Cell<bool>>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn owner(&self) -> ControlId {
        self.owner
    }

    /// Request cancellation of this task only
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.token.is_running()
    }

    /// True once the task body returned (or panicked)
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }
}

struct TaskEntry {
    owner: ControlId,
    token: CancellationToken,
    /// `None` while the task is being polled
    future: Option<TaskFuture>,
    finished: Rc<Cell<bool>>,
    polls_after_cancel: u32,
    stall_reported: bool,
}

/// Statistics about the task scheduler
#[derive(Debug, Clone, Default)]
pub struct TaskStats {
    pub live: usize,
    pub spawned: u64,
    pub completed: u64,
    pub cancelled: u64,
}

/// Registry of live tasks keyed by owner
#[derive(Default)]
pub struct TaskScheduler {
    tasks: SlotMap<TaskId, TaskEntry>,
    by_owner: FxHashMap<ControlId, SmallVec<[TaskId; 2]>>,
    spawned: u64,
    completed: u64,
    cancelled: u64,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(
        &mut self,
        owner: ControlId,
        token: CancellationToken,
        future: TaskFuture,
    ) -> TaskHandle {
        let finished = Rc::new(Cell::new(false));
        let id = self.tasks.insert(TaskEntry {
            owner,
            token: token.clone(),
            future: Some(future),
            finished: finished.clone(),
            polls_after_cancel: 0,
            stall_reported: false,
        });
        self.by_owner.entry(owner).or_default().push(id);
        self.spawned += 1;

        TaskHandle {
            id,
            owner,
            token,
            finished,
        }
    }

    /// Clear the running flag of every task owned by `owner`
    ///
    /// Returns how many tasks were signalled.
    pub fn cancel_all(&mut self, owner: ControlId) -> usize {
        let Some(ids) = self.by_owner.get(&owner) else {
            return 0;
        };

        let mut signalled = 0;
        for id in ids {
            if let Some(entry) = self.tasks.get(*id) {
                if entry.token.is_running() {
                    entry.token.cancel();
                    signalled += 1;
                }
            }
        }
        self.cancelled += signalled as u64;
        signalled
    }

    /// Tasks owned by `owner` that have not returned yet
    pub fn live_count(&self, owner: ControlId) -> usize {
        self.by_owner.get(&owner).map_or(0, |ids| ids.len())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats {
            live: self.tasks.len(),
            spawned: self.spawned,
            completed: self.completed,
            cancelled: self.cancelled,
        }
    }

    pub(crate) fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.keys().collect()
    }

    /// Take a task's future out for polling
    pub(crate) fn take_future(&mut self, id: TaskId) -> Option<TaskFuture> {
        let entry = self.tasks.get_mut(id)?;
        if entry.token.is_cancelled() {
            entry.polls_after_cancel = entry.polls_after_cancel.saturating_add(1);
        }
        entry.future.take()
    }

    pub(crate) fn restore(&mut self, id: TaskId, future: TaskFuture) {
        if let Some(entry) = self.tasks.get_mut(id) {
            entry.future = Some(future);
        }
    }

    /// Remove a task that returned; yields its owner
    pub(crate) fn finish(&mut self, id: TaskId) -> Option<ControlId> {
        let entry = self.tasks.remove(id)?;
        entry.finished.set(true);
        self.completed += 1;

        if let Some(ids) = self.by_owner.get_mut(&entry.owner) {
            ids.retain(|t| *t != id);
            if ids.is_empty() {
                self.by_owner.remove(&entry.owner);
            }
        }
        Some(entry.owner)
    }

    /// Owner of a cancelled task that outlived `threshold` polls, reported once
    pub(crate) fn take_stall(&mut self, id: TaskId, threshold: u32) -> Option<ControlId> {
        let entry = self.tasks.get_mut(id)?;
        if entry.stall_reported || entry.polls_after_cancel < threshold {
            return None;
        }
        entry.stall_reported = true;
        Some(entry.owner)
    }
}

impl ControlTree {
    /// Spawn a cooperative task owned by `owner`
    ///
    /// Fails with [`RuntimeError::NotMounted`] unless the owner is mounted.
    /// The task is first polled at the end of the current turn.
    pub fn spawn<F, Fut>(&mut self, owner: ControlId, body: F) -> Result<TaskHandle>
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let state = self.state(owner).ok_or(RuntimeError::UnknownControl(owner))?;
        if state != LifecycleState::Mounted {
            return Err(RuntimeError::NotMounted {
                control: owner,
                state,
            });
        }

        let token = CancellationToken::new();
        let cx = TaskContext {
            owner,
            token: token.clone(),
            clock: self.clock.clone(),
            tree: self.handle.clone(),
        };

        let handle = self.tasks.insert(owner, token, Box::pin(body(cx)));
        tracing::debug!(owner = %owner, task = ?handle.id(), "task spawned");
        Ok(handle)
    }

    pub fn tasks(&self) -> &TaskScheduler {
        &self.tasks
    }
}
