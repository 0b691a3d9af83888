//! Cooperative clock, cancellation tokens and suspension points
//!
//! Time inside the runtime is a logical tick counter advanced by the host
//! (`Runtime::advance`). Every suspension point a task awaits here also
//! watches the task's [`CancellationToken`], so a cancelled task always gets
//! back control at its next check within one poll.

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;

/// Shared logical clock counting ticks
#[derive(Clone, Debug, Default)]
pub struct TickClock {
    now: Rc<Cell<u64>>,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Advance by one tick, returning the new tick
    pub fn tick(&self) -> u64 {
        let next = self.now.get() + 1;
        self.now.set(next);
        next
    }
}

/// Running flag shared between a task and the scheduler
///
/// Cheap to clone; all clones observe the same flag.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    running: Rc<Cell<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            running: Rc::new(Cell::new(true)),
        }
    }

    /// Clear the running flag
    pub fn cancel(&self) {
        self.running.set(false);
    }

    pub fn is_cancelled(&self) -> bool {
        !self.running.get()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

/// Future that completes at a tick deadline, or as soon as the token is cancelled
#[derive(Debug)]
pub struct Sleep {
    deadline: u64,
    clock: TickClock,
    token: CancellationToken,
}

impl Sleep {
    pub(crate) fn new(clock: TickClock, ticks: u64, token: CancellationToken) -> Self {
        Self {
            deadline: clock.now().saturating_add(ticks),
            clock,
            token,
        }
    }

    pub fn deadline(&self) -> u64 {
        self.deadline
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        // The scheduler re-polls every live task after each tick, so no waker
        // registration is needed.
        if self.token.is_cancelled() || self.clock.now() >= self.deadline {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Future that yields once to the scheduler
#[derive(Debug, Default)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}

pin_project! {
    /// A future that resolves to `None` once its task is cancelled
    pub struct Guarded<F> {
        #[pin]
        future: F,
        token: CancellationToken,
    }
}

impl<F: Future> Guarded<F> {
    pub fn new(future: F, token: CancellationToken) -> Self {
        Self { future, token }
    }
}

impl<F: Future> Future for Guarded<F> {
    type Output = Option<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if this.token.is_cancelled() {
            return Poll::Ready(None);
        }

        match this.future.poll(cx) {
            Poll::Ready(output) => Poll::Ready(Some(output)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll_once<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        Pin::new(future).poll(&mut cx)
    }

    #[test]
    fn test_sleep_completes_at_deadline() {
        let clock = TickClock::new();
        let mut sleep = Sleep::new(clock.clone(), 2, CancellationToken::new());

        assert!(poll_once(&mut sleep).is_pending());
        clock.tick();
        assert!(poll_once(&mut sleep).is_pending());
        clock.tick();
        assert!(poll_once(&mut sleep).is_ready());
    }

    #[test]
    fn test_sleep_zero_is_immediate() {
        let mut sleep = Sleep::new(TickClock::new(), 0, CancellationToken::new());
        assert!(poll_once(&mut sleep).is_ready());
    }

    #[test]
    fn test_sleep_resolves_on_cancel() {
        let token = CancellationToken::new();
        let mut sleep = Sleep::new(TickClock::new(), 1_000, token.clone());

        assert!(poll_once(&mut sleep).is_pending());
        token.cancel();
        assert!(poll_once(&mut sleep).is_ready());
    }

    #[test]
    fn test_yield_now_pends_once() {
        let mut yield_now = YieldNow::default();
        assert!(poll_once(&mut yield_now).is_pending());
        assert!(poll_once(&mut yield_now).is_ready());
    }

    #[test]
    fn test_guarded_returns_none_after_cancel() {
        let token = CancellationToken::new();
        let mut guarded = Box::pin(Guarded::new(futures::future::pending::<u32>(), token.clone()));

        assert!(poll_once(&mut guarded).is_pending());
        token.cancel();
        assert!(matches!(poll_once(&mut guarded), Poll::Ready(None)));
    }

    #[test]
    fn test_guarded_passes_output_through() {
        let mut guarded = Box::pin(Guarded::new(
            futures::future::ready(7u32),
            CancellationToken::new(),
        ));
        assert!(matches!(poll_once(&mut guarded), Poll::Ready(Some(7))));
    }

    #[test]
    fn test_token_clones_share_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(clone.is_running());

        token.cancel();
        assert!(clone.is_cancelled());
    }
}
