//! Diagnostics sink for contained failures
//!
//! Lifecycle hooks, event handlers and task bodies each run inside their
//! control's failure domain. Whatever they return as an error (or panic
//! with) ends up here instead of unwinding into the runtime.

use std::cell::RefCell;
use std::rc::Rc;

use crate::control::ControlId;
use crate::lifecycle::Phase;

/// Receiver of per-control failures
pub trait Diagnostics {
    fn report(&self, control: ControlId, phase: Phase, error: &anyhow::Error);
}

/// Logs every report with `tracing::error!`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, control: ControlId, phase: Phase, error: &anyhow::Error) {
        tracing::error!(control = %control, phase = %phase, "{error:#}");
    }
}

/// One recorded failure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub control: ControlId,
    pub phase: Phase,
    pub message: String,
}

/// Keeps every report; clones share the same list
#[derive(Clone, Debug, Default)]
pub struct CollectingDiagnostics {
    reports: Rc<RefCell<Vec<Report>>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn report(&self, control: ControlId, phase: Phase, error: &anyhow::Error) {
        tracing::debug!(control = %control, phase = %phase, "{error:#}");
        self.reports.borrow_mut().push(Report {
            control,
            phase,
            message: format!("{error:#}"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use slotmap::SlotMap;

    #[test]
    fn test_collecting_keeps_error_chain() {
        let mut ids: SlotMap<ControlId, ()> = SlotMap::with_key();
        let id = ids.insert(());

        let diagnostics = CollectingDiagnostics::new();
        let sink = diagnostics.clone();

        let err = Err::<(), _>(anyhow::anyhow!("socket closed"))
            .context("refresh failed")
            .unwrap_err();
        sink.report(id, Phase::Task, &err);

        let reports = diagnostics.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].phase, Phase::Task);
        assert_eq!(reports[0].message, "refresh failed: socket closed");
    }
}
