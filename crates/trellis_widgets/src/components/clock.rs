//! Clock composite
//!
//! An isolated text control showing the runtime tick in its own `text`
//! property. A task started in `did_mount` refreshes the text and updates the
//! clock alone; the task is cancelled when the clock unmounts and exits at
//! its next sleep.

use trellis_core::{ControlBehavior, ControlContext, ControlSpec, PropertySchema, TaskHandle};

pub const KIND: &str = "clock";

/// Behavior of a clock
pub struct Clock {
    interval: u64,
    task: Option<TaskHandle>,
}

impl Clock {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            task: None,
        }
    }
}

impl ControlBehavior for Clock {
    fn init(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        let now = cx.now();
        cx.set("text", format_tick(now));
        cx.set("size", 20);
        Ok(())
    }

    fn did_mount(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        let interval = self.interval;
        let handle = cx.spawn(move |t| async move {
            while t.is_running() {
                t.sleep(interval).await;
                t.with_control(|cx| {
                    let now = cx.now();
                    if cx.set("text", format_tick(now)) {
                        cx.update();
                    }
                });
            }
            Ok(())
        })?;
        self.task = Some(handle);
        Ok(())
    }

    fn will_unmount(&mut self, _cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        if let Some(task) = self.task.take() {
            tracing::debug!(task = ?task.id(), "clock stopping");
        }
        Ok(())
    }
}

fn format_tick(now: u64) -> String {
    format!("tick {now}")
}

/// A clock refreshing every `interval` ticks
pub fn clock(interval: u64) -> ControlSpec {
    ControlSpec::composite(KIND, Clock::new(interval))
        .isolated(true)
        .schema(
            PropertySchema::new()
                .prop("text", "")
                .prop("interval", interval as i64),
        )
}
