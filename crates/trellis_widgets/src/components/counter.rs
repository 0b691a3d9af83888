//! Counter composite
//!
//! An isolated composite holding an integer. The integer lives with the
//! control's behavior; what renders is the `value` property, the integer as
//! text. Pressing the synthesized `-`/`+` buttons, or sending `decrement` /
//! `increment` to the counter itself, adjusts the integer and updates the
//! counter only.
//!
//! # Example
//!
//! ```ignore
//! let id = runtime.mount_root(counter(0))?;
//! runtime.dispatch_event(id, "decrement", PropValue::Null)?;
//! // one patch: { id: { "value": "-1" } }
//! ```

use std::cell::Cell;
use std::rc::Rc;

use trellis_core::{ControlBehavior, ControlContext, ControlId, ControlSpec, PropertySchema};

use super::button::button;

pub const KIND: &str = "counter";

/// Behavior of a counter; owns the integer
pub struct Counter {
    count: Rc<Cell<i64>>,
}

impl Counter {
    pub fn new(initial: i64) -> Self {
        Self {
            count: Rc::new(Cell::new(initial)),
        }
    }

    pub fn value(&self) -> i64 {
        self.count.get()
    }
}

impl ControlBehavior for Counter {
    fn init(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        let counter = cx.id();

        let count = self.count.clone();
        cx.create_child(button("-").on("click", move |cx, _| {
            step(cx, counter, &count, -1)
        }))?;

        let count = self.count.clone();
        cx.create_child(button("+").on("click", move |cx, _| {
            step(cx, counter, &count, 1)
        }))?;

        Ok(())
    }
}

/// Apply `delta` and push the counter's new value
fn step(
    cx: &mut ControlContext<'_>,
    counter: ControlId,
    count: &Cell<i64>,
    delta: i64,
) -> anyhow::Result<()> {
    count.set(count.get() + delta);
    cx.set_on(counter, "value", count.get().to_string())?;
    cx.update_control(counter);
    tracing::debug!(counter = %counter, value = count.get(), "counter stepped");
    Ok(())
}

pub fn counter(initial: i64) -> ControlSpec {
    let behavior = Counter::new(initial);
    let decrement = behavior.count.clone();
    let increment = behavior.count.clone();

    ControlSpec::composite(KIND, behavior)
        .isolated(true)
        .schema(PropertySchema::new().prop("value", "0"))
        .prop("value", initial.to_string())
        .on("decrement", move |cx, _| {
            let id = cx.id();
            step(cx, id, &decrement, -1)
        })
        .on("increment", move |cx, _| {
            let id = cx.id();
            step(cx, id, &increment, 1)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{PropValue, RecordingRenderer, Runtime};

    #[test]
    fn test_buttons_are_synthesized_once() {
        let runtime = Runtime::new(RecordingRenderer::new());
        let id = runtime.mount_root(counter(5)).unwrap();

        let labels: Vec<String> = runtime.inspect(|tree| {
            tree.children(id)
                .iter()
                .filter_map(|c| tree.prop(*c, "label").map(|v| v.to_string()))
                .collect()
        });
        assert_eq!(labels, vec!["-", "+"]);
        assert_eq!(
            runtime.inspect(|tree| tree.prop(id, "value").cloned()),
            Some(PropValue::from("5"))
        );
    }

    #[test]
    fn test_button_click_updates_counter_value() {
        let recorder = RecordingRenderer::new();
        let runtime = Runtime::new(recorder.clone());
        let id = runtime.mount_root(counter(0)).unwrap();
        let plus = runtime.inspect(|tree| tree.children(id)[1]);
        recorder.clear();

        runtime.dispatch_event(plus, "click", PropValue::Null).unwrap();
        runtime.dispatch_event(plus, "click", PropValue::Null).unwrap();

        let patches = recorder.take();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[1].changes[&id]["value"], PropValue::from("2"));
        assert_eq!(patches[1].changes.len(), 1);
    }
}
