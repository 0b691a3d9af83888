//! Checkbox for boolean selection
//!
//! Handles `toggle` itself: the event flips `checked` (or sets it, when the
//! payload is a bool) and pushes the change.

use trellis_core::{ControlSpec, PropertySchema};

pub const KIND: &str = "checkbox";

pub fn checkbox(label: impl Into<String>, checked: bool) -> ControlSpec {
    ControlSpec::new(KIND)
        .schema(
            PropertySchema::new()
                .prop("label", "")
                .prop("checked", false),
        )
        .prop("label", label.into())
        .prop("checked", checked)
        .on("toggle", |cx, payload| {
            let checked = match payload.as_bool() {
                Some(explicit) => explicit,
                None => !cx.prop_bool("checked").unwrap_or(false),
            };
            cx.set("checked", checked);
            cx.update();
            Ok(())
        })
}
