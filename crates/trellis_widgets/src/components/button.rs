//! Clickable button
//!
//! The surface reports presses as `click` events; attach behavior with
//! `ControlSpec::on`.
//!
//! # Example
//!
//! ```ignore
//! button("Save").on("click", |cx, _| {
//!     cx.set("label", "Saved");
//!     cx.update();
//!     Ok(())
//! })
//! ```

use trellis_core::{ControlSpec, PropertySchema};

pub const KIND: &str = "button";

pub fn button(label: impl Into<String>) -> ControlSpec {
    ControlSpec::new(KIND)
        .schema(
            PropertySchema::new()
                .prop("label", "")
                .prop("enabled", true)
                .prop("visible", true),
        )
        .prop("label", label.into())
}
