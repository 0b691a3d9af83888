//! Static text

use trellis_core::{ControlSpec, PropertySchema};

pub const KIND: &str = "text";

/// A text label; its `text` property is what renders
pub fn text(value: impl Into<String>) -> ControlSpec {
    ControlSpec::new(KIND)
        .schema(PropertySchema::new().prop("text", "").prop("visible", true))
        .prop("text", value.into())
}
