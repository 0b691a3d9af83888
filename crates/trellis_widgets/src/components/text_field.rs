//! Single-line text input
//!
//! The surface reports edits as `change` events carrying the new text. The
//! field records it in `value` without rendering: the surface already shows
//! what was typed.

use trellis_core::{ControlSpec, PropValue, PropertySchema};

pub const KIND: &str = "text_field";

pub fn text_field(value: impl Into<String>) -> ControlSpec {
    ControlSpec::new(KIND)
        .schema(
            PropertySchema::new()
                .prop("value", "")
                .prop("hint", "")
                .prop("visible", true),
        )
        .prop("value", value.into())
        .on("change", |cx, payload| {
            let value = payload.as_str().map(str::to_owned).unwrap_or_else(|| payload.to_string());
            cx.set("value", value);
            Ok(())
        })
}

/// Current text of a field, empty if unset
pub(crate) fn field_value(value: Option<&PropValue>) -> String {
    value
        .and_then(PropValue::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{RecordingRenderer, Runtime};

    #[test]
    fn test_change_records_value_without_rendering() {
        let recorder = RecordingRenderer::new();
        let runtime = Runtime::new(recorder.clone());
        let id = runtime.mount_root(text_field("draft")).unwrap();
        recorder.clear();

        runtime.dispatch_event(id, "change", "final").unwrap();

        assert_eq!(
            runtime.inspect(|tree| tree.prop(id, "value").cloned()),
            Some(PropValue::from("final"))
        );
        assert!(recorder.is_empty());
    }
}
