//! Button pre-styled for destructive actions
//!
//! Colors are schema defaults, so a caller may still override them with
//! `.prop(...)`. The shape is applied in `init`.

use trellis_core::{ControlBehavior, ControlContext, ControlSpec, PropertySchema};

pub const KIND: &str = "danger_button";

/// Applies the rounded shape and pressed overlay
pub struct DangerButton;

impl ControlBehavior for DangerButton {
    fn init(&mut self, cx: &mut ControlContext<'_>) -> anyhow::Result<()> {
        cx.set("border_radius", 8);
        cx.set("overlay_color", "white");
        cx.set("overlay_opacity", 0.2);
        Ok(())
    }
}

pub fn danger_button(label: impl Into<String>) -> ControlSpec {
    ControlSpec::new(KIND)
        .behavior(DangerButton)
        .schema(
            PropertySchema::new()
                .prop("label", "")
                .prop("enabled", true)
                .prop("visible", true)
                .prop("bgcolor", "red_700")
                .prop("color", "white"),
        )
        .prop("label", label.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{PropValue, RecordingRenderer, Runtime};

    #[test]
    fn test_styling_arrives_with_the_mount_snapshot() {
        let recorder = RecordingRenderer::new();
        let runtime = Runtime::new(recorder.clone());
        let id = runtime
            .mount_root(danger_button("Clear All Tasks").prop("color", "yellow"))
            .unwrap();

        let patch = recorder.last().unwrap();
        let snapshot = &patch.added[0];
        assert_eq!(snapshot.id, id);
        assert_eq!(snapshot.props["bgcolor"], PropValue::from("red_700"));
        assert_eq!(snapshot.props["color"], PropValue::from("yellow"));
        assert_eq!(snapshot.props["border_radius"], PropValue::Int(8));
        assert!(patch.changes.is_empty());
    }
}
