//! Plain containers

use trellis_core::{ControlSpec, PropertySchema};

pub const ROW: &str = "row";
pub const COLUMN: &str = "column";

fn container(kind: &str) -> ControlSpec {
    ControlSpec::new(kind).schema(PropertySchema::new().prop("gap", 0))
}

/// Children laid out horizontally
pub fn row() -> ControlSpec {
    container(ROW)
}

/// Children laid out vertically
pub fn column() -> ControlSpec {
    container(COLUMN)
}
