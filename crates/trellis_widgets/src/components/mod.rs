//! Stock controls
//!
//! Each widget follows the same pattern:
//! - Builder function (e.g., `button("Label")`) returning a `ControlSpec`
//! - Kind name constant used by `find_by_kind` and renderers
//! - Composite widgets expose their behavior type for reuse

pub mod button;
pub mod checkbox;
pub mod clock;
pub mod counter;
pub mod danger_button;
pub mod layout;
pub mod task_list;
pub mod text;
pub mod text_field;

pub use button::button;
pub use checkbox::checkbox;
pub use clock::{clock, Clock};
pub use counter::{counter, Counter};
pub use danger_button::{danger_button, DangerButton};
pub use layout::{column, row};
pub use task_list::{add_task, task_list, task_row, TaskList, TaskRow};
pub use text::text;
pub use text_field::text_field;
