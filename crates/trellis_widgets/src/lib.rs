//! # Trellis Widgets
//!
//! Stock controls built on `trellis_core`.
//!
//! Every widget is a builder function returning a [`ControlSpec`]; there are
//! no widget structs to subclass. Leaf widgets only declare properties and
//! handlers. Composite widgets attach a [`ControlBehavior`] that synthesizes
//! their children in `init` and may start tasks in `did_mount`.
//!
//! ## Example
//!
//! ```
//! use trellis_core::{PropValue, RecordingRenderer, Runtime};
//! use trellis_widgets::prelude::*;
//!
//! let runtime = Runtime::new(RecordingRenderer::new());
//! let page = runtime
//!     .mount_root(column().child(text("Tasks")).child(counter(0)))
//!     .unwrap();
//!
//! let counter_id = runtime.inspect(|tree| tree.find_by_kind("counter")[0]);
//! runtime.dispatch_event(counter_id, "decrement", PropValue::Null).unwrap();
//! # let _ = page;
//! ```
//!
//! ## Widgets
//!
//! - **text**, **button**, **checkbox**, **text_field** - leaf controls
//! - **danger_button** - button with destructive styling applied in `init`
//! - **row**, **column** - plain containers
//! - **counter** - isolated composite with +/- buttons
//! - **clock** - isolated text driven by a background task
//! - **task_list**, **task_row** - dynamic list of checkable, editable rows
//!
//! [`ControlSpec`]: trellis_core::ControlSpec
//! [`ControlBehavior`]: trellis_core::ControlBehavior

pub mod components;

pub use components::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::components::button::button;
    pub use crate::components::checkbox::checkbox;
    pub use crate::components::clock::{clock, Clock};
    pub use crate::components::counter::{counter, Counter};
    pub use crate::components::danger_button::{danger_button, DangerButton};
    pub use crate::components::layout::{column, row};
    pub use crate::components::task_list::{add_task, task_list, task_row, TaskList, TaskRow};
    pub use crate::components::text::text;
    pub use crate::components::text_field::text_field;
}
