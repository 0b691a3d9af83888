//! Trellis Core
//!
//! The control update and lifecycle runtime behind Trellis UIs:
//!
//! - **Control tree**: controls in a generational arena, single parent,
//!   no cycles, ordered children
//! - **Property stores**: per-control values with dirty tracking; setting a
//!   property never renders by itself
//! - **Updates**: `update()` walks to the nearest isolated composite (or the
//!   root) and emits one consolidated patch for that region
//! - **Lifecycle**: `Created → Mounted → Unmounting → Disposed` with
//!   `init`/`did_mount`/`will_unmount` hooks whose failures stay contained
//! - **Tasks**: cooperative futures owned by a mounted control, cancelled at
//!   unmount and drained before the control is disposed
//!
//! # Example
//!
//! ```
//! use trellis_core::{ControlSpec, PropValue, RecordingRenderer, Runtime};
//!
//! let recorder = RecordingRenderer::new();
//! let runtime = Runtime::new(recorder.clone());
//!
//! let label = runtime
//!     .mount_root(ControlSpec::new("text").prop("text", "idle").on("click", |cx, _| {
//!         cx.set("text", "clicked");
//!         cx.update();
//!         Ok(())
//!     }))
//!     .unwrap();
//! recorder.clear();
//!
//! runtime.dispatch_event(label, "click", PropValue::Null).unwrap();
//!
//! let patch = recorder.last().unwrap();
//! assert_eq!(patch.changes[&label]["text"], PropValue::from("clicked"));
//! ```

pub mod composite;
pub mod config;
pub mod context;
pub mod control;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod properties;
pub mod render;
pub mod runtime;
pub mod task;
pub mod timer;
pub mod tree;
pub mod value;

pub use composite::{ControlBehavior, Hooks};
pub use config::RuntimeConfig;
pub use context::ControlContext;
pub use control::{ControlId, ControlKind, ControlNode, ControlSpec, EventHandler, CHILDREN_PROP};
pub use coordinator::{ControlSnapshot, CoordinatorStats, UpdateCoordinator, UpdatePatch};
pub use diagnostics::{CollectingDiagnostics, Diagnostics, Report, TracingDiagnostics};
pub use error::{ConfigError, InvalidTree, Result, RuntimeError};
pub use lifecycle::{LifecycleState, Phase};
pub use properties::{PropertyChanges, PropertySchema, PropertyStore};
pub use render::{JsonRenderer, NullRenderer, RecordingRenderer, Renderer, TracingRenderer};
pub use runtime::{Runtime, RuntimeStats};
pub use task::{TaskContext, TaskHandle, TaskId, TaskScheduler, TaskStats};
pub use timer::{CancellationToken, Guarded, Sleep, TickClock, YieldNow};
pub use tree::{ControlTree, TreeStats};
pub use value::PropValue;
