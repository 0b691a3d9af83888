//! Error types for trellis_core

use thiserror::Error;

use crate::control::ControlId;
use crate::lifecycle::LifecycleState;

/// Structural violations rejected by the control tree.
///
/// The tree is left unchanged whenever one of these is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTree {
    /// The child is already attached under a different parent
    #[error("control {child} already has parent {current_parent}")]
    AlreadyParented {
        child: ControlId,
        current_parent: ControlId,
    },

    /// Attaching would make a control its own ancestor
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: ControlId, child: ControlId },

    /// The tree root cannot be attached under another control
    #[error("root control {0} cannot become a child")]
    RootAsChild(ControlId),

    /// The control is not a child of the given parent
    #[error("control {child} is not a child of {parent}")]
    NotAChild { parent: ControlId, child: ControlId },

    /// A root is already mounted
    #[error("a root control is already set ({0})")]
    RootAlreadySet(ControlId),

    /// Unmounting and disposed controls never rejoin a tree
    #[error("control {control} is {state:?} and cannot be attached")]
    Detached {
        control: ControlId,
        state: LifecycleState,
    },
}

/// Errors that can occur in the Trellis runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Rejected tree mutation (cycle, double parenting)
    #[error("invalid tree operation: {0}")]
    InvalidTree(#[from] InvalidTree),

    /// Operation requires the control to be mounted
    #[error("control {control} is not mounted (state: {state:?})")]
    NotMounted {
        control: ControlId,
        state: LifecycleState,
    },

    /// The id does not refer to a control in this tree
    #[error("unknown control {0}")]
    UnknownControl(ControlId),
}

/// Errors raised while loading a [`RuntimeConfig`](crate::config::RuntimeConfig)
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("config parse failed: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to read the config file
    #[error("config read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for trellis_core operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
