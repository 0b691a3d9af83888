//! Runtime configuration presets.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for a control tree and its runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Setting a property to its current value does not mark it dirty.
    pub skip_unchanged_sets: bool,
    /// Hand empty patches to the renderer instead of skipping them.
    pub emit_empty_patches: bool,
    /// Polls a cancelled task may stay pending before a stall is reported.
    pub cancel_stall_polls: u32,
    /// Upper bound on poll passes per drain.
    pub max_drain_passes: usize,
    /// Trace a summary of every emitted patch.
    pub log_patches: bool,
    /// Drop disposed controls from the arena after every drain.
    pub purge_disposed: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuntimeConfig {
    /// Standard configuration for general use.
    pub fn standard() -> Self {
        Self {
            skip_unchanged_sets: true,
            emit_empty_patches: false,
            cancel_stall_polls: 8,
            max_drain_passes: 64,
            log_patches: false,
            purge_disposed: false,
        }
    }

    /// Debug configuration: every patch is traced, stalls surface quickly.
    pub fn debug() -> Self {
        Self {
            skip_unchanged_sets: true,
            emit_empty_patches: true,
            cancel_stall_polls: 2,
            max_drain_passes: 64,
            log_patches: true,
            purge_disposed: false,
        }
    }

    /// Configuration for tests (small bounds, deterministic).
    pub fn testing() -> Self {
        Self {
            skip_unchanged_sets: true,
            emit_empty_patches: false,
            cancel_stall_polls: 3,
            max_drain_passes: 16,
            log_patches: false,
            purge_disposed: false,
        }
    }

    /// Parse from a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Set whether unchanged sets are skipped.
    pub fn with_skip_unchanged_sets(mut self, skip: bool) -> Self {
        self.skip_unchanged_sets = skip;
        self
    }

    /// Set whether empty patches are emitted.
    pub fn with_emit_empty_patches(mut self, emit: bool) -> Self {
        self.emit_empty_patches = emit;
        self
    }

    /// Set the stall threshold for cancelled tasks.
    pub fn with_cancel_stall_polls(mut self, polls: u32) -> Self {
        self.cancel_stall_polls = polls;
        self
    }

    /// Set the poll pass bound.
    pub fn with_max_drain_passes(mut self, passes: usize) -> Self {
        self.max_drain_passes = passes;
        self
    }

    /// Set patch tracing.
    pub fn with_log_patches(mut self, log: bool) -> Self {
        self.log_patches = log;
        self
    }

    /// Set whether the runtime purges disposed controls.
    pub fn with_purge_disposed(mut self, purge: bool) -> Self {
        self.purge_disposed = purge;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_standard() {
        let config = RuntimeConfig::default();
        assert!(config.skip_unchanged_sets);
        assert!(!config.emit_empty_patches);
        assert_eq!(config.cancel_stall_polls, 8);
        assert_eq!(config.max_drain_passes, 64);
        assert!(!config.purge_disposed);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str("emit_empty_patches = true\n").unwrap();
        assert!(config.emit_empty_patches);
        assert_eq!(config.cancel_stall_polls, 8);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = RuntimeConfig::from_toml_str("cancel_stall_polls = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RuntimeConfig::from_file("/nonexistent/trellis.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_builders() {
        let config = RuntimeConfig::testing()
            .with_skip_unchanged_sets(false)
            .with_log_patches(true)
            .with_max_drain_passes(4)
            .with_cancel_stall_polls(1)
            .with_purge_disposed(true);

        assert!(!config.skip_unchanged_sets);
        assert!(config.log_patches);
        assert_eq!(config.max_drain_passes, 4);
        assert_eq!(config.cancel_stall_polls, 1);
        assert!(config.purge_disposed);
    }
}
