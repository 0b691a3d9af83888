//! Shared setup for scenario tests

#![allow(dead_code)]

use trellis_core::{CollectingDiagnostics, RecordingRenderer, Runtime, RuntimeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a test-friendly subscriber once; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

pub struct Harness {
    pub runtime: Runtime,
    pub renderer: RecordingRenderer,
    pub diagnostics: CollectingDiagnostics,
}

pub fn harness() -> Harness {
    init_tracing();
    let renderer = RecordingRenderer::new();
    let diagnostics = CollectingDiagnostics::new();
    let runtime = Runtime::with_config(
        RuntimeConfig::testing(),
        renderer.clone(),
        diagnostics.clone(),
    );
    Harness {
        runtime,
        renderer,
        diagnostics,
    }
}
