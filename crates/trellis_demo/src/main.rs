//! Trellis Demo
//!
//! Mounts a small page (counter, clock, task list, clear button), plays a scripted
//! sequence of events and clock ticks against it, and prints every patch
//! the runtime emits as one JSON document per line on stdout.
//!
//! Usage:
//!   trellis-demo                      # Default configuration
//!   trellis-demo --config trellis.toml
//!   trellis-demo --ticks 5            # Clock ticks to run (default 3)
//!
//! Logs go to stderr; `RUST_LOG=debug` shows lifecycle transitions.

use anyhow::{Context, Result};
use trellis_core::{JsonRenderer, PropValue, Runtime, RuntimeConfig, TracingDiagnostics};
use trellis_widgets::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = match flag_value(&args, "--config") {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("loading config from {path}"))?,
        None => RuntimeConfig::standard(),
    };
    let ticks = match flag_value(&args, "--ticks") {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid --ticks value {raw:?}"))?,
        None => 3,
    };

    let runtime = Runtime::with_config(
        config,
        JsonRenderer::new(std::io::stdout()),
        TracingDiagnostics,
    );

    let page = runtime.mount_root(
        column()
            .child(text("Trellis demo"))
            .child(row().child(counter(0)).child(clock(1)))
            .child(task_list(["write spec", "review"]))
            .child(danger_button("Clear All Tasks").on("click", |cx, _| {
                if let Some(list) = cx.tree().find_by_kind("task_list").first().copied() {
                    cx.tree().dispatch_event(list, "clear", &PropValue::Null)?;
                }
                Ok(())
            })),
    )?;
    tracing::info!(page = %page, "page mounted");

    let (counter_id, clock_id, list, clear_all) = runtime.inspect(|tree| {
        (
            tree.find_by_kind("counter")[0],
            tree.find_by_kind("clock")[0],
            tree.find_by_kind("task_list")[0],
            tree.find_by_kind("danger_button")[0],
        )
    });

    // Counter: one patch per press
    runtime.dispatch_event(counter_id, "decrement", PropValue::Null)?;
    runtime.dispatch_event(counter_id, "increment", PropValue::Null)?;
    runtime.dispatch_event(counter_id, "increment", PropValue::Null)?;

    // Clock: one patch per tick
    runtime.advance(ticks);

    // Task list: two rows, one patch
    runtime.with_tree(|tree| -> Result<()> {
        add_task(tree, list, "ship it")?;
        add_task(tree, list, "celebrate")?;
        tree.update(list);
        Ok(())
    })?;

    // Check the first row, rename the second, then delete the first
    let rows = runtime.inspect(|tree| tree.children(list).to_vec());
    let first = runtime.inspect(|tree| tree.children(rows[0]).to_vec());
    let second = runtime.inspect(|tree| tree.children(rows[1]).to_vec());
    runtime.dispatch_event(first[0], "toggle", PropValue::Null)?;
    runtime.dispatch_event(second[3], "click", PropValue::Null)?;
    runtime.dispatch_event(second[2], "change", "review twice")?;
    runtime.dispatch_event(second[4], "click", PropValue::Null)?;
    runtime.dispatch_event(first[5], "click", PropValue::Null)?;

    // Unmount the clock; further ticks render nothing
    runtime.with_tree(|tree| -> Result<()> {
        let parent = tree.parent(clock_id).context("clock has no parent")?;
        tree.remove_child(parent, clock_id)?;
        tree.update(parent);
        Ok(())
    })?;
    runtime.advance(ticks);

    // Clear every remaining task
    runtime.dispatch_event(clear_all, "click", PropValue::Null)?;

    runtime.unmount_root();
    let stats = runtime.stats();
    tracing::info!(
        patches = stats.patches.emitted,
        tasks_spawned = stats.tasks.spawned,
        disposed = stats.tree.disposed,
        "demo finished"
    );
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
