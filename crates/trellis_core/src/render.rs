//! Render collaborators
//!
//! The runtime never draws anything. Each emitted [`UpdatePatch`] is moved
//! into a [`Renderer`], which may forward it to a display surface, log it or
//! keep it for inspection.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::coordinator::UpdatePatch;

/// Receiver of update patches
///
/// Must accept an empty patch.
pub trait Renderer {
    fn render(&mut self, patch: UpdatePatch);
}

/// Discards every patch
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _patch: UpdatePatch) {}
}

/// Keeps every patch; clones share the same log
#[derive(Clone, Debug, Default)]
pub struct RecordingRenderer {
    patches: Rc<RefCell<Vec<UpdatePatch>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded patches
    pub fn patches(&self) -> Vec<UpdatePatch> {
        self.patches.borrow().clone()
    }

    pub fn last(&self) -> Option<UpdatePatch> {
        self.patches.borrow().last().cloned()
    }

    /// Remove and return the recorded patches
    pub fn take(&self) -> Vec<UpdatePatch> {
        std::mem::take(&mut *self.patches.borrow_mut())
    }

    pub fn clear(&self) {
        self.patches.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.patches.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.borrow().is_empty()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, patch: UpdatePatch) {
        self.patches.borrow_mut().push(patch);
    }
}

/// Writes one JSON document per patch
pub struct JsonRenderer<W: Write> {
    writer: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, patch: &UpdatePatch) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, patch)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, patch: UpdatePatch) {
        if let Err(e) = self.write_line(&patch) {
            tracing::warn!("failed to write patch: {e}");
        }
    }
}

/// Logs a summary of every patch at info level
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn render(&mut self, patch: UpdatePatch) {
        for (id, changes) in &patch.changes {
            for (name, value) in changes {
                tracing::info!(control = %id, property = %name, value = %value, "set");
            }
        }
        for snapshot in &patch.added {
            tracing::info!(control = %snapshot.id, kind = %snapshot.kind, "added");
        }
        for id in &patch.removed {
            tracing::info!(control = %id, "removed");
        }
    }
}
