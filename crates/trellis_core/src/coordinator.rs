//! Patch accumulation and emission
//!
//! `ControlTree::update` walks to the chain boundary and drains the
//! boundary's subtree into one [`UpdatePatch`]; the [`UpdateCoordinator`]
//! owns the render collaborator and the structural bookkeeping (controls
//! mounted or removed since the renderer last heard about them).

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::config::RuntimeConfig;
use crate::control::ControlId;
use crate::properties::PropertyChanges;
use crate::render::Renderer;

/// Full description of a control the renderer has not seen yet
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ControlSnapshot {
    pub id: ControlId,
    pub kind: String,
    pub parent: Option<ControlId>,
    pub props: PropertyChanges,
}

/// Render instructions produced by one `update()` chain
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdatePatch {
    /// Changed properties per control, in document order
    pub changes: IndexMap<ControlId, PropertyChanges>,
    /// Controls mounted inside the region since the last emission, parents first
    pub added: Vec<ControlSnapshot>,
    /// Controls detached from the region since the last emission
    pub removed: Vec<ControlId>,
}

impl UpdatePatch {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    /// Changed properties of one control
    pub fn changes_for(&self, id: ControlId) -> Option<&PropertyChanges> {
        self.changes.get(&id)
    }

    /// Whether the patch touches `id` in any way
    pub fn touches(&self, id: ControlId) -> bool {
        self.changes.contains_key(&id)
            || self.added.iter().any(|s| s.id == id)
            || self.removed.contains(&id)
    }
}

/// Statistics about patch emission
#[derive(Debug, Clone, Default)]
pub struct CoordinatorStats {
    pub emitted: u64,
    pub skipped_empty: u64,
    pub pending_added: usize,
    pub pending_removed: usize,
}

/// Hands patches to the renderer and tracks structural changes between them
pub struct UpdateCoordinator {
    renderer: Box<dyn Renderer>,
    pending_added: IndexSet<ControlId>,
    /// (former parent, child)
    pending_removed: Vec<(ControlId, ControlId)>,
    last_chain: Vec<ControlId>,
    emit_empty: bool,
    log_patches: bool,
    emitted: u64,
    skipped_empty: u64,
}

impl UpdateCoordinator {
    pub fn new(renderer: Box<dyn Renderer>, config: &RuntimeConfig) -> Self {
        Self {
            renderer,
            pending_added: IndexSet::new(),
            pending_removed: Vec::new(),
            last_chain: Vec::new(),
            emit_empty: config.emit_empty_patches,
            log_patches: config.log_patches,
            emitted: 0,
            skipped_empty: 0,
        }
    }

    pub(crate) fn note_mounted(&mut self, id: ControlId) {
        self.pending_added.insert(id);
    }

    /// Claim a pending mount; true if `id` was waiting to be announced
    pub(crate) fn take_added(&mut self, id: ControlId) -> bool {
        self.pending_added.shift_remove(&id)
    }

    /// Record a detached mounted child
    ///
    /// A child the renderer never heard about is simply forgotten.
    pub(crate) fn note_removed(&mut self, parent: ControlId, child: ControlId) {
        if !self.pending_added.shift_remove(&child) {
            self.pending_removed.push((parent, child));
        }
    }

    /// Claim the removals whose former parent lies in the emitting region
    pub(crate) fn take_removed(&mut self, in_region: impl Fn(ControlId) -> bool) -> Vec<ControlId> {
        let mut removed = Vec::new();
        self.pending_removed.retain(|(parent, child)| {
            if in_region(*parent) {
                removed.push(*child);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Drop bookkeeping for a control that left the live tree
    pub(crate) fn forget(&mut self, id: ControlId) {
        self.pending_added.shift_remove(&id);
        self.pending_removed.retain(|(parent, _)| *parent != id);
    }

    /// Hand a patch to the renderer
    ///
    /// Returns true if the renderer was invoked.
    pub(crate) fn emit(&mut self, patch: UpdatePatch, chain: Vec<ControlId>) -> bool {
        self.last_chain = chain;

        if patch.is_empty() && !self.emit_empty {
            self.skipped_empty += 1;
            tracing::trace!(boundary = ?self.last_chain.last(), "empty patch skipped");
            return false;
        }

        if self.log_patches {
            tracing::trace!(
                boundary = ?self.last_chain.last(),
                changes = patch.changes.len(),
                added = patch.added.len(),
                removed = patch.removed.len(),
                "emitting patch"
            );
        }

        self.emitted += 1;
        self.renderer.render(patch);
        true
    }

    /// Controls visited by the most recent `update()`, starting control first
    pub fn last_chain(&self) -> &[ControlId] {
        &self.last_chain
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            emitted: self.emitted,
            skipped_empty: self.skipped_empty,
            pending_added: self.pending_added.len(),
            pending_removed: self.pending_removed.len(),
        }
    }
}
