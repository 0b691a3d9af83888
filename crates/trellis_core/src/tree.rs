//! Control tree
//!
//! All controls live in one generational arena. Parents own their children
//! through ordered id lists; a child refers back to its parent by id only,
//! so there are no reference cycles and a removed control can never be
//! reached through a stale pointer.
//!
//! Structural changes go through [`ControlTree::add_child`],
//! [`ControlTree::insert_child`] and [`ControlTree::remove_child`], which
//! enforce single parenthood and acyclicity and drive mount/unmount when a
//! subtree enters or leaves the live tree.

use std::cell::RefCell;
use std::rc::Weak;

use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use crate::config::RuntimeConfig;
use crate::control::{ControlId, ControlNode, ControlSpec, CHILDREN_PROP};
use crate::coordinator::{ControlSnapshot, UpdateCoordinator, UpdatePatch};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{InvalidTree, Result, RuntimeError};
use crate::lifecycle::{LifecycleState, Phase};
use crate::render::Renderer;
use crate::task::TaskScheduler;
use crate::timer::TickClock;
use crate::value::PropValue;

/// Counts of controls per lifecycle state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub controls: usize,
    pub created: usize,
    pub mounted: usize,
    pub unmounting: usize,
    pub disposed: usize,
}

/// The control arena plus everything that acts on it
pub struct ControlTree {
    pub(crate) nodes: SlotMap<ControlId, ControlNode>,
    pub(crate) root: Option<ControlId>,
    pub(crate) coordinator: UpdateCoordinator,
    pub(crate) tasks: TaskScheduler,
    pub(crate) diagnostics: Box<dyn Diagnostics>,
    pub(crate) config: RuntimeConfig,
    pub(crate) clock: TickClock,
    /// Back-reference handed to tasks; dangling outside a `Runtime`
    pub(crate) handle: Weak<RefCell<ControlTree>>,
}

impl ControlTree {
    pub fn new(renderer: impl Renderer + 'static) -> Self {
        Self::with_config(RuntimeConfig::default(), renderer, TracingDiagnostics)
    }

    pub fn with_config(
        config: RuntimeConfig,
        renderer: impl Renderer + 'static,
        diagnostics: impl Diagnostics + 'static,
    ) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            coordinator: UpdateCoordinator::new(Box::new(renderer), &config),
            tasks: TaskScheduler::new(),
            diagnostics: Box::new(diagnostics),
            config,
            clock: TickClock::new(),
            handle: Weak::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn coordinator(&self) -> &UpdateCoordinator {
        &self.coordinator
    }

    pub(crate) fn report(&self, id: ControlId, phase: Phase, error: &anyhow::Error) {
        self.diagnostics.report(id, phase, error);
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn contains(&self, id: ControlId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: ControlId) -> Option<&ControlNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<ControlId> {
        self.root
    }

    pub fn state(&self, id: ControlId) -> Option<LifecycleState> {
        self.nodes.get(id).map(|n| n.state)
    }

    pub fn parent(&self, id: ControlId) -> Option<ControlId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Ordered children; empty for unknown ids
    pub fn children(&self, id: ControlId) -> &[ControlId] {
        match self.nodes.get(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    pub fn kind_name(&self, id: ControlId) -> Option<&str> {
        self.nodes.get(id).map(|n| n.kind_name.as_str())
    }

    pub fn prop(&self, id: ControlId, name: &str) -> Option<&PropValue> {
        self.nodes.get(id).and_then(|n| n.props.get(name))
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: ControlId) -> Vec<ControlId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent(parent);
        }
        ancestors
    }

    /// True if `ancestor` lies strictly above `id`
    pub fn is_ancestor(&self, ancestor: ControlId, id: ControlId) -> bool {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Descendants of `id` in document order, excluding `id`
    pub fn descendants(&self, id: ControlId) -> Vec<ControlId> {
        let mut out = Vec::new();
        let mut stack: Vec<ControlId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Controls of the given kind reachable from the root, in document order
    pub fn find_by_kind(&self, kind_name: &str) -> Vec<ControlId> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        std::iter::once(root)
            .chain(self.descendants(root))
            .filter(|id| self.kind_name(*id) == Some(kind_name))
            .collect()
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            controls: self.nodes.len(),
            ..Default::default()
        };
        for node in self.nodes.values() {
            match node.state {
                LifecycleState::Created => stats.created += 1,
                LifecycleState::Mounted => stats.mounted += 1,
                LifecycleState::Unmounting => stats.unmounting += 1,
                LifecycleState::Disposed => stats.disposed += 1,
            }
        }
        stats
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    /// Set a property; nothing renders until `update()`
    ///
    /// Returns true if the property became dirty. Disposed controls accept
    /// the write but never render it.
    pub fn set_prop(
        &mut self,
        id: ControlId,
        name: impl Into<String>,
        value: impl Into<PropValue>,
    ) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(RuntimeError::UnknownControl(id))?;
        Ok(node.props.set(name, value))
    }

    /// Remove a property; renders as a change to null
    pub fn remove_prop(&mut self, id: ControlId, name: &str) -> Result<Option<PropValue>> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(RuntimeError::UnknownControl(id))?;
        Ok(node.props.remove(name))
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    /// Create a detached control (and its declarative children)
    pub fn create(&mut self, mut spec: ControlSpec) -> ControlId {
        let skip = self.config.skip_unchanged_sets;
        let id = self
            .nodes
            .insert_with_key(|id| ControlNode::from_spec(id, &mut spec, skip));

        let children: Vec<ControlId> = spec
            .children
            .drain(..)
            .map(|child| self.create(child))
            .collect();

        if !children.is_empty() {
            for child in &children {
                if let Some(node) = self.nodes.get_mut(*child) {
                    node.parent = Some(id);
                }
            }
            if let Some(node) = self.nodes.get_mut(id) {
                node.children.extend(children.iter().copied());
                node.props.set(CHILDREN_PROP, PropValue::Controls(children));
                node.props.clear_dirty();
            }
        }

        tracing::trace!(control = %id, kind = self.kind_name(id).unwrap_or(""), "created");
        id
    }

    /// Create `spec` as the root and mount it
    ///
    /// The whole tree is announced to the renderer in one initial patch.
    pub fn mount_root(&mut self, spec: ControlSpec) -> Result<ControlId> {
        if let Some(root) = self.root {
            return Err(InvalidTree::RootAlreadySet(root).into());
        }
        let id = self.create(spec);
        self.set_root(id)?;
        Ok(id)
    }

    /// Make an existing detached control the root and mount it
    pub fn set_root(&mut self, id: ControlId) -> Result<()> {
        let node = self.nodes.get(id).ok_or(RuntimeError::UnknownControl(id))?;
        if let Some(root) = self.root {
            return Err(InvalidTree::RootAlreadySet(root).into());
        }
        if let Some(parent) = node.parent {
            return Err(InvalidTree::AlreadyParented {
                child: id,
                current_parent: parent,
            }
            .into());
        }

        self.root = Some(id);
        tracing::debug!(control = %id, "root set");
        self.mount_subtree(id);

        if self.state(id) == Some(LifecycleState::Mounted) {
            self.flush(id, vec![id]);
        }
        Ok(())
    }

    /// Unmount the whole tree and clear the root
    pub fn unmount_root(&mut self) {
        if let Some(root) = self.root.take() {
            tracing::debug!(control = %root, "unmounting root");
            self.unmount_subtree(root);
        }
    }

    /// Drop disposed controls from the arena
    ///
    /// Returns how many were removed. Their ids stop resolving afterwards.
    pub fn purge_disposed(&mut self) -> usize {
        let disposed: FxHashSet<ControlId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.state == LifecycleState::Disposed)
            .map(|(id, _)| id)
            .collect();

        for id in &disposed {
            let parent = self.nodes.get(*id).and_then(|n| n.parent);
            if let Some(parent) = parent.filter(|p| !disposed.contains(p)) {
                if let Some(node) = self.nodes.get_mut(parent) {
                    node.children.retain(|c| c != id);
                }
                self.sync_children_prop(parent);
            }
        }

        self.nodes.retain(|id, node| {
            if disposed.contains(&id) {
                return false;
            }
            if node.parent.is_some_and(|p| disposed.contains(&p)) {
                node.parent = None;
            }
            node.children.retain(|c| !disposed.contains(c));
            true
        });

        if self.root.is_some_and(|r| disposed.contains(&r)) {
            self.root = None;
        }
        disposed.len()
    }

    // =========================================================================
    // STRUCTURE
    // =========================================================================

    /// Append `child` to `parent`'s children
    ///
    /// Mounts the child's subtree if `parent` is mounted.
    pub fn add_child(&mut self, parent: ControlId, child: ControlId) -> Result<()> {
        let index = self.children(parent).len();
        self.attach(parent, Some(index), child)
    }

    /// Insert `child` at `index` (clamped to the end)
    pub fn insert_child(&mut self, parent: ControlId, index: usize, child: ControlId) -> Result<()> {
        self.attach(parent, Some(index), child)
    }

    /// Detach `child` from `parent`
    ///
    /// A mounted child is unmounted together with its subtree.
    pub fn remove_child(&mut self, parent: ControlId, child: ControlId) -> Result<()> {
        if !self.contains(parent) {
            return Err(RuntimeError::UnknownControl(parent));
        }
        if !self.contains(child) {
            return Err(RuntimeError::UnknownControl(child));
        }
        if self.parent(child) != Some(parent) {
            return Err(InvalidTree::NotAChild { parent, child }.into());
        }

        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|c| *c != child);
        }
        let was_mounted = match self.nodes.get_mut(child) {
            Some(node) => {
                node.parent = None;
                node.state == LifecycleState::Mounted
            }
            None => false,
        };
        self.sync_children_prop(parent);
        tracing::debug!(parent = %parent, child = %child, "child removed");

        if was_mounted {
            self.coordinator.note_removed(parent, child);
            self.unmount_subtree(child);
        }
        Ok(())
    }

    /// Detach every child of `parent`
    pub fn clear_children(&mut self, parent: ControlId) -> Result<()> {
        if !self.contains(parent) {
            return Err(RuntimeError::UnknownControl(parent));
        }
        for child in self.children(parent).to_vec() {
            self.remove_child(parent, child)?;
        }
        Ok(())
    }

    fn attach(&mut self, parent: ControlId, index: Option<usize>, child: ControlId) -> Result<()> {
        self.check_attach(parent, child)?;
        if self.parent(child) == Some(parent) {
            return Ok(());
        }

        // init sees the child unlinked from the live tree
        if self.state(parent) == Some(LifecycleState::Mounted) {
            self.initialize_subtree(child);
            self.check_attach(parent, child)?;
        }

        if let Some(node) = self.nodes.get_mut(parent) {
            let at = index.unwrap_or(node.children.len()).min(node.children.len());
            node.children.insert(at, child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        self.sync_children_prop(parent);
        tracing::debug!(parent = %parent, child = %child, "child attached");

        if self.state(parent) == Some(LifecycleState::Mounted) {
            self.mount_subtree(child);
        }
        Ok(())
    }

    fn check_attach(&self, parent: ControlId, child: ControlId) -> Result<()> {
        if !self.contains(parent) {
            return Err(RuntimeError::UnknownControl(parent));
        }
        if !self.contains(child) {
            return Err(RuntimeError::UnknownControl(child));
        }
        if parent == child {
            return Err(InvalidTree::Cycle { parent, child }.into());
        }
        for control in [child, parent] {
            if let Some(state) = self.state(control).filter(LifecycleState::is_detached) {
                return Err(InvalidTree::Detached { control, state }.into());
            }
        }
        if self.root == Some(child) {
            return Err(InvalidTree::RootAsChild(child).into());
        }
        match self.parent(child) {
            Some(current) if current == parent => return Ok(()),
            Some(current_parent) => {
                return Err(InvalidTree::AlreadyParented {
                    child,
                    current_parent,
                }
                .into())
            }
            None => {}
        }
        if self.is_ancestor(child, parent) {
            return Err(InvalidTree::Cycle { parent, child }.into());
        }
        Ok(())
    }

    fn sync_children_prop(&mut self, id: ControlId) {
        if let Some(node) = self.nodes.get_mut(id) {
            let children = node.children.to_vec();
            node.props.set(CHILDREN_PROP, PropValue::Controls(children));
        }
    }

    // =========================================================================
    // UPDATES
    // =========================================================================

    /// Push pending changes to the renderer
    ///
    /// No-op (returns false) unless `id` is mounted. Otherwise walks up to
    /// the nearest isolated composite or the root, drains that boundary's
    /// whole subtree into one patch and emits it. Returns true if the
    /// renderer was invoked.
    pub fn update(&mut self, id: ControlId) -> bool {
        if self.state(id) != Some(LifecycleState::Mounted) {
            tracing::trace!(control = %id, "update ignored: not mounted");
            return false;
        }

        let mut chain = vec![id];
        let mut current = id;
        loop {
            let Some(node) = self.nodes.get(current) else {
                break;
            };
            if node.kind.is_isolated() {
                break;
            }
            match node.parent {
                Some(parent) if self.contains(parent) => {
                    chain.push(parent);
                    current = parent;
                }
                _ => break,
            }
        }

        self.flush(current, chain)
    }

    /// Drain `boundary`'s mounted subtree into one patch and emit it
    fn flush(&mut self, boundary: ControlId, chain: Vec<ControlId>) -> bool {
        let mut patch = UpdatePatch::default();
        let mut region = FxHashSet::default();
        let mut stack = vec![boundary];

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            if node.state != LifecycleState::Mounted {
                continue;
            }
            region.insert(id);

            if self.coordinator.take_added(id) {
                // The snapshot already carries every pending change
                node.props.clear_dirty();
                patch.added.push(ControlSnapshot {
                    id,
                    kind: node.kind_name.clone(),
                    parent: node.parent,
                    props: node.props.snapshot(),
                });
            } else if node.props.has_dirty() {
                patch.changes.insert(id, node.props.drain_dirty());
            }

            stack.extend(node.children.iter().rev().copied());
        }

        patch.removed = self.coordinator.take_removed(|parent| region.contains(&parent));
        self.coordinator.emit(patch, chain)
    }
}
