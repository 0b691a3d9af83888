//! Scoped access to one control for hooks, handlers and task segments
//!
//! A [`ControlContext`] pairs the tree with the id of the control whose code
//! is running. Property reads and writes default to that control; the tree
//! itself stays reachable through [`ControlContext::tree`] for anything
//! addressed to another control.

use std::future::Future;

use crate::control::{ControlId, ControlSpec};
use crate::error::Result;
use crate::lifecycle::LifecycleState;
use crate::task::{TaskContext, TaskHandle};
use crate::tree::ControlTree;
use crate::value::PropValue;

pub struct ControlContext<'a> {
    tree: &'a mut ControlTree,
    id: ControlId,
}

impl<'a> ControlContext<'a> {
    pub fn new(tree: &'a mut ControlTree, id: ControlId) -> Self {
        Self { tree, id }
    }

    /// The control this context is scoped to
    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn parent(&self) -> Option<ControlId> {
        self.tree.parent(self.id)
    }

    pub fn children(&self) -> Vec<ControlId> {
        self.tree.children(self.id).to_vec()
    }

    pub fn state(&self) -> LifecycleState {
        self.tree.state(self.id).unwrap_or(LifecycleState::Disposed)
    }

    pub fn tree(&mut self) -> &mut ControlTree {
        self.tree
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.tree.prop(self.id, name)
    }

    pub fn prop_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str()).map(str::to_string)
    }

    pub fn prop_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropValue::as_int)
    }

    pub fn prop_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(PropValue::as_bool)
    }

    /// Set a property on this control; nothing renders until `update()`
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropValue>) -> bool {
        self.tree.set_prop(self.id, name, value).unwrap_or(false)
    }

    /// Set a property on another control
    pub fn set_on(
        &mut self,
        target: ControlId,
        name: impl Into<String>,
        value: impl Into<PropValue>,
    ) -> Result<bool> {
        self.tree.set_prop(target, name, value)
    }

    pub fn get_on(&self, target: ControlId, name: &str) -> Option<&PropValue> {
        self.tree.prop(target, name)
    }

    // =========================================================================
    // UPDATES
    // =========================================================================

    /// Push this control's pending changes (see `ControlTree::update`)
    pub fn update(&mut self) -> bool {
        self.tree.update(self.id)
    }

    pub fn update_control(&mut self, target: ControlId) -> bool {
        self.tree.update(target)
    }

    // =========================================================================
    // STRUCTURE
    // =========================================================================

    /// Create a detached control
    pub fn create(&mut self, spec: ControlSpec) -> ControlId {
        self.tree.create(spec)
    }

    /// Create a control and append it to this control's children
    pub fn create_child(&mut self, spec: ControlSpec) -> Result<ControlId> {
        let child = self.tree.create(spec);
        self.tree.add_child(self.id, child)?;
        Ok(child)
    }

    pub fn add_child(&mut self, child: ControlId) -> Result<()> {
        self.tree.add_child(self.id, child)
    }

    pub fn insert_child(&mut self, index: usize, child: ControlId) -> Result<()> {
        self.tree.insert_child(self.id, index, child)
    }

    pub fn remove_child(&mut self, child: ControlId) -> Result<()> {
        self.tree.remove_child(self.id, child)
    }

    /// Detach this control from its parent
    pub fn remove_self(&mut self) -> Result<()> {
        match self.tree.parent(self.id) {
            Some(parent) => self.tree.remove_child(parent, self.id),
            None => Ok(()),
        }
    }

    /// Find the nearest ancestor of the given kind
    pub fn ancestor_of_kind(&self, kind_name: &str) -> Option<ControlId> {
        self.tree
            .ancestors(self.id)
            .into_iter()
            .find(|id| self.tree.kind_name(*id) == Some(kind_name))
    }

    // =========================================================================
    // TASKS
    // =========================================================================

    /// Spawn a task owned by this control; requires the control to be mounted
    pub fn spawn<F, Fut>(&mut self, body: F) -> Result<TaskHandle>
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.tree.spawn(self.id, body)
    }

    /// Current tick of the cooperative clock
    pub fn now(&self) -> u64 {
        self.tree.clock().now()
    }
}
