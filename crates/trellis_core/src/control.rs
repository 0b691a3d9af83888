//! Control declarations and tree nodes
//!
//! A control is declared with a [`ControlSpec`] (kind name, property schema,
//! optional lifecycle behavior, event handlers, declarative children) and
//! lives in the [`ControlTree`](crate::tree::ControlTree) arena as a
//! [`ControlNode`]. Composite controls are ordinary controls whose behavior
//! synthesizes their children in `init`; there is no subclassing.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};
use slotmap::{new_key_type, Key};
use smallvec::SmallVec;

use crate::composite::ControlBehavior;
use crate::context::ControlContext;
use crate::lifecycle::{LifecycleState, Phase};
use crate::properties::{PropertySchema, PropertyStore};
use crate::value::PropValue;

new_key_type! {
    /// Stable identity of a control
    pub struct ControlId;
}

impl ControlId {
    /// Convert to a raw u64 representation
    ///
    /// Useful for handing ids to a rendering surface that echoes them back
    /// in events.
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Create from a raw u64 representation
    ///
    /// The raw value must have been created by `to_raw()`.
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // KeyData debug output is "<index>v<version>"
        write!(f, "{:?}", self.data())
    }
}

impl Serialize for ControlId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Event handler invoked by `dispatch_event`
pub type EventHandler = Rc<dyn Fn(&mut ControlContext<'_>, &PropValue) -> anyhow::Result<()>>;

/// Name of the synthetic property tracking a control's child list
pub const CHILDREN_PROP: &str = "children";

/// Structural role of a control
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    /// A plain control
    Leaf,
    /// A control whose children are synthesized in `init`
    Composite {
        /// Whether `update()` stops at this control
        isolated: bool,
    },
}

impl ControlKind {
    pub fn is_composite(&self) -> bool {
        matches!(self, ControlKind::Composite { .. })
    }

    pub fn is_isolated(&self) -> bool {
        matches!(self, ControlKind::Composite { isolated: true })
    }
}

/// Declarative description of a control, consumed by `ControlTree::create`
///
/// # Example
///
/// ```ignore
/// let spec = ControlSpec::composite("counter", CounterBehavior::default())
///     .schema(PropertySchema::new().prop("value", "0"))
///     .isolated(true)
///     .on("decrement", |cx, _| {
///         cx.set("value", "-1");
///         cx.update();
///         Ok(())
///     });
/// ```
pub struct ControlSpec {
    pub(crate) kind_name: String,
    pub(crate) kind: ControlKind,
    pub(crate) schema: PropertySchema,
    pub(crate) props: Vec<(String, PropValue)>,
    pub(crate) behavior: Option<Box<dyn ControlBehavior>>,
    pub(crate) handlers: FxHashMap<String, EventHandler>,
    pub(crate) children: Vec<ControlSpec>,
}

impl ControlSpec {
    /// Declare a leaf control of the given kind
    pub fn new(kind_name: impl Into<String>) -> Self {
        Self {
            kind_name: kind_name.into(),
            kind: ControlKind::Leaf,
            schema: PropertySchema::new(),
            props: Vec::new(),
            behavior: None,
            handlers: FxHashMap::default(),
            children: Vec::new(),
        }
    }

    /// Declare a composite control driven by `behavior` (not isolated)
    pub fn composite(kind_name: impl Into<String>, behavior: impl ControlBehavior + 'static) -> Self {
        let mut spec = Self::new(kind_name);
        spec.kind = ControlKind::Composite { isolated: false };
        spec.behavior = Some(Box::new(behavior));
        spec
    }

    /// Set the isolation flag; promotes a leaf to a composite
    pub fn isolated(mut self, isolated: bool) -> Self {
        self.kind = ControlKind::Composite { isolated };
        self
    }

    /// Declared default properties
    pub fn schema(mut self, schema: PropertySchema) -> Self {
        self.schema = schema;
        self
    }

    /// Initial value overriding (or extending) the schema
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.push((name.into(), value.into()));
        self
    }

    /// Attach lifecycle hooks to a leaf control
    pub fn behavior(mut self, behavior: impl ControlBehavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Register a handler for `event`
    pub fn on<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ControlContext<'_>, &PropValue) -> anyhow::Result<()> + 'static,
    {
        self.handlers.insert(event.into(), Rc::new(handler));
        self
    }

    /// Declarative child, created together with this control
    pub fn child(mut self, child: ControlSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ControlSpec>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn kind_name(&self) -> &str {
        &self.kind_name
    }
}

impl fmt::Debug for ControlSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlSpec")
            .field("kind_name", &self.kind_name)
            .field("kind", &self.kind)
            .field("props", &self.props)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("children", &self.children.len())
            .finish()
    }
}

/// A control stored in the tree arena
pub struct ControlNode {
    pub(crate) id: ControlId,
    pub(crate) kind_name: String,
    pub(crate) kind: ControlKind,
    /// Non-owning back-reference
    pub(crate) parent: Option<ControlId>,
    pub(crate) children: SmallVec<[ControlId; 4]>,
    pub(crate) props: PropertyStore,
    pub(crate) state: LifecycleState,
    pub(crate) initialized: bool,
    pub(crate) behavior: Option<Box<dyn ControlBehavior>>,
    /// A hook of this control is on the stack
    pub(crate) hook_running: bool,
    /// Hooks requested while another hook held the behavior
    pub(crate) deferred_hooks: SmallVec<[Phase; 1]>,
    pub(crate) handlers: FxHashMap<String, EventHandler>,
}

impl ControlNode {
    pub(crate) fn from_spec(id: ControlId, spec: &mut ControlSpec, skip_unchanged: bool) -> Self {
        let mut props = PropertyStore::from_schema(&spec.schema, skip_unchanged);
        for (name, value) in spec.props.drain(..) {
            props.set(name, value);
        }
        // Initial values are the baseline delivered with the mount snapshot
        props.clear_dirty();

        Self {
            id,
            kind_name: std::mem::take(&mut spec.kind_name),
            kind: spec.kind,
            parent: None,
            children: SmallVec::new(),
            props,
            state: LifecycleState::Created,
            initialized: false,
            behavior: spec.behavior.take(),
            hook_running: false,
            deferred_hooks: SmallVec::new(),
            handlers: std::mem::take(&mut spec.handlers),
        }
    }

    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn kind_name(&self) -> &str {
        &self.kind_name
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ControlId> {
        self.parent
    }

    pub fn children(&self) -> &[ControlId] {
        &self.children
    }

    pub fn props(&self) -> &PropertyStore {
        &self.props
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_isolated(&self) -> bool {
        self.kind.is_isolated()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn has_handler(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }
}

impl fmt::Debug for ControlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlNode")
            .field("id", &self.id)
            .field("kind_name", &self.kind_name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_id_raw_roundtrip_and_display() {
        let mut ids: SlotMap<ControlId, ()> = SlotMap::with_key();
        let id = ids.insert(());

        assert_eq!(ControlId::from_raw(id.to_raw()), id);
        assert_eq!(id.to_string(), "1v1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1v1\"");
    }

    #[test]
    fn test_spec_isolated_promotes_to_composite() {
        let spec = ControlSpec::new("panel").isolated(true);
        assert!(spec.kind.is_composite());
        assert!(spec.kind.is_isolated());

        let spec = ControlSpec::new("text");
        assert!(!spec.kind.is_composite());
    }

    #[test]
    fn test_node_from_spec_applies_props_without_dirt() {
        let mut ids: SlotMap<ControlId, ()> = SlotMap::with_key();
        let id = ids.insert(());

        let mut spec = ControlSpec::new("text")
            .schema(PropertySchema::new().prop("value", "").prop("size", 14))
            .prop("value", "hi")
            .on("click", |_, _| Ok(()));

        let node = ControlNode::from_spec(id, &mut spec, true);
        assert_eq!(node.kind_name(), "text");
        assert_eq!(node.props().get("value"), Some(&PropValue::from("hi")));
        assert_eq!(node.props().get("size"), Some(&PropValue::Int(14)));
        assert!(!node.props().has_dirty());
        assert!(node.has_handler("click"));
        assert_eq!(node.state(), LifecycleState::Created);
    }
}
