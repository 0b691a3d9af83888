//! Per-control property storage with dirty tracking
//!
//! A [`PropertyStore`] never renders anything by itself. Handlers mutate any
//! number of properties and then call `update()` once; the update drains the
//! dirty set into a patch. This keeps batching under the caller's control.
//!
//! ```
//! use trellis_core::properties::{PropertySchema, PropertyStore};
//!
//! let schema = PropertySchema::new().prop("value", "0").prop("visible", true);
//! let mut store = PropertyStore::from_schema(&schema, true);
//!
//! store.set("value", "-1");
//! store.set("visible", true); // unchanged, not dirty
//!
//! let changes = store.drain_dirty();
//! assert_eq!(changes.len(), 1);
//! assert!(!store.has_dirty());
//! ```

use indexmap::{IndexMap, IndexSet};

use crate::value::PropValue;

/// Changed properties drained from a store, in first-dirtied order
pub type PropertyChanges = IndexMap<String, PropValue>;

/// Declared default properties for a control kind
#[derive(Clone, Debug, Default)]
pub struct PropertySchema {
    defaults: Vec<(String, PropValue)>,
}

impl PropertySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property with its default value
    pub fn prop(mut self, name: impl Into<String>, default: impl Into<PropValue>) -> Self {
        let name = name.into();
        let default = default.into();
        match self.defaults.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = default,
            None => self.defaults.push((name, default)),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.defaults.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

/// Typed key/value storage with a dirty set
#[derive(Clone, Debug)]
pub struct PropertyStore {
    values: IndexMap<String, PropValue>,
    dirty: IndexSet<String>,
    /// When true, setting an equal value leaves the dirty set untouched
    skip_unchanged: bool,
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PropertyStore {
    pub fn new(skip_unchanged: bool) -> Self {
        Self {
            values: IndexMap::new(),
            dirty: IndexSet::new(),
            skip_unchanged,
        }
    }

    /// Create a store populated with schema defaults (none of them dirty)
    pub fn from_schema(schema: &PropertySchema, skip_unchanged: bool) -> Self {
        let mut store = Self::new(skip_unchanged);
        for (name, value) in schema.iter() {
            store.values.insert(name.to_string(), value.clone());
        }
        store
    }

    /// Store a value, marking it dirty unless it is unchanged
    ///
    /// Returns true if the property is now marked dirty by this call.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropValue>) -> bool {
        let name = name.into();
        let value = value.into();

        if self.skip_unchanged && self.values.get(&name) == Some(&value) {
            return false;
        }

        tracing::trace!(property = %name, value = %value, "property set");
        self.values.insert(name.clone(), value);
        self.dirty.insert(name);
        true
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Remove a property; a removal is reported as a change to `Null`
    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        let old = self.values.shift_remove(name)?;
        self.dirty.insert(name.to_string());
        Some(old)
    }

    /// Force a property into the dirty set without changing its value
    pub fn mark_dirty(&mut self, name: &str) {
        self.dirty.insert(name.to_string());
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Return the dirty properties with their current values and clear the set
    pub fn drain_dirty(&mut self) -> PropertyChanges {
        let mut changes = PropertyChanges::with_capacity(self.dirty.len());
        for name in self.dirty.drain(..) {
            let value = self.values.get(&name).cloned().unwrap_or_default();
            changes.insert(name, value);
        }
        changes
    }

    /// Discard pending changes without reporting them
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// All current values, dirty state untouched
    pub fn snapshot(&self) -> PropertyChanges {
        self.values.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
