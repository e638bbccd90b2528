//! Shared, mutable array and map handles.
//!
//! Cloning a handle shares the underlying storage. Handle identity (the
//! address of the shared allocation) is what the encoders use to detect
//! circular references.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::error::ArgumentError;
use crate::model::Value;

/// Insertion-ordered map storage.
pub type MapStorage = IndexMap<Value, Value, FxBuildHasher>;

// =============================================================================
// ARRAY
// =============================================================================

/// Handle to an ordered sequence of values.
#[derive(Clone, Default)]
pub struct Array(Rc<RefCell<Vec<Value>>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Array(Rc::new(RefCell::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Returns a clone of the item at `index`. Containers come back as
    /// handles to the same storage.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    /// Replaces the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<Value, ArgumentError> {
        let mut items = self.0.borrow_mut();
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(ArgumentError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, value.into()))
    }

    /// Inserts at `index`, shifting later items; `index == len` appends.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<(), ArgumentError> {
        let mut items = self.0.borrow_mut();
        if index > items.len() {
            return Err(ArgumentError::IndexOutOfBounds {
                index,
                len: items.len(),
            });
        }
        items.insert(index, value.into());
        Ok(())
    }

    pub fn remove(&self, index: usize) -> Result<Value, ArgumentError> {
        let mut items = self.0.borrow_mut();
        if index >= items.len() {
            return Err(ArgumentError::IndexOutOfBounds {
                index,
                len: items.len(),
            });
        }
        Ok(items.remove(index))
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Borrows the items. Panics if the array is mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    /// Borrows the items mutably. Panics if the array is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.borrow_mut()
    }

    /// Snapshot of the items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// True when both handles share the same storage.
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(items) => f.debug_list().entries(items.iter()).finish(),
            Err(_) => f.write_str("[<borrowed>]"),
        }
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Array::from_vec(items)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Array::from_vec(iter.into_iter().collect())
    }
}

// =============================================================================
// MAP
// =============================================================================

/// Handle to an insertion-ordered key/value map.
#[derive(Clone, Default)]
pub struct Map(Rc<RefCell<MapStorage>>);

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Map::from_storage(MapStorage::with_capacity_and_hasher(
            capacity,
            FxBuildHasher,
        ))
    }

    pub fn from_storage(entries: MapStorage) -> Self {
        Map(Rc::new(RefCell::new(entries)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.0.borrow().contains_key(key)
    }

    /// Inserts or replaces an entry. A replaced entry keeps its position.
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value.into())
    }

    /// Removes an entry, preserving the order of the rest.
    pub fn remove(&self, key: &Value) -> Option<Value> {
        self.0.borrow_mut().shift_remove(key)
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn keys(&self) -> Vec<Value> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.borrow().values().cloned().collect()
    }

    /// Snapshot of the entries in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn borrow(&self) -> Ref<'_, MapStorage> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, MapStorage> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Map) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(entries) => f.debug_map().entries(entries.iter()).finish(),
            Err(_) => f.write_str("{<borrowed>}"),
        }
    }
}

impl FromIterator<(Value, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Map::from_storage(iter.into_iter().collect())
    }
}
