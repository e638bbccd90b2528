//! Shared-reference (tags 28/29) and string-reference (tags 256/25) tables.

use log::trace;

use crate::error::DecodeError;
use crate::model::Value;

/// Values marked shareable with tag 28, indexed in order of appearance.
#[derive(Debug, Default)]
pub(crate) struct SharedRefs {
    entries: Vec<Option<Value>>,
}

impl SharedRefs {
    /// Reserves the next slot. It stays empty until the marked value (or
    /// for containers, its handle) is known.
    pub(crate) fn reserve(&mut self) -> usize {
        self.entries.push(None);
        self.entries.len() - 1
    }

    pub(crate) fn fill(&mut self, slot: usize, value: Value) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = Some(value);
        }
    }

    pub(crate) fn is_filled(&self, slot: usize) -> bool {
        matches!(self.entries.get(slot), Some(Some(_)))
    }

    pub(crate) fn get(&self, index: u64) -> Result<Value, DecodeError> {
        let entry = usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i))
            .ok_or(DecodeError::SharedRefOutOfRange {
                index,
                size: self.entries.len(),
            })?;
        trace!("resolving sharedref {}", index);
        entry
            .clone()
            .ok_or(DecodeError::IncompleteSharedRef { index })
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Stack of string tables, one per enclosing tag-256 namespace.
#[derive(Debug, Default)]
pub(crate) struct StringRefs {
    namespaces: Vec<Vec<Value>>,
}

/// Minimum string length worth recording when the table holds `index`
/// entries: the reference must be shorter than the string.
pub(crate) fn stringref_threshold(index: usize) -> usize {
    if index < 24 {
        3
    } else if index < 256 {
        4
    } else if index < 65536 {
        5
    } else if (index as u64) < (1u64 << 32) {
        7
    } else {
        11
    }
}

impl StringRefs {
    pub(crate) fn push_namespace(&mut self) {
        self.namespaces.push(Vec::new());
    }

    pub(crate) fn pop_namespace(&mut self) {
        self.namespaces.pop();
    }

    /// Records a definite-length string of `len` bytes in the innermost
    /// namespace when it reaches the threshold.
    pub(crate) fn record(&mut self, value: &Value, len: usize) {
        if let Some(table) = self.namespaces.last_mut() {
            if len >= stringref_threshold(table.len()) {
                table.push(value.clone());
            }
        }
    }

    pub(crate) fn get(&self, index: u64) -> Result<Value, DecodeError> {
        let table = self
            .namespaces
            .last()
            .ok_or(DecodeError::NoStringRefNamespace)?;
        trace!("resolving stringref {}", index);
        usize::try_from(index)
            .ok()
            .and_then(|i| table.get(i))
            .cloned()
            .ok_or(DecodeError::StringRefOutOfRange {
                index,
                size: table.len(),
            })
    }

    pub(crate) fn clear(&mut self) {
        self.namespaces.clear();
    }
}
