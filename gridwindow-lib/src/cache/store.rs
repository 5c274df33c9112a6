//! Sparse, index-keyed row storage

use std::collections::BTreeMap;

use super::Window;
use crate::model::Row;

/// What the store holds for a requested index.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Pending,
    Resolved(Row),
}

/// The state of a single index, as seen from outside the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// Never requested, or evicted.
    Absent,
    /// Requested, awaiting a response.
    Pending,
    /// Loaded.
    Resolved,
}

impl RowStatus {
    /// Returns `true` for pending or resolved indices.
    pub fn is_occupied(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Row store plus the believed total row count.
#[derive(Debug, Default)]
pub(crate) struct RowStore {
    slots: BTreeMap<usize, Slot>,
    length: usize,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Believed total number of rows.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn set_len(&mut self, length: usize) {
        self.length = length;
    }

    pub fn status(&self, index: usize) -> RowStatus {
        match self.slots.get(&index) {
            None => RowStatus::Absent,
            Some(Slot::Pending) => RowStatus::Pending,
            Some(Slot::Resolved(_)) => RowStatus::Resolved,
        }
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.slots.contains_key(&index)
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        match self.slots.get(&index) {
            Some(Slot::Resolved(row)) => Some(row),
            _ => None,
        }
    }

    /// Returns `true` if every index in `[from, to]` is resolved.
    ///
    /// An inverted range is vacuously loaded.
    pub fn is_range_resolved(&self, from: usize, to: usize) -> bool {
        let Some(window) = Window::new(from, to) else {
            return true;
        };
        let resolved = self
            .slots
            .range(window.indices())
            .filter(|(_, slot)| matches!(slot, Slot::Resolved(_)))
            .count();
        resolved == window.len()
    }

    /// Marks every non-resolved index of the window as pending.
    pub fn mark_pending(&mut self, window: Window) {
        for index in window.indices() {
            self.slots.entry(index).or_insert(Slot::Pending);
        }
    }

    pub fn resolve(&mut self, index: usize, row: Row) {
        self.slots.insert(index, Slot::Resolved(row.stamped(index)));
    }

    /// Removes every entry in the window, resolved or pending.
    pub fn evict(&mut self, window: Window) {
        self.remove_where(window, |_| true);
    }

    /// Removes only the pending entries in the window.
    pub fn evict_pending(&mut self, window: Window) {
        self.remove_where(window, |slot| matches!(slot, Slot::Pending));
    }

    fn remove_where(&mut self, window: Window, predicate: impl Fn(&Slot) -> bool) {
        let keys: Vec<usize> = self
            .slots
            .range(window.indices())
            .filter(|(_, slot)| predicate(slot))
            .map(|(index, _)| *index)
            .collect();
        for key in keys {
            self.slots.remove(&key);
        }
    }

    /// Removes every pending entry, wherever it is.
    pub fn evict_all_pending(&mut self) {
        self.slots.retain(|_, slot| !matches!(slot, Slot::Pending));
    }

    /// Resolved rows in `[from, to]`, in index order.
    pub fn resolved_in(&self, from: usize, to: usize) -> Vec<Row> {
        let Some(window) = Window::new(from, to) else {
            return Vec::new();
        };
        self.slots
            .range(window.indices())
            .filter_map(|(_, slot)| match slot {
                Slot::Resolved(row) => Some(row.clone()),
                Slot::Pending => None,
            })
            .collect()
    }

    /// Drops every entry and resets the believed length to 0.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.length = 0;
    }

    pub fn resolved_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Resolved(_)))
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.slots.len() - self.resolved_count()
    }
}
