//! Dense component storage
//!
//! Every column is indexed by entity slot, so one index addresses the same
//! entity in all columns and a contiguous index range can be split off each
//! column independently.

use super::Component;

/// One component type stored densely by entity slot
#[derive(Debug)]
pub struct ComponentColumn<T: Component> {
    slots: Vec<Option<T>>,
}

impl<T: Component> Default for ComponentColumn<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T: Component> ComponentColumn<T> {
    /// Create an empty column
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow to `len` slots; existing slots are kept
    pub fn resize(&mut self, len: usize) {
        if self.slots.len() < len {
            self.slots.resize_with(len, || None);
        }
    }

    /// Store `value` at `index`, returning the previous occupant
    pub fn insert(&mut self, index: usize, value: T) -> Option<T> {
        self.resize(index + 1);
        self.slots[index].replace(value)
    }

    /// Clear `index`
    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Component at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Mutable component at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Number of slots, occupied or not
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the column has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of occupied slots
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// All slots
    pub fn as_slice(&self) -> &[Option<T>] {
        &self.slots
    }

    /// All slots, mutably
    pub fn as_mut_slice(&mut self) -> &mut [Option<T>] {
        &mut self.slots
    }
}
