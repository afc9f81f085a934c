//! Slot storage for live entities
//!
//! `Slots<T>` is a sparse array indexed by [`Handle::index`]. It holds the
//! data; the [`HandleAllocator`](super::handle::HandleAllocator) decides
//! which handles are still valid. Lookups compare the stored generation so
//! a stale handle reads as empty even before the slot is reused.

use super::handle::Handle;

/// Sparse storage keyed by handle.
pub struct Slots<T> {
    /// Sparse array indexed by handle.index(), tagged with the owning generation
    data: Vec<Option<(u32, T)>>,
}

impl<T> Slots<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index >= self.data.len() {
            self.data.resize_with(index + 1, || None);
        }
    }

    /// Insert a value for a handle, replacing whatever was in the slot.
    pub fn insert(&mut self, handle: Handle, value: T) {
        let idx = handle.index() as usize;
        self.ensure_capacity(idx);
        if let Some(slot) = self.data.get_mut(idx) {
            *slot = Some((handle.generation(), value));
        }
    }

    /// Remove the value held for `handle`, if the generation matches.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.data.get_mut(handle.index() as usize)?;
        match slot {
            Some((generation, _)) if *generation == handle.generation() => {
                slot.take().map(|(_, value)| value)
            }
            _ => None,
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.data.get(handle.index() as usize) {
            Some(Some((generation, value))) if *generation == handle.generation() => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        match self.data.get_mut(handle.index() as usize) {
            Some(Some((generation, value))) if *generation == handle.generation() => Some(value),
            _ => None,
        }
    }
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut slots: Slots<i32> = Slots::new();
        let handle = Handle::new(5, 0);

        slots.insert(handle, 42);
        assert_eq!(slots.get(handle), Some(&42));
    }

    #[test]
    fn test_remove() {
        let mut slots: Slots<i32> = Slots::new();
        let handle = Handle::new(3, 0);

        slots.insert(handle, 100);
        assert_eq!(slots.remove(handle), Some(100));
        assert_eq!(slots.get(handle), None);
        assert_eq!(slots.remove(handle), None);
    }

    #[test]
    fn test_stale_generation_reads_empty() {
        let mut slots: Slots<&str> = Slots::new();
        slots.insert(Handle::new(2, 1), "new");

        assert_eq!(slots.get(Handle::new(2, 0)), None);
        assert_eq!(slots.remove(Handle::new(2, 0)), None);
        assert_eq!(slots.get(Handle::new(2, 1)), Some(&"new"));
    }

    #[test]
    fn test_sparse_storage() {
        let mut slots: Slots<i32> = Slots::new();

        // Insert at index 100 without filling 0-99
        let handle = Handle::new(100, 0);
        slots.insert(handle, 999);

        assert_eq!(slots.get(handle), Some(&999));
        assert_eq!(slots.get(Handle::new(50, 0)), None);
    }
}
