//! Generational handles into scene storage
//!
//! Handles are lightweight references to live entities. The generational
//! index pattern prevents dangling references:
//! - Each storage slot has a generation counter
//! - When an entity is removed, its slot can be reused
//! - The generation increments on reuse, invalidating old handles
//!
//! Triggers remember which entities stood inside them last tick by handle,
//! so a deleted entity whose slot was recycled can never be mistaken for
//! the newcomer.

/// A reference to an entity slot in a [`Scene`](super::Scene).
///
/// Consists of an index (which slot in the storage) and a generation
/// (which version of that slot). Two handles with the same index but
/// different generations refer to different entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    /// Index into the slot storage
    index: u32,
    /// Generation counter - increments when slot is reused
    generation: u32,
}

impl Handle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Get the index of this handle (for slot access).
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the generation of this handle.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Allocates and tracks handle lifetimes.
///
/// Reuses freed slots with incremented generations.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    /// Generation counter for each slot
    generations: Vec<u32>,
    /// Free slots available for reuse (LIFO)
    free_indices: Vec<u32>,
    /// Next fresh index if no free slots available
    next_fresh: u32,
    /// Number of currently live handles
    alive_count: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new handle.
    pub fn allocate(&mut self) -> Handle {
        self.alive_count += 1;

        if let Some(index) = self.free_indices.pop() {
            // Generation was already incremented on free
            let generation = self.generations.get(index as usize).copied().unwrap_or(0);
            Handle::new(index, generation)
        } else {
            let index = self.next_fresh;
            self.next_fresh += 1;
            self.generations.push(0);
            Handle::new(index, 0)
        }
    }

    /// Free a handle, making its slot available for reuse.
    /// Returns true if the handle was live and is now freed.
    pub fn free(&mut self, handle: Handle) -> bool {
        if !self.is_alive(handle) {
            return false;
        }

        if let Some(generation) = self.generations.get_mut(handle.index as usize) {
            *generation += 1;
        }
        self.free_indices.push(handle.index);
        self.alive_count -= 1;
        true
    }

    /// Check if a handle still refers to a live slot.
    pub fn is_alive(&self, handle: Handle) -> bool {
        self.generations.get(handle.index as usize) == Some(&handle.generation)
    }

    /// Get the number of currently live handles.
    pub fn alive_count(&self) -> u32 {
        self.alive_count
    }
}
