//! Generation-checked handles (spec §3.6, glossary "Resource handle"): a
//! `{id, generation}` pair where `id == 0` is the null handle. Destroying a
//! slot bumps its generation instead of freeing storage, so any handle
//! copied out before the destroy fails validity checks instead of quietly
//! aliasing whatever gets allocated into the same slot next.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle {
    pub id: u32,
    pub generation: u32,
}

impl Handle {
    pub const NULL: Handle = Handle { id: 0, generation: 0 };

    pub fn is_null(self) -> bool {
        self.id == 0
    }
}

struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

/// Generation-checked slot storage backing the image/buffer/pass tables.
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> HandleTable<T> {
        HandleTable { slots: Vec::new() }
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> HandleTable<T> {
        HandleTable::default()
    }

    /// Insert into the first empty slot, or append a fresh one.
    pub fn insert(&mut self, value: T) -> Handle {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.is_none() {
                slot.value = Some(value);
                return Handle {
                    id: (idx + 1) as u32,
                    generation: slot.generation,
                };
            }
        }
        self.slots.push(Slot {
            value: Some(value),
            generation: 1,
        });
        Handle {
            id: self.slots.len() as u32,
            generation: 1,
        }
    }

    /// Valid iff `id-1 < slots.len()` and the slot holds a value whose
    /// generation matches.
    pub fn is_valid(&self, handle: Handle) -> bool {
        if handle.is_null() {
            return false;
        }
        match self.slots.get(handle.id as usize - 1) {
            Some(slot) => slot.value.is_some() && slot.generation == handle.generation,
            None => false,
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.slots[handle.id as usize - 1].value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !self.is_valid(handle) {
            return None;
        }
        self.slots[handle.id as usize - 1].value.as_mut()
    }

    /// Remove the value and bump the slot's generation, invalidating every
    /// handle issued before this call.
    pub fn destroy(&mut self, handle: Handle) -> Option<T> {
        if !self.is_valid(handle) {
            return None;
        }
        let slot = &mut self.slots[handle.id as usize - 1];
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        value
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.value.as_ref().map(|v| {
                (
                    Handle {
                        id: (idx + 1) as u32,
                        generation: slot.generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(idx, slot)| {
            let generation = slot.generation;
            slot.value.as_mut().map(move |v| {
                (
                    Handle {
                        id: (idx + 1) as u32,
                        generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_invalidates_outstanding_handle() {
        let mut table: HandleTable<u32> = HandleTable::new();
        let h = table.insert(42);
        assert!(table.is_valid(h));
        assert_eq!(table.destroy(h), Some(42));
        assert!(!table.is_valid(h));
        assert!(table.get(h).is_none());
    }

    #[test]
    fn reinsertion_into_freed_slot_gets_a_new_generation() {
        let mut table: HandleTable<u32> = HandleTable::new();
        let h1 = table.insert(1);
        table.destroy(h1);
        let h2 = table.insert(2);
        assert_eq!(h1.id, h2.id);
        assert_ne!(h1.generation, h2.generation);
        assert!(!table.is_valid(h1));
        assert!(table.is_valid(h2));
    }

    #[test]
    fn null_handle_is_never_valid() {
        let table: HandleTable<u32> = HandleTable::new();
        assert!(!table.is_valid(Handle::NULL));
    }
}
