//! Fixed-capacity slot pool for combine results. Slots are recycled across
//! frames; generations catch stale handles in debug builds.

/// Handle to a pooled result. Invalidated when the slot is freed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: u32,
    generation: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub struct SlotPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    capacity: usize,
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity: 0,
        }
    }
}

impl<T> SlotPool<T> {
    pub fn init(&mut self, capacity: usize) {
        self.slots.clear();
        self.free.clear();
        self.capacity = capacity;
    }

    /// Returns `None` when the pool is exhausted; the caller logs and skips.
    pub fn alloc(&mut self, value: T) -> Option<SlotId> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Some(SlotId {
                index,
                generation: slot.generation,
            });
        }
        if self.slots.len() >= self.capacity {
            return None;
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Some(SlotId {
            index,
            generation: 0,
        })
    }

    pub fn get(&self, id: SlotId) -> &T {
        let slot = &self.slots[id.index as usize];
        debug_assert_eq!(slot.generation, id.generation, "stale slot handle");
        slot.value.as_ref().unwrap_or_else(|| panic!("freed slot"))
    }

    pub fn get_mut(&mut self, id: SlotId) -> &mut T {
        let slot = &mut self.slots[id.index as usize];
        debug_assert_eq!(slot.generation, id.generation, "stale slot handle");
        slot.value.as_mut().unwrap_or_else(|| panic!("freed slot"))
    }

    pub fn free(&mut self, id: SlotId) -> T {
        let slot = &mut self.slots[id.index as usize];
        debug_assert_eq!(slot.generation, id.generation, "stale slot handle");
        let value = slot.value.take().unwrap_or_else(|| panic!("freed slot"));
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        value
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.capacity = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_free_reuses_slots() {
        let mut pool: SlotPool<i32> = SlotPool::default();
        pool.init(2);
        let a = pool.alloc(10).unwrap();
        let b = pool.alloc(20).unwrap();
        assert!(pool.alloc(30).is_none());
        assert_eq!(pool.free(a), 10);
        let c = pool.alloc(30).unwrap();
        assert_ne!(a, c);
        assert_eq!(*pool.get(b), 20);
        assert_eq!(*pool.get(c), 30);
        assert_eq!(pool.live_count(), 2);
    }
}
