//! Fixed-slot object pool with stable indices
//!
//! Slots pair a reusable instance with a locked/free flag. Releasing a slot
//! never drops the instance, so buffers attached to it keep their capacity
//! for the next acquisition. A slot index identifies the object for as long
//! as it stays locked; indices never shift because slots are never removed.

/// What the per-slot callback of [`Pool::for_each_locked_mut`] wants done with the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// Keep the slot locked
    Keep,
    /// Free the slot (the instance stays allocated)
    Release,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    object: T,
    locked: bool,
}

/// A freshly acquired slot
///
/// The object still carries whatever state it had when it was last released;
/// the caller reinitializes it.
#[derive(Debug)]
pub struct Acquired<'a, T> {
    pub index: usize,
    pub object: &'a mut T,
}

/// Growable slot array for one kind of transient entity
#[derive(Debug, Clone)]
pub struct Pool<T> {
    kind: &'static str,
    slots: Vec<Slot<T>>,
    locked: usize,
    /// Lowest index that may be free
    free_hint: usize,
    /// Capacity reached by the last prefill (growth past it is logged)
    prefilled: usize,
}

impl<T> Pool<T> {
    /// Create an empty pool; `kind` names it in logs and telemetry
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            locked: 0,
            free_hint: 0,
            prefilled: 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Total number of slots (locked + free)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently in use
    pub fn locked_count(&self) -> usize {
        self.locked
    }

    /// Grow to at least `capacity` slots, creating instances with `init`
    pub fn prefill_with(&mut self, capacity: usize, mut init: impl FnMut() -> T) {
        if capacity > self.slots.len() {
            self.slots.reserve(capacity - self.slots.len());
            while self.slots.len() < capacity {
                self.slots.push(Slot {
                    object: init(),
                    locked: false,
                });
            }
        }
        self.prefilled = self.prefilled.max(capacity);
    }

    /// Lock a free slot, growing the pool with `create` when none is free
    pub fn acquire_with(&mut self, create: impl FnOnce() -> T) -> Acquired<'_, T> {
        let index = match self.find_free() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    object: create(),
                    locked: false,
                });
                if self.slots.len() > self.prefilled {
                    log::debug!(
                        "{} pool grew past prefill to {} slots",
                        self.kind,
                        self.slots.len()
                    );
                }
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.locked = true;
        self.locked += 1;
        self.free_hint = index + 1;
        Acquired {
            index,
            object: &mut slot.object,
        }
    }

    fn find_free(&self) -> Option<usize> {
        let start = self.free_hint.min(self.slots.len());
        (start..self.slots.len())
            .chain(0..start)
            .find(|&i| !self.slots[i].locked)
    }

    /// Mark a slot free. Returns false if it was not locked.
    pub fn release(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.locked => {
                slot.locked = false;
                self.locked -= 1;
                self.free_hint = self.free_hint.min(index);
                true
            }
            _ => false,
        }
    }

    /// Free every slot, including ones mid-animation
    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            slot.locked = false;
        }
        self.locked = 0;
        self.free_hint = 0;
    }

    /// The object in a locked slot
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots
            .get(index)
            .filter(|s| s.locked)
            .map(|s| &s.object)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots
            .get_mut(index)
            .filter(|s| s.locked)
            .map(|s| &mut s.object)
    }

    /// Iterate locked slots in index order
    pub fn iter_locked(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.locked)
            .map(|(i, s)| (i, &s.object))
    }

    /// Visit locked slots mutably; slots the callback reports finished are released
    pub fn for_each_locked_mut(&mut self, mut f: impl FnMut(usize, &mut T) -> SlotStatus) {
        for index in 0..self.slots.len() {
            if !self.slots[index].locked {
                continue;
            }
            if f(index, &mut self.slots[index].object) == SlotStatus::Release {
                self.release(index);
            }
        }
    }

    /// "kind: locked/total" debug line
    pub fn telemetry(&self) -> String {
        format!("{}: {}/{}", self.kind, self.locked, self.slots.len())
    }
}

impl<T: Default> Pool<T> {
    /// Grow to at least `capacity` default instances
    pub fn prefill(&mut self, capacity: usize) {
        self.prefill_with(capacity, T::default);
    }

    /// Lock a free slot, growing with a default instance when none is free
    pub fn acquire(&mut self) -> Acquired<'_, T> {
        self.acquire_with(T::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_prefill_then_acquire_distinct() {
        let mut pool: Pool<u32> = Pool::new("test");
        pool.prefill(4);
        assert_eq!(pool.capacity(), 4);

        let indices: HashSet<usize> = (0..4).map(|_| pool.acquire().index).collect();
        assert_eq!(indices.len(), 4);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.locked_count(), 4);

        // Fifth acquisition has to grow
        let fifth = pool.acquire().index;
        assert_eq!(fifth, 4);
        assert_eq!(pool.capacity(), 5);
    }

    #[test]
    fn test_release_reuses_slot_and_instance() {
        let mut pool: Pool<Vec<u8>> = Pool::new("buffers");
        pool.prefill(2);
        let first = pool.acquire();
        let index = first.index;
        first.object.extend_from_slice(&[1, 2, 3]);
        pool.acquire();

        assert!(pool.release(index));
        assert!(!pool.release(index));

        let again = pool.acquire();
        assert_eq!(again.index, index);
        // Released instance is handed back untouched
        assert_eq!(again.object.as_slice(), &[1, 2, 3]);
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn test_for_each_locked_mut_releases_finished() {
        let mut pool: Pool<i32> = Pool::new("counters");
        for value in [1, 0, 2] {
            *pool.acquire().object = value;
        }
        pool.for_each_locked_mut(|_, value| {
            *value -= 1;
            if *value <= 0 {
                SlotStatus::Release
            } else {
                SlotStatus::Keep
            }
        });
        assert_eq!(pool.locked_count(), 1);
        let remaining: Vec<_> = pool.iter_locked().map(|(i, v)| (i, *v)).collect();
        assert_eq!(remaining, vec![(2, 1)]);
    }

    #[test]
    fn test_release_all_and_telemetry() {
        let mut pool: Pool<u8> = Pool::new("particles");
        pool.prefill(3);
        pool.acquire();
        pool.acquire();
        assert_eq!(pool.telemetry(), "particles: 2/3");
        pool.release_all();
        assert_eq!(pool.locked_count(), 0);
        assert!(pool.get(0).is_none());
        assert_eq!(pool.telemetry(), "particles: 0/3");
    }

    proptest! {
        #[test]
        fn prop_indices_stay_distinct(capacity in 0usize..32, ops in proptest::collection::vec(any::<bool>(), 0..128)) {
            let mut pool: Pool<u32> = Pool::new("prop");
            pool.prefill(capacity);
            let mut held: Vec<usize> = Vec::new();
            for acquire in ops {
                if acquire || held.is_empty() {
                    let had_free = pool.locked_count() < pool.capacity();
                    let before = pool.capacity();
                    let index = pool.acquire().index;
                    prop_assert!(!held.contains(&index));
                    // Growth only happens when nothing was free
                    prop_assert_eq!(pool.capacity() == before + 1, !had_free);
                    held.push(index);
                } else {
                    let index = held.remove(0);
                    prop_assert!(pool.release(index));
                }
                prop_assert_eq!(pool.locked_count(), held.len());
            }
        }
    }
}
