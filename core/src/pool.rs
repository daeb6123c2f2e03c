//! Allocation-reuse containers for frame-based workloads.
//!
//! Frame loops rebuild the same scratch structures every displayed
//! frame. Dropping and reallocating them churns the allocator, so
//! [`SlotArena<T>`] keeps its slots alive across frames: reset rewinds
//! the used-count to zero without freeing anything.

/// A growable arena of reusable slots.
///
/// Slots are created on demand with a factory, handed out by index in
/// acquisition order, and never dropped on reset: [`reset`](Self::reset)
/// only rewinds the used-count to zero. This is the backing store for
/// per-worker secondary command buffer slots, where per-frame turnover
/// is high but the steady-state population is small.
#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<T>,
    used: usize,
}

impl<T> SlotArena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            used: 0,
        }
    }

    /// Create an arena pre-populated with `count` slots.
    pub fn with_slots(count: usize, mut make: impl FnMut() -> T) -> Self {
        Self {
            slots: (0..count).map(|_| make()).collect(),
            used: 0,
        }
    }

    /// Acquire the next slot, creating one if all existing slots are used.
    ///
    /// Returns the slot index and a mutable reference to it.
    pub fn acquire(&mut self, make: impl FnOnce() -> T) -> (usize, &mut T) {
        if self.used == self.slots.len() {
            self.slots.push(make());
        }
        let index = self.used;
        self.used += 1;
        (index, &mut self.slots[index])
    }

    /// Rewind the used-count to zero without dropping any slot.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Number of slots handed out since the last reset.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Total slots ever created (the high-water mark).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The slots handed out this frame, in acquisition order.
    pub fn used_slots(&self) -> &[T] {
        &self.slots[..self.used]
    }

    /// Mutable access to one slot by index (used or not).
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index)
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_grows_on_demand() {
        let mut arena = SlotArena::<u32>::new();
        assert_eq!(arena.capacity(), 0);

        let (i0, _) = arena.acquire(|| 0);
        let (i1, _) = arena.acquire(|| 0);
        assert_eq!((i0, i1), (0, 1));
        assert_eq!(arena.used(), 2);
        assert_eq!(arena.capacity(), 2);
    }

    #[test]
    fn arena_reset_reuses_slots() {
        let mut created = 0;
        let mut arena = SlotArena::<u32>::new();
        for _ in 0..4 {
            arena.acquire(|| {
                created += 1;
                created
            });
        }
        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.capacity(), 4);

        // Reacquiring after reset must not construct new slots.
        for _ in 0..4 {
            arena.acquire(|| {
                created += 1;
                created
            });
        }
        assert_eq!(created, 4);
    }

    #[test]
    fn arena_used_slots_in_order() {
        let mut arena = SlotArena::with_slots(3, || 0u32);
        for v in 10..13 {
            let (_, slot) = arena.acquire(|| 0);
            *slot = v;
        }
        assert_eq!(arena.used_slots(), &[10, 11, 12]);
    }
}
