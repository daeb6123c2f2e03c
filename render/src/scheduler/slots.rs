//! Per-worker secondary command buffer slots.
//!
//! Each worker records into slots drawn from its own arena, so no two
//! workers contend for a slot. Arenas rewind at frame start and keep
//! their slots across frames; steady-state recording allocates
//! nothing.

use parking_lot::Mutex;

use primforge_core::pool::SlotArena;

use crate::backend::{CommandBufferLevel, CommandList, CommandRecorder};

#[derive(Debug, Default)]
struct SecondarySlot {
    list: Option<CommandList>,
}

/// One slot arena per worker thread.
pub struct CommandSlotPool {
    workers: Vec<Mutex<SlotArena<SecondarySlot>>>,
}

impl CommandSlotPool {
    /// Create a pool for `workers` threads.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: (0..workers.max(1))
                .map(|_| Mutex::new(SlotArena::new()))
                .collect(),
        }
    }

    /// Number of worker arenas.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Rewind every arena. Called at frame start.
    pub fn reset_frame(&self) {
        for arena in &self.workers {
            arena.lock().reset();
        }
    }

    /// Record one secondary list on `worker`'s next slot.
    ///
    /// Returns the slot index within that worker's arena.
    pub fn record(&self, worker: usize, record: impl FnOnce(&mut CommandRecorder)) -> usize {
        let mut recorder = CommandRecorder::new(CommandBufferLevel::Secondary);
        record(&mut recorder);
        let list = recorder.finish();

        let mut arena = self.workers[worker % self.workers.len()].lock();
        let (index, slot) = arena.acquire(SecondarySlot::default);
        slot.list = Some(list);
        index
    }

    /// Collect every recorded list, worker-major then slot order, and
    /// leave the slots empty (but allocated) for the next phase.
    pub fn drain_lists(&self) -> Vec<CommandList> {
        let mut lists = Vec::new();
        for arena in &self.workers {
            let mut arena = arena.lock();
            let used = arena.used();
            for index in 0..used {
                if let Some(slot) = arena.get_mut(index) {
                    if let Some(list) = slot.list.take() {
                        lists.push(list);
                    }
                }
            }
            arena.reset();
        }
        lists
    }

    /// High-water mark of slots across all workers (for stats).
    pub fn slot_capacity(&self) -> usize {
        self.workers.iter().map(|a| a.lock().capacity()).sum()
    }
}
