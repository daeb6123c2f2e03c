//! Per-frame set of drawable primitives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::scene::{PrimId, Primitive};

/// Ordered list of primitives eligible for drawing this frame, plus a
/// parallel per-primitive drawn flag written by culling workers.
///
/// The drawn flags are atomics behind an `Arc` so culling tasks on
/// worker threads can set them without locking; the set itself is
/// rebuilt on the orchestrating thread whenever the scene selection
/// changes.
pub struct VisibilitySet {
    prims: Arc<[Primitive]>,
    drawn: Arc<[AtomicBool]>,
}

impl VisibilitySet {
    /// Build a set over the given primitives, all flags cleared.
    pub fn new(prims: Vec<Primitive>) -> Self {
        let drawn: Arc<[AtomicBool]> =
            (0..prims.len()).map(|_| AtomicBool::new(false)).collect();
        Self {
            prims: prims.into(),
            drawn,
        }
    }

    /// The primitives, in draw order.
    pub fn prims(&self) -> &Arc<[Primitive]> {
        &self.prims
    }

    /// Number of primitives (and drawn flags).
    pub fn len(&self) -> usize {
        self.prims.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }

    /// Clear every drawn flag. Called at frame start, before culling.
    ///
    /// The flag array always has exactly one entry per primitive.
    pub fn reset_draw_states(&self) {
        debug_assert_eq!(self.drawn.len(), self.prims.len());
        for flag in self.drawn.iter() {
            flag.store(false, Ordering::Relaxed);
        }
    }

    /// Shared handle to the drawn flags, for culling workers.
    pub fn drawn_flags(&self) -> Arc<[AtomicBool]> {
        Arc::clone(&self.drawn)
    }

    /// Whether primitive `index` was marked drawn this frame.
    pub fn is_drawn(&self, index: usize) -> bool {
        self.drawn[index].load(Ordering::Relaxed)
    }

    /// Indices of primitives marked drawn, in draw order.
    pub fn drawn_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.is_drawn(i)).collect()
    }

    /// Find a primitive by id.
    pub fn find(&self, id: PrimId) -> Option<&Primitive> {
        self.prims.iter().find(|p| p.id == id)
    }
}
