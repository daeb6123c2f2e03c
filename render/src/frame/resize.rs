//! Resize debouncing.
//!
//! Interactive window drags deliver a burst of resize events; rebuilding
//! every attachment for each intermediate extent stalls the frame loop.
//! The tracker keeps only the latest requested extent and releases it
//! once the burst has been quiet for the debounce interval.

use std::time::{Duration, Instant};

use crate::types::Extent2d;

/// Default quiet period before a resize is acted on.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Debounced latest-wins resize request.
#[derive(Debug)]
pub struct ResizeTracker {
    pending: Option<(Extent2d, Instant)>,
    debounce: Duration,
}

impl Default for ResizeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl ResizeTracker {
    /// Create a tracker with the given quiet period.
    pub fn new(debounce: Duration) -> Self {
        Self {
            pending: None,
            debounce,
        }
    }

    /// Record a resize event; later events supersede earlier ones.
    pub fn mark_resized(&mut self, extent: Extent2d, now: Instant) {
        self.pending = Some((extent, now));
    }

    /// Whether a resize is waiting out its quiet period.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending extent if the burst has gone quiet.
    pub fn poll(&mut self, now: Instant) -> Option<Extent2d> {
        match self.pending {
            Some((extent, at)) if now.duration_since(at) >= self.debounce => {
                self.pending = None;
                Some(extent)
            }
            _ => None,
        }
    }
}
