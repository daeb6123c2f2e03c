//! Per-frame statistics surfaced to the UI layer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Frame timestamps kept for the FPS window.
const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Snapshot handed to the UI once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStatsSnapshot {
    /// Frames presented over the last second.
    pub fps: u32,
    /// Primitives drawn last frame.
    pub prims_rendered: u32,
    /// Frames skipped (zero extent or render-gated) since startup.
    pub frames_skipped: u64,
}

/// Sliding-window FPS plus the shared prims-rendered counter culling
/// workers increment.
pub struct FrameStats {
    frame_times: VecDeque<Instant>,
    rendered: Arc<AtomicU32>,
    last_rendered: u32,
    frames_skipped: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStats {
    /// Fresh counters.
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::new(),
            rendered: Arc::new(AtomicU32::new(0)),
            last_rendered: 0,
            frames_skipped: 0,
        }
    }

    /// Shared counter culling workers bump per drawn primitive.
    pub fn rendered_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.rendered)
    }

    /// Reset the per-frame counter. Called before culling.
    pub fn begin_frame(&self) {
        self.rendered.store(0, Ordering::Relaxed);
    }

    /// Record a presented frame.
    pub fn end_frame(&mut self, now: Instant) {
        self.last_rendered = self.rendered.load(Ordering::Relaxed);
        self.frame_times.push_back(now);
        while let Some(&front) = self.frame_times.front() {
            if now.duration_since(front) > FPS_WINDOW {
                self.frame_times.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record a skipped frame.
    pub fn frame_skipped(&mut self) {
        self.frames_skipped += 1;
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> FrameStatsSnapshot {
        FrameStatsSnapshot {
            fps: self.frame_times.len() as u32,
            prims_rendered: self.last_rendered,
            frames_skipped: self.frames_skipped,
        }
    }
}
