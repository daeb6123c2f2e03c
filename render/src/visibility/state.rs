//! Geometry readiness state machine.
//!
//! Tracks whether primitive geometry buffers are stable enough for the
//! pass graph to sample, or still being rebuilt by background upload
//! tasks. Three states, two event kinds, no other transitions. The
//! machine is mutated only from the orchestrating thread; producers on
//! other threads deliver events through it indirectly (the upload
//! queue's counters), never by touching the state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Event delivered to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityEvent {
    /// Signed change in the number of in-flight upload tasks:
    /// `+n` when n uploads begin, `-n` when n finish.
    TaskDelta(i32),
    /// The batched resource-update submission completed and its fence
    /// signaled.
    BatchReady,
}

/// Geometry readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    /// Buffers are stable; rendering at full fidelity.
    Displaying,
    /// Upload tasks are being produced; `pending` counts those still
    /// in flight.
    PreProcessing {
        /// In-flight upload task count; always positive in this state.
        pending: i32,
    },
    /// Producers are done; a batched resource-update submission is
    /// draining the upload queue.
    PostProcessing,
}

impl VisibilityState {
    /// Apply an event. Returns the new state, or `None` when the event
    /// defines no transition from the current state (explicitly a
    /// no-op, not an error).
    pub fn process(&self, event: VisibilityEvent) -> Option<VisibilityState> {
        match (self, event) {
            (VisibilityState::Displaying, VisibilityEvent::TaskDelta(n)) if n > 0 => {
                Some(VisibilityState::PreProcessing { pending: n })
            }
            (VisibilityState::PreProcessing { pending }, VisibilityEvent::TaskDelta(n)) => {
                let pending = pending + n;
                if pending <= 0 {
                    Some(VisibilityState::PostProcessing)
                } else {
                    Some(VisibilityState::PreProcessing { pending })
                }
            }
            (VisibilityState::PostProcessing, VisibilityEvent::BatchReady) => {
                Some(VisibilityState::Displaying)
            }
            _ => None,
        }
    }

    /// Whether the pass graph may sample geometry in this state.
    pub fn render_allowed(&self) -> bool {
        matches!(self, VisibilityState::Displaying)
    }
}

/// Owns the current [`VisibilityState`] and mirrors its render gate
/// into a shared flag the frame loop checks.
pub struct VisibilityTracker {
    state: VisibilityState,
    render_allowed: Arc<AtomicBool>,
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityTracker {
    /// Start in `Displaying` with rendering allowed.
    pub fn new() -> Self {
        Self {
            state: VisibilityState::Displaying,
            render_allowed: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Current state.
    pub fn state(&self) -> VisibilityState {
        self.state
    }

    /// Deliver an event. Returns `true` when a transition happened.
    pub fn process(&mut self, event: VisibilityEvent) -> bool {
        match self.state.process(event) {
            Some(next) => {
                if next != self.state {
                    log::debug!("visibility: {:?} -> {:?} on {:?}", self.state, next, event);
                }
                self.state = next;
                self.render_allowed
                    .store(next.render_allowed(), Ordering::Release);
                true
            }
            None => {
                log::trace!("visibility: {:?} ignores {:?}", self.state, event);
                false
            }
        }
    }

    /// Whether rendering is currently allowed.
    pub fn render_allowed(&self) -> bool {
        self.render_allowed.load(Ordering::Acquire)
    }

    /// Shared handle to the render gate, for the frame loop.
    pub fn render_allowed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.render_allowed)
    }
}
