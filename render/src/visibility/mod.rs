//! Frame visibility: which primitives get drawn, and whether their
//! geometry is stable enough to draw at all.

pub mod culling;
pub mod set;
pub mod state;

pub use culling::{CullingRecord, CullingStage};
pub use set::VisibilitySet;
pub use state::{VisibilityEvent, VisibilityState, VisibilityTracker};
