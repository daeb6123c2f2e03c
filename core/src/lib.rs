//! # Primforge Core
//!
//! Core math and utility crate for the primforge scene editor:
//! nalgebra-based math aliases, bounding-volume geometry for culling,
//! and allocation-reuse pools for frame-based workloads.

pub mod geometry;
pub mod math;
pub mod pool;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
