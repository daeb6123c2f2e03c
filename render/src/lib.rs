//! Per-frame render orchestration for the primforge scene editor.
//!
//! The crate sequences one displayed frame end to end: frustum and
//! occlusion culling over the visible primitives (in parallel across a
//! worker pool), a seven-pass dependency graph recorded into per-worker
//! secondary command lists, per-frame-in-flight attachments and fences
//! rebuilt on resize, and an explicit state machine gating rendering
//! while background geometry uploads are in flight.
//!
//! The windowing layer, UI, scene graph and scripting console are
//! external collaborators reached through the narrow interfaces in
//! [`scene`] and [`context`]; the GPU is reached through the
//! [`backend::GpuBackend`] trait, with an in-memory implementation for
//! tests.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Instant;
//! use primforge_render::backend::{DummyBackend, GpuBackend};
//! use primforge_render::camera::Camera;
//! use primforge_render::context::EditorContext;
//! use primforge_render::orchestrator::{FrameOrchestrator, OrchestratorConfig};
//! use primforge_render::types::Extent2d;
//! use primforge_core::math::Vec3;
//!
//! let backend: Arc<dyn GpuBackend> = Arc::new(DummyBackend::new());
//! let mut orchestrator = FrameOrchestrator::new(
//!     backend,
//!     Extent2d::new(1280, 720),
//!     OrchestratorConfig::default(),
//! ).unwrap();
//!
//! let camera = Camera::perspective(
//!     Vec3::new(0.0, 2.0, 8.0),
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(0.0, 1.0, 0.0),
//!     std::f32::consts::FRAC_PI_3,
//!     16.0 / 9.0,
//!     0.1,
//!     500.0,
//! );
//! orchestrator
//!     .render_frame(&camera, &EditorContext::roaming(), Instant::now())
//!     .unwrap();
//! ```

pub mod backend;
pub mod camera;
pub mod context;
pub mod error;
pub mod frame;
pub mod graph;
pub mod orchestrator;
pub mod passes;
pub mod scene;
pub mod scheduler;
pub mod stats;
pub mod types;
pub mod upload;
pub mod visibility;

pub use error::{RenderError, RenderResult};
pub use orchestrator::{FrameOrchestrator, FrameOutcome, OrchestratorConfig};
