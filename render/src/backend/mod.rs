//! GPU backend abstraction.
//!
//! The render layer talks to the GPU exclusively through [`GpuBackend`].
//! Resources are referred to by opaque integer handles so the frame
//! loop, culling and pass graph can run and be tested against the
//! in-memory [`DummyBackend`] without a device present.

pub mod command;
pub mod dummy;

use std::time::Duration;

use crate::error::RenderResult;
use crate::types::{BufferDescriptor, TextureDescriptor};

pub use command::{
    Command, CommandBufferLevel, CommandList, CommandRecorder, QueueKind, Submission,
};
pub use dummy::DummyBackend;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);
    };
}

define_handle!(
    /// Opaque handle to a GPU buffer.
    BufferHandle
);
define_handle!(
    /// Opaque handle to a GPU texture.
    TextureHandle
);
define_handle!(
    /// Opaque handle to a fence.
    FenceHandle
);
define_handle!(
    /// Opaque handle to an occlusion query pool.
    QueryPoolHandle
);

/// Device-facing operations the renderer needs.
///
/// Implementations must be callable from worker threads; submission
/// and fence operations happen on the orchestrating thread only.
pub trait GpuBackend: Send + Sync + 'static {
    /// Create a buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> RenderResult<BufferHandle>;

    /// Destroy a buffer. Stale handles are an error.
    fn destroy_buffer(&self, buffer: BufferHandle) -> RenderResult<()>;

    /// Create a texture.
    fn create_texture(&self, desc: &TextureDescriptor) -> RenderResult<TextureHandle>;

    /// Destroy a texture. Stale handles are an error.
    fn destroy_texture(&self, texture: TextureHandle) -> RenderResult<()>;

    /// Create a fence, optionally already signaled.
    fn create_fence(&self, signaled: bool) -> RenderResult<FenceHandle>;

    /// Destroy a fence. Stale handles are an error.
    fn destroy_fence(&self, fence: FenceHandle) -> RenderResult<()>;

    /// Reset a fence to unsignaled.
    fn reset_fence(&self, fence: FenceHandle) -> RenderResult<()>;

    /// Non-blocking signaled check.
    fn is_fence_signaled(&self, fence: FenceHandle) -> RenderResult<bool>;

    /// Block until the fence signals.
    ///
    /// A timeout is fatal: the device has stopped making progress and
    /// the caller must propagate [`RenderError::FenceWaitTimeout`]
    /// (crate::error::RenderError::FenceWaitTimeout) rather than retry.
    fn wait_fence(
        &self,
        fence: FenceHandle,
        label: &'static str,
        timeout: Duration,
    ) -> RenderResult<()>;

    /// Create an occlusion query pool with `count` slots.
    fn create_query_pool(&self, count: u32) -> RenderResult<QueryPoolHandle>;

    /// Destroy a query pool. Stale handles are an error.
    fn destroy_query_pool(&self, pool: QueryPoolHandle) -> RenderResult<()>;

    /// Fetch results without waiting.
    ///
    /// One entry per slot; `None` where the result is not yet
    /// available, `Some(visible)` otherwise. Callers consume results a
    /// frame late by design.
    fn query_results(&self, pool: QueryPoolHandle) -> RenderResult<Vec<Option<bool>>>;

    /// Submit recorded commands to a queue.
    ///
    /// When `fence` is given it is signaled once the GPU finishes the
    /// submission.
    fn submit(
        &self,
        submission: Submission,
        queue: QueueKind,
        fence: Option<FenceHandle>,
    ) -> RenderResult<()>;
}
