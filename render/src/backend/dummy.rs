//! In-memory backend used by tests and benchmarks.
//!
//! Resources are bookkeeping entries, submissions complete instantly
//! and their fences signal on submit. Every submission is kept in an
//! inspectable log so tests can assert on what a frame actually sent
//! to the device.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::backend::{
    BufferHandle, FenceHandle, GpuBackend, QueryPoolHandle, QueueKind, Submission, TextureHandle,
};
use crate::error::{RenderError, RenderResult};
use crate::types::{BufferDescriptor, TextureDescriptor};

/// One logged submission, kept for test inspection.
#[derive(Debug, Clone)]
pub struct LoggedSubmission {
    /// Submission debug name.
    pub name: &'static str,
    /// Queue it went to.
    pub queue: QueueKind,
    /// Passes begun, in order.
    pub pass_names: Vec<&'static str>,
    /// Draws issued, counting replayed secondaries.
    pub draw_count: usize,
    /// Total command count, counting replayed secondaries.
    pub command_count: usize,
}

#[derive(Default)]
struct State {
    buffers: HashMap<u64, BufferDescriptor>,
    textures: HashMap<u64, TextureDescriptor>,
    fences: HashMap<u64, bool>,
    query_pools: HashMap<u64, Vec<Option<bool>>>,
    submissions: Vec<LoggedSubmission>,
}

/// GPU-less [`GpuBackend`] implementation.
#[derive(Default)]
pub struct DummyBackend {
    next_id: AtomicU64,
    state: Mutex<State>,
}

impl DummyBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        // Start at 1 so 0 never aliases a live handle.
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Snapshot of the submission log.
    pub fn submissions(&self) -> Vec<LoggedSubmission> {
        self.state.lock().submissions.clone()
    }

    /// Number of submissions so far.
    pub fn submission_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    /// Drop the submission log (between test phases).
    pub fn clear_submissions(&self) {
        self.state.lock().submissions.clear();
    }

    /// Descriptor a texture was created with, if it is alive.
    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor> {
        self.state.lock().textures.get(&texture.0).cloned()
    }

    /// Number of live textures.
    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Number of live fences.
    pub fn live_fences(&self) -> usize {
        self.state.lock().fences.len()
    }

    /// Test hook: plant an occlusion query result.
    pub fn set_query_result(&self, pool: QueryPoolHandle, index: u32, visible: Option<bool>) {
        let mut state = self.state.lock();
        if let Some(results) = state.query_pools.get_mut(&pool.0) {
            if let Some(slot) = results.get_mut(index as usize) {
                *slot = visible;
            }
        }
    }
}

impl GpuBackend for DummyBackend {
    fn create_buffer(&self, desc: &BufferDescriptor) -> RenderResult<BufferHandle> {
        let id = self.next_id();
        log::trace!("dummy: create buffer {} ({:?})", id, desc.label);
        self.state.lock().buffers.insert(id, desc.clone());
        Ok(BufferHandle(id))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) -> RenderResult<()> {
        if self.state.lock().buffers.remove(&buffer.0).is_none() {
            return Err(RenderError::StaleHandle {
                kind: "buffer",
                id: buffer.0,
            });
        }
        Ok(())
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> RenderResult<TextureHandle> {
        let id = self.next_id();
        log::trace!(
            "dummy: create texture {} ({:?}, {}x{})",
            id,
            desc.label,
            desc.extent.width,
            desc.extent.height
        );
        self.state.lock().textures.insert(id, desc.clone());
        Ok(TextureHandle(id))
    }

    fn destroy_texture(&self, texture: TextureHandle) -> RenderResult<()> {
        if self.state.lock().textures.remove(&texture.0).is_none() {
            return Err(RenderError::StaleHandle {
                kind: "texture",
                id: texture.0,
            });
        }
        Ok(())
    }

    fn create_fence(&self, signaled: bool) -> RenderResult<FenceHandle> {
        let id = self.next_id();
        self.state.lock().fences.insert(id, signaled);
        Ok(FenceHandle(id))
    }

    fn destroy_fence(&self, fence: FenceHandle) -> RenderResult<()> {
        if self.state.lock().fences.remove(&fence.0).is_none() {
            return Err(RenderError::StaleHandle {
                kind: "fence",
                id: fence.0,
            });
        }
        Ok(())
    }

    fn reset_fence(&self, fence: FenceHandle) -> RenderResult<()> {
        match self.state.lock().fences.get_mut(&fence.0) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(RenderError::StaleHandle {
                kind: "fence",
                id: fence.0,
            }),
        }
    }

    fn is_fence_signaled(&self, fence: FenceHandle) -> RenderResult<bool> {
        match self.state.lock().fences.get(&fence.0) {
            Some(signaled) => Ok(*signaled),
            None => Err(RenderError::StaleHandle {
                kind: "fence",
                id: fence.0,
            }),
        }
    }

    fn wait_fence(
        &self,
        fence: FenceHandle,
        label: &'static str,
        timeout: Duration,
    ) -> RenderResult<()> {
        // Submissions complete on submit, so an unsignaled fence here
        // means nothing will ever signal it.
        if self.is_fence_signaled(fence)? {
            Ok(())
        } else {
            Err(RenderError::FenceWaitTimeout {
                label,
                waited_ms: timeout.as_millis() as u64,
            })
        }
    }

    fn create_query_pool(&self, count: u32) -> RenderResult<QueryPoolHandle> {
        let id = self.next_id();
        self.state
            .lock()
            .query_pools
            .insert(id, vec![None; count as usize]);
        Ok(QueryPoolHandle(id))
    }

    fn destroy_query_pool(&self, pool: QueryPoolHandle) -> RenderResult<()> {
        if self.state.lock().query_pools.remove(&pool.0).is_none() {
            return Err(RenderError::StaleHandle {
                kind: "query pool",
                id: pool.0,
            });
        }
        Ok(())
    }

    fn query_results(&self, pool: QueryPoolHandle) -> RenderResult<Vec<Option<bool>>> {
        match self.state.lock().query_pools.get(&pool.0) {
            Some(results) => Ok(results.clone()),
            None => Err(RenderError::StaleHandle {
                kind: "query pool",
                id: pool.0,
            }),
        }
    }

    fn submit(
        &self,
        submission: Submission,
        queue: QueueKind,
        fence: Option<FenceHandle>,
    ) -> RenderResult<()> {
        let logged = LoggedSubmission {
            name: submission.name,
            queue,
            pass_names: submission.commands.pass_names(),
            draw_count: submission.commands.draw_count(),
            command_count: submission.commands.total_commands(),
        };
        log::trace!(
            "dummy: submit {:?} to {:?} ({} commands, {} draws)",
            logged.name,
            queue,
            logged.command_count,
            logged.draw_count
        );

        let mut state = self.state.lock();
        state.submissions.push(logged);
        if let Some(fence) = fence {
            match state.fences.get_mut(&fence.0) {
                Some(signaled) => *signaled = true,
                None => {
                    return Err(RenderError::StaleHandle {
                        kind: "fence",
                        id: fence.0,
                    })
                }
            }
        }
        Ok(())
    }
}
