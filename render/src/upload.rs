//! Deferred GPU resource updates.
//!
//! The scene-graph layer enqueues closures whenever a primitive's
//! GPU-visible mesh buffers change; a drain episode (run only while
//! the visibility tracker is in `PostProcessing`) executes them in
//! bounded batches against a fresh transfer submission, waits the
//! fence, and reports whether the queue emptied.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{
    CommandBufferLevel, CommandRecorder, GpuBackend, QueueKind, Submission,
};
use crate::error::RenderResult;

/// Default upper bound on closures executed per drain episode.
pub const DEFAULT_BATCH_LIMIT: usize = 512;

/// How long a drain episode waits for its fence before declaring the
/// device wedged.
pub const UPLOAD_FENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// A deferred resource-update closure.
pub type UploadTask = Box<dyn FnOnce(&mut CommandRecorder) + Send + 'static>;

/// Outcome of one drain episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Closures executed this episode.
    pub executed: usize,
    /// Whether the queue was empty when the episode finished.
    pub emptied: bool,
}

/// Multi-producer queue of deferred GPU updates, drained by exactly
/// one consumer per episode.
pub struct UploadTaskQueue {
    sender: flume::Sender<UploadTask>,
    receiver: flume::Receiver<UploadTask>,
    batch_limit: usize,
}

impl Default for UploadTaskQueue {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_LIMIT)
    }
}

impl UploadTaskQueue {
    /// Create a queue with the given per-episode batch limit.
    pub fn new(batch_limit: usize) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            batch_limit: batch_limit.max(1),
        }
    }

    /// A producer handle, cloneable across threads.
    pub fn producer(&self) -> UploadProducer {
        UploadProducer {
            sender: self.sender.clone(),
        }
    }

    /// Enqueue a closure from the current thread.
    pub fn enqueue(&self, task: UploadTask) {
        // The receiver lives as long as the queue; send cannot fail.
        let _ = self.sender.send(task);
    }

    /// Tasks currently queued.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Run one bounded drain episode.
    ///
    /// Dequeues up to the batch limit, invokes each closure with a
    /// freshly begun recorder, submits on the transfer queue and waits
    /// the submission's fence. A fence timeout is fatal and propagates;
    /// the caller must not assume buffer contents are stable after it.
    pub fn drain_episode(&self, backend: &Arc<dyn GpuBackend>) -> RenderResult<DrainReport> {
        let mut recorder = CommandRecorder::new(CommandBufferLevel::Primary);
        let mut executed = 0;
        while executed < self.batch_limit {
            match self.receiver.try_recv() {
                Ok(task) => {
                    task(&mut recorder);
                    executed += 1;
                }
                Err(_) => break,
            }
        }

        if executed > 0 {
            let fence = backend.create_fence(false)?;
            backend.submit(
                Submission::new("upload-batch", recorder.finish()),
                QueueKind::Transfer,
                Some(fence),
            )?;
            backend.wait_fence(fence, "upload-batch", UPLOAD_FENCE_TIMEOUT)?;
            backend.destroy_fence(fence)?;
            log::debug!("upload drain: {} tasks submitted and fenced", executed);
        }

        Ok(DrainReport {
            executed,
            emptied: self.receiver.is_empty(),
        })
    }
}

/// Cloneable producer side of the queue, handed to the scene layer.
#[derive(Clone)]
pub struct UploadProducer {
    sender: flume::Sender<UploadTask>,
}

impl UploadProducer {
    /// Enqueue a closure. Safe from any thread.
    pub fn enqueue(&self, task: UploadTask) {
        let _ = self.sender.send(task);
    }
}
