//! The seven frame passes.
//!
//! Each pass is a small struct that records its GPU work into the
//! frame's primary command recorder, reading shared per-frame state
//! from [`FrameContext`]. Geometry-heavy passes split the visibility
//! set into per-worker chunks and record secondary lists in parallel
//! through [`record_prim_chunks`].

pub mod clustering;
pub mod occlusion;
pub mod opaque;
pub mod outline;
pub mod overlay;
pub mod pick;
pub mod transparency;

use std::sync::Arc;

use crate::backend::{
    BufferHandle, CommandList, CommandRecorder, QueryPoolHandle,
};
use crate::camera::Camera;
use crate::context::EditorContext;
use crate::error::RenderResult;
use crate::frame::AttachmentSet;
use crate::graph::PassId;
use crate::scene::{Primitive, TimeCode};
use crate::scheduler::{chunk_ranges, CommandSlotPool, WorkerScheduler};
use crate::visibility::{CullingRecord, VisibilitySet};

pub use clustering::LightClusteringPass;
pub use occlusion::OcclusionQueryPass;
pub use opaque::OpaquePass;
pub use outline::OutlinePass;
pub use overlay::OverlayPass;
pub use pick::PickPass;
pub use transparency::TransparencyPass;

/// Everything a pass may read while recording one frame.
pub struct FrameContext<'a> {
    /// Viewport-sized attachments.
    pub attachments: &'a AttachmentSet,
    /// The primitives eligible this frame.
    pub set: &'a VisibilitySet,
    /// Culling outcome per primitive, same order as the set.
    pub records: &'a Arc<[CullingRecord]>,
    /// Camera snapshot.
    pub camera: &'a Camera,
    /// Scene playback position.
    pub time: TimeCode,
    /// Worker pool for parallel recording.
    pub scheduler: &'a WorkerScheduler,
    /// Per-worker secondary command slots.
    pub slots: &'a Arc<CommandSlotPool>,
    /// Editor inputs (mode, selection, focus/hover).
    pub editor: &'a EditorContext,
    /// Occlusion query pool.
    pub queries: QueryPoolHandle,
    /// Query slot per primitive index, `None` where exempt.
    pub query_slots: &'a Arc<[Option<u32>]>,
    /// Cluster-to-light-index table written by the clustering pass.
    pub cluster_buffer: BufferHandle,
    /// Per-frame camera/viewport uniforms.
    pub camera_buffer: BufferHandle,
}

/// A pass in the frame graph.
pub trait RenderPass: Send + Sync {
    /// Which graph node this implements.
    fn id(&self) -> PassId;

    /// Record this pass's work into the frame primary.
    fn record(&self, ctx: &FrameContext<'_>, rec: &mut CommandRecorder) -> RenderResult<()>;
}

/// Shader source for every pipeline name the passes bind, for the
/// backend's pipeline library.
pub fn pipeline_sources() -> &'static [(&'static str, &'static str)] {
    &[
        ("light-clustering", clustering::CLUSTERING_SHADER),
        ("opaque", opaque::OPAQUE_SHADER),
        ("wboit-accumulate", transparency::ACCUMULATE_SHADER),
        ("wboit-resolve", transparency::RESOLVE_SHADER),
        ("pick-id", pick::PICK_ID_SHADER),
        ("pick-debug", pick::PICK_DEBUG_SHADER),
        ("overlay-gather", overlay::GATHER_SHADER),
        ("overlay-wireframe", overlay::OVERLAY_DRAW_SHADER),
        ("overlay-labels", overlay::OVERLAY_DRAW_SHADER),
        ("outline-silhouette", outline::SILHOUETTE_SHADER),
        ("outline-jump-flood", outline::JUMP_FLOOD_SHADER),
        ("outline-composite", outline::COMPOSITE_SHADER),
        ("occlusion-proxy", occlusion::PROXY_SHADER),
    ]
}

/// Per-primitive recording callback used by [`record_prim_chunks`].
///
/// Invoked once per primitive, on whichever worker owns the chunk.
pub type ChunkEmit =
    Arc<dyn Fn(&mut CommandRecorder, usize, &Primitive, &CullingRecord) + Send + Sync>;

/// Record secondary lists over the visibility set, one chunk per
/// worker, and return them in primitive order.
///
/// Each secondary opens by binding `pipeline`, then runs `emit` for
/// every primitive in its contiguous chunk.
pub fn record_prim_chunks(
    ctx: &FrameContext<'_>,
    pipeline: &'static str,
    emit: ChunkEmit,
) -> Vec<CommandList> {
    let ranges = chunk_ranges(ctx.set.len(), ctx.scheduler.workers());
    for (worker, range) in ranges.into_iter().enumerate() {
        let prims = Arc::clone(ctx.set.prims());
        let records = Arc::clone(ctx.records);
        let slots = Arc::clone(ctx.slots);
        let emit = Arc::clone(&emit);
        ctx.scheduler.enqueue(
            move || {
                slots.record(worker, |sec| {
                    sec.bind_pipeline(pipeline);
                    for index in range {
                        emit(sec, index, &prims[index], &records[index]);
                    }
                });
            },
            worker,
        );
    }
    ctx.scheduler.wait();
    ctx.slots.drain_lists()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::pipeline_sources;

    #[test]
    fn pipeline_table_names_are_unique_and_sourced() {
        let table = pipeline_sources();
        let names: HashSet<_> = table.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), table.len());
        for (name, source) in table {
            assert!(!source.is_empty(), "no shader source for {name}");
        }
    }
}
