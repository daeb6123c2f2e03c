//! The per-frame render orchestrator.
//!
//! One instance per editor viewport. Each call to
//! [`FrameOrchestrator::render_frame`] runs the whole frame: drive any
//! pending upload drains, acquire a frame slot, cull in parallel,
//! record the pass graph and submit it behind the slot's fence. The
//! caller owns the loop; nothing here suspends or reaches for global
//! state.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{
    BufferHandle, CommandBufferLevel, CommandRecorder, GpuBackend, QueryPoolHandle, QueueKind,
    Submission,
};
use crate::camera::Camera;
use crate::context::EditorContext;
use crate::error::RenderResult;
use crate::frame::{FrameAcquire, FrameResourcePool, ResizeTracker};
use crate::graph::{PassGraph, PassId};
use crate::passes::{
    clustering, FrameContext, LightClusteringPass, OcclusionQueryPass, OpaquePass, OutlinePass,
    OverlayPass, PickPass, RenderPass, TransparencyPass,
};
use crate::scene::{PrimId, Primitive, TimeCode};
use crate::scheduler::{chunk_ranges, CommandSlotPool, WorkerScheduler, DEFAULT_WORKERS};
use crate::stats::{FrameStats, FrameStatsSnapshot};
use crate::types::{BufferDescriptor, BufferUsage, Extent2d, SampleCount};
use crate::upload::{UploadProducer, UploadTaskQueue, DEFAULT_BATCH_LIMIT};
use crate::visibility::culling::{cull_range, CullingRecord, CullingStage};
use crate::visibility::{VisibilityEvent, VisibilitySet, VisibilityState, VisibilityTracker};

/// Orchestrator construction parameters.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Worker threads for parallel recording.
    pub workers: usize,
    /// Sample count for the geometry attachments.
    pub samples: SampleCount,
    /// Occlusion query pool size; primitives beyond it simply go
    /// unqueried.
    pub query_pool_size: u32,
    /// Upload closures executed per drain episode at most.
    pub upload_batch_limit: usize,
    /// Quiet period before a resize is acted on.
    pub resize_debounce: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            samples: SampleCount::One,
            query_pool_size: 1024,
            upload_batch_limit: DEFAULT_BATCH_LIMIT,
            resize_debounce: crate::frame::resize::DEFAULT_DEBOUNCE,
        }
    }
}

impl OrchestratorConfig {
    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the sample count.
    pub fn with_samples(mut self, samples: SampleCount) -> Self {
        self.samples = samples;
        self
    }

    /// Set the upload batch limit.
    pub fn with_upload_batch_limit(mut self, limit: usize) -> Self {
        self.upload_batch_limit = limit;
        self
    }

    /// Set the resize debounce interval.
    pub fn with_resize_debounce(mut self, debounce: Duration) -> Self {
        self.resize_debounce = debounce;
        self
    }
}

/// What a call to [`FrameOrchestrator::render_frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A full frame was recorded and submitted.
    Rendered,
    /// Zero-extent viewport; nothing submitted, retried next tick.
    Skipped,
    /// Geometry uploads are still in flight; nothing submitted.
    GatedByUploads,
}

/// Owns every renderer subsystem for one viewport.
pub struct FrameOrchestrator {
    backend: Arc<dyn GpuBackend>,
    pool: FrameResourcePool,
    graph: PassGraph,
    passes: Vec<Box<dyn RenderPass>>,
    scheduler: WorkerScheduler,
    slots: Arc<CommandSlotPool>,
    culling: CullingStage,
    tracker: VisibilityTracker,
    uploads: UploadTaskQueue,
    stats: FrameStats,
    set: VisibilitySet,
    time: TimeCode,
    queries: QueryPoolHandle,
    cluster_buffer: BufferHandle,
    camera_buffer: BufferHandle,
}

impl FrameOrchestrator {
    /// Build an orchestrator rendering at `extent`.
    pub fn new(
        backend: Arc<dyn GpuBackend>,
        extent: Extent2d,
        config: OrchestratorConfig,
    ) -> RenderResult<Self> {
        let pool = FrameResourcePool::new(
            Arc::clone(&backend),
            extent,
            config.samples,
            ResizeTracker::new(config.resize_debounce),
        )?;
        let queries = backend.create_query_pool(config.query_pool_size)?;
        let cluster_buffer = backend.create_buffer(&BufferDescriptor::new(
            "light-clusters",
            clustering::CLUSTER_TABLE_BYTES,
            BufferUsage::STORAGE,
        ))?;
        let camera_buffer = backend.create_buffer(&BufferDescriptor::new(
            "camera-uniforms",
            std::mem::size_of::<clustering::CameraUniforms>() as u64,
            BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        ))?;

        let passes: Vec<Box<dyn RenderPass>> = vec![
            Box::new(LightClusteringPass),
            Box::new(OpaquePass),
            Box::new(TransparencyPass),
            Box::new(PickPass),
            Box::new(OverlayPass::new(&backend)?),
            Box::new(OutlinePass::new(&backend)?),
            Box::new(OcclusionQueryPass),
        ];

        Ok(Self {
            pool,
            graph: PassGraph::standard(),
            passes,
            scheduler: WorkerScheduler::new(config.workers),
            slots: Arc::new(CommandSlotPool::new(config.workers)),
            culling: CullingStage::new(config.query_pool_size),
            tracker: VisibilityTracker::new(),
            uploads: UploadTaskQueue::new(config.upload_batch_limit),
            stats: FrameStats::new(),
            set: VisibilitySet::new(Vec::new()),
            time: TimeCode::default(),
            queries,
            cluster_buffer,
            camera_buffer,
            backend,
        })
    }

    /// Replace the primitives eligible for drawing.
    pub fn set_visible_prims(&mut self, prims: Vec<Primitive>) {
        self.set = VisibilitySet::new(prims);
        self.culling.retain_prims(&self.set);
    }

    /// Advance the scene playback position.
    pub fn set_time(&mut self, time: TimeCode) {
        self.time = time;
    }

    /// Record a surface resize from the windowing layer.
    pub fn mark_resized(&mut self, extent: Extent2d, now: Instant) {
        self.pool.mark_resized(extent, now);
    }

    /// Producer handle for the scene layer's geometry-change stream.
    pub fn upload_producer(&self) -> UploadProducer {
        self.uploads.producer()
    }

    /// Report upload tasks starting (`delta > 0`) or finishing
    /// (`delta < 0`).
    pub fn notify_uploads(&mut self, delta: i32) {
        self.tracker.process(VisibilityEvent::TaskDelta(delta));
    }

    /// Current geometry readiness.
    pub fn visibility_state(&self) -> VisibilityState {
        self.tracker.state()
    }

    /// Shared render gate (false while uploads are in flight).
    pub fn render_allowed_flag(&self) -> Arc<AtomicBool> {
        self.tracker.render_allowed_flag()
    }

    /// UI-facing statistics.
    pub fn stats(&self) -> FrameStatsSnapshot {
        self.stats.snapshot()
    }

    /// The occlusion query pool, for debug readback.
    pub fn query_pool(&self) -> QueryPoolHandle {
        self.queries
    }

    /// The occlusion query slot currently assigned to a primitive.
    pub fn query_index(&self, id: PrimId) -> Option<u32> {
        self.culling.query_index(id)
    }

    /// Resolve a pick-buffer id to a live primitive and its label.
    ///
    /// Stale ids (the primitive left the set since the pick frame)
    /// resolve to `None` without raising.
    pub fn resolve_prim(&self, id: PrimId) -> Option<(PrimId, Arc<str>)> {
        if id == PrimId::NONE {
            return None;
        }
        self.set.find(id).map(|p| (p.id, Arc::clone(&p.label)))
    }

    /// Render one frame.
    pub fn render_frame(
        &mut self,
        camera: &Camera,
        editor: &EditorContext,
        now: Instant,
    ) -> RenderResult<FrameOutcome> {
        self.pump_uploads()?;
        if !self.tracker.render_allowed() {
            log::trace!("frame gated: uploads in flight ({:?})", self.tracker.state());
            self.stats.frame_skipped();
            return Ok(FrameOutcome::GatedByUploads);
        }

        let slot = match self.pool.acquire(now)? {
            FrameAcquire::Slot(slot) => slot,
            FrameAcquire::Skip => {
                self.stats.frame_skipped();
                return Ok(FrameOutcome::Skipped);
            }
            FrameAcquire::RebuildNeeded(extent) => {
                self.pool.rebuild(extent)?;
                match self.pool.acquire(now)? {
                    FrameAcquire::Slot(slot) => slot,
                    _ => {
                        self.stats.frame_skipped();
                        return Ok(FrameOutcome::Skipped);
                    }
                }
            }
        };

        self.stats.begin_frame();
        self.set.reset_draw_states();

        let results = self.backend.query_results(self.queries)?;
        let records = self.cull_parallel(camera, results);
        self.culling.update_query_map(&self.set, &records);
        let query_slots: Arc<[Option<u32>]> = self
            .set
            .prims()
            .iter()
            .map(|p| self.culling.query_index(p.id))
            .collect();
        let records: Arc<[CullingRecord]> = records.into();

        self.slots.reset_frame();
        let order = self.graph.compile(editor.mode)?;

        let Some(attachments) = self.pool.attachments() else {
            self.stats.frame_skipped();
            return Ok(FrameOutcome::Skipped);
        };
        let ctx = FrameContext {
            attachments,
            set: &self.set,
            records: &records,
            camera,
            time: self.time,
            scheduler: &self.scheduler,
            slots: &self.slots,
            editor,
            queries: self.queries,
            query_slots: &query_slots,
            cluster_buffer: self.cluster_buffer,
            camera_buffer: self.camera_buffer,
        };

        let mut rec = CommandRecorder::new(CommandBufferLevel::Primary);
        let queries_submitted = order.contains(&PassId::OcclusionQuery);
        for id in order {
            if let Some(pass) = self.passes.iter().find(|p| p.id() == id) {
                pass.record(&ctx, &mut rec)?;
            }
        }

        let fence = self.pool.prepare_submit(slot)?;
        self.backend.submit(
            Submission::new("frame", rec.finish()),
            QueueKind::Graphics,
            Some(fence),
        )?;
        if queries_submitted {
            self.culling.mark_queries_submitted();
        }
        self.stats.end_frame(now);
        Ok(FrameOutcome::Rendered)
    }

    /// Run upload drain episodes while the tracker is in
    /// `PostProcessing`, emitting `BatchReady` once the queue empties.
    fn pump_uploads(&mut self) -> RenderResult<()> {
        while self.tracker.state() == VisibilityState::PostProcessing {
            let report = self.uploads.drain_episode(&self.backend)?;
            log::debug!(
                "upload episode: {} executed, emptied={}",
                report.executed,
                report.emptied
            );
            if report.emptied {
                self.tracker.process(VisibilityEvent::BatchReady);
            }
        }
        Ok(())
    }

    fn cull_parallel(&self, camera: &Camera, results: Vec<Option<bool>>) -> Vec<CullingRecord> {
        let n = self.set.len();
        if n == 0 {
            return Vec::new();
        }
        let snapshot = self.culling.snapshot(results);
        let rendered = self.stats.rendered_counter();
        let drawn = self.set.drawn_flags();
        let (sender, receiver) = flume::unbounded();

        let ranges = chunk_ranges(n, self.scheduler.workers());
        let chunks = ranges.len();
        for (worker, range) in ranges.into_iter().enumerate() {
            let prims = Arc::clone(self.set.prims());
            let camera = camera.clone();
            let snapshot = Arc::clone(&snapshot);
            let drawn = Arc::clone(&drawn);
            let rendered = Arc::clone(&rendered);
            let sender = sender.clone();
            let time = self.time;
            self.scheduler.enqueue(
                move || {
                    let base = range.start;
                    let records =
                        cull_range(&prims, range, &camera, time, &snapshot, &drawn, &rendered);
                    // The receiver outlives the barrier below.
                    let _ = sender.send((base, records));
                },
                worker,
            );
        }
        self.scheduler.wait();

        let mut merged: Vec<(usize, Vec<CullingRecord>)> =
            receiver.try_iter().take(chunks).collect();
        merged.sort_by_key(|(base, _)| *base);
        let mut records = Vec::with_capacity(n);
        for (_, chunk) in merged {
            records.extend(chunk);
        }
        debug_assert_eq!(records.len(), n);
        records
    }
}

impl Drop for FrameOrchestrator {
    fn drop(&mut self) {
        let _ = self.backend.destroy_query_pool(self.queries);
        let _ = self.backend.destroy_buffer(self.cluster_buffer);
        let _ = self.backend.destroy_buffer(self.camera_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::scene::{MeshHandle, StaticPrim};
    use primforge_core::math::{mat4_from_translation, Vec3};

    fn cubes(n: u32) -> Vec<Primitive> {
        (1..=n)
            .map(|i| {
                Primitive::new(
                    PrimId(i),
                    format!("cube-{i}"),
                    Arc::new(StaticPrim::cube(
                        mat4_from_translation(Vec3::new(i as f32 * 0.1, 0.0, 0.0)),
                        MeshHandle(i as u64),
                    )),
                )
            })
            .collect()
    }

    fn camera() -> Camera {
        Camera::perspective(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            std::f32::consts::FRAC_PI_3,
            1.0,
            0.1,
            100.0,
        )
    }

    fn orchestrator(extent: Extent2d) -> (Arc<DummyBackend>, FrameOrchestrator) {
        let backend = Arc::new(DummyBackend::new());
        let orchestrator = FrameOrchestrator::new(
            Arc::clone(&backend) as Arc<dyn GpuBackend>,
            extent,
            OrchestratorConfig::default().with_workers(2),
        )
        .unwrap();
        (backend, orchestrator)
    }

    #[test]
    fn roaming_frame_submits_once() {
        let (backend, mut orchestrator) = orchestrator(Extent2d::new(64, 64));
        orchestrator.set_visible_prims(cubes(4));
        backend.clear_submissions();

        let outcome = orchestrator
            .render_frame(&camera(), &EditorContext::roaming(), Instant::now())
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered);

        let log = backend.submissions();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].queue, QueueKind::Graphics);
        assert!(log[0].pass_names.contains(&"opaque"));
        assert!(!log[0].pass_names.contains(&"pick"));
        assert_eq!(orchestrator.stats().prims_rendered, 4);
    }

    #[test]
    fn zero_extent_frame_submits_nothing() {
        let (backend, mut orchestrator) = orchestrator(Extent2d::new(0, 0));
        orchestrator.set_visible_prims(cubes(2));
        backend.clear_submissions();

        let outcome = orchestrator
            .render_frame(&camera(), &EditorContext::roaming(), Instant::now())
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(backend.submission_count(), 0);
        assert_eq!(orchestrator.stats().frames_skipped, 1);
    }

    #[test]
    fn preprocessing_gates_frames() {
        let (backend, mut orchestrator) = orchestrator(Extent2d::new(64, 64));
        orchestrator.set_visible_prims(cubes(1));
        orchestrator.notify_uploads(2);
        backend.clear_submissions();

        let outcome = orchestrator
            .render_frame(&camera(), &EditorContext::roaming(), Instant::now())
            .unwrap();
        assert_eq!(outcome, FrameOutcome::GatedByUploads);
        assert_eq!(backend.submission_count(), 0);
    }

    #[test]
    fn dropping_the_orchestrator_releases_device_resources() {
        let (backend, mut orchestrator) = orchestrator(Extent2d::new(64, 64));
        orchestrator.set_visible_prims(cubes(2));
        orchestrator
            .render_frame(&camera(), &EditorContext::roaming(), Instant::now())
            .unwrap();

        drop(orchestrator);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(backend.live_fences(), 0);
    }

    #[test]
    fn stale_pick_id_resolves_to_none() {
        let (_, mut orchestrator) = orchestrator(Extent2d::new(64, 64));
        orchestrator.set_visible_prims(cubes(2));
        assert!(orchestrator.resolve_prim(PrimId(2)).is_some());
        assert!(orchestrator.resolve_prim(PrimId(9)).is_none());
        assert!(orchestrator.resolve_prim(PrimId::NONE).is_none());
    }
}
