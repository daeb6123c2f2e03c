//! Per-frame-in-flight GPU resources.
//!
//! The pool owns every viewport-sized attachment the pass graph renders
//! into, plus one fence per in-flight frame slot. Attachments are
//! rebuilt wholesale on resize, never partially, and only after every
//! in-flight frame has been fenced.

pub mod resize;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{FenceHandle, GpuBackend, TextureHandle};
use crate::error::RenderResult;
use crate::types::{Extent2d, SampleCount, TextureDescriptor, TextureFormat, TextureUsage};

pub use resize::ResizeTracker;

/// Frames that may be in flight simultaneously.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// How long slot acquisition waits for a previous frame's fence.
pub const FRAME_FENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Every viewport-sized attachment the pass graph uses, built for one
/// extent and sample count.
#[derive(Debug)]
pub struct AttachmentSet {
    /// Extent all attachments share.
    pub extent: Extent2d,
    /// Sample count of the geometry attachments.
    pub samples: SampleCount,
    /// Final color target (multisampled when `samples` is).
    pub color: TextureHandle,
    /// Depth target, same sample count as color.
    pub depth: TextureHandle,
    /// Single-sample resolve target for color, present only when
    /// multisampling.
    pub color_resolve: Option<TextureHandle>,
    /// Integer pick-id target.
    pub pick: TextureHandle,
    /// Transparency premultiplied color accumulator.
    pub accum: TextureHandle,
    /// Transparency revealage target.
    pub reveal: TextureHandle,
    /// Overlay (wireframe/label) color target.
    pub overlay: TextureHandle,
    /// Jump-flood ping target.
    pub outline_ping: TextureHandle,
    /// Jump-flood pong target.
    pub outline_pong: TextureHandle,
}

impl AttachmentSet {
    fn create(
        backend: &Arc<dyn GpuBackend>,
        extent: Extent2d,
        samples: SampleCount,
    ) -> RenderResult<Self> {
        let attachment =
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::SAMPLED;
        let make = |label, format, usage, samples| {
            backend.create_texture(
                &TextureDescriptor::new_2d(label, extent, format, usage).with_samples(samples),
            )
        };

        let color = make("color", TextureFormat::Rgba16Float, attachment, samples)?;
        let depth = make(
            "depth",
            TextureFormat::Depth32Float,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::SAMPLED,
            samples,
        )?;
        let color_resolve = if samples.needs_resolve() {
            Some(make(
                "color-resolve",
                TextureFormat::Rgba16Float,
                attachment | TextureUsage::COPY_SRC,
                SampleCount::One,
            )?)
        } else {
            None
        };
        let pick = make(
            "pick",
            TextureFormat::R32Uint,
            attachment | TextureUsage::COPY_SRC | TextureUsage::STORAGE,
            SampleCount::One,
        )?;
        let accum = make(
            "transparency-accum",
            TextureFormat::Rgba16Float,
            attachment,
            SampleCount::One,
        )?;
        let reveal = make(
            "transparency-reveal",
            TextureFormat::R8Unorm,
            attachment,
            SampleCount::One,
        )?;
        let overlay = make(
            "overlay",
            TextureFormat::Rgba8Unorm,
            attachment | TextureUsage::STORAGE,
            SampleCount::One,
        )?;
        let outline_ping = make(
            "outline-ping",
            TextureFormat::Rg16Float,
            attachment,
            SampleCount::One,
        )?;
        let outline_pong = make(
            "outline-pong",
            TextureFormat::Rg16Float,
            attachment,
            SampleCount::One,
        )?;

        Ok(Self {
            extent,
            samples,
            color,
            depth,
            color_resolve,
            pick,
            accum,
            reveal,
            overlay,
            outline_ping,
            outline_pong,
        })
    }

    fn destroy(&self, backend: &Arc<dyn GpuBackend>) -> RenderResult<()> {
        for (_, handle) in self.handles() {
            backend.destroy_texture(handle)?;
        }
        Ok(())
    }

    /// Every attachment with its role name, in a fixed order.
    pub fn handles(&self) -> Vec<(&'static str, TextureHandle)> {
        let mut handles = vec![
            ("color", self.color),
            ("depth", self.depth),
        ];
        if let Some(resolve) = self.color_resolve {
            handles.push(("color-resolve", resolve));
        }
        handles.extend([
            ("pick", self.pick),
            ("transparency-accum", self.accum),
            ("transparency-reveal", self.reveal),
            ("overlay", self.overlay),
            ("outline-ping", self.outline_ping),
            ("outline-pong", self.outline_pong),
        ]);
        handles
    }

    /// The single-sample color target passes after opaque should read.
    pub fn resolved_color(&self) -> TextureHandle {
        self.color_resolve.unwrap_or(self.color)
    }
}

/// One in-flight frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    /// Slot index.
    pub index: usize,
    /// Fence guarding this slot's previous submission.
    pub fence: FenceHandle,
}

/// Result of asking the pool for the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAcquire {
    /// Render into this slot.
    Slot(FrameSlot),
    /// Viewport unusable (zero extent); skip the frame entirely.
    Skip,
    /// A debounced resize fired; call [`FrameResourcePool::rebuild`]
    /// with the new extent before rendering.
    RebuildNeeded(Extent2d),
}

/// Owns attachments and per-slot fences.
pub struct FrameResourcePool {
    backend: Arc<dyn GpuBackend>,
    attachments: Option<AttachmentSet>,
    slots: Vec<FrameSlot>,
    next_slot: usize,
    samples: SampleCount,
    resize: ResizeTracker,
}

impl FrameResourcePool {
    /// Build a pool for the given extent. A zero extent is legal and
    /// simply leaves the pool without attachments until a resize.
    pub fn new(
        backend: Arc<dyn GpuBackend>,
        extent: Extent2d,
        samples: SampleCount,
        resize: ResizeTracker,
    ) -> RenderResult<Self> {
        let attachments = if extent.is_zero() {
            None
        } else {
            Some(AttachmentSet::create(&backend, extent, samples)?)
        };
        let slots = (0..FRAMES_IN_FLIGHT)
            .map(|index| {
                Ok(FrameSlot {
                    index,
                    fence: backend.create_fence(true)?,
                })
            })
            .collect::<RenderResult<Vec<_>>>()?;
        Ok(Self {
            backend,
            attachments,
            slots,
            next_slot: 0,
            samples,
            resize,
        })
    }

    /// Current attachments, absent while the viewport is zero-sized.
    pub fn attachments(&self) -> Option<&AttachmentSet> {
        self.attachments.as_ref()
    }

    /// Current extent (zero when no attachments exist).
    pub fn extent(&self) -> Extent2d {
        self.attachments
            .as_ref()
            .map(|a| a.extent)
            .unwrap_or_default()
    }

    /// Record a surface resize event from the windowing layer.
    pub fn mark_resized(&mut self, extent: Extent2d, now: Instant) {
        log::debug!("surface resized to {}x{}", extent.width, extent.height);
        self.resize.mark_resized(extent, now);
    }

    /// Acquire the next frame slot.
    ///
    /// Waits the slot's fence so the previous submission using its
    /// resources has fully retired. A fence timeout is fatal.
    pub fn acquire(&mut self, now: Instant) -> RenderResult<FrameAcquire> {
        if let Some(extent) = self.resize.poll(now) {
            return Ok(FrameAcquire::RebuildNeeded(extent));
        }
        if self.attachments.is_none() {
            return Ok(FrameAcquire::Skip);
        }

        let slot = self.slots[self.next_slot];
        self.backend
            .wait_fence(slot.fence, "frame-slot", FRAME_FENCE_TIMEOUT)?;
        self.next_slot = (self.next_slot + 1) % self.slots.len();
        Ok(FrameAcquire::Slot(slot))
    }

    /// Reset a slot's fence just before submitting with it.
    ///
    /// Deliberately separate from [`acquire`](Self::acquire): a frame
    /// that ends up skipped must leave its fence signaled, or the next
    /// visit to the slot would wait forever.
    pub fn prepare_submit(&self, slot: FrameSlot) -> RenderResult<FenceHandle> {
        self.backend.reset_fence(slot.fence)?;
        Ok(slot.fence)
    }

    /// Tear down and recreate every attachment for a new extent.
    ///
    /// All in-flight frames are fenced before anything is destroyed.
    /// A zero extent destroys the attachments and leaves the pool in
    /// the skip-frames state.
    pub fn rebuild(&mut self, extent: Extent2d) -> RenderResult<()> {
        for slot in &self.slots {
            self.backend
                .wait_fence(slot.fence, "rebuild-idle", FRAME_FENCE_TIMEOUT)?;
        }
        if let Some(old) = self.attachments.take() {
            old.destroy(&self.backend)?;
        }
        if !extent.is_zero() {
            self.attachments = Some(AttachmentSet::create(&self.backend, extent, self.samples)?);
        }
        log::info!(
            "frame resources rebuilt for {}x{} ({:?})",
            extent.width,
            extent.height,
            self.samples
        );
        Ok(())
    }
}

impl Drop for FrameResourcePool {
    fn drop(&mut self) {
        if let Some(attachments) = self.attachments.take() {
            let _ = attachments.destroy(&self.backend);
        }
        for slot in self.slots.drain(..) {
            let _ = self.backend.destroy_fence(slot.fence);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn pool(extent: Extent2d, samples: SampleCount) -> (Arc<DummyBackend>, FrameResourcePool) {
        let backend = Arc::new(DummyBackend::new());
        let pool = FrameResourcePool::new(
            Arc::clone(&backend) as Arc<dyn GpuBackend>,
            extent,
            samples,
            ResizeTracker::new(Duration::ZERO),
        )
        .unwrap();
        (backend, pool)
    }

    fn descriptors(backend: &DummyBackend, set: &AttachmentSet) -> Vec<(&'static str, TextureDescriptor)> {
        set.handles()
            .into_iter()
            .map(|(name, handle)| (name, backend.texture_descriptor(handle).unwrap()))
            .collect()
    }

    #[test]
    fn zero_extent_pool_skips_frames() {
        let (_, mut pool) = pool(Extent2d::new(0, 0), SampleCount::One);
        assert!(pool.attachments().is_none());
        assert_eq!(pool.acquire(Instant::now()).unwrap(), FrameAcquire::Skip);
    }

    #[test]
    fn slots_alternate() {
        let (_, mut pool) = pool(Extent2d::new(64, 64), SampleCount::One);
        let now = Instant::now();
        let a = pool.acquire(now).unwrap();
        let b = pool.acquire(now).unwrap();
        assert_ne!(a, b);
        match (a, b) {
            (FrameAcquire::Slot(a), FrameAcquire::Slot(b)) => {
                assert_ne!(a.index, b.index);
            }
            other => panic!("expected two slots, got {other:?}"),
        }
    }

    #[test]
    fn resize_to_zero_and_back_matches_fresh_pool() {
        let extent = Extent2d::new(1280, 720);

        let (fresh_backend, fresh) = pool(extent, SampleCount::Four);
        let fresh_descs = descriptors(&fresh_backend, fresh.attachments().unwrap());

        let (backend, mut resized) = pool(extent, SampleCount::Four);
        resized.rebuild(Extent2d::new(0, 0)).unwrap();
        assert!(resized.attachments().is_none());
        resized.rebuild(extent).unwrap();
        let resized_descs = descriptors(&backend, resized.attachments().unwrap());

        assert_eq!(fresh_descs, resized_descs);
    }

    #[test]
    fn rebuild_destroys_old_attachments() {
        let (backend, mut pool) = pool(Extent2d::new(64, 64), SampleCount::One);
        let before = backend.live_textures();
        pool.rebuild(Extent2d::new(128, 128)).unwrap();
        assert_eq!(backend.live_textures(), before);
        assert_eq!(pool.extent(), Extent2d::new(128, 128));
    }

    #[test]
    fn msaa_pool_carries_resolve_target() {
        let (_, pool) = pool(Extent2d::new(64, 64), SampleCount::Four);
        let set = pool.attachments().unwrap();
        assert!(set.color_resolve.is_some());
        assert_eq!(set.resolved_color(), set.color_resolve.unwrap());

        let (_, pool) = self::pool(Extent2d::new(64, 64), SampleCount::One);
        let set = pool.attachments().unwrap();
        assert!(set.color_resolve.is_none());
        assert_eq!(set.resolved_color(), set.color);
    }

    #[test]
    fn debounced_resize_requests_rebuild() {
        let backend = Arc::new(DummyBackend::new()) as Arc<dyn GpuBackend>;
        let mut pool = FrameResourcePool::new(
            backend,
            Extent2d::new(64, 64),
            SampleCount::One,
            ResizeTracker::new(Duration::from_millis(50)),
        )
        .unwrap();

        let now = Instant::now();
        pool.mark_resized(Extent2d::new(256, 256), now);
        assert!(matches!(pool.acquire(now).unwrap(), FrameAcquire::Slot(_)));

        let later = now + Duration::from_millis(60);
        assert_eq!(
            pool.acquire(later).unwrap(),
            FrameAcquire::RebuildNeeded(Extent2d::new(256, 256))
        );
    }
}
