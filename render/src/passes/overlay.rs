//! Selection/paint overlay.
//!
//! A compute sub-pass samples the pick buffer under the selection box
//! or paint brush, writing the gathered primitive/vertex ids into a
//! readback buffer for the editor, and emits index-label geometry for
//! the focused primitive. A draw sub-pass then renders the focused
//! primitive's wireframe and the labels into the overlay target.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::backend::{BufferHandle, CommandRecorder, GpuBackend};
use crate::context::EditorContext;
use crate::error::RenderResult;
use crate::graph::PassId;
use crate::passes::{FrameContext, RenderPass};
use crate::types::{BufferDescriptor, BufferUsage};

/// Vertex/primitive ids gathered per frame at most.
pub const MAX_GATHERED_IDS: u64 = 64 * 1024;

/// Pixels covered per compute workgroup axis.
const GATHER_WORKGROUP: u32 = 8;

/// Region of the pick buffer the gather compute scans.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GatherRegion {
    /// Top-left corner, pixels.
    pub min: [f32; 2],
    /// Bottom-right corner, pixels.
    pub max: [f32; 2],
    /// Brush radius; zero means box gather.
    pub radius: f32,
    /// Focused primitive id (0 for none).
    pub focused: u32,
    pub _pad: [u32; 2],
}

pub(crate) const GATHER_SHADER: &str = r#"
struct GatherRegion {
    min: vec2<f32>,
    max: vec2<f32>,
    radius: f32,
    focused: u32,
}

@group(0) @binding(0) var pick_tex: texture_2d<u32>;
@group(0) @binding(1) var<uniform> region: GatherRegion;
@group(0) @binding(2) var<storage, read_write> gathered: array<atomic<u32>>;
@group(0) @binding(3) var<storage, read_write> labels: array<vec4<f32>>;

@compute @workgroup_size(8, 8, 1)
fn gather(@builtin(global_invocation_id) id: vec3<u32>) {
    let p = region.min + vec2<f32>(id.xy);
    if (any(p > region.max)) {
        return;
    }
    if (region.radius > 0.0) {
        let center = (region.min + region.max) * 0.5;
        if (distance(p, center) > region.radius) {
            return;
        }
    }
    let prim = textureLoad(pick_tex, vec2<i32>(p), 0).r;
    if (prim != 0u) {
        let slot = atomicAdd(&gathered[0], 1u);
        atomicStore(&gathered[1u + slot], prim);
    }
    if (prim == region.focused && prim != 0u) {
        emit_label_quad(p, prim);
    }
}
"#;

pub(crate) const OVERLAY_DRAW_SHADER: &str = r#"
@fragment
fn fs_wireframe() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.6, 0.1, 1.0);
}

@fragment
fn fs_labels(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return sample_glyph_atlas(uv);
}
"#;

/// The overlay compute + draw pass.
///
/// Owns the gather buffer its compute shader fills; the editor reads
/// it back after the frame fence.
pub struct OverlayPass {
    backend: Arc<dyn GpuBackend>,
    gather_buffer: BufferHandle,
    region_buffer: BufferHandle,
}

impl OverlayPass {
    /// Create the pass and its gather/region buffers.
    pub fn new(backend: &Arc<dyn GpuBackend>) -> RenderResult<Self> {
        let gather_buffer = backend.create_buffer(&BufferDescriptor::new(
            "overlay-gather",
            (1 + MAX_GATHERED_IDS) * 4,
            BufferUsage::STORAGE | BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
        ))?;
        let region_buffer = backend.create_buffer(&BufferDescriptor::new(
            "overlay-region",
            std::mem::size_of::<GatherRegion>() as u64,
            BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        ))?;
        Ok(Self {
            backend: Arc::clone(backend),
            gather_buffer,
            region_buffer,
        })
    }

    /// The buffer the gather compute writes ids into.
    pub fn gather_buffer(&self) -> BufferHandle {
        self.gather_buffer
    }
}

impl Drop for OverlayPass {
    fn drop(&mut self) {
        let _ = self.backend.destroy_buffer(self.gather_buffer);
        let _ = self.backend.destroy_buffer(self.region_buffer);
    }
}

impl OverlayPass {
    fn gather_region(editor: &EditorContext) -> Option<GatherRegion> {
        let focused = editor.focused.map(|p| p.0).unwrap_or(0);
        if let Some(selection) = editor.selection {
            return Some(GatherRegion {
                min: [selection.min.x, selection.min.y],
                max: [selection.max.x, selection.max.y],
                radius: 0.0,
                focused,
                _pad: [0; 2],
            });
        }
        if let Some(brush) = editor.brush {
            return Some(GatherRegion {
                min: [brush.center.x - brush.radius, brush.center.y - brush.radius],
                max: [brush.center.x + brush.radius, brush.center.y + brush.radius],
                radius: brush.radius,
                focused,
                _pad: [0; 2],
            });
        }
        if focused != 0 {
            // No box or brush: still emit labels for the focused prim
            // by scanning nothing and letting the label path run on
            // the full viewport in the draw sub-pass.
            return Some(GatherRegion {
                min: [0.0, 0.0],
                max: [0.0, 0.0],
                radius: 0.0,
                focused,
                _pad: [0; 2],
            });
        }
        None
    }
}

impl RenderPass for OverlayPass {
    fn id(&self) -> PassId {
        PassId::Overlay
    }

    fn record(&self, ctx: &FrameContext<'_>, rec: &mut CommandRecorder) -> RenderResult<()> {
        let Some(region) = Self::gather_region(ctx.editor) else {
            return Ok(());
        };

        // Zero the gathered-count slot, then scan the region.
        rec.write_buffer(self.gather_buffer, 0, vec![0u8; 4]);
        rec.write_buffer(self.region_buffer, 0, bytemuck::bytes_of(&region).to_vec());
        rec.begin_pass("overlay-gather", vec![], None);
        rec.bind_pipeline("overlay-gather");
        let width = (region.max[0] - region.min[0]).max(1.0) as u32;
        let height = (region.max[1] - region.min[1]).max(1.0) as u32;
        rec.dispatch(
            width.div_ceil(GATHER_WORKGROUP),
            height.div_ceil(GATHER_WORKGROUP),
            1,
        );
        rec.end_pass();

        rec.begin_pass("overlay-draw", vec![ctx.attachments.overlay], None);
        if let Some(focused) = ctx.editor.focused {
            if let Some(prim) = ctx.set.find(focused) {
                if let Some(mesh) = prim.source.mesh(ctx.time) {
                    rec.bind_pipeline("overlay-wireframe");
                    rec.draw_prim(prim.id, mesh);
                }
                rec.bind_pipeline("overlay-labels");
                rec.draw_fullscreen();
            }
        }
        rec.end_pass();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PaintBrush, SelectionBox};
    use crate::passes::testing::Fixture;
    use crate::scene::PrimId;
    use primforge_core::math::Vec2;

    fn pass(fixture: &Fixture) -> OverlayPass {
        let backend: Arc<dyn GpuBackend> = Arc::clone(&fixture.backend) as _;
        OverlayPass::new(&backend).unwrap()
    }

    #[test]
    fn idle_editor_records_nothing() {
        let fixture = Fixture::with_cubes(2);
        let list = fixture.run_pass(&pass(&fixture));
        assert!(list.pass_names().is_empty());
    }

    #[test]
    fn selection_box_dispatches_gather() {
        let mut fixture = Fixture::with_cubes(2);
        fixture.editor.selection = Some(SelectionBox {
            min: Vec2::new(8.0, 8.0),
            max: Vec2::new(40.0, 24.0),
        });
        let list = fixture.run_pass(&pass(&fixture));
        assert_eq!(list.pass_names(), vec!["overlay-gather", "overlay-draw"]);

        let dispatch = list.commands().iter().find_map(|c| match c {
            crate::backend::Command::Dispatch { x, y, z } => Some((*x, *y, *z)),
            _ => None,
        });
        // 32x16 pixel box at workgroup size 8.
        assert_eq!(dispatch, Some((4, 2, 1)));
    }

    #[test]
    fn brush_gathers_too() {
        let mut fixture = Fixture::with_cubes(1);
        fixture.editor.brush = Some(PaintBrush {
            center: Vec2::new(32.0, 32.0),
            radius: 10.0,
        });
        let list = fixture.run_pass(&pass(&fixture));
        assert_eq!(list.pass_names(), vec!["overlay-gather", "overlay-draw"]);
    }

    #[test]
    fn focused_prim_gets_wireframe_and_labels() {
        let mut fixture = Fixture::with_cubes(3);
        fixture.editor.focused = Some(PrimId(2));
        let list = fixture.run_pass(&pass(&fixture));
        // Wireframe draw plus the label fullscreen draw.
        assert_eq!(list.draw_count(), 2);
    }

    #[test]
    fn stale_focus_id_is_ignored() {
        let mut fixture = Fixture::with_cubes(1);
        fixture.editor.focused = Some(PrimId(99));
        let list = fixture.run_pass(&pass(&fixture));
        assert_eq!(list.draw_count(), 0);
    }
}
