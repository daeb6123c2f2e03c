//! Object picking.
//!
//! Two sub-passes: redraw drawn primitives writing only their integer
//! id into the pick target (the opaque pass already seeds it; this
//! sub-pass adds translucent geometry so it is pickable too), then a
//! fullscreen sub-pass maps ids to colors for the debug view.

use std::sync::Arc;

use crate::backend::CommandRecorder;
use crate::error::RenderResult;
use crate::graph::PassId;
use crate::passes::{record_prim_chunks, ChunkEmit, FrameContext, RenderPass};

pub(crate) const PICK_ID_SHADER: &str = r#"
@fragment
fn fs_pick(@location(0) @interpolate(flat) prim_id: u32) -> @location(0) u32 {
    // Id 0 is reserved for "no primitive".
    return prim_id;
}
"#;

pub(crate) const PICK_DEBUG_SHADER: &str = r#"
@group(0) @binding(0) var pick_tex: texture_2d<u32>;

@fragment
fn fs_pick_debug(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let id = textureLoad(pick_tex, vec2<i32>(frag.xy), 0).r;
    if (id == 0u) {
        return vec4<f32>(0.0, 0.0, 0.0, 0.0);
    }
    // Hash the id into a stable debug color.
    let h = id * 2654435761u;
    return vec4<f32>(
        f32((h >> 16u) & 255u) / 255.0,
        f32((h >> 8u) & 255u) / 255.0,
        f32(h & 255u) / 255.0,
        1.0);
}
"#;

/// The pick-id + debug-visualization pass.
#[derive(Debug, Default)]
pub struct PickPass;

impl RenderPass for PickPass {
    fn id(&self) -> PassId {
        PassId::Pick
    }

    fn record(&self, ctx: &FrameContext<'_>, rec: &mut CommandRecorder) -> RenderResult<()> {
        let time = ctx.time;
        let emit: ChunkEmit = Arc::new(move |sec, _index, prim, record| {
            if !record.drawn() {
                return;
            }
            if let Some(mesh) = prim.source.mesh(time) {
                sec.draw_prim(prim.id, mesh);
            }
        });
        let lists = record_prim_chunks(ctx, "pick-id", emit);

        let attachments = ctx.attachments;
        rec.begin_pass("pick", vec![attachments.pick], Some(attachments.depth));
        rec.execute_commands(lists);
        rec.end_pass();

        rec.begin_pass("pick-debug", vec![attachments.overlay], None);
        rec.bind_pipeline("pick-debug");
        rec.draw_fullscreen();
        rec.end_pass();
        Ok(())
    }
}
