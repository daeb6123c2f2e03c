//! Weighted blended order-independent transparency.
//!
//! Two sub-passes: accumulate premultiplied color and a depth-based
//! weight into the accum/reveal targets (no sorting required), then a
//! fullscreen resolve blends the accumulation onto the final color.

use std::sync::Arc;

use crate::backend::CommandRecorder;
use crate::error::RenderResult;
use crate::graph::PassId;
use crate::passes::{record_prim_chunks, ChunkEmit, FrameContext, RenderPass};

pub(crate) const ACCUMULATE_SHADER: &str = r#"
struct AccumOut {
    @location(0) accum: vec4<f32>,
    @location(1) reveal: f32,
}

@fragment
fn fs_accumulate(@builtin(position) frag: vec4<f32>,
                 @location(0) color: vec4<f32>) -> AccumOut {
    // Depth-weighted premultiplied accumulation (McGuire-Bavoil).
    let w = color.a * clamp(0.03 / (1e-5 + pow(frag.z / 200.0, 4.0)), 1e-2, 3e3);
    var out: AccumOut;
    out.accum = vec4<f32>(color.rgb * color.a, color.a) * w;
    out.reveal = color.a;
    return out;
}
"#;

pub(crate) const RESOLVE_SHADER: &str = r#"
@group(0) @binding(0) var accum_tex: texture_2d<f32>;
@group(0) @binding(1) var reveal_tex: texture_2d<f32>;

@fragment
fn fs_resolve(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let coord = vec2<i32>(frag.xy);
    let accum = textureLoad(accum_tex, coord, 0);
    let reveal = textureLoad(reveal_tex, coord, 0).r;
    let color = accum.rgb / max(accum.a, 1e-5);
    return vec4<f32>(color, 1.0 - reveal);
}
"#;

/// The transparency accumulate + resolve pass.
#[derive(Debug, Default)]
pub struct TransparencyPass;

impl RenderPass for TransparencyPass {
    fn id(&self) -> PassId {
        PassId::Transparency
    }

    fn record(&self, ctx: &FrameContext<'_>, rec: &mut CommandRecorder) -> RenderResult<()> {
        let time = ctx.time;
        let emit: ChunkEmit = Arc::new(move |sec, _index, prim, record| {
            if !record.drawn() || prim.source.is_opaque() {
                return;
            }
            if let Some(mesh) = prim.source.mesh(time) {
                sec.draw_prim(prim.id, mesh);
            }
        });
        let lists = record_prim_chunks(ctx, "wboit-accumulate", emit);

        let attachments = ctx.attachments;
        rec.begin_pass(
            "transparency-accumulate",
            vec![attachments.accum, attachments.reveal],
            Some(attachments.depth),
        );
        rec.execute_commands(lists);
        rec.end_pass();

        rec.begin_pass(
            "transparency-resolve",
            vec![attachments.resolved_color()],
            None,
        );
        rec.bind_pipeline("wboit-resolve");
        rec.draw_fullscreen();
        rec.end_pass();
        Ok(())
    }
}
