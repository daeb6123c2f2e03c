//! Hover/focus outlines via jump flooding.
//!
//! Sub-pass chain: render the outlined primitives' silhouette into the
//! ping target as seed coordinates, propagate nearest-seed distances
//! with two jump-flood steps (ping to pong, pong to ping), then
//! composite a colored rim onto the final image wherever the distance
//! is within the outline width.

use std::sync::Arc;

use crate::backend::{BufferHandle, CommandRecorder, GpuBackend};
use crate::error::RenderResult;
use crate::graph::PassId;
use crate::passes::{FrameContext, RenderPass};
use crate::types::{BufferDescriptor, BufferUsage};

/// Outline width in pixels; also bounds the first jump-flood step.
pub const OUTLINE_WIDTH: u32 = 4;

pub(crate) const SILHOUETTE_SHADER: &str = r#"
@fragment
fn fs_silhouette(@builtin(position) frag: vec4<f32>) -> @location(0) vec2<f32> {
    // Seed: a covered texel stores its own coordinate.
    return frag.xy;
}
"#;

pub(crate) const JUMP_FLOOD_SHADER: &str = r#"
@group(0) @binding(0) var seeds: texture_2d<f32>;
@group(0) @binding(1) var<uniform> step_size: u32;

@fragment
fn fs_jump_flood(@builtin(position) frag: vec4<f32>) -> @location(0) vec2<f32> {
    var best = textureLoad(seeds, vec2<i32>(frag.xy), 0).xy;
    var best_dist = seed_distance(frag.xy, best);
    for (var dy = -1; dy <= 1; dy = dy + 1) {
        for (var dx = -1; dx <= 1; dx = dx + 1) {
            let coord = vec2<i32>(frag.xy) + vec2<i32>(dx, dy) * i32(step_size);
            let seed = textureLoad(seeds, coord, 0).xy;
            let dist = seed_distance(frag.xy, seed);
            if (dist < best_dist) {
                best = seed;
                best_dist = dist;
            }
        }
    }
    return best;
}
"#;

pub(crate) const COMPOSITE_SHADER: &str = r#"
@group(0) @binding(0) var distances: texture_2d<f32>;

@fragment
fn fs_composite(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let seed = textureLoad(distances, vec2<i32>(frag.xy), 0).xy;
    let dist = distance(frag.xy, seed);
    if (dist < 0.5 || dist > 4.0) {
        discard;
    }
    return vec4<f32>(1.0, 0.55, 0.0, 1.0 - dist / 4.0);
}
"#;

/// The outline pass.
///
/// Owns the uniform buffer the flood steps read their step size from.
pub struct OutlinePass {
    backend: Arc<dyn GpuBackend>,
    step_buffer: BufferHandle,
}

impl OutlinePass {
    /// Create the pass and its step-size uniform buffer.
    pub fn new(backend: &Arc<dyn GpuBackend>) -> RenderResult<Self> {
        let step_buffer = backend.create_buffer(&BufferDescriptor::new(
            "outline-step",
            4,
            BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        ))?;
        Ok(Self {
            backend: Arc::clone(backend),
            step_buffer,
        })
    }
}

impl Drop for OutlinePass {
    fn drop(&mut self) {
        let _ = self.backend.destroy_buffer(self.step_buffer);
    }
}

impl RenderPass for OutlinePass {
    fn id(&self) -> PassId {
        PassId::Outline
    }

    fn record(&self, ctx: &FrameContext<'_>, rec: &mut CommandRecorder) -> RenderResult<()> {
        let outlined = ctx.editor.outlined_prims();
        if outlined.is_empty() {
            return Ok(());
        }

        let attachments = ctx.attachments;

        rec.begin_pass("outline-silhouette", vec![attachments.outline_ping], None);
        rec.bind_pipeline("outline-silhouette");
        let mut seeded = false;
        for id in outlined {
            let Some(prim) = ctx.set.find(id) else {
                continue;
            };
            if let Some(mesh) = prim.source.mesh(ctx.time) {
                rec.draw_prim(prim.id, mesh);
                seeded = true;
            }
        }
        rec.end_pass();
        if !seeded {
            // Both ids went stale mid-frame; nothing to flood.
            return Ok(());
        }

        // Two flood steps: a wide hop bounded by the outline width,
        // then a single-texel refinement.
        for (target, step) in [
            (attachments.outline_pong, OUTLINE_WIDTH),
            (attachments.outline_ping, 1),
        ] {
            rec.write_buffer(self.step_buffer, 0, step.to_le_bytes().to_vec());
            rec.begin_pass("outline-jump-flood", vec![target], None);
            rec.bind_pipeline("outline-jump-flood");
            rec.draw_fullscreen();
            rec.end_pass();
        }

        rec.begin_pass(
            "outline-composite",
            vec![attachments.resolved_color()],
            None,
        );
        rec.bind_pipeline("outline-composite");
        rec.draw_fullscreen();
        rec.end_pass();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::Fixture;
    use crate::scene::PrimId;

    fn pass(fixture: &Fixture) -> OutlinePass {
        let backend: Arc<dyn GpuBackend> = Arc::clone(&fixture.backend) as _;
        OutlinePass::new(&backend).unwrap()
    }

    #[test]
    fn no_outline_without_hover_or_focus() {
        let fixture = Fixture::with_cubes(2);
        let list = fixture.run_pass(&pass(&fixture));
        assert!(list.pass_names().is_empty());
    }

    #[test]
    fn hovered_prim_runs_full_chain() {
        let mut fixture = Fixture::with_cubes(2);
        fixture.editor.hovered = Some(PrimId(1));
        let list = fixture.run_pass(&pass(&fixture));
        assert_eq!(
            list.pass_names(),
            vec![
                "outline-silhouette",
                "outline-jump-flood",
                "outline-jump-flood",
                "outline-composite",
            ]
        );
        // One silhouette draw plus three fullscreen draws.
        assert_eq!(list.draw_count(), 4);
    }

    #[test]
    fn stale_ids_skip_the_flood() {
        let mut fixture = Fixture::with_cubes(1);
        fixture.editor.hovered = Some(PrimId(7));
        fixture.editor.focused = Some(PrimId(8));
        let list = fixture.run_pass(&pass(&fixture));
        assert_eq!(list.pass_names(), vec!["outline-silhouette"]);
    }
}
