//! Occlusion queries.
//!
//! Draws an enlarged bounding-box proxy per query-eligible primitive,
//! bracketed by query begin/end, against the opaque depth buffer with
//! color writes off. Results are read back at the start of the next
//! frame; the one-frame latency is intentional (an object becoming
//! unoccluded pops in one frame late).

use std::sync::Arc;

use crate::backend::CommandRecorder;
use crate::error::RenderResult;
use crate::graph::PassId;
use crate::passes::{record_prim_chunks, ChunkEmit, FrameContext, RenderPass};

/// Proxy boxes are scaled up so borderline-visible primitives pass.
pub const PROXY_SCALE: f32 = 1.05;

pub(crate) const PROXY_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    inverse_proj: mat4x4<f32>,
    viewport: vec2<f32>,
    depth_range: vec2<f32>,
}

@group(0) @binding(0) var<uniform> camera: Camera;

@vertex
fn vs_proxy(@location(0) corner: vec3<f32>) -> @builtin(position) vec4<f32> {
    // Corners arrive pre-enlarged; depth test only, no color writes.
    return camera.view_proj * vec4<f32>(corner, 1.0);
}
"#;

/// The occlusion-query pass.
#[derive(Debug, Default)]
pub struct OcclusionQueryPass;

impl RenderPass for OcclusionQueryPass {
    fn id(&self) -> PassId {
        PassId::OcclusionQuery
    }

    fn record(&self, ctx: &FrameContext<'_>, rec: &mut CommandRecorder) -> RenderResult<()> {
        let pool = ctx.queries;
        let query_slots = Arc::clone(ctx.query_slots);
        let emit: ChunkEmit = Arc::new(move |sec, index, prim, record| {
            if record.culled_by_frustum || record.enclosing || record.missing_mesh {
                return;
            }
            let Some(slot) = query_slots.get(index).copied().flatten() else {
                return;
            };
            sec.begin_query(pool, slot);
            sec.draw_bounds(prim.id, PROXY_SCALE);
            sec.end_query(pool, slot);
        });
        let lists = record_prim_chunks(ctx, "occlusion-proxy", emit);

        rec.begin_pass("occlusion-query", vec![], Some(ctx.attachments.depth));
        rec.execute_commands(lists);
        rec.end_pass();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Command;
    use crate::passes::testing::Fixture;

    fn query_indices(list: &crate::backend::CommandList) -> Vec<u32> {
        fn walk(list: &crate::backend::CommandList, out: &mut Vec<u32>) {
            for c in list.commands() {
                match c {
                    Command::BeginQuery { index, .. } => out.push(*index),
                    Command::ExecuteCommands { lists } => {
                        for l in lists {
                            walk(l, out);
                        }
                    }
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(list, &mut out);
        out
    }

    #[test]
    fn queries_every_assigned_slot() {
        let fixture = Fixture::with_cubes(4);
        let list = fixture.run_pass(&OcclusionQueryPass);
        assert_eq!(list.pass_names(), vec!["occlusion-query"]);
        assert_eq!(query_indices(&list), vec![0, 1, 2, 3]);
        assert_eq!(list.draw_count(), 4);
    }

    #[test]
    fn prims_without_slots_are_skipped() {
        let mut fixture = Fixture::with_cubes(3);
        fixture.query_slots = vec![Some(0), None, Some(2)].into();
        let list = fixture.run_pass(&OcclusionQueryPass);
        assert_eq!(query_indices(&list), vec![0, 2]);
    }
}
