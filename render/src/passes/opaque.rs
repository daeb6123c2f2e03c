//! Opaque geometry pass.
//!
//! Draws every opaque, non-culled primitive into color, depth and the
//! integer pick-id target in a single pass, shading with the cluster
//! table built by the clustering pass. Recording is parallel: one
//! secondary list per worker chunk, replayed in primitive order.

use std::sync::Arc;

use crate::backend::CommandRecorder;
use crate::error::RenderResult;
use crate::graph::PassId;
use crate::passes::{record_prim_chunks, ChunkEmit, FrameContext, RenderPass};

pub(crate) const OPAQUE_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    inverse_proj: mat4x4<f32>,
    viewport: vec2<f32>,
    depth_range: vec2<f32>,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<storage, read> clusters: array<u32>;

struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) @interpolate(flat) prim_id: u32,
}

struct FragmentOut {
    @location(0) color: vec4<f32>,
    @location(1) pick_id: u32,
}

@fragment
fn fs_main(in: VertexOut) -> FragmentOut {
    var out: FragmentOut;
    out.color = shade_clustered(in.position, in.world_normal);
    out.pick_id = in.prim_id;
    return out;
}
"#;

/// The opaque geometry pass.
#[derive(Debug, Default)]
pub struct OpaquePass;

impl RenderPass for OpaquePass {
    fn id(&self) -> PassId {
        PassId::Opaque
    }

    fn record(&self, ctx: &FrameContext<'_>, rec: &mut CommandRecorder) -> RenderResult<()> {
        let time = ctx.time;
        let emit: ChunkEmit = Arc::new(move |sec, _index, prim, record| {
            if !record.drawn() || !prim.source.is_opaque() {
                return;
            }
            if let Some(mesh) = prim.source.mesh(time) {
                sec.draw_prim(prim.id, mesh);
            }
        });
        let lists = record_prim_chunks(ctx, "opaque", emit);

        let attachments = ctx.attachments;
        rec.begin_pass(
            "opaque",
            vec![attachments.color, attachments.pick],
            Some(attachments.depth),
        );
        rec.execute_commands(lists);
        rec.end_pass();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::Fixture;
    use crate::scene::{MeshHandle, PrimId, Primitive, StaticPrim};
    use primforge_core::geometry::Aabb;
    use primforge_core::math::Mat4;

    #[test]
    fn draws_every_visible_opaque_prim() {
        let fixture = Fixture::with_cubes(5);
        let list = fixture.run_pass(&OpaquePass);
        assert_eq!(list.pass_names(), vec!["opaque"]);
        assert_eq!(list.draw_count(), 5);
    }

    #[test]
    fn skips_translucent_prims() {
        let glass = Primitive::new(
            PrimId(1),
            "glass",
            Arc::new(StaticPrim {
                transform: Mat4::identity(),
                bounds: Aabb::unit(),
                mesh: Some(MeshHandle(1)),
                opaque: false,
            }),
        );
        let fixture = Fixture::over(vec![glass]);
        let list = fixture.run_pass(&OpaquePass);
        assert_eq!(list.draw_count(), 0);
    }

    #[test]
    fn preserves_primitive_order_across_workers() {
        let fixture = Fixture::with_cubes(9);
        let list = fixture.run_pass(&OpaquePass);
        let ids: Vec<u32> = collect_draw_ids(&list);
        assert_eq!(ids, (1..=9).collect::<Vec<_>>());
    }

    fn collect_draw_ids(list: &crate::backend::CommandList) -> Vec<u32> {
        fn walk(list: &crate::backend::CommandList, out: &mut Vec<u32>) {
            for c in list.commands() {
                match c {
                    crate::backend::Command::DrawPrim { prim, .. } => out.push(prim.0),
                    crate::backend::Command::ExecuteCommands { lists } => {
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
}
