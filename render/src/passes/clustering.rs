//! Screen-space light clustering.
//!
//! Divides the view frustum into a fixed grid of clusters and rebuilds
//! the cluster-to-light-index table the opaque pass samples while
//! shading. Runs every frame; the table is only valid for the camera
//! it was built with.

use bytemuck::{Pod, Zeroable};

use crate::backend::CommandRecorder;
use crate::error::RenderResult;
use crate::graph::PassId;
use crate::passes::{FrameContext, RenderPass};

/// Cluster grid dimensions (x, y tiles and depth slices).
pub const CLUSTER_GRID: (u32, u32, u32) = (16, 9, 24);

/// Lights referenced per cluster at most; excess lights are dropped
/// brightest-first by the shader.
pub const MAX_LIGHTS_PER_CLUSTER: u32 = 64;

/// Size of the cluster table: per cluster, a count plus
/// `MAX_LIGHTS_PER_CLUSTER` light indices, all `u32`.
pub const CLUSTER_TABLE_BYTES: u64 = (CLUSTER_GRID.0 * CLUSTER_GRID.1 * CLUSTER_GRID.2) as u64
    * (1 + MAX_LIGHTS_PER_CLUSTER as u64)
    * 4;

/// Per-frame camera block uploaded before clustering.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniforms {
    /// Column-major projection * view.
    pub view_proj: [[f32; 4]; 4],
    /// Column-major inverse projection, for cluster corner unprojection.
    pub inverse_proj: [[f32; 4]; 4],
    /// Viewport size in pixels.
    pub viewport: [f32; 2],
    /// Near and far plane distances.
    pub depth_range: [f32; 2],
}

static_assertions::const_assert_eq!(std::mem::size_of::<CameraUniforms>(), 144);

pub(crate) const CLUSTERING_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    inverse_proj: mat4x4<f32>,
    viewport: vec2<f32>,
    depth_range: vec2<f32>,
}

struct ClusterTable {
    // count followed by light indices, per cluster
    entries: array<u32>,
}

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<storage, read_write> clusters: ClusterTable;
@group(0) @binding(2) var<storage, read> light_positions: array<vec4<f32>>;

const GRID = vec3<u32>(16u, 9u, 24u);
const MAX_LIGHTS_PER_CLUSTER = 64u;

@compute @workgroup_size(1, 1, 1)
fn cluster_lights(@builtin(global_invocation_id) id: vec3<u32>) {
    if (any(id >= GRID)) {
        return;
    }
    let cluster = (id.z * GRID.y + id.y) * GRID.x + id.x;
    let base = cluster * (MAX_LIGHTS_PER_CLUSTER + 1u);
    var count = 0u;
    for (var i = 0u; i < arrayLength(&light_positions); i = i + 1u) {
        if (count >= MAX_LIGHTS_PER_CLUSTER) {
            break;
        }
        if (light_affects_cluster(light_positions[i], id)) {
            clusters.entries[base + 1u + count] = i;
            count = count + 1u;
        }
    }
    clusters.entries[base] = count;
}
"#;

/// The clustering compute pass.
#[derive(Debug, Default)]
pub struct LightClusteringPass;

impl RenderPass for LightClusteringPass {
    fn id(&self) -> PassId {
        PassId::LightClustering
    }

    fn record(&self, ctx: &FrameContext<'_>, rec: &mut CommandRecorder) -> RenderResult<()> {
        let extent = ctx.attachments.extent;
        let uniforms = CameraUniforms {
            view_proj: (*ctx.camera.view_proj()).into(),
            inverse_proj: ctx
                .camera
                .projection()
                .try_inverse()
                .unwrap_or_else(primforge_core::math::Mat4::identity)
                .into(),
            viewport: [extent.width as f32, extent.height as f32],
            depth_range: [0.0, 1.0],
        };
        rec.write_buffer(
            ctx.camera_buffer,
            0,
            bytemuck::bytes_of(&uniforms).to_vec(),
        );

        rec.begin_pass("light-clustering", vec![], None);
        rec.bind_pipeline("light-clustering");
        let (x, y, z) = CLUSTER_GRID;
        rec.dispatch(x, y, z);
        rec.end_pass();
        Ok(())
    }
}
