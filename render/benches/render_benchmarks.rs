use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::Instant;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use primforge_core::math::{mat4_from_translation, Vec3};
use primforge_render::backend::{DummyBackend, GpuBackend};
use primforge_render::camera::Camera;
use primforge_render::context::EditorContext;
use primforge_render::orchestrator::{FrameOrchestrator, OrchestratorConfig};
use primforge_render::scene::{MeshHandle, PrimId, Primitive, StaticPrim, TimeCode};
use primforge_render::types::Extent2d;
use primforge_render::visibility::culling::{cull_range, CullingStage};
use primforge_render::visibility::VisibilitySet;

fn scene(n: u32) -> Vec<Primitive> {
    (1..=n)
        .map(|i| {
            let x = (i % 64) as f32 * 0.5 - 16.0;
            let z = (i / 64) as f32 * 0.5 - 30.0;
            Primitive::new(
                PrimId(i),
                format!("prim-{i}"),
                Arc::new(StaticPrim::cube(
                    mat4_from_translation(Vec3::new(x, 0.0, z)),
                    MeshHandle(i as u64),
                )),
            )
        })
        .collect()
}

fn camera() -> Camera {
    Camera::perspective(
        Vec3::new(0.0, 4.0, 20.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        std::f32::consts::FRAC_PI_3,
        16.0 / 9.0,
        0.1,
        500.0,
    )
}

fn bench_culling(c: &mut Criterion) {
    let mut group = c.benchmark_group("culling");
    let camera = camera();
    for n in [256u32, 2048, 8192] {
        let set = VisibilitySet::new(scene(n));
        let stage = CullingStage::new(1024);
        let snapshot = stage.snapshot(Vec::new());
        group.bench_with_input(BenchmarkId::from_parameter(n), &set, |b, set| {
            b.iter(|| {
                set.reset_draw_states();
                let rendered = AtomicU32::new(0);
                cull_range(
                    set.prims(),
                    0..set.len(),
                    &camera,
                    TimeCode::default(),
                    &snapshot,
                    &set.drawn_flags(),
                    &rendered,
                )
            })
        });
    }
    group.finish();
}

fn bench_full_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    for n in [256u32, 2048] {
        let backend: Arc<dyn GpuBackend> = Arc::new(DummyBackend::new());
        let mut orchestrator = FrameOrchestrator::new(
            backend,
            Extent2d::new(1280, 720),
            OrchestratorConfig::default(),
        )
        .expect("orchestrator");
        orchestrator.set_visible_prims(scene(n));
        let camera = camera();
        let editor = EditorContext::roaming();

        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| {
                orchestrator
                    .render_frame(&camera, &editor, Instant::now())
                    .expect("frame")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_culling, bench_full_frame);
criterion_main!(benches);
