//! Frustum and occlusion culling.
//!
//! Runs once per frame over the [`VisibilitySet`], in parallel across
//! contiguous chunks. Each chunk produces plain [`CullingRecord`]s and
//! flips the shared drawn flags atomically; the single-threaded
//! bookkeeping afterwards maintains the primitive-to-occlusion-query
//! slot map.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use primforge_core::geometry::Aabb;

use crate::camera::Camera;
use crate::scene::{PrimId, Primitive, TimeCode};
use crate::visibility::set::VisibilitySet;

/// Per-primitive culling outcome for one frame.
#[derive(Debug, Clone)]
pub struct CullingRecord {
    /// Bounding box entirely outside the frustum.
    pub culled_by_frustum: bool,
    /// Hidden according to the last available occlusion-query result
    /// (one frame late by design).
    pub occluded: bool,
    /// The camera sits inside this primitive's bounds; exempt from
    /// occlusion testing.
    pub enclosing: bool,
    /// No mesh exists at the current time code; treated as invisible.
    pub missing_mesh: bool,
    /// World-space bounds at the current time code.
    pub world_bounds: Aabb,
}

impl CullingRecord {
    /// Whether the primitive gets drawn this frame.
    pub fn drawn(&self) -> bool {
        !self.culled_by_frustum && !self.occluded && !self.missing_mesh
    }

    /// Whether the primitive should get an occlusion query this frame.
    /// Enclosing primitives are excluded: an object cannot occlude a
    /// camera that is inside it, and its own proxy draw would report
    /// it hidden.
    pub fn wants_query(&self) -> bool {
        !self.culled_by_frustum && !self.missing_mesh && !self.enclosing
    }
}

/// Last frame's occlusion results, frozen for worker threads.
///
/// Maps a primitive to its query slot and that slot's result;
/// `None` results (still in flight) count as visible.
#[derive(Debug, Default)]
pub struct OcclusionSnapshot {
    slots: HashMap<PrimId, u32>,
    results: Vec<Option<bool>>,
}

impl OcclusionSnapshot {
    /// Whether the primitive was reported fully hidden last frame.
    pub fn occluded(&self, id: PrimId) -> bool {
        self.slots
            .get(&id)
            .and_then(|&slot| self.results.get(slot as usize).copied().flatten())
            .map(|visible| !visible)
            .unwrap_or(false)
    }
}

/// Cull one contiguous chunk of the visibility set.
///
/// Pure over its inputs apart from the atomic drawn flags and rendered
/// counter, so chunks can run on any worker thread.
pub fn cull_range(
    prims: &[Primitive],
    range: Range<usize>,
    camera: &Camera,
    time: TimeCode,
    occlusion: &OcclusionSnapshot,
    drawn: &[AtomicBool],
    rendered: &AtomicU32,
) -> Vec<CullingRecord> {
    let mut records = Vec::with_capacity(range.len());
    for index in range {
        let prim = &prims[index];
        let world_bounds = prim.world_bounds(time);
        let missing_mesh = prim.source.mesh(time).is_none();
        let culled_by_frustum = !camera.frustum().intersects_aabb(&world_bounds);
        let enclosing = !culled_by_frustum && camera.encloses(&world_bounds);
        let occluded =
            !culled_by_frustum && !enclosing && !missing_mesh && occlusion.occluded(prim.id);

        let record = CullingRecord {
            culled_by_frustum,
            occluded,
            enclosing,
            missing_mesh,
            world_bounds,
        };
        if record.drawn() {
            drawn[index].store(true, Ordering::Relaxed);
            rendered.fetch_add(1, Ordering::Relaxed);
        }
        records.push(record);
    }
    records
}

/// Frame-to-frame culling state: the occlusion-query slot map, its
/// free list, and the recycled slots whose pooled result still belongs
/// to a departed primitive.
pub struct CullingStage {
    query_slots: HashMap<PrimId, u32>,
    free_slots: Vec<u32>,
    stale_slots: HashSet<u32>,
    next_slot: u32,
    capacity: u32,
}

impl CullingStage {
    /// Create a stage whose query pool has `capacity` slots.
    pub fn new(capacity: u32) -> Self {
        Self {
            query_slots: HashMap::new(),
            free_slots: Vec::new(),
            stale_slots: HashSet::new(),
            next_slot: 0,
            capacity,
        }
    }

    /// Query pool capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The query slot assigned to a primitive, if any.
    pub fn query_index(&self, id: PrimId) -> Option<u32> {
        self.query_slots.get(&id).copied()
    }

    /// Freeze last frame's results for this frame's culling workers.
    ///
    /// Recycled slots are masked to "in flight" until a fresh query
    /// lands for their new owner, so a primitive never inherits the
    /// verdict of whichever one held the slot before it.
    pub fn snapshot(&self, mut results: Vec<Option<bool>>) -> Arc<OcclusionSnapshot> {
        for &slot in &self.stale_slots {
            if let Some(result) = results.get_mut(slot as usize) {
                *result = None;
            }
        }
        Arc::new(OcclusionSnapshot {
            slots: self.query_slots.clone(),
            results,
        })
    }

    /// Note that fresh queries were recorded for every assigned slot
    /// this frame; their next pooled results are authoritative again.
    pub fn mark_queries_submitted(&mut self) {
        for slot in self.query_slots.values() {
            self.stale_slots.remove(slot);
        }
    }

    /// Reconcile the slot map with this frame's culling records.
    ///
    /// Frustum-culled, camera-enclosed and meshless primitives lose
    /// their slot (recycled through the free list); drawable ones gain
    /// a slot while the pool has room. Runs on the orchestrating
    /// thread only, after the parallel chunks have merged.
    pub fn update_query_map(&mut self, set: &VisibilitySet, records: &[CullingRecord]) {
        debug_assert_eq!(records.len(), set.len());
        for (prim, record) in set.prims().iter().zip(records) {
            if record.wants_query() {
                if !self.query_slots.contains_key(&prim.id) {
                    if let Some(slot) = self.allocate_slot() {
                        self.query_slots.insert(prim.id, slot);
                    }
                }
            } else if let Some(slot) = self.query_slots.remove(&prim.id) {
                self.free_slots.push(slot);
                self.stale_slots.insert(slot);
            }
        }
    }

    /// Drop slot assignments for primitives no longer in the set.
    pub fn retain_prims(&mut self, set: &VisibilitySet) {
        let free_slots = &mut self.free_slots;
        let stale_slots = &mut self.stale_slots;
        self.query_slots.retain(|id, slot| {
            if set.find(*id).is_some() {
                true
            } else {
                free_slots.push(*slot);
                stale_slots.insert(*slot);
                false
            }
        });
    }

    /// Primitives with a query slot this frame, as (prim index, slot).
    pub fn query_assignments(&self, set: &VisibilitySet) -> Vec<(usize, u32)> {
        set.prims()
            .iter()
            .enumerate()
            .filter_map(|(i, prim)| self.query_slots.get(&prim.id).map(|&slot| (i, slot)))
            .collect()
    }

    fn allocate_slot(&mut self) -> Option<u32> {
        if let Some(slot) = self.free_slots.pop() {
            return Some(slot);
        }
        if self.next_slot < self.capacity {
            let slot = self.next_slot;
            self.next_slot += 1;
            Some(slot)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MeshHandle, StaticPrim};
    use primforge_core::math::{mat4_from_translation, Mat4, Vec3};

    fn camera() -> Camera {
        Camera::perspective(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            std::f32::consts::FRAC_PI_3,
            16.0 / 9.0,
            0.1,
            100.0,
        )
    }

    fn prim_at(id: u32, position: Vec3) -> Primitive {
        Primitive::new(
            PrimId(id),
            format!("prim-{id}"),
            Arc::new(StaticPrim::cube(
                mat4_from_translation(position),
                MeshHandle(id as u64),
            )),
        )
    }

    fn cull_all(set: &VisibilitySet, camera: &Camera, stage: &CullingStage) -> Vec<CullingRecord> {
        let rendered = AtomicU32::new(0);
        set.reset_draw_states();
        cull_range(
            set.prims(),
            0..set.len(),
            camera,
            TimeCode::default(),
            &stage.snapshot(Vec::new()),
            &set.drawn_flags(),
            &rendered,
        )
    }

    #[test]
    fn visible_prim_is_drawn_and_counted() {
        let set = VisibilitySet::new(vec![prim_at(1, Vec3::new(0.0, 0.0, 0.0))]);
        let stage = CullingStage::new(16);
        let records = cull_all(&set, &camera(), &stage);
        assert!(records[0].drawn());
        assert!(set.is_drawn(0));
    }

    #[test]
    fn frustum_culling_is_stable_for_fixed_camera() {
        let set = VisibilitySet::new(vec![prim_at(1, Vec3::new(0.0, 0.0, 50.0))]);
        let stage = CullingStage::new(16);
        let camera = camera();
        for _ in 0..3 {
            let records = cull_all(&set, &camera, &stage);
            assert!(records[0].culled_by_frustum);
            assert!(!set.is_drawn(0));
        }
    }

    #[test]
    fn missing_mesh_is_invisible_without_error() {
        let prim = Primitive::new(
            PrimId(1),
            "ghost",
            Arc::new(StaticPrim {
                transform: Mat4::identity(),
                bounds: Aabb::unit(),
                mesh: None,
                opaque: true,
            }),
        );
        let set = VisibilitySet::new(vec![prim]);
        let stage = CullingStage::new(16);
        let records = cull_all(&set, &camera(), &stage);
        assert!(records[0].missing_mesh);
        assert!(!records[0].drawn());
    }

    #[test]
    fn occluded_prim_is_not_drawn() {
        let set = VisibilitySet::new(vec![prim_at(1, Vec3::new(0.0, 0.0, 0.0))]);
        let mut stage = CullingStage::new(16);
        let camera = camera();

        // Frame 1 assigns a query slot.
        let records = cull_all(&set, &camera, &stage);
        stage.update_query_map(&set, &records);
        let slot = stage.query_index(PrimId(1)).unwrap();

        // Frame 2 sees a "hidden" result for that slot.
        let mut results = vec![None; 16];
        results[slot as usize] = Some(false);
        let snapshot = stage.snapshot(results);
        let rendered = AtomicU32::new(0);
        set.reset_draw_states();
        let records = cull_range(
            set.prims(),
            0..set.len(),
            &camera,
            TimeCode::default(),
            &snapshot,
            &set.drawn_flags(),
            &rendered,
        );
        assert!(records[0].occluded);
        assert!(!set.is_drawn(0));
        assert_eq!(rendered.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn enclosing_prim_never_gets_query_slot() {
        // A 40-unit room around the camera at z=5.
        let room = Primitive::new(
            PrimId(1),
            "room",
            Arc::new(StaticPrim {
                transform: Mat4::identity(),
                bounds: Aabb::new(
                    Vec3::new(-20.0, -20.0, -20.0),
                    Vec3::new(20.0, 20.0, 20.0),
                ),
                mesh: Some(MeshHandle(1)),
                opaque: true,
            }),
        );
        let set = VisibilitySet::new(vec![room]);
        let mut stage = CullingStage::new(16);
        for _ in 0..3 {
            let records = cull_all(&set, &camera(), &stage);
            assert!(records[0].enclosing);
            assert!(records[0].drawn());
            stage.update_query_map(&set, &records);
            assert_eq!(stage.query_index(PrimId(1)), None);
        }
    }

    #[test]
    fn recycled_slot_result_is_masked_until_requeried() {
        let set_a = VisibilitySet::new(vec![prim_at(1, Vec3::new(0.0, 0.0, 0.0))]);
        let mut stage = CullingStage::new(1);
        let records = cull_all(&set_a, &camera(), &stage);
        stage.update_query_map(&set_a, &records);
        assert_eq!(stage.query_index(PrimId(1)), Some(0));

        // Prim 1 leaves; prim 2 recycles slot 0 while the pool still
        // holds prim 1's "hidden" verdict.
        let set_b = VisibilitySet::new(vec![prim_at(2, Vec3::new(0.0, 0.0, 0.0))]);
        stage.retain_prims(&set_b);
        let records = cull_all(&set_b, &camera(), &stage);
        stage.update_query_map(&set_b, &records);
        assert_eq!(stage.query_index(PrimId(2)), Some(0));

        let snapshot = stage.snapshot(vec![Some(false)]);
        assert!(!snapshot.occluded(PrimId(2)));

        // Once new queries go out for the slot, results count again.
        stage.mark_queries_submitted();
        let snapshot = stage.snapshot(vec![Some(false)]);
        assert!(snapshot.occluded(PrimId(2)));
    }

    #[test]
    fn culled_prim_slot_is_recycled() {
        let near = prim_at(1, Vec3::new(0.0, 0.0, 0.0));
        let set = VisibilitySet::new(vec![near]);
        let mut stage = CullingStage::new(1);

        let records = cull_all(&set, &camera(), &stage);
        stage.update_query_map(&set, &records);
        assert_eq!(stage.query_index(PrimId(1)), Some(0));

        // Move it out of the frustum: the slot must free up for others.
        let far = VisibilitySet::new(vec![prim_at(1, Vec3::new(0.0, 0.0, 50.0))]);
        let records = cull_all(&far, &camera(), &stage);
        stage.update_query_map(&far, &records);
        assert_eq!(stage.query_index(PrimId(1)), None);

        let other = VisibilitySet::new(vec![prim_at(2, Vec3::new(0.0, 0.0, 0.0))]);
        let records = cull_all(&other, &camera(), &stage);
        stage.update_query_map(&other, &records);
        assert_eq!(stage.query_index(PrimId(2)), Some(0));
    }
}
