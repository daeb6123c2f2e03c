//! Narrow interface to the external scene-graph layer.
//!
//! The scene graph owns primitive hierarchies, transforms, and mesh
//! data. The renderer only reads: a primitive's world transform and
//! bounds sampled at a time code, its opacity flag, and its mesh
//! handle. Nothing here mutates primitive topology; the renderer's
//! only writes are the transient per-frame drawn tags kept in
//! [`VisibilitySet`](crate::visibility::VisibilitySet).

use std::fmt;
use std::sync::Arc;

use primforge_core::geometry::Aabb;
use primforge_core::math::Mat4;

/// Stable identifier of a scene primitive.
///
/// Issued by the scene graph; also written into the pick buffer, so it
/// must round-trip through a `u32` texel. Id 0 is reserved for "no
/// primitive" in pick results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimId(pub u32);

impl PrimId {
    /// The reserved "no primitive" id used in pick buffers.
    pub const NONE: PrimId = PrimId(0);
}

impl fmt::Display for PrimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prim#{}", self.0)
    }
}

/// Handle to mesh geometry owned by the scene/asset layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Scene-wide logical playback position.
///
/// Animated transforms and meshes are sampled at a time code; the
/// renderer treats it as an opaque sampling key.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct TimeCode(pub f64);

/// Read-only data source for one primitive, implemented by the scene
/// graph layer.
///
/// All methods are sampled per frame at the current time code. A
/// primitive with no valid mesh at some time code returns `None` from
/// [`mesh`](PrimSource::mesh) and is treated as invisible, never as an
/// error.
pub trait PrimSource: Send + Sync {
    /// World transform at the given time code.
    fn transform(&self, time: TimeCode) -> Mat4;

    /// Local-space bounding box at the given time code.
    fn bounds(&self, time: TimeCode) -> Aabb;

    /// Mesh handle at the given time code, if geometry exists there.
    fn mesh(&self, time: TimeCode) -> Option<MeshHandle>;

    /// Whether the primitive is fully opaque (drawn in the opaque pass)
    /// or translucent (drawn in the transparency passes).
    fn is_opaque(&self) -> bool;
}

/// A primitive reference as seen by the renderer.
///
/// Cheap to clone; the data lives behind an `Arc` owned by the scene
/// graph.
#[derive(Clone)]
pub struct Primitive {
    /// Stable id.
    pub id: PrimId,
    /// Display label (shown by the overlay pass for the focused prim).
    pub label: Arc<str>,
    /// Data source.
    pub source: Arc<dyn PrimSource>,
}

impl Primitive {
    /// Create a primitive reference.
    pub fn new(id: PrimId, label: impl Into<Arc<str>>, source: Arc<dyn PrimSource>) -> Self {
        Self {
            id,
            label: label.into(),
            source,
        }
    }

    /// World-space bounding box at the given time code.
    pub fn world_bounds(&self, time: TimeCode) -> Aabb {
        self.source
            .bounds(time)
            .transformed(&self.source.transform(time))
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A fixed (non-animated) primitive source.
///
/// Convenient for programmatic scenes and for tests; real scenes come
/// from the editor's scene-graph layer.
#[derive(Debug, Clone)]
pub struct StaticPrim {
    /// Constant world transform.
    pub transform: Mat4,
    /// Constant local bounds.
    pub bounds: Aabb,
    /// Mesh handle, or `None` for a primitive with no geometry.
    pub mesh: Option<MeshHandle>,
    /// Opacity flag.
    pub opaque: bool,
}

impl StaticPrim {
    /// A unit-cube primitive at the given transform.
    pub fn cube(transform: Mat4, mesh: MeshHandle) -> Self {
        Self {
            transform,
            bounds: Aabb::unit(),
            mesh: Some(mesh),
            opaque: true,
        }
    }
}

impl PrimSource for StaticPrim {
    fn transform(&self, _time: TimeCode) -> Mat4 {
        self.transform
    }

    fn bounds(&self, _time: TimeCode) -> Aabb {
        self.bounds
    }

    fn mesh(&self, _time: TimeCode) -> Option<MeshHandle> {
        self.mesh
    }

    fn is_opaque(&self) -> bool {
        self.opaque
    }
}
