//! Bounding volumes and view-frustum geometry.
//!
//! Provides the culling primitives used by the renderer:
//!
//! - [`Aabb`] — axis-aligned bounding box with union/transform helpers
//! - [`Plane`] — oriented plane with signed-distance queries
//! - [`Frustum`] — six planes extracted from a view-projection matrix,
//!   with an exact plane/AABB intersection test

use crate::math::{transform_point, Mat4, Vec3, Vec4};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from min/max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that unions to any other box.
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// A unit cube centered at the origin.
    pub fn unit() -> Self {
        Self {
            min: Vec3::repeat(-0.5),
            max: Vec3::repeat(0.5),
        }
    }

    /// Whether this box contains no space.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Center point of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-extent along each axis.
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Smallest box containing both inputs.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Grow the box by `margin` on every side.
    ///
    /// Used for occlusion-query proxy geometry, which is drawn slightly
    /// enlarged so a box flush with the real silhouette still passes.
    pub fn expanded(&self, margin: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::repeat(margin),
            max: self.max + Vec3::repeat(margin),
        }
    }

    /// Whether the point lies inside or on the boundary.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (mn, mx) = (self.min, self.max);
        [
            Vec3::new(mn.x, mn.y, mn.z),
            Vec3::new(mx.x, mn.y, mn.z),
            Vec3::new(mn.x, mx.y, mn.z),
            Vec3::new(mx.x, mx.y, mn.z),
            Vec3::new(mn.x, mn.y, mx.z),
            Vec3::new(mx.x, mn.y, mx.z),
            Vec3::new(mn.x, mx.y, mx.z),
            Vec3::new(mx.x, mx.y, mx.z),
        ]
    }

    /// Axis-aligned box enclosing this box after an affine transform.
    pub fn transformed(&self, m: &Mat4) -> Aabb {
        let mut out = Aabb::empty();
        for corner in self.corners() {
            let p = transform_point(m, corner);
            out.min = out.min.inf(&p);
            out.max = out.max.sup(&p);
        }
        out
    }
}

/// A plane in the form `normal . p + d = 0`.
///
/// Points with positive signed distance are on the side the normal
/// faces. Frustum planes face inward, so "inside" is non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Plane normal (not necessarily unit length).
    pub normal: Vec3,
    /// Distance term.
    pub d: f32,
}

impl Plane {
    /// Construct from the coefficients of `ax + by + cz + d = 0`.
    pub fn from_coefficients(v: Vec4) -> Self {
        Self {
            normal: Vec3::new(v.x, v.y, v.z),
            d: v.w,
        }
    }

    /// Normalize so signed distances are in world units.
    pub fn normalized(&self) -> Plane {
        let len = self.normal.norm();
        if len <= f32::EPSILON {
            return *self;
        }
        Plane {
            normal: self.normal / len,
            d: self.d / len,
        }
    }

    /// Signed distance from the plane to a point.
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(&p) + self.d
    }

    /// Exact plane/AABB test: true if the box is entirely on the
    /// negative side (outside, for an inward-facing frustum plane).
    ///
    /// Uses the positive vertex: the box corner furthest along the
    /// plane normal. If even that corner is behind the plane, every
    /// point of the box is.
    pub fn aabb_outside(&self, aabb: &Aabb) -> bool {
        let p = Vec3::new(
            if self.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
            if self.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
            if self.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
        );
        self.signed_distance(p) < 0.0
    }
}

/// View frustum as six inward-facing planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Planes in order: left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    ///
    /// Assumes clip-space depth in `[0, 1]` (the convention used by
    /// [`perspective_rh`](crate::math::perspective_rh)).
    pub fn from_view_proj(m: &Mat4) -> Self {
        let row = |i: usize| Vec4::new(m[(i, 0)], m[(i, 1)], m[(i, 2)], m[(i, 3)]);
        let r0 = row(0);
        let r1 = row(1);
        let r2 = row(2);
        let r3 = row(3);

        let planes = [
            Plane::from_coefficients(r3 + r0).normalized(), // left
            Plane::from_coefficients(r3 - r0).normalized(), // right
            Plane::from_coefficients(r3 + r1).normalized(), // bottom
            Plane::from_coefficients(r3 - r1).normalized(), // top
            Plane::from_coefficients(r2).normalized(),      // near ([0,1] depth)
            Plane::from_coefficients(r3 - r2).normalized(), // far
        ];
        Self { planes }
    }

    /// True if any part of the box may be inside the frustum.
    ///
    /// Conservative: a box outside every plane individually but
    /// clipping a frustum corner is still reported visible, which only
    /// costs a draw, never drops one.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        !self.planes.iter().any(|p| p.aabb_outside(aabb))
    }

    /// True if the point is inside the frustum.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.planes.iter().all(|pl| pl.signed_distance(p) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{look_at_rh, mat4_from_translation, perspective_rh};
    use rstest::rstest;

    fn test_frustum() -> Frustum {
        let proj = perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let view = look_at_rh(
            &Vec3::zeros(),
            &Vec3::new(0.0, 0.0, -1.0),
            &Vec3::new(0.0, 1.0, 0.0),
        );
        Frustum::from_view_proj(&(proj * view))
    }

    #[test]
    fn union_covers_both_boxes() {
        let a = Aabb::new(Vec3::zeros(), Vec3::repeat(1.0));
        let b = Aabb::new(Vec3::repeat(2.0), Vec3::repeat(3.0));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::zeros());
        assert_eq!(u.max, Vec3::repeat(3.0));
    }

    #[test]
    fn empty_box_unions_to_identity() {
        let a = Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0));
        assert_eq!(Aabb::empty().union(&a), a);
    }

    #[test]
    fn transformed_box_follows_translation() {
        let a = Aabb::unit();
        let m = mat4_from_translation(Vec3::new(10.0, 0.0, 0.0));
        let t = a.transformed(&m);
        assert!((t.center() - Vec3::new(10.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn expanded_grows_every_side() {
        let a = Aabb::unit().expanded(0.5);
        assert_eq!(a.min, Vec3::repeat(-1.0));
        assert_eq!(a.max, Vec3::repeat(1.0));
    }

    #[rstest]
    #[case::in_front(-5.0, -3.0, true)]
    #[case::behind(3.0, 5.0, false)]
    #[case::beyond_far(-300.0, -200.0, false)]
    #[case::straddling_near(-1.0, 1.0, true)]
    fn frustum_aabb_tests(#[case] z_min: f32, #[case] z_max: f32, #[case] visible: bool) {
        let f = test_frustum();
        let b = Aabb::new(Vec3::new(-1.0, -1.0, z_min), Vec3::new(1.0, 1.0, z_max));
        assert_eq!(f.intersects_aabb(&b), visible);
    }

    #[test]
    fn point_in_front_is_inside() {
        let f = test_frustum();
        assert!(f.contains_point(Vec3::new(0.0, 0.0, -1.0)));
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn culling_is_stable_for_fixed_camera() {
        // Same camera, same box: the verdict never flips frame to frame.
        let f = test_frustum();
        let outside = Aabb::new(Vec3::new(200.0, 0.0, -5.0), Vec3::new(201.0, 1.0, -4.0));
        for _ in 0..16 {
            assert!(!f.intersects_aabb(&outside));
        }
    }
}
