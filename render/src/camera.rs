//! Render camera.
//!
//! Snapshot of the viewer for one frame: view/projection matrices and
//! the derived world-space frustum. The snapshot is `Clone` so worker
//! threads can cull against it without sharing.

use primforge_core::geometry::{Aabb, Frustum};
use primforge_core::math::{self, Mat4, Vec3};

/// Margin added to a box when testing camera enclosure, so a camera
/// sitting exactly on a face still counts as inside.
const ENCLOSURE_MARGIN: f32 = 1e-3;

/// Per-frame camera snapshot.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    view: Mat4,
    projection: Mat4,
    view_proj: Mat4,
    frustum: Frustum,
}

impl Camera {
    /// Build a perspective camera looking from `eye` toward `target`.
    pub fn perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let view = math::look_at_rh(&eye, &target, &up);
        let projection = math::perspective_rh(fov_y, aspect, near, far);
        Self::from_matrices(eye, view, projection)
    }

    /// Build from externally supplied matrices (editor viewport).
    pub fn from_matrices(position: Vec3, view: Mat4, projection: Mat4) -> Self {
        let view_proj = projection * view;
        Self {
            position,
            view,
            projection,
            view_proj,
            frustum: Frustum::from_view_proj(&view_proj),
        }
    }

    /// World-space eye position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// View matrix.
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    /// Projection matrix.
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Combined projection * view.
    pub fn view_proj(&self) -> &Mat4 {
        &self.view_proj
    }

    /// World-space culling frustum.
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Whether the camera sits inside (or on the boundary of) `bounds`.
    ///
    /// Enclosing geometry must never be occlusion-tested: the depth
    /// pass sees it from the inside and would report it hidden.
    pub fn encloses(&self, bounds: &Aabb) -> bool {
        bounds.expanded(ENCLOSURE_MARGIN).contains_point(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
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

    #[test]
    fn sees_box_in_front() {
        let camera = test_camera();
        let bounds = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        assert!(camera.frustum().intersects_aabb(&bounds));
    }

    #[test]
    fn does_not_see_box_behind() {
        let camera = test_camera();
        let bounds = Aabb::new(Vec3::new(-1.0, -1.0, 9.0), Vec3::new(1.0, 1.0, 11.0));
        assert!(!camera.frustum().intersects_aabb(&bounds));
    }

    #[test]
    fn encloses_surrounding_box() {
        let camera = test_camera();
        let room = Aabb::new(Vec3::new(-10.0, -10.0, -10.0), Vec3::new(10.0, 10.0, 10.0));
        assert!(camera.encloses(&room));

        let distant = Aabb::new(Vec3::new(20.0, 20.0, 20.0), Vec3::new(30.0, 30.0, 30.0));
        assert!(!camera.encloses(&distant));
    }

    #[test]
    fn encloses_box_boundary() {
        let camera = test_camera();
        // Camera at z=5 sits exactly on this face.
        let touching = Aabb::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 5.0));
        assert!(camera.encloses(&touching));
    }
}
