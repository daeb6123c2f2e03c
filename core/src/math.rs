//! Math type aliases and helper functions.
//!
//! Thin f32 aliases over nalgebra plus the handful of matrix builders
//! the renderer needs. Everything here follows the Vulkan depth
//! convention (clip depth in `[0, 1]`).

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
pub type Quat = nalgebra::Quaternion<f32>;

/// Build a 4x4 TRS matrix from scale, rotation (quaternion), and translation.
pub fn mat4_from_scale_rotation_translation(
    scale: Vec3,
    rotation: Quat,
    translation: Vec3,
) -> Mat4 {
    let r = nalgebra::UnitQuaternion::new_unchecked(rotation);
    let rm = r.to_rotation_matrix();
    let m = rm.matrix();
    #[rustfmt::skip]
    let result = Mat4::new(
        m[(0, 0)] * scale.x, m[(0, 1)] * scale.y, m[(0, 2)] * scale.z, translation.x,
        m[(1, 0)] * scale.x, m[(1, 1)] * scale.y, m[(1, 2)] * scale.z, translation.y,
        m[(2, 0)] * scale.x, m[(2, 1)] * scale.y, m[(2, 2)] * scale.z, translation.z,
        0.0,                 0.0,                 0.0,                 1.0,
    );
    result
}

/// Build a translation-only 4x4 matrix.
pub fn mat4_from_translation(t: Vec3) -> Mat4 {
    Mat4::new_translation(&t)
}

/// Build a right-handed perspective projection with depth range [0, 1].
pub fn perspective_rh(yfov: f32, aspect: f32, znear: f32, zfar: f32) -> Mat4 {
    let f = 1.0 / (yfov / 2.0).tan();
    let nf = 1.0 / (znear - zfar);
    #[rustfmt::skip]
    let result = Mat4::new(
        f / aspect, 0.0,  0.0,       0.0,
        0.0,        f,    0.0,       0.0,
        0.0,        0.0,  zfar * nf, znear * zfar * nf,
        0.0,        0.0,  -1.0,      0.0,
    );
    result
}

/// Right-handed look-at view matrix.
pub fn look_at_rh(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
    let eye_point = nalgebra::Point3::from(*eye);
    let target_point = nalgebra::Point3::from(*target);
    nalgebra::Isometry3::look_at_rh(&eye_point, &target_point, up).to_homogeneous()
}

/// Transform a point by a 4x4 matrix (w assumed 1, no perspective divide).
pub fn transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    let v = m * Vec4::new(p.x, p.y, p.z, 1.0);
    Vec3::new(v.x, v.y, v.z)
}

/// Create a quaternion from x, y, z, w components.
pub fn quat_from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Quat {
    nalgebra::Quaternion::new(w, x, y, z)
}

/// Create a quaternion from rotation around the Y axis.
pub fn quat_from_rotation_y(angle: f32) -> Quat {
    nalgebra::UnitQuaternion::from_axis_angle(&nalgebra::Vector3::y_axis(), angle).into_inner()
}
