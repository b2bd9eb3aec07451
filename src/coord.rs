//! Coordinate-convention conversions applied at export time.
//!
//! Source data is assumed to use the caller's convention; flipping
//! handedness negates the X axis consistently across positions, normals,
//! tangents, rotations and bind-pose matrices. Every flip is an involution.
//! Rotations are written out as Euler degrees in ZXY order, the order the
//! target format expects.

use crate::types::ExportOptions;
use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};

/// Negate the X component of a vector.
pub fn flip_vector(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

/// Mirror a rotation across the YZ plane.
pub fn flip_rotation(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, -q.y, -q.z, q.w)
}

/// Negate the X component of a tangent. The W component (bitangent sign)
/// passes through unchanged.
pub fn flip_tangent(t: Vec4) -> Vec4 {
    Vec4::new(-t.x, t.y, t.z, t.w)
}

/// Mirror a transform matrix across the YZ plane: `F * M * F` with
/// `F = diag(-1, 1, 1, 1)`, which negates every element with exactly one
/// X index, translation included.
pub fn flip_matrix(m: Mat4) -> Mat4 {
    let mut cols = m.to_cols_array_2d();
    for (ci, col) in cols.iter_mut().enumerate() {
        for (ri, v) in col.iter_mut().enumerate() {
            if (ci == 0) != (ri == 0) {
                *v = -*v;
            }
        }
    }
    Mat4::from_cols_array_2d(&cols)
}

/// Decompose a quaternion into Euler angles in degrees, ZXY order,
/// returned as (x, y, z) components.
pub fn euler_zxy_degrees(q: Quat) -> Vec3 {
    let (rz, rx, ry) = q.to_euler(EulerRot::ZXY);
    Vec3::new(rx.to_degrees(), ry.to_degrees(), rz.to_degrees())
}

/// Convert a position: uniform scale, then optional handedness flip.
pub fn convert_point(v: Vec3, opt: &ExportOptions) -> Vec3 {
    let v = v * opt.scale_factor;
    if opt.flip_handedness {
        flip_vector(v)
    } else {
        v
    }
}

/// Convert a direction vector (normal or blend-shape delta): handedness
/// flip only, no scale.
pub fn convert_normal(v: Vec3, opt: &ExportOptions) -> Vec3 {
    if opt.flip_handedness {
        flip_vector(v)
    } else {
        v
    }
}

/// Convert a tangent: handedness flip only, W preserved.
pub fn convert_tangent(t: Vec4, opt: &ExportOptions) -> Vec4 {
    if opt.flip_handedness {
        flip_tangent(t)
    } else {
        t
    }
}

/// Convert a rotation. The flip happens on the quaternion, before any
/// Euler conversion.
pub fn convert_rotation(q: Quat, opt: &ExportOptions) -> Quat {
    if opt.flip_handedness {
        flip_rotation(q)
    } else {
        q
    }
}

/// Convert a bind-pose matrix: translation column scaled like a position,
/// then the whole matrix flip-adjusted.
pub fn convert_bindpose(m: Mat4, opt: &ExportOptions) -> Mat4 {
    let mut m = m;
    m.w_axis.x *= opt.scale_factor;
    m.w_axis.y *= opt.scale_factor;
    m.w_axis.z *= opt.scale_factor;
    if opt.flip_handedness {
        flip_matrix(m)
    } else {
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flipped_options() -> ExportOptions {
        ExportOptions {
            flip_handedness: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_flip_vector_involution() {
        let v = Vec3::new(1.5, -2.0, 3.25);
        assert_eq!(flip_vector(flip_vector(v)), v);
        assert_eq!(flip_vector(v), Vec3::new(-1.5, -2.0, 3.25));
    }

    #[test]
    fn test_flip_rotation_involution() {
        let q = Quat::from_euler(EulerRot::ZXY, 0.3, -0.7, 1.1);
        let back = flip_rotation(flip_rotation(q));
        assert!((back.x - q.x).abs() < 1e-6);
        assert!((back.y - q.y).abs() < 1e-6);
        assert!((back.z - q.z).abs() < 1e-6);
        assert!((back.w - q.w).abs() < 1e-6);
    }

    #[test]
    fn test_flip_matrix_involution() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 0.5),
            Quat::from_rotation_y(0.4),
            Vec3::new(3.0, -1.0, 2.0),
        );
        let back = flip_matrix(flip_matrix(m));
        assert!(m.abs_diff_eq(back, 1e-6));
    }

    #[test]
    fn test_flip_matrix_translation() {
        let m = Mat4::from_translation(Vec3::new(2.0, 3.0, 4.0));
        let flipped = flip_matrix(m);
        assert!((flipped.w_axis.x - -2.0).abs() < 1e-6);
        assert!((flipped.w_axis.y - 3.0).abs() < 1e-6);
        assert!((flipped.w_axis.z - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_flip_tangent_preserves_sign() {
        let t = Vec4::new(0.6, 0.0, 0.8, -1.0);
        let flipped = flip_tangent(t);
        assert_eq!(flipped, Vec4::new(-0.6, 0.0, 0.8, -1.0));
        assert_eq!(flip_tangent(flipped), t);
    }

    #[test]
    fn test_euler_single_axis() {
        let q = Quat::from_rotation_z(90.0_f32.to_radians());
        let e = euler_zxy_degrees(q);
        assert!(e.x.abs() < 1e-3);
        assert!(e.y.abs() < 1e-3);
        assert!((e.z - 90.0).abs() < 1e-3);

        let q = Quat::from_rotation_x(45.0_f32.to_radians());
        let e = euler_zxy_degrees(q);
        assert!((e.x - 45.0).abs() < 1e-3);
    }

    #[test]
    fn test_convert_point_scale_and_flip() {
        let opt = ExportOptions {
            flip_handedness: true,
            scale_factor: 2.0,
            ..Default::default()
        };
        let v = convert_point(Vec3::new(1.0, 2.0, 3.0), &opt);
        assert_eq!(v, Vec3::new(-2.0, 4.0, 6.0));
    }

    #[test]
    fn test_convert_normal_ignores_scale() {
        let opt = ExportOptions {
            scale_factor: 100.0,
            ..flipped_options()
        };
        let n = convert_normal(Vec3::new(0.0, 1.0, 0.0), &opt);
        assert_eq!(n, Vec3::new(0.0, 1.0, 0.0));
        let n = convert_normal(Vec3::X, &opt);
        assert_eq!(n, -Vec3::X);
    }

    #[test]
    fn test_convert_bindpose_translation() {
        let opt = ExportOptions {
            flip_handedness: true,
            scale_factor: 2.0,
            ..Default::default()
        };
        let m = convert_bindpose(Mat4::from_translation(Vec3::new(1.0, -1.0, 0.5)), &opt);
        assert!((m.w_axis.x - -2.0).abs() < 1e-6);
        assert!((m.w_axis.y - -2.0).abs() < 1e-6);
        assert!((m.w_axis.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_identity_options_are_identity() {
        let opt = ExportOptions::default();
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(convert_point(v, &opt), v);
        assert_eq!(convert_normal(v, &opt), v);
        let q = Quat::from_rotation_y(0.3);
        assert_eq!(convert_rotation(q, &opt), q);
    }
}
