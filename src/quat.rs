//! Rotation quaternion.
//!
//! Four components (x, y, z, w) encoding a 3D rotation when the norm is
//! 1. Identity is (0, 0, 0, 1). A quaternion and its negation encode the
//! same rotation; comparisons that care about the rotation rather than
//! the components must go through [`Quaternion::is_same_rotation`].
//!
//! Operand-order convention, fixed once for the whole crate:
//! [`Quaternion::multiplied`] is the Hamilton product `self * other`,
//! while [`Quaternion::concatenated`] reads in application order:
//! `a.concatenated(&b)` is "rotate by a, then by b" and equals
//! `b.multiplied(&a)`. Under the crate's row-vector matrix convention
//! this makes `a.concatenated(&b)` match `M(a) * M(b)`.

use std::ops::{Mul, Neg};

use serde::{Deserialize, Serialize};

use crate::mat4::Matrix4x4;
use crate::precision;
use crate::vec3::Vector3;
use crate::{Result, XformError};

/// A rotation quaternion {x, y, z, w}.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// The identity rotation (0, 0, 0, 1).
    #[inline]
    pub const fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    /// Creates a quaternion from raw components.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a rotation of `angle` radians about `axis`.
    ///
    /// The axis is normalized internally; a zero-length axis is rejected
    /// with [`XformError::InvalidArgument`].
    pub fn from_axis_angle(axis: &Vector3, angle: f64) -> Result<Self> {
        let axis = axis.normalized().ok_or_else(|| {
            XformError::InvalidArgument("rotation axis is too small to normalize".into())
        })?;
        let half = angle * 0.5;
        let s = half.sin();
        Ok(Self {
            x: axis.x() * s,
            y: axis.y() * s,
            z: axis.z() * s,
            w: half.cos(),
        })
    }

    /// Creates a rotation from yaw (about Y), pitch (about X), and roll
    /// (about Z), all in radians.
    pub fn from_yaw_pitch_roll(yaw: f64, pitch: f64, roll: f64) -> Self {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();
        Self {
            x: cy * sp * cr + sy * cp * sr,
            y: sy * cp * cr - cy * sp * sr,
            z: cy * cp * sr - sy * sp * cr,
            w: cy * cp * cr + sy * sp * sr,
        }
    }

    /// Extracts the rotation from the 3x3 linear block of a matrix.
    ///
    /// The linear block must be orthonormal. Branch selection pivots on
    /// the trace, falling back to the dominant diagonal element, so the
    /// square root is always taken of a quantity bounded away from zero.
    /// The naive w-first formula divides by near zero for rotations
    /// close to a half turn; the diagonal pivots must stay.
    pub fn from_rotation_matrix(m: &Matrix4x4) -> Self {
        let m11 = m.value(1, 1);
        let m12 = m.value(1, 2);
        let m13 = m.value(1, 3);
        let m21 = m.value(2, 1);
        let m22 = m.value(2, 2);
        let m23 = m.value(2, 3);
        let m31 = m.value(3, 1);
        let m32 = m.value(3, 2);
        let m33 = m.value(3, 3);

        let trace = m11 + m22 + m33;
        if trace > 0.0 {
            let s = (trace + 1.0).sqrt();
            let w = s * 0.5;
            let s = 0.5 / s;
            Self {
                x: (m23 - m32) * s,
                y: (m31 - m13) * s,
                z: (m12 - m21) * s,
                w,
            }
        } else if m11 >= m22 && m11 >= m33 {
            let s = (1.0 + m11 - m22 - m33).sqrt();
            let inv_s = 0.5 / s;
            Self {
                x: 0.5 * s,
                y: (m12 + m21) * inv_s,
                z: (m13 + m31) * inv_s,
                w: (m23 - m32) * inv_s,
            }
        } else if m22 > m33 {
            let s = (1.0 + m22 - m11 - m33).sqrt();
            let inv_s = 0.5 / s;
            Self {
                x: (m21 + m12) * inv_s,
                y: 0.5 * s,
                z: (m32 + m23) * inv_s,
                w: (m31 - m13) * inv_s,
            }
        } else {
            let s = (1.0 + m33 - m11 - m22).sqrt();
            let inv_s = 0.5 / s;
            Self {
                x: (m31 + m13) * inv_s,
                y: (m32 + m23) * inv_s,
                z: 0.5 * s,
                w: (m12 - m21) * inv_s,
            }
        }
    }

    /// Builds the homogeneous rotation matrix for this quaternion.
    ///
    /// Assumes unit norm. Translation row is zero, m44 = 1.
    pub fn to_rotation_matrix(&self) -> Matrix4x4 {
        let xx = self.x * self.x;
        let yy = self.y * self.y;
        let zz = self.z * self.z;
        let xy = self.x * self.y;
        let xz = self.x * self.z;
        let yz = self.y * self.z;
        let wx = self.w * self.x;
        let wy = self.w * self.y;
        let wz = self.w * self.z;

        Matrix4x4::from_rows([
            [1.0 - 2.0 * (yy + zz), 2.0 * (xy + wz), 2.0 * (xz - wy), 0.0],
            [2.0 * (xy - wz), 1.0 - 2.0 * (xx + zz), 2.0 * (yz + wx), 0.0],
            [2.0 * (xz + wy), 2.0 * (yz - wx), 1.0 - 2.0 * (xx + yy), 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Recovers the (axis, angle) pair, angle in [0, 2*pi).
    ///
    /// Assumes unit norm. The identity rotation has no distinguished
    /// axis; unit X is returned for it.
    pub fn to_axis_angle(&self) -> (Vector3, f64) {
        let angle = 2.0 * self.w.clamp(-1.0, 1.0).acos();
        let s = (1.0 - self.w * self.w).max(0.0).sqrt();
        if s <= precision::CONFUSION {
            (Vector3::unit_x(), angle)
        } else {
            (
                Vector3::new(self.x / s, self.y / s, self.z / s),
                angle,
            )
        }
    }

    /// Returns the X component.
    #[inline]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Returns the Y component.
    #[inline]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Returns the Z component.
    #[inline]
    pub const fn z(&self) -> f64 {
        self.z
    }

    /// Returns the W (scalar) component.
    #[inline]
    pub const fn w(&self) -> f64 {
        self.w
    }

    /// Computes the norm.
    #[inline]
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Computes the squared norm.
    #[inline]
    pub const fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    /// Computes the four-component dot product.
    #[inline]
    pub const fn dot(&self, other: &Quaternion) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Hamilton product `self * other`.
    ///
    /// Note the operand order: this is the algebraic product, not
    /// application order. For "rotate by a, then by b" use
    /// [`Quaternion::concatenated`].
    pub fn multiplied(&self, other: &Quaternion) -> Quaternion {
        let (x1, y1, z1, w1) = (self.x, self.y, self.z, self.w);
        let (x2, y2, z2, w2) = (other.x, other.y, other.z, other.w);
        Quaternion {
            x: w1 * x2 + x1 * w2 + y1 * z2 - z1 * y2,
            y: w1 * y2 + y1 * w2 + z1 * x2 - x1 * z2,
            z: w1 * z2 + z1 * w2 + x1 * y2 - y1 * x2,
            w: w1 * w2 - x1 * x2 - y1 * y2 - z1 * z2,
        }
    }

    /// Hamilton product in place: `self = self * other`.
    #[inline]
    pub fn multiply(&mut self, other: &Quaternion) {
        *self = self.multiplied(other);
    }

    /// Composition in application order: rotate by `self`, then by
    /// `other`. Equal to `other.multiplied(self)`, and matches
    /// `M(self) * M(other)` under the crate's row-vector convention.
    #[inline]
    pub fn concatenated(&self, other: &Quaternion) -> Quaternion {
        other.multiplied(self)
    }

    /// Composition in application order, in place.
    #[inline]
    pub fn concatenate(&mut self, other: &Quaternion) {
        *self = self.concatenated(other);
    }

    /// Spherical linear interpolation from `self` (t = 0) to `other`
    /// (t = 1), always along the shorter arc.
    ///
    /// When the endpoints are nearly parallel the spherical weights
    /// degenerate (0/0 from 1/sin) and a normalized linear blend is used
    /// instead. The result is renormalized in both paths.
    pub fn slerp(&self, other: &Quaternion, t: f64) -> Quaternion {
        let mut cos_omega = self.dot(other);
        let flip = cos_omega < 0.0;
        if flip {
            cos_omega = -cos_omega;
        }

        let (s1, s2) = if cos_omega > precision::SLERP_LINEAR_THRESHOLD {
            (1.0 - t, if flip { -t } else { t })
        } else {
            let omega = cos_omega.acos();
            let inv_sin = 1.0 / omega.sin();
            let s1 = ((1.0 - t) * omega).sin() * inv_sin;
            let s2 = (t * omega).sin() * inv_sin;
            (s1, if flip { -s2 } else { s2 })
        };

        let mut result = Quaternion {
            x: s1 * self.x + s2 * other.x,
            y: s1 * self.y + s2 * other.y,
            z: s1 * self.z + s2 * other.z,
            w: s1 * self.w + s2 * other.w,
        };
        result.normalize();
        result
    }

    /// Normalized linear interpolation from `self` to `other`, with the
    /// same shorter-arc sign correction as [`Quaternion::slerp`].
    pub fn lerp(&self, other: &Quaternion, t: f64) -> Quaternion {
        let s2 = if self.dot(other) < 0.0 { -t } else { t };
        let s1 = 1.0 - t;
        let mut result = Quaternion {
            x: s1 * self.x + s2 * other.x,
            y: s1 * self.y + s2 * other.y,
            z: s1 * self.z + s2 * other.z,
            w: s1 * self.w + s2 * other.w,
        };
        result.normalize();
        result
    }

    /// Normalizes in place. Returns false if the norm is too small.
    pub fn normalize(&mut self) -> bool {
        let d = self.length();
        if d <= precision::CONFUSION {
            return false;
        }
        self.x /= d;
        self.y /= d;
        self.z /= d;
        self.w /= d;
        true
    }

    /// Returns the normalized quaternion, or None if the norm is too
    /// small.
    pub fn normalized(&self) -> Option<Quaternion> {
        let mut q = *self;
        if q.normalize() {
            Some(q)
        } else {
            None
        }
    }

    /// Conjugates in place (negates the vector part).
    #[inline]
    pub fn conjugate(&mut self) {
        self.x = -self.x;
        self.y = -self.y;
        self.z = -self.z;
    }

    /// Returns the conjugate.
    #[inline]
    pub fn conjugated(&self) -> Quaternion {
        Quaternion {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    /// Returns the multiplicative inverse (conjugate over squared norm),
    /// or None for a near-zero quaternion. For a unit quaternion this is
    /// the conjugate.
    pub fn inverted(&self) -> Option<Quaternion> {
        let n2 = self.length_squared();
        if n2 <= precision::SQUARE_CONFUSION {
            return None;
        }
        let inv = 1.0 / n2;
        Some(Quaternion {
            x: -self.x * inv,
            y: -self.y * inv,
            z: -self.z * inv,
            w: self.w * inv,
        })
    }

    /// Returns the component-wise negation. Encodes the same rotation.
    #[inline]
    pub fn negated(&self) -> Quaternion {
        Quaternion {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: -self.w,
        }
    }

    /// Returns true if all components differ by at most tolerance.
    #[inline]
    pub fn is_equal(&self, other: &Quaternion, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
            && (self.w - other.w).abs() <= tolerance
    }

    /// Returns true if this and other encode the same rotation within
    /// tolerance, accounting for the q / -q double cover.
    #[inline]
    pub fn is_same_rotation(&self, other: &Quaternion, tolerance: f64) -> bool {
        self.is_equal(other, tolerance) || self.is_equal(&other.negated(), tolerance)
    }
}

impl Mul for Quaternion {
    type Output = Quaternion;
    #[inline]
    fn mul(self, other: Quaternion) -> Quaternion {
        self.multiplied(&other)
    }
}

impl Neg for Quaternion {
    type Output = Quaternion;
    #[inline]
    fn neg(self) -> Quaternion {
        self.negated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_quat_identity() {
        let q = Quaternion::identity();
        assert_eq!(q.w(), 1.0);
        assert!((q.length() - 1.0).abs() < 1e-12);
        assert!(q
            .to_rotation_matrix()
            .is_equal(&Matrix4x4::identity(), 1e-12));
    }

    #[test]
    fn test_quat_from_axis_angle() {
        let q = Quaternion::from_axis_angle(&Vector3::unit_z(), FRAC_PI_2).unwrap();
        let half = FRAC_PI_2 * 0.5;
        assert!((q.z() - half.sin()).abs() < 1e-12);
        assert!((q.w() - half.cos()).abs() < 1e-12);
    }

    #[test]
    fn test_quat_from_axis_angle_zero_axis() {
        let result = Quaternion::from_axis_angle(&Vector3::zero(), 1.0);
        assert!(matches!(result, Err(crate::XformError::InvalidArgument(_))));
    }

    #[test]
    fn test_quat_axis_not_prenormalized() {
        let a = Quaternion::from_axis_angle(&Vector3::new(0.0, 0.0, 10.0), 1.0).unwrap();
        let b = Quaternion::from_axis_angle(&Vector3::unit_z(), 1.0).unwrap();
        assert!(a.is_equal(&b, 1e-12));
    }

    #[test]
    fn test_quat_to_axis_angle_roundtrip() {
        let axis = Vector3::new(1.0, 2.0, -0.5).normalized().unwrap();
        let q = Quaternion::from_axis_angle(&axis, 1.2).unwrap();
        let (out_axis, out_angle) = q.to_axis_angle();
        assert!(out_axis.is_equal(&axis, 1e-10));
        assert!((out_angle - 1.2).abs() < 1e-10);
    }

    #[test]
    fn test_quat_multiply_composes_rotations() {
        // Rotate about Z, then about X, each by a quarter turn. In
        // application order that is a.concatenated(b); the Hamilton
        // product runs the other way around.
        let a = Quaternion::from_axis_angle(&Vector3::unit_z(), FRAC_PI_2).unwrap();
        let b = Quaternion::from_axis_angle(&Vector3::unit_x(), FRAC_PI_2).unwrap();
        let composed = a.concatenated(&b);
        assert!(composed.is_equal(&b.multiplied(&a), 1e-12));

        let m = composed.to_rotation_matrix();
        let p = m.transform_point(&Vector3::unit_x());
        assert!(p.is_equal(&Vector3::unit_z(), 1e-10));
    }

    #[test]
    fn test_quat_concatenate_matches_matrix_product() {
        let a = Quaternion::from_axis_angle(&Vector3::new(1.0, 1.0, 0.0), 0.7).unwrap();
        let b = Quaternion::from_axis_angle(&Vector3::new(0.0, 1.0, -1.0), -1.1).unwrap();
        let lhs = a.concatenated(&b).to_rotation_matrix();
        let rhs = a.to_rotation_matrix().multiplied(&b.to_rotation_matrix());
        assert!(lhs.is_equal(&rhs, 1e-10));
    }

    #[test]
    fn test_quat_matrix_roundtrip() {
        let q = Quaternion::from_axis_angle(&Vector3::new(0.3, -0.4, 0.85), 2.1).unwrap();
        let back = Quaternion::from_rotation_matrix(&q.to_rotation_matrix());
        assert!(back.is_same_rotation(&q, 1e-10));
    }

    #[test]
    fn test_quat_extraction_near_half_turn() {
        // Rotations near 180 degrees drive the trace toward -1, which is
        // exactly where the diagonal-pivot branches take over.
        for axis in [
            Vector3::unit_x(),
            Vector3::unit_y(),
            Vector3::unit_z(),
            Vector3::new(1.0, 1.0, 1.0).normalized().unwrap(),
        ] {
            let q = Quaternion::from_axis_angle(&axis, PI - 1e-7).unwrap();
            let back = Quaternion::from_rotation_matrix(&q.to_rotation_matrix());
            assert!(back.is_same_rotation(&q, 1e-6));
        }
    }

    #[test]
    fn test_quat_slerp_endpoints() {
        let a = Quaternion::from_axis_angle(&Vector3::unit_y(), 0.4).unwrap();
        let b = Quaternion::from_axis_angle(&Vector3::unit_y(), 2.0).unwrap();
        assert!(a.slerp(&b, 0.0).is_equal(&a, 1e-12));
        assert!(a.slerp(&b, 1.0).is_equal(&b, 1e-12));
    }

    #[test]
    fn test_quat_slerp_unit_norm() {
        let a = Quaternion::from_axis_angle(&Vector3::unit_x(), 0.3).unwrap();
        let b = Quaternion::from_axis_angle(&Vector3::new(0.0, 1.0, 1.0), 2.4).unwrap();
        for i in 0..=10 {
            let t = f64::from(i) / 10.0;
            assert!((a.slerp(&b, t).length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_quat_slerp_takes_shorter_arc() {
        let a = Quaternion::from_axis_angle(&Vector3::unit_z(), 0.2).unwrap();
        let b = Quaternion::from_axis_angle(&Vector3::unit_z(), 1.0)
            .unwrap()
            .negated();
        assert!(a.dot(&b) < 0.0);
        let mid = a.slerp(&b, 0.5);
        let expected = Quaternion::from_axis_angle(&Vector3::unit_z(), 0.6).unwrap();
        assert!(mid.is_same_rotation(&expected, 1e-10));
    }

    #[test]
    fn test_quat_slerp_near_parallel() {
        let a = Quaternion::from_axis_angle(&Vector3::unit_x(), 1.0).unwrap();
        let b = Quaternion::from_axis_angle(&Vector3::unit_x(), 1.0 + 1e-8).unwrap();
        let mid = a.slerp(&b, 0.5);
        assert!((mid.length() - 1.0).abs() < 1e-12);
        assert!(mid.is_same_rotation(&a, 1e-6));
    }

    #[test]
    fn test_quat_lerp_shorter_arc_and_norm() {
        let a = Quaternion::from_axis_angle(&Vector3::unit_y(), 0.3).unwrap();
        let b = a.negated();
        // Antipodal inputs: lerp must not pass through zero.
        let mid = a.lerp(&b, 0.25);
        assert!((mid.length() - 1.0).abs() < 1e-12);
        assert!(mid.is_same_rotation(&a, 1e-10));
    }

    #[test]
    fn test_quat_conjugate_inverts_unit_rotation() {
        let q = Quaternion::from_axis_angle(&Vector3::new(0.5, -1.0, 2.0), 0.9).unwrap();
        let product = q.multiplied(&q.conjugated());
        assert!(product.is_equal(&Quaternion::identity(), 1e-12));
        let inv = q.inverted().unwrap();
        assert!(inv.is_equal(&q.conjugated(), 1e-12));
    }

    #[test]
    fn test_quat_inverted_zero_is_none() {
        assert!(Quaternion::new(0.0, 0.0, 0.0, 0.0).inverted().is_none());
    }

    #[test]
    fn test_quat_normalize() {
        let mut q = Quaternion::new(0.0, 0.0, 3.0, 4.0);
        assert!(q.normalize());
        assert!((q.length() - 1.0).abs() < 1e-12);
        assert!((q.z() - 0.6).abs() < 1e-12);
        assert!((q.w() - 0.8).abs() < 1e-12);
    }
}
