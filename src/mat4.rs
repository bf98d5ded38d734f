//! 4x4 homogeneous transform matrix.
//!
//! Row-major storage, 1-indexed `value(row, col)` access matching the
//! textbook m{row}{col} naming. Rows 1-3 carry the 3x3 linear block
//! (rotation, scale, shear), row 4 carries translation in its first
//! three columns; column 4 is (0, 0, 0, 1) for affine transforms.
//!
//! Convention, fixed once for the whole crate: points are row vectors
//! and transform as `v' = v * M`. Composing "apply A, then B" is
//! therefore `A * B`, not `B * A`. The look-at and projection builders
//! depend on this orientation and the tests pin it.

use serde::{Deserialize, Serialize};

use crate::precision;
use crate::quat::Quaternion;
use crate::vec3::Vector3;
use crate::{Result, XformError};

/// A 4x4 homogeneous transformation matrix, row-major.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix4x4 {
    m: [[f64; 4]; 4],
}

/// Scale/rotation/translation factorization of an affine transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    /// Per-axis scale, sign-corrected best-effort (see
    /// [`Matrix4x4::decompose`]).
    pub scale: Vector3,
    /// Rotation of the scale-normalized linear block.
    pub rotation: Quaternion,
    /// Translation read from row 4.
    pub translation: Vector3,
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix4x4 {
    /// The identity matrix.
    pub const fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// The zero matrix.
    pub const fn zero() -> Self {
        Self { m: [[0.0; 4]; 4] }
    }

    /// Creates a matrix from four rows.
    #[inline]
    pub const fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self { m: rows }
    }

    /// Creates a matrix from all sixteen cells in row-major order.
    #[allow(clippy::too_many_arguments)]
    pub const fn from_values(
        m11: f64, m12: f64, m13: f64, m14: f64,
        m21: f64, m22: f64, m23: f64, m24: f64,
        m31: f64, m32: f64, m33: f64, m34: f64,
        m41: f64, m42: f64, m43: f64, m44: f64,
    ) -> Self {
        Self {
            m: [
                [m11, m12, m13, m14],
                [m21, m22, m23, m24],
                [m31, m32, m33, m34],
                [m41, m42, m43, m44],
            ],
        }
    }

    /// Gets the cell at (row, col), 1-indexed.
    /// Panics if row or col is not in 1..=4.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        assert!(
            (1..=4).contains(&row) && (1..=4).contains(&col),
            "Matrix4x4::value: row {} col {} out of range [1,4]",
            row,
            col
        );
        self.m[row - 1][col - 1]
    }

    /// Sets the cell at (row, col), 1-indexed.
    /// Panics if row or col is not in 1..=4.
    #[inline]
    pub fn set_value(&mut self, row: usize, col: usize, value: f64) {
        assert!(
            (1..=4).contains(&row) && (1..=4).contains(&col),
            "Matrix4x4::set_value: row {} col {} out of range [1,4]",
            row,
            col
        );
        self.m[row - 1][col - 1] = value;
    }

    /// Creates a translation by (x, y, z).
    pub const fn translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a per-axis scaling.
    pub const fn scaling(x: f64, y: f64, z: f64) -> Self {
        Self {
            m: [
                [x, 0.0, 0.0, 0.0],
                [0.0, y, 0.0, 0.0],
                [0.0, 0.0, z, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation of `angle` radians about the X axis.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation of `angle` radians about the Y axis.
    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [
                [c, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation of `angle` radians about the Z axis.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation of `angle` radians about an arbitrary axis
    /// (Rodrigues' formula).
    ///
    /// The axis is normalized internally; a zero-length axis is rejected
    /// with [`XformError::InvalidArgument`].
    pub fn from_axis_angle(axis: &Vector3, angle: f64) -> Result<Self> {
        let axis = axis.normalized().ok_or_else(|| {
            XformError::InvalidArgument("rotation axis is too small to normalize".into())
        })?;
        let (x, y, z) = axis.coords();
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;

        let xx = x * x;
        let yy = y * y;
        let zz = z * z;
        let xy = x * y;
        let xz = x * z;
        let yz = y * z;

        Ok(Self {
            m: [
                [t * xx + c, t * xy + s * z, t * xz - s * y, 0.0],
                [t * xy - s * z, t * yy + c, t * yz + s * x, 0.0],
                [t * xz + s * y, t * yz - s * x, t * zz + c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        })
    }

    /// Creates the rotation matrix of a quaternion.
    #[inline]
    pub fn from_quaternion(q: &Quaternion) -> Self {
        q.to_rotation_matrix()
    }

    /// Creates a rotation from yaw (about Y), pitch (about X), and roll
    /// (about Z), all in radians.
    pub fn from_yaw_pitch_roll(yaw: f64, pitch: f64, roll: f64) -> Self {
        Quaternion::from_yaw_pitch_roll(yaw, pitch, roll).to_rotation_matrix()
    }

    /// Creates a right-handed view matrix looking from `eye` toward
    /// `target` with the given approximate `up` direction.
    ///
    /// Rejects a zero view direction (eye == target) and an `up` vector
    /// parallel to the view direction with
    /// [`XformError::InvalidArgument`].
    pub fn look_at(eye: &Vector3, target: &Vector3, up: &Vector3) -> Result<Self> {
        let z_axis = eye.subtracted(target).normalized().ok_or_else(|| {
            XformError::InvalidArgument("look_at: eye and target coincide".into())
        })?;
        let x_axis = up.crossed(&z_axis).normalized().ok_or_else(|| {
            XformError::InvalidArgument("look_at: up is parallel to the view direction".into())
        })?;
        let y_axis = z_axis.crossed(&x_axis);

        Ok(Self {
            m: [
                [x_axis.x(), y_axis.x(), z_axis.x(), 0.0],
                [x_axis.y(), y_axis.y(), z_axis.y(), 0.0],
                [x_axis.z(), y_axis.z(), z_axis.z(), 0.0],
                [-x_axis.dot(eye), -y_axis.dot(eye), -z_axis.dot(eye), 1.0],
            ],
        })
    }

    /// Creates a right-handed perspective projection from the dimensions
    /// of the near view plane.
    pub fn perspective(width: f64, height: f64, near: f64, far: f64) -> Result<Self> {
        check_view_planes(near, far)?;
        if width <= 0.0 || height <= 0.0 {
            return Err(XformError::InvalidArgument(format!(
                "view plane dimensions must be positive, got {width} x {height}"
            )));
        }
        Ok(Self {
            m: [
                [2.0 * near / width, 0.0, 0.0, 0.0],
                [0.0, 2.0 * near / height, 0.0, 0.0],
                [0.0, 0.0, far / (near - far), -1.0],
                [0.0, 0.0, near * far / (near - far), 0.0],
            ],
        })
    }

    /// Creates a right-handed perspective projection from a vertical
    /// field of view (radians) and an aspect ratio.
    pub fn perspective_fov(fov: f64, aspect: f64, near: f64, far: f64) -> Result<Self> {
        if fov <= 0.0 || fov >= std::f64::consts::PI {
            return Err(XformError::InvalidArgument(format!(
                "field of view must lie in (0, pi), got {fov}"
            )));
        }
        if aspect <= 0.0 {
            return Err(XformError::InvalidArgument(format!(
                "aspect ratio must be positive, got {aspect}"
            )));
        }
        check_view_planes(near, far)?;
        let y_scale = 1.0 / (fov * 0.5).tan();
        let x_scale = y_scale / aspect;
        Ok(Self {
            m: [
                [x_scale, 0.0, 0.0, 0.0],
                [0.0, y_scale, 0.0, 0.0],
                [0.0, 0.0, far / (near - far), -1.0],
                [0.0, 0.0, near * far / (near - far), 0.0],
            ],
        })
    }

    /// Creates a right-handed orthographic projection.
    pub fn orthographic(width: f64, height: f64, near: f64, far: f64) -> Result<Self> {
        check_view_planes(near, far)?;
        if width <= 0.0 || height <= 0.0 {
            return Err(XformError::InvalidArgument(format!(
                "view volume dimensions must be positive, got {width} x {height}"
            )));
        }
        Ok(Self {
            m: [
                [2.0 / width, 0.0, 0.0, 0.0],
                [0.0, 2.0 / height, 0.0, 0.0],
                [0.0, 0.0, 1.0 / (near - far), 0.0],
                [0.0, 0.0, near / (near - far), 1.0],
            ],
        })
    }

    /// Returns true if this is exactly the identity matrix.
    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Returns true if all sixteen cells differ by at most tolerance.
    pub fn is_equal(&self, other: &Matrix4x4, tolerance: f64) -> bool {
        for i in 0..4 {
            for j in 0..4 {
                if (self.m[i][j] - other.m[i][j]).abs() > tolerance {
                    return false;
                }
            }
        }
        true
    }

    /// The six 2x2 minors of rows 3 and 4, the shared subexpressions
    /// behind both [`Matrix4x4::determinant`] and
    /// [`Matrix4x4::inverted`]. Both entry points must expand over
    /// these same minors; they are not independent formulas.
    #[inline]
    fn lower_minors(&self) -> [f64; 6] {
        let [_, _, [i, j, k, l], [m, n, o, p]] = self.m;
        [
            k * p - l * o,
            j * p - l * n,
            j * o - k * n,
            i * p - l * m,
            i * o - k * m,
            i * n - j * m,
        ]
    }

    /// Computes the determinant by Laplace expansion along the first
    /// row, over the shared row-3/row-4 minors.
    pub fn determinant(&self) -> f64 {
        let [[a, b, c, d], [e, f, g, h], _, _] = self.m;
        let [kp_lo, jp_ln, jo_kn, ip_lm, io_km, in_jm] = self.lower_minors();

        a * (f * kp_lo - g * jp_ln + h * jo_kn)
            - b * (e * kp_lo - g * ip_lm + h * io_km)
            + c * (e * jp_ln - f * ip_lm + h * in_jm)
            - d * (e * jo_kn - f * io_km + g * in_jm)
    }

    /// Determinant of the upper-left 3x3 linear block.
    fn linear_determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Returns the inverse by the adjugate method, or
    /// [`XformError::NotInvertible`] if the determinant vanishes.
    pub fn inverted(&self) -> Result<Matrix4x4> {
        let [[a, b, c, d], [e, f, g, h], [i, j, k, l], [m, n, o, p]] = self.m;
        let [kp_lo, jp_ln, jo_kn, ip_lm, io_km, in_jm] = self.lower_minors();

        let a11 = f * kp_lo - g * jp_ln + h * jo_kn;
        let a12 = -(e * kp_lo - g * ip_lm + h * io_km);
        let a13 = e * jp_ln - f * ip_lm + h * in_jm;
        let a14 = -(e * jo_kn - f * io_km + g * in_jm);

        let det = a * a11 + b * a12 + c * a13 + d * a14;
        if det.abs() < precision::RESOLUTION {
            return Err(XformError::NotInvertible { determinant: det });
        }
        let inv = 1.0 / det;

        let gp_ho = g * p - h * o;
        let fp_hn = f * p - h * n;
        let fo_gn = f * o - g * n;
        let ep_hm = e * p - h * m;
        let eo_gm = e * o - g * m;
        let en_fm = e * n - f * m;

        let gl_hk = g * l - h * k;
        let fl_hj = f * l - h * j;
        let fk_gj = f * k - g * j;
        let el_hi = e * l - h * i;
        let ek_gi = e * k - g * i;
        let ej_fi = e * j - f * i;

        Ok(Matrix4x4 {
            m: [
                [
                    a11 * inv,
                    -(b * kp_lo - c * jp_ln + d * jo_kn) * inv,
                    (b * gp_ho - c * fp_hn + d * fo_gn) * inv,
                    -(b * gl_hk - c * fl_hj + d * fk_gj) * inv,
                ],
                [
                    a12 * inv,
                    (a * kp_lo - c * ip_lm + d * io_km) * inv,
                    -(a * gp_ho - c * ep_hm + d * eo_gm) * inv,
                    (a * gl_hk - c * el_hi + d * ek_gi) * inv,
                ],
                [
                    a13 * inv,
                    -(a * jp_ln - b * ip_lm + d * in_jm) * inv,
                    (a * fp_hn - b * ep_hm + d * en_fm) * inv,
                    -(a * fl_hj - b * el_hi + d * ej_fi) * inv,
                ],
                [
                    a14 * inv,
                    (a * jo_kn - b * io_km + c * in_jm) * inv,
                    -(a * fo_gn - b * eo_gm + c * en_fm) * inv,
                    (a * fk_gj - b * ek_gi + c * ej_fi) * inv,
                ],
            ],
        })
    }

    /// Inverts in place. All sixteen cells are read into locals before
    /// any cell is written, so the in-place and out-of-place variants
    /// agree.
    #[inline]
    pub fn invert(&mut self) -> Result<()> {
        *self = self.inverted()?;
        Ok(())
    }

    /// Returns `self * other`.
    ///
    /// Under the row-vector convention this applies `self` first, then
    /// `other`. An exact identity on either side short-circuits to a
    /// copy of the other operand, skipping the 64-multiply path and the
    /// rounding it would introduce.
    pub fn multiplied(&self, other: &Matrix4x4) -> Matrix4x4 {
        if self.is_identity() {
            return *other;
        }
        if other.is_identity() {
            return *self;
        }
        let mut result = Matrix4x4::zero();
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.m[i][k] * other.m[k][j];
                }
                result.m[i][j] = sum;
            }
        }
        result
    }

    /// Multiplies in place: `self = self * other`.
    #[inline]
    pub fn multiply(&mut self, other: &Matrix4x4) {
        *self = self.multiplied(other);
    }

    /// Transforms a point (row vector, w = 1): linear block plus
    /// translation.
    pub fn transform_point(&self, p: &Vector3) -> Vector3 {
        let m = &self.m;
        Vector3::new(
            p.x() * m[0][0] + p.y() * m[1][0] + p.z() * m[2][0] + m[3][0],
            p.x() * m[0][1] + p.y() * m[1][1] + p.z() * m[2][1] + m[3][1],
            p.x() * m[0][2] + p.y() * m[1][2] + p.z() * m[2][2] + m[3][2],
        )
    }

    /// Transforms a direction (row vector, w = 0): linear block only,
    /// translation ignored.
    pub fn transform_vector(&self, v: &Vector3) -> Vector3 {
        let m = &self.m;
        Vector3::new(
            v.x() * m[0][0] + v.y() * m[1][0] + v.z() * m[2][0],
            v.x() * m[0][1] + v.y() * m[1][1] + v.z() * m[2][1],
            v.x() * m[0][2] + v.y() * m[1][2] + v.z() * m[2][2],
        )
    }

    /// Transposes in place.
    pub fn transpose(&mut self) {
        *self = self.transposed();
    }

    /// Returns the transposed matrix.
    pub fn transposed(&self) -> Matrix4x4 {
        let mut result = Matrix4x4::zero();
        for i in 0..4 {
            for j in 0..4 {
                result.m[i][j] = self.m[j][i];
            }
        }
        result
    }

    /// Factors an affine transform into scale, rotation, and
    /// translation.
    ///
    /// Translation comes straight from row 4. Each axis scale is the
    /// length of the corresponding linear-block row. Sign recovery is a
    /// best-effort heuristic: when the linear determinant is negative a
    /// reflection is present, and the row whose component product is
    /// negative gets the flipped sign (X when the product test is
    /// inconclusive). The heuristic cannot distinguish every reflection
    /// assignment; callers needing an exact reflection factorization
    /// must not rely on it.
    ///
    /// Fails with [`XformError::Degenerate`] when any axis scale is
    /// numerically zero, since no rotation can be recovered from a
    /// singular linear block.
    pub fn decompose(&self) -> Result<Decomposition> {
        let translation = Vector3::new(self.m[3][0], self.m[3][1], self.m[3][2]);

        let rows = [
            Vector3::new(self.m[0][0], self.m[0][1], self.m[0][2]),
            Vector3::new(self.m[1][0], self.m[1][1], self.m[1][2]),
            Vector3::new(self.m[2][0], self.m[2][1], self.m[2][2]),
        ];
        let mut scale = [rows[0].length(), rows[1].length(), rows[2].length()];
        for (axis, s) in ["X", "Y", "Z"].iter().zip(scale.iter()) {
            if *s <= precision::CONFUSION {
                return Err(XformError::Degenerate(format!(
                    "{axis} axis scale is numerically zero, rotation cannot be recovered"
                )));
            }
        }

        if self.linear_determinant() < 0.0 {
            let flipped = (0..3)
                .find(|&r| {
                    let (x, y, z) = rows[r].coords();
                    x * y * z < 0.0
                })
                .unwrap_or(0);
            scale[flipped] = -scale[flipped];
        }

        let r = [
            rows[0].multiplied(1.0 / scale[0]),
            rows[1].multiplied(1.0 / scale[1]),
            rows[2].multiplied(1.0 / scale[2]),
        ];
        let rotation = Matrix4x4::from_rows([
            [r[0].x(), r[0].y(), r[0].z(), 0.0],
            [r[1].x(), r[1].y(), r[1].z(), 0.0],
            [r[2].x(), r[2].y(), r[2].z(), 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);

        Ok(Decomposition {
            scale: Vector3::new(scale[0], scale[1], scale[2]),
            rotation: Quaternion::from_rotation_matrix(&rotation),
            translation,
        })
    }
}

/// Shared near/far validation for the projection builders.
fn check_view_planes(near: f64, far: f64) -> Result<()> {
    if near <= 0.0 {
        return Err(XformError::InvalidArgument(format!(
            "near plane must be positive, got {near}"
        )));
    }
    if far <= 0.0 {
        return Err(XformError::InvalidArgument(format!(
            "far plane must be positive, got {far}"
        )));
    }
    if near >= far {
        return Err(XformError::InvalidArgument(format!(
            "near plane ({near}) must be closer than far plane ({far})"
        )));
    }
    Ok(())
}

impl std::ops::Mul for Matrix4x4 {
    type Output = Matrix4x4;
    #[inline]
    fn mul(self, other: Matrix4x4) -> Matrix4x4 {
        self.multiplied(&other)
    }
}

impl std::ops::MulAssign for Matrix4x4 {
    #[inline]
    fn mul_assign(&mut self, other: Matrix4x4) {
        self.multiply(&other);
    }
}
