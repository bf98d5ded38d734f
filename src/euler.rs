//! Euler angles over six axis orders.
//!
//! An [`EulerAngle`] is three radian rotations about the named axes plus
//! an [`EulerOrder`] naming the sequence in which they are applied. The
//! order is part of the value's identity: the same (x, y, z) triple
//! under two orders is, in general, two different rotations.
//!
//! Order semantics follow application order under the crate's row-vector
//! convention: `XYZ` means rotate about X first, then Y, then Z, i.e.
//! `M = Rx * Ry * Rz`.
//!
//! Each order has one matrix entry holding the sine of its pole angle.
//! When that sine saturates (within [`crate::precision::GIMBAL_LOCK`] of
//! 1) the two remaining angles collapse to a single degree of freedom:
//! extraction then pins the last-applied angle to 0 and recovers the
//! first-applied angle from a combined atan2 of entries that stay well
//! defined at the pole. Gimbal lock is a valid output, never an error.

use serde::{Deserialize, Serialize};

use crate::mat4::Matrix4x4;
use crate::precision;

/// Axis order of an Euler-angle triple, named in application order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EulerOrder {
    /// X, then Y, then Z. Pole on the Y angle.
    XYZ,
    /// X, then Z, then Y. Pole on the Z angle.
    XZY,
    /// Y, then X, then Z. Pole on the X angle.
    YXZ,
    /// Y, then Z, then X. Pole on the Z angle.
    YZX,
    /// Z, then X, then Y. Pole on the X angle.
    ZXY,
    /// Z, then Y, then X. Pole on the Y angle.
    ZYX,
}

impl EulerOrder {
    /// All six orders, for exhaustive iteration in callers and tests.
    pub const ALL: [EulerOrder; 6] = [
        EulerOrder::XYZ,
        EulerOrder::XZY,
        EulerOrder::YXZ,
        EulerOrder::YZX,
        EulerOrder::ZXY,
        EulerOrder::ZYX,
    ];
}

impl Default for EulerOrder {
    fn default() -> Self {
        EulerOrder::XYZ
    }
}

/// Three axis rotations (radians) applied in the sequence named by
/// `order`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EulerAngle {
    x: f64,
    y: f64,
    z: f64,
    order: EulerOrder,
}

impl EulerAngle {
    /// Creates an Euler-angle triple.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, order: EulerOrder) -> Self {
        Self { x, y, z, order }
    }

    /// Returns the rotation about X (radians).
    #[inline]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Returns the rotation about Y (radians).
    #[inline]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Returns the rotation about Z (radians).
    #[inline]
    pub const fn z(&self) -> f64 {
        self.z
    }

    /// Returns the axis order.
    #[inline]
    pub const fn order(&self) -> EulerOrder {
        self.order
    }

    /// Builds the rotation matrix for this triple.
    ///
    /// Each order uses its algebraically simplified closed form rather
    /// than multiplying three elementary matrices at runtime; the unit
    /// tests hold every form equal to that product.
    pub fn to_rotation_matrix(&self) -> Matrix4x4 {
        let (sx, cx) = self.x.sin_cos();
        let (sy, cy) = self.y.sin_cos();
        let (sz, cz) = self.z.sin_cos();

        let linear = match self.order {
            EulerOrder::XYZ => [
                [cy * cz, cy * sz, -sy],
                [sx * sy * cz - cx * sz, sx * sy * sz + cx * cz, sx * cy],
                [cx * sy * cz + sx * sz, cx * sy * sz - sx * cz, cx * cy],
            ],
            EulerOrder::XZY => [
                [cz * cy, sz, -cz * sy],
                [sx * sy - cx * sz * cy, cx * cz, cx * sz * sy + sx * cy],
                [cx * sy + sx * sz * cy, -sx * cz, cx * cy - sx * sz * sy],
            ],
            EulerOrder::YXZ => [
                [cy * cz - sy * sx * sz, cy * sz + sy * sx * cz, -sy * cx],
                [-cx * sz, cx * cz, sx],
                [sy * cz + cy * sx * sz, sy * sz - cy * sx * cz, cy * cx],
            ],
            EulerOrder::YZX => [
                [cy * cz, cy * sz * cx + sy * sx, cy * sz * sx - sy * cx],
                [-sz, cz * cx, cz * sx],
                [sy * cz, sy * sz * cx - cy * sx, sy * sz * sx + cy * cx],
            ],
            EulerOrder::ZXY => [
                [cz * cy + sz * sx * sy, sz * cx, sz * sx * cy - cz * sy],
                [cz * sx * sy - sz * cy, cz * cx, sz * sy + cz * sx * cy],
                [cx * sy, -sx, cx * cy],
            ],
            EulerOrder::ZYX => [
                [cz * cy, sz * cx + cz * sy * sx, sz * sx - cz * sy * cx],
                [-sz * cy, cz * cx - sz * sy * sx, cz * sx + sz * sy * cx],
                [sy, -cy * sx, cy * cx],
            ],
        };

        Matrix4x4::from_rows([
            [linear[0][0], linear[0][1], linear[0][2], 0.0],
            [linear[1][0], linear[1][1], linear[1][2], 0.0],
            [linear[2][0], linear[2][1], linear[2][2], 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Extracts the Euler angles of a rotation matrix under the given
    /// order.
    ///
    /// The linear block must be a pure rotation. Away from the pole both
    /// free angles come from independent atan2 expressions; at the pole
    /// (pole sine within [`precision::GIMBAL_LOCK`] of 1) infinitely
    /// many triples produce the same rotation, so the last-applied angle
    /// is pinned to 0 and the first-applied angle absorbs the combined
    /// rotation. Angle-level round-trips are therefore only guaranteed
    /// away from the pole; matrix-level round-trips hold everywhere.
    pub fn from_rotation_matrix(m: &Matrix4x4, order: EulerOrder) -> Self {
        let m11 = m.value(1, 1);
        let m12 = m.value(1, 2);
        let m13 = m.value(1, 3);
        let m21 = m.value(2, 1);
        let m22 = m.value(2, 2);
        let m23 = m.value(2, 3);
        let m31 = m.value(3, 1);
        let m32 = m.value(3, 2);
        let m33 = m.value(3, 3);

        let locked = |pole_sin: f64| pole_sin.abs() >= 1.0 - precision::GIMBAL_LOCK;

        let (x, y, z) = match order {
            EulerOrder::XYZ => {
                let sy = -m13;
                let y = sy.clamp(-1.0, 1.0).asin();
                if locked(sy) {
                    (f64::atan2(-m32, m22), y, 0.0)
                } else {
                    (f64::atan2(m23, m33), y, f64::atan2(m12, m11))
                }
            }
            EulerOrder::XZY => {
                let sz = m12;
                let z = sz.clamp(-1.0, 1.0).asin();
                if locked(sz) {
                    (f64::atan2(m23, m33), 0.0, z)
                } else {
                    (f64::atan2(-m32, m22), f64::atan2(-m13, m11), z)
                }
            }
            EulerOrder::YXZ => {
                let sx = m23;
                let x = sx.clamp(-1.0, 1.0).asin();
                if locked(sx) {
                    (x, f64::atan2(m31, m11), 0.0)
                } else {
                    (x, f64::atan2(-m13, m33), f64::atan2(-m21, m22))
                }
            }
            EulerOrder::YZX => {
                let sz = -m21;
                let z = sz.clamp(-1.0, 1.0).asin();
                if locked(sz) {
                    (0.0, f64::atan2(-m13, m33), z)
                } else {
                    (f64::atan2(m23, m22), f64::atan2(m31, m11), z)
                }
            }
            EulerOrder::ZXY => {
                let sx = -m32;
                let x = sx.clamp(-1.0, 1.0).asin();
                if locked(sx) {
                    (x, 0.0, f64::atan2(-m21, m11))
                } else {
                    (x, f64::atan2(m31, m33), f64::atan2(m12, m22))
                }
            }
            EulerOrder::ZYX => {
                let sy = m31;
                let y = sy.clamp(-1.0, 1.0).asin();
                if locked(sy) {
                    (0.0, y, f64::atan2(m12, m22))
                } else {
                    (f64::atan2(-m32, m33), y, f64::atan2(-m21, m11))
                }
            }
        };

        Self { x, y, z, order }
    }

    /// Returns true if the two triples have the same order and each
    /// angle differs by at most tolerance.
    #[inline]
    pub fn is_equal(&self, other: &EulerAngle, tolerance: f64) -> bool {
        self.order == other.order
            && (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    /// The closed form of each order must equal the product of its three
    /// elementary rotations, composed in application order.
    fn elementary_product(e: &EulerAngle) -> Matrix4x4 {
        let rx = Matrix4x4::rotation_x(e.x());
        let ry = Matrix4x4::rotation_y(e.y());
        let rz = Matrix4x4::rotation_z(e.z());
        match e.order() {
            EulerOrder::XYZ => rx.multiplied(&ry).multiplied(&rz),
            EulerOrder::XZY => rx.multiplied(&rz).multiplied(&ry),
            EulerOrder::YXZ => ry.multiplied(&rx).multiplied(&rz),
            EulerOrder::YZX => ry.multiplied(&rz).multiplied(&rx),
            EulerOrder::ZXY => rz.multiplied(&rx).multiplied(&ry),
            EulerOrder::ZYX => rz.multiplied(&ry).multiplied(&rx),
        }
    }

    #[test]
    fn test_euler_closed_forms_match_elementary_products() {
        for order in EulerOrder::ALL {
            let e = EulerAngle::new(0.31, -0.67, 1.23, order);
            let closed = e.to_rotation_matrix();
            let product = elementary_product(&e);
            assert!(
                closed.is_equal(&product, 1e-12),
                "closed form diverges for {:?}",
                order
            );
        }
    }

    #[test]
    fn test_euler_roundtrip_away_from_pole() {
        // Pole sines stay below 0.9 for these triples under all orders.
        let samples = [
            (0.1, 0.2, 0.3),
            (-0.5, 0.4, -0.3),
            (0.7, -0.6, 0.2),
            (-0.2, -0.4, -0.6),
        ];
        for order in EulerOrder::ALL {
            for (x, y, z) in samples {
                let e = EulerAngle::new(x, y, z, order);
                let m = e.to_rotation_matrix();
                let back = EulerAngle::from_rotation_matrix(&m, order);
                assert!(
                    back.is_equal(&e, 1e-10),
                    "angle round-trip failed for {:?} {:?}",
                    order,
                    (x, y, z)
                );
            }
        }
    }

    #[test]
    fn test_euler_roundtrip_matrix_at_pole() {
        // At the pole only the combined angle survives; the matrix must
        // still round-trip even though the angles cannot.
        for order in EulerOrder::ALL {
            for pole in [FRAC_PI_2, -FRAC_PI_2] {
                let e = match order {
                    EulerOrder::XYZ | EulerOrder::ZYX => EulerAngle::new(0.3, pole, 0.2, order),
                    EulerOrder::XZY | EulerOrder::YZX => EulerAngle::new(0.3, 0.2, pole, order),
                    EulerOrder::YXZ | EulerOrder::ZXY => EulerAngle::new(pole, 0.3, 0.2, order),
                };
                let m = e.to_rotation_matrix();
                let back = EulerAngle::from_rotation_matrix(&m, order);
                let rebuilt = back.to_rotation_matrix();
                assert!(
                    rebuilt.is_equal(&m, 1e-10),
                    "matrix round-trip failed at pole for {:?}",
                    order
                );
            }
        }
    }

    #[test]
    fn test_euler_locked_branch_pins_last_angle() {
        for order in EulerOrder::ALL {
            let e = match order {
                EulerOrder::XYZ | EulerOrder::ZYX => EulerAngle::new(0.4, FRAC_PI_2, -0.1, order),
                EulerOrder::XZY | EulerOrder::YZX => EulerAngle::new(0.4, -0.1, FRAC_PI_2, order),
                EulerOrder::YXZ | EulerOrder::ZXY => EulerAngle::new(FRAC_PI_2, 0.4, -0.1, order),
            };
            let back = EulerAngle::from_rotation_matrix(&e.to_rotation_matrix(), order);
            let pinned = match order {
                EulerOrder::XYZ | EulerOrder::YXZ => back.z(),
                EulerOrder::XZY | EulerOrder::ZXY => back.y(),
                EulerOrder::YZX | EulerOrder::ZYX => back.x(),
            };
            assert_eq!(pinned, 0.0, "locked branch must pin for {:?}", order);
        }
    }

    #[test]
    fn test_euler_order_is_part_of_identity() {
        let xyz = EulerAngle::new(0.4, 0.5, 0.6, EulerOrder::XYZ);
        let zyx = EulerAngle::new(0.4, 0.5, 0.6, EulerOrder::ZYX);
        assert!(!xyz.is_equal(&zyx, 1e-9));
        assert!(!xyz
            .to_rotation_matrix()
            .is_equal(&zyx.to_rotation_matrix(), 1e-9));
    }

    #[test]
    fn test_euler_single_axis_reduces_to_elementary() {
        for order in EulerOrder::ALL {
            let e = EulerAngle::new(0.0, 0.9, 0.0, order);
            assert!(e
                .to_rotation_matrix()
                .is_equal(&Matrix4x4::rotation_y(0.9), 1e-12));
        }
    }

    #[test]
    fn test_euler_extraction_near_but_not_at_pole() {
        // Just outside the saturation window the unlocked branch must
        // still resolve both free angles.
        let y = (1.0_f64 - 1e-3).asin();
        let e = EulerAngle::new(0.2, y, -0.3, EulerOrder::XYZ);
        let back = EulerAngle::from_rotation_matrix(&e.to_rotation_matrix(), EulerOrder::XYZ);
        assert!(back.is_equal(&e, 1e-6));
    }
}
