//! Oriented bounding boxes.

use nalgebra::{IsometryMatrix3, Matrix3, Point3, Rotation3, Vector3};

use super::Aabb;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A box with its own orientation.
///
/// The columns of `rotation` are the box axes in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Obb {
    /// Center in world space.
    pub center: Point3<f64>,
    /// Half-extents along the box axes.
    pub half_extents: Vector3<f64>,
    /// Orientation of the box axes.
    pub rotation: Rotation3<f64>,
}

impl Obb {
    /// Create an oriented box.
    #[must_use]
    pub const fn new(center: Point3<f64>, half_extents: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
        Self {
            center,
            half_extents,
            rotation,
        }
    }

    /// A local axis-aligned box placed by a rigid transform.
    #[must_use]
    pub fn from_aabb(aabb: &Aabb, transform: &IsometryMatrix3<f64>) -> Self {
        Self {
            center: transform * aabb.center(),
            half_extents: aabb.half_extents(),
            rotation: transform.rotation,
        }
    }

    /// World-space axis-aligned box enclosing this box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        let half = self.rotation.matrix().abs() * self.half_extents;
        Aabb::from_center(self.center, half)
    }

    /// Express a world point in the box frame (origin at the center).
    #[must_use]
    pub fn to_local(&self, p: &Point3<f64>) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(&(p - self.center))
    }

    /// Whether a point lies inside or on the boundary.
    #[must_use]
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        let local = self.to_local(p);
        (0..3).all(|i| local[i].abs() <= self.half_extents[i])
    }

    /// The eight corners in world space. Bit `k` of the corner index
    /// selects the positive side of axis `k`.
    #[must_use]
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let axes = self.rotation.matrix();
        let mut out = [self.center; 8];
        for (i, corner) in out.iter_mut().enumerate() {
            let mut offset = Vector3::zeros();
            for k in 0..3 {
                let sign = if i & (1 << k) == 0 { -1.0 } else { 1.0 };
                offset += axes.column(k) * (sign * self.half_extents[k]);
            }
            *corner += offset;
        }
        out
    }

    /// Support point in direction `dir`.
    #[must_use]
    pub fn support(&self, dir: &Vector3<f64>) -> Point3<f64> {
        let local = self.rotation.inverse_transform_vector(dir);
        let mut offset = Vector3::zeros();
        for k in 0..3 {
            let sign = if local[k] >= 0.0 { 1.0 } else { -1.0 };
            offset += self.rotation.matrix().column(k) * (sign * self.half_extents[k]);
        }
        self.center + offset
    }

    /// Separating axis test against a world-space AABB.
    ///
    /// Tests the three face axes of each box and the nine edge cross
    /// products. Touching boxes overlap.
    #[must_use]
    pub fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        let ea = aabb.half_extents();
        let eb = self.half_extents;
        let r: Matrix3<f64> = *self.rotation.matrix();
        let t = self.center - aabb.center();
        let eps = crate::TOLERANCE;
        let abs_r = r.abs().add_scalar(eps);

        for i in 0..3 {
            let ra = ea[i];
            let rb = eb.dot(&abs_r.row(i).transpose());
            if t[i].abs() > ra + rb {
                return false;
            }
        }

        for j in 0..3 {
            let ra = ea.dot(&abs_r.column(j));
            let rb = eb[j];
            if t.dot(&r.column(j)).abs() > ra + rb {
                return false;
            }
        }

        for i in 0..3 {
            let i1 = (i + 1) % 3;
            let i2 = (i + 2) % 3;
            for j in 0..3 {
                let j1 = (j + 1) % 3;
                let j2 = (j + 2) % 3;
                let ra = ea[i1] * abs_r[(i2, j)] + ea[i2] * abs_r[(i1, j)];
                let rb = eb[j1] * abs_r[(i, j2)] + eb[j2] * abs_r[(i, j1)];
                let dist = (t[i2] * r[(i1, j)] - t[i1] * r[(i2, j)]).abs();
                if dist > ra + rb {
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    fn unit_obb(center: Point3<f64>, angle_z: f64) -> Obb {
        Obb::new(
            center,
            Vector3::new(1.0, 1.0, 1.0),
            Rotation3::from_axis_angle(&Vector3::z_axis(), angle_z),
        )
    }

    #[test]
    fn test_aabb_of_rotated_box() {
        let obb = unit_obb(Point3::origin(), FRAC_PI_4);
        let aabb = obb.aabb();
        let s = 2.0_f64.sqrt();
        assert_relative_eq!(aabb.max.x, s, epsilon = 1e-12);
        assert_relative_eq!(aabb.max.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_corners_inside() {
        let obb = unit_obb(Point3::new(3.0, -1.0, 2.0), 0.7);
        let aabb = obb.aabb().expanded(1e-12);
        for c in obb.corners() {
            assert!(aabb.contains_point(&c));
            assert!(obb.contains_point(&nalgebra::center(&c, &obb.center)));
        }
    }

    #[test]
    fn test_overlaps_aabb() {
        let aabb = Aabb::from_center(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));

        // Rotated 45 degrees: the AABB of the OBB overlaps, the OBB does not.
        let obb = unit_obb(Point3::new(2.3, 2.3, 0.0), FRAC_PI_4);
        assert!(obb.aabb().overlaps(&aabb));
        assert!(!obb.overlaps_aabb(&aabb));

        let obb = unit_obb(Point3::new(2.3, 0.0, 0.0), FRAC_PI_4);
        assert!(obb.overlaps_aabb(&aabb));

        // Touching faces
        let obb = unit_obb(Point3::new(2.0, 0.0, 0.0), 0.0);
        assert!(obb.overlaps_aabb(&aabb));
    }

    #[test]
    fn test_support() {
        let obb = unit_obb(Point3::origin(), 0.0);
        assert_relative_eq!(obb.support(&Vector3::new(1.0, -2.0, 0.5)), Point3::new(1.0, -1.0, 1.0));
    }
}
