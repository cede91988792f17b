//! Planes in Hessian normal form.

use nalgebra::{IsometryMatrix3, Point3, Vector3};

use crate::math::try_normalize;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A plane `n · p + d = 0` with unit normal `n`.
///
/// Points with positive signed distance are on the front (normal) side.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plane {
    /// Unit normal.
    pub normal: Vector3<f64>,
    /// Offset: `-n · p` for any point `p` on the plane.
    pub d: f64,
}

impl Plane {
    /// Create a plane from a normal and offset. The normal is normalized;
    /// `None` if it has no direction.
    #[must_use]
    pub fn new(normal: Vector3<f64>, d: f64) -> Option<Self> {
        let len = normal.norm();
        let unit = try_normalize(&normal)?;
        Some(Self { normal: unit, d: d / len })
    }

    /// Plane through `point` with the given normal.
    #[must_use]
    pub fn from_point_normal(point: &Point3<f64>, normal: &Vector3<f64>) -> Option<Self> {
        let unit = try_normalize(normal)?;
        Some(Self {
            normal: unit,
            d: -unit.dot(&point.coords),
        })
    }

    /// Plane through three points, front side by counter-clockwise winding.
    /// `None` if the points are collinear.
    #[must_use]
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        Self::from_point_normal(a, &(b - a).cross(&(c - a)))
    }

    /// Signed distance of a point (positive on the front side).
    #[must_use]
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) + self.d
    }

    /// Orthogonal projection of a point onto the plane.
    #[must_use]
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        p - self.normal * self.signed_distance(p)
    }

    /// Whether a point lies on the plane within `eps`.
    #[must_use]
    pub fn belongs(&self, p: &Point3<f64>, eps: f64) -> bool {
        self.signed_distance(p).abs() <= eps
    }

    /// The same plane facing the other way.
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            d: -self.d,
        }
    }

    /// The plane after a rigid transform.
    #[must_use]
    pub fn transformed(&self, transform: &IsometryMatrix3<f64>) -> Self {
        let normal = transform.rotation * self.normal;
        let point = transform * Point3::from(-self.normal * self.d);
        Self {
            normal,
            d: -normal.dot(&point.coords),
        }
    }

    /// Ray parameter where `origin + t * dir` meets the plane, or `None`
    /// when the ray is parallel to it.
    #[must_use]
    pub fn ray_parameter(&self, origin: &Point3<f64>, dir: &Vector3<f64>) -> Option<f64> {
        let denom = self.normal.dot(dir);
        if denom.abs() < crate::TOLERANCE {
            return None;
        }
        Some(-self.signed_distance(origin) / denom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_points() {
        let plane = Plane::from_points(
            &Point3::new(0.0, 0.0, 2.0),
            &Point3::new(1.0, 0.0, 2.0),
            &Point3::new(0.0, 1.0, 2.0),
        )
        .unwrap();
        assert_relative_eq!(plane.normal, Vector3::z());
        assert_relative_eq!(plane.d, -2.0);
        assert_relative_eq!(plane.signed_distance(&Point3::new(5.0, 5.0, 3.0)), 1.0);
        assert!(plane.belongs(&Point3::new(-3.0, 7.0, 2.0), 1e-12));
    }

    #[test]
    fn test_collinear_points() {
        let a = Point3::origin();
        let b = Point3::new(1.0, 1.0, 1.0);
        let c = Point3::new(2.0, 2.0, 2.0);
        assert!(Plane::from_points(&a, &b, &c).is_none());
        assert!(Plane::new(Vector3::zeros(), 1.0).is_none());
    }

    #[test]
    fn test_new_normalizes() {
        let plane = Plane::new(Vector3::new(0.0, 0.0, 2.0), -4.0).unwrap();
        assert_relative_eq!(plane.normal, Vector3::z());
        assert_relative_eq!(plane.d, -2.0);
    }

    #[test]
    fn test_project_and_flip() {
        let plane = Plane::from_point_normal(&Point3::new(0.0, 0.0, 1.0), &Vector3::z()).unwrap();
        assert_relative_eq!(plane.project(&Point3::new(3.0, 4.0, 9.0)), Point3::new(3.0, 4.0, 1.0));
        let back = plane.flipped();
        assert_relative_eq!(back.signed_distance(&Point3::new(0.0, 0.0, 3.0)), -2.0);
    }

    #[test]
    fn test_transformed() {
        let plane = Plane::from_point_normal(&Point3::origin(), &Vector3::z()).unwrap();
        let iso = IsometryMatrix3::new(Vector3::new(0.0, 0.0, 5.0), Vector3::zeros());
        let moved = plane.transformed(&iso);
        assert_relative_eq!(moved.signed_distance(&Point3::new(1.0, 2.0, 5.0)), 0.0);
    }

    #[test]
    fn test_ray_parallel() {
        let plane = Plane::from_point_normal(&Point3::origin(), &Vector3::z()).unwrap();
        assert!(plane.ray_parameter(&Point3::new(0.0, 0.0, 1.0), &Vector3::x()).is_none());
        let t = plane
            .ray_parameter(&Point3::new(0.0, 0.0, 1.0), &-Vector3::z())
            .unwrap();
        assert_relative_eq!(t, 1.0);
    }
}
