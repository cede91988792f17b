//! Spheres, segments, capsules and rays.

use nalgebra::{Point3, Vector3};

use super::Aabb;
use crate::math::try_normalize;
use crate::TOLERANCE;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sphere {
    /// Center.
    pub center: Point3<f64>,
    /// Radius (zero is allowed and behaves like a point).
    pub radius: f64,
}

impl Sphere {
    /// Create a sphere.
    #[must_use]
    pub const fn new(center: Point3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Bounding box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(
            self.center,
            Vector3::new(self.radius, self.radius, self.radius),
        )
    }
}

/// A line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Start point.
    pub a: Point3<f64>,
    /// End point.
    pub b: Point3<f64>,
}

impl Segment {
    /// Create a segment.
    #[must_use]
    pub const fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self { a, b }
    }

    /// Length.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    /// Bounding box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.a.inf(&self.b), self.a.sup(&self.b))
    }

    /// Point of the segment closest to `p`.
    #[must_use]
    pub fn closest_point(&self, p: &Point3<f64>) -> Point3<f64> {
        let ab = self.b - self.a;
        let len_sq = ab.norm_squared();
        if len_sq < TOLERANCE * TOLERANCE {
            return self.a;
        }
        let t = ((p - self.a).dot(&ab) / len_sq).clamp(0.0, 1.0);
        self.a + ab * t
    }

    /// Closest points between this segment and another.
    ///
    /// Returns `(point_on_self, point_on_other)`. Parallel and degenerate
    /// segments are handled by clamping, so the result is always finite.
    #[must_use]
    pub fn closest_points(&self, other: &Self) -> (Point3<f64>, Point3<f64>) {
        let d1 = self.b - self.a;
        let d2 = other.b - other.a;
        let r = self.a - other.a;
        let a = d1.norm_squared();
        let e = d2.norm_squared();
        let f = d2.dot(&r);
        let eps = TOLERANCE * TOLERANCE;

        if a <= eps && e <= eps {
            return (self.a, other.a);
        }

        let (s, t) = if a <= eps {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(&r);
            if e <= eps {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(&d2);
                let denom = a * e - b * b;
                let mut s = if denom > eps {
                    ((b * f - c * e) / denom).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let mut t = (b * s + f) / e;
                if t < 0.0 {
                    t = 0.0;
                    s = (-c / a).clamp(0.0, 1.0);
                } else if t > 1.0 {
                    t = 1.0;
                    s = ((b - c) / a).clamp(0.0, 1.0);
                }
                (s, t)
            }
        };

        (self.a + d1 * s, other.a + d2 * t)
    }
}

/// A capsule: the set of points within `radius` of a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Capsule {
    /// Core segment.
    pub segment: Segment,
    /// Radius.
    pub radius: f64,
}

impl Capsule {
    /// Create a capsule.
    #[must_use]
    pub const fn new(segment: Segment, radius: f64) -> Self {
        Self { segment, radius }
    }

    /// Bounding box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.segment.aabb().expanded(self.radius)
    }
}

/// A ray with a unit direction and a maximum length.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ray {
    /// Origin.
    pub origin: Point3<f64>,
    /// Unit direction.
    pub dir: Vector3<f64>,
    /// Maximum parameter (length).
    pub max_t: f64,
}

impl Ray {
    /// Create a ray. The direction is normalized; `None` if it is zero.
    #[must_use]
    pub fn new(origin: Point3<f64>, dir: Vector3<f64>, max_t: f64) -> Option<Self> {
        Some(Self {
            origin,
            dir: try_normalize(&dir)?,
            max_t,
        })
    }

    /// Ray covering a segment from `a` to `b`.
    #[must_use]
    pub fn from_segment(segment: &Segment) -> Option<Self> {
        Self::new(segment.a, segment.b - segment.a, segment.length())
    }

    /// Point at parameter `t`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.origin + self.dir * t
    }

    /// Bounding box of the ray's extent.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        let end = self.point_at(self.max_t);
        Aabb::new(self.origin.inf(&end), self.origin.sup(&end))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_segment_closest_point() {
        let seg = Segment::new(Point3::origin(), Point3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(seg.closest_point(&Point3::new(1.0, 5.0, 0.0)), Point3::new(1.0, 0.0, 0.0));
        assert_eq!(seg.closest_point(&Point3::new(-3.0, 0.0, 0.0)), seg.a);
        assert_eq!(seg.closest_point(&Point3::new(9.0, 1.0, 0.0)), seg.b);

        let dot = Segment::new(Point3::origin(), Point3::origin());
        assert_eq!(dot.closest_point(&Point3::new(1.0, 1.0, 1.0)), Point3::origin());
    }

    #[test]
    fn test_segment_closest_points_crossing() {
        let a = Segment::new(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let b = Segment::new(Point3::new(0.0, -1.0, 1.0), Point3::new(0.0, 1.0, 1.0));
        let (p, q) = a.closest_points(&b);
        assert_relative_eq!(p, Point3::origin());
        assert_relative_eq!(q, Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_segment_closest_points_parallel() {
        let a = Segment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let b = Segment::new(Point3::new(1.0, 1.0, 0.0), Point3::new(3.0, 1.0, 0.0));
        let (p, q) = a.closest_points(&b);
        assert_relative_eq!((p - q).norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_segment_closest_points_degenerate() {
        let a = Segment::new(Point3::new(1.0, 1.0, 0.0), Point3::new(1.0, 1.0, 0.0));
        let b = Segment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let (p, q) = a.closest_points(&b);
        assert_eq!(p, a.a);
        assert_relative_eq!(q, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_capsule_aabb() {
        let cap = Capsule::new(
            Segment::new(Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, 1.0)),
            0.5,
        );
        let aabb = cap.aabb();
        assert_eq!(aabb.min, Point3::new(-0.5, -0.5, -1.5));
        assert_eq!(aabb.max, Point3::new(0.5, 0.5, 1.5));
    }

    #[test]
    fn test_ray() {
        assert!(Ray::new(Point3::origin(), Vector3::zeros(), 1.0).is_none());
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 2.0), 3.0).unwrap();
        assert_relative_eq!(ray.dir, Vector3::z());
        assert_relative_eq!(ray.point_at(3.0), Point3::new(0.0, 0.0, 3.0));

        let seg = Segment::new(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 4.0, 0.0));
        let ray = Ray::from_segment(&seg).unwrap();
        assert_relative_eq!(ray.max_t, 4.0);
        assert_relative_eq!(ray.point_at(ray.max_t), seg.b);
    }
}
