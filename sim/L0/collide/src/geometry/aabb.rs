//! Axis-aligned bounding boxes.

use nalgebra::{IsometryMatrix3, Point3, Vector3};
use sim_types::{CollisionError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// X-axis.
    X,
    /// Y-axis.
    Y,
    /// Z-axis.
    Z,
}

impl Axis {
    /// Get all three axes.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::X, Self::Y, Self::Z]
    }

    /// Component index (0, 1 or 2).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// The axis with the given component index (wrapping modulo 3).
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        match index % 3 {
            0 => Self::X,
            1 => Self::Y,
            _ => Self::Z,
        }
    }
}

/// An axis-aligned bounding box.
///
/// Intervals are closed: boxes that merely touch overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3<f64>,
    /// Maximum corner of the bounding box.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a new AABB from minimum and maximum corners.
    #[must_use]
    pub const fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Create an AABB, rejecting inverted or non-finite corners.
    ///
    /// `index` identifies the object in the returned error.
    pub fn try_new(min: Point3<f64>, max: Point3<f64>, index: usize) -> Result<Self> {
        let aabb = Self::new(min, max);
        aabb.validate(index)?;
        Ok(aabb)
    }

    /// Create an AABB centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box containing every point, or `None` for no points.
    #[must_use]
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self::new(*first, *first);
        for p in iter {
            aabb.grow_point(p);
        }
        Some(aabb)
    }

    /// An inverted box that any `grow` turns into a real one.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Whether this is still the inverted [`Aabb::empty`] box (min > max somewhere).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Check that min ≤ max on every axis and all bounds are finite.
    pub fn validate(&self, index: usize) -> Result<()> {
        for axis in Axis::all() {
            let (lo, hi) = (self.min_on_axis(axis), self.max_on_axis(axis));
            if !lo.is_finite() || !hi.is_finite() {
                return Err(CollisionError::invalid_aabb(
                    index,
                    format!("non-finite bound on {axis:?}"),
                ));
            }
            if lo > hi {
                return Err(CollisionError::invalid_aabb(
                    index,
                    format!("min {lo} > max {hi} on {axis:?}"),
                ));
            }
        }
        Ok(())
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Half-extents.
    #[must_use]
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) * 0.5
    }

    /// Full size along each axis.
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Check if this AABB overlaps with another AABB.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Check overlap of the projections onto one axis.
    #[must_use]
    pub fn overlaps_on_axis(&self, other: &Self, axis: Axis) -> bool {
        self.min_on_axis(axis) <= other.max_on_axis(axis)
            && self.max_on_axis(axis) >= other.min_on_axis(axis)
    }

    /// Whether `other` lies entirely inside this box.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    /// Whether a point lies inside or on the boundary.
    #[must_use]
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Point of the box closest to `p` (`p` itself when inside).
    #[must_use]
    pub fn closest_point(&self, p: &Point3<f64>) -> Point3<f64> {
        p.sup(&self.min).inf(&self.max)
    }

    /// Squared distance from `p` to the box; zero inside.
    #[must_use]
    pub fn distance_squared(&self, p: &Point3<f64>) -> f64 {
        (p - self.closest_point(p)).norm_squared()
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Grow to include a point.
    pub fn grow_point(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow to include another box.
    pub fn grow(&mut self, other: &Self) {
        *self = self.merged(other);
    }

    /// Expand this AABB by a margin on all sides.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// World-space box enclosing this local box after a rigid transform.
    ///
    /// Uses the absolute rotation matrix, so axis-aligned rotations give
    /// exact results.
    #[must_use]
    pub fn transformed(&self, transform: &IsometryMatrix3<f64>) -> Self {
        let center = transform * self.center();
        let abs_rot = transform.rotation.matrix().abs();
        let half = abs_rot * self.half_extents();
        Self::from_center(center, half)
    }

    /// Get the extent (size) along a specific axis.
    #[must_use]
    pub fn extent(&self, axis: Axis) -> f64 {
        self.max_on_axis(axis) - self.min_on_axis(axis)
    }

    /// Get the minimum value along a specific axis.
    #[must_use]
    pub fn min_on_axis(&self, axis: Axis) -> f64 {
        self.min[axis.index()]
    }

    /// Get the maximum value along a specific axis.
    #[must_use]
    pub fn max_on_axis(&self, axis: Axis) -> f64 {
        self.max[axis.index()]
    }

    /// Axis with the largest extent (X wins ties, then Y).
    #[must_use]
    pub fn largest_axis(&self) -> Axis {
        let e = self.size();
        if e.x >= e.y && e.x >= e.z {
            Axis::X
        } else if e.y >= e.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Volume (zero for flat boxes).
    #[must_use]
    pub fn volume(&self) -> f64 {
        let e = self.size();
        e.x * e.y * e.z
    }

    /// Entry distance of a ray into this box, within `[0, max_t]`.
    ///
    /// A ray parallel to a slab either lies within it (the axis is ignored)
    /// or misses. Returns `0.0` when the origin is inside.
    #[must_use]
    pub fn ray_entry(&self, origin: &Point3<f64>, dir: &Vector3<f64>, max_t: f64) -> Option<f64> {
        let mut t_enter = 0.0_f64;
        let mut t_exit = max_t;
        for i in 0..3 {
            let (lo, hi) = (self.min[i], self.max[i]);
            if dir[i].abs() < crate::TOLERANCE {
                if origin[i] < lo || origin[i] > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[i];
            let mut t0 = (lo - origin[i]) * inv;
            let mut t1 = (hi - origin[i]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }
        Some(t_enter)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Point3::origin(), Point3::origin())
    }
}
