//! Triangles, indexed triangles, and closest-point queries.

use nalgebra::{Point3, Vector3};

use super::{Aabb, Plane};
use crate::math::try_normalize;
use crate::TOLERANCE;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A triangle given by three vertex positions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle {
    /// Vertex positions in counter-clockwise order (front face).
    pub v: [Point3<f64>; 3],
}

impl Triangle {
    /// Create a triangle from three vertices.
    #[must_use]
    pub const fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v: [v0, v1, v2] }
    }

    /// Edge vectors `v1 - v0`, `v2 - v1`, `v0 - v2`.
    #[must_use]
    pub fn edges(&self) -> [Vector3<f64>; 3] {
        [
            self.v[1] - self.v[0],
            self.v[2] - self.v[1],
            self.v[0] - self.v[2],
        ]
    }

    /// Unnormalized normal (`(v1 - v0) × (v2 - v0)`), twice the area in length.
    #[must_use]
    pub fn scaled_normal(&self) -> Vector3<f64> {
        (self.v[1] - self.v[0]).cross(&(self.v[2] - self.v[0]))
    }

    /// Unit normal, or `None` for a degenerate triangle.
    #[must_use]
    pub fn normal(&self) -> Option<Vector3<f64>> {
        try_normalize(&self.scaled_normal())
    }

    /// Area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.scaled_normal().norm() * 0.5
    }

    /// Sum of the edge lengths.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        self.edges().iter().map(Vector3::norm).sum()
    }

    /// Centroid (mean of the vertices).
    #[must_use]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v[0].coords + self.v[1].coords + self.v[2].coords) / 3.0)
    }

    /// Tight bounding box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            self.v[0].inf(&self.v[1]).inf(&self.v[2]),
            self.v[0].sup(&self.v[1]).sup(&self.v[2]),
        )
    }

    /// Shortest edge length.
    #[must_use]
    pub fn min_edge_length(&self) -> f64 {
        self.edges()
            .iter()
            .map(Vector3::norm)
            .fold(f64::INFINITY, f64::min)
    }

    /// Longest edge length.
    #[must_use]
    pub fn max_edge_length(&self) -> f64 {
        self.edges().iter().map(Vector3::norm).fold(0.0, f64::max)
    }

    /// Whether the triangle has (almost) no area or a non-finite vertex.
    ///
    /// Zero-length edges and collinear vertices both count.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let n = self.scaled_normal();
        !n.iter().all(|c| c.is_finite()) || n.norm_squared() <= TOLERANCE * TOLERANCE
    }

    /// Supporting plane, or `None` when degenerate.
    #[must_use]
    pub fn to_plane(&self) -> Option<Plane> {
        Plane::from_points(&self.v[0], &self.v[1], &self.v[2])
    }

    /// Point of the triangle closest to `p`.
    ///
    /// Classifies `p` against the vertex, edge and face regions. Degenerate
    /// edges fall back to their midpoint and a zero-area triangle falls back
    /// to its first vertex, so the result is always finite for finite input.
    #[must_use]
    pub fn closest_point(&self, p: &Point3<f64>) -> Point3<f64> {
        let [a, b, c] = self.v;
        let ab = b - a;
        let ac = c - a;
        let ap = p - a;

        let d1 = ab.dot(&ap);
        let d2 = ac.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = p - b;
        let d3 = ab.dot(&bp);
        let d4 = ac.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let denom = d1 - d3;
            let v = if denom.abs() > TOLERANCE { d1 / denom } else { 0.5 };
            return a + ab * v;
        }

        let cp = p - c;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let denom = d2 - d6;
            let w = if denom.abs() > TOLERANCE { d2 / denom } else { 0.5 };
            return a + ac * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let num = d4 - d3;
            let denom = num + (d5 - d6);
            let w = if denom.abs() > TOLERANCE { num / denom } else { 0.5 };
            return b + (c - b) * w;
        }

        let total = va + vb + vc;
        if total.abs() < TOLERANCE {
            return a;
        }
        let denom = 1.0 / total;
        a + ab * (vb * denom) + ac * (vc * denom)
    }

    /// Closest points between a segment and this triangle.
    ///
    /// Returns `(point_on_segment, point_on_triangle)`. The segment is first
    /// intersected with the face; otherwise the minimum is taken over the
    /// segment endpoints projected onto the face and the three
    /// segment-edge pairs.
    #[must_use]
    pub fn closest_points_to_segment(&self, seg: &super::Segment) -> (Point3<f64>, Point3<f64>) {
        if let Some(hit) = self.segment_intersection(seg) {
            return (hit, hit);
        }

        let mut best = (seg.a, self.closest_point(&seg.a));
        let mut best_dist = (best.0 - best.1).norm_squared();
        let mut consider = |on_seg: Point3<f64>, on_tri: Point3<f64>| {
            let d = (on_seg - on_tri).norm_squared();
            if d < best_dist {
                best_dist = d;
                best = (on_seg, on_tri);
            }
        };

        consider(seg.b, self.closest_point(&seg.b));
        for i in 0..3 {
            let edge = super::Segment::new(self.v[i], self.v[(i + 1) % 3]);
            let (on_seg, on_edge) = seg.closest_points(&edge);
            consider(on_seg, on_edge);
        }
        best
    }

    /// Point where a segment crosses the triangle face, if it does.
    #[must_use]
    pub fn segment_intersection(&self, seg: &super::Segment) -> Option<Point3<f64>> {
        let dir = seg.b - seg.a;
        let e1 = self.v[1] - self.v[0];
        let e2 = self.v[2] - self.v[0];
        let p = dir.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < TOLERANCE {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = seg.a - self.v[0];
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(&e1);
        let v = dir.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(&q) * inv_det;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        Some(seg.a + dir * t)
    }
}

/// A triangle given by three indices into a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexedTriangle(pub [u32; 3]);

impl IndexedTriangle {
    /// Create an indexed triangle.
    #[must_use]
    pub const fn new(i0: u32, i1: u32, i2: u32) -> Self {
        Self([i0, i1, i2])
    }

    /// Whether the triangle references `vertex`.
    #[must_use]
    pub fn has_vertex(&self, vertex: u32) -> bool {
        self.0.contains(&vertex)
    }

    /// The vertex not on the edge `(a, b)`, if `a` and `b` both belong.
    #[must_use]
    pub fn opposite_vertex(&self, a: u32, b: u32) -> Option<u32> {
        if !self.has_vertex(a) || !self.has_vertex(b) || a == b {
            return None;
        }
        self.0.iter().copied().find(|&v| v != a && v != b)
    }

    /// Index (0, 1, 2) of the edge `(a, b)` in either winding.
    #[must_use]
    pub fn edge_index(&self, a: u32, b: u32) -> Option<usize> {
        (0..3).find(|&i| {
            let (p, q) = (self.0[i], self.0[(i + 1) % 3]);
            (p == a && q == b) || (p == b && q == a)
        })
    }

    /// Whether two corners share a vertex index.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.0[0] == self.0[1] || self.0[1] == self.0[2] || self.0[2] == self.0[0]
    }

    /// Look up the vertex positions. Returns `None` on an out-of-range index.
    #[must_use]
    pub fn resolve(&self, vertices: &[Point3<f64>]) -> Option<Triangle> {
        Some(Triangle::new(
            *vertices.get(self.0[0] as usize)?,
            *vertices.get(self.0[1] as usize)?,
            *vertices.get(self.0[2] as usize)?,
        ))
    }
}
