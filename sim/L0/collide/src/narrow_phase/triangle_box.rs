//! Triangle versus axis-aligned box, by separating axes.
//!
//! Thirteen candidate axes: the three box normals, the triangle normal and
//! the nine cross products of box axes with triangle edges. Cross products
//! that vanish (an edge parallel to a box axis) are skipped; the face axes
//! already cover that direction. Every axis is normalized so the one
//! [`TOLERANCE`] means the same distance on all of them.

use nalgebra::{Point3, Vector3};

use crate::geometry::Triangle;
use crate::math::try_normalize;
use crate::TOLERANCE;

/// Penetration of a box into a triangle along the minimum axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxContact {
    /// Unit axis pointing from the triangle toward the box: moving the box
    /// by `depth` along it separates the two.
    pub normal: Vector3<f64>,
    /// Penetration depth along `normal`. Zero when just touching.
    pub depth: f64,
    /// Midpoint between the deepest box point and the triangle's support
    /// point along the axis.
    pub point: Point3<f64>,
}

/// Whether a triangle overlaps the box `center ± half_extents`.
///
/// Touching within [`TOLERANCE`] counts as overlapping.
#[must_use]
pub fn overlap(tri: &Triangle, center: &Point3<f64>, half_extents: &Vector3<f64>) -> bool {
    let local = to_box_frame(tri, center);
    candidate_axes(&local)
        .iter()
        .flatten()
        .all(|axis| penetration(&local, half_extents, axis).is_some())
}

/// Minimum-penetration axis, depth and contact point, or `None` when some
/// axis separates the shapes.
#[must_use]
pub fn contact(
    tri: &Triangle,
    center: &Point3<f64>,
    half_extents: &Vector3<f64>,
) -> Option<BoxContact> {
    let local = to_box_frame(tri, center);

    let mut best: Option<(f64, Vector3<f64>)> = None;
    for axis in candidate_axes(&local).iter().flatten() {
        let (depth, normal) = penetration(&local, half_extents, axis)?;
        if best.map_or(true, |(d, _)| depth < d) {
            best = Some((depth, normal));
        }
    }
    let (depth, normal) = best?;

    // Deepest box corner against the normal; flat components stay centered.
    let box_support = Vector3::new(
        -sign_or_zero(normal.x) * half_extents.x,
        -sign_or_zero(normal.y) * half_extents.y,
        -sign_or_zero(normal.z) * half_extents.z,
    );
    let tri_support = triangle_support(&local, &normal);
    let mid = (box_support + tri_support) * 0.5;

    Some(BoxContact {
        normal,
        depth: depth.max(0.0),
        point: center + mid,
    })
}

fn to_box_frame(tri: &Triangle, center: &Point3<f64>) -> [Vector3<f64>; 3] {
    [tri.v[0] - center, tri.v[1] - center, tri.v[2] - center]
}

fn candidate_axes(v: &[Vector3<f64>; 3]) -> [Option<Vector3<f64>>; 13] {
    let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];
    let mut axes = [None; 13];
    axes[0] = Some(Vector3::x());
    axes[1] = Some(Vector3::y());
    axes[2] = Some(Vector3::z());
    axes[3] = try_normalize(&edges[0].cross(&edges[1]));
    let box_axes = [Vector3::x(), Vector3::y(), Vector3::z()];
    for (i, axis) in box_axes.iter().enumerate() {
        for (j, edge) in edges.iter().enumerate() {
            axes[4 + i * 3 + j] = try_normalize(&axis.cross(edge));
        }
    }
    axes
}

/// Overlap along a unit axis as `(depth, direction)`, or `None` if the
/// axis separates. The direction is `±axis`, whichever exits sooner.
fn penetration(
    v: &[Vector3<f64>; 3],
    half_extents: &Vector3<f64>,
    axis: &Vector3<f64>,
) -> Option<(f64, Vector3<f64>)> {
    let p = [axis.dot(&v[0]), axis.dot(&v[1]), axis.dot(&v[2])];
    let tri_min = p[0].min(p[1]).min(p[2]);
    let tri_max = p[0].max(p[1]).max(p[2]);
    let r = half_extents.x * axis.x.abs()
        + half_extents.y * axis.y.abs()
        + half_extents.z * axis.z.abs();

    if tri_min > r + TOLERANCE || tri_max < -r - TOLERANCE {
        return None;
    }

    let push_positive = tri_max + r;
    let push_negative = r - tri_min;
    if push_positive <= push_negative {
        Some((push_positive, *axis))
    } else {
        Some((push_negative, -axis))
    }
}

fn triangle_support(v: &[Vector3<f64>; 3], dir: &Vector3<f64>) -> Vector3<f64> {
    let best = v.iter().map(|p| p.dot(dir)).fold(f64::NEG_INFINITY, f64::max);
    let mut sum = Vector3::zeros();
    let mut count = 0.0;
    for p in v {
        if p.dot(dir) >= best - TOLERANCE {
            sum += p;
            count += 1.0;
        }
    }
    sum / count
}

fn sign_or_zero(x: f64) -> f64 {
    if x > TOLERANCE {
        1.0
    } else if x < -TOLERANCE {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::new(Point3::from(a), Point3::from(b), Point3::from(c))
    }

    fn unit() -> Vector3<f64> {
        Vector3::new(1.0, 1.0, 1.0)
    }

    #[test]
    fn test_triangle_inside_box() {
        let t = tri([-0.1, 0.0, 0.0], [0.1, 0.0, 0.0], [0.0, 0.1, 0.0]);
        assert!(overlap(&t, &Point3::origin(), &unit()));
    }

    #[test]
    fn test_triangle_far_away() {
        let t = tri([5.0, 0.0, 0.0], [6.0, 0.0, 0.0], [5.0, 1.0, 0.0]);
        assert!(!overlap(&t, &Point3::origin(), &unit()));
        assert!(contact(&t, &Point3::origin(), &unit()).is_none());
    }

    #[test]
    fn test_separated_by_triangle_normal() {
        // Large triangle in the plane z = 1.5 covering the box footprint.
        let t = tri([-10.0, -10.0, 1.5], [10.0, -10.0, 1.5], [0.0, 10.0, 1.5]);
        assert!(!overlap(&t, &Point3::origin(), &unit()));
        let touching = tri([-10.0, -10.0, 1.0], [10.0, -10.0, 1.0], [0.0, 10.0, 1.0]);
        assert!(overlap(&touching, &Point3::origin(), &unit()));
    }

    #[test]
    fn test_separated_by_oblique_normal() {
        // Slanted wall next to the box edge at x = y = 1: every box face
        // axis overlaps, only the triangle normal separates.
        let t = tri([2.2, 0.0, -5.0], [0.0, 2.2, -5.0], [0.0, 2.2, 5.0]);
        let aabb = t.aabb();
        assert!(aabb.min.x <= 1.0 && aabb.min.y <= 1.0);
        assert!(!overlap(&t, &Point3::origin(), &unit()));

        let t = tri([1.9, 0.0, -5.0], [0.0, 1.9, -5.0], [0.0, 1.9, 5.0]);
        assert!(overlap(&t, &Point3::origin(), &unit()));
    }

    #[test]
    fn test_contact_face_penetration() {
        // Floor triangle at z = 0, box center at z = 0.75: 0.25 deep.
        let t = tri([-10.0, -10.0, 0.0], [10.0, -10.0, 0.0], [0.0, 10.0, 0.0]);
        let center = Point3::new(0.0, 0.0, 0.75);
        let c = contact(&t, &center, &unit()).unwrap();
        assert_relative_eq!(c.normal, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(c.depth, 0.25, epsilon = 1e-12);
        assert_relative_eq!(c.point.z, -0.125, epsilon = 1e-12);
    }

    #[test]
    fn test_contact_touching_has_zero_depth() {
        let t = tri([-10.0, -10.0, 0.0], [10.0, -10.0, 0.0], [0.0, 10.0, 0.0]);
        let c = contact(&t, &Point3::new(0.0, 0.0, 1.0), &unit()).unwrap();
        assert_eq!(c.depth, 0.0);
        assert_relative_eq!(c.normal, Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_overlap_invariant_under_winding_and_translation() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..2000 {
            let mut p = || {
                Point3::new(
                    rng.gen_range(-3.0..3.0),
                    rng.gen_range(-3.0..3.0),
                    rng.gen_range(-3.0..3.0),
                )
            };
            let t = Triangle::new(p(), p(), p());
            let center = p();
            let half = Vector3::new(0.5, 1.0, 1.5);
            let expected = overlap(&t, &center, &half);

            let reversed = Triangle::new(t.v[2], t.v[1], t.v[0]);
            assert_eq!(overlap(&reversed, &center, &half), expected);

            let shift = Vector3::new(0.25, -0.5, 0.75);
            let moved = Triangle::new(t.v[0] + shift, t.v[1] + shift, t.v[2] + shift);
            assert_eq!(overlap(&moved, &(center + shift), &half), expected);

            assert_eq!(contact(&t, &center, &half).is_some(), expected);
        }
    }

    #[test]
    fn test_degenerate_triangle_uses_remaining_axes() {
        // Collinear vertices: no face normal, still tested by box and edge axes.
        let t = tri([-2.0, 0.0, 0.0], [0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        assert!(overlap(&t, &Point3::origin(), &unit()));
        let t = tri([-2.0, 3.0, 0.0], [0.0, 3.0, 0.0], [2.0, 3.0, 0.0]);
        assert!(!overlap(&t, &Point3::origin(), &unit()));
    }
}
