//! Capsule against a mesh tree.

use std::ops::ControlFlow;

use nalgebra::IsometryMatrix3;
use sim_types::{ColliderConfig, Contact};

use super::QueryState;
use crate::geometry::{Aabb, Capsule, Segment, Triangle};
use crate::math::sqrt;
use crate::mid_phase::{MeshTree, TreeVisitor};
use crate::TOLERANCE;

/// Contact between a capsule and one triangle, in the triangle's frame.
///
/// Uses the closest points between the core segment and the triangle, so
/// the result matches a sphere at the closest segment point. When the
/// segment pierces the triangle the face normal is used, oriented toward
/// the side holding more of the segment, and the depth includes how far
/// the deeper endpoint sits behind the face.
#[must_use]
pub fn capsule_triangle(capsule: &Capsule, tri: &Triangle, tolerance: f64) -> Option<Contact> {
    let (on_segment, on_triangle) = tri.closest_points_to_segment(&capsule.segment);
    let diff = on_segment - on_triangle;
    let dist_sq = diff.norm_squared();
    let reach = capsule.radius + tolerance;
    if dist_sq > reach * reach {
        return None;
    }

    let dist = sqrt(dist_sq);
    if dist > TOLERANCE {
        return Some(Contact::new(on_triangle, diff / dist, capsule.radius - dist));
    }

    let plane = tri.to_plane()?;
    let sa = plane.signed_distance(&capsule.segment.a);
    let sb = plane.signed_distance(&capsule.segment.b);
    let (normal, behind) = if sa + sb >= 0.0 {
        (plane.normal, sa.min(sb).min(0.0))
    } else {
        (-plane.normal, (-sa).min(-sb).min(0.0))
    };
    Some(Contact::new(on_triangle, normal, capsule.radius - behind))
}

/// Capsule against a placed mesh tree.
#[derive(Debug, Clone, Default)]
pub struct CapsuleCollider {
    state: QueryState,
}

impl CapsuleCollider {
    /// Create a collider.
    #[must_use]
    pub fn new(config: ColliderConfig) -> Self {
        Self {
            state: QueryState::new(config),
        }
    }

    /// Query state of the last call.
    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Collide a world-space capsule with `tree` placed at `transform`.
    ///
    /// Contacts are appended to `out` in world space. Returns whether any
    /// triangle was touched.
    pub fn collide(
        &mut self,
        capsule: &Capsule,
        tree: &MeshTree,
        transform: &IsometryMatrix3<f64>,
        out: &mut Vec<Contact>,
    ) -> bool {
        self.state.begin();
        let local = Capsule::new(
            Segment::new(
                transform.inverse_transform_point(&capsule.segment.a),
                transform.inverse_transform_point(&capsule.segment.b),
            ),
            capsule.radius,
        );
        let bounds = local.aabb().expanded(self.state.config().tolerance);
        let mut visitor = CapsuleVisitor {
            tree,
            capsule: local,
            bounds,
            transform,
            state: &mut self.state,
            out,
        };
        // Only first-contact mode stops the walk early.
        let stopped = tree.visit(&mut visitor).is_break();
        debug_assert!(!stopped || self.state.config().first_contact);
        self.state.contact_found()
    }
}

struct CapsuleVisitor<'a> {
    tree: &'a MeshTree,
    capsule: Capsule,
    bounds: Aabb,
    transform: &'a IsometryMatrix3<f64>,
    state: &'a mut QueryState,
    out: &'a mut Vec<Contact>,
}

impl TreeVisitor for CapsuleVisitor<'_> {
    fn enter(&mut self, aabb: &Aabb) -> Option<f64> {
        self.state.record_node();
        self.bounds.overlaps(aabb).then_some(0.0)
    }

    fn visit_primitive(&mut self, index: u32) -> ControlFlow<()> {
        let Some(tri) = self.tree.triangle(index).filter(|t| !t.is_degenerate()) else {
            return ControlFlow::Continue(());
        };
        self.state.record_test();

        let config = *self.state.config();
        if config.back_face_culling
            && super::sphere::behind(&tri, &self.capsule.segment.a)
            && super::sphere::behind(&tri, &self.capsule.segment.b)
        {
            return ControlFlow::Continue(());
        }
        let Some(contact) = capsule_triangle(&self.capsule, &tri, config.tolerance) else {
            return ControlFlow::Continue(());
        };

        self.out.push(
            Contact::new(
                self.transform * contact.position,
                self.transform * contact.normal,
                contact.depth,
            )
            .with_feature(index),
        );
        self.state.record_hit(index, 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mesh::TriangleMesh;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn floor() -> Triangle {
        Triangle::new(
            Point3::new(-5.0, -5.0, 0.0),
            Point3::new(5.0, -5.0, 0.0),
            Point3::new(0.0, 5.0, 0.0),
        )
    }

    fn capsule(a: [f64; 3], b: [f64; 3], radius: f64) -> Capsule {
        Capsule::new(Segment::new(Point3::from(a), Point3::from(b)), radius)
    }

    #[test]
    fn test_lying_capsule() {
        let c = capsule([-1.0, 0.0, 0.4], [1.0, 0.0, 0.4], 0.5);
        let contact = capsule_triangle(&c, &floor(), 0.0).unwrap();
        assert_relative_eq!(contact.depth, 0.1, epsilon = 1e-12);
        assert_relative_eq!(contact.normal, Vector3::z());
        assert_relative_eq!(contact.position.z, 0.0);
    }

    #[test]
    fn test_standing_capsule_touches_with_lower_cap() {
        let c = capsule([0.0, 0.0, 0.5], [0.0, 0.0, 3.0], 0.5);
        let contact = capsule_triangle(&c, &floor(), 0.0).unwrap();
        assert_relative_eq!(contact.depth, 0.0, epsilon = 1e-12);
        assert_relative_eq!(contact.position, Point3::origin(), epsilon = 1e-12);
    }

    #[test]
    fn test_piercing_capsule() {
        let c = capsule([0.0, 0.0, -0.3], [0.0, 0.0, 2.0], 0.5);
        let contact = capsule_triangle(&c, &floor(), 0.0).unwrap();
        assert_relative_eq!(contact.normal, Vector3::z());
        assert_relative_eq!(contact.depth, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_capsule_miss() {
        let c = capsule([0.0, 0.0, 1.0], [0.0, 0.0, 2.0], 0.5);
        assert!(capsule_triangle(&c, &floor(), 0.0).is_none());
    }

    #[test]
    fn test_capsule_collider_over_mesh() {
        let mesh = TriangleMesh::from_flat(
            vec![
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(-1.0, 1.0, 0.0),
            ],
            &[0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        let tree = MeshTree::new(mesh).unwrap();
        let mut collider = CapsuleCollider::default();
        let mut out = Vec::new();

        let lying = capsule([-0.5, 0.5, 0.2], [0.5, -0.5, 0.2], 0.25);
        assert!(collider.collide(&lying, &tree, &IsometryMatrix3::identity(), &mut out));
        assert_eq!(collider.state().touched().len(), 2);
        for c in &out {
            assert_relative_eq!(c.depth, 0.05, epsilon = 1e-12);
        }

        out.clear();
        let above = capsule([0.0, 0.0, 1.0], [0.0, 0.0, 2.0], 0.25);
        assert!(!collider.collide(&above, &tree, &IsometryMatrix3::identity(), &mut out));
        assert!(out.is_empty());
    }
}
