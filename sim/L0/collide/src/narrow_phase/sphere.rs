//! Sphere against a mesh tree.

use std::ops::ControlFlow;

use nalgebra::{IsometryMatrix3, Point3, Vector3};
use sim_types::{ColliderConfig, Contact};

use super::QueryState;
use crate::geometry::{Aabb, Sphere, Triangle};
use crate::math::{normalize_or, sqrt};
use crate::mid_phase::{MeshTree, TreeVisitor};
use crate::TOLERANCE;

/// Contact between a sphere and one triangle, in the triangle's frame.
///
/// Touches when the distance from the center to the triangle is at most
/// `radius + tolerance`. Depth is `radius - distance`: zero when exactly
/// touching, slightly negative inside the tolerance band. The normal
/// points from the triangle toward the center; when the center lies on the
/// triangle the face normal is used.
#[must_use]
pub fn sphere_triangle(sphere: &Sphere, tri: &Triangle, tolerance: f64) -> Option<Contact> {
    let closest = tri.closest_point(&sphere.center);
    let diff = sphere.center - closest;
    let dist_sq = diff.norm_squared();
    let reach = sphere.radius + tolerance;
    if dist_sq > reach * reach {
        return None;
    }

    let dist = sqrt(dist_sq);
    let normal = if dist > TOLERANCE {
        diff / dist
    } else {
        normalize_or(&tri.scaled_normal(), Vector3::z())
    };
    Some(Contact::new(closest, normal, sphere.radius - dist))
}

/// Sphere against a placed mesh tree.
#[derive(Debug, Clone, Default)]
pub struct SphereCollider {
    state: QueryState,
}

impl SphereCollider {
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

    /// Collide a world-space sphere with `tree` placed at `transform`.
    ///
    /// Contacts are appended to `out` in world space, one per touching
    /// triangle, with the triangle index as feature. Returns whether any
    /// triangle was touched.
    pub fn collide(
        &mut self,
        sphere: &Sphere,
        tree: &MeshTree,
        transform: &IsometryMatrix3<f64>,
        out: &mut Vec<Contact>,
    ) -> bool {
        self.state.begin();
        let local = Sphere::new(transform.inverse_transform_point(&sphere.center), sphere.radius);
        let reach = sphere.radius + self.state.config().tolerance;
        let mut visitor = SphereVisitor {
            tree,
            sphere: local,
            reach_sq: reach * reach,
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

struct SphereVisitor<'a> {
    tree: &'a MeshTree,
    sphere: Sphere,
    reach_sq: f64,
    transform: &'a IsometryMatrix3<f64>,
    state: &'a mut QueryState,
    out: &'a mut Vec<Contact>,
}

impl TreeVisitor for SphereVisitor<'_> {
    fn enter(&mut self, aabb: &Aabb) -> Option<f64> {
        self.state.record_node();
        (aabb.distance_squared(&self.sphere.center) <= self.reach_sq).then_some(0.0)
    }

    fn visit_primitive(&mut self, index: u32) -> ControlFlow<()> {
        let Some(tri) = self.tree.triangle(index).filter(|t| !t.is_degenerate()) else {
            return ControlFlow::Continue(());
        };
        self.state.record_test();

        let config = *self.state.config();
        if config.back_face_culling && behind(&tri, &self.sphere.center) {
            return ControlFlow::Continue(());
        }
        let Some(contact) = sphere_triangle(&self.sphere, &tri, config.tolerance) else {
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

/// Whether `p` lies strictly behind the triangle's front face.
pub(crate) fn behind(tri: &Triangle, p: &Point3<f64>) -> bool {
    tri.to_plane()
        .is_some_and(|plane| plane.signed_distance(p) < 0.0)
}
