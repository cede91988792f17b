//! Sphere resting exactly on a flat mesh.
//!
//! A sphere of radius 4 sits on the center of the 2×2 square, touching it
//! at the midpoint of the shared diagonal. Both triangles report a contact
//! with depth exactly zero, and keep-deepest merging reduces them to one.
//! The same must hold after translating the whole scene and after turning
//! the mesh a quarter turn, as long as the rotation matrix is exact.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use nalgebra::{IsometryMatrix3, Point3, Translation3, Vector3};
use sim_collide::geometry::Sphere;
use sim_collide::merge::ContactMerger;
use sim_collide::narrow_phase::SphereCollider;
use sim_collide::pipeline::{CollisionWorld, Shape};
use sim_collide::MeshTree;
use sim_types::{CollisionConfig, MergeStrategy};

use crate::collision_test_utils::{quarter_turn_x, square_mesh, square_trees, translation, GEOM_TOL};

/// Run the sphere against the placed square and check the merged result.
fn check_touch(
    tree: &MeshTree,
    transform: &IsometryMatrix3<f64>,
    center: Point3<f64>,
) -> Vector3<f64> {
    let mut collider = SphereCollider::default();
    let mut raw = Vec::new();
    assert!(collider.collide(&Sphere::new(center, 4.0), tree, transform, &mut raw));
    assert_eq!(raw.len(), 2, "both triangles touch the sphere");
    for c in &raw {
        assert_eq!(c.depth, 0.0);
    }

    let manifold = ContactMerger::new().reduce(&raw, MergeStrategy::KeepDeepest, 4);
    assert_eq!(manifold.len(), 1);
    let contact = manifold.contacts()[0];
    assert_eq!(contact.depth, 0.0);
    assert!((contact.position - transform * Point3::origin()).norm() < GEOM_TOL);
    contact.normal
}

// ============================================================================
// Direct collider + merger
// ============================================================================

#[test]
fn sphere_touches_axis_aligned_square() {
    for tree in square_trees() {
        let normal = check_touch(&tree, &IsometryMatrix3::identity(), Point3::new(0.0, 0.0, 4.0));
        assert!((normal - Vector3::z()).norm() < GEOM_TOL);
    }
}

#[test]
fn sphere_touches_translated_square() {
    let transform = translation(10.0, 30.0, 40.0);
    for tree in square_trees() {
        let normal = check_touch(&tree, &transform, Point3::new(10.0, 30.0, 44.0));
        assert!((normal - Vector3::z()).norm() < GEOM_TOL);
    }
}

#[test]
fn sphere_touches_rotated_square() {
    let transform =
        IsometryMatrix3::from_parts(Translation3::new(10.0, 30.0, 40.0), quarter_turn_x());
    for tree in square_trees() {
        let normal = check_touch(&tree, &transform, Point3::new(10.0, 26.0, 40.0));
        assert!((normal - Vector3::new(0.0, -1.0, 0.0)).norm() < GEOM_TOL);
    }
}

#[test]
fn sphere_slightly_above_square_has_no_contact() {
    let mut collider = SphereCollider::default();
    let mut raw = Vec::new();
    for tree in square_trees() {
        let sphere = Sphere::new(Point3::new(0.0, 0.0, 4.001), 4.0);
        assert!(!collider.collide(&sphere, &tree, &IsometryMatrix3::identity(), &mut raw));
    }
    assert!(raw.is_empty());
}

// ============================================================================
// Through the collision world
// ============================================================================

#[test]
fn world_merges_exact_touch_to_one_contact() {
    let cases = [
        (translation(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 4.0)),
        (translation(10.0, 30.0, 40.0), Point3::new(10.0, 30.0, 44.0)),
        (
            IsometryMatrix3::from_parts(Translation3::new(10.0, 30.0, 40.0), quarter_turn_x()),
            Point3::new(10.0, 26.0, 40.0),
        ),
    ];
    for (transform, center) in cases {
        let mut world =
            CollisionWorld::new(CollisionConfig::new(MergeStrategy::KeepDeepest)).unwrap();
        let mesh = world
            .add(Shape::mesh(MeshTree::new(square_mesh()).unwrap()), transform)
            .unwrap();
        let ball = world
            .add(Shape::sphere(4.0), translation(center.x, center.y, center.z))
            .unwrap();

        let manifolds = world.step().unwrap();
        assert_eq!(manifolds.len(), 1);
        let m = &manifolds[0];
        assert_eq!((m.geom_a, m.geom_b), (mesh, ball));
        assert_eq!(m.len(), 1);
        assert_eq!(m.contacts()[0].depth, 0.0);
        assert_eq!(world.stats().raw_contacts, 2);
    }
}
