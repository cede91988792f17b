//! Contact merging on raw contact sets produced by the mesh colliders.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]

use std::collections::BTreeSet;

use nalgebra::{IsometryMatrix3, Point3, Rotation3, Vector3};
use sim_collide::geometry::{Capsule, Obb, Segment, Sphere};
use sim_collide::merge::{contact_key, merge_average, ContactMerger};
use sim_collide::mesh::TriangleMesh;
use sim_collide::mid_phase::MeshTree;
use sim_collide::narrow_phase::{CapsuleCollider, ObbCollider, SphereCollider};
use sim_types::{Contact, MergeStrategy};

use crate::collision_test_utils::{square_trees, GEOM_TOL};

/// Bumpy `n × n` grid; small enough that a sphere touches many triangles.
fn bumpy_grid(n: u32) -> MeshTree {
    let mut vertices = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            let (x, y) = (f64::from(i) * 0.25, f64::from(j) * 0.25);
            vertices.push(Point3::new(x, y, 0.05 * (x * 3.0).sin() * (y * 2.0).cos()));
        }
    }
    let mut indices = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let v = j * (n + 1) + i;
            indices.extend_from_slice(&[v, v + 1, v + n + 2, v, v + n + 2, v + n + 1]);
        }
    }
    MeshTree::new(TriangleMesh::from_flat(vertices, &indices).unwrap()).unwrap()
}

fn sphere_on_bumps() -> Vec<Contact> {
    let tree = bumpy_grid(16);
    let mut collider = SphereCollider::default();
    let mut raw = Vec::new();
    let sphere = Sphere::new(Point3::new(2.0, 2.0, 0.9), 1.0);
    assert!(collider.collide(&sphere, &tree, &IsometryMatrix3::identity(), &mut raw));
    raw
}

// ============================================================================
// Keep deepest
// ============================================================================

#[test]
fn keep_deepest_output_matches_distinct_keys() {
    let raw = sphere_on_bumps();
    assert!(raw.len() > 4, "sphere should touch several triangles");

    let keys: BTreeSet<u32> = raw.iter().map(|c| contact_key(&c.position)).collect();
    let merged = ContactMerger::new().keep_deepest(&raw);
    assert_eq!(merged.len(), keys.len());

    for kept in &merged {
        let key = contact_key(&kept.position);
        assert!(raw
            .iter()
            .filter(|c| contact_key(&c.position) == key)
            .all(|c| c.depth <= kept.depth));
    }
}

#[test]
fn keep_deepest_capacity_keeps_the_deepest() {
    let raw = sphere_on_bumps();
    let mut merger = ContactMerger::new();
    let all = merger.keep_deepest(&raw);

    let manifold = merger.reduce(&raw, MergeStrategy::KeepDeepest, 2);
    assert_eq!(manifold.capacity(), 2);
    assert_eq!(manifold.len(), 2.min(all.len()));

    let mut depths: Vec<f64> = all.iter().map(|c| c.depth).collect();
    depths.sort_by(|a, b| b.total_cmp(a));
    let kept_min = manifold
        .iter()
        .map(|c| c.depth)
        .fold(f64::INFINITY, f64::min);
    assert!(kept_min >= depths[1]);
}

#[test]
fn keep_deepest_is_idempotent() {
    let raw = sphere_on_bumps();
    let mut merger = ContactMerger::new();
    let once = merger.keep_deepest(&raw);
    let twice = merger.keep_deepest(&once);
    assert_eq!(once.len(), twice.len());
    for (a, b) in once.iter().zip(&twice) {
        assert_eq!(a.position, b.position);
        assert_eq!(a.depth, b.depth);
    }
}

#[test]
fn box_resting_on_square_merges_per_triangle() {
    let obb = Obb::new(
        Point3::new(0.0, 0.0, 0.45),
        Vector3::new(0.5, 0.5, 0.5),
        Rotation3::identity(),
    );
    for tree in square_trees() {
        let mut collider = ObbCollider::default();
        let mut raw = Vec::new();
        assert!(collider.collide(&obb, &tree, &IsometryMatrix3::identity(), &mut raw));
        assert_eq!(raw.len(), 2);

        let manifold = ContactMerger::new().reduce(&raw, MergeStrategy::KeepDeepest, 4);
        assert!(!manifold.is_empty() && manifold.len() <= raw.len());
        for c in manifold.iter() {
            assert!((c.depth - 0.05).abs() < GEOM_TOL);
            assert!((c.normal - Vector3::z()).norm() < GEOM_TOL);
        }
    }
}

// ============================================================================
// Average
// ============================================================================

#[test]
fn average_of_flat_contacts_points_up() {
    let segment = Segment::new(Point3::new(-0.5, -0.2, 0.2), Point3::new(0.5, 0.3, 0.2));
    let capsule = Capsule::new(segment, 0.25);
    for tree in square_trees() {
        let mut collider = CapsuleCollider::default();
        let mut raw = Vec::new();
        assert!(collider.collide(&capsule, &tree, &IsometryMatrix3::identity(), &mut raw));

        let merged = merge_average(&raw).unwrap();
        assert!((merged.normal - Vector3::z()).norm() < GEOM_TOL);
        // Depth is the root-mean-square of the weighted normal sum.
        let n = raw.len() as f64;
        assert!((merged.depth - 0.05 * n.sqrt()).abs() < 1e-9);

        let mean = raw.iter().fold(Vector3::zeros(), |acc, c| acc + c.position.coords) / n;
        assert!((merged.position.coords - mean).norm() < GEOM_TOL);
    }
}

#[test]
fn average_of_zero_depth_contacts_keeps_first_normal() {
    let raw = [
        Contact::new(Point3::origin(), Vector3::z(), 0.0),
        Contact::new(Point3::new(0.2, 0.0, 0.0), Vector3::x(), 0.0),
    ];
    let merged = merge_average(&raw).unwrap();
    assert_eq!(merged.normal, Vector3::z());
    assert_eq!(merged.depth, 0.0);
    assert_eq!(merged.position, Point3::new(0.1, 0.0, 0.0));
}

#[test]
fn average_of_opposing_normals_keeps_first_normal() {
    let raw = [
        Contact::new(Point3::origin(), Vector3::z(), 0.1),
        Contact::new(Point3::origin(), -Vector3::z(), 0.1),
    ];
    let merged = merge_average(&raw).unwrap();
    assert_eq!(merged.normal, Vector3::z());
    assert!(merged.depth.abs() < GEOM_TOL);
}

#[test]
fn average_reduce_gives_one_contact() {
    let raw = sphere_on_bumps();
    let manifold = ContactMerger::new().reduce(&raw, MergeStrategy::Average, 4);
    assert_eq!(manifold.len(), 1);
    let c = manifold.contacts()[0];
    assert!(c.depth > 0.0);
    assert!(c.normal.z > 0.9, "bumps are shallow, so the normal is mostly up");
    assert!(merge_average(&[]).is_none());
}
