//! The per-step collision world on a mixed scene.
//!
//! One ground plane under several isolated groups of shapes, spread along
//! X so that only the intended pairs (plus everything against the ground)
//! reach the narrow phase.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use nalgebra::Vector3;
use sim_collide::heightfield::{HeightField, HeightFieldData};
use sim_collide::pipeline::{CollisionWorld, Shape};
use sim_collide::MeshTree;
use sim_types::{BroadPhaseConfig, CollisionConfig, ContactManifold, GeomId, MergeStrategy};

use crate::collision_test_utils::{init_tracing, square_mesh, translation, GEOM_TOL};

const GROUND: GeomId = GeomId(0);
const FALLING: GeomId = GeomId(1);

/// Ground, a falling ball, a ball on a box, two side-by-side capsules, a ball
/// on a height field and a lone mesh.
fn playground(config: CollisionConfig) -> CollisionWorld {
    init_tracing();
    let mut world = CollisionWorld::new(config).unwrap();
    world.add(Shape::ground(), translation(0.0, 0.0, 0.0)).unwrap();
    world.add(Shape::sphere(0.5), translation(0.0, 0.0, 2.0)).unwrap();

    world
        .add(Shape::cuboid(Vector3::repeat(1.0)), translation(20.0, 0.0, 5.0))
        .unwrap();
    world.add(Shape::sphere(0.5), translation(20.0, 0.0, 6.3)).unwrap();

    world.add(Shape::capsule(1.0, 0.2), translation(40.0, 0.0, 5.0)).unwrap();
    world.add(Shape::capsule(1.0, 0.2), translation(40.3, 0.0, 5.0)).unwrap();

    let field = HeightField::new(HeightFieldData::flat(5, 5, 1.0, 0.0).unwrap()).unwrap();
    world.add(Shape::height_field(field), translation(60.0, 0.0, 0.0)).unwrap();
    world.add(Shape::sphere(0.5), translation(62.2, 2.3, 0.4)).unwrap();

    world
        .add(Shape::mesh(MeshTree::new(square_mesh()).unwrap()), translation(80.0, 0.0, 0.0))
        .unwrap();
    world
}

fn find(manifolds: &[ContactManifold], a: u64, b: u64) -> Option<&ContactManifold> {
    manifolds
        .iter()
        .find(|m| m.geom_a == GeomId(a) && m.geom_b == GeomId(b))
}

// ============================================================================
// Single step
// ============================================================================

#[test]
fn mixed_scene_reports_expected_pairs() {
    let mut world = playground(CollisionConfig::new(MergeStrategy::KeepDeepest));
    assert_eq!(world.len(), 9);

    let manifolds = world.step().unwrap();
    let stats = world.stats();
    // Ground overlaps all 8 other bodies, plus three local pairs.
    assert_eq!(stats.pairs, 11);
    // Ground against the height field and against the mesh.
    assert_eq!(stats.unsupported, 2);
    assert_eq!(stats.manifolds, manifolds.len());
    assert_eq!(manifolds.len(), 4);

    let on_box = find(&manifolds, 2, 3).unwrap();
    assert!((on_box.contacts()[0].depth - 0.2).abs() < GEOM_TOL);
    assert!((on_box.contacts()[0].normal + Vector3::z()).norm() < GEOM_TOL);

    let capsules = find(&manifolds, 4, 5).unwrap();
    assert!((capsules.contacts()[0].depth - 0.1).abs() < GEOM_TOL);
    assert!((capsules.contacts()[0].normal + Vector3::x()).norm() < GEOM_TOL);

    let on_field = find(&manifolds, 6, 7).unwrap();
    assert!((on_field.deepest().unwrap().depth - 0.1).abs() < GEOM_TOL);
    // The ball on the field also rests on the ground below it.
    let on_ground = find(&manifolds, 0, 7).unwrap();
    assert!((on_ground.contacts()[0].depth - 0.1).abs() < GEOM_TOL);
}

#[test]
fn manifolds_come_out_in_pair_order() {
    let mut world = playground(CollisionConfig::new(MergeStrategy::Average));
    let manifolds = world.step().unwrap();
    let keys: Vec<(GeomId, GeomId)> = manifolds.iter().map(|m| (m.geom_a, m.geom_b)).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(manifolds.iter().all(|m| m.geom_a < m.geom_b && m.len() == 1));
}

// ============================================================================
// Over several steps
// ============================================================================

#[test]
fn falling_ball_touches_ground_once_low_enough() {
    let mut world = playground(CollisionConfig::new(MergeStrategy::KeepDeepest));
    for k in 0..8 {
        let z = 2.0 - 0.25 * f64::from(k);
        world.set_transform(FALLING, translation(0.0, 0.0, z)).unwrap();
        let manifolds = world.step().unwrap();
        let touch = find(&manifolds, GROUND.raw(), FALLING.raw());

        if z > 0.5 {
            assert!(touch.is_none(), "no contact at z = {z}");
            assert_eq!(manifolds.len(), 4);
        } else {
            let contact = touch.unwrap().contacts()[0];
            assert!((contact.depth - (0.5 - z)).abs() < GEOM_TOL);
            assert!((contact.normal + Vector3::z()).norm() < GEOM_TOL);
            assert!(contact.position.z.abs() < GEOM_TOL);
            assert_eq!(manifolds.len(), 5);
        }
    }
}

#[test]
fn broad_phase_choice_does_not_change_results() {
    let configs = [
        BroadPhaseConfig::brute_force(),
        BroadPhaseConfig::sweep_and_prune(),
        BroadPhaseConfig::default(),
    ];
    let mut worlds: Vec<CollisionWorld> = configs
        .into_iter()
        .map(|bp| playground(CollisionConfig::new(MergeStrategy::KeepDeepest).with_broad_phase(bp)))
        .collect();

    for k in 0..6 {
        let z = 1.0 - 0.2 * f64::from(k);
        let results: Vec<Vec<ContactManifold>> = worlds
            .iter_mut()
            .map(|w| {
                w.set_transform(FALLING, translation(0.1 * f64::from(k), 0.0, z)).unwrap();
                w.step().unwrap()
            })
            .collect();

        let reference = &results[0];
        for other in &results[1..] {
            assert_eq!(other.len(), reference.len(), "step {k}");
            for (a, b) in reference.iter().zip(other) {
                assert_eq!((a.geom_a, a.geom_b), (b.geom_a, b.geom_b));
                assert_eq!(a.len(), b.len());
                for (ca, cb) in a.iter().zip(b.iter()) {
                    assert_eq!(ca.depth, cb.depth);
                    assert_eq!(ca.position, cb.position);
                }
            }
        }
    }
}

#[test]
fn ball_rolls_off_the_box() {
    let mut world = playground(CollisionConfig::new(MergeStrategy::KeepDeepest));
    let ball = GeomId(3);
    let mut touching = Vec::new();
    for k in 0..10 {
        let x = 20.0 + 0.2 * f64::from(k);
        world.set_transform(ball, translation(x, 0.0, 6.3)).unwrap();
        let manifolds = world.step().unwrap();
        touching.push(find(&manifolds, 2, 3).is_some());
    }
    // The ball stays on the top face up to the edge at x = 21 and past it
    // while its rim still reaches the corner region.
    assert!(touching[..6].iter().all(|&t| t));
    assert!(!touching[9]);
}
