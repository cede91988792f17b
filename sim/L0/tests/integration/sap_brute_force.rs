//! Incremental sweep-and-prune against brute force over long random runs.
//!
//! Boxes drift with temporal coherence (small steps), then occasionally
//! teleport, and the incremental pair set is compared with an O(n²) scan
//! after every frame.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_truncation)]

use std::collections::BTreeSet;

use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_collide::broad_phase::{box_pruning, BroadPhase, BroadPhaseDetector, BruteForce, SweepAndPrune};
use sim_collide::geometry::Aabb;
use sim_types::{BroadPhaseConfig, Pair};

fn random_box(rng: &mut StdRng, extent: f64) -> Aabb {
    let center = Point3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    );
    let half = Vector3::new(
        rng.gen_range(0.1..2.0),
        rng.gen_range(0.1..2.0),
        rng.gen_range(0.1..2.0),
    );
    Aabb::from_center(center, half)
}

fn brute(boxes: &[Aabb]) -> BTreeSet<Pair> {
    BruteForce::new().find_pairs(boxes).unwrap().into_iter().collect()
}

#[test]
fn sap_tracks_brute_force_over_coherent_motion() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut boxes: Vec<Aabb> = (0..200).map(|_| random_box(&mut rng, 25.0)).collect();
    let mut sap = SweepAndPrune::init(&boxes).unwrap();
    assert_eq!(sap.pairs().into_iter().collect::<BTreeSet<_>>(), brute(&boxes));

    for frame in 0..100 {
        for (id, aabb) in boxes.iter_mut().enumerate() {
            let step = if rng.gen_bool(0.02) {
                // Teleport.
                random_box(&mut rng, 25.0).center() - aabb.center()
            } else {
                Vector3::new(
                    rng.gen_range(-0.3..0.3),
                    rng.gen_range(-0.3..0.3),
                    rng.gen_range(-0.3..0.3),
                )
            };
            *aabb = Aabb::new(aabb.min + step, aabb.max + step);
            sap.update_object(id, *aabb).unwrap();
        }

        let found: BTreeSet<Pair> = sap.iter_pairs().collect();
        assert_eq!(found, brute(&boxes), "frame {frame}");
        assert_eq!(sap.pair_count(), found.len());
    }
    sap.check_integrity();
}

#[test]
fn sap_handles_growing_and_shrinking_boxes() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut boxes: Vec<Aabb> = (0..64).map(|_| random_box(&mut rng, 10.0)).collect();
    let mut sap = SweepAndPrune::init(&boxes).unwrap();

    for _ in 0..50 {
        let id = rng.gen_range(0..boxes.len());
        let scale = rng.gen_range(0.2..3.0);
        let c = boxes[id].center();
        boxes[id] = Aabb::from_center(c, boxes[id].half_extents() * scale);
        sap.update_object(id, boxes[id]).unwrap();
        assert_eq!(sap.iter_pairs().collect::<BTreeSet<_>>(), brute(&boxes));
    }
}

#[test]
fn sap_handles_touching_grid() {
    // Unit cubes on an integer lattice touch their neighbours exactly.
    let mut boxes = Vec::new();
    for x in 0..5 {
        for y in 0..5 {
            let min = Point3::new(f64::from(x), f64::from(y), 0.0);
            boxes.push(Aabb::new(min, min + Vector3::repeat(1.0)));
        }
    }
    let sap = SweepAndPrune::init(&boxes).unwrap();
    let expected = brute(&boxes);
    // 4-neighbours: 2 * 5 * 4 = 40, diagonals: 2 * 4 * 4 = 32.
    assert_eq!(expected.len(), 72);
    assert_eq!(sap.iter_pairs().collect::<BTreeSet<_>>(), expected);
    assert_eq!(box_pruning::complete(&boxes).into_iter().collect::<BTreeSet<_>>(), expected);
}

#[test]
fn detector_switches_algorithms_consistently() {
    let mut rng = StdRng::seed_from_u64(99);
    let boxes: Vec<Aabb> = (0..80).map(|_| random_box(&mut rng, 15.0)).collect();
    let expected = brute(&boxes);

    for config in [
        BroadPhaseConfig::default(),
        BroadPhaseConfig::brute_force(),
        BroadPhaseConfig::sweep_and_prune(),
    ] {
        let mut detector = BroadPhaseDetector::new(config);
        let pairs = detector.find_pairs(&boxes).unwrap();
        assert!(pairs.windows(2).all(|w| w[0] < w[1]), "pairs are ascending");
        assert_eq!(pairs.into_iter().collect::<BTreeSet<_>>(), expected);
    }
}
