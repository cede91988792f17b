//! Benchmarks for the collision stages.
//!
//! Run with: cargo bench -p sim-collide

#![allow(
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::{IsometryMatrix3, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sim_collide::broad_phase::SweepAndPrune;
use sim_collide::geometry::{Aabb, Sphere};
use sim_collide::merge::ContactMerger;
use sim_collide::mesh::TriangleMesh;
use sim_collide::mid_phase::MeshTree;
use sim_collide::narrow_phase::SphereCollider;
use sim_types::{Contact, MergeStrategy, TreeConfig};

/// Wavy `n × n` grid of unit cells.
fn terrain(n: u32) -> TriangleMesh {
    let mut vertices = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            let (x, y) = (f64::from(i), f64::from(j));
            vertices.push(Point3::new(x, y, 0.3 * (x * 0.7).sin() * (y * 0.5).cos()));
        }
    }
    let mut indices = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let v = j * (n + 1) + i;
            indices.extend_from_slice(&[v, v + 1, v + n + 2, v, v + n + 2, v + n + 1]);
        }
    }
    TriangleMesh::from_flat(vertices, &indices).unwrap()
}

fn random_boxes(rng: &mut StdRng, count: usize, extent: f64) -> Vec<Aabb> {
    (0..count)
        .map(|_| {
            let c = Point3::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            );
            Aabb::from_center(c, Vector3::repeat(rng.gen_range(0.2..1.0)))
        })
        .collect()
}

fn bench_sap_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("sap_update");
    for count in [100, 1000, 5000] {
        let mut rng = StdRng::seed_from_u64(7);
        let boxes = random_boxes(&mut rng, count, 50.0);
        let nudges: Vec<Vector3<f64>> = (0..count)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(-0.05..0.05),
                    rng.gen_range(-0.05..0.05),
                    rng.gen_range(-0.05..0.05),
                )
            })
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("coherent", count), &count, |b, _| {
            let mut sap = SweepAndPrune::init(&boxes).unwrap();
            let mut current = boxes.clone();
            let mut sign = 1.0;
            b.iter(|| {
                for (id, (aabb, nudge)) in current.iter_mut().zip(&nudges).enumerate() {
                    let d = nudge * sign;
                    *aabb = Aabb::new(aabb.min + d, aabb.max + d);
                    sap.update_object(id, *aabb).unwrap();
                }
                sign = -sign;
                black_box(sap.pair_count())
            });
        });

        group.bench_with_input(BenchmarkId::new("init", count), &boxes, |b, boxes| {
            b.iter(|| black_box(SweepAndPrune::init(boxes).unwrap().pair_count()));
        });
    }
    group.finish();
}

fn bench_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");
    for n in [16, 64] {
        let mesh = terrain(n);
        let triangles = mesh.triangles().len();
        group.throughput(Throughput::Elements(triangles as u64));
        for (name, config) in [
            ("plain", TreeConfig::plain()),
            ("no_leaf", TreeConfig::no_leaf()),
            ("quantized", TreeConfig::quantized()),
        ] {
            group.bench_with_input(BenchmarkId::new(name, triangles), &mesh, |b, mesh| {
                b.iter(|| black_box(MeshTree::build(mesh.clone(), config).unwrap().node_count()));
            });
        }
    }
    group.finish();
}

fn bench_sphere_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("sphere_mesh");
    let mesh = terrain(64);
    for (name, config) in [
        ("no_leaf", TreeConfig::no_leaf()),
        ("quantized", TreeConfig::quantized()),
    ] {
        let tree = MeshTree::build(mesh.clone(), config).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let spheres: Vec<Sphere> = (0..100)
            .map(|_| {
                Sphere::new(
                    Point3::new(rng.gen_range(1.0..63.0), rng.gen_range(1.0..63.0), 0.2),
                    rng.gen_range(0.3..1.5),
                )
            })
            .collect();

        group.bench_function(BenchmarkId::new("batch_100", name), |b| {
            let mut collider = SphereCollider::default();
            let mut out = Vec::new();
            b.iter(|| {
                out.clear();
                for sphere in &spheres {
                    collider.collide(sphere, &tree, &IsometryMatrix3::identity(), &mut out);
                }
                black_box(out.len())
            });
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    for count in [16, 256, 4096] {
        let mut rng = StdRng::seed_from_u64(3);
        let raw: Vec<Contact> = (0..count)
            .map(|_| {
                Contact::new(
                    Point3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    ),
                    Vector3::z(),
                    rng.gen_range(0.0..0.1),
                )
            })
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("keep_deepest", count), &raw, |b, raw| {
            let mut merger = ContactMerger::new();
            b.iter(|| black_box(merger.reduce(raw, MergeStrategy::KeepDeepest, 4).len()));
        });
        group.bench_with_input(BenchmarkId::new("average", count), &raw, |b, raw| {
            let mut merger = ContactMerger::new();
            b.iter(|| black_box(merger.reduce(raw, MergeStrategy::Average, 4).len()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_sap_update,
    bench_tree_build,
    bench_sphere_mesh,
    bench_merge,
);
criterion_main!(benches);
