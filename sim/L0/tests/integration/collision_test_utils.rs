//! Shared fixtures for the collision integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nalgebra::{IsometryMatrix3, Matrix3, Point3, Rotation3, Translation3};
use sim_collide::mesh::TriangleMesh;
use sim_collide::mid_phase::MeshTree;
use sim_types::TreeConfig;
use tracing_subscriber::EnvFilter;

/// Route collision logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Geometric comparison tolerance for values computed through rotations.
pub const GEOM_TOL: f64 = 1e-10;

/// The 2×2 square on z = 0, split along its `(-1,-1)-(1,1)` diagonal.
pub fn square_mesh() -> TriangleMesh {
    TriangleMesh::from_flat(
        vec![
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
        ],
        &[0, 1, 2, 0, 2, 3],
    )
    .unwrap()
}

/// [`square_mesh`] under each tree layout.
pub fn square_trees() -> Vec<MeshTree> {
    [TreeConfig::plain(), TreeConfig::no_leaf(), TreeConfig::quantized()]
        .into_iter()
        .map(|config| MeshTree::build(square_mesh(), config).unwrap())
        .collect()
}

/// Pure translation.
pub fn translation(x: f64, y: f64, z: f64) -> IsometryMatrix3<f64> {
    IsometryMatrix3::from_parts(Translation3::new(x, y, z), Rotation3::identity())
}

/// Quarter turn about X with exact matrix entries: local +Z maps to world -Y.
pub fn quarter_turn_x() -> Rotation3<f64> {
    Rotation3::from_matrix_unchecked(Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, 0.0, -1.0, //
        0.0, 1.0, 0.0,
    ))
}
