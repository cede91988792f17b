//! Integration tests for the collision crates.
//!
//! These tests exercise the public API end to end:
//! - Exact-touch contacts between spheres and flat meshes, merged to one
//! - Height field rays that start outside the grid
//! - Incremental sweep-and-prune against brute force over random motion
//! - Contact merging strategies on realistic raw contact sets
//! - The per-step collision world

pub mod collision_test_utils;
pub mod exact_touch;
pub mod heightfield_ray;
pub mod merge;
pub mod pipeline;
pub mod sap_brute_force;
