//! Collision detection and contact generation.
//!
//! The crate is organised along the path a collision query takes:
//!
//! - [`broad_phase`]: incremental sweep-and-prune over world boxes, plus
//!   one-shot box pruning and a brute-force reference
//! - [`mid_phase`]: bounding-volume trees over triangle meshes, in plain,
//!   no-leaf and quantized layouts
//! - [`narrow_phase`]: exact tests between query shapes and a tree's
//!   triangles, producing raw contacts
//! - [`merge`]: reduction of raw contacts to a bounded manifold
//! - [`pipeline`]: a per-step driver tying the stages together
//!
//! Supporting modules hold the [`geometry`] primitives, [`mesh`] buffers,
//! [`heightfield`] terrain, and small utilities ([`math`], [`radix`],
//! [`random`], [`arena`]).
//!
//! Contacts follow one convention throughout: the normal points from
//! `geom_b` toward `geom_a`, and depth is positive when the shapes overlap.
//!
//! # Example
//!
//! ```
//! use sim_collide::geometry::Sphere;
//! use sim_collide::mesh::TriangleMesh;
//! use sim_collide::mid_phase::MeshTree;
//! use sim_collide::narrow_phase::SphereCollider;
//! use sim_collide::merge::ContactMerger;
//! use sim_types::MergeStrategy;
//! use nalgebra::{IsometryMatrix3, Point3};
//!
//! let mesh = TriangleMesh::from_flat(
//!     vec![
//!         Point3::new(-1.0, -1.0, 0.0),
//!         Point3::new(1.0, -1.0, 0.0),
//!         Point3::new(1.0, 1.0, 0.0),
//!         Point3::new(-1.0, 1.0, 0.0),
//!     ],
//!     &[0, 1, 2, 0, 2, 3],
//! )?;
//! let tree = MeshTree::new(mesh)?;
//!
//! // A sphere resting exactly on the shared diagonal touches both triangles.
//! let mut raw = Vec::new();
//! let sphere = Sphere::new(Point3::new(0.0, 0.0, 4.0), 4.0);
//! SphereCollider::default().collide(&sphere, &tree, &IsometryMatrix3::identity(), &mut raw);
//! assert_eq!(raw.len(), 2);
//!
//! let manifold = ContactMerger::new().reduce(&raw, MergeStrategy::KeepDeepest, 4);
//! assert_eq!(manifold.len(), 1);
//! assert_eq!(manifold.contacts()[0].depth, 0.0);
//! # Ok::<(), sim_types::CollisionError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/sim-collide/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::similar_names
)]

pub mod arena;
pub mod broad_phase;
pub mod geometry;
pub mod heightfield;
pub mod math;
pub mod merge;
pub mod mesh;
pub mod mid_phase;
pub mod narrow_phase;
pub mod pipeline;
pub mod radix;
pub mod random;

pub use sim_types::DEFAULT_TOLERANCE as TOLERANCE;

pub use broad_phase::{BroadPhase, BroadPhaseDetector, SweepAndPrune};
pub use geometry::{Aabb, Capsule, Obb, Plane, Ray, Segment, Sphere, Triangle};
pub use heightfield::{HeightField, HeightFieldData};
pub use merge::ContactMerger;
pub use mesh::{MeshInterface, TriangleMesh};
pub use mid_phase::MeshTree;
pub use pipeline::{CollisionWorld, Shape};
pub use random::LcgRng;
