//! Exact tests between query shapes and mesh trees.
//!
//! Each collider owns a [`QueryState`] and walks a [`MeshTree`] placed by a
//! rigid transform. Queries are expressed in world space; the colliders
//! move them into the tree frame, prune with node boxes, and run the exact
//! primitive test at the leaves. Contacts come back in world space with the
//! normal pointing from the mesh toward the query shape.
//!
//! | Collider | Query | Output |
//! |----------|-------|--------|
//! | [`SphereCollider`] | [`Sphere`](crate::geometry::Sphere) | contacts |
//! | [`CapsuleCollider`] | [`Capsule`](crate::geometry::Capsule) | contacts |
//! | [`ObbCollider`] | [`Obb`](crate::geometry::Obb) | contacts |
//! | [`RayCollider`] | [`Ray`](crate::geometry::Ray) | hits |
//! | [`AabbCollider`] | tree-local box | touched triangles |
//! | [`PlanesCollider`] | convex plane set | touched triangles |
//! | [`HybridCollider`] | many boxes, caller filter | per-object buckets |
//!
//! [`MeshTree`]: crate::mid_phase::MeshTree
//!
//! # Example
//!
//! ```
//! use sim_collide::geometry::Sphere;
//! use sim_collide::mesh::TriangleMesh;
//! use sim_collide::mid_phase::MeshTree;
//! use sim_collide::narrow_phase::SphereCollider;
//! use nalgebra::{IsometryMatrix3, Point3};
//!
//! let mesh = TriangleMesh::from_flat(
//!     vec![
//!         Point3::new(-1.0, -1.0, 0.0),
//!         Point3::new(1.0, -1.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     &[0, 1, 2],
//! )?;
//! let tree = MeshTree::new(mesh)?;
//!
//! let mut collider = SphereCollider::default();
//! let mut contacts = Vec::new();
//! let sphere = Sphere::new(Point3::new(0.0, 0.0, 0.75), 1.0);
//! assert!(collider.collide(&sphere, &tree, &IsometryMatrix3::identity(), &mut contacts));
//! assert!((contacts[0].depth - 0.25).abs() < 1e-12);
//! # Ok::<(), sim_types::CollisionError>(())
//! ```

mod capsule;
mod hybrid;
pub mod plane_aabb;
mod planes;
pub mod ray;
mod sphere;
mod state;
pub mod triangle_box;
mod volume;

pub use capsule::{capsule_triangle, CapsuleCollider};
pub use hybrid::{HybridCollider, PrimitiveBuckets, PrimitiveContainer};
pub use plane_aabb::PlaneSide;
pub use planes::PlanesCollider;
pub use ray::{ray_triangle, RayCollider, RayHit};
pub use sphere::{sphere_triangle, SphereCollider};
pub use state::QueryState;
pub use triangle_box::BoxContact;
pub use volume::{AabbCollider, ObbCollider};
