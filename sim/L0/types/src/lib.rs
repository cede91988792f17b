//! Core data types for collision detection.
//!
//! This crate holds the plain data shared by the collision pipeline and its
//! consumers: geometry ids, broad-phase pairs, contacts and manifolds,
//! configuration, and the error type. It contains no algorithms.
//!
//! # Example
//!
//! ```
//! use sim_types::{Contact, ContactManifold, GeomId};
//! use nalgebra::{Point3, Vector3};
//!
//! let mut manifold = ContactManifold::new(GeomId::new(1), GeomId::new(2), 4);
//! manifold.push(Contact::new(Point3::origin(), Vector3::z(), 0.01));
//! assert_eq!(manifold.len(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-types/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc
)]

mod config;
mod contact;
mod error;
mod geom;

pub use config::{
    BroadPhaseAlgorithm, BroadPhaseConfig, ColliderConfig, CollisionConfig, LayoutKind,
    MergeStrategy, SplitRule, TreeConfig, DEFAULT_TOLERANCE,
};
pub use contact::{Contact, ContactManifold, ContactStats};
pub use error::CollisionError;
pub use geom::{GeomId, Pair};

pub use nalgebra::{IsometryMatrix3, Point3, Rotation3, Vector3};

/// Result type for collision setup operations.
pub type Result<T> = std::result::Result<T, CollisionError>;
