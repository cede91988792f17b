//! Geometric primitives used throughout collision detection.
//!
//! All types are plain `f64` values in a single coordinate frame. Shapes
//! that live in an object's local frame are moved into world space with an
//! [`IsometryMatrix3`](nalgebra::IsometryMatrix3).

mod aabb;
mod obb;
mod plane;
mod shapes;
mod triangle;

pub use aabb::{Aabb, Axis};
pub use obb::Obb;
pub use plane::Plane;
pub use shapes::{Capsule, Ray, Segment, Sphere};
pub use triangle::{IndexedTriangle, Triangle};
