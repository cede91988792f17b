//! Error types for collision setup and queries.
//!
//! Only construction-time problems are reported through [`CollisionError`].
//! Broken internal invariants (endpoint order, node bounds) are programming
//! errors and panic instead.

use thiserror::Error;

/// Errors that can occur while building collision structures.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CollisionError {
    /// A broad phase was initialised without any objects.
    #[error("broad phase requires at least one object")]
    NoObjects,

    /// A bounding box has min > max on some axis, or a non-finite bound.
    #[error("invalid AABB for object {index}: {reason}")]
    InvalidAabb {
        /// Index of the offending object.
        index: usize,
        /// Description of what's wrong.
        reason: String,
    },

    /// An object id outside the range the structure was built for.
    #[error("unknown object {id} (structure holds {count} objects)")]
    UnknownObject {
        /// The requested id.
        id: usize,
        /// Number of objects the structure was built with.
        count: usize,
    },

    /// A triangle references a vertex that doesn't exist.
    #[error("triangle {triangle} references vertex {index} but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        /// The triangle holding the bad index.
        triangle: usize,
        /// The out-of-range vertex index.
        index: usize,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A flat vertex or index buffer doesn't match its declared stride/count.
    #[error("malformed mesh buffer: {reason}")]
    MalformedBuffer {
        /// Description of the mismatch.
        reason: String,
    },

    /// A mesh with no usable (non-degenerate) triangles.
    #[error("mesh has no usable triangles")]
    EmptyMesh,

    /// Shape parameters that can't describe real geometry.
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of the problem.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// The no-leaf and quantized layouts need exactly one primitive per leaf.
    #[error("tree layout requires a leaf limit of 1, got {leaf_limit}")]
    LayoutRequiresCompleteTree {
        /// The leaf limit that was requested.
        leaf_limit: usize,
    },
}

impl CollisionError {
    /// Create an invalid AABB error.
    #[must_use]
    pub fn invalid_aabb(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidAabb {
            index,
            reason: reason.into(),
        }
    }

    /// Create a malformed buffer error.
    #[must_use]
    pub fn malformed_buffer(reason: impl Into<String>) -> Self {
        Self::MalformedBuffer {
            reason: reason.into(),
        }
    }

    /// Create an invalid shape error.
    #[must_use]
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::LayoutRequiresCompleteTree { .. }
        )
    }

    /// Check if this error comes from malformed mesh input.
    #[must_use]
    pub fn is_mesh_error(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange { .. } | Self::MalformedBuffer { .. } | Self::EmptyMesh
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollisionError::UnknownObject { id: 9, count: 4 };
        assert!(err.to_string().contains('9'));
        assert!(err.to_string().contains('4'));

        let err = CollisionError::IndexOutOfRange {
            triangle: 3,
            index: 17,
            vertex_count: 8,
        };
        assert!(err.to_string().contains("17"));

        let err = CollisionError::invalid_aabb(2, "min.x > max.x");
        assert!(err.to_string().contains("min.x > max.x"));
    }

    #[test]
    fn test_error_predicates() {
        let err = CollisionError::invalid_config("negative tolerance");
        assert!(err.is_config_error());
        assert!(!err.is_mesh_error());

        let err = CollisionError::LayoutRequiresCompleteTree { leaf_limit: 4 };
        assert!(err.is_config_error());

        let err = CollisionError::EmptyMesh;
        assert!(err.is_mesh_error());
        assert!(!err.is_config_error());
    }
}
