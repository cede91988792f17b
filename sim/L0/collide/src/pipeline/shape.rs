//! Body shapes.

use std::sync::Arc;

use nalgebra::{IsometryMatrix3, Point3, Vector3};
use sim_types::{CollisionError, GeomId, Result};

use crate::geometry::{Aabb, Capsule, Obb, Plane, Segment, Sphere};
use crate::heightfield::HeightField;
use crate::mid_phase::MeshTree;

/// Half-width of the box used to bound a half-space in the broad phase.
pub const PLANE_EXTENT: f64 = 1.0e6;

/// Collision shape of a body, in the body's local frame.
///
/// Meshes and heightfields are shared: the same built tree can back any
/// number of bodies.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Sphere centered at the origin.
    Sphere {
        /// Radius.
        radius: f64,
    },
    /// Box centered at the origin.
    Box {
        /// Half-extents along the local axes.
        half_extents: Vector3<f64>,
    },
    /// Capsule along the local Z axis, centered at the origin.
    Capsule {
        /// Half-length of the core segment.
        half_length: f64,
        /// Radius.
        radius: f64,
    },
    /// Solid half-space behind a plane (negative signed distance is inside).
    Plane(Plane),
    /// Triangle mesh.
    TriMesh(Arc<MeshTree>),
    /// Height field.
    HeightField(Arc<HeightField>),
}

/// Discriminant of a [`Shape`], used for dispatch and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    /// [`Shape::Sphere`].
    Sphere,
    /// [`Shape::Capsule`].
    Capsule,
    /// [`Shape::Box`].
    Box,
    /// [`Shape::Plane`].
    Plane,
    /// [`Shape::TriMesh`].
    TriMesh,
    /// [`Shape::HeightField`].
    HeightField,
}

impl Shape {
    /// A sphere.
    #[must_use]
    pub const fn sphere(radius: f64) -> Self {
        Self::Sphere { radius }
    }

    /// A box.
    #[must_use]
    pub const fn cuboid(half_extents: Vector3<f64>) -> Self {
        Self::Box { half_extents }
    }

    /// A Z-aligned capsule.
    #[must_use]
    pub const fn capsule(half_length: f64, radius: f64) -> Self {
        Self::Capsule {
            half_length,
            radius,
        }
    }

    /// The half-space `normal · p <= offset`.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidShape`] if the normal has no direction.
    pub fn half_space(normal: Vector3<f64>, offset: f64) -> Result<Self> {
        Plane::new(normal, -offset)
            .map(Self::Plane)
            .ok_or_else(|| CollisionError::invalid_shape("half-space normal has zero length"))
    }

    /// The ground plane `z <= 0`.
    #[must_use]
    pub fn ground() -> Self {
        Self::Plane(Plane {
            normal: Vector3::z(),
            d: 0.0,
        })
    }

    /// A shared mesh tree.
    #[must_use]
    pub fn mesh(tree: MeshTree) -> Self {
        Self::TriMesh(Arc::new(tree))
    }

    /// A shared height field.
    #[must_use]
    pub fn height_field(field: HeightField) -> Self {
        Self::HeightField(Arc::new(field))
    }

    /// Which variant this is.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Sphere { .. } => ShapeKind::Sphere,
            Self::Capsule { .. } => ShapeKind::Capsule,
            Self::Box { .. } => ShapeKind::Box,
            Self::Plane(_) => ShapeKind::Plane,
            Self::TriMesh(_) => ShapeKind::TriMesh,
            Self::HeightField(_) => ShapeKind::HeightField,
        }
    }

    /// Check dimensions.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidShape`] for negative or non-finite sizes.
    pub fn validate(&self) -> Result<()> {
        let bad = |what: &str, value: f64| {
            Err(CollisionError::invalid_shape(format!(
                "{what} must be finite and non-negative, got {value}"
            )))
        };
        match self {
            Self::Sphere { radius } => {
                if !radius.is_finite() || *radius < 0.0 {
                    return bad("sphere radius", *radius);
                }
            }
            Self::Box { half_extents } => {
                for &h in half_extents.iter() {
                    if !h.is_finite() || h < 0.0 {
                        return bad("box half-extent", h);
                    }
                }
            }
            Self::Capsule {
                half_length,
                radius,
            } => {
                if !half_length.is_finite() || *half_length < 0.0 {
                    return bad("capsule half-length", *half_length);
                }
                if !radius.is_finite() || *radius < 0.0 {
                    return bad("capsule radius", *radius);
                }
            }
            Self::Plane(plane) => {
                if !plane.d.is_finite() || plane.normal.iter().any(|v| !v.is_finite()) {
                    return Err(CollisionError::invalid_shape("half-space is not finite"));
                }
            }
            Self::TriMesh(_) | Self::HeightField(_) => {}
        }
        Ok(())
    }

    /// World bounding box at `transform`.
    ///
    /// Half-spaces are bounded by a cube of half-width [`PLANE_EXTENT`].
    #[must_use]
    pub fn world_aabb(&self, transform: &IsometryMatrix3<f64>) -> Aabb {
        match self {
            Self::Sphere { radius } => Sphere::new(transform * Point3::origin(), *radius).aabb(),
            Self::Capsule { .. } => self
                .capsule_at(transform)
                .as_ref()
                .map_or_else(Aabb::empty, Capsule::aabb),
            Self::Box { half_extents } => {
                Aabb::from_center(Point3::origin(), *half_extents).transformed(transform)
            }
            Self::Plane(_) => Aabb::from_center(
                transform * Point3::origin(),
                Vector3::repeat(PLANE_EXTENT),
            ),
            Self::TriMesh(tree) => tree.root_aabb().transformed(transform),
            Self::HeightField(field) => field.aabb().transformed(transform),
        }
    }

    /// The sphere placed at `transform`.
    #[must_use]
    pub fn sphere_at(&self, transform: &IsometryMatrix3<f64>) -> Option<Sphere> {
        match self {
            Self::Sphere { radius } => Some(Sphere::new(transform * Point3::origin(), *radius)),
            _ => None,
        }
    }

    /// The capsule placed at `transform`.
    #[must_use]
    pub fn capsule_at(&self, transform: &IsometryMatrix3<f64>) -> Option<Capsule> {
        match self {
            Self::Capsule {
                half_length,
                radius,
            } => {
                let tip = Point3::new(0.0, 0.0, *half_length);
                let segment = Segment::new(transform * Point3::from(-tip.coords), transform * tip);
                Some(Capsule::new(segment, *radius))
            }
            _ => None,
        }
    }

    /// The box placed at `transform`.
    #[must_use]
    pub fn obb_at(&self, transform: &IsometryMatrix3<f64>) -> Option<Obb> {
        match self {
            Self::Box { half_extents } => Some(Obb::new(
                transform * Point3::origin(),
                *half_extents,
                transform.rotation,
            )),
            _ => None,
        }
    }

    /// The bounding plane placed at `transform`.
    #[must_use]
    pub fn plane_at(&self, transform: &IsometryMatrix3<f64>) -> Option<Plane> {
        match self {
            Self::Plane(plane) => Some(plane.transformed(transform)),
            _ => None,
        }
    }
}

/// A shape placed in the world.
#[derive(Debug, Clone)]
pub struct Body {
    id: GeomId,
    shape: Shape,
    transform: IsometryMatrix3<f64>,
}

impl Body {
    /// Create a body.
    #[must_use]
    pub fn new(id: GeomId, shape: Shape, transform: IsometryMatrix3<f64>) -> Self {
        Self {
            id,
            shape,
            transform,
        }
    }

    /// Geometry id reported in contacts.
    #[must_use]
    pub fn id(&self) -> GeomId {
        self.id
    }

    /// Shape.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// World transform.
    #[must_use]
    pub fn transform(&self) -> &IsometryMatrix3<f64> {
        &self.transform
    }

    /// Move the body.
    pub fn set_transform(&mut self, transform: IsometryMatrix3<f64>) {
        self.transform = transform;
    }

    /// World bounding box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.shape.world_aabb(&self.transform)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Translation3};

    fn placed(x: f64, y: f64, z: f64) -> IsometryMatrix3<f64> {
        IsometryMatrix3::from_parts(Translation3::new(x, y, z), Rotation3::identity())
    }

    #[test]
    fn test_validate() {
        assert!(Shape::sphere(1.0).validate().is_ok());
        assert!(Shape::sphere(0.0).validate().is_ok());
        assert!(Shape::sphere(-1.0).validate().is_err());
        assert!(Shape::sphere(f64::NAN).validate().is_err());
        assert!(Shape::cuboid(Vector3::new(1.0, -0.1, 1.0)).validate().is_err());
        assert!(Shape::capsule(1.0, f64::INFINITY).validate().is_err());
        assert!(Shape::half_space(Vector3::zeros(), 0.0).is_err());
    }

    #[test]
    fn test_half_space_offset() {
        let shape = Shape::half_space(Vector3::new(0.0, 0.0, 2.0), 3.0).unwrap();
        let plane = shape.plane_at(&IsometryMatrix3::identity()).unwrap();
        // 2z <= 3
        assert_relative_eq!(plane.signed_distance(&Point3::new(0.0, 0.0, 1.5)), 0.0);
        assert!(plane.signed_distance(&Point3::origin()) < 0.0);
    }

    #[test]
    fn test_world_aabb() {
        let sphere = Shape::sphere(0.5).world_aabb(&placed(1.0, 2.0, 3.0));
        assert_relative_eq!(sphere.min, Point3::new(0.5, 1.5, 2.5));
        assert_relative_eq!(sphere.max, Point3::new(1.5, 2.5, 3.5));

        let capsule = Shape::capsule(1.0, 0.25).world_aabb(&placed(0.0, 0.0, 0.0));
        assert_relative_eq!(capsule.min, Point3::new(-0.25, -0.25, -1.25));
        assert_relative_eq!(capsule.max, Point3::new(0.25, 0.25, 1.25));

        let turned = IsometryMatrix3::from_parts(
            Translation3::new(0.0, 0.0, 0.0),
            Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2),
        );
        let boxed = Shape::cuboid(Vector3::new(2.0, 1.0, 0.5)).world_aabb(&turned);
        assert_relative_eq!(boxed.max, Point3::new(1.0, 2.0, 0.5), epsilon = 1e-12);

        let ground = Shape::ground().world_aabb(&IsometryMatrix3::identity());
        assert_relative_eq!(ground.max.z, PLANE_EXTENT);
    }

    #[test]
    fn test_capsule_at() {
        let capsule = Shape::capsule(1.0, 0.5)
            .capsule_at(&placed(0.0, 0.0, 4.0))
            .unwrap();
        assert_relative_eq!(capsule.segment.a, Point3::new(0.0, 0.0, 3.0));
        assert_relative_eq!(capsule.segment.b, Point3::new(0.0, 0.0, 5.0));
        assert!(Shape::sphere(1.0).capsule_at(&placed(0.0, 0.0, 0.0)).is_none());
    }
}
