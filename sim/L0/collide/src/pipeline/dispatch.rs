//! Pair dispatch: pick the contact routine for two placed shapes.
//!
//! Every routine reports contacts with the normal pointing from the second
//! shape toward the first and the position on the second shape's surface.
//! [`NarrowPhase::collide`] orders the pair so the simpler shape queries
//! the more complex one, then flips the contacts back if needed.

use nalgebra::Vector3;
use sim_types::{ColliderConfig, Contact, ContactStats};

use super::shape::{Body, Shape, ShapeKind};
use crate::geometry::{Capsule, Obb, Plane, Sphere};
use crate::mid_phase::MeshTree;
use crate::narrow_phase::{CapsuleCollider, ObbCollider, SphereCollider};
use crate::TOLERANCE;

/// Sphere against sphere.
#[must_use]
pub fn sphere_sphere(a: &Sphere, b: &Sphere, tolerance: f64) -> Option<Contact> {
    let diff = a.center - b.center;
    let dist = diff.norm();
    let depth = a.radius + b.radius - dist;
    if depth < -tolerance {
        return None;
    }
    // Coincident centers: any direction separates them.
    let normal = if dist > TOLERANCE {
        diff / dist
    } else {
        Vector3::z()
    };
    Some(Contact::new(b.center + normal * b.radius, normal, depth))
}

/// Sphere against capsule.
#[must_use]
pub fn sphere_capsule(sphere: &Sphere, capsule: &Capsule, tolerance: f64) -> Option<Contact> {
    let core = capsule.segment.closest_point(&sphere.center);
    sphere_sphere(sphere, &Sphere::new(core, capsule.radius), tolerance)
}

/// Capsule against capsule, through the closest points of the two cores.
#[must_use]
pub fn capsule_capsule(a: &Capsule, b: &Capsule, tolerance: f64) -> Option<Contact> {
    let (on_a, on_b) = a.segment.closest_points(&b.segment);
    sphere_sphere(
        &Sphere::new(on_a, a.radius),
        &Sphere::new(on_b, b.radius),
        tolerance,
    )
}

/// Sphere against oriented box.
///
/// A center inside the box is pushed out through the nearest face.
#[must_use]
pub fn sphere_box(sphere: &Sphere, obb: &Obb, tolerance: f64) -> Option<Contact> {
    let local = obb.to_local(&sphere.center);
    let h = obb.half_extents;
    let clamped = Vector3::new(
        local.x.clamp(-h.x, h.x),
        local.y.clamp(-h.y, h.y),
        local.z.clamp(-h.z, h.z),
    );
    let outside = local - clamped;
    let dist = outside.norm();

    let (normal_local, surface, depth) = if dist > TOLERANCE {
        (outside / dist, clamped, sphere.radius - dist)
    } else {
        let mut axis = 0;
        let mut gap = f64::INFINITY;
        for k in 0..3 {
            let g = h[k] - local[k].abs();
            if g < gap {
                gap = g;
                axis = k;
            }
        }
        let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
        let mut n = Vector3::zeros();
        n[axis] = sign;
        let mut surface = local;
        surface[axis] = sign * h[axis];
        (n, surface, sphere.radius + gap)
    };
    if depth < -tolerance {
        return None;
    }

    Some(Contact::new(
        obb.center + obb.rotation * surface,
        obb.rotation * normal_local,
        depth,
    ))
}

/// Sphere against a solid half-space.
#[must_use]
pub fn sphere_plane(sphere: &Sphere, plane: &Plane, tolerance: f64) -> Option<Contact> {
    let dist = plane.signed_distance(&sphere.center);
    let depth = sphere.radius - dist;
    if depth < -tolerance {
        return None;
    }
    Some(Contact::new(
        sphere.center - plane.normal * dist,
        plane.normal,
        depth,
    ))
}

/// Capsule against a half-space: one contact per end cap in reach.
pub fn capsule_plane(
    capsule: &Capsule,
    plane: &Plane,
    tolerance: f64,
    out: &mut Vec<Contact>,
) -> usize {
    let before = out.len();
    for end in [capsule.segment.a, capsule.segment.b] {
        if let Some(c) = sphere_plane(&Sphere::new(end, capsule.radius), plane, tolerance) {
            out.push(c);
        }
    }
    out.len() - before
}

/// Box against a half-space: one contact per corner in reach.
pub fn box_plane(obb: &Obb, plane: &Plane, tolerance: f64, out: &mut Vec<Contact>) -> usize {
    let before = out.len();
    for corner in obb.corners() {
        let dist = plane.signed_distance(&corner);
        if dist <= tolerance {
            out.push(Contact::new(
                corner - plane.normal * dist,
                plane.normal,
                -dist,
            ));
        }
    }
    out.len() - before
}

/// Shape-pair dispatcher with reusable mesh colliders.
#[derive(Debug, Clone, Default)]
pub struct NarrowPhase {
    config: ColliderConfig,
    sphere: SphereCollider,
    capsule: CapsuleCollider,
    obb: ObbCollider,
    stats: ContactStats,
}

impl NarrowPhase {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(config: ColliderConfig) -> Self {
        Self {
            config,
            sphere: SphereCollider::new(config),
            capsule: CapsuleCollider::new(config),
            obb: ObbCollider::new(config),
            stats: ContactStats::default(),
        }
    }

    /// Collider configuration.
    #[must_use]
    pub fn config(&self) -> &ColliderConfig {
        &self.config
    }

    /// Counters accumulated since the last [`NarrowPhase::reset_stats`].
    #[must_use]
    pub fn stats(&self) -> &ContactStats {
        &self.stats
    }

    /// Zero the counters.
    pub fn reset_stats(&mut self) {
        self.stats = ContactStats::default();
    }

    /// Whether a routine exists for this pair of shape kinds.
    #[must_use]
    pub fn supports(a: ShapeKind, b: ShapeKind) -> bool {
        let (q, t) = if a <= b { (a, b) } else { (b, a) };
        !matches!(
            (q, t),
            (ShapeKind::Capsule | ShapeKind::Box, ShapeKind::Box)
                | (
                    ShapeKind::Plane | ShapeKind::TriMesh | ShapeKind::HeightField,
                    ShapeKind::Plane | ShapeKind::TriMesh | ShapeKind::HeightField
                )
        )
    }

    /// Append the raw contacts between `a` and `b` to `out`.
    ///
    /// Contacts carry `a`'s id as `geom_a` and `b`'s as `geom_b`, with the
    /// normal pointing from `b` toward `a`. Returns `None` when the pair of
    /// shape kinds has no routine.
    pub fn collide(&mut self, a: &Body, b: &Body, out: &mut Vec<Contact>) -> Option<usize> {
        let swapped = b.shape().kind() < a.shape().kind();
        let (query, target) = if swapped { (b, a) } else { (a, b) };

        let start = out.len();
        self.oriented(query, target, out)?;
        for c in &mut out[start..] {
            let tagged = c.with_geoms(query.id(), target.id());
            *c = if swapped { tagged.flipped() } else { tagged };
        }
        let emitted = out.len() - start;
        self.stats.contacts_emitted += emitted;
        Some(emitted)
    }

    /// `query.kind() <= target.kind()`.
    fn oriented(&mut self, query: &Body, target: &Body, out: &mut Vec<Contact>) -> Option<()> {
        let tol = self.config.tolerance;
        let qt = query.transform();
        let tt = target.transform();

        match query.shape() {
            Shape::Sphere { .. } => {
                let sphere = query.shape().sphere_at(qt)?;
                match target.shape() {
                    Shape::Sphere { .. } => {
                        out.extend(sphere_sphere(&sphere, &target.shape().sphere_at(tt)?, tol));
                    }
                    Shape::Capsule { .. } => {
                        out.extend(sphere_capsule(&sphere, &target.shape().capsule_at(tt)?, tol));
                    }
                    Shape::Box { .. } => {
                        out.extend(sphere_box(&sphere, &target.shape().obb_at(tt)?, tol));
                    }
                    Shape::Plane(_) => {
                        out.extend(sphere_plane(&sphere, &target.shape().plane_at(tt)?, tol));
                    }
                    Shape::TriMesh(_) | Shape::HeightField(_) => {
                        let tree = tree_of(target.shape())?;
                        self.sphere.collide(&sphere, tree, tt, out);
                        self.stats.accumulate(self.sphere.state().stats());
                    }
                }
            }
            Shape::Capsule { .. } => {
                let capsule = query.shape().capsule_at(qt)?;
                match target.shape() {
                    Shape::Capsule { .. } => {
                        out.extend(capsule_capsule(&capsule, &target.shape().capsule_at(tt)?, tol));
                    }
                    Shape::Plane(_) => {
                        capsule_plane(&capsule, &target.shape().plane_at(tt)?, tol, out);
                    }
                    Shape::TriMesh(_) | Shape::HeightField(_) => {
                        let tree = tree_of(target.shape())?;
                        self.capsule.collide(&capsule, tree, tt, out);
                        self.stats.accumulate(self.capsule.state().stats());
                    }
                    Shape::Sphere { .. } | Shape::Box { .. } => return None,
                }
            }
            Shape::Box { .. } => {
                let obb = query.shape().obb_at(qt)?;
                match target.shape() {
                    Shape::Plane(_) => {
                        box_plane(&obb, &target.shape().plane_at(tt)?, tol, out);
                    }
                    Shape::TriMesh(_) | Shape::HeightField(_) => {
                        let tree = tree_of(target.shape())?;
                        self.obb.collide(&obb, tree, tt, out);
                        self.stats.accumulate(self.obb.state().stats());
                    }
                    _ => return None,
                }
            }
            Shape::Plane(_) | Shape::TriMesh(_) | Shape::HeightField(_) => return None,
        }
        Some(())
    }
}

fn tree_of(shape: &Shape) -> Option<&MeshTree> {
    match shape {
        Shape::TriMesh(tree) => Some(tree.as_ref()),
        Shape::HeightField(field) => Some(field.tree()),
        _ => None,
    }
}
