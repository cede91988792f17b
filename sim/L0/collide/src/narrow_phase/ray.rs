//! Rays against triangles and mesh trees.

use std::ops::ControlFlow;

use nalgebra::{IsometryMatrix3, Point3, Vector3};
use sim_types::ColliderConfig;

use super::QueryState;
use crate::geometry::{Aabb, Ray, Triangle};
use crate::mid_phase::{MeshTree, TreeVisitor};
use crate::TOLERANCE;

/// A ray hitting a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Triangle index.
    pub triangle: u32,
    /// Distance along the ray.
    pub distance: f64,
    /// Hit point.
    pub point: Point3<f64>,
    /// Unit triangle normal, facing the ray origin.
    pub normal: Vector3<f64>,
    /// Barycentric weight of the second vertex.
    pub u: f64,
    /// Barycentric weight of the third vertex.
    pub v: f64,
}

/// Intersect a ray with a triangle (Möller-Trumbore).
///
/// Hits count within `[0, ray.max_t]`, edges included. With `cull` set, a
/// triangle seen from behind (counter-clockwise winding facing away) is
/// missed. Rays parallel to the plane miss.
#[must_use]
pub fn ray_triangle(ray: &Ray, tri: &Triangle, index: u32, cull: bool) -> Option<RayHit> {
    let e1 = tri.v[1] - tri.v[0];
    let e2 = tri.v[2] - tri.v[0];
    let p = ray.dir.cross(&e2);
    let det = e1.dot(&p);

    // det > 0 when the ray meets the front face.
    if cull {
        if det < TOLERANCE {
            return None;
        }
    } else if det.abs() < TOLERANCE {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - tri.v[0];
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = ray.dir.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&q) * inv_det;
    if t < 0.0 || t > ray.max_t {
        return None;
    }

    let n = tri.normal()?;
    Some(RayHit {
        triangle: index,
        distance: t,
        point: ray.point_at(t),
        normal: if det > 0.0 { n } else { -n },
        u,
        v,
    })
}

/// Walk `tree` with `ray` in the tree's frame.
///
/// `closest_only` keeps the nearest hit and prunes everything behind it.
/// Hits come back sorted by distance, then triangle index.
pub(crate) fn cast(
    tree: &MeshTree,
    ray: &Ray,
    cull: bool,
    closest_only: bool,
    state: Option<&mut QueryState>,
) -> Vec<RayHit> {
    let mut visitor = RayVisitor {
        tree,
        ray,
        cull,
        closest_only,
        hits: Vec::new(),
        state,
    };
    let stopped = tree.visit(&mut visitor).is_break();
    debug_assert!(!stopped || visitor.state.as_ref().is_some_and(|s| s.config().first_contact));
    let mut hits = visitor.hits;
    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.triangle.cmp(&b.triangle))
    });
    hits
}

struct RayVisitor<'a> {
    tree: &'a MeshTree,
    ray: &'a Ray,
    cull: bool,
    closest_only: bool,
    hits: Vec<RayHit>,
    state: Option<&'a mut QueryState>,
}

impl RayVisitor<'_> {
    fn limit(&self) -> f64 {
        match self.hits.first() {
            Some(best) if self.closest_only => best.distance,
            _ => self.ray.max_t,
        }
    }
}

impl TreeVisitor for RayVisitor<'_> {
    fn enter(&mut self, aabb: &Aabb) -> Option<f64> {
        if let Some(state) = self.state.as_deref_mut() {
            state.record_node();
        }
        aabb.ray_entry(&self.ray.origin, &self.ray.dir, self.limit())
    }

    fn is_pruned(&self, key: f64) -> bool {
        key > self.limit()
    }

    #[allow(clippy::float_cmp)]
    fn visit_primitive(&mut self, index: u32) -> ControlFlow<()> {
        let Some(tri) = self.tree.triangle(index).filter(|t| !t.is_degenerate()) else {
            return ControlFlow::Continue(());
        };
        if let Some(state) = self.state.as_deref_mut() {
            state.record_test();
        }
        let Some(hit) = ray_triangle(self.ray, &tri, index, self.cull) else {
            return ControlFlow::Continue(());
        };

        if self.closest_only {
            let better = self.hits.first().map_or(true, |best| {
                hit.distance < best.distance
                    || (hit.distance == best.distance && hit.triangle < best.triangle)
            });
            if !better {
                return ControlFlow::Continue(());
            }
            self.hits.clear();
        }
        self.hits.push(hit);

        match self.state.as_deref_mut() {
            Some(state) => state.record_hit(index, 1),
            None => ControlFlow::Continue(()),
        }
    }
}

/// Ray against a placed mesh tree.
#[derive(Debug, Clone)]
pub struct RayCollider {
    state: QueryState,
    closest_hit: bool,
}

impl Default for RayCollider {
    fn default() -> Self {
        Self::new(ColliderConfig::default())
    }
}

impl RayCollider {
    /// Create a collider reporting the closest hit only.
    #[must_use]
    pub fn new(config: ColliderConfig) -> Self {
        Self {
            state: QueryState::new(config),
            closest_hit: true,
        }
    }

    /// Report every hit instead of the closest one.
    #[must_use]
    pub fn with_closest_hit(mut self, closest_hit: bool) -> Self {
        self.closest_hit = closest_hit;
        self
    }

    /// Query state of the last call.
    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Cast a world-space ray against `tree` placed at `transform`.
    ///
    /// Hits are returned in world space, nearest first. Back-face culling
    /// and first-contact mode come from the collider configuration.
    pub fn collide(
        &mut self,
        ray: &Ray,
        tree: &MeshTree,
        transform: &IsometryMatrix3<f64>,
    ) -> Vec<RayHit> {
        self.state.begin();
        let local = Ray {
            origin: transform.inverse_transform_point(&ray.origin),
            dir: transform.inverse_transform_vector(&ray.dir),
            max_t: ray.max_t,
        };
        let cull = self.state.config().back_face_culling;
        let mut hits = cast(tree, &local, cull, self.closest_hit, Some(&mut self.state));
        for hit in &mut hits {
            hit.point = transform * hit.point;
            hit.normal = transform * hit.normal;
        }
        hits
    }
}
