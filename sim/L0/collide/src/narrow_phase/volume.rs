//! Box volumes against a mesh tree.
//!
//! [`AabbCollider`] only answers which triangles a tree-local box touches.
//! [`ObbCollider`] takes an oriented box in world space and also produces
//! contacts from the triangle-box separating axis test.

use std::ops::ControlFlow;

use nalgebra::{IsometryMatrix3, Point3, Translation3, Vector3};
use sim_types::{ColliderConfig, Contact};

use super::{triangle_box, QueryState};
use crate::geometry::{Aabb, Obb, Triangle};
use crate::mid_phase::{MeshTree, TreeVisitor};

/// Axis-aligned box, in the tree's own frame, against a mesh tree.
#[derive(Debug, Clone, Default)]
pub struct AabbCollider {
    state: QueryState,
}

impl AabbCollider {
    /// Create a collider.
    #[must_use]
    pub fn new(config: ColliderConfig) -> Self {
        Self {
            state: QueryState::new(config),
        }
    }

    /// Query state of the last call.
    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Find the triangles overlapping `aabb`.
    ///
    /// Unlike [`MeshTree::query_aabb`] this runs the exact triangle-box
    /// test. Results are in [`QueryState::touched`].
    pub fn collide(&mut self, aabb: &Aabb, tree: &MeshTree) -> bool {
        self.state.begin();
        // The exact test applies the tolerance itself; only pruning widens.
        let mut visitor = AabbVisitor {
            tree,
            center: aabb.center(),
            half_extents: aabb.half_extents(),
            bounds: aabb.expanded(self.state.config().tolerance),
            state: &mut self.state,
        };
        // Only first-contact mode stops the walk early.
        let stopped = tree.visit(&mut visitor).is_break();
        debug_assert!(!stopped || self.state.config().first_contact);
        self.state.contact_found()
    }
}

struct AabbVisitor<'a> {
    tree: &'a MeshTree,
    bounds: Aabb,
    center: Point3<f64>,
    half_extents: Vector3<f64>,
    state: &'a mut QueryState,
}

impl TreeVisitor for AabbVisitor<'_> {
    fn enter(&mut self, aabb: &Aabb) -> Option<f64> {
        self.state.record_node();
        self.bounds.overlaps(aabb).then_some(0.0)
    }

    fn visit_primitive(&mut self, index: u32) -> ControlFlow<()> {
        let Some(tri) = self.tree.triangle(index).filter(|t| !t.is_degenerate()) else {
            return ControlFlow::Continue(());
        };
        self.state.record_test();
        if triangle_box::overlap(&tri, &self.center, &self.half_extents) {
            self.state.record_hit(index, 0)
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Oriented box against a placed mesh tree.
#[derive(Debug, Clone, Default)]
pub struct ObbCollider {
    state: QueryState,
}

impl ObbCollider {
    /// Create a collider.
    #[must_use]
    pub fn new(config: ColliderConfig) -> Self {
        Self {
            state: QueryState::new(config),
        }
    }

    /// Query state of the last call.
    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Collide a world-space box with `tree` placed at `transform`.
    ///
    /// Appends one world-space contact per penetrated triangle, with the
    /// normal pushing the box out of the triangle.
    pub fn collide(
        &mut self,
        obb: &Obb,
        tree: &MeshTree,
        transform: &IsometryMatrix3<f64>,
        out: &mut Vec<Contact>,
    ) -> bool {
        self.state.begin();
        let local = Obb::new(
            transform.inverse_transform_point(&obb.center),
            obb.half_extents,
            transform.rotation.inverse() * obb.rotation,
        );
        // Box frame relative to the tree frame.
        let box_frame =
            IsometryMatrix3::from_parts(Translation3::from(local.center.coords), local.rotation);
        let world_frame = transform * box_frame;
        let inflated = Obb::new(
            local.center,
            local.half_extents.add_scalar(self.state.config().tolerance),
            local.rotation,
        );
        let mut visitor = ObbVisitor {
            tree,
            bounds: inflated.aabb(),
            inflated,
            half_extents: local.half_extents,
            box_frame,
            world_frame,
            state: &mut self.state,
            out,
        };
        // Only first-contact mode stops the walk early.
        let stopped = tree.visit(&mut visitor).is_break();
        debug_assert!(!stopped || self.state.config().first_contact);
        self.state.contact_found()
    }
}

struct ObbVisitor<'a> {
    tree: &'a MeshTree,
    bounds: Aabb,
    inflated: Obb,
    half_extents: Vector3<f64>,
    box_frame: IsometryMatrix3<f64>,
    world_frame: IsometryMatrix3<f64>,
    state: &'a mut QueryState,
    out: &'a mut Vec<Contact>,
}

impl TreeVisitor for ObbVisitor<'_> {
    fn enter(&mut self, aabb: &Aabb) -> Option<f64> {
        self.state.record_node();
        (self.bounds.overlaps(aabb) && self.inflated.overlaps_aabb(aabb)).then_some(0.0)
    }

    fn visit_primitive(&mut self, index: u32) -> ControlFlow<()> {
        let Some(tri) = self.tree.triangle(index).filter(|t| !t.is_degenerate()) else {
            return ControlFlow::Continue(());
        };
        self.state.record_test();

        let [a, b, c] = tri.v;
        let in_box = Triangle::new(
            self.box_frame.inverse_transform_point(&a),
            self.box_frame.inverse_transform_point(&b),
            self.box_frame.inverse_transform_point(&c),
        );
        let Some(hit) = triangle_box::contact(&in_box, &Point3::origin(), &self.half_extents) else {
            return ControlFlow::Continue(());
        };

        self.out.push(
            Contact::new(
                self.world_frame * hit.point,
                self.world_frame * hit.normal,
                hit.depth,
            )
            .with_feature(index),
        );
        self.state.record_hit(index, 1)
    }
}
