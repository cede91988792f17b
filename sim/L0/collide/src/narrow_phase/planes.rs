//! Convex plane sets against a mesh tree.
//!
//! The volume is the intersection of the back sides of up to
//! [`MAX_PLANES`](super::plane_aabb::MAX_PLANES) planes, typically a view
//! frustum. Each node carries the mask of planes it still straddles; once
//! the mask is empty the whole subtree lies inside and is reported without
//! further tests.

use std::ops::ControlFlow;

use nalgebra::IsometryMatrix3;
use sim_types::{ColliderConfig, CollisionError, Result};
use smallvec::SmallVec;
use tracing::trace;

use super::plane_aabb::{clip_mask, full_mask, MAX_PLANES};
use super::QueryState;
use crate::geometry::{Plane, Triangle};
use crate::mid_phase::{Cursor, Entry, MeshTree};

/// Plane set against a placed mesh tree.
#[derive(Debug, Clone, Default)]
pub struct PlanesCollider {
    state: QueryState,
}

impl PlanesCollider {
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

    /// Find the triangles of `tree`, placed at `transform`, that reach into
    /// the volume bounded by the world-space `planes`.
    ///
    /// Triangles are in [`QueryState::touched`]. No contacts are produced.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidConfig`] for more than
    /// [`MAX_PLANES`](super::plane_aabb::MAX_PLANES) planes.
    pub fn collide(
        &mut self,
        planes: &[Plane],
        tree: &MeshTree,
        transform: &IsometryMatrix3<f64>,
    ) -> Result<bool> {
        if planes.len() > MAX_PLANES {
            return Err(CollisionError::invalid_config(format!(
                "{} planes given, at most {MAX_PLANES} supported",
                planes.len()
            )));
        }
        self.state.begin();

        let to_local = transform.inverse();
        let local: SmallVec<[Plane; 8]> = planes
            .iter()
            .map(|p| p.transformed(&to_local))
            .collect();

        let root = tree.root_cursor();
        let Some(mask) = self.enter(&local, &root, full_mask(local.len())) else {
            return Ok(false);
        };
        let mut stack: Vec<(Cursor, u32)> = Vec::with_capacity(64);
        stack.push((root, mask));
        let mut children: SmallVec<[Cursor; 4]> = SmallVec::new();

        while let Some((cursor, mask)) = stack.pop() {
            let flow = if mask == 0 {
                self.dump(tree, cursor)
            } else {
                match cursor.entry {
                    Entry::Primitive(p) => self.test_primitive(tree, &local, p, mask),
                    Entry::Node(_) => {
                        children.clear();
                        tree.expand(&cursor, &mut children);
                        for child in children.drain(..).rev() {
                            if let Some(m) = self.enter(&local, &child, mask) {
                                stack.push((child, m));
                            }
                        }
                        ControlFlow::Continue(())
                    }
                }
            };
            if flow.is_break() {
                break;
            }
        }

        trace!(
            planes = planes.len(),
            touched = self.state.touched().len(),
            "planes query done"
        );
        Ok(self.state.contact_found())
    }

    fn enter(&mut self, planes: &[Plane], cursor: &Cursor, mask: u32) -> Option<u32> {
        self.state.record_node();
        clip_mask(planes, &cursor.aabb, mask)
    }

    fn test_primitive(
        &mut self,
        tree: &MeshTree,
        planes: &[Plane],
        index: u32,
        mask: u32,
    ) -> ControlFlow<()> {
        let Some(tri) = tree.triangle(index).filter(|t| !t.is_degenerate()) else {
            return ControlFlow::Continue(());
        };
        self.state.record_test();
        if outside_any(&tri, planes, mask) {
            ControlFlow::Continue(())
        } else {
            self.state.record_hit(index, 0)
        }
    }

    /// Report every primitive below `cursor` without testing it.
    fn dump(&mut self, tree: &MeshTree, cursor: Cursor) -> ControlFlow<()> {
        let mut stack = vec![cursor];
        let mut children: SmallVec<[Cursor; 4]> = SmallVec::new();
        while let Some(cursor) = stack.pop() {
            match cursor.entry {
                Entry::Primitive(p) => self.state.record_hit(p, 0)?,
                Entry::Node(_) => {
                    children.clear();
                    tree.expand(&cursor, &mut children);
                    stack.extend(children.drain(..).rev());
                }
            }
        }
        ControlFlow::Continue(())
    }
}

/// Whether all three vertices lie on the front side of one active plane.
fn outside_any(tri: &Triangle, planes: &[Plane], mask: u32) -> bool {
    planes.iter().enumerate().any(|(i, plane)| {
        mask & (1 << i) != 0 && tri.v.iter().all(|v| plane.signed_distance(v) > 0.0)
    })
}
