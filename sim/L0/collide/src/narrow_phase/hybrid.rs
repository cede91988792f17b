//! Two-level queries: coarse tree walk, then a caller-supplied leaf filter.
//!
//! The walk stops at leaf level. Every primitive under a leaf whose box
//! overlaps the query is a candidate, without a per-primitive box test.
//! The caller's filter then runs the exact test and accepted primitives are
//! collected per query object in a [`PrimitiveContainer`].

use hashbrown::{HashMap, HashSet};
use nalgebra::IsometryMatrix3;
use sim_types::ColliderConfig;
use smallvec::SmallVec;
use tracing::trace;

use super::QueryState;
use crate::geometry::{Aabb, Triangle};
use crate::mid_phase::{Cursor, Entry, MeshTree};

/// Storage for the primitives each query object touched.
pub trait PrimitiveContainer {
    /// Record `primitive` for `object`. Returns `false` if it was already
    /// recorded.
    fn insert(&mut self, object: u32, primitive: u32) -> bool;

    /// Primitives recorded for `object`, in insertion order.
    fn primitives(&self, object: u32) -> &[u32];

    /// Forget everything.
    fn clear(&mut self);
}

/// Hash-bucketed [`PrimitiveContainer`]. Duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveBuckets {
    buckets: HashMap<u32, Vec<u32>>,
    seen: HashSet<(u32, u32)>,
}

impl PrimitiveBuckets {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects with at least one primitive, ascending.
    #[must_use]
    pub fn objects(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.buckets.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Total number of (object, primitive) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl PrimitiveContainer for PrimitiveBuckets {
    fn insert(&mut self, object: u32, primitive: u32) -> bool {
        if !self.seen.insert((object, primitive)) {
            return false;
        }
        self.buckets.entry(object).or_default().push(primitive);
        true
    }

    fn primitives(&self, object: u32) -> &[u32] {
        self.buckets.get(&object).map(Vec::as_slice).unwrap_or_default()
    }

    fn clear(&mut self) {
        self.buckets.clear();
        self.seen.clear();
    }
}

/// Coarse-then-filtered collider for many query objects at once.
#[derive(Debug, Clone, Default)]
pub struct HybridCollider {
    state: QueryState,
    candidates: Vec<u32>,
}

impl HybridCollider {
    /// Create a collider.
    #[must_use]
    pub fn new(config: ColliderConfig) -> Self {
        Self {
            state: QueryState::new(config),
            candidates: Vec::new(),
        }
    }

    /// Query state of the last call. Touched lists every accepted primitive
    /// across all objects.
    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Run every object box (world space) against `tree` placed at
    /// `transform`.
    ///
    /// `filter(object, primitive, triangle)` sees each candidate with the
    /// triangle in world space and decides whether it is a real hit.
    /// Accepted primitives go into `container`. Returns the number accepted.
    /// In first-contact mode each object stops at its first acceptance.
    pub fn collide<C, F>(
        &mut self,
        objects: &[Aabb],
        tree: &MeshTree,
        transform: &IsometryMatrix3<f64>,
        container: &mut C,
        mut filter: F,
    ) -> usize
    where
        C: PrimitiveContainer + ?Sized,
        F: FnMut(u32, u32, &Triangle) -> bool,
    {
        self.state.begin();
        let to_local = transform.inverse();
        let tolerance = self.state.config().tolerance;
        let mut accepted = 0;

        for (object, world_box) in (0_u32..).zip(objects) {
            let query = world_box.transformed(&to_local).expanded(tolerance);
            self.candidates.clear();
            coarse_walk(tree, &query, &mut self.state, &mut self.candidates);

            for &primitive in &self.candidates {
                let Some(tri) = tree.triangle(primitive) else {
                    continue;
                };
                self.state.record_test();
                let [a, b, c] = tri.v;
                let world = Triangle::new(transform * a, transform * b, transform * c);
                if !filter(object, primitive, &world) {
                    continue;
                }
                if container.insert(object, primitive) {
                    accepted += 1;
                }
                if self.state.record_hit(primitive, 0).is_break() {
                    break;
                }
            }
        }

        trace!(objects = objects.len(), accepted, "hybrid query done");
        accepted
    }
}

/// Collect the primitives of every leaf whose box overlaps `query`.
fn coarse_walk(tree: &MeshTree, query: &Aabb, state: &mut QueryState, out: &mut Vec<u32>) {
    let root = tree.root_cursor();
    state.record_node();
    if !query.overlaps(&root.aabb) {
        return;
    }
    let mut stack: Vec<Cursor> = vec![root];
    let mut children: SmallVec<[Cursor; 4]> = SmallVec::new();
    while let Some(cursor) = stack.pop() {
        match cursor.entry {
            Entry::Primitive(p) => out.push(p),
            Entry::Node(_) => {
                children.clear();
                tree.expand(&cursor, &mut children);
                for child in children.drain(..).rev() {
                    match child.entry {
                        Entry::Primitive(p) => out.push(p),
                        Entry::Node(_) => {
                            state.record_node();
                            if query.overlaps(&child.aabb) {
                                stack.push(child);
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mesh::TriangleMesh;
    use crate::narrow_phase::triangle_box;
    use nalgebra::{Point3, Translation3, Vector3};
    use sim_types::TreeConfig;

    fn strip(n: u32, config: TreeConfig) -> MeshTree {
        let mut vertices = Vec::new();
        for i in 0..=n {
            vertices.push(Point3::new(f64::from(i), 0.0, 0.0));
            vertices.push(Point3::new(f64::from(i), 1.0, 0.0));
        }
        let mut indices = Vec::new();
        for i in 0..n {
            let v = 2 * i;
            indices.extend_from_slice(&[v, v + 2, v + 3, v, v + 3, v + 1]);
        }
        MeshTree::build(TriangleMesh::from_flat(vertices, &indices).unwrap(), config).unwrap()
    }

    fn exact(aabb: &Aabb) -> impl Fn(&Triangle) -> bool + '_ {
        move |tri| triangle_box::overlap(tri, &aabb.center(), &aabb.half_extents())
    }

    #[test]
    fn test_buckets_dedupe() {
        let mut buckets = PrimitiveBuckets::new();
        assert!(buckets.insert(2, 7));
        assert!(buckets.insert(2, 3));
        assert!(!buckets.insert(2, 7));
        assert!(buckets.insert(0, 7));
        assert_eq!(buckets.primitives(2), &[7, 3]);
        assert_eq!(buckets.primitives(5), &[] as &[u32]);
        assert_eq!(buckets.objects(), vec![0, 2]);
        assert_eq!(buckets.len(), 3);
        buckets.clear();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_hybrid_matches_exact_query() {
        let objects = [
            Aabb::new(Point3::new(0.6, 0.1, -0.1), Point3::new(0.8, 0.3, 0.1)),
            Aabb::new(Point3::new(3.2, 0.2, -0.1), Point3::new(4.8, 0.4, 0.1)),
            Aabb::new(Point3::new(0.0, 0.0, 2.0), Point3::new(8.0, 1.0, 3.0)),
        ];
        for config in [
            TreeConfig::plain().with_leaf_limit(4),
            TreeConfig::no_leaf(),
            TreeConfig::quantized(),
        ] {
            let tree = strip(8, config);
            let mut collider = HybridCollider::default();
            let mut buckets = PrimitiveBuckets::new();
            let accepted = collider.collide(
                &objects,
                &tree,
                &IsometryMatrix3::identity(),
                &mut buckets,
                |object, _, tri| exact(&objects[object as usize])(tri),
            );

            assert_eq!(buckets.primitives(0), &[0]);
            let mut second = buckets.primitives(1).to_vec();
            second.sort_unstable();
            assert_eq!(second, vec![6, 7, 8, 9]);
            assert!(buckets.primitives(2).is_empty());
            assert_eq!(accepted, 5);
        }
    }

    #[test]
    fn test_filter_sees_world_triangles() {
        let tree = strip(2, TreeConfig::default());
        let transform = IsometryMatrix3::from_parts(
            Translation3::new(0.0, 0.0, 10.0),
            nalgebra::Rotation3::identity(),
        );
        let objects = [Aabb::from_center(
            Point3::new(1.0, 0.5, 10.0),
            Vector3::new(3.0, 3.0, 0.5),
        )];
        let mut collider = HybridCollider::default();
        let mut buckets = PrimitiveBuckets::new();
        let mut seen_z = Vec::new();
        let accepted = collider.collide(
            &objects,
            &tree,
            &transform,
            &mut buckets,
            |_, _, tri| {
                seen_z.extend(tri.v.iter().map(|v| v.z));
                true
            },
        );
        assert_eq!(accepted, 4);
        assert!(seen_z.iter().all(|&z| (z - 10.0).abs() < 1e-12));
    }

    #[test]
    fn test_first_contact_per_object() {
        let tree = strip(4, TreeConfig::default());
        let objects = [Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(5.0, 2.0, 1.0))];
        let mut collider = HybridCollider::new(ColliderConfig::first_contact());
        let mut buckets = PrimitiveBuckets::new();
        let accepted = collider.collide(
            &objects,
            &tree,
            &IsometryMatrix3::identity(),
            &mut buckets,
            |_, _, _| true,
        );
        assert_eq!(accepted, 1);
        assert_eq!(collider.state().touched().len(), 1);
    }
}
