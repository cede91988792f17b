//! Bounding-volume trees over triangle meshes.
//!
//! A [`MeshTree`] owns a [`TriangleMesh`] and a hierarchy of boxes over its
//! triangles, stored in one of three [`TreeLayout`]s:
//!
//! - plain: exact boxes on every node, fastest to refit
//! - no-leaf: half the nodes, child boxes stored in the parent
//! - quantized: no-leaf topology with 16-bit child boxes (the default)
//!
//! All queries go through [`MeshTree::visit`], so they behave the same on
//! every layout. Quantized boxes are conservative: a quantized tree may
//! report extra candidates but never misses one the exact tree finds.
//!
//! # Example
//!
//! ```
//! use sim_collide::mid_phase::MeshTree;
//! use sim_collide::mesh::TriangleMesh;
//! use sim_collide::geometry::{Aabb, Ray};
//! use nalgebra::{Point3, Vector3};
//!
//! let mesh = TriangleMesh::from_flat(
//!     vec![
//!         Point3::new(-1.0, -1.0, 0.0),
//!         Point3::new(1.0, -1.0, 0.0),
//!         Point3::new(1.0, 1.0, 0.0),
//!         Point3::new(-1.0, 1.0, 0.0),
//!     ],
//!     &[0, 1, 2, 0, 2, 3],
//! )?;
//! let tree = MeshTree::new(mesh)?;
//!
//! let near = Aabb::new(Point3::new(0.5, -0.9, -0.1), Point3::new(0.9, -0.5, 0.1));
//! assert_eq!(tree.query_aabb(&near), vec![0, 1]);
//!
//! let ray = Ray::new(Point3::new(0.5, -0.5, 1.0), -Vector3::z(), 10.0).unwrap();
//! let hit = tree.raycast_closest(&ray, false).unwrap();
//! assert_eq!(hit.triangle, 0);
//! # Ok::<(), sim_types::CollisionError>(())
//! ```

mod build;
pub mod layout;
mod traversal;

pub use build::TreeBuilder;
pub use layout::{Child, QuantizedBox, TreeLayout};
pub use traversal::{Cursor, Entry, TreeVisitor};

use std::ops::ControlFlow;

use nalgebra::{IsometryMatrix3, Point3};
use sim_types::{CollisionError, Result, TreeConfig};
use smallvec::SmallVec;
use tracing::debug;

use crate::geometry::{Aabb, Ray, Triangle};
use crate::mesh::{MeshInterface, TriangleMesh};
use crate::narrow_phase::ray::{cast as cast_ray, RayHit};

/// A triangle mesh with a bounding-volume tree.
#[derive(Debug, Clone)]
pub struct MeshTree {
    mesh: TriangleMesh,
    config: TreeConfig,
    layout: TreeLayout,
    primitive_count: usize,
    skipped: Vec<u32>,
}

impl MeshTree {
    /// Build with the default configuration (quantized, median split).
    ///
    /// # Errors
    ///
    /// [`CollisionError::EmptyMesh`] if every triangle is degenerate.
    pub fn new(mesh: TriangleMesh) -> Result<Self> {
        Self::build(mesh, TreeConfig::default())
    }

    /// Build with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`TreeBuilder::build`].
    pub fn build(mesh: TriangleMesh, config: TreeConfig) -> Result<Self> {
        TreeBuilder::new(config).build(mesh)
    }

    pub(crate) fn from_parts(
        mesh: TriangleMesh,
        config: TreeConfig,
        layout: TreeLayout,
        primitive_count: usize,
        skipped: Vec<u32>,
    ) -> Self {
        Self {
            mesh,
            config,
            layout,
            primitive_count,
            skipped,
        }
    }

    /// The mesh.
    #[must_use]
    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// The configuration the tree was built with.
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Node storage.
    #[must_use]
    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    /// Number of stored nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.layout.node_count()
    }

    /// Number of triangles in the tree.
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.primitive_count
    }

    /// Number of degenerate triangles left out at build time.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Indices of the degenerate triangles left out at build time, ascending.
    #[must_use]
    pub fn skipped(&self) -> &[u32] {
        &self.skipped
    }

    /// Box around all triangles in the tree.
    #[must_use]
    pub fn root_aabb(&self) -> Aabb {
        self.layout.root_aabb()
    }

    /// Triangle `index` of the mesh.
    #[must_use]
    pub fn triangle(&self, index: u32) -> Option<Triangle> {
        self.mesh.triangle(index as usize)
    }

    /// Call `f` for every triangle whose tree box overlaps `aabb`.
    ///
    /// No exact test is applied, so quantized trees may report extra
    /// candidates.
    pub fn query_callback<F: FnMut(u32)>(&self, aabb: &Aabb, f: F) {
        struct Overlap<'q, F> {
            query: &'q Aabb,
            f: F,
        }
        impl<F: FnMut(u32)> TreeVisitor for Overlap<'_, F> {
            fn enter(&mut self, aabb: &Aabb) -> Option<f64> {
                self.query.overlaps(aabb).then_some(0.0)
            }
            fn visit_primitive(&mut self, index: u32) -> ControlFlow<()> {
                (self.f)(index);
                ControlFlow::Continue(())
            }
        }
        let walk = self.visit(&mut Overlap { query: aabb, f });
        debug_assert!(walk.is_continue());
    }

    /// Non-degenerate triangles whose exact box overlaps `aabb`, ascending.
    #[must_use]
    pub fn query_aabb(&self, aabb: &Aabb) -> Vec<u32> {
        let mut out = Vec::new();
        self.query_callback(aabb, |index| {
            if !self.mesh.is_degenerate(index as usize)
                && self
                    .triangle(index)
                    .is_some_and(|tri| tri.aabb().overlaps(aabb))
            {
                out.push(index);
            }
        });
        out.sort_unstable();
        out
    }

    /// Nearest triangle hit along `ray`, if any.
    ///
    /// With `cull` set, triangles seen from behind are ignored. Equal
    /// distances resolve to the lower triangle index.
    #[must_use]
    pub fn raycast_closest(&self, ray: &Ray, cull: bool) -> Option<RayHit> {
        cast_ray(self, ray, cull, true, None).into_iter().next()
    }

    /// Every triangle hit along `ray`, nearest first.
    #[must_use]
    pub fn raycast_all(&self, ray: &Ray, cull: bool) -> Vec<RayHit> {
        cast_ray(self, ray, cull, false, None)
    }

    /// Candidate triangle pairs `(mine, other's)` whose boxes overlap when
    /// this tree is placed at `transform` and `other` at `other_transform`.
    ///
    /// Work happens in this tree's frame: the other tree's boxes are
    /// carried over by the relative transform. At each step the side with
    /// the larger volume is descended. Result is sorted.
    #[must_use]
    pub fn query_tree_pairs(
        &self,
        other: &Self,
        transform: &IsometryMatrix3<f64>,
        other_transform: &IsometryMatrix3<f64>,
    ) -> Vec<(u32, u32)> {
        let relative = transform.inverse() * other_transform;
        let mut pairs = Vec::new();

        let root_a = self.root_cursor();
        let root_b = other.root_cursor();
        let mut stack: Vec<(Cursor, Cursor, Aabb)> = Vec::with_capacity(64);
        stack.push((root_a, root_b, root_b.aabb.transformed(&relative)));

        let mut children: SmallVec<[Cursor; 4]> = SmallVec::new();
        while let Some((a, b, b_local)) = stack.pop() {
            if !a.aabb.overlaps(&b_local) {
                continue;
            }
            match (a.entry, b.entry) {
                (Entry::Primitive(pa), Entry::Primitive(pb)) => pairs.push((pa, pb)),
                _ => {
                    let descend_a = !a.is_primitive()
                        && (b.is_primitive() || a.aabb.volume() >= b_local.volume());
                    children.clear();
                    if descend_a {
                        self.expand(&a, &mut children);
                        for child in children.drain(..) {
                            stack.push((child, b, b_local));
                        }
                    } else {
                        other.expand(&b, &mut children);
                        for child in children.drain(..) {
                            stack.push((a, child, child.aabb.transformed(&relative)));
                        }
                    }
                }
            }
        }

        pairs.sort_unstable();
        pairs
    }

    /// Move vertices in place, then refit the boxes.
    ///
    /// See [`MeshTree::refit`] for when the tree is rebuilt instead.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidShape`] if a vertex ends up non-finite. The
    /// previous vertices are restored.
    pub fn update_vertices<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut [Point3<f64>]),
    {
        let previous = self.mesh.vertices().to_vec();
        f(self.mesh.vertices_mut());
        if let Some(bad) = self
            .mesh
            .vertices()
            .iter()
            .position(|v| !v.iter().all(|c| c.is_finite()))
        {
            self.mesh.vertices_mut().copy_from_slice(&previous);
            return Err(CollisionError::invalid_shape(format!(
                "vertex {bad} is not finite after update"
            )));
        }
        self.refit();
        Ok(())
    }

    /// Recompute every box from the current vertex positions.
    ///
    /// Triangles that became degenerate stay in the tree and are filtered
    /// at leaf tests. The quantized layout is re-quantized top-down from the
    /// refitted exact boxes. If a triangle left out at build time has
    /// regained area, the tree is rebuilt so that it can be found again.
    pub fn refit(&mut self) {
        let revived = self
            .skipped
            .iter()
            .any(|&i| !self.mesh.is_degenerate(i as usize));
        if revived {
            match TreeBuilder::new(self.config).build_layout(&self.mesh) {
                Ok((layout, primitive_count, skipped)) => {
                    self.layout = layout;
                    self.primitive_count = primitive_count;
                    self.skipped = skipped;
                    debug!(
                        primitives = primitive_count,
                        nodes = self.node_count(),
                        "mesh tree rebuilt after deformation"
                    );
                    return;
                }
                Err(err) => debug!(%err, "mesh tree rebuild failed, refitting"),
            }
        }
        self.layout.refit(&self.mesh);
        debug!(nodes = self.node_count(), "mesh tree refitted");
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Rotation3, Translation3, Vector3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use sim_types::SplitRule;

    fn all_configs() -> [TreeConfig; 5] {
        [
            TreeConfig::plain(),
            TreeConfig::plain().with_leaf_limit(3),
            TreeConfig::no_leaf(),
            TreeConfig::quantized(),
            TreeConfig::quantized().with_split(SplitRule::Balanced),
        ]
    }

    /// `n` x `n` grid of quads in the XY plane, two triangles each.
    fn grid(n: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let stride = (n + 1) as u32;
        let mut indices = Vec::new();
        for j in 0..n as u32 {
            for i in 0..n as u32 {
                let v0 = j * stride + i;
                indices.extend_from_slice(&[v0, v0 + 1, v0 + stride + 1]);
                indices.extend_from_slice(&[v0, v0 + stride + 1, v0 + stride]);
            }
        }
        TriangleMesh::from_flat(vertices, &indices).unwrap()
    }

    fn random_soup(rng: &mut StdRng, n: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for _ in 0..n {
            let c = Point3::new(
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
            );
            for _ in 0..3 {
                vertices.push(
                    c + Vector3::new(
                        rng.gen_range(-1.5..1.5),
                        rng.gen_range(-1.5..1.5),
                        rng.gen_range(-1.5..1.5),
                    ),
                );
            }
        }
        let indices: Vec<u32> = (0..(3 * n) as u32).collect();
        TriangleMesh::from_flat(vertices, &indices).unwrap()
    }

    fn brute_query(mesh: &TriangleMesh, aabb: &Aabb) -> Vec<u32> {
        (0..mesh.triangle_count())
            .filter(|&i| !mesh.is_degenerate(i))
            .filter(|&i| mesh.triangle(i).unwrap().aabb().overlaps(aabb))
            .map(|i| i as u32)
            .collect()
    }

    #[test]
    fn test_tree_build() {
        let tree = MeshTree::build(grid(4), TreeConfig::plain()).unwrap();
        assert_eq!(tree.primitive_count(), 32);
        assert_eq!(tree.node_count(), 63);
        let root = tree.root_aabb();
        assert_relative_eq!(root.min, Point3::origin());
        assert_relative_eq!(root.max, Point3::new(4.0, 4.0, 0.0));
        tree.check_bounds();
    }

    #[test]
    fn test_tree_query_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let mesh = random_soup(&mut rng, 200);
        for config in all_configs() {
            let tree = MeshTree::build(mesh.clone(), config).unwrap();
            tree.check_bounds();
            for _ in 0..50 {
                let c = Point3::new(
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                );
                let query = Aabb::from_center(c, Vector3::new(3.0, 2.0, 4.0));
                assert_eq!(tree.query_aabb(&query), brute_query(&mesh, &query), "{config:?}");
            }
        }
    }

    #[test]
    fn test_tree_query_miss() {
        let tree = MeshTree::new(grid(2)).unwrap();
        let query = Aabb::new(Point3::new(10.0, 10.0, 10.0), Point3::new(11.0, 11.0, 11.0));
        assert!(tree.query_aabb(&query).is_empty());
    }

    #[test]
    fn test_tree_single_primitive() {
        let mesh = TriangleMesh::from_flat(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            &[0, 1, 2],
        )
        .unwrap();
        for config in all_configs() {
            let tree = MeshTree::build(mesh.clone(), config).unwrap();
            let query = Aabb::from_center(Point3::new(0.2, 0.2, 0.0), Vector3::new(0.1, 0.1, 0.1));
            assert_eq!(tree.query_aabb(&query), vec![0]);
        }
    }

    #[test]
    fn test_query_callback_can_overreport_but_not_miss() {
        let mut rng = StdRng::seed_from_u64(8);
        let mesh = random_soup(&mut rng, 100);
        let tree = MeshTree::build(mesh.clone(), TreeConfig::quantized()).unwrap();
        let query = Aabb::from_center(Point3::origin(), Vector3::new(8.0, 8.0, 8.0));
        let mut candidates = Vec::new();
        tree.query_callback(&query, |i| candidates.push(i));
        for expected in brute_query(&mesh, &query) {
            assert!(candidates.contains(&expected));
        }
    }

    #[test]
    fn test_raycast_closest_nearest_triangle() {
        // Two parallel squares at z = 0 and z = 2, ray from above.
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for z in [0.0, 2.0] {
            let base = vertices.len() as u32;
            vertices.extend_from_slice(&[
                Point3::new(-1.0, -1.0, z),
                Point3::new(1.0, -1.0, z),
                Point3::new(1.0, 1.0, z),
                Point3::new(-1.0, 1.0, z),
            ]);
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        let mesh = TriangleMesh::from_flat(vertices, &indices).unwrap();
        for config in all_configs() {
            let tree = MeshTree::build(mesh.clone(), config).unwrap();
            let ray = Ray::new(Point3::new(0.3, -0.2, 5.0), -Vector3::z(), 10.0).unwrap();
            let hit = tree.raycast_closest(&ray, false).unwrap();
            assert_relative_eq!(hit.distance, 3.0, epsilon = 1e-12);
            assert!(hit.triangle >= 2);
            assert_relative_eq!(hit.point, Point3::new(0.3, -0.2, 2.0), epsilon = 1e-12);

            let all = tree.raycast_all(&ray, false);
            assert_eq!(all.len(), 2);
            assert!(all[0].distance < all[1].distance);

            let short = Ray::new(ray.origin, ray.dir, 2.5).unwrap();
            assert!(tree.raycast_closest(&short, false).is_none());
        }
    }

    #[test]
    fn test_raycast_culling() {
        let tree = MeshTree::new(grid(1)).unwrap();
        // Grid faces +Z; a ray from below sees the back faces.
        let up = Ray::new(Point3::new(0.5, 0.25, -1.0), Vector3::z(), 5.0).unwrap();
        assert!(tree.raycast_closest(&up, true).is_none());
        assert!(tree.raycast_closest(&up, false).is_some());
        let down = Ray::new(Point3::new(0.5, 0.25, 1.0), -Vector3::z(), 5.0).unwrap();
        assert!(tree.raycast_closest(&down, true).is_some());
    }

    #[test]
    fn test_query_tree_pairs() {
        let mut rng = StdRng::seed_from_u64(5);
        let mesh_a = random_soup(&mut rng, 60);
        let mesh_b = random_soup(&mut rng, 40);
        let ta = IsometryMatrix3::from_parts(
            Translation3::new(1.0, -2.0, 0.5),
            Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3),
        );
        let tb = IsometryMatrix3::from_parts(
            Translation3::new(-1.0, 0.0, 2.0),
            Rotation3::from_axis_angle(&Vector3::x_axis(), -0.7),
        );

        // Candidate pairs from the exact tree must include every pair whose
        // world boxes overlap.
        let a = MeshTree::build(mesh_a.clone(), TreeConfig::plain()).unwrap();
        let b = MeshTree::build(mesh_b.clone(), TreeConfig::plain()).unwrap();
        let pairs = a.query_tree_pairs(&b, &ta, &tb);
        let relative = ta.inverse() * tb;
        for i in 0..mesh_a.triangle_count() {
            for j in 0..mesh_b.triangle_count() {
                let box_a = mesh_a.triangle(i).unwrap().aabb();
                let tri_b = mesh_b.triangle(j).unwrap();
                let points: Vec<_> = tri_b.v.iter().map(|p| relative * p).collect();
                let box_b = Aabb::from_points(&points).unwrap();
                if box_a.overlaps(&box_b) {
                    assert!(pairs.contains(&(i as u32, j as u32)), "missing ({i}, {j})");
                }
            }
        }

        // Quantized trees report a superset of the exact candidates.
        let qa = MeshTree::build(mesh_a, TreeConfig::quantized()).unwrap();
        let qb = MeshTree::build(mesh_b, TreeConfig::quantized()).unwrap();
        let quantized_pairs = qa.query_tree_pairs(&qb, &ta, &tb);
        for pair in &pairs {
            assert!(quantized_pairs.binary_search(pair).is_ok());
        }
    }

    #[test]
    fn test_tree_pairs_exact_rotation() {
        // 90 degrees about X with an exact matrix keeps flat boxes flat.
        let tree = MeshTree::new(grid(2)).unwrap();
        let rot = Rotation3::from_matrix_unchecked(Matrix3::new(
            1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0,
        ));
        let tb = IsometryMatrix3::from_parts(Translation3::new(0.0, 0.5, -1.0), rot);
        let pairs = tree.query_tree_pairs(&tree, &IsometryMatrix3::identity(), &tb);
        assert!(!pairs.is_empty());
        let far = IsometryMatrix3::from_parts(Translation3::new(0.0, 0.5, 5.0), rot);
        assert!(tree
            .query_tree_pairs(&tree, &IsometryMatrix3::identity(), &far)
            .is_empty());
    }

    #[test]
    fn test_refit_after_vertex_motion() {
        for config in all_configs() {
            let mut tree = MeshTree::build(grid(3), config).unwrap();
            let query = Aabb::from_center(Point3::new(1.5, 1.5, 5.0), Vector3::new(0.1, 0.1, 0.1));
            assert!(tree.query_aabb(&query).is_empty());

            tree.update_vertices(|vertices| {
                for v in vertices {
                    v.z += 5.0;
                }
            })
            .unwrap();
            tree.check_bounds();
            assert!(!tree.query_aabb(&query).is_empty(), "{config:?}");
            assert_relative_eq!(tree.root_aabb().min.z, 5.0);
        }
    }

    #[test]
    fn test_update_vertices_rejects_nan() {
        let mut tree = MeshTree::new(grid(1)).unwrap();
        let before = tree.mesh().vertices().to_vec();
        let err = tree
            .update_vertices(|vertices| vertices[0].x = f64::NAN)
            .unwrap_err();
        assert!(matches!(err, CollisionError::InvalidShape { .. }));
        assert_eq!(tree.mesh().vertices(), before.as_slice());
    }

    #[test]
    fn test_deformed_degenerate_triangle_is_found_again() {
        // Triangle 1 starts collinear and is left out of the build.
        let mesh = TriangleMesh::from_flat(
            vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(5.0, 0.0, 0.0),
                Point3::new(6.0, 0.0, 0.0),
                Point3::new(5.5, 0.0, 0.0),
            ],
            &[0, 1, 2, 3, 4, 5],
        )
        .unwrap();
        let query = Aabb::from_center(Point3::new(5.5, 0.3, 0.0), Vector3::repeat(0.1));
        let down = Ray::new(Point3::new(5.5, 0.3, 1.0), -Vector3::z(), 10.0).unwrap();

        for config in all_configs() {
            let mut tree = MeshTree::build(mesh.clone(), config).unwrap();
            assert_eq!(tree.skipped(), &[1]);
            assert!(tree.query_aabb(&query).is_empty());

            tree.update_vertices(|v| v[5] = Point3::new(5.5, 1.0, 0.0)).unwrap();
            tree.check_bounds();
            assert_eq!(tree.skipped_count(), 0, "{config:?}");
            assert_eq!(tree.primitive_count(), 2);
            assert_eq!(tree.query_aabb(&query), vec![1], "{config:?}");
            let hit = tree.raycast_closest(&down, false).unwrap();
            assert_eq!(hit.triangle, 1);
            assert_relative_eq!(hit.distance, 1.0);

            // Collapsing again keeps it in the tree, filtered at the leaves.
            tree.update_vertices(|v| v[5] = Point3::new(5.5, 0.0, 0.0)).unwrap();
            tree.check_bounds();
            assert_eq!(tree.primitive_count(), 2);
            assert!(tree.query_aabb(&query).is_empty());
            assert!(tree.raycast_closest(&down, false).is_none());
        }
    }

    #[test]
    fn test_visit_break_stops_walk() {
        struct FirstOnly(Vec<u32>);
        impl TreeVisitor for FirstOnly {
            fn enter(&mut self, _aabb: &Aabb) -> Option<f64> {
                Some(0.0)
            }
            fn visit_primitive(&mut self, index: u32) -> ControlFlow<()> {
                self.0.push(index);
                ControlFlow::Break(())
            }
        }
        let tree = MeshTree::new(grid(4)).unwrap();
        let mut visitor = FirstOnly(Vec::new());
        assert!(tree.visit(&mut visitor).is_break());
        assert_eq!(visitor.0.len(), 1);
    }
}
