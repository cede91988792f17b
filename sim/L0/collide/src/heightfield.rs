//! Height field terrain.
//!
//! A height field is a regular grid of height samples defining a surface.
//! Each cell is split into two triangles along its `(0,0)-(1,1)` diagonal,
//! and a [`MeshTree`] is built over those triangles so every query shape
//! goes through the same colliders as a triangle mesh.
//!
//! # Coordinate System
//!
//! - Origin at the grid corner, sample `(0, 0)`
//! - X spans `[0, (width - 1) * cell_size]`
//! - Y spans `[0, (depth - 1) * cell_size]`
//! - Z is up and comes from the height data
//!
//! ```text
//!    Z (up)
//!    │
//!    │  ╱────╲
//!    │ ╱      ╲
//!    │╱        ╲
//!    └────────────→ X
//!   ╱
//!  ╱
//! ↙ Y
//! ```
//!
//! # Example
//!
//! ```
//! use sim_collide::heightfield::{HeightField, HeightFieldData};
//! use sim_collide::geometry::Sphere;
//! use sim_types::ColliderConfig;
//! use nalgebra::{IsometryMatrix3, Point3};
//!
//! let data = HeightFieldData::flat(10, 10, 1.0, 0.0)?;
//! let terrain = HeightField::new(data)?;
//!
//! let mut contacts = Vec::new();
//! let ball = Sphere::new(Point3::new(4.3, 4.6, 0.5), 1.0);
//! let touched = terrain.collide_sphere(
//!     &ball,
//!     &IsometryMatrix3::identity(),
//!     ColliderConfig::default(),
//!     &mut contacts,
//! );
//! assert!(touched);
//! # Ok::<(), sim_types::CollisionError>(())
//! ```

// Grid indices are small and bounds-checked before use.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]

use nalgebra::{IsometryMatrix3, Point3, Vector3};
use sim_types::{ColliderConfig, CollisionError, Contact, Result, TreeConfig};
use tracing::debug;

use crate::geometry::{Aabb, Capsule, Obb, Ray, Sphere, Triangle};
use crate::math::normalize_or;
use crate::mesh::TriangleMesh;
use crate::mid_phase::MeshTree;
use crate::narrow_phase::{CapsuleCollider, ObbCollider, RayCollider, RayHit, SphereCollider};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Grid of height samples.
///
/// Heights are stored row-major with X varying fastest:
/// `heights[y * width + x]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeightFieldData {
    heights: Vec<f64>,
    width: usize,
    depth: usize,
    cell_size: f64,
    min_height: f64,
    max_height: f64,
}

impl HeightFieldData {
    /// Create from height samples.
    ///
    /// # Errors
    ///
    /// [`CollisionError::InvalidShape`] if the grid has fewer than 2×2
    /// samples, the sample count does not match, the cell size is not
    /// positive, or a height is not finite.
    pub fn new(heights: Vec<f64>, width: usize, depth: usize, cell_size: f64) -> Result<Self> {
        if width < 2 || depth < 2 {
            return Err(CollisionError::invalid_shape(format!(
                "height field needs at least 2x2 samples, got {width}x{depth}"
            )));
        }
        if heights.len() != width * depth {
            return Err(CollisionError::invalid_shape(format!(
                "height field has {} samples, expected {width}x{depth}",
                heights.len()
            )));
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(CollisionError::invalid_shape(format!(
                "height field cell size must be positive, got {cell_size}"
            )));
        }
        if let Some(bad) = heights.iter().position(|h| !h.is_finite()) {
            return Err(CollisionError::invalid_shape(format!(
                "height sample {bad} is not finite"
            )));
        }

        let (min_height, max_height) = heights
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &h| {
                (min.min(h), max.max(h))
            });

        Ok(Self {
            heights,
            width,
            depth,
            cell_size,
            min_height,
            max_height,
        })
    }

    /// Create from 8-bit samples: `height = byte * scale + offset`.
    ///
    /// # Errors
    ///
    /// As [`HeightFieldData::new`].
    pub fn from_bytes(
        data: &[u8],
        width: usize,
        depth: usize,
        cell_size: f64,
        scale: f64,
        offset: f64,
    ) -> Result<Self> {
        let heights = data
            .iter()
            .map(|&b| f64::from(b) * scale + offset)
            .collect();
        Self::new(heights, width, depth, cell_size)
    }

    /// A flat field at `height`.
    ///
    /// # Errors
    ///
    /// As [`HeightFieldData::new`].
    pub fn flat(width: usize, depth: usize, cell_size: f64, height: f64) -> Result<Self> {
        Self::new(vec![height; width * depth], width, depth, cell_size)
    }

    /// Sample `f(x, y)` at every grid point.
    ///
    /// # Errors
    ///
    /// As [`HeightFieldData::new`].
    pub fn from_fn<F>(width: usize, depth: usize, cell_size: f64, f: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> f64,
    {
        let mut heights = Vec::with_capacity(width * depth);
        for y in 0..depth {
            for x in 0..width {
                heights.push(f(x as f64 * cell_size, y as f64 * cell_size));
            }
        }
        Self::new(heights, width, depth, cell_size)
    }

    /// Samples along X.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Samples along Y.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Spacing between samples.
    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Total X extent.
    #[must_use]
    pub fn extent_x(&self) -> f64 {
        (self.width - 1) as f64 * self.cell_size
    }

    /// Total Y extent.
    #[must_use]
    pub fn extent_y(&self) -> f64 {
        (self.depth - 1) as f64 * self.cell_size
    }

    /// Lowest sample.
    #[must_use]
    pub fn min_height(&self) -> f64 {
        self.min_height
    }

    /// Highest sample.
    #[must_use]
    pub fn max_height(&self) -> f64 {
        self.max_height
    }

    /// Height at grid point `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.width && y < self.depth {
            self.heights.get(y * self.width + x).copied()
        } else {
            None
        }
    }

    /// Surface height at `(x, y)`, interpolated on the cell triangle that
    /// contains the point. `None` outside the grid.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        let (cx, cy) = self.cell_at(x, y)?;
        let [h00, h10, h01, h11] = self.cell_heights(cx, cy)?;
        let fx = (x / self.cell_size - cx as f64).clamp(0.0, 1.0);
        let fy = (y / self.cell_size - cy as f64).clamp(0.0, 1.0);
        if fx >= fy {
            Some(h00 + fx * (h10 - h00) + fy * (h11 - h10))
        } else {
            Some(h00 + fy * (h01 - h00) + fx * (h11 - h01))
        }
    }

    /// Upward unit normal of the surface triangle under `(x, y)`.
    #[must_use]
    pub fn normal(&self, x: f64, y: f64) -> Option<Vector3<f64>> {
        let (cx, cy) = self.cell_at(x, y)?;
        let [lower, upper] = self.cell_triangles(cx, cy)?;
        let fx = x / self.cell_size - cx as f64;
        let fy = y / self.cell_size - cy as f64;
        let tri = if fx >= fy { lower } else { upper };
        Some(normalize_or(&tri.scaled_normal(), Vector3::z()))
    }

    /// Bounding box of the whole surface.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            Point3::new(0.0, 0.0, self.min_height),
            Point3::new(self.extent_x(), self.extent_y(), self.max_height),
        )
    }

    /// Cell containing `(x, y)`. Points on the far edges belong to the
    /// last cell.
    #[must_use]
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let cx = Self::cell_index(x / self.cell_size, self.width - 1)?;
        let cy = Self::cell_index(y / self.cell_size, self.depth - 1)?;
        Some((cx, cy))
    }

    fn cell_index(g: f64, cells: usize) -> Option<usize> {
        if !(0.0..=cells as f64).contains(&g) {
            return None;
        }
        Some((g.floor() as usize).min(cells - 1))
    }

    /// Cells whose footprint overlaps the box, clamped to the grid.
    pub fn cells_in_aabb(&self, aabb: &Aabb) -> impl Iterator<Item = (usize, usize)> + '_ {
        let xs = self.cell_span(aabb.min.x, aabb.max.x, self.width - 1);
        let ys = self.cell_span(aabb.min.y, aabb.max.y, self.depth - 1);
        let ((x0, x1), (y0, y1)) = xs.zip(ys).unwrap_or(((1, 0), (1, 0)));
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
    }

    fn cell_span(&self, lo: f64, hi: f64, cells: usize) -> Option<(usize, usize)> {
        let lo = lo / self.cell_size;
        let hi = hi / self.cell_size;
        if lo.is_nan() || hi.is_nan() || hi < lo || hi < 0.0 || lo > cells as f64 {
            return None;
        }
        let first = (lo.max(0.0).floor() as usize).min(cells - 1);
        let last = (hi.floor() as usize).min(cells - 1);
        Some((first, last))
    }

    /// Corner heights of a cell: `[(x, y), (x+1, y), (x, y+1), (x+1, y+1)]`.
    #[must_use]
    pub fn cell_heights(&self, cx: usize, cy: usize) -> Option<[f64; 4]> {
        if cx + 1 >= self.width || cy + 1 >= self.depth {
            return None;
        }
        Some([
            self.get(cx, cy)?,
            self.get(cx + 1, cy)?,
            self.get(cx, cy + 1)?,
            self.get(cx + 1, cy + 1)?,
        ])
    }

    /// Position of grid point `(x, y)`.
    #[must_use]
    pub fn vertex_position(&self, x: usize, y: usize) -> Option<Point3<f64>> {
        let h = self.get(x, y)?;
        Some(Point3::new(
            x as f64 * self.cell_size,
            y as f64 * self.cell_size,
            h,
        ))
    }

    /// The two triangles of a cell, below and above its diagonal.
    #[must_use]
    pub fn cell_triangles(&self, cx: usize, cy: usize) -> Option<[Triangle; 2]> {
        let p00 = self.vertex_position(cx, cy)?;
        let p10 = self.vertex_position(cx + 1, cy)?;
        let p01 = self.vertex_position(cx, cy + 1)?;
        let p11 = self.vertex_position(cx + 1, cy + 1)?;
        Some([Triangle::new(p00, p10, p11), Triangle::new(p00, p11, p01)])
    }

    /// Cell owning triangle `index` of [`HeightFieldData::to_mesh`].
    #[must_use]
    pub fn cell_of_triangle(&self, index: u32) -> Option<(usize, usize)> {
        let cell = index as usize / 2;
        let cells_x = self.width - 1;
        let (cx, cy) = (cell % cells_x, cell / cells_x);
        (cy + 1 < self.depth).then_some((cx, cy))
    }

    /// Triangulate the surface, two counter-clockwise triangles per cell.
    ///
    /// Triangle `2 * (cy * (width - 1) + cx) + k` belongs to cell
    /// `(cx, cy)`; `k = 0` lies below the diagonal.
    ///
    /// # Errors
    ///
    /// Only if the grid is too large for 32-bit indices.
    pub fn to_mesh(&self) -> Result<TriangleMesh> {
        if self.heights.len() > u32::MAX as usize {
            return Err(CollisionError::invalid_shape(
                "height field too large for 32-bit indices",
            ));
        }
        let mut vertices = Vec::with_capacity(self.heights.len());
        for y in 0..self.depth {
            for x in 0..self.width {
                vertices.push(Point3::new(
                    x as f64 * self.cell_size,
                    y as f64 * self.cell_size,
                    self.heights[y * self.width + x],
                ));
            }
        }

        let w = self.width as u32;
        let mut indices = Vec::with_capacity(6 * (self.width - 1) * (self.depth - 1));
        for cy in 0..(self.depth - 1) as u32 {
            for cx in 0..w - 1 {
                let v00 = cy * w + cx;
                let v10 = v00 + 1;
                let v01 = v00 + w;
                let v11 = v01 + 1;
                indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
            }
        }
        TriangleMesh::from_flat(vertices, &indices)
    }
}

/// Height field with a tree over its triangles.
#[derive(Debug, Clone)]
pub struct HeightField {
    data: HeightFieldData,
    tree: MeshTree,
}

impl HeightField {
    /// Build with the default tree configuration.
    ///
    /// # Errors
    ///
    /// See [`HeightField::with_config`].
    pub fn new(data: HeightFieldData) -> Result<Self> {
        Self::with_config(data, TreeConfig::default())
    }

    /// Build with an explicit tree configuration.
    ///
    /// # Errors
    ///
    /// Propagates mesh and tree build errors.
    pub fn with_config(data: HeightFieldData, config: TreeConfig) -> Result<Self> {
        let tree = MeshTree::build(data.to_mesh()?, config)?;
        debug!(
            width = data.width(),
            depth = data.depth(),
            triangles = tree.primitive_count(),
            "height field built"
        );
        Ok(Self { data, tree })
    }

    /// Height samples.
    #[must_use]
    pub fn data(&self) -> &HeightFieldData {
        &self.data
    }

    /// Tree over the surface triangles.
    #[must_use]
    pub fn tree(&self) -> &MeshTree {
        &self.tree
    }

    /// Local bounding box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.data.aabb()
    }

    /// Contacts between a world-space sphere and the field placed at
    /// `transform`. Returns whether anything touched.
    pub fn collide_sphere(
        &self,
        sphere: &Sphere,
        transform: &IsometryMatrix3<f64>,
        config: ColliderConfig,
        out: &mut Vec<Contact>,
    ) -> bool {
        SphereCollider::new(config).collide(sphere, &self.tree, transform, out)
    }

    /// Contacts between a world-space capsule and the field.
    pub fn collide_capsule(
        &self,
        capsule: &Capsule,
        transform: &IsometryMatrix3<f64>,
        config: ColliderConfig,
        out: &mut Vec<Contact>,
    ) -> bool {
        CapsuleCollider::new(config).collide(capsule, &self.tree, transform, out)
    }

    /// Contacts between a world-space box and the field.
    pub fn collide_box(
        &self,
        obb: &Obb,
        transform: &IsometryMatrix3<f64>,
        config: ColliderConfig,
        out: &mut Vec<Contact>,
    ) -> bool {
        ObbCollider::new(config).collide(obb, &self.tree, transform, out)
    }

    /// Closest hit of a world-space ray. Rays starting outside the grid
    /// are handled like any other: they hit only if they reach the surface.
    #[must_use]
    pub fn raycast(
        &self,
        ray: &Ray,
        transform: &IsometryMatrix3<f64>,
        config: ColliderConfig,
    ) -> Option<RayHit> {
        RayCollider::new(config)
            .collide(ray, &self.tree, transform)
            .into_iter()
            .next()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::geometry::Segment;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Translation3};

    fn lifted(z: f64) -> IsometryMatrix3<f64> {
        IsometryMatrix3::from_parts(Translation3::new(0.0, 0.0, z), Rotation3::identity())
    }

    #[test]
    fn test_heightfield_flat() {
        let hf = HeightFieldData::flat(10, 10, 1.0, 5.0).unwrap();
        assert_eq!(hf.width(), 10);
        assert_eq!(hf.depth(), 10);
        assert_relative_eq!(hf.min_height(), 5.0);
        assert_relative_eq!(hf.max_height(), 5.0);
        assert_relative_eq!(hf.sample(0.0, 0.0).unwrap(), 5.0);
        assert_relative_eq!(hf.sample(4.5, 4.5).unwrap(), 5.0);
        assert_relative_eq!(hf.sample(9.0, 9.0).unwrap(), 5.0);
        assert!(hf.sample(9.5, 2.0).is_none());
        assert!(hf.sample(-0.1, 2.0).is_none());
    }

    #[test]
    fn test_heightfield_rejects_bad_input() {
        assert!(HeightFieldData::new(vec![0.0; 3], 2, 2, 1.0).is_err());
        assert!(HeightFieldData::new(vec![0.0; 2], 2, 1, 1.0).is_err());
        assert!(HeightFieldData::new(vec![0.0; 4], 2, 2, 0.0).is_err());
        assert!(HeightFieldData::new(vec![0.0, 1.0, f64::NAN, 0.0], 2, 2, 1.0).is_err());
    }

    #[test]
    fn test_heightfield_from_bytes() {
        let hf = HeightFieldData::from_bytes(b"1234567890123456", 4, 4, 1.0, 1.0, 0.0).unwrap();
        assert_eq!(hf.get(0, 0), Some(f64::from(b'1')));
        assert_eq!(hf.get(1, 2), Some(f64::from(b'0')));
        assert_eq!(hf.min_height(), f64::from(b'0'));
        assert_eq!(hf.max_height(), f64::from(b'9'));

        let scaled = HeightFieldData::from_bytes(&[0, 10, 20, 30], 2, 2, 1.0, 0.5, -1.0).unwrap();
        assert_eq!(scaled.get(1, 1), Some(14.0));
    }

    #[test]
    fn test_heightfield_interpolates_on_triangles() {
        // z = 2x + y is a plane, so both triangles agree with it.
        let hf = HeightFieldData::new(vec![0.0, 2.0, 1.0, 3.0], 2, 2, 1.0).unwrap();
        assert_relative_eq!(hf.sample(0.5, 0.5).unwrap(), 1.5);
        assert_relative_eq!(hf.sample(0.75, 0.25).unwrap(), 1.75);
        assert_relative_eq!(hf.sample(0.25, 0.75).unwrap(), 1.25);
        assert_relative_eq!(hf.sample(1.0, 1.0).unwrap(), 3.0);

        // Ridge along the diagonal: not bilinear.
        let ridge = HeightFieldData::new(vec![1.0, 0.0, 0.0, 1.0], 2, 2, 1.0).unwrap();
        assert_relative_eq!(ridge.sample(0.5, 0.5).unwrap(), 1.0);
    }

    #[test]
    fn test_heightfield_normal() {
        let slope = HeightFieldData::from_fn(10, 10, 1.0, |x, _| x * 0.5).unwrap();
        let n = slope.normal(5.3, 5.1).unwrap();
        assert!(n.x < 0.0);
        assert!(n.z > 0.0);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_heightfield_cells_in_aabb() {
        let hf = HeightFieldData::flat(10, 10, 1.0, 0.0).unwrap();
        let query = Aabb::new(Point3::new(2.5, 2.5, -1.0), Point3::new(5.5, 5.5, 1.0));
        let cells: Vec<_> = hf.cells_in_aabb(&query).collect();
        assert_eq!(cells.len(), 16);
        assert!(cells.contains(&(2, 2)));
        assert!(cells.contains(&(5, 5)));

        let clamped = Aabb::new(Point3::new(-5.0, 7.5, -1.0), Point3::new(1.5, 50.0, 1.0));
        let cells: Vec<_> = hf.cells_in_aabb(&clamped).collect();
        assert_eq!(cells, vec![(0, 7), (1, 7), (0, 8), (1, 8)]);

        let outside = Aabb::new(Point3::new(20.0, 0.0, -1.0), Point3::new(21.0, 1.0, 1.0));
        assert_eq!(hf.cells_in_aabb(&outside).count(), 0);
    }

    #[test]
    fn test_heightfield_mesh_layout() {
        let hf = HeightFieldData::from_fn(4, 3, 0.5, |x, y| x + y).unwrap();
        let mesh = hf.to_mesh().unwrap();
        assert_eq!(mesh.triangles().len(), 2 * 3 * 2);
        assert_eq!(hf.cell_of_triangle(7), Some((0, 1)));
        assert_eq!(hf.cell_of_triangle(12), None);

        let tri = crate::mesh::MeshInterface::triangle(&mesh, 7).unwrap();
        let [_, upper] = hf.cell_triangles(0, 1).unwrap();
        assert_eq!(tri, upper);
        assert!(tri.scaled_normal().z > 0.0);
    }

    #[test]
    fn test_heightfield_sphere_contact() {
        let terrain = HeightField::new(HeightFieldData::flat(10, 10, 1.0, 0.0).unwrap()).unwrap();
        let mut out = Vec::new();
        let config = ColliderConfig::default();

        let above = Sphere::new(Point3::new(5.3, 5.6, 2.0), 1.0);
        assert!(!terrain.collide_sphere(&above, &IsometryMatrix3::identity(), config, &mut out));

        let resting = Sphere::new(Point3::new(5.3, 5.6, 0.5), 1.0);
        assert!(terrain.collide_sphere(&resting, &IsometryMatrix3::identity(), config, &mut out));
        let deepest = out.iter().map(|c| c.depth).fold(f64::MIN, f64::max);
        assert_relative_eq!(deepest, 0.5, epsilon = 1e-12);

        out.clear();
        let raised = Sphere::new(Point3::new(2.2, 2.7, 10.5), 1.0);
        assert!(terrain.collide_sphere(&raised, &lifted(10.0), config, &mut out));
        let c = out.iter().max_by(|a, b| a.depth.total_cmp(&b.depth)).unwrap();
        assert_relative_eq!(c.depth, 0.5, epsilon = 1e-12);
        assert_relative_eq!(c.position.z, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_heightfield_capsule_and_box() {
        let terrain = HeightField::new(HeightFieldData::flat(10, 10, 1.0, 0.0).unwrap()).unwrap();
        let config = ColliderConfig::default();
        let mut out = Vec::new();

        let capsule = Capsule::new(
            Segment::new(Point3::new(3.2, 5.4, 0.3), Point3::new(6.8, 5.4, 0.3)),
            0.5,
        );
        assert!(terrain.collide_capsule(&capsule, &IsometryMatrix3::identity(), config, &mut out));
        // Triangles straight below the core reach 0.2; neighbours touch less.
        let deepest = out.iter().map(|c| c.depth).fold(f64::MIN, f64::max);
        assert_relative_eq!(deepest, 0.2, epsilon = 1e-9);
        assert!(out.iter().all(|c| c.depth <= 0.2 + 1e-9));

        out.clear();
        let obb = Obb::new(
            Point3::new(5.7, 5.25, 0.3),
            Vector3::new(0.2, 0.2, 0.5),
            Rotation3::identity(),
        );
        assert!(terrain.collide_box(&obb, &IsometryMatrix3::identity(), config, &mut out));
        // Only the lower triangle of cell (5, 5) is under the box.
        assert_eq!(out.len(), 1);
        for c in &out {
            assert_relative_eq!(c.depth, 0.2, epsilon = 1e-9);
            assert_relative_eq!(c.normal, Vector3::z(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_heightfield_ray_from_outside_bounds() {
        let data = HeightFieldData::from_bytes(b"1234567890123456", 4, 4, 1.0, 1.0, 0.0).unwrap();
        let terrain = HeightField::new(data).unwrap();
        let ray = Ray::new(Point3::new(5.0, 10.0, 1.0), -Vector3::y(), 20.0).unwrap();
        let hit = terrain.raycast(&ray, &IsometryMatrix3::identity(), ColliderConfig::default());
        assert!(hit.is_none());
    }

    #[test]
    fn test_heightfield_ray_enters_from_side() {
        let terrain = HeightField::new(HeightFieldData::flat(5, 5, 1.0, 0.0).unwrap()).unwrap();
        let ray = Ray::new(
            Point3::new(-1.0, 2.3, 2.0),
            Vector3::new(1.0, 0.0, -1.0),
            10.0,
        )
        .unwrap();
        let hit = terrain
            .raycast(&ray, &IsometryMatrix3::identity(), ColliderConfig::default())
            .unwrap();
        assert_relative_eq!(hit.point, Point3::new(1.0, 2.3, 0.0), epsilon = 1e-9);
        assert_relative_eq!(hit.distance, 2.0 * std::f64::consts::SQRT_2, epsilon = 1e-9);
    }
}
