//! Triangle mesh storage and buffer views.
//!
//! Meshes usually arrive as flat numeric buffers owned by someone else (an
//! asset loader, a physics front end). [`VertexBuffer`] and [`IndexBuffer`]
//! borrow such buffers with an explicit stride, validate them once, and
//! expose triangles through the [`MeshInterface`] trait. [`TriangleMesh`]
//! is the owned form the trees are built from.
//!
//! # Example
//!
//! ```
//! use sim_collide::mesh::{IndexBuffer, MeshInterface, TriangleMesh, VertexBuffer};
//!
//! // Interleaved position + normal, 6 floats per vertex.
//! let vertex_data = [
//!     0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
//!     1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
//!     0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
//! ];
//! let index_data = [0u32, 1, 2];
//!
//! let vertices = VertexBuffer::new(&vertex_data, 6, 3)?;
//! let indices = IndexBuffer::new(&index_data, 3, 1)?;
//! let mesh = TriangleMesh::from_buffers(&vertices, &indices)?;
//! assert_eq!(mesh.triangle_count(), 1);
//! # Ok::<(), sim_types::CollisionError>(())
//! ```

#![allow(clippy::cast_possible_truncation)]

use nalgebra::Point3;
use sim_types::{CollisionError, Result};

use crate::geometry::{Aabb, IndexedTriangle, Triangle};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Read access to triangles, however they are stored.
pub trait MeshInterface {
    /// Number of triangles.
    fn triangle_count(&self) -> usize;

    /// Number of vertices.
    fn vertex_count(&self) -> usize;

    /// Vertex indices of triangle `index`.
    fn indices(&self, index: usize) -> Option<IndexedTriangle>;

    /// Position of vertex `index`.
    fn vertex(&self, index: usize) -> Option<Point3<f64>>;

    /// Vertex positions of triangle `index`.
    fn triangle(&self, index: usize) -> Option<Triangle> {
        let [a, b, c] = self.indices(index)?.0;
        Some(Triangle::new(
            self.vertex(a as usize)?,
            self.vertex(b as usize)?,
            self.vertex(c as usize)?,
        ))
    }
}

/// A borrowed flat buffer of vertex positions.
///
/// Vertex `i` occupies `data[i * stride .. i * stride + 3]`; any trailing
/// floats in each record (normals, UVs) are ignored.
#[derive(Debug, Clone, Copy)]
pub struct VertexBuffer<'a> {
    data: &'a [f64],
    stride: usize,
    count: usize,
}

impl<'a> VertexBuffer<'a> {
    /// Wrap a buffer holding `count` vertices, `stride` floats apart.
    ///
    /// # Errors
    ///
    /// [`CollisionError::MalformedBuffer`] if the stride is below 3 or the
    /// buffer is too short for `count` records.
    pub fn new(data: &'a [f64], stride: usize, count: usize) -> Result<Self> {
        if stride < 3 {
            return Err(CollisionError::malformed_buffer(format!(
                "vertex stride {stride} is smaller than 3"
            )));
        }
        let needed = required_len(count, stride, 3);
        if data.len() < needed {
            return Err(CollisionError::malformed_buffer(format!(
                "{count} vertices with stride {stride} need {needed} floats, buffer has {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            stride,
            count,
        })
    }

    /// Tightly packed `[x, y, z, x, y, z, ...]`.
    ///
    /// # Errors
    ///
    /// [`CollisionError::MalformedBuffer`] if the length isn't a multiple of 3.
    pub fn packed(data: &'a [f64]) -> Result<Self> {
        if data.len() % 3 != 0 {
            return Err(CollisionError::malformed_buffer(format!(
                "packed vertex buffer length {} is not a multiple of 3",
                data.len()
            )));
        }
        Self::new(data, 3, data.len() / 3)
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the buffer holds no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Floats between consecutive records.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Position of vertex `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Point3<f64>> {
        if index >= self.count {
            return None;
        }
        let start = index * self.stride;
        let p = self.data.get(start..start + 3)?;
        Some(Point3::new(p[0], p[1], p[2]))
    }
}

/// Element type of an index buffer.
#[derive(Debug, Clone, Copy)]
pub enum IndexData<'a> {
    /// 16-bit indices.
    U16(&'a [u16]),
    /// 32-bit indices.
    U32(&'a [u32]),
}

impl IndexData<'_> {
    fn len(&self) -> usize {
        match self {
            Self::U16(d) => d.len(),
            Self::U32(d) => d.len(),
        }
    }

    fn get(&self, i: usize) -> Option<u32> {
        match self {
            Self::U16(d) => d.get(i).map(|&v| u32::from(v)),
            Self::U32(d) => d.get(i).copied(),
        }
    }
}

impl<'a> From<&'a [u32]> for IndexData<'a> {
    fn from(data: &'a [u32]) -> Self {
        Self::U32(data)
    }
}

impl<'a> From<&'a [u16]> for IndexData<'a> {
    fn from(data: &'a [u16]) -> Self {
        Self::U16(data)
    }
}

impl<'a, const N: usize> From<&'a [u32; N]> for IndexData<'a> {
    fn from(data: &'a [u32; N]) -> Self {
        Self::U32(data)
    }
}

impl<'a, const N: usize> From<&'a [u16; N]> for IndexData<'a> {
    fn from(data: &'a [u16; N]) -> Self {
        Self::U16(data)
    }
}

/// A borrowed flat buffer of triangle indices.
///
/// Triangle `i` reads its three indices from `data[i * stride ..]`.
#[derive(Debug, Clone, Copy)]
pub struct IndexBuffer<'a> {
    data: IndexData<'a>,
    stride: usize,
    count: usize,
}

impl<'a> IndexBuffer<'a> {
    /// Wrap a buffer holding `count` triangles, `stride` indices apart.
    ///
    /// # Errors
    ///
    /// [`CollisionError::MalformedBuffer`] if the stride is below 3 or the
    /// buffer is too short.
    pub fn new(data: impl Into<IndexData<'a>>, stride: usize, count: usize) -> Result<Self> {
        let data = data.into();
        if stride < 3 {
            return Err(CollisionError::malformed_buffer(format!(
                "index stride {stride} is smaller than 3"
            )));
        }
        let needed = required_len(count, stride, 3);
        if data.len() < needed {
            return Err(CollisionError::malformed_buffer(format!(
                "{count} triangles with stride {stride} need {needed} indices, buffer has {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            stride,
            count,
        })
    }

    /// Number of triangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the buffer holds no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Indices of triangle `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<IndexedTriangle> {
        if index >= self.count {
            return None;
        }
        let start = index * self.stride;
        Some(IndexedTriangle::new(
            self.data.get(start)?,
            self.data.get(start + 1)?,
            self.data.get(start + 2)?,
        ))
    }
}

fn required_len(count: usize, stride: usize, record: usize) -> usize {
    if count == 0 {
        0
    } else {
        (count - 1) * stride + record
    }
}

/// A validated pair of borrowed buffers.
#[derive(Debug, Clone, Copy)]
pub struct BufferMesh<'a> {
    vertices: VertexBuffer<'a>,
    indices: IndexBuffer<'a>,
}

impl<'a> BufferMesh<'a> {
    /// Pair the buffers, checking every index against the vertex count.
    ///
    /// # Errors
    ///
    /// [`CollisionError::IndexOutOfRange`] for the first bad index.
    pub fn new(vertices: VertexBuffer<'a>, indices: IndexBuffer<'a>) -> Result<Self> {
        for t in 0..indices.len() {
            if let Some(tri) = indices.get(t) {
                check_indices(t, tri, vertices.len())?;
            }
        }
        Ok(Self { vertices, indices })
    }
}

impl MeshInterface for BufferMesh<'_> {
    fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn indices(&self, index: usize) -> Option<IndexedTriangle> {
        self.indices.get(index)
    }

    fn vertex(&self, index: usize) -> Option<Point3<f64>> {
        self.vertices.get(index)
    }
}

fn check_indices(triangle: usize, tri: IndexedTriangle, vertex_count: usize) -> Result<()> {
    for &index in &tri.0 {
        if index as usize >= vertex_count {
            return Err(CollisionError::IndexOutOfRange {
                triangle,
                index: index as usize,
                vertex_count,
            });
        }
    }
    Ok(())
}

/// An owned, validated triangle mesh in local coordinates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriangleMesh {
    vertices: Vec<Point3<f64>>,
    triangles: Vec<IndexedTriangle>,
}

impl TriangleMesh {
    /// Create a mesh from vertices and indexed triangles.
    ///
    /// # Errors
    ///
    /// [`CollisionError::EmptyMesh`] without triangles,
    /// [`CollisionError::IndexOutOfRange`] for a bad index and
    /// [`CollisionError::InvalidShape`] for a non-finite vertex.
    pub fn new(vertices: Vec<Point3<f64>>, triangles: Vec<IndexedTriangle>) -> Result<Self> {
        if triangles.is_empty() {
            return Err(CollisionError::EmptyMesh);
        }
        if u32::try_from(triangles.len()).is_err() {
            return Err(CollisionError::malformed_buffer(format!(
                "{} triangles exceed the u32 index range",
                triangles.len()
            )));
        }
        if let Some(i) = vertices.iter().position(|v| !v.coords.iter().all(|c| c.is_finite())) {
            return Err(CollisionError::invalid_shape(format!(
                "vertex {i} has a non-finite coordinate"
            )));
        }
        for (t, tri) in triangles.iter().enumerate() {
            check_indices(t, *tri, vertices.len())?;
        }
        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Create a mesh from a flat index list (three per triangle).
    ///
    /// # Errors
    ///
    /// [`CollisionError::MalformedBuffer`] if the index count isn't a
    /// multiple of 3, plus everything [`TriangleMesh::new`] reports.
    pub fn from_flat(vertices: Vec<Point3<f64>>, indices: &[u32]) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(CollisionError::malformed_buffer(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        let triangles = indices
            .chunks_exact(3)
            .map(|c| IndexedTriangle::new(c[0], c[1], c[2]))
            .collect();
        Self::new(vertices, triangles)
    }

    /// Copy a mesh out of borrowed strided buffers.
    ///
    /// # Errors
    ///
    /// As [`TriangleMesh::new`].
    pub fn from_buffers(vertices: &VertexBuffer<'_>, indices: &IndexBuffer<'_>) -> Result<Self> {
        let verts = (0..vertices.len()).filter_map(|i| vertices.get(i)).collect();
        let tris = (0..indices.len()).filter_map(|i| indices.get(i)).collect();
        Self::new(verts, tris)
    }

    /// Copy any [`MeshInterface`].
    ///
    /// # Errors
    ///
    /// As [`TriangleMesh::new`].
    pub fn from_interface<M: MeshInterface + ?Sized>(mesh: &M) -> Result<Self> {
        let verts = (0..mesh.vertex_count()).filter_map(|i| mesh.vertex(i)).collect();
        let tris = (0..mesh.triangle_count()).filter_map(|i| mesh.indices(i)).collect();
        Self::new(verts, tris)
    }

    /// Get the vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Mutable vertex access for deforming meshes. Trees built over this
    /// mesh must be refit afterwards.
    pub fn vertices_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.vertices
    }

    /// Get the indexed triangles.
    #[must_use]
    pub fn triangles(&self) -> &[IndexedTriangle] {
        &self.triangles
    }

    /// Local-space bounding box of all vertices.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&self.vertices).unwrap_or_default()
    }

    /// Number of degenerate triangles (repeated index or zero area).
    #[must_use]
    pub fn degenerate_count(&self) -> usize {
        (0..self.triangles.len())
            .filter(|&i| self.is_degenerate(i))
            .count()
    }

    /// Whether triangle `index` has no usable area.
    #[must_use]
    pub fn is_degenerate(&self, index: usize) -> bool {
        let Some(tri) = self.triangles.get(index) else {
            return true;
        };
        tri.is_degenerate()
            || tri
                .resolve(&self.vertices)
                .map_or(true, |t| t.is_degenerate())
    }
}

impl MeshInterface for TriangleMesh {
    fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn indices(&self, index: usize) -> Option<IndexedTriangle> {
        self.triangles.get(index).copied()
    }

    fn vertex(&self, index: usize) -> Option<Point3<f64>> {
        self.vertices.get(index).copied()
    }

    fn triangle(&self, index: usize) -> Option<Triangle> {
        self.triangles.get(index)?.resolve(&self.vertices)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn quad() -> TriangleMesh {
        TriangleMesh::from_flat(
            vec![
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(-1.0, 1.0, 0.0),
            ],
            &[0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn test_from_flat() {
        let mesh = quad();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.aabb().max, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.degenerate_count(), 0);
        let tri = mesh.triangle(1).unwrap();
        assert_eq!(tri.v[2], Point3::new(-1.0, 1.0, 0.0));
        assert!(mesh.triangle(2).is_none());
    }

    #[test]
    fn test_index_out_of_range() {
        let err = TriangleMesh::from_flat(vec![Point3::origin(); 3], &[0, 1, 2, 0, 1, 3]).unwrap_err();
        assert_eq!(
            err,
            CollisionError::IndexOutOfRange {
                triangle: 1,
                index: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn test_malformed_and_empty() {
        let err = TriangleMesh::from_flat(vec![Point3::origin(); 3], &[0, 1]).unwrap_err();
        assert!(matches!(err, CollisionError::MalformedBuffer { .. }));

        let err = TriangleMesh::new(vec![Point3::origin(); 3], vec![]).unwrap_err();
        assert_eq!(err, CollisionError::EmptyMesh);

        let err = TriangleMesh::from_flat(
            vec![Point3::origin(), Point3::new(f64::NAN, 0.0, 0.0), Point3::origin()],
            &[0, 1, 2],
        )
        .unwrap_err();
        assert!(matches!(err, CollisionError::InvalidShape { .. }));
    }

    #[test]
    fn test_strided_buffers() {
        // x y z pad
        let verts = [
            0.0, 0.0, 0.0, 9.0, //
            1.0, 0.0, 0.0, 9.0, //
            0.0, 1.0, 0.0, 9.0, //
            0.0, 0.0, 1.0,
        ];
        // a b c material
        let idx: [u16; 7] = [0, 1, 2, 7, 0, 2, 3];
        let vb = VertexBuffer::new(&verts, 4, 4).unwrap();
        let ib = IndexBuffer::new(&idx, 4, 2).unwrap();
        assert_eq!(vb.get(3), Some(Point3::new(0.0, 0.0, 1.0)));
        assert_eq!(ib.get(1), Some(IndexedTriangle::new(0, 2, 3)));
        assert_eq!(ib.get(2), None);

        let view = BufferMesh::new(vb, ib).unwrap();
        let mesh = TriangleMesh::from_interface(&view).unwrap();
        assert_eq!(mesh, TriangleMesh::from_buffers(&vb, &ib).unwrap());
        assert_eq!(mesh.triangles()[1], IndexedTriangle::new(0, 2, 3));
    }

    #[test]
    fn test_buffer_validation() {
        let verts = [0.0; 8];
        assert!(matches!(
            VertexBuffer::new(&verts, 2, 2),
            Err(CollisionError::MalformedBuffer { .. })
        ));
        assert!(matches!(
            VertexBuffer::new(&verts, 4, 3),
            Err(CollisionError::MalformedBuffer { .. })
        ));
        assert!(VertexBuffer::packed(&verts).is_err());
        assert_eq!(VertexBuffer::new(&verts, 4, 2).unwrap().len(), 2);

        let idx = [0u32, 1, 5];
        let ib = IndexBuffer::new(&idx, 3, 1).unwrap();
        let vb = VertexBuffer::new(&verts[..6], 3, 2).unwrap();
        assert!(matches!(
            BufferMesh::new(vb, ib),
            Err(CollisionError::IndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn test_degenerate_detection() {
        let mesh = TriangleMesh::from_flat(
            vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[0, 1, 2, 0, 0, 3, 0, 1, 3],
        )
        .unwrap();
        assert!(mesh.is_degenerate(0));
        assert!(mesh.is_degenerate(1));
        assert!(!mesh.is_degenerate(2));
        assert_eq!(mesh.degenerate_count(), 2);
    }
}
