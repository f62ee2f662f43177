use nalgebra::Vector3;
use ndarray::{Array2, ArrayView1, Axis, concatenate};
use stl_io::{Normal, Triangle, Vertex};

use crate::error::{AtlasnetError, Result};

/// Triangle mesh assembled from deformed primitives.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub vertices: Array2<f32>, // [V, 3]
    pub faces: Array2<usize>,  // [F, 3]
}

impl Mesh {
    /// Faces must index into `vertices`; both arrays need 3 columns.
    pub fn new(vertices: Array2<f32>, faces: Array2<usize>) -> Result<Self> {
        if vertices.ncols() != 3 {
            return Err(AtlasnetError::ShapeMismatch {
                expected: vec![vertices.nrows(), 3],
                got: vertices.shape().to_vec(),
            });
        }
        if faces.ncols() != 3 {
            return Err(AtlasnetError::ShapeMismatch {
                expected: vec![faces.nrows(), 3],
                got: faces.shape().to_vec(),
            });
        }
        if let Some(&index) = faces.iter().find(|&&i| i >= vertices.nrows()) {
            return Err(AtlasnetError::InvalidConfig {
                message: format!(
                    "face references vertex {index} but the mesh has {} vertices",
                    vertices.nrows()
                ),
            });
        }
        Ok(Self { vertices, faces })
    }

    pub fn empty() -> Self {
        Self {
            vertices: Array2::zeros((0, 3)),
            faces: Array2::zeros((0, 3)),
        }
    }

    /// Concatenate meshes, shifting each mesh's faces by the vertices before it.
    pub fn merge(meshes: &[Mesh]) -> Result<Self> {
        if meshes.is_empty() {
            return Ok(Self::empty());
        }

        let mut offset = 0;
        let mut shifted_faces = Vec::with_capacity(meshes.len());
        for mesh in meshes {
            shifted_faces.push(&mesh.faces + offset);
            offset += mesh.num_vertices();
        }

        let vertex_views: Vec<_> = meshes.iter().map(|m| m.vertices.view()).collect();
        let face_views: Vec<_> = shifted_faces.iter().map(|f| f.view()).collect();

        Ok(Self {
            vertices: concatenate(Axis(0), &vertex_views)?,
            faces: concatenate(Axis(0), &face_views)?,
        })
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.nrows()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.nrows()
    }

    fn vertex(&self, index: usize) -> Vector3<f32> {
        let row = self.vertices.row(index);
        Vector3::new(row[0], row[1], row[2])
    }

    fn face_normal(&self, face: ArrayView1<usize>) -> Vector3<f32> {
        let v0 = self.vertex(face[0]);
        let v1 = self.vertex(face[1]);
        let v2 = self.vertex(face[2]);
        // degenerate faces get a zero normal
        (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Unindexed triangles with face normals, as written to STL.
    pub fn triangles(&self) -> Vec<Triangle> {
        self.faces
            .rows()
            .into_iter()
            .map(|face| {
                let normal = self.face_normal(face);
                Triangle {
                    normal: Normal::new(normal.into()),
                    vertices: [
                        Vertex::new(self.vertex(face[0]).into()),
                        Vertex::new(self.vertex(face[1]).into()),
                        Vertex::new(self.vertex(face[2]).into()),
                    ],
                }
            })
            .collect()
    }
}
