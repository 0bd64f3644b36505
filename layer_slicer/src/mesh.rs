use std::sync::Arc;

use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SliceError},
    Pos,
};

/// A mesh made of vertex positions and an optional triangle index list,
/// placed in the world by a position, scale and rotation. When no indices
/// are given the vertices are read as consecutive triples.
#[derive(Debug, Clone)]
pub struct Mesh {
    inner: Arc<MeshInner>,

    transformation_matrix: Matrix4<f32>,

    position: Pos,
    scale: Pos,
    rotation: Pos,
}

#[derive(Debug)]
struct MeshInner {
    vertices: Box<[Pos]>,
    indices: Option<Box<[u32]>>,
}

/// A mesh with its transform baked in and its triangles resolved. Built once
/// per slicing run, every layer scans it.
#[derive(Debug, Clone)]
pub struct WorldGeometry {
    vertices: Vec<Pos>,
    triangles: Vec<[u32; 3]>,
}

/// Serialized form of a mesh: flat stride-3 buffers plus an optional
/// placement. Rotation is in radians.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub positions: Option<Vec<f32>>,
    #[serde(default)]
    pub indices: Option<Vec<u32>>,

    #[serde(default)]
    pub position: Option<[f32; 3]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub rotation: Option<[f32; 3]>,
}

impl Mesh {
    /// Creates a mesh with an identity transform.
    pub fn new(vertices: Vec<Pos>, indices: Option<Vec<u32>>) -> Self {
        Self {
            inner: Arc::new(MeshInner {
                vertices: vertices.into_boxed_slice(),
                indices: indices.map(Vec::into_boxed_slice),
            }),
            ..Default::default()
        }
    }

    /// Creates a mesh from raw position and index buffers, checking that both
    /// have a stride of three.
    pub fn from_buffers(positions: &[f32], indices: Option<&[u32]>) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(SliceError::geometry(format!(
                "position buffer length {} is not a multiple of 3",
                positions.len()
            )));
        }

        if let Some(indices) = indices {
            if indices.len() % 3 != 0 {
                return Err(SliceError::geometry(format!(
                    "index buffer length {} is not a multiple of 3",
                    indices.len()
                )));
            }
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|x| Pos::new(x[0], x[1], x[2]))
            .collect();
        Ok(Self::new(vertices, indices.map(<[u32]>::to_vec)))
    }

    /// Axis aligned box between `min` and `max` with outward facing
    /// triangles.
    pub fn cube(min: Pos, max: Pos) -> Self {
        let vertices = vec![
            Pos::new(min.x, min.y, min.z),
            Pos::new(max.x, min.y, min.z),
            Pos::new(max.x, max.y, min.z),
            Pos::new(min.x, max.y, min.z),
            Pos::new(min.x, min.y, max.z),
            Pos::new(max.x, min.y, max.z),
            Pos::new(max.x, max.y, max.z),
            Pos::new(min.x, max.y, max.z),
        ];

        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1,  0, 3, 2, // bottom
            4, 5, 6,  4, 6, 7, // top
            0, 1, 5,  0, 5, 4, // front
            3, 7, 6,  3, 6, 2, // back
            0, 4, 7,  0, 7, 3, // left
            1, 2, 6,  1, 6, 5, // right
        ];

        Self::new(vertices, Some(indices))
    }

    /// Flattens several meshes, each under its own transform, into a single
    /// mesh with an identity transform. Every mesh is checked on its own
    /// first, so a bad index can't reach into a neighbouring mesh.
    pub fn merge(meshes: &[Mesh]) -> Result<Self> {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for mesh in meshes {
            let triangles = mesh.resolve_triangles()?;
            let offset = vertices.len() as u32;
            vertices.extend(mesh.vertices().iter().map(|v| mesh.transform(v)));
            indices.extend(triangles.into_iter().flatten().map(|i| i + offset));
        }

        Ok(Self::new(vertices, Some(indices)))
    }

    pub fn vertices(&self) -> &[Pos] {
        self.inner.vertices.as_ref()
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.inner.indices.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().len()
    }

    pub fn triangle_count(&self) -> usize {
        match self.indices() {
            Some(indices) => indices.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    /// Bakes the transform into the vertices and resolves every triangle,
    /// failing if the mesh can't be sliced.
    pub fn world_geometry(&self) -> Result<WorldGeometry> {
        let triangles = self.resolve_triangles()?;
        let vertices = self
            .vertices()
            .iter()
            .map(|v| self.transform(v))
            .collect::<Vec<_>>();

        if vertices.iter().any(|v| !v.iter().all(|x| x.is_finite())) {
            return Err(SliceError::geometry("vertex positions must be finite"));
        }

        Ok(WorldGeometry {
            vertices,
            triangles,
        })
    }

    /// Checks the index buffer (or the vertex stride when there is none)
    /// against this mesh's own vertices.
    fn resolve_triangles(&self) -> Result<Vec<[u32; 3]>> {
        let vertices = self.vertices();
        if vertices.is_empty() {
            return Err(SliceError::invalid_parameter("mesh has no vertices"));
        }

        match self.indices() {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(SliceError::geometry(format!(
                        "index count {} is not a multiple of 3",
                        indices.len()
                    )));
                }

                if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
                    return Err(SliceError::geometry(format!(
                        "index {bad} is out of range for {} vertices",
                        vertices.len()
                    )));
                }

                Ok(indices
                    .chunks_exact(3)
                    .map(|x| [x[0], x[1], x[2]])
                    .collect())
            }
            None => {
                if vertices.len() % 3 != 0 {
                    return Err(SliceError::geometry(format!(
                        "vertex count {} is not a multiple of 3 and no indices were given",
                        vertices.len()
                    )));
                }

                Ok((0..vertices.len() as u32)
                    .step_by(3)
                    .map(|i| [i, i + 1, i + 2])
                    .collect())
            }
        }
    }

    /// Updates the transformation matrix from the position, scale and
    /// rotation. Called by the setters.
    pub fn update_transformation_matrix(&mut self) {
        let scale = Matrix4::new_nonuniform_scaling(&self.scale);
        let rotation =
            Matrix4::from_euler_angles(self.rotation.x, self.rotation.y, self.rotation.z);
        let translation = Matrix4::new_translation(&self.position);

        self.transformation_matrix = translation * scale * rotation;
    }

    /// Transforms a point according to the models translation, scale, and rotation.
    pub fn transform(&self, pos: &Pos) -> Pos {
        (self.transformation_matrix * pos.push(1.0)).xyz()
    }

    /// World space bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Pos, Pos) {
        vertex_bounds(self.vertices().iter().map(|v| self.transform(v)))
    }

    pub fn set_position(&mut self, pos: Pos) {
        self.position = pos;
        self.update_transformation_matrix();
    }

    pub fn position(&self) -> Pos {
        self.position
    }

    pub fn set_scale(&mut self, scale: Pos) {
        self.scale = scale;
        self.update_transformation_matrix();
    }

    pub fn scale(&self) -> Pos {
        self.scale
    }

    /// Changes the rotation of the model, using [Euler
    /// angles](https://en.wikipedia.org/wiki/Euler_angles) in radians.
    pub fn set_rotation(&mut self, rotation: Pos) {
        self.rotation = rotation;
        self.update_transformation_matrix();
    }

    pub fn rotation(&self) -> Pos {
        self.rotation
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            inner: Arc::new(MeshInner {
                vertices: Box::new([]),
                indices: None,
            }),

            transformation_matrix: Matrix4::identity(),

            position: Pos::repeat(0.0),
            scale: Pos::repeat(1.0),
            rotation: Pos::repeat(0.0),
        }
    }
}

impl WorldGeometry {
    pub fn vertices(&self) -> &[Pos] {
        &self.vertices
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Corner positions of the triangle at `index`.
    pub fn triangle(&self, index: usize) -> [Pos; 3] {
        self.triangles[index].map(|i| self.vertices[i as usize])
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Pos; 3]> + '_ {
        (0..self.triangles.len()).map(|i| self.triangle(i))
    }
}

impl MeshData {
    pub fn into_mesh(self) -> Result<Mesh> {
        let positions = self
            .positions
            .ok_or_else(|| SliceError::geometry("missing position buffer"))?;
        let mut mesh = Mesh::from_buffers(&positions, self.indices.as_deref())?;

        if let Some(scale) = self.scale {
            mesh.set_scale(Vector3::from(scale));
        }
        if let Some(rotation) = self.rotation {
            mesh.set_rotation(Vector3::from(rotation));
        }
        if let Some(position) = self.position {
            mesh.set_position(Vector3::from(position));
        }

        Ok(mesh)
    }
}

impl From<&Mesh> for MeshData {
    fn from(mesh: &Mesh) -> Self {
        Self {
            positions: Some(mesh.vertices().iter().flat_map(|v| [v.x, v.y, v.z]).collect()),
            indices: mesh.indices().map(<[u32]>::to_vec),
            position: Some(mesh.position().into()),
            scale: Some(mesh.scale().into()),
            rotation: Some(mesh.rotation().into()),
        }
    }
}

/// Component wise minimum and maximum of a set of points.
pub(crate) fn vertex_bounds(vertices: impl Iterator<Item = Pos>) -> (Pos, Pos) {
    vertices.fold(
        (Pos::repeat(f32::MAX), Pos::repeat(f32::MIN)),
        |(min, max), v| (min.inf(&v), max.sup(&v)),
    )
}
