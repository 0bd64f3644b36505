//! Planar slicing of triangle meshes into per-layer preview geometry.
//!
//! A [`slicer::Slicer`] turns a [`mesh::Mesh`] and a layer height into a
//! [`slice::SliceSet`], one layer per poll of the returned
//! [`slicer::SliceTask`]. Layers are either outline segments on a plane
//! ([`SliceMode::Contour`]) or the mesh triangles clipped to the layer's
//! slab ([`SliceMode::Volumetric`]).

use nalgebra::Vector3;

pub mod bounds;
pub mod error;
pub mod format;
pub mod geometry;
pub mod job;
pub mod mesh;
pub mod slice;
pub mod slicer;
pub mod task;

pub use common::config::SliceMode;

pub type Pos = Vector3<f32>;
