use std::sync::Arc;

use common::{color::Color, config::SliceMode};
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::{bounds::ZBounds, mesh::Mesh, Pos};

/// Endpoints closer than this are treated as the same point when joining
/// contour segments.
pub const JOIN_TOLERANCE: f32 = 1e-4;

/// Geometry produced for a single layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceGeometry {
    /// Outline segments on the layer's bottom plane.
    Contour { segments: Vec<[Pos; 2]> },
    /// Unindexed triangles inside the layer's slab, with one normal per
    /// vertex.
    Volume { vertices: Vec<Pos>, normals: Vec<Pos> },
}

/// One layer of a [`SliceSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub layer: u32,
    /// Bottom of the layer. Contour segments lie on this plane.
    pub z0: f32,
    pub z1: f32,
    pub color: Color,
    pub geometry: SliceGeometry,
}

/// A chain of joined contour segments.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLoop {
    pub points: Vec<Pos>,
    /// If the last point connects back to the first.
    pub closed: bool,
}

/// Every layer produced by one slicing run, in layer order, along with what
/// it was sliced from.
#[derive(Debug, Clone, Default)]
pub struct SliceSet {
    mesh: Mesh,
    layer_height: f32,
    mode: SliceMode,
    bounds: Option<ZBounds>,

    slices: Vec<Arc<Slice>>,
}

impl SliceGeometry {
    /// Flattens triangles into a vertex list, giving each vertex the normal of
    /// its face. Degenerate faces get a zero normal.
    pub fn volume(triangles: Vec<[Pos; 3]>) -> Self {
        let mut vertices = Vec::with_capacity(triangles.len() * 3);
        let mut normals = Vec::with_capacity(triangles.len() * 3);

        for [a, b, c] in triangles {
            let normal = (b - a)
                .cross(&(c - a))
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Pos::zeros);
            vertices.extend([a, b, c]);
            normals.extend([normal; 3]);
        }

        Self::Volume { vertices, normals }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Contour { segments } => segments.is_empty(),
            Self::Volume { vertices, .. } => vertices.is_empty(),
        }
    }
}

impl Slice {
    pub fn mode(&self) -> SliceMode {
        match self.geometry {
            SliceGeometry::Contour { .. } => SliceMode::Contour,
            SliceGeometry::Volume { .. } => SliceMode::Volumetric,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    pub fn segments(&self) -> &[[Pos; 2]] {
        match &self.geometry {
            SliceGeometry::Contour { segments } => segments,
            SliceGeometry::Volume { .. } => &[],
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments().len()
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Pos; 3]> + '_ {
        let vertices = match &self.geometry {
            SliceGeometry::Volume { vertices, .. } => vertices.as_slice(),
            SliceGeometry::Contour { .. } => &[],
        };

        vertices.chunks_exact(3).map(|x| [x[0], x[1], x[2]])
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles().count()
    }

    /// Surface area of the layer's triangles. Zero for contours.
    pub fn area(&self) -> f32 {
        self.triangles()
            .map(|[a, b, c]| (b - a).cross(&(c - a)).magnitude() / 2.0)
            .sum()
    }

    /// Joins the contour segments into polylines.
    pub fn contour_loops(&self) -> Vec<ContourLoop> {
        join_segments(self.segments(), JOIN_TOLERANCE)
    }
}

impl ContourLoop {
    /// Drops points that lie on the straight line between their neighbors.
    pub fn simplify(&mut self, tolerance: f32) {
        let mut i = 0;
        while self.points.len() > 2 && i < self.points.len() {
            let len = self.points.len();
            if !self.closed && (i == 0 || i == len - 1) {
                i += 1;
                continue;
            }

            let prev = self.points[(i + len - 1) % len];
            let next = self.points[(i + 1) % len];
            let point = self.points[i];

            if (point - prev).cross(&(next - point)).magnitude() <= tolerance {
                self.points.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

impl SliceSet {
    pub(crate) fn new(mesh: Mesh, layer_height: f32, mode: SliceMode, bounds: ZBounds) -> Self {
        Self {
            mesh,
            layer_height,
            mode,
            bounds: Some(bounds),
            slices: Vec::new(),
        }
    }

    /// Adds the next layer. Layers must arrive in order.
    pub(crate) fn push(&mut self, slice: Slice) {
        debug_assert_eq!(slice.layer as usize, self.slices.len());
        self.slices.push(Arc::new(slice));
    }

    /// Drops every layer's geometry.
    pub fn clear(&mut self) {
        if self.slices.is_empty() {
            return;
        }

        debug!(
            "Releasing {} slices ({} vertices)",
            self.slices.len(),
            self.vertex_count()
        );
        self.slices = Vec::new();
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn layer_height(&self) -> f32 {
        self.layer_height
    }

    pub fn mode(&self) -> SliceMode {
        self.mode
    }

    pub fn bounds(&self) -> Option<ZBounds> {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn get(&self, layer: usize) -> Option<&Slice> {
        self.slices.get(layer).map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slice> + '_ {
        self.slices.iter().map(Arc::as_ref)
    }

    /// Total stored points, two per segment or three per triangle.
    pub fn vertex_count(&self) -> usize {
        self.iter()
            .map(|slice| match &slice.geometry {
                SliceGeometry::Contour { segments } => segments.len() * 2,
                SliceGeometry::Volume { vertices, .. } => vertices.len(),
            })
            .sum()
    }
}

/// Greedily chains segments by their nearest endpoints. It's quadratic in the
/// number of segments, which is fine for a layer's worth.
pub fn join_segments(segments: &[[Pos; 2]], tolerance: f32) -> Vec<ContourLoop> {
    let mut remaining = segments.to_vec();
    let mut loops = Vec::new();

    while let Some([start, end]) = remaining.pop() {
        let mut points = vec![start, end];
        extend_chain(&mut points, &mut remaining, tolerance);

        let closed = points.len() > 2 && (points[0] - points[points.len() - 1]).magnitude() <= tolerance;
        if closed {
            points.pop();
        } else {
            // Grow the other end too, the first segment may have been in the
            // middle of an open chain.
            points.reverse();
            extend_chain(&mut points, &mut remaining, tolerance);
        }

        loops.push(ContourLoop { points, closed });
    }

    loops
}

fn extend_chain(points: &mut Vec<Pos>, remaining: &mut Vec<[Pos; 2]>, tolerance: f32) {
    let start = points[0];
    loop {
        let last = points[points.len() - 1];
        if points.len() > 2 && (last - start).magnitude() <= tolerance {
            return;
        }

        let nearest = remaining
            .iter()
            .enumerate()
            .map(|(idx, [a, b])| (idx, (last - a).magnitude(), (last - b).magnitude()))
            .min_by_key(|(_, a, b)| OrderedFloat(a.min(*b)));

        let Some((idx, a_dist, b_dist)) = nearest else {
            return;
        };
        if a_dist.min(b_dist) > tolerance {
            return;
        }

        let [a, b] = remaining.swap_remove(idx);
        points.push(if a_dist <= b_dist { b } else { a });
    }
}
