use common::{
    color::{palette_color, Color},
    config::SliceMode,
};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

use crate::{
    geometry::{clip_triangle, plane_triangle_intersection},
    mesh::WorldGeometry,
    slice::{Slice, SliceGeometry},
};

/// Triangles handed to each rayon job. Keeps small meshes from paying for a
/// split per triangle.
const MIN_CHUNK: usize = 256;

/// Slices one layer, scanning every triangle of the mesh.
///
/// Triangles are processed in parallel but collected in mesh order, so the
/// output is the same as a sequential scan.
pub(crate) fn slice_layer(
    geometry: &WorldGeometry,
    mode: SliceMode,
    layer: u32,
    (z0, z1): (f32, f32),
    palette: &[Color],
) -> Slice {
    let triangles = (0..geometry.triangle_count())
        .into_par_iter()
        .with_min_len(MIN_CHUNK);

    let geometry = match mode {
        SliceMode::Contour => SliceGeometry::Contour {
            segments: triangles
                .filter_map(|i| plane_triangle_intersection(&geometry.triangle(i), z0))
                .collect(),
        },
        SliceMode::Volumetric => SliceGeometry::volume(
            triangles
                .flat_map_iter(|i| clip_triangle(&geometry.triangle(i), z0, z1))
                .collect(),
        ),
    };

    Slice {
        layer,
        z0,
        z1,
        color: palette_color(palette, layer as usize),
        geometry,
    }
}
