use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use nalgebra::Vector2;
use svg::{
    node::element::{Group, Polygon, Polyline, Rectangle},
    Document,
};

use crate::{
    slice::{Slice, SliceSet},
    Pos,
};

const STROKE_WIDTH: f32 = 0.01;
const VOLUME_OPACITY: f32 = 0.85;

/// Every layer of a [`SliceSet`] drawn from above, tiled left to right, top
/// to bottom.
pub struct SvgFile {
    document: Document,
}

impl SvgFile {
    pub fn new(slices: &SliceSet) -> Self {
        let (min, max) = slices.mesh().bounds();
        let (min, size) = if slices.mesh().vertex_count() == 0 {
            (Vector2::zeros(), Vector2::repeat(1.0))
        } else {
            (min.xy(), (max - min).xy().map(|x| x.max(f32::EPSILON)))
        };

        let sides = (slices.len() as f32).sqrt().ceil().max(1.0) as usize;
        let rows = slices.len().div_ceil(sides).max(1);
        let (width, height) = (size.x * sides as f32, size.y * rows as f32);

        let mut document = Document::new()
            .set("viewBox", (0, 0, width, height))
            .set("width", format!("{width}mm"))
            .set("height", format!("{height}mm"));

        for (idx, slice) in slices.iter().enumerate() {
            let offset = Vector2::new((idx % sides) as f32 * size.x, (idx / sides) as f32 * size.y);
            // Flip y so the tile reads like a view from above.
            let project = |p: &Pos| {
                let local = p.xy() - min;
                (offset.x + local.x, offset.y + size.y - local.y)
            };

            let tile = Rectangle::new()
                .set("x", offset.x)
                .set("y", offset.y)
                .set("width", size.x)
                .set("height", size.y)
                .set("fill", "none")
                .set("stroke", "gray")
                .set("stroke-width", STROKE_WIDTH);

            document = document.add(tile).add(layer_group(slice, project));
        }

        Self { document }
    }

    pub fn write(&self, writer: impl Write) -> Result<()> {
        svg::write(writer, &self.document)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        svg::save(path, &self.document).with_context(|| format!("writing `{}`", path.display()))
    }
}

fn layer_group(slice: &Slice, project: impl Fn(&Pos) -> (f32, f32)) -> Group {
    let color = slice.color.css();
    let mut group = Group::new().set("id", format!("layer-{}", slice.layer));

    for triangle in slice.triangles() {
        let points = triangle.iter().map(&project).collect::<Vec<_>>();
        group = group.add(
            Polygon::new()
                .set("points", points)
                .set("fill", color.as_str())
                .set("fill-opacity", VOLUME_OPACITY),
        );
    }

    for contour in slice.contour_loops() {
        let points = contour.points.iter().map(&project).collect::<Vec<_>>();
        group = if contour.closed {
            group.add(
                Polygon::new()
                    .set("points", points)
                    .set("fill", "none")
                    .set("stroke", color.as_str())
                    .set("stroke-width", STROKE_WIDTH),
            )
        } else {
            group.add(
                Polyline::new()
                    .set("points", points)
                    .set("fill", "none")
                    .set("stroke", color.as_str())
                    .set("stroke-width", STROKE_WIDTH),
            )
        };
    }

    group
}
