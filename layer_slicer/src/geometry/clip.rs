use crate::Pos;

use super::point_at_height;

/// One side of a horizontal plane. Points on the plane are inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HalfSpace {
    /// `z >= height`
    Above(f32),
    /// `z <= height`
    Below(f32),
}

impl HalfSpace {
    pub fn height(&self) -> f32 {
        match *self {
            Self::Above(z) | Self::Below(z) => z,
        }
    }

    pub fn contains(&self, point: &Pos) -> bool {
        match *self {
            Self::Above(z) => point.z >= z,
            Self::Below(z) => point.z <= z,
        }
    }
}

/// Clips a convex polygon to a half space (one Sutherland–Hodgman pass).
///
/// The input must be convex, the result then is too. May return fewer than
/// three points, in which case nothing of the polygon is left.
pub fn clip_polygon(polygon: &[Pos], half_space: HalfSpace) -> Vec<Pos> {
    let clip_z = half_space.height();
    let mut clipped = Vec::with_capacity(polygon.len() + 1);

    for (i, current) in polygon.iter().enumerate() {
        let next = &polygon[(i + 1) % polygon.len()];
        let (current_inside, next_inside) = (half_space.contains(current), half_space.contains(next));

        if current_inside {
            clipped.push(*current);
        }

        // A flat edge can't cross the boundary.
        if current_inside != next_inside && next.z != current.z {
            let t = (clip_z - current.z) / (next.z - current.z);
            clipped.push(point_at_height(current, next, t, clip_z));
        }
    }

    clipped
}

/// Fan triangulates a convex polygon around its first point.
pub fn fan_triangulate(polygon: &[Pos], out: &mut Vec<[Pos; 3]>) {
    if polygon.len() < 3 {
        return;
    }

    out.extend(polygon[1..].windows(2).map(|x| [polygon[0], x[0], x[1]]));
}

/// Clips a triangle to the slab `z0 <= z <= z1` and triangulates what is left.
///
/// Always clips against the lower plane first: a triangle clipped to one half
/// space is still convex, which the second pass relies on.
pub fn clip_triangle(triangle: &[Pos; 3], z0: f32, z1: f32) -> Vec<[Pos; 3]> {
    let mut out = Vec::new();

    let polygon = clip_polygon(triangle, HalfSpace::Above(z0));
    if polygon.len() < 3 {
        return out;
    }

    let polygon = clip_polygon(&polygon, HalfSpace::Below(z1));
    fan_triangulate(&polygon, &mut out);
    out
}
