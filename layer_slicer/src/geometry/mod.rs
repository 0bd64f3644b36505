//! Per-triangle geometry kernels used for each layer.

use crate::Pos;

mod clip;
mod plane;

pub use self::{
    clip::{clip_polygon, clip_triangle, fan_triangulate, HalfSpace},
    plane::plane_triangle_intersection,
};

/// Point `t` of the way from `a` to `b`, with its height forced to exactly
/// `z` so points on a cutting plane don't drift off it.
#[inline]
fn point_at_height(a: &Pos, b: &Pos, t: f32, z: f32) -> Pos {
    let mut point = a + (b - a) * t;
    point.z = z;
    point
}
