use crate::Pos;

use super::point_at_height;

/// Intersects a triangle with the horizontal plane at `height`, returning the
/// segment where they cross.
///
/// Only edges whose ends lie strictly on opposite sides of the plane produce
/// a point, so triangles that merely touch the plane at a vertex or edge, or
/// lie in it, give nothing.
pub fn plane_triangle_intersection(triangle: &[Pos; 3], height: f32) -> Option<[Pos; 2]> {
    let distances = triangle.map(|v| v.z - height);
    let signs = distances.map(sign);

    if signs[0] == signs[1] && signs[1] == signs[2] {
        return None;
    }

    let mut out = [Pos::zeros(); 2];
    let mut n = 0;

    for i in 0..3 {
        let j = (i + 1) % 3;
        // Signs rather than the raw product so tiny distances can't underflow
        // to a zero product.
        if signs[i] * signs[j] >= 0 {
            continue;
        }

        // A plane can cross at most two edges of a triangle.
        if n == 2 {
            return None;
        }

        let (d1, d2) = (distances[i], distances[j]);
        let t = d1 / (d1 - d2);
        out[n] = point_at_height(&triangle[i], &triangle[j], t, height);
        n += 1;
    }

    (n == 2).then_some(out)
}

/// Sign of a distance with zero as its own neutral value.
fn sign(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}
