//! Polygon tessellation.
//!
//! Closed polygons with per-vertex corner radii are fanned into a filled
//! triangle set plus a triangle-strip edge sized to the pen width. Open
//! polylines produce only the edge strip. All coordinates are pixels.

use canvas::PolyVertex;
use geom::Vec2;

/// Arc step, radians. Roughly one segment per 15°.
const ARC_STEP: f32 = 15.0 * std::f32::consts::PI / 180.0;

/// Tessellated geometry ready for upload.
#[derive(Debug, Default)]
pub struct Tessellation {
    /// Outline positions (fill fan perimeter).
    pub fill: Vec<Vec2>,
    /// Triangle-fan indices into `fill`.
    pub fill_indices: Vec<u32>,
    /// Triangle-strip positions for the pen edge.
    pub edge: Vec<Vec2>,
}

/// Expands rounded corners into arc samples.
pub fn outline(vertices: &[PolyVertex], closed: bool) -> Vec<Vec2> {
    let n = vertices.len();
    let mut out = Vec::with_capacity(n * 2);
    for (i, v) in vertices.iter().enumerate() {
        let pos = Vec2::new(v.pos.x, v.pos.y);
        let interior = closed || (i > 0 && i + 1 < n);
        if v.radius <= 0.0 || n < 3 || !interior {
            out.push(pos);
            continue;
        }
        let prev = vertices[(i + n - 1) % n];
        let next = vertices[(i + 1) % n];
        let ray_in = (Vec2::new(prev.pos.x, prev.pos.y) - pos).normalized();
        let ray_out = (Vec2::new(next.pos.x, next.pos.y) - pos).normalized();
        let cos_phi = ray_in.dot(ray_out).clamp(-1.0, 1.0);
        let phi = cos_phi.acos();
        if phi < 1e-3 || (std::f32::consts::PI - phi) < 1e-3 {
            // Degenerate corner; keep it sharp.
            out.push(pos);
            continue;
        }
        let half = phi / 2.0;
        // Clamp the radius so tangent points stay on the adjacent edges.
        let edge_in = (Vec2::new(prev.pos.x, prev.pos.y) - pos).length();
        let edge_out = (Vec2::new(next.pos.x, next.pos.y) - pos).length();
        let max_t = (edge_in.min(edge_out)) / 2.0;
        let mut r = v.radius;
        let mut t = r / half.tan();
        if t > max_t {
            t = max_t;
            r = t * half.tan();
        }
        let bisector = (ray_in + ray_out).normalized();
        let center = pos + bisector * (r / half.sin());
        let t1 = pos + ray_in * t;
        let t2 = pos + ray_out * t;
        let a1 = (t1 - center).y.atan2((t1 - center).x);
        let a2 = (t2 - center).y.atan2((t2 - center).x);
        let mut sweep = a2 - a1;
        // Take the short way around.
        while sweep > std::f32::consts::PI {
            sweep -= 2.0 * std::f32::consts::PI;
        }
        while sweep < -std::f32::consts::PI {
            sweep += 2.0 * std::f32::consts::PI;
        }
        let steps = (sweep.abs() / ARC_STEP).ceil().max(1.0) as usize;
        for s in 0..=steps {
            let a = a1 + sweep * (s as f32 / steps as f32);
            out.push(center + Vec2::new(a.cos(), a.sin()) * r);
        }
    }
    out
}

/// Fans a convex outline into triangles.
fn fan_indices(count: usize) -> Vec<u32> {
    if count < 3 {
        return Vec::new();
    }
    let mut indices = Vec::with_capacity((count - 2) * 3);
    for i in 1..count as u32 - 1 {
        indices.extend_from_slice(&[0, i, i + 1]);
    }
    indices
}

/// Builds the pen-width edge strip around an outline.
fn edge_strip(points: &[Vec2], closed: bool, width: f32) -> Vec<Vec2> {
    let n = points.len();
    if n < 2 || width <= 0.0 {
        return Vec::new();
    }
    let half = width / 2.0;
    let normal_of = |a: Vec2, b: Vec2| (b - a).normalized().perp();
    let mut strip = Vec::with_capacity((n + 1) * 2);
    for i in 0..n {
        let n_prev = if i > 0 {
            Some(normal_of(points[i - 1], points[i]))
        } else if closed {
            Some(normal_of(points[n - 1], points[0]))
        } else {
            None
        };
        let n_next = if i + 1 < n {
            Some(normal_of(points[i], points[i + 1]))
        } else if closed {
            Some(normal_of(points[n - 1], points[0]))
        } else {
            None
        };
        let normal = match (n_prev, n_next) {
            (Some(a), Some(b)) => (a + b).normalized(),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => Vec2::ZERO,
        };
        strip.push(points[i] + normal * half);
        strip.push(points[i] - normal * half);
    }
    if closed {
        strip.push(strip[0]);
        strip.push(strip[1]);
    }
    strip
}

/// Tessellates a polygon or polyline. `pen_width` of zero skips the edge;
/// `want_fill` of false (open polylines) skips the fan.
pub fn tessellate(
    vertices: &[PolyVertex],
    closed: bool,
    pen_width: f32,
    want_fill: bool,
) -> Tessellation {
    let points = outline(vertices, closed);
    let fill_indices = if want_fill && closed {
        fan_indices(points.len())
    } else {
        Vec::new()
    };
    let edge = edge_strip(&points, closed, pen_width);
    Tessellation {
        fill: points,
        fill_indices,
        edge,
    }
}

/// Flattens positions for buffer upload.
pub fn positions_as_bytes(points: &[Vec2]) -> Vec<u8> {
    let mut out = Vec::with_capacity(points.len() * 8);
    for p in points {
        out.extend_from_slice(&p.x.to_le_bytes());
        out.extend_from_slice(&p.y.to_le_bytes());
    }
    out
}
