//! Geometric primitives and intersection algorithms
//!
//! Stateless point, segment and triangle routines shared by the narrow phase:
//! closest points, triangle/box SAT, ray/triangle intersection and the
//! distance helpers used when diagnosing contacts.

use crate::foundation::math::Vec3;

/// Tolerance used to reject near-parallel rays and degenerate segments
pub const GEOMETRY_EPSILON: f32 = 1e-6;

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unnormalized normal (right-hand rule), twice the triangle area in length
    pub fn scaled_normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, or `None` for a degenerate triangle
    pub fn normal(&self) -> Option<Vec3> {
        self.scaled_normal().try_normalize(GEOMETRY_EPSILON)
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Get the closest point on the triangle to a given point
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        closest_point_on_triangle(point, self.v0, self.v1, self.v2)
    }

    /// Möller-Trumbore intersection, returns `(t, u, v)`
    pub fn intersect_ray(&self, origin: Vec3, direction: Vec3) -> Option<(f32, f32, f32)> {
        ray_triangle_intersect(origin, direction, self.v0, self.v1, self.v2)
    }
}

/// Closest point on triangle `abc` to `p` (Ericson, Real-Time Collision Detection 5.1.5)
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    // Vertex region outside A
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    // Vertex region outside B
    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    // Vertex region outside C
    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    // Face region
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Triangle vs axis-aligned box overlap (Akenine-Möller SAT)
///
/// `verts` are in box-local space with the box centered at the origin.
/// Tests the nine edge/axis cross products, the three box face normals and
/// the triangle plane; overlap is reported only when none of them separates.
pub fn tri_box_overlap(verts: &[Vec3; 3], half_size: Vec3) -> bool {
    let edges = [verts[1] - verts[0], verts[2] - verts[1], verts[0] - verts[2]];
    let box_axes = [Vec3::x(), Vec3::y(), Vec3::z()];

    for edge in &edges {
        for axis in &box_axes {
            if separated_on_axis(&edge.cross(axis), verts, half_size) {
                return false;
            }
        }
    }

    for i in 0..3 {
        let min = verts[0][i].min(verts[1][i]).min(verts[2][i]);
        let max = verts[0][i].max(verts[1][i]).max(verts[2][i]);
        if min > half_size[i] || max < -half_size[i] {
            return false;
        }
    }

    let normal = edges[0].cross(&edges[1]);
    let d = -normal.dot(&verts[0]);
    let r = half_size.dot(&normal.abs());
    !(-r > d || d > r)
}

fn separated_on_axis(axis: &Vec3, verts: &[Vec3; 3], half_size: Vec3) -> bool {
    let p0 = axis.dot(&verts[0]);
    let p1 = axis.dot(&verts[1]);
    let p2 = axis.dot(&verts[2]);
    let min = p0.min(p1).min(p2);
    let max = p0.max(p1).max(p2);
    let rad = half_size.dot(&axis.abs());
    min > rad || max < -rad
}

/// Möller-Trumbore ray-triangle intersection
///
/// Returns `(t, u, v)` for hits strictly in front of the origin. Rays within
/// [`GEOMETRY_EPSILON`] of parallel to the triangle plane are rejected.
/// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
pub fn ray_triangle_intersect(
    origin: Vec3,
    direction: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Ray parallel to triangle?
    if a.abs() < GEOMETRY_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(&h);

    // Hit outside triangle on u axis?
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);

    // Hit outside triangle on v axis?
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    if t > GEOMETRY_EPSILON {
        Some((t, u, v))
    } else {
        None
    }
}

/// Distance from `p` to segment `ab`
pub fn distance_point_segment(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let ab2 = ab.dot(&ab);
    if ab2 < f32::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / ab2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Distance from `p` to triangle `abc`
///
/// Perpendicular plane distance when `p` projects inside the triangle,
/// otherwise the nearest edge distance.
pub fn distance_point_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let edge_distance = || {
        distance_point_segment(p, a, b)
            .min(distance_point_segment(p, a, c))
            .min(distance_point_segment(p, b, c))
    };

    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d00 = ab.dot(&ab);
    let d01 = ab.dot(&ac);
    let d11 = ac.dot(&ac);
    let d20 = ap.dot(&ab);
    let d21 = ap.dot(&ac);
    let denom = d00 * d11 - d01 * d01;

    if denom.abs() < f32::EPSILON {
        return edge_distance();
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;

    if v >= 0.0 && w >= 0.0 && v + w <= 1.0 {
        match ab.cross(&ac).try_normalize(GEOMETRY_EPSILON) {
            Some(normal) => ap.dot(&normal).abs(),
            None => edge_distance(),
        }
    } else {
        edge_distance()
    }
}

/// Distance between segments `p0p1` and `q0q1` (Sunday's clamped parametric form)
pub fn distance_segment_segment(p0: Vec3, p1: Vec3, q0: Vec3, q1: Vec3) -> f32 {
    let u = p1 - p0;
    let v = q1 - q0;
    let w = p0 - q0;
    let a = u.dot(&u);
    let b = u.dot(&v);
    let c = v.dot(&v);
    let d = u.dot(&w);
    let e = v.dot(&w);
    let denom = a * c - b * b;

    let (mut s_n, mut s_d) = (0.0, denom);
    let (mut t_n, mut t_d) = (0.0, denom);

    if denom < GEOMETRY_EPSILON {
        // Nearly parallel: pin s to the start of the first segment
        s_d = 1.0;
        t_n = e;
        t_d = c;
    } else {
        s_n = b * e - c * d;
        t_n = a * e - b * d;
        if s_n < 0.0 {
            s_n = 0.0;
            t_n = e;
            t_d = c;
        } else if s_n > s_d {
            s_n = s_d;
            t_n = e + b;
            t_d = c;
        }
    }

    if t_n < 0.0 {
        t_n = 0.0;
        if -d < 0.0 {
            s_n = 0.0;
        } else if -d > a {
            s_n = s_d;
        } else {
            s_n = -d;
            s_d = a;
        }
    } else if t_n > t_d {
        t_n = t_d;
        if (-d + b) < 0.0 {
            s_n = 0.0;
        } else if (-d + b) > a {
            s_n = s_d;
        } else {
            s_n = -d + b;
            s_d = a;
        }
    }

    let sc = if s_n.abs() < GEOMETRY_EPSILON { 0.0 } else { s_n / s_d };
    let tc = if t_n.abs() < GEOMETRY_EPSILON { 0.0 } else { t_n / t_d };

    (w + u * sc - v * tc).norm()
}

/// Minimum distance between segment `seg_a seg_b` and triangle `abc`
///
/// Zero when the segment pierces the triangle.
pub fn distance_segment_triangle(seg_a: Vec3, seg_b: Vec3, a: Vec3, b: Vec3, c: Vec3) -> f32 {
    if segment_triangle_intersection(seg_a, seg_b, a, b, c).is_some() {
        return 0.0;
    }

    [
        distance_point_triangle(seg_a, a, b, c),
        distance_point_triangle(seg_b, a, b, c),
        distance_point_segment(a, seg_a, seg_b),
        distance_point_segment(b, seg_a, seg_b),
        distance_point_segment(c, seg_a, seg_b),
        distance_segment_segment(seg_a, seg_b, a, b),
        distance_segment_segment(seg_a, seg_b, b, c),
        distance_segment_segment(seg_a, seg_b, c, a),
    ]
    .into_iter()
    .fold(f32::MAX, f32::min)
}

/// Barycentric containment test for a point assumed to lie in the triangle plane
pub fn point_in_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> bool {
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;

    let dot00 = v0.dot(&v0);
    let dot01 = v0.dot(&v1);
    let dot02 = v0.dot(&v2);
    let dot11 = v1.dot(&v1);
    let dot12 = v1.dot(&v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < f32::EPSILON {
        return false;
    }

    let inv_denom = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;

    u >= 0.0 && v >= 0.0 && u + v <= 1.0
}

/// Point where segment `pq` crosses triangle `abc`, if it does
pub fn segment_triangle_intersection(p: Vec3, q: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let normal = (b - a).cross(&(c - a)).try_normalize(GEOMETRY_EPSILON)?;
    let dp = (p - a).dot(&normal);
    let dq = (q - a).dot(&normal);

    // Both endpoints on the same side, or the segment lies in the plane
    if dp * dq > 0.0 || (dp - dq).abs() < f32::EPSILON {
        return None;
    }

    let t = dp / (dp - dq);
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let point = p + (q - p) * t;
    point_in_triangle(point, a, b, c).then_some(point)
}

/// Distance from a triangle's plane below which a point counts as on it
const PLANE_TOLERANCE: f32 = 1e-4;

/// True if `p` lies on the plane of `tri` and inside its edges
fn lies_in_triangle(p: Vec3, tri: &Triangle) -> bool {
    let on_plane = tri
        .normal()
        .is_some_and(|n| (p - tri.v0).dot(&n).abs() <= PLANE_TOLERANCE);
    on_plane && point_in_triangle(p, tri.v0, tri.v1, tri.v2)
}

/// Representative contact point between two overlapping triangles
///
/// Averages every edge endpoint lying inside the other triangle and every
/// edge/triangle crossing, in both directions. Endpoints off the other
/// triangle's plane never count. Falls back to the midpoint of the two
/// centroids when no such point exists.
pub fn triangle_contact_point(a: &Triangle, b: &Triangle) -> Vec3 {
    let mut sum = Vec3::zeros();
    let mut count = 0usize;

    let mut collect = |from: &Triangle, against: &Triangle| {
        let edges = [(from.v0, from.v1), (from.v1, from.v2), (from.v2, from.v0)];
        for (p, q) in edges {
            if lies_in_triangle(p, against) {
                sum += p;
                count += 1;
            }
            if lies_in_triangle(q, against) {
                sum += q;
                count += 1;
            }
            if let Some(point) = segment_triangle_intersection(p, q, against.v0, against.v1, against.v2) {
                sum += point;
                count += 1;
            }
        }
    };

    collect(a, b);
    collect(b, a);

    if count == 0 {
        (a.centroid() + b.centroid()) * 0.5
    } else {
        sum / count as f32
    }
}

/// Penetration depth estimate between two overlapping triangles
///
/// For each triangle, the shallowest vertex of the other triangle lying behind
/// its plane gives a candidate; the smaller candidate wins. Zero when neither
/// triangle has vertices behind the other.
pub fn triangle_penetration_depth(a: &Triangle, b: &Triangle) -> f32 {
    fn depth_behind(plane: &Triangle, other: &Triangle) -> f32 {
        let Some(normal) = plane.normal() else {
            return f32::MAX;
        };
        let offset = plane.v0.dot(&normal);
        [other.v0, other.v1, other.v2]
            .into_iter()
            .map(|v| v.dot(&normal) - offset)
            .filter(|d| *d < 0.0)
            .map(|d| -d)
            .fold(f32::MAX, f32::min)
    }

    let depth = depth_behind(a, b).min(depth_behind(b, a));
    if depth == f32::MAX {
        0.0
    } else {
        depth
    }
}
