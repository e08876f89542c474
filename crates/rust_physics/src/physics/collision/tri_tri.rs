//! Triangle-triangle overlap test
//!
//! Guigue & Devillers, "Fast and Robust Triangle-Triangle Overlap Test Using
//! Orientation Predicates" (Journal of Graphics Tools, 2003). Each triangle is
//! first tested against the other's plane; straddling configurations are
//! permuted into a canonical vertex order and resolved with two orientation
//! checks, coplanar ones are projected to 2D.

use crate::foundation::math::{Vec2, Vec3};

use super::geometry::Triangle;

/// True if triangles `a` and `b` share at least one point
pub fn triangles_overlap(a: &Triangle, b: &Triangle) -> bool {
    tri_tri_overlap_3d(a.v0, a.v1, a.v2, b.v0, b.v1, b.v2)
}

/// Three-dimensional overlap test on raw vertices
pub fn tri_tri_overlap_3d(p1: Vec3, q1: Vec3, r1: Vec3, p2: Vec3, q2: Vec3, r2: Vec3) -> bool {
    // Signed distances of triangle 1 to the plane of triangle 2
    let n2 = (p2 - r2).cross(&(q2 - r2));
    let dp1 = (p1 - r2).dot(&n2);
    let dq1 = (q1 - r2).dot(&n2);
    let dr1 = (r1 - r2).dot(&n2);

    if dp1 * dq1 > 0.0 && dp1 * dr1 > 0.0 {
        return false;
    }

    // Signed distances of triangle 2 to the plane of triangle 1
    let n1 = (q1 - p1).cross(&(r1 - p1));
    let dp2 = (p2 - r1).dot(&n1);
    let dq2 = (q2 - r1).dot(&n1);
    let dr2 = (r2 - r1).dot(&n1);

    if dp2 * dq2 > 0.0 && dp2 * dr2 > 0.0 {
        return false;
    }

    let canonical = |t1: [Vec3; 3], t2: [Vec3; 3], d: [f32; 3]| {
        permute_second(t1, t2, d, n1)
    };

    // Bring triangle 1 into canonical form (p1 alone on its side of plane 2)
    if dp1 > 0.0 {
        if dq1 > 0.0 {
            canonical([r1, p1, q1], [p2, r2, q2], [dp2, dr2, dq2])
        } else if dr1 > 0.0 {
            canonical([q1, r1, p1], [p2, r2, q2], [dp2, dr2, dq2])
        } else {
            canonical([p1, q1, r1], [p2, q2, r2], [dp2, dq2, dr2])
        }
    } else if dp1 < 0.0 {
        if dq1 < 0.0 {
            canonical([r1, p1, q1], [p2, q2, r2], [dp2, dq2, dr2])
        } else if dr1 < 0.0 {
            canonical([q1, r1, p1], [p2, q2, r2], [dp2, dq2, dr2])
        } else {
            canonical([p1, q1, r1], [p2, r2, q2], [dp2, dr2, dq2])
        }
    } else if dq1 < 0.0 {
        if dr1 >= 0.0 {
            canonical([q1, r1, p1], [p2, r2, q2], [dp2, dr2, dq2])
        } else {
            canonical([p1, q1, r1], [p2, q2, r2], [dp2, dq2, dr2])
        }
    } else if dq1 > 0.0 {
        if dr1 > 0.0 {
            canonical([p1, q1, r1], [p2, r2, q2], [dp2, dr2, dq2])
        } else {
            canonical([q1, r1, p1], [p2, q2, r2], [dp2, dq2, dr2])
        }
    } else if dr1 > 0.0 {
        canonical([r1, p1, q1], [p2, q2, r2], [dp2, dq2, dr2])
    } else if dr1 < 0.0 {
        canonical([r1, p1, q1], [p2, r2, q2], [dp2, dr2, dq2])
    } else {
        coplanar_overlap([p1, q1, r1], [p2, q2, r2], n1)
    }
}

/// Bring triangle 2 into canonical form, then run the interval check
fn permute_second(t1: [Vec3; 3], t2: [Vec3; 3], d: [f32; 3], n1: Vec3) -> bool {
    let [p1, q1, r1] = t1;
    let [p2, q2, r2] = t2;
    let [dp2, dq2, dr2] = d;

    if dp2 > 0.0 {
        if dq2 > 0.0 {
            check_min_max(p1, r1, q1, r2, p2, q2)
        } else if dr2 > 0.0 {
            check_min_max(p1, r1, q1, q2, r2, p2)
        } else {
            check_min_max(p1, q1, r1, p2, q2, r2)
        }
    } else if dp2 < 0.0 {
        if dq2 < 0.0 {
            check_min_max(p1, q1, r1, r2, p2, q2)
        } else if dr2 < 0.0 {
            check_min_max(p1, q1, r1, q2, r2, p2)
        } else {
            check_min_max(p1, r1, q1, p2, q2, r2)
        }
    } else if dq2 < 0.0 {
        if dr2 >= 0.0 {
            check_min_max(p1, r1, q1, q2, r2, p2)
        } else {
            check_min_max(p1, q1, r1, p2, q2, r2)
        }
    } else if dq2 > 0.0 {
        if dr2 > 0.0 {
            check_min_max(p1, r1, q1, p2, q2, r2)
        } else {
            check_min_max(p1, q1, r1, q2, r2, p2)
        }
    } else if dr2 > 0.0 {
        check_min_max(p1, q1, r1, r2, p2, q2)
    } else if dr2 < 0.0 {
        check_min_max(p1, r1, q1, r2, p2, q2)
    } else {
        coplanar_overlap([p1, q1, r1], [p2, q2, r2], n1)
    }
}

/// Overlap of the two intervals cut on the planes' intersection line
fn check_min_max(p1: Vec3, q1: Vec3, r1: Vec3, p2: Vec3, q2: Vec3, r2: Vec3) -> bool {
    let n = (p2 - q1).cross(&(p1 - q1));
    if (q2 - q1).dot(&n) > 0.0 {
        return false;
    }
    let n = (p2 - p1).cross(&(r1 - p1));
    (r2 - p1).dot(&n) <= 0.0
}

/// Coplanar case: project onto the plane that maximises the projected area
fn coplanar_overlap(t1: [Vec3; 3], t2: [Vec3; 3], normal: Vec3) -> bool {
    let n = normal.abs();
    let [p1, q1, r1] = t1;
    let [p2, q2, r2] = t2;

    if n.x > n.z && n.x >= n.y {
        // YZ plane, first two vertices swapped to keep orientation
        tri_tri_overlap_2d(
            Vec2::new(q1.z, q1.y), Vec2::new(p1.z, p1.y), Vec2::new(r1.z, r1.y),
            Vec2::new(q2.z, q2.y), Vec2::new(p2.z, p2.y), Vec2::new(r2.z, r2.y),
        )
    } else if n.y > n.z && n.y >= n.x {
        // XZ plane
        tri_tri_overlap_2d(
            Vec2::new(q1.x, q1.z), Vec2::new(p1.x, p1.z), Vec2::new(r1.x, r1.z),
            Vec2::new(q2.x, q2.z), Vec2::new(p2.x, p2.z), Vec2::new(r2.x, r2.z),
        )
    } else {
        tri_tri_overlap_2d(
            p1.xy(), q1.xy(), r1.xy(),
            p2.xy(), q2.xy(), r2.xy(),
        )
    }
}

fn orient_2d(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (a.x - c.x) * (b.y - c.y) - (a.y - c.y) * (b.x - c.x)
}

/// Two-dimensional overlap test for arbitrarily wound triangles
pub fn tri_tri_overlap_2d(p1: Vec2, q1: Vec2, r1: Vec2, p2: Vec2, q2: Vec2, r2: Vec2) -> bool {
    let first_cw = orient_2d(p1, q1, r1) < 0.0;
    let second_cw = orient_2d(p2, q2, r2) < 0.0;
    match (first_cw, second_cw) {
        (true, true) => ccw_overlap_2d(p1, r1, q1, p2, r2, q2),
        (true, false) => ccw_overlap_2d(p1, r1, q1, p2, q2, r2),
        (false, true) => ccw_overlap_2d(p1, q1, r1, p2, r2, q2),
        (false, false) => ccw_overlap_2d(p1, q1, r1, p2, q2, r2),
    }
}

/// Both triangles counter-clockwise; classify `p1` against the edges of triangle 2
fn ccw_overlap_2d(p1: Vec2, q1: Vec2, r1: Vec2, p2: Vec2, q2: Vec2, r2: Vec2) -> bool {
    if orient_2d(p2, q2, p1) >= 0.0 {
        if orient_2d(q2, r2, p1) >= 0.0 {
            if orient_2d(r2, p2, p1) >= 0.0 {
                true
            } else {
                intersection_test_edge(p1, q1, r1, p2, q2, r2)
            }
        } else if orient_2d(r2, p2, p1) >= 0.0 {
            intersection_test_edge(p1, q1, r1, r2, p2, q2)
        } else {
            intersection_test_vertex(p1, q1, r1, p2, q2, r2)
        }
    } else if orient_2d(q2, r2, p1) >= 0.0 {
        if orient_2d(r2, p2, p1) >= 0.0 {
            intersection_test_edge(p1, q1, r1, q2, r2, p2)
        } else {
            intersection_test_vertex(p1, q1, r1, q2, r2, p2)
        }
    } else {
        intersection_test_vertex(p1, q1, r1, r2, p2, q2)
    }
}

/// `p1` lies in the region of vertex `p2`
fn intersection_test_vertex(p1: Vec2, q1: Vec2, r1: Vec2, p2: Vec2, q2: Vec2, r2: Vec2) -> bool {
    if orient_2d(r2, p2, q1) >= 0.0 {
        if orient_2d(r2, q2, q1) <= 0.0 {
            if orient_2d(p1, p2, q1) > 0.0 {
                orient_2d(p1, q2, q1) <= 0.0
            } else {
                orient_2d(p1, p2, r1) >= 0.0 && orient_2d(q1, r1, p2) >= 0.0
            }
        } else {
            orient_2d(p1, q2, q1) <= 0.0
                && orient_2d(r2, q2, r1) <= 0.0
                && orient_2d(q1, r1, q2) >= 0.0
        }
    } else if orient_2d(r2, p2, r1) >= 0.0 {
        if orient_2d(q1, r1, r2) >= 0.0 {
            orient_2d(p1, p2, r1) >= 0.0
        } else {
            orient_2d(q1, r1, q2) >= 0.0 && orient_2d(r2, r1, q2) >= 0.0
        }
    } else {
        false
    }
}

/// `p1` lies in the region of edge `p2q2`
fn intersection_test_edge(p1: Vec2, q1: Vec2, r1: Vec2, p2: Vec2, _q2: Vec2, r2: Vec2) -> bool {
    if orient_2d(r2, p2, q1) >= 0.0 {
        if orient_2d(p1, p2, q1) >= 0.0 {
            orient_2d(p1, q1, r2) >= 0.0
        } else {
            orient_2d(q1, r1, p2) >= 0.0 && orient_2d(r1, p1, p2) >= 0.0
        }
    } else if orient_2d(r2, p2, r1) >= 0.0 {
        orient_2d(p1, p2, r1) >= 0.0
            && (orient_2d(p1, r1, r2) >= 0.0 || orient_2d(q1, r1, r2) >= 0.0)
    } else {
        false
    }
}
