//! Narrow-phase pair tests
//!
//! [`is_colliding`] dispatches on the ordered pair of shape kinds. The tests
//! are deliberately asymmetric: `A vs B` and `B vs A` may pick different
//! contact points and normal conventions, and each reports its convention in
//! [`Contact::facing`]. Pairs without a dedicated test report no contact.

use log::{debug, trace};

use crate::config::PhysicsConfig;
use crate::foundation::math::{Mat3, Mat4, Vec3};

use super::contact::{Contact, NormalFacing};
use super::geometry::{
    closest_point_on_triangle, tri_box_overlap, triangle_contact_point,
    triangle_penetration_depth, GEOMETRY_EPSILON,
};
use super::mesh::MeshShape;
use super::ray::{Ray, RayHit};
use super::shape::{CollisionShape, ColliderPose, RayShape, WorldCollider};
use super::tri_tri::triangles_overlap;

/// Tunables for the narrow phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSettings {
    /// Mesh-mesh triangle contacts at or beyond this depth are left out of the depth aggregate
    pub mesh_contact_max_depth: f32,
}

impl Default for ContactSettings {
    fn default() -> Self {
        Self {
            mesh_contact_max_depth: 1.0,
        }
    }
}

impl From<&PhysicsConfig> for ContactSettings {
    fn from(config: &PhysicsConfig) -> Self {
        Self {
            mesh_contact_max_depth: config.mesh_contact_max_depth,
        }
    }
}

/// Test collider `a` against collider `b`
pub fn is_colliding(a: &WorldCollider, b: &WorldCollider, settings: &ContactSettings) -> Option<Contact> {
    use CollisionShape as S;

    match (a.shape(), b.shape()) {
        (S::Box { half_extents: ha }, S::Box { half_extents: hb }) => {
            box_box(&a.pose, *ha, &b.pose, *hb)
        }
        (S::Box { half_extents }, S::Sphere { radius }) => {
            box_sphere(&a.pose, *half_extents, b.pose.position, *radius)
                .map(|(point, normal, depth)| Contact::new(point, normal, depth, NormalFacing::SelfToOther))
        }
        (S::Sphere { radius }, S::Box { half_extents }) => {
            box_sphere(&b.pose, *half_extents, a.pose.position, *radius)
                .map(|(point, normal, depth)| Contact::new(point, normal, depth, NormalFacing::OtherToSelf))
        }
        (S::Sphere { radius: ra }, S::Sphere { radius: rb }) => {
            sphere_sphere(a.pose.position, *ra, b.pose.position, *rb)
        }
        (S::Box { half_extents }, S::Mesh(mesh)) => {
            box_mesh(a, *half_extents, mesh, &b.pose.matrix())
        }
        (S::Mesh(mesh), S::Box { half_extents }) => {
            mesh_box(mesh, &a.pose.matrix(), b, *half_extents)
        }
        (S::Sphere { radius }, S::Mesh(mesh)) => {
            sphere_mesh(a, *radius, mesh, &b.pose.matrix())
                .map(|(point, normal, depth)| Contact::new(point, normal, depth, NormalFacing::OtherToSelf))
        }
        (S::Mesh(mesh), S::Sphere { radius }) => {
            sphere_mesh(b, *radius, mesh, &a.pose.matrix())
                .map(|(point, normal, depth)| Contact::new(point, normal, depth, NormalFacing::SelfToOther))
        }
        (S::Mesh(mesh_a), S::Mesh(mesh_b)) => mesh_mesh(a, mesh_a, b, mesh_b, settings),
        (S::Ray(ray), S::Mesh(mesh)) => ray_mesh(ray, &a.pose, mesh, &b.pose.matrix()),
        (other_a, other_b) => {
            trace!("No pair test for {:?} vs {:?}", other_a.kind(), other_b.kind());
            None
        }
    }
}

/// Ray query against a collider; only meshes answer ray queries
pub fn ray_collision(target: &WorldCollider, ray: &Ray) -> Option<RayHit> {
    match target.shape() {
        CollisionShape::Mesh(mesh) => mesh.raycast(&target.pose.matrix(), ray),
        _ => None,
    }
}

/// Oriented box SAT over 15 axes
///
/// The normal is the minimum-overlap axis, pointing from A toward B. Edge
/// cross axes of (near) parallel edges are skipped when choosing it.
fn box_box(a: &ColliderPose, a_half: Vec3, b: &ColliderPose, b_half: Vec3) -> Option<Contact> {
    let a_axes = [a.rotation.column(0).into_owned(), a.rotation.column(1).into_owned(), a.rotation.column(2).into_owned()];
    let b_axes = [b.rotation.column(0).into_owned(), b.rotation.column(1).into_owned(), b.rotation.column(2).into_owned()];

    let offset = b.position - a.position;
    let t = Vec3::new(offset.dot(&a_axes[0]), offset.dot(&a_axes[1]), offset.dot(&a_axes[2]));

    // B's axes expressed in A's frame; epsilon keeps parallel edges from
    // producing zero-width projections
    let r = Mat3::from_fn(|i, j| a_axes[i].dot(&b_axes[j]));
    let abs_r = r.map(|v| v.abs() + f32::EPSILON);

    let face_a = |i: usize| {
        let rb = b_half.x * abs_r[(i, 0)] + b_half.y * abs_r[(i, 1)] + b_half.z * abs_r[(i, 2)];
        (a_half[i] + rb, t[i])
    };
    let face_b = |j: usize| {
        let ra = a_half.x * abs_r[(0, j)] + a_half.y * abs_r[(1, j)] + a_half.z * abs_r[(2, j)];
        let proj = t.x * r[(0, j)] + t.y * r[(1, j)] + t.z * r[(2, j)];
        (ra + b_half[j], proj)
    };
    let edge = |i: usize, j: usize| {
        let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
        let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
        let ra = a_half[i1] * abs_r[(i2, j)] + a_half[i2] * abs_r[(i1, j)];
        let rb = b_half[j1] * abs_r[(i, j2)] + b_half[j2] * abs_r[(i, j1)];
        let proj = t[i2] * r[(i1, j)] - t[i1] * r[(i2, j)];
        (ra + rb, proj)
    };

    let mut min_overlap = f32::MAX;
    let mut best_axis = Vec3::zeros();
    let signed = |axis: Vec3, proj: f32| if proj < 0.0 { -axis } else { axis };

    for i in 0..3 {
        let (reach, proj) = face_a(i);
        let overlap = reach - proj.abs();
        if overlap < 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            best_axis = signed(a_axes[i], proj);
        }
    }

    for j in 0..3 {
        let (reach, proj) = face_b(j);
        let overlap = reach - proj.abs();
        if overlap < 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            best_axis = signed(b_axes[j], proj);
        }
    }

    for i in 0..3 {
        for j in 0..3 {
            let (reach, proj) = edge(i, j);
            let overlap = reach - proj.abs();
            if overlap < 0.0 {
                return None;
            }

            let axis = a_axes[i].cross(&b_axes[j]);
            let length = axis.norm();
            if length < GEOMETRY_EPSILON {
                continue;
            }

            // Projections above are along the unnormalized axis
            let overlap = overlap / length;
            if overlap < min_overlap {
                min_overlap = overlap;
                let axis = axis / length;
                best_axis = if offset.dot(&axis) < 0.0 { -axis } else { axis };
            }
        }
    }

    Some(Contact::new(
        (a.position + b.position) * 0.5,
        best_axis,
        min_overlap,
        NormalFacing::SelfToOther,
    ))
}

/// Box vs sphere, normal from the box toward the sphere center
fn box_sphere(box_pose: &ColliderPose, half: Vec3, center: Vec3, radius: f32) -> Option<(Vec3, Vec3, f32)> {
    let local_center = box_pose.to_local(center);
    let local_closest = local_center.zip_map(&half, |c, h| c.max(-h).min(h));
    let closest = box_pose.position + box_pose.rotate(local_closest);

    let distance = (closest - center).norm();
    if distance > radius {
        return None;
    }

    if distance > GEOMETRY_EPSILON {
        return Some((closest, (center - closest) / distance, radius - distance));
    }

    // Center inside the box: leave through the nearest face
    let face_distances = half - local_center.abs();
    let mut axis = 0;
    if face_distances.y < face_distances[axis] {
        axis = 1;
    }
    if face_distances.z < face_distances[axis] {
        axis = 2;
    }

    let mut local_normal = Vec3::zeros();
    local_normal[axis] = if local_center[axis] >= 0.0 { 1.0 } else { -1.0 };
    Some((closest, box_pose.rotate(local_normal), radius - face_distances[axis]))
}

/// Contact point lies on the surface of the first sphere
fn sphere_sphere(a: Vec3, ra: f32, b: Vec3, rb: f32) -> Option<Contact> {
    let delta = b - a;
    let distance = delta.norm();
    if distance >= ra + rb {
        return None;
    }

    // Coincident centers have no preferred direction; separate along +Y
    let direction = delta.try_normalize(GEOMETRY_EPSILON).unwrap_or_else(Vec3::y);
    Some(Contact::new(
        a + direction * ra,
        direction,
        ra + rb - distance,
        NormalFacing::SelfToOther,
    ))
}

/// Deepest box corner against `normal`, in world space
fn box_support_against(box_pose: &ColliderPose, half: Vec3, normal: Vec3) -> Vec3 {
    let local_normal = box_pose.rotation.transpose() * normal;
    let support = local_normal.zip_map(&half, |n, h| if n >= 0.0 { -h } else { h });
    box_pose.position + box_pose.rotate(support)
}

/// Closest point to the box center on every triangle overlapping the box
///
/// Each entry is `(closest point, unit face normal)`; degenerate triangles
/// are skipped.
fn box_triangle_hits(
    box_pose: &ColliderPose,
    half: Vec3,
    mesh: &MeshShape,
    mesh_matrix: &Mat4,
    corners: &[Vec3],
) -> Vec<(Vec3, Vec3)> {
    mesh.candidates(mesh_matrix, corners)
        .into_iter()
        .filter_map(|index| {
            let tri = mesh.world_triangle(index, mesh_matrix);
            let local = [box_pose.to_local(tri.v0), box_pose.to_local(tri.v1), box_pose.to_local(tri.v2)];
            if !tri_box_overlap(&local, half) {
                return None;
            }
            let normal = tri.normal()?;
            Some((closest_point_on_triangle(box_pose.position, tri.v0, tri.v1, tri.v2), normal))
        })
        .collect()
}

/// Entry whose point lies nearest `center`; the first wins ties
fn nearest_to(center: Vec3, hits: &[(Vec3, Vec3)]) -> Option<(Vec3, Vec3)> {
    hits.iter().copied().fold(None, |best: Option<(Vec3, Vec3)>, hit| match best {
        Some(b) if (b.0 - center).norm_squared() <= (hit.0 - center).norm_squared() => Some(b),
        _ => Some(hit),
    })
}

/// Box vs mesh, aggregated over every overlapping triangle
///
/// The normal is the negated sum of triangle normals facing away from the
/// box, so it points from the mesh toward the box. The contact point is the
/// closest point on the triangle nearest the box center.
fn box_mesh(box_collider: &WorldCollider, half: Vec3, mesh: &MeshShape, mesh_matrix: &Mat4) -> Option<Contact> {
    let box_pose = &box_collider.pose;
    let corners = box_collider.query_corners()?;
    let hits: Vec<(Vec3, Vec3)> = box_triangle_hits(box_pose, half, mesh, mesh_matrix, &corners)
        .into_iter()
        .map(|(point, normal)| {
            let away = if (point - box_pose.position).dot(&normal) < 0.0 { -normal } else { normal };
            (point, away)
        })
        .collect();

    let (point, first) = nearest_to(box_pose.position, &hits)?;
    let normal = (-hits.iter().map(|(_, n)| n).sum::<Vec3>())
        .try_normalize(GEOMETRY_EPSILON)
        .unwrap_or(-first);

    let support = box_support_against(box_pose, half, normal);
    let depth = normal.dot(&(point - support));

    Some(Contact::new(point, normal, depth, NormalFacing::OtherToSelf))
}

/// Mesh vs box, the overlapping triangle nearest the box center wins
fn mesh_box(mesh: &MeshShape, mesh_matrix: &Mat4, box_collider: &WorldCollider, half: Vec3) -> Option<Contact> {
    let box_pose = &box_collider.pose;
    let hits = box_triangle_hits(box_pose, half, mesh, mesh_matrix, &box_collider.query_corners()?);
    let (point, mut normal) = nearest_to(box_pose.position, &hits)?;
    if (box_pose.position - point).dot(&normal) < 0.0 {
        normal = -normal;
    }

    let support = box_support_against(box_pose, half, normal);
    let depth = normal.dot(&(point - support));
    Some(Contact::new(point, normal, depth, NormalFacing::SelfToOther))
}

/// Sphere vs mesh against the triangle closest to the sphere center
///
/// Returns `(point, normal, depth)` with the normal pointing from the mesh
/// toward the sphere center.
fn sphere_mesh(sphere: &WorldCollider, radius: f32, mesh: &MeshShape, mesh_matrix: &Mat4) -> Option<(Vec3, Vec3, f32)> {
    let center = sphere.pose.position;

    let hits: Vec<(Vec3, Vec3)> = mesh
        .candidates(mesh_matrix, &sphere.query_corners()?)
        .into_iter()
        .filter_map(|index| {
            let tri = mesh.world_triangle(index, mesh_matrix);
            let normal = tri.normal()?;
            let point = closest_point_on_triangle(center, tri.v0, tri.v1, tri.v2);
            ((center - point).norm_squared() <= radius * radius).then_some((point, normal))
        })
        .collect();

    let (point, face_normal) = nearest_to(center, &hits)?;
    let diff = center - point;
    let distance = diff.norm();
    if distance > GEOMETRY_EPSILON {
        return Some((point, diff / distance, radius - distance));
    }

    // Center exactly on the surface: fall back to the face normal
    let normal = if diff.dot(&face_normal) < 0.0 { -face_normal } else { face_normal };
    Some((point, normal, radius))
}

/// Mesh vs mesh over every overlapping triangle pair
///
/// Depth is the deepest per-pair depth below `mesh_contact_max_depth`, or
/// zero when every pair was excluded. The contact point is the centroid of
/// A's distinct vertices lying behind the overlapping faces of B, falling
/// back to the average of the per-pair contact points. The normal is the
/// face normal of either mesh best aligned with the direction from the
/// contact point to A's origin, turned to point from B toward A.
///
/// Meshes whose origin sits on or below the contact, such as thin shells or
/// meshes deeply sunk into one another, fall back to the negated
/// depth-weighted sum of A's face normals and can still be pushed through.
fn mesh_mesh(
    a: &WorldCollider,
    mesh_a: &MeshShape,
    b: &WorldCollider,
    mesh_b: &MeshShape,
    settings: &ContactSettings,
) -> Option<Contact> {
    let matrix_a = a.pose.matrix();
    let matrix_b = b.pose.matrix();
    let origin_a = a.pose.position;

    let faces_a = mesh_a.candidates(&matrix_a, &b.query_corners()?);
    let faces_b = mesh_b.candidates(&matrix_b, &a.query_corners()?);
    let triangles_b: Vec<_> = faces_b.iter().map(|&i| mesh_b.world_triangle(i, &matrix_b)).collect();

    let mut point_sum = Vec3::zeros();
    let mut point_count = 0usize;
    let mut sunk_vertices: Vec<Vec3> = Vec::new();
    let mut face_normals: Vec<Vec3> = Vec::new();
    let mut normal_sum = Vec3::zeros();
    let mut weighted_sum = Vec3::zeros();
    let mut max_depth: Option<f32> = None;

    for &index in &faces_a {
        let tri_a = mesh_a.world_triangle(index, &matrix_a);
        let Some(normal_a) = tri_a.normal() else {
            continue;
        };

        for tri_b in &triangles_b {
            if !triangles_overlap(&tri_a, tri_b) {
                continue;
            }

            point_sum += triangle_contact_point(&tri_a, tri_b);
            point_count += 1;
            normal_sum += normal_a;
            face_normals.push(normal_a);

            if let Some(mut normal_b) = tri_b.normal() {
                if normal_b.dot(&(origin_a - tri_b.v0)) < 0.0 {
                    normal_b = -normal_b;
                }
                face_normals.push(normal_b);

                for vertex in [tri_a.v0, tri_a.v1, tri_a.v2] {
                    let behind = (vertex - tri_b.v0).dot(&normal_b) < 0.0;
                    if behind && !sunk_vertices.iter().any(|v| (v - vertex).norm_squared() < GEOMETRY_EPSILON) {
                        sunk_vertices.push(vertex);
                    }
                }
            }

            let depth = triangle_penetration_depth(&tri_a, tri_b);
            if depth < settings.mesh_contact_max_depth {
                weighted_sum += normal_a * depth;
                max_depth = Some(max_depth.map_or(depth, |d| d.max(depth)));
            } else {
                debug!("Mesh contact depth {depth} excluded (limit {})", settings.mesh_contact_max_depth);
            }
        }
    }

    if point_count == 0 {
        return None;
    }

    let point = if sunk_vertices.is_empty() {
        point_sum / point_count as f32
    } else {
        sunk_vertices.iter().sum::<Vec3>() / sunk_vertices.len() as f32
    };

    let aligned = (origin_a - point).try_normalize(GEOMETRY_EPSILON).and_then(|toward_a| {
        face_normals
            .iter()
            .map(|n| if n.dot(&toward_a) < 0.0 { -n } else { *n })
            .fold(None, |best: Option<Vec3>, n| match best {
                Some(b) if b.dot(&toward_a) >= n.dot(&toward_a) => Some(b),
                _ => Some(n),
            })
    });

    let normal = aligned
        .or_else(|| weighted_sum.try_normalize(GEOMETRY_EPSILON).map(|n| -n))
        .or_else(|| normal_sum.try_normalize(GEOMETRY_EPSILON).map(|n| -n))?;

    Some(Contact::new(
        point,
        normal,
        max_depth.unwrap_or(0.0),
        NormalFacing::OtherToSelf,
    ))
}

/// Probe ray vs mesh
///
/// Depth is the unused ray length, except on steep surfaces hit deep enough
/// where the depth is measured along the surface normal instead.
fn ray_mesh(ray_shape: &RayShape, pose: &ColliderPose, mesh: &MeshShape, mesh_matrix: &Mat4) -> Option<Contact> {
    let ray = ray_shape.world_ray(pose);
    let hit = mesh.raycast(mesh_matrix, &ray)?;

    let alignment = hit.normal.dot(&-ray.direction);
    let penetration = ray.length - hit.distance;

    let depth = if alignment <= ray_shape.steepness_threshold
        && penetration >= ray.length * ray_shape.min_penetration_fraction
    {
        (hit.point - ray.origin).dot(&hit.normal)
    } else {
        penetration
    };

    Some(Contact::new(hit.point, hit.normal, depth, NormalFacing::OtherToSelf))
}
