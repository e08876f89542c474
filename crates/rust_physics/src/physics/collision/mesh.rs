//! Triangle meshes and BVH-backed mesh shapes
//!
//! A [`TriangleMesh`] holds faces in model space and is shared between
//! colliders. [`MeshShape`] pairs a mesh with its lazily built [`Bvh`];
//! world-space triangles are produced on demand per test and never stored.

use std::cell::OnceCell;
use std::sync::Arc;

use log::warn;

use crate::foundation::math::{Mat3, Mat4, Point3, Vec2, Vec3};

use super::aabb::AABB;
use super::bvh::Bvh;
use super::geometry::{ray_triangle_intersect, Triangle, GEOMETRY_EPSILON};
use super::ray::{Ray, RayHit};

/// Default number of triangles per BVH leaf
pub const DEFAULT_LEAF_THRESHOLD: usize = 2;

/// Mesh vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Model-space position
    pub position: Vec3,
    /// Texture coordinate
    pub tex_coord: Vec2,
    /// Vertex normal
    pub normal: Vec3,
}

impl Vertex {
    /// Vertex with zero texture coordinate and normal
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            tex_coord: Vec2::zeros(),
            normal: Vec3::zeros(),
        }
    }
}

/// One triangle of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// First vertex
    pub a: Vertex,
    /// Second vertex
    pub b: Vertex,
    /// Third vertex
    pub c: Vertex,
}

impl Face {
    /// Face from three positions; vertex normals are set to the face normal
    pub fn from_positions(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = Triangle::new(a, b, c).normal().unwrap_or_else(Vec3::zeros);
        let vertex = |position| Vertex { position, tex_coord: Vec2::zeros(), normal };
        Self {
            a: vertex(a),
            b: vertex(b),
            c: vertex(c),
        }
    }

    /// Model-space triangle
    pub fn triangle(&self) -> Triangle {
        Triangle::new(self.a.position, self.b.position, self.c.position)
    }
}

/// Model-space triangle soup
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    faces: Vec<Face>,
}

impl TriangleMesh {
    /// Mesh from faces
    pub fn new(faces: Vec<Face>) -> Self {
        Self { faces }
    }

    /// Mesh from an indexed vertex list; trailing indices that do not form a
    /// full triangle and out-of-range indices are skipped
    pub fn from_indexed(positions: &[Vec3], indices: &[u32]) -> Self {
        let faces = indices
            .chunks_exact(3)
            .filter_map(|chunk| {
                let a = *positions.get(chunk[0] as usize)?;
                let b = *positions.get(chunk[1] as usize)?;
                let c = *positions.get(chunk[2] as usize)?;
                Some(Face::from_positions(a, b, c))
            })
            .collect();
        Self { faces }
    }

    /// Horizontal square on the XZ plane facing +Y
    pub fn quad(half_size: f32) -> Self {
        let h = half_size;
        let positions = [
            Vec3::new(-h, 0.0, -h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(h, 0.0, h),
            Vec3::new(-h, 0.0, h),
        ];
        Self::from_indexed(&positions, &[0, 3, 2, 0, 2, 1])
    }

    /// Closed box with outward-facing triangles
    pub fn cuboid(half_extents: Vec3) -> Self {
        let (x, y, z) = (half_extents.x, half_extents.y, half_extents.z);
        let positions = [
            Vec3::new(-x, -y, -z),
            Vec3::new(x, -y, -z),
            Vec3::new(x, y, -z),
            Vec3::new(-x, y, -z),
            Vec3::new(-x, -y, z),
            Vec3::new(x, -y, z),
            Vec3::new(x, y, z),
            Vec3::new(-x, y, z),
        ];
        #[rustfmt::skip]
        let indices = [
            0, 3, 2, 0, 2, 1, // -z
            4, 5, 6, 4, 6, 7, // +z
            0, 1, 5, 0, 5, 4, // -y
            3, 7, 6, 3, 6, 2, // +y
            0, 4, 7, 0, 7, 3, // -x
            1, 2, 6, 1, 6, 5, // +x
        ];
        Self::from_indexed(&positions, &indices)
    }

    /// All faces
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Number of triangles
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// True if the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Model-space triangles in face order
    pub fn triangles(&self) -> Vec<Triangle> {
        self.faces.iter().map(Face::triangle).collect()
    }

    /// Model-space bounds, None for an empty mesh
    pub fn bounds(&self) -> Option<AABB> {
        AABB::from_points(
            self.faces
                .iter()
                .flat_map(|f| [f.a.position, f.b.position, f.c.position]),
        )
    }

    /// Inertia tensor for a solid of uniform density bounded by this mesh
    ///
    /// Each face forms a tetrahedron with the origin; signed volumes and the
    /// diagonal second moments are summed and rescaled to `mass`. Products of
    /// inertia are not included. Returns identity when the enclosed volume is
    /// effectively zero (open or flat meshes).
    pub fn inertia_tensor(&self, mass: f32) -> Mat3 {
        let mut total_volume = 0.0;
        let mut moments = Vec3::zeros();

        for face in &self.faces {
            let (v0, v1, v2) = (face.a.position, face.b.position, face.c.position);
            let volume = v0.dot(&v1.cross(&v2)) / 6.0;
            total_volume += volume;

            let second = |i: usize| {
                v0[i] * v0[i] + v1[i] * v1[i] + v2[i] * v2[i]
                    + v0[i] * v1[i] + v0[i] * v2[i] + v1[i] * v2[i]
            };
            let (sx, sy, sz) = (second(0), second(1), second(2));
            moments += Vec3::new(sy + sz, sx + sz, sx + sy) * (volume / 10.0);
        }

        if total_volume.abs() < 1e-6 {
            return Mat3::identity();
        }

        Mat3::from_diagonal(&(moments * (mass / total_volume)))
    }
}

/// Mesh collision shape
///
/// The BVH is built by [`MeshShape::ensure_built`]; queries build it on first
/// use when that was skipped.
#[derive(Debug, Clone)]
pub struct MeshShape {
    mesh: Arc<TriangleMesh>,
    leaf_threshold: usize,
    bvh: OnceCell<Bvh>,
}

impl MeshShape {
    /// Shape over an owned mesh
    pub fn new(mesh: TriangleMesh) -> Self {
        Self::from_shared(Arc::new(mesh))
    }

    /// Shape over a mesh shared with other colliders
    pub fn from_shared(mesh: Arc<TriangleMesh>) -> Self {
        Self {
            mesh,
            leaf_threshold: DEFAULT_LEAF_THRESHOLD,
            bvh: OnceCell::new(),
        }
    }

    /// Set the BVH leaf size; discards a BVH built with the old size
    pub fn with_leaf_threshold(mut self, leaf_threshold: usize) -> Self {
        self.set_leaf_threshold(leaf_threshold);
        self
    }

    /// In-place form of [`MeshShape::with_leaf_threshold`]
    pub fn set_leaf_threshold(&mut self, leaf_threshold: usize) {
        if self.leaf_threshold != leaf_threshold {
            self.leaf_threshold = leaf_threshold;
            self.bvh = OnceCell::new();
        }
    }

    /// BVH leaf size used for the next build
    pub fn leaf_threshold(&self) -> usize {
        self.leaf_threshold
    }

    /// Underlying mesh
    pub fn mesh(&self) -> &Arc<TriangleMesh> {
        &self.mesh
    }

    /// Build the BVH if needed and return it
    pub fn ensure_built(&self) -> &Bvh {
        self.bvh
            .get_or_init(|| Bvh::build(&self.mesh.triangles(), self.leaf_threshold))
    }

    /// True once the BVH exists
    pub fn is_built(&self) -> bool {
        self.bvh.get().is_some()
    }

    /// Face indices whose local bounds overlap the volume spanned by
    /// `world_corners`, which is first carried into mesh space
    pub fn candidates(&self, world_matrix: &Mat4, world_corners: &[Vec3]) -> Vec<usize> {
        let Some(inverse) = world_matrix.try_inverse() else {
            warn!("Mesh transform is not invertible (zero scale?), skipping query");
            return Vec::new();
        };

        let local = world_corners
            .iter()
            .map(|c| inverse.transform_point(&Point3::from(*c)).coords);
        match AABB::from_points(local) {
            Some(query) => self.ensure_built().query(&query),
            None => Vec::new(),
        }
    }

    /// Face `index` carried into world space
    pub fn world_triangle(&self, index: usize, world_matrix: &Mat4) -> Triangle {
        let t = self.mesh.faces[index].triangle();
        let map = |v: Vec3| world_matrix.transform_point(&Point3::from(v)).coords;
        Triangle::new(map(t.v0), map(t.v1), map(t.v2))
    }

    /// World-space corners of the mesh's local bounds
    pub fn world_corners(&self, world_matrix: &Mat4) -> Option<[Vec3; 8]> {
        let bounds = self.ensure_built().bounds()?;
        Some(bounds.corners().map(|c| world_matrix.transform_point(&Point3::from(c)).coords))
    }

    /// Closest hit of `ray` against this mesh placed at `world_matrix`
    ///
    /// Hits are accepted for `0 <= t <= ray.length`; the reported normal is
    /// flipped to face back along the ray.
    pub fn raycast(&self, world_matrix: &Mat4, ray: &Ray) -> Option<RayHit> {
        if !ray.is_valid() {
            return None;
        }

        let mut hit: Option<RayHit> = None;

        for index in self.candidates(world_matrix, &ray.bounds().corners()) {
            let tri = self.world_triangle(index, world_matrix);
            let Some((t, _, _)) = ray_triangle_intersect(ray.origin, ray.direction, tri.v0, tri.v1, tri.v2) else {
                continue;
            };
            let closer = hit.as_ref().map_or(true, |best| t < best.distance);
            if t >= 0.0 && t <= ray.length && closer {
                let Some(mut normal) = tri.scaled_normal().try_normalize(GEOMETRY_EPSILON) else {
                    continue;
                };
                if ray.direction.dot(&normal) > 0.0 {
                    normal = -normal;
                }
                hit = Some(RayHit {
                    point: ray.point_at(t),
                    normal,
                    distance: t,
                });
            }
        }

        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quad_faces_up() {
        let quad = TriangleMesh::quad(2.0);
        assert_eq!(quad.len(), 2);
        for face in quad.faces() {
            assert_relative_eq!(face.triangle().normal().unwrap(), Vec3::y(), epsilon = 1e-6);
            assert_relative_eq!(face.a.normal, Vec3::y(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_from_indexed_skips_bad_indices() {
        let positions = [Vec3::zeros(), Vec3::x(), Vec3::y()];
        let mesh = TriangleMesh::from_indexed(&positions, &[0, 1, 2, 0, 1, 9, 2]);
        assert_eq!(mesh.len(), 1);
    }

    #[test]
    fn test_cuboid_inertia_matches_solid_box() {
        // Solid box with side 2: I = m (2^2 + 2^2) / 12
        let cube = TriangleMesh::cuboid(Vec3::repeat(1.0));
        let inertia = cube.inertia_tensor(3.0);
        let expected = 3.0 * 8.0 / 12.0;
        assert_relative_eq!(inertia[(0, 0)], expected, epsilon = 1e-4);
        assert_relative_eq!(inertia[(1, 1)], expected, epsilon = 1e-4);
        assert_relative_eq!(inertia[(2, 2)], expected, epsilon = 1e-4);
        assert_relative_eq!(inertia[(0, 1)], 0.0);
    }

    #[test]
    fn test_flat_mesh_inertia_falls_back_to_identity() {
        assert_relative_eq!(TriangleMesh::quad(1.0).inertia_tensor(5.0), Mat3::identity());
    }

    #[test]
    fn test_bvh_is_built_lazily() {
        let shape = MeshShape::new(TriangleMesh::cuboid(Vec3::repeat(1.0)));
        assert!(!shape.is_built());
        shape.ensure_built();
        assert!(shape.is_built());
    }

    #[test]
    fn test_raycast_hits_translated_quad() {
        let shape = MeshShape::new(TriangleMesh::quad(5.0));
        let world = Mat4::new_translation(&Vec3::new(0.0, -1.0, 0.0));

        let down = Ray::new(Vec3::new(0.5, 3.0, 0.5), -Vec3::y(), 10.0);
        let hit = shape.raycast(&world, &down).unwrap();
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-5);
        assert_relative_eq!(hit.point, Vec3::new(0.5, -1.0, 0.5), epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::y(), epsilon = 1e-6);

        // From below the normal flips to face the ray
        let up = Ray::new(Vec3::new(0.5, -3.0, 0.5), Vec3::y(), 10.0);
        assert_relative_eq!(shape.raycast(&world, &up).unwrap().normal, -Vec3::y(), epsilon = 1e-6);

        // Too short to reach
        let short = Ray::new(Vec3::new(0.5, 3.0, 0.5), -Vec3::y(), 3.0);
        assert!(shape.raycast(&world, &short).is_none());
    }

    #[test]
    fn test_raycast_accepts_hit_at_full_length() {
        // Unit-determinant triangles keep t exact
        let shape = MeshShape::new(TriangleMesh::quad(0.5));
        let ray = Ray::new(Vec3::new(0.25, 2.0, -0.125), -Vec3::y(), 2.0);
        let hit = shape.raycast(&Mat4::identity(), &ray).unwrap();
        assert_eq!(hit.distance, 2.0);
        assert_relative_eq!(hit.point, Vec3::new(0.25, 0.0, -0.125));
    }

    #[test]
    fn test_raycast_returns_closest_face() {
        let shape = MeshShape::new(TriangleMesh::cuboid(Vec3::repeat(1.0)));
        let ray = Ray::new(Vec3::new(0.2, 0.1, 5.0), -Vec3::z(), 20.0);
        let hit = shape.raycast(&Mat4::identity(), &ray).unwrap();
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_singular_transform_yields_no_candidates() {
        let shape = MeshShape::new(TriangleMesh::quad(1.0));
        let flat = Mat4::new_nonuniform_scaling(&Vec3::new(1.0, 0.0, 1.0));
        assert!(shape.candidates(&flat, &[Vec3::zeros()]).is_empty());
    }
}
