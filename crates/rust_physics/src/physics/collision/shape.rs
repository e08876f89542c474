//! Collision shapes and colliders
//!
//! A [`CollisionShape`] holds the geometry in model space. A [`Collider`]
//! places a shape relative to its entity with a position and rotation offset
//! and carries filtering flags. Shapes never own their transform: the world
//! resolves a [`ColliderPose`] from the entity transform for every test.

use std::sync::Arc;

use crate::foundation::math::{euler_xyz_matrix, Mat3, Mat4, Transform, Vec3};
use crate::physics::collision_layers::CollisionLayers;

use super::geometry::GEOMETRY_EPSILON;
use super::mesh::{MeshShape, TriangleMesh};
use super::ray::Ray;

/// Shape variant tag, used for pair dispatch and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Oriented box
    Box,
    /// Sphere
    Sphere,
    /// Triangle mesh
    Mesh,
    /// Finite probe ray
    Ray,
}

/// Probe ray shape
///
/// Cast from the collider origin along `direction` rotated by the collider
/// pose. Against steep surfaces the contact pushes sideways instead of up.
#[derive(Debug, Clone, PartialEq)]
pub struct RayShape {
    /// Local-space unit direction
    pub direction: Vec3,
    /// Ray length
    pub length: f32,
    /// Surfaces with `dot(normal, -direction)` at or below this count as steep
    pub steepness_threshold: f32,
    /// Fraction of `length` a steep hit must penetrate before it pushes sideways
    pub min_penetration_fraction: f32,
}

impl RayShape {
    /// Ray along `direction` (normalized; zero stays zero)
    pub fn new(direction: Vec3, length: f32) -> Self {
        Self {
            direction: direction.try_normalize(GEOMETRY_EPSILON).unwrap_or_else(Vec3::zeros),
            length,
            ..Self::default()
        }
    }

    /// Set the steep-surface thresholds
    pub fn with_steepness(mut self, threshold: f32, min_penetration_fraction: f32) -> Self {
        self.steepness_threshold = threshold;
        self.min_penetration_fraction = min_penetration_fraction;
        self
    }

    /// World-space ray for a collider at `pose`
    pub fn world_ray(&self, pose: &ColliderPose) -> Ray {
        Ray::new(pose.position, pose.rotation * self.direction, self.length)
    }
}

impl Default for RayShape {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, 0.0),
            length: 5.0,
            steepness_threshold: 0.5,
            min_penetration_fraction: 0.2,
        }
    }
}

/// Collision shape types (stored in MODEL SPACE)
#[derive(Debug, Clone)]
pub enum CollisionShape {
    /// Oriented box given by its half-extents
    Box {
        /// Half the box size along each local axis
        half_extents: Vec3,
    },
    /// Sphere given by its radius
    Sphere {
        /// Sphere radius
        radius: f32,
    },
    /// BVH-backed triangle mesh
    Mesh(MeshShape),
    /// Probe ray
    Ray(RayShape),
}

impl CollisionShape {
    /// Box with the given half-extents
    pub fn box_shape(half_extents: Vec3) -> Self {
        Self::Box { half_extents }
    }

    /// Box with the given full size
    pub fn cuboid(size: Vec3) -> Self {
        Self::Box { half_extents: size * 0.5 }
    }

    /// Sphere with the given radius
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Mesh shape over an owned mesh
    pub fn mesh(mesh: TriangleMesh) -> Self {
        Self::Mesh(MeshShape::new(mesh))
    }

    /// Mesh shape over a shared mesh
    pub fn shared_mesh(mesh: Arc<TriangleMesh>) -> Self {
        Self::Mesh(MeshShape::from_shared(mesh))
    }

    /// Probe ray along `direction`
    pub fn ray(direction: Vec3, length: f32) -> Self {
        Self::Ray(RayShape::new(direction, length))
    }

    /// Variant tag
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Box { .. } => ShapeKind::Box,
            Self::Sphere { .. } => ShapeKind::Sphere,
            Self::Mesh(_) => ShapeKind::Mesh,
            Self::Ray(_) => ShapeKind::Ray,
        }
    }

    /// Mesh payload, if this is a mesh
    pub fn as_mesh(&self) -> Option<&MeshShape> {
        match self {
            Self::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// A collision shape placed on an entity
#[derive(Debug, Clone)]
pub struct Collider {
    /// Geometry
    pub shape: CollisionShape,
    /// Offset from the entity origin, in entity space
    pub position_offset: Vec3,
    /// Extra rotation applied after the entity rotation, Euler degrees
    pub rotation_offset: Vec3,
    /// Triggers report collisions but receive no physical response
    pub is_trigger: bool,
    /// Layers this collider occupies
    pub layer: CollisionLayers,
    /// Layers this collider collides with
    pub mask: CollisionLayers,
}

impl Collider {
    /// Collider with no offsets on every layer
    pub fn new(shape: CollisionShape) -> Self {
        Self {
            shape,
            position_offset: Vec3::zeros(),
            rotation_offset: Vec3::zeros(),
            is_trigger: false,
            layer: CollisionLayers::all(),
            mask: CollisionLayers::all(),
        }
    }

    /// Set the position offset
    pub fn with_position_offset(mut self, offset: Vec3) -> Self {
        self.position_offset = offset;
        self
    }

    /// Set the rotation offset in Euler degrees
    pub fn with_rotation_offset(mut self, degrees: Vec3) -> Self {
        self.rotation_offset = degrees;
        self
    }

    /// Mark as trigger
    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    /// Set layer and mask
    pub fn with_layers(mut self, layer: CollisionLayers, mask: CollisionLayers) -> Self {
        self.layer = layer;
        self.mask = mask;
        self
    }

    /// True if layer filtering allows testing against `other`
    pub fn can_collide_with(&self, other: &Collider) -> bool {
        CollisionLayers::should_collide(self.layer, self.mask, other.layer, other.mask)
    }

    /// World pose of this collider on an entity at `transform`
    pub fn pose(&self, transform: &Transform) -> ColliderPose {
        let world_rotation = transform.rotation_matrix();
        ColliderPose {
            position: transform.position + world_rotation * self.position_offset,
            rotation: world_rotation * euler_xyz_matrix(self.rotation_offset),
            scale: transform.scale,
        }
    }

    /// Resolve against an entity transform for narrow-phase testing
    pub fn at<'a>(&'a self, transform: &Transform) -> WorldCollider<'a> {
        WorldCollider {
            collider: self,
            pose: self.pose(transform),
        }
    }

    /// Build any acceleration structure the shape needs
    pub fn activate(&self) {
        if let CollisionShape::Mesh(mesh) = &self.shape {
            mesh.ensure_built();
        }
    }

    /// Body-space inertia tensor for a body of `mass` carrying this collider
    ///
    /// Boxes include the parallel-axis term for the position offset.
    pub fn inertia_tensor(&self, mass: f32) -> Mat3 {
        match &self.shape {
            CollisionShape::Box { half_extents } => {
                let size = half_extents * 2.0;
                let (x2, y2, z2) = (size.x * size.x, size.y * size.y, size.z * size.z);
                let local = Mat3::from_diagonal(&Vec3::new(y2 + z2, x2 + z2, x2 + y2)) * (mass / 12.0);

                let d = self.position_offset;
                let correction = (Mat3::identity() * d.dot(&d) - d * d.transpose()) * mass;
                local + correction
            }
            CollisionShape::Sphere { radius } => Mat3::identity() * (0.4 * mass * radius * radius),
            CollisionShape::Mesh(mesh) => mesh.mesh().inertia_tensor(mass),
            CollisionShape::Ray(_) => Mat3::identity() * 0.1,
        }
    }
}

/// World placement of a collider for one test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderPose {
    /// World position of the collider origin
    pub position: Vec3,
    /// World rotation including the collider's rotation offset
    pub rotation: Mat3,
    /// Entity scale (applied to meshes only)
    pub scale: Vec3,
}

impl ColliderPose {
    /// Model matrix `T * R * S`
    pub fn matrix(&self) -> Mat4 {
        let mut rotation = Mat4::identity();
        rotation.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        Mat4::new_translation(&self.position) * rotation * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// World point into collider-local space (rotation and translation only)
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.transpose() * (point - self.position)
    }

    /// Collider-local direction into world space
    pub fn rotate(&self, direction: Vec3) -> Vec3 {
        self.rotation * direction
    }
}

/// A collider paired with its resolved pose
#[derive(Debug, Clone, Copy)]
pub struct WorldCollider<'a> {
    /// Collider definition
    pub collider: &'a Collider,
    /// World placement
    pub pose: ColliderPose,
}

impl WorldCollider<'_> {
    /// Shape of the underlying collider
    pub fn shape(&self) -> &CollisionShape {
        &self.collider.shape
    }

    /// World-space corners of a volume enclosing this collider, used to
    /// query mesh BVHs. None for an empty mesh.
    pub fn query_corners(&self) -> Option<[Vec3; 8]> {
        let pose = &self.pose;
        match &self.collider.shape {
            CollisionShape::Box { half_extents } => {
                let h = *half_extents;
                let mut corners = [Vec3::zeros(); 8];
                for (i, corner) in corners.iter_mut().enumerate() {
                    let local = Vec3::new(
                        if i & 1 == 0 { -h.x } else { h.x },
                        if i & 2 == 0 { -h.y } else { h.y },
                        if i & 4 == 0 { -h.z } else { h.z },
                    );
                    *corner = pose.position + pose.rotation * local;
                }
                Some(corners)
            }
            CollisionShape::Sphere { radius } => {
                let r = Vec3::repeat(*radius);
                Some(super::aabb::AABB::new(pose.position - r, pose.position + r).corners())
            }
            CollisionShape::Mesh(mesh) => mesh.world_corners(&pose.matrix()),
            CollisionShape::Ray(ray) => Some(ray.world_ray(pose).bounds().corners()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shape_kinds() {
        assert_eq!(CollisionShape::box_shape(Vec3::repeat(1.0)).kind(), ShapeKind::Box);
        assert_eq!(CollisionShape::sphere(1.0).kind(), ShapeKind::Sphere);
        assert_eq!(CollisionShape::mesh(TriangleMesh::quad(1.0)).kind(), ShapeKind::Mesh);
        assert_eq!(CollisionShape::ray(-Vec3::y(), 1.0).kind(), ShapeKind::Ray);
    }

    #[test]
    fn test_pose_applies_offsets() {
        let transform = Transform::from_position_euler(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0));
        let collider = Collider::new(CollisionShape::sphere(1.0))
            .with_position_offset(Vec3::new(0.0, 0.0, 1.0));

        let pose = collider.pose(&transform);
        // +z rotated 90 degrees about y lands on +x
        assert_relative_eq!(pose.position, Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_box_inertia_with_offset() {
        let collider = Collider::new(CollisionShape::box_shape(Vec3::new(0.5, 0.5, 0.5)));
        let inertia = collider.inertia_tensor(6.0);
        assert_relative_eq!(inertia, Mat3::identity(), epsilon = 1e-6);

        let shifted = collider.with_position_offset(Vec3::new(0.0, 2.0, 0.0));
        let inertia = shifted.inertia_tensor(6.0);
        // Parallel axis adds m * d^2 about x and z only
        assert_relative_eq!(inertia[(0, 0)], 1.0 + 24.0, epsilon = 1e-5);
        assert_relative_eq!(inertia[(1, 1)], 1.0, epsilon = 1e-5);
        assert_relative_eq!(inertia[(2, 2)], 1.0 + 24.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_and_ray_inertia() {
        let sphere = Collider::new(CollisionShape::sphere(2.0));
        assert_relative_eq!(sphere.inertia_tensor(5.0), Mat3::identity() * 8.0, epsilon = 1e-5);

        let ray = Collider::new(CollisionShape::ray(-Vec3::y(), 1.0));
        assert_relative_eq!(ray.inertia_tensor(100.0), Mat3::identity() * 0.1);
    }

    #[test]
    fn test_pose_matrix_matches_transform() {
        let transform = Transform::from_position_euler(Vec3::new(0.0, 2.0, 0.0), Vec3::new(30.0, 0.0, 0.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));
        let collider = Collider::new(CollisionShape::mesh(TriangleMesh::quad(1.0)));
        let pose = collider.pose(&transform);
        assert_relative_eq!(pose.matrix(), transform.to_matrix(), epsilon = 1e-5);
    }

    #[test]
    fn test_ray_shape_follows_rotation() {
        let transform = Transform::from_position_euler(Vec3::zeros(), Vec3::new(0.0, 0.0, 90.0));
        let collider = Collider::new(CollisionShape::ray(Vec3::new(0.0, -1.0, 0.0), 2.0));
        let CollisionShape::Ray(ray) = &collider.shape else {
            unreachable!()
        };
        let world = ray.world_ray(&collider.pose(&transform));
        // -y rotated 90 degrees about z points to +x
        assert_relative_eq!(world.direction, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(world.length, 2.0);
    }

    #[test]
    fn test_sphere_query_corners() {
        let collider = Collider::new(CollisionShape::sphere(1.0));
        let corners = collider.at(&Transform::from_position(Vec3::new(0.0, 3.0, 0.0))).query_corners().unwrap();
        assert_relative_eq!(corners[0], Vec3::new(-1.0, 2.0, -1.0));
        assert_relative_eq!(corners[7], Vec3::new(1.0, 4.0, 1.0));
    }
}
