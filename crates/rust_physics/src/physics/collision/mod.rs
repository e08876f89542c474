//! Collision detection between boxes, spheres, triangle meshes and rays
//!
//! # Architecture
//!
//! - **Model Space Storage**: Collision shapes stored in local coordinates
//! - **On-Demand Transformation**: Shapes are posed in world space only during tests
//! - **Coordinate Decoupling**: Shape geometry separate from the entity [`Transform`](crate::foundation::math::Transform)
//!
//! # Module Organization
//!
//! - [`geometry`] - Triangle primitives and distance helpers
//! - [`tri_tri`] - Triangle-triangle overlap
//! - [`aabb`], [`bvh`] - Bounding volumes and the per-mesh hierarchy
//! - [`mesh`] - Triangle meshes and the BVH-backed mesh shape
//! - [`shape`] - Shapes, colliders and their world poses
//! - [`narrow_phase`] - Pairwise collision tests

pub mod aabb;
pub mod bvh;
pub mod contact;
pub mod geometry;
pub mod mesh;
pub mod narrow_phase;
pub mod ray;
pub mod shape;
pub mod tri_tri;

// Re-export commonly used types
pub use aabb::AABB;
pub use bvh::Bvh;
pub use contact::{Contact, NormalFacing};
pub use geometry::Triangle;
pub use mesh::{Face, MeshShape, TriangleMesh, Vertex};
pub use narrow_phase::{is_colliding, ray_collision, ContactSettings};
pub use ray::{Ray, RayHit};
pub use shape::{Collider, ColliderPose, CollisionShape, RayShape, ShapeKind, WorldCollider};
