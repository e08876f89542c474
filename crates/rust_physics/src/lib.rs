//! # Rust Physics
//!
//! Collision detection and rigid-body dynamics for real-time simulation.
//!
//! ## Features
//!
//! - **Shape Collisions**: Oriented boxes, spheres, BVH-backed triangle meshes and rays
//! - **Rigid Bodies**: Semi-implicit Euler integration with quaternion orientation
//! - **Impulse Response**: Restitution and Coulomb friction for dynamic and static contacts
//! - **Scene Queries**: Fixed-step collision passes and closest-hit ray casts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_physics::prelude::*;
//!
//! fn main() -> Result<(), PhysicsError> {
//!     let mut world = PhysicsWorld::new(PhysicsConfig::default())?;
//!
//!     let ground = world.spawn(Transform::identity());
//!     world.attach_collider(ground, Collider::new(CollisionShape::mesh(TriangleMesh::quad(50.0))))?;
//!
//!     let ball = world.spawn(Transform::from_position(Vec3::new(0.0, 5.0, 0.0)));
//!     world.attach_collider(ball, Collider::new(CollisionShape::sphere(1.0)))?;
//!     world.attach_rigid_body(ball, RigidBody::new(1.0))?;
//!
//!     world.activate_all();
//!     for _ in 0..600 {
//!         world.fixed_step();
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod physics;

mod error;

pub use error::PhysicsError;

/// Common imports for physics users
pub mod prelude {
    pub use crate::{
        PhysicsError,
        config::{Config, ConfigError, PhysicsConfig, RigidBodyConfig},
        foundation::math::{Vec3, Mat3, Quat, Transform},
        physics::{
            PhysicsWorld, EntityKey, CollisionEvent, CollisionListener,
            RigidBody, RaycastHit,
            collision::{
                Collider, CollisionShape, Contact, NormalFacing, Ray,
                TriangleMesh, Face, Vertex,
            },
            collision_layers::CollisionLayers,
        },
    };
}
