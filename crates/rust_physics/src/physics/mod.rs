//! Physics module for collision detection and rigid-body response
//!
//! [`collision`] answers "do these two posed shapes touch, and how".
//! [`rigid_body`] integrates motion and turns contacts into impulses.
//! [`world`] owns entities and drives both at a fixed step.

pub mod collision;
pub mod collision_layers;
pub mod raycast;
pub mod rigid_body;
pub mod world;

pub use collision::{Collider, CollisionShape, Contact, NormalFacing, Ray, RayHit, TriangleMesh};
pub use collision_layers::CollisionLayers;
pub use raycast::{RaycastHit, RaycastSystem};
pub use rigid_body::RigidBody;
pub use world::{CollisionEvent, CollisionListener, CollisionPair, EntityKey, PhysicsWorld};
