//! Physics error types
//!
//! Only set-up operations return errors. Per-step collision and ray queries
//! degrade to "no hit" instead.

use crate::config::ConfigError;
use crate::physics::EntityKey;

/// Errors raised while configuring a physics world
#[derive(thiserror::Error, Debug)]
pub enum PhysicsError {
    /// The entity handle is stale or was never issued by this world
    #[error("Entity not found: {0:?}")]
    EntityNotFound(EntityKey),

    /// A rigid body was attached to an entity that has no collider
    #[error("Entity {0:?} has a rigid body but no collider")]
    MissingCollider(EntityKey),

    /// A mesh collider was given a mesh with no triangles
    #[error("Mesh collider has no triangles")]
    EmptyMesh,

    /// Mass must be positive and finite
    #[error("Invalid mass: {0}")]
    InvalidMass(f32),

    /// Parenting would create a cycle
    #[error("Parenting {child:?} under {parent:?} would create a cycle")]
    ParentCycle {
        /// Entity being re-parented
        child: EntityKey,
        /// Requested parent
        parent: EntityKey,
    },

    /// Configuration values failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be loaded or saved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
