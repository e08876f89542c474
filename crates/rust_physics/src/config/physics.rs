//! Simulation and rigid-body configuration

use serde::{Serialize, Deserialize};

use super::Config;
use crate::foundation::math::Vec3;

/// # Physics Configuration
///
/// World-level simulation parameters: step length, catch-up cap, gravity and
/// the numeric limits used by the collision and integration passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Length of one fixed step in seconds
    pub fixed_delta_time: f32,
    /// Maximum fixed steps run per frame before banked time is dropped
    pub max_substeps: u32,
    /// Gravitational acceleration given to bodies created by the world
    pub gravity: [f32; 3],
    /// Largest triangle count stored in one BVH leaf
    pub bvh_leaf_threshold: usize,
    /// Per-axis angular velocity bound in radians per second
    pub max_angular_velocity: f32,
    /// Mesh-mesh triangle contacts at or beyond this depth are left out of the depth aggregate
    pub mesh_contact_max_depth: f32,
    /// Defaults for bodies created through the world
    pub rigid_body: RigidBodyConfig,
}

impl PhysicsConfig {
    /// Set the fixed step length
    pub fn with_fixed_delta_time(mut self, dt: f32) -> Self {
        self.fixed_delta_time = dt;
        self
    }

    /// Set the per-frame step cap
    pub fn with_max_substeps(mut self, steps: u32) -> Self {
        self.max_substeps = steps;
        self
    }

    /// Set gravity
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = [gravity.x, gravity.y, gravity.z];
        self
    }

    /// Set the BVH leaf size
    pub fn with_bvh_leaf_threshold(mut self, threshold: usize) -> Self {
        self.bvh_leaf_threshold = threshold;
        self
    }

    /// Set rigid-body defaults
    pub fn with_rigid_body(mut self, rigid_body: RigidBodyConfig) -> Self {
        self.rigid_body = rigid_body;
        self
    }

    /// Gravity as a vector
    pub fn gravity(&self) -> Vec3 {
        Vec3::new(self.gravity[0], self.gravity[1], self.gravity[2])
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(self.fixed_delta_time.is_finite() && self.fixed_delta_time > 0.0) {
            return Err(format!("fixed_delta_time must be positive, got {}", self.fixed_delta_time));
        }
        if self.max_substeps == 0 {
            return Err("max_substeps must be at least 1".to_string());
        }
        if self.bvh_leaf_threshold == 0 {
            return Err("bvh_leaf_threshold must be at least 1".to_string());
        }
        if self.max_angular_velocity <= 0.0 {
            return Err(format!("max_angular_velocity must be positive, got {}", self.max_angular_velocity));
        }
        if self.mesh_contact_max_depth <= 0.0 {
            return Err(format!("mesh_contact_max_depth must be positive, got {}", self.mesh_contact_max_depth));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err("gravity must be finite".to_string());
        }
        self.rigid_body.validate()
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_delta_time: 1.0 / 60.0,
            max_substeps: 3,
            gravity: [0.0, -9.81, 0.0],
            bvh_leaf_threshold: 2,
            max_angular_velocity: 90.0,
            mesh_contact_max_depth: 1.0,
            rigid_body: RigidBodyConfig::default(),
        }
    }
}

impl Config for PhysicsConfig {}

/// # Rigid Body Configuration
///
/// Material and damping defaults. Damping values are multiplicative factors
/// applied once per fixed step, so `1.0` means no damping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBodyConfig {
    /// Mass in kilograms
    pub mass: f32,
    /// Coulomb friction coefficient in `[0, 1]`
    pub friction: f32,
    /// Restitution coefficient in `[0, 1]`
    pub restitution: f32,
    /// Per-step linear velocity factor
    pub linear_damping: f32,
    /// Per-step angular momentum factor
    pub angular_damping: f32,
}

impl RigidBodyConfig {
    /// Set the mass
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Set friction
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set restitution
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set both damping factors
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(format!("mass must be positive, got {}", self.mass));
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(format!("friction must be within [0, 1], got {}", self.friction));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(format!("restitution must be within [0, 1], got {}", self.restitution));
        }
        if !(0.0..=1.0).contains(&self.linear_damping) || !(0.0..=1.0).contains(&self.angular_damping) {
            return Err("damping factors must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

impl Default for RigidBodyConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            friction: 0.9,
            restitution: 0.1,
            linear_damping: 1.0,
            angular_damping: 1.0,
        }
    }
}

impl Config for RigidBodyConfig {}
