//! Rigid-body state, integration and impulse response
//!
//! A body does not own its pose. The world hands it the entity transform for
//! integration and its world position as the center of mass for contact
//! response.
//!
//! # Step contract
//!
//! Force and torque accumulators are written between [`RigidBody::clear_forces`]
//! of the previous step and [`RigidBody::integrate`] of the current step.
//! Within one fixed step the world runs the collision pass of every body,
//! then integrates every body, then clears every accumulator.

use log::warn;

use crate::config::RigidBodyConfig;
use crate::foundation::math::{clamp_symmetric, Mat3, Quat, Quaternion, Transform, Vec3};
use crate::physics::collision::{Collider, Contact};
use crate::PhysicsError;

/// Tangential speeds below this skip dynamic-dynamic friction
const DYNAMIC_FRICTION_EPSILON: f32 = 1e-6;

/// Tangential speeds below this skip dynamic-static friction
const STATIC_FRICTION_EPSILON: f32 = 1e-4;

/// Default per-axis angular velocity bound in radians per second
pub const DEFAULT_MAX_ANGULAR_VELOCITY: f32 = 90.0;

/// Rigid body simulated with semi-implicit Euler
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// Mass in kilograms
    pub mass: f32,
    /// Coulomb friction coefficient
    pub friction: f32,
    /// Restitution coefficient
    pub restitution: f32,
    /// Per-step linear velocity factor (1 = no damping)
    pub linear_damping: f32,
    /// Per-step angular momentum factor (1 = no damping)
    pub angular_damping: f32,
    /// Constant acceleration, gravity by default
    pub acceleration: Vec3,
    /// Linear velocity
    pub velocity: Vec3,
    /// Angular velocity in world space
    pub angular_velocity: Vec3,
    /// Angular momentum in world space
    pub angular_momentum: Vec3,
    /// Per-axis angular velocity bound
    pub max_angular_velocity: f32,

    is_static: bool,
    rotation_locked: bool,
    inertia_mass: Option<f32>,
    force: Vec3,
    torque: Vec3,
    inv_inertia_body: Mat3,
    inv_inertia_world: Mat3,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::from_config(&RigidBodyConfig::default())
    }
}

impl RigidBody {
    /// Dynamic body of the given mass with default material
    pub fn new(mass: f32) -> Self {
        Self {
            mass,
            ..Self::default()
        }
    }

    /// Body built from configuration defaults
    ///
    /// The inverse inertia starts as identity until [`RigidBody::update_inertia`]
    /// computes it from a collider.
    pub fn from_config(config: &RigidBodyConfig) -> Self {
        Self {
            mass: config.mass,
            friction: config.friction,
            restitution: config.restitution,
            linear_damping: config.linear_damping,
            angular_damping: config.angular_damping,
            acceleration: Vec3::new(0.0, -9.81, 0.0),
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            angular_momentum: Vec3::zeros(),
            max_angular_velocity: DEFAULT_MAX_ANGULAR_VELOCITY,
            is_static: false,
            rotation_locked: false,
            inertia_mass: None,
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
            inv_inertia_body: Mat3::identity(),
            inv_inertia_world: Mat3::identity(),
        }
    }

    /// Immovable body
    pub fn static_body() -> Self {
        let mut body = Self::default();
        body.set_static(true);
        body
    }

    /// Builder-style acceleration setter
    pub fn with_acceleration(mut self, acceleration: Vec3) -> Self {
        self.acceleration = acceleration;
        self
    }

    /// Builder-style friction setter
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Builder-style restitution setter
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Builder-style damping setter
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Builder-style initial velocity
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Compute the inertia tensor from this mass instead of the body mass
    pub fn with_inertia_mass(mut self, mass: f32) -> Self {
        self.inertia_mass = Some(mass);
        self
    }

    /// Builder-style angular velocity bound
    pub fn with_max_angular_velocity(mut self, limit: f32) -> Self {
        self.max_angular_velocity = limit;
        self
    }

    /// True for immovable bodies
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Make the body static (zeroes its motion) or dynamic
    pub fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
        if is_static {
            self.velocity = Vec3::zeros();
            self.angular_velocity = Vec3::zeros();
            self.angular_momentum = Vec3::zeros();
        }
    }

    /// True when angular motion is disabled
    pub fn is_rotation_locked(&self) -> bool {
        self.rotation_locked
    }

    /// Disable or enable angular motion
    pub fn lock_rotation(&mut self, locked: bool) {
        self.rotation_locked = locked;
        if locked {
            self.angular_velocity = Vec3::zeros();
            self.angular_momentum = Vec3::zeros();
        }
    }

    /// Inverse mass, zero for static bodies
    pub fn inv_mass(&self) -> f32 {
        if self.is_static || self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Accumulated force for the current step
    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Accumulated torque for the current step
    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    /// Body-space inverse inertia tensor
    pub fn inverse_inertia_body(&self) -> Mat3 {
        self.inv_inertia_body
    }

    /// World-space inverse inertia tensor as of the last integration
    pub fn inverse_inertia_world(&self) -> Mat3 {
        self.inv_inertia_world
    }

    /// Change the mass and recompute inertia from `collider` at `rotation`
    pub fn set_mass(&mut self, mass: f32, collider: &Collider, rotation: &Mat3) -> Result<(), PhysicsError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(PhysicsError::InvalidMass(mass));
        }
        self.mass = mass;
        self.update_inertia(collider, rotation);
        Ok(())
    }

    /// Recompute the inverse inertia tensor from `collider`
    ///
    /// The world-space tensor is rotated by the body's current `rotation`.
    pub fn update_inertia(&mut self, collider: &Collider, rotation: &Mat3) {
        let tensor = collider.inertia_tensor(self.inertia_mass.unwrap_or(self.mass));
        self.inv_inertia_body = tensor.try_inverse().unwrap_or_else(|| {
            warn!("Inertia tensor is singular, body will not rotate");
            Mat3::zeros()
        });
        self.refresh_world_inertia(rotation);
    }

    /// Carry the body-space inverse inertia into world space
    pub fn refresh_world_inertia(&mut self, rotation: &Mat3) {
        self.inv_inertia_world = rotation * self.inv_inertia_body * rotation.transpose();
    }

    /// Add a force through the center of mass
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Add a torque
    pub fn add_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    /// Add a force applied at a world point
    pub fn apply_force_at_point(&mut self, force: Vec3, point: Vec3, center_of_mass: Vec3) {
        self.force += force;
        self.torque += (point - center_of_mass).cross(&force);
    }

    /// Instantaneous linear impulse
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if self.is_static {
            return;
        }
        self.velocity += impulse * self.inv_mass();
    }

    /// Instantaneous angular impulse
    pub fn apply_torque_impulse(&mut self, impulse: Vec3) {
        if self.is_static || self.rotation_locked {
            return;
        }
        self.angular_momentum += impulse;
        self.angular_velocity = self.inv_inertia_world * self.angular_momentum;
    }

    /// Velocity of a world point rigidly attached to the body
    pub fn velocity_at_point(&self, point: Vec3, center_of_mass: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(&(point - center_of_mass))
    }

    /// Advance one fixed step
    ///
    /// Adds `mass * acceleration` to the accumulated force, then integrates
    /// velocity before position and angular momentum before orientation.
    /// Static bodies are left untouched.
    pub fn integrate(&mut self, transform: &mut Transform, dt: f32) {
        if self.is_static {
            return;
        }

        self.force += self.acceleration * self.mass;
        self.velocity += self.force * self.inv_mass() * dt;
        self.velocity *= self.linear_damping;
        transform.position += self.velocity * dt;

        if self.rotation_locked {
            return;
        }

        self.angular_momentum += self.torque * dt;
        self.refresh_world_inertia(&transform.rotation_matrix());
        self.angular_velocity = self.inv_inertia_world * self.angular_momentum;
        self.angular_momentum *= self.angular_damping;

        let limit = Vec3::repeat(self.max_angular_velocity);
        if let Some(inertia_world) = self.inv_inertia_world.try_inverse() {
            self.angular_momentum = clamp_symmetric(self.angular_momentum, inertia_world * limit);
        }
        self.angular_velocity = clamp_symmetric(self.angular_velocity, limit);

        let q = transform.rotation.into_inner();
        let w = self.angular_velocity;
        let spin = Quaternion::new(0.0, w.x, w.y, w.z) * q * (0.5 * dt);
        transform.rotation = Quat::new_normalize(q + spin);
    }

    /// Reset the force and torque accumulators
    pub fn clear_forces(&mut self) {
        self.force = Vec3::zeros();
        self.torque = Vec3::zeros();
    }

    fn angular_inv_inertia(&self) -> Mat3 {
        if self.is_static || self.rotation_locked {
            Mat3::zeros()
        } else {
            self.inv_inertia_world
        }
    }

    /// Impulse response between this body and another dynamic body
    ///
    /// `contact` is the result of testing this body's collider against
    /// `other`'s. Restitution is the smaller of the two; friction is the mean.
    pub fn resolve_dynamic(
        &mut self,
        center: Vec3,
        other: &mut RigidBody,
        other_center: Vec3,
        contact: &Contact,
    ) {
        let normal = contact.push_direction();
        let r_a = contact.point - center;
        let r_b = contact.point - other_center;

        let relative = self.velocity_at_point(contact.point, center) - other.velocity_at_point(contact.point, other_center);
        let normal_speed = relative.dot(&normal);
        if normal_speed >= 0.0 {
            return;
        }

        let (inv_m_a, inv_m_b) = (self.inv_mass(), other.inv_mass());
        let inv_i_a = self.angular_inv_inertia();
        let inv_i_b = other.angular_inv_inertia();
        let effective = |dir: Vec3| {
            inv_m_a
                + inv_m_b
                + dir.dot(&(inv_i_a * r_a.cross(&dir)).cross(&r_a))
                + dir.dot(&(inv_i_b * r_b.cross(&dir)).cross(&r_b))
        };

        let denominator = effective(normal);
        if denominator <= 0.0 {
            return;
        }

        let restitution = self.restitution.min(other.restitution);
        let j = -(1.0 + restitution) * normal_speed / denominator;
        let impulse = normal * j;
        self.apply_impulse(impulse);
        self.apply_torque_impulse(r_a.cross(&impulse));
        other.apply_impulse(-impulse);
        other.apply_torque_impulse(-r_b.cross(&impulse));

        // Coulomb friction along the remaining sliding direction
        let relative = self.velocity_at_point(contact.point, center) - other.velocity_at_point(contact.point, other_center);
        let sliding = relative - normal * relative.dot(&normal);
        let Some(tangent) = sliding.try_normalize(DYNAMIC_FRICTION_EPSILON) else {
            return;
        };

        let denominator = effective(tangent);
        if denominator <= 0.0 {
            return;
        }

        let friction = (self.friction + other.friction) * 0.5;
        let limit = (j * friction).abs();
        let jt = (-relative.dot(&tangent) / denominator).clamp(-limit, limit);
        let impulse = tangent * jt;
        self.apply_impulse(impulse);
        self.apply_torque_impulse(r_a.cross(&impulse));
        other.apply_impulse(-impulse);
        other.apply_torque_impulse(-r_b.cross(&impulse));
    }

    /// Impulse response against immovable geometry
    pub fn resolve_static(&mut self, center: Vec3, contact: &Contact) {
        if self.is_static {
            return;
        }

        let normal = contact.push_direction();
        let r = contact.point - center;

        let normal_speed = self.velocity_at_point(contact.point, center).dot(&normal);
        if normal_speed >= 0.0 {
            return;
        }

        let inv_m = self.inv_mass();
        let inv_i = self.angular_inv_inertia();
        let effective = |dir: Vec3| inv_m + dir.dot(&(inv_i * r.cross(&dir)).cross(&r));

        let denominator = effective(normal);
        if denominator <= 0.0 {
            return;
        }

        let j = -(1.0 + self.restitution) * normal_speed / denominator;
        let impulse = normal * j;
        self.apply_impulse(impulse);
        self.apply_torque_impulse(r.cross(&impulse));

        let velocity = self.velocity_at_point(contact.point, center);
        let sliding = velocity - normal * velocity.dot(&normal);
        let Some(tangent) = sliding.try_normalize(STATIC_FRICTION_EPSILON) else {
            return;
        };

        let denominator = effective(tangent);
        if denominator <= 0.0 {
            return;
        }

        let limit = (j * self.friction).abs();
        let jt = (-velocity.dot(&tangent) / denominator).clamp(-limit, limit);
        let impulse = tangent * jt;
        self.apply_impulse(impulse);
        self.apply_torque_impulse(r.cross(&impulse));
    }

    /// Extra linear impulse for probe rays, cancelling motion into the surface
    pub fn resolve_probe(&mut self, normal: Vec3) {
        if self.is_static {
            return;
        }

        let normal_speed = self.velocity.dot(&normal);
        if normal_speed < 0.0 {
            let j = -(1.0 + self.restitution) * normal_speed * self.mass;
            self.apply_impulse(normal * j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::rotation_from_euler_degrees;
    use crate::physics::collision::{CollisionShape, NormalFacing};
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn sphere_body(mass: f32) -> RigidBody {
        let mut body = RigidBody::new(mass);
        body.update_inertia(&Collider::new(CollisionShape::sphere(1.0)), &Mat3::identity());
        body
    }

    fn ground_contact(point: Vec3) -> Contact {
        Contact::new(point, Vec3::y(), 0.05, NormalFacing::OtherToSelf)
    }

    #[test]
    fn test_free_fall_is_semi_implicit() {
        let mut body = sphere_body(2.0);
        let mut transform = Transform::from_position(Vec3::new(0.0, 10.0, 0.0));

        body.integrate(&mut transform, DT);
        assert_relative_eq!(body.velocity, Vec3::new(0.0, -9.81 * DT, 0.0), epsilon = 1e-6);
        assert_relative_eq!(transform.position.y, 10.0 - 9.81 * DT * DT, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_spin_keeps_orientation() {
        let mut body = sphere_body(1.0).with_acceleration(Vec3::zeros());
        let rotation = rotation_from_euler_degrees(Vec3::new(10.0, 20.0, 30.0));
        let mut transform = Transform::from_position_rotation(Vec3::zeros(), rotation);

        for dt in [DT, 0.5, 3.0] {
            body.integrate(&mut transform, dt);
        }
        assert_relative_eq!(transform.rotation.into_inner(), rotation.into_inner(), epsilon = 1e-6);
    }

    #[test]
    fn test_static_body_does_not_move() {
        let mut body = RigidBody::static_body();
        let mut transform = Transform::identity();
        body.add_force(Vec3::new(100.0, 0.0, 0.0));
        body.integrate(&mut transform, DT);
        assert_relative_eq!(transform.position, Vec3::zeros());
        assert_relative_eq!(body.inv_mass(), 0.0);
    }

    #[test]
    fn test_inelastic_ground_impact() {
        let mut body = sphere_body(1.0).with_restitution(0.0).with_velocity(Vec3::new(0.0, -5.0, 0.0));
        let center = Vec3::new(0.0, 0.95, 0.0);
        body.resolve_static(center, &ground_contact(Vec3::zeros()));

        assert!(body.velocity.y >= 0.0);
        assert!(body.velocity.y.abs() < 5.0);
    }

    #[test]
    fn test_elastic_ground_impact_reflects() {
        let mut body = sphere_body(1.0).with_restitution(1.0).with_velocity(Vec3::new(0.0, -5.0, 0.0));
        body.resolve_static(Vec3::new(0.0, 0.95, 0.0), &ground_contact(Vec3::zeros()));
        assert_relative_eq!(body.velocity, Vec3::new(0.0, 5.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_separating_contact_is_ignored() {
        let mut body = sphere_body(1.0).with_velocity(Vec3::new(0.0, 2.0, 0.0));
        body.resolve_static(Vec3::new(0.0, 0.95, 0.0), &ground_contact(Vec3::zeros()));
        assert_relative_eq!(body.velocity, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_friction_slows_sliding() {
        let mut body = sphere_body(1.0)
            .with_restitution(0.0)
            .with_velocity(Vec3::new(3.0, -1.0, 0.0));
        body.lock_rotation(true);
        body.resolve_static(Vec3::new(0.0, 0.95, 0.0), &ground_contact(Vec3::zeros()));

        // Normal impulse is 1, so friction removes at most 0.9 of the slide
        assert_relative_eq!(body.velocity.x, 3.0 - 0.9, epsilon = 1e-5);
        assert_relative_eq!(body.velocity.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_head_on_elastic_pair_swaps_velocities() {
        let mut a = sphere_body(1.0).with_restitution(1.0).with_velocity(Vec3::new(1.0, 0.0, 0.0));
        let mut b = sphere_body(1.0).with_restitution(1.0).with_velocity(Vec3::new(-1.0, 0.0, 0.0));
        let contact = Contact::new(Vec3::new(0.5, 0.0, 0.0), Vec3::x(), 0.1, NormalFacing::SelfToOther);

        a.resolve_dynamic(Vec3::zeros(), &mut b, Vec3::new(1.0, 0.0, 0.0), &contact);
        assert_relative_eq!(a.velocity, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(b.velocity, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_off_center_force_spins() {
        let mut body = sphere_body(1.0).with_acceleration(Vec3::zeros());
        body.apply_force_at_point(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), Vec3::zeros());
        assert_relative_eq!(body.torque(), Vec3::new(0.0, -1.0, 0.0));

        let mut transform = Transform::identity();
        body.integrate(&mut transform, DT);
        assert!(body.angular_velocity.y < 0.0);

        body.clear_forces();
        assert_relative_eq!(body.force(), Vec3::zeros());
        assert_relative_eq!(body.torque(), Vec3::zeros());
    }

    #[test]
    fn test_angular_velocity_is_bounded() {
        let mut body = sphere_body(1.0).with_acceleration(Vec3::zeros());
        body.angular_momentum = Vec3::new(1.0e4, -1.0e4, 0.0);
        let mut transform = Transform::identity();
        body.integrate(&mut transform, DT);

        assert!(body.angular_velocity.x <= DEFAULT_MAX_ANGULAR_VELOCITY + 1e-3);
        assert!(body.angular_velocity.y >= -DEFAULT_MAX_ANGULAR_VELOCITY - 1e-3);
        assert_relative_eq!(transform.rotation.into_inner().norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_locked_rotation_ignores_torque() {
        let mut body = sphere_body(1.0);
        body.lock_rotation(true);
        body.apply_torque_impulse(Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(body.angular_momentum, Vec3::zeros());
    }

    #[test]
    fn test_set_mass_validates() {
        let collider = Collider::new(CollisionShape::sphere(1.0));
        let mut body = RigidBody::new(1.0);
        let identity = Mat3::identity();
        assert!(matches!(body.set_mass(0.0, &collider, &identity), Err(PhysicsError::InvalidMass(_))));
        assert!(body.set_mass(5.0, &collider, &identity).is_ok());
        // 2/5 m r^2 = 2
        assert_relative_eq!(body.inverse_inertia_body(), Mat3::identity() * 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_set_mass_rotates_world_inertia() {
        let collider = Collider::new(CollisionShape::box_shape(Vec3::new(2.0, 0.5, 0.5)));
        let rotation = rotation_from_euler_degrees(Vec3::new(0.0, 0.0, 90.0))
            .to_rotation_matrix()
            .into_inner();
        let mut body = RigidBody::new(1.0);
        body.set_mass(3.0, &collider, &rotation).unwrap();

        let body_space = body.inverse_inertia_body();
        let expected = rotation * body_space * rotation.transpose();
        assert_relative_eq!(body.inverse_inertia_world(), expected, epsilon = 1e-5);

        // A long box turned onto the y axis swaps its x and y resistance
        assert_relative_eq!(body.inverse_inertia_world()[(1, 1)], body_space[(0, 0)], epsilon = 1e-5);
        assert_relative_eq!(body.inverse_inertia_world()[(0, 0)], body_space[(1, 1)], epsilon = 1e-5);
        assert!((body_space[(0, 0)] - body_space[(1, 1)]).abs() > 0.1);
    }

    #[test]
    fn test_suspension_impulse_cancels_approach() {
        let mut body = RigidBody::new(2.0).with_restitution(0.0).with_velocity(Vec3::new(1.0, -3.0, 0.0));
        body.resolve_probe(Vec3::y());
        assert_relative_eq!(body.velocity, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }
}
