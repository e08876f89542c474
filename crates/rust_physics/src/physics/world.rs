//! Physics world: entity arena, fixed-step driver and scene queries
//!
//! Entities live in a [`SlotMap`] and are addressed by stable [`EntityKey`]
//! handles. Each fixed step runs, in arena order, the collision pass of every
//! entity with a rigid body, then integrates every body, then clears every
//! force accumulator. Penetration resolved for an early body is visible to
//! the bodies tested after it within the same step.

use std::collections::HashSet;

use log::{debug, trace, warn};
use slotmap::{new_key_type, SlotMap};

use crate::config::PhysicsConfig;
use crate::foundation::math::{Transform, Vec3};
use crate::foundation::time::FixedTimestep;
use crate::physics::collision::{
    is_colliding, Collider, CollisionShape, Contact, ContactSettings, Ray,
};
use crate::physics::raycast::{RaycastHit, RaycastSystem};
use crate::physics::rigid_body::RigidBody;
use crate::PhysicsError;

new_key_type! {
    /// Stable handle to an entity in a [`PhysicsWorld`]
    pub struct EntityKey;
}

/// Receives a notification for every collision its entity takes part in
///
/// Listeners on both entities of a pair see the same event; `owner` tells a
/// listener which side it is on.
pub trait CollisionListener {
    /// Called once per hit during a fixed step
    fn on_collision(&mut self, owner: EntityKey, event: &CollisionEvent);
}

/// One hit recorded during a fixed step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    /// Entity whose collider was tested
    pub entity: EntityKey,
    /// Entity it was tested against
    pub other: EntityKey,
    /// Contact from `entity`'s point of view
    pub contact: Contact,
}

/// Unordered pair of colliding entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionPair {
    /// Smaller key of the two
    pub entity_a: EntityKey,
    /// Larger key of the two
    pub entity_b: EntityKey,
}

impl CollisionPair {
    /// Create a new collision pair (always stores the smaller key first for consistency)
    pub fn new(entity_a: EntityKey, entity_b: EntityKey) -> Self {
        if entity_a < entity_b {
            Self { entity_a, entity_b }
        } else {
            Self { entity_a: entity_b, entity_b: entity_a }
        }
    }

    /// True if `entity` is one of the pair
    pub fn contains(&self, entity: EntityKey) -> bool {
        self.entity_a == entity || self.entity_b == entity
    }
}

/// Arena slot
pub(crate) struct Entity {
    pub(crate) transform: Transform,
    pub(crate) parent: Option<EntityKey>,
    pub(crate) collider: Option<Collider>,
    pub(crate) body: Option<RigidBody>,
    pub(crate) listeners: Vec<Box<dyn CollisionListener>>,
    pub(crate) alive: bool,
}

impl Entity {
    fn new(transform: Transform) -> Self {
        Self {
            transform,
            parent: None,
            collider: None,
            body: None,
            listeners: Vec::new(),
            alive: true,
        }
    }
}

/// World transform of `key`, composed through its live ancestors
pub(crate) fn compose_world_transform(entities: &SlotMap<EntityKey, Entity>, key: EntityKey) -> Option<Transform> {
    let entity = entities.get(key).filter(|e| e.alive)?;
    let mut transform = entity.transform.clone();
    let mut parent = entity.parent;

    while let Some(parent_key) = parent {
        let Some(ancestor) = entities.get(parent_key).filter(|e| e.alive) else {
            break;
        };
        transform = ancestor.transform.combine(&transform);
        parent = ancestor.parent;
    }

    Some(transform)
}

/// Everything the response needs from one narrow-phase hit
struct PairHit {
    contact: Contact,
    center: Vec3,
    other_center: Vec3,
    is_trigger: bool,
    is_probe: bool,
}

/// Scene façade over entities, colliders and rigid bodies
pub struct PhysicsWorld {
    config: PhysicsConfig,
    settings: ContactSettings,
    clock: FixedTimestep,
    entities: SlotMap<EntityKey, Entity>,
    raycaster: RaycastSystem,
    events: Vec<CollisionEvent>,
    current_pairs: HashSet<CollisionPair>,
    previous_pairs: HashSet<CollisionPair>,
    step_count: u64,
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate().map_err(PhysicsError::InvalidConfig)?;

        Ok(Self {
            settings: ContactSettings::from(&config),
            clock: FixedTimestep::new(config.fixed_delta_time, config.max_substeps),
            config,
            entities: SlotMap::with_key(),
            raycaster: RaycastSystem::new(),
            events: Vec::new(),
            current_pairs: HashSet::new(),
            previous_pairs: HashSet::new(),
            step_count: 0,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Rigid body carrying the configured material, gravity and spin limit
    pub fn create_rigid_body(&self) -> RigidBody {
        RigidBody::from_config(&self.config.rigid_body)
            .with_acceleration(self.config.gravity())
            .with_max_angular_velocity(self.config.max_angular_velocity)
    }

    /// Add an entity with no components
    pub fn spawn(&mut self, transform: Transform) -> EntityKey {
        self.entities.insert(Entity::new(transform))
    }

    /// True for live entities
    pub fn contains(&self, key: EntityKey) -> bool {
        self.entities.get(key).is_some_and(|e| e.alive)
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.entities.values().filter(|e| e.alive).count()
    }

    /// Fixed steps run since creation
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    fn entity(&self, key: EntityKey) -> Result<&Entity, PhysicsError> {
        self.entities
            .get(key)
            .filter(|e| e.alive)
            .ok_or(PhysicsError::EntityNotFound(key))
    }

    fn entity_mut(&mut self, key: EntityKey) -> Result<&mut Entity, PhysicsError> {
        self.entities
            .get_mut(key)
            .filter(|e| e.alive)
            .ok_or(PhysicsError::EntityNotFound(key))
    }

    /// Local transform
    pub fn transform(&self, key: EntityKey) -> Option<&Transform> {
        self.entity(key).ok().map(|e| &e.transform)
    }

    /// Mutable local transform
    pub fn transform_mut(&mut self, key: EntityKey) -> Option<&mut Transform> {
        self.entity_mut(key).ok().map(|e| &mut e.transform)
    }

    /// Transform composed through the parent chain
    pub fn world_transform(&self, key: EntityKey) -> Option<Transform> {
        compose_world_transform(&self.entities, key)
    }

    /// Attach or replace the collider of an entity
    ///
    /// Mesh colliders take the configured BVH leaf size unless their BVH is
    /// already built. A body already on the entity has its inertia recomputed.
    pub fn attach_collider(&mut self, key: EntityKey, mut collider: Collider) -> Result<(), PhysicsError> {
        if let CollisionShape::Mesh(mesh) = &mut collider.shape {
            if mesh.mesh().is_empty() {
                warn!("Mesh collider for {key:?} has no triangles");
                return Err(PhysicsError::EmptyMesh);
            }
            if !mesh.is_built() {
                mesh.set_leaf_threshold(self.config.bvh_leaf_threshold);
            }
        }

        let entity = self.entity_mut(key)?;
        let rotation = entity.transform.rotation_matrix();
        if let Some(body) = entity.body.as_mut() {
            body.update_inertia(&collider, &rotation);
        }
        entity.collider = Some(collider);
        self.raycaster.clear_cache();
        Ok(())
    }

    /// Collider of an entity
    pub fn collider(&self, key: EntityKey) -> Option<&Collider> {
        self.entity(key).ok().and_then(|e| e.collider.as_ref())
    }

    /// Attach or replace the rigid body of an entity
    ///
    /// The entity needs a collider first; its inertia comes from the collider.
    pub fn attach_rigid_body(&mut self, key: EntityKey, mut body: RigidBody) -> Result<(), PhysicsError> {
        if !body.is_static() && !(body.mass.is_finite() && body.mass > 0.0) {
            return Err(PhysicsError::InvalidMass(body.mass));
        }

        let entity = self.entity_mut(key)?;
        let Some(collider) = entity.collider.as_ref() else {
            warn!("Rigid body on {key:?} has no collider");
            return Err(PhysicsError::MissingCollider(key));
        };

        body.update_inertia(collider, &entity.transform.rotation_matrix());
        entity.body = Some(body);
        Ok(())
    }

    /// Rigid body of an entity
    pub fn rigid_body(&self, key: EntityKey) -> Option<&RigidBody> {
        self.entity(key).ok().and_then(|e| e.body.as_ref())
    }

    /// Mutable rigid body of an entity
    pub fn rigid_body_mut(&mut self, key: EntityKey) -> Option<&mut RigidBody> {
        self.entity_mut(key).ok().and_then(|e| e.body.as_mut())
    }

    /// Change a body's mass and recompute its inertia from the entity collider
    pub fn set_mass(&mut self, key: EntityKey, mass: f32) -> Result<(), PhysicsError> {
        let entity = self.entity_mut(key)?;
        let rotation = entity.transform.rotation_matrix();
        let (Some(body), Some(collider)) = (entity.body.as_mut(), entity.collider.as_ref()) else {
            return Err(PhysicsError::MissingCollider(key));
        };
        body.set_mass(mass, collider, &rotation)
    }

    /// Parent `child` under `parent`, or detach it with `None`
    pub fn set_parent(&mut self, child: EntityKey, parent: Option<EntityKey>) -> Result<(), PhysicsError> {
        self.entity(child)?;

        if let Some(parent_key) = parent {
            self.entity(parent_key)?;

            let mut cursor = Some(parent_key);
            while let Some(key) = cursor {
                if key == child {
                    return Err(PhysicsError::ParentCycle { child, parent: parent_key });
                }
                cursor = self.entities.get(key).and_then(|e| e.parent);
            }
        }

        self.entity_mut(child)?.parent = parent;
        Ok(())
    }

    /// Register a collision listener on an entity
    pub fn add_listener(&mut self, key: EntityKey, listener: Box<dyn CollisionListener>) -> Result<(), PhysicsError> {
        self.entity_mut(key)?.listeners.push(listener);
        Ok(())
    }

    /// Build the entity's mesh BVH and compute its body inertia
    pub fn activate(&mut self, key: EntityKey) -> Result<(), PhysicsError> {
        let entity = self.entity_mut(key)?;
        if let Some(collider) = entity.collider.as_ref() {
            collider.activate();
            if let Some(body) = entity.body.as_mut() {
                body.update_inertia(collider, &entity.transform.rotation_matrix());
            }
        }
        Ok(())
    }

    /// [`PhysicsWorld::activate`] every live entity
    pub fn activate_all(&mut self) {
        let keys: Vec<EntityKey> = self.live_keys().collect();
        for key in keys {
            // Keys come from the live set, so lookups cannot fail
            let _ = self.activate(key);
        }
    }

    /// Mark an entity for removal at the end of the frame
    pub fn destroy(&mut self, key: EntityKey) -> Result<(), PhysicsError> {
        self.entity_mut(key)?.alive = false;
        self.raycaster.clear_cache();
        Ok(())
    }

    fn live_keys(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.entities.iter().filter(|(_, e)| e.alive).map(|(k, _)| k)
    }

    /// Advance by a frame of `frame_dt` seconds; returns the fixed steps run
    pub fn update(&mut self, frame_dt: f32) -> u32 {
        let steps = self.clock.accumulate(frame_dt);
        for _ in 0..steps {
            self.fixed_step();
        }
        trace!("Frame of {frame_dt:.4}s ran {steps} fixed steps");

        self.raycaster.clear_cache();
        let before = self.entities.len();
        self.entities.retain(|_, e| e.alive);
        let removed = before - self.entities.len();
        if removed > 0 {
            debug!("Removed {removed} destroyed entities");
        }

        steps
    }

    /// Run one fixed step: collisions, then integration, then accumulator reset
    pub fn fixed_step(&mut self) {
        self.previous_pairs = std::mem::take(&mut self.current_pairs);
        self.events.clear();

        let bodies: Vec<EntityKey> = self
            .entities
            .iter()
            .filter(|(_, e)| e.alive && e.body.is_some())
            .map(|(k, _)| k)
            .collect();

        for &key in &bodies {
            self.collision_pass(key);
        }

        let dt = self.config.fixed_delta_time;
        for &key in &bodies {
            if let Some(entity) = self.entities.get_mut(key) {
                if let Some(body) = entity.body.as_mut() {
                    body.integrate(&mut entity.transform, dt);
                }
            }
        }

        for &key in &bodies {
            if let Some(body) = self.entities.get_mut(key).and_then(|e| e.body.as_mut()) {
                body.clear_forces();
            }
        }

        self.step_count += 1;
    }

    /// Hits recorded during the last fixed step
    pub fn collision_events(&self) -> &[CollisionEvent] {
        &self.events
    }

    /// Pairs colliding in the last step but not the one before
    pub fn entered_pairs(&self) -> impl Iterator<Item = &CollisionPair> + '_ {
        self.current_pairs.difference(&self.previous_pairs)
    }

    /// Pairs colliding in the step before the last but not the last
    pub fn exited_pairs(&self) -> impl Iterator<Item = &CollisionPair> + '_ {
        self.previous_pairs.difference(&self.current_pairs)
    }

    /// True if the two entities collided during the last step
    pub fn are_colliding(&self, a: EntityKey, b: EntityKey) -> bool {
        self.current_pairs.contains(&CollisionPair::new(a, b))
    }

    /// Closest hit among all mesh colliders
    pub fn raycast(&mut self, origin: Vec3, direction: Vec3, max_length: f32) -> Option<RaycastHit> {
        let ray = Ray::new(origin, direction, max_length);
        self.raycaster.raycast(&self.entities, &ray)
    }

    fn collision_pass(&mut self, key: EntityKey) {
        let Some(entity) = self.entities.get(key) else {
            return;
        };
        if entity.collider.is_none() {
            warn!("Rigid body on {key:?} has no collider, skipping collision");
            return;
        }

        let others: Vec<EntityKey> = self
            .entities
            .iter()
            .filter(|(other, e)| *other != key && e.alive && e.collider.is_some())
            .map(|(k, _)| k)
            .collect();

        for other in others {
            let Some(hit) = self.test_pair(key, other) else {
                continue;
            };

            self.record(CollisionEvent {
                entity: key,
                other,
                contact: hit.contact,
            });

            if !hit.is_trigger {
                self.respond(key, other, &hit);
            }
        }
    }

    fn test_pair(&self, key: EntityKey, other: EntityKey) -> Option<PairHit> {
        let collider = self.entities.get(key)?.collider.as_ref()?;
        let other_collider = self.entities.get(other)?.collider.as_ref()?;
        if !collider.can_collide_with(other_collider) {
            return None;
        }

        let transform = self.world_transform(key)?;
        let other_transform = self.world_transform(other)?;

        let mut contact = is_colliding(
            &collider.at(&transform),
            &other_collider.at(&other_transform),
            &self.settings,
        )?;
        if let Some(normal) = contact.normal.try_normalize(f32::EPSILON) {
            contact.normal = normal;
        }

        Some(PairHit {
            contact,
            center: transform.position,
            other_center: other_transform.position,
            is_trigger: collider.is_trigger || other_collider.is_trigger,
            is_probe: matches!(collider.shape, CollisionShape::Ray(_)),
        })
    }

    fn record(&mut self, event: CollisionEvent) {
        self.current_pairs.insert(CollisionPair::new(event.entity, event.other));

        for owner in [event.entity, event.other] {
            if let Some(entity) = self.entities.get_mut(owner) {
                for listener in &mut entity.listeners {
                    listener.on_collision(owner, &event);
                }
            }
        }

        self.events.push(event);
    }

    /// World-space displacement of `key` expressed in its parent's frame
    fn local_offset(&self, key: EntityKey, offset: Vec3) -> Vec3 {
        let Some(parent) = self.entities.get(key).and_then(|e| e.parent) else {
            return offset;
        };
        let Some(parent_world) = compose_world_transform(&self.entities, parent) else {
            return offset;
        };

        let local = parent_world.rotation.inverse_transform_vector(&offset);
        local.zip_map(&parent_world.scale, |v, s| if s.abs() > f32::EPSILON { v / s } else { v })
    }

    fn respond(&mut self, key: EntityKey, other: EntityKey, hit: &PairHit) {
        let contact = &hit.contact;
        let push = contact.push_direction();
        let depth = contact.penetration_depth;

        let inv_mass_of = |k: EntityKey| self.entities.get(k).and_then(|e| e.body.as_ref()).map(RigidBody::inv_mass);
        if let Some(other_inv) = inv_mass_of(other) {
            let inv = inv_mass_of(key).unwrap_or(0.0);
            let total = inv + other_inv;
            let (shift, other_shift) = if total > 0.0 {
                (
                    self.local_offset(key, push * (depth * inv / total)),
                    self.local_offset(other, push * (depth * other_inv / total)),
                )
            } else {
                (Vec3::zeros(), Vec3::zeros())
            };

            let Some([entity, other_entity]) = self.entities.get_disjoint_mut([key, other]) else {
                return;
            };
            let (Some(body), Some(other_body)) = (entity.body.as_mut(), other_entity.body.as_mut()) else {
                return;
            };

            entity.transform.position += shift;
            other_entity.transform.position -= other_shift;

            body.resolve_dynamic(hit.center, other_body, hit.other_center, contact);
        } else {
            let shift = self.local_offset(key, push * depth);
            let Some(entity) = self.entities.get_mut(key) else {
                return;
            };
            let Some(body) = entity.body.as_mut() else {
                return;
            };
            if body.is_static() {
                return;
            }

            entity.transform.position += shift;
            body.resolve_static(hit.center, contact);
            if hit.is_probe {
                body.resolve_probe(push);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::TriangleMesh;
    use crate::physics::collision_layers::CollisionLayers;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn create_test_world() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsConfig::default()).unwrap()
    }

    fn spawn_ground(world: &mut PhysicsWorld, height: f32) -> EntityKey {
        let ground = world.spawn(Transform::from_position(Vec3::new(0.0, height, 0.0)));
        world
            .attach_collider(ground, Collider::new(CollisionShape::mesh(TriangleMesh::quad(50.0))))
            .unwrap();
        ground
    }

    fn spawn_ball(world: &mut PhysicsWorld, position: Vec3, collider: Collider) -> EntityKey {
        let ball = world.spawn(Transform::from_position(position));
        world.attach_collider(ball, collider).unwrap();
        let body = world.create_rigid_body();
        world.attach_rigid_body(ball, body).unwrap();
        ball
    }

    struct Recorder(Rc<RefCell<Vec<(EntityKey, EntityKey)>>>);

    impl CollisionListener for Recorder {
        fn on_collision(&mut self, owner: EntityKey, event: &CollisionEvent) {
            self.0.borrow_mut().push((owner, event.other));
        }
    }

    #[test]
    fn test_falling_sphere_settles_on_ground() {
        let mut world = create_test_world();
        spawn_ground(&mut world, 0.0);
        let ball = spawn_ball(&mut world, Vec3::new(0.3, 5.0, 0.2), Collider::new(CollisionShape::sphere(1.0)));
        world.activate_all();

        for _ in 0..600 {
            world.fixed_step();
        }

        let position = world.transform(ball).unwrap().position;
        assert!((position.y - 1.0).abs() < 0.05, "sphere rests at y = {}", position.y);
        // Dropped beside the quad's diagonal, it must not roll away
        assert_relative_eq!(position.x, 0.3, epsilon = 0.01);
        assert_relative_eq!(position.z, 0.2, epsilon = 0.01);
        let body = world.rigid_body(ball).unwrap();
        assert!(body.velocity.norm() < 0.5);
        assert!(body.angular_velocity.norm() < 0.1);
    }

    #[test]
    fn test_box_settles_on_ground_mesh() {
        let mut world = create_test_world();
        spawn_ground(&mut world, 0.0);
        let crate_box = spawn_ball(
            &mut world,
            Vec3::new(0.3, 3.0, 0.2),
            Collider::new(CollisionShape::box_shape(Vec3::repeat(0.5))),
        );
        world.activate_all();

        for _ in 0..600 {
            world.fixed_step();
        }

        let position = world.transform(crate_box).unwrap().position;
        assert!((position.y - 0.5).abs() < 0.05, "box rests at y = {}", position.y);
        assert_relative_eq!(position.x, 0.3, epsilon = 0.05);
        assert_relative_eq!(position.z, 0.2, epsilon = 0.05);
        assert!(world.rigid_body(crate_box).unwrap().velocity.norm() < 0.5);
    }

    #[test]
    fn test_mesh_cube_settles_on_ground_mesh() {
        let mut world = create_test_world();
        spawn_ground(&mut world, 0.0);
        let cube = spawn_ball(
            &mut world,
            Vec3::new(0.3, 3.0, 0.2),
            Collider::new(CollisionShape::mesh(TriangleMesh::cuboid(Vec3::repeat(0.5)))),
        );
        world.activate_all();

        for _ in 0..600 {
            world.fixed_step();
        }

        let position = world.transform(cube).unwrap().position;
        assert!((position.y - 0.5).abs() < 0.08, "cube rests at y = {}", position.y);
        assert_relative_eq!(position.x, 0.3, epsilon = 0.05);
        assert_relative_eq!(position.z, 0.2, epsilon = 0.05);
    }

    #[test]
    fn test_parented_body_is_pushed_in_world_space() {
        let mut world = create_test_world();
        spawn_ground(&mut world, 0.0);

        // Parent turned so the child's local x axis points up
        let rig = world.spawn(Transform::from_position_euler(Vec3::zeros(), Vec3::new(0.0, 0.0, 90.0)));
        let ball = world.spawn(Transform::from_position(Vec3::new(0.8, -0.3, 0.2)));
        world.set_parent(ball, Some(rig)).unwrap();
        world.attach_collider(ball, Collider::new(CollisionShape::sphere(1.0))).unwrap();
        let body = world.create_rigid_body().with_acceleration(Vec3::zeros());
        world.attach_rigid_body(ball, body).unwrap();

        assert_relative_eq!(world.world_transform(ball).unwrap().position, Vec3::new(0.3, 0.8, 0.2), epsilon = 1e-5);
        world.fixed_step();

        // Lifted straight up out of the ground, not sideways
        assert_relative_eq!(world.world_transform(ball).unwrap().position, Vec3::new(0.3, 1.0, 0.2), epsilon = 1e-4);
        assert_relative_eq!(world.transform(ball).unwrap().position, Vec3::new(1.0, -0.3, 0.2), epsilon = 1e-4);
    }

    #[test]
    fn test_box_rests_on_static_box() {
        let mut world = create_test_world();
        let floor = world.spawn(Transform::from_position(Vec3::new(0.0, -0.5, 0.0)));
        world
            .attach_collider(floor, Collider::new(CollisionShape::box_shape(Vec3::new(5.0, 0.5, 5.0))))
            .unwrap();
        world.attach_rigid_body(floor, RigidBody::static_body()).unwrap();

        let crate_box = spawn_ball(
            &mut world,
            Vec3::new(0.0, 2.0, 0.0),
            Collider::new(CollisionShape::box_shape(Vec3::repeat(0.5))),
        );

        for _ in 0..300 {
            world.fixed_step();
        }

        let y = world.transform(crate_box).unwrap().position.y;
        assert!((y - 0.5).abs() < 0.05, "box rests at y = {y}");
        assert_relative_eq!(world.transform(floor).unwrap().position.y, -0.5);
        assert!(world.are_colliding(floor, crate_box));
    }

    #[test]
    fn test_listeners_on_both_entities_are_notified() {
        let mut world = create_test_world();
        let ground = spawn_ground(&mut world, 0.0);
        let ball = spawn_ball(&mut world, Vec3::new(0.3, 0.9, 0.2), Collider::new(CollisionShape::sphere(1.0)));

        let seen = Rc::new(RefCell::new(Vec::new()));
        world.add_listener(ball, Box::new(Recorder(Rc::clone(&seen)))).unwrap();
        world.add_listener(ground, Box::new(Recorder(Rc::clone(&seen)))).unwrap();

        world.fixed_step();

        assert_eq!(*seen.borrow(), vec![(ball, ground), (ground, ground)]);
        assert_eq!(world.collision_events().len(), 1);
        assert_eq!(world.collision_events()[0].entity, ball);
        assert_eq!(world.entered_pairs().count(), 1);
    }

    #[test]
    fn test_pairs_enter_and_exit() {
        let mut world = create_test_world();
        let ground = spawn_ground(&mut world, 0.0);
        let ball = spawn_ball(&mut world, Vec3::new(0.3, 0.9, 0.2), Collider::new(CollisionShape::sphere(1.0)));

        world.fixed_step();
        assert_eq!(world.entered_pairs().copied().collect::<Vec<_>>(), vec![CollisionPair::new(ball, ground)]);

        world.transform_mut(ball).unwrap().position.y = 10.0;
        world.fixed_step();
        assert_eq!(world.exited_pairs().count(), 1);
        assert!(!world.are_colliding(ball, ground));
    }

    #[test]
    fn test_trigger_reports_without_response() {
        let mut world = create_test_world();
        let zone = world.spawn(Transform::identity());
        world
            .attach_collider(zone, Collider::new(CollisionShape::box_shape(Vec3::repeat(2.0))).as_trigger())
            .unwrap();
        let ball = spawn_ball(&mut world, Vec3::zeros(), Collider::new(CollisionShape::sphere(0.5)));

        world.fixed_step();

        assert_eq!(world.collision_events().len(), 1);
        // Only gravity acted on the ball
        assert_relative_eq!(world.rigid_body(ball).unwrap().velocity.y, -9.81 / 60.0, epsilon = 1e-5);
    }

    #[test]
    fn test_layers_filter_pairs() {
        let mut world = create_test_world();
        let ground = world.spawn(Transform::identity());
        world
            .attach_collider(
                ground,
                Collider::new(CollisionShape::mesh(TriangleMesh::quad(50.0)))
                    .with_layers(CollisionLayers::ENVIRONMENT, CollisionLayers::all()),
            )
            .unwrap();
        let ghost = spawn_ball(
            &mut world,
            Vec3::new(0.3, 0.9, 0.2),
            Collider::new(CollisionShape::sphere(1.0))
                .with_layers(CollisionLayers::DEBRIS, CollisionLayers::DYNAMIC),
        );

        world.fixed_step();
        assert!(world.collision_events().is_empty());
        assert!(world.transform(ghost).unwrap().position.y < 0.9);
    }

    #[test]
    fn test_raycast_returns_closest_hit() {
        let mut world = create_test_world();
        spawn_ground(&mut world, 0.0);
        let shelf = spawn_ground(&mut world, 2.0);

        let hit = world.raycast(Vec3::new(0.3, 10.0, 0.2), -Vec3::y(), 20.0).unwrap();
        assert_eq!(hit.entity, shelf);
        assert_relative_eq!(hit.distance, 8.0, epsilon = 1e-4);
        assert_relative_eq!(hit.point, Vec3::new(0.3, 2.0, 0.2), epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vec3::y(), epsilon = 1e-4);

        // Looking up from underneath the normal is flipped toward the ray
        let hit = world.raycast(Vec3::new(0.3, -1.0, 0.2), Vec3::y(), 20.0).unwrap();
        assert_relative_eq!(hit.normal, -Vec3::y(), epsilon = 1e-4);
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_raycast_rejects_invalid_rays() {
        let mut world = create_test_world();
        spawn_ground(&mut world, 0.0);

        assert!(world.raycast(Vec3::new(0.3, 10.0, 0.2), Vec3::zeros(), 20.0).is_none());
        assert!(world.raycast(Vec3::new(0.3, 10.0, 0.2), -Vec3::y(), 0.0).is_none());
        assert!(world.raycast(Vec3::new(0.3, 10.0, 0.2), -Vec3::y(), 5.0).is_none());
    }

    #[test]
    fn test_raycast_ignores_destroyed_ground() {
        let mut world = create_test_world();
        let ground = spawn_ground(&mut world, 0.0);
        assert!(world.raycast(Vec3::new(0.3, 1.0, 0.2), -Vec3::y(), 2.0).is_some());

        world.destroy(ground).unwrap();
        assert!(world.raycast(Vec3::new(0.3, 1.0, 0.2), -Vec3::y(), 2.0).is_none());

        world.update(0.0);
        assert_eq!(world.entity_count(), 0);
        assert!(matches!(world.activate(ground), Err(PhysicsError::EntityNotFound(_))));
    }

    #[test]
    fn test_parenting_composes_and_rejects_cycles() {
        let mut world = create_test_world();
        let root = world.spawn(Transform::from_position_euler(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0)));
        let child = world.spawn(Transform::from_position(Vec3::new(0.0, 0.0, 1.0)));

        world.set_parent(child, Some(root)).unwrap();
        let composed = world.world_transform(child).unwrap();
        assert_relative_eq!(composed.position, Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-5);

        assert!(matches!(
            world.set_parent(root, Some(child)),
            Err(PhysicsError::ParentCycle { .. })
        ));
        assert!(matches!(world.set_parent(root, Some(root)), Err(PhysicsError::ParentCycle { .. })));
    }

    #[test]
    fn test_attach_errors() {
        let mut world = create_test_world();
        let entity = world.spawn(Transform::identity());

        assert!(matches!(
            world.attach_rigid_body(entity, RigidBody::new(1.0)),
            Err(PhysicsError::MissingCollider(_))
        ));
        assert!(matches!(
            world.attach_collider(entity, Collider::new(CollisionShape::mesh(TriangleMesh::new(Vec::new())))),
            Err(PhysicsError::EmptyMesh)
        ));

        world.attach_collider(entity, Collider::new(CollisionShape::sphere(1.0))).unwrap();
        assert!(matches!(
            world.attach_rigid_body(entity, RigidBody::new(-1.0)),
            Err(PhysicsError::InvalidMass(_))
        ));
        world.attach_rigid_body(entity, RigidBody::new(2.0)).unwrap();
        world.set_mass(entity, 5.0).unwrap();
        assert_relative_eq!(world.rigid_body(entity).unwrap().mass, 5.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PhysicsConfig::default().with_fixed_delta_time(-1.0);
        assert!(matches!(PhysicsWorld::new(config), Err(PhysicsError::InvalidConfig(_))));
    }

    #[test]
    fn test_update_caps_substeps() {
        let mut world = create_test_world();
        assert_eq!(world.update(1.0), 3);
        assert_eq!(world.step_count(), 3);
        assert_eq!(world.update(0.001), 0);
    }

    #[test]
    fn test_activation_builds_mesh_bvh() {
        let mut world = create_test_world();
        let ground = spawn_ground(&mut world, 0.0);
        let mesh = world.collider(ground).unwrap().shape.as_mesh().unwrap();
        assert!(!mesh.is_built());
        assert_eq!(mesh.leaf_threshold(), world.config().bvh_leaf_threshold);

        world.activate(ground).unwrap();
        assert!(world.collider(ground).unwrap().shape.as_mesh().unwrap().is_built());
    }

    #[test]
    fn test_suspension_ray_holds_body_up() {
        let mut world = create_test_world();
        spawn_ground(&mut world, 0.0);
        let probe = spawn_ball(
            &mut world,
            Vec3::new(0.3, 0.5, 0.2),
            Collider::new(CollisionShape::ray(-Vec3::y(), 1.0)),
        );
        world.rigid_body_mut(probe).unwrap().velocity = Vec3::new(0.0, -2.0, 0.0);

        world.fixed_step();

        let event = world.collision_events()[0];
        assert_relative_eq!(event.contact.penetration_depth, 0.5, epsilon = 1e-4);
        // Pushed to the end of the ray, then gravity for one step
        assert!(world.transform(probe).unwrap().position.y > 0.95);
        assert!(world.rigid_body(probe).unwrap().velocity.y > -0.2);
    }
}
