//! Scene ray casts
//!
//! The set of ray-testable colliders is cached between casts and dropped by
//! [`RaycastSystem::clear_cache`], which the world calls once per frame and
//! whenever colliders change.

use log::trace;
use slotmap::SlotMap;

use crate::foundation::math::Vec3;
use crate::physics::collision::{ray_collision, CollisionShape, Ray};
use crate::physics::world::{compose_world_transform, Entity, EntityKey};

/// Closest hit of a scene ray cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Entity owning the hit collider
    pub entity: EntityKey,
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal facing back along the ray
    pub normal: Vec3,
    /// Distance along the ray
    pub distance: f32,
}

/// Closest-hit ray queries over every mesh collider in a scene
#[derive(Debug, Default)]
pub struct RaycastSystem {
    targets: Option<Vec<EntityKey>>,
}

impl RaycastSystem {
    /// Create a system with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cached collider list
    pub fn clear_cache(&mut self) {
        self.targets = None;
    }

    /// True while a collider list is cached
    pub fn is_cached(&self) -> bool {
        self.targets.is_some()
    }

    /// Globally closest hit of `ray` against the scene
    ///
    /// Rays with no direction or a non-positive length never hit.
    pub(crate) fn raycast(&mut self, entities: &SlotMap<EntityKey, Entity>, ray: &Ray) -> Option<RaycastHit> {
        if !ray.is_valid() {
            return None;
        }

        let targets = self.targets.get_or_insert_with(|| {
            let keys: Vec<EntityKey> = entities
                .iter()
                .filter(|(_, entity)| {
                    entity.alive
                        && matches!(entity.collider.as_ref().map(|c| &c.shape), Some(CollisionShape::Mesh(_)))
                })
                .map(|(key, _)| key)
                .collect();
            trace!("Raycast cache rebuilt with {} colliders", keys.len());
            keys
        });

        let mut closest: Option<RaycastHit> = None;
        for &key in targets.iter() {
            let Some(collider) = entities.get(key).and_then(|e| e.collider.as_ref()) else {
                continue;
            };
            let Some(transform) = compose_world_transform(entities, key) else {
                continue;
            };
            let Some(hit) = ray_collision(&collider.at(&transform), ray) else {
                continue;
            };

            if closest.map_or(true, |best| hit.distance < best.distance) {
                closest = Some(RaycastHit {
                    entity: key,
                    point: hit.point,
                    normal: hit.normal,
                    distance: hit.distance,
                });
            }
        }

        closest
    }
}
