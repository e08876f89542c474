//! Ray primitives

use crate::foundation::math::Vec3;

use super::aabb::AABB;
use super::geometry::GEOMETRY_EPSILON;

/// A finite ray for intersection queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Starting point
    pub origin: Vec3,
    /// Unit direction, zero if constructed from a zero vector
    pub direction: Vec3,
    /// Maximum distance along `direction`
    pub length: f32,
}

impl Ray {
    /// Creates a ray, normalizing `direction`
    pub fn new(origin: Vec3, direction: Vec3, length: f32) -> Self {
        Self {
            origin,
            direction: direction.try_normalize(GEOMETRY_EPSILON).unwrap_or_else(Vec3::zeros),
            length,
        }
    }

    /// A ray with a usable direction and positive length
    pub fn is_valid(&self) -> bool {
        self.length > 0.0 && self.direction != Vec3::zeros()
    }

    /// Point at distance `t` along the ray
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Far end of the ray
    pub fn end(&self) -> Vec3 {
        self.point_at(self.length)
    }

    /// Bounds of the segment from origin to end
    pub fn bounds(&self) -> AABB {
        let end = self.end();
        AABB::new(self.origin.inf(&end), self.origin.sup(&end))
    }
}

/// Result of a ray intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space intersection point
    pub point: Vec3,
    /// Surface normal facing back along the ray
    pub normal: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
}
