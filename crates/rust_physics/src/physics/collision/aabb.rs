//! Axis-aligned bounding boxes

use crate::foundation::math::{Mat4, Point3, Vec3};

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted box that any `grow` call will replace
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Tightest box around a set of points, `None` if there are none
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter().peekable();
        points.peek()?;
        let mut aabb = Self::empty();
        for p in points {
            aabb.grow(p);
        }
        Some(aabb)
    }

    /// Expand to contain `point`
    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Smallest box containing both
    pub fn merged(&self, other: &AABB) -> AABB {
        AABB::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Index of the widest axis; ties prefer x, then y
    pub fn widest_axis(&self) -> usize {
        let size = self.max - self.min;
        if size.y > size.x && size.y > size.z {
            1
        } else if size.z > size.x && size.z > size.y {
            2
        } else {
            0
        }
    }

    /// The eight corners, min corner first
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Axis-aligned bounds of this box after an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let mut out = AABB::empty();
        for corner in self.corners() {
            out.grow(matrix.transform_point(&Point3::from(corner)).coords);
        }
        out
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB (touching counts)
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_points_and_extents() {
        let aabb = AABB::from_points([
            Vec3::new(-1.0, 2.0, 0.0),
            Vec3::new(3.0, -2.0, 1.0),
        ])
        .unwrap();
        assert_relative_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_relative_eq!(aabb.max, Vec3::new(3.0, 2.0, 1.0));
        assert_relative_eq!(aabb.center(), Vec3::new(1.0, 0.0, 0.5));
        assert_eq!(aabb.widest_axis(), 0);
        assert!(AABB::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_touching_boxes_intersect() {
        let a = AABB::new(Vec3::zeros(), Vec3::repeat(1.0));
        let b = AABB::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let c = AABB::new(Vec3::new(1.01, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains_point(Vec3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_widest_axis_ties_prefer_x() {
        let cube = AABB::new(Vec3::zeros(), Vec3::repeat(2.0));
        assert_eq!(cube.widest_axis(), 0);
        let tall = AABB::new(Vec3::zeros(), Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(tall.widest_axis(), 1);
    }

    #[test]
    fn test_transformed_bounds() {
        let aabb = AABB::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 2.0, 3.0));
        let moved = aabb.transformed(&Mat4::new_translation(&Vec3::new(5.0, 0.0, 0.0)));
        assert_relative_eq!(moved.min, Vec3::new(4.0, -2.0, -3.0));
        assert_relative_eq!(moved.max, Vec3::new(6.0, 2.0, 3.0));
    }
}
