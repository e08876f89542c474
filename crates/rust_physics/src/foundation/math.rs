//! Math utilities and types
//!
//! Provides the nalgebra-backed vector, matrix and rotation types used by the
//! collision and dynamics code, plus the [`Transform`] collaborator that shapes
//! and bodies read their pose from.

pub use nalgebra::{
    Vector2, Vector3,
    Matrix3, Matrix4,
    Quaternion,
    Rotation3,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform from a position and Euler angles in degrees (X, then Y, then Z)
    pub fn from_position_euler(position: Vec3, euler_degrees: Vec3) -> Self {
        Self::from_position_rotation(position, rotation_from_euler_degrees(euler_degrees))
    }

    /// Builder-style scale setter
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Rotation as a 3x3 matrix
    pub fn rotation_matrix(&self) -> Mat3 {
        self.rotation.to_rotation_matrix().into_inner()
    }

    /// Rotation as Euler angles in degrees, matching [`rotation_from_euler_degrees`]
    pub fn euler_degrees(&self) -> Vec3 {
        euler_degrees_from_matrix(&self.rotation_matrix())
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        let matrix = self.to_matrix();
        matrix.transform_point(&point)
    }

    /// Combine this (parent) transform with a child-local transform
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale.component_mul(&other.position)),
            rotation: self.rotation * other.rotation,
            scale: self.scale.component_mul(&other.scale),
        }
    }
}

/// Rotation matrix from Euler angles in degrees, applied as `Rx * Ry * Rz`
pub fn euler_xyz_matrix(euler_degrees: Vec3) -> Mat3 {
    let rx = Rotation3::from_axis_angle(&Vec3::x_axis(), utils::deg_to_rad(euler_degrees.x));
    let ry = Rotation3::from_axis_angle(&Vec3::y_axis(), utils::deg_to_rad(euler_degrees.y));
    let rz = Rotation3::from_axis_angle(&Vec3::z_axis(), utils::deg_to_rad(euler_degrees.z));
    (rx * ry * rz).into_inner()
}

/// Unit quaternion from Euler angles in degrees, applied as `Rx * Ry * Rz`
pub fn rotation_from_euler_degrees(euler_degrees: Vec3) -> Quat {
    Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(euler_xyz_matrix(euler_degrees)))
}

/// Inverse of [`euler_xyz_matrix`]
pub fn euler_degrees_from_matrix(m: &Mat3) -> Vec3 {
    let sin_y = utils::clamp(m[(0, 2)], -1.0, 1.0);
    let y = sin_y.asin();

    // Gimbal lock: Z folds into X
    if sin_y.abs() > 0.999_999 {
        let x = m[(2, 1)].atan2(m[(1, 1)]);
        return Vec3::new(utils::rad_to_deg(x), utils::rad_to_deg(y), 0.0);
    }

    let x = (-m[(1, 2)]).atan2(m[(2, 2)]);
    let z = (-m[(0, 1)]).atan2(m[(0, 0)]);
    Vec3::new(utils::rad_to_deg(x), utils::rad_to_deg(y), utils::rad_to_deg(z))
}

/// Componentwise clamp of a vector into `[-limit, limit]`
pub fn clamp_symmetric(v: Vec3, limit: Vec3) -> Vec3 {
    let limit = limit.abs();
    Vec3::new(
        utils::clamp(v.x, -limit.x, limit.x),
        utils::clamp(v.y, -limit.y, limit.y),
        utils::clamp(v.z, -limit.z, limit.z),
    )
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Clamp a value between min and max
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        if value < min { min } else if value > max { max } else { value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_euler_matrix_matches_axis_order() {
        // 90 degrees about X maps +Y onto +Z
        let m = euler_xyz_matrix(Vec3::new(90.0, 0.0, 0.0));
        let v = m * Vec3::y();
        assert_relative_eq!(v, Vec3::z(), epsilon = EPSILON);

        // X is applied last to the vector, so Z turns first
        let m = euler_xyz_matrix(Vec3::new(90.0, 0.0, 90.0));
        let v = m * Vec3::x();
        assert_relative_eq!(v, Vec3::z(), epsilon = EPSILON);
    }

    #[test]
    fn test_euler_round_trip() {
        let euler = Vec3::new(20.0, -35.0, 70.0);
        let transform = Transform::from_position_euler(Vec3::zeros(), euler);
        assert_relative_eq!(transform.euler_degrees(), euler, epsilon = 1e-3);
    }

    #[test]
    fn test_quaternion_matches_matrix() {
        let euler = Vec3::new(10.0, 45.0, -30.0);
        let q = rotation_from_euler_degrees(euler);
        let m = euler_xyz_matrix(euler);
        let v = Vec3::new(0.3, -1.2, 2.0);
        assert_relative_eq!(q * v, m * v, epsilon = EPSILON);
    }

    #[test]
    fn test_combine_rotates_child_position() {
        let parent = Transform::from_position_euler(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 0.0));
        let child = Transform::from_position(Vec3::new(0.0, 0.0, 1.0));
        let world = parent.combine(&child);
        // +Z turned 90 degrees about Y becomes +X
        assert_relative_eq!(world.position, Vec3::new(2.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_clamp_symmetric() {
        let v = clamp_symmetric(Vec3::new(120.0, -200.0, 5.0), Vec3::new(90.0, 90.0, 90.0));
        assert_relative_eq!(v, Vec3::new(90.0, -90.0, 5.0));
    }
}
