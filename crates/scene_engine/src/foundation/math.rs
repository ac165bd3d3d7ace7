//! Math utilities and types
//!
//! Provides the nalgebra aliases used across the scene core. World space is
//! Z-up: terrain cells lie in the XY plane and heights run along Z.

pub use nalgebra::{
    Vector3, Vector4,
    Matrix4,
    Point3 as NPoint3,
    Rotation3,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = NPoint3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Point3, Rotation3, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Rotation from euler angles in degrees.
    ///
    /// `angles.x` is roll, `angles.y` pitch and `angles.z` yaw; the result is
    /// `Rz(yaw) * Ry(pitch) * Rx(roll)`.
    pub fn rotation_from_degrees(angles: &Vec3) -> Mat4 {
        Rotation3::from_euler_angles(
            deg_to_rad(angles.x),
            deg_to_rad(angles.y),
            deg_to_rad(angles.z),
        )
        .to_homogeneous()
    }

    /// Apply an affine transform to a point given as a vector
    pub fn transform_point(matrix: &Mat4, point: &Vec3) -> Vec3 {
        matrix.transform_point(&Point3::from(*point)).coords
    }

    /// Smallest power of two greater than or equal to `value` (1 for 0)
    pub fn next_power_of_two(value: u32) -> u32 {
        value.max(1).next_power_of_two()
    }

    /// Euclidean remainder for floats, matching `x - floor(x / m) * m`
    pub fn modulo(value: f32, modulus: f32) -> f32 {
        if modulus == 0.0 {
            return 0.0;
        }
        value - (value / modulus).floor() * modulus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_yaw_quarter_turn() {
        let m = utils::rotation_from_degrees(&Vec3::new(0.0, 0.0, 90.0));
        let p = utils::transform_point(&m, &Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_next_power_of_two() {
        assert_eq!(utils::next_power_of_two(0), 1);
        assert_eq!(utils::next_power_of_two(3), 4);
        assert_eq!(utils::next_power_of_two(256), 256);
        assert_eq!(utils::next_power_of_two(257), 512);
    }

    #[test]
    fn test_modulo_wraps() {
        assert_relative_eq!(utils::modulo(7.5, 2.0), 1.5);
        assert_relative_eq!(utils::modulo(-0.5, 2.0), 1.5);
        assert_relative_eq!(utils::modulo(3.0, 0.0), 0.0);
    }
}
