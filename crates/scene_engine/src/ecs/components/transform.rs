//! Position component
//!
//! Euler angles in degrees, a world position and a uniform scale. The
//! resulting transform is `T(position) * R(angle) * S(scale)`.

use crate::foundation::math::{utils, Mat4, Vec3};

/// Entity placement in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Roll, pitch, yaw in degrees
    pub angle: Vec3,
    /// World space position (Z-up)
    pub position: Vec3,
    /// Uniform scale
    pub scale: f32,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            angle: Vec3::zeros(),
            position: Vec3::zeros(),
            scale: 1.0,
        }
    }
}

impl Position {
    /// Create from position only
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Builder pattern: Set angles in degrees
    pub fn with_angle(mut self, angle: Vec3) -> Self {
        self.angle = angle;
        self
    }

    /// Builder pattern: Set scale
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * utils::rotation_from_degrees(&self.angle)
            * Mat4::new_scaling(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_identity() {
        assert_relative_eq!(Position::default().to_matrix(), Mat4::identity());
    }

    #[test]
    fn test_trs_order() {
        let position = Position::at(Vec3::new(10.0, 0.0, 0.0))
            .with_angle(Vec3::new(0.0, 0.0, 90.0))
            .with_scale(2.0);
        let p = utils::transform_point(&position.to_matrix(), &Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
    }
}
