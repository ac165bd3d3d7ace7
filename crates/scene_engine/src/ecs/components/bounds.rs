//! Axis-aligned bounding box component

use crate::foundation::math::{utils, Mat4, Vec3};

/// World space box, `min <= max` per axis after every cull
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Vec3::zeros(),
            max: Vec3::zeros(),
        }
    }
}

impl BoundingBox {
    /// Create from two corners as given
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Swap components so that `min <= max` on every axis
    pub fn order(&mut self) {
        let (min, max) = (self.min.inf(&self.max), self.min.sup(&self.max));
        self.min = min;
        self.max = max;
    }

    /// Both corners pushed through `transform`, not yet ordered
    #[must_use]
    pub fn transformed(&self, transform: &Mat4) -> Self {
        Self {
            min: utils::transform_point(transform, &self.min),
            max: utils::transform_point(transform, &self.max),
        }
    }

    /// Whether `min <= max` holds on every axis
    pub fn is_ordered(&self) -> bool {
        self.min.iter().zip(self.max.iter()).all(|(lo, hi)| lo <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_order_swaps_per_axis() {
        let mut bbox = BoundingBox::new(Vec3::new(5.0, -1.0, 3.0), Vec3::new(1.0, 2.0, -3.0));
        assert!(!bbox.is_ordered());
        bbox.order();
        assert_eq!(bbox.min, Vec3::new(1.0, -1.0, -3.0));
        assert_eq!(bbox.max, Vec3::new(5.0, 2.0, 3.0));
        assert!(bbox.is_ordered());
    }

    #[test]
    fn test_rotation_can_invert_corners() {
        let bbox = BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let half_turn = utils::rotation_from_degrees(&Vec3::new(0.0, 0.0, 180.0));
        let mut moved = bbox.transformed(&half_turn);
        assert!(!moved.is_ordered());
        moved.order();
        assert_relative_eq!(moved.min, Vec3::new(-1.0, -1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(moved.max, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
    }
}
