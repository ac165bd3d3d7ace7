//! Skeleton component

use crate::render::skeleton::{SkeletonOffset, SkeletonPose};

/// Per-entity pose state plus the bone buffer slot it was uploaded to
pub struct Skeleton {
    /// Pose evaluator owned by this entity
    pub instance: Box<dyn SkeletonPose>,
    /// Where the bones landed the last time the entity was visible; `Unset` before that
    pub offset: SkeletonOffset,
}

impl Skeleton {
    /// Wrap a pose with no uploaded bones yet
    pub fn new(instance: Box<dyn SkeletonPose>) -> Self {
        Self {
            instance,
            offset: SkeletonOffset::Unset,
        }
    }
}

impl std::fmt::Debug for Skeleton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skeleton").field("offset", &self.offset).finish_non_exhaustive()
    }
}
