//! Skeleton poses and the shared bone buffer
//!
//! The pose evaluator is a collaborator behind [`SkeletonPose`]; the scene
//! core only drives it (parent transform, animation advance, interpolation)
//! and records where its bones land in the [`BoneBuffer`].

use std::sync::{Mutex, PoisonError};

use crate::ecs::components::Animation;
use crate::foundation::math::{utils, Mat4, Vec3};
use crate::render::api::{
    BackendResult, GraphicsDevice, ResourceId, TextureData, TextureDesc, TextureFormat,
    TextureHandle, Usage,
};
use crate::render::model::Model;
use crate::render::RenderError;

/// One bone as the first three rows of its affine transform
pub type BoneMatrix = [[f32; 4]; 3];

/// Texels per row of the bone texture
pub const BONE_TEXTURE_WIDTH: u32 = 1024;

/// `Rgba32Float` texels per bone
pub const TEXELS_PER_BONE: u32 = 3;

/// Default number of bones the buffer can hold per frame
pub const DEFAULT_BONE_CAPACITY: usize = 16 * 1024;

/// Location of an entity's bones in the bone buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SkeletonOffset {
    /// No bones uploaded yet
    #[default]
    Unset,
    /// First bone index
    Offset(u32),
}

impl SkeletonOffset {
    /// Bone index if set
    pub fn get(self) -> Option<u32> {
        match self {
            Self::Unset => None,
            Self::Offset(offset) => Some(offset),
        }
    }

    /// Whether bones have been uploaded
    pub fn is_set(self) -> bool {
        matches!(self, Self::Offset(_))
    }
}

/// An action and a fractional frame within it
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationFrame {
    /// Action id
    pub action: u16,
    /// Frame within the action
    pub frame: f32,
}

/// Per-entity pose evaluator
///
/// Called from the update workers, one entity per call, so implementations
/// must not share mutable state between instances except through
/// [`BoneBuffer::write`].
pub trait SkeletonPose: Send + Sync {
    /// Set the root transform from euler angles (degrees), position and scale
    fn set_parent(&mut self, angle: &Vec3, position: &Vec3, scale: f32);

    /// Advance `animation` by `speed` frames
    fn play_animation(&mut self, model: &Model, animation: &mut Animation, speed: f32);

    /// Evaluate the pose blended between `current` and `prior`
    fn animate(&mut self, model: &Model, current: AnimationFrame, prior: AnimationFrame, origin: &Vec3);

    /// Bones written by [`SkeletonPose::upload`]
    fn bone_count(&self) -> usize;

    /// Copy the evaluated bones into `bones` starting at `offset`
    fn upload(&self, bones: &BoneBuffer, offset: u32);
}

/// Frame-scoped bone storage mirrored into an `Rgba32Float` texture
///
/// Space for the frame is reserved up front and every entity writes its bones
/// to an offset computed from the entities before it in slot order, so the
/// layout does not depend on which worker finishes first.
pub struct BoneBuffer {
    bones: Mutex<Vec<BoneMatrix>>,
    capacity: usize,
    texture: TextureHandle,
    texture_id: ResourceId,
    texture_height: u32,
}

impl BoneBuffer {
    /// Create the bone texture for `capacity` bones
    pub fn new(device: &mut dyn GraphicsDevice, capacity: usize) -> BackendResult<Self> {
        let texels = u32::try_from(capacity)
            .ok()
            .and_then(|bones| bones.checked_mul(TEXELS_PER_BONE))
            .ok_or_else(|| {
                RenderError::ResourceCreationFailed(format!("bone texture for {capacity} bones is too large"))
            })?;
        let texture_height = texels.div_ceil(BONE_TEXTURE_WIDTH).max(1);
        let desc = TextureDesc::texture_2d(
            "SkeletonTexture",
            BONE_TEXTURE_WIDTH,
            texture_height,
            TextureFormat::Rgba32Float,
            Usage::Default,
        );
        let texture = device.create_texture(&desc, &[])?;
        log::debug!("Created bone texture for {} bones ({}x{})", capacity, BONE_TEXTURE_WIDTH, texture_height);

        Ok(Self {
            bones: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            texture,
            texture_id: ResourceId::allocate(),
            texture_height,
        })
    }

    /// Start the frame's staging with room for `total` bones, clamped to the capacity
    pub fn reserve(&self, total: usize) {
        if total > self.capacity {
            log::trace!("Bone buffer full, {} of {} bones dropped", total - self.capacity, total);
        }
        let mut staged = self.bones.lock().unwrap_or_else(PoisonError::into_inner);
        staged.clear();
        staged.resize(total.min(self.capacity), [[0.0; 4]; 3]);
    }

    /// Offset for `count` bones starting at bone `start`, `Unset` past the capacity
    pub fn slot(&self, start: usize, count: usize) -> SkeletonOffset {
        match (start.checked_add(count), u32::try_from(start)) {
            (Some(end), Ok(offset)) if end <= self.capacity => SkeletonOffset::Offset(offset),
            _ => SkeletonOffset::Unset,
        }
    }

    /// Copy `bones` into the reserved range at `offset`; bones past it are dropped
    pub fn write(&self, offset: u32, bones: &[BoneMatrix]) {
        let mut staged = self.bones.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(dst) = staged.get_mut(offset as usize..) else {
            return;
        };
        for (dst, src) in dst.iter_mut().zip(bones) {
            *dst = *src;
        }
    }

    /// Drop last frame's bones
    pub fn reset(&mut self) {
        self.bones.get_mut().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Bones staged this frame
    pub fn len(&self) -> usize {
        self.bones.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if nothing was staged this frame
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum bones per frame
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of the staged bones
    pub fn snapshot(&self) -> Vec<BoneMatrix> {
        self.bones.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Upload the staged bones to the bone texture
    pub fn flush(&mut self, device: &mut dyn GraphicsDevice) -> BackendResult<()> {
        let staged = self.bones.get_mut().unwrap_or_else(PoisonError::into_inner);
        let texel_count = (BONE_TEXTURE_WIDTH * self.texture_height) as usize;
        let mut texels = vec![[0.0_f32; 4]; texel_count];
        for (dst, src) in texels.iter_mut().zip(staged.iter().flatten()) {
            *dst = *src;
        }
        let row_pitch = BONE_TEXTURE_WIDTH as usize * TextureFormat::Rgba32Float.texel_size();
        device.update_texture(self.texture, TextureData::new(bytemuck::cast_slice(&texels), row_pitch))
    }

    /// Bone texture handle
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Binding identity of the bone texture
    pub fn texture_id(&self) -> ResourceId {
        self.texture_id
    }

    /// Release the bone texture
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.release_texture(self.texture);
    }
}

/// Single-bone pose that follows its parent transform
///
/// Frames advance by the requested speed and wrap at `frame_count`.
#[derive(Debug, Clone)]
pub struct RigidPose {
    parent: Mat4,
    frame_count: f32,
    bone: BoneMatrix,
}

impl RigidPose {
    /// Pose whose actions loop every `frame_count` frames
    pub fn new(frame_count: f32) -> Self {
        Self {
            parent: Mat4::identity(),
            frame_count,
            bone: rows_of(&Mat4::identity()),
        }
    }

    /// Last evaluated bone
    pub fn bone(&self) -> BoneMatrix {
        self.bone
    }

    fn wrap(&self, frame: f32) -> f32 {
        if self.frame_count > 0.0 {
            frame.rem_euclid(self.frame_count)
        } else {
            0.0
        }
    }
}

impl Default for RigidPose {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn rows_of(matrix: &Mat4) -> BoneMatrix {
    let row = |r: usize| [matrix[(r, 0)], matrix[(r, 1)], matrix[(r, 2)], matrix[(r, 3)]];
    [row(0), row(1), row(2)]
}

impl SkeletonPose for RigidPose {
    fn set_parent(&mut self, angle: &Vec3, position: &Vec3, scale: f32) {
        self.parent = Mat4::new_translation(position)
            * utils::rotation_from_degrees(angle)
            * Mat4::new_scaling(scale);
    }

    fn play_animation(&mut self, _model: &Model, animation: &mut Animation, speed: f32) {
        animation.prior_action = animation.current_action;
        animation.prior_frame = animation.current_frame;
        animation.current_frame = self.wrap(animation.current_frame + speed);
    }

    fn animate(&mut self, _model: &Model, _current: AnimationFrame, _prior: AnimationFrame, origin: &Vec3) {
        self.bone = rows_of(&(self.parent * Mat4::new_translation(origin)));
    }

    fn bone_count(&self) -> usize {
        1
    }

    fn upload(&self, bones: &BoneBuffer, offset: u32) {
        bones.write(offset, &[self.bone]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingDevice;
    use approx::assert_relative_eq;

    #[test]
    fn test_reserved_bones_land_at_their_offsets() {
        let mut device = RecordingDevice::new();
        let bones = BoneBuffer::new(&mut device, 4).unwrap();
        let mut first = rows_of(&Mat4::identity());
        first[0][3] = 1.0;
        let mut second = first;
        second[0][3] = 2.0;

        bones.reserve(3);
        assert_eq!(bones.len(), 3);
        // Written out of order, read back by offset
        bones.write(2, &[second]);
        bones.write(0, &[first, first]);

        let staged = bones.snapshot();
        assert_relative_eq!(staged[0][0][3], 1.0);
        assert_relative_eq!(staged[1][0][3], 1.0);
        assert_relative_eq!(staged[2][0][3], 2.0);
    }

    #[test]
    fn test_slot_past_capacity_is_unset() {
        let mut device = RecordingDevice::new();
        let mut bones = BoneBuffer::new(&mut device, 2).unwrap();

        assert_eq!(bones.slot(0, 2), SkeletonOffset::Offset(0));
        assert_eq!(bones.slot(1, 1), SkeletonOffset::Offset(1));
        assert_eq!(bones.slot(2, 1), SkeletonOffset::Unset);
        assert_eq!(bones.slot(usize::MAX, 1), SkeletonOffset::Unset);

        bones.reserve(5);
        assert_eq!(bones.len(), 2);
        bones.write(1, &[rows_of(&Mat4::identity()); 3]);
        assert_eq!(bones.len(), 2);

        bones.reset();
        assert!(bones.is_empty());
    }

    #[test]
    fn test_oversized_capacity_is_rejected() {
        let mut device = RecordingDevice::new();
        let result = BoneBuffer::new(&mut device, u32::MAX as usize);
        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
        assert!(BoneBuffer::new(&mut device, usize::MAX).is_err());
    }

    #[test]
    fn test_flush_writes_texture() {
        let mut device = RecordingDevice::new();
        let mut bones = BoneBuffer::new(&mut device, 8).unwrap();
        let mut bone = rows_of(&Mat4::identity());
        bone[0][3] = 42.0;
        bones.reserve(1);
        bones.write(0, &[bone]);
        bones.flush(&mut device).unwrap();

        let recorded = device.texture(bones.texture()).unwrap();
        assert_eq!(recorded.updates, 1);
        let texels: Vec<f32> = recorded.layers[0]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_relative_eq!(texels[3], 42.0);
        assert_relative_eq!(texels[5], 1.0);
    }

    #[test]
    fn test_rigid_pose_wraps_frames() {
        let model = Model::default();
        let mut pose = RigidPose::new(4.0);
        let mut animation = Animation::playing(2);
        animation.current_frame = 3.5;

        pose.play_animation(&model, &mut animation, 1.0);
        assert_eq!(animation.prior_action, 2);
        assert_relative_eq!(animation.prior_frame, 3.5);
        assert_relative_eq!(animation.current_frame, 0.5);
    }

    #[test]
    fn test_rigid_pose_follows_parent() {
        let model = Model::default();
        let mut pose = RigidPose::default();
        pose.set_parent(&Vec3::zeros(), &Vec3::new(10.0, 20.0, 30.0), 2.0);
        pose.animate(&model, AnimationFrame::default(), AnimationFrame::default(), &Vec3::new(1.0, 0.0, 0.0));

        let bone = pose.bone();
        assert_relative_eq!(bone[0][0], 2.0);
        assert_relative_eq!(bone[0][3], 12.0);
        assert_relative_eq!(bone[1][3], 20.0);
        assert_relative_eq!(bone[2][3], 30.0);
    }
}
