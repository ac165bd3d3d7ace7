//! Render state component
//!
//! Written by the cull and light phases, read by the render pass.

use bitflags::bitflags;

use crate::foundation::math::Vec4;

bitflags! {
    /// Per-entity render switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u8 {
        /// Passed the frustum test this frame
        const VISIBLE = 0x01;
        /// Shader applies the body light
        const LIGHT_ENABLE = 0x02;
        /// Receives dynamic lights
        const LIGHTING_ENABLE = 0x04;
    }
}

/// Visibility and resolved lighting of one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Render switches
    pub flags: RenderFlags,
    /// Resolved body light (rgba)
    pub body_light: Vec4,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            flags: RenderFlags::LIGHT_ENABLE | RenderFlags::LIGHTING_ENABLE,
            body_light: Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

impl RenderState {
    /// Whether the last cull kept this entity
    pub fn is_visible(&self) -> bool {
        self.flags.contains(RenderFlags::VISIBLE)
    }

    /// Record the cull result
    pub fn set_visible(&mut self, visible: bool) {
        self.flags.set(RenderFlags::VISIBLE, visible);
    }

    /// Whether the shader should apply the body light
    pub fn light_enabled(&self) -> bool {
        self.flags.contains(RenderFlags::LIGHT_ENABLE)
    }
}
