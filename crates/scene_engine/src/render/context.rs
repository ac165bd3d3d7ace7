//! Explicit render state shared by the terrain and model renderers
//!
//! Holds what a frame's draws need besides their own data: the render mode,
//! the optional shadow map, the camera and light constant buffers, render
//! target formats and per-kind texture overrides. Created after the device
//! and destroyed before it.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::api::{
    BackendResult, BufferDesc, BufferHandle, GraphicsDevice, ResourceId, TextureFormat,
    TextureHandle,
};
use crate::render::primitives::CameraView;
use crate::render::texture::{Texture, TextureKind};

/// Which pass the scene is being drawn for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// Main color pass
    #[default]
    Normal,
    /// Depth-only pass into the shadow map
    ShadowMap,
}

/// How the shadow map is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowFilter {
    /// Hardware comparison sampling
    Pcf,
    /// Filterable moments texture
    Filterable,
}

/// Shadow map views available to the normal pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowMapBinding {
    /// Binding identity
    pub id: ResourceId,
    /// Comparison-sampled depth view
    pub comparison: TextureHandle,
    /// Filterable view
    pub filterable: TextureHandle,
    /// Sampling mode
    pub filter: ShadowFilter,
}

/// Render target formats every pipeline is compiled against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargets {
    /// Color attachment format
    pub color: TextureFormat,
    /// Depth attachment format
    pub depth: TextureFormat,
}

impl Default for RenderTargets {
    fn default() -> Self {
        Self {
            color: TextureFormat::Bgra8UnormSrgb,
            depth: TextureFormat::D32Float,
        }
    }
}

/// `cbCameraAttribs` layout
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraAttribs {
    /// Transposed view-projection
    pub view_proj: [[f32; 4]; 4],
    /// Eye position, w unused
    pub position: [f32; 4],
}

/// `cbLightAttribs` layout
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightAttribs {
    /// Direction the light travels, w unused
    pub direction: [f32; 4],
    /// Light color, w is intensity
    pub color: [f32; 4],
}

/// Per-frame render state passed explicitly to the renderers
pub struct RenderContext {
    /// Current pass
    pub mode: RenderMode,
    /// Shadow map, when shadows are enabled
    pub shadow_map: Option<ShadowMapBinding>,
    targets: RenderTargets,
    camera_uniform: BufferHandle,
    light_uniform: BufferHandle,
    view_proj_uniform: BufferHandle,
    view_projection_transposed: Mat4,
    texture_overrides: HashMap<TextureKind, Arc<Texture>>,
}

impl RenderContext {
    /// Create the camera, light and view-projection constant buffers
    pub fn new(device: &mut dyn GraphicsDevice, targets: RenderTargets) -> BackendResult<Self> {
        let camera_uniform = device.create_buffer(
            &BufferDesc::dynamic_uniform("CameraAttribs", std::mem::size_of::<CameraAttribs>()),
            None,
        )?;
        let light_uniform = device.create_buffer(
            &BufferDesc::dynamic_uniform("LightAttribs", std::mem::size_of::<LightAttribs>()),
            None,
        )?;
        let view_proj_uniform = device.create_buffer(
            &BufferDesc::dynamic_uniform("ViewProjection", std::mem::size_of::<[[f32; 4]; 4]>()),
            None,
        )?;

        Ok(Self {
            mode: RenderMode::Normal,
            shadow_map: None,
            targets,
            camera_uniform,
            light_uniform,
            view_proj_uniform,
            view_projection_transposed: Mat4::identity(),
            texture_overrides: HashMap::new(),
        })
    }

    /// Upload this frame's camera
    pub fn update_camera(
        &mut self,
        device: &mut dyn GraphicsDevice,
        camera: &dyn CameraView,
        eye: &Vec3,
    ) -> BackendResult<()> {
        self.view_projection_transposed = camera.view_projection_transposed();
        let view_proj: [[f32; 4]; 4] = self.view_projection_transposed.into();

        let attribs = CameraAttribs {
            view_proj,
            position: [eye.x, eye.y, eye.z, 1.0],
        };
        device.write_buffer_discard(self.camera_uniform, bytemuck::bytes_of(&attribs))?;
        device.write_buffer_discard(self.view_proj_uniform, bytemuck::bytes_of(&view_proj))
    }

    /// Upload the scene light
    pub fn update_light(
        &mut self,
        device: &mut dyn GraphicsDevice,
        direction: &Vec3,
        color: &Vec4,
    ) -> BackendResult<()> {
        let attribs = LightAttribs {
            direction: [direction.x, direction.y, direction.z, 0.0],
            color: [color.x, color.y, color.z, color.w],
        };
        device.write_buffer_discard(self.light_uniform, bytemuck::bytes_of(&attribs))
    }

    /// View-projection as last uploaded, transposed
    pub fn view_projection_transposed(&self) -> &Mat4 {
        &self.view_projection_transposed
    }

    /// Render target formats
    pub fn targets(&self) -> RenderTargets {
        self.targets
    }

    /// `cbCameraAttribs` buffer
    pub fn camera_uniform(&self) -> BufferHandle {
        self.camera_uniform
    }

    /// `cbLightAttribs` buffer
    pub fn light_uniform(&self) -> BufferHandle {
        self.light_uniform
    }

    /// Terrain `ModelViewProj` buffer
    pub fn view_proj_uniform(&self) -> BufferHandle {
        self.view_proj_uniform
    }

    /// Replace textures of `kind` on every model drawn afterwards
    pub fn set_texture_override(&mut self, kind: TextureKind, texture: Arc<Texture>) {
        self.texture_overrides.insert(kind, texture);
    }

    /// Stop overriding `kind`
    pub fn clear_texture_override(&mut self, kind: TextureKind) -> Option<Arc<Texture>> {
        self.texture_overrides.remove(&kind)
    }

    /// Override for `kind`, if any
    pub fn texture_override(&self, kind: TextureKind) -> Option<&Arc<Texture>> {
        self.texture_overrides.get(&kind)
    }

    /// Release the constant buffers
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.release_buffer(self.camera_uniform);
        device.release_buffer(self.light_uniform);
        device.release_buffer(self.view_proj_uniform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingDevice;
    use crate::render::primitives::CameraSnapshot;

    #[test]
    fn test_camera_upload() {
        let mut device = RecordingDevice::new();
        let mut context = RenderContext::new(&mut device, RenderTargets::default()).unwrap();
        let mut view_projection = Mat4::identity();
        view_projection[(0, 3)] = 5.0;

        context
            .update_camera(&mut device, &CameraSnapshot::from_view_projection(view_projection), &Vec3::zeros())
            .unwrap();

        assert_eq!(*context.view_projection_transposed(), view_projection.transpose());
        let uploaded: [[f32; 4]; 4] =
            bytemuck::pod_read_unaligned(&device.buffer(context.view_proj_uniform()).unwrap().data);
        // column-major storage of the transpose puts the translation in row order
        assert_eq!(uploaded[0][3], 5.0);
    }

    #[test]
    fn test_texture_overrides() {
        let mut device = RecordingDevice::new();
        let mut context = RenderContext::new(&mut device, RenderTargets::default()).unwrap();
        let skin = Arc::new(Texture::new(TextureHandle(7), 4, 4, false));

        context.set_texture_override(TextureKind::Skin, Arc::clone(&skin));
        assert!(context.texture_override(TextureKind::Skin).is_some());
        assert!(context.texture_override(TextureKind::Hair).is_none());
        assert!(context.clear_texture_override(TextureKind::Skin).is_some());

        context.destroy(&mut device);
        assert_eq!(device.buffer_count(), 0);
    }
}
