//! GPU textures as seen by the renderers
//!
//! A [`Texture`] pairs the device handle with the metadata draw code needs
//! (dimensions, alpha) and a process-unique [`ResourceId`] for binding keys.

use serde::{Deserialize, Serialize};

use crate::assets::ImageData;
use crate::render::api::{
    BackendResult, GraphicsDevice, ResourceId, SamplerDesc, TextureData, TextureDesc,
    TextureFormat, TextureHandle, Usage,
};

/// Texture slot a model texture fills, used to look up render-state overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureKind {
    /// Texture comes from the model itself
    #[default]
    Regular,
    /// Character skin, replaceable per render state
    Skin,
    /// Character hair
    Hair,
    /// Application-defined override slot
    Custom(u16),
}

/// A texture resident on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    id: ResourceId,
    handle: TextureHandle,
    width: u32,
    height: u32,
    has_alpha: bool,
}

impl Texture {
    /// Wrap a device texture, assigning it a fresh resource id
    pub fn new(handle: TextureHandle, width: u32, height: u32, has_alpha: bool) -> Self {
        Self {
            id: ResourceId::allocate(),
            handle,
            width,
            height,
            has_alpha,
        }
    }

    /// Upload an RGBA8 image as an immutable 2D texture
    pub fn from_image(
        device: &mut dyn GraphicsDevice,
        name: &str,
        image: &ImageData,
        sampler: Option<SamplerDesc>,
    ) -> BackendResult<Self> {
        let desc = TextureDesc::texture_2d(name, image.width, image.height, TextureFormat::Rgba8Unorm, Usage::Immutable);
        let handle = device.create_texture(&desc, &[TextureData::new(&image.data, image.row_pitch())])?;
        if let Some(sampler) = sampler {
            device.set_texture_sampler(handle, sampler)?;
        }
        Ok(Self::new(handle, image.width, image.height, image.has_alpha))
    }

    /// Binding identity
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Device handle
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Width in texels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether sampling may yield alpha below one
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// A texture with no texels cannot be drawn
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Release the device texture
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.release_texture(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingDevice;

    #[test]
    fn test_ids_are_unique() {
        let a = Texture::new(TextureHandle(1), 4, 4, false);
        let b = Texture::new(TextureHandle(1), 4, 4, false);
        assert_ne!(a.id(), b.id());
        assert!(a.id().is_valid());
    }

    #[test]
    fn test_empty_texture_is_invalid() {
        assert!(!Texture::new(TextureHandle(0), 0, 4, false).is_valid());
        assert!(Texture::new(TextureHandle(0), 1, 1, false).is_valid());
    }

    #[test]
    fn test_upload_from_image() {
        let mut device = RecordingDevice::new();
        let image = ImageData::solid_color(2, 2, [1, 2, 3, 100]);
        let texture = Texture::from_image(&mut device, "skin", &image, None).unwrap();

        assert!(texture.has_alpha());
        let recorded = device.texture(texture.handle()).unwrap();
        assert_eq!(recorded.desc.format, TextureFormat::Rgba8Unorm);
        assert_eq!(recorded.layers[0], image.data);

        texture.release(&mut device);
        assert_eq!(device.texture_count(), 0);
    }
}
