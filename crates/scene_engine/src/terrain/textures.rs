//! Ground and grass texture arrays
//!
//! Every layer of an array shares one size: the largest width and height of
//! the inputs, rounded up to powers of two. A one-row lookup texture carries
//! the per-layer parameters the shaders need.

use std::collections::HashMap;

use crate::assets::ImageData;
use crate::foundation::math::utils;
use crate::render::api::{
    BackendResult, GraphicsDevice, SamplerDesc, TextureData, TextureDesc, TextureDimension,
    TextureFormat, TextureHandle, Usage,
};

use super::definition::{GrassTextureEntry, TerrainTextureEntry};
use super::TerrainError;

/// A texture array with its per-layer lookup texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayeredTexture {
    /// RGBA8 array, one layer per entry
    pub array: TextureHandle,
    /// Per-layer parameters
    pub uv: TextureHandle,
    /// Entry id to array layer
    pub layers: HashMap<u32, u32>,
    /// Common layer width
    pub width: u32,
    /// Common layer height
    pub height: u32,
}

impl LayeredTexture {
    /// Array layer holding entry `id`
    pub fn layer_of(&self, id: u32) -> Option<u32> {
        self.layers.get(&id).copied()
    }

    /// Release both textures
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.release_texture(self.array);
        device.release_texture(self.uv);
    }
}

/// Largest width and height, each rounded up to a power of two
pub fn common_size(images: &[&ImageData]) -> (u32, u32) {
    let width = images.iter().map(|image| image.width).max().unwrap_or(1);
    let height = images.iter().map(|image| image.height).max().unwrap_or(1);
    (utils::next_power_of_two(width), utils::next_power_of_two(height))
}

/// Build the ground array and its `(uv.x, uv.y, water, 0)` lookup
pub fn build_ground_layers(
    device: &mut dyn GraphicsDevice,
    entries: &[(TerrainTextureEntry, ImageData)],
    uv_normal: f32,
    uv_scaled: f32,
    sampler: SamplerDesc,
) -> Result<LayeredTexture, TerrainError> {
    if entries.is_empty() {
        return Err(TerrainError::EmptyTextureList("terrain texture"));
    }

    let settings: Vec<[f32; 4]> = entries
        .iter()
        .map(|(entry, image)| {
            let repeat = if entry.scaled { uv_scaled } else { uv_normal };
            let water = if entry.water { 1.0 } else { 0.0 };
            [repeat / image.width as f32, repeat / image.height as f32, water, 0.0]
        })
        .collect();

    let images: Vec<&ImageData> = entries.iter().map(|(_, image)| image).collect();
    let ids = entries.iter().map(|(entry, _)| entry.id);
    build_layers(device, "TerrainTextures", &images, ids, sampler, |device| {
        upload_lookup(device, "TerrainUV", TextureFormat::Rgba32Float, &settings)
    })
}

/// Build the grass array and its per-layer blade height lookup
pub fn build_grass_layers(
    device: &mut dyn GraphicsDevice,
    entries: &[(GrassTextureEntry, ImageData)],
    sampler: SamplerDesc,
) -> Result<LayeredTexture, TerrainError> {
    if entries.is_empty() {
        return Err(TerrainError::EmptyTextureList("grass texture"));
    }

    let settings: Vec<f32> = entries.iter().map(|(_, image)| image.height as f32 * 2.0).collect();

    let images: Vec<&ImageData> = entries.iter().map(|(_, image)| image).collect();
    let ids = entries.iter().map(|(entry, _)| entry.id);
    build_layers(device, "GrassTextures", &images, ids, sampler, |device| {
        upload_lookup(device, "GrassUV", TextureFormat::R32Float, &settings)
    })
}

fn build_layers(
    device: &mut dyn GraphicsDevice,
    name: &str,
    images: &[&ImageData],
    ids: impl Iterator<Item = u32>,
    sampler: SamplerDesc,
    lookup: impl FnOnce(&mut dyn GraphicsDevice) -> BackendResult<TextureHandle>,
) -> Result<LayeredTexture, TerrainError> {
    let (width, height) = common_size(images);

    let mut layers = HashMap::new();
    for (layer, id) in ids.enumerate() {
        layers.entry(id).or_insert(layer as u32);
    }

    let resized = images
        .iter()
        .map(|image| {
            if image.width < width || image.height < height {
                image.resized(width, height)
            } else {
                Ok((*image).clone())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let desc = TextureDesc {
        dimension: TextureDimension::Texture2DArray { layers: resized.len() as u32 },
        ..TextureDesc::texture_2d(name, width, height, TextureFormat::Rgba8Unorm, Usage::Immutable)
    };
    let data: Vec<TextureData<'_>> = resized
        .iter()
        .map(|image| TextureData::new(&image.data, image.row_pitch()))
        .collect();
    let array = device.create_texture(&desc, &data)?;
    device.set_texture_sampler(array, sampler)?;

    let uv = match lookup(device) {
        Ok(uv) => uv,
        Err(e) => {
            device.release_texture(array);
            return Err(e.into());
        }
    };

    log::debug!("Built {name} with {} layers of {width}x{height}", resized.len());
    Ok(LayeredTexture { array, uv, layers, width, height })
}

/// One-row lookup texture, zero-padded to a power of two
fn upload_lookup<T: bytemuck::Pod>(
    device: &mut dyn GraphicsDevice,
    name: &str,
    format: TextureFormat,
    values: &[T],
) -> BackendResult<TextureHandle> {
    let width = utils::next_power_of_two(values.len() as u32);
    let mut padded = vec![T::zeroed(); width as usize];
    padded[..values.len()].copy_from_slice(values);

    let bytes: &[u8] = bytemuck::cast_slice(&padded);
    let desc = TextureDesc::texture_2d(name, width, 1, format, Usage::Immutable);
    device.create_texture(&desc, &[TextureData::new(bytes, bytes.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::{TextureAddress, TextureFilter};
    use crate::render::backends::RecordingDevice;
    use approx::assert_relative_eq;

    fn sampler() -> SamplerDesc {
        SamplerDesc { filter: TextureFilter::Linear, address: TextureAddress::Wrap }
    }

    fn ground(id: u32, scaled: bool, water: bool) -> TerrainTextureEntry {
        TerrainTextureEntry { id, path: format!("tile{id}.ozj"), scaled, water }
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
    }

    #[test]
    fn test_common_size_rounds_up() {
        let a = ImageData::solid_color(3, 2, [0; 4]);
        let b = ImageData::solid_color(2, 5, [0; 4]);
        assert_eq!(common_size(&[&a, &b]), (4, 8));
    }

    #[test]
    fn test_ground_layers() {
        let mut device = RecordingDevice::new();
        let entries = vec![
            (ground(4, false, false), ImageData::solid_color(4, 4, [10, 20, 30, 255])),
            (ground(9, true, true), ImageData::solid_color(2, 4, [200, 0, 0, 255])),
            (ground(2, false, false), ImageData::solid_color(4, 2, [0, 0, 0, 255])),
        ];

        let layered = build_ground_layers(&mut device, &entries, 1.0, 2.0, sampler()).unwrap();
        assert_eq!((layered.width, layered.height), (4, 4));
        assert_eq!(layered.layer_of(9), Some(1));
        assert_eq!(layered.layer_of(2), Some(2));
        assert_eq!(layered.layer_of(5), None);

        let array = device.texture(layered.array).unwrap();
        assert_eq!(array.desc.layers(), 3);
        assert_eq!(array.desc.usage, Usage::Immutable);
        assert_eq!(array.sampler, Some(sampler()));
        assert!(array.layers.iter().all(|layer| layer.len() == 4 * 4 * 4));

        let uv = device.texture(layered.uv).unwrap();
        assert_eq!((uv.desc.width, uv.desc.height), (4, 1));
        assert_eq!(uv.desc.format, TextureFormat::Rgba32Float);
        let values = floats(&uv.layers[0]);
        // uv from the source size, not the padded one
        assert_relative_eq!(values[0], 0.25);
        assert_relative_eq!(values[4], 1.0);
        assert_relative_eq!(values[5], 0.5);
        assert_relative_eq!(values[6], 1.0);
        assert_relative_eq!(values[12..16].iter().sum::<f32>(), 0.0);
    }

    #[test]
    fn test_grass_layers() {
        let mut device = RecordingDevice::new();
        let entries = vec![
            (GrassTextureEntry { id: 0, path: "grass.ozt".into() }, ImageData::solid_color(8, 16, [0, 255, 0, 128])),
        ];

        let layered = build_grass_layers(&mut device, &entries, sampler()).unwrap();
        let uv = device.texture(layered.uv).unwrap();
        assert_eq!(uv.desc.format, TextureFormat::R32Float);
        assert_relative_eq!(floats(&uv.layers[0])[0], 32.0);
    }

    #[test]
    fn test_empty_list_rejected() {
        let mut device = RecordingDevice::new();
        assert!(matches!(
            build_ground_layers(&mut device, &[], 1.0, 2.0, sampler()),
            Err(TerrainError::EmptyTextureList(_))
        ));
    }
}
