//! Terrain subsystem
//!
//! A terrain is a fixed 256x256 height field with derived rasters (normals,
//! sun-shaded light, texture mapping, gameplay attributes), each mirrored in
//! a GPU texture. The CPU copies answer height and light queries; the GPU
//! copies feed two indexed passes over a shared quad grid, ground and
//! optionally grass.
//!
//! Rasters are stored row-major with rows bottom-up, cell `(x, y)` at
//! `y * TERRAIN_SIZE + x`. World coordinates map to cells through
//! [`TERRAIN_SCALE`].
//!
//! ## Loading
//!
//! [`Terrain::load`] runs every step in dependency order and releases what it
//! created if any step fails. Each step is also public, in a path form and an
//! in-memory form, so tools can assemble a terrain from generated data.

pub mod attributes;
pub mod crypt;
pub mod definition;
pub mod error;
pub mod geometry;
pub mod heightmap;
pub mod lightmap;
pub mod mapping;
pub mod normals;
pub mod pipelines;
pub mod settings;
pub mod textures;

pub use attributes::TerrainAttribute;
pub use definition::{GrassTextureEntry, TerrainDefinition, TerrainTextureEntry, WaterSettings, WindSettings};
pub use error::TerrainError;
pub use geometry::{TerrainGeometry, TerrainVertex};
pub use mapping::MappingCell;
pub use pipelines::{TerrainPass, TerrainPrograms};
pub use settings::TerrainSettings;
pub use textures::LayeredTexture;

use std::collections::HashMap;
use std::ops::{Add, Mul, Sub};
use std::path::Path;

use crate::assets::{image_loader, ImageData};
use crate::config::Config;
use crate::core::TerrainConfig;
use crate::foundation::math::{utils, Vec3, Vec4};
use crate::render::api::{
    BackendResult, GraphicsDevice, RenderClassify, SamplerDesc, TextureData, TextureDesc,
    TextureFormat, TextureHandle, Usage,
};
use crate::render::context::RenderContext;
use crate::render::pipeline::{DynamicPipelineState, ShaderCaches};

use pipelines::PassResources;
use settings::SettingsUniform;

/// Cells per side
pub const TERRAIN_SIZE: u32 = 256;

/// Mask wrapping a cell coordinate into the grid
pub const TERRAIN_MASK: u32 = TERRAIN_SIZE - 1;

/// World units per cell
pub const TERRAIN_SCALE: f32 = 100.0;

/// Cells in the grid
pub const TERRAIN_CELLS: usize = (TERRAIN_SIZE * TERRAIN_SIZE) as usize;

/// Indices drawn per pass, two triangles for each of 255x255 cells
pub const TERRAIN_INDEX_COUNT: u32 = TERRAIN_MASK * TERRAIN_MASK * 6;

/// Definition file looked up by [`Terrain::load_from_dir`]
pub const DEFINITION_FILE: &str = "terrain.toml";

/// Raster index of an in-range cell
pub fn cell_index(x: u32, y: u32) -> usize {
    (y * TERRAIN_SIZE + x) as usize
}

/// Raster index with both coordinates wrapped into the grid
pub fn mask_index(x: u32, y: u32) -> usize {
    cell_index(x & TERRAIN_MASK, y & TERRAIN_MASK)
}

/// Interpolate the four cells around a world position.
///
/// `None` when the lower-left cell falls outside `[0, TERRAIN_MASK)`.
fn bilinear<T>(raster: &[T], x: f32, y: f32) -> Option<T>
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>,
{
    let (x, y) = (x / TERRAIN_SCALE, y / TERRAIN_SCALE);
    let (xi, yi) = (x as i32, y as i32);
    let mask = TERRAIN_MASK as i32;
    if xi < 0 || xi >= mask || yi < 0 || yi >= mask {
        return None;
    }
    let (xi, yi) = (xi as u32, yi as u32);

    let l1 = raster[cell_index(xi, yi)];
    let l2 = raster[cell_index(xi + 1, yi)];
    let l3 = raster[cell_index(xi + 1, yi + 1)];
    let l4 = raster[cell_index(xi, yi + 1)];

    let dx = utils::modulo(x, 1.0);
    let dy = utils::modulo(y, 1.0);
    let left = l1 + (l4 - l1) * dy;
    let right = l2 + (l3 - l2) * dy;
    Some(left + (right - left) * dx)
}

/// Device textures owned by a terrain
#[derive(Debug, Default)]
struct TerrainTextures {
    heightmap: Option<TextureHandle>,
    lightmap: Option<TextureHandle>,
    normal: Option<TextureHandle>,
    mapping: Option<TextureHandle>,
    attributes: Option<TextureHandle>,
    ground: Option<LayeredTexture>,
    grass: Option<LayeredTexture>,
}

fn replace_texture(device: &mut dyn GraphicsDevice, slot: &mut Option<TextureHandle>, texture: TextureHandle) {
    if let Some(previous) = slot.replace(texture) {
        device.release_texture(previous);
    }
}

fn read_terrain_file(path: &Path, what: &str) -> Result<(String, Vec<u8>), TerrainError> {
    let bytes = image_loader::read_file(path)
        .inspect_err(|e| log::error!("{what} not found ({}): {e}", path.display()))?;
    Ok((image_loader::extension_of(path), bytes))
}

/// Height field, derived rasters and their GPU resources
#[derive(Debug)]
pub struct Terrain {
    config: TerrainConfig,
    height: Vec<f32>,
    light: Vec<Vec3>,
    primary_light: Vec<Vec3>,
    normal: Vec<Vec3>,
    attributes: Vec<u16>,
    normal_memory: Vec<[u16; 4]>,
    lightmap_memory: Vec<u8>,
    textures: TerrainTextures,
    settings: Option<SettingsUniform>,
    geometry: Option<TerrainGeometry>,
    terrain_pass: Option<TerrainPass>,
    grass_pass: Option<TerrainPass>,
}

impl Terrain {
    /// Flat, unlit terrain with no GPU resources
    pub fn new(config: TerrainConfig) -> Self {
        Self {
            config,
            height: vec![0.0; TERRAIN_CELLS],
            light: vec![Vec3::zeros(); TERRAIN_CELLS],
            primary_light: vec![Vec3::zeros(); TERRAIN_CELLS],
            normal: vec![Vec3::z(); TERRAIN_CELLS],
            attributes: vec![0; TERRAIN_CELLS],
            normal_memory: Vec::new(),
            lightmap_memory: Vec::new(),
            textures: TerrainTextures::default(),
            settings: None,
            geometry: None,
            terrain_pass: None,
            grass_pass: None,
        }
    }

    /// Read `terrain.toml` from `dir` and load everything it names
    pub fn load_from_dir(
        device: &mut dyn GraphicsDevice,
        caches: &mut ShaderCaches,
        context: &RenderContext,
        programs: &TerrainPrograms,
        dir: &Path,
        config: TerrainConfig,
    ) -> Result<Self, TerrainError> {
        let path = dir.join(DEFINITION_FILE);
        let definition = TerrainDefinition::load_from_file(&path)
            .inspect_err(|e| log::error!("terrain definition malformed ({}): {e}", path.display()))?;
        Self::load(device, caches, context, programs, dir, &definition, config)
    }

    /// Load a complete terrain.
    ///
    /// Stops at the first failing step and releases everything created so far.
    pub fn load(
        device: &mut dyn GraphicsDevice,
        caches: &mut ShaderCaches,
        context: &RenderContext,
        programs: &TerrainPrograms,
        dir: &Path,
        definition: &TerrainDefinition,
        config: TerrainConfig,
    ) -> Result<Self, TerrainError> {
        let mut terrain = Self::new(config);
        match terrain.load_steps(device, caches, context, programs, dir, definition) {
            Ok(()) => {
                log::info!(
                    "Loaded terrain from {} ({} ground layers, {} grass layers)",
                    dir.display(),
                    definition.textures.len(),
                    definition.grass.len()
                );
                Ok(terrain)
            }
            Err(e) => {
                terrain.destroy(device);
                Err(e)
            }
        }
    }

    fn load_steps(
        &mut self,
        device: &mut dyn GraphicsDevice,
        caches: &mut ShaderCaches,
        context: &RenderContext,
        programs: &TerrainPrograms,
        dir: &Path,
        definition: &TerrainDefinition,
    ) -> Result<(), TerrainError> {
        self.load_heightmap(device, &dir.join(&definition.heightmap))?;
        self.generate_normal(device)?;
        self.load_lightmap(device, &dir.join(&definition.lightmap))?;
        self.load_textures(device, dir, &definition.textures)?;
        if !definition.grass.is_empty() {
            self.load_grass_textures(device, dir, &definition.grass)?;
        }
        self.load_mappings(device, &dir.join(&definition.mapping))?;
        self.load_attributes(device, &dir.join(&definition.attributes))?;
        self.prepare_settings(device, definition)?;
        self.generate_buffers(device)?;
        self.prepare_pipelines(device, caches, context, programs)
    }

    /// Load the heightmap file at `path`
    pub fn load_heightmap(&mut self, device: &mut dyn GraphicsDevice, path: &Path) -> Result<(), TerrainError> {
        let (extension, bytes) = read_terrain_file(path, "heightmap")?;
        self.load_heightmap_bytes(device, &extension, &bytes)
    }

    /// Decode a heightmap and create its `R8Uint` texture
    pub fn load_heightmap_bytes(
        &mut self,
        device: &mut dyn GraphicsDevice,
        extension: &str,
        bytes: &[u8],
    ) -> Result<(), TerrainError> {
        let cells = heightmap::decode_heightmap(extension, bytes)
            .inspect_err(|e| log::error!("Invalid heightmap: {e}"))?;

        let desc = TextureDesc::texture_2d("TerrainHeight", TERRAIN_SIZE, TERRAIN_SIZE, TextureFormat::R8Uint, Usage::Immutable);
        let texture = device
            .create_texture(&desc, &[TextureData::new(&cells, TERRAIN_SIZE as usize)])
            .inspect_err(|e| log::error!("Failed to create heightmap texture: {e}"))?;
        replace_texture(device, &mut self.textures.heightmap, texture);

        self.height = heightmap::to_heights(&cells, self.config.height_multiplier);
        log::debug!("Loaded heightmap ({} bytes)", bytes.len());
        Ok(())
    }

    /// Derive cell normals from the heights and create the normal texture
    pub fn generate_normal(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), TerrainError> {
        self.normal = normals::generate_normals(&self.height);
        self.normal_memory = normals::pack_normals(&self.normal);

        let desc = TextureDesc::texture_2d("TerrainNormal", TERRAIN_SIZE, TERRAIN_SIZE, TextureFormat::Rgba16Unorm, Usage::Default);
        let bytes: &[u8] = bytemuck::cast_slice(&self.normal_memory);
        let texture = device
            .create_texture(&desc, &[TextureData::new(bytes, desc.row_pitch())])
            .inspect_err(|e| log::error!("Failed to create normal texture: {e}"))?;
        replace_texture(device, &mut self.textures.normal, texture);
        Ok(())
    }

    /// Load the lightmap file at `path`
    pub fn load_lightmap(&mut self, device: &mut dyn GraphicsDevice, path: &Path) -> Result<(), TerrainError> {
        let (extension, bytes) = read_terrain_file(path, "lightmap")?;
        self.load_lightmap_bytes(device, &extension, &bytes)
    }

    /// Decode a lightmap, shade it by the normals and create its texture.
    ///
    /// Needs the normals, so run [`Terrain::generate_normal`] first.
    pub fn load_lightmap_bytes(
        &mut self,
        device: &mut dyn GraphicsDevice,
        extension: &str,
        bytes: &[u8],
    ) -> Result<(), TerrainError> {
        let texels = lightmap::decode_lightmap(extension, bytes)
            .inspect_err(|e| log::error!("Invalid lightmap: {e}"))?;

        let desc = TextureDesc::texture_2d("TerrainLight", TERRAIN_SIZE, TERRAIN_SIZE, TextureFormat::Rgba8Unorm, Usage::Default);
        let texture = device
            .create_texture(&desc, &[TextureData::new(&texels, desc.row_pitch())])
            .inspect_err(|e| log::error!("Failed to create lightmap texture: {e}"))?;
        replace_texture(device, &mut self.textures.lightmap, texture);

        let sun = Vec3::from(self.config.sun_direction);
        self.light = lightmap::shade(&texels, &self.normal, &sun);
        self.primary_light.clone_from(&self.light);
        self.lightmap_memory = texels;
        Ok(())
    }

    fn sampler(&self) -> SamplerDesc {
        SamplerDesc { filter: self.config.texture_filter, address: self.config.texture_address }
    }

    /// Read every ground texture under `dir` and build the ground array
    pub fn load_textures(
        &mut self,
        device: &mut dyn GraphicsDevice,
        dir: &Path,
        entries: &[TerrainTextureEntry],
    ) -> Result<(), TerrainError> {
        let images = entries
            .iter()
            .map(|entry| -> Result<_, TerrainError> {
                let image = ImageData::from_file(dir.join(&entry.path))
                    .inspect_err(|e| log::error!("Failed to load terrain texture {}: {e}", entry.path))?;
                Ok((entry.clone(), image))
            })
            .collect::<Result<Vec<_>, TerrainError>>()?;
        self.load_texture_images(device, &images)
    }

    /// Build the ground array from decoded images
    pub fn load_texture_images(
        &mut self,
        device: &mut dyn GraphicsDevice,
        images: &[(TerrainTextureEntry, ImageData)],
    ) -> Result<(), TerrainError> {
        let layered = textures::build_ground_layers(device, images, self.config.uv_normal, self.config.uv_scaled, self.sampler())
            .inspect_err(|e| log::error!("Failed to build terrain textures: {e}"))?;
        if let Some(previous) = self.textures.ground.replace(layered) {
            previous.release(device);
        }
        Ok(())
    }

    /// Read every grass texture under `dir` and build the grass array
    pub fn load_grass_textures(
        &mut self,
        device: &mut dyn GraphicsDevice,
        dir: &Path,
        entries: &[GrassTextureEntry],
    ) -> Result<(), TerrainError> {
        let images = entries
            .iter()
            .map(|entry| -> Result<_, TerrainError> {
                let image = ImageData::from_file(dir.join(&entry.path))
                    .inspect_err(|e| log::error!("Failed to load grass texture {}: {e}", entry.path))?;
                Ok((entry.clone(), image))
            })
            .collect::<Result<Vec<_>, TerrainError>>()?;
        self.load_grass_images(device, &images)
    }

    /// Build the grass array from decoded images
    pub fn load_grass_images(
        &mut self,
        device: &mut dyn GraphicsDevice,
        images: &[(GrassTextureEntry, ImageData)],
    ) -> Result<(), TerrainError> {
        let layered = textures::build_grass_layers(device, images, self.sampler())
            .inspect_err(|e| log::error!("Failed to build grass textures: {e}"))?;
        if let Some(previous) = self.textures.grass.replace(layered) {
            previous.release(device);
        }
        Ok(())
    }

    /// Load the mapping file at `path`
    pub fn load_mappings(&mut self, device: &mut dyn GraphicsDevice, path: &Path) -> Result<(), TerrainError> {
        let (_, bytes) = read_terrain_file(path, "mapping")?;
        self.load_mappings_bytes(device, &bytes)
    }

    /// Decode a mapping file against the loaded texture arrays.
    ///
    /// The ground textures must be loaded; grass is optional.
    pub fn load_mappings_bytes(&mut self, device: &mut dyn GraphicsDevice, bytes: &[u8]) -> Result<(), TerrainError> {
        let Some(ground) = &self.textures.ground else {
            log::error!("Mapping loaded before the terrain textures");
            return Err(TerrainError::NotLoaded("terrain textures"));
        };
        let no_grass = HashMap::new();
        let grass = self.textures.grass.as_ref().map_or(&no_grass, |grass| &grass.layers);

        let cells = mapping::decode_mappings(bytes, &ground.layers, grass)
            .inspect_err(|e| log::error!("Invalid mapping: {e}"))?;

        let desc = TextureDesc::texture_2d("TerrainMapping", TERRAIN_SIZE, TERRAIN_SIZE, TextureFormat::Rgba8Uint, Usage::Immutable);
        let texture = device
            .create_texture(&desc, &[TextureData::new(bytemuck::cast_slice(&cells), desc.row_pitch())])
            .inspect_err(|e| log::error!("Failed to create mapping texture: {e}"))?;
        replace_texture(device, &mut self.textures.mapping, texture);
        Ok(())
    }

    /// Load the attribute file at `path`
    pub fn load_attributes(&mut self, device: &mut dyn GraphicsDevice, path: &Path) -> Result<(), TerrainError> {
        let (_, bytes) = read_terrain_file(path, "attributes")?;
        self.load_attributes_bytes(device, &bytes)
    }

    /// Decode an attribute file and create its `R16Uint` texture
    pub fn load_attributes_bytes(&mut self, device: &mut dyn GraphicsDevice, bytes: &[u8]) -> Result<(), TerrainError> {
        let cells = attributes::decode_attributes(bytes)
            .inspect_err(|e| log::error!("Invalid attributes: {e}"))?;

        let desc = TextureDesc::texture_2d("TerrainAttributes", TERRAIN_SIZE, TERRAIN_SIZE, TextureFormat::R16Uint, Usage::Default);
        let texture = device
            .create_texture(&desc, &[TextureData::new(bytemuck::cast_slice(&cells), desc.row_pitch())])
            .inspect_err(|e| log::error!("Failed to create attributes texture: {e}"))?;
        replace_texture(device, &mut self.textures.attributes, texture);

        self.attributes = cells;
        Ok(())
    }

    /// Keep the water and wind parameters and create the settings buffer
    pub fn prepare_settings(
        &mut self,
        device: &mut dyn GraphicsDevice,
        definition: &TerrainDefinition,
    ) -> Result<(), TerrainError> {
        let uniform = SettingsUniform::new(device, definition.water, definition.wind)
            .inspect_err(|e| log::error!("Failed to create terrain settings buffer: {e}"))?;
        if let Some(previous) = self.settings.replace(uniform) {
            previous.release(device);
        }
        Ok(())
    }

    /// Create the quad grid buffers
    pub fn generate_buffers(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), TerrainError> {
        let geometry = TerrainGeometry::new(device)
            .inspect_err(|e| log::error!("Failed to create terrain buffers: {e}"))?;
        if let Some(previous) = self.geometry.replace(geometry) {
            previous.release(device);
        }
        Ok(())
    }

    /// Resolve the terrain pipeline, and the grass pipeline when grass is loaded
    pub fn prepare_pipelines(
        &mut self,
        device: &mut dyn GraphicsDevice,
        caches: &mut ShaderCaches,
        context: &RenderContext,
        programs: &TerrainPrograms,
    ) -> Result<(), TerrainError> {
        let required = |texture: Option<TextureHandle>, what| texture.ok_or(TerrainError::NotLoaded(what));
        let textures = &self.textures;
        let ground = textures.ground.as_ref().ok_or(TerrainError::NotLoaded("terrain textures"))?;
        let settings = self.settings.as_ref().ok_or(TerrainError::NotLoaded("terrain settings"))?;
        let resources = PassResources {
            height: required(textures.heightmap, "heightmap")?,
            light: required(textures.lightmap, "lightmap")?,
            normal: required(textures.normal, "normals")?,
            mapping: required(textures.mapping, "mapping")?,
            uv: ground.uv,
            attributes: required(textures.attributes, "attributes")?,
            settings: settings.buffer(),
            textures: ground.array,
        };

        let terrain_pass = pipelines::prepare_pass(
            device,
            caches,
            context,
            programs.terrain,
            &DynamicPipelineState::default(),
            &resources,
        )
        .inspect_err(|e| log::error!("Failed to prepare terrain pipeline: {e}"))?;

        let grass_pass = match &textures.grass {
            Some(grass) => {
                let resources = PassResources { uv: grass.uv, textures: grass.array, ..resources };
                let pass = pipelines::prepare_pass(device, caches, context, programs.grass, &pipelines::grass_state(), &resources)
                    .inspect_err(|e| log::error!("Failed to prepare grass pipeline: {e}"))?;
                Some(pass)
            }
            None => None,
        };

        self.terrain_pass = Some(terrain_pass);
        self.grass_pass = grass_pass;
        Ok(())
    }

    /// Restore the primary light from the shaded base layer
    pub fn reset(&mut self) {
        self.primary_light.copy_from_slice(&self.light);
    }

    /// Recompute the water and wind constants for `world_time`
    pub fn configure_uniforms(&mut self, device: &mut dyn GraphicsDevice, world_time: f32) -> BackendResult<()> {
        match &mut self.settings {
            Some(settings) => settings.configure(device, world_time),
            None => Ok(()),
        }
    }

    /// Re-upload the lightmap, normal and attribute rasters
    pub fn update(&self, device: &mut dyn GraphicsDevice) -> BackendResult<()> {
        if let Some(texture) = self.textures.lightmap {
            device.update_texture(texture, TextureData::new(&self.lightmap_memory, TERRAIN_SIZE as usize * 4))?;
        }
        if let Some(texture) = self.textures.normal {
            let bytes: &[u8] = bytemuck::cast_slice(&self.normal_memory);
            device.update_texture(texture, TextureData::new(bytes, TERRAIN_SIZE as usize * 8))?;
        }
        if let Some(texture) = self.textures.attributes {
            let bytes: &[u8] = bytemuck::cast_slice(&self.attributes);
            device.update_texture(texture, TextureData::new(bytes, TERRAIN_SIZE as usize * 2))?;
        }
        Ok(())
    }

    /// Submit the ground pass, then the grass pass when grass is loaded
    pub fn render(&self, device: &mut dyn GraphicsDevice) {
        let Some(geometry) = &self.geometry else {
            log::trace!("Terrain has no buffers, skipping");
            return;
        };

        if let Some(pass) = &self.terrain_pass {
            pipelines::draw_pass(device, geometry, pass, RenderClassify::Opaque);
        }
        if self.textures.grass.is_some() {
            if let Some(pass) = &self.grass_pass {
                pipelines::draw_pass(device, geometry, pass, RenderClassify::PreAlpha);
            }
        }
    }

    /// Release every texture and buffer; the CPU rasters stay readable
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        let textures = std::mem::take(&mut self.textures);
        let singles = [textures.heightmap, textures.lightmap, textures.normal, textures.mapping, textures.attributes];
        for texture in singles.into_iter().flatten() {
            device.release_texture(texture);
        }
        if let Some(ground) = textures.ground {
            ground.release(device);
        }
        if let Some(grass) = textures.grass {
            grass.release(device);
        }
        if let Some(settings) = self.settings.take() {
            settings.release(device);
        }
        if let Some(geometry) = self.geometry.take() {
            geometry.release(device);
        }
        self.terrain_pass = None;
        self.grass_pass = None;
    }

    /// Height of a cell
    pub fn height(&self, x: u32, y: u32) -> f32 {
        self.height[mask_index(x, y)]
    }

    /// Shaded base light of a cell
    pub fn light(&self, x: u32, y: u32) -> Vec3 {
        self.light[mask_index(x, y)]
    }

    /// Working light of a cell for this tick
    pub fn primary_light(&self, x: u32, y: u32) -> Vec3 {
        self.primary_light[mask_index(x, y)]
    }

    /// Face normal of a cell
    pub fn normal(&self, x: u32, y: u32) -> Vec3 {
        self.normal[mask_index(x, y)]
    }

    /// Attribute flags of a cell
    pub fn attribute(&self, x: u32, y: u32) -> TerrainAttribute {
        TerrainAttribute::from_bits_retain(self.attributes[mask_index(x, y)])
    }

    /// Whether a cell has any of `flags`
    pub fn has_attribute(&self, x: u32, y: u32, flags: TerrainAttribute) -> bool {
        self.attribute(x, y).intersects(flags)
    }

    /// Set or clear `flags` on a cell; uploaded by the next [`Terrain::update`]
    pub fn set_attribute(&mut self, x: u32, y: u32, flags: TerrainAttribute, enabled: bool) {
        let mut attribute = self.attribute(x, y);
        attribute.set(flags, enabled);
        self.attributes[mask_index(x, y)] = attribute.bits();
    }

    /// Bilinear working light at a world position, zero off the grid
    pub fn calculate_primary_light(&self, x: f32, y: f32) -> Vec3 {
        bilinear(&self.primary_light, x, y).unwrap_or_else(Vec3::zeros)
    }

    /// Bilinear base light at a world position, zero off the grid
    pub fn calculate_back_light(&self, x: f32, y: f32) -> Vec3 {
        bilinear(&self.light, x, y).unwrap_or_else(Vec3::zeros)
    }

    /// Bilinear ground height at a world position, zero off the grid
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        bilinear(&self.height, x, y).unwrap_or(0.0)
    }

    /// Brighten the working light around a world position.
    ///
    /// Cells within `range` cells gain `color` with a linear falloff. The
    /// next [`Terrain::reset`] undoes it.
    pub fn add_primary_light(&mut self, x: f32, y: f32, color: &Vec3, range: u32) {
        if range == 0 {
            return;
        }
        let (cx, cy) = (x / TERRAIN_SCALE, y / TERRAIN_SCALE);
        let (xi, yi) = (cx as i32, cy as i32);
        let reach = range as i32;
        let size = TERRAIN_SIZE as i32;

        for cell_y in (yi - reach).max(0)..=(yi + reach).min(size - 1) {
            for cell_x in (xi - reach).max(0)..=(xi + reach).min(size - 1) {
                let (dx, dy) = (cx - cell_x as f32, cy - cell_y as f32);
                let falloff = (range as f32 - (dx * dx + dy * dy).sqrt()) / range as f32;
                if falloff > 0.0 {
                    self.primary_light[cell_index(cell_x as u32, cell_y as u32)] += *color * falloff;
                }
            }
        }
    }

    /// Light position handed to model shaders
    pub fn light_position(&self) -> Vec4 {
        Vec4::from(self.config.light_position)
    }

    /// Load-time constants
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Constants uploaded by the last [`Terrain::configure_uniforms`]
    pub fn settings(&self) -> Option<&TerrainSettings> {
        self.settings.as_ref().map(SettingsUniform::current)
    }

    /// Ground array layer of a texture id
    pub fn texture_layer(&self, id: u32) -> Option<u32> {
        self.textures.ground.as_ref().and_then(|ground| ground.layer_of(id))
    }

    /// Grass array layer of a grass id
    pub fn grass_layer(&self, id: u32) -> Option<u32> {
        self.textures.grass.as_ref().and_then(|grass| grass.layer_of(id))
    }

    /// Whether a grass pass will be drawn
    pub fn has_grass(&self) -> bool {
        self.textures.grass.is_some()
    }

    /// Lightmap texture, for effects that sample it
    pub fn lightmap_texture(&self) -> Option<TextureHandle> {
        self.textures.lightmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::ShaderProgramId;
    use crate::render::backends::RecordingDevice;
    use crate::render::context::RenderTargets;
    use crate::render::pipeline::CullMode;
    use crate::render::render_queue::DrawKind;
    use approx::assert_relative_eq;
    use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn ozb(value: u8) -> Vec<u8> {
        let mut bytes = vec![0; heightmap::OZB_HEADER_SIZE];
        bytes.extend(std::iter::repeat(value).take(TERRAIN_CELLS));
        bytes
    }

    fn lightmap_jpeg(color: [u8; 3]) -> Vec<u8> {
        let image = RgbImage::from_pixel(TERRAIN_SIZE, TERRAIN_SIZE, image::Rgb(color));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg).unwrap();
        bytes
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, image::Rgba([90, 140, 60, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    fn programs() -> TerrainPrograms {
        TerrainPrograms { terrain: ShaderProgramId(10), grass: ShaderProgramId(11) }
    }

    /// World directory with every file a terrain needs
    struct WorldDir(PathBuf);

    impl WorldDir {
        fn new(name: &str, attributes_header: [u8; 4]) -> Self {
            let dir = std::env::temp_dir().join(format!("scene_engine_{name}_{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();

            let mut light = vec![0; lightmap::OZJ_HEADER_SIZE];
            light.extend(lightmap_jpeg([200, 200, 200]));
            std::fs::write(dir.join("terrain_height.ozb"), ozb(128)).unwrap();
            std::fs::write(dir.join("terrain_light.ozj"), light).unwrap();
            std::fs::write(dir.join("ground0.png"), png(16, 16)).unwrap();
            std::fs::write(dir.join("ground1.png"), png(8, 32)).unwrap();
            std::fs::write(dir.join("grass0.png"), png(16, 8)).unwrap();
            std::fs::write(dir.join("terrain.map"), mapping::tests::mapping_file(0, 1, 128)).unwrap();
            std::fs::write(
                dir.join("terrain.att"),
                attributes::tests::attribute_file(attributes_header, &vec![0x01; TERRAIN_CELLS], false),
            )
            .unwrap();
            std::fs::write(
                dir.join(DEFINITION_FILE),
                r#"
                [[textures]]
                id = 0
                path = "ground0.png"

                [[textures]]
                id = 1
                path = "ground1.png"
                water = true

                [[grass]]
                id = 0
                path = "grass0.png"

                [water]
                modulus = 10.0
                multiplier = 0.1
                "#,
            )
            .unwrap();
            Self(dir)
        }
    }

    impl Drop for WorldDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn test_new_terrain_is_flat_and_dark() {
        let terrain = Terrain::new(TerrainConfig::default());
        assert_relative_eq!(terrain.height(10, 10), 0.0);
        assert_eq!(terrain.normal(0, 0), Vec3::z());
        assert_eq!(terrain.calculate_primary_light(500.0, 500.0), Vec3::zeros());
        assert!(terrain.attribute(3, 3).is_empty());
    }

    #[test]
    fn test_uniform_heightmap_and_flat_normals() {
        let mut device = RecordingDevice::new();
        let mut terrain = Terrain::new(TerrainConfig::default());
        terrain.load_heightmap_bytes(&mut device, "ozb", &ozb(128)).unwrap();
        terrain.generate_normal(&mut device).unwrap();

        for (x, y) in [(0, 0), (17, 200), (255, 255)] {
            assert_relative_eq!(terrain.height(x, y), 192.0);
            assert_relative_eq!(terrain.normal(x, y), Vec3::z(), epsilon = 1e-6);
        }
        assert_eq!(device.texture_count(), 2);
    }

    #[test]
    fn test_exact_lookups_wrap() {
        let mut terrain = Terrain::new(TerrainConfig::default());
        terrain.height[cell_index(3, 4)] = 7.0;
        assert_relative_eq!(terrain.height(3 + 256, 4 + 512), 7.0);
    }

    #[test]
    fn test_bilinear_matches_grid_points() {
        let mut terrain = Terrain::new(TerrainConfig::default());
        for y in 0..TERRAIN_SIZE {
            for x in 0..TERRAIN_SIZE {
                let value = Vec3::new(x as f32 * 0.01, y as f32 * 0.02, ((x * 7 + y * 3) % 11) as f32);
                terrain.primary_light[cell_index(x, y)] = value;
                terrain.light[cell_index(x, y)] = value * 0.5;
            }
        }

        for (gx, gy) in [(0, 0), (10, 20), (254, 254), (100, 3)] {
            let (wx, wy) = (gx as f32 * TERRAIN_SCALE, gy as f32 * TERRAIN_SCALE);
            assert_relative_eq!(terrain.calculate_primary_light(wx, wy), terrain.primary_light(gx, gy), epsilon = 1e-5);
            assert_relative_eq!(terrain.calculate_back_light(wx, wy), terrain.light(gx, gy), epsilon = 1e-5);
        }

        // halfway between two columns of a linear ramp
        let mid = terrain.calculate_primary_light(10.5 * TERRAIN_SCALE, 20.0 * TERRAIN_SCALE);
        assert_relative_eq!(mid.x, 0.105, epsilon = 1e-5);
    }

    #[test]
    fn test_height_at_interpolates_heightmap() {
        let mut terrain = Terrain::new(TerrainConfig::default());
        for y in 0..TERRAIN_SIZE {
            for x in 0..TERRAIN_SIZE {
                terrain.height[cell_index(x, y)] = x as f32 * 2.0 + y as f32 * 10.0;
            }
        }
        // one raised corner breaks the plane inside a single cell
        terrain.height[cell_index(51, 61)] += 8.0;

        assert_relative_eq!(terrain.height_at(7.0 * TERRAIN_SCALE, 9.0 * TERRAIN_SCALE), terrain.height(7, 9));
        assert_relative_eq!(terrain.height_at(10.25 * TERRAIN_SCALE, 20.5 * TERRAIN_SCALE), 225.5, epsilon = 1e-3);
        // plane 706 plus a quarter of the raised corner
        assert_relative_eq!(terrain.height_at(50.5 * TERRAIN_SCALE, 60.5 * TERRAIN_SCALE), 708.0, epsilon = 1e-3);
        assert_relative_eq!(terrain.height_at(50.5 * TERRAIN_SCALE, 59.5 * TERRAIN_SCALE), 696.0, epsilon = 1e-3);

        for (x, y) in [(-150.0, 500.0), (500.0, -150.0), (255.0 * TERRAIN_SCALE, 500.0), (1.0e6, 0.0)] {
            assert_eq!(terrain.height_at(x, y), 0.0);
        }
    }

    #[test]
    fn test_bilinear_outside_grid_is_zero() {
        let mut terrain = Terrain::new(TerrainConfig::default());
        terrain.primary_light.fill(Vec3::new(1.0, 1.0, 1.0));
        terrain.light.fill(Vec3::new(1.0, 1.0, 1.0));

        let outside = [
            (-150.0, 500.0),
            (500.0, -150.0),
            (255.0 * TERRAIN_SCALE, 500.0),
            (500.0, 255.0 * TERRAIN_SCALE + 50.0),
            (1.0e6, 1.0e6),
        ];
        for (x, y) in outside {
            assert_eq!(terrain.calculate_primary_light(x, y), Vec3::zeros());
            assert_eq!(terrain.calculate_back_light(x, y), Vec3::zeros());
        }
        assert_eq!(terrain.calculate_primary_light(254.9 * TERRAIN_SCALE, 0.0), Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_primary_light_reset_each_tick() {
        let mut terrain = Terrain::new(TerrainConfig::default());
        terrain.light.fill(Vec3::new(0.2, 0.2, 0.2));
        terrain.reset();

        terrain.add_primary_light(1000.0, 1000.0, &Vec3::new(1.0, 0.5, 0.0), 3);
        assert_relative_eq!(terrain.primary_light(10, 10), Vec3::new(1.2, 0.7, 0.2), epsilon = 1e-6);
        assert!(terrain.primary_light(12, 10).x > 0.2);
        assert_relative_eq!(terrain.primary_light(14, 10), Vec3::new(0.2, 0.2, 0.2));

        terrain.reset();
        assert_relative_eq!(terrain.primary_light(10, 10), Vec3::new(0.2, 0.2, 0.2));
    }

    #[test]
    fn test_attribute_edits_upload() {
        let mut device = RecordingDevice::new();
        let mut terrain = Terrain::new(TerrainConfig::default());
        let file = attributes::tests::attribute_file([0, 0, 255, 255], &vec![0x04; TERRAIN_CELLS], false);
        terrain.load_attributes_bytes(&mut device, &file).unwrap();

        assert!(terrain.has_attribute(5, 5, TerrainAttribute::NO_MOVE));
        terrain.set_attribute(5, 5, TerrainAttribute::NO_MOVE, false);
        terrain.set_attribute(5, 5, TerrainAttribute::SAFE_ZONE, true);
        assert!(!terrain.has_attribute(5, 5, TerrainAttribute::NO_MOVE));
        assert_eq!(terrain.attribute(5, 5), TerrainAttribute::SAFE_ZONE);

        terrain.update(&mut device).unwrap();
        let texture = device.texture(terrain.textures.attributes.unwrap()).unwrap();
        assert_eq!(texture.updates, 1);
        let index = cell_index(5, 5) * 2;
        assert_eq!(&texture.layers[0][index..index + 2], &[0x01, 0x00]);
    }

    #[test]
    fn test_mappings_need_textures() {
        let mut device = RecordingDevice::new();
        let mut terrain = Terrain::new(TerrainConfig::default());
        let result = terrain.load_mappings_bytes(&mut device, &mapping::tests::mapping_file(0, 0, 0));
        assert!(matches!(result, Err(TerrainError::NotLoaded("terrain textures"))));
    }

    #[test]
    fn test_full_load_and_render() {
        let world = WorldDir::new("terrain_full", [0, 0, 255, 255]);
        let mut device = RecordingDevice::new();
        let mut caches = ShaderCaches::new();
        let context = RenderContext::new(&mut device, RenderTargets::default()).unwrap();

        let mut terrain = Terrain::load_from_dir(
            &mut device,
            &mut caches,
            &context,
            &programs(),
            &world.0,
            TerrainConfig::default(),
        )
        .unwrap();

        assert_relative_eq!(terrain.height(40, 40), 192.0);
        assert!(terrain.has_grass());
        assert_eq!(terrain.texture_layer(1), Some(1));
        assert_eq!(terrain.grass_layer(0), Some(0));
        assert!(terrain.has_attribute(0, 0, TerrainAttribute::SAFE_ZONE));

        // flat ground facing up, sun at z = 0.5: full strength
        let light = terrain.calculate_primary_light(4000.0, 4000.0);
        assert_relative_eq!(light.x, 200.0 / 255.0, epsilon = 0.02);

        let terrain_pass = terrain.terrain_pass.unwrap();
        let recorded = device.pipeline(terrain_pass.pipeline).unwrap();
        assert_eq!(recorded.fixed.program, ShaderProgramId(10));
        for name in ["ModelViewProj", "g_HeightTexture", "g_LightTexture", "g_NormalTexture", "g_MappingTexture", "g_UVTexture", "g_AttributesTexture", "TerrainSettings", "g_Textures"] {
            assert!(recorded.statics.contains_key(name), "missing {name}");
        }

        let grass_pass = terrain.grass_pass.unwrap();
        let grass = device.pipeline(grass_pass.pipeline).unwrap();
        assert_eq!(grass.dynamic.cull_mode, CullMode::None);
        assert!(!grass.dynamic.depth_write);
        assert!(!grass.dynamic.alpha_write);
        assert!(grass.dynamic.blend_enable);

        terrain.configure_uniforms(&mut device, 25.0).unwrap();
        assert_relative_eq!(terrain.settings().unwrap().water_move, 0.5);

        terrain.render(&mut device);
        let draws: Vec<_> = device.queue().iter().collect();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].classify, RenderClassify::Opaque);
        assert_eq!(draws[0].pipeline, Some(terrain_pass.pipeline));
        assert_eq!(draws[1].classify, RenderClassify::PreAlpha);
        assert_eq!(draws[1].kind, DrawKind::Indexed { index_count: TERRAIN_INDEX_COUNT });

        terrain.destroy(&mut device);
        assert_eq!(device.texture_count(), 0);
        terrain.render(&mut device);
        assert_eq!(device.queue().len(), 2);
    }

    #[test]
    fn test_failed_load_releases_resources() {
        let world = WorldDir::new("terrain_bad_attributes", [0, 0, 128, 255]);
        let mut device = RecordingDevice::new();
        let mut caches = ShaderCaches::new();
        let context = RenderContext::new(&mut device, RenderTargets::default()).unwrap();
        let buffers_before = device.buffer_count();

        let result = Terrain::load_from_dir(&mut device, &mut caches, &context, &programs(), &world.0, TerrainConfig::default());
        assert!(matches!(result, Err(TerrainError::InvalidAttributesHeader { width: 128, .. })));
        assert_eq!(device.texture_count(), 0);
        assert_eq!(device.buffer_count(), buffers_before);
    }

    #[test]
    fn test_missing_definition() {
        let mut device = RecordingDevice::new();
        let mut caches = ShaderCaches::new();
        let context = RenderContext::new(&mut device, RenderTargets::default()).unwrap();
        let dir = std::env::temp_dir().join("scene_engine_no_such_world");

        let result = Terrain::load_from_dir(&mut device, &mut caches, &context, &programs(), &dir, TerrainConfig::default());
        assert!(matches!(result, Err(TerrainError::Definition(_))));
    }
}
