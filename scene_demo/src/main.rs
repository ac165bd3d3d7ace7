//! Headless scene demo
//!
//! Builds a procedural terrain, scatters a field of crystals over it and
//! orbits a camera for a fixed number of frames, logging what each frame
//! submitted to the recording device.
//!
//! ```text
//! scene_demo [config.toml] [world_dir]
//! ```
//!
//! Without a world directory the terrain is generated in memory.

use std::error::Error;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, RgbImage};

use scene_engine::assets::ImageData;
use scene_engine::core::{Config, SceneConfig};
use scene_engine::ecs::components::{BoundingBox, Light, Position};
use scene_engine::foundation::logging;
use scene_engine::foundation::math::Vec3;
use scene_engine::foundation::time::FrameClock;
use scene_engine::render::api::{BindFlags, BufferDesc, GraphicsDevice, RenderClassify, ShaderProgramId};
use scene_engine::render::context::{RenderContext, RenderTargets};
use scene_engine::render::model::{Mesh, MeshRenderSettings, Model, ModelRenderer, ModelTexture};
use scene_engine::render::skeleton::RigidPose;
use scene_engine::render::{Camera, RecordingDevice, RenderError, ShaderCaches, Texture, TextureKind};
use scene_engine::scene::{EffectSystem, Environment, NullEffects};
use scene_engine::terrain::crypt::{bux_convert, xor_encrypt};
use scene_engine::terrain::heightmap::OZB_HEADER_SIZE;
use scene_engine::terrain::{
    GrassTextureEntry, Terrain, TerrainDefinition, TerrainError, TerrainPrograms, TerrainTextureEntry,
    TERRAIN_CELLS, TERRAIN_SCALE, TERRAIN_SIZE,
};

const FRAME_COUNT: u32 = 120;
const FRAME_TIME: Duration = Duration::from_millis(16);
const CRYSTAL_GRID: u32 = 12;

const PROGRAMS: TerrainPrograms = TerrainPrograms { terrain: ShaderProgramId(1), grass: ShaderProgramId(2) };
const CRYSTAL_PROGRAM: ShaderProgramId = ShaderProgramId(3);

/// Counts simulated sparks; draws nothing
struct SparkCounter {
    ticks: u64,
    frames: u64,
}

impl EffectSystem for SparkCounter {
    fn name(&self) -> &str {
        "sparks"
    }

    fn initialize(&mut self, _device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        Ok(())
    }

    fn update(&mut self, update_count: u32) {
        self.ticks += u64::from(update_count);
    }

    fn propagate(&mut self) {
        self.frames += 1;
    }

    fn render(&mut self, _device: &mut dyn GraphicsDevice, _context: &RenderContext) {}

    fn destroy(&mut self, _device: &mut dyn GraphicsDevice) {
        log::info!("Sparks simulated {} ticks over {} frames", self.ticks, self.frames);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SceneConfig::load_from_file(&path)?,
        None => SceneConfig::default(),
    };
    config.validate()?;
    logging::init_with_filter(&config.logging.filter);
    let world_dir = args.next().map(PathBuf::from);

    let mut device = RecordingDevice::new();
    let mut caches = ShaderCaches::new();
    let mut context = RenderContext::new(&mut device, RenderTargets::default())?;

    let terrain = match &world_dir {
        Some(dir) => Terrain::load_from_dir(&mut device, &mut caches, &context, &PROGRAMS, dir, config.terrain.clone())?,
        None => procedural_terrain(&mut device, &mut caches, &context, &config)?,
    };
    let renderer = ModelRenderer::new(&mut device)?;
    let mut environment = Environment::new(
        &mut device,
        &config.environment,
        terrain,
        renderer,
        Box::new(SparkCounter { ticks: 0, frames: 0 }),
        Box::new(NullEffects::new("joints")),
    )?;

    let crystal = Arc::new(crystal_model(&mut device)?);
    spawn_crystals(&mut environment, &crystal);
    log::info!(
        "Spawned {} crystals, updating with the {} strategy",
        environment.entities().len(),
        environment.strategy_name()
    );

    let center = Vec3::new(128.0 * TERRAIN_SCALE, 128.0 * TERRAIN_SCALE, 0.0);
    let mut camera = Camera::perspective(center, 45.0, 16.0 / 9.0, 10.0, 20000.0);
    let mut clock = FrameClock::default();
    let mut total_draws = 0;

    for frame_index in 0..FRAME_COUNT {
        let frame = clock.advance(FRAME_TIME);

        let angle = frame.world_time * 0.0005;
        camera.position = center + Vec3::new(angle.cos() * 3000.0, angle.sin() * 3000.0, 2000.0);
        camera.look_at(center);
        let snapshot = camera.snapshot();
        context.update_camera(&mut device, &snapshot, &camera.position)?;

        environment.reset(&frame);
        environment.update(&mut device, &frame, &snapshot)?;
        let drawn = environment.render(&mut device, &mut caches, &context, &frame)?;
        total_draws += drawn;

        device.end_frame(|queue| {
            let level = if frame_index % 30 == 0 { log::Level::Info } else { log::Level::Debug };
            log::log!(
                level,
                "Frame {frame_index}: {} ticks, {drawn} crystal meshes, {} opaque / {} pre-alpha / {} alpha draws",
                frame.update_count,
                queue.bucket(RenderClassify::Opaque).len(),
                queue.bucket(RenderClassify::PreAlpha).len(),
                queue.bucket(RenderClassify::Alpha).len(),
            );
        });
    }

    log::info!("Rendered {FRAME_COUNT} frames, {total_draws} crystal meshes in total");

    environment.destroy(&mut device, &mut caches);
    if let Some(texture) = crystal.textures.iter().find_map(|slot| slot.texture.clone()) {
        device.release_texture(texture.handle());
    }
    if let Some(buffer) = crystal.vertex_buffer {
        device.release_buffer(buffer);
    }
    context.destroy(&mut device);
    log::info!(
        "Device released: {} buffers, {} textures, {} pipelines left",
        device.buffer_count(),
        device.texture_count(),
        device.pipeline_count()
    );
    Ok(())
}

/// Terrain built from in-memory files: rolling hills, a lit clearing in the
/// middle and two ground layers blended across the map
fn procedural_terrain(
    device: &mut dyn GraphicsDevice,
    caches: &mut ShaderCaches,
    context: &RenderContext,
    config: &SceneConfig,
) -> Result<Terrain, Box<dyn Error>> {
    let definition = TerrainDefinition {
        textures: vec![
            TerrainTextureEntry { id: 0, path: "grass".into(), scaled: false, water: false },
            TerrainTextureEntry { id: 1, path: "rock".into(), scaled: true, water: false },
        ],
        grass: vec![GrassTextureEntry { id: 0, path: "tufts".into() }],
        ..TerrainDefinition::default()
    };
    let ground = vec![
        (definition.textures[0].clone(), ImageData::solid_color(64, 64, [70, 120, 50, 255])),
        (definition.textures[1].clone(), ImageData::solid_color(64, 64, [110, 100, 90, 255])),
    ];
    let grass = vec![(definition.grass[0].clone(), ImageData::solid_color(32, 32, [90, 160, 60, 200]))];
    let lightmap = lightmap_jpeg()?;

    let mut terrain = Terrain::new(config.terrain.clone());
    let result = (|| -> Result<(), TerrainError> {
        terrain.load_heightmap_bytes(device, "ozb", &heightmap_file())?;
        terrain.generate_normal(device)?;
        terrain.load_lightmap_bytes(device, "jpg", &lightmap)?;
        terrain.load_texture_images(device, &ground)?;
        terrain.load_grass_images(device, &grass)?;
        terrain.load_mappings_bytes(device, &mapping_file())?;
        terrain.load_attributes_bytes(device, &attribute_file())?;
        terrain.prepare_settings(device, &definition)?;
        terrain.generate_buffers(device)?;
        terrain.prepare_pipelines(device, caches, context, &PROGRAMS)
    })();

    match result {
        Ok(()) => Ok(terrain),
        Err(e) => {
            terrain.destroy(device);
            Err(e.into())
        }
    }
}

fn cells() -> impl Iterator<Item = (u32, u32)> {
    (0..TERRAIN_SIZE).flat_map(|y| (0..TERRAIN_SIZE).map(move |x| (x, y)))
}

fn heightmap_file() -> Vec<u8> {
    let mut bytes = vec![0; OZB_HEADER_SIZE];
    bytes.extend(cells().map(|(x, y)| {
        let hills = (x as f32 / 20.0).sin() * (y as f32 / 24.0).cos();
        (64.0 + 32.0 * hills) as u8
    }));
    bytes
}

fn lightmap_jpeg() -> Result<Vec<u8>, image::ImageError> {
    let image = RgbImage::from_fn(TERRAIN_SIZE, TERRAIN_SIZE, |x, y| {
        let dx = x as f32 - 128.0;
        let dy = y as f32 - 128.0;
        let glow = (1.0 - (dx * dx + dy * dy).sqrt() / 181.0).clamp(0.0, 1.0);
        let level = (120.0 + 120.0 * glow) as u8;
        image::Rgb([level, level, level.saturating_sub(20)])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
    Ok(bytes)
}

fn mapping_file() -> Vec<u8> {
    let mut bytes = vec![0, 1];
    bytes.extend(std::iter::repeat(0).take(TERRAIN_CELLS));
    bytes.extend(std::iter::repeat(1).take(TERRAIN_CELLS));
    bytes.extend(cells().map(|(x, _)| x as u8));
    xor_encrypt(&mut bytes);
    bytes
}

fn attribute_file() -> Vec<u8> {
    let mut bytes = vec![0, 0, 255, 255];
    bytes.extend(cells().map(|(x, y)| {
        let clearing = x.abs_diff(128) < 8 && y.abs_diff(128) < 8;
        u8::from(clearing)
    }));
    bux_convert(&mut bytes);
    xor_encrypt(&mut bytes);
    bytes
}

/// Single-mesh model with a solid skin texture
fn crystal_model(device: &mut dyn GraphicsDevice) -> Result<Model, RenderError> {
    const VERTEX_COUNT: u32 = 36;
    let vertices = vec![0u8; VERTEX_COUNT as usize * 32];
    let vertex_buffer = device.create_buffer(
        &BufferDesc::immutable("CrystalVertices", vertices.len(), BindFlags::VERTEX_BUFFER),
        Some(&vertices),
    )?;
    let skin = Texture::from_image(device, "CrystalSkin", &ImageData::solid_color(16, 16, [150, 200, 255, 255]), None)?;

    Ok(Model {
        name: "crystal".into(),
        meshes: vec![Mesh {
            vertex_count: VERTEX_COUNT,
            vertex_offset: 0,
            settings: MeshRenderSettings { program: CRYSTAL_PROGRAM, ..MeshRenderSettings::default() },
        }],
        textures: vec![ModelTexture { kind: TextureKind::Skin, texture: Some(Arc::new(skin)) }],
        global_bbox: Some(BoundingBox::new(Vec3::new(-40.0, -40.0, 0.0), Vec3::new(40.0, 40.0, 160.0))),
        vertex_buffer: Some(vertex_buffer),
        ..Model::default()
    })
}

fn spawn_crystals(environment: &mut Environment, crystal: &Arc<Model>) {
    let spacing = TERRAIN_SIZE as f32 * TERRAIN_SCALE / (CRYSTAL_GRID + 1) as f32;
    for row in 1..=CRYSTAL_GRID {
        for column in 1..=CRYSTAL_GRID {
            let x = column as f32 * spacing;
            let y = row as f32 * spacing;
            let z = environment.terrain().height_at(x, y);
            environment.spawn_model(
                Arc::clone(crystal),
                Position::at(Vec3::new(x, y, z)).with_angle(Vec3::new(0.0, 0.0, (row * column) as f32 * 15.0)),
                Light::Terrain { color: Vec3::new(0.1, 0.1, 0.15), primary: true },
                Box::new(RigidPose::new(30.0)),
            );
        }
    }
}
