//! # Scene Engine
//!
//! Per-frame scene core of a 3D game client: the entity update pipeline,
//! the heightmap terrain and the skinned model renderer.
//!
//! ## Features
//!
//! - **Environment**: Animate, cull, light and upload every entity each frame
//!   under a selectable scheduling strategy
//! - **Terrain**: 256x256 heightmap with lightmap, texture mapping, attributes
//!   and optional grass
//! - **Model Renderer**: Per-mesh pipeline and binding resolution with shared
//!   bone buffer skinning
//! - **Device Seam**: Everything GPU-facing goes through [`render::GraphicsDevice`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SceneConfig::default();
//!     let mut device = RecordingDevice::new();
//!     let mut caches = ShaderCaches::new();
//!     let context = RenderContext::new(&mut device, RenderTargets::default())?;
//!
//!     let terrain = Terrain::new(config.terrain.clone());
//!     let renderer = ModelRenderer::new(&mut device)?;
//!     let mut environment = Environment::new(
//!         &mut device,
//!         &config.environment,
//!         terrain,
//!         renderer,
//!         Box::new(NullEffects::new("particles")),
//!         Box::new(NullEffects::new("joints")),
//!     )?;
//!
//!     let camera = Camera::default().snapshot();
//!     let mut clock = FrameClock::default();
//!     let frame = clock.advance(std::time::Duration::from_millis(16));
//!     environment.reset(&frame);
//!     environment.update(&mut device, &frame, &camera)?;
//!     environment.render(&mut device, &mut caches, &context, &frame)?;
//!
//!     environment.destroy(&mut device, &mut caches);
//!     context.destroy(&mut device);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared configuration
pub mod core;
pub mod config;

pub mod foundation;
pub mod ecs;
pub mod assets;
pub mod render;
pub mod terrain;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{Config, SceneConfig, EnvironmentConfig, TerrainConfig, UpdateStrategyKind},
        foundation::{
            math::{Vec3, Vec4, Mat4},
            time::{FrameClock, FrameState},
        },
        ecs::{Entity, EntityStore},
        ecs::components::{Light, Position},
        render::{
            Camera, CameraSnapshot, CameraView, GraphicsDevice, Model, ModelRenderer,
            RecordingDevice, RenderContext, ShaderCaches,
        },
        render::context::RenderTargets,
        terrain::{Terrain, TerrainDefinition, TerrainPrograms},
        scene::{Environment, EffectSystem, NullEffects},
    };
}
