//! Environment: the per-frame scene driver
//!
//! Owns the entity store, the terrain, the model renderer, the shared bone
//! buffer and the effect systems. A frame is `reset`, `update`, `render`:
//!
//! ```text
//! reset   terrain primary light (ticked frames only)
//! update  terrain upload -> entity phases -> bone flush -> particles -> joints
//! render  terrain -> visible models -> particles -> joints
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::core::EnvironmentConfig;
use crate::ecs::components::{
    Animation, Attachment, Light, LightEnvironment, Position, RenderState, Renderable, Skeleton,
};
use crate::ecs::{Entity, EntityStore};
use crate::foundation::math::Vec3;
use crate::foundation::time::FrameState;
use crate::render::api::{BackendResult, GraphicsDevice};
use crate::render::context::RenderContext;
use crate::render::model::{Model, ModelRenderer, RenderConfig, SceneResources, VirtualMeshSelection};
use crate::render::pipeline::ShaderCaches;
use crate::render::primitives::CameraView;
use crate::render::skeleton::{BoneBuffer, SkeletonPose};
use crate::render::RenderError;
use crate::terrain::Terrain;

use super::effects::EffectSystem;
use super::phases::TickInputs;
use super::scheduler::{build_strategy, UpdateStrategy};

/// Environment construction failures
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// The update worker pool could not be started
    #[error("Failed to start update workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// An effect system refused to initialize
    #[error("Failed to initialize {name} effects: {source}")]
    Effect {
        /// Effect system name
        name: String,
        /// Device error reported by the effect system
        source: RenderError,
    },

    /// The bone buffer could not be created
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Scene state advanced and drawn once per frame
pub struct Environment {
    strategy: Box<dyn UpdateStrategy>,
    entities: EntityStore,
    terrain: Terrain,
    model_renderer: ModelRenderer,
    bones: BoneBuffer,
    particles: Box<dyn EffectSystem>,
    joints: Box<dyn EffectSystem>,
}

impl Environment {
    /// Take ownership of the scene parts and start the update strategy.
    ///
    /// On failure everything passed in is released before returning.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        config: &EnvironmentConfig,
        mut terrain: Terrain,
        model_renderer: ModelRenderer,
        mut particles: Box<dyn EffectSystem>,
        mut joints: Box<dyn EffectSystem>,
    ) -> Result<Self, EnvironmentError> {
        match Self::start(device, config, particles.as_mut(), joints.as_mut()) {
            Ok((strategy, bones)) => {
                log::info!(
                    "Environment ready ({} strategy, {} bones per frame)",
                    strategy.name(),
                    bones.capacity()
                );
                Ok(Self {
                    strategy,
                    entities: EntityStore::new(),
                    terrain,
                    model_renderer,
                    bones,
                    particles,
                    joints,
                })
            }
            Err(e) => {
                log::error!("Failed to create environment: {e}");
                terrain.destroy(device);
                model_renderer.destroy(device);
                particles.destroy(device);
                joints.destroy(device);
                Err(e)
            }
        }
    }

    fn start<'a>(
        device: &mut dyn GraphicsDevice,
        config: &EnvironmentConfig,
        particles: &'a mut dyn EffectSystem,
        joints: &'a mut dyn EffectSystem,
    ) -> Result<(Box<dyn UpdateStrategy>, BoneBuffer), EnvironmentError> {
        for effects in [particles, joints] {
            effects.initialize(device).map_err(|source| EnvironmentError::Effect {
                name: effects.name().to_string(),
                source,
            })?;
        }
        let strategy = build_strategy(config)?;
        let bones = BoneBuffer::new(device, config.bone_capacity)?;
        Ok((strategy, bones))
    }

    /// Spawn a renderable entity drawing `model` with every phase component
    pub fn spawn_model(
        &mut self,
        model: Arc<Model>,
        position: Position,
        light: Light,
        pose: Box<dyn SkeletonPose>,
    ) -> Entity {
        let bounds = model.global_bbox.unwrap_or_default();
        let entity = self.entities.spawn();
        self.entities.insert(entity, Renderable);
        self.entities.insert(entity, Attachment::new(model));
        self.entities.insert(entity, position);
        self.entities.insert(entity, Animation::default());
        self.entities.insert(entity, Skeleton::new(pose));
        self.entities.insert(entity, bounds);
        self.entities.insert(entity, RenderState::default());
        self.entities.insert(entity, light);
        entity
    }

    /// Start a frame; the terrain light is only restored on ticked frames
    pub fn reset(&mut self, frame: &FrameState) {
        if frame.update_count > 0 {
            self.terrain.reset();
        }
    }

    /// Advance the scene by one frame
    pub fn update(
        &mut self,
        device: &mut dyn GraphicsDevice,
        frame: &FrameState,
        camera: &dyn CameraView,
    ) -> BackendResult<()> {
        if frame.update_count > 0 {
            self.terrain.update(device)?;
        }

        self.bones.reset();
        let inputs = TickInputs {
            frame,
            camera,
            lights: LightEnvironment { terrain: &self.terrain, world_time: frame.world_time },
            bones: &self.bones,
        };
        self.strategy.run(&mut self.entities, &inputs);
        self.bones.flush(device)?;

        self.particles.update(frame.update_count);
        self.particles.propagate();
        self.joints.update(frame.update_count);
        self.joints.propagate();
        Ok(())
    }

    /// Draw the terrain, every visible posed model, then the effects.
    ///
    /// Returns the number of model meshes submitted.
    pub fn render(
        &mut self,
        device: &mut dyn GraphicsDevice,
        caches: &mut ShaderCaches,
        context: &RenderContext,
        frame: &FrameState,
    ) -> BackendResult<usize> {
        self.terrain.configure_uniforms(device, frame.world_time)?;
        self.terrain.render(device);

        self.model_renderer.reset();
        let scene = SceneResources {
            context,
            terrain: Some(&self.terrain),
            bones: &self.bones,
            frame,
        };

        let mut drawn = 0;
        for entity in self.entities.renderables() {
            let (Some(attachment), Some(state), Some(skeleton)) = (
                self.entities.get::<Attachment>(entity),
                self.entities.get::<RenderState>(entity),
                self.entities.get::<Skeleton>(entity),
            ) else {
                continue;
            };
            if !state.is_visible() {
                continue;
            }
            let Some(bone_offset) = skeleton.offset.get() else {
                continue;
            };

            let config = RenderConfig {
                bone_offset,
                body_origin: Vec3::zeros(),
                body_scale: 1.0,
                enable_light: state.light_enabled(),
                body_light: state.body_light,
            };
            drawn += self.model_renderer.render_body(
                device,
                caches,
                &scene,
                attachment.model(),
                &config,
                VirtualMeshSelection::default(),
            )?;
        }

        self.particles.render(device, context);
        self.joints.render(device, context);
        Ok(drawn)
    }

    /// Release the terrain, the renderer, the effect systems and the caches
    pub fn destroy(mut self, device: &mut dyn GraphicsDevice, caches: &mut ShaderCaches) {
        self.terrain.destroy(device);
        self.model_renderer.destroy(device);
        self.bones.destroy(device);
        self.particles.destroy(device);
        self.joints.destroy(device);
        caches.destroy(device);
        log::debug!("Environment destroyed");
    }

    /// Entity store
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Entity store, for spawning and editing components
    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    /// Terrain
    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Terrain, for light and attribute edits during a tick
    pub fn terrain_mut(&mut self) -> &mut Terrain {
        &mut self.terrain
    }

    /// Bone buffer filled by the last update
    pub fn bones(&self) -> &BoneBuffer {
        &self.bones
    }

    /// Name of the update strategy
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}
