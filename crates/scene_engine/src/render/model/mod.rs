//! Models and the model renderer
//!
//! A [`Model`] is a shared asset: physical meshes laid out in one vertex
//! buffer, a texture per mesh, optional virtual meshes that re-use physical
//! meshes with different settings, and the global bounding box the cull
//! phase transforms.

pub mod light_blend;
pub mod renderer;
pub mod uniforms;

use std::sync::Arc;

use crate::ecs::components::BoundingBox;
use crate::render::api::{BufferHandle, RenderClassify, ShaderProgramId};
use crate::render::pipeline::DynamicPipelineState;
use crate::render::texture::{Texture, TextureKind};

pub use light_blend::{LightBlendKind, LightBlendStage, LightSource, MeshLight};
pub use renderer::{ModelRenderer, RenderConfig, SceneResources, VirtualMeshSelection};
pub use uniforms::{ModelSettings, ModelViewSettings};

/// Dynamic state for the opaque and alpha variants of a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatePair {
    /// Used when the surface is opaque
    pub normal: DynamicPipelineState,
    /// Used when the texture has alpha or the body light is translucent
    pub alpha: DynamicPipelineState,
}

impl StatePair {
    /// Pick the variant for a surface
    pub fn select(&self, is_alpha: bool) -> &DynamicPipelineState {
        if is_alpha {
            &self.alpha
        } else {
            &self.normal
        }
    }
}

/// How one mesh is drawn
#[derive(Debug, Clone)]
pub struct MeshRenderSettings {
    /// Texture forced over the model texture
    pub texture: Option<Arc<Texture>>,
    /// Displacement texture read by the vertex stage
    pub vertex_texture: Option<Arc<Texture>>,
    /// Program for the normal pass
    pub program: ShaderProgramId,
    /// Program for the shadow pass
    pub shadow_program: ShaderProgramId,
    /// Dynamic state for the normal pass
    pub render_state: StatePair,
    /// Dynamic state for the shadow pass
    pub shadow_render_state: StatePair,
    /// Render-order bucket
    pub classify: RenderClassify,
    /// Order within the bucket
    pub classify_index: u32,
    /// Light blend programs addressable by virtual mesh light index
    pub lights: Vec<MeshLight>,
    /// Shader premultiplies color by alpha
    pub premultiply_alpha: bool,
    /// Body light color is premultiplied by its alpha
    pub premultiply_light: bool,
    /// Alpha test threshold
    pub alpha_test: f32,
}

impl Default for MeshRenderSettings {
    fn default() -> Self {
        Self {
            texture: None,
            vertex_texture: None,
            program: ShaderProgramId::INVALID,
            shadow_program: ShaderProgramId::INVALID,
            render_state: StatePair {
                normal: DynamicPipelineState::default(),
                alpha: DynamicPipelineState::alpha_blended(),
            },
            shadow_render_state: StatePair {
                normal: DynamicPipelineState::default(),
                alpha: DynamicPipelineState::default(),
            },
            classify: RenderClassify::Opaque,
            classify_index: 0,
            lights: Vec::new(),
            premultiply_alpha: false,
            premultiply_light: false,
            alpha_test: 0.25,
        }
    }
}

/// A vertex range in the model's vertex buffer
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertices in the range
    pub vertex_count: u32,
    /// First vertex
    pub vertex_offset: u32,
    /// Default draw settings
    pub settings: MeshRenderSettings,
}

/// A physical mesh drawn with its own settings
#[derive(Debug, Clone, Default)]
pub struct VirtualMesh {
    /// Index into [`Model::meshes`]
    pub mesh: usize,
    /// Settings replacing the mesh defaults
    pub settings: MeshRenderSettings,
}

/// Texture slot of one mesh
#[derive(Debug, Clone, Default)]
pub struct ModelTexture {
    /// Override slot looked up in the render context
    pub kind: TextureKind,
    /// Texture shipped with the model
    pub texture: Option<Arc<Texture>>,
}

/// Shared renderable asset
#[derive(Debug, Clone)]
pub struct Model {
    /// Debug name
    pub name: String,
    /// Physical meshes
    pub meshes: Vec<Mesh>,
    /// One entry per physical mesh
    pub textures: Vec<ModelTexture>,
    /// Optional re-groupings of the physical meshes
    pub virtual_meshes: Vec<VirtualMesh>,
    /// Bounds of every mesh in model space
    pub global_bbox: Option<BoundingBox>,
    /// Animation frames per tick
    pub play_speed: f32,
    /// Vertex buffer holding every mesh
    pub vertex_buffer: Option<BufferHandle>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            name: String::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            virtual_meshes: Vec::new(),
            global_bbox: None,
            play_speed: 1.0,
            vertex_buffer: None,
        }
    }
}

impl Model {
    /// Whether there is anything to draw
    pub fn has_meshes(&self) -> bool {
        !self.meshes.is_empty()
    }

    /// Whether meshes are drawn through virtual mesh groups
    pub fn has_virtual_meshes(&self) -> bool {
        !self.virtual_meshes.is_empty()
    }
}
