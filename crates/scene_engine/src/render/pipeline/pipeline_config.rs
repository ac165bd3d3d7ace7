//! Pipeline state descriptions
//!
//! A pipeline is identified by its fixed part (shader program and render
//! target formats) together with its dynamic part (raster, depth and blend
//! state). Both are plain hashable values so they can key the pipeline cache.

use crate::render::api::{ShaderProgramId, TextureFormat};

/// Face culling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    #[default]
    Back,
}

/// Blend factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    /// Not set; blending is off for this state
    #[default]
    Undefined,
    /// 0
    Zero,
    /// 1
    One,
    /// Source color
    SrcColor,
    /// 1 - source color
    InvSrcColor,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    InvSrcAlpha,
    /// Destination alpha
    DestAlpha,
    /// 1 - destination alpha
    InvDestAlpha,
    /// Destination color
    DestColor,
    /// 1 - destination color
    InvDestColor,
    /// min(source alpha, 1 - destination alpha)
    SrcAlphaSat,
}

/// Blend operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOp {
    /// src + dst
    #[default]
    Add,
    /// src - dst
    Subtract,
    /// dst - src
    RevSubtract,
    /// min(src, dst)
    Min,
    /// max(src, dst)
    Max,
}

/// Shader program and render target formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedPipelineState {
    /// Vertex + pixel program
    pub program: ShaderProgramId,
    /// Color target format
    pub color_format: TextureFormat,
    /// Depth target format
    pub depth_format: TextureFormat,
}

/// Raster, depth and blend state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DynamicPipelineState {
    /// Face culling
    pub cull_mode: CullMode,
    /// Write the alpha channel of the color target
    pub alpha_write: bool,
    /// Depth testing
    pub depth_test: bool,
    /// Depth writes
    pub depth_write: bool,
    /// Blending enabled
    pub blend_enable: bool,
    /// Source factor
    pub src_blend: BlendFactor,
    /// Destination factor
    pub dest_blend: BlendFactor,
    /// Operation
    pub blend_op: BlendOp,
}

impl Default for DynamicPipelineState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            alpha_write: true,
            depth_test: true,
            depth_write: true,
            blend_enable: false,
            src_blend: BlendFactor::Undefined,
            dest_blend: BlendFactor::Undefined,
            blend_op: BlendOp::Add,
        }
    }
}

impl DynamicPipelineState {
    /// Classic `src * a + dst * (1 - a)` blending with depth writes off
    pub fn alpha_blended() -> Self {
        Self {
            blend_enable: true,
            src_blend: BlendFactor::SrcAlpha,
            dest_blend: BlendFactor::InvSrcAlpha,
            blend_op: BlendOp::Add,
            depth_write: false,
            ..Self::default()
        }
    }

    /// Builder pattern: Set the cull mode
    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    /// Builder pattern: Toggle alpha channel writes
    pub fn with_alpha_write(mut self, enabled: bool) -> Self {
        self.alpha_write = enabled;
        self
    }
}
