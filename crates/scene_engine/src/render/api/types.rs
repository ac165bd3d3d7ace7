//! Resource descriptors and handles shared by every graphics device
//!
//! Handles are opaque ids minted by the device. Resource ids are separate
//! identities used to key binding caches by the resources a draw consumes.

use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a compiled pipeline state object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u64);

/// Handle to a shader resource binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingHandle(pub u64);

/// Identity of a shader program set (vertex + pixel stages)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShaderProgramId(pub u32);

impl ShaderProgramId {
    /// No program
    pub const INVALID: Self = Self(u32::MAX);

    /// Whether this refers to a real program
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

static NEXT_RESOURCE_ID: AtomicU32 = AtomicU32::new(0);

/// Process-unique identity of a bindable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// Placeholder used in binding keys that have no resources
    pub const INVALID: Self = Self(u32::MAX);

    /// Allocate a fresh id
    pub fn allocate() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether this refers to a real resource
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

/// How a resource will be accessed after creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// Contents fixed at creation
    Immutable,
    /// GPU-resident, updated through explicit uploads
    Default,
    /// Rewritten by the CPU every frame through discard maps
    Dynamic,
}

bitflags! {
    /// Pipeline stages a buffer can be bound to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BindFlags: u32 {
        /// Vertex input
        const VERTEX_BUFFER = 1 << 0;
        /// Index input
        const INDEX_BUFFER = 1 << 1;
        /// Constant buffer
        const UNIFORM_BUFFER = 1 << 2;
        /// Shader-readable resource
        const SHADER_RESOURCE = 1 << 3;
    }
}

bitflags! {
    /// Shader stages a variable is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u8 {
        /// Vertex stage
        const VERTEX = 1 << 0;
        /// Pixel stage
        const PIXEL = 1 << 1;
    }
}

/// Buffer creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// Debug name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Access pattern
    pub usage: Usage,
    /// Bind points
    pub bind: BindFlags,
}

impl BufferDesc {
    /// Dynamic constant buffer of `size` bytes, rewritten through discard maps
    pub fn dynamic_uniform(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size: size as u64,
            usage: Usage::Dynamic,
            bind: BindFlags::UNIFORM_BUFFER,
        }
    }

    /// Immutable buffer initialised from data at creation
    pub fn immutable(name: impl Into<String>, size: usize, bind: BindFlags) -> Self {
        Self {
            name: name.into(),
            size: size as u64,
            usage: Usage::Immutable,
            bind,
        }
    }
}

/// Texel formats used by the scene core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit unsigned integer, one channel
    R8Uint,
    /// 16-bit unsigned integer, one channel
    R16Uint,
    /// 32-bit float, one channel
    R32Float,
    /// 8-bit normalized rgba
    Rgba8Unorm,
    /// 8-bit unsigned integer rgba
    Rgba8Uint,
    /// 16-bit normalized rgba
    Rgba16Unorm,
    /// 32-bit float rgba
    Rgba32Float,
    /// Swapchain color format
    Bgra8UnormSrgb,
    /// Depth buffer format
    D32Float,
}

impl TextureFormat {
    /// Size of one texel in bytes
    pub const fn texel_size(self) -> usize {
        match self {
            Self::R8Uint => 1,
            Self::R16Uint => 2,
            Self::R32Float | Self::Rgba8Unorm | Self::Rgba8Uint | Self::Bgra8UnormSrgb | Self::D32Float => 4,
            Self::Rgba16Unorm => 8,
            Self::Rgba32Float => 16,
        }
    }
}

/// Texture shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDimension {
    /// Single 2D image
    Texture2D,
    /// Array of equally sized 2D layers
    Texture2DArray {
        /// Number of layers
        layers: u32,
    },
}

/// Texture creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    /// Debug name
    pub name: String,
    /// Shape
    pub dimension: TextureDimension,
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Texel format
    pub format: TextureFormat,
    /// Access pattern
    pub usage: Usage,
}

impl TextureDesc {
    /// Single-level 2D texture
    pub fn texture_2d(name: impl Into<String>, width: u32, height: u32, format: TextureFormat, usage: Usage) -> Self {
        Self {
            name: name.into(),
            dimension: TextureDimension::Texture2D,
            width,
            height,
            format,
            usage,
        }
    }

    /// Number of array layers (1 for plain 2D textures)
    pub const fn layers(&self) -> u32 {
        match self.dimension {
            TextureDimension::Texture2D => 1,
            TextureDimension::Texture2DArray { layers } => layers,
        }
    }

    /// Tightly packed row pitch in bytes
    pub const fn row_pitch(&self) -> usize {
        self.width as usize * self.format.texel_size()
    }
}

/// Texel data for one texture layer
#[derive(Debug, Clone, Copy)]
pub struct TextureData<'a> {
    /// Raw texel bytes
    pub data: &'a [u8],
    /// Bytes between consecutive rows
    pub stride: usize,
}

impl<'a> TextureData<'a> {
    /// Wrap a layer with the given row pitch
    pub const fn new(data: &'a [u8], stride: usize) -> Self {
        Self { data, stride }
    }
}

/// Texture filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilter {
    /// Nearest texel
    Point,
    /// Bilinear
    Linear,
    /// Anisotropic
    Anisotropic,
}

/// Texture coordinate addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureAddress {
    /// Repeat
    Wrap,
    /// Mirror on every repeat
    Mirror,
    /// Clamp to edge
    Clamp,
}

/// Sampler attached to a texture's default view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    /// Filtering
    pub filter: TextureFilter,
    /// Addressing for u, v and w
    pub address: TextureAddress,
}

/// Resource bound to a shader variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundResource {
    /// Constant buffer
    Buffer(BufferHandle),
    /// Texture default view
    Texture(TextureHandle),
}

/// Render-order bucket a draw is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderClassify {
    /// Opaque geometry
    #[default]
    Opaque,
    /// Blended geometry drawn before the main alpha pass
    PreAlpha,
    /// Alpha-blended geometry
    Alpha,
}

/// Non-indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawAttribs {
    /// Vertices to draw
    pub vertex_count: u32,
    /// First vertex in the bound vertex buffer
    pub start_vertex: u32,
    /// Render-order bucket
    pub classify: RenderClassify,
    /// Order within the bucket
    pub classify_index: u32,
}

/// Indexed draw over 32-bit indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexedAttribs {
    /// Indices to draw
    pub index_count: u32,
    /// Render-order bucket
    pub classify: RenderClassify,
    /// Order within the bucket
    pub classify_index: u32,
}
