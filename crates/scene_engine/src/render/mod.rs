//! # Rendering System
//!
//! Device-facing half of the scene core: the [`GraphicsDevice`] seam, the
//! pipeline and binding caches, per-frame uniform rings, the shared bone
//! buffer and the model renderer.
//!
//! ## Architecture
//!
//! - **api**: Device trait and descriptor types
//! - **backends**: In-memory [`RecordingDevice`] implementation
//! - **pipeline**: Pipeline state keys and the lazily initialised caches
//! - **context**: Explicit render state (mode, shadow map, camera uniforms)
//! - **model**: Model assets and the per-mesh draw path
//!
//! ## Lifetime
//!
//! Everything created here is released explicitly with the device that made
//! it: model renderer and context first, then the [`ShaderCaches`], then the
//! device itself.

pub mod api;
pub mod backends;
pub mod context;
pub mod model;
pub mod pipeline;
pub mod primitives;
pub mod render_queue;
pub mod skeleton;
pub mod texture;
pub mod uniform_ring;

pub use api::{BackendResult, GraphicsDevice, RenderClassify};
pub use backends::RecordingDevice;
pub use context::{RenderContext, RenderMode, RenderTargets, ShadowFilter, ShadowMapBinding};
pub use model::{Model, ModelRenderer, RenderConfig};
pub use pipeline::ShaderCaches;
pub use primitives::{Camera, CameraSnapshot, CameraView, Frustum};
pub use render_queue::RenderQueue;
pub use skeleton::{BoneBuffer, SkeletonOffset, SkeletonPose};
pub use texture::{Texture, TextureKind};
pub use uniform_ring::UniformRing;

use thiserror::Error;

/// High-level rendering error types
///
/// Device failures are reported in these terms so loaders can wrap them
/// without knowing which backend produced them.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A subsystem could not acquire its device resources at startup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Resource creation or management failed
    ///
    /// Occurs when buffers, textures or pipelines cannot be created, typically
    /// because the descriptor and the supplied data disagree.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A handle did not name a live resource of the expected kind
    #[error("Invalid {0} handle")]
    InvalidHandle(&'static str),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
