//! Backend implementations for the render module
//!
//! The recording device keeps everything in memory; GPU backends implement
//! the same [`GraphicsDevice`](crate::render::api::GraphicsDevice) trait.

/// In-memory recording device
pub mod recording;

pub use recording::{RecordedBinding, RecordedBuffer, RecordedPipeline, RecordedTexture, RecordingDevice};
