//! Rendering primitives
//!
//! Camera, view frustum and the read-only camera interface used by culling.

pub mod camera;

pub use camera::{Camera, CameraSnapshot, CameraView, Frustum, Plane};
