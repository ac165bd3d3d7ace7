//! ECS Components module
//!
//! Pure data attached to entities; the update phases in `scene::phases`
//! carry the logic.

pub mod animation;
pub mod bounds;
pub mod lighting;
pub mod render_state;
pub mod renderable;
pub mod skeleton;
pub mod transform;

pub use animation::Animation;
pub use bounds::BoundingBox;
pub use lighting::{Light, LightEnvironment};
pub use render_state::{RenderFlags, RenderState};
pub use renderable::{Attachment, Renderable};
pub use skeleton::Skeleton;
pub use transform::Position;
