//! Per-frame scene driver
//!
//! Bridges the entity store with the terrain and model renderer. The
//! [`Environment`] owns everything drawn each frame and runs the entity
//! phases through a configurable [`UpdateStrategy`].
//!
//! ## Architecture
//!
//! ```text
//! EntityStore (components)
//!      ↓
//! UpdateStrategy (animate -> cull -> light and upload)
//!      ↓
//! ModelRenderer / Terrain (draws)
//! ```

pub mod effects;
pub mod environment;
pub mod phases;
pub mod scheduler;

pub use effects::{EffectSystem, NullEffects};
pub use environment::{Environment, EnvironmentError};
pub use phases::{Phase, TickInputs};
pub use scheduler::{build_strategy, split_loop_index, DataParallel, SingleThreaded, UpdateStrategy, WorkerPool};
