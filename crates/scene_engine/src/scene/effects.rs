//! Auxiliary effect systems
//!
//! Particles and joints are advanced after the entity phases and drawn after
//! the models. The environment only drives them through [`EffectSystem`].

use crate::render::api::GraphicsDevice;
use crate::render::context::RenderContext;
use crate::render::RenderError;

/// A per-frame effect system driven by the environment
pub trait EffectSystem: Send {
    /// Name for logs
    fn name(&self) -> &str;

    /// Acquire device resources; called once by [`Environment::new`](super::Environment::new)
    fn initialize(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError>;

    /// Advance by `update_count` ticks
    fn update(&mut self, update_count: u32);

    /// Move instances after the update
    fn propagate(&mut self);

    /// Submit draws
    fn render(&mut self, device: &mut dyn GraphicsDevice, context: &RenderContext);

    /// Release device resources
    fn destroy(&mut self, device: &mut dyn GraphicsDevice);
}

/// Effect system with nothing to simulate or draw
#[derive(Debug, Clone)]
pub struct NullEffects {
    name: String,
}

impl NullEffects {
    /// Create a placeholder called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EffectSystem for NullEffects {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        log::debug!("{} effects disabled", self.name);
        Ok(())
    }

    fn update(&mut self, _update_count: u32) {}

    fn propagate(&mut self) {}

    fn render(&mut self, _device: &mut dyn GraphicsDevice, _context: &RenderContext) {}

    fn destroy(&mut self, _device: &mut dyn GraphicsDevice) {}
}
