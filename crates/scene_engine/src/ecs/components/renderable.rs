//! Renderable marker and model attachment

use std::sync::Arc;

use crate::render::model::Model;

/// Marks an entity as taking part in the update and render passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Renderable;

/// Shared reference to the model drawn for this entity
#[derive(Debug, Clone)]
pub struct Attachment(pub Arc<Model>);

impl Attachment {
    /// Attach `model`
    pub fn new(model: Arc<Model>) -> Self {
        Self(model)
    }

    /// The attached model
    pub fn model(&self) -> &Model {
        &self.0
    }
}
