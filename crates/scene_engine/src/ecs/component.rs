//! Component trait and implementations

use crate::ecs::components::{
    Animation, Attachment, BoundingBox, Light, Position, RenderState, Renderable, Skeleton,
};

/// Marker trait for components
///
/// Components are moved across worker threads during the update phases.
pub trait Component: 'static + Send + Sync {}

impl Component for Renderable {}
impl Component for Attachment {}
impl Component for Position {}
impl Component for Animation {}
impl Component for Skeleton {}
impl Component for BoundingBox {}
impl Component for RenderState {}
impl Component for Light {}
