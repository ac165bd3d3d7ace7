//! Entity-Component-System storage
//!
//! Generational entities over dense, slot-indexed component columns. The
//! update phases borrow the columns in contiguous chunks so worker threads
//! never share an entity.

pub mod component;
pub mod components;
pub mod entity;
pub mod storage;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use storage::ComponentColumn;
pub use world::{EntityChunk, EntityStore, EntityView, Stored};
