//! # Render Queue System
//!
//! Collects the draw calls issued during a frame into render-order buckets so
//! the graphics layer can submit them sorted, independent of the order in
//! which the scene produced them.
//!
//! ## Architecture
//!
//! - **RenderQueue**: Opaque, pre-alpha and alpha buckets for one frame
//! - **QueuedDraw**: A draw plus the pipeline state bound when it was issued
//! - **DrawKind**: Vertex-range or indexed draw
//!
//! Within a bucket draws are ordered by their classify index, then by
//! submission order.

use crate::render::api::{
    BindingHandle, BufferHandle, PipelineHandle, RenderClassify,
};

/// Geometry range of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    /// `vertex_count` vertices starting at `start_vertex`
    Vertices {
        /// Vertices to draw
        vertex_count: u32,
        /// First vertex
        start_vertex: u32,
    },
    /// `index_count` 32-bit indices from the bound index buffer
    Indexed {
        /// Indices to draw
        index_count: u32,
    },
}

/// Draw recorded with the state that was bound when it was issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedDraw {
    /// Bound pipeline
    pub pipeline: Option<PipelineHandle>,
    /// Committed binding
    pub binding: Option<BindingHandle>,
    /// Bound vertex buffer
    pub vertex_buffer: Option<BufferHandle>,
    /// Bound index buffer
    pub index_buffer: Option<BufferHandle>,
    /// Geometry range
    pub kind: DrawKind,
    /// Bucket
    pub classify: RenderClassify,
    /// Order within the bucket
    pub classify_index: u32,
    /// Submission order within the frame
    pub sequence: u32,
}

/// Frame draw list organised by render-order bucket
#[derive(Debug, Default)]
pub struct RenderQueue {
    opaque: Vec<QueuedDraw>,
    pre_alpha: Vec<QueuedDraw>,
    alpha: Vec<QueuedDraw>,
    next_sequence: u32,
}

impl RenderQueue {
    /// Create a new empty render queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a draw; its `sequence` is assigned here
    pub fn push(&mut self, mut draw: QueuedDraw) {
        draw.sequence = self.next_sequence;
        self.next_sequence += 1;

        match draw.classify {
            RenderClassify::Opaque => self.opaque.push(draw),
            RenderClassify::PreAlpha => self.pre_alpha.push(draw),
            RenderClassify::Alpha => self.alpha.push(draw),
        }
    }

    /// Sort every bucket by classify index; ties keep submission order
    pub fn sort(&mut self) {
        for bucket in [&mut self.opaque, &mut self.pre_alpha, &mut self.alpha] {
            bucket.sort_by_key(|draw| (draw.classify_index, draw.sequence));
        }
    }

    /// Draws of one bucket in their current order
    pub fn bucket(&self, classify: RenderClassify) -> &[QueuedDraw] {
        match classify {
            RenderClassify::Opaque => &self.opaque,
            RenderClassify::PreAlpha => &self.pre_alpha,
            RenderClassify::Alpha => &self.alpha,
        }
    }

    /// All draws in submission order for the graphics layer: opaque, pre-alpha, alpha
    pub fn iter(&self) -> impl Iterator<Item = &QueuedDraw> {
        self.opaque.iter().chain(&self.pre_alpha).chain(&self.alpha)
    }

    /// Get total number of draws
    pub fn len(&self) -> usize {
        self.opaque.len() + self.pre_alpha.len() + self.alpha.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all draws for next frame
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.pre_alpha.clear();
        self.alpha.clear();
        self.next_sequence = 0;
    }
}
