//! Vertex/index batching.
//!
//! One growable vertex+index buffer per draw-call shape (solid or textured),
//! plus an ordered draw list. Primitives reserve room with
//! [`VertexBatcher::allocate`], fill in the returned slices, then record the
//! range with [`VertexBatcher::push_draw`]. Consecutive ranges with the same
//! shape and texture collapse into one call, so painter's order is kept while
//! the call count stays low.

use crate::atlas::PixelFormat;
use crate::color::Color;
use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Vertex for untextured geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SolidVertex {
    pub pos: [f32; 2],
    pub color: [f32; 4],
}

impl SolidVertex {
    pub fn new(pos: [f32; 2], color: Color) -> Self {
        Self {
            pos,
            color: color.to_array(),
        }
    }
}

/// Vertex sampling one of the atlas surfaces.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl TexturedVertex {
    pub fn new(pos: [f32; 2], uv: [f32; 2], color: Color) -> Self {
        Self {
            pos,
            uv,
            color: color.to_array(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchShape {
    Solid,
    Textured,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("{shape:?} batch out of memory: {requested} more, {used}/{limit} used")]
    OutOfMemory {
        shape: BatchShape,
        requested: usize,
        used: usize,
        limit: usize,
    },

    #[error("{0:?} batch is poisoned for this frame")]
    Poisoned(BatchShape),
}

/// One backend draw call: a contiguous index range of one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCall {
    pub shape: BatchShape,
    /// Atlas surface sampled by textured calls, `None` for solid ones.
    pub texture: Option<PixelFormat>,
    pub index_start: u32,
    pub index_count: u32,
}

/// Vertex and index buffers for one shape.
pub struct Batch<V> {
    shape: BatchShape,
    vertices: Vec<V>,
    indices: Vec<u32>,
    poisoned: bool,
}

impl<V: Pod> Batch<V> {
    fn new(shape: BatchShape) -> Self {
        Self {
            shape,
            vertices: Vec::new(),
            indices: Vec::new(),
            poisoned: false,
        }
    }

    #[inline]
    pub fn shape(&self) -> BatchShape {
        self.shape
    }

    #[inline]
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.poisoned = false;
    }

    fn allocate(
        &mut self,
        vertex_count: usize,
        index_count: usize,
        limit: usize,
    ) -> Result<BatchAlloc<'_, V>, BatchError> {
        if self.poisoned {
            return Err(BatchError::Poisoned(self.shape));
        }

        let used = self.vertices.len();
        let out_of_memory = BatchError::OutOfMemory {
            shape: self.shape,
            requested: vertex_count,
            used,
            limit,
        };

        if used.saturating_add(vertex_count) > limit {
            self.poisoned = true;
            return Err(out_of_memory);
        }
        // `try_reserve` keeps the amortized doubling of `Vec`.
        if self.vertices.try_reserve(vertex_count).is_err()
            || self.indices.try_reserve(index_count).is_err()
        {
            self.poisoned = true;
            return Err(out_of_memory);
        }

        let index_start = self.indices.len();
        self.vertices.resize(used + vertex_count, V::zeroed());
        self.indices.resize(index_start + index_count, 0);

        Ok(BatchAlloc {
            vertices: &mut self.vertices[used..],
            indices: &mut self.indices[index_start..],
            base_vertex: used as u32,
            index_start: index_start as u32,
        })
    }
}

/// Space reserved by [`VertexBatcher::allocate`]. Indices written here must
/// be offset by `base_vertex`.
pub struct BatchAlloc<'a, V> {
    pub vertices: &'a mut [V],
    pub indices: &'a mut [u32],
    pub base_vertex: u32,
    pub index_start: u32,
}

/// Vertex types that have a batch in [`VertexBatcher`].
pub trait BatchVertex: Pod {
    const SHAPE: BatchShape;

    fn batch(batcher: &mut VertexBatcher) -> &mut Batch<Self>;
}

impl BatchVertex for SolidVertex {
    const SHAPE: BatchShape = BatchShape::Solid;

    fn batch(batcher: &mut VertexBatcher) -> &mut Batch<Self> {
        &mut batcher.solid
    }
}

impl BatchVertex for TexturedVertex {
    const SHAPE: BatchShape = BatchShape::Textured;

    fn batch(batcher: &mut VertexBatcher) -> &mut Batch<Self> {
        &mut batcher.textured
    }
}

pub struct VertexBatcher {
    solid: Batch<SolidVertex>,
    textured: Batch<TexturedVertex>,
    draws: Vec<DrawCall>,
    max_vertices: usize,
}

impl VertexBatcher {
    /// `max_vertices` bounds each batch. Capped to what a `u32` index can reach.
    pub fn new(max_vertices: usize) -> Self {
        Self {
            solid: Batch::new(BatchShape::Solid),
            textured: Batch::new(BatchShape::Textured),
            draws: Vec::new(),
            max_vertices: max_vertices.min(u32::MAX as usize),
        }
    }

    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    /// Reserve `vertex_count` vertices and `index_count` indices in `V`'s
    /// batch. Exceeding the limit poisons that batch until [`Self::reset`].
    pub fn allocate<V: BatchVertex>(
        &mut self,
        vertex_count: usize,
        index_count: usize,
    ) -> Result<BatchAlloc<'_, V>, BatchError> {
        let limit = self.max_vertices;
        let batch = V::batch(self);
        let result = batch.allocate(vertex_count, index_count, limit);
        if let Err(BatchError::OutOfMemory { shape, used, .. }) = &result {
            log::warn!("{:?} batch poisoned at {} vertices", shape, used);
        }
        result
    }

    pub fn push_draw(
        &mut self,
        shape: BatchShape,
        texture: Option<PixelFormat>,
        index_start: u32,
        index_count: u32,
    ) {
        if index_count == 0 {
            return;
        }

        if let Some(last) = self.draws.last_mut() {
            if last.shape == shape
                && last.texture == texture
                && last.index_start + last.index_count == index_start
            {
                last.index_count += index_count;
                return;
            }
        }

        self.draws.push(DrawCall {
            shape,
            texture,
            index_start,
            index_count,
        });
    }

    /// Empty everything but keep the allocations.
    pub fn reset(&mut self) {
        self.solid.clear();
        self.textured.clear();
        self.draws.clear();
    }

    pub fn solid(&self) -> &Batch<SolidVertex> {
        &self.solid
    }

    pub fn textured(&self) -> &Batch<TexturedVertex> {
        &self.textured
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }
}

impl Default for VertexBatcher {
    fn default() -> Self {
        Self::new(1 << 20)
    }
}
