//! Geometry for the primitives a frame plays back.

use crate::atlas::{PixelFormat, UvRect};
use crate::batch::{BatchError, BatchShape, SolidVertex, TexturedVertex, VertexBatcher};
use crate::color::Color;
use std::f32::consts::PI;

/// Filled rectangle between two corners.
///
/// `corner_radii` are top-left, top-right, bottom-right, bottom-left. Each is
/// clamped to half the shorter side, so neighbouring arcs never overlap. With
/// any radius above zero the rectangle is a triangle fan around the center
/// with `segments_per_corner` steps on each rounded arc; sharp corners take a
/// single vertex.
pub fn fill_rect(
    batcher: &mut VertexBatcher,
    p1: [f32; 2],
    p2: [f32; 2],
    color: Color,
    corner_radii: [f32; 4],
    segments_per_corner: u32,
) -> Result<(), BatchError> {
    let min_x = p1[0].min(p2[0]);
    let min_y = p1[1].min(p2[1]);
    let max_x = p1[0].max(p2[0]);
    let max_y = p1[1].max(p2[1]);

    if color.is_invisible() || max_x <= min_x || max_y <= min_y {
        return Ok(());
    }

    let limit = ((max_x - min_x) * 0.5).min((max_y - min_y) * 0.5);
    let [tl, tr, br, bl] = corner_radii.map(|r| r.max(0.0).min(limit));

    if tl.max(tr).max(br).max(bl) <= 0.0 || segments_per_corner == 0 {
        let alloc = batcher.allocate::<SolidVertex>(4, 6)?;
        alloc.vertices.copy_from_slice(&[
            SolidVertex::new([min_x, min_y], color),
            SolidVertex::new([max_x, min_y], color),
            SolidVertex::new([max_x, max_y], color),
            SolidVertex::new([min_x, max_y], color),
        ]);
        write_quad_indices(alloc.indices, alloc.base_vertex);
        let start = alloc.index_start;
        batcher.push_draw(BatchShape::Solid, None, start, 6);
        return Ok(());
    }

    // Clockwise from the top-right corner, each sweeping a quarter turn.
    let corners = [
        (max_x - tr, min_y + tr, tr, -PI / 2.0),
        (max_x - br, max_y - br, br, 0.0),
        (min_x + bl, max_y - bl, bl, PI / 2.0),
        (min_x + tl, min_y + tl, tl, PI),
    ];
    let steps = |radius: f32| if radius > 0.0 { segments_per_corner as usize + 1 } else { 1 };

    // Center + perimeter + closing vertex.
    let perimeter: usize = corners.iter().map(|c| steps(c.2)).sum();
    let vertex_count = perimeter + 2;
    let index_count = (vertex_count - 2) * 3;
    let alloc = batcher.allocate::<SolidVertex>(vertex_count, index_count)?;

    alloc.vertices[0] = SolidVertex::new([(min_x + max_x) * 0.5, (min_y + max_y) * 0.5], color);

    let mut v = 1;
    for (cx, cy, radius, start_angle) in corners {
        if radius <= 0.0 {
            alloc.vertices[v] = SolidVertex::new([cx, cy], color);
            v += 1;
            continue;
        }
        for i in 0..=segments_per_corner {
            let angle = start_angle + (i as f32 / segments_per_corner as f32) * (PI / 2.0);
            let point = [cx + radius * angle.cos(), cy + radius * angle.sin()];
            alloc.vertices[v] = SolidVertex::new(point, color);
            v += 1;
        }
    }
    alloc.vertices[v] = alloc.vertices[1];

    let base = alloc.base_vertex;
    for (i, tri) in alloc.indices.chunks_exact_mut(3).enumerate() {
        let i = i as u32 + 1;
        tri.copy_from_slice(&[base, base + i, base + i + 1]);
    }

    let start = alloc.index_start;
    batcher.push_draw(BatchShape::Solid, None, start, index_count as u32);
    Ok(())
}

/// Axis-aligned quad sampling `uv` from the `texture` surface.
///
/// `colors` are per corner: top-left, top-right, bottom-right, bottom-left.
pub fn textured_quad(
    batcher: &mut VertexBatcher,
    texture: PixelFormat,
    min: [f32; 2],
    max: [f32; 2],
    uv: UvRect,
    colors: [Color; 4],
) -> Result<(), BatchError> {
    let alloc = batcher.allocate::<TexturedVertex>(4, 6)?;
    alloc.vertices.copy_from_slice(&[
        TexturedVertex::new(min, uv.min, colors[0]),
        TexturedVertex::new([max[0], min[1]], [uv.max[0], uv.min[1]], colors[1]),
        TexturedVertex::new(max, uv.max, colors[2]),
        TexturedVertex::new([min[0], max[1]], [uv.min[0], uv.max[1]], colors[3]),
    ]);
    write_quad_indices(alloc.indices, alloc.base_vertex);
    let start = alloc.index_start;
    batcher.push_draw(BatchShape::Textured, Some(texture), start, 6);
    Ok(())
}

fn write_quad_indices(indices: &mut [u32], base: u32) {
    for (dst, src) in indices.iter_mut().zip([0, 1, 2, 0, 2, 3]) {
        *dst = base + src;
    }
}
