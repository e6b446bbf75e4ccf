//! Texture atlas placement.
//!
//! One [`AtlasSurface`] per pixel format: 8-bit coverage for glyphs and RGBA
//! for images. Each surface owns its pixels and its packing state.
//!
//! Placement is two-phase. Between [`Atlas::begin_add_rects`] and
//! [`Atlas::end_add_rects`] callers only *request* rectangles and get a
//! [`PendingPlacement`] back. `end_add_rects` then packs everything requested
//! in one go:
//!
//! - owners already packed at the same size keep their spot,
//! - new requests, sorted by descending height then width, go into the
//!   existing skyline (bottom-left),
//! - if that fails, everything requested this phase is repacked from scratch
//!   (skyline first, shelf as fallback), growing the surface up to
//!   `max_size` if needed; owners not requested this phase are evicted,
//! - if even the largest surface cannot hold the set, the surface is left as
//!   it was, new requests that still fit are placed and the rest are dropped.
//!
//! A repack moves rectangles (their pixels are copied along) and bumps the
//! surface generation. Placements are not stable across a resolve: consumers
//! re-query by owner every frame.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One byte of coverage per pixel.
    Alpha8,
    /// Four bytes per pixel, RGBA order.
    Rgba8,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Alpha8 => 1,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Who a packed rectangle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AtlasOwner {
    Glyph {
        font: u32,
        codepoint: u32,
        px_size: u16,
    },
    Image { index: u32, generation: u32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AtlasError {
    /// Rectangles that did fit are in `newly_placed` and stay in the atlas.
    #[error("atlas full, {} rectangles dropped", dropped.len())]
    Full {
        dropped: Vec<AtlasOwner>,
        newly_placed: Vec<AtlasOwner>,
    },

    #[error("request_rect called outside begin_add_rects/end_add_rects")]
    NotCollecting,

    #[error("{0:?} has no rectangle in the atlas")]
    UnknownOwner(AtlasOwner),

    #[error("pixel data is {actual} bytes, rectangle needs {expected}")]
    PixelSize { expected: usize, actual: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasConfig {
    pub initial_size: [u32; 2],
    pub max_size: [u32; 2],
    /// Border reserved around every rectangle to keep linear sampling from
    /// bleeding into neighbours.
    pub padding_px: u32,
}

impl AtlasConfig {
    pub const fn fixed(width: u32, height: u32) -> Self {
        Self {
            initial_size: [width, height],
            max_size: [width, height],
            padding_px: 0,
        }
    }

    pub const fn growable(initial: [u32; 2], max: [u32; 2]) -> Self {
        Self {
            initial_size: initial,
            max_size: max,
            padding_px: 0,
        }
    }

    pub const fn with_padding(mut self, padding_px: u32) -> Self {
        self.padding_px = padding_px;
        self
    }
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self::growable([512, 512], [4096, 4096]).with_padding(1)
    }
}

/// UV rectangle (normalized texture coords).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UvRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl UvRect {
    pub const fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }
}

/// Content rectangle of a packed owner, in pixels (padding excluded).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl Placement {
    pub fn uv(&self, surface_size: [u32; 2]) -> UvRect {
        let inv_w = 1.0 / surface_size[0] as f32;
        let inv_h = 1.0 / surface_size[1] as f32;
        UvRect::new(
            [self.x as f32 * inv_w, self.y as f32 * inv_h],
            [
                (self.x + self.width) as f32 * inv_w,
                (self.y + self.height) as f32 * inv_h,
            ],
        )
    }

    #[inline]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Deferred answer to [`Atlas::request_rect`]. Resolves after
/// [`Atlas::end_add_rects`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PendingPlacement {
    pub format: PixelFormat,
    pub owner: AtlasOwner,
    phase: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Owners that got a new rectangle and need their pixels uploaded.
    pub newly_placed: Vec<AtlasOwner>,
    /// Owners that kept their rectangle.
    pub reused: usize,
    /// Owners dropped from the surface by a repack.
    pub evicted: usize,
    pub repacked: bool,
    pub grew: bool,
}

impl ResolveStats {
    fn merge(&mut self, other: ResolveStats) {
        self.newly_placed.extend(other.newly_placed);
        self.reused += other.reused;
        self.evicted += other.evicted;
        self.repacked |= other.repacked;
        self.grew |= other.grew;
    }
}

#[derive(Clone, Copy, Debug)]
struct Request {
    owner: AtlasOwner,
    size: [u32; 2],
}

/// Reserved rectangle, padding included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PackedRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    content: [u32; 2],
}

/// Packed position of every request, in packing order.
type Layout = Vec<(Request, u32, u32)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SkylineNode {
    x: u32,
    y: u32,
    width: u32,
}

/// A single shelf (row) used by the fallback packer.
#[derive(Copy, Clone, Debug)]
struct Shelf {
    y: u32,
    height: u32,
    x_cursor: u32,
}

pub struct AtlasSurface {
    format: PixelFormat,
    config: AtlasConfig,
    size: [u32; 2],
    pixels: Vec<u8>,
    rects: HashMap<AtlasOwner, PackedRect>,
    skyline: Vec<SkylineNode>,
    pending: Vec<Request>,
    collecting: bool,
    phase: u32,
    generation: u32,
    dirty: bool,
}

impl AtlasSurface {
    pub fn new(format: PixelFormat, config: AtlasConfig) -> Self {
        let size = config.initial_size;
        Self {
            format,
            config,
            size,
            pixels: vec![0; pixel_len(size, format)],
            rects: HashMap::new(),
            skyline: empty_skyline(size[0]),
            pending: Vec::new(),
            collecting: false,
            phase: 0,
            generation: 0,
            dirty: false,
        }
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size[0]
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size[1]
    }

    #[inline]
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Row-major pixel data, `width * height * bytes_per_pixel` bytes.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bumped on every repack or growth.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether pixels changed since the last [`AtlasSurface::clear_dirty`].
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Number of packed rectangles.
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Area covered by reserved rectangles (padding included).
    pub fn occupied_area(&self) -> u64 {
        self.rects.values().map(|r| r.w as u64 * r.h as u64).sum()
    }

    pub fn placement(&self, owner: &AtlasOwner) -> Option<Placement> {
        self.rects.get(owner).map(|r| self.content_placement(r))
    }

    /// Forget every rectangle and go back to the initial size.
    pub fn reset(&mut self) {
        self.size = self.config.initial_size;
        self.pixels = vec![0; pixel_len(self.size, self.format)];
        self.rects.clear();
        self.skyline = empty_skyline(self.size[0]);
        self.pending.clear();
        self.collecting = false;
        self.generation = self.generation.wrapping_add(1);
        self.dirty = true;
    }

    pub fn begin_add_rects(&mut self) {
        self.pending.clear();
        self.collecting = true;
        self.phase = self.phase.wrapping_add(1);
    }

    pub fn request_rect(
        &mut self,
        owner: AtlasOwner,
        width: u32,
        height: u32,
    ) -> Result<PendingPlacement, AtlasError> {
        if !self.collecting {
            return Err(AtlasError::NotCollecting);
        }
        self.pending.push(Request {
            owner,
            size: [width, height],
        });
        Ok(PendingPlacement {
            format: self.format,
            owner,
            phase: self.phase,
        })
    }

    /// Placement for a token, once its collection phase has been resolved.
    pub fn resolve(&self, token: &PendingPlacement) -> Option<Placement> {
        if self.collecting && token.phase == self.phase {
            return None;
        }
        self.placement(&token.owner)
    }

    pub fn end_add_rects(&mut self) -> Result<ResolveStats, AtlasError> {
        if !self.collecting {
            return Err(AtlasError::NotCollecting);
        }
        self.collecting = false;

        let requests = dedup_requests(std::mem::take(&mut self.pending));
        let mut stats = ResolveStats::default();
        let mut fresh = Vec::new();

        for request in &requests {
            match self.rects.get(&request.owner) {
                Some(rect) if rect.content == request.size => stats.reused += 1,
                Some(_) => {
                    // Size changed; the old spot becomes a hole until the next repack.
                    self.rects.remove(&request.owner);
                    fresh.push(*request);
                }
                None => fresh.push(*request),
            }
        }

        // Zero-sized rectangles never occupy space.
        fresh.retain(|r| {
            if r.size[0] == 0 || r.size[1] == 0 {
                self.rects.insert(
                    r.owner,
                    PackedRect {
                        x: 0,
                        y: 0,
                        w: 0,
                        h: 0,
                        content: r.size,
                    },
                );
                stats.newly_placed.push(r.owner);
                false
            } else {
                true
            }
        });

        if fresh.is_empty() {
            return Ok(stats);
        }

        let pad = self.config.padding_px;
        sort_for_packing(&mut fresh, pad);

        // Incremental: everything new goes into the current skyline or nothing does.
        let mut skyline = self.skyline.clone();
        let mut placed = Vec::with_capacity(fresh.len());
        for request in &fresh {
            let [w, h] = reserved(request.size, pad);
            match skyline_insert(&mut skyline, self.size, w, h) {
                Some((x, y)) => placed.push((*request, x, y)),
                None => break,
            }
        }

        if placed.len() == fresh.len() {
            self.skyline = skyline;
            for (request, x, y) in placed {
                self.commit(request, x, y);
                stats.newly_placed.push(request.owner);
            }
            return Ok(stats);
        }

        // Full repack of the live set, growing as needed.
        let mut live: Vec<Request> = requests
            .iter()
            .copied()
            .filter(|r| r.size[0] > 0 && r.size[1] > 0)
            .collect();
        sort_for_packing(&mut live, pad);

        let mut size = self.size;
        loop {
            if let Some(layout) = pack_all(&live, size, pad) {
                let fresh_owners: HashSet<AtlasOwner> = fresh.iter().map(|r| r.owner).collect();
                stats.grew = size != self.size;
                stats.evicted = self.apply_layout(layout, size);
                stats.repacked = true;
                for request in &live {
                    if fresh_owners.contains(&request.owner) {
                        stats.newly_placed.push(request.owner);
                    }
                }
                return Ok(stats);
            }

            let next = [
                (size[0].saturating_mul(2)).min(self.config.max_size[0]),
                (size[1].saturating_mul(2)).min(self.config.max_size[1]),
            ];
            if next == size {
                break;
            }
            size = next;
        }

        // Could not fit the live set at all. Keep what is there and place
        // whatever new requests still fit.
        let mut dropped = Vec::new();
        for request in &fresh {
            let [w, h] = reserved(request.size, pad);
            match skyline_insert(&mut self.skyline, self.size, w, h) {
                Some((x, y)) => {
                    self.commit(*request, x, y);
                    stats.newly_placed.push(request.owner);
                }
                None => dropped.push(request.owner),
            }
        }

        log::warn!(
            "{:?} atlas ({}x{}) full: dropped {} of {} new rectangles",
            self.format,
            self.size[0],
            self.size[1],
            dropped.len(),
            fresh.len()
        );

        Err(AtlasError::Full {
            dropped,
            newly_placed: stats.newly_placed,
        })
    }

    /// Copy source pixels into `owner`'s rectangle. `data` is tightly packed
    /// rows of the content size.
    pub fn write_pixels(&mut self, owner: &AtlasOwner, data: &[u8]) -> Result<(), AtlasError> {
        let rect = *self
            .rects
            .get(owner)
            .ok_or(AtlasError::UnknownOwner(*owner))?;
        let bpp = self.format.bytes_per_pixel();
        let expected = rect.content[0] as usize * rect.content[1] as usize * bpp;
        if data.len() != expected {
            return Err(AtlasError::PixelSize {
                expected,
                actual: data.len(),
            });
        }
        if rect.w == 0 || rect.h == 0 {
            return Ok(());
        }

        let stride = self.size[0] as usize * bpp;

        // Clear the padding border left over from evicted neighbours.
        for row in rect.y..rect.y + rect.h {
            let start = row as usize * stride + rect.x as usize * bpp;
            self.pixels[start..start + rect.w as usize * bpp].fill(0);
        }

        let pad = self.config.padding_px;
        let row_len = rect.content[0] as usize * bpp;
        for (i, src) in data.chunks_exact(row_len).enumerate() {
            let row = (rect.y + pad) as usize + i;
            let start = row * stride + (rect.x + pad) as usize * bpp;
            self.pixels[start..start + row_len].copy_from_slice(src);
        }

        self.dirty = true;
        Ok(())
    }

    fn content_placement(&self, rect: &PackedRect) -> Placement {
        let pad = if rect.w == 0 { 0 } else { self.config.padding_px };
        Placement {
            x: rect.x + pad,
            y: rect.y + pad,
            width: rect.content[0],
            height: rect.content[1],
            format: self.format,
        }
    }

    fn commit(&mut self, request: Request, x: u32, y: u32) {
        let [w, h] = reserved(request.size, self.config.padding_px);
        self.rects.insert(
            request.owner,
            PackedRect {
                x,
                y,
                w,
                h,
                content: request.size,
            },
        );
    }

    /// Install a full layout, moving surviving pixels. Returns the number of
    /// evicted owners.
    fn apply_layout(&mut self, layout: Layout, size: [u32; 2]) -> usize {
        let bpp = self.format.bytes_per_pixel();
        let pad = self.config.padding_px;
        let old_stride = self.size[0] as usize * bpp;
        let new_stride = size[0] as usize * bpp;
        let mut pixels = vec![0u8; pixel_len(size, self.format)];
        let mut rects = HashMap::with_capacity(layout.len());

        for (request, x, y) in layout {
            let [w, h] = reserved(request.size, pad);
            let rect = PackedRect {
                x,
                y,
                w,
                h,
                content: request.size,
            };

            if let Some(old) = self.rects.get(&request.owner) {
                let row_len = old.w as usize * bpp;
                for row in 0..old.h as usize {
                    let src = (old.y as usize + row) * old_stride + old.x as usize * bpp;
                    let dst = (y as usize + row) * new_stride + x as usize * bpp;
                    pixels[dst..dst + row_len].copy_from_slice(&self.pixels[src..src + row_len]);
                }
            }

            rects.insert(request.owner, rect);
        }

        // Zero-sized owners survive a repack.
        for (owner, rect) in &self.rects {
            if rect.w == 0 && !rects.contains_key(owner) {
                rects.insert(*owner, *rect);
            }
        }

        let evicted = self.rects.keys().filter(|o| !rects.contains_key(o)).count();

        if size != self.size {
            log::debug!(
                "{:?} atlas grew {}x{} -> {}x{}",
                self.format,
                self.size[0],
                self.size[1],
                size[0],
                size[1]
            );
        }

        self.skyline = skyline_from_rects(rects.values(), size[0]);
        self.size = size;
        self.pixels = pixels;
        self.rects = rects;
        self.generation = self.generation.wrapping_add(1);
        self.dirty = true;
        evicted
    }
}

/// The pair of surfaces used by a frame.
pub struct Atlas {
    glyphs: AtlasSurface,
    images: AtlasSurface,
}

impl Atlas {
    pub fn new(glyphs: AtlasConfig, images: AtlasConfig) -> Self {
        Self {
            glyphs: AtlasSurface::new(PixelFormat::Alpha8, glyphs),
            images: AtlasSurface::new(PixelFormat::Rgba8, images),
        }
    }

    pub fn surface(&self, format: PixelFormat) -> &AtlasSurface {
        match format {
            PixelFormat::Alpha8 => &self.glyphs,
            PixelFormat::Rgba8 => &self.images,
        }
    }

    pub fn surface_mut(&mut self, format: PixelFormat) -> &mut AtlasSurface {
        match format {
            PixelFormat::Alpha8 => &mut self.glyphs,
            PixelFormat::Rgba8 => &mut self.images,
        }
    }

    pub fn begin_add_rects(&mut self) {
        self.glyphs.begin_add_rects();
        self.images.begin_add_rects();
    }

    pub fn request_rect(
        &mut self,
        format: PixelFormat,
        owner: AtlasOwner,
        width: u32,
        height: u32,
    ) -> Result<PendingPlacement, AtlasError> {
        self.surface_mut(format).request_rect(owner, width, height)
    }

    /// Pack both surfaces. On `Full`, rectangles that did fit stay placed.
    pub fn end_add_rects(&mut self) -> Result<ResolveStats, AtlasError> {
        let glyphs = self.glyphs.end_add_rects();
        let images = self.images.end_add_rects();

        let mut stats = ResolveStats::default();
        let mut dropped = Vec::new();
        for result in [glyphs, images] {
            match result {
                Ok(s) => stats.merge(s),
                Err(AtlasError::Full {
                    dropped: d,
                    newly_placed,
                }) => {
                    dropped.extend(d);
                    stats.newly_placed.extend(newly_placed);
                }
                Err(e) => return Err(e),
            }
        }

        if dropped.is_empty() {
            Ok(stats)
        } else {
            Err(AtlasError::Full {
                dropped,
                newly_placed: stats.newly_placed,
            })
        }
    }

    pub fn placement(&self, format: PixelFormat, owner: &AtlasOwner) -> Option<Placement> {
        self.surface(format).placement(owner)
    }

    pub fn resolve(&self, token: &PendingPlacement) -> Option<Placement> {
        self.surface(token.format).resolve(token)
    }

    pub fn write_pixels(
        &mut self,
        format: PixelFormat,
        owner: &AtlasOwner,
        data: &[u8],
    ) -> Result<(), AtlasError> {
        self.surface_mut(format).write_pixels(owner, data)
    }

    pub fn reset(&mut self) {
        self.glyphs.reset();
        self.images.reset();
    }
}

fn pixel_len(size: [u32; 2], format: PixelFormat) -> usize {
    size[0] as usize * size[1] as usize * format.bytes_per_pixel()
}

#[inline]
fn reserved(size: [u32; 2], pad: u32) -> [u32; 2] {
    [
        size[0].saturating_add(pad.saturating_mul(2)),
        size[1].saturating_add(pad.saturating_mul(2)),
    ]
}

/// First request for an owner wins.
fn dedup_requests(requests: Vec<Request>) -> Vec<Request> {
    let mut seen = HashSet::with_capacity(requests.len());
    requests
        .into_iter()
        .filter(|r| seen.insert(r.owner))
        .collect()
}

/// Descending height, then descending width. Stable, so ties keep request order.
fn sort_for_packing(requests: &mut [Request], pad: u32) {
    requests.sort_by(|a, b| {
        let [aw, ah] = reserved(a.size, pad);
        let [bw, bh] = reserved(b.size, pad);
        bh.cmp(&ah).then(bw.cmp(&aw))
    });
}

fn pack_all(requests: &[Request], size: [u32; 2], pad: u32) -> Option<Layout> {
    pack_skyline(requests, size, pad).or_else(|| pack_shelves(requests, size, pad))
}

fn pack_skyline(requests: &[Request], size: [u32; 2], pad: u32) -> Option<Layout> {
    let mut skyline = empty_skyline(size[0]);
    let mut layout = Vec::with_capacity(requests.len());
    for request in requests {
        let [w, h] = reserved(request.size, pad);
        let (x, y) = skyline_insert(&mut skyline, size, w, h)?;
        layout.push((*request, x, y));
    }
    Some(layout)
}

fn pack_shelves(requests: &[Request], size: [u32; 2], pad: u32) -> Option<Layout> {
    let mut shelves: Vec<Shelf> = Vec::new();
    let mut next_shelf_y = 0u32;
    let mut layout = Vec::with_capacity(requests.len());

    'requests: for request in requests {
        let [w, h] = reserved(request.size, pad);
        if w > size[0] || h > size[1] {
            return None;
        }

        for shelf in &mut shelves {
            if h <= shelf.height && shelf.x_cursor.saturating_add(w) <= size[0] {
                layout.push((*request, shelf.x_cursor, shelf.y));
                shelf.x_cursor += w;
                continue 'requests;
            }
        }

        if next_shelf_y.saturating_add(h) > size[1] {
            return None;
        }
        layout.push((*request, 0, next_shelf_y));
        shelves.push(Shelf {
            y: next_shelf_y,
            height: h,
            x_cursor: w,
        });
        next_shelf_y += h;
    }

    Some(layout)
}

fn empty_skyline(width: u32) -> Vec<SkylineNode> {
    vec![SkylineNode { x: 0, y: 0, width }]
}

/// Bottom-left placement: lowest resulting top edge wins, ties go left.
fn skyline_insert(
    nodes: &mut Vec<SkylineNode>,
    size: [u32; 2],
    w: u32,
    h: u32,
) -> Option<(u32, u32)> {
    if w > size[0] || h > size[1] {
        return None;
    }

    let mut best: Option<(usize, u32, u32)> = None;
    for i in 0..nodes.len() {
        let x = nodes[i].x;
        if x + w > size[0] {
            break;
        }

        let mut y = 0;
        let mut remaining = w as i64;
        let mut j = i;
        while remaining > 0 {
            y = y.max(nodes[j].y);
            remaining -= nodes[j].width as i64;
            j += 1;
        }

        if y + h > size[1] {
            continue;
        }
        if best.map_or(true, |(_, bx, by)| y < by || (y == by && x < bx)) {
            best = Some((i, x, y));
        }
    }

    let (index, x, y) = best?;
    let node = SkylineNode {
        x,
        y: y + h,
        width: w,
    };
    nodes.insert(index, node);

    // Trim or drop the nodes now covered by the new one.
    let end = x + w;
    let mut i = index + 1;
    while i < nodes.len() && nodes[i].x < end {
        let node_end = nodes[i].x + nodes[i].width;
        if node_end <= end {
            nodes.remove(i);
        } else {
            nodes[i].width = node_end - end;
            nodes[i].x = end;
            break;
        }
    }

    merge_skyline(nodes);
    Some((x, y))
}

fn merge_skyline(nodes: &mut Vec<SkylineNode>) {
    let mut i = 0;
    while i + 1 < nodes.len() {
        if nodes[i].y == nodes[i + 1].y {
            nodes[i].width += nodes[i + 1].width;
            nodes.remove(i + 1);
        } else {
            i += 1;
        }
    }
}

fn skyline_from_rects<'a>(
    rects: impl Iterator<Item = &'a PackedRect>,
    width: u32,
) -> Vec<SkylineNode> {
    let mut heights = vec![0u32; width as usize];
    for rect in rects {
        for column in &mut heights[rect.x as usize..(rect.x + rect.w) as usize] {
            *column = (*column).max(rect.y + rect.h);
        }
    }

    let mut nodes: Vec<SkylineNode> = Vec::new();
    for (x, &y) in heights.iter().enumerate() {
        match nodes.last_mut() {
            Some(last) if last.y == y => last.width += 1,
            _ => nodes.push(SkylineNode {
                x: x as u32,
                y,
                width: 1,
            }),
        }
    }
    if nodes.is_empty() {
        nodes = empty_skyline(width);
    }
    nodes
}
