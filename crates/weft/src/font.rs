//! Fonts and the glyph bitmap cache.
//!
//! Rasterization is not done here. A host plugs in a [`GlyphSource`] per font
//! and the registry caches whatever it produces, one bitmap per
//! [`GlyphKey`]. The atlas only ever sees those cached bitmaps.

use crate::atlas::AtlasOwner;
use std::collections::HashMap;

/// Index of a font in a [`FontRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(u32);

impl FontId {
    /// Raw value stored in a text command when no font was bound.
    pub const NONE: u32 = u32::MAX;

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw == Self::NONE {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw encoding of an optional font.
    #[inline]
    pub fn encode(font: Option<FontId>) -> u32 {
        font.map_or(Self::NONE, FontId::raw)
    }
}

/// Identifies one rasterized glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub font: FontId,
    pub codepoint: u32,
    pub px_size: u16,
}

impl GlyphKey {
    pub fn new(font: FontId, codepoint: u32, px_size: f32) -> Self {
        Self {
            font,
            codepoint,
            px_size: quantize_px(px_size),
        }
    }
}

impl From<GlyphKey> for AtlasOwner {
    fn from(key: GlyphKey) -> Self {
        AtlasOwner::Glyph {
            font: key.font.raw(),
            codepoint: key.codepoint,
            px_size: key.px_size,
        }
    }
}

/// Pixel sizes are cached at whole-pixel granularity.
#[inline]
pub fn quantize_px(px_size: f32) -> u16 {
    px_size.round().clamp(1.0, u16::MAX as f32) as u16
}

/// Coverage bitmap for a single glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphBitmap {
    pub size_px: [u32; 2],
    /// Offset from the pen position (on the baseline) to the bitmap's top-left.
    pub bearing_px: [i32; 2],
    pub advance_px: f32,
    /// `size_px[0] * size_px[1]` bytes, one coverage value per pixel.
    pub pixels: Vec<u8>,
}

/// Something that can turn codepoints into coverage bitmaps.
pub trait GlyphSource: Send {
    fn name(&self) -> &str;

    /// Distance between baselines at `px_size`.
    fn line_height(&self, px_size: u16) -> f32;

    /// Distance from the top of the line box to the baseline at `px_size`.
    fn ascent(&self, px_size: u16) -> f32 {
        self.line_height(px_size) * 0.8
    }

    /// `None` if the font has no glyph for `codepoint`.
    fn rasterize(&self, codepoint: u32, px_size: u16) -> Option<GlyphBitmap>;
}

#[derive(Default)]
pub struct FontRegistry {
    fonts: Vec<Box<dyn GlyphSource>>,
    glyphs: HashMap<GlyphKey, Option<GlyphBitmap>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: Box<dyn GlyphSource>) -> FontId {
        let id = FontId(self.fonts.len() as u32);
        log::debug!("registered font {:?} as {:?}", source.name(), id);
        self.fonts.push(source);
        id
    }

    pub fn get(&self, font: FontId) -> Option<&dyn GlyphSource> {
        self.fonts.get(font.0 as usize).map(|f| f.as_ref())
    }

    pub fn contains(&self, font: FontId) -> bool {
        (font.0 as usize) < self.fonts.len()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn line_height(&self, font: FontId, px_size: u16) -> Option<f32> {
        self.get(font).map(|f| f.line_height(px_size))
    }

    pub fn ascent(&self, font: FontId, px_size: u16) -> Option<f32> {
        self.get(font).map(|f| f.ascent(px_size))
    }

    /// Rasterize on first use, then serve from cache. Misses are cached too.
    pub fn glyph(&mut self, key: GlyphKey) -> Option<&GlyphBitmap> {
        if !self.glyphs.contains_key(&key) {
            let bitmap = self
                .fonts
                .get(key.font.0 as usize)
                .and_then(|f| f.rasterize(key.codepoint, key.px_size));
            self.glyphs.insert(key, bitmap);
        }
        self.glyphs.get(&key).and_then(Option::as_ref)
    }

    /// Cached bitmap without rasterizing.
    pub fn cached(&self, key: &GlyphKey) -> Option<&GlyphBitmap> {
        self.glyphs.get(key).and_then(Option::as_ref)
    }

    pub fn cached_len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn clear_cache(&mut self) {
        self.glyphs.clear();
    }
}
