//! # weft-text
//!
//! Tiny built-in bitmap font for `weft`.
//!
//! Glyphs are drawn procedurally from a handful of strokes (a loose
//! seven-segment scheme plus a few dots), scaled by an integer factor. It reads
//! well enough for debug overlays and gives tests and the test bed a real
//! [`GlyphSource`] without shipping font files.

use weft::{GlyphBitmap, GlyphSource};

/// Monospace font metrics in pixels (at the font's *base* pixel size).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugFontMetrics {
    /// Base glyph advance (monospace cell width) in pixels.
    pub advance_px: u32,
    /// Base glyph cell height in pixels.
    pub height_px: u32,
    /// Baseline offset from the top of the cell in pixels.
    pub baseline_from_top_px: u32,
}

impl Default for DebugFontMetrics {
    fn default() -> Self {
        Self {
            advance_px: 8,
            height_px: 12,
            baseline_from_top_px: 9,
        }
    }
}

// Strokes a glyph is built from.
const TOP: u16 = 1 << 0;
const MID: u16 = 1 << 1;
const BOT: u16 = 1 << 2;
const LEFT_UP: u16 = 1 << 3;
const LEFT_LOW: u16 = 1 << 4;
const RIGHT_UP: u16 = 1 << 5;
const RIGHT_LOW: u16 = 1 << 6;
const CENTER: u16 = 1 << 7;
const DOTS_UP: u16 = 1 << 8;
const DOTS_LOW: u16 = 1 << 9;
const DOT_BASE: u16 = 1 << 10;

const LEFT: u16 = LEFT_UP | LEFT_LOW;
const RIGHT: u16 = RIGHT_UP | RIGHT_LOW;
const BOX: u16 = TOP | BOT | LEFT | RIGHT;

fn strokes(ch: char) -> Option<u16> {
    let s = match ch.to_ascii_uppercase() {
        '0' | 'O' | 'D' => BOX,
        '1' => RIGHT,
        '2' => TOP | MID | BOT | RIGHT_UP | LEFT_LOW,
        '3' => TOP | MID | BOT | RIGHT,
        '4' => MID | LEFT_UP | RIGHT,
        '5' | 'S' => TOP | MID | BOT | LEFT_UP | RIGHT_LOW,
        '6' => TOP | MID | BOT | LEFT | RIGHT_LOW,
        '7' => TOP | RIGHT,
        '8' | 'B' => BOX | MID,
        '9' => TOP | MID | BOT | RIGHT | LEFT_UP,
        'A' => TOP | MID | LEFT | RIGHT,
        'C' => TOP | BOT | LEFT,
        'E' => TOP | MID | BOT | LEFT,
        'F' => TOP | MID | LEFT,
        'G' => TOP | BOT | LEFT | RIGHT_LOW,
        'H' => MID | LEFT | RIGHT,
        'I' => TOP | BOT | CENTER,
        'J' => BOT | RIGHT | LEFT_LOW,
        'K' => LEFT | MID | DOTS_UP | DOTS_LOW,
        'L' => LEFT | BOT,
        'M' => LEFT | RIGHT | DOTS_UP,
        'N' => LEFT | RIGHT | CENTER,
        'P' => TOP | MID | LEFT | RIGHT_UP,
        'Q' => BOX | DOTS_LOW,
        'R' => TOP | MID | LEFT | RIGHT_UP | DOTS_LOW,
        'T' => TOP | CENTER,
        'U' | 'V' => LEFT | RIGHT | BOT,
        'W' => LEFT | RIGHT | BOT | CENTER,
        'X' => DOTS_UP | DOTS_LOW | CENTER,
        'Y' => MID | LEFT_UP | RIGHT_UP | CENTER,
        'Z' => TOP | BOT | RIGHT_UP | LEFT_LOW,
        '-' => MID,
        '_' => BOT,
        '=' => TOP | MID,
        '+' => MID | CENTER,
        '|' => CENTER,
        '.' | ',' => DOT_BASE,
        ':' | ';' => DOTS_UP | DOT_BASE,
        '!' => CENTER | DOT_BASE,
        '?' => TOP | RIGHT_UP | MID | DOT_BASE,
        '(' | '[' | '{' => TOP | BOT | LEFT,
        ')' | ']' | '}' => TOP | BOT | RIGHT,
        _ => return None,
    };
    Some(s)
}

/// Tiny builtin "font".
///
/// Unknown printable glyphs render as a hollow box.
#[derive(Clone, Debug, Default)]
pub struct DebugFont {
    metrics: DebugFontMetrics,
}

impl DebugFont {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: DebugFontMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> DebugFontMetrics {
        self.metrics
    }

    /// Integer scale for a requested pixel size (cell height), at least 1.
    pub fn scale_for(&self, px_size: u16) -> u32 {
        let base = self.metrics.height_px.max(1);
        ((px_size as u32 + base / 2) / base).max(1)
    }

    /// Rasterize `ch` at an integer `scale`. Whitespace yields an empty bitmap
    /// that still advances the pen.
    pub fn rasterize_glyph(&self, ch: char, scale: u32) -> GlyphBitmap {
        let scale = scale.max(1);
        let advance = (self.metrics.advance_px * scale) as f32;
        let baseline = (self.metrics.baseline_from_top_px * scale) as i32;

        if ch.is_whitespace() {
            return GlyphBitmap {
                size_px: [0, 0],
                bearing_px: [0, -baseline],
                advance_px: advance,
                pixels: Vec::new(),
            };
        }

        let w = self.metrics.advance_px * scale;
        let h = self.metrics.height_px * scale;
        let mut canvas = Canvas {
            pixels: vec![0u8; (w * h) as usize],
            w,
            h,
        };

        // Keep a one-unit gutter left/right and two units top/bottom.
        let t = scale;
        let x0 = t;
        let y0 = 2 * t;
        let x1 = w.saturating_sub(t).max(x0 + 1);
        let y1 = h.saturating_sub(2 * t).max(y0 + 1);
        let mid_x = x0 + (x1 - x0) / 2;
        let mid_y = y0 + (y1 - y0) / 2;

        let s = strokes(ch).unwrap_or_else(|| {
            log::trace!("debug font has no strokes for {:?}, drawing a box", ch);
            BOX
        });
        if s & TOP != 0 {
            canvas.hline(x0, x1, y0, t);
        }
        if s & MID != 0 {
            canvas.hline(x0, x1, mid_y, t);
        }
        if s & BOT != 0 {
            canvas.hline(x0, x1, y1.saturating_sub(t), t);
        }
        if s & LEFT_UP != 0 {
            canvas.vline(x0, y0, mid_y + t, t);
        }
        if s & LEFT_LOW != 0 {
            canvas.vline(x0, mid_y, y1, t);
        }
        if s & RIGHT_UP != 0 {
            canvas.vline(x1.saturating_sub(t), y0, mid_y + t, t);
        }
        if s & RIGHT_LOW != 0 {
            canvas.vline(x1.saturating_sub(t), mid_y, y1, t);
        }
        if s & CENTER != 0 {
            canvas.vline(mid_x, y0, y1, t);
        }
        let quarter_w = (x1 - x0) / 4;
        let quarter_h = (y1 - y0) / 4;
        if s & DOTS_UP != 0 {
            canvas.dot(mid_x - quarter_w, mid_y - quarter_h, t);
            canvas.dot(mid_x + quarter_w, mid_y - quarter_h, t);
        }
        if s & DOTS_LOW != 0 {
            canvas.dot(mid_x - quarter_w, mid_y + quarter_h, t);
            canvas.dot(mid_x + quarter_w, mid_y + quarter_h, t);
        }
        if s & DOT_BASE != 0 {
            canvas.dot(mid_x, y1.saturating_sub(2 * t), t);
        }

        GlyphBitmap {
            size_px: [w, h],
            // Cell top sits `baseline` pixels above the pen.
            bearing_px: [0, -baseline],
            advance_px: advance,
            pixels: canvas.pixels,
        }
    }
}

impl GlyphSource for DebugFont {
    fn name(&self) -> &str {
        "debug"
    }

    fn line_height(&self, px_size: u16) -> f32 {
        (self.metrics.height_px * self.scale_for(px_size)) as f32
    }

    fn ascent(&self, px_size: u16) -> f32 {
        (self.metrics.baseline_from_top_px * self.scale_for(px_size)) as f32
    }

    fn rasterize(&self, codepoint: u32, px_size: u16) -> Option<GlyphBitmap> {
        let ch = char::from_u32(codepoint)?;
        if ch.is_control() {
            return None;
        }
        Some(self.rasterize_glyph(ch, self.scale_for(px_size)))
    }
}

struct Canvas {
    pixels: Vec<u8>,
    w: u32,
    h: u32,
}

impl Canvas {
    fn set(&mut self, x: u32, y: u32) {
        if x < self.w && y < self.h {
            self.pixels[(y * self.w + x) as usize] = 255;
        }
    }

    fn hline(&mut self, x0: u32, x1: u32, y: u32, thickness: u32) {
        for yy in y..y.saturating_add(thickness) {
            for x in x0..x1.min(self.w) {
                self.set(x, yy);
            }
        }
    }

    fn vline(&mut self, x: u32, y0: u32, y1: u32, thickness: u32) {
        for xx in x..x.saturating_add(thickness) {
            for y in y0..y1.min(self.h) {
                self.set(xx, y);
            }
        }
    }

    fn dot(&mut self, x: u32, y: u32, size: u32) {
        self.hline(x, x.saturating_add(size), y, size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_tracks_px_size() {
        let font = DebugFont::new();
        assert_eq!(font.scale_for(1), 1);
        assert_eq!(font.scale_for(12), 1);
        assert_eq!(font.scale_for(24), 2);
        assert_eq!(font.line_height(24), 24.0);
        assert_eq!(font.ascent(24), 18.0);
    }

    #[test]
    fn test_glyph_coverage() {
        let font = DebugFont::new();
        let glyph = font.rasterize('H' as u32, 12).unwrap();
        assert_eq!(glyph.size_px, [8, 12]);
        assert_eq!(glyph.pixels.len(), 96);
        assert!(glyph.pixels.iter().any(|&p| p == 255));
        assert_eq!(glyph.bearing_px, [0, -9]);
        assert_eq!(glyph.advance_px, 8.0);
    }

    #[test]
    fn test_space_is_empty_but_advances() {
        let font = DebugFont::new();
        let space = font.rasterize(' ' as u32, 24).unwrap();
        assert_eq!(space.size_px, [0, 0]);
        assert!(space.pixels.is_empty());
        assert_eq!(space.advance_px, 16.0);
    }

    #[test]
    fn test_control_and_invalid_codepoints() {
        let font = DebugFont::new();
        assert!(font.rasterize('\n' as u32, 12).is_none());
        assert!(font.rasterize(0xD800, 12).is_none());
    }

    #[test]
    fn test_unknown_glyph_is_box() {
        let font = DebugFont::new();
        let a = font.rasterize('€' as u32, 12).unwrap();
        let b = font.rasterize('0' as u32, 12).unwrap();
        assert_eq!(a.pixels, b.pixels);
    }
}
