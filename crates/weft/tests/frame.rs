use crossbeam_channel::{Receiver, Sender};
use glam::Vec2;
use std::sync::Arc;
use std::time::Duration;
use weft::*;

/// Solid blocks, half as wide as tall. Spaces are empty.
struct Blocks;

impl GlyphSource for Blocks {
    fn name(&self) -> &str {
        "blocks"
    }

    fn line_height(&self, px_size: u16) -> f32 {
        px_size as f32
    }

    fn rasterize(&self, codepoint: u32, px_size: u16) -> Option<GlyphBitmap> {
        let h = px_size as u32;
        let w = (h / 2).max(1);
        if codepoint == ' ' as u32 {
            return Some(GlyphBitmap {
                size_px: [0, 0],
                bearing_px: [0, 0],
                advance_px: w as f32,
                pixels: Vec::new(),
            });
        }
        Some(GlyphBitmap {
            size_px: [w, h],
            bearing_px: [0, -(h as i32)],
            advance_px: w as f32 + 1.0,
            pixels: vec![255; (w * h) as usize],
        })
    }
}

/// Decodes raw RGBA, but only once the test lets it.
struct GatedDecoder {
    gate: Receiver<()>,
}

impl ImageDecoder for GatedDecoder {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn decode(
        &self,
        source: &ImageSource,
        options: &ImageOptions,
    ) -> Result<DecodedImage, ImageError> {
        let _ = self.gate.recv();
        RawRgbaDecoder.decode(source, options)
    }
}

fn deferred() -> RenderConfig {
    // RUST_LOG=debug shows the frame warnings.
    let _ = env_logger::builder().is_test(true).try_init();
    RenderConfig::default().with_decode(DecodeMode::Deferred)
}

fn rgba(width: u32, height: u32) -> ImageSource {
    ImageSource::Rgba {
        width,
        height,
        pixels: vec![255; (width * height * 4) as usize],
    }
}

#[test]
fn test_commands_play_back_in_recording_order() {
    let mut ctx = Context::new(deferred()).unwrap();
    let font = ctx.add_font(Box::new(Blocks));
    let image = ctx.load_image(rgba(8, 8));

    ctx.begin_frame().unwrap();
    ctx.record_draw_rect(Vec2::ZERO, Vec2::new(50.0, 20.0), Color::BLACK, 0.0)
        .unwrap();
    ctx.record_draw_text(Some(font), Vec2::new(4.0, 4.0), 12.0, Color::WHITE, "ok")
        .unwrap();
    ctx.record_draw_image(image, Vec2::new(60.0, 0.0), Vec2::new(8.0, 8.0), None)
        .unwrap();
    let output = ctx.end_frame().unwrap();

    let order: Vec<_> = output.draws.iter().map(|d| (d.shape, d.texture)).collect();
    assert_eq!(
        order,
        vec![
            (BatchShape::Solid, None),
            (BatchShape::Textured, Some(PixelFormat::Alpha8)),
            (BatchShape::Textured, Some(PixelFormat::Rgba8)),
        ]
    );
    assert_eq!(output.stats.commands_recorded, 3);
    assert_eq!(output.stats.glyphs_drawn, 2);
    assert_eq!(output.stats.images_drawn, 1);
    assert!(output.warnings.is_empty());

    let textured = output.textured;
    assert!(textured
        .indices()
        .iter()
        .all(|&i| (i as usize) < textured.vertex_count()));
}

#[test]
fn test_raw_command_buffer_keeps_order_across_rewind() {
    let mut buffer = CommandBuffer::new(ArenaConfig::fixed(1024)).unwrap();
    let mut strings = StringArena::new(ArenaConfig::fixed(256)).unwrap();

    let rect = Command::DrawRect(RectCmd {
        p1: [0.0, 0.0],
        p2: [1.0, 1.0],
        color: [1.0; 4],
        rounding: [0.0; 4],
    });
    let text = Command::DrawText(TextCmd {
        font: FontId::NONE,
        px_size: 12.0,
        position: [0.0, 0.0],
        color: [1.0; 4],
        codepoints: strings.push_codepoints("abc").unwrap().to_raw_parts(),
    });
    let image = Command::DrawImage(ImageCmd {
        image: [0, 0],
        pos: [0.0, 0.0],
        size: [4.0, 4.0],
        corner_colors: [[1.0; 4]; 4],
        has_corner_colors: 0,
    });

    for command in [&rect, &text, &image] {
        buffer.write_command(command).unwrap();
    }
    assert_eq!(buffer.begin_read(), 3);
    let kinds: Vec<_> = (0..3).map(|_| buffer.read_next().decode().unwrap().kind()).collect();
    assert_eq!(
        kinds,
        vec![
            CommandKind::DrawRect,
            CommandKind::DrawText,
            CommandKind::DrawImage,
        ]
    );

    buffer.rewind();
    buffer.write_command(&image).unwrap();
    assert_eq!(buffer.begin_read(), 1);
    assert_eq!(buffer.read_next().decode().unwrap(), image);
}

#[test]
fn test_unregistered_font_is_reported() {
    let mut ctx = Context::new(deferred()).unwrap();
    let stray = FontId::from_raw(5);

    ctx.begin_frame().unwrap();
    ctx.record_draw_text(stray, Vec2::ZERO, 12.0, Color::WHITE, "lost")
        .unwrap();
    ctx.record_draw_rect(Vec2::ZERO, Vec2::ONE, Color::WHITE, 0.0)
        .unwrap();
    let output = ctx.end_frame().unwrap();

    assert_eq!(
        output.warnings,
        &[FrameWarning::MissingFont { font: stray }]
    );
    assert_eq!(output.draws.len(), 1);
}

#[test]
fn test_pending_image_draws_placeholder_then_texture() {
    let (gate_tx, gate_rx): (Sender<()>, Receiver<()>) = crossbeam_channel::unbounded();
    let config = RenderConfig::default()
        .with_decode(DecodeMode::Threads(1))
        .with_placeholder_color(Some(Color::BLACK));
    let mut ctx = Context::new(config).unwrap();
    *ctx.images_mut() = ImagePipeline::with_decoder(
        DecodeMode::Threads(1),
        Arc::new(GatedDecoder { gate: gate_rx }),
    )
    .unwrap();

    ctx.begin_frame().unwrap();
    let image = ctx.load_image(rgba(16, 8));
    assert_eq!(ctx.image_status(image), ImageStatus::Pending);
    ctx.record_draw_image(image, Vec2::ZERO, Vec2::new(32.0, 16.0), None)
        .unwrap();
    {
        let output = ctx.end_frame().unwrap();
        assert_eq!(output.stats.placeholders_drawn, 1);
        assert_eq!(output.draws[0].shape, BatchShape::Solid);
    }
    assert!(ctx.get_texture(image).is_none());

    gate_tx.send(()).unwrap();
    assert!(ctx.images_mut().wait_idle(Duration::from_secs(10)));
    assert_eq!(ctx.image_status(image), ImageStatus::Loaded);
    // Loaded, but not in the atlas until the next resolve.
    assert!(ctx.get_texture(image).is_none());

    ctx.begin_frame().unwrap();
    ctx.record_draw_image(image, Vec2::ZERO, Vec2::new(32.0, 16.0), None)
        .unwrap();
    {
        let output = ctx.end_frame().unwrap();
        assert_eq!(output.stats.images_drawn, 1);
        assert_eq!(output.draws[0].texture, Some(PixelFormat::Rgba8));
        assert!(output.image_atlas.is_dirty());
    }

    let texture = ctx.get_texture(image).unwrap();
    assert_eq!((texture.placement.width, texture.placement.height), (16, 8));
    assert_eq!(texture.format, PixelFormat::Rgba8);
    assert!(texture.uv.max[0] > texture.uv.min[0]);
}

#[test]
fn test_failed_image_draws_nothing() {
    let mut ctx = Context::new(deferred()).unwrap();
    let broken = ctx.load_image(ImageSource::Rgba {
        width: 2,
        height: 2,
        pixels: vec![0; 5],
    });

    ctx.begin_frame().unwrap();
    ctx.record_draw_image(broken, Vec2::ZERO, Vec2::ONE, None)
        .unwrap();
    let output = ctx.end_frame().unwrap();

    assert!(output.draws.is_empty());
    assert_eq!(output.stats.placeholders_drawn, 0);
    assert_eq!(ctx.image_status(broken), ImageStatus::Failed);
}

#[test]
fn test_command_arena_exhaustion_degrades_the_frame() {
    let config = deferred().with_commands(ArenaConfig::fixed(64));
    let mut ctx = Context::new(config).unwrap();

    ctx.begin_frame().unwrap();
    for i in 0..5 {
        let x = i as f32 * 10.0;
        let (p1, p2) = (Vec2::new(x, 0.0), Vec2::new(x + 5.0, 5.0));
        ctx.record_draw_rect(p1, p2, Color::WHITE, 0.0).unwrap();
    }
    let output = ctx.end_frame().unwrap();

    assert_eq!(output.stats.commands_recorded, 1);
    assert_eq!(output.stats.commands_dropped, 4);
    assert_eq!(
        output.warnings,
        &[FrameWarning::OutOfMemory(MemoryResource::Commands)]
    );
    assert_eq!(output.solid.vertex_count(), 4);

    // The next frame starts clean.
    ctx.begin_frame().unwrap();
    ctx.record_draw_rect(Vec2::ZERO, Vec2::ONE, Color::WHITE, 0.0)
        .unwrap();
    let output = ctx.end_frame().unwrap();
    assert!(output.warnings.is_empty());
}

#[test]
fn test_string_arena_exhaustion_drops_text() {
    let config = deferred().with_strings(ArenaConfig::fixed(8));
    let mut ctx = Context::new(config).unwrap();
    let font = ctx.add_font(Box::new(Blocks));

    ctx.begin_frame().unwrap();
    ctx.record_draw_text(Some(font), Vec2::ZERO, 12.0, Color::WHITE, "too long")
        .unwrap();
    ctx.record_draw_text(Some(font), Vec2::ZERO, 12.0, Color::WHITE, "again")
        .unwrap();
    let output = ctx.end_frame().unwrap();

    assert_eq!(
        output.warnings,
        &[FrameWarning::OutOfMemory(MemoryResource::Strings)]
    );
    assert_eq!(output.stats.commands_dropped, 2);
    assert!(output.draws.is_empty());
}

#[test]
fn test_full_glyph_atlas_drops_glyphs_and_warns() {
    let config = deferred().with_glyph_atlas(AtlasConfig::fixed(16, 16));
    let mut ctx = Context::new(config).unwrap();
    let font = ctx.add_font(Box::new(Blocks));

    ctx.begin_frame().unwrap();
    // Three distinct 8x16 glyphs, room for two.
    ctx.record_draw_text(Some(font), Vec2::ZERO, 16.0, Color::WHITE, "abc")
        .unwrap();
    let output = ctx.end_frame().unwrap();

    assert_eq!(output.warnings, &[FrameWarning::AtlasFull { dropped: 1 }]);
    assert_eq!(output.stats.glyphs_drawn, 2);
}

#[test]
fn test_vertex_limit_poisons_batch() {
    let config = deferred().with_max_vertices(8);
    let mut ctx = Context::new(config).unwrap();

    ctx.begin_frame().unwrap();
    for i in 0..4 {
        let x = i as f32 * 10.0;
        let (p1, p2) = (Vec2::new(x, 0.0), Vec2::new(x + 5.0, 5.0));
        ctx.record_draw_rect(p1, p2, Color::WHITE, 0.0).unwrap();
    }
    let output = ctx.end_frame().unwrap();

    assert_eq!(output.solid.vertex_count(), 8);
    assert_eq!(output.stats.primitives_dropped, 2);
    let batch = MemoryResource::Batch(BatchShape::Solid);
    assert_eq!(output.warnings, &[FrameWarning::OutOfMemory(batch)]);
}

#[test]
fn test_image_corner_colors_reach_vertices() {
    let mut ctx = Context::new(deferred()).unwrap();
    let image = ctx.load_image(rgba(4, 4));
    let colors = [
        Color::new(1.0, 0.0, 0.0, 1.0),
        Color::new(0.0, 1.0, 0.0, 1.0),
        Color::new(0.0, 0.0, 1.0, 1.0),
        Color::new(1.0, 1.0, 0.0, 0.5),
    ];

    ctx.begin_frame().unwrap();
    ctx.record_draw_image(
        image,
        Vec2::new(10.0, 20.0),
        Vec2::new(8.0, 6.0),
        Some(colors),
    )
    .unwrap();
    let output = ctx.end_frame().unwrap();

    assert_eq!(output.stats.images_drawn, 1);
    let vertices = output.textured.vertices();
    assert_eq!(vertices.len(), 4);
    // Top-left, top-right, bottom-right, bottom-left.
    let positions = [[10.0, 20.0], [18.0, 20.0], [18.0, 26.0], [10.0, 26.0]];
    for ((vertex, color), pos) in vertices.iter().zip(colors).zip(positions) {
        assert_eq!(vertex.pos, pos);
        assert_eq!(vertex.color, color.to_array());
    }
}

#[test]
fn test_image_without_corner_colors_is_untinted() {
    let mut ctx = Context::new(deferred()).unwrap();
    let image = ctx.load_image(rgba(2, 2));

    ctx.begin_frame().unwrap();
    ctx.record_draw_image(image, Vec2::ZERO, Vec2::ONE, None)
        .unwrap();
    let output = ctx.end_frame().unwrap();

    assert!(output
        .textured
        .vertices()
        .iter()
        .all(|v| v.color == Color::WHITE.to_array()));
}

#[test]
fn test_per_corner_rounding_reaches_solid_batch() {
    let mut ctx = Context::new(deferred()).unwrap();

    ctx.begin_frame().unwrap();
    ctx.record_draw_rect_rounded(
        Vec2::ZERO,
        Vec2::new(40.0, 20.0),
        Color::WHITE,
        [4.0, 0.0, 0.0, 0.0],
    )
    .unwrap();
    ctx.record_draw_rect(Vec2::ZERO, Vec2::new(40.0, 20.0), Color::WHITE, 4.0)
        .unwrap();
    let output = ctx.end_frame().unwrap();

    let segments = RenderConfig::default().segments_per_corner as usize;
    let one_arc = (segments + 1) + 3 + 2;
    let four_arcs = 4 * (segments + 1) + 2;
    assert_eq!(output.solid.vertex_count(), one_arc + four_arcs);
    // The sharp bottom-right corner is an exact vertex of the first rect.
    assert!(output.solid.vertices()[..one_arc]
        .iter()
        .any(|v| v.pos == [40.0, 20.0]));
    assert_eq!(output.draws.len(), 1);
}

#[derive(Default)]
struct CountingBackend {
    frames: usize,
    indices: usize,
    dirty_uploads: usize,
}

impl RenderBackend for CountingBackend {
    fn render(&mut self, frame: &FrameOutput<'_>) {
        self.frames += 1;
        self.indices += frame.solid.index_count() + frame.textured.index_count();
        for format in [PixelFormat::Alpha8, PixelFormat::Rgba8] {
            if frame.surface(format).is_dirty() {
                self.dirty_uploads += 1;
            }
        }
    }
}

#[test]
fn test_present_hands_frames_to_backend() {
    let mut ctx = Context::new(deferred()).unwrap();
    let font = ctx.add_font(Box::new(Blocks));
    let mut backend = CountingBackend::default();

    for _ in 0..3 {
        ctx.begin_frame().unwrap();
        ctx.record_draw_rect(Vec2::ZERO, Vec2::new(10.0, 10.0), Color::WHITE, 3.0)
            .unwrap();
        ctx.record_draw_text(Some(font), Vec2::ZERO, 12.0, Color::WHITE, "hi")
            .unwrap();
        ctx.present(&mut backend).unwrap();
    }

    assert_eq!(backend.frames, 3);
    assert!(backend.indices > 0);
    // Glyph pixels only change on the first frame.
    assert_eq!(backend.dirty_uploads, 1);
    assert_eq!(ctx.frame_index(), 3);
    assert!(!ctx.atlas().surface(PixelFormat::Alpha8).is_dirty());
}

#[test]
fn test_operations_out_of_order_fail() {
    let mut ctx = Context::new(deferred()).unwrap();
    assert!(matches!(
        ctx.resolve_atlas(),
        Err(FrameError::WrongPhase {
            operation: "resolve_atlas",
            ..
        })
    ));

    ctx.begin_frame().unwrap();
    ctx.resolve_atlas().unwrap();
    assert!(matches!(
        ctx.resolve_atlas(),
        Err(FrameError::WrongPhase { .. })
    ));
}
