//! Headless weft test bed
//!
//! Runs a number of frames of a randomly generated UI through the render
//! pipeline and logs what a backend would receive.
//!
//! Usage: `weft-testbed [--frames N] [IMAGE...]`

use glam::Vec2;
use rand::Rng;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use weft::{
    Color, Context, DecodeMode, FontId, FrameError, FrameOutput, ImageHandle, ImageSource,
    PixelFormat, RenderBackend, RenderConfig,
};
use weft_text::DebugFont;

const DEFAULT_FRAMES: usize = 5;
const WIDGETS_PER_FRAME: usize = 200;
const CANVAS: Vec2 = Vec2::new(1280.0, 720.0);

struct Args {
    frames: usize,
    images: Vec<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args {
        frames: DEFAULT_FRAMES,
        images: Vec::new(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--frames" {
            match iter.next().and_then(|n| n.parse().ok()) {
                Some(n) => args.frames = n,
                None => log::warn!("--frames expects a number, keeping {}", args.frames),
            }
        } else {
            args.images.push(PathBuf::from(arg));
        }
    }
    args
}

/// Procedural gradient, so there is always at least one image to draw.
fn gradient(width: u32, height: u32) -> ImageSource {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let u = x as f32 / width as f32;
            let v = y as f32 / height as f32;
            pixels.extend_from_slice(&[
                (u * 100.0 + 50.0) as u8,
                (v * 80.0 + 40.0) as u8,
                ((1.0 - u) * 180.0 + 75.0) as u8,
                255,
            ]);
        }
    }
    ImageSource::Rgba {
        width,
        height,
        pixels,
    }
}

/// Stands in for a GPU renderer: logs what it would upload and draw.
#[derive(Default)]
struct LogBackend {
    uploads: [u32; 2],
}

impl RenderBackend for LogBackend {
    fn render(&mut self, frame: &FrameOutput<'_>) {
        let formats = [PixelFormat::Alpha8, PixelFormat::Rgba8];
        for (slot, format) in formats.into_iter().enumerate() {
            let surface = frame.surface(format);
            if surface.is_dirty() {
                self.uploads[slot] += 1;
                log::debug!(
                    "  upload {:?} atlas {}x{} (generation {}, {} bytes)",
                    format,
                    surface.width(),
                    surface.height(),
                    surface.generation(),
                    surface.pixels().len()
                );
            }
        }

        log::info!(
            "frame {}: {} draws, {} + {} vertices, {} glyphs, {} images, {} placeholders",
            frame.frame,
            frame.draws.len(),
            frame.solid.vertex_count(),
            frame.textured.vertex_count(),
            frame.stats.glyphs_drawn,
            frame.stats.images_drawn,
            frame.stats.placeholders_drawn
        );
        for warning in frame.warnings {
            log::info!("  warning: {:?}", warning);
        }
    }
}

fn record_scene(
    ctx: &mut Context,
    rng: &mut impl Rng,
    font: FontId,
    images: &[ImageHandle],
) -> Result<(), FrameError> {
    for i in 0..WIDGETS_PER_FRAME {
        let pos = Vec2::new(
            rng.random_range(0.0..CANVAS.x - 120.0),
            rng.random_range(0.0..CANVAS.y - 40.0),
        );
        let size = Vec2::new(rng.random_range(20.0..120.0), rng.random_range(12.0..40.0));

        match i % 4 {
            0 | 1 => {
                let color = Color::from_srgba(rng.random(), rng.random(), rng.random(), 255);
                ctx.record_draw_rect(pos, pos + size, color, rng.random_range(0.0..8.0))?;
            }
            2 => {
                let label = format!("ITEM {i}");
                ctx.record_draw_text(Some(font), pos, 12.0, Color::WHITE, &label)?;
            }
            _ => {
                if let Some(&image) = images.get(rng.random_range(0..images.len().max(1))) {
                    ctx.record_draw_image(image, pos, size, None)?;
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), FrameError> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();
    log::info!("Starting weft test bed: {} frames", args.frames);

    let mut ctx = Context::new(RenderConfig::default().with_decode(DecodeMode::Threads(2)))?;
    let font = ctx.add_font(Box::new(DebugFont::new()));

    let mut images = vec![ctx.load_image(gradient(64, 48))];
    for path in &args.images {
        images.push(ctx.load_image(ImageSource::path(path)));
    }

    let mut rng = rand::rng();
    let mut backend = LogBackend::default();

    for _ in 0..args.frames {
        let start = Instant::now();
        ctx.begin_frame()?;
        record_scene(&mut ctx, &mut rng, font, &images)?;
        let stats = ctx.present(&mut backend)?;
        log::debug!(
            "  {:?} for {} commands ({} dropped)",
            start.elapsed(),
            stats.commands_recorded,
            stats.commands_dropped
        );

        // Give decoders a moment so later frames show real images.
        ctx.images_mut().wait_idle(Duration::from_millis(50));
    }

    for (handle, path) in images.iter().skip(1).zip(&args.images) {
        log::info!("{}: {:?}", path.display(), ctx.image_status(*handle));
    }
    log::info!(
        "atlas uploads: {} glyph, {} image",
        backend.uploads[0],
        backend.uploads[1]
    );

    Ok(())
}
