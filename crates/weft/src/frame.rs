//! The per-frame pipeline.
//!
//! A [`Context`] owns every frame-scoped resource and walks them through a
//! fixed sequence of phases:
//!
//! ```text
//! begin_frame   rewind arenas, batches and warnings
//! record_*      traversal: append commands
//! resolve_atlas poll decoded images, request rectangles, pack, upload
//! playback      replay commands into vertex batches
//! handoff       expose buffers, draw list and atlas surfaces
//! ```
//!
//! Calling an operation out of order is a [`FrameError::WrongPhase`]. Nothing
//! that goes wrong *inside* a frame is an error: out-of-memory, a full atlas,
//! a missing font or an unknown record degrade to a skipped primitive and a
//! [`FrameWarning`].

use crate::arena::{ArenaConfig, ArenaError};
use crate::atlas::{
    Atlas, AtlasConfig, AtlasError, AtlasOwner, AtlasSurface, PixelFormat, Placement,
    ResolveStats, UvRect,
};
use crate::batch::{
    Batch, BatchError, BatchShape, DrawCall, SolidVertex, TexturedVertex, VertexBatcher,
};
use crate::color::Color;
use crate::command::{Command, CommandBuffer, CommandError, ImageCmd, RectCmd, TextCmd};
use crate::font::{quantize_px, FontId, FontRegistry, GlyphKey, GlyphSource};
use crate::images::{
    DecodeMode, ImageError, ImageHandle, ImageInfo, ImageOptions, ImagePipeline, ImageSource,
    ImageStatus,
};
use crate::string_arena::{CodepointSpan, StringArena};
use crate::tessellate;
use glam::Vec2;
use thiserror::Error;

/// Everything a [`Context`] needs up front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    pub commands: ArenaConfig,
    pub strings: ArenaConfig,
    pub glyph_atlas: AtlasConfig,
    pub image_atlas: AtlasConfig,
    /// Per batch.
    pub max_vertices: usize,
    pub decode: DecodeMode,
    /// Drawn in place of images that have no pixels yet.
    pub placeholder_color: Option<Color>,
    pub segments_per_corner: u32,
}

impl RenderConfig {
    pub const fn with_commands(mut self, commands: ArenaConfig) -> Self {
        self.commands = commands;
        self
    }

    pub const fn with_strings(mut self, strings: ArenaConfig) -> Self {
        self.strings = strings;
        self
    }

    pub const fn with_glyph_atlas(mut self, atlas: AtlasConfig) -> Self {
        self.glyph_atlas = atlas;
        self
    }

    pub const fn with_image_atlas(mut self, atlas: AtlasConfig) -> Self {
        self.image_atlas = atlas;
        self
    }

    pub const fn with_max_vertices(mut self, max_vertices: usize) -> Self {
        self.max_vertices = max_vertices;
        self
    }

    pub const fn with_decode(mut self, decode: DecodeMode) -> Self {
        self.decode = decode;
        self
    }

    pub const fn with_placeholder_color(mut self, color: Option<Color>) -> Self {
        self.placeholder_color = color;
        self
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            commands: ArenaConfig::growable(64 * 1024),
            strings: ArenaConfig::growable(16 * 1024),
            glyph_atlas: AtlasConfig::default(),
            image_atlas: AtlasConfig::growable([1024, 1024], [4096, 4096]).with_padding(1),
            max_vertices: 1 << 20,
            decode: DecodeMode::default(),
            placeholder_color: Some(Color::new(0.5, 0.5, 0.5, 0.25)),
            segments_per_corner: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// No frame has started yet.
    Idle,
    Traversal,
    AtlasResolved,
    PlayedBack,
    HandedOff,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("{operation} called during {actual:?}, expected {expected:?}")]
    WrongPhase {
        operation: &'static str,
        expected: FramePhase,
        actual: FramePhase,
    },

    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// What ran out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryResource {
    Commands,
    Strings,
    Batch(BatchShape),
}

/// Something degraded this frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameWarning {
    OutOfMemory(MemoryResource),
    AtlasFull { dropped: usize },
    /// Text recorded with no font, or with a font that is not registered.
    MissingFont { font: Option<FontId> },
    UnknownCommand { kind: u16 },
    MalformedCommand { kind: u16 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub commands_recorded: usize,
    pub commands_dropped: usize,
    pub primitives_dropped: usize,
    pub glyphs_drawn: usize,
    pub images_drawn: usize,
    pub placeholders_drawn: usize,
    pub draw_calls: usize,
}

/// Where a loaded image lives in the image atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureRef {
    pub format: PixelFormat,
    pub placement: Placement,
    pub uv: UvRect,
    pub surface_size: [u32; 2],
    pub surface_generation: u32,
}

/// Everything a backend needs to draw one frame.
pub struct FrameOutput<'a> {
    pub frame: u64,
    pub solid: &'a Batch<SolidVertex>,
    pub textured: &'a Batch<TexturedVertex>,
    pub draws: &'a [DrawCall],
    pub glyph_atlas: &'a AtlasSurface,
    pub image_atlas: &'a AtlasSurface,
    pub warnings: &'a [FrameWarning],
    pub stats: FrameStats,
}

impl FrameOutput<'_> {
    pub fn surface(&self, format: PixelFormat) -> &AtlasSurface {
        match format {
            PixelFormat::Alpha8 => self.glyph_atlas,
            PixelFormat::Rgba8 => self.image_atlas,
        }
    }
}

/// Consumer of finished frames, usually a GPU renderer.
pub trait RenderBackend {
    /// Upload dirty atlas surfaces and submit the draw list.
    fn render(&mut self, frame: &FrameOutput<'_>);
}

pub struct Context {
    config: RenderConfig,
    phase: FramePhase,
    frame: u64,
    commands: CommandBuffer,
    strings: StringArena,
    strings_dropped: usize,
    atlas: Atlas,
    batcher: VertexBatcher,
    images: ImagePipeline,
    fonts: FontRegistry,
    warnings: Vec<FrameWarning>,
    stats: FrameStats,
    codepoint_scratch: Vec<u32>,
}

impl Context {
    pub fn new(config: RenderConfig) -> Result<Self, FrameError> {
        let context = Self {
            commands: CommandBuffer::new(config.commands)?,
            strings: StringArena::new(config.strings)?,
            strings_dropped: 0,
            atlas: Atlas::new(config.glyph_atlas, config.image_atlas),
            batcher: VertexBatcher::new(config.max_vertices),
            images: ImagePipeline::new(config.decode)?,
            fonts: FontRegistry::new(),
            warnings: Vec::new(),
            stats: FrameStats::default(),
            codepoint_scratch: Vec::new(),
            phase: FramePhase::Idle,
            frame: 0,
            config,
        };
        log::info!(
            "render context ready: {:?} decode, glyph atlas {:?}, image atlas {:?}",
            config.decode,
            config.glyph_atlas.initial_size,
            config.image_atlas.initial_size
        );
        Ok(context)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Number of frames begun so far.
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    pub fn add_font(&mut self, source: Box<dyn GlyphSource>) -> FontId {
        self.fonts.add(source)
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontRegistry {
        &mut self.fonts
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn images(&self) -> &ImagePipeline {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut ImagePipeline {
        &mut self.images
    }

    pub fn warnings(&self) -> &[FrameWarning] {
        &self.warnings
    }

    // Images can be loaded and queried at any point of the frame.

    pub fn load_image(&mut self, source: ImageSource) -> ImageHandle {
        self.images.load(source)
    }

    pub fn load_image_with_options(
        &mut self,
        source: ImageSource,
        options: ImageOptions,
    ) -> ImageHandle {
        self.images.load_with_options(source, options)
    }

    pub fn image_status(&self, handle: ImageHandle) -> ImageStatus {
        self.images.status(handle)
    }

    pub fn image_info(&self, handle: ImageHandle) -> Option<ImageInfo> {
        self.images.info(handle)
    }

    pub fn image_pixels(&self, handle: ImageHandle) -> Option<&[u8]> {
        self.images.pixels(handle)
    }

    pub fn unload_image(&mut self, handle: ImageHandle) -> bool {
        self.images.unload(handle)
    }

    /// Atlas location of a loaded image. `None` until the image is loaded and
    /// an atlas resolve has placed it.
    pub fn get_texture(&self, handle: ImageHandle) -> Option<TextureRef> {
        if self.images.status(handle) != ImageStatus::Loaded {
            return None;
        }
        let surface = self.atlas.surface(PixelFormat::Rgba8);
        let placement = surface.placement(&AtlasOwner::from(handle))?;
        Some(TextureRef {
            format: PixelFormat::Rgba8,
            placement,
            uv: placement.uv(surface.size()),
            surface_size: surface.size(),
            surface_generation: surface.generation(),
        })
    }

    pub fn begin_frame(&mut self) -> Result<(), FrameError> {
        if !matches!(self.phase, FramePhase::Idle | FramePhase::HandedOff) {
            return Err(FrameError::WrongPhase {
                operation: "begin_frame",
                expected: FramePhase::HandedOff,
                actual: self.phase,
            });
        }

        self.commands.rewind();
        self.strings.rewind();
        self.strings_dropped = 0;
        self.batcher.reset();
        self.warnings.clear();
        self.stats = FrameStats::default();
        self.frame += 1;
        self.phase = FramePhase::Traversal;
        Ok(())
    }

    /// Rectangle with the same `rounding` radius on every corner.
    pub fn record_draw_rect(
        &mut self,
        p1: Vec2,
        p2: Vec2,
        color: Color,
        rounding: f32,
    ) -> Result<(), FrameError> {
        self.expect_phase("record_draw_rect", FramePhase::Traversal)?;
        self.write_rect(p1, p2, color, [rounding; 4]);
        Ok(())
    }

    /// Rectangle with its own radius per corner: top-left, top-right,
    /// bottom-right, bottom-left.
    pub fn record_draw_rect_rounded(
        &mut self,
        p1: Vec2,
        p2: Vec2,
        color: Color,
        corner_radii: [f32; 4],
    ) -> Result<(), FrameError> {
        self.expect_phase("record_draw_rect_rounded", FramePhase::Traversal)?;
        self.write_rect(p1, p2, color, corner_radii);
        Ok(())
    }

    /// `colors` tint the corners (top-left, top-right, bottom-right,
    /// bottom-left); `None` draws the image untinted.
    pub fn record_draw_image(
        &mut self,
        handle: ImageHandle,
        pos: Vec2,
        size: Vec2,
        colors: Option<[Color; 4]>,
    ) -> Result<(), FrameError> {
        self.expect_phase("record_draw_image", FramePhase::Traversal)?;
        let command = Command::DrawImage(ImageCmd {
            image: handle.to_raw(),
            pos: pos.to_array(),
            size: size.to_array(),
            corner_colors: colors.map_or([[1.0; 4]; 4], |c| c.map(Color::to_array)),
            has_corner_colors: colors.is_some() as u32,
        });
        self.write(&command);
        Ok(())
    }

    /// `position` is the top-left of the first line box.
    pub fn record_draw_text(
        &mut self,
        font: Option<FontId>,
        position: Vec2,
        px_size: f32,
        color: Color,
        text: &str,
    ) -> Result<(), FrameError> {
        self.expect_phase("record_draw_text", FramePhase::Traversal)?;

        let codepoints = if self.commands.is_poisoned() {
            // The write below is dropped anyway; keep the text out of the arena.
            CodepointSpan::from_raw_parts([0; 3])
        } else {
            match self.strings.push_codepoints(text) {
                Ok(span) => span,
                Err(e) => {
                    if self.strings_dropped == 0 {
                        log::debug!("text dropped: {}", e);
                        self.warn(FrameWarning::OutOfMemory(MemoryResource::Strings));
                    }
                    self.strings_dropped += 1;
                    return Ok(());
                }
            }
        };

        let command = Command::DrawText(TextCmd {
            font: FontId::encode(font),
            px_size,
            position: position.to_array(),
            color: color.to_array(),
            codepoints: codepoints.to_raw_parts(),
        });
        self.write(&command);
        Ok(())
    }

    /// Pull in decoded images, place everything this frame references in the
    /// atlas and upload pixels for new rectangles.
    pub fn resolve_atlas(&mut self) -> Result<ResolveStats, FrameError> {
        self.expect_phase("resolve_atlas", FramePhase::Traversal)?;

        let polled = self.images.poll();
        if polled.loaded + polled.failed > 0 {
            log::debug!("images: {} loaded, {} failed", polled.loaded, polled.failed);
        }

        self.atlas.begin_add_rects();

        let count = self.commands.begin_read();
        for _ in 0..count {
            let command = match self.commands.read_next().decode() {
                Ok(command) => command,
                Err(_) => continue,
            };

            match command {
                Command::DrawRect(_) => {}
                Command::DrawImage(cmd) => {
                    let handle = cmd.handle();
                    if let Some(info) = self.images.info(handle) {
                        self.request(PixelFormat::Rgba8, handle.into(), info.width, info.height);
                    }
                }
                Command::DrawText(cmd) => {
                    let Some(font) = cmd.font().filter(|f| self.fonts.contains(*f)) else {
                        continue;
                    };
                    let px_size = quantize_px(cmd.px_size);
                    let Ok(codepoints) = self
                        .strings
                        .codepoints(cmd.codepoints())
                        .map(|it| it.collect::<Vec<u32>>())
                    else {
                        continue;
                    };
                    for codepoint in codepoints {
                        let key = GlyphKey {
                            font,
                            codepoint,
                            px_size,
                        };
                        if let Some(glyph) = self.fonts.glyph(key) {
                            let [w, h] = glyph.size_px;
                            if w > 0 && h > 0 {
                                self.request(PixelFormat::Alpha8, key.into(), w, h);
                            }
                        }
                    }
                }
            }
        }

        let stats = match self.atlas.end_add_rects() {
            Ok(stats) => stats,
            Err(AtlasError::Full {
                dropped,
                newly_placed,
            }) => {
                self.warn(FrameWarning::AtlasFull {
                    dropped: dropped.len(),
                });
                ResolveStats {
                    newly_placed,
                    ..ResolveStats::default()
                }
            }
            Err(e) => {
                log::warn!("atlas resolve failed: {}", e);
                ResolveStats::default()
            }
        };

        if stats.repacked {
            log::debug!(
                "atlas repacked (grew: {}, evicted: {})",
                stats.grew,
                stats.evicted
            );
        }

        for owner in &stats.newly_placed {
            self.upload(owner);
        }

        self.phase = FramePhase::AtlasResolved;
        Ok(stats)
    }

    /// Replay the recorded commands, in order, into the vertex batches.
    pub fn playback(&mut self) -> Result<(), FrameError> {
        self.expect_phase("playback", FramePhase::AtlasResolved)?;

        let count = self.commands.begin_read();
        for _ in 0..count {
            let raw = self.commands.read_next();
            let kind = raw.kind;
            match raw.decode() {
                Ok(Command::DrawRect(cmd)) => self.play_rect(&cmd),
                Ok(Command::DrawImage(cmd)) => self.play_image(&cmd),
                Ok(Command::DrawText(cmd)) => self.play_text(&cmd),
                Err(CommandError::UnknownKind(_)) => {
                    self.warn(FrameWarning::UnknownCommand { kind })
                }
                Err(_) => self.warn(FrameWarning::MalformedCommand { kind }),
            }
        }

        self.phase = FramePhase::PlayedBack;
        Ok(())
    }

    pub fn handoff(&mut self) -> Result<FrameOutput<'_>, FrameError> {
        self.expect_phase("handoff", FramePhase::PlayedBack)?;

        self.stats.commands_recorded = self.commands.len();
        self.stats.commands_dropped = self.commands.dropped() + self.strings_dropped;
        self.stats.draw_calls = self.batcher.draws().len();
        self.phase = FramePhase::HandedOff;

        Ok(FrameOutput {
            frame: self.frame,
            solid: self.batcher.solid(),
            textured: self.batcher.textured(),
            draws: self.batcher.draws(),
            glyph_atlas: self.atlas.surface(PixelFormat::Alpha8),
            image_atlas: self.atlas.surface(PixelFormat::Rgba8),
            warnings: &self.warnings,
            stats: self.stats,
        })
    }

    /// Resolve, play back and hand off in one go.
    pub fn end_frame(&mut self) -> Result<FrameOutput<'_>, FrameError> {
        self.resolve_atlas()?;
        self.playback()?;
        self.handoff()
    }

    /// [`Self::end_frame`], then give the output to `backend`. Atlas surfaces
    /// count as uploaded afterwards.
    pub fn present<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<FrameStats, FrameError> {
        let stats = {
            let output = self.end_frame()?;
            backend.render(&output);
            output.stats
        };
        self.mark_textures_uploaded();
        Ok(stats)
    }

    /// Clear the dirty flags of both atlas surfaces.
    pub fn mark_textures_uploaded(&mut self) {
        self.atlas.surface_mut(PixelFormat::Alpha8).clear_dirty();
        self.atlas.surface_mut(PixelFormat::Rgba8).clear_dirty();
    }

    fn expect_phase(
        &self,
        operation: &'static str,
        expected: FramePhase,
    ) -> Result<(), FrameError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(FrameError::WrongPhase {
                operation,
                expected,
                actual: self.phase,
            })
        }
    }

    fn warn(&mut self, warning: FrameWarning) {
        log::warn!("frame {}: {:?}", self.frame, warning);
        self.warnings.push(warning);
    }

    fn write_rect(&mut self, p1: Vec2, p2: Vec2, color: Color, rounding: [f32; 4]) {
        let command = Command::DrawRect(RectCmd {
            p1: p1.to_array(),
            p2: p2.to_array(),
            color: color.to_array(),
            rounding,
        });
        self.write(&command);
    }

    fn write(&mut self, command: &Command) {
        match self.commands.write_command(command) {
            Ok(()) | Err(CommandError::Poisoned) => {}
            Err(CommandError::OutOfMemory(_)) => {
                self.warn(FrameWarning::OutOfMemory(MemoryResource::Commands))
            }
            Err(e) => log::warn!("dropped {:?} record: {}", command.kind(), e),
        }
    }

    fn request(&mut self, format: PixelFormat, owner: AtlasOwner, width: u32, height: u32) {
        if let Err(e) = self.atlas.request_rect(format, owner, width, height) {
            log::warn!("atlas request for {:?} failed: {}", owner, e);
        }
    }

    fn upload(&mut self, owner: &AtlasOwner) {
        let result = match *owner {
            AtlasOwner::Image { index, generation } => {
                let handle = ImageHandle::from_raw([index, generation]);
                match self.images.pixels(handle) {
                    Some(pixels) => self.atlas.write_pixels(PixelFormat::Rgba8, owner, pixels),
                    None => Ok(()),
                }
            }
            AtlasOwner::Glyph {
                font,
                codepoint,
                px_size,
            } => {
                let bitmap = FontId::from_raw(font).and_then(|font| {
                    self.fonts.cached(&GlyphKey {
                        font,
                        codepoint,
                        px_size,
                    })
                });
                match bitmap {
                    Some(glyph) => {
                        let surface = self.atlas.surface_mut(PixelFormat::Alpha8);
                        surface.write_pixels(owner, &glyph.pixels)
                    }
                    None => Ok(()),
                }
            }
        };

        if let Err(e) = result {
            log::warn!("upload for {:?} failed: {}", owner, e);
        }
    }

    fn note_batch_result(&mut self, result: Result<(), BatchError>) {
        match result {
            Ok(()) => {}
            Err(BatchError::OutOfMemory { shape, .. }) => {
                self.stats.primitives_dropped += 1;
                self.warn(FrameWarning::OutOfMemory(MemoryResource::Batch(shape)));
            }
            Err(BatchError::Poisoned(_)) => self.stats.primitives_dropped += 1,
        }
    }

    fn play_rect(&mut self, cmd: &RectCmd) {
        let result = tessellate::fill_rect(
            &mut self.batcher,
            cmd.p1,
            cmd.p2,
            Color::from_array(cmd.color),
            cmd.rounding,
            self.config.segments_per_corner,
        );
        self.note_batch_result(result);
    }

    fn play_image(&mut self, cmd: &ImageCmd) {
        let handle = cmd.handle();
        let min = cmd.pos;
        let max = [cmd.pos[0] + cmd.size[0], cmd.pos[1] + cmd.size[1]];

        let placement = match self.images.status(handle) {
            ImageStatus::Failed => return,
            ImageStatus::Loaded => self
                .atlas
                .placement(PixelFormat::Rgba8, &AtlasOwner::from(handle)),
            ImageStatus::Pending => None,
        };

        let result = match placement {
            Some(placement) => {
                self.stats.images_drawn += 1;
                let uv = placement.uv(self.atlas.surface(PixelFormat::Rgba8).size());
                tessellate::textured_quad(
                    &mut self.batcher,
                    PixelFormat::Rgba8,
                    min,
                    max,
                    uv,
                    cmd.corner_colors(),
                )
            }
            None => match self.config.placeholder_color {
                Some(color) => {
                    self.stats.placeholders_drawn += 1;
                    tessellate::fill_rect(&mut self.batcher, min, max, color, [0.0; 4], 0)
                }
                None => Ok(()),
            },
        };
        self.note_batch_result(result);
    }

    fn play_text(&mut self, cmd: &TextCmd) {
        let font = match cmd.font() {
            Some(font) if self.fonts.contains(font) => font,
            other => {
                self.warn(FrameWarning::MissingFont { font: other });
                return;
            }
        };

        let px_size = quantize_px(cmd.px_size);
        let line_height = self.fonts.line_height(font, px_size).unwrap_or(cmd.px_size);
        let ascent = self.fonts.ascent(font, px_size).unwrap_or(cmd.px_size);
        let color = Color::from_array(cmd.color);
        let glyph_surface_size = self.atlas.surface(PixelFormat::Alpha8).size();

        let mut pen_x = cmd.position[0];
        let mut baseline = cmd.position[1] + ascent;

        let mut codepoints = std::mem::take(&mut self.codepoint_scratch);
        codepoints.clear();
        if let Ok(iter) = self.strings.codepoints(cmd.codepoints()) {
            codepoints.extend(iter);
        }

        for &codepoint in &codepoints {
            if codepoint == '\n' as u32 {
                pen_x = cmd.position[0];
                baseline += line_height;
                continue;
            }

            let key = GlyphKey {
                font,
                codepoint,
                px_size,
            };
            let Some(glyph) = self.fonts.cached(&key) else {
                continue;
            };
            let [w, h] = glyph.size_px;
            let min = [
                pen_x + glyph.bearing_px[0] as f32,
                baseline + glyph.bearing_px[1] as f32,
            ];
            pen_x += glyph.advance_px;

            if w == 0 || h == 0 {
                continue;
            }
            let owner = AtlasOwner::from(key);
            let Some(placement) = self.atlas.placement(PixelFormat::Alpha8, &owner) else {
                continue;
            };

            let max = [min[0] + w as f32, min[1] + h as f32];
            let uv = placement.uv(glyph_surface_size);
            let result = tessellate::textured_quad(
                &mut self.batcher,
                PixelFormat::Alpha8,
                min,
                max,
                uv,
                [color; 4],
            );
            if result.is_ok() {
                self.stats.glyphs_drawn += 1;
            }
            self.note_batch_result(result);
        }

        self.codepoint_scratch = codepoints;
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("frame", &self.frame)
            .field("phase", &self.phase)
            .field("commands", &self.commands.len())
            .field("fonts", &self.fonts.len())
            .field("images", &self.images.len())
            .finish()
    }
}
