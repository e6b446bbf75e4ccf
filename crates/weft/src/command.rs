//! Append-only command stream recorded during traversal and replayed during
//! playback.
//!
//! Every record is laid out as
//!
//! ```text
//! [kind: u16][flags: u16][payload_len: u32][payload bytes ...][pad to 4]
//! ```
//!
//! `payload_len` always equals the encoded size for the kind, so a reader that
//! does not know a kind can still step over it. Records are read back in the
//! exact order they were written (painter's order, later records paint over
//! earlier ones).

use crate::arena::{Arena, ArenaConfig, ArenaError};
use crate::color::Color;
use crate::font::FontId;
use crate::images::ImageHandle;
use crate::string_arena::CodepointSpan;
use bytemuck::{Pod, Zeroable};
use thiserror::Error;

const RECORD_ALIGN: usize = 4;
const HEADER_SIZE: usize = std::mem::size_of::<RecordHeader>();

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command buffer out of memory: {0}")]
    OutOfMemory(#[source] ArenaError),

    #[error("command buffer is poisoned for this frame, record dropped")]
    Poisoned,

    #[error("command buffer is in read mode")]
    WrongPhase,

    #[error("unknown command kind {0}")]
    UnknownKind(u16),

    #[error("kind {kind} payload is {actual} bytes, expected {expected}")]
    PayloadSize {
        kind: u16,
        expected: usize,
        actual: usize,
    },

    #[error("payload of {0} bytes does not fit a record")]
    PayloadTooLarge(usize),
}

/// Kinds understood by this build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CommandKind {
    DrawRect = 1,
    DrawImage = 2,
    DrawText = 3,
}

impl CommandKind {
    pub const fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(Self::DrawRect),
            2 => Some(Self::DrawImage),
            3 => Some(Self::DrawText),
            _ => None,
        }
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self as u16
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct RecordHeader {
    kind: u16,
    flags: u16,
    len: u32,
}

/// Filled (optionally rounded) rectangle between two corners.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RectCmd {
    pub p1: [f32; 2],
    pub p2: [f32; 2],
    pub color: [f32; 4],
    /// Corner radii: top-left, top-right, bottom-right, bottom-left.
    pub rounding: [f32; 4],
}

/// Image quad. The image is referenced by handle so it may still be loading.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ImageCmd {
    pub image: [u32; 2],
    pub pos: [f32; 2],
    pub size: [f32; 2],
    /// Top-left, top-right, bottom-right, bottom-left.
    pub corner_colors: [[f32; 4]; 4],
    pub has_corner_colors: u32,
}

impl ImageCmd {
    pub fn handle(&self) -> ImageHandle {
        ImageHandle::from_raw(self.image)
    }

    pub fn corner_colors(&self) -> [Color; 4] {
        if self.has_corner_colors == 0 {
            [Color::WHITE; 4]
        } else {
            self.corner_colors.map(Color::from_array)
        }
    }
}

/// Run of text. Codepoints live in the frame's string arena.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TextCmd {
    /// [`FontId::NONE`] when no font was bound at record time.
    pub font: u32,
    pub px_size: f32,
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub codepoints: [u32; 3],
}

impl TextCmd {
    pub fn font(&self) -> Option<FontId> {
        FontId::from_raw(self.font)
    }

    pub fn codepoints(&self) -> CodepointSpan {
        CodepointSpan::from_raw_parts(self.codepoints)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    DrawRect(RectCmd),
    DrawImage(ImageCmd),
    DrawText(TextCmd),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::DrawRect(_) => CommandKind::DrawRect,
            Command::DrawImage(_) => CommandKind::DrawImage,
            Command::DrawText(_) => CommandKind::DrawText,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Command::DrawRect(c) => bytemuck::bytes_of(c),
            Command::DrawImage(c) => bytemuck::bytes_of(c),
            Command::DrawText(c) => bytemuck::bytes_of(c),
        }
    }

    /// Decode a record. Unknown kinds are reported, never guessed at.
    pub fn decode(kind: u16, payload: &[u8]) -> Result<Self, CommandError> {
        match CommandKind::from_raw(kind) {
            Some(CommandKind::DrawRect) => read_payload(kind, payload).map(Command::DrawRect),
            Some(CommandKind::DrawImage) => read_payload(kind, payload).map(Command::DrawImage),
            Some(CommandKind::DrawText) => read_payload(kind, payload).map(Command::DrawText),
            None => Err(CommandError::UnknownKind(kind)),
        }
    }
}

fn read_payload<T: Pod>(kind: u16, payload: &[u8]) -> Result<T, CommandError> {
    if payload.len() != std::mem::size_of::<T>() {
        return Err(CommandError::PayloadSize {
            kind,
            expected: std::mem::size_of::<T>(),
            actual: payload.len(),
        });
    }
    Ok(bytemuck::pod_read_unaligned(payload))
}

/// A record as stored, before decoding.
#[derive(Clone, Copy, Debug)]
pub struct RawCommand<'a> {
    pub kind: u16,
    pub payload: &'a [u8],
}

impl RawCommand<'_> {
    pub fn decode(&self) -> Result<Command, CommandError> {
        Command::decode(self.kind, self.payload)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Write,
    Read,
}

pub struct CommandBuffer {
    arena: Arena,
    count: usize,
    mode: Mode,
    read_offset: usize,
    read_index: usize,
    poisoned: bool,
    dropped: usize,
}

impl CommandBuffer {
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        Ok(Self {
            arena: Arena::new("commands", config)?,
            count: 0,
            mode: Mode::Write,
            read_offset: 0,
            read_index: 0,
            poisoned: false,
            dropped: 0,
        })
    }

    /// Append a record.
    ///
    /// After the first out-of-memory failure the buffer is poisoned: every
    /// further write this frame is dropped until [`CommandBuffer::rewind`].
    pub fn write(&mut self, kind: u16, payload: &[u8]) -> Result<(), CommandError> {
        if self.mode == Mode::Read {
            return Err(CommandError::WrongPhase);
        }
        if self.poisoned {
            self.dropped += 1;
            return Err(CommandError::Poisoned);
        }

        let len = u32::try_from(payload.len())
            .map_err(|_| CommandError::PayloadTooLarge(payload.len()))?;

        let size = HEADER_SIZE + payload.len();
        let span = match self.arena.allocate(size, RECORD_ALIGN) {
            Ok(span) => span,
            Err(err) => {
                self.poisoned = true;
                self.dropped += 1;
                log::warn!(
                    "command buffer poisoned after {} records: {}",
                    self.count,
                    err
                );
                return Err(CommandError::OutOfMemory(err));
            }
        };

        let header = RecordHeader {
            kind,
            flags: 0,
            len,
        };
        let out = self
            .arena
            .resolve_mut(span)
            .map_err(CommandError::OutOfMemory)?;
        out[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&header));
        out[HEADER_SIZE..].copy_from_slice(payload);

        self.count += 1;
        Ok(())
    }

    pub fn write_command(&mut self, command: &Command) -> Result<(), CommandError> {
        self.write(command.kind().raw(), command.payload())
    }

    /// Switch to read mode and return the number of records written this
    /// frame. Calling it again restarts reading from the first record.
    pub fn begin_read(&mut self) -> usize {
        self.mode = Mode::Read;
        self.read_offset = 0;
        self.read_index = 0;
        self.count
    }

    /// Return the next record.
    ///
    /// # Panics
    /// When called before [`CommandBuffer::begin_read`] or past the last
    /// record.
    pub fn read_next(&mut self) -> RawCommand<'_> {
        assert!(
            self.mode == Mode::Read,
            "read_next called before begin_read"
        );
        assert!(
            self.read_index < self.count,
            "read past the last command ({} recorded)",
            self.count
        );

        let bytes = self.arena.as_bytes();
        let start = align_up(self.read_offset, RECORD_ALIGN);
        let header: RecordHeader =
            bytemuck::pod_read_unaligned(&bytes[start..start + HEADER_SIZE]);
        let payload_start = start + HEADER_SIZE;
        let payload_end = payload_start + header.len as usize;

        self.read_offset = payload_end;
        self.read_index += 1;

        RawCommand {
            kind: header.kind,
            payload: &bytes[payload_start..payload_end],
        }
    }

    /// Drop everything recorded and go back to write mode.
    pub fn rewind(&mut self) {
        self.arena.rewind();
        self.count = 0;
        self.mode = Mode::Write;
        self.read_offset = 0;
        self.read_index = 0;
        self.poisoned = false;
        self.dropped = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Records dropped since the buffer was poisoned, including the one that
    /// poisoned it.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    #[inline]
    pub fn bytes_used(&self) -> usize {
        self.arena.used()
    }
}

#[inline]
const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(i: usize) -> Command {
        Command::DrawRect(RectCmd {
            p1: [i as f32, 0.0],
            p2: [i as f32 + 1.0, 1.0],
            color: [1.0; 4],
            rounding: [0.0; 4],
        })
    }

    #[test]
    fn test_reads_back_in_write_order() {
        let mut buffer = CommandBuffer::new(ArenaConfig::fixed(4096)).unwrap();
        for i in 0..20 {
            buffer.write_command(&rect(i)).unwrap();
        }

        assert_eq!(buffer.begin_read(), 20);
        for i in 0..20 {
            assert_eq!(buffer.read_next().decode().unwrap(), rect(i));
        }
    }

    #[test]
    fn test_rewind_forgets_previous_frame() {
        let mut buffer = CommandBuffer::new(ArenaConfig::fixed(4096)).unwrap();
        for i in 0..5 {
            buffer.write_command(&rect(i)).unwrap();
        }
        buffer.begin_read();
        buffer.rewind();

        buffer.write_command(&rect(100)).unwrap();
        buffer.write_command(&rect(101)).unwrap();

        assert_eq!(buffer.begin_read(), 2);
        assert_eq!(buffer.read_next().decode().unwrap(), rect(100));
        assert_eq!(buffer.read_next().decode().unwrap(), rect(101));
    }

    #[test]
    fn test_mixed_kinds_and_odd_payload_sizes() {
        let mut buffer = CommandBuffer::new(ArenaConfig::fixed(4096)).unwrap();
        buffer.write(77, &[1, 2, 3]).unwrap();
        buffer.write_command(&rect(1)).unwrap();
        buffer.write(78, &[]).unwrap();

        assert_eq!(buffer.begin_read(), 3);

        let unknown = buffer.read_next();
        assert_eq!(unknown.kind, 77);
        assert_eq!(unknown.payload, &[1, 2, 3]);
        assert_eq!(unknown.decode(), Err(CommandError::UnknownKind(77)));

        assert_eq!(buffer.read_next().decode().unwrap(), rect(1));
        assert_eq!(buffer.read_next().payload.len(), 0);
    }

    #[test]
    fn test_out_of_memory_poisons_until_rewind() {
        let record = HEADER_SIZE + std::mem::size_of::<RectCmd>();
        let mut buffer = CommandBuffer::new(ArenaConfig::fixed(record * 2)).unwrap();

        buffer.write_command(&rect(0)).unwrap();
        buffer.write_command(&rect(1)).unwrap();
        assert!(matches!(
            buffer.write_command(&rect(2)),
            Err(CommandError::OutOfMemory(_))
        ));
        assert!(buffer.is_poisoned());

        // Even a record that would fit is dropped now.
        assert_eq!(buffer.write(9, &[]), Err(CommandError::Poisoned));
        assert_eq!(buffer.dropped(), 2);

        // What was recorded before the failure is intact.
        assert_eq!(buffer.begin_read(), 2);
        assert_eq!(buffer.read_next().decode().unwrap(), rect(0));

        buffer.rewind();
        assert!(!buffer.is_poisoned());
        buffer.write_command(&rect(3)).unwrap();
        assert_eq!(buffer.begin_read(), 1);
    }

    #[test]
    fn test_write_during_read_is_rejected() {
        let mut buffer = CommandBuffer::new(ArenaConfig::fixed(256)).unwrap();
        buffer.begin_read();
        assert_eq!(
            buffer.write_command(&rect(0)),
            Err(CommandError::WrongPhase)
        );
    }

    #[test]
    fn test_payload_size_mismatch() {
        assert_eq!(
            Command::decode(CommandKind::DrawRect.raw(), &[0u8; 4]),
            Err(CommandError::PayloadSize {
                kind: 1,
                expected: std::mem::size_of::<RectCmd>(),
                actual: 4,
            })
        );
    }

    #[test]
    #[should_panic(expected = "read past the last command")]
    fn test_read_past_end_panics() {
        let mut buffer = CommandBuffer::new(ArenaConfig::fixed(256)).unwrap();
        buffer.write_command(&rect(0)).unwrap();
        buffer.begin_read();
        buffer.read_next();
        buffer.read_next();
    }
}
