//! Transient text storage for one frame.
//!
//! Widgets hand the recorder borrowed `&str`s that do not outlive the
//! traversal. The recorder copies them here, either as UTF-8 or already
//! decoded into UTF-32 codepoints for glyph lookup, and stores the resulting
//! span inside the command payload.

use crate::arena::{Arena, ArenaConfig, ArenaError, ArenaSpan};

/// UTF-8 string stored in a [`StringArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StrSpan(ArenaSpan);

impl StrSpan {
    pub fn len(self) -> usize {
        self.0.len()
    }

    pub fn is_empty(self) -> bool {
        self.0.is_empty()
    }
}

/// UTF-32 codepoint buffer stored in a [`StringArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodepointSpan(ArenaSpan);

impl CodepointSpan {
    /// Number of codepoints.
    pub fn len(self) -> usize {
        self.0.len() / 4
    }

    pub fn is_empty(self) -> bool {
        self.0.is_empty()
    }

    pub const fn from_raw_parts(parts: [u32; 3]) -> Self {
        Self(ArenaSpan::from_raw_parts(parts[0], parts[1], parts[2]))
    }

    pub const fn to_raw_parts(self) -> [u32; 3] {
        self.0.to_raw_parts()
    }
}

pub struct StringArena {
    arena: Arena,
}

impl StringArena {
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        Ok(Self {
            arena: Arena::new("strings", config)?,
        })
    }

    pub fn push_str(&mut self, text: &str) -> Result<StrSpan, ArenaError> {
        self.arena.alloc_bytes(text.as_bytes()).map(StrSpan)
    }

    pub fn get_str(&self, span: StrSpan) -> Result<&str, ArenaError> {
        let bytes = self.arena.resolve(span.0)?;
        std::str::from_utf8(bytes).map_err(|_| ArenaError::InvalidUtf8)
    }

    /// Decode `text` into codepoints and store them.
    pub fn push_codepoints(&mut self, text: &str) -> Result<CodepointSpan, ArenaError> {
        let count = text.chars().count();
        let span = self.arena.allocate(count * 4, 4)?;
        let out = self.arena.resolve_mut(span)?;
        for (dst, ch) in out.chunks_exact_mut(4).zip(text.chars()) {
            dst.copy_from_slice(&(ch as u32).to_le_bytes());
        }
        Ok(CodepointSpan(span))
    }

    pub fn codepoints(
        &self,
        span: CodepointSpan,
    ) -> Result<impl Iterator<Item = u32> + '_, ArenaError> {
        let bytes = self.arena.resolve(span.0)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
    }

    pub fn rewind(&mut self) {
        self.arena.rewind();
    }

    pub fn used(&self) -> usize {
        self.arena.used()
    }

    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }
}
