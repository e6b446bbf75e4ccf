//! Frame-scoped bump allocator.
//!
//! An [`Arena`] owns one contiguous byte buffer and a cursor. Allocation bumps
//! the cursor, [`Arena::rewind`] resets it in O(1). There is no way to free a
//! single allocation.
//!
//! Allocations are handed out as [`ArenaSpan`]s (offset + length + epoch), not
//! as references. A growable arena may reallocate its buffer, so callers keep
//! spans around and resolve them to slices only at the point of use. Rewinding
//! bumps the epoch; resolving a span from an earlier epoch is an error, which
//! keeps last frame's garbage from being read back as if it were current.

use bytemuck::Pod;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena `{name}`: unable to reserve {size} bytes")]
    InitialReserve { name: &'static str, size: usize },

    #[error("arena `{name}` full: {requested} more bytes, {used}/{capacity} used")]
    OutOfMemory {
        name: &'static str,
        requested: usize,
        used: usize,
        capacity: usize,
    },

    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),

    #[error("span from epoch {span} resolved in epoch {current}")]
    StaleSpan { span: u32, current: u32 },

    #[error("span {offset}..{end} lies outside the {used} bytes in use")]
    OutOfBounds {
        offset: usize,
        end: usize,
        used: usize,
    },

    #[error("span holds {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("span does not hold valid UTF-8")]
    InvalidUtf8,
}

/// Sizing policy for an [`Arena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Bytes reserved up front.
    pub capacity: usize,
    /// Whether the buffer may be reallocated when it runs out.
    pub growable: bool,
    /// Upper bound for growth. Ignored when `growable` is false.
    pub max_capacity: usize,
}

impl ArenaConfig {
    pub const fn fixed(capacity: usize) -> Self {
        Self {
            capacity,
            growable: false,
            max_capacity: capacity,
        }
    }

    pub const fn growable(capacity: usize) -> Self {
        Self {
            capacity,
            growable: true,
            max_capacity: 64 * 1024 * 1024,
        }
    }

    pub const fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::growable(64 * 1024)
    }
}

/// Location of an allocation inside an [`Arena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArenaSpan {
    offset: u32,
    len: u32,
    epoch: u32,
}

impl ArenaSpan {
    #[inline]
    pub const fn offset(self) -> usize {
        self.offset as usize
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn epoch(self) -> u32 {
        self.epoch
    }

    #[inline]
    pub const fn end(self) -> usize {
        self.offset as usize + self.len as usize
    }

    /// Rebuild a span from its raw parts, e.g. after it was stored inside a
    /// command payload.
    pub const fn from_raw_parts(offset: u32, len: u32, epoch: u32) -> Self {
        Self { offset, len, epoch }
    }

    pub const fn to_raw_parts(self) -> [u32; 3] {
        [self.offset, self.len, self.epoch]
    }
}

/// Bump allocator over a single byte buffer.
pub struct Arena {
    name: &'static str,
    buf: Vec<u8>,
    cursor: usize,
    high_water: usize,
    epoch: u32,
    config: ArenaConfig,
}

impl Arena {
    /// Reserve the initial buffer. Failing here is a startup error.
    pub fn new(name: &'static str, config: ArenaConfig) -> Result<Self, ArenaError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(config.capacity)
            .map_err(|_| ArenaError::InitialReserve {
                name,
                size: config.capacity,
            })?;
        buf.resize(config.capacity, 0);

        log::debug!(
            "arena `{}` created: {} bytes ({})",
            name,
            config.capacity,
            if config.growable { "growable" } else { "fixed" }
        );

        Ok(Self {
            name,
            buf,
            cursor: 0,
            high_water: 0,
            epoch: 0,
            config,
        })
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Bytes handed out since the last rewind.
    #[inline]
    pub fn used(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Largest `used()` ever observed, across rewinds.
    #[inline]
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Reserve `size` bytes at an offset that is a multiple of `alignment`.
    pub fn allocate(&mut self, size: usize, alignment: usize) -> Result<ArenaSpan, ArenaError> {
        if !alignment.is_power_of_two() {
            return Err(ArenaError::InvalidAlignment(alignment));
        }

        let start = self
            .cursor
            .checked_add(alignment - 1)
            .map(|v| v & !(alignment - 1))
            .ok_or_else(|| self.out_of_memory(size))?;
        let end = start
            .checked_add(size)
            .ok_or_else(|| self.out_of_memory(size))?;

        // Spans store u32 offsets.
        if end > u32::MAX as usize {
            return Err(self.out_of_memory(size));
        }

        if end > self.buf.len() {
            self.grow(end, size)?;
        }

        self.cursor = end;
        self.high_water = self.high_water.max(end);

        Ok(ArenaSpan {
            offset: start as u32,
            len: size as u32,
            epoch: self.epoch,
        })
    }

    /// Copy `bytes` into the arena.
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> Result<ArenaSpan, ArenaError> {
        let span = self.allocate(bytes.len(), 1)?;
        self.buf[span.offset()..span.end()].copy_from_slice(bytes);
        Ok(span)
    }

    /// Copy a plain-old-data value into the arena, aligned for `T`.
    pub fn alloc_pod<T: Pod>(&mut self, value: &T) -> Result<ArenaSpan, ArenaError> {
        let span = self.allocate(std::mem::size_of::<T>(), std::mem::align_of::<T>())?;
        let bytes = bytemuck::bytes_of(value);
        self.buf[span.offset()..span.end()].copy_from_slice(bytes);
        Ok(span)
    }

    pub fn resolve(&self, span: ArenaSpan) -> Result<&[u8], ArenaError> {
        self.check(span)?;
        Ok(&self.buf[span.offset()..span.end()])
    }

    pub fn resolve_mut(&mut self, span: ArenaSpan) -> Result<&mut [u8], ArenaError> {
        self.check(span)?;
        Ok(&mut self.buf[span.offset()..span.end()])
    }

    /// Read back a value written with [`Arena::alloc_pod`].
    pub fn read_pod<T: Pod>(&self, span: ArenaSpan) -> Result<T, ArenaError> {
        let bytes = self.resolve(span)?;
        if bytes.len() != std::mem::size_of::<T>() {
            return Err(ArenaError::SizeMismatch {
                expected: std::mem::size_of::<T>(),
                actual: bytes.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Everything written since the last rewind.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    /// Reset the cursor. Memory is left as-is and every outstanding span
    /// becomes stale.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn check(&self, span: ArenaSpan) -> Result<(), ArenaError> {
        if span.epoch != self.epoch {
            return Err(ArenaError::StaleSpan {
                span: span.epoch,
                current: self.epoch,
            });
        }
        if span.end() > self.cursor {
            return Err(ArenaError::OutOfBounds {
                offset: span.offset(),
                end: span.end(),
                used: self.cursor,
            });
        }
        Ok(())
    }

    fn grow(&mut self, required: usize, requested: usize) -> Result<(), ArenaError> {
        if !self.config.growable || required > self.config.max_capacity {
            return Err(self.out_of_memory(requested));
        }

        let doubled = self.buf.len().saturating_mul(2).max(64);
        let new_capacity = doubled.max(required).min(self.config.max_capacity);

        self.buf
            .try_reserve_exact(new_capacity - self.buf.len())
            .map_err(|_| self.out_of_memory(requested))?;
        self.buf.resize(new_capacity, 0);

        log::debug!(
            "arena `{}` grew to {} bytes (required {})",
            self.name,
            new_capacity,
            required
        );
        Ok(())
    }

    fn out_of_memory(&self, requested: usize) -> ArenaError {
        ArenaError::OutOfMemory {
            name: self.name,
            requested,
            used: self.cursor,
            capacity: self.buf.len(),
        }
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("name", &self.name)
            .field("used", &self.cursor)
            .field("capacity", &self.buf.len())
            .field("epoch", &self.epoch)
            .finish()
    }
}
