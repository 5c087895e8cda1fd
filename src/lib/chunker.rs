//! File chunking: splits a byte range into an ordered sequence of
//! fixed-size work items.
//!
//! The [`Chunker`] is a lazy, finite iterator producing [`WorkItem`]
//! descriptors with strictly increasing `index` starting at 0. The final
//! item is tagged `is_last` and its allocation is rounded up to the
//! engine's alignment granule while `valid_bytes` keeps the true
//! remaining byte count; the reader zero-fills the padding.

use crate::errors::{PipelineError, Result};

/// Alignment granule of the processing engine, in bytes. Chunk sizes and
/// padded final chunks are multiples of this.
pub const ENGINE_ALIGN: usize = 128;

/// Largest permitted chunk size. Relative match offsets travel through
/// the engine's signed 32-bit result format, so a chunk must stay well
/// inside `i32` range.
pub const MAX_CHUNK_SIZE: usize = 1 << 30;

/// The unit of work flowing through the pipeline.
///
/// Created empty by the [`Chunker`], filled by a reader thread, handed
/// through the reorder buffer to the engine, and finally consumed by a
/// writer. Exactly one stage owns an item at a time.
#[derive(Debug)]
pub struct WorkItem {
    /// Monotonically increasing sequence number; defines the total order.
    pub index: u64,
    /// Byte offset into the source file.
    pub offset: u64,
    /// Length of the buffer to allocate (final chunk rounded up to
    /// [`ENGINE_ALIGN`]).
    pub alloc_bytes: usize,
    /// Bytes of real file content (≤ `alloc_bytes`); the rest is zero.
    pub valid_bytes: usize,
    /// Length of the engine output, set by the completion path.
    pub result_bytes: usize,
    /// True for exactly one item: the one reaching end-of-input.
    pub is_last: bool,
    /// The data buffer. Empty until a reader fills it; holds engine
    /// output after completion.
    pub buffer: Vec<u8>,
}

/// Round up to the next multiple of [`ENGINE_ALIGN`].
#[must_use]
pub fn round_to_align(x: usize) -> usize {
    (x + ENGINE_ALIGN - 1) & !(ENGINE_ALIGN - 1)
}

/// Lazy iterator over the chunks of a file range.
///
/// Covers `[0, min(total_len, limit))` with contiguous, non-overlapping
/// `(offset, valid_bytes)` spans and sets `is_last` on exactly one item.
/// Non-restartable: iterate once.
#[derive(Debug)]
pub struct Chunker {
    chunk_size: usize,
    remaining: u64,
    offset: u64,
    next_index: u64,
    done: bool,
}

impl Chunker {
    /// Plan chunks for a file of `total_len` bytes, optionally capped at
    /// `limit` bytes.
    ///
    /// # Errors
    ///
    /// Returns a config error if `chunk_size` is zero, not a multiple of
    /// [`ENGINE_ALIGN`], or larger than [`MAX_CHUNK_SIZE`].
    pub fn new(total_len: u64, chunk_size: usize, limit: Option<u64>) -> Result<Self> {
        if chunk_size == 0 || chunk_size % ENGINE_ALIGN != 0 {
            return Err(PipelineError::Config {
                parameter: "chunk size".to_string(),
                reason: format!("{chunk_size} is not a positive multiple of {ENGINE_ALIGN}"),
            });
        }
        if chunk_size > MAX_CHUNK_SIZE {
            return Err(PipelineError::Config {
                parameter: "chunk size".to_string(),
                reason: format!("{chunk_size} exceeds the maximum of {MAX_CHUNK_SIZE}"),
            });
        }
        let remaining = limit.map_or(total_len, |cap| total_len.min(cap));
        Ok(Self { chunk_size, remaining, offset: 0, next_index: 0, done: false })
    }
}

impl Iterator for Chunker {
    type Item = WorkItem;

    fn next(&mut self) -> Option<WorkItem> {
        if self.done {
            return None;
        }

        // A full chunk unless the remainder is shorter; then the
        // allocation rounds up to the alignment granule and the reader
        // zero-fills past valid_bytes. A zero-length range still yields
        // one empty last item so end-of-stream propagates.
        let (alloc_bytes, valid_bytes) = if (self.chunk_size as u64) > self.remaining {
            let valid = self.remaining as usize;
            (round_to_align(valid), valid)
        } else {
            (self.chunk_size, self.chunk_size)
        };

        let mut item = WorkItem {
            index: self.next_index,
            offset: self.offset,
            alloc_bytes,
            valid_bytes,
            result_bytes: 0,
            is_last: false,
            buffer: Vec::new(),
        };
        self.next_index += 1;
        self.offset += alloc_bytes as u64;
        self.remaining = self.remaining.saturating_sub(alloc_bytes as u64);

        if self.remaining == 0 {
            item.is_last = true;
            self.done = true;
        }
        Some(item)
    }
}
