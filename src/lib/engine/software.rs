//! Software emulation of the processing engine.
//!
//! Reproduces the three hardware transforms in process: raw copy,
//! phrase search producing an offset list, and pseudo-random content
//! generation. Completions flow through a bounded channel whose depth
//! models the hardware submission queue, so a slow completion consumer
//! applies backpressure to the submitter exactly like the real device.
//!
//! # Search result format
//!
//! The result buffer is a list of little-endian `i32` offsets relative to
//! the chunk start, padded with [`NO_MORE_MATCHES`] up to a 128-byte
//! multiple (32 entries per alignment line). Matches may overlap. A match
//! that straddles a chunk boundary is reported against the chunk that
//! completed it, with a negative offset reaching back into the previous
//! chunk.

use crossbeam_channel::{bounded, Receiver, Sender};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::chunker::{round_to_align, ENGINE_ALIGN};
use crate::engine::{
    EngineClosed, EngineCompleter, EngineCompletion, EngineOp, EngineRequest, EngineSubmitter,
    NO_MORE_MATCHES,
};
use crate::errors::{PipelineError, Result};

/// Maximum needle length, matching the width of the hardware's search
/// register.
pub const MAX_NEEDLE_LEN: usize = 16;

/// Software engine session factory.
pub struct SoftwareEngine;

impl SoftwareEngine {
    /// Open a session with `queue_len` completion-queue entries and an
    /// optional search needle (fixed for the session's lifetime).
    ///
    /// # Errors
    ///
    /// Returns a config error if `queue_len` is zero or the needle is
    /// empty or longer than [`MAX_NEEDLE_LEN`].
    pub fn start(
        queue_len: usize,
        needle: Option<&[u8]>,
    ) -> Result<(SoftwareSubmitter, SoftwareCompleter)> {
        if queue_len == 0 {
            return Err(PipelineError::Config {
                parameter: "queue length".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(n) = needle {
            if n.is_empty() || n.len() > MAX_NEEDLE_LEN {
                return Err(PipelineError::Config {
                    parameter: "search phrase".to_string(),
                    reason: format!("length must be 1..={MAX_NEEDLE_LEN} bytes, got {}", n.len()),
                });
            }
        }

        let (tx, rx) = bounded(queue_len);
        let submitter = SoftwareSubmitter {
            tx,
            search: SearchState {
                needle: needle.map(<[u8]>::to_vec).unwrap_or_default(),
                tail: Vec::new(),
            },
            // Fixed seed: fill output is reproducible across runs.
            rng: StdRng::seed_from_u64(0x5eed_f111),
        };
        Ok((submitter, SoftwareCompleter { rx }))
    }
}

/// Submission half: runs the transform inline and queues the completion.
pub struct SoftwareSubmitter {
    tx: Sender<EngineCompletion>,
    search: SearchState,
    rng: StdRng,
}

impl EngineSubmitter for SoftwareSubmitter {
    fn submit(&mut self, request: EngineRequest) -> Result<(), EngineClosed> {
        let EngineRequest { mut item, op } = request;

        let (result_bytes, dirty) = match op {
            EngineOp::Copy => (item.buffer.len(), true),
            EngineOp::Fill => {
                self.rng.fill_bytes(&mut item.buffer);
                (item.buffer.len(), true)
            }
            EngineOp::Search => {
                let offsets = self.search.scan(&item.buffer);
                let found = offsets.len();
                let result = encode_offsets(&offsets);
                let result_bytes = result.len();
                item.buffer = result;
                (result_bytes, found > 0)
            }
        };

        let completion = EngineCompletion { item, result_bytes, dirty, status: 0 };
        self.tx.send(completion).map_err(|_| EngineClosed)
    }
}

/// Completion half: pops results in submission order.
pub struct SoftwareCompleter {
    rx: Receiver<EngineCompletion>,
}

impl EngineCompleter for SoftwareCompleter {
    fn await_completion(&mut self) -> Option<EngineCompletion> {
        self.rx.recv().ok()
    }
}

/// Pack relative offsets as little-endian `i32`s padded with the
/// sentinel to a full alignment line. No matches encodes to an empty
/// buffer.
fn encode_offsets(offsets: &[i32]) -> Vec<u8> {
    const ENTRY: usize = std::mem::size_of::<i32>();
    let padded_entries = round_to_align(offsets.len() * ENTRY) / ENTRY;
    let mut out = Vec::with_capacity(padded_entries * ENTRY);
    for &off in offsets {
        out.extend_from_slice(&off.to_le_bytes());
    }
    for _ in offsets.len()..padded_entries {
        out.extend_from_slice(&NO_MORE_MATCHES.to_le_bytes());
    }
    debug_assert_eq!(out.len() % ENGINE_ALIGN, 0);
    out
}

/// Streaming needle scanner. Chunks arrive in file order on the single
/// submission path, so matches straddling a chunk boundary are found by
/// re-scanning a window of the last `needle_len - 1` stream bytes.
struct SearchState {
    needle: Vec<u8>,
    /// Last `needle_len - 1` bytes seen so far, accumulated across
    /// chunks shorter than the needle.
    tail: Vec<u8>,
}

impl SearchState {
    /// Scan one chunk, returning match offsets relative to its start.
    /// A match that began in an earlier chunk yields a negative offset.
    fn scan(&mut self, hay: &[u8]) -> Vec<i32> {
        let n = self.needle.len();
        let mut out = Vec::new();
        if n == 0 {
            return out;
        }

        // Matches that begin in the carried tail. Every position in the
        // tail is a candidate start; with a self-overlapping needle more
        // than one trailing prefix can be live at the boundary, so each
        // one is checked independently.
        if !self.tail.is_empty() {
            let mut window = self.tail.clone();
            window.extend_from_slice(&hay[..hay.len().min(n - 1)]);
            for i in 0..self.tail.len() {
                if window.len() >= i + n && window[i..i + n] == self.needle[..] {
                    out.push(i as i32 - self.tail.len() as i32);
                }
            }
        }

        // Matches fully contained in this chunk.
        for i in 0..hay.len().saturating_sub(n - 1) {
            if hay[i..i + n] == self.needle[..] {
                out.push(i as i32);
            }
        }

        // Carry the last n-1 stream bytes into the next chunk.
        if n > 1 {
            if hay.len() >= n - 1 {
                self.tail.clear();
                self.tail.extend_from_slice(&hay[hay.len() - (n - 1)..]);
            } else {
                self.tail.extend_from_slice(hay);
                let excess = self.tail.len().saturating_sub(n - 1);
                self.tail.drain(..excess);
            }
        }
        out
    }
}
