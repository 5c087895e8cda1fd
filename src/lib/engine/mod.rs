//! Processing-engine session interface.
//!
//! The pipeline treats the engine as an opaque, order-preserving
//! asynchronous transform service: buffers go in through a single
//! submission path and come back, in submission order, through a single
//! completion path. A session is an explicit object created per run and
//! split into two `Send` halves so the bridge can drive submission and
//! completion from dedicated threads.
//!
//! The only in-tree implementation is the software emulation in
//! [`software`]; the traits are the seam where a hardware-backed session
//! would plug in.

pub mod software;

pub use software::SoftwareEngine;

use crate::chunker::WorkItem;

/// Sentinel in a search-result buffer marking "no more matches" within
/// the `result_bytes` window.
pub const NO_MORE_MATCHES: i32 = i32::MAX;

/// Transform the engine applies to a submitted buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOp {
    /// Pass the buffer through unchanged; always marked dirty so every
    /// chunk is written back.
    Copy,
    /// Scan for the session's needle; the result buffer is a
    /// sentinel-terminated list of little-endian `i32` offsets relative
    /// to the chunk start (negative when a match began in the previous
    /// chunk).
    Search,
    /// Overwrite the buffer with generated pseudo-random content.
    Fill,
}

/// One buffer handed to the engine. The work item rides along as the
/// opaque back-reference the completion path recovers it from.
#[derive(Debug)]
pub struct EngineRequest {
    /// The item whose buffer is to be transformed; `item.is_last` marks
    /// the final submission so the engine can signal end-of-stream.
    pub item: WorkItem,
    /// Transform to apply.
    pub op: EngineOp,
}

/// One completed buffer popped from the engine.
#[derive(Debug)]
pub struct EngineCompletion {
    /// The submitted item, its buffer now holding the engine output.
    pub item: WorkItem,
    /// Length of the output; the bridge records this on the item.
    pub result_bytes: usize,
    /// Whether the output changed and must be written back.
    pub dirty: bool,
    /// Engine status; non-zero is fatal for the whole run.
    pub status: u32,
}

/// Returned by [`EngineSubmitter::submit`] when the session has shut
/// down (the completion half is gone). Carries no detail: the cause is
/// reported by whichever stage tore the session down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineClosed;

/// Submission half of an engine session. Single-threaded use.
pub trait EngineSubmitter: Send {
    /// Submit one buffer, blocking while the engine's bounded queue is
    /// full.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineClosed`] if the completion half has been
    /// dropped.
    fn submit(&mut self, request: EngineRequest) -> Result<(), EngineClosed>;
}

/// Completion half of an engine session. Single-threaded use.
pub trait EngineCompleter: Send {
    /// Pop the next completion in submission order, blocking until one
    /// is available. Returns `None` once the submission half is gone and
    /// all queued completions have been drained.
    fn await_completion(&mut self) -> Option<EngineCompletion>;
}
