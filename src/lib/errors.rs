//! Custom error types for fswap operations.
//!
//! Every error class in the pipeline is unrecoverable at the point of
//! detection: the failing stage reports it, the pipeline unwinds, and the
//! process exits with a class-specific status code.

use thiserror::Error;

/// Result type alias for fswap operations
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Error type for fswap pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid configuration value, caught before any threads start
    #[error("Invalid {parameter}: {reason}")]
    Config {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File open/read/write failure (short reads near EOF are not errors)
    #[error("I/O error while {context} '{path}': {source}")]
    Io {
        /// What the pipeline was doing when the error occurred
        context: &'static str,
        /// Path of the affected file
        path: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Non-zero status from the processing engine; engine state is
    /// presumed corrupt and the run cannot continue
    #[error("Engine returned status {status:#06x} for buffer {index} at offset {offset}")]
    Engine {
        /// Status code reported by the engine
        status: u32,
        /// Sequence number of the failing item
        index: u64,
        /// Byte offset of the failing item in the source file
        offset: u64,
    },

    /// Engine completions arrived out of submission order; this is a
    /// protocol violation, never silently corrected
    #[error("Buffers came back out of order: expected {expected}, got {actual}")]
    OutOfOrder {
        /// The index the completion loop expected next
        expected: u64,
        /// The index the engine actually returned
        actual: u64,
    },

    /// The match count differed from the count requested via --expected
    #[error("Expected {expected} matches but found {actual}")]
    MatchMismatch {
        /// Expected match count
        expected: u64,
        /// Observed match count
        actual: u64,
    },
}

impl PipelineError {
    /// Process exit status for this error class.
    ///
    /// Each class gets a distinguishing non-zero code so scripted callers
    /// can tell configuration mistakes from I/O failures from engine
    /// protocol violations.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config { .. } => 2,
            PipelineError::Io { .. } => 5,
            PipelineError::Engine { .. } => 6,
            PipelineError::MatchMismatch { .. } => 7,
            PipelineError::OutOfOrder { .. } => 32,
        }
    }
}
