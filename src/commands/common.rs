//! Shared CLI options and parsers for fswap commands.

use clap::Args;

use fswap_lib::validation::{parse_size, validate_chunk_size};

/// Transfer tuning options shared by every command that runs the
/// pipeline.
#[derive(Debug, Clone, Args)]
pub struct TransferOptions {
    /// Chunk size in bytes; a multiple of 128. Accepts K/M/G suffixes.
    #[arg(
        short = 'b',
        long = "chunk-size",
        default_value = "8192",
        value_parser = parse_chunk_size_arg
    )]
    pub chunk_size: usize,

    /// Stop after reading this many bytes. Accepts K/M/G suffixes.
    #[arg(short = 'l', long = "limit", value_parser = parse_size_arg)]
    pub limit: Option<u64>,

    /// Number of reader threads.
    #[arg(short = 'R', long = "read-threads", default_value_t = 4)]
    pub read_threads: usize,

    /// Number of writer threads.
    #[arg(short = 'W', long = "write-threads", default_value_t = 4)]
    pub write_threads: usize,

    /// Engine completion-queue depth.
    #[arg(short = 'q', long = "queue-depth", default_value_t = 8)]
    pub queue_depth: usize,

    /// Measure read bandwidth only: discard buffers right after reading.
    #[arg(long = "read-discard")]
    pub read_discard: bool,

    /// Measure engine bandwidth only: discard buffers after completion
    /// instead of writing them.
    #[arg(long = "write-discard", conflicts_with = "read_discard")]
    pub write_discard: bool,
}

/// Parse and validate a chunk-size argument.
fn parse_chunk_size_arg(value: &str) -> Result<usize, String> {
    let bytes = parse_size(value, "chunk-size").map_err(|e| e.to_string())?;
    let bytes = usize::try_from(bytes).map_err(|_| "chunk-size too large".to_string())?;
    validate_chunk_size(bytes, "chunk-size").map_err(|e| e.to_string())
}

/// Parse a byte-count argument with K/M/G suffixes.
fn parse_size_arg(value: &str) -> Result<u64, String> {
    parse_size(value, "limit").map_err(|e| e.to_string())
}
