//! End-to-end pipeline assembly.
//!
//! Wires the stages together for one run: chunk plan -> reader pool ->
//! reorder buffer -> engine bridge -> engine session -> writer pool.
//! Each stage owns its threads; this module starts them, feeds the chunk
//! plan, and joins everything in dependency order so a failure in any
//! stage unwinds the rest instead of deadlocking.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;

use crate::bridge::{BridgeOptions, EngineBridge};
use crate::chunker::{Chunker, WorkItem};
use crate::engine::{EngineCompleter, EngineOp, EngineSubmitter, SoftwareEngine};
use crate::errors::{PipelineError, Result};
use crate::logging::{format_bytes, format_transfer_rate};
use crate::queue::BoundedQueue;
use crate::reader::ReaderPool;
use crate::writer::{WriteMode, WriterOptions, WriterPool};

/// What the run does with each chunk.
#[derive(Debug, Clone)]
pub enum PipelineMode {
    /// Stream the input to the output unchanged.
    Copy,
    /// Search for `needle`; overwrite each match with `replacement`
    /// in place unless `search_only`.
    Swap {
        /// Phrase the engine scans for.
        needle: Vec<u8>,
        /// Phrase written over each match.
        replacement: Vec<u8>,
        /// Count matches without modifying the file.
        search_only: bool,
    },
}

/// Full configuration for one pipeline run. Values are assumed
/// pre-validated by the command layer.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source file.
    pub input: PathBuf,
    /// Destination file. Equal to `input` for in-place operation.
    pub output: PathBuf,
    /// Copy or swap.
    pub mode: PipelineMode,
    /// Bytes per chunk; a positive multiple of the engine alignment.
    pub chunk_size: usize,
    /// Optional cap on bytes read from the input.
    pub read_limit: Option<u64>,
    /// Reader worker threads.
    pub read_threads: usize,
    /// Writer worker threads.
    pub write_threads: usize,
    /// Engine completion-queue depth.
    pub queue_depth: usize,
    /// Drop buffers right after reading (read-bandwidth mode; the
    /// engine and writers never run).
    pub read_discard: bool,
    /// Drop buffers right after engine completion instead of writing.
    pub write_discard: bool,
    /// Print each absolute match offset on stdout.
    pub print_offsets: bool,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineReport {
    /// Bytes enqueued for reading (allocation-rounded).
    pub bytes: u64,
    /// Total matches found (zero outside swap mode).
    pub matches: u64,
    /// Wall time for the whole run.
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Log the standard one-line transfer summary.
    pub fn log_summary(&self) {
        info!(
            "Processed {} in {:.2}s ({})",
            format_bytes(self.bytes),
            self.elapsed.as_secs_f64(),
            format_transfer_rate(self.bytes, self.elapsed)
        );
    }
}

/// Run the pipeline against the in-process software engine.
///
/// # Errors
///
/// Returns the first stage failure: configuration, I/O, or an engine
/// protocol violation.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    let needle = match &config.mode {
        PipelineMode::Copy => None,
        PipelineMode::Swap { needle, .. } => Some(needle.as_slice()),
    };
    let (submitter, completer) = SoftwareEngine::start(config.queue_depth, needle)?;
    run_with_engine(config, submitter, completer)
}

/// Run the pipeline against an explicit engine session. Generic so tests
/// can wrap a session to inject engine faults.
///
/// # Errors
///
/// Returns the first stage failure: configuration, I/O, or an engine
/// protocol violation.
pub fn run_with_engine<S, C>(
    config: &PipelineConfig,
    submitter: S,
    completer: C,
) -> Result<PipelineReport>
where
    S: EngineSubmitter + 'static,
    C: EngineCompleter + 'static,
{
    let start = Instant::now();

    // Stat the input and validate the chunk plan before any stage thread
    // exists: a bad configuration must fail with nothing left running.
    let file_size = std::fs::metadata(&config.input)
        .map_err(|source| PipelineError::Io {
            context: "opening",
            path: config.input.display().to_string(),
            source,
        })?
        .len();
    let chunker = Chunker::new(file_size, config.chunk_size, config.read_limit)?;

    // Read-bandwidth mode: no engine, no writers, no ordering.
    if config.read_discard {
        let readers = ReaderPool::start(&config.input, config.read_threads, true);
        let bytes = readers.run(chunker);
        readers.join()?;
        return Ok(PipelineReport { bytes, matches: 0, elapsed: start.elapsed() });
    }

    let (op, write_mode) = match &config.mode {
        PipelineMode::Copy => (EngineOp::Copy, WriteMode::Copy),
        PipelineMode::Swap { replacement, .. } => {
            (EngineOp::Search, WriteMode::Swap { replacement: replacement.clone() })
        }
    };
    let search_only = matches!(&config.mode, PipelineMode::Swap { search_only: true, .. });

    // Engine-bandwidth mode: completions are dropped at the bridge and
    // the writer pool never starts.
    if config.write_discard {
        let readers = ReaderPool::start(&config.input, config.read_threads, false);
        let output: Arc<BoundedQueue<WorkItem>> = Arc::new(BoundedQueue::new(1));
        let bridge = EngineBridge::start(
            readers.reorder(),
            output,
            submitter,
            completer,
            BridgeOptions { op, discard: true },
        );
        let bytes = readers.run(chunker);
        let reader_verdict = readers.join();
        let bridge_verdict = bridge.join();
        reader_verdict?;
        bridge_verdict?;
        return Ok(PipelineReport { bytes, matches: 0, elapsed: start.elapsed() });
    }

    // Writers before readers: WriterPool::start is the last fallible
    // step, so no pool is ever left running behind an early return.
    let writers = WriterPool::start(
        &config.output,
        write_mode,
        config.write_threads,
        WriterOptions {
            discard: false,
            search_only,
            // Only a distinct output file is truncated; in-place runs
            // must keep the existing content.
            truncate: config.output != config.input,
            print_offsets: config.print_offsets,
        },
    )?;

    let readers = ReaderPool::start(&config.input, config.read_threads, false);
    let bridge = EngineBridge::start(
        readers.reorder(),
        writers.queue(),
        submitter,
        completer,
        BridgeOptions { op, discard: false },
    );

    let bytes = readers.run(chunker);

    // Join in dependency order, remembering the first failure. Every
    // stage unblocks its neighbours on error, so all joins terminate.
    let mut first_error: Option<PipelineError> = None;
    if let Err(e) = readers.join() {
        first_error.get_or_insert(e);
    }
    if let Err(e) = bridge.join() {
        first_error.get_or_insert(e);
    }
    let matches = match writers.join() {
        Ok(count) => count,
        Err(e) => {
            first_error.get_or_insert(e);
            0
        }
    };
    if let Some(e) = first_error {
        return Err(e);
    }

    Ok(PipelineReport { bytes, matches, elapsed: start.elapsed() })
}
