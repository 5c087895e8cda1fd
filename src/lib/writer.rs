//! Writer pool: applies completed buffers to the output file.
//!
//! N worker threads pop completed items from the bridge's queue until it
//! reports end-of-stream. Writes are positional, so no ordering is
//! needed across writer threads.
//!
//! Two modes:
//! - **Copy**: write the item's `valid_bytes` (the un-rounded true
//!   length) at the item's file offset.
//! - **Swap**: decode the engine's match-offset list from the result
//!   buffer, count each match, and write the replacement phrase at every
//!   absolute position unless running search-only.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::chunker::WorkItem;
use crate::engine::NO_MORE_MATCHES;
use crate::errors::{PipelineError, Result};
use crate::queue::BoundedQueue;

/// What a writer thread does with each completed item.
#[derive(Debug, Clone)]
pub enum WriteMode {
    /// Write the buffer back at the item's offset.
    Copy,
    /// Interpret the buffer as match offsets and write `replacement` at
    /// each one.
    Swap {
        /// Phrase written over each match.
        replacement: Vec<u8>,
    },
}

/// Writer pool options.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterOptions {
    /// Free items without any I/O (bandwidth measurement).
    pub discard: bool,
    /// Count matches without mutating the output (swap mode only).
    pub search_only: bool,
    /// Truncate the output file before the first write (used when the
    /// output path differs from the input).
    pub truncate: bool,
    /// Print each absolute match offset on stdout.
    pub print_offsets: bool,
}

/// A running pool of writer threads and their shared match counter.
pub struct WriterPool {
    queue: Arc<BoundedQueue<WorkItem>>,
    handles: Vec<JoinHandle<Result<()>>>,
    matches: Arc<AtomicU64>,
}

impl WriterPool {
    /// Create the output file (unless search-only) and spawn `threads`
    /// workers.
    ///
    /// # Errors
    ///
    /// Fails if the output file cannot be created or truncated.
    pub fn start(
        path: &Path,
        mode: WriteMode,
        threads: usize,
        options: WriterOptions,
    ) -> Result<Self> {
        let threads = threads.max(1);

        if !options.search_only {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(options.truncate)
                .open(path)
                .map_err(|source| PipelineError::Io {
                    context: "creating",
                    path: path.display().to_string(),
                    source,
                })?;
        }

        let queue = Arc::new(BoundedQueue::new((threads * 2).next_power_of_two()));
        let matches = Arc::new(AtomicU64::new(0));

        let handles = (0..threads)
            .map(|_| {
                let path = path.to_path_buf();
                let queue = Arc::clone(&queue);
                let matches = Arc::clone(&matches);
                let mode = mode.clone();
                thread::spawn(move || match mode {
                    WriteMode::Copy => copy_worker(&path, &queue, options),
                    WriteMode::Swap { replacement } => {
                        swap_worker(&path, &queue, &replacement, options, &matches)
                    }
                })
            })
            .collect();

        Ok(Self { queue, handles, matches })
    }

    /// The queue the bridge's completion loop pushes into.
    #[must_use]
    pub fn queue(&self) -> Arc<BoundedQueue<WorkItem>> {
        Arc::clone(&self.queue)
    }

    /// Wait for all writers and return the total match count.
    pub fn join(self) -> Result<u64> {
        let mut first_error = None;
        for handle in self.handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => first_error = first_error.or(Some(e)),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(self.matches.load(Ordering::Acquire)),
        }
    }
}

fn copy_worker(path: &Path, queue: &BoundedQueue<WorkItem>, options: WriterOptions) -> Result<()> {
    let file = open_for_write(path, queue)?;
    while let Some(item) = queue.pop() {
        if options.discard {
            continue;
        }
        if let Err(source) = file.write_all_at(&item.buffer[..item.valid_bytes], item.offset) {
            queue.close();
            return Err(PipelineError::Io {
                context: "writing",
                path: path.display().to_string(),
                source,
            });
        }
    }
    Ok(())
}

fn swap_worker(
    path: &Path,
    queue: &BoundedQueue<WorkItem>,
    replacement: &[u8],
    options: WriterOptions,
    matches: &AtomicU64,
) -> Result<()> {
    let file = if options.search_only { None } else { Some(open_for_write(path, queue)?) };

    let mut local_matches = 0u64;
    while let Some(item) = queue.pop() {
        if options.discard {
            continue;
        }
        for rel in match_offsets(&item.buffer[..item.result_bytes]) {
            // Relative offsets can be negative for matches that began in
            // the previous chunk; the absolute position is never
            // negative.
            let absolute = (item.offset as i64 + i64::from(rel)) as u64;
            local_matches += 1;

            if options.print_offsets {
                println!("{absolute:>10}");
            }
            if let Some(file) = &file {
                if let Err(source) = file.write_all_at(replacement, absolute) {
                    matches.fetch_add(local_matches, Ordering::AcqRel);
                    queue.close();
                    return Err(PipelineError::Io {
                        context: "writing",
                        path: path.display().to_string(),
                        source,
                    });
                }
            }
        }
    }

    matches.fetch_add(local_matches, Ordering::AcqRel);
    Ok(())
}

fn open_for_write(path: &Path, queue: &BoundedQueue<WorkItem>) -> Result<File> {
    OpenOptions::new().write(true).open(path).map_err(|source| {
        // Unblock the bridge before surfacing the failure.
        queue.close();
        PipelineError::Io { context: "opening", path: path.display().to_string(), source }
    })
}

/// Decode the engine's result buffer: little-endian `i32` offsets,
/// terminated by the sentinel or the end of the window.
fn match_offsets(result: &[u8]) -> impl Iterator<Item = i32> + '_ {
    result
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .take_while(|&v| v != NO_MORE_MATCHES)
}
