//! Reader pool: parallel chunk reads re-serialized through the reorder
//! buffer.
//!
//! N worker threads pop chunk descriptors from a bounded input queue,
//! each positional-reads its span of the source file into a zeroed
//! buffer, and deposits the filled item into the [`ReorderBuffer`] slot
//! for its index. Arrival order across threads is arbitrary; the reorder
//! buffer hands the engine a single strictly-ordered stream.
//!
//! Short reads near end-of-file are normal: the unread tail of the
//! buffer stays zero. Any other read failure is fatal for the run.

use std::fs::File;
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::debug;

use crate::chunker::{Chunker, WorkItem};
use crate::errors::{PipelineError, Result};
use crate::queue::BoundedQueue;
use crate::reorder::ReorderBuffer;

/// A running pool of reader threads plus the queues that feed and drain
/// them.
pub struct ReaderPool {
    input: Arc<BoundedQueue<WorkItem>>,
    reorder: Arc<ReorderBuffer>,
    handles: Vec<JoinHandle<Result<()>>>,
}

impl ReaderPool {
    /// Spawn `threads` reader workers over the file at `path`. Workers
    /// open the file themselves; a missing or unreadable file surfaces
    /// through [`ReaderPool::join`].
    ///
    /// With `discard` set, workers free each buffer right after reading
    /// instead of depositing it downstream (pure read-bandwidth mode).
    #[must_use]
    pub fn start(path: &Path, threads: usize, discard: bool) -> Self {
        let threads = threads.max(1);

        let input = Arc::new(BoundedQueue::new((threads * 2).next_power_of_two()));
        let reorder = Arc::new(ReorderBuffer::new(threads));

        let handles = (0..threads)
            .map(|_| {
                let path = path.to_path_buf();
                let input = Arc::clone(&input);
                let reorder = Arc::clone(&reorder);
                thread::spawn(move || read_worker(&path, &input, &reorder, discard))
            })
            .collect();

        Self { input, reorder, handles }
    }

    /// The reorder buffer the pool deposits into; the bridge withdraws
    /// from it.
    #[must_use]
    pub fn reorder(&self) -> Arc<ReorderBuffer> {
        Arc::clone(&self.reorder)
    }

    /// Feed the chunk plan into the pool and close the input queue.
    ///
    /// Returns the number of bytes enqueued (allocation-rounded, matching
    /// the offsets the chunks advance by). Stops early if the pool shut
    /// the queue down after a failure.
    pub fn run(&self, chunker: Chunker) -> u64 {
        let mut total = 0u64;
        for item in chunker {
            total += item.alloc_bytes as u64;
            if self.input.push(item).is_err() {
                break;
            }
        }
        self.input.close();
        total
    }

    /// Wait for every reader to finish, surfacing the first failure.
    pub fn join(self) -> Result<()> {
        let mut first_error = None;
        for handle in self.handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => first_error = first_error.or(Some(e)),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn read_worker(
    path: &Path,
    input: &BoundedQueue<WorkItem>,
    reorder: &ReorderBuffer,
    discard: bool,
) -> Result<()> {
    let io_err = |context: &'static str, source: std::io::Error| PipelineError::Io {
        context,
        path: path.display().to_string(),
        source,
    };

    let file = match File::open(path) {
        Ok(f) => f,
        Err(source) => {
            abort_stage(input, reorder);
            return Err(io_err("opening", source));
        }
    };

    while let Some(mut item) = input.pop() {
        item.buffer = vec![0u8; item.alloc_bytes];
        match read_full_at(&file, &mut item.buffer[..item.valid_bytes], item.offset) {
            // Short read at EOF: the zeroed tail stands.
            Ok(_) => {}
            Err(source) => {
                abort_stage(input, reorder);
                return Err(io_err("reading", source));
            }
        }

        debug!("read buffer {} for offset {}", item.index, item.offset);

        if discard {
            continue;
        }
        if reorder.deposit(item).is_err() {
            // Another stage failed and shut the buffer down; bail quietly.
            input.close();
            return Ok(());
        }
    }
    Ok(())
}

/// Unwedge both neighbours of a failing reader: the chunker blocked on a
/// full input queue and the bridge blocked on the reorder buffer.
fn abort_stage(input: &BoundedQueue<WorkItem>, reorder: &ReorderBuffer) {
    input.close();
    reorder.shutdown();
}

/// Positional read that retries partial reads until EOF or `buf` is
/// full. Returns the number of bytes actually read.
fn read_full_at(file: &File, buf: &mut [u8], mut offset: u64) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read_at(&mut buf[filled..], offset) {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                offset += n as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
