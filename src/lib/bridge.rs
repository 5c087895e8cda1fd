//! Engine bridge: the two single-purpose threads that drive the engine
//! session.
//!
//! The submission loop withdraws items from the reorder buffer (already
//! in strict index order) and pushes them into the engine, stopping after
//! the item marked last. The completion loop pops results one at a time,
//! enforces the order-of-return contract, and forwards dirty items to the
//! writer queue.
//!
//! A completion arriving out of order is a protocol violation — engine
//! corruption or a driver bug — and fails the run rather than being
//! silently reassembled. Likewise any non-zero engine status: engine
//! state after an error is undefined, so there is no partial recovery.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::debug;

use crate::chunker::WorkItem;
use crate::engine::{EngineCompleter, EngineOp, EngineRequest, EngineSubmitter};
use crate::errors::{PipelineError, Result};
use crate::queue::BoundedQueue;
use crate::reorder::ReorderBuffer;

/// Options for the completion side of the bridge.
#[derive(Debug, Clone, Copy)]
pub struct BridgeOptions {
    /// Transform requested for every submission.
    pub op: EngineOp,
    /// Free completed items instead of forwarding them to writers.
    pub discard: bool,
}

/// Handle to the two running bridge threads.
pub struct EngineBridge {
    submit_handle: JoinHandle<()>,
    complete_handle: JoinHandle<Result<()>>,
}

impl EngineBridge {
    /// Start the submission and completion threads over an engine
    /// session.
    pub fn start<S, C>(
        reorder: Arc<ReorderBuffer>,
        output: Arc<BoundedQueue<WorkItem>>,
        submitter: S,
        completer: C,
        options: BridgeOptions,
    ) -> Self
    where
        S: EngineSubmitter + 'static,
        C: EngineCompleter + 'static,
    {
        let submit_handle = {
            let reorder = Arc::clone(&reorder);
            thread::spawn(move || submission_loop(&reorder, submitter, options.op))
        };
        let complete_handle =
            thread::spawn(move || completion_loop(completer, &output, options.discard));
        Self { submit_handle, complete_handle }
    }

    /// Wait for both loops; surfaces the completion loop's verdict.
    pub fn join(self) -> Result<()> {
        match self.submit_handle.join() {
            Ok(()) => {}
            Err(panic) => std::panic::resume_unwind(panic),
        }
        match self.complete_handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Push ordered items into the engine until the last one is in flight.
fn submission_loop<S: EngineSubmitter>(reorder: &ReorderBuffer, mut submitter: S, op: EngineOp) {
    loop {
        // `None` means an upstream stage failed and shut the buffer
        // down; dropping the submitter lets the completion side drain
        // out. The failing stage reports the cause.
        let Some(item) = reorder.withdraw() else {
            return;
        };
        let is_last = item.is_last;
        debug!("submit buffer {} for offset {}", item.index, item.offset);

        if submitter.submit(EngineRequest { item, op }).is_err() {
            // Completion side is gone; unwedge the readers and stop.
            reorder.shutdown();
            return;
        }
        if is_last {
            return;
        }
    }
}

/// Pop completions in order, forward dirty items, close the writer queue
/// after the last one.
fn completion_loop<C: EngineCompleter>(
    mut completer: C,
    output: &BoundedQueue<WorkItem>,
    discard: bool,
) -> Result<()> {
    let mut next_index = 0u64;
    loop {
        let Some(completion) = completer.await_completion() else {
            // Submission aborted before the last item; whoever aborted
            // reports the cause. End the stream for the writers.
            output.close();
            return Ok(());
        };
        let mut item = completion.item;

        if completion.status != 0 {
            output.close();
            return Err(PipelineError::Engine {
                status: completion.status,
                index: item.index,
                offset: item.offset,
            });
        }
        if item.index != next_index {
            output.close();
            return Err(PipelineError::OutOfOrder { expected: next_index, actual: item.index });
        }
        next_index += 1;
        item.result_bytes = completion.result_bytes;

        debug!(
            "completed buffer {} for offset {} (dirty: {})",
            item.index, item.offset, completion.dirty
        );

        let is_last = item.is_last;
        if discard || !completion.dirty {
            drop(item);
        } else if output.push(item).is_err() {
            // Writers bailed; keep draining so the submitter never
            // wedges on a full engine queue.
        }
        if is_last {
            output.close();
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineClosed, EngineCompletion, SoftwareEngine};

    fn item(index: u64, buffer: Vec<u8>, is_last: bool) -> WorkItem {
        WorkItem {
            index,
            offset: index * 128,
            alloc_bytes: buffer.len(),
            valid_bytes: buffer.len(),
            result_bytes: 0,
            is_last,
            buffer,
        }
    }

    fn run_bridge<C: EngineCompleter + 'static>(
        items: Vec<WorkItem>,
        completer_of: impl FnOnce(crate::engine::software::SoftwareCompleter) -> C,
    ) -> (Result<()>, Vec<WorkItem>) {
        let reorder = Arc::new(ReorderBuffer::new(2));
        let output = Arc::new(BoundedQueue::new(8));
        let (submitter, completer) = SoftwareEngine::start(4, None).unwrap();

        let bridge = EngineBridge::start(
            Arc::clone(&reorder),
            Arc::clone(&output),
            submitter,
            completer_of(completer),
            BridgeOptions { op: EngineOp::Copy, discard: false },
        );
        for it in items {
            reorder.deposit(it).unwrap();
        }

        let mut forwarded = Vec::new();
        while let Some(it) = output.pop() {
            forwarded.push(it);
        }
        (bridge.join(), forwarded)
    }

    #[test]
    fn test_forwards_items_and_closes_after_last() {
        let items: Vec<_> = (0..4).map(|i| item(i, vec![i as u8; 128], i == 3)).collect();
        let (result, forwarded) = run_bridge(items, |c| c);
        result.unwrap();
        assert_eq!(forwarded.len(), 4);
        for (i, it) in forwarded.iter().enumerate() {
            assert_eq!(it.index, i as u64);
            assert_eq!(it.result_bytes, 128);
        }
    }

    /// Completer wrapper that corrupts or fails completions for fault
    /// injection.
    struct Tamper<F> {
        inner: crate::engine::software::SoftwareCompleter,
        tamper: F,
    }

    impl<F: FnMut(&mut EngineCompletion) + Send> EngineCompleter for Tamper<F> {
        fn await_completion(&mut self) -> Option<EngineCompletion> {
            let mut completion = self.inner.await_completion()?;
            (self.tamper)(&mut completion);
            Some(completion)
        }
    }

    #[test]
    fn test_engine_status_is_fatal() {
        let items: Vec<_> = (0..4).map(|i| item(i, vec![0u8; 128], i == 3)).collect();
        let (result, forwarded) = run_bridge(items, |inner| Tamper {
            inner,
            tamper: |c: &mut EngineCompletion| {
                if c.item.index == 2 {
                    c.status = 0x1f;
                }
            },
        });
        assert!(matches!(result, Err(PipelineError::Engine { status: 0x1f, index: 2, .. })));
        // Items before the failure were already forwarded; nothing after.
        assert_eq!(forwarded.len(), 2);
    }

    #[test]
    fn test_out_of_order_completion_is_fatal() {
        let items: Vec<_> = (0..4).map(|i| item(i, vec![0u8; 128], i == 3)).collect();
        let (result, _) = run_bridge(items, |inner| Tamper {
            inner,
            tamper: |c: &mut EngineCompletion| {
                if c.item.index == 1 {
                    c.item.index = 5;
                }
            },
        });
        assert!(matches!(result, Err(PipelineError::OutOfOrder { expected: 1, actual: 5 })));
    }

    #[test]
    fn test_discard_forwards_nothing() {
        let reorder = Arc::new(ReorderBuffer::new(2));
        let output = Arc::new(BoundedQueue::new(8));
        let (submitter, completer) = SoftwareEngine::start(4, None).unwrap();
        let bridge = EngineBridge::start(
            Arc::clone(&reorder),
            Arc::clone(&output),
            submitter,
            completer,
            BridgeOptions { op: EngineOp::Copy, discard: true },
        );
        for i in 0..4 {
            reorder.deposit(item(i, vec![0u8; 128], i == 3)).unwrap();
        }
        assert!(output.pop().is_none());
        bridge.join().unwrap();
    }

    #[test]
    fn test_reorder_shutdown_ends_stream_cleanly() {
        let reorder = Arc::new(ReorderBuffer::new(2));
        let output = Arc::new(BoundedQueue::new(8));
        let (submitter, completer) = SoftwareEngine::start(4, None).unwrap();
        let bridge = EngineBridge::start(
            Arc::clone(&reorder),
            Arc::clone(&output),
            submitter,
            completer,
            BridgeOptions { op: EngineOp::Copy, discard: false },
        );
        reorder.deposit(item(0, vec![0u8; 128], false)).unwrap();
        reorder.shutdown();

        // The forwarded prefix drains, then end-of-stream.
        let first = output.pop();
        assert!(first.is_none() || first.unwrap().index == 0);
        assert!(output.pop().is_none());
        bridge.join().unwrap();
    }
}
