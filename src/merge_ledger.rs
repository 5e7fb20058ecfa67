use std::path::PathBuf;

use crate::merge_queue::MergeQueue;

/// Batch selection constants for the merger pool.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MergePolicy {
    pub(crate) fan_in: usize,
    pub(crate) max_generation: usize,
}

/// Outcome of one claim attempt by a merger worker.
pub(crate) enum Claim {
    /// Nothing is left and nothing is in flight; the worker can exit.
    Exhausted,
    /// The entire remaining queue; the result goes to the target path.
    Terminal(Vec<PathBuf>),
    /// A policy batch; the result re-enters the queue at `generation + 1`.
    Batch {
        generation: usize,
        files: Vec<PathBuf>,
    },
    /// Nothing claimable right now, try again shortly.
    Retry,
}

/// The merge queue and the in-flight batch counter as one state object.
///
/// Terminal-merge detection must observe both together: claiming the final
/// batch while another worker's batch is still in flight, or while sorters
/// may still enqueue generation-0 runs, would let two workers both believe
/// they hold the last merge. Callers therefore only get these compound
/// operations, executed under a single lock held by the pipeline.
pub(crate) struct MergeLedger {
    queue: MergeQueue,
    in_flight: usize,
    policy: MergePolicy,
}

impl MergeLedger {
    pub(crate) fn new(policy: MergePolicy) -> MergeLedger {
        MergeLedger {
            queue: MergeQueue::new(),
            in_flight: 0,
            policy,
        }
    }

    pub(crate) fn enqueue_run(&mut self, generation: usize, path: PathBuf) {
        self.queue.enqueue(generation, path);
    }

    /// Attempt to claim work. `sort_complete` must be the current value of
    /// the pipeline latch; only when it is set can the queue stop growing,
    /// which is what makes the terminal and exhausted verdicts safe.
    pub(crate) fn try_claim(&mut self, sort_complete: bool) -> Claim {
        if sort_complete && self.in_flight == 0 {
            if self.queue.is_empty() {
                return Claim::Exhausted;
            }
            return Claim::Terminal(self.queue.drain_all());
        }
        match self
            .queue
            .dequeue_batch(self.policy.fan_in, self.policy.max_generation)
        {
            Some((generation, files)) => {
                self.in_flight += files.len();
                Claim::Batch { generation, files }
            }
            None => Claim::Retry,
        }
    }

    /// Account a finished non-terminal batch: its result enters the queue at
    /// `next_generation` and its sources leave the in-flight count in the
    /// same step.
    pub(crate) fn finish_batch(&mut self, consumed: usize, next_generation: usize, path: PathBuf) {
        self.queue.enqueue(next_generation, path);
        self.in_flight -= consumed;
    }
}
