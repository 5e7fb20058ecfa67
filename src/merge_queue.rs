use std::collections::VecDeque;
use std::path::PathBuf;

/// Generation-bucketed registry of run files awaiting merge.
///
/// Generation 0 holds freshly spilled chunks; merging a generation-g batch
/// produces a generation g+1 file. Buckets are FIFO, so a batch always takes
/// the oldest entries of the chosen generation.
pub(crate) struct MergeQueue {
    buckets: Vec<VecDeque<PathBuf>>,
    len: usize,
}

impl MergeQueue {
    pub(crate) fn new() -> MergeQueue {
        MergeQueue {
            buckets: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn enqueue(&mut self, generation: usize, path: PathBuf) {
        while self.buckets.len() <= generation {
            self.buckets.push(VecDeque::new());
        }
        self.buckets[generation].push_back(path);
        self.len += 1;
    }

    /// Take exactly `required` oldest entries from the lowest generation
    /// below `max_generation` that holds at least that many, tagged with the
    /// bucket generation. Preferring narrow merges of old material over deep
    /// generation chains bounds merge fan-in and file count growth.
    pub(crate) fn dequeue_batch(
        &mut self,
        required: usize,
        max_generation: usize,
    ) -> Option<(usize, Vec<PathBuf>)> {
        for generation in 0..self.buckets.len().min(max_generation) {
            if self.buckets[generation].len() >= required {
                let files = self.buckets[generation].drain(..required).collect();
                self.len -= required;
                return Some((generation, files));
            }
        }
        None
    }

    /// Empty every bucket, oldest generations first. Used only for the
    /// unconditional last pass.
    pub(crate) fn drain_all(&mut self) -> Vec<PathBuf> {
        let mut files = Vec::with_capacity(self.len);
        for bucket in &mut self.buckets {
            files.extend(bucket.drain(..));
        }
        self.len = 0;
        files
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::merge_queue::MergeQueue;

    fn path(name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    #[test]
    fn test_lowest_generation_preferred() {
        let mut queue = MergeQueue::new();
        queue.enqueue(1, path("b0"));
        queue.enqueue(1, path("b1"));
        queue.enqueue(0, path("a0"));
        queue.enqueue(0, path("a1"));

        let (generation, files) = queue.dequeue_batch(2, 5).unwrap();
        assert_eq!(generation, 0);
        assert_eq!(files, vec![path("a0"), path("a1")]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_fifo_within_bucket() {
        let mut queue = MergeQueue::new();
        queue.enqueue(0, path("first"));
        queue.enqueue(0, path("second"));
        queue.enqueue(0, path("third"));

        let (_, files) = queue.dequeue_batch(2, 5).unwrap();
        assert_eq!(files, vec![path("first"), path("second")]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_count_threshold_is_strict() {
        let mut queue = MergeQueue::new();
        queue.enqueue(0, path("only"));
        queue.enqueue(1, path("other"));
        assert!(queue.dequeue_batch(2, 5).is_none());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_max_generation_excluded() {
        let mut queue = MergeQueue::new();
        queue.enqueue(2, path("deep0"));
        queue.enqueue(2, path("deep1"));
        assert!(queue.dequeue_batch(2, 2).is_none());
        assert!(queue.dequeue_batch(2, 3).is_some());
    }

    #[test]
    fn test_drain_all() {
        let mut queue = MergeQueue::new();
        queue.enqueue(1, path("old"));
        queue.enqueue(0, path("new"));
        let files = queue.drain_all();
        assert_eq!(files, vec![path("new"), path("old")]);
        assert!(queue.is_empty());
        assert!(queue.drain_all().is_empty());
    }
}
