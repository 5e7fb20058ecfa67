use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tempfile::Builder;

use crate::chunk::Chunk;
use crate::config::Config;
use crate::merge_ledger::MergeLedger;
use crate::throttle::Throttle;

/// Shared state of one sort run: the chunk pools, the throttle, the merge
/// ledger and the completion latches.
///
/// The latches are one-shot and monotonic. The reader sets `read_complete`
/// on every exit; the orchestrator sets `sort_complete` only after joining
/// every sorter thread; any stage sets `failed` on its first error, which
/// drains the other pools without letting them produce the target file.
pub(crate) struct Pipeline {
    config: Config,
    scratch_dir: PathBuf,
    free_tx: Sender<Chunk>,
    free_rx: Receiver<Chunk>,
    filled_tx: Sender<Chunk>,
    filled_rx: Receiver<Chunk>,
    throttle: Throttle,
    ledger: Mutex<MergeLedger>,
    read_complete: AtomicBool,
    sort_complete: AtomicBool,
    failed: AtomicBool,
}

impl Pipeline {
    pub(crate) fn new(config: Config, scratch_dir: PathBuf) -> Pipeline {
        let (free_tx, free_rx) = unbounded();
        let (filled_tx, filled_rx) = unbounded();
        let throttle = Throttle::new(config.max_filled_chunks());
        let ledger = Mutex::new(MergeLedger::new(config.merge_policy()));
        Pipeline {
            config,
            scratch_dir,
            free_tx,
            free_rx,
            filled_tx,
            filled_rx,
            throttle,
            ledger,
            read_complete: AtomicBool::new(false),
            sort_complete: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn target(&self) -> &Path {
        self.config.target()
    }

    /// Pop a recycled chunk, or allocate a fresh one when the free pool is
    /// momentarily empty. Never blocks; the throttle is what bounds the
    /// total number of chunks.
    pub(crate) fn free_chunk(&self) -> Chunk {
        match self.free_rx.try_recv() {
            Ok(chunk) => chunk,
            Err(_) => Chunk::with_capacity(self.config.chunk_capacity()),
        }
    }

    pub(crate) fn recycle_chunk(&self, mut chunk: Chunk) {
        chunk.clear();
        let _ = self.free_tx.send(chunk);
    }

    pub(crate) fn publish_filled(&self, chunk: Chunk) {
        let _ = self.filled_tx.send(chunk);
    }

    pub(crate) fn try_take_filled(&self) -> Option<Chunk> {
        self.filled_rx.try_recv().ok()
    }

    pub(crate) fn filled_is_empty(&self) -> bool {
        self.filled_rx.is_empty()
    }

    pub(crate) fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub(crate) fn lock_ledger(&self) -> MutexGuard<'_, MergeLedger> {
        self.ledger.lock().unwrap()
    }

    /// Create an empty run file in the scratch directory and persist it past
    /// the creation guard; the caller owns the path from here on.
    pub(crate) fn new_run_file(&self) -> Result<PathBuf, anyhow::Error> {
        let tmp_file = Builder::new()
            .prefix(self.config.tmp_prefix())
            .suffix(self.config.tmp_suffix())
            .tempfile_in(&self.scratch_dir)
            .or_else(|e| Err(anyhow!("Failed to create new run file: {}", e.to_string())))?;
        let (_file, path) = tmp_file
            .keep()
            .or_else(|e| Err(anyhow!("Failed to persist run file: {}", e.to_string())))?;
        Ok(path)
    }

    pub(crate) fn set_read_complete(&self) {
        self.read_complete.store(true, Ordering::SeqCst);
    }

    pub(crate) fn read_complete(&self) -> bool {
        self.read_complete.load(Ordering::SeqCst)
    }

    pub(crate) fn set_sort_complete(&self) {
        self.sort_complete.store(true, Ordering::SeqCst);
    }

    pub(crate) fn sort_complete(&self) -> bool {
        self.sort_complete.load(Ordering::SeqCst)
    }

    pub(crate) fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}
