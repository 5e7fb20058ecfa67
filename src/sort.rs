use std::cmp::max;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context};
use rlimit::{getrlimit, setrlimit, Resource};

use crate::config::Config;
use crate::merge_ledger::MergePolicy;
use crate::pipeline::Pipeline;
use crate::record::Record;
use crate::record_reader::RecordReader;
use crate::{merger, reader, sorter};

const DEFAULT_CHUNK_CAPACITY: usize = 1_000_000;
const DEFAULT_MERGE_FAN_IN: usize = 8;
const DEFAULT_MERGE_TASKS: usize = 2;
const MAX_MERGE_GENERATION: usize = 5;
const MAX_FILLED_CHUNKS: usize = 8;
const INTERMEDIATE_FILES: usize = 1024;

/// Sort a file of `<sequence-number>. <text>` records
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use record_file_sort::sort::Sort;
///
/// // parallel external record sort
/// fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut record_sort = Sort::new(input, output);
///     // set the number of CPU cores the sort will attempt to use. The
///     // default is to use all available cores.
///     record_sort.with_tasks(2);
///     // set the directory for intermediate runs. The default is the system
///     // temp dir - std::env::temp_dir(), however, for large files it is
///     // recommended to provide a dedicated directory on the same file
///     // system as the output result.
///     record_sort.with_tmp_dir(tmp);
///     record_sort.sort()
/// }
/// ```
pub struct Sort {
    source: PathBuf,
    target: PathBuf,
    tmp: PathBuf,
    tasks: usize,
    merge_tasks: usize,
    chunk_capacity: usize,
    merge_fan_in: usize,
    unique: bool,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// A default Sort definition will use the system temporary directory as
    /// defined by std::env::temp_dir() for its scratch space.
    /// * records are ordered by text, case-insensitively, then by sequence
    ///   number
    /// * records whose text compares equal keep a single representative; see
    ///   [Sort::with_unique]
    /// * input is read in chunks of 1,000,000 records
    /// * up to 8 run files of the same generation merge in one pass
    /// * worker counts default to the available CPU cores
    pub fn new(source: PathBuf, target: PathBuf) -> Sort {
        Sort {
            source,
            target,
            tmp: std::env::temp_dir(),
            tasks: 0,
            merge_tasks: 0,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            merge_fan_in: DEFAULT_MERGE_FAN_IN,
            unique: true,
        }
    }

    /// Set directory for intermediate run files. By default use
    /// std::env::temp_dir(). It is recommended for large files to create a
    /// dedicated directory on the same file system as the output target.
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the number of tasks. The default is zero which will result in
    /// using all system cores. Three of the tasks are taken by the reader
    /// and the merge workers; the rest sort chunks, with a minimum of two
    /// sort workers.
    pub fn with_tasks(&mut self, tasks: usize) {
        self.tasks = tasks;
    }

    /// Set the number of merge workers. The default is 2.
    pub fn with_merge_tasks(&mut self, merge_tasks: usize) {
        self.merge_tasks = merge_tasks;
    }

    /// Set the number of records read into memory per chunk. Bounds memory
    /// use together with the fixed limit on filled chunks in flight.
    pub fn with_chunk_capacity(&mut self, chunk_capacity: usize) {
        self.chunk_capacity = chunk_capacity;
    }

    /// Set how many run files of one generation merge in a single pass.
    pub fn with_merge_fan_in(&mut self, merge_fan_in: usize) {
        self.merge_fan_in = merge_fan_in;
    }

    /// Keep a single representative per case-insensitive text. The survivor
    /// is the record with the smallest sequence number of its class. The
    /// default is true; pass false to preserve every input record.
    pub fn with_unique(&mut self, unique: bool) {
        self.unique = unique;
    }

    /// Sort the source file into the target file.
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        let config = self.create_config()?;
        let (current_soft, current_hard) = Self::get_rlimits()?;
        log::info!("Current rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        let new_soft = max((config.files() + 256) as u64, current_soft);
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        Self::set_rlimits(new_soft, current_hard)?;
        let result = Self::internal_sort(&config);
        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        Self::set_rlimits(current_soft, current_hard)?;
        result
    }

    /// Verify that the source file is already sorted by the record order.
    /// Reads the file as a stream; a malformed record is an error, not a
    /// false.
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        let mut reader = RecordReader::open(&self.source)?;
        let mut previous: Option<Record> = None;
        while let Some(current) = reader.read_record()? {
            if let Some(previous_record) = &previous {
                if previous_record > &current {
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        Ok(true)
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }

    fn create_config(&self) -> Result<Config, anyhow::Error> {
        if self.chunk_capacity == 0 {
            return Err(anyhow!("chunk capacity must be greater than zero"));
        }
        if self.merge_fan_in < 2 {
            return Err(anyhow!("merge fan-in must be at least 2"));
        }

        let mut tasks = self.tasks;
        if tasks == 0 {
            tasks = num_cpus::get();
        }
        let mut merge_tasks = self.merge_tasks;
        if merge_tasks == 0 {
            merge_tasks = DEFAULT_MERGE_TASKS;
        }
        // one task reads, the rest sort, never fewer than two sorters
        let sort_tasks = max(2, tasks.saturating_sub(merge_tasks + 1));
        let files = max(INTERMEDIATE_FILES, (sort_tasks + merge_tasks) * 2);

        Ok(
            Config::new(
                self.source.clone(),
                self.target.clone(),
                self.tmp.clone(),
                "run-".to_string(),
                ".txt".to_string(),
                sort_tasks,
                merge_tasks,
                self.chunk_capacity,
                MAX_FILLED_CHUNKS,
                MergePolicy {
                    fan_in: self.merge_fan_in,
                    max_generation: MAX_MERGE_GENERATION,
                },
                self.unique,
                files,
            )
        )
    }

    fn internal_sort(config: &Config) -> Result<(), anyhow::Error> {
        log::info!("Start external sort");
        let scratch = tempfile::Builder::new()
            .prefix("record-sort-")
            .tempdir_in(config.tmp())
            .with_context(|| format!("tmp dir: {}", config.tmp().display()))?;
        let pipeline = Arc::new(Pipeline::new(config.clone(), scratch.path().to_path_buf()));

        let mut first_error: Option<anyhow::Error> = None;

        let merger_handles =
            Self::spawn_workers("merger", config.merge_tasks(), &pipeline, merger::run)
                .unwrap_or_else(|e| {
                    pipeline.fail();
                    Self::note_error(&mut first_error, Err(e));
                    Vec::new()
                });
        let sorter_handles =
            Self::spawn_workers("sorter", config.sort_tasks(), &pipeline, sorter::run)
                .unwrap_or_else(|e| {
                    pipeline.fail();
                    Self::note_error(&mut first_error, Err(e));
                    Vec::new()
                });

        Self::note_error(&mut first_error, reader::run(&pipeline));

        Self::join_workers(sorter_handles, &mut first_error);
        pipeline.set_sort_complete();
        log::info!("Read and sort phases complete");
        Self::join_workers(merger_handles, &mut first_error);

        // the scratch directory guard removes the run files on every path
        drop(scratch);
        match first_error {
            Some(e) => Err(e),
            None => {
                log::info!("Finish external sort");
                Ok(())
            }
        }
    }

    fn spawn_workers(
        name: &str,
        count: usize,
        pipeline: &Arc<Pipeline>,
        work: fn(&Pipeline) -> Result<(), anyhow::Error>,
    ) -> Result<Vec<JoinHandle<Result<(), anyhow::Error>>>, anyhow::Error> {
        let mut handles = Vec::with_capacity(count);
        for i in 0..count {
            let pipeline = Arc::clone(pipeline);
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, i))
                .spawn(move || work(&pipeline))
                .with_context(|| format!("spawn {} worker {}", name, i))?;
            handles.push(handle);
        }
        Ok(handles)
    }

    fn join_workers(
        handles: Vec<JoinHandle<Result<(), anyhow::Error>>>,
        first_error: &mut Option<anyhow::Error>,
    ) {
        for handle in handles {
            match handle.join() {
                Ok(result) => Self::note_error(first_error, result),
                Err(_) => Self::note_error(first_error, Err(anyhow!("worker thread panicked"))),
            }
        }
    }

    fn note_error(first_error: &mut Option<anyhow::Error>, result: Result<(), anyhow::Error>) {
        if let Err(e) = result {
            if first_error.is_none() {
                *first_error = Some(e);
            }
        }
    }
}
