//! This crate implements an external merge sort for text files of numbered
//! records, that is lines of the form `<sequence-number>. <text>`.
//!
//! Files much larger than available memory are sorted by streaming the input
//! into bounded in-memory chunks, sorting the chunks on a pool of worker
//! threads and spilling each to a temporary run file, then repeatedly k-way
//! merging runs on a second pool until a single sorted file remains. Records
//! are ordered by text, case-insensitively, with the sequence number as the
//! tiebreak; by default records with equal text are reduced to a single
//! representative.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use record_file_sort::sort::Sort;
//!
//! // parallel external record sort
//! fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut record_sort = Sort::new(input, output);
//!
//!     // set the number of CPU cores the sort will attempt to use. The
//!     // default is to use all available cores.
//!     record_sort.with_tasks(2);
//!
//!     // set the directory for intermediate run files. The default is the
//!     // system temp dir - std::env::temp_dir(), however, for large files it
//!     // is recommended to provide a dedicated directory for intermediate
//!     // files, preferably on the same file system as the output result.
//!     record_sort.with_tmp_dir(tmp);
//!
//!     record_sort.sort()
//! }
//! ```

pub(crate) mod chunk;
pub(crate) mod config;
pub(crate) mod merge_ledger;
pub(crate) mod merge_queue;
pub(crate) mod merger;
pub(crate) mod pipeline;
pub(crate) mod reader;
pub(crate) mod record_reader;
pub(crate) mod record_writer;
pub(crate) mod run_file;
pub(crate) mod sorter;
pub(crate) mod throttle;

pub mod format_error;
pub mod generate;
pub mod record;
pub mod sort;
