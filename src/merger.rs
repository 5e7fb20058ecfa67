use std::collections::BinaryHeap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::merge_ledger::Claim;
use crate::pipeline::Pipeline;
use crate::record::compare_text;
use crate::record_writer::RecordWriter;
use crate::run_file::RunFile;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Merger worker: claims batches of run files from the ledger and k-way
/// merges each into a next-generation run, until it performs the merge it
/// can prove to be the last one, whose result becomes the target file.
pub(crate) fn run(pipeline: &Pipeline) -> Result<(), anyhow::Error> {
    let result = merge_claimed_batches(pipeline);
    if result.is_err() {
        pipeline.fail();
    }
    result
}

fn merge_claimed_batches(pipeline: &Pipeline) -> Result<(), anyhow::Error> {
    loop {
        if pipeline.failed() {
            return Ok(());
        }
        let claim = pipeline.lock_ledger().try_claim(pipeline.sort_complete());
        match claim {
            Claim::Exhausted => {
                return Ok(());
            }
            Claim::Retry => {
                thread::sleep(POLL_INTERVAL);
            }
            Claim::Terminal(files) => {
                log::info!(
                    "Last merge, {} run files, thread: {}",
                    files.len(),
                    thread::current().name().unwrap_or("unnamed")
                );
                terminal_merge(pipeline, files)?;
                return Ok(());
            }
            Claim::Batch { generation, files } => {
                let consumed = files.len();
                let destination = pipeline.new_run_file()?;
                merge_into(pipeline, files, &destination)?;
                pipeline
                    .lock_ledger()
                    .finish_batch(consumed, generation + 1, destination);
            }
        }
    }
}

/// The last merge writes into the scratch directory first and is renamed
/// into the target only once it fully succeeded, so a failure never leaves a
/// partial target behind.
fn terminal_merge(pipeline: &Pipeline, files: Vec<PathBuf>) -> Result<(), anyhow::Error> {
    if files.len() == 1 {
        return rename_into(&files[0], pipeline.target());
    }
    let staged = pipeline.new_run_file()?;
    merge_into(pipeline, files, &staged)?;
    rename_into(&staged, pipeline.target())
}

fn rename_into(from: &Path, to: &Path) -> Result<(), anyhow::Error> {
    fs::rename(from, to)
        .with_context(|| anyhow!("Rename {} to {}", from.display(), to.display()))?;
    Ok(())
}

fn merge_into(
    pipeline: &Pipeline,
    files: Vec<PathBuf>,
    destination: &Path,
) -> Result<(), anyhow::Error> {
    if files.len() == 1 {
        // a single-file "merge" is a relocation
        return rename_into(&files[0], destination);
    }
    log::info!(
        "Merging {} run files, thread: {}",
        files.len(),
        thread::current().name().unwrap_or("unnamed")
    );
    let mut writer = RecordWriter::create(destination)?;
    let merged = merge_sources(&files, &mut writer, pipeline.config().unique())?;
    writer.flush()?;
    for path in &files {
        fs::remove_file(path).with_context(|| format!("path: {}", path.display()))?;
    }
    log::info!(
        "Finished merging run files, thread: {}, merged length: {} records",
        thread::current().name().unwrap_or("unnamed"),
        merged
    );
    Ok(())
}

/// Streaming k-way merge of sorted runs. Memory use is proportional to the
/// number of sources. In unique mode a record whose key equals the last
/// emitted one is suppressed; the merge emits in (key, id) order, so the
/// surviving representative of each key is the record with the smallest id.
fn merge_sources(
    files: &[PathBuf],
    writer: &mut RecordWriter,
    unique: bool,
) -> Result<u64, anyhow::Error> {
    let mut sources: BinaryHeap<RunFile> = BinaryHeap::with_capacity(files.len());
    for path in files {
        sources.push(RunFile::open(path.clone())?);
    }

    let mut merged: u64 = 0;
    let mut last_key: Option<String> = None;
    while let Some(mut source) = sources.pop() {
        let record = match source.advance()? {
            Some(record) => record,
            // exhausted runs sort to the top of the heap and drop out here
            None => continue,
        };
        if unique {
            let duplicate = last_key
                .as_deref()
                .map_or(false, |last| compare_text(last, record.text()).is_eq());
            if !duplicate {
                writer.write(&record)?;
                merged += 1;
                last_key = Some(record.into_text());
            }
        } else {
            writer.write(&record)?;
            merged += 1;
        }
        sources.push(source);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::merger::merge_sources;
    use crate::record_writer::RecordWriter;

    fn write_run(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn merge(files: &[PathBuf], dir: &TempDir, unique: bool) -> (String, u64) {
        let destination = dir.path().join("merged");
        let mut writer = RecordWriter::create(&destination).unwrap();
        let merged = merge_sources(files, &mut writer, unique).unwrap();
        writer.flush().unwrap();
        (fs::read_to_string(&destination).unwrap(), merged)
    }

    #[test]
    fn test_two_way_merge() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let a = write_run(&dir, "a", "1. apple\n3. cherry\n");
        let b = write_run(&dir, "b", "2. banana\n4. date\n");
        let (content, merged) = merge(&[a, b], &dir, false);
        assert_eq!(content, "1. apple\n2. banana\n3. cherry\n4. date\n");
        assert_eq!(merged, 4);
        Ok(())
    }

    #[test]
    fn test_merge_deduplicates_across_sources() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let a = write_run(&dir, "a", "1. Apple\n3. banana\n");
        let b = write_run(&dir, "b", "2. apple\n3. banana\n");
        let (content, merged) = merge(&[a, b], &dir, true);
        assert_eq!(content, "1. Apple\n3. banana\n");
        assert_eq!(merged, 2);
        Ok(())
    }

    #[test]
    fn test_merge_keeps_duplicates_without_unique() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let a = write_run(&dir, "a", "1. Apple\n");
        let b = write_run(&dir, "b", "2. apple\n");
        let (content, merged) = merge(&[a, b], &dir, false);
        assert_eq!(content, "1. Apple\n2. apple\n");
        assert_eq!(merged, 2);
        Ok(())
    }

    #[test]
    fn test_merge_with_empty_source() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let a = write_run(&dir, "a", "");
        let b = write_run(&dir, "b", "1. apple\n");
        let c = write_run(&dir, "c", "");
        let (content, merged) = merge(&[a, b, c], &dir, false);
        assert_eq!(content, "1. apple\n");
        assert_eq!(merged, 1);
        Ok(())
    }
}
