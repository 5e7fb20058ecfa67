use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Context;

use crate::chunk::Chunk;
use crate::pipeline::Pipeline;
use crate::record::compare_text;
use crate::record_writer::RecordWriter;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Sorter worker: takes filled chunks, sorts them in place and spills each
/// to a fresh generation-0 run file, then recycles the chunk buffer and
/// returns the throttle permit that lets the reader keep moving.
pub(crate) fn run(pipeline: &Pipeline) -> Result<(), anyhow::Error> {
    let result = sort_chunks(pipeline);
    if result.is_err() {
        pipeline.fail();
    }
    result
}

fn sort_chunks(pipeline: &Pipeline) -> Result<(), anyhow::Error> {
    while !pipeline.read_complete() || !pipeline.filled_is_empty() {
        if pipeline.failed() {
            break;
        }
        match pipeline.try_take_filled() {
            Some(mut chunk) => {
                chunk.sort();
                let path = spill_chunk(pipeline, &chunk)?;
                log::debug!(
                    "Spilled run of {} records, thread: {}",
                    chunk.len(),
                    thread::current().name().unwrap_or("unnamed")
                );
                pipeline.lock_ledger().enqueue_run(0, path);
                pipeline.recycle_chunk(chunk);
                pipeline.throttle().release();
            }
            None => {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
    Ok(())
}

/// Write a sorted chunk to a new run file. In unique mode records whose key
/// repeats the previous one are suppressed here already, so a run that goes
/// straight to the target needs no further pass; the chunk is sorted, which
/// keeps the smallest id of each key as the survivor.
fn spill_chunk(pipeline: &Pipeline, chunk: &Chunk) -> Result<PathBuf, anyhow::Error> {
    let path = pipeline.new_run_file()?;
    let mut writer =
        RecordWriter::create(&path).with_context(|| format!("run file: {}", path.display()))?;
    let unique = pipeline.config().unique();
    let mut last_key: Option<&str> = None;
    for record in chunk.records() {
        if unique {
            if let Some(last) = last_key {
                if compare_text(last, record.text()).is_eq() {
                    continue;
                }
            }
            last_key = Some(record.text());
        }
        writer.write(record)?;
    }
    writer.flush()?;
    Ok(path)
}
