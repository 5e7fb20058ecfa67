use anyhow::Context;

use crate::pipeline::Pipeline;
use crate::record_reader::RecordReader;

/// Reader stage: streams the source file into throttled chunks.
///
/// Sets the `read_complete` latch on every exit so the sorter pool can drain
/// and stop; a parse or I/O failure additionally raises `failed` and aborts
/// the whole run.
pub(crate) fn run(pipeline: &Pipeline) -> Result<(), anyhow::Error> {
    let result = read_source(pipeline);
    if result.is_err() {
        pipeline.fail();
    }
    pipeline.set_read_complete();
    result
}

fn read_source(pipeline: &Pipeline) -> Result<(), anyhow::Error> {
    let source = pipeline.config().source();
    let mut reader = RecordReader::open(source)?;
    loop {
        if !pipeline.throttle().acquire(|| pipeline.failed()) {
            break;
        }
        let mut chunk = pipeline.free_chunk();
        while !chunk.is_full() {
            match reader
                .read_record()
                .with_context(|| format!("source: {}", source.display()))?
            {
                Some(record) => chunk.push(record),
                None => break,
            }
        }
        // a partial or empty chunk marks the end of the source; it is
        // published anyway so even an empty input produces one run
        let last = !chunk.is_full();
        pipeline.publish_filled(chunk);
        if last {
            break;
        }
    }
    log::info!("Finished reading source, {} records", reader.records());
    Ok(())
}
