use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;

use crate::record::Record;

// Formatted records accumulate in the writer and go to the file in bursts of
// this size; the remainder is flushed explicitly or on drop.
const FLUSH_THRESHOLD: usize = 1024 * 1024;

/// Streaming writer for the `<sequence-number>. <text>` wire format.
pub(crate) struct RecordWriter {
    writer: BufWriter<File>,
}

impl RecordWriter {
    pub(crate) fn create(path: &Path) -> Result<RecordWriter, anyhow::Error> {
        let file = File::create(path).with_context(|| format!("path: {}", path.display()))?;
        Ok(
            RecordWriter {
                writer: BufWriter::with_capacity(FLUSH_THRESHOLD, file),
            }
        )
    }

    pub(crate) fn write(&mut self, record: &Record) -> Result<(), anyhow::Error> {
        self.write_parts(record.id(), record.text())
    }

    pub(crate) fn write_parts(&mut self, id: u64, text: &str) -> Result<(), anyhow::Error> {
        writeln!(self.writer, "{}. {}", id, text)?;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<(), anyhow::Error> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::NamedTempFile;

    use crate::record::Record;
    use crate::record_reader::RecordReader;
    use crate::record_writer::RecordWriter;

    #[test]
    fn test_wire_format() -> Result<(), anyhow::Error> {
        let file = NamedTempFile::new()?;
        let mut writer = RecordWriter::create(file.path())?;
        writer.write(&Record::new(3, "banana".to_string()))?;
        writer.write_parts(1, "Apple")?;
        writer.flush()?;
        let content = fs::read_to_string(file.path())?;
        assert_eq!(content, "3. banana\n1. Apple\n");
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<(), anyhow::Error> {
        let file = NamedTempFile::new()?;
        let mut writer = RecordWriter::create(file.path())?;
        writer.write(&Record::new(42, "text with. separator".to_string()))?;
        writer.write(&Record::new(0, String::new()))?;
        writer.flush()?;

        let mut reader = RecordReader::open(file.path())?;
        let first = reader.read_record()?.unwrap();
        assert_eq!(first.id(), 42);
        assert_eq!(first.text(), "text with. separator");
        let second = reader.read_record()?.unwrap();
        assert_eq!(second.id(), 0);
        assert_eq!(second.text(), "");
        assert!(reader.read_record()?.is_none());
        Ok(())
    }
}
