use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;

use anyhow::Context;

use crate::format_error::FormatError;
use crate::record::Record;

const READ_BUFFER_SIZE: usize = 32 * 1024;

/// Streaming reader for the `<sequence-number>. <text>` wire format.
///
/// The format is the only one the system speaks: run files are written and
/// re-read through this codec, so parsing must accept exactly what
/// [crate::record_writer::RecordWriter] produces.
pub(crate) struct RecordReader {
    reader: BufReader<File>,
    prefix: Vec<u8>,
    records: u64,
}

impl RecordReader {
    pub(crate) fn open(path: &Path) -> Result<RecordReader, anyhow::Error> {
        let file = File::open(path).with_context(|| format!("path: {}", path.display()))?;
        Ok(
            RecordReader {
                reader: BufReader::with_capacity(READ_BUFFER_SIZE, file),
                prefix: Vec::new(),
                records: 0,
            }
        )
    }

    /// Read the next record, or `None` when the stream is cleanly exhausted.
    ///
    /// The sequence number runs up to the first '.'; the byte after it must
    /// be a space; the text runs to end of line. Anything else is a
    /// [FormatError]. Bytes pending at end of stream without a terminated
    /// prefix are malformed, not a clean end.
    pub(crate) fn read_record(&mut self) -> Result<Option<Record>, anyhow::Error> {
        self.prefix.clear();
        let consumed = self.reader.read_until(b'.', &mut self.prefix)?;
        if consumed == 0 {
            return Ok(None);
        }
        let record = self.records + 1;
        if self.prefix.last() != Some(&b'.') {
            return Err(FormatError::MissingSeparator { record }.into());
        }
        self.prefix.pop();

        let mut separator = [0u8; 1];
        match self.reader.read_exact(&mut separator) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(FormatError::MissingSeparator { record }.into());
            }
            Err(e) => {
                return Err(e.into());
            }
        }
        if separator[0] != b' ' {
            return Err(FormatError::MissingSeparator { record }.into());
        }

        let id = std::str::from_utf8(&self.prefix)
            .ok()
            .and_then(|prefix| prefix.parse::<u64>().ok())
            .ok_or_else(|| FormatError::InvalidSequenceNumber {
                record,
                prefix: String::from_utf8_lossy(&self.prefix).to_string(),
            })?;

        let mut text = String::new();
        self.reader.read_line(&mut text)?;
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }

        self.records += 1;
        Ok(Some(Record::new(id, text)))
    }

    /// Number of records read so far.
    pub(crate) fn records(&self) -> u64 {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use crate::format_error::FormatError;
    use crate::record_reader::RecordReader;

    fn reader_for(content: &str) -> (NamedTempFile, RecordReader) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        let reader = RecordReader::open(file.path()).unwrap();
        (file, reader)
    }

    #[test]
    fn test_read_records() -> Result<(), anyhow::Error> {
        let (_file, mut reader) = reader_for("3. banana\n1. Apple\n");
        let first = reader.read_record()?.unwrap();
        assert_eq!(first.id(), 3);
        assert_eq!(first.text(), "banana");
        let second = reader.read_record()?.unwrap();
        assert_eq!(second.id(), 1);
        assert_eq!(second.text(), "Apple");
        assert!(reader.read_record()?.is_none());
        assert_eq!(reader.records(), 2);
        Ok(())
    }

    #[test]
    fn test_text_keeps_later_separators() -> Result<(), anyhow::Error> {
        let (_file, mut reader) = reader_for("12. one. two. three\n");
        let record = reader.read_record()?.unwrap();
        assert_eq!(record.id(), 12);
        assert_eq!(record.text(), "one. two. three");
        Ok(())
    }

    #[test]
    fn test_missing_newline_at_end() -> Result<(), anyhow::Error> {
        let (_file, mut reader) = reader_for("7. pineapple");
        let record = reader.read_record()?.unwrap();
        assert_eq!(record.text(), "pineapple");
        assert!(reader.read_record()?.is_none());
        Ok(())
    }

    #[test]
    fn test_empty_stream() -> Result<(), anyhow::Error> {
        let (_file, mut reader) = reader_for("");
        assert!(reader.read_record()?.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_separator() {
        let (_file, mut reader) = reader_for("no separator here\n");
        let error = reader.read_record().unwrap_err();
        assert_eq!(
            error.downcast_ref::<FormatError>(),
            Some(&FormatError::MissingSeparator { record: 1 })
        );
    }

    #[test]
    fn test_missing_space_after_dot() {
        let (_file, mut reader) = reader_for("5.text\n");
        let error = reader.read_record().unwrap_err();
        assert_eq!(
            error.downcast_ref::<FormatError>(),
            Some(&FormatError::MissingSeparator { record: 1 })
        );
    }

    #[test]
    fn test_negative_sequence_number() {
        let (_file, mut reader) = reader_for("-5. text\n");
        let error = reader.read_record().unwrap_err();
        assert!(matches!(
            error.downcast_ref::<FormatError>(),
            Some(FormatError::InvalidSequenceNumber { record: 1, .. })
        ));
    }

    #[test]
    fn test_non_numeric_sequence_number() {
        let (_file, mut reader) = reader_for("1. ok\nabc. text\n");
        assert!(reader.read_record().unwrap().is_some());
        let error = reader.read_record().unwrap_err();
        assert!(matches!(
            error.downcast_ref::<FormatError>(),
            Some(FormatError::InvalidSequenceNumber { record: 2, .. })
        ));
    }
}
