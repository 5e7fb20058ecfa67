use std::cmp::Ordering;
use std::path::PathBuf;

use crate::record::Record;
use crate::record_reader::RecordReader;

/// One sorted run opened for merging: a codec reader primed with its first
/// record. The ordering is reversed so that a max [std::collections::BinaryHeap]
/// pops the run holding the lowest current record.
pub(crate) struct RunFile {
    reader: RecordReader,
    head: Option<Record>,
}

impl RunFile {
    pub(crate) fn open(path: PathBuf) -> Result<RunFile, anyhow::Error> {
        let mut reader = RecordReader::open(&path)?;
        let head = reader.read_record()?;
        Ok(
            RunFile {
                reader,
                head,
            }
        )
    }

    /// Take the current record and prime the next one. `None` once the run
    /// is exhausted.
    pub(crate) fn advance(&mut self) -> Result<Option<Record>, anyhow::Error> {
        let next = self.reader.read_record()?;
        Ok(std::mem::replace(&mut self.head, next))
    }
}

impl Eq for RunFile {}

impl PartialEq<Self> for RunFile {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for RunFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RunFile {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.head.as_ref(), other.head.as_ref()) {
            (None, None) => Ordering::Equal,
            // none > some so exhausted runs pop from the BinaryHeap first
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            // comparison is flipped to pop the lowest record from a max heap
            (Some(record), Some(other_record)) => other_record.cmp(record),
        }
    }
}
