use std::error::Error;
use std::fmt::{Display, Formatter};

/// Parse failure for the `<sequence-number>. <text>` wire format.
///
/// Any occurrence is fatal to the whole run: the sort surfaces it to the
/// caller through [anyhow::Error], from which it can be recovered with
/// `downcast_ref::<FormatError>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The record prefix was never terminated by the exact `". "` separator.
    MissingSeparator {
        record: u64,
    },
    /// The bytes before the separator are not a non-negative integer.
    InvalidSequenceNumber {
        record: u64,
        prefix: String,
    },
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::MissingSeparator { record } => {
                write!(f, "record {}: missing '. ' separator", record)
            }
            FormatError::InvalidSequenceNumber { record, prefix } => {
                write!(f, "record {}: invalid sequence number '{}'", record, prefix)
            }
        }
    }
}

impl Error for FormatError {}
