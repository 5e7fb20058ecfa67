use std::path::PathBuf;

use anyhow::anyhow;
use rand::Rng;

use crate::record_writer::RecordWriter;

const MEGABYTE: u64 = 1024 * 1024;
const DEFAULT_TARGET_SIZE_MB: u64 = 1024;
const DEFAULT_MAX_ID: u64 = 100_000;

/// Generate a random record file, used to produce sort inputs
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use record_file_sort::generate::Generate;
///
/// fn generate_sample(output: PathBuf) -> Result<(), anyhow::Error> {
///     let mut generate = Generate::new(output);
///     generate.with_target_size_mb(16);
///     generate.generate()
/// }
/// ```
pub struct Generate {
    output: PathBuf,
    target_size_bytes: u64,
    record_count: Option<u64>,
    max_id: u64,
    text_pool: Vec<String>,
}

impl Generate {
    /// Create a default Generate definition: a 1024 MB target, sequence
    /// numbers drawn from 1..=100000 and texts drawn from a built-in
    /// sentence pool.
    pub fn new(output: PathBuf) -> Generate {
        Generate {
            output,
            target_size_bytes: DEFAULT_TARGET_SIZE_MB * MEGABYTE,
            record_count: None,
            max_id: DEFAULT_MAX_ID,
            text_pool: default_text_pool(),
        }
    }

    /// Write records until the file reaches at least this many megabytes.
    pub fn with_target_size_mb(&mut self, target_size_mb: u64) {
        self.target_size_bytes = target_size_mb * MEGABYTE;
        self.record_count = None;
    }

    /// Write records until the file reaches at least this many bytes.
    pub fn with_target_size_bytes(&mut self, target_size_bytes: u64) {
        self.target_size_bytes = target_size_bytes;
        self.record_count = None;
    }

    /// Write exactly this many records instead of filling to a byte target.
    pub fn with_record_count(&mut self, record_count: u64) {
        self.record_count = Some(record_count);
    }

    /// Set the largest sequence number to draw. Must be at least 1.
    pub fn with_max_id(&mut self, max_id: u64) {
        self.max_id = max_id;
    }

    /// Replace the built-in text pool. Must not be empty.
    pub fn with_text_pool(&mut self, text_pool: Vec<String>) {
        self.text_pool = text_pool;
    }

    pub fn generate(&self) -> Result<(), anyhow::Error> {
        if self.max_id < 1 {
            return Err(anyhow!("max id should be greater than zero"));
        }
        if self.text_pool.is_empty() {
            return Err(anyhow!("text pool should not be empty"));
        }

        let mut writer = RecordWriter::create(&self.output)?;
        let mut rng = rand::thread_rng();
        match self.record_count {
            Some(count) => {
                for _ in 0..count {
                    self.write_one(&mut writer, &mut rng)?;
                }
            }
            None => {
                let mut written: u64 = 0;
                while written < self.target_size_bytes {
                    written += self.write_one(&mut writer, &mut rng)?;
                }
            }
        }
        writer.flush()
    }

    fn write_one(
        &self,
        writer: &mut RecordWriter,
        rng: &mut impl Rng,
    ) -> Result<u64, anyhow::Error> {
        let id = rng.gen_range(1..=self.max_id);
        let text = &self.text_pool[rng.gen_range(0..self.text_pool.len())];
        writer.write_parts(id, text)?;
        Ok(decimal_width(id) + 2 + text.len() as u64 + 1)
    }
}

fn decimal_width(mut n: u64) -> u64 {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

fn default_text_pool() -> Vec<String> {
    [
        "Apple trees grow best in a sunny spot",
        "Banana bread needs very ripe fruit",
        "Cherry blossoms open early in spring",
        "Dates keep for months in a cool pantry",
        "Elderberry syrup is dark and sweet",
        "Figs ripen late in the summer heat",
        "Grapes hang in heavy clusters by autumn",
        "Honeydew melons sound hollow when ripe",
        "Kiwi vines need a sturdy trellis",
        "Lemons brighten almost any dish",
        "Mango season is short and worth waiting for",
        "Nectarines bruise more easily than peaches",
        "Oranges travel well in cold storage",
        "Pears should finish ripening off the tree",
        "Quinces are too hard to eat raw",
        "Raspberries fade within a day of picking",
        "Strawberries carry the taste of June",
        "Tangerines peel in a single spiral",
        "Watermelons grow heaviest in sandy soil",
        "Zucchini is a fruit despite the name",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use crate::generate::{decimal_width, Generate};
    use std::path::PathBuf;

    #[test]
    fn test_decimal_width() {
        assert_eq!(decimal_width(0), 1);
        assert_eq!(decimal_width(9), 1);
        assert_eq!(decimal_width(10), 2);
        assert_eq!(decimal_width(100_000), 6);
    }

    #[test]
    fn test_rejects_zero_max_id() {
        let mut generate = Generate::new(PathBuf::from("unused"));
        generate.with_max_id(0);
        assert!(generate.generate().is_err());
    }

    #[test]
    fn test_rejects_empty_text_pool() {
        let mut generate = Generate::new(PathBuf::from("unused"));
        generate.with_text_pool(Vec::new());
        assert!(generate.generate().is_err());
    }
}
