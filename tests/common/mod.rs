use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;

use data_encoding::HEXLOWER;

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();
    let tmp_dir_path = PathBuf::from_str("./target/sort-tmp/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    }

    if !tmp_dir_path.exists() {
        fs::create_dir_all(&tmp_dir_path).unwrap_or_else(|_|
            panic!("Failed to create tmp directory: {:?}", tmp_dir_path)
        );
    }
}

// scratch space on the same file system as the results
#[allow(dead_code)]
pub fn tmp_dir() -> PathBuf {
    PathBuf::from("./target/sort-tmp/")
}

#[allow(dead_code)]
pub fn read_lines(path: PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}
