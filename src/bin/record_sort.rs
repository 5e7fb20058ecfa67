use std::path::PathBuf;
use std::time::Instant;

use record_file_sort::sort::Sort;
use simple_logger::SimpleLogger;

// cargo run -r --bin record_sort -- [source] [target] [tasks] [unique|all]
fn main() {
    SimpleLogger::new().init().unwrap();
    if let Err(e) = run() {
        println!("Failed!");
        println!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), anyhow::Error> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let source = PathBuf::from(args.first().map(String::as_str).unwrap_or("sample.txt"));
    let target = PathBuf::from(args.get(1).map(String::as_str).unwrap_or("sorted.txt"));
    let cores = num_cpus::get();
    let tasks = match args.get(2).and_then(|arg| arg.parse::<usize>().ok()) {
        Some(tasks) if tasks >= 1 && tasks <= cores => tasks,
        _ => cores,
    };
    let unique = !matches!(args.get(3).map(String::as_str), Some("all"));

    println!("Sorting: {}", source.display());
    let started = Instant::now();
    let mut sort = Sort::new(source, target.clone());
    sort.with_tasks(tasks);
    sort.with_unique(unique);
    // keep the scratch space on the same file system as the target
    let scratch_root = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    sort.with_tmp_dir(scratch_root);
    sort.sort()?;
    println!("Done! Elapsed: {:?}", started.elapsed());
    Ok(())
}
