use std::path::PathBuf;
use std::time::Instant;

use record_file_sort::generate::Generate;
use simple_logger::SimpleLogger;

// cargo run -r --bin record_gen -- [target] [size in MB] [max sequence number]
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
    let output = PathBuf::from(args.first().map(String::as_str).unwrap_or("sample.txt"));
    let target_size_mb = match args.get(1).and_then(|arg| arg.parse::<u64>().ok()) {
        Some(size) if size >= 1 => size,
        _ => 1024,
    };

    println!("Generating: {}, target size {}MB", output.display(), target_size_mb);
    let started = Instant::now();
    let mut generate = Generate::new(output);
    generate.with_target_size_mb(target_size_mb);
    if let Some(max_id) = args.get(2).and_then(|arg| arg.parse::<u64>().ok()) {
        generate.with_max_id(max_id);
    }
    generate.generate()?;
    println!("Done! Elapsed: {:?}", started.elapsed());
    Ok(())
}
