use clap::Parser;
use std::path::PathBuf;
use coldbench::{io_utils::io_cli_error, remove_result_files};

/// Delete results_*.json and results_*.csv files.
#[derive(Parser)]
struct Args {
    /// Directory holding the result files
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let removed =
        remove_result_files(&args.dir).map_err(|e| io_cli_error("cleaning", &args.dir, e))?;
    for path in &removed {
        println!("Deleted: {}", path.display());
    }
    println!("Cleaned up {} files", removed.len());
    Ok(())
}
