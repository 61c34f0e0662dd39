use clap::Parser;
use std::path::PathBuf;
use coldbench::{
    io_utils::{bench_cli_error, simple_cli_error},
    read_results, render_report,
};

/// Print the best results of a benchmark run.
#[derive(Parser)]
struct Args {
    /// JSON results file, e.g. results_1754595284.json
    results_file: PathBuf,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if !args.results_file.exists() {
        return Err(simple_cli_error(&format!(
            "File {} does not exist",
            args.results_file.display()
        ))
        .into());
    }
    let results = read_results(&args.results_file)
        .map_err(|e| bench_cli_error("analyzing results", e))?;

    println!("Analyzing results from: {}\n", args.results_file.display());
    print!("{}", render_report(&results));
    println!("Analysis complete!");
    Ok(())
}
