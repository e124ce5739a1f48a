mod commands;
mod logging;
mod progress;

use std::process;

use clap::Parser;
use colored::*;
use commands::Cli;
use dotenv::dotenv;
use progress::CliReporter;
use tracing::error;
use zbc_core::{CompressEngine, RunOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match zbc_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let options = RunOptions {
        power: args.power,
        max_kilobytes: args.max,
        backup: !args.nobackup,
        dry_run: args.dryrun,
    };
    let dry_run = options.dry_run;

    // Missing Ghostscript and a missing vault both abort here, before any
    // file is touched.
    let engine = match CompressEngine::new(config, options) {
        Ok(engine) => engine,
        Err(err) => {
            error!("Error: {}", err);
            process::exit(1);
        }
    };

    let reporter = CliReporter::new();
    let result = match engine.run(&reporter) {
        Ok(result) => result,
        Err(err) => {
            error!("Error: {}", err);
            process::exit(1);
        }
    };

    println!();
    if dry_run {
        println!(
            "Dry run: {} PDFs would be compressed",
            format!("{}", result.candidates).cyan()
        );
        return Ok(());
    }

    println!(
        "Processed {} PDFs in {} — {} compressed, {} not smaller, {} failed",
        result.candidates,
        format!("{:.2}s", result.compress_duration.as_secs_f64()).green(),
        format!("{}", result.committed).green(),
        format!("{}", result.aborted_larger).yellow(),
        format!("{}", result.failed).red(),
    );
    println!(
        "Total reduction: {}",
        format!("{:.2} MB", result.bytes_saved as f64 / 1_000_000.0).green()
    );
    if let Some(backup_root) = &result.backup_root {
        println!("Backups written to {}", backup_root.display());
    }

    Ok(())
}
