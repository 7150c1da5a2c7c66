//! CLI entry point: load a roster and a history log, apply every
//! modification, and write the reconstructed collection back out.

use clap::Parser;
use gazetteer::{ingest, Config};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "gazetteer", about = "Reconstructs bitemporal town history from a roster and a modification log")]
struct Cli {
    /// Tab-delimited present-day roster.
    #[arg(long, default_value = "towns.csv")]
    towns: std::path::PathBuf,

    /// Tab-delimited modification history, in chronological-record order.
    #[arg(long, default_value = "history.csv")]
    history: std::path::PathBuf,

    /// Destination for the reconstructed collection.
    #[arg(long, default_value = "output.csv")]
    output: std::path::PathBuf,

    /// Escalate ingestion warnings to hard errors.
    #[arg(long)]
    strict: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config {
        towns_path: cli.towns,
        history_path: cli.history,
        output_path: cli.output,
        strict: cli.strict,
    };

    match gazetteer::run(&config).and_then(|towns| ingest::write_output(&towns, &config.output_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gazetteer: {e}");
            ExitCode::FAILURE
        }
    }
}
