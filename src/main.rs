mod cli;
mod comparator;
mod engine;
mod latency;
mod metrics;
mod model;
mod stats;
mod text_summary;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr; stdout carries the program's own output.
fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.debug);
    cli::run(args)
}
