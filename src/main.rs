use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};

use mempool_miner::{FileSink, MempoolDir, Settings};

/// Builds a block from the mempool, mines it once and writes the report.
#[derive(Parser, Debug)]
#[clap(name = "mempool-miner", author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults to ./miner.toml when present)
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Directory of pending transaction records
    #[clap(long, value_parser)]
    mempool: Option<PathBuf>,

    /// Report path
    #[clap(short, long, value_parser)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[clap(long, value_parser)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(dir) = args.mempool {
        settings.mempool_dir = dir;
    }
    if let Some(path) = args.output {
        settings.output_path = path;
    }
    if let Some(level) = args.log_level {
        settings.log_level = level;
    }

    let level: Level = settings
        .log_level
        .parse()
        .with_context(|| format!("invalid log level {:?}", settings.log_level))?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let source = MempoolDir::new(&settings.mempool_dir);
    let mut sink = FileSink::new(&settings.output_path);
    let summary = mempool_miner::run(&settings, &source, &mut sink)
        .with_context(|| format!("mining block from {}", settings.mempool_dir.display()))?;

    info!(
        hash = %summary.block.hash,
        nonce = summary.block.nonce,
        txs = summary.block.template.transactions().len(),
        rejected = summary.rejected.len(),
        output = %settings.output_path.display(),
        "done"
    );
    Ok(())
}
