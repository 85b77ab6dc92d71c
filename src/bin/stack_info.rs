//! stack-info - inspect the contents of a stack file

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use framestack::StackFile;

/// Inspect the arrays held by a stack file
#[derive(Parser, Debug)]
#[command(name = "stack-info")]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Path to the stack file
    path: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    setup_logging(args.verbose);

    info!("Loading stack file: {:?}", args.path);
    let stack = StackFile::open(&args.path)
        .map_err(|e| anyhow::anyhow!("Failed to open stack file: {}", e))?;

    println!("{}", stack.summary());
    for meta in stack.arrays() {
        println!(
            "  {:<24} {:>8} {:?} ({} bytes at offset {})",
            meta.key,
            meta.dtype.as_str(),
            meta.shape,
            meta.byte_len,
            meta.offset
        );
    }

    Ok(())
}
