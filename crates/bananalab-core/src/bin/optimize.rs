//! bananalab-optimize: run the design payload optimizer on a file.
//!
//! Useful for checking whether an exported design would be accepted by the
//! auto-save endpoints before uploading it.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use bananalab_core::{size_in_mb, Error, OptimizerConfig, PayloadOptimizer};
use clap::Parser;

#[derive(Parser)]
#[command(name = "bananalab-optimize")]
#[command(author, version, about = "Optimize a BananaLab design document")]
struct Cli {
    /// Design document (JSON) to optimize
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the optimized document (default: not written)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only report, never write output
    #[arg(long)]
    check: bool,

    /// Override the large-image threshold (characters)
    #[arg(long)]
    threshold: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let raw = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let document: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", cli.input.display()))?;

    let mut config = OptimizerConfig::from_env();
    if let Some(threshold) = cli.threshold {
        config = config.with_large_image_threshold(threshold);
    }
    let optimizer = PayloadOptimizer::new(config);

    match optimizer.optimize(document) {
        Ok(optimized) => {
            let r = &optimized.report;
            println!("Original:   {} bytes ({} MB)", r.original_bytes, size_in_mb(r.original_bytes));
            println!("Optimized:  {} bytes ({} MB)", r.optimized_bytes, size_in_mb(r.optimized_bytes));
            println!("Saved:      {}%", r.saved_percent);
            println!("Images replaced:   {}", r.images_replaced);
            println!("Filters removed:   {}", r.filters_removed);
            println!("Ephemeral removed: {}", r.ephemeral_removed);

            if let (Some(path), false) = (&cli.output, cli.check) {
                let out = serde_json::to_vec(&optimized.document)?;
                std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
                println!("Written to {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::PayloadTooLarge {
            size_bytes,
            limit_bytes,
        }) => {
            println!(
                "Rejected: {} MB exceeds limit of {} MB",
                size_in_mb(size_bytes),
                size_in_mb(limit_bytes)
            );
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}
