use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cache_sim::{
    config::{CacheConfig, ReplacementKind},
    report::{BANNER, TraceReport},
    simulator::run_traces,
};
use clap::Parser;
use env_logger::Env;

#[derive(Parser, Debug)]
#[command(about = "Simulate a set-associative CPU cache over memory traces")]
struct Args {
    /// Cache size in KB [1 KB to 8 MB]
    #[arg(short = 's', value_name = "KB")]
    cache_size: u64,

    /// Block size in bytes [4 to 64]
    #[arg(short = 'b', value_name = "BYTES")]
    block_size: u64,

    /// Associativity: 1, 2, 4, 8, or 16
    #[arg(short = 'a', value_name = "WAYS")]
    associativity: usize,

    /// Replacement policy
    #[arg(short = 'r', value_enum, value_name = "POLICY")]
    replacement: ReplacementKind,

    /// Physical memory in KB [64 KB to 512 GB]
    #[arg(short = 'p', value_name = "KB")]
    physical_memory: u64,

    /// Trace file; repeat to simulate several traces independently
    #[arg(short = 'f', value_name = "FILE", required = true)]
    trace_files: Vec<PathBuf>,

    /// Seed for the random replacement policy
    #[arg(long)]
    seed: Option<u64>,

    /// Number of leading trace records echoed in each report
    #[arg(long, default_value_t = 20)]
    preview: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let config = CacheConfig::from_kib(
        args.cache_size,
        args.block_size,
        args.associativity,
        args.replacement,
        args.physical_memory,
    )
    .context("invalid cache configuration")?;
    let (geometry, results) = run_traces(&config, args.seed, &args.trace_files, args.preview)
        .context("failed to derive cache geometry")?;

    println!("{BANNER}");
    let mut failed = 0;
    for result in &results {
        println!();
        println!(
            "{}",
            TraceReport {
                config: &config,
                geometry: &geometry,
                result,
            }
        );
        if result.outcome.is_err() {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{failed} of {} trace files failed", results.len());
    }
    Ok(())
}
