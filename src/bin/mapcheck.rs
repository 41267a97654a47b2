//! CLI binary for differential hash-map testing.
//!
//! Usage:
//!   cargo run --bin mapcheck -- -d all -k 16 -q 8 -v 8 -m 50 -l 200
//!   cargo run --bin mapcheck -- -d hashmap -r 1 -f test_case.txt

use std::io;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use mapcheck::cli::Cli;
use mapcheck::{Harness, HarnessError, WorkloadOrigin};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let harness = Harness::default();

    if cli.list {
        for entry in harness.registry().iter() {
            println!("{:<10} {:?}  {}", entry.name, entry.values, entry.description);
        }
        return;
    }

    let config = cli.into_config();
    match harness.execute(&config) {
        Ok(report) => {
            println!("=== mapcheck ===");
            println!("Params: {}", report.params);
            match report.origin {
                WorkloadOrigin::Generated { seed, recorded } => {
                    if let Some(seed) = seed {
                        println!("Seed: {seed}");
                    }
                    if recorded {
                        println!("Recorded: {}", config.replay_file.display());
                    }
                }
                WorkloadOrigin::Replayed => {
                    println!("Replayed: {}", config.replay_file.display());
                }
            }
            println!("Operations: {}", report.op_count);
            for result in &report.results {
                println!(
                    "  [PASS] {:<10} lookups={} hit_rate={:.2} rejected_inserts={}",
                    result.label,
                    result.counts.lookups,
                    result.counts.hit_rate(),
                    result.counts.rejected_inserts
                );
            }
            println!("Test success.");
        }
        Err(err) => {
            match &err {
                HarnessError::Divergence(failure) => {
                    eprintln!("[FAIL] {failure}");
                }
                HarnessError::InvalidParameter { .. } => {
                    eprintln!("error: {err}");
                    eprintln!("{}", Cli::command().render_usage());
                }
                other => eprintln!("error: {other}"),
            }
            std::process::exit(err.exit_code());
        }
    }
}
