//! CLI argument parsing using Clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::driver::{Audit, FailureMode, ValueCheck};
use crate::harness::{HarnessConfig, DEFAULT_REPLAY_FILE};
use crate::params::{Params, MAX_QUOTIENT_BITS};
use crate::registry::ALL;
use crate::replay::DeclaredParams;
use crate::workload::MAX_OP_COUNT;

/// Differential correctness harness for hash-map implementations
#[derive(Parser, Debug)]
#[command(name = "mapcheck", about, long_about = None)]
#[command(after_help = "Examples:
  mapcheck                               Generate 200 ops, record to test_case.txt, test all subjects
  mapcheck -d bounded -q 4 -m 100 -l 5000
  mapcheck -d hashmap -r 1 -f test_case.txt   Replay a recorded failure
  mapcheck --seed 42 --no-record         Reproducible run without a log
")]
pub struct Cli {
    /// Subject to test: a registered name or `all`
    #[arg(short = 'd', value_name = "SUBJECT", default_value = ALL)]
    pub datastruct: String,

    /// Key width in bits [default: 16]
    #[arg(short = 'k', value_name = "BITS", value_parser = clap::value_parser!(u32).range(1..=64))]
    pub key_bits: Option<u32>,

    /// log2 of nominal subject capacity [default: 8]
    #[arg(short = 'q', value_name = "BITS", value_parser = clap::value_parser!(u32).range(0..=(MAX_QUOTIENT_BITS as i64)))]
    pub quotient_bits: Option<u32>,

    /// Value width in bits [default: 8]
    #[arg(short = 'v', value_name = "BITS", value_parser = clap::value_parser!(u32).range(0..=64))]
    pub value_bits: Option<u32>,

    /// Initial load factor, 0-100
    #[arg(short = 'm', value_name = "PERCENT", default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub load_factor: u32,

    /// Number of randomized operations after the prefill
    #[arg(short = 'l', value_name = "OPS", default_value_t = 200, value_parser = clap::value_parser!(u64).range(0..=MAX_OP_COUNT))]
    pub ops: u64,

    /// 0 generates (and records to -f); nonzero replays from -f
    #[arg(short = 'r', value_name = "N", default_value_t = 0, allow_negative_numbers = true)]
    pub replay: i64,

    /// Replay file to record to or load from
    #[arg(short = 'f', value_name = "FILE", default_value = DEFAULT_REPLAY_FILE)]
    pub file: PathBuf,

    /// Seed for the workload generator (default: OS entropy)
    #[arg(long, env = "MAPCHECK_SEED")]
    pub seed: Option<u64>,

    /// Do not record generated workloads
    #[arg(long)]
    pub no_record: bool,

    /// Compare values on every subject, including existence-only ones
    #[arg(long)]
    pub exact_values: bool,

    /// State compared beyond explicit lookups
    #[arg(long, value_enum, default_value_t = AuditArg::Lookups)]
    pub audit: AuditArg,

    /// Collect every divergence instead of stopping at the first; debug logging
    #[arg(long)]
    pub verbose: bool,

    /// List registered subjects and exit
    #[arg(long)]
    pub list: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AuditArg {
    Lookups,
    EveryOp,
    Universe,
}

impl From<AuditArg> for Audit {
    fn from(arg: AuditArg) -> Self {
        match arg {
            AuditArg::Lookups => Audit::Lookups,
            AuditArg::EveryOp => Audit::EveryOperation,
            AuditArg::Universe => Audit::Universe,
        }
    }
}

impl Cli {
    pub fn into_config(self) -> HarnessConfig {
        let defaults = Params::default();
        let params = Params {
            key_bits: self.key_bits.unwrap_or(defaults.key_bits),
            quotient_bits: self.quotient_bits.unwrap_or(defaults.quotient_bits),
            value_bits: self.value_bits.unwrap_or(defaults.value_bits),
            initial_load_factor: self.load_factor,
        };
        HarnessConfig {
            subject: self.datastruct,
            params,
            op_count: self.ops,
            replay: self.replay != 0,
            replay_file: self.file,
            declared: DeclaredParams {
                key_bits: self.key_bits,
                quotient_bits: self.quotient_bits,
                value_bits: self.value_bits,
            },
            seed: self.seed,
            record: !self.no_record,
            values: self.exact_values.then_some(ValueCheck::Exact),
            audit: self.audit.into(),
            failure: if self.verbose {
                FailureMode::CollectAll
            } else {
                FailureMode::FailFast
            },
        }
    }
}
