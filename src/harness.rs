//! Front end: sources a workload, runs the selected subjects, reports.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::context::RandomSource;
use crate::driver::{Audit, Divergence, Driver, FailureMode, RunOptions, TestResult, ValueCheck};
use crate::error::{HarnessError, Result};
use crate::op::Operation;
use crate::params::Params;
use crate::registry::{SubjectRegistry, ALL};
use crate::replay::{self, DeclaredParams};
use crate::workload::{Generator, MAX_OP_COUNT};

/// Name of the harness binary, used in replay instructions.
pub const BIN_NAME: &str = "mapcheck";

/// Default replay file.
pub const DEFAULT_REPLAY_FILE: &str = "test_case.txt";

/// Everything one harness invocation needs.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Registered subject name or `all`.
    pub subject: String,
    pub params: Params,
    /// Mixed operations after the prefill.
    pub op_count: u64,
    /// Load the workload from `replay_file` instead of generating it.
    pub replay: bool,
    pub replay_file: PathBuf,
    /// Parameters given explicitly on the command line; a replayed log must
    /// agree with them.
    pub declared: DeclaredParams,
    pub seed: Option<u64>,
    /// Save generated workloads to `replay_file`.
    pub record: bool,
    /// Overrides each subject's registered value checking.
    pub values: Option<ValueCheck>,
    pub audit: Audit,
    pub failure: FailureMode,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            subject: ALL.to_string(),
            params: Params::default(),
            op_count: 200,
            replay: false,
            replay_file: PathBuf::from(DEFAULT_REPLAY_FILE),
            declared: DeclaredParams::default(),
            seed: None,
            record: true,
            values: None,
            audit: Audit::Lookups,
            failure: FailureMode::FailFast,
        }
    }
}

/// First divergence of a failed run plus how to reproduce it.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub subject: String,
    pub divergence: Divergence,
    /// Divergences found for this subject (more than one only when collecting).
    pub total_divergences: usize,
    /// Command line that reproduces the failure, if the workload is recoverable.
    pub replay_command: Option<String>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} diverged at {}", self.subject, self.divergence)?;
        if self.total_divergences > 1 {
            write!(f, " (+{} more)", self.total_divergences - 1)?;
        }
        match &self.replay_command {
            Some(command) => write!(f, ". Replay this test case with {command}"),
            None => write!(f, ". Workload was not recorded and cannot be replayed"),
        }
    }
}

/// Where the operation sequence came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkloadOrigin {
    Generated { seed: Option<u64>, recorded: bool },
    Replayed,
}

/// Outcome of a successful invocation.
#[derive(Clone, Debug)]
pub struct Report {
    pub params: Params,
    pub origin: WorkloadOrigin,
    pub op_count: usize,
    pub results: Vec<TestResult>,
}

/// Harness bound to a registry of subjects.
pub struct Harness {
    registry: SubjectRegistry,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(SubjectRegistry::builtin())
    }
}

impl Harness {
    pub fn new(registry: SubjectRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SubjectRegistry {
        &self.registry
    }

    /// Run the configured workload against the selected subjects.
    ///
    /// Parameter and log errors surface before any subject is driven. The
    /// first subject that diverges turns into [`HarnessError::Divergence`].
    pub fn execute(&self, config: &HarnessConfig) -> Result<Report> {
        let entries = self.registry.select(&config.subject)?;
        let (params, ops, origin) = self.workload(config)?;

        info!(
            %params,
            ops = ops.len(),
            subjects = entries.len(),
            ?origin,
            "workload ready"
        );

        let mut results = Vec::with_capacity(entries.len());
        let mut first_failure = None;
        for entry in entries {
            let options = RunOptions {
                values: config.values.unwrap_or(entry.values),
                failure: config.failure,
                audit: config.audit,
            };
            let driver = Driver::new(params, options).with_label(entry.name);
            let mut subject = entry.instantiate();
            let result = driver.run(&mut *subject, &ops)?;

            if result.counts.rejected_inserts > 0 {
                info!(
                    subject = entry.name,
                    rejected = result.counts.rejected_inserts,
                    "inserts refused at capacity"
                );
            }

            if let Some(divergence) = result.first_divergence() {
                let failure = Failure {
                    subject: entry.name.to_string(),
                    divergence: *divergence,
                    total_divergences: result.divergences.len(),
                    replay_command: replay_command(config, &params, &origin, entry.name),
                };
                warn!(%failure, "subject failed");
                if config.failure == FailureMode::FailFast {
                    return Err(HarnessError::Divergence(Box::new(failure)));
                }
                if first_failure.is_none() {
                    first_failure = Some(failure);
                }
            } else {
                info!(
                    subject = entry.name,
                    ops = result.ops_applied,
                    hit_rate = result.counts.hit_rate(),
                    "subject passed"
                );
            }
            results.push(result);
        }

        if let Some(failure) = first_failure {
            return Err(HarnessError::Divergence(Box::new(failure)));
        }

        Ok(Report {
            params,
            origin,
            op_count: ops.len(),
            results,
        })
    }

    fn workload(&self, config: &HarnessConfig) -> Result<(Params, Vec<Operation>, WorkloadOrigin)> {
        if config.replay {
            let (params, ops) = replay::load_checked(&config.replay_file, &config.declared)?;
            info!(path = %config.replay_file.display(), "replaying workload");
            return Ok((params, ops, WorkloadOrigin::Replayed));
        }

        let params = config.params;
        params.validate()?;
        if config.op_count > MAX_OP_COUNT {
            return Err(HarnessError::invalid(
                "op_count",
                format!("{} exceeds maximum {MAX_OP_COUNT}", config.op_count),
            ));
        }
        let mut rng = RandomSource::from_seed_or_entropy(config.seed);
        let ops = Generator::new(params).generate(config.op_count, &mut rng);
        if config.record {
            replay::save(&config.replay_file, &params, &ops)?;
            info!(path = %config.replay_file.display(), "recorded workload");
        }
        let origin = WorkloadOrigin::Generated {
            seed: rng.seed(),
            recorded: config.record,
        };
        Ok((params, ops, origin))
    }
}

fn replay_command(
    config: &HarnessConfig,
    params: &Params,
    origin: &WorkloadOrigin,
    subject: &str,
) -> Option<String> {
    let source = match origin {
        WorkloadOrigin::Replayed | WorkloadOrigin::Generated { recorded: true, .. } => {
            let file = config.replay_file.display().to_string();
            format!("-r 1 -f {}", shell_quote(&file))
        }
        WorkloadOrigin::Generated {
            seed: Some(seed),
            recorded: false,
        } => format!(
            "-k {} -q {} -v {} -m {} -l {} --seed {seed} --no-record",
            params.key_bits,
            params.quotient_bits,
            params.value_bits,
            params.initial_load_factor,
            config.op_count
        ),
        WorkloadOrigin::Generated {
            seed: None,
            recorded: false,
        } => return None,
    };

    let mut command = format!("{BIN_NAME} -d {} {source}", shell_quote(subject));
    if config.values == Some(ValueCheck::Exact) {
        command.push_str(" --exact-values");
    }
    match config.audit {
        Audit::Lookups => {}
        Audit::EveryOperation => command.push_str(" --audit every-op"),
        Audit::Universe => command.push_str(" --audit universe"),
    }
    Some(command)
}

/// Single-quote `arg` for a POSIX shell unless it is plainly safe.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::driver::DivergenceKind;
    use clap::Parser;

    fn expect_failure(result: Result<Report>) -> Box<Failure> {
        match result {
            Err(HarnessError::Divergence(failure)) => failure,
            Err(other) => panic!("expected divergence, got {other:?}"),
            Ok(report) => panic!("expected divergence, got success over {} ops", report.op_count),
        }
    }

    fn rerun(command: &str) -> Result<Report> {
        let cli = Cli::try_parse_from(command.split_whitespace()).unwrap();
        Harness::default().execute(&cli.into_config())
    }

    fn config_in(dir: &tempfile::TempDir) -> HarnessConfig {
        HarnessConfig {
            replay_file: dir.path().join("case.txt"),
            seed: Some(11),
            params: Params::new(10, 5, 6, 50),
            op_count: 400,
            ..Default::default()
        }
    }

    #[test]
    fn test_all_builtin_subjects_pass() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let report = Harness::default().execute(&config).unwrap();
        assert_eq!(report.results.len(), 3);
        assert!(report.results.iter().all(TestResult::passed));
        assert_eq!(report.op_count, 16 + 400);
        assert!(config.replay_file.exists());
    }

    #[test]
    fn test_recorded_workload_replays_identically() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        Harness::default().execute(&config).unwrap();

        let (params, ops) = replay::load(&config.replay_file).unwrap();
        assert_eq!(params, config.params);
        let mut rng = RandomSource::seeded(11);
        assert_eq!(ops, Generator::new(params).generate(400, &mut rng));

        let replay = HarnessConfig {
            replay: true,
            ..config
        };
        let report = Harness::default().execute(&replay).unwrap();
        assert_eq!(report.origin, WorkloadOrigin::Replayed);
        assert_eq!(report.op_count, ops.len());
    }

    #[test]
    fn test_unknown_subject_fails_before_recording() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            subject: "grhm".to_string(),
            ..config_in(&dir)
        };
        assert!(matches!(
            Harness::default().execute(&config),
            Err(HarnessError::UnknownSubject(_))
        ));
        assert!(!config.replay_file.exists());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            params: Params::new(16, 8, 8, 101),
            ..config_in(&dir)
        };
        assert!(matches!(
            Harness::default().execute(&config),
            Err(HarnessError::InvalidParameter { name: "initial_load_factor", .. })
        ));
    }

    #[test]
    fn test_forced_exact_values_fail_keyset() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            subject: "keyset".to_string(),
            values: Some(ValueCheck::Exact),
            params: Params::new(10, 5, 6, 100),
            ..config_in(&dir)
        };
        let failure = expect_failure(Harness::default().execute(&config));
        assert_eq!(failure.subject, "keyset");
        assert!(matches!(
            failure.divergence.kind,
            DivergenceKind::ValueMismatch { .. }
        ));
        let command = failure.replay_command.as_deref().unwrap();
        assert!(command.starts_with("mapcheck -d keyset -r 1 -f "), "{command}");
        assert!(command.ends_with("case.txt --exact-values"), "{command}");

        // the printed command alone reproduces the same divergence
        let again = expect_failure(rerun(command));
        assert_eq!(again.divergence, failure.divergence);
    }

    #[test]
    fn test_seeded_command_reproduces_audit_failure() {
        let config = HarnessConfig {
            subject: "keyset".to_string(),
            values: Some(ValueCheck::Exact),
            audit: Audit::Universe,
            record: false,
            seed: Some(3),
            params: Params::new(8, 4, 6, 100),
            op_count: 100,
            ..Default::default()
        };
        let failure = expect_failure(Harness::default().execute(&config));
        let command = failure.replay_command.as_deref().unwrap();
        assert_eq!(
            command,
            "mapcheck -d keyset -k 8 -q 4 -v 6 -m 100 -l 100 --seed 3 --no-record \
             --exact-values --audit universe"
        );
        let again = expect_failure(rerun(command));
        assert_eq!(again.divergence.op_index, failure.divergence.op_index);
        assert_eq!(again.divergence, failure.divergence);
    }

    #[test]
    fn test_replay_command_without_record_uses_seed() {
        let config = HarnessConfig {
            record: false,
            ..Default::default()
        };
        let origin = WorkloadOrigin::Generated {
            seed: Some(5),
            recorded: false,
        };
        assert_eq!(
            replay_command(&config, &config.params, &origin, "hashmap").unwrap(),
            "mapcheck -d hashmap -k 16 -q 8 -v 8 -m 50 -l 200 --seed 5 --no-record"
        );
        let unseeded = WorkloadOrigin::Generated {
            seed: None,
            recorded: false,
        };
        assert_eq!(replay_command(&config, &config.params, &unseeded, "hashmap"), None);
    }

    #[test]
    fn test_replay_command_mode_flags() {
        let config = HarnessConfig {
            audit: Audit::EveryOperation,
            replay_file: PathBuf::from("case.txt"),
            ..Default::default()
        };
        assert_eq!(
            replay_command(&config, &config.params, &WorkloadOrigin::Replayed, "bounded").unwrap(),
            "mapcheck -d bounded -r 1 -f case.txt --audit every-op"
        );
    }

    #[test]
    fn test_replay_command_quotes_path() {
        let config = HarnessConfig {
            replay_file: PathBuf::from("/tmp/my runs/it's.txt"),
            ..Default::default()
        };
        assert_eq!(
            replay_command(&config, &config.params, &WorkloadOrigin::Replayed, "hashmap").unwrap(),
            "mapcheck -d hashmap -r 1 -f '/tmp/my runs/it'\\''s.txt'"
        );
        assert_eq!(shell_quote("test_case.txt"), "test_case.txt");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_op_count_over_limit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            op_count: u64::MAX,
            ..config_in(&dir)
        };
        let err = Harness::default().execute(&config).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::InvalidParameter { name: "op_count", .. }
        ));
        assert_eq!(err.exit_code(), 2);
        assert!(!config.replay_file.exists());
    }

    fn sample_failure(replay_command: Option<&str>, total_divergences: usize) -> Failure {
        Failure {
            subject: "bounded".to_string(),
            divergence: Divergence {
                op_index: 12,
                op: Operation::lookup(0x2a),
                key: 0x2a,
                kind: DivergenceKind::MissingKey { expected: 7 },
            },
            total_divergences,
            replay_command: replay_command.map(str::to_string),
        }
    }

    #[test]
    fn test_failure_display_with_command() {
        let failure = sample_failure(Some("mapcheck -d bounded -r 1 -f test_case.txt"), 1);
        let text = failure.to_string();
        assert!(text.starts_with("bounded diverged at op 12 "), "{text}");
        assert!(
            text.ends_with(". Replay this test case with mapcheck -d bounded -r 1 -f test_case.txt"),
            "{text}"
        );
        assert_eq!(
            HarnessError::Divergence(Box::new(failure)).to_string(),
            text
        );
    }

    #[test]
    fn test_failure_display_without_command() {
        let text = sample_failure(None, 3).to_string();
        assert!(text.contains(" (+2 more)"), "{text}");
        assert!(text.ends_with(". Workload was not recorded and cannot be replayed"));
        assert!(!text.contains("Replay this test case"));
    }
}
