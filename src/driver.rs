//! Oracle-comparison test driver.
//!
//! The driver feeds an operation sequence to one subject while mirroring every
//! accepted mutation into an [`Oracle`], and compares the two after each
//! lookup (and, depending on [`Audit`], after every mutation).

use std::fmt;

use tracing::{debug, trace, warn};

use crate::error::{HarnessError, Result, SubjectError};
use crate::op::{OpKind, Operation};
use crate::oracle::Oracle;
use crate::params::Params;
use crate::subject::{Subject, SubjectSession};

/// Widest key space [`Audit::Universe`] will sweep.
pub const MAX_UNIVERSE_BITS: u32 = 16;

/// Whether successful lookups must also return the oracle's value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueCheck {
    #[default]
    Exact,
    /// Only presence is compared.
    ExistenceOnly,
}

/// What to do after the first divergence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailureMode {
    #[default]
    FailFast,
    /// Keep going and collect every divergence.
    CollectAll,
}

/// How much state to compare beyond explicit lookups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Audit {
    /// Compare only on Lookup operations.
    #[default]
    Lookups,
    /// Also compare the touched key after every Insert and Delete.
    EveryOperation,
    /// Sweep the entire key universe after every Insert and Delete.
    /// Falls back to `EveryOperation` above [`MAX_UNIVERSE_BITS`].
    Universe,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub values: ValueCheck,
    pub failure: FailureMode,
    pub audit: Audit,
}

/// Nature of a subject/oracle disagreement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DivergenceKind {
    /// Subject reports a key the oracle does not hold.
    PhantomKey { actual: u64 },
    /// Subject lost a key the oracle holds.
    MissingKey { expected: u64 },
    /// Both hold the key with different values.
    ValueMismatch { expected: u64, actual: u64 },
    /// Remove's presence report disagrees with the oracle.
    RemoveMismatch {
        oracle_present: bool,
        subject_present: bool,
    },
}

/// A single observed disagreement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Divergence {
    /// Index into the operation sequence of the operation just applied.
    pub op_index: usize,
    pub op: Operation,
    /// Key that disagreed. Differs from `op.key` only for universe sweeps.
    pub key: u64,
    pub kind: DivergenceKind,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op {} ({}): key {:#x} ", self.op_index, self.op, self.key)?;
        match self.kind {
            DivergenceKind::PhantomKey { actual } => {
                write!(f, "should not exist (expected absent, actual {actual:#x})")
            }
            DivergenceKind::MissingKey { expected } => {
                write!(f, "should exist (expected {expected:#x}, actual absent)")
            }
            DivergenceKind::ValueMismatch { expected, actual } => {
                write!(f, "has wrong value (expected {expected:#x}, actual {actual:#x})")
            }
            DivergenceKind::RemoveMismatch {
                oracle_present,
                subject_present,
            } => write!(
                f,
                "remove presence disagrees (expected {oracle_present}, actual {subject_present})"
            ),
        }
    }
}

/// Operation tallies for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpCounts {
    pub inserts: u64,
    pub deletes: u64,
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    /// Inserts refused with [`SubjectError::CapacityExceeded`].
    pub rejected_inserts: u64,
}

impl OpCounts {
    pub fn hit_rate(self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Outcome of driving one subject over one sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct TestResult {
    pub label: String,
    pub ops_applied: usize,
    pub counts: OpCounts,
    pub divergences: Vec<Divergence>,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.divergences.is_empty()
    }

    pub fn first_divergence(&self) -> Option<&Divergence> {
        self.divergences.first()
    }
}

/// Drives subjects against an oracle under fixed parameters and options.
#[derive(Clone, Debug)]
pub struct Driver {
    params: Params,
    options: RunOptions,
    label: String,
}

impl Driver {
    pub fn new(params: Params, options: RunOptions) -> Self {
        Self {
            params,
            options,
            label: "subject".to_string(),
        }
    }

    /// Name reported in results and errors.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Run `ops` against `subject`.
    ///
    /// `init` is called with `params.capacity()` and `destroy` is guaranteed
    /// on every exit path. Divergences land in the returned [`TestResult`];
    /// `Err` is reserved for subject failures other than a capacity refusal.
    pub fn run<S: Subject + ?Sized>(&self, subject: &mut S, ops: &[Operation]) -> Result<TestResult> {
        let params = &self.params;
        let mut session = SubjectSession::open(
            subject,
            params.capacity(),
            params.key_bits,
            params.value_bits,
        )
        .map_err(|source| self.subject_error(source))?;

        let audit = self.effective_audit();
        let mut oracle = Oracle::new();
        let mut result = TestResult {
            label: self.label.clone(),
            ops_applied: 0,
            counts: OpCounts::default(),
            divergences: Vec::new(),
        };

        debug!(subject = %self.label, ops = ops.len(), %params, ?audit, "driving subject");

        for (idx, op) in ops.iter().enumerate() {
            trace!(idx, %op, "apply");
            let mut found = Vec::new();

            match op.kind {
                OpKind::Insert => {
                    result.counts.inserts += 1;
                    match session.insert(op.key, op.value) {
                        Ok(()) => oracle.put(op.key, op.value),
                        Err(SubjectError::CapacityExceeded { capacity }) => {
                            result.counts.rejected_inserts += 1;
                            trace!(idx, key = op.key, capacity, "insert rejected");
                        }
                        Err(source) => return Err(self.subject_error(source)),
                    }
                }
                OpKind::Delete => {
                    result.counts.deletes += 1;
                    let subject_present = session
                        .remove(op.key)
                        .map_err(|source| self.subject_error(source))?;
                    let oracle_present = oracle.erase(op.key);
                    if subject_present != oracle_present {
                        found.push(Divergence {
                            op_index: idx,
                            op: *op,
                            key: op.key,
                            kind: DivergenceKind::RemoveMismatch {
                                oracle_present,
                                subject_present,
                            },
                        });
                    }
                }
                OpKind::Lookup => {
                    result.counts.lookups += 1;
                    let actual = session.lookup(op.key);
                    if actual.is_some() {
                        result.counts.hits += 1;
                    } else {
                        result.counts.misses += 1;
                    }
                    found.extend(self.compare(idx, op, op.key, oracle.get(op.key), actual));
                }
            }

            if op.kind.is_mutation() {
                match audit {
                    Audit::Lookups => {}
                    Audit::EveryOperation => {
                        let actual = session.lookup(op.key);
                        found.extend(self.compare(idx, op, op.key, oracle.get(op.key), actual));
                    }
                    Audit::Universe => {
                        for key in 0..=params.key_mask() {
                            let actual = session.lookup(key);
                            found.extend(self.compare(idx, op, key, oracle.get(key), actual));
                        }
                    }
                }
            }

            result.ops_applied = idx + 1;
            if !found.is_empty() {
                for divergence in &found {
                    warn!(subject = %self.label, %divergence, "divergence");
                }
                result.divergences.append(&mut found);
                if self.options.failure == FailureMode::FailFast {
                    break;
                }
            }
        }

        drop(session);
        debug!(
            subject = %self.label,
            applied = result.ops_applied,
            divergences = result.divergences.len(),
            rejected = result.counts.rejected_inserts,
            "subject finished"
        );
        Ok(result)
    }

    fn effective_audit(&self) -> Audit {
        match self.options.audit {
            Audit::Universe if self.params.key_bits > MAX_UNIVERSE_BITS => {
                warn!(
                    key_bits = self.params.key_bits,
                    max = MAX_UNIVERSE_BITS,
                    "key space too wide for universe sweep, auditing touched keys only"
                );
                Audit::EveryOperation
            }
            other => other,
        }
    }

    fn compare(
        &self,
        op_index: usize,
        op: &Operation,
        key: u64,
        expected: Option<u64>,
        actual: Option<u64>,
    ) -> Option<Divergence> {
        let kind = match (expected, actual) {
            (None, None) => return None,
            (None, Some(actual)) => DivergenceKind::PhantomKey { actual },
            (Some(expected), None) => DivergenceKind::MissingKey { expected },
            (Some(expected), Some(actual)) => {
                if self.options.values == ValueCheck::ExistenceOnly || expected == actual {
                    return None;
                }
                DivergenceKind::ValueMismatch { expected, actual }
            }
        };
        Some(Divergence {
            op_index,
            op: *op,
            key,
            kind,
        })
    }

    fn subject_error(&self, source: SubjectError) -> HarnessError {
        HarnessError::Subject {
            subject: self.label.clone(),
            source,
        }
    }
}

/// Drive `subject` over `ops` with the given options.
pub fn run<S: Subject + ?Sized>(
    subject: &mut S,
    params: &Params,
    ops: &[Operation],
    options: RunOptions,
) -> Result<TestResult> {
    Driver::new(*params, options).run(subject, ops)
}
