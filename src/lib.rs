//! # mapcheck
//!
//! Differential correctness harness for hash-map implementations.
//!
//! Candidate maps ("subjects") are driven through randomized or replayed
//! Insert/Delete/Lookup sequences while a reference [`Oracle`] shadows every
//! accepted mutation. The first disagreement is reported together with the
//! command that replays it.
//!
//! ## Pieces
//!
//! - [`Operation`] and [`Params`]: the operation model and the structural
//!   parameters (key width, capacity bits, value width, load factor)
//! - [`Generator`]: workload generation biased toward hits, misses and
//!   resurrected keys
//! - [`replay`]: the versioned, checksummed replay log
//! - [`Subject`]: the five-operation capability interface
//! - [`Driver`]: lockstep oracle comparison
//! - [`Harness`]: subject selection, workload sourcing and reporting
//!
//! ## Example
//!
//! ```
//! use mapcheck::{generate, run, Params, RandomSource, RunOptions, StdHashMap};
//!
//! let params = Params::new(8, 4, 4, 50);
//! let mut rng = RandomSource::seeded(1);
//! let ops = generate(&params, 1000, &mut rng);
//! let result = run(&mut StdHashMap::new(), &params, &ops, RunOptions::default()).unwrap();
//! assert!(result.passed());
//! ```

pub mod cli;
mod context;
mod driver;
mod error;
mod harness;
mod op;
mod oracle;
mod params;
mod registry;
pub mod replay;
mod subject;
mod subjects;
mod workload;

pub use context::RandomSource;
pub use driver::{
    run, Audit, Divergence, DivergenceKind, Driver, FailureMode, OpCounts, RunOptions, TestResult,
    ValueCheck, MAX_UNIVERSE_BITS,
};
pub use error::{HarnessError, Result, SubjectError};
pub use harness::{
    Failure, Harness, HarnessConfig, Report, WorkloadOrigin, BIN_NAME, DEFAULT_REPLAY_FILE,
};
pub use op::{OpKind, Operation};
pub use oracle::Oracle;
pub use params::{bitmask, Params, MAX_QUOTIENT_BITS};
pub use registry::{SubjectEntry, SubjectFactory, SubjectRegistry, ALL};
pub use replay::{load, load_checked, save, DeclaredParams};
pub use subject::{Subject, SubjectSession};
pub use subjects::{BoundedHashMap, KeySet, StdHashMap};
pub use workload::{generate, Generator, KeyMix, MAX_OP_COUNT};
