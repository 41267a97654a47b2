#![no_main]

use libfuzzer_sys::fuzz_target;
use mapcheck::{run, Audit, OpKind, Operation, Params, RunOptions, StdHashMap};

/// Drive the std HashMap subject with arbitrary op streams.
/// A correct subject must never diverge from the oracle.
fuzz_target!(|data: &[u8]| {
    let params = Params::new(8, 4, 8, 0);
    let ops: Vec<Operation> = data
        .chunks_exact(3)
        .map(|chunk| {
            let kind = OpKind::ALL[usize::from(chunk[0]) % OpKind::ALL.len()];
            Operation::truncated(kind, u64::from(chunk[1]), u64::from(chunk[2]), &params)
        })
        .collect();

    let options = RunOptions {
        audit: Audit::EveryOperation,
        ..Default::default()
    };
    let result = run(&mut StdHashMap::new(), &params, &ops, options).unwrap();
    assert!(result.passed(), "{:?}", result.first_divergence());
});
