#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use mapcheck::replay::{decode, encode};

/// Fuzz the replay decoder with arbitrary bytes.
/// Anything it accepts must re-encode to a log that decodes identically.
fuzz_target!(|data: &[u8]| {
    if let Ok((params, ops)) = decode(Cursor::new(data)) {
        assert!(ops.iter().all(|op| op.fits(&params)));
        let bytes = encode(Vec::new(), &params, &ops).unwrap();
        let again = decode(Cursor::new(bytes)).unwrap();
        assert_eq!(again, (params, ops));
    }
});
