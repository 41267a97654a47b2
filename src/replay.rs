//! Replay log codec.
//!
//! A replay log pairs an operation sequence with the structural parameters it
//! was generated under. The format is line-oriented text:
//!
//! ```text
//! mapcheck-replay v1
//! params key_bits=16 quotient_bits=8 value_bits=8 load_factor=50
//! ops 3
//! I 2a 7
//! L 2a 0
//! D 2a 0
//! checksum <sha256 over every preceding line, newline included>
//! ```
//!
//! Keys and values are lowercase hex without prefix. Decoding is strict: any
//! deviation is reported with its line number rather than skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::op::{OpKind, Operation};
use crate::params::Params;

/// Magic first line; the trailing token is the format version.
pub const MAGIC: &str = "mapcheck-replay";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Upper bound on up-front allocation while decoding untrusted input.
const MAX_PREALLOC: usize = 1 << 16;

/// A decode failure, positioned at a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub line: usize,
    pub reason: String,
}

impl DecodeError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }

    fn into_harness(self, path: &Path) -> HarnessError {
        HarnessError::CorruptLog {
            path: path.to_path_buf(),
            line: self.line,
            reason: self.reason,
        }
    }
}

/// Writes lines while hashing them.
struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn line(&mut self, text: &str) -> std::io::Result<()> {
        self.hasher.update(text.as_bytes());
        self.hasher.update(b"\n");
        self.inner.write_all(text.as_bytes())?;
        self.inner.write_all(b"\n")
    }

    fn finish(mut self) -> std::io::Result<W> {
        let digest = hex::encode(self.hasher.finalize());
        writeln!(self.inner, "checksum {digest}")?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Serialize `params` and `ops` to `writer`.
pub fn encode<W: Write>(writer: W, params: &Params, ops: &[Operation]) -> std::io::Result<W> {
    let mut out = HashingWriter {
        inner: writer,
        hasher: Sha256::new(),
    };
    out.line(&format!("{MAGIC} v{FORMAT_VERSION}"))?;
    out.line(&format!("params {params}"))?;
    out.line(&format!("ops {}", ops.len()))?;
    for op in ops {
        out.line(&format!("{} {:x} {:x}", op.kind.tag(), op.key, op.value))?;
    }
    out.finish()
}

/// Parse a replay log from `reader`.
pub fn decode<R: BufRead>(reader: R) -> std::result::Result<(Params, Vec<Operation>), DecodeError> {
    let mut hasher = Sha256::new();
    let mut lines = reader.lines().enumerate().map(|(idx, line)| {
        let number = idx + 1;
        line.map(|text| (number, text))
            .map_err(|e| DecodeError::new(number, format!("unreadable line: {e}")))
    });
    let mut next_line = |what: &str, last: usize| -> std::result::Result<(usize, String), DecodeError> {
        match lines.next() {
            Some(line) => line,
            None => Err(DecodeError::new(last + 1, format!("unexpected end of log, expected {what}"))),
        }
    };

    let (n, magic) = next_line("header", 0)?;
    parse_magic(&magic).map_err(|reason| DecodeError::new(n, reason))?;
    absorb(&mut hasher, &magic);

    let (n, header) = next_line("params", n)?;
    let params = parse_params(&header).map_err(|reason| DecodeError::new(n, reason))?;
    params
        .validate()
        .map_err(|e| DecodeError::new(n, e.to_string()))?;
    absorb(&mut hasher, &header);

    let (n, count_line) = next_line("op count", n)?;
    let count = parse_count(&count_line).map_err(|reason| DecodeError::new(n, reason))?;
    absorb(&mut hasher, &count_line);

    let mut ops = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut last = n;
    for _ in 0..count {
        let (n, record) = next_line("operation", last)?;
        let op = parse_op(&record, &params).map_err(|reason| DecodeError::new(n, reason))?;
        absorb(&mut hasher, &record);
        ops.push(op);
        last = n;
    }

    let (n, trailer) = next_line("checksum", last)?;
    let Some(recorded) = trailer.strip_prefix("checksum ") else {
        return Err(DecodeError::new(n, format!("expected checksum, found {trailer:?}")));
    };
    let computed = hex::encode(hasher.finalize());
    if recorded != computed {
        return Err(DecodeError::new(
            n,
            format!("checksum mismatch: recorded {recorded}, computed {computed}"),
        ));
    }

    for rest in lines {
        let (n, text) = rest?;
        if !text.trim().is_empty() {
            return Err(DecodeError::new(n, "trailing data after checksum"));
        }
    }

    Ok((params, ops))
}

fn absorb(hasher: &mut Sha256, line: &str) {
    hasher.update(line.as_bytes());
    hasher.update(b"\n");
}

fn parse_magic(line: &str) -> std::result::Result<(), String> {
    let version = line
        .strip_prefix(MAGIC)
        .and_then(|rest| rest.strip_prefix(" v"))
        .ok_or_else(|| format!("not a replay log (header {line:?})"))?;
    match version.parse::<u32>() {
        Ok(FORMAT_VERSION) => Ok(()),
        Ok(other) => Err(format!("unsupported format version {other}")),
        Err(_) => Err(format!("malformed version {version:?}")),
    }
}

fn parse_params(line: &str) -> std::result::Result<Params, String> {
    let rest = line
        .strip_prefix("params ")
        .ok_or_else(|| format!("expected params, found {line:?}"))?;
    let fields: Vec<&str> = rest.split(' ').collect();
    let names = ["key_bits", "quotient_bits", "value_bits", "load_factor"];
    if fields.len() != names.len() {
        return Err(format!("expected {} params, found {}", names.len(), fields.len()));
    }
    let mut values = [0u32; 4];
    for ((field, name), slot) in fields.iter().zip(names).zip(values.iter_mut()) {
        let raw = field
            .strip_prefix(name)
            .and_then(|s| s.strip_prefix('='))
            .ok_or_else(|| format!("expected {name}=<n>, found {field:?}"))?;
        *slot = parse_decimal(raw).ok_or_else(|| format!("bad {name} value {raw:?}"))?;
    }
    Ok(Params::new(values[0], values[1], values[2], values[3]))
}

fn parse_count(line: &str) -> std::result::Result<usize, String> {
    let raw = line
        .strip_prefix("ops ")
        .ok_or_else(|| format!("expected op count, found {line:?}"))?;
    parse_decimal(raw).ok_or_else(|| format!("bad op count {raw:?}"))
}

fn parse_op(line: &str, params: &Params) -> std::result::Result<Operation, String> {
    let mut parts = line.split(' ');
    let (Some(tag), Some(key), Some(value), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("malformed operation {line:?}"));
    };
    let kind = OpKind::from_tag(tag).ok_or_else(|| format!("unknown operation tag {tag:?}"))?;
    let key = parse_hex(key).ok_or_else(|| format!("bad key {key:?}"))?;
    let value = parse_hex(value).ok_or_else(|| format!("bad value {value:?}"))?;
    if !params.key_fits(key) {
        return Err(format!("key {key:#x} exceeds {} bits", params.key_bits));
    }
    if !params.value_fits(value) {
        return Err(format!("value {value:#x} exceeds {} bits", params.value_bits));
    }
    Ok(Operation::new(kind, key, value))
}

fn parse_decimal<T: std::str::FromStr>(raw: &str) -> Option<T> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn parse_hex(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return None;
    }
    u64::from_str_radix(raw, 16).ok()
}

/// Write a replay log to `path`, replacing any existing file.
pub fn save(path: impl AsRef<Path>, params: &Params, ops: &[Operation]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    encode(BufWriter::new(file), params, ops)?;
    debug!(path = %path.display(), ops = ops.len(), "saved replay log");
    Ok(())
}

/// Read a replay log from `path`.
pub fn load(path: impl AsRef<Path>) -> Result<(Params, Vec<Operation>)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let (params, ops) = decode(BufReader::new(file)).map_err(|e| e.into_harness(path))?;
    debug!(path = %path.display(), ops = ops.len(), %params, "loaded replay log");
    Ok((params, ops))
}

/// Structural parameters explicitly declared by the caller, checked against
/// a log header. `None` fields are taken from the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeclaredParams {
    pub key_bits: Option<u32>,
    pub quotient_bits: Option<u32>,
    pub value_bits: Option<u32>,
}

/// Read a replay log and reject it if its header disagrees with `declared`.
pub fn load_checked(
    path: impl AsRef<Path>,
    declared: &DeclaredParams,
) -> Result<(Params, Vec<Operation>)> {
    let path = path.as_ref();
    let (params, ops) = load(path)?;
    let checks = [
        ("key_bits", declared.key_bits, params.key_bits),
        ("quotient_bits", declared.quotient_bits, params.quotient_bits),
        ("value_bits", declared.value_bits, params.value_bits),
    ];
    for (name, want, found) in checks {
        if let Some(want) = want {
            if want != found {
                return Err(HarnessError::CorruptLog {
                    path: path.to_path_buf(),
                    line: 2,
                    reason: format!("header {name}={found} disagrees with declared {want}"),
                });
            }
        }
    }
    Ok((params, ops))
}
