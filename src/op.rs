//! Operation model.

use std::fmt;

use crate::params::Params;

/// Kind of a map operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Insert,
    Delete,
    Lookup,
}

impl OpKind {
    pub const ALL: [OpKind; 3] = [OpKind::Insert, OpKind::Delete, OpKind::Lookup];

    /// Single-letter tag used by the replay format.
    pub const fn tag(self) -> char {
        match self {
            OpKind::Insert => 'I',
            OpKind::Delete => 'D',
            OpKind::Lookup => 'L',
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "I" => Some(OpKind::Insert),
            "D" => Some(OpKind::Delete),
            "L" => Some(OpKind::Lookup),
            _ => None,
        }
    }

    pub const fn is_mutation(self) -> bool {
        !matches!(self, OpKind::Lookup)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Insert => "insert",
            OpKind::Delete => "delete",
            OpKind::Lookup => "lookup",
        };
        f.write_str(name)
    }
}

/// A single map operation. Delete and Lookup carry a value too; it is
/// recorded for replay fidelity but ignored by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Operation {
    pub kind: OpKind,
    pub key: u64,
    pub value: u64,
}

impl Operation {
    pub const fn new(kind: OpKind, key: u64, value: u64) -> Self {
        Self { kind, key, value }
    }

    pub const fn insert(key: u64, value: u64) -> Self {
        Self::new(OpKind::Insert, key, value)
    }

    pub const fn delete(key: u64) -> Self {
        Self::new(OpKind::Delete, key, 0)
    }

    pub const fn lookup(key: u64) -> Self {
        Self::new(OpKind::Lookup, key, 0)
    }

    /// Build an operation from raw draws, masking key and value to the
    /// configured widths.
    pub fn truncated(kind: OpKind, raw_key: u64, raw_value: u64, params: &Params) -> Self {
        Self::new(kind, raw_key & params.key_mask(), raw_value & params.value_mask())
    }

    /// Whether key and value both fit the given widths.
    pub fn fits(&self, params: &Params) -> bool {
        params.key_fits(self.key) && params.value_fits(self.value)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} key={:#x} value={:#x}", self.kind, self.key, self.value)
    }
}
