//! Reference model used as ground truth.

use std::collections::BTreeMap;

/// Ordered key→value mapping with no capacity limit and no eviction.
///
/// `BTreeMap` keeps iteration deterministic so divergence reports and
/// universe sweeps are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Oracle {
    state: BTreeMap<u64, u64>,
}

impl Oracle {
    pub fn new() -> Self {
        Self {
            state: BTreeMap::new(),
        }
    }

    /// Insert or overwrite.
    pub fn put(&mut self, key: u64, value: u64) {
        self.state.insert(key, value);
    }

    /// Remove `key`, reporting whether it was present.
    pub fn erase(&mut self, key: u64) -> bool {
        self.state.remove(&key).is_some()
    }

    pub fn get(&self, key: u64) -> Option<u64> {
        self.state.get(&key).copied()
    }

    pub fn contains(&self, key: u64) -> bool {
        self.state.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.state.iter().map(|(k, v)| (*k, *v))
    }

    pub fn clear(&mut self) {
        self.state.clear();
    }
}
