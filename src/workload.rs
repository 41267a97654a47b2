//! Randomized workload generation.
//!
//! A workload is a prefill of `Params::prefill_count` inserts followed by a
//! uniform mix of Insert/Delete/Lookup steps. Keys for the mixed steps are
//! biased toward realistic hit, miss and resurrection patterns by tracking a
//! shadow live set and a shadow tombstone set.

use std::collections::HashMap;

use rand::Rng;
use tracing::debug;

use crate::op::{OpKind, Operation};
use crate::params::Params;

/// Largest number of mixed operations a single workload may request.
pub const MAX_OP_COUNT: u64 = 1 << 32;

/// Cap on the up-front reservation; longer workloads grow the vector.
const MAX_PREALLOC: usize = 1 << 16;

/// Relative weights of the three key-selection strategies.
///
/// The default (2:1:1) picks an existing key half the time, a deleted key a
/// quarter of the time and a fresh key otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyMix {
    /// Draw uniformly from keys believed present.
    pub live: u32,
    /// Draw uniformly from keys believed deleted.
    pub tombstone: u32,
    /// Draw a new random key.
    pub fresh: u32,
}

impl Default for KeyMix {
    fn default() -> Self {
        Self {
            live: 2,
            tombstone: 1,
            fresh: 1,
        }
    }
}

impl KeyMix {
    fn total(&self) -> u64 {
        u64::from(self.live) + u64::from(self.tombstone) + u64::from(self.fresh)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeySource {
    Live,
    Tombstone,
    Fresh,
}

/// Set of keys supporting O(1) insert, remove and uniform choice.
#[derive(Debug, Default)]
struct KeyPool {
    keys: Vec<u64>,
    positions: HashMap<u64, usize>,
}

impl KeyPool {
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn insert(&mut self, key: u64) -> bool {
        if self.positions.contains_key(&key) {
            return false;
        }
        self.positions.insert(key, self.keys.len());
        self.keys.push(key);
        true
    }

    fn remove(&mut self, key: u64) -> bool {
        let Some(idx) = self.positions.remove(&key) else {
            return false;
        };
        self.keys.swap_remove(idx);
        if let Some(&moved) = self.keys.get(idx) {
            self.positions.insert(moved, idx);
        }
        true
    }

    fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u64> {
        if self.keys.is_empty() {
            None
        } else {
            Some(self.keys[rng.gen_range(0..self.keys.len())])
        }
    }
}

/// Workload generator bound to one set of structural parameters.
#[derive(Clone, Debug)]
pub struct Generator {
    params: Params,
    mix: KeyMix,
}

impl Generator {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            mix: KeyMix::default(),
        }
    }

    pub fn with_key_mix(mut self, mix: KeyMix) -> Self {
        self.mix = mix;
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn key_mix(&self) -> KeyMix {
        self.mix
    }

    /// Produce the prefill followed by `op_count` mixed operations.
    ///
    /// Inserts are emitted even once the live set exceeds nominal capacity;
    /// how a subject handles being full is part of what gets tested.
    pub fn generate<R: Rng + ?Sized>(&self, op_count: u64, rng: &mut R) -> Vec<Operation> {
        let prefill = self.params.prefill_count();
        let mut ops = Vec::with_capacity(reservation(prefill, op_count));
        let mut live = KeyPool::default();
        let mut tombstones = KeyPool::default();

        for _ in 0..prefill {
            let op = Operation::truncated(OpKind::Insert, rng.gen(), rng.gen(), &self.params);
            live.insert(op.key);
            ops.push(op);
        }

        for _ in 0..op_count {
            let kind = OpKind::ALL[rng.gen_range(0..OpKind::ALL.len())];
            let key = match self.pick_source(rng, &live, &tombstones) {
                KeySource::Live => live.choose(rng),
                KeySource::Tombstone => tombstones.choose(rng),
                KeySource::Fresh => None,
            }
            .unwrap_or_else(|| rng.gen::<u64>() & self.params.key_mask());
            let value = rng.gen::<u64>() & self.params.value_mask();

            match kind {
                OpKind::Insert => {
                    live.insert(key);
                    tombstones.remove(key);
                }
                OpKind::Delete => {
                    if live.remove(key) {
                        tombstones.insert(key);
                    }
                }
                OpKind::Lookup => {}
            }
            ops.push(Operation::new(kind, key, value));
        }

        debug!(
            prefill,
            mixed = op_count,
            live = live.len(),
            tombstones = tombstones.len(),
            "generated workload"
        );
        ops
    }

    fn pick_source<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        live: &KeyPool,
        tombstones: &KeyPool,
    ) -> KeySource {
        let total = self.mix.total();
        if total == 0 {
            return KeySource::Fresh;
        }
        let roll = rng.gen_range(0..total);
        let source = if roll < u64::from(self.mix.live) {
            KeySource::Live
        } else if roll < u64::from(self.mix.live) + u64::from(self.mix.tombstone) {
            KeySource::Tombstone
        } else {
            KeySource::Fresh
        };
        match source {
            KeySource::Live if live.is_empty() => KeySource::Fresh,
            KeySource::Tombstone if tombstones.is_empty() => KeySource::Fresh,
            other => other,
        }
    }
}

/// Generate a workload with the default key mix.
pub fn generate<R: Rng + ?Sized>(params: &Params, op_count: u64, rng: &mut R) -> Vec<Operation> {
    Generator::new(*params).generate(op_count, rng)
}

fn reservation(prefill: u64, op_count: u64) -> usize {
    usize::try_from(prefill.saturating_add(op_count))
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_prefill_is_leading_inserts() {
        let params = Params::new(16, 6, 8, 75);
        let ops = generate(&params, 0, &mut rng(1));
        assert_eq!(ops.len() as u64, params.prefill_count());
        assert_eq!(ops.len(), 48);
        assert!(ops.iter().all(|op| op.kind == OpKind::Insert));
    }

    #[test]
    fn test_reservation_is_capped() {
        assert_eq!(reservation(16, 300), 316);
        assert_eq!(reservation(1 << 32, u64::MAX), MAX_PREALLOC);
        assert_eq!(reservation(0, MAX_OP_COUNT), MAX_PREALLOC);
    }

    #[test]
    fn test_total_length() {
        let params = Params::new(12, 5, 4, 50);
        let ops = generate(&params, 300, &mut rng(2));
        assert_eq!(ops.len(), 16 + 300);
    }

    #[test]
    fn test_same_seed_same_workload() {
        let params = Params::default();
        let a = generate(&params, 500, &mut rng(99));
        let b = generate(&params, 500, &mut rng(99));
        assert_eq!(a, b);
        let c = generate(&params, 500, &mut rng(100));
        assert_ne!(a, c);
    }

    #[test]
    fn test_all_kinds_emitted() {
        let params = Params::new(10, 4, 4, 50);
        let ops = generate(&params, 600, &mut rng(3));
        let kinds: HashSet<OpKind> = ops.iter().map(|op| op.kind).collect();
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn test_fresh_only_mix() {
        let params = Params::new(64, 0, 64, 0);
        let mix = KeyMix {
            live: 0,
            tombstone: 0,
            fresh: 1,
        };
        let ops = Generator::new(params).with_key_mix(mix).generate(200, &mut rng(4));
        let distinct: HashSet<u64> = ops.iter().map(|op| op.key).collect();
        // 64-bit fresh draws essentially never collide
        assert_eq!(distinct.len(), ops.len());
    }

    #[test]
    fn test_live_only_mix_falls_back_to_fresh_when_empty() {
        let params = Params::new(32, 4, 8, 0);
        let mix = KeyMix {
            live: 1,
            tombstone: 0,
            fresh: 0,
        };
        let ops = Generator::new(params).with_key_mix(mix).generate(50, &mut rng(5));
        assert_eq!(ops.len(), 50);
        assert!(ops.iter().all(|op| params.key_fits(op.key)));
    }

    #[test]
    fn test_live_draws_are_not_degenerate() {
        // Only existing keys after the prefill: a uniform draw must touch
        // many distinct prefilled keys, not just the first one.
        let params = Params::new(32, 6, 8, 100);
        let mix = KeyMix {
            live: 1,
            tombstone: 0,
            fresh: 0,
        };
        let ops = Generator::new(params).with_key_mix(mix).generate(400, &mut rng(6));
        let prefill = params.prefill_count() as usize;
        let lookups: HashSet<u64> = ops[prefill..]
            .iter()
            .filter(|op| op.kind == OpKind::Lookup)
            .map(|op| op.key)
            .collect();
        assert!(lookups.len() > 10, "only {} distinct keys drawn", lookups.len());
    }

    #[test]
    fn test_tombstones_get_resurrected() {
        let params = Params::new(16, 4, 8, 100);
        let ops = generate(&params, 2000, &mut rng(7));
        let mut deleted = HashSet::new();
        let mut live: HashSet<u64> = HashSet::new();
        let mut resurrected = 0;
        for op in &ops {
            match op.kind {
                OpKind::Delete => {
                    if live.remove(&op.key) {
                        deleted.insert(op.key);
                    }
                }
                OpKind::Insert => {
                    if deleted.remove(&op.key) {
                        resurrected += 1;
                    }
                    live.insert(op.key);
                }
                OpKind::Lookup => {}
            }
        }
        assert!(resurrected > 0);
    }

    #[test]
    fn test_key_pool_swap_remove() {
        let mut pool = KeyPool::default();
        assert!(pool.insert(1));
        assert!(pool.insert(2));
        assert!(pool.insert(3));
        assert!(!pool.insert(2));
        assert!(pool.remove(1));
        assert!(!pool.remove(1));
        assert_eq!(pool.len(), 2);
        assert!(pool.remove(3));
        assert!(pool.remove(2));
        assert!(pool.is_empty());
    }
}
