//! Built-in subjects: thin adapters over standard-library collections.
//!
//! These give the registry something to run out of the box and serve as
//! controls when wiring up a new implementation.

use std::collections::{HashMap, HashSet};

use crate::error::SubjectError;
use crate::subject::Subject;

/// Lifecycle of a subject's backing storage.
#[derive(Debug, Default)]
enum Lifecycle<T> {
    #[default]
    Fresh,
    Live(T),
    Destroyed,
}

impl<T> Lifecycle<T> {
    fn start(&mut self, storage: T) -> Result<(), SubjectError> {
        match self {
            Lifecycle::Fresh => {
                *self = Lifecycle::Live(storage);
                Ok(())
            }
            Lifecycle::Live(_) => Err(SubjectError::AlreadyInitialized),
            Lifecycle::Destroyed => Err(SubjectError::NotInitialized),
        }
    }

    fn live(&self) -> Option<&T> {
        match self {
            Lifecycle::Live(storage) => Some(storage),
            _ => None,
        }
    }

    fn live_mut(&mut self) -> Result<&mut T, SubjectError> {
        match self {
            Lifecycle::Live(storage) => Ok(storage),
            _ => Err(SubjectError::NotInitialized),
        }
    }

    fn end(&mut self) {
        *self = Lifecycle::Destroyed;
    }
}

/// Unbounded `std::collections::HashMap`.
#[derive(Debug, Default)]
pub struct StdHashMap {
    map: Lifecycle<HashMap<u64, u64>>,
}

impl StdHashMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Subject for StdHashMap {
    fn init(&mut self, capacity: u64, _key_bits: u32, _value_bits: u32) -> Result<(), SubjectError> {
        let reserve = usize::try_from(capacity).unwrap_or(usize::MAX).min(1 << 20);
        self.map.start(HashMap::with_capacity(reserve))
    }

    fn insert(&mut self, key: u64, value: u64) -> Result<(), SubjectError> {
        self.map.live_mut()?.insert(key, value);
        Ok(())
    }

    fn remove(&mut self, key: u64) -> Result<bool, SubjectError> {
        Ok(self.map.live_mut()?.remove(&key).is_some())
    }

    fn lookup(&self, key: u64) -> Option<u64> {
        self.map.live()?.get(&key).copied()
    }

    fn destroy(&mut self) {
        self.map.end();
    }
}

/// `HashMap` that refuses new keys once it holds `capacity` entries.
/// Updates to existing keys are always accepted.
#[derive(Debug, Default)]
pub struct BoundedHashMap {
    capacity: u64,
    map: Lifecycle<HashMap<u64, u64>>,
}

impl BoundedHashMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Subject for BoundedHashMap {
    fn init(&mut self, capacity: u64, _key_bits: u32, _value_bits: u32) -> Result<(), SubjectError> {
        let reserve = usize::try_from(capacity).unwrap_or(usize::MAX).min(1 << 20);
        self.map.start(HashMap::with_capacity(reserve))?;
        self.capacity = capacity;
        Ok(())
    }

    fn insert(&mut self, key: u64, value: u64) -> Result<(), SubjectError> {
        let capacity = self.capacity;
        let map = self.map.live_mut()?;
        if !map.contains_key(&key) && map.len() as u64 >= capacity {
            return Err(SubjectError::CapacityExceeded { capacity });
        }
        map.insert(key, value);
        Ok(())
    }

    fn remove(&mut self, key: u64) -> Result<bool, SubjectError> {
        Ok(self.map.live_mut()?.remove(&key).is_some())
    }

    fn lookup(&self, key: u64) -> Option<u64> {
        self.map.live()?.get(&key).copied()
    }

    fn destroy(&mut self) {
        self.map.end();
    }
}

/// Existence-only subject backed by a `HashSet`. Lookups of present keys
/// report value 0, so it must be run without value checking.
#[derive(Debug, Default)]
pub struct KeySet {
    keys: Lifecycle<HashSet<u64>>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Subject for KeySet {
    fn init(&mut self, _capacity: u64, _key_bits: u32, _value_bits: u32) -> Result<(), SubjectError> {
        self.keys.start(HashSet::new())
    }

    fn insert(&mut self, key: u64, _value: u64) -> Result<(), SubjectError> {
        self.keys.live_mut()?.insert(key);
        Ok(())
    }

    fn remove(&mut self, key: u64) -> Result<bool, SubjectError> {
        Ok(self.keys.live_mut()?.remove(&key))
    }

    fn lookup(&self, key: u64) -> Option<u64> {
        self.keys.live()?.contains(&key).then_some(0)
    }

    fn destroy(&mut self) {
        self.keys.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_hashmap_lifecycle() {
        let mut map = StdHashMap::new();
        assert_eq!(map.insert(1, 1), Err(SubjectError::NotInitialized));
        map.init(8, 16, 8).unwrap();
        assert_eq!(map.init(8, 16, 8), Err(SubjectError::AlreadyInitialized));
        map.insert(1, 7).unwrap();
        assert_eq!(map.lookup(1), Some(7));
        map.destroy();
        assert_eq!(map.lookup(1), None);
        assert_eq!(map.remove(1), Err(SubjectError::NotInitialized));
        assert_eq!(map.init(8, 16, 8), Err(SubjectError::NotInitialized));
    }

    #[test]
    fn test_bounded_rejects_new_keys_when_full() {
        let mut map = BoundedHashMap::new();
        map.init(2, 16, 8).unwrap();
        map.insert(1, 1).unwrap();
        map.insert(2, 2).unwrap();
        assert_eq!(
            map.insert(3, 3),
            Err(SubjectError::CapacityExceeded { capacity: 2 })
        );
        // updates still allowed at capacity
        map.insert(2, 9).unwrap();
        assert_eq!(map.lookup(2), Some(9));
        assert!(map.remove(1).unwrap());
        map.insert(3, 3).unwrap();
        assert_eq!(map.lookup(3), Some(3));
    }

    #[test]
    fn test_keyset_existence_only() {
        let mut set = KeySet::new();
        set.init(4, 8, 8).unwrap();
        set.insert(5, 99).unwrap();
        assert_eq!(set.lookup(5), Some(0));
        assert!(set.remove(5).unwrap());
        assert!(!set.remove(5).unwrap());
        assert_eq!(set.lookup(5), None);
    }
}
