//! Capability interface every map under test implements.

use tracing::trace;

use crate::error::SubjectError;

/// A candidate map implementation.
///
/// The harness only ever talks to a subject through these five operations
/// and never inspects its internals.
pub trait Subject {
    /// One-time setup. Must be called exactly once before any mutation.
    fn init(&mut self, capacity: u64, key_bits: u32, value_bits: u32) -> Result<(), SubjectError>;

    /// Insert or update. May fail with [`SubjectError::CapacityExceeded`].
    fn insert(&mut self, key: u64, value: u64) -> Result<(), SubjectError>;

    /// Remove `key`, returning whether it was present.
    fn remove(&mut self, key: u64) -> Result<bool, SubjectError>;

    fn lookup(&self, key: u64) -> Option<u64>;

    /// Release all resources. The subject is unusable afterwards.
    fn destroy(&mut self);
}

impl<S: Subject + ?Sized> Subject for Box<S> {
    fn init(&mut self, capacity: u64, key_bits: u32, value_bits: u32) -> Result<(), SubjectError> {
        (**self).init(capacity, key_bits, value_bits)
    }

    fn insert(&mut self, key: u64, value: u64) -> Result<(), SubjectError> {
        (**self).insert(key, value)
    }

    fn remove(&mut self, key: u64) -> Result<bool, SubjectError> {
        (**self).remove(key)
    }

    fn lookup(&self, key: u64) -> Option<u64> {
        (**self).lookup(key)
    }

    fn destroy(&mut self) {
        (**self).destroy()
    }
}

/// Scoped acquisition of an initialized subject.
///
/// Opening the session calls `init`; dropping it calls `destroy`, including
/// when the run ends early on a divergence or unwinds from a panic.
pub struct SubjectSession<'a, S: Subject + ?Sized> {
    subject: &'a mut S,
}

impl<'a, S: Subject + ?Sized> SubjectSession<'a, S> {
    pub fn open(
        subject: &'a mut S,
        capacity: u64,
        key_bits: u32,
        value_bits: u32,
    ) -> Result<Self, SubjectError> {
        subject.init(capacity, key_bits, value_bits)?;
        trace!(capacity, key_bits, value_bits, "subject initialized");
        Ok(Self { subject })
    }

    pub fn insert(&mut self, key: u64, value: u64) -> Result<(), SubjectError> {
        self.subject.insert(key, value)
    }

    pub fn remove(&mut self, key: u64) -> Result<bool, SubjectError> {
        self.subject.remove(key)
    }

    pub fn lookup(&self, key: u64) -> Option<u64> {
        self.subject.lookup(key)
    }
}

impl<S: Subject + ?Sized> Drop for SubjectSession<'_, S> {
    fn drop(&mut self) {
        self.subject.destroy();
        trace!("subject destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Records lifecycle calls so tests can assert on them.
    #[derive(Default)]
    struct Recorder {
        inits: usize,
        destroys: usize,
        map: HashMap<u64, u64>,
    }

    impl Subject for Recorder {
        fn init(&mut self, _capacity: u64, _key_bits: u32, _value_bits: u32) -> Result<(), SubjectError> {
            self.inits += 1;
            Ok(())
        }

        fn insert(&mut self, key: u64, value: u64) -> Result<(), SubjectError> {
            self.map.insert(key, value);
            Ok(())
        }

        fn remove(&mut self, key: u64) -> Result<bool, SubjectError> {
            Ok(self.map.remove(&key).is_some())
        }

        fn lookup(&self, key: u64) -> Option<u64> {
            self.map.get(&key).copied()
        }

        fn destroy(&mut self) {
            self.destroys += 1;
            self.map.clear();
        }
    }

    #[test]
    fn test_session_destroys_on_drop() {
        let mut subject = Recorder::default();
        {
            let mut session = SubjectSession::open(&mut subject, 16, 8, 8).unwrap();
            session.insert(1, 2).unwrap();
            assert_eq!(session.lookup(1), Some(2));
        }
        assert_eq!(subject.inits, 1);
        assert_eq!(subject.destroys, 1);
        assert!(subject.map.is_empty());
    }

    #[test]
    fn test_session_destroys_on_panic() {
        let mut subject = Recorder::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _session = SubjectSession::open(&mut subject, 16, 8, 8).unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(subject.destroys, 1);
    }

    #[test]
    fn test_boxed_subject_forwards() {
        let mut boxed: Box<dyn Subject> = Box::new(Recorder::default());
        let mut session = SubjectSession::open(&mut boxed, 4, 4, 4).unwrap();
        session.insert(3, 4).unwrap();
        assert!(session.remove(3).unwrap());
        assert!(!session.remove(3).unwrap());
    }
}
