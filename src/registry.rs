//! Named subject registry.

use crate::driver::ValueCheck;
use crate::error::{HarnessError, Result};
use crate::subject::Subject;
use crate::subjects::{BoundedHashMap, KeySet, StdHashMap};

/// Selector that runs every registered subject.
pub const ALL: &str = "all";

/// Constructs a fresh, uninitialized subject.
pub type SubjectFactory = fn() -> Box<dyn Subject>;

/// A registered subject.
#[derive(Clone, Debug)]
pub struct SubjectEntry {
    pub name: &'static str,
    pub description: &'static str,
    /// Value checking this subject supports.
    pub values: ValueCheck,
    factory: SubjectFactory,
}

impl SubjectEntry {
    pub fn new(
        name: &'static str,
        description: &'static str,
        values: ValueCheck,
        factory: SubjectFactory,
    ) -> Self {
        Self {
            name,
            description,
            values,
            factory,
        }
    }

    /// Fresh instance; every run gets its own.
    pub fn instantiate(&self) -> Box<dyn Subject> {
        (self.factory)()
    }
}

/// Ordered set of subjects selectable by name.
#[derive(Clone, Debug, Default)]
pub struct SubjectRegistry {
    entries: Vec<SubjectEntry>,
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in standard-library adapters.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SubjectEntry::new(
            "hashmap",
            "std HashMap, unbounded",
            ValueCheck::Exact,
            || Box::new(StdHashMap::new()),
        ));
        registry.register(SubjectEntry::new(
            "bounded",
            "std HashMap refusing new keys beyond nominal capacity",
            ValueCheck::Exact,
            || Box::new(BoundedHashMap::new()),
        ));
        registry.register(SubjectEntry::new(
            "keyset",
            "std HashSet, existence only",
            ValueCheck::ExistenceOnly,
            || Box::new(KeySet::new()),
        ));
        registry
    }

    /// Add `entry`, replacing any subject with the same name.
    pub fn register(&mut self, entry: SubjectEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SubjectEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a `-d` selector: a registered name, or [`ALL`].
    pub fn select(&self, selector: &str) -> Result<Vec<&SubjectEntry>> {
        if selector == ALL {
            return Ok(self.entries.iter().collect());
        }
        self.get(selector)
            .map(|entry| vec![entry])
            .ok_or_else(|| HarnessError::UnknownSubject(selector.to_string()))
    }
}
