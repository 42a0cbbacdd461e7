//! Immutable lookup table of WebFinger resources

use crate::error::{Document, Problem, Result, StoreError};
use crate::types::WebFinger;
use std::collections::HashMap;

/// Exact-match, case-sensitive map from subject to resource.
///
/// Built once at startup and never mutated afterwards, so it can be shared
/// behind an `Arc` by any number of concurrent lookups without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityTable {
    entries: HashMap<String, WebFinger>,
}

impl IdentityTable {
    /// A table with no entries; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table directly from resources, keyed by their subject.
    ///
    /// This is the only way to construct URI-keyed identities such as
    /// `https://example.com/user`; the document path only produces `acct:`
    /// subjects. Fails if any subject is empty or appears twice.
    pub fn from_resources(resources: impl IntoIterator<Item = WebFinger>) -> Result<Self> {
        let mut entries = HashMap::new();
        let mut problems = Vec::new();

        for (index, finger) in resources.into_iter().enumerate() {
            if finger.subject.is_empty() {
                problems.push(Problem::new(format!("#{}", index), "subject is empty"));
                continue;
            }
            if entries.contains_key(&finger.subject) {
                problems.push(Problem::new(finger.subject, "duplicate subject"));
                continue;
            }
            entries.insert(finger.subject.clone(), finger);
        }

        if !problems.is_empty() {
            return Err(StoreError::Validation {
                document: Document::Table,
                problems,
            });
        }

        Ok(Self { entries })
    }

    /// Keys are guaranteed unique and equal to each subject by the caller.
    pub(crate) fn from_entries(entries: HashMap<String, WebFinger>) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, resource: &str) -> Option<&WebFinger> {
        self.entries.get(resource)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WebFinger> {
        self.entries.values()
    }
}
