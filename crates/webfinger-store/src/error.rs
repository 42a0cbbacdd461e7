//! Error types for building the identity store

use std::fmt;
use thiserror::Error;

/// Which input a store error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Aliases,
    Resources,
    Table,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Aliases => write!(f, "aliases"),
            Document::Resources => write!(f, "resources"),
            Document::Table => write!(f, "table"),
        }
    }
}

/// A single offending entry, keyed by the alias, handle or subject at fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub key: String,
    pub reason: String,
}

impl Problem {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// The document is not shaped like the mapping it should be
    #[error("Parse error in {document} document: {reason}")]
    Parse { document: Document, reason: String },

    /// The document is well-formed but some entries cannot be resolved
    #[error("Validation error in {document} document: {}", join(.problems))]
    Validation {
        document: Document,
        problems: Vec<Problem>,
    },
}

impl StoreError {
    pub(crate) fn parse(document: Document, reason: impl Into<String>) -> Self {
        StoreError::Parse {
            document,
            reason: reason.into(),
        }
    }

    /// Offending entries for a validation error; empty for parse errors.
    pub fn problems(&self) -> &[Problem] {
        match self {
            StoreError::Validation { problems, .. } => problems,
            StoreError::Parse { .. } => &[],
        }
    }
}

fn join(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, StoreError>;
