//! WebFinger identity store
//!
//! Turns two human-edited YAML documents (a URN alias table and a
//! per-identity property table) into an immutable [`IdentityTable`]
//! that answers exact-match WebFinger lookups.

pub mod builder;
pub mod error;
pub mod table;
pub mod types;

pub use builder::{assemble, parse_aliases, parse_resources, ResourceProperties, UrnAliases};
pub use error::{Document, Problem, Result, StoreError};
pub use table::IdentityTable;
pub use types::{Link, WebFinger};

/// Returns true if `value` parses as an absolute URI (scheme included).
pub fn is_absolute_uri(value: &str) -> bool {
    url::Url::parse(value).is_ok()
}
