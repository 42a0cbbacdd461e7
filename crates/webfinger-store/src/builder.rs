//! Builds an [`IdentityTable`] from the alias and resource documents
//!
//! Both documents are YAML. Decoding happens in two phases: the bytes are
//! first read into a generic YAML value, then converted into the typed
//! [`UrnAliases`] / [`ResourceProperties`]. Every structural problem is
//! reported before a table exists, so a half-built table is never served.

use crate::error::{Document, Problem, Result, StoreError};
use crate::is_absolute_uri;
use crate::table::IdentityTable;
use crate::types::WebFinger;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const ACCT_SCHEME: &str = "acct:";

/// Alias name to absolute URI. Every value is checked on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrnAliases(BTreeMap<String, String>);

impl UrnAliases {
    /// Validate a raw alias map, reporting every value that is not an absolute URI.
    pub fn new(aliases: BTreeMap<String, String>) -> Result<Self> {
        let problems: Vec<Problem> = aliases
            .iter()
            .filter_map(|(name, uri)| {
                if name.is_empty() {
                    Some(Problem::new(name, "alias name is empty"))
                } else if !is_absolute_uri(uri) {
                    Some(Problem::new(
                        name,
                        format!("{:?} is not an absolute URI", uri),
                    ))
                } else {
                    None
                }
            })
            .collect();

        if !problems.is_empty() {
            return Err(StoreError::Validation {
                document: Document::Aliases,
                problems,
            });
        }

        Ok(Self(aliases))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Identity handle to its raw (unexpanded) property keys and values
pub type ResourceProperties = BTreeMap<String, BTreeMap<String, String>>;

/// Parse the alias document: a flat mapping of alias name to absolute URI.
pub fn parse_aliases(bytes: &[u8]) -> Result<UrnAliases> {
    let mapping = decode(Document::Aliases, bytes)?;
    let aliases = flat_mapping(Document::Aliases, &mapping, None)?;
    UrnAliases::new(aliases)
}

/// Parse the resource document: handle to a mapping of property key to value.
pub fn parse_resources(bytes: &[u8]) -> Result<ResourceProperties> {
    let mapping = decode(Document::Resources, bytes)?;
    let mut resources = BTreeMap::new();

    for (key, value) in &mapping {
        let handle = scalar(key).ok_or_else(|| {
            StoreError::parse(
                Document::Resources,
                format!("identity handles must be strings, found {}", kind(key)),
            )
        })?;

        let properties = match value {
            Value::Null => BTreeMap::new(),
            Value::Mapping(inner) => flat_mapping(Document::Resources, inner, Some(&handle))?,
            other => {
                return Err(StoreError::parse(
                    Document::Resources,
                    format!(
                        "{}: expected a mapping of properties, found {}",
                        handle,
                        kind(other)
                    ),
                ))
            }
        };

        resources.insert(handle, properties);
    }

    Ok(resources)
}

/// Expand every resource into a [`WebFinger`] keyed by its `acct:` subject.
///
/// Property keys that name an alias are replaced by the alias URI; any other
/// key must already be an absolute URI. All offending handles are collected
/// into a single validation error and no table is returned in that case.
pub fn assemble(resources: &ResourceProperties, aliases: &UrnAliases) -> Result<IdentityTable> {
    let mut entries = HashMap::with_capacity(resources.len());
    let mut problems = Vec::new();

    for (handle, properties) in resources {
        let subject = match acct_subject(handle) {
            Ok(subject) => subject,
            Err(reason) => {
                problems.push(Problem::new(handle, reason));
                continue;
            }
        };

        if entries.contains_key(&subject) {
            problems.push(Problem::new(handle, format!("duplicate subject {}", subject)));
            continue;
        }

        let mut finger = WebFinger::new(subject.clone());
        let mut resolved = true;

        for (key, value) in properties {
            let uri = match aliases.get(key) {
                Some(uri) => uri,
                None if is_absolute_uri(key) => key.as_str(),
                None => {
                    problems.push(Problem::new(
                        handle,
                        format!("property {:?} is neither a known alias nor an absolute URI", key),
                    ));
                    resolved = false;
                    continue;
                }
            };

            if finger.properties.contains_key(uri) {
                problems.push(Problem::new(
                    handle,
                    format!("property {:?} expands to {} which is already set", key, uri),
                ));
                resolved = false;
                continue;
            }

            finger.properties.insert(uri.to_string(), value.clone());
        }

        if resolved {
            debug!(
                subject = %subject,
                properties = finger.properties.len(),
                "Assembled webfinger"
            );
            entries.insert(subject, finger);
        }
    }

    if !problems.is_empty() {
        return Err(StoreError::Validation {
            document: Document::Resources,
            problems,
        });
    }

    Ok(IdentityTable::from_entries(entries))
}

/// Normalize a handle (`user@example.com` or `acct:user@example.com`) into its subject.
fn acct_subject(handle: &str) -> std::result::Result<String, String> {
    let bare = handle.strip_prefix(ACCT_SCHEME).unwrap_or(handle);

    let well_formed = match bare.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !bare.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err("expected a handle of the form local@domain".to_string());
    }

    let subject = format!("{}{}", ACCT_SCHEME, bare);
    if !is_absolute_uri(&subject) {
        return Err(format!("{} is not a valid URI", subject));
    }

    Ok(subject)
}

fn decode(document: Document, bytes: &[u8]) -> Result<Mapping> {
    let value: Value =
        serde_yaml::from_slice(bytes).map_err(|e| StoreError::parse(document, e.to_string()))?;

    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(StoreError::parse(
            document,
            format!("expected a mapping at the top level, found {}", kind(&other)),
        )),
    }
}

/// Convert a mapping whose keys and values must all be scalars.
fn flat_mapping(
    document: Document,
    mapping: &Mapping,
    owner: Option<&str>,
) -> Result<BTreeMap<String, String>> {
    let prefix = owner.map(|o| format!("{}: ", o)).unwrap_or_default();
    let mut out = BTreeMap::new();

    for (key, value) in mapping {
        let key = scalar(key).ok_or_else(|| {
            StoreError::parse(
                document,
                format!("{}keys must be strings, found {}", prefix, kind(key)),
            )
        })?;
        let value = scalar(value).ok_or_else(|| {
            StoreError::parse(
                document,
                format!("{}{}: expected a string, found {}", prefix, key, kind(value)),
            )
        })?;
        out.insert(key, value);
    }

    Ok(out)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URNS: &str = "name: https://schema/name\nprofile: https://schema/profile";
    const FINGERS: &str = "user@example.com:\n  name: John Doe";

    fn build(urns: &str, fingers: &str) -> Result<IdentityTable> {
        let aliases = parse_aliases(urns.as_bytes())?;
        let resources = parse_resources(fingers.as_bytes())?;
        assemble(&resources, &aliases)
    }

    #[test]
    fn test_parse_aliases() {
        let aliases = parse_aliases(URNS.as_bytes()).unwrap();
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases.get("name"), Some("https://schema/name"));
        assert_eq!(aliases.get("profile"), Some("https://schema/profile"));
    }

    #[test]
    fn test_parse_aliases_empty_document() {
        let aliases = parse_aliases(b"").unwrap();
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_parse_aliases_not_a_mapping() {
        let err = parse_aliases(b"invalid").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Parse {
                document: Document::Aliases,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_aliases_nested_value() {
        let err = parse_aliases(b"name:\n  nested: https://schema/name").unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn test_parse_aliases_relative_uri() {
        let err = parse_aliases(b"name: invalid\nbio: also-invalid\nsite: https://ok").unwrap_err();
        match err {
            StoreError::Validation { document, problems } => {
                assert_eq!(document, Document::Aliases);
                let keys: Vec<_> = problems.iter().map(|p| p.key.as_str()).collect();
                assert_eq!(keys, vec!["bio", "name"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_resources() {
        let resources = parse_resources(FINGERS.as_bytes()).unwrap();
        assert_eq!(resources["user@example.com"]["name"], "John Doe");
    }

    #[test]
    fn test_parse_resources_scalars_become_strings() {
        let resources = parse_resources(b"user@example.com:\n  age: 30\n  admin: true").unwrap();
        assert_eq!(resources["user@example.com"]["age"], "30");
        assert_eq!(resources["user@example.com"]["admin"], "true");
    }

    #[test]
    fn test_parse_resources_null_properties() {
        let resources = parse_resources(b"user@example.com:\n").unwrap();
        assert!(resources["user@example.com"].is_empty());
    }

    #[test]
    fn test_parse_resources_not_two_levels() {
        assert!(matches!(
            parse_resources(b"invalid").unwrap_err(),
            StoreError::Parse { .. }
        ));
        assert!(matches!(
            parse_resources(b"user@example.com: John Doe").unwrap_err(),
            StoreError::Parse { .. }
        ));
        assert!(matches!(
            parse_resources(b"user@example.com:\n  - name").unwrap_err(),
            StoreError::Parse { .. }
        ));
    }

    #[test]
    fn test_assemble_expands_aliases() {
        let table = build(URNS, FINGERS).unwrap();

        let expected = WebFinger::new("acct:user@example.com")
            .with_property("https://schema/name", "John Doe");
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("acct:user@example.com"), Some(&expected));
        assert!(table.lookup("acct:user@example.com").unwrap().links.is_empty());
    }

    #[test]
    fn test_assemble_custom_alias() {
        let table = build(
            "favorite_food: https://schema/favorite_food",
            "user@example.com:\n  favorite_food: Apple",
        )
        .unwrap();

        let finger = table.lookup("acct:user@example.com").unwrap();
        assert_eq!(finger.properties["https://schema/favorite_food"], "Apple");
    }

    #[test]
    fn test_assemble_literal_uri_keys() {
        let table = build(
            "",
            "user@example.com:\n  http://webfinger.net/rel/name: John Doe",
        )
        .unwrap();

        let finger = table.lookup("acct:user@example.com").unwrap();
        assert_eq!(finger.properties["http://webfinger.net/rel/name"], "John Doe");
    }

    #[test]
    fn test_assemble_one_entry_per_handle() {
        let table = build(
            URNS,
            "user@example.com:\n  name: John Doe\nother@example.com:\n  profile: https://example.com/other\nacct:third@example.com:\n",
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        for subject in [
            "acct:user@example.com",
            "acct:other@example.com",
            "acct:third@example.com",
        ] {
            assert_eq!(table.lookup(subject).unwrap().subject, subject);
        }
    }

    #[test]
    fn test_assemble_unknown_key_fails_whole_table() {
        let err = build(
            URNS,
            "user@example.com:\n  name: John Doe\nbob@example.com:\n  nick: Bobby\ncarol@example.com:\n  age: 40",
        )
        .unwrap_err();

        match err {
            StoreError::Validation { document, problems } => {
                assert_eq!(document, Document::Resources);
                let keys: Vec<_> = problems.iter().map(|p| p.key.as_str()).collect();
                assert_eq!(keys, vec!["bob@example.com", "carol@example.com"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_assemble_invalid_handle() {
        let err = build(URNS, "invalid:\n  name: John Doe").unwrap_err();
        assert_eq!(err.problems().len(), 1);
        assert_eq!(err.problems()[0].key, "invalid");
    }

    #[test]
    fn test_assemble_conflicting_expansion() {
        let err = build(
            URNS,
            "user@example.com:\n  name: John Doe\n  https://schema/name: Johnny",
        )
        .unwrap_err();
        assert_eq!(err.problems().len(), 1);
    }

    #[test]
    fn test_assemble_duplicate_after_normalization() {
        let err = build(
            URNS,
            "user@example.com:\n  name: John Doe\nacct:user@example.com:\n  name: Johnny",
        )
        .unwrap_err();
        assert_eq!(err.problems().len(), 1);
    }

    #[test]
    fn test_acct_subject() {
        assert_eq!(acct_subject("user@example.com").unwrap(), "acct:user@example.com");
        assert_eq!(
            acct_subject("acct:user@example.com").unwrap(),
            "acct:user@example.com"
        );
        assert!(acct_subject("user").is_err());
        assert!(acct_subject("@example.com").is_err());
        assert!(acct_subject("user@").is_err());
        assert!(acct_subject("a@b@c").is_err());
        assert!(acct_subject("john doe@example.com").is_err());
    }
}
