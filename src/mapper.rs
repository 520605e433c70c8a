//! Declarative translation of raw provider responses into [`Repo`]s.
//!
//! Each hosting service returns repositories in its own shape. Rather than
//! hand-writing a conversion per provider, every provider declares a
//! [`FieldMapper`] table and the same [`parse_response()`] routine does the
//! rest.

use crate::repo::{Repo, RepoField};
use failure::Error;
use serde_json::Value;

/// A table of `(raw key, field)` pairs.
///
/// Raw keys may be dotted paths (e.g. `"owner.login"`) for reaching into
/// nested objects.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapper {
    entries: Vec<(String, RepoField)>,
}

impl FieldMapper {
    pub fn new<I, K>(entries: I) -> FieldMapper
    where
        I: IntoIterator<Item = (K, RepoField)>,
        K: Into<String>,
    {
        FieldMapper {
            entries: entries
                .into_iter()
                .map(|(key, field)| (key.into(), field))
                .collect(),
        }
    }

    /// Build a mapper from string field names, failing on the first target
    /// which isn't a field on [`Repo`].
    pub fn from_names<'a, I>(entries: I) -> Result<FieldMapper, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut mapped = Vec::new();

        for (key, target) in entries {
            let field = target.parse::<RepoField>()?;
            mapped.push((key.to_string(), field));
        }

        Ok(FieldMapper { entries: mapped })
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, RepoField)> {
        self.entries.iter().map(|(key, field)| (key.as_str(), *field))
    }
}

/// Normalize a single raw repository object using the provided mapper.
///
/// Fields without a mapper entry, or whose raw value is missing, are left
/// as `None`.
pub fn parse_response(raw: &Value, mapper: &FieldMapper) -> Repo {
    let mut repo = Repo::default();

    for (key, field) in mapper.entries() {
        match lookup(raw, key) {
            Some(value) => {
                if !repo.set(field, value) && !value.is_null() {
                    trace!(
                        "Ignoring \"{}\" for the {} field, unexpected type ({})",
                        key,
                        field,
                        value
                    );
                }
            }
            None => trace!("No value found for \"{}\"", key),
        }
    }

    repo
}

/// Find the value at `key`, walking nested objects when the key contains
/// dots.
///
/// A missing (or non-object) node anywhere along the path gives `None`.
pub fn lookup<'v>(raw: &'v Value, key: &str) -> Option<&'v Value> {
    if !key.contains('.') {
        return raw.get(key);
    }

    key.split('.').try_fold(raw, |node, segment| node.get(segment))
}
