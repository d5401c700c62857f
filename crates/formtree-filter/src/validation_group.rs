//! Validation groups: which fields take part in a validation pass.
//!
//! A group is a tree. A leaf ([`GroupEntry::All`]) selects a field (or a
//! whole nested filter); a branch ([`GroupEntry::Nested`]) restricts a nested
//! filter to a sub-group. For collections the branch keys are item ids.

use std::collections::BTreeMap;

use serde_json::Value;

use formtree_core::{FormError, FormResult};

/// One entry of a validation group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEntry {
    /// Validate the named field, or everything under the named filter.
    All,
    /// Validate only the listed children of the named filter.
    Nested(ValidationGroup),
}

impl GroupEntry {
    /// Returns the sub-group, or `None` for "everything".
    pub const fn as_group(&self) -> Option<&ValidationGroup> {
        match self {
            Self::All => None,
            Self::Nested(group) => Some(group),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::All => Value::Bool(true),
            Self::Nested(group) => group.to_value(),
        }
    }
}

/// A set of field names, possibly nested, selected for validation.
///
/// # Examples
///
/// ```
/// use formtree_filter::ValidationGroup;
///
/// let group = ValidationGroup::new()
///     .field("email")
///     .nested("address", ValidationGroup::new().field("street"));
/// assert!(group.contains("email"));
/// assert!(group.get("address").and_then(|e| e.as_group()).unwrap().contains("street"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationGroup {
    entries: BTreeMap<String, GroupEntry>,
}

impl ValidationGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flat group from field names.
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(Self::new(), |group, name| group.field(name))
    }

    /// Adds a leaf entry.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.entries.insert(name.into(), GroupEntry::All);
        self
    }

    /// Adds a nested entry.
    #[must_use]
    pub fn nested(mut self, name: impl Into<String>, group: Self) -> Self {
        self.entries.insert(name.into(), GroupEntry::Nested(group));
        self
    }

    /// Inserts an entry, replacing any previous entry of the same name.
    pub fn insert(&mut self, name: impl Into<String>, entry: GroupEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Removes an entry.
    pub fn remove(&mut self, name: &str) -> Option<GroupEntry> {
        self.entries.remove(name)
    }

    /// Returns the entry for a name.
    pub fn get(&self, name: &str) -> Option<&GroupEntry> {
        self.entries.get(name)
    }

    /// Returns `true` if the group selects the name.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterates the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &GroupEntry)> {
        self.entries.iter()
    }

    /// Returns the selected names in key order.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Returns the number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a group from its JSON shape.
    ///
    /// Accepted shapes:
    /// - a string: one field,
    /// - an array of strings and/or objects: the union of each item,
    /// - an object: `true` selects a field, `false`/`null` skip it, and an
    ///   array or object value becomes a nested group.
    pub fn from_value(value: &Value) -> FormResult<Self> {
        let mut group = Self::new();
        match value {
            Value::String(name) => {
                group.entries.insert(name.clone(), GroupEntry::All);
            }
            Value::Array(items) => {
                for item in items {
                    let parsed = Self::from_value(item)?;
                    group.entries.extend(parsed.entries);
                }
            }
            Value::Object(map) => {
                for (key, entry) in map {
                    match entry {
                        Value::Bool(true) => {
                            group.entries.insert(key.clone(), GroupEntry::All);
                        }
                        Value::Bool(false) | Value::Null => {}
                        Value::Array(_) | Value::Object(_) | Value::String(_) => {
                            group
                                .entries
                                .insert(key.clone(), GroupEntry::Nested(Self::from_value(entry)?));
                        }
                        Value::Number(_) => {
                            return Err(FormError::InvalidArgument(format!(
                                "validation group entry '{key}' must be a boolean, a name, a list or a map"
                            )));
                        }
                    }
                }
            }
            other => {
                return Err(FormError::InvalidArgument(format!(
                    "cannot build a validation group from {other}"
                )));
            }
        }
        Ok(group)
    }

    /// Renders the group in its object JSON shape.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

impl FromIterator<(String, GroupEntry)> for ValidationGroup {
    fn from_iter<T: IntoIterator<Item = (String, GroupEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<Value> for ValidationGroup {
    type Error = FormError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}
