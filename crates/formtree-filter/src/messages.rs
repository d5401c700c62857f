//! Per-field validation messages.
//!
//! Messages mirror the shape of the filter tree: an input contributes a list
//! of strings, a nested filter contributes a nested map, and a collection
//! contributes a map keyed by item id.

use std::collections::BTreeMap;

use serde::Serialize;

/// Key under which messages about a whole filter (rather than one field)
/// are reported.
pub const NON_FIELD_KEY: &str = "__all__";

/// Messages for one node of the filter tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Messages {
    /// Messages for a single input.
    Field(Vec<String>),
    /// Messages for a nested filter or collection, keyed by child name.
    Nested(MessageMap),
}

/// A map of messages keyed by field name.
pub type MessageMap = BTreeMap<String, Messages>;

impl Messages {
    /// Returns `true` if no message is recorded at any depth.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Field(list) => list.is_empty(),
            Self::Nested(map) => map.values().all(Self::is_empty),
        }
    }

    /// Returns the field-level messages, if this is a leaf.
    pub fn as_field(&self) -> Option<&[String]> {
        match self {
            Self::Field(list) => Some(list),
            Self::Nested(_) => None,
        }
    }

    /// Returns the nested map, if this is not a leaf.
    pub const fn as_nested(&self) -> Option<&MessageMap> {
        match self {
            Self::Nested(map) => Some(map),
            Self::Field(_) => None,
        }
    }
}

/// Flattens a message map into `(dotted.path, message)` pairs.
///
/// ```
/// use formtree_filter::messages::{flatten, MessageMap, Messages};
///
/// let mut inner = MessageMap::new();
/// inner.insert("street".into(), Messages::Field(vec!["Required".into()]));
/// let mut map = MessageMap::new();
/// map.insert("address".into(), Messages::Nested(inner));
///
/// assert_eq!(flatten(&map), vec![("address.street".to_string(), "Required".to_string())]);
/// ```
pub fn flatten(map: &MessageMap) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(map, "", &mut out);
    out
}

fn flatten_into(map: &MessageMap, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, messages) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match messages {
            Messages::Field(list) => {
                out.extend(list.iter().map(|m| (path.clone(), m.clone())));
            }
            Messages::Nested(nested) => flatten_into(nested, &path, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_is_empty_nested() {
        let mut map = MessageMap::new();
        map.insert("a".into(), Messages::Field(vec![]));
        assert!(Messages::Nested(map.clone()).is_empty());
        map.insert("b".into(), Messages::Field(vec!["bad".into()]));
        assert!(!Messages::Nested(map).is_empty());
    }

    #[test]
    fn test_messages_serialize_untagged() {
        let mut map = MessageMap::new();
        map.insert("name".into(), Messages::Field(vec!["Required".into()]));
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"name": ["Required"]}));
    }

    #[test]
    fn test_flatten_collection_paths() {
        let mut item = MessageMap::new();
        item.insert("sku".into(), Messages::Field(vec!["Invalid".into(), "Short".into()]));
        let mut items = MessageMap::new();
        items.insert("2".into(), Messages::Nested(item));
        let mut map = MessageMap::new();
        map.insert("items".into(), Messages::Nested(items));

        let flat = flatten(&map);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].0, "items.2.sku");
    }
}
