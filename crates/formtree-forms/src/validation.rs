//! Validation-group pruning and bind-data preparation.
//!
//! A validation group is usually declared once, but a collection's live
//! items are only known at submission time. [`prepare_validation_group`]
//! rebuilds the group against the submitted data:
//!
//! 1. Keys naming no child of the fieldset are dropped.
//! 2. A collection key with no submitted data and a count of zero is
//!    dropped.
//! 3. Any other collection key has its declared per-item group copied to
//!    every submitted item id.
//! 4. Fieldset keys recurse with their data sub-map (empty when absent).
//!
//! The result is a fresh group; the declared one is never mutated.

use serde_json::Value;

use formtree_filter::data::{as_map, item_entries};
use formtree_filter::{DataMap, GroupEntry, ValidationGroup};

use crate::fieldset::Fieldset;
use crate::node::Node;

/// Rebuilds `group` against `fieldset` and the submitted `data`.
pub fn prepare_validation_group(
    fieldset: &Fieldset,
    data: &DataMap,
    group: &ValidationGroup,
) -> ValidationGroup {
    let mut prepared = ValidationGroup::new();

    for (key, entry) in group.iter() {
        let Some(child) = fieldset.get(key) else {
            tracing::warn!(fieldset = fieldset.name(), key = %key, "Dropping unknown validation group key");
            continue;
        };

        match child {
            Node::Element(_) => prepared.insert(key.clone(), entry.clone()),
            Node::Fieldset(nested) => {
                let nested_entry = match entry {
                    GroupEntry::All => GroupEntry::All,
                    GroupEntry::Nested(sub) => {
                        let nested_data = data.get(key).map(as_map).unwrap_or_default();
                        GroupEntry::Nested(prepare_validation_group(nested, &nested_data, sub))
                    }
                };
                prepared.insert(key.clone(), nested_entry);
            }
            Node::Collection(collection) => {
                let submitted = data.get(key).filter(|v| !v.is_null());
                if submitted.is_none() && collection.count() == 0 {
                    tracing::warn!(collection = %key, "Dropping empty collection from validation group");
                    continue;
                }
                let mut items = ValidationGroup::new();
                for (index, item) in submitted.map(item_entries).unwrap_or_default() {
                    let item_entry = match (entry, collection.target()) {
                        (GroupEntry::Nested(sub), Some(Node::Fieldset(target))) => GroupEntry::Nested(
                            prepare_validation_group(target, &as_map(item), sub),
                        ),
                        _ => entry.clone(),
                    };
                    items.insert(index, item_entry);
                }
                prepared.insert(key.clone(), GroupEntry::Nested(items));
            }
        }
    }

    prepared
}

/// Keeps only the values whose keys were submitted, recursing into maps
/// present on both sides.
pub fn prepare_bind_data(values: &DataMap, submitted: &DataMap) -> DataMap {
    values
        .iter()
        .filter_map(|(key, value)| {
            let matched = submitted.get(key)?;
            let value = match (value, matched) {
                (Value::Object(nested), Value::Object(_) | Value::Array(_)) => {
                    Value::Object(prepare_bind_data(nested, &as_map(matched)))
                }
                _ => value.clone(),
            };
            Some((key.clone(), value))
        })
        .collect()
}
