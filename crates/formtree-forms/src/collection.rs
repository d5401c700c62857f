//! Collections: repeatable groups instantiated from a target node.
//!
//! Items are children of an inner fieldset, keyed by item id (`"0"`,
//! `"1"`, ...). Items are created on preparation (up to `count`) and on
//! population (one per submitted key), and removed on population when the
//! submission no longer contains them.

use std::collections::HashSet;

use serde_json::Value;

use formtree_core::{FormError, FormResult};
use formtree_filter::data::{as_map, sorted_item_entries};
use formtree_filter::messages::NON_FIELD_KEY;
use formtree_filter::{GroupEntry, MessageMap, Messages, ValidationGroup};

use crate::fieldset::Fieldset;
use crate::node::Node;

/// The placeholder used as the item id of the template element.
pub const DEFAULT_TEMPLATE_PLACEHOLDER: &str = "__index__";

/// A repeatable group of nodes built from a target.
///
/// # Examples
///
/// ```
/// use formtree_forms::{Collection, Element, Fieldset};
/// use serde_json::json;
///
/// let mut tags = Collection::new("tags")
///     .with_target(Fieldset::new("tag").with(Element::text("label")))
///     .with_count(0);
/// tags.populate_values(&json!([{"label": "a"}, {"label": "b"}])).unwrap();
/// assert_eq!(tags.item_keys(), vec!["0", "1"]);
/// ```
#[derive(Debug, Clone)]
pub struct Collection {
    items: Fieldset,
    target: Option<Box<Node>>,
    count: usize,
    allow_add: bool,
    allow_remove: bool,
    should_create_template: bool,
    template_placeholder: String,
    template: Option<Box<Node>>,
    last_child_index: Option<u64>,
    messages: Vec<String>,
}

impl Collection {
    /// Creates a collection with a count of one that allows adding and
    /// removing items.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            items: Fieldset::new(name),
            target: None,
            count: 1,
            allow_add: true,
            allow_remove: true,
            should_create_template: false,
            template_placeholder: DEFAULT_TEMPLATE_PLACEHOLDER.to_string(),
            template: None,
            last_child_index: None,
            messages: Vec::new(),
        }
    }

    // ── Builder ──────────────────────────────────────────────────────

    /// Sets the node every item is cloned from.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<Node>) -> Self {
        self.target = Some(Box::new(target.into()));
        self
    }

    /// Sets the number of items created on preparation.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub const fn with_allow_add(mut self, allow_add: bool) -> Self {
        self.allow_add = allow_add;
        self
    }

    #[must_use]
    pub const fn with_allow_remove(mut self, allow_remove: bool) -> Self {
        self.allow_remove = allow_remove;
        self
    }

    /// Creates a template item, named by the placeholder, on preparation.
    #[must_use]
    pub const fn with_template(mut self, create: bool) -> Self {
        self.should_create_template = create;
        self
    }

    #[must_use]
    pub fn with_template_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.template_placeholder = placeholder.into();
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.items.set_attribute(key, value);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        self.items.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.items.set_name(name);
    }

    pub fn full_name(&self) -> &str {
        self.items.full_name()
    }

    pub fn target(&self) -> Option<&Node> {
        self.target.as_deref()
    }

    pub fn set_target(&mut self, target: impl Into<Node>) {
        self.target = Some(Box::new(target.into()));
    }

    pub const fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    pub const fn allows_add(&self) -> bool {
        self.allow_add
    }

    pub const fn allows_remove(&self) -> bool {
        self.allow_remove
    }

    pub const fn should_create_template(&self) -> bool {
        self.should_create_template
    }

    pub fn template_placeholder(&self) -> &str {
        &self.template_placeholder
    }

    /// The prepared template item, if one was created.
    pub fn template_element(&self) -> Option<&Node> {
        self.template.as_deref()
    }

    /// The live items, as children of a fieldset named like the collection.
    pub const fn items(&self) -> &Fieldset {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Fieldset {
        &mut self.items
    }

    pub fn item_keys(&self) -> Vec<String> {
        self.items.names()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.items.get(key)
    }

    /// The highest numeric item id created so far.
    pub const fn last_child_index(&self) -> Option<u64> {
        self.last_child_index
    }

    // ── Items ────────────────────────────────────────────────────────

    fn add_new_target_instance(&mut self, key: &str) -> FormResult<()> {
        let target = self.target.as_deref().ok_or_else(|| {
            FormError::Domain(format!(
                "Collection '{}' has no target element to create items from",
                self.name()
            ))
        })?;
        let mut item = target.clone();
        item.set_name(key);
        if self.items.is_prepared() {
            let parent = self.items.full_name().to_string();
            item.prepare(Some(&parent))?;
        }
        self.items.add(item);
        if let Ok(index) = key.parse::<u64>() {
            self.last_child_index = Some(self.last_child_index.map_or(index, |last| last.max(index)));
        }
        if !self.allow_add && self.items.len() > self.count {
            return Err(FormError::Domain(format!(
                "There are more elements than specified in the collection ({}). Either set allow_add to true, or re-submit the form.",
                self.name()
            )));
        }
        tracing::trace!(collection = %self.name(), key, "Created collection item");
        Ok(())
    }

    /// Synchronizes the items with submitted data.
    ///
    /// `data` is an object keyed by item id or an array. Items missing from
    /// the data are removed, new ids create items from the target.
    pub fn populate_values(&mut self, data: &Value) -> FormResult<()> {
        if !data.is_object() && !data.is_array() {
            return Err(FormError::InvalidArgument(format!(
                "Collection '{}' expects a map or list of items, got {data}",
                self.name()
            )));
        }
        let entries = sorted_item_entries(data);

        if !self.allow_add && entries.len() > self.count {
            return Err(FormError::Domain(format!(
                "There are more elements than specified in the collection ({}). Either set allow_add to true, or re-submit the form.",
                self.name()
            )));
        }
        if !self.allow_remove && entries.len() < self.count {
            return Err(FormError::Domain(format!(
                "There are fewer elements than specified in the collection ({}). Either set allow_remove to true, or re-submit the form.",
                self.name()
            )));
        }

        let submitted: HashSet<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        let stale: Vec<String> = self
            .items
            .names()
            .into_iter()
            .filter(|name| !submitted.contains(name.as_str()))
            .collect();
        if !stale.is_empty() && !self.allow_remove {
            return Err(FormError::Domain(format!(
                "Elements have been removed from the collection ({}) but removal is not allowed.",
                self.name()
            )));
        }
        for name in &stale {
            self.items.remove(name);
        }

        for (key, value) in entries {
            if !self.items.has(&key) {
                self.add_new_target_instance(&key)?;
            }
            if let Some(item) = self.items.get_mut(&key) {
                match item {
                    Node::Element(element) => element.set_value(value.clone()),
                    other => other.populate(Some(value))?,
                }
            }
        }
        Ok(())
    }

    /// Binds each submitted item and returns the items as a list in id
    /// order.
    pub fn bind_values(
        &mut self,
        values: &Value,
        group: Option<&ValidationGroup>,
    ) -> FormResult<Value> {
        let mut bound = Vec::new();
        for (key, value) in sorted_item_entries(values) {
            let item_group = group
                .and_then(|g| g.get(&key))
                .and_then(GroupEntry::as_group);
            let item = match self.items.get_mut(&key) {
                Some(Node::Fieldset(fieldset)) => fieldset.bind_values(&as_map(value), item_group)?,
                Some(Node::Collection(collection)) => collection.bind_values(value, item_group)?,
                _ => value.clone(),
            };
            bound.push(item);
        }
        Ok(Value::Array(bound))
    }

    // ── Messages ─────────────────────────────────────────────────────

    /// Collection-level messages (reported under `__all__`).
    pub fn own_messages(&self) -> &[String] {
        &self.messages
    }

    pub fn set_messages(&mut self, mut messages: MessageMap) {
        self.messages = match messages.remove(NON_FIELD_KEY) {
            Some(Messages::Field(list)) => list,
            _ => Vec::new(),
        };
        self.items.set_messages(messages);
    }

    pub fn messages(&self) -> MessageMap {
        let mut messages = self.items.messages();
        if !self.messages.is_empty() {
            messages.insert(NON_FIELD_KEY.to_string(), Messages::Field(self.messages.clone()));
        }
        messages
    }

    // ── Preparation ──────────────────────────────────────────────────

    /// Creates items up to `count`, wraps item names, and builds the
    /// template item.
    pub(crate) fn prepare_element(&mut self, full_name: String) -> FormResult<()> {
        if self.target.is_some() && self.count > 0 {
            let next = self.last_child_index.map_or(0, |last| last + 1);
            for index in next..self.count as u64 {
                self.add_new_target_instance(&index.to_string())?;
            }
        }
        self.items.prepare_element(full_name.clone())?;

        if self.should_create_template {
            if let Some(target) = self.target.as_deref() {
                let mut template = target.clone();
                template.set_name(self.template_placeholder.clone());
                template.prepare(Some(&full_name))?;
                self.template = Some(Box::new(template));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use serde_json::json;

    fn tags() -> Collection {
        Collection::new("tags").with_target(Fieldset::new("tag").with(Element::text("label")))
    }

    #[test]
    fn test_prepare_creates_count_items() {
        let mut collection = tags().with_count(2).with_template(true);
        collection.prepare_element("tags".into()).unwrap();
        assert_eq!(collection.item_keys(), vec!["0", "1"]);
        let item = collection.get("1").and_then(Node::as_fieldset).unwrap();
        assert_eq!(item.element("label").unwrap().full_name(), "tags[1][label]");
        let template = collection.template_element().unwrap();
        assert_eq!(template.full_name(), "tags[__index__]");
        assert!(collection.get("__index__").is_none());
    }

    #[test]
    fn test_prepare_is_stable() {
        let mut collection = tags().with_count(2);
        collection.prepare_element("tags".into()).unwrap();
        collection.prepare_element("tags".into()).unwrap();
        assert_eq!(collection.items().len(), 2);
    }

    #[test]
    fn test_populate_adds_and_removes() {
        let mut collection = tags().with_count(2);
        collection.prepare_element("tags".into()).unwrap();
        collection
            .populate_values(&json!({"1": {"label": "b"}, "5": {"label": "f"}}))
            .unwrap();
        assert_eq!(collection.item_keys(), vec!["1", "5"]);
        assert_eq!(collection.last_child_index(), Some(5));
        let item = collection.get("5").and_then(Node::as_fieldset).unwrap();
        assert_eq!(item.element("label").unwrap().value(), &json!("f"));
        assert_eq!(item.element("label").unwrap().full_name(), "tags[5][label]");
    }

    #[test]
    fn test_populate_respects_allow_add() {
        let mut collection = tags().with_count(1).with_allow_add(false);
        let err = collection.populate_values(&json!([{}, {}])).unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn test_populate_respects_allow_remove() {
        let mut collection = tags().with_count(2).with_allow_remove(false);
        let err = collection.populate_values(&json!([{}])).unwrap_err();
        assert!(err.is_domain());

        let mut prepared = tags().with_count(1).with_allow_remove(false);
        prepared.prepare_element("tags".into()).unwrap();
        let err = prepared.populate_values(&json!({"3": {}})).unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn test_populate_rejects_scalars() {
        let err = tags().populate_values(&json!("x")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_element_target() {
        let mut collection = Collection::new("emails").with_target(Element::email("email"));
        collection.populate_values(&json!(["a@b.com", "c@d.com"])).unwrap();
        let first = collection.get("0").and_then(Node::as_element).unwrap();
        assert_eq!(first.value(), &json!("a@b.com"));
    }

    #[test]
    fn test_missing_target() {
        let err = Collection::new("x").populate_values(&json!([1])).unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn test_bind_values_orders_items() {
        let mut collection = tags();
        let bound = collection
            .bind_values(&json!({"10": {"label": "c"}, "2": {"label": "b"}}), None)
            .unwrap();
        assert_eq!(bound, json!([{"label": "b"}, {"label": "c"}]));
    }

    #[test]
    fn test_messages_round_trip() {
        let mut collection = tags().with_count(1);
        collection.prepare_element("tags".into()).unwrap();
        let mut item = MessageMap::new();
        item.insert("label".into(), Messages::Field(vec!["bad".into()]));
        let mut messages = MessageMap::new();
        messages.insert("0".into(), Messages::Nested(item));
        messages.insert(NON_FIELD_KEY.into(), Messages::Field(vec!["too few".into()]));
        collection.set_messages(messages.clone());
        assert_eq!(collection.own_messages(), ["too few".to_string()]);
        assert_eq!(collection.messages(), messages);
    }
}
