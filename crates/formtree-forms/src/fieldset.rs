//! Fieldsets: ordered containers of elements, fieldsets, and collections.
//!
//! A fieldset may be bound to an object through a [`Hydrator`]. Extraction
//! reads the object into a data map; binding writes validated values back,
//! recursing into child fieldsets that carry their own objects.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use formtree_core::FormResult;
use formtree_filter::data::as_map;
use formtree_filter::{DataMap, GroupEntry, InputFilterSpec, MessageMap, ValidationGroup};

use crate::collection::Collection;
use crate::element::{is_truthy, Element};
use crate::hydrator::Hydrator;
use crate::node::Node;

/// An ordered, named container of form nodes.
///
/// # Examples
///
/// ```
/// use formtree_forms::{Element, Fieldset};
///
/// let address = Fieldset::new("address")
///     .with(Element::text("street"))
///     .with(Element::text("zip"));
/// assert_eq!(address.len(), 2);
/// assert!(address.has("street"));
/// ```
pub struct Fieldset {
    name: String,
    full_name: Option<String>,
    label: Option<String>,
    attributes: BTreeMap<String, Value>,
    children: Vec<Node>,
    hydrator: Option<Arc<dyn Hydrator>>,
    object: Option<Box<dyn Any + Send + Sync>>,
    use_as_base_fieldset: bool,
    input_filter_spec: Option<InputFilterSpec>,
}

impl Fieldset {
    /// Creates an empty fieldset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: None,
            label: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            hydrator: None,
            object: None,
            use_as_base_fieldset: false,
            input_filter_spec: None,
        }
    }

    // ── Builder ──────────────────────────────────────────────────────

    /// Adds a child node.
    #[must_use]
    pub fn with(mut self, node: impl Into<Node>) -> Self {
        self.add(node);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Sets the hydrator used for the bound object.
    #[must_use]
    pub fn with_hydrator(mut self, hydrator: impl Hydrator + 'static) -> Self {
        self.hydrator = Some(Arc::new(hydrator));
        self
    }

    /// Marks this fieldset as the one a form binds its object through.
    #[must_use]
    pub const fn use_as_base_fieldset(mut self, base: bool) -> Self {
        self.use_as_base_fieldset = base;
        self
    }

    /// Declares the input filter for this fieldset's subtree.
    #[must_use]
    pub fn with_input_filter_spec(mut self, spec: InputFilterSpec) -> Self {
        self.input_filter_spec = Some(spec);
        self
    }

    // ── Naming and attributes ────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The wrapped name once prepared, or the short name.
    pub fn full_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn is_prepared(&self) -> bool {
        self.full_name.is_some()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn is_disabled(&self) -> bool {
        is_truthy(self.attributes.get("disabled"))
    }

    pub const fn is_base_fieldset(&self) -> bool {
        self.use_as_base_fieldset
    }

    pub fn set_use_as_base_fieldset(&mut self, base: bool) {
        self.use_as_base_fieldset = base;
    }

    pub const fn input_filter_spec(&self) -> Option<&InputFilterSpec> {
        self.input_filter_spec.as_ref()
    }

    pub fn set_input_filter_spec(&mut self, spec: Option<InputFilterSpec>) {
        self.input_filter_spec = spec;
    }

    // ── Children ─────────────────────────────────────────────────────

    /// Adds a child, replacing any child of the same name in place.
    pub fn add(&mut self, node: impl Into<Node>) {
        let node = node.into();
        match self.children.iter_mut().find(|c| c.name() == node.name()) {
            Some(slot) => *slot = node,
            None => self.children.push(node),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Node> {
        let index = self.children.iter().position(|c| c.name() == name)?;
        Some(self.children.remove(index))
    }

    pub fn has(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name() == name)
    }

    pub fn element(&self, name: &str) -> Option<&Element> {
        self.get(name).and_then(Node::as_element)
    }

    pub fn fieldset(&self, name: &str) -> Option<&Self> {
        self.get(name).and_then(Node::as_fieldset)
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.get(name).and_then(Node::as_collection)
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    /// Leaf elements in insertion order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn names(&self) -> Vec<String> {
        self.children.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    // ── Object binding ───────────────────────────────────────────────

    pub fn hydrator(&self) -> Option<&Arc<dyn Hydrator>> {
        self.hydrator.as_ref()
    }

    pub fn set_hydrator(&mut self, hydrator: Arc<dyn Hydrator>) {
        self.hydrator = Some(hydrator);
    }

    /// Binds an object. Values are extracted from and hydrated into it.
    pub fn set_object(&mut self, object: Box<dyn Any + Send + Sync>) {
        self.object = Some(object);
    }

    pub fn object(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.object.as_deref()
    }

    /// The bound object, if it is a `T`.
    pub fn object_as<T: 'static>(&self) -> Option<&T> {
        self.object.as_deref()?.downcast_ref::<T>()
    }

    pub fn take_object(&mut self) -> Option<Box<dyn Any + Send + Sync>> {
        self.object.take()
    }

    /// Whether an object is bound, and values may therefore be bound into it.
    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    /// Reads the bound object into a map.
    ///
    /// Child fieldsets with their own bound object contribute their own
    /// extraction under their name. Without an object or hydrator the
    /// result is empty.
    pub fn extract(&self) -> FormResult<DataMap> {
        let (Some(object), Some(hydrator)) = (self.object.as_deref(), &self.hydrator) else {
            return Ok(DataMap::new());
        };
        let mut values = hydrator.extract(object)?;
        for child in &self.children {
            if let Node::Fieldset(fieldset) = child {
                if fieldset.has_object() {
                    values.insert(fieldset.name.clone(), Value::Object(fieldset.extract()?));
                }
            }
        }
        Ok(values)
    }

    /// Pushes submitted values into the children.
    pub fn populate_values(&mut self, data: &DataMap) -> FormResult<()> {
        for child in &mut self.children {
            let value = data.get(child.name());
            child.populate(value)?;
        }
        Ok(())
    }

    /// Hydrates validated values into the bound object.
    ///
    /// Only children selected by `group` take part. A collection missing
    /// from `values` binds as empty. Disabled children keep the object's
    /// current value. Returns the bound object's extraction, or the
    /// hydratable map when no object is bound.
    pub fn bind_values(
        &mut self,
        values: &DataMap,
        group: Option<&ValidationGroup>,
    ) -> FormResult<Value> {
        let object_data = self.extract()?;
        let mut hydratable = DataMap::new();

        for child in &mut self.children {
            let name = child.name().to_string();
            if group.is_some_and(|g| !g.contains(&name)) {
                continue;
            }
            let child_group = group
                .and_then(|g| g.get(&name))
                .and_then(GroupEntry::as_group);

            let value = match values.get(&name) {
                Some(value) => value.clone(),
                None if matches!(child, Node::Collection(_)) => Value::Array(Vec::new()),
                None => continue,
            };
            let value = match child {
                Node::Fieldset(fieldset) if fieldset.has_object() => {
                    fieldset.bind_values(&as_map(&value), child_group)?
                }
                Node::Collection(collection) => collection.bind_values(&value, child_group)?,
                _ => value,
            };

            match object_data.get(&name) {
                Some(current) if child.is_disabled() => {
                    tracing::trace!(field = %name, "Keeping object value for disabled field");
                    hydratable.insert(name, current.clone());
                }
                _ => {
                    hydratable.insert(name, value);
                }
            }
        }

        if !hydratable.is_empty() {
            if let (Some(object), Some(hydrator)) = (self.object.as_deref_mut(), &self.hydrator) {
                hydrator.hydrate(hydratable, object)?;
                tracing::debug!(fieldset = %self.name, "Bound values into object");
                return Ok(Value::Object(self.extract()?));
            }
        }
        Ok(Value::Object(hydratable))
    }

    // ── Messages ─────────────────────────────────────────────────────

    /// Distributes messages to the children by name, clearing the others.
    pub fn set_messages(&mut self, messages: MessageMap) {
        for child in &mut self.children {
            match messages.get(child.name()) {
                Some(m) => child.set_messages(m.clone()),
                None => child.clear_messages(),
            }
        }
    }

    /// Collects the non-empty messages of the children.
    pub fn messages(&self) -> MessageMap {
        self.children
            .iter()
            .filter_map(|child| {
                let messages = child.messages();
                (!messages.is_empty()).then(|| (child.name().to_string(), messages))
            })
            .collect()
    }

    // ── Preparation ──────────────────────────────────────────────────

    /// Takes `full_name` and wraps every child's name under it.
    pub(crate) fn prepare_element(&mut self, full_name: String) -> FormResult<()> {
        for child in &mut self.children {
            child.prepare(Some(&full_name))?;
        }
        self.full_name = Some(full_name);
        Ok(())
    }
}

impl Clone for Fieldset {
    /// Clones the structure. The bound object is not cloned.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            full_name: self.full_name.clone(),
            label: self.label.clone(),
            attributes: self.attributes.clone(),
            children: self.children.clone(),
            hydrator: self.hydrator.clone(),
            object: None,
            use_as_base_fieldset: self.use_as_base_fieldset,
            input_filter_spec: self.input_filter_spec.clone(),
        }
    }
}

impl fmt::Debug for Fieldset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fieldset")
            .field("name", &self.name)
            .field("children", &self.children)
            .field("hydrator", &self.hydrator)
            .field("has_object", &self.object.is_some())
            .field("use_as_base_fieldset", &self.use_as_base_fieldset)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrator::{MapHydrator, SerdeHydrator};
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Address {
        street: String,
        city: String,
    }

    fn map(value: Value) -> DataMap {
        as_map(&value)
    }

    fn address_fieldset() -> Fieldset {
        Fieldset::new("address")
            .with(Element::text("street"))
            .with(Element::text("city"))
            .with_hydrator(SerdeHydrator::<Address>::new())
    }

    fn bound_address() -> Fieldset {
        let mut fieldset = address_fieldset();
        fieldset.set_object(Box::new(Address {
            street: "Main".into(),
            city: "Oslo".into(),
        }));
        fieldset
    }

    #[test]
    fn test_add_replaces_in_place() {
        let mut fieldset = Fieldset::new("f")
            .with(Element::text("a"))
            .with(Element::text("b"));
        fieldset.add(Element::email("a"));
        assert_eq!(fieldset.names(), vec!["a", "b"]);
        assert_eq!(fieldset.element("a").unwrap().kind().input_type(), "email");
    }

    #[test]
    fn test_populate_values() {
        let mut fieldset = Fieldset::new("f")
            .with(Element::text("a"))
            .with(Fieldset::new("nested").with(Element::text("b")));
        fieldset
            .populate_values(&map(json!({"a": "x", "nested": {"b": "y"}, "zzz": 1})))
            .unwrap();
        assert_eq!(fieldset.element("a").unwrap().value(), &json!("x"));
        let nested = fieldset.fieldset("nested").unwrap();
        assert_eq!(nested.element("b").unwrap().value(), &json!("y"));
    }

    #[test]
    fn test_extract_without_object_is_empty() {
        assert!(address_fieldset().extract().unwrap().is_empty());
    }

    #[test]
    fn test_extract_bound_object() {
        let data = bound_address().extract().unwrap();
        assert_eq!(data, map(json!({"street": "Main", "city": "Oslo"})));
    }

    #[test]
    fn test_bind_values_respects_group() {
        let mut fieldset = bound_address();
        let group = ValidationGroup::fields(["street"]);
        fieldset
            .bind_values(&map(json!({"street": "Side", "city": "Bergen"})), Some(&group))
            .unwrap();
        let address = fieldset.object_as::<Address>().unwrap();
        assert_eq!(address.street, "Side");
        assert_eq!(address.city, "Oslo");
    }

    #[test]
    fn test_bind_values_keeps_disabled_from_object() {
        let mut fieldset = Fieldset::new("address")
            .with(Element::text("street"))
            .with(Element::text("city").with_attribute("disabled", json!(true)))
            .with_hydrator(SerdeHydrator::<Address>::new());
        fieldset.set_object(Box::new(Address {
            street: "Main".into(),
            city: "Oslo".into(),
        }));
        fieldset
            .bind_values(&map(json!({"street": "Side", "city": "Bergen"})), None)
            .unwrap();
        assert_eq!(fieldset.object_as::<Address>().unwrap().city, "Oslo");
    }

    #[test]
    fn test_bind_values_without_object_returns_map() {
        let mut fieldset = address_fieldset();
        let value = fieldset
            .bind_values(&map(json!({"street": "Side"})), None)
            .unwrap();
        assert_eq!(value, json!({"street": "Side"}));
    }

    #[test]
    fn test_nested_object_is_extracted_and_bound() {
        let mut outer = Fieldset::new("profile")
            .with(Element::text("nick"))
            .with(bound_address())
            .with_hydrator(MapHydrator);
        outer.set_object(Box::new(map(json!({"nick": "ann"}))));

        let data = outer.extract().unwrap();
        assert_eq!(data["address"]["city"], json!("Oslo"));

        outer
            .bind_values(
                &map(json!({"nick": "bo", "address": {"street": "Side", "city": "Oslo"}})),
                None,
            )
            .unwrap();
        let address = outer.fieldset("address").unwrap().object_as::<Address>().unwrap();
        assert_eq!(address.street, "Side");
        assert_eq!(outer.object_as::<DataMap>().unwrap()["nick"], json!("bo"));
    }

    #[test]
    fn test_messages_distribute_and_clear() {
        let mut fieldset = Fieldset::new("f")
            .with(Element::text("a"))
            .with(Element::text("b"));
        let mut messages = MessageMap::new();
        messages.insert("a".into(), formtree_filter::Messages::Field(vec!["bad".into()]));
        fieldset.set_messages(messages);
        assert_eq!(fieldset.messages().len(), 1);
        fieldset.set_messages(MessageMap::new());
        assert!(fieldset.messages().is_empty());
    }

    #[test]
    fn test_clone_drops_object() {
        let fieldset = bound_address();
        assert!(fieldset.has_object());
        assert!(!fieldset.clone().has_object());
    }

    #[test]
    fn test_prepare_wraps_names() {
        let mut fieldset = address_fieldset();
        fieldset.prepare_element("address".into()).unwrap();
        assert_eq!(fieldset.element("street").unwrap().full_name(), "address[street]");
    }
}
