//! Building form trees from configuration.
//!
//! An [`ElementSpec`] describes one node; its `type` selects the node kind.
//! A [`FormSpec`] describes a whole form. Both deserialize from JSON or
//! TOML:
//!
//! ```toml
//! name = "signup"
//!
//! [[elements]]
//! type = "email"
//! name = "email"
//!
//! [[elements]]
//! type = "collection"
//! name = "phones"
//! count = 1
//! target = { type = "text", name = "phone" }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use formtree_core::{FormError, FormResult, FormSettings};
use formtree_filter::{InputFilterSpec, InputSpec};

use crate::collection::Collection;
use crate::element::{Element, ElementKind};
use crate::fieldset::Fieldset;
use crate::form::Form;
use crate::hydrator::MapHydrator;
use crate::node::Node;

/// The configuration of one form node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSpec {
    /// `text`, `email`, `number`, `checkbox`, `select`, `hidden`,
    /// `textarea`, `date`, `password`, `fieldset`, or `collection`.
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    /// A custom input specification for a leaf element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputSpec>,
    /// Select options.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub value_options: Vec<String>,
    /// Date format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Children of a fieldset.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<ElementSpec>,
    /// Declared input filter of a fieldset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_filter: Option<InputFilterSpec>,
    pub use_as_base_fieldset: bool,
    /// `map` binds the fieldset to a plain data map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydrator: Option<String>,

    /// The item template of a collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Box<ElementSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_add: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_remove: Option<bool>,
    pub should_create_template: bool,
}

impl Default for ElementSpec {
    fn default() -> Self {
        Self {
            kind: "text".to_string(),
            name: String::new(),
            label: None,
            value: None,
            attributes: BTreeMap::new(),
            input: None,
            value_options: Vec::new(),
            format: None,
            elements: Vec::new(),
            input_filter: None,
            use_as_base_fieldset: false,
            hydrator: None,
            target: None,
            count: None,
            allow_add: None,
            allow_remove: None,
            should_create_template: false,
        }
    }
}

impl ElementSpec {
    /// Builds the node this spec describes.
    pub fn create(&self) -> FormResult<Node> {
        if self.name.is_empty() {
            return Err(FormError::Configuration(format!(
                "{} element requires a name",
                self.kind
            )));
        }
        let node = match self.kind.as_str() {
            "fieldset" => Node::Fieldset(self.create_fieldset()?),
            "collection" => Node::Collection(self.create_collection()?),
            _ => Node::Element(self.create_element()?),
        };
        tracing::trace!(kind = %self.kind, name = %self.name, "Created node from spec");
        Ok(node)
    }

    fn create_element(&self) -> FormResult<Element> {
        let kind = match self.kind.as_str() {
            "text" => ElementKind::Text,
            "email" => ElementKind::Email,
            "number" => ElementKind::Number,
            "checkbox" => ElementKind::checkbox(),
            "select" => ElementKind::Select {
                value_options: self.value_options.clone(),
            },
            "hidden" => ElementKind::Hidden,
            "textarea" => ElementKind::Textarea,
            "date" => match &self.format {
                Some(format) => ElementKind::Date {
                    format: format.clone(),
                },
                None => ElementKind::date(),
            },
            "password" => ElementKind::Password,
            other => {
                return Err(FormError::Configuration(format!(
                    "Unknown element type '{other}' for '{}'",
                    self.name
                )))
            }
        };
        let mut element = Element::new(self.name.clone(), kind);
        for (key, value) in &self.attributes {
            element.set_attribute(key.clone(), value.clone());
        }
        if let Some(value) = &self.value {
            element.set_value(value.clone());
        }
        if let Some(label) = &self.label {
            element = element.with_label(label.clone());
        }
        if let Some(input) = &self.input {
            element = element.with_input_spec(input.clone());
        }
        Ok(element)
    }

    fn create_fieldset(&self) -> FormResult<Fieldset> {
        let mut fieldset = Fieldset::new(self.name.clone()).use_as_base_fieldset(self.use_as_base_fieldset);
        populate_fieldset(&mut fieldset, self)?;
        Ok(fieldset)
    }

    fn create_collection(&self) -> FormResult<Collection> {
        let mut collection = Collection::new(self.name.clone())
            .with_template(self.should_create_template);
        if let Some(target) = &self.target {
            collection.set_target(target.create()?);
        }
        if let Some(count) = self.count {
            collection.set_count(count);
        }
        if let Some(allow_add) = self.allow_add {
            collection = collection.with_allow_add(allow_add);
        }
        if let Some(allow_remove) = self.allow_remove {
            collection = collection.with_allow_remove(allow_remove);
        }
        for (key, value) in &self.attributes {
            collection = collection.with_attribute(key.clone(), value.clone());
        }
        Ok(collection)
    }
}

fn populate_fieldset(fieldset: &mut Fieldset, spec: &ElementSpec) -> FormResult<()> {
    for child in &spec.elements {
        fieldset.add(child.create()?);
    }
    for (key, value) in &spec.attributes {
        fieldset.set_attribute(key.clone(), value.clone());
    }
    if let Some(input_filter) = &spec.input_filter {
        fieldset.set_input_filter_spec(Some(input_filter.clone()));
    }
    match spec.hydrator.as_deref() {
        None => {}
        Some("map") => fieldset.set_hydrator(std::sync::Arc::new(MapHydrator)),
        Some(other) => {
            return Err(FormError::Configuration(format!(
                "Unknown hydrator '{other}' for '{}'",
                spec.name
            )))
        }
    }
    Ok(())
}

/// The configuration of a whole form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSpec {
    pub name: String,
    pub elements: Vec<ElementSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_filter: Option<InputFilterSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydrator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<FormSettings>,
}

impl FormSpec {
    /// Parses a form spec from TOML.
    pub fn from_toml_str(content: &str) -> FormResult<Self> {
        toml::from_str(content)
            .map_err(|e| FormError::Configuration(format!("Invalid form TOML: {e}")))
    }

    /// Parses a form spec from JSON.
    pub fn from_json_str(content: &str) -> FormResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| FormError::Configuration(format!("Invalid form JSON: {e}")))
    }

    /// Builds the form.
    pub fn create(&self) -> FormResult<Form> {
        let mut form = match &self.settings {
            Some(settings) => Form::with_settings(self.name.clone(), settings),
            None => Form::new(self.name.clone()),
        };
        let as_fieldset = ElementSpec {
            kind: "fieldset".to_string(),
            name: self.name.clone(),
            elements: Vec::new(),
            input_filter: self.input_filter.clone(),
            hydrator: self.hydrator.clone(),
            ..ElementSpec::default()
        };
        populate_fieldset(form.root_mut(), &as_fieldset)?;
        for child in &self.elements {
            form.add(child.create()?);
        }
        tracing::debug!(form = %self.name, elements = self.elements.len(), "Created form from spec");
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_element_from_json() {
        let spec: ElementSpec = serde_json::from_value(json!({
            "type": "select",
            "name": "size",
            "value_options": ["s", "m"],
            "attributes": {"disabled": true}
        }))
        .unwrap();
        let node = spec.create().unwrap();
        let element = node.as_element().unwrap();
        assert!(element.is_disabled());
        assert_eq!(
            element.kind(),
            &ElementKind::Select {
                value_options: vec!["s".into(), "m".into()]
            }
        );
    }

    #[test]
    fn test_type_defaults_to_text() {
        let spec: ElementSpec = serde_json::from_value(json!({"name": "title"})).unwrap();
        let node = spec.create().unwrap();
        assert_eq!(node.as_element().unwrap().kind(), &ElementKind::Text);
    }

    #[test]
    fn test_unknown_type() {
        let spec: ElementSpec = serde_json::from_value(json!({"type": "slider", "name": "x"})).unwrap();
        assert_eq!(spec.create().unwrap_err().code(), "configuration");
    }

    #[test]
    fn test_missing_name() {
        let spec = ElementSpec::default();
        assert_eq!(spec.create().unwrap_err().code(), "configuration");
    }

    #[test]
    fn test_nested_fieldset_and_collection() {
        let spec: ElementSpec = serde_json::from_value(json!({
            "type": "fieldset",
            "name": "order",
            "use_as_base_fieldset": true,
            "hydrator": "map",
            "elements": [
                {"type": "text", "name": "note"},
                {
                    "type": "collection",
                    "name": "lines",
                    "count": 2,
                    "allow_remove": false,
                    "target": {"type": "fieldset", "name": "line", "elements": [{"name": "sku"}]}
                }
            ]
        }))
        .unwrap();
        let node = spec.create().unwrap();
        let order = node.as_fieldset().unwrap();
        assert!(order.is_base_fieldset());
        assert!(order.hydrator().is_some());
        let lines = order.collection("lines").unwrap();
        assert_eq!(lines.count(), 2);
        assert!(!lines.allows_remove());
        assert!(lines.target().and_then(Node::as_fieldset).unwrap().has("sku"));
    }

    #[test]
    fn test_unknown_hydrator() {
        let spec: ElementSpec =
            serde_json::from_value(json!({"type": "fieldset", "name": "f", "hydrator": "orm"})).unwrap();
        assert_eq!(spec.create().unwrap_err().code(), "configuration");
    }

    #[test]
    fn test_form_from_toml() {
        let spec = FormSpec::from_toml_str(
            r#"
            name = "signup"

            [[elements]]
            type = "email"
            name = "email"

            [[elements]]
            type = "collection"
            name = "phones"
            count = 0
            target = { type = "text", name = "phone" }

            [input_filter.inputs.email]
            required = false
            "#,
        )
        .unwrap();
        let form = spec.create().unwrap();
        assert_eq!(form.name(), "signup");
        assert!(form.root().has("email"));
        assert!(form.root().collection("phones").is_some());
        assert!(form.root().input_filter_spec().is_some());
    }

    #[test]
    fn test_invalid_form_text() {
        assert!(FormSpec::from_json_str("[").is_err());
    }
}
