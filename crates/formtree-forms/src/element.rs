//! Leaf form elements.
//!
//! An [`Element`] has a name, a value, and attributes. Some kinds declare a
//! default input specification (an email element trims and checks the
//! address, a select element restricts values to its options); any element
//! can carry a custom one instead.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use formtree_filter::InputSpec;

/// The kind of a leaf element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Text,
    Email,
    Number,
    Checkbox {
        /// Value submitted when checked.
        checked_value: String,
        /// Value submitted when unchecked.
        unchecked_value: String,
    },
    Select {
        /// The permitted values.
        value_options: Vec<String>,
    },
    Hidden,
    Textarea,
    Date {
        /// A `chrono` format string.
        format: String,
    },
    Password,
}

impl ElementKind {
    /// A checkbox submitting `"1"` and `"0"`.
    pub fn checkbox() -> Self {
        Self::Checkbox {
            checked_value: "1".to_string(),
            unchecked_value: "0".to_string(),
        }
    }

    /// A date input in `YYYY-MM-DD` format.
    pub fn date() -> Self {
        Self::Date {
            format: "%Y-%m-%d".to_string(),
        }
    }

    /// The HTML input type.
    pub const fn input_type(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Number => "number",
            Self::Checkbox { .. } => "checkbox",
            Self::Select { .. } => "select",
            Self::Hidden => "hidden",
            Self::Textarea => "textarea",
            Self::Date { .. } => "date",
            Self::Password => "password",
        }
    }

    /// The input specification this kind implies, if any.
    pub fn default_input_spec(&self) -> Option<InputSpec> {
        let spec = match self {
            Self::Text | Self::Hidden | Self::Textarea | Self::Password => return None,
            Self::Email => InputSpec::new()
                .filter("string_trim")
                .validator("email_address", json!({})),
            Self::Number => InputSpec::new()
                .filter("string_trim")
                .validator("regex", json!({"pattern": r"^-?\d+(\.\d+)?$"})),
            Self::Checkbox {
                checked_value,
                unchecked_value,
            } => InputSpec::new().validator(
                "in_array",
                json!({"haystack": [checked_value, unchecked_value]}),
            ),
            Self::Select { value_options } => {
                let spec = InputSpec::new();
                if value_options.is_empty() {
                    spec
                } else {
                    spec.validator("in_array", json!({"haystack": value_options}))
                }
            }
            Self::Date { format } => InputSpec::new()
                .filter("string_trim")
                .validator("date", json!({"format": format})),
        };
        Some(spec)
    }
}

/// A leaf element of a form.
#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    full_name: Option<String>,
    kind: ElementKind,
    value: Value,
    label: Option<String>,
    attributes: BTreeMap<String, Value>,
    input_spec: Option<InputSpec>,
    messages: Vec<String>,
}

impl Element {
    /// Creates an element of the given kind.
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            full_name: None,
            kind,
            value: Value::Null,
            label: None,
            attributes: BTreeMap::new(),
            input_spec: None,
            messages: Vec::new(),
        }
    }

    /// A text element.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Text)
    }

    /// An email element.
    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Email)
    }

    /// A number element.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Number)
    }

    /// A hidden element.
    pub fn hidden(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Hidden)
    }

    /// A select element.
    pub fn select<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            ElementKind::Select {
                value_options: options.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    /// Replaces the kind's default input specification.
    #[must_use]
    pub fn with_input_spec(mut self, spec: InputSpec) -> Self {
        self.input_spec = Some(spec);
        self
    }

    /// The short name, used as the key in the enclosing fieldset.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the element.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The wrapped name (`parent[child]`) once prepared, or the short name.
    pub fn full_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn set_full_name(&mut self, full_name: String) {
        self.full_name = Some(full_name);
    }

    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub const fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Whether the `disabled` attribute is set to a truthy value.
    pub fn is_disabled(&self) -> bool {
        is_truthy(self.attributes.get("disabled"))
    }

    /// The input specification: the custom one if set, otherwise the
    /// kind's default. `None` means the element declares no rules.
    pub fn input_specification(&self) -> Option<InputSpec> {
        let mut spec = self
            .input_spec
            .clone()
            .or_else(|| self.kind.default_input_spec())?;
        spec.name.get_or_insert_with(|| self.name.clone());
        Some(spec)
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn set_messages(&mut self, messages: Vec<String>) {
        self.messages = messages;
    }
}

pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty() && s != "0" && s != "false",
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_kinds_have_no_spec() {
        assert!(Element::text("a").input_specification().is_none());
        assert!(Element::hidden("a").input_specification().is_none());
    }

    #[test]
    fn test_email_spec() {
        let spec = Element::email("contact").input_specification().unwrap();
        assert_eq!(spec.name.as_deref(), Some("contact"));
        assert!(spec.required);
        assert_eq!(spec.filters[0].name, "string_trim");
        assert_eq!(spec.validators[0].name, "email_address");
    }

    #[test]
    fn test_select_spec_uses_options() {
        let spec = Element::select("size", ["s", "m"]).input_specification().unwrap();
        assert_eq!(spec.validators[0].options["haystack"], json!(["s", "m"]));
        let empty = Element::select("size", Vec::<String>::new());
        assert!(empty.input_specification().unwrap().validators.is_empty());
    }

    #[test]
    fn test_custom_spec_wins() {
        let element = Element::email("contact").with_input_spec(InputSpec::new().required(false));
        let spec = element.input_specification().unwrap();
        assert!(!spec.required);
        assert!(spec.validators.is_empty());
    }

    #[test]
    fn test_disabled_attribute() {
        assert!(!Element::text("a").is_disabled());
        assert!(Element::text("a").with_attribute("disabled", json!(true)).is_disabled());
        assert!(Element::text("a").with_attribute("disabled", json!("disabled")).is_disabled());
        assert!(!Element::text("a").with_attribute("disabled", json!(false)).is_disabled());
    }

    #[test]
    fn test_full_name_defaults_to_name() {
        let mut element = Element::text("street");
        assert_eq!(element.full_name(), "street");
        element.set_full_name("address[street]".into());
        assert_eq!(element.full_name(), "address[street]");
        assert_eq!(element.name(), "street");
    }
}
