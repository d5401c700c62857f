//! Serializable input specifications and the factory that builds them.
//!
//! Specs describe inputs the way a configuration file would: flags plus
//! named filters and validators with an options map. The
//! [`InputFilterFactory`] resolves those names through a registry, so
//! applications can add their own filters and validators by name.
//!
//! ```toml
//! [inputs.username]
//! required = true
//! filters = [{ name = "string_trim" }]
//! validators = [{ name = "string_length", options = { min = 3, max = 20 } }]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use formtree_core::{FormError, FormResult};

use crate::data::DataMap;
use crate::filters::{Boolean, Filter, StringToLower, StringTrim, StripTags, ToInt, ToNull};
use crate::input::Input;
use crate::input_filter::{CollectionInputFilter, InputFilter};
use crate::validators::{
    Between, Date, Digits, EmailAddress, Identical, InArray, NotEmpty, RegexValidator,
    StringLength, Uuid, Validator,
};

/// A named filter with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Registry name, e.g. `string_trim`.
    pub name: String,
    /// Constructor options.
    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub options: DataMap,
}

impl FilterSpec {
    /// Creates a filter spec without options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: DataMap::new(),
        }
    }
}

/// A named validator with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSpec {
    /// Registry name, e.g. `string_length`.
    pub name: String,
    /// Constructor options.
    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub options: DataMap,
    /// Stop the validator chain when this validator fails.
    #[serde(default)]
    pub break_chain_on_failure: bool,
}

impl ValidatorSpec {
    /// Creates a validator spec with the given options.
    pub fn new(name: impl Into<String>, options: DataMap) -> Self {
        Self {
            name: name.into(),
            options,
            break_chain_on_failure: false,
        }
    }
}

/// The specification of a single input.
///
/// Custom filter and validator instances can be attached in code; they are
/// not serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSpec {
    /// Overrides the entry name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub required: bool,
    pub allow_empty: bool,
    pub continue_if_empty: bool,
    pub break_on_failure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_value: Option<Value>,
    pub filters: Vec<FilterSpec>,
    pub validators: Vec<ValidatorSpec>,
    #[serde(skip)]
    pub custom_filters: Vec<Arc<dyn Filter>>,
    #[serde(skip)]
    pub custom_validators: Vec<Arc<dyn Validator>>,
}

impl Default for InputSpec {
    fn default() -> Self {
        Self {
            name: None,
            required: true,
            allow_empty: false,
            continue_if_empty: false,
            break_on_failure: false,
            error_message: None,
            fallback_value: None,
            filters: Vec::new(),
            validators: Vec::new(),
            custom_filters: Vec::new(),
            custom_validators: Vec::new(),
        }
    }
}

impl InputSpec {
    /// Creates a required input spec with no filters or validators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the input is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets whether empty values are accepted.
    #[must_use]
    pub const fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    /// Appends a named filter without options.
    #[must_use]
    pub fn filter(mut self, name: impl Into<String>) -> Self {
        self.filters.push(FilterSpec::new(name));
        self
    }

    /// Appends a named validator.
    #[must_use]
    pub fn validator(mut self, name: impl Into<String>, options: Value) -> Self {
        let options = match options {
            Value::Object(map) => map,
            _ => DataMap::new(),
        };
        self.validators.push(ValidatorSpec::new(name, options));
        self
    }

    /// Appends a validator instance.
    #[must_use]
    pub fn custom_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.custom_validators.push(Arc::new(validator));
        self
    }

    /// Appends a filter instance.
    #[must_use]
    pub fn custom_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.custom_filters.push(Arc::new(filter));
        self
    }

    /// Sets a message replacing all validator messages.
    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// The specification of a repeating input filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSpec {
    /// The filter applied to each item.
    pub input_filter: InputFilterSpec,
    /// Minimum number of items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Whether at least one item is required.
    pub required: bool,
}

/// The specification of a hierarchical input filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFilterSpec {
    pub inputs: BTreeMap<String, InputSpec>,
    pub filters: BTreeMap<String, InputFilterSpec>,
    pub collections: BTreeMap<String, CollectionSpec>,
}

impl InputFilterSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input spec.
    #[must_use]
    pub fn input(mut self, name: impl Into<String>, spec: InputSpec) -> Self {
        self.inputs.insert(name.into(), spec);
        self
    }

    /// Adds a nested filter spec.
    #[must_use]
    pub fn filter(mut self, name: impl Into<String>, spec: Self) -> Self {
        self.filters.insert(name.into(), spec);
        self
    }

    /// Adds a collection spec.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>, spec: CollectionSpec) -> Self {
        self.collections.insert(name.into(), spec);
        self
    }

    /// Returns `true` if the spec declares nothing.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.filters.is_empty() && self.collections.is_empty()
    }

    /// Parses a spec from TOML.
    pub fn from_toml_str(content: &str) -> FormResult<Self> {
        toml::from_str(content)
            .map_err(|e| FormError::Configuration(format!("Invalid input filter TOML: {e}")))
    }

    /// Parses a spec from JSON.
    pub fn from_json_str(content: &str) -> FormResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| FormError::Configuration(format!("Invalid input filter JSON: {e}")))
    }
}

/// Builds a filter from its options.
pub type FilterConstructor = fn(&DataMap) -> FormResult<Arc<dyn Filter>>;

/// Builds a validator from its options.
pub type ValidatorConstructor = fn(&DataMap) -> FormResult<Arc<dyn Validator>>;

/// Turns specs into inputs and input filters.
///
/// # Examples
///
/// ```
/// use formtree_filter::{InputFilterFactory, InputSpec};
/// use serde_json::json;
///
/// let factory = InputFilterFactory::new();
/// let spec = InputSpec::new()
///     .filter("string_trim")
///     .validator("string_length", json!({"min": 3}));
/// let input = factory.create_input("username", &spec).unwrap();
/// assert_eq!(input.validator_count(), 1);
/// ```
#[derive(Clone)]
pub struct InputFilterFactory {
    filters: HashMap<String, FilterConstructor>,
    validators: HashMap<String, ValidatorConstructor>,
}

impl Default for InputFilterFactory {
    fn default() -> Self {
        let mut factory = Self {
            filters: HashMap::new(),
            validators: HashMap::new(),
        };
        factory.register_filter("string_trim", |_| Ok(Arc::new(StringTrim)));
        factory.register_filter("string_to_lower", |_| Ok(Arc::new(StringToLower)));
        factory.register_filter("strip_tags", |_| Ok(Arc::new(StripTags)));
        factory.register_filter("to_int", |_| Ok(Arc::new(ToInt)));
        factory.register_filter("to_null", |_| Ok(Arc::new(ToNull)));
        factory.register_filter("boolean", |_| Ok(Arc::new(Boolean)));

        factory.register_validator("not_empty", |_| Ok(Arc::new(NotEmpty)));
        factory.register_validator("string_length", |o| {
            Ok(Arc::new(StringLength::new(opt_usize(o, "min")?, opt_usize(o, "max")?)))
        });
        factory.register_validator("email_address", |_| Ok(Arc::new(EmailAddress)));
        factory.register_validator("regex", |o| {
            let pattern = opt_str(o, "pattern")?
                .ok_or_else(|| FormError::Configuration("regex requires a 'pattern' option".into()))?;
            let validator = RegexValidator::new(&pattern)
                .map_err(|e| FormError::Configuration(format!("Invalid regex '{pattern}': {e}")))?;
            Ok(Arc::new(validator))
        });
        factory.register_validator("between", |o| {
            let min = opt_f64(o, "min")?.unwrap_or(f64::MIN);
            let max = opt_f64(o, "max")?.unwrap_or(f64::MAX);
            let mut validator = Between::new(min, max);
            validator.inclusive = opt_bool(o, "inclusive")?.unwrap_or(true);
            Ok(Arc::new(validator))
        });
        factory.register_validator("in_array", |o| {
            let haystack = match o.get("haystack") {
                Some(Value::Array(items)) => items.clone(),
                Some(_) => {
                    return Err(FormError::Configuration(
                        "in_array 'haystack' must be a list".into(),
                    ))
                }
                None => Vec::new(),
            };
            let mut validator = InArray::new(haystack);
            validator.strict = opt_bool(o, "strict")?.unwrap_or(false);
            Ok(Arc::new(validator))
        });
        factory.register_validator("digits", |_| Ok(Arc::new(Digits)));
        factory.register_validator("date", |o| {
            let mut validator = Date::default();
            if let Some(format) = opt_str(o, "format")? {
                validator.format = format;
            }
            Ok(Arc::new(validator))
        });
        factory.register_validator("uuid", |_| Ok(Arc::new(Uuid)));
        factory.register_validator("identical", |o| {
            let token = opt_str(o, "token")?
                .ok_or_else(|| FormError::Configuration("identical requires a 'token' option".into()))?;
            Ok(Arc::new(Identical::new(token)))
        });
        factory
    }
}

impl fmt::Debug for InputFilterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<_> = self.filters.keys().collect();
        filters.sort();
        let mut validators: Vec<_> = self.validators.keys().collect();
        validators.sort();
        f.debug_struct("InputFilterFactory")
            .field("filters", &filters)
            .field("validators", &validators)
            .finish()
    }
}

impl InputFilterFactory {
    /// Creates a factory with the built-in filters and validators registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a filter constructor.
    pub fn register_filter(&mut self, name: impl Into<String>, constructor: FilterConstructor) {
        self.filters.insert(name.into(), constructor);
    }

    /// Registers (or replaces) a validator constructor.
    pub fn register_validator(&mut self, name: impl Into<String>, constructor: ValidatorConstructor) {
        self.validators.insert(name.into(), constructor);
    }

    /// Builds a filter from its spec.
    pub fn create_filter(&self, spec: &FilterSpec) -> FormResult<Arc<dyn Filter>> {
        let constructor = self
            .filters
            .get(&spec.name)
            .ok_or_else(|| FormError::Configuration(format!("Unknown filter '{}'", spec.name)))?;
        constructor(&spec.options)
    }

    /// Builds a validator from its spec.
    pub fn create_validator(&self, spec: &ValidatorSpec) -> FormResult<Arc<dyn Validator>> {
        let constructor = self.validators.get(&spec.name).ok_or_else(|| {
            FormError::Configuration(format!("Unknown validator '{}'", spec.name))
        })?;
        constructor(&spec.options)
    }

    /// Builds an input. The spec's own name, if set, wins over `name`.
    pub fn create_input(&self, name: &str, spec: &InputSpec) -> FormResult<Input> {
        let mut input = Input::new(spec.name.as_deref().unwrap_or(name))
            .required(spec.required)
            .allow_empty(spec.allow_empty)
            .continue_if_empty(spec.continue_if_empty)
            .break_on_failure(spec.break_on_failure);
        if let Some(message) = &spec.error_message {
            input = input.error_message(message.clone());
        }
        if let Some(fallback) = &spec.fallback_value {
            input = input.fallback_value(fallback.clone());
        }
        for filter in &spec.filters {
            input = input.filter_arc(self.create_filter(filter)?);
        }
        for filter in &spec.custom_filters {
            input = input.filter_arc(Arc::clone(filter));
        }
        for validator in &spec.validators {
            input = input.validator_arc(self.create_validator(validator)?, validator.break_chain_on_failure);
        }
        for validator in &spec.custom_validators {
            input = input.validator_arc(Arc::clone(validator), false);
        }
        Ok(input)
    }

    /// Builds a hierarchical input filter.
    pub fn create_input_filter(&self, spec: &InputFilterSpec) -> FormResult<InputFilter> {
        let mut filter = InputFilter::new();
        for (name, input) in &spec.inputs {
            filter.add(name.clone(), self.create_input(name, input)?);
        }
        for (name, nested) in &spec.filters {
            filter.add(name.clone(), self.create_input_filter(nested)?);
        }
        for (name, collection) in &spec.collections {
            filter.add(name.clone(), self.create_collection_input_filter(collection)?);
        }
        tracing::trace!(entries = filter.len(), "Built input filter from spec");
        Ok(filter)
    }

    /// Builds a repeating input filter.
    pub fn create_collection_input_filter(
        &self,
        spec: &CollectionSpec,
    ) -> FormResult<CollectionInputFilter> {
        let mut collection = CollectionInputFilter::new(self.create_input_filter(&spec.input_filter)?)
            .required(spec.required);
        if let Some(count) = spec.count {
            collection = collection.with_count(count);
        }
        Ok(collection)
    }
}

// ── Option helpers ───────────────────────────────────────────────────

fn option_error(key: &str, expected: &str) -> FormError {
    FormError::Configuration(format!("Option '{key}' must be {expected}"))
}

fn opt_usize(options: &DataMap, key: &str) -> FormResult<Option<usize>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| option_error(key, "a non-negative integer")),
        Some(_) => Err(option_error(key, "a non-negative integer")),
    }
}

fn opt_f64(options: &DataMap, key: &str) -> FormResult<Option<f64>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(option_error(key, "a number")),
    }
}

fn opt_bool(options: &DataMap, key: &str) -> FormResult<Option<bool>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(option_error(key, "a boolean")),
    }
}

fn opt_str(options: &DataMap, key: &str) -> FormResult<Option<String>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(option_error(key, "a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_filter::Entry;
    use crate::validators::Callback;
    use serde_json::json;

    fn map(value: Value) -> DataMap {
        crate::data::as_map(&value)
    }

    #[test]
    fn test_input_spec_defaults_required() {
        let spec: InputSpec = serde_json::from_value(json!({})).unwrap();
        assert!(spec.required);
        assert!(spec.filters.is_empty());
    }

    #[test]
    fn test_create_input_from_spec() {
        let factory = InputFilterFactory::new();
        let spec = InputSpec::new()
            .filter("string_trim")
            .validator("string_length", json!({"min": 3, "max": 5}));
        let mut input = factory.create_input("code", &spec).unwrap();
        input.set_value(json!("  abcdefg "));
        assert!(!input.is_valid(&DataMap::new()));
        input.set_value(json!(" abc "));
        assert!(input.is_valid(&DataMap::new()));
        assert_eq!(input.value(), json!("abc"));
    }

    #[test]
    fn test_spec_name_overrides() {
        let factory = InputFilterFactory::new();
        let spec = InputSpec {
            name: Some("renamed".into()),
            ..InputSpec::default()
        };
        assert_eq!(factory.create_input("orig", &spec).unwrap().name(), "renamed");
    }

    #[test]
    fn test_unknown_names_are_configuration_errors() {
        let factory = InputFilterFactory::new();
        let err = factory
            .create_input("x", &InputSpec::new().filter("nope"))
            .unwrap_err();
        assert_eq!(err.code(), "configuration");
        let err = factory
            .create_validator(&ValidatorSpec::new("nope", DataMap::new()))
            .unwrap_err();
        assert_eq!(err.code(), "configuration");
    }

    #[test]
    fn test_bad_options() {
        let factory = InputFilterFactory::new();
        let spec = ValidatorSpec::new("string_length", map(json!({"min": "three"})));
        assert!(factory.create_validator(&spec).is_err());
        let spec = ValidatorSpec::new("regex", DataMap::new());
        assert!(factory.create_validator(&spec).is_err());
        let spec = ValidatorSpec::new("regex", map(json!({"pattern": "("})));
        assert!(factory.create_validator(&spec).is_err());
    }

    #[test]
    fn test_builtin_validators_resolve() {
        let factory = InputFilterFactory::new();
        for (name, options) in [
            ("not_empty", json!({})),
            ("email_address", json!({})),
            ("regex", json!({"pattern": "^a"})),
            ("between", json!({"min": 1, "max": 2, "inclusive": false})),
            ("in_array", json!({"haystack": ["a"], "strict": true})),
            ("digits", json!({})),
            ("date", json!({"format": "%d/%m/%Y"})),
            ("uuid", json!({})),
            ("identical", json!({"token": "password"})),
        ] {
            let spec = ValidatorSpec::new(name, map(options));
            assert!(factory.create_validator(&spec).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_register_custom_validator() {
        let mut factory = InputFilterFactory::new();
        factory.register_validator("even", |_| {
            Ok(Arc::new(Callback::new("Must be even", |v, _| {
                v.as_i64().is_some_and(|n| n % 2 == 0)
            })))
        });
        let mut input = factory
            .create_input("n", &InputSpec::new().validator("even", json!({})))
            .unwrap();
        input.set_value(json!(3));
        assert!(!input.is_valid(&DataMap::new()));
        assert_eq!(input.messages(), ["Must be even".to_string()]);
    }

    #[test]
    fn test_create_input_filter_from_toml() {
        let spec = InputFilterSpec::from_toml_str(
            r#"
            [inputs.email]
            validators = [{ name = "email_address" }]

            [filters.address.inputs.street]
            filters = [{ name = "string_trim" }]

            [collections.tags]
            required = true
            [collections.tags.input_filter.inputs.label]
            "#,
        )
        .unwrap();
        let filter = InputFilterFactory::new().create_input_filter(&spec).unwrap();
        assert!(filter.get("email").is_some_and(Entry::is_input));
        assert!(filter.get("address").and_then(Entry::as_filter).is_some());
        let tags = filter.get("tags").and_then(Entry::as_collection).unwrap();
        assert!(tags.is_required());
        assert!(tags.inner().has("label"));
    }

    #[test]
    fn test_invalid_spec_text() {
        let err = InputFilterSpec::from_json_str("{").unwrap_err();
        assert_eq!(err.code(), "configuration");
    }
}
