//! A single named input: a raw value, a filter chain, and a validator chain.
//!
//! Validation follows these rules, in order:
//!
//! 1. No value and a fallback: the fallback becomes the value; valid.
//! 2. No value and not required: valid.
//! 3. No value and required: invalid with the "required" message.
//! 4. Empty value and not required (or empty allowed), unless
//!    `continue_if_empty` is set: valid.
//! 5. Otherwise an implicit not-empty check runs (unless empty values are
//!    allowed or `continue_if_empty` is set), then every validator. A failing
//!    validator with a fallback present still yields the fallback and passes.

use std::sync::Arc;

use serde_json::Value;

use crate::data::{is_empty_value, DataMap};
use crate::filters::Filter;
use crate::validators::{NotEmpty, Validator};

/// A validator together with its chain-breaking flag.
#[derive(Debug, Clone)]
struct ChainedValidator {
    validator: Arc<dyn Validator>,
    break_chain_on_failure: bool,
}

/// A named input with filters and validators.
///
/// # Examples
///
/// ```
/// use formtree_filter::Input;
/// use formtree_filter::filters::StringTrim;
/// use formtree_filter::validators::EmailAddress;
/// use formtree_filter::DataMap;
/// use serde_json::json;
///
/// let mut input = Input::new("email").filter(StringTrim).validator(EmailAddress);
/// input.set_value(json!("  a@b.com "));
/// assert!(input.is_valid(&DataMap::new()));
/// assert_eq!(input.value(), json!("a@b.com"));
/// ```
#[derive(Debug, Clone)]
pub struct Input {
    name: String,
    required: bool,
    allow_empty: bool,
    continue_if_empty: bool,
    break_on_failure: bool,
    error_message: Option<String>,
    fallback_value: Option<Value>,
    filters: Vec<Arc<dyn Filter>>,
    validators: Vec<ChainedValidator>,
    raw_value: Option<Value>,
    fallback_applied: bool,
    messages: Vec<String>,
}

impl Input {
    /// Creates a required input with no filters or validators.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            allow_empty: false,
            continue_if_empty: false,
            break_on_failure: false,
            error_message: None,
            fallback_value: None,
            filters: Vec::new(),
            validators: Vec::new(),
            raw_value: None,
            fallback_applied: false,
            messages: Vec::new(),
        }
    }

    // ── Builder ──────────────────────────────────────────────────────

    /// Sets whether a value must be present.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets whether an empty value is acceptable for a required input.
    #[must_use]
    pub const fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    /// Sets whether validators still run on empty values.
    #[must_use]
    pub const fn continue_if_empty(mut self, continue_if_empty: bool) -> Self {
        self.continue_if_empty = continue_if_empty;
        self
    }

    /// Sets whether a failure of this input stops the enclosing filter.
    #[must_use]
    pub const fn break_on_failure(mut self, break_on_failure: bool) -> Self {
        self.break_on_failure = break_on_failure;
        self
    }

    /// Replaces all validator messages with a single message.
    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Sets the value used when the input is missing or invalid.
    #[must_use]
    pub fn fallback_value(mut self, value: Value) -> Self {
        self.fallback_value = Some(value);
        self
    }

    /// Appends a filter to the chain.
    #[must_use]
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Appends a validator to the chain.
    #[must_use]
    pub fn validator(self, validator: impl Validator + 'static) -> Self {
        self.validator_arc(Arc::new(validator), false)
    }

    /// Appends a shared validator, optionally stopping the chain on failure.
    #[must_use]
    pub fn validator_arc(mut self, validator: Arc<dyn Validator>, break_chain_on_failure: bool) -> Self {
        self.validators.push(ChainedValidator {
            validator,
            break_chain_on_failure,
        });
        self
    }

    /// Appends a shared filter.
    #[must_use]
    pub fn filter_arc(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The input name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the input.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether a value must be present.
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Sets whether a value must be present.
    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    /// Whether an empty value is acceptable.
    pub const fn allows_empty(&self) -> bool {
        self.allow_empty
    }

    /// Whether validators run on empty values.
    pub const fn continues_if_empty(&self) -> bool {
        self.continue_if_empty
    }

    /// Whether a failure of this input stops the enclosing filter.
    pub const fn breaks_on_failure(&self) -> bool {
        self.break_on_failure
    }

    /// The fallback value, if any.
    pub const fn fallback(&self) -> Option<&Value> {
        self.fallback_value.as_ref()
    }

    /// The number of filters in the chain.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// The number of validators in the chain.
    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    // ── Values ───────────────────────────────────────────────────────

    /// Sets the raw value.
    pub fn set_value(&mut self, value: Value) {
        self.raw_value = Some(value);
        self.fallback_applied = false;
    }

    /// Forgets the raw value.
    pub fn reset_value(&mut self) {
        self.raw_value = None;
        self.fallback_applied = false;
    }

    /// Whether a raw value has been set.
    pub const fn has_value(&self) -> bool {
        self.raw_value.is_some()
    }

    /// The raw value, or null.
    pub fn raw_value(&self) -> Value {
        self.raw_value.clone().unwrap_or(Value::Null)
    }

    /// The filtered value, or the fallback once it has been applied.
    pub fn value(&self) -> Value {
        if self.fallback_applied {
            return self.fallback_value.clone().unwrap_or(Value::Null);
        }
        match &self.raw_value {
            Some(raw) => self
                .filters
                .iter()
                .fold(raw.clone(), |value, filter| filter.filter(value)),
            None => Value::Null,
        }
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Validates the current value. `context` is the data of the enclosing filter.
    pub fn is_valid(&mut self, context: &DataMap) -> bool {
        self.messages.clear();
        self.fallback_applied = false;

        if !self.has_value() {
            if self.fallback_value.is_some() {
                self.fallback_applied = true;
                return true;
            }
            if !self.required {
                return true;
            }
            self.messages.push(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| NotEmpty::MESSAGE.to_string()),
            );
            return false;
        }

        let value = self.value();
        let empty = is_empty_value(&value);
        if empty && !self.continue_if_empty && (!self.required || self.allow_empty) {
            return true;
        }

        let mut errors = Vec::new();
        if empty && !self.continue_if_empty && !self.allow_empty {
            errors.push(NotEmpty::MESSAGE.to_string());
        } else {
            for chained in &self.validators {
                if let Err(e) = chained.validator.validate(&value, context) {
                    errors.push(e.message);
                    if chained.break_chain_on_failure {
                        break;
                    }
                }
            }
        }

        if errors.is_empty() {
            return true;
        }
        if self.fallback_value.is_some() {
            self.fallback_applied = true;
            return true;
        }
        self.messages = match &self.error_message {
            Some(message) => vec![message.clone()],
            None => errors,
        };
        false
    }

    /// Messages from the last validation.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Takes over the flags of `other` and appends its filters and validators.
    ///
    /// The raw value of `other` is copied only if it has one.
    pub fn merge(&mut self, other: &Self) {
        self.break_on_failure = other.break_on_failure;
        self.continue_if_empty = other.continue_if_empty;
        self.error_message.clone_from(&other.error_message);
        self.name.clone_from(&other.name);
        self.required = other.required;
        self.allow_empty = other.allow_empty;
        if other.fallback_value.is_some() {
            self.fallback_value.clone_from(&other.fallback_value);
        }
        if let Some(raw) = &other.raw_value {
            self.set_value(raw.clone());
        }
        self.filters.extend(other.filters.iter().cloned());
        self.validators.extend(other.validators.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::StringTrim;
    use crate::validators::{EmailAddress, StringLength};
    use serde_json::json;

    fn ctx() -> DataMap {
        DataMap::new()
    }

    #[test]
    fn test_missing_required_value() {
        let mut input = Input::new("name");
        assert!(!input.is_valid(&ctx()));
        assert_eq!(input.messages(), [NotEmpty::MESSAGE.to_string()]);
    }

    #[test]
    fn test_missing_optional_value() {
        let mut input = Input::new("name").required(false);
        assert!(input.is_valid(&ctx()));
        assert!(input.messages().is_empty());
    }

    #[test]
    fn test_empty_required_value_fails() {
        let mut input = Input::new("name").validator(StringLength::new(Some(3), None));
        input.set_value(json!(" "));
        let mut trimmed = input.clone().filter(StringTrim);
        assert!(!input.is_valid(&ctx()));
        assert!(input.messages()[0].contains("at least 3"));
        assert!(!trimmed.is_valid(&ctx()));
        assert_eq!(trimmed.messages(), [NotEmpty::MESSAGE.to_string()]);
    }

    #[test]
    fn test_empty_allowed() {
        let mut input = Input::new("nick").allow_empty(true).validator(EmailAddress);
        input.set_value(json!(""));
        assert!(input.is_valid(&ctx()));
    }

    #[test]
    fn test_continue_if_empty_runs_validators() {
        let mut input = Input::new("nick")
            .required(false)
            .continue_if_empty(true)
            .validator(EmailAddress);
        input.set_value(json!(""));
        assert!(!input.is_valid(&ctx()));
    }

    #[test]
    fn test_fallback_value() {
        let mut input = Input::new("size")
            .fallback_value(json!("m"))
            .validator(StringLength::new(None, Some(2)));
        assert!(input.is_valid(&ctx()));
        assert_eq!(input.value(), json!("m"));

        input.set_value(json!("huge"));
        assert!(input.is_valid(&ctx()));
        assert_eq!(input.value(), json!("m"));
        assert_eq!(input.raw_value(), json!("huge"));
    }

    #[test]
    fn test_error_message_overrides() {
        let mut input = Input::new("email")
            .validator(EmailAddress)
            .error_message("Bad email");
        input.set_value(json!("nope"));
        assert!(!input.is_valid(&ctx()));
        assert_eq!(input.messages(), ["Bad email".to_string()]);
    }

    #[test]
    fn test_break_chain_on_failure() {
        let mut input = Input::new("code")
            .validator_arc(Arc::new(StringLength::new(Some(10), None)), true)
            .validator(EmailAddress);
        input.set_value(json!("short"));
        assert!(!input.is_valid(&ctx()));
        assert_eq!(input.messages().len(), 1);
    }

    #[test]
    fn test_merge_takes_flags_and_appends_chains() {
        let mut element_input = Input::new("email").filter(StringTrim).validator(EmailAddress);
        let declared = Input::new("email")
            .required(false)
            .validator(StringLength::new(None, Some(5)));
        element_input.merge(&declared);

        assert!(!element_input.is_required());
        assert_eq!(element_input.filter_count(), 1);
        assert_eq!(element_input.validator_count(), 2);
        assert!(!element_input.has_value());
    }
}
