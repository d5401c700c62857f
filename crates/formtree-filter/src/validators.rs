//! Validators applied to filtered input values.
//!
//! Each validator checks a single constraint and returns a
//! [`ValidationError`] if the value does not satisfy it. Validators receive
//! the whole data map of the enclosing filter as context, so cross-field
//! rules such as [`Identical`] can look at sibling values.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use formtree_core::ValidationError;

use crate::data::{is_empty_value, DataMap};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

/// A trait for validating input values.
///
/// # Examples
///
/// ```
/// use formtree_filter::validators::{StringLength, Validator};
/// use formtree_filter::DataMap;
/// use serde_json::json;
///
/// let v = StringLength::new(None, Some(5));
/// assert!(v.validate(&json!("hi"), &DataMap::new()).is_ok());
/// assert!(v.validate(&json!("toolong"), &DataMap::new()).is_err());
/// ```
pub trait Validator: Send + Sync + fmt::Debug {
    /// Validates the given value, returning an error if invalid.
    fn validate(&self, value: &Value, context: &DataMap) -> Result<(), ValidationError>;

    /// Returns a human-readable name for this validator.
    fn name(&self) -> &str;
}

/// Renders a scalar value the way it was most likely submitted.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fails for null, empty strings, and empty collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEmpty;

impl NotEmpty {
    /// The message reported for empty values.
    pub const MESSAGE: &'static str = "Value is required and can't be empty";
}

impl Validator for NotEmpty {
    fn validate(&self, value: &Value, _context: &DataMap) -> Result<(), ValidationError> {
        if is_empty_value(value) {
            return Err(ValidationError::new(Self::MESSAGE, "is_empty"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "NotEmpty"
    }
}

/// Bounds the character length of string values.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringLength {
    /// Minimum number of characters.
    pub min: Option<usize>,
    /// Maximum number of characters.
    pub max: Option<usize>,
}

impl StringLength {
    /// Creates a new `StringLength` validator.
    pub const fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self { min, max }
    }
}

impl Validator for StringLength {
    fn validate(&self, value: &Value, _context: &DataMap) -> Result<(), ValidationError> {
        let Value::String(s) = value else {
            return Err(ValidationError::new(
                "Invalid type given. String expected",
                "invalid",
            ));
        };
        let len = s.chars().count();
        if let Some(min) = self.min {
            if len < min {
                return Err(ValidationError::new(
                    format!("Ensure this value has at least {min} characters (it has {len})."),
                    "too_short",
                )
                .with_param("min", min.to_string()));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                return Err(ValidationError::new(
                    format!("Ensure this value has at most {max} characters (it has {len})."),
                    "too_long",
                )
                .with_param("max", max.to_string()));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "StringLength"
    }
}

/// Checks that a value looks like an email address.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailAddress;

impl Validator for EmailAddress {
    fn validate(&self, value: &Value, _context: &DataMap) -> Result<(), ValidationError> {
        match value {
            Value::String(s) if EMAIL_RE.is_match(s) => Ok(()),
            _ => Err(ValidationError::new(
                "Enter a valid email address.",
                "invalid_email",
            )),
        }
    }

    fn name(&self) -> &str {
        "EmailAddress"
    }
}

/// Checks a string value against a regular expression.
#[derive(Debug, Clone)]
pub struct RegexValidator {
    regex: Regex,
}

impl RegexValidator {
    /// Creates a new `RegexValidator`.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl Validator for RegexValidator {
    fn validate(&self, value: &Value, _context: &DataMap) -> Result<(), ValidationError> {
        let text = display_value(value);
        if self.regex.is_match(&text) {
            Ok(())
        } else {
            Err(ValidationError::new("Enter a valid value.", "regex_not_match")
                .with_param("pattern", self.regex.as_str()))
        }
    }

    fn name(&self) -> &str {
        "Regex"
    }
}

/// Checks that a numeric value lies within a range.
#[derive(Debug, Clone, Copy)]
pub struct Between {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Whether the bounds themselves are allowed.
    pub inclusive: bool,
}

impl Between {
    /// Creates an inclusive `Between` validator.
    pub const fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            inclusive: true,
        }
    }
}

impl Validator for Between {
    fn validate(&self, value: &Value, _context: &DataMap) -> Result<(), ValidationError> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let Some(n) = number else {
            return Err(ValidationError::new("Enter a number.", "not_numeric"));
        };
        let within = if self.inclusive {
            n >= self.min && n <= self.max
        } else {
            n > self.min && n < self.max
        };
        if within {
            Ok(())
        } else {
            Err(ValidationError::new(
                format!("Ensure this value is between {} and {}.", self.min, self.max),
                "not_between",
            ))
        }
    }

    fn name(&self) -> &str {
        "Between"
    }
}

/// Checks that a value is one of a fixed set.
#[derive(Debug, Clone, Default)]
pub struct InArray {
    /// The permitted values.
    pub haystack: Vec<Value>,
    /// Whether values must match by type as well as by text.
    pub strict: bool,
}

impl InArray {
    /// Creates a non-strict `InArray` validator.
    pub const fn new(haystack: Vec<Value>) -> Self {
        Self {
            haystack,
            strict: false,
        }
    }

    fn contains(&self, needle: &Value) -> bool {
        if self.strict {
            self.haystack.contains(needle)
        } else {
            let text = display_value(needle);
            self.haystack.iter().any(|v| display_value(v) == text)
        }
    }
}

impl Validator for InArray {
    fn validate(&self, value: &Value, _context: &DataMap) -> Result<(), ValidationError> {
        let found = match value {
            Value::Array(items) => items.iter().all(|item| self.contains(item)),
            other => self.contains(other),
        };
        if found {
            Ok(())
        } else {
            Err(ValidationError::new(
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    display_value(value)
                ),
                "not_in_array",
            ))
        }
    }

    fn name(&self) -> &str {
        "InArray"
    }
}

/// Checks that a value contains only decimal digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Digits;

impl Validator for Digits {
    fn validate(&self, value: &Value, _context: &DataMap) -> Result<(), ValidationError> {
        let text = display_value(value);
        if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
            Ok(())
        } else {
            Err(ValidationError::new(
                "The input must contain only digits",
                "not_digits",
            ))
        }
    }

    fn name(&self) -> &str {
        "Digits"
    }
}

/// Checks that a string parses as a date in the given format.
#[derive(Debug, Clone)]
pub struct Date {
    /// A `chrono` format string, `%Y-%m-%d` by default.
    pub format: String,
}

impl Default for Date {
    fn default() -> Self {
        Self {
            format: "%Y-%m-%d".to_string(),
        }
    }
}

impl Validator for Date {
    fn validate(&self, value: &Value, _context: &DataMap) -> Result<(), ValidationError> {
        let text = display_value(value);
        chrono::NaiveDate::parse_from_str(&text, &self.format)
            .map(|_| ())
            .map_err(|_| {
                ValidationError::new("Enter a valid date.", "invalid_date")
                    .with_param("format", self.format.clone())
            })
    }

    fn name(&self) -> &str {
        "Date"
    }
}

/// Checks that a string is a valid UUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uuid;

impl Validator for Uuid {
    fn validate(&self, value: &Value, _context: &DataMap) -> Result<(), ValidationError> {
        match value {
            Value::String(s) if uuid::Uuid::parse_str(s).is_ok() => Ok(()),
            _ => Err(ValidationError::new("Enter a valid UUID.", "invalid_uuid")),
        }
    }

    fn name(&self) -> &str {
        "Uuid"
    }
}

/// Checks that a value equals a sibling field in the context.
#[derive(Debug, Clone)]
pub struct Identical {
    /// The sibling field name.
    pub token: String,
}

impl Identical {
    /// Creates a new `Identical` validator comparing against `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Validator for Identical {
    fn validate(&self, value: &Value, context: &DataMap) -> Result<(), ValidationError> {
        match context.get(&self.token) {
            Some(other) if other == value => Ok(()),
            Some(_) => Err(ValidationError::new(
                "The two given tokens do not match",
                "not_same",
            )),
            None => Err(ValidationError::new(
                "No token was provided to match against",
                "missing_token",
            )),
        }
    }

    fn name(&self) -> &str {
        "Identical"
    }
}

/// The predicate type used by [`Callback`].
pub type CallbackFn = Arc<dyn Fn(&Value, &DataMap) -> bool + Send + Sync>;

/// Validates through an arbitrary predicate.
#[derive(Clone)]
pub struct Callback {
    predicate: CallbackFn,
    message: String,
}

impl Callback {
    /// Creates a new `Callback` validator.
    pub fn new<F>(message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &DataMap) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            message: message.into(),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl Validator for Callback {
    fn validate(&self, value: &Value, context: &DataMap) -> Result<(), ValidationError> {
        if (self.predicate)(value, context) {
            Ok(())
        } else {
            Err(ValidationError::new(self.message.clone(), "callback_value"))
        }
    }

    fn name(&self) -> &str {
        "Callback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> DataMap {
        DataMap::new()
    }

    #[test]
    fn test_not_empty() {
        assert!(NotEmpty.validate(&json!("x"), &ctx()).is_ok());
        let err = NotEmpty.validate(&json!(""), &ctx()).unwrap_err();
        assert_eq!(err.message, NotEmpty::MESSAGE);
        assert_eq!(err.code, "is_empty");
    }

    #[test]
    fn test_string_length_counts_chars() {
        let v = StringLength::new(Some(2), Some(3));
        assert!(v.validate(&json!("héé"), &ctx()).is_ok());
        assert!(v.validate(&json!("a"), &ctx()).unwrap_err().message.contains("at least 2"));
        assert!(v.validate(&json!("abcd"), &ctx()).unwrap_err().message.contains("at most 3"));
        assert_eq!(v.validate(&json!(5), &ctx()).unwrap_err().code, "invalid");
    }

    #[test]
    fn test_email_address() {
        assert!(EmailAddress.validate(&json!("a@b.com"), &ctx()).is_ok());
        assert!(EmailAddress.validate(&json!("not-an-email"), &ctx()).is_err());
    }

    #[test]
    fn test_regex_validator() {
        let v = RegexValidator::new(r"^[A-Z]{3}$").unwrap();
        assert!(v.validate(&json!("ABC"), &ctx()).is_ok());
        assert!(v.validate(&json!("abc"), &ctx()).is_err());
        assert!(RegexValidator::new("(").is_err());
    }

    #[test]
    fn test_between() {
        let v = Between::new(1.0, 10.0);
        assert!(v.validate(&json!(10), &ctx()).is_ok());
        assert!(v.validate(&json!("5"), &ctx()).is_ok());
        assert!(v.validate(&json!(11), &ctx()).is_err());
        let exclusive = Between {
            inclusive: false,
            ..v
        };
        assert!(exclusive.validate(&json!(10), &ctx()).is_err());
    }

    #[test]
    fn test_in_array_loose_and_strict() {
        let loose = InArray::new(vec![json!(1), json!("two")]);
        assert!(loose.validate(&json!("1"), &ctx()).is_ok());
        assert!(loose.validate(&json!(["1", "two"]), &ctx()).is_ok());
        assert!(loose.validate(&json!("three"), &ctx()).is_err());

        let strict = InArray {
            strict: true,
            ..loose
        };
        assert!(strict.validate(&json!("1"), &ctx()).is_err());
    }

    #[test]
    fn test_digits() {
        assert!(Digits.validate(&json!("0123"), &ctx()).is_ok());
        assert!(Digits.validate(&json!(42), &ctx()).is_ok());
        assert!(Digits.validate(&json!("12a"), &ctx()).is_err());
    }

    #[test]
    fn test_date() {
        assert!(Date::default().validate(&json!("2024-02-29"), &ctx()).is_ok());
        assert!(Date::default().validate(&json!("2023-02-29"), &ctx()).is_err());
    }

    #[test]
    fn test_uuid() {
        assert!(Uuid
            .validate(&json!("67e55044-10b1-426f-9247-bb680e5fe0c8"), &ctx())
            .is_ok());
        assert!(Uuid.validate(&json!("nope"), &ctx()).is_err());
    }

    #[test]
    fn test_identical_uses_context() {
        let mut context = DataMap::new();
        context.insert("password".into(), json!("secret"));
        let v = Identical::new("password");
        assert!(v.validate(&json!("secret"), &context).is_ok());
        assert_eq!(v.validate(&json!("other"), &context).unwrap_err().code, "not_same");
        assert_eq!(v.validate(&json!("x"), &ctx()).unwrap_err().code, "missing_token");
    }

    #[test]
    fn test_callback() {
        let v = Callback::new("Must be even", |value, _| value.as_i64().is_some_and(|n| n % 2 == 0));
        assert!(v.validate(&json!(4), &ctx()).is_ok());
        assert_eq!(v.validate(&json!(3), &ctx()).unwrap_err().message, "Must be even");
    }
}
