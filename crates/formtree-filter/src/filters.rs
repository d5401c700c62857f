//! Value filters applied to input values before validation.
//!
//! Filters normalize a submitted value (trimming, case folding, type
//! coercion). They never fail: a value a filter cannot handle passes
//! through unchanged.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// A trait for transforming input values.
///
/// # Examples
///
/// ```
/// use formtree_filter::filters::{Filter, StringTrim};
/// use serde_json::json;
///
/// assert_eq!(StringTrim.filter(json!("  hi  ")), json!("hi"));
/// ```
pub trait Filter: Send + Sync + fmt::Debug {
    /// Returns the filtered value.
    fn filter(&self, value: Value) -> Value;

    /// Returns a human-readable name for this filter.
    fn name(&self) -> &str;
}

/// Strips leading and trailing whitespace from strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringTrim;

impl Filter for StringTrim {
    fn filter(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        }
    }

    fn name(&self) -> &str {
        "StringTrim"
    }
}

/// Lower-cases strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringToLower;

impl Filter for StringToLower {
    fn filter(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        }
    }

    fn name(&self) -> &str {
        "StringToLower"
    }
}

/// Removes markup tags from strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripTags;

impl Filter for StripTags {
    fn filter(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(TAG_RE.replace_all(&s, "").into_owned()),
            other => other,
        }
    }

    fn name(&self) -> &str {
        "StripTags"
    }
}

/// Converts numeric strings and floats to integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToInt;

impl Filter for ToInt {
    #[allow(clippy::cast_possible_truncation)]
    fn filter(&self, value: Value) -> Value {
        match value {
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_or(Value::String(s), Value::from),
            Value::Number(n) if n.is_f64() => n
                .as_f64()
                .map_or(Value::Number(n), |f| Value::from(f.trunc() as i64)),
            other => other,
        }
    }

    fn name(&self) -> &str {
        "ToInt"
    }
}

/// Converts empty strings and empty arrays to null.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToNull;

impl Filter for ToNull {
    fn filter(&self, value: Value) -> Value {
        let empty = match &value {
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        };
        if empty {
            Value::Null
        } else {
            value
        }
    }

    fn name(&self) -> &str {
        "ToNull"
    }
}

/// Converts common truthy/falsy strings and numbers to booleans.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

impl Filter for Boolean {
    fn filter(&self, value: Value) -> Value {
        let coerced = match &value {
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" | "" => Some(false),
                _ => None,
            },
            Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::Null => Some(false),
            _ => None,
        };
        coerced.map_or(value, Value::Bool)
    }

    fn name(&self) -> &str {
        "Boolean"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_trim_leaves_numbers() {
        assert_eq!(StringTrim.filter(json!(" a ")), json!("a"));
        assert_eq!(StringTrim.filter(json!(5)), json!(5));
    }

    #[test]
    fn test_string_to_lower() {
        assert_eq!(StringToLower.filter(json!("MiXeD")), json!("mixed"));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(StripTags.filter(json!("<b>bold</b> text")), json!("bold text"));
    }

    #[test]
    fn test_to_int() {
        assert_eq!(ToInt.filter(json!(" 42 ")), json!(42));
        assert_eq!(ToInt.filter(json!("4x")), json!("4x"));
        assert_eq!(ToInt.filter(json!(3.9)), json!(3));
    }

    #[test]
    fn test_to_null() {
        assert_eq!(ToNull.filter(json!("")), Value::Null);
        assert_eq!(ToNull.filter(json!([])), Value::Null);
        assert_eq!(ToNull.filter(json!("0")), json!("0"));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(Boolean.filter(json!("on")), json!(true));
        assert_eq!(Boolean.filter(json!("0")), json!(false));
        assert_eq!(Boolean.filter(json!(2)), json!(true));
        assert_eq!(Boolean.filter(json!("maybe")), json!("maybe"));
    }
}
