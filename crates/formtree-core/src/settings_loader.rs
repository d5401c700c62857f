//! Settings loading from configuration files.
//!
//! This module provides functions to load [`FormSettings`] from TOML files,
//! JSON files, and to apply environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `FORMTREE_DEBUG` | `debug` |
//! | `FORMTREE_LOG_LEVEL` | `log_level` |
//! | `FORMTREE_WRAP_ELEMENTS` | `wrap_elements` |
//! | `FORMTREE_USE_INPUT_FILTER_DEFAULTS` | `use_input_filter_defaults` |
//! | `FORMTREE_PREFER_FORM_INPUT_FILTER` | `prefer_form_input_filter` |
//! | `FORMTREE_BIND_AS` | `bind_as` |
//! | `FORMTREE_BIND_ON_VALIDATE` | `bind_on_validate` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use formtree_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/forms.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::FormError;
use crate::settings::FormSettings;

/// Loads settings from a TOML string.
///
/// Fields not present in the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<FormSettings, FormError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FormError::Configuration(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<FormSettings, FormError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        FormError::Configuration(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<FormSettings, FormError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<FormSettings, FormError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FormError::Configuration(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<FormSettings, FormError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        FormError::Configuration(format!(
            "Failed to read JSON file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> FormSettings {
    let mut settings = FormSettings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Boolean variables accept "true"/"1"/"yes" as true and anything else as
/// false. Unparseable binding flags are ignored with a warning.
pub fn apply_env_overrides(settings: &mut FormSettings) {
    if let Ok(val) = std::env::var("FORMTREE_DEBUG") {
        settings.debug = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("FORMTREE_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("FORMTREE_WRAP_ELEMENTS") {
        settings.wrap_elements = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("FORMTREE_USE_INPUT_FILTER_DEFAULTS") {
        settings.use_input_filter_defaults = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("FORMTREE_PREFER_FORM_INPUT_FILTER") {
        settings.prefer_form_input_filter = Some(parse_bool(&val));
    }

    if let Ok(val) = std::env::var("FORMTREE_BIND_AS") {
        match val.parse() {
            Ok(flag) => settings.bind_as = flag,
            Err(e) => tracing::warn!("Ignoring FORMTREE_BIND_AS: {e}"),
        }
    }

    if let Ok(val) = std::env::var("FORMTREE_BIND_ON_VALIDATE") {
        match val.parse() {
            Ok(flag) => settings.bind_on_validate = flag,
            Err(e) => tracing::warn!("Ignoring FORMTREE_BIND_ON_VALIDATE: {e}"),
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn merge_over_defaults(
    value: serde_json::Value,
    format: &str,
) -> Result<FormSettings, FormError> {
    let default_json = serde_json::to_value(FormSettings::default()).map_err(|e| {
        FormError::Configuration(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        FormError::Configuration(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{BindAs, BindOnValidate};

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            wrap_elements = true
            bind_as = "raw"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert!(settings.wrap_elements);
        assert_eq!(settings.bind_as, BindAs::Raw);
        // Defaults preserved
        assert!(settings.use_input_filter_defaults);
        assert_eq!(settings.bind_on_validate, BindOnValidate::OnValidate);
    }

    #[test]
    fn test_from_toml_str_prefer_form_input_filter() {
        let settings = from_toml_str("prefer_form_input_filter = true").unwrap();
        assert_eq!(settings.prefer_form_input_filter, Some(true));
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings, FormSettings::default());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let err = from_toml_str("this is not [valid toml").unwrap_err();
        assert_eq!(err.code(), "configuration");
    }

    #[test]
    fn test_from_toml_str_bad_flag() {
        let err = from_toml_str(r#"bind_on_validate = "sometimes""#).unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str_basic() {
        let settings =
            from_json_str(r#"{"bind_on_validate": "manual", "log_level": "debug"}"#).unwrap();
        assert_eq!(settings.bind_on_validate, BindOnValidate::Manual);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{not json").is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = std::env::temp_dir().join("formtree_settings_loader_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("forms.toml");
        std::fs::write(&path, "use_input_filter_defaults = false\n").unwrap();

        let settings = from_toml_file(&path).unwrap();
        assert!(!settings.use_input_filter_defaults);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read JSON file"));
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(!parse_bool("no"));
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}, "d": 3});
        let over = serde_json::json!({"a": {"b": 10}});
        let merged = merge_json(base, over);
        assert_eq!(merged, serde_json::json!({"a": {"b": 10, "c": 2}, "d": 3}));
    }
}
