//! Settings for form construction and logging.
//!
//! [`FormSettings`] holds the defaults a freshly built form starts from
//! (input-filter synthesis policy, name wrapping, binding flags) together
//! with the logging configuration. Settings are plain data: load them with
//! [`settings_loader`](crate::settings_loader) and pass them to a form.

use serde::{Deserialize, Serialize};

use crate::flags::{BindAs, BindOnValidate};

/// The complete set of form defaults.
///
/// # Examples
///
/// ```
/// use formtree_core::settings::FormSettings;
///
/// let settings = FormSettings::default();
/// assert!(settings.use_input_filter_defaults);
/// assert!(!settings.wrap_elements);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSettings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,

    // ── Input filter ─────────────────────────────────────────────────

    /// Whether default inputs are synthesized from element metadata.
    pub use_input_filter_defaults: bool,
    /// Whether a filter entry already present wins over element rules.
    ///
    /// `None` leaves the decision to the form: it starts out `false` and
    /// flips to `true` when a filter is installed explicitly.
    pub prefer_form_input_filter: Option<bool>,

    // ── Naming ───────────────────────────────────────────────────────

    /// Whether element names are wrapped in the form's own name.
    pub wrap_elements: bool,

    // ── Binding ──────────────────────────────────────────────────────

    /// Whether successful validation binds values immediately.
    pub bind_on_validate: BindOnValidate,
    /// Which value representation is hydrated into bound objects.
    pub bind_as: BindAs,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "formtree_forms=trace").
    pub log_level: String,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            debug: true,
            use_input_filter_defaults: true,
            prefer_form_input_filter: None,
            wrap_elements: false,
            bind_on_validate: BindOnValidate::OnValidate,
            bind_as: BindAs::Normalized,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = FormSettings::default();
        assert!(s.debug);
        assert!(s.use_input_filter_defaults);
        assert_eq!(s.prefer_form_input_filter, None);
        assert!(!s.wrap_elements);
        assert_eq!(s.bind_on_validate, BindOnValidate::OnValidate);
        assert_eq!(s.bind_as, BindAs::Normalized);
        assert_eq!(s.log_level, "info");
    }

    #[test]
    fn test_settings_serialize_round_trip() {
        let mut s = FormSettings::default();
        s.bind_as = BindAs::Raw;
        s.prefer_form_input_filter = Some(true);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["bind_as"], "raw");
        let back: FormSettings = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
