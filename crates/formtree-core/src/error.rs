//! Core error types for the formtree crates.
//!
//! [`FormError`] covers the structural failures of the form lifecycle:
//! bad flags, calls made in the wrong order, hydration failures, and
//! configuration problems. Per-field validation failures are *not* errors;
//! a validator reports a [`ValidationError`], and inputs collect those into
//! message maps reported alongside a boolean.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A single validator failure: a message and a short code.
///
/// # Examples
///
/// ```
/// use formtree_core::error::ValidationError;
///
/// let err = ValidationError::new("Value is required and can't be empty", "is_empty");
/// assert_eq!(err.code, "is_empty");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The error message.
    pub message: String,
    /// A short code identifying the type of failure (e.g. "is_empty", "too_long").
    pub code: String,
    /// Additional parameters providing context for the message.
    pub params: HashMap<String, String>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: HashMap::new(),
        }
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for the formtree crates.
///
/// Each variant carries a short human-readable message. Use
/// [`FormError::code`] for a stable, machine-readable identifier.
#[derive(Error, Debug)]
pub enum FormError {
    // ── Caller errors ────────────────────────────────────────────────

    /// A flag, name, or value passed by the caller is outside the permitted set.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is meaningless in the current state (e.g. reading data
    /// before validation has run).
    #[error("Domain error: {0}")]
    Domain(String),

    // ── Binding ──────────────────────────────────────────────────────

    /// A hydrator could not extract from or hydrate into a bound object.
    #[error("Hydration error: {0}")]
    Hydration(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A settings file or element/filter specification could not be used.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ── Serialization ────────────────────────────────────────────────

    /// A value could not be converted to or from its JSON representation.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FormError {
    /// Returns a stable identifier for the error category.
    ///
    /// - `InvalidArgument` -> `"invalid_argument"`
    /// - `Domain` -> `"domain"`
    /// - `Hydration` -> `"hydration"`
    /// - `Configuration` -> `"configuration"`
    /// - `Serialization` -> `"serialization"`
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Domain(_) => "domain",
            Self::Hydration(_) => "hydration",
            Self::Configuration(_) => "configuration",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Returns `true` for errors caused by calling an operation out of order.
    pub const fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    /// Returns `true` for errors caused by an out-of-range argument.
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// A convenience type alias for `Result<T, FormError>`.
pub type FormResult<T> = Result<T, FormError>;
