//! # formtree-core
//!
//! Core types shared by the formtree crates: the error taxonomy, binding
//! flags, settings, and logging setup. This crate has no framework
//! dependencies and is the foundation the filter and form crates build on.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`flags`] - Binding and extraction flags with their integer codes
//! - [`settings`] - Form defaults and logging configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod flags;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{FormError, FormResult, ValidationError};
pub use flags::{BindAs, BindOnValidate, DataFlag};
pub use settings::FormSettings;
