//! # formtree
//!
//! Composable form trees with data binding, validation groups, and
//! input-filter synthesis.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient
//! access. You can depend on `formtree` to get everything, or depend on
//! individual crates for finer-grained control.
//!
//! ```
//! use formtree::prelude::*;
//! use serde_json::json;
//!
//! let mut form = Form::new("contact")
//!     .with(Element::text("name"))
//!     .with(Element::email("email"));
//! form.set_data(json!({"name": "Ann", "email": "not-an-email"})).unwrap();
//! assert!(!form.is_valid().unwrap());
//! assert!(form.messages().contains_key("email"));
//! ```

/// Errors, binding flags, settings, and logging setup.
pub use formtree_core as core;

/// Inputs, input filters, validators, and filter specs.
pub use formtree_filter as filter;

/// Elements, fieldsets, collections, and forms.
#[cfg(feature = "forms")]
pub use formtree_forms as forms;

/// Third-party crates used in the public API.
pub use serde;
pub use serde_json;
pub use tracing;

/// Installs the global tracing subscriber from `settings`.
#[cfg(feature = "logging")]
pub fn init_logging(settings: &formtree_core::FormSettings) {
    formtree_core::logging::setup_logging(settings);
}

/// The most commonly used types.
pub mod prelude {
    pub use formtree_core::{BindAs, BindOnValidate, DataFlag, FormError, FormResult, FormSettings};
    pub use formtree_filter::{
        DataMap, Input, InputFilter, InputFilterFactory, InputFilterSpec, InputSpec, MessageMap,
        ValidationGroup,
    };

    #[cfg(feature = "forms")]
    pub use formtree_forms::{
        BindingPolicy, Collection, Element, ElementKind, Fieldset, Form, FormData, FormSpec,
        SerdeHydrator,
    };
}
