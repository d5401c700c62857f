//! # formtree-filter
//!
//! The input-filter layer used by formtree forms. An [`InputFilter`] takes a
//! nested data map, runs a filter chain and a validator chain per named
//! [`Input`], and reports validity plus per-field messages. Filters nest by
//! name, and a [`CollectionInputFilter`] applies one inner filter to every
//! item of a dynamically sized collection.
//!
//! Inputs and filters are usually built from serializable specifications
//! through the [`InputFilterFactory`].

pub mod data;
pub mod factory;
pub mod filters;
pub mod input;
pub mod input_filter;
pub mod messages;
pub mod validation_group;
pub mod validators;

pub use data::DataMap;
pub use factory::{CollectionSpec, FilterSpec, InputFilterFactory, InputFilterSpec, InputSpec, ValidatorSpec};
pub use input::Input;
pub use input_filter::{CollectionInputFilter, Entry, InputFilter};
pub use messages::{MessageMap, Messages};
pub use validation_group::{GroupEntry, ValidationGroup};
