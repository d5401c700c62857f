//! # formtree-forms
//!
//! Form trees for formtree. A [`Form`] composes a root [`Fieldset`] of
//! [`Element`]s, nested fieldsets, and repeatable [`Collection`]s; binds
//! submitted data or a domain object to it; and validates through an input
//! filter synthesized from the tree.
//!
//! ## Modules
//!
//! - [`element`] - Leaf elements and their default rules
//! - [`fieldset`] - Ordered containers with object binding
//! - [`collection`] - Repeatable groups built from a target template
//! - [`node`] - The closed set of tree nodes
//! - [`form`] - The form lifecycle: data, validation, binding
//! - [`defaults`] - Input-filter synthesis from the tree
//! - [`validation`] - Validation-group pruning and bind-data preparation
//! - [`hydrator`] - Object to map conversion
//! - [`factory`] - Building trees from configuration

pub mod collection;
pub mod defaults;
pub mod element;
pub mod factory;
pub mod fieldset;
pub mod form;
pub mod hydrator;
pub mod node;
pub mod validation;

pub use collection::Collection;
pub use element::{Element, ElementKind};
pub use factory::{ElementSpec, FormSpec};
pub use fieldset::Fieldset;
pub use form::{BindingPolicy, Form, FormData, ValidationState};
pub use hydrator::{Hydrator, MapHydrator, SerdeHydrator};
pub use node::Node;
