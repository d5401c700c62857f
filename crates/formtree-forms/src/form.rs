//! The form: a root fieldset plus its input filter and binding lifecycle.
//!
//! A [`Form`] owns the tree of nodes, the data last submitted, and the input
//! filter that validates it. The lifecycle is:
//!
//! 1. build the tree (`add`, or [`FormSpec`](crate::factory::FormSpec));
//! 2. seed it with [`set_data`](Form::set_data) or [`bind`](Form::bind);
//! 3. [`is_valid`](Form::is_valid), memoized until data, the validation
//!    group, or the filter changes;
//! 4. read the outcome with [`get_data`](Form::get_data) or
//!    [`messages`](Form::messages).
//!
//! The input filter is built lazily. Unless disabled, defaults synthesized
//! from the tree are attached to it exactly once per filter generation.

use std::any::Any;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use formtree_core::logging::form_span;
use formtree_core::{BindAs, BindOnValidate, DataFlag, FormError, FormResult, FormSettings};
use formtree_filter::data::as_map;
use formtree_filter::{DataMap, GroupEntry, InputFilter, InputFilterFactory, MessageMap, ValidationGroup};

use crate::defaults::{attach_form_defaults, DefaultsContext};
use crate::factory::FormSpec;
use crate::fieldset::Fieldset;
use crate::hydrator::SerdeHydrator;
use crate::node::Node;
use crate::validation::{prepare_bind_data, prepare_validation_group};

/// Where a bound object lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BindingPolicy {
    /// The object is bound to the form's root fieldset.
    #[default]
    WholeForm,
    /// The object is bound to the named child fieldset; binding and
    /// extraction go through it only.
    BaseFieldset(String),
}

/// Result of the last validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationState {
    #[default]
    Unvalidated,
    Valid,
    Invalid,
}

#[derive(Debug, Default)]
enum FilterState {
    #[default]
    Unbuilt,
    Built(InputFilter),
    DefaultsAttached(InputFilter),
}

impl FilterState {
    const fn filter(&self) -> Option<&InputFilter> {
        match self {
            Self::Built(filter) | Self::DefaultsAttached(filter) => Some(filter),
            Self::Unbuilt => None,
        }
    }

    fn filter_mut(&mut self) -> Option<&mut InputFilter> {
        match self {
            Self::Built(filter) | Self::DefaultsAttached(filter) => Some(filter),
            Self::Unbuilt => None,
        }
    }
}

/// What [`Form::get_data`] returns.
#[derive(Debug)]
pub enum FormData<'a> {
    /// The bound object.
    Object(&'a (dyn Any + Send + Sync)),
    /// Values from the input filter.
    Values(DataMap),
}

impl<'a> FormData<'a> {
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// The bound object, if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&'a T> {
        match *self {
            Self::Object(object) => object.downcast_ref::<T>(),
            Self::Values(_) => None,
        }
    }

    pub const fn as_values(&self) -> Option<&DataMap> {
        match self {
            Self::Values(values) => Some(values),
            Self::Object(_) => None,
        }
    }

    pub fn into_values(self) -> Option<DataMap> {
        match self {
            Self::Values(values) => Some(values),
            Self::Object(_) => None,
        }
    }
}

/// A form.
///
/// # Examples
///
/// ```
/// use formtree_forms::{Element, Form};
/// use formtree_core::DataFlag;
/// use serde_json::json;
///
/// let mut form = Form::new("contact").with(Element::email("email"));
/// form.set_data(json!({"email": "a@b.com"})).unwrap();
/// assert!(form.is_valid().unwrap());
///
/// let data = form.get_data(DataFlag::Normalized).unwrap();
/// assert_eq!(data.as_values().unwrap()["email"], json!("a@b.com"));
/// ```
#[derive(Debug)]
pub struct Form {
    root: Fieldset,
    data: Option<DataMap>,
    binding: BindingPolicy,
    bind_as: BindAs,
    bind_on_validate: BindOnValidate,

    factory: InputFilterFactory,
    filter_state: FilterState,
    /// The filter installed by the caller, kept pristine so defaults can be
    /// re-attached after a policy change.
    installed_filter: Option<InputFilter>,
    use_input_filter_defaults: bool,
    prefer_form_input_filter: bool,
    prefer_form_input_filter_explicit: bool,

    validation_group: Option<ValidationGroup>,
    prepared_group: Option<ValidationGroup>,
    validation: ValidationState,
    is_prepared: bool,
    wrap_elements: bool,
}

impl Form {
    /// Creates an empty form with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, &FormSettings::default())
    }

    /// Creates an empty form configured from `settings`.
    pub fn with_settings(name: impl Into<String>, settings: &FormSettings) -> Self {
        Self {
            root: Fieldset::new(name),
            data: None,
            binding: BindingPolicy::WholeForm,
            bind_as: settings.bind_as,
            bind_on_validate: settings.bind_on_validate,
            factory: InputFilterFactory::new(),
            filter_state: FilterState::Unbuilt,
            installed_filter: None,
            use_input_filter_defaults: settings.use_input_filter_defaults,
            prefer_form_input_filter: settings.prefer_form_input_filter.unwrap_or(false),
            prefer_form_input_filter_explicit: settings.prefer_form_input_filter.is_some(),
            validation_group: None,
            prepared_group: None,
            validation: ValidationState::Unvalidated,
            is_prepared: false,
            wrap_elements: settings.wrap_elements,
        }
    }

    /// Builds a form from its configuration.
    pub fn from_spec(spec: &FormSpec) -> FormResult<Self> {
        spec.create()
    }

    // ── Structure ────────────────────────────────────────────────────

    /// Adds a child node.
    #[must_use]
    pub fn with(mut self, node: impl Into<Node>) -> Self {
        self.add(node);
        self
    }

    /// Adds a child node, replacing any child of the same name.
    ///
    /// A fieldset marked as base fieldset becomes the binding target.
    pub fn add(&mut self, node: impl Into<Node>) {
        let node = node.into();
        if let Node::Fieldset(fieldset) = &node {
            if fieldset.is_base_fieldset() {
                tracing::debug!(form = self.name(), base = fieldset.name(), "Binding through base fieldset");
                self.binding = BindingPolicy::BaseFieldset(fieldset.name().to_string());
            }
        }
        self.root.add(node);
    }

    pub fn name(&self) -> &str {
        self.root.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.root.set_name(name);
    }

    pub const fn root(&self) -> &Fieldset {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Fieldset {
        &mut self.root
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.root.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.root.get_mut(name)
    }

    pub const fn binding_policy(&self) -> &BindingPolicy {
        &self.binding
    }

    /// Routes object binding through the named child fieldset.
    pub fn set_base_fieldset(&mut self, name: &str) -> FormResult<()> {
        let fieldset = self
            .root
            .get_mut(name)
            .and_then(Node::as_fieldset_mut)
            .ok_or_else(|| {
                FormError::InvalidArgument(format!("'{name}' is not a fieldset of this form"))
            })?;
        fieldset.set_use_as_base_fieldset(true);
        self.binding = BindingPolicy::BaseFieldset(name.to_string());
        Ok(())
    }

    fn binding_target(&self) -> Option<&Fieldset> {
        match &self.binding {
            BindingPolicy::WholeForm => Some(&self.root),
            BindingPolicy::BaseFieldset(name) => self.root.fieldset(name),
        }
    }

    fn binding_target_mut(&mut self) -> FormResult<&mut Fieldset> {
        match &self.binding {
            BindingPolicy::WholeForm => Ok(&mut self.root),
            BindingPolicy::BaseFieldset(name) => self
                .root
                .get_mut(name)
                .and_then(Node::as_fieldset_mut)
                .ok_or_else(|| FormError::InvalidArgument(format!("base fieldset '{name}' is missing"))),
        }
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub const fn bind_as(&self) -> BindAs {
        self.bind_as
    }

    pub fn set_bind_as(&mut self, bind_as: BindAs) {
        self.bind_as = bind_as;
    }

    pub const fn bind_on_validate(&self) -> BindOnValidate {
        self.bind_on_validate
    }

    pub fn set_bind_on_validate(&mut self, flag: BindOnValidate) {
        self.bind_on_validate = flag;
    }

    pub const fn wrap_elements(&self) -> bool {
        self.wrap_elements
    }

    pub fn set_wrap_elements(&mut self, wrap: bool) {
        self.wrap_elements = wrap;
    }

    pub const fn use_input_filter_defaults(&self) -> bool {
        self.use_input_filter_defaults
    }

    /// Enables or disables default synthesis. The filter is rebuilt on next
    /// use.
    pub fn set_use_input_filter_defaults(&mut self, use_defaults: bool) {
        self.use_input_filter_defaults = use_defaults;
        self.reset_filter_defaults();
    }

    pub const fn prefer_form_input_filter(&self) -> bool {
        self.prefer_form_input_filter
    }

    /// Sets whether declared filter entries win over element rules. The
    /// filter is rebuilt on next use.
    pub fn set_prefer_form_input_filter(&mut self, prefer: bool) {
        self.prefer_form_input_filter = prefer;
        self.prefer_form_input_filter_explicit = true;
        self.reset_filter_defaults();
    }

    /// The factory used to build inputs from specs.
    pub const fn input_filter_factory(&self) -> &InputFilterFactory {
        &self.factory
    }

    /// Replaces the factory, e.g. to register custom validators.
    pub fn set_input_filter_factory(&mut self, factory: InputFilterFactory) {
        self.factory = factory;
        self.reset_filter_defaults();
    }

    // ── Data and binding ─────────────────────────────────────────────

    /// Sets the data to validate and pushes it into the elements.
    ///
    /// Accepts a map, or a list (keyed by index). Anything else is an
    /// [`FormError::InvalidArgument`].
    pub fn set_data(&mut self, data: Value) -> FormResult<()> {
        let data = match data {
            Value::Object(map) => map,
            list @ Value::Array(_) => as_map(&list),
            other => {
                return Err(FormError::InvalidArgument(format!(
                    "form data must be a map or a list, got {other}"
                )))
            }
        };
        self.set_data_map(data)
    }

    /// Sets the data to validate and pushes it into the elements.
    ///
    /// The data is kept even when populating the elements fails, so a later
    /// [`is_valid`](Self::is_valid) never validates an earlier submission.
    pub fn set_data_map(&mut self, data: DataMap) -> FormResult<()> {
        self.validation = ValidationState::Unvalidated;
        let populated = self.root.populate_values(&data);
        tracing::debug!(form = self.name(), keys = data.len(), "Form data set");
        self.data = Some(data);
        populated
    }

    /// The data last set, or extracted from the bound object.
    pub const fn data(&self) -> Option<&DataMap> {
        self.data.as_ref()
    }

    /// Binds a `serde` object. A [`SerdeHydrator`] is installed on the
    /// binding target unless it already has a hydrator.
    pub fn bind<T>(&mut self, object: T, bind_as: BindAs) -> FormResult<()>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let target = self.binding_target_mut()?;
        if target.hydrator().is_none() {
            target.set_hydrator(Arc::new(SerdeHydrator::<T>::new()));
        }
        self.bind_object(Box::new(object), bind_as)
    }

    /// Binds an object through the binding target's hydrator and populates
    /// the elements from it.
    pub fn bind_object(&mut self, object: Box<dyn Any + Send + Sync>, bind_as: BindAs) -> FormResult<()> {
        let target = self.binding_target_mut()?;
        if target.hydrator().is_none() {
            return Err(FormError::InvalidArgument(format!(
                "fieldset '{}' has no hydrator to bind an object with",
                target.name()
            )));
        }
        target.set_object(object);
        self.bind_as = bind_as;

        let data = self.extract()?;
        self.root.populate_values(&data)?;
        tracing::debug!(form = self.name(), binding = ?self.binding, "Object bound");
        Ok(())
    }

    /// The bound object, if it is a `T`.
    pub fn object<T: 'static>(&self) -> Option<&T> {
        self.binding_target()?.object_as::<T>()
    }

    pub fn has_object(&self) -> bool {
        self.binding_target().is_some_and(Fieldset::has_object)
    }

    /// Removes and returns the bound object.
    pub fn take_object(&mut self) -> Option<Box<dyn Any + Send + Sync>> {
        self.binding_target_mut().ok()?.take_object()
    }

    /// Reads the bound object into a map shaped like the submitted data.
    pub fn extract(&self) -> FormResult<DataMap> {
        match &self.binding {
            BindingPolicy::WholeForm => self.root.extract(),
            BindingPolicy::BaseFieldset(name) => {
                let values = match self.root.fieldset(name) {
                    Some(base) => base.extract()?,
                    None => DataMap::new(),
                };
                let mut data = DataMap::new();
                data.insert(name.clone(), Value::Object(values));
                Ok(data)
            }
        }
    }

    /// Pushes values into the elements without touching the form's data.
    pub fn populate_values(&mut self, data: &DataMap) -> FormResult<()> {
        self.root.populate_values(data)
    }

    // ── Input filter ─────────────────────────────────────────────────

    /// Installs an input filter.
    ///
    /// Unless set explicitly, `prefer_form_input_filter` becomes `true`, so
    /// the entries of this filter win over element rules.
    pub fn set_input_filter(&mut self, filter: InputFilter) {
        if !self.prefer_form_input_filter_explicit {
            self.prefer_form_input_filter = true;
        }
        self.installed_filter = Some(filter.clone());
        self.filter_state = FilterState::Built(filter);
        self.validation = ValidationState::Unvalidated;
        self.is_prepared = false;
    }

    /// The input filter, built and completed with defaults on first use.
    pub fn get_input_filter(&mut self) -> FormResult<&InputFilter> {
        self.ensure_input_filter().map(|filter| &*filter)
    }

    /// Mutable access to the input filter, built on first use.
    pub fn input_filter_mut(&mut self) -> FormResult<&mut InputFilter> {
        self.ensure_input_filter()
    }

    fn reset_filter_defaults(&mut self) {
        self.filter_state = match &self.installed_filter {
            Some(filter) => FilterState::Built(filter.clone()),
            None => FilterState::Unbuilt,
        };
        self.validation = ValidationState::Unvalidated;
    }

    fn ensure_input_filter(&mut self) -> FormResult<&mut InputFilter> {
        if matches!(self.filter_state, FilterState::Unbuilt) {
            let filter = match (self.use_input_filter_defaults, self.root.input_filter_spec()) {
                (false, Some(spec)) => self.factory.create_input_filter(spec)?,
                _ => InputFilter::new(),
            };
            self.filter_state = FilterState::Built(filter);
        }

        if self.use_input_filter_defaults {
            if let FilterState::Built(filter) = &mut self.filter_state {
                let ctx = DefaultsContext {
                    factory: &self.factory,
                    prefer_form_input_filter: self.prefer_form_input_filter,
                };
                attach_form_defaults(ctx, filter, &self.root)?;
                tracing::debug!(form = self.root.name(), inputs = filter.len(), "Input filter defaults attached");
                let filter = std::mem::take(filter);
                self.filter_state = FilterState::DefaultsAttached(filter);
            }
        }

        self.filter_state
            .filter_mut()
            .ok_or_else(|| FormError::Domain("input filter could not be built".to_string()))
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Restricts validation to `group`.
    pub fn set_validation_group(&mut self, group: ValidationGroup) {
        self.validation_group = Some(group);
        self.validation = ValidationState::Unvalidated;
    }

    /// Restricts validation to a group given as JSON, e.g.
    /// `["name", {"address": ["city"]}]`.
    pub fn set_validation_group_value(&mut self, group: &Value) -> FormResult<()> {
        self.set_validation_group(ValidationGroup::from_value(group)?);
        Ok(())
    }

    /// Validates everything again.
    pub fn set_validate_all(&mut self) {
        self.validation_group = None;
        self.validation = ValidationState::Unvalidated;
    }

    pub const fn validation_group(&self) -> Option<&ValidationGroup> {
        self.validation_group.as_ref()
    }

    pub const fn validation_state(&self) -> ValidationState {
        self.validation
    }

    pub fn has_validated(&self) -> bool {
        self.validation != ValidationState::Unvalidated
    }

    /// Validates the data, or the bound object's values when no data was
    /// set. The result is memoized until the data, the validation group,
    /// or the input filter changes.
    ///
    /// On success the values are bound into the object unless binding is
    /// manual. On failure the messages are distributed to the elements.
    pub fn is_valid(&mut self) -> FormResult<bool> {
        match self.validation {
            ValidationState::Valid => return Ok(true),
            ValidationState::Invalid => return Ok(false),
            ValidationState::Unvalidated => {}
        }

        let span = form_span(self.root.name());
        let _guard = span.enter();

        let data = match self.data.clone() {
            Some(data) => data,
            None if self.has_object() => {
                let data = self.extract()?;
                self.root.populate_values(&data)?;
                self.data = Some(data.clone());
                data
            }
            None => {
                return Err(FormError::Domain(
                    "no data to validate: set data or bind an object first".to_string(),
                ))
            }
        };

        let prepared = self
            .validation_group
            .as_ref()
            .map(|group| prepare_validation_group(&self.root, &data, group))
            .filter(|group| !group.is_empty());

        let filter = self.ensure_input_filter()?;
        filter.set_data(data);
        filter.set_validation_group(prepared.as_ref());
        let valid = filter.is_valid();
        let messages = if valid { MessageMap::new() } else { filter.messages() };

        self.prepared_group = prepared;
        self.validation = if valid {
            ValidationState::Valid
        } else {
            ValidationState::Invalid
        };
        tracing::debug!(valid, "Form validated");

        if valid {
            if self.bind_on_validate == BindOnValidate::OnValidate {
                let group = self.prepared_group.clone();
                if let Err(err) = self.bind_values_with(None, group.as_ref()) {
                    self.validation = ValidationState::Unvalidated;
                    return Err(err);
                }
            }
        } else {
            self.root.set_messages(messages);
        }
        Ok(valid)
    }

    // ── Results ──────────────────────────────────────────────────────

    /// Binds the validated values into the bound object, restricted to the
    /// validation group of the last pass.
    pub fn bind_values(&mut self) -> FormResult<()> {
        let group = self.prepared_group.clone();
        self.bind_values_with(None, group.as_ref())
    }

    /// Binds validated values into the bound object.
    ///
    /// Does nothing without a bound object, or unless validation has
    /// succeeded. When the form has not been validated and `values` is
    /// non-empty, the values are set as data and validated first.
    pub fn bind_values_with(
        &mut self,
        values: Option<DataMap>,
        group: Option<&ValidationGroup>,
    ) -> FormResult<()> {
        if !self.has_object() {
            tracing::trace!(form = self.name(), "No bound object; skipping value binding");
            return Ok(());
        }

        match (self.validation, values) {
            (ValidationState::Unvalidated, Some(values)) if !values.is_empty() => {
                self.set_data_map(values)?;
                // A successful pass binds on its own unless binding is manual.
                if !self.is_valid()? || self.bind_on_validate == BindOnValidate::OnValidate {
                    return Ok(());
                }
            }
            (ValidationState::Valid, _) => {}
            _ => return Ok(()),
        }

        let bind_as = self.bind_as;
        let filter = self.ensure_input_filter()?;
        let values = match bind_as {
            BindAs::Raw => filter.raw_values(),
            BindAs::Normalized => filter.values(),
        };
        let submitted = self.data.clone().unwrap_or_default();
        let mut values = prepare_bind_data(&values, &submitted);

        match self.binding.clone() {
            BindingPolicy::BaseFieldset(name) => {
                let base_values = values.remove(&name).map(|v| as_map(&v)).unwrap_or_default();
                let base_group = group.and_then(|g| g.get(&name)).and_then(GroupEntry::as_group);
                let base = self.binding_target_mut()?;
                base.bind_values(&base_values, base_group)?;
            }
            BindingPolicy::WholeForm => {
                self.root.bind_values(&values, group)?;
            }
        }
        tracing::debug!(form = self.name(), bind_as = %bind_as, "Values bound");
        Ok(())
    }

    /// The validated data.
    ///
    /// Returns the bound object unless `flag` asks for a map, otherwise the
    /// filtered (or raw) values. Fails with [`FormError::Domain`] before
    /// the first validation pass.
    pub fn get_data(&self, flag: DataFlag) -> FormResult<FormData<'_>> {
        if !self.has_validated() {
            return Err(FormError::Domain(
                "cannot return data as validation has not yet occurred".to_string(),
            ));
        }

        if flag != DataFlag::AsMap {
            if let Some(object) = self.binding_target().and_then(Fieldset::object) {
                return Ok(FormData::Object(object));
            }
        }

        let filter = self
            .filter_state
            .filter()
            .ok_or_else(|| FormError::Domain("form has no input filter".to_string()))?;
        let values = match flag {
            DataFlag::Raw => filter.raw_values(),
            DataFlag::Normalized | DataFlag::AsMap => filter.values(),
        };
        Ok(FormData::Values(values))
    }

    /// Messages from the last failed validation, shaped like the tree.
    pub fn messages(&self) -> MessageMap {
        self.root.messages()
    }

    /// Distributes messages to the elements by name.
    pub fn set_messages(&mut self, messages: MessageMap) {
        self.root.set_messages(messages);
    }

    // ── Preparation ──────────────────────────────────────────────────

    pub const fn is_prepared(&self) -> bool {
        self.is_prepared
    }

    /// Builds the input filter, instantiates collection items, and wraps
    /// element names. Runs once.
    pub fn prepare(&mut self) -> FormResult<()> {
        if self.is_prepared {
            return Ok(());
        }
        self.ensure_input_filter()?;

        if self.wrap_elements {
            let name = self.root.name().to_string();
            self.root.prepare_element(name)?;
        } else {
            for child in self.root.children_mut() {
                child.prepare(None)?;
            }
        }
        self.is_prepared = true;
        tracing::debug!(form = self.name(), wrapped = self.wrap_elements, "Form prepared");
        Ok(())
    }
}
