//! Hierarchical input filters.
//!
//! An [`InputFilter`] is an ordered set of named [`Entry`] values: plain
//! inputs, nested filters, and collection filters. Setting data pushes each
//! key's value down to the entry of the same name; validation then runs
//! every entry (or only those selected by a validation group) and collects
//! messages.
//!
//! A [`CollectionInputFilter`] applies one inner filter to every item of a
//! repeating section, keyed by item id. Built with
//! [`for_input`](CollectionInputFilter::for_input), it validates scalar
//! items against a single input instead.

use serde_json::Value;

use formtree_core::{FormError, FormResult};

use crate::data::{as_map, sorted_item_entries, DataMap};
use crate::input::Input;
use crate::messages::{MessageMap, Messages, NON_FIELD_KEY};
use crate::validation_group::ValidationGroup;
use crate::validators::NotEmpty;

/// A named entry of an input filter.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A single input.
    Input(Input),
    /// A nested filter for a nested map.
    Filter(InputFilter),
    /// A filter applied to every item of a collection.
    Collection(CollectionInputFilter),
}

impl From<Input> for Entry {
    fn from(input: Input) -> Self {
        Self::Input(input)
    }
}

impl From<InputFilter> for Entry {
    fn from(filter: InputFilter) -> Self {
        Self::Filter(filter)
    }
}

impl From<CollectionInputFilter> for Entry {
    fn from(filter: CollectionInputFilter) -> Self {
        Self::Collection(filter)
    }
}

impl Entry {
    /// Returns the input, if this entry is one.
    pub const fn as_input(&self) -> Option<&Input> {
        match self {
            Self::Input(input) => Some(input),
            _ => None,
        }
    }

    /// Returns the input mutably, if this entry is one.
    pub fn as_input_mut(&mut self) -> Option<&mut Input> {
        match self {
            Self::Input(input) => Some(input),
            _ => None,
        }
    }

    /// Returns the nested filter, if this entry is one.
    pub const fn as_filter(&self) -> Option<&InputFilter> {
        match self {
            Self::Filter(filter) => Some(filter),
            _ => None,
        }
    }

    /// Returns the nested filter mutably, if this entry is one.
    pub fn as_filter_mut(&mut self) -> Option<&mut InputFilter> {
        match self {
            Self::Filter(filter) => Some(filter),
            _ => None,
        }
    }

    /// Returns the collection filter, if this entry is one.
    pub const fn as_collection(&self) -> Option<&CollectionInputFilter> {
        match self {
            Self::Collection(filter) => Some(filter),
            _ => None,
        }
    }

    /// Returns the collection filter mutably, if this entry is one.
    pub fn as_collection_mut(&mut self) -> Option<&mut CollectionInputFilter> {
        match self {
            Self::Collection(filter) => Some(filter),
            _ => None,
        }
    }

    /// Returns `true` for inputs, `false` for nested and collection filters.
    pub const fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    fn populate(&mut self, value: Option<&Value>) {
        match (self, value) {
            (Self::Input(input), Some(v)) if !v.is_null() => input.set_value(v.clone()),
            (Self::Input(input), _) => input.reset_value(),
            (Self::Filter(filter), Some(v)) => filter.set_data(as_map(v)),
            (Self::Filter(filter), None) => filter.set_data(DataMap::new()),
            (Self::Collection(filter), v) => filter.set_data(v.unwrap_or(&Value::Null)),
        }
    }

    fn set_validation_group(&mut self, group: Option<&ValidationGroup>) {
        match self {
            Self::Input(_) => {}
            Self::Filter(filter) => filter.set_validation_group(group),
            Self::Collection(filter) => filter.set_validation_group(group),
        }
    }

    fn messages(&self) -> Messages {
        match self {
            Self::Input(input) => Messages::Field(input.messages().to_vec()),
            Self::Filter(filter) => Messages::Nested(filter.messages()),
            Self::Collection(filter) => Messages::Nested(filter.messages().clone()),
        }
    }

    fn value(&self) -> Value {
        match self {
            Self::Input(input) => input.value(),
            Self::Filter(filter) => Value::Object(filter.values()),
            Self::Collection(filter) => Value::Object(filter.values().clone()),
        }
    }

    fn raw_value(&self) -> Value {
        match self {
            Self::Input(input) => input.raw_value(),
            Self::Filter(filter) => Value::Object(filter.raw_values()),
            Self::Collection(filter) => Value::Object(filter.raw_values().clone()),
        }
    }
}

/// An ordered, hierarchical set of inputs.
///
/// # Examples
///
/// ```
/// use formtree_filter::{Input, InputFilter, DataMap};
/// use serde_json::json;
///
/// let mut filter = InputFilter::new().with_input(Input::new("name"));
/// filter.set_data(DataMap::new());
/// assert!(!filter.is_valid());
/// assert!(filter.messages().contains_key("name"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InputFilter {
    entries: Vec<(String, Entry)>,
    data: DataMap,
    validation_group: Option<Vec<String>>,
    valid_inputs: Vec<String>,
    invalid_inputs: Vec<String>,
}

impl InputFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input under its own name.
    #[must_use]
    pub fn with_input(mut self, input: Input) -> Self {
        self.add_input(input);
        self
    }

    /// Adds an entry under `name`.
    #[must_use]
    pub fn with_entry(mut self, name: impl Into<String>, entry: impl Into<Entry>) -> Self {
        self.add(name, entry);
        self
    }

    // ── Structure ────────────────────────────────────────────────────

    /// Adds an entry under `name`.
    ///
    /// Adding an input where an input already exists merges the new input
    /// into the existing one; any other combination replaces the entry.
    pub fn add(&mut self, name: impl Into<String>, entry: impl Into<Entry>) {
        let name = name.into();
        let entry = entry.into();
        let Some(index) = self.entries.iter().position(|(n, _)| *n == name) else {
            self.entries.push((name, entry));
            return;
        };
        match (&mut self.entries[index].1, entry) {
            (Entry::Input(existing), Entry::Input(incoming)) => existing.merge(&incoming),
            (slot, entry) => *slot = entry,
        }
    }

    /// Adds an input under its own name.
    pub fn add_input(&mut self, input: Input) {
        let name = input.name().to_string();
        self.add(name, input);
    }

    /// Replaces the entry under `name`.
    pub fn replace(&mut self, name: &str, entry: impl Into<Entry>) -> FormResult<()> {
        let slot = self
            .entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| {
                FormError::InvalidArgument(format!(
                    "cannot replace '{name}': no entry of that name exists"
                ))
            })?;
        slot.1 = entry.into();
        Ok(())
    }

    /// Removes and returns the entry under `name`.
    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns `true` if an entry exists under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Returns the entry under `name`.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Returns the entry under `name` mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    /// Iterates the entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Returns the entry names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Data ─────────────────────────────────────────────────────────

    /// Sets the data and pushes each key's value to the matching entry.
    pub fn set_data(&mut self, data: DataMap) {
        for (name, entry) in &mut self.entries {
            entry.populate(data.get(name.as_str()));
        }
        self.data = data;
    }

    /// The data last set.
    pub const fn data(&self) -> &DataMap {
        &self.data
    }

    /// Restricts validation to a group, or validates everything with `None`.
    ///
    /// Group keys naming no entry are ignored. A group that selects nothing
    /// known leaves the filter validating everything.
    pub fn set_validation_group(&mut self, group: Option<&ValidationGroup>) {
        let Some(group) = group else {
            self.validation_group = None;
            for (_, entry) in &mut self.entries {
                entry.set_validation_group(None);
            }
            return;
        };

        let mut names = Vec::new();
        for (key, selection) in group.iter() {
            let Some(entry) = self.get_mut(key) else {
                tracing::debug!("Ignoring validation group key '{key}': no such input");
                continue;
            };
            entry.set_validation_group(selection.as_group());
            names.push(key.clone());
        }
        self.validation_group = if names.is_empty() { None } else { Some(names) };
    }

    /// The names selected for validation, or `None` for all.
    pub fn validation_group(&self) -> Option<&[String]> {
        self.validation_group.as_deref()
    }

    fn active_names(&self) -> Vec<String> {
        self.validation_group
            .clone()
            .unwrap_or_else(|| self.names())
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Validates the selected entries against the current data.
    ///
    /// Optional inputs whose key is absent from the data are skipped. An
    /// input flagged `break_on_failure` stops validation when it fails.
    pub fn is_valid(&mut self) -> bool {
        self.valid_inputs.clear();
        self.invalid_inputs.clear();
        let context = self.data.clone();
        let mut valid = true;

        for name in self.active_names() {
            let present = context.contains_key(&name);
            let Some(entry) = self.get_mut(&name) else {
                continue;
            };
            let (ok, stop) = match entry {
                Entry::Input(input) => {
                    if !present && !input.is_required() {
                        continue;
                    }
                    let ok = input.is_valid(&context);
                    (ok, !ok && input.breaks_on_failure())
                }
                Entry::Filter(filter) => (filter.is_valid(), false),
                Entry::Collection(filter) => (filter.is_valid(), false),
            };
            if ok {
                self.valid_inputs.push(name);
            } else {
                valid = false;
                self.invalid_inputs.push(name);
                if stop {
                    return false;
                }
            }
        }

        valid
    }

    /// Messages for every entry that failed the last validation.
    pub fn messages(&self) -> MessageMap {
        self.invalid_inputs
            .iter()
            .filter_map(|name| {
                let messages = self.get(name)?.messages();
                (!messages.is_empty()).then(|| (name.clone(), messages))
            })
            .collect()
    }

    /// Names of entries that passed the last validation.
    pub fn valid_input_names(&self) -> &[String] {
        &self.valid_inputs
    }

    /// Names of entries that failed the last validation.
    pub fn invalid_input_names(&self) -> &[String] {
        &self.invalid_inputs
    }

    /// Filtered values of the selected entries.
    pub fn values(&self) -> DataMap {
        self.active_names()
            .into_iter()
            .filter_map(|name| {
                let value = self.get(&name)?.value();
                Some((name, value))
            })
            .collect()
    }

    /// Raw values of the selected entries.
    pub fn raw_values(&self) -> DataMap {
        self.active_names()
            .into_iter()
            .filter_map(|name| {
                let value = self.get(&name)?.raw_value();
                Some((name, value))
            })
            .collect()
    }
}

/// Applies one inner filter to each item of a collection.
///
/// Entries added directly to the collection filter are staged and moved into
/// the inner filter by [`flush_staged`](Self::flush_staged); entries already
/// present in the inner filter win.
#[derive(Debug, Clone, Default)]
pub struct CollectionInputFilter {
    inner: InputFilter,
    staged: InputFilter,
    /// Set for scalar items: each item is fed to the inner input of this name.
    item_input: Option<String>,
    count: Option<usize>,
    required: bool,
    items: Vec<(String, DataMap)>,
    validation_group: Option<ValidationGroup>,
    values: DataMap,
    raw_values: DataMap,
    messages: MessageMap,
}

impl CollectionInputFilter {
    /// Creates a collection filter around `inner`.
    pub fn new(inner: InputFilter) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Creates a collection filter whose items are scalar values, each
    /// validated by `input`.
    pub fn for_input(input: Input) -> Self {
        Self {
            item_input: Some(input.name().to_string()),
            inner: InputFilter::new().with_input(input),
            ..Self::default()
        }
    }

    /// The name of the input scalar items are validated by, if any.
    pub fn item_input(&self) -> Option<&str> {
        self.item_input.as_deref()
    }

    /// Requires a minimum number of items.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets whether at least one item is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// The filter applied to each item.
    pub const fn inner(&self) -> &InputFilter {
        &self.inner
    }

    /// The filter applied to each item, mutably.
    pub fn inner_mut(&mut self) -> &mut InputFilter {
        &mut self.inner
    }

    /// Replaces the filter applied to each item.
    pub fn set_inner(&mut self, inner: InputFilter) {
        self.inner = inner;
    }

    /// Whether at least one item is required.
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// The expected number of items: the configured count, or the number
    /// of submitted items.
    pub fn count(&self) -> usize {
        self.count.unwrap_or(self.items.len())
    }

    // ── Structure ────────────────────────────────────────────────────

    /// Returns `true` if a staged or inner entry exists under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.staged.has(name) || self.inner.has(name)
    }

    /// Returns the staged entry under `name`, or the inner one.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.staged.get(name).or_else(|| self.inner.get(name))
    }

    /// Returns the staged entry under `name`, or the inner one, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entry> {
        if self.staged.has(name) {
            self.staged.get_mut(name)
        } else {
            self.inner.get_mut(name)
        }
    }

    /// Stages an entry on the collection itself.
    pub fn add(&mut self, name: impl Into<String>, entry: impl Into<Entry>) {
        self.staged.add(name, entry);
    }

    /// Replaces an entry, wherever it lives.
    pub fn replace(&mut self, name: &str, entry: impl Into<Entry>) -> FormResult<()> {
        if self.inner.has(name) {
            self.inner.replace(name, entry)
        } else {
            self.staged.replace(name, entry)
        }
    }

    /// Names of the staged entries.
    pub fn staged_names(&self) -> Vec<String> {
        self.staged.names()
    }

    /// Moves staged entries the inner filter lacks into the inner filter.
    pub fn flush_staged(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        for (name, entry) in staged.entries {
            if self.inner.has(&name) {
                tracing::trace!("Keeping inner entry '{name}' over staged copy");
                continue;
            }
            self.inner.add(name, entry);
        }
    }

    // ── Data ─────────────────────────────────────────────────────────

    /// Sets the collection data: an object keyed by item id, or an array.
    pub fn set_data(&mut self, data: &Value) {
        let items: Vec<(String, DataMap)> = sorted_item_entries(data)
            .into_iter()
            .map(|(key, item)| match &self.item_input {
                Some(name) => (key, std::iter::once((name.clone(), item.clone())).collect::<DataMap>()),
                None => (key, as_map(item)),
            })
            .collect();
        self.items = items;
        self.values.clear();
        self.raw_values.clear();
    }

    /// Item ids of the current data, in order.
    pub fn item_keys(&self) -> Vec<String> {
        self.items.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Sets the per-item validation group, keyed by item id.
    ///
    /// An item whose id is absent from the group is validated in full.
    pub fn set_validation_group(&mut self, group: Option<&ValidationGroup>) {
        self.validation_group = group.cloned();
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Validates every item with the inner filter.
    pub fn is_valid(&mut self) -> bool {
        self.flush_staged();
        self.messages.clear();
        self.values.clear();
        self.raw_values.clear();

        let mut valid = true;
        let expected = self.count();
        if expected < 1 && self.required {
            self.messages.insert(
                NON_FIELD_KEY.to_string(),
                Messages::Field(vec![NotEmpty::MESSAGE.to_string()]),
            );
            valid = false;
        }
        if self.items.len() < expected {
            self.messages.insert(
                NON_FIELD_KEY.to_string(),
                Messages::Field(vec![format!(
                    "Expected at least {expected} items, got {}",
                    self.items.len()
                )]),
            );
            valid = false;
        }

        for (key, data) in &self.items {
            let item_group = self
                .validation_group
                .as_ref()
                .and_then(|group| group.get(key))
                .and_then(|entry| entry.as_group());
            self.inner.set_data(data.clone());
            self.inner.set_validation_group(item_group);
            let item_valid = self.inner.is_valid();
            match &self.item_input {
                Some(name) => {
                    if !item_valid {
                        let messages = self
                            .inner
                            .messages()
                            .remove(name)
                            .unwrap_or_else(|| Messages::Field(Vec::new()));
                        self.messages.insert(key.clone(), messages);
                    }
                    let mut values = self.inner.values();
                    let mut raw_values = self.inner.raw_values();
                    self.values
                        .insert(key.clone(), values.remove(name).unwrap_or(Value::Null));
                    self.raw_values
                        .insert(key.clone(), raw_values.remove(name).unwrap_or(Value::Null));
                }
                None => {
                    if !item_valid {
                        self.messages
                            .insert(key.clone(), Messages::Nested(self.inner.messages()));
                    }
                    self.values
                        .insert(key.clone(), Value::Object(self.inner.values()));
                    self.raw_values
                        .insert(key.clone(), Value::Object(self.inner.raw_values()));
                }
            }
            valid &= item_valid;
        }
        self.inner.set_validation_group(None);

        valid
    }

    /// Messages from the last validation, keyed by item id.
    pub const fn messages(&self) -> &MessageMap {
        &self.messages
    }

    /// Filtered values from the last validation, keyed by item id.
    pub const fn values(&self) -> &DataMap {
        &self.values
    }

    /// Raw values from the last validation, keyed by item id.
    pub const fn raw_values(&self) -> &DataMap {
        &self.raw_values
    }
}
