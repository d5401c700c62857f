//! Input-filter default synthesis.
//!
//! Walks a fieldset tree and completes an input filter so that its shape
//! mirrors the tree:
//!
//! - an element with an input specification gets an input built from it,
//!   merged into (and replacing) an existing input of the same name;
//! - an element without one gets a permissive `required: false` input
//!   unless an entry already exists;
//! - with `prefer_form_input_filter`, existing entries are never touched;
//! - a fieldset gets a nested filter (built from its declared spec if it
//!   has one) and is walked recursively;
//! - a collection with a fieldset target gets a collection filter whose
//!   inner filter is completed from the target;
//! - a collection with an element target gets a collection filter that
//!   runs the target's input against each item.

use formtree_core::FormResult;
use formtree_filter::{CollectionInputFilter, Entry, InputFilter, InputFilterFactory, InputFilterSpec, InputSpec};

use crate::element::Element;
use crate::fieldset::Fieldset;
use crate::node::Node;

/// What the synthesis needs from the form.
#[derive(Debug, Clone, Copy)]
pub struct DefaultsContext<'a> {
    pub factory: &'a InputFilterFactory,
    pub prefer_form_input_filter: bool,
}

/// Completes `filter` with defaults for the form's root fieldset, then
/// layers the form's own declared spec on top.
pub fn attach_form_defaults(
    ctx: DefaultsContext<'_>,
    filter: &mut InputFilter,
    root: &Fieldset,
) -> FormResult<()> {
    attach_element_defaults(ctx, filter, root)?;
    if let Some(spec) = root.input_filter_spec() {
        layer_spec(ctx, filter, spec)?;
    }
    attach_fieldset_defaults(ctx, filter, root)
}

/// Completes `filter` with defaults for `fieldset` and its descendants.
pub fn attach_input_filter_defaults(
    ctx: DefaultsContext<'_>,
    filter: &mut InputFilter,
    fieldset: &Fieldset,
) -> FormResult<()> {
    attach_element_defaults(ctx, filter, fieldset)?;
    attach_fieldset_defaults(ctx, filter, fieldset)
}

fn attach_element_defaults(
    ctx: DefaultsContext<'_>,
    filter: &mut InputFilter,
    fieldset: &Fieldset,
) -> FormResult<()> {
    for element in fieldset.elements() {
        attach_element(ctx, filter, element)?;
    }
    Ok(())
}

fn attach_element(ctx: DefaultsContext<'_>, filter: &mut InputFilter, element: &Element) -> FormResult<()> {
    let name = element.name();
    if ctx.prefer_form_input_filter && filter.has(name) {
        tracing::trace!(input = name, "Keeping declared input");
        return Ok(());
    }

    let Some(spec) = element.input_specification() else {
        if !filter.has(name) {
            let input = ctx.factory.create_input(name, &InputSpec::new().required(false))?;
            filter.add(name, input);
        }
        return Ok(());
    };

    let mut input = ctx.factory.create_input(name, &spec)?;
    match filter.get(name) {
        Some(existing) => {
            if let Some(existing) = existing.as_input() {
                input.merge(existing);
            }
            filter.replace(name, input)?;
        }
        None => filter.add(name, input),
    }
    Ok(())
}

/// Sets each entry of the form's own spec, replacing what is there.
fn layer_spec(ctx: DefaultsContext<'_>, filter: &mut InputFilter, spec: &InputFilterSpec) -> FormResult<()> {
    for (name, input) in &spec.inputs {
        set_entry(filter, name, ctx.factory.create_input(name, input)?.into())?;
    }
    for (name, nested) in &spec.filters {
        set_entry(filter, name, ctx.factory.create_input_filter(nested)?.into())?;
    }
    for (name, collection) in &spec.collections {
        set_entry(filter, name, ctx.factory.create_collection_input_filter(collection)?.into())?;
    }
    Ok(())
}

fn set_entry(filter: &mut InputFilter, name: &str, entry: Entry) -> FormResult<()> {
    if filter.has(name) {
        filter.replace(name, entry)
    } else {
        filter.add(name, entry);
        Ok(())
    }
}

fn attach_fieldset_defaults(
    ctx: DefaultsContext<'_>,
    filter: &mut InputFilter,
    fieldset: &Fieldset,
) -> FormResult<()> {
    for child in fieldset.children() {
        match child {
            Node::Element(_) => {}
            Node::Fieldset(nested) => attach_nested_fieldset(ctx, filter, nested)?,
            Node::Collection(collection) => {
                let name = collection.name();
                match collection.target() {
                    Some(Node::Fieldset(target)) => {
                        if !filter.has(name) {
                            let inner = match target.input_filter_spec() {
                                Some(spec) => ctx.factory.create_input_filter(spec)?,
                                None => InputFilter::new(),
                            };
                            filter.add(name, CollectionInputFilter::new(inner));
                        }
                        match filter.get_mut(name) {
                            Some(Entry::Collection(entry)) => {
                                entry.flush_staged();
                                attach_input_filter_defaults(ctx, entry.inner_mut(), target)?;
                            }
                            Some(Entry::Filter(entry)) => {
                                attach_input_filter_defaults(ctx, entry, collection.items())?;
                            }
                            _ => tracing::trace!(collection = name, "Input declared for collection"),
                        }
                    }
                    Some(Node::Element(target)) => {
                        if !filter.has(name) {
                            let spec = target
                                .input_specification()
                                .unwrap_or_else(|| InputSpec::new().required(false));
                            let input = ctx.factory.create_input(target.name(), &spec)?;
                            filter.add(name, CollectionInputFilter::for_input(input));
                        }
                        match filter.get_mut(name) {
                            Some(Entry::Collection(entry)) => entry.flush_staged(),
                            Some(Entry::Filter(entry)) => {
                                attach_input_filter_defaults(ctx, entry, collection.items())?;
                            }
                            _ => tracing::trace!(collection = name, "Input declared for collection"),
                        }
                    }
                    _ => {
                        if !filter.has(name) {
                            filter.add(name, InputFilter::new());
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn attach_nested_fieldset(
    ctx: DefaultsContext<'_>,
    filter: &mut InputFilter,
    fieldset: &Fieldset,
) -> FormResult<()> {
    let name = fieldset.name();

    if let Some(spec) = fieldset.input_filter_spec() {
        if filter.has(name) {
            return Ok(());
        }
        let mut nested = ctx.factory.create_input_filter(spec)?;
        attach_input_filter_defaults(ctx, &mut nested, fieldset)?;
        filter.add(name, nested);
        return Ok(());
    }

    if !filter.has(name) {
        filter.add(name, InputFilter::new());
    }
    match filter.get_mut(name) {
        Some(Entry::Filter(nested)) => attach_input_filter_defaults(ctx, nested, fieldset),
        Some(Entry::Collection(nested)) => {
            nested.flush_staged();
            attach_input_filter_defaults(ctx, nested.inner_mut(), fieldset)
        }
        _ => {
            tracing::trace!(fieldset = name, "Input declared for fieldset");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use formtree_filter::data::as_map;
    use formtree_filter::Input;
    use serde_json::json;

    fn ctx(factory: &InputFilterFactory, prefer: bool) -> DefaultsContext<'_> {
        DefaultsContext {
            factory,
            prefer_form_input_filter: prefer,
        }
    }

    fn input<'a>(filter: &'a InputFilter, name: &str) -> &'a Input {
        filter.get(name).and_then(Entry::as_input).unwrap()
    }

    fn tree() -> Fieldset {
        Fieldset::new("form")
            .with(Element::text("title"))
            .with(Element::email("email"))
            .with(Fieldset::new("address").with(Element::text("street")))
            .with(
                Collection::new("lines").with_target(
                    Fieldset::new("line")
                        .with(Element::number("qty"))
                        .with_input_filter_spec(
                            InputFilterSpec::new().input("sku", InputSpec::new()),
                        ),
                ),
            )
    }

    #[test]
    fn test_mirrors_tree() {
        let factory = InputFilterFactory::new();
        let mut filter = InputFilter::new();
        attach_form_defaults(ctx(&factory, false), &mut filter, &tree()).unwrap();

        assert!(!input(&filter, "title").is_required());
        assert!(input(&filter, "email").is_required());
        let address = filter.get("address").and_then(Entry::as_filter).unwrap();
        assert!(address.has("street"));
        let lines = filter.get("lines").and_then(Entry::as_collection).unwrap();
        assert!(lines.inner().has("sku"));
        assert!(lines.inner().has("qty"));
    }

    #[test]
    fn test_repeat_pass_preferring_form_filter_is_stable() {
        let factory = InputFilterFactory::new();
        let mut filter = InputFilter::new();
        attach_form_defaults(ctx(&factory, false), &mut filter, &tree()).unwrap();
        let names = filter.names();
        let validators = input(&filter, "email").validator_count();
        attach_form_defaults(ctx(&factory, true), &mut filter, &tree()).unwrap();
        assert_eq!(filter.names(), names);
        assert_eq!(input(&filter, "email").validator_count(), validators);
    }

    #[test]
    fn test_prefer_form_input_filter_keeps_declared() {
        let factory = InputFilterFactory::new();
        let mut filter = InputFilter::new().with_input(Input::new("email").required(false));
        attach_form_defaults(ctx(&factory, true), &mut filter, &tree()).unwrap();
        let email = input(&filter, "email");
        assert!(!email.is_required());
        assert_eq!(email.validator_count(), 0);
    }

    #[test]
    fn test_element_spec_merges_declared() {
        let factory = InputFilterFactory::new();
        let mut filter = InputFilter::new().with_input(Input::new("email").required(false));
        attach_form_defaults(ctx(&factory, false), &mut filter, &tree()).unwrap();
        let email = input(&filter, "email");
        assert!(!email.is_required());
        assert_eq!(email.validator_count(), 1);
        assert_eq!(email.filter_count(), 1);
    }

    #[test]
    fn test_default_input_does_not_override_declared() {
        let factory = InputFilterFactory::new();
        let mut filter = InputFilter::new().with_input(Input::new("title"));
        attach_form_defaults(ctx(&factory, false), &mut filter, &tree()).unwrap();
        assert!(input(&filter, "title").is_required());
    }

    #[test]
    fn test_form_spec_layers_over_defaults() {
        let factory = InputFilterFactory::new();
        let root = tree().with_input_filter_spec(
            InputFilterSpec::new().input("title", InputSpec::new().validator("string_length", json!({"max": 5}))),
        );
        let mut filter = InputFilter::new();
        attach_form_defaults(ctx(&factory, false), &mut filter, &root).unwrap();
        let title = input(&filter, "title");
        assert!(title.is_required());
        assert_eq!(title.validator_count(), 1);
    }

    #[test]
    fn test_provider_fieldset_uses_its_spec() {
        let factory = InputFilterFactory::new();
        let root = Fieldset::new("form").with(
            Fieldset::new("profile")
                .with(Element::text("nick"))
                .with_input_filter_spec(InputFilterSpec::new().input("nick", InputSpec::new())),
        );
        let mut filter = InputFilter::new();
        attach_form_defaults(ctx(&factory, false), &mut filter, &root).unwrap();
        let profile = filter.get("profile").and_then(Entry::as_filter).unwrap();
        assert!(input(profile, "nick").is_required());
    }

    #[test]
    fn test_staged_collection_inputs_reach_inner_filter() {
        let factory = InputFilterFactory::new();
        let mut lines = CollectionInputFilter::new(InputFilter::new());
        lines.add("note", Input::new("note"));
        let mut filter = InputFilter::new().with_entry("lines", lines);
        attach_form_defaults(ctx(&factory, false), &mut filter, &tree()).unwrap();
        let lines = filter.get("lines").and_then(Entry::as_collection).unwrap();
        assert!(lines.staged_names().is_empty());
        assert!(lines.inner().has("note"));
        assert!(lines.inner().has("qty"));
    }

    #[test]
    fn test_element_target_collection_validates_items_by_target() {
        let factory = InputFilterFactory::new();
        let root = Fieldset::new("form").with(Collection::new("emails").with_target(Element::email("email")));
        let mut filter = InputFilter::new();
        attach_form_defaults(ctx(&factory, false), &mut filter, &root).unwrap();
        let emails = filter.get("emails").and_then(Entry::as_collection).unwrap();
        assert_eq!(emails.item_input(), Some("email"));
        assert!(input(emails.inner(), "email").is_required());

        filter.set_data(as_map(&json!({"emails": ["a@b.com", "x", "c@d.com"]})));
        assert!(!filter.is_valid());
        let messages = filter.messages();
        let emails = messages["emails"].as_nested().unwrap();
        assert_eq!(emails.keys().collect::<Vec<_>>(), vec!["1"]);
    }
}
