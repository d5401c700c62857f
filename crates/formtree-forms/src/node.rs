//! The closed set of form tree nodes.

use serde_json::Value;

use formtree_core::FormResult;
use formtree_filter::Messages;

use crate::collection::Collection;
use crate::element::Element;
use crate::fieldset::Fieldset;

/// A node of the form tree.
#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Fieldset(Fieldset),
    Collection(Collection),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<Fieldset> for Node {
    fn from(fieldset: Fieldset) -> Self {
        Self::Fieldset(fieldset)
    }
}

impl From<Collection> for Node {
    fn from(collection: Collection) -> Self {
        Self::Collection(collection)
    }
}

impl Node {
    /// The short name, used as the key in the enclosing fieldset.
    pub fn name(&self) -> &str {
        match self {
            Self::Element(e) => e.name(),
            Self::Fieldset(f) => f.name(),
            Self::Collection(c) => c.name(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            Self::Element(e) => e.set_name(name),
            Self::Fieldset(f) => f.set_name(name),
            Self::Collection(c) => c.set_name(name),
        }
    }

    /// The wrapped name once prepared, or the short name.
    pub fn full_name(&self) -> &str {
        match self {
            Self::Element(e) => e.full_name(),
            Self::Fieldset(f) => f.full_name(),
            Self::Collection(c) => c.full_name(),
        }
    }

    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    pub const fn as_fieldset(&self) -> Option<&Fieldset> {
        match self {
            Self::Fieldset(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_fieldset_mut(&mut self) -> Option<&mut Fieldset> {
        match self {
            Self::Fieldset(f) => Some(f),
            _ => None,
        }
    }

    pub const fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut Collection> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Whether the node carries a truthy `disabled` attribute.
    pub fn is_disabled(&self) -> bool {
        match self {
            Self::Element(e) => e.is_disabled(),
            Self::Fieldset(f) => f.is_disabled(),
            Self::Collection(c) => c.items().is_disabled(),
        }
    }

    /// Messages from the last failed validation.
    pub fn messages(&self) -> Messages {
        match self {
            Self::Element(e) => Messages::Field(e.messages().to_vec()),
            Self::Fieldset(f) => Messages::Nested(f.messages()),
            Self::Collection(c) => Messages::Nested(c.messages()),
        }
    }

    /// Distributes messages to the node and its descendants.
    pub fn set_messages(&mut self, messages: Messages) {
        match (self, messages) {
            (Self::Element(e), Messages::Field(list)) => e.set_messages(list),
            (Self::Fieldset(f), Messages::Nested(map)) => f.set_messages(map),
            (Self::Collection(c), Messages::Nested(map)) => c.set_messages(map),
            (node, _) => {
                tracing::trace!(node = node.name(), "Ignoring messages of a mismatched shape");
            }
        }
    }

    pub(crate) fn clear_messages(&mut self) {
        match self {
            Self::Element(e) => e.set_messages(Vec::new()),
            Self::Fieldset(f) => f.set_messages(formtree_filter::MessageMap::new()),
            Self::Collection(c) => c.set_messages(formtree_filter::MessageMap::new()),
        }
    }

    /// Pushes a submitted value into the node.
    pub(crate) fn populate(&mut self, value: Option<&Value>) -> FormResult<()> {
        match self {
            Self::Fieldset(fieldset) => {
                if let Some(Value::Object(data)) = value {
                    fieldset.populate_values(data)?;
                }
            }
            Self::Collection(collection) => match value {
                Some(v) if !v.is_null() => collection.populate_values(v)?,
                _ => collection.populate_values(&Value::Array(Vec::new()))?,
            },
            Self::Element(element) => {
                if let Some(v) = value {
                    element.set_value(v.clone());
                }
            }
        }
        Ok(())
    }

    /// Wraps the node's name under `parent` and prepares its descendants.
    pub(crate) fn prepare(&mut self, parent: Option<&str>) -> FormResult<()> {
        let full_name = parent.map_or_else(
            || self.name().to_string(),
            |p| format!("{p}[{}]", self.name()),
        );
        match self {
            Self::Element(e) => e.set_full_name(full_name),
            Self::Fieldset(f) => f.prepare_element(full_name)?,
            Self::Collection(c) => c.prepare_element(full_name)?,
        }
        Ok(())
    }
}
