//! Hydrators: conversion between a bound object and a data map.
//!
//! Bound objects are stored type-erased (`Box<dyn Any + Send + Sync>`), so a
//! hydrator downcasts to the type it knows and fails with
//! [`FormError::Hydration`] for anything else.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use formtree_core::{FormError, FormResult};
use formtree_filter::DataMap;

/// Extracts data from an object and hydrates data back into it.
pub trait Hydrator: Send + Sync + fmt::Debug {
    /// Returns the object's current values as a map.
    fn extract(&self, object: &dyn Any) -> FormResult<DataMap>;

    /// Writes `data` into the object. Keys absent from `data` keep their
    /// current value, at any depth (see [`merge_value`]).
    fn hydrate(&self, data: DataMap, object: &mut dyn Any) -> FormResult<()>;
}

/// Hydrates any `serde` type through its JSON representation.
///
/// # Examples
///
/// ```
/// use formtree_forms::hydrator::{Hydrator, SerdeHydrator};
/// use formtree_filter::DataMap;
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Serialize, Deserialize)]
/// struct User { name: String, age: u32 }
///
/// let hydrator = SerdeHydrator::<User>::new();
/// let mut user = User { name: "ann".into(), age: 30 };
/// let mut data = DataMap::new();
/// data.insert("age".into(), json!(31));
/// hydrator.hydrate(data, &mut user).unwrap();
/// assert_eq!(user.age, 31);
/// assert_eq!(user.name, "ann");
/// ```
pub struct SerdeHydrator<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> SerdeHydrator<T> {
    /// Creates a hydrator for `T`.
    pub const fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeHydrator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeHydrator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerdeHydrator<{}>", type_name::<T>())
    }
}

/// Merges `patch` into `target`.
///
/// Maps merge key by key. Lists merge item by item and take the length of
/// `patch`. Anything else is replaced.
pub fn merge_value(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => merge_map(target, patch),
        (Value::Array(target), Value::Array(patch)) => {
            target.truncate(patch.len());
            for (index, item) in patch.into_iter().enumerate() {
                match target.get_mut(index) {
                    Some(current) => merge_value(current, item),
                    None => target.push(item),
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

fn merge_map(target: &mut DataMap, patch: DataMap) {
    for (key, value) in patch {
        match target.get_mut(&key) {
            Some(current) => merge_value(current, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn wrong_type<T>() -> FormError {
    FormError::Hydration(format!("bound object is not a {}", type_name::<T>()))
}

impl<T> Hydrator for SerdeHydrator<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn extract(&self, object: &dyn Any) -> FormResult<DataMap> {
        let object = object.downcast_ref::<T>().ok_or_else(wrong_type::<T>)?;
        match serde_json::to_value(object)? {
            Value::Object(map) => Ok(map),
            other => Err(FormError::Hydration(format!(
                "{} does not serialize to a map: {other}",
                type_name::<T>()
            ))),
        }
    }

    fn hydrate(&self, data: DataMap, object: &mut dyn Any) -> FormResult<()> {
        let object = object.downcast_mut::<T>().ok_or_else(wrong_type::<T>)?;
        let mut merged = match serde_json::to_value(&*object)? {
            Value::Object(map) => map,
            _ => DataMap::new(),
        };
        merge_map(&mut merged, data);
        *object = serde_json::from_value(Value::Object(merged)).map_err(|e| {
            FormError::Hydration(format!("cannot hydrate {}: {e}", type_name::<T>()))
        })?;
        Ok(())
    }
}

/// Hydrates a bound [`DataMap`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapHydrator;

impl Hydrator for MapHydrator {
    fn extract(&self, object: &dyn Any) -> FormResult<DataMap> {
        object
            .downcast_ref::<DataMap>()
            .cloned()
            .ok_or_else(wrong_type::<DataMap>)
    }

    fn hydrate(&self, data: DataMap, object: &mut dyn Any) -> FormResult<()> {
        let object = object
            .downcast_mut::<DataMap>()
            .ok_or_else(wrong_type::<DataMap>)?;
        merge_map(object, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Address {
        street: String,
        zip: Option<String>,
    }

    fn map(value: Value) -> DataMap {
        match value {
            Value::Object(m) => m,
            _ => DataMap::new(),
        }
    }

    #[test]
    fn test_serde_extract() {
        let address = Address {
            street: "Main".into(),
            zip: None,
        };
        let data = SerdeHydrator::<Address>::new().extract(&address).unwrap();
        assert_eq!(data, map(json!({"street": "Main", "zip": null})));
    }

    #[test]
    fn test_serde_hydrate_keeps_missing_keys() {
        let mut address = Address {
            street: "Main".into(),
            zip: Some("123".into()),
        };
        SerdeHydrator::<Address>::new()
            .hydrate(map(json!({"street": "Side"})), &mut address)
            .unwrap();
        assert_eq!(address.street, "Side");
        assert_eq!(address.zip.as_deref(), Some("123"));
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
        home: Address,
        past: Vec<Address>,
    }

    #[test]
    fn test_serde_hydrate_merges_nested_values() {
        let mut person = Person {
            name: "ann".into(),
            home: Address {
                street: "Main".into(),
                zip: Some("123".into()),
            },
            past: vec![
                Address {
                    street: "Old".into(),
                    zip: Some("9".into()),
                },
                Address {
                    street: "Older".into(),
                    zip: None,
                },
            ],
        };
        SerdeHydrator::<Person>::new()
            .hydrate(
                map(json!({"home": {"street": "Side"}, "past": [{"street": "Gone"}]})),
                &mut person,
            )
            .unwrap();
        assert_eq!(person.home.street, "Side");
        assert_eq!(person.home.zip.as_deref(), Some("123"));
        assert_eq!(
            person.past,
            vec![Address {
                street: "Gone".into(),
                zip: Some("9".into()),
            }]
        );
    }

    #[test]
    fn test_merge_value_replaces_scalars_and_appends() {
        let mut target = json!({"tags": ["a"], "n": 1});
        merge_value(&mut target, json!({"tags": ["b", "c"], "n": {"x": 2}}));
        assert_eq!(target, json!({"tags": ["b", "c"], "n": {"x": 2}}));
    }

    #[test]
    fn test_serde_wrong_type() {
        let err = SerdeHydrator::<Address>::new().extract(&5_u32).unwrap_err();
        assert_eq!(err.code(), "hydration");
    }

    #[test]
    fn test_serde_bad_data() {
        let mut address = Address {
            street: "Main".into(),
            zip: None,
        };
        let err = SerdeHydrator::<Address>::new()
            .hydrate(map(json!({"street": 7})), &mut address)
            .unwrap_err();
        assert_eq!(err.code(), "hydration");
        assert_eq!(address.street, "Main");
    }

    #[test]
    fn test_map_hydrator() {
        let mut object = map(json!({"a": 1, "c": {"x": 1, "y": 2}}));
        MapHydrator.hydrate(map(json!({"b": 2, "c": {"y": 3}})), &mut object).unwrap();
        assert_eq!(
            MapHydrator.extract(&object).unwrap(),
            map(json!({"a": 1, "b": 2, "c": {"x": 1, "y": 3}}))
        );
    }
}
