//! Nested data maps and the helpers shared by filters and forms.
//!
//! Submitted data is a JSON-shaped tree. Repeating sections may arrive
//! either as objects keyed by item id (`{"0": {..}, "5": {..}}`) or as
//! arrays; [`item_entries`] gives both shapes the same keyed view.

use std::cmp::Ordering;

use serde_json::Value;

/// A nested string-keyed data map.
pub type DataMap = serde_json::Map<String, Value>;

/// Returns `true` for values an input treats as "no value": null, the empty
/// string, and empty arrays or objects.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Returns the keyed items of a collection value.
///
/// Objects yield their entries; arrays yield `("0", ..), ("1", ..)`. Any
/// other value has no items.
pub fn item_entries(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// Returns the value as a map, or an empty map for anything else.
pub fn as_map(value: &Value) -> DataMap {
    match value {
        Value::Object(map) => map.clone(),
        Value::Array(_) => item_entries(value)
            .into_iter()
            .map(|(k, v)| (k, v.clone()))
            .collect(),
        _ => DataMap::new(),
    }
}

/// Compares item keys numerically where possible, then lexically.
pub fn compare_item_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Orders item keys numerically where possible, then lexically.
pub fn sort_item_keys(keys: &mut [String]) {
    keys.sort_by(|a, b| compare_item_keys(a, b));
}

/// [`item_entries`] in item-key order.
pub fn sorted_item_entries(value: &Value) -> Vec<(String, &Value)> {
    let mut entries = item_entries(value);
    entries.sort_by(|(a, _), (b, _)| compare_item_keys(a, b));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!([])));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!(" ")));
    }

    #[test]
    fn test_item_entries_from_array_and_object() {
        let arr = json!(["a", "b"]);
        let keys: Vec<String> = item_entries(&arr).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["0", "1"]);

        let obj = json!({"5": "x", "2": "y"});
        assert_eq!(item_entries(&obj).len(), 2);
        assert!(item_entries(&json!("scalar")).is_empty());
    }

    #[test]
    fn test_sort_item_keys_numeric() {
        let mut keys = vec!["10".to_string(), "2".to_string(), "x".to_string(), "0".to_string()];
        sort_item_keys(&mut keys);
        assert_eq!(keys, vec!["0", "2", "10", "x"]);
    }

    #[test]
    fn test_sorted_item_entries() {
        let obj = json!({"10": "c", "2": "b", "0": "a"});
        let values: Vec<&Value> = sorted_item_entries(&obj).into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![&json!("a"), &json!("b"), &json!("c")]);
    }

    #[test]
    fn test_as_map_from_array() {
        let map = as_map(&json!([1, 2]));
        assert_eq!(map.get("1"), Some(&json!(2)));
        assert!(as_map(&json!(3)).is_empty());
    }
}
