//! Property payload helpers shared by the resource wrappers.

use serde_json::{Map, Value};

/// Fields HubSpot accepts on a property definition.
pub const PROPERTY_FIELD_NAMES: &[&str] = &[
    "name",
    "groupName",
    "description",
    "fieldType",
    "formField",
    "type",
    "displayOrder",
    "label",
    "options",
    "showCurrencySymbol",
];

/// `{"a": 1}` → `[{"<key_name>": "a", "value": 1}]`.
pub fn hash_to_properties<'a, I>(properties: I, key_name: &str) -> Value
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    Value::Array(
        properties
            .into_iter()
            .map(|(key, value)| {
                let mut entry = Map::new();
                entry.insert(key_name.to_string(), Value::String(key.clone()));
                entry.insert("value".to_string(), value.clone());
                Value::Object(entry)
            })
            .collect(),
    )
}

/// v1 `{"a": {"value": 1, ...}}` → `{"a": 1}`. Values that are not objects
/// (v3 search results) are kept as they are. Anything but an object yields an
/// empty map.
pub fn properties_to_hash(properties: Option<&Value>) -> Map<String, Value> {
    let Some(Value::Object(properties)) = properties else {
        return Map::new();
    };
    properties
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Object(versioned) => versioned.get("value").cloned().unwrap_or(Value::Null),
                flat => flat.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Keep the recognised property fields and normalise `groupName`.
pub fn valid_property_params(params: &Map<String, Value>) -> Map<String, Value> {
    let mut valid: Map<String, Value> = params
        .iter()
        .filter(|(key, _)| PROPERTY_FIELD_NAMES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let group = match valid.get("groupName") {
        Some(Value::String(group)) if !group.trim().is_empty() => Some(
            group
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("_")
                .to_lowercase(),
        ),
        _ => None,
    };
    if let Some(group) = group {
        valid.insert("groupName".to_string(), Value::String(group));
    }
    valid
}

/// True when both definitions agree on every recognised field. Null fields
/// count as absent.
pub fn same(src: &Map<String, Value>, dst: &Map<String, Value>) -> bool {
    let compact = |map: &Map<String, Value>| -> Map<String, Value> {
        valid_property_params(map)
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect()
    };
    compact(src) == compact(dst)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn hash_to_properties_uses_key_name() {
        let props = object(json!({"dealname": "Big", "amount": 10}));
        assert_eq!(
            hash_to_properties(&props, "name"),
            json!([
                {"name": "amount", "value": 10},
                {"name": "dealname", "value": "Big"}
            ])
        );
    }

    #[test]
    fn properties_to_hash_flattens_values() {
        let raw = json!({
            "dealname": {"value": "Big", "timestamp": 1, "source": "API"},
            "amount": {"value": "10"}
        });
        let flat = properties_to_hash(Some(&raw));
        assert_eq!(flat.get("dealname"), Some(&json!("Big")));
        assert_eq!(flat.get("amount"), Some(&json!("10")));
        let v3 = json!({"dealname": "Flat"});
        assert_eq!(properties_to_hash(Some(&v3)).get("dealname"), Some(&json!("Flat")));
        assert!(properties_to_hash(None).is_empty());
    }

    #[test]
    fn invalid_fields_are_dropped_and_group_is_normalised() {
        let params = object(json!({
            "name": "my_prop",
            "groupName": "Ticket  Information",
            "hidden": false
        }));
        let valid = valid_property_params(&params);
        assert_eq!(
            Value::Object(valid),
            json!({"name": "my_prop", "groupName": "ticket_information"})
        );
    }

    #[test]
    fn same_ignores_unrecognised_and_null_fields() {
        let src = object(json!({"name": "p", "label": "P", "hidden": true}));
        let dst = object(json!({"name": "p", "label": "P", "description": null, "createdAt": "x"}));
        assert!(same(&src, &dst));
        let other = object(json!({"name": "p", "label": "Q"}));
        assert!(!same(&src, &other));
    }
}
