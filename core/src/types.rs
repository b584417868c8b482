//! CRM records returned by the resource wrappers.
//!
//! # Design
//! HubSpot mixes v1 and v3 payload shapes, so records are read from
//! `serde_json::Value` leniently instead of through strict derives: a missing
//! field becomes `None` or an empty map rather than an error.

use serde_json::{Map, Value};

use crate::properties::properties_to_hash;

/// A deal as returned by the v1 deals API or the v3 search API.
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub portal_id: Option<i64>,
    pub deal_id: Option<String>,
    pub company_ids: Option<Vec<i64>>,
    pub vids: Option<Vec<i64>>,
    pub properties: Map<String, Value>,
    pub(crate) destroyed: bool,
}

impl Deal {
    pub fn from_response(response: &Value) -> Self {
        let associations = response.get("associations");
        let ids = |key: &str| -> Option<Vec<i64>> {
            associations
                .and_then(|a| a.get(key))
                .and_then(Value::as_array)
                .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        };
        Self {
            portal_id: response.get("portalId").and_then(Value::as_i64),
            deal_id: id_of(response, &["id", "dealId"]),
            company_ids: ids("associatedCompanyIds"),
            vids: ids("associatedVids"),
            properties: properties_to_hash(response.get("properties")),
            destroyed: false,
        }
    }

    /// Property value by name.
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.properties.get(property)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

/// One page of `/deals/v1/deal/paged`.
#[derive(Debug, Clone, PartialEq)]
pub struct DealPage {
    pub deals: Vec<Deal>,
    pub offset: Option<i64>,
    pub has_more: bool,
}

/// One page of deal search results.
#[derive(Debug, Clone, PartialEq)]
pub struct DealSearchPage {
    /// Cursor for the next page, if any.
    pub after: Option<String>,
    pub deals: Vec<Deal>,
}

/// A v3 ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
}

impl Ticket {
    pub fn from_response(response: &Value) -> Self {
        Self {
            id: id_of(response, &["id"]),
            properties: object_of(response.get("properties")),
        }
    }
}

/// A v3 task engagement.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
}

impl Task {
    pub fn from_response(response: &Value) -> Self {
        Self {
            id: id_of(response, &["id"]),
            properties: object_of(response.get("properties")),
        }
    }
}

/// First of `keys` present as a string or number, as a string.
fn id_of(response: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| response.get(*key))
        .find_map(|value| match value {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}

fn object_of(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

/// Records returned in `key` of a list response.
pub(crate) fn records<T>(response: &Value, key: &str, build: impl Fn(&Value) -> T) -> Vec<T> {
    response
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(build).collect())
        .unwrap_or_default()
}
