//! HubSpot-defined association types between CRM objects.

use std::fmt;

use serde_json::{json, Value};

use crate::error::{ApiError, Result};

pub const ASSOCIATION_CATEGORY: &str = "HUBSPOT_DEFINED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Contact,
    Company,
    Deal,
    Ticket,
    Task,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectType::Contact => "Contact",
            ObjectType::Company => "Company",
            ObjectType::Deal => "Deal",
            ObjectType::Ticket => "Ticket",
            ObjectType::Task => "Task",
        })
    }
}

/// Association type id for `from` → `to`, if HubSpot defines one.
pub fn definition_id(from: ObjectType, to: ObjectType) -> Option<u32> {
    use ObjectType::*;

    let id = match (from, to) {
        (Contact, Company) => 1,
        (Contact, Deal) => 4,
        (Contact, Ticket) => 15,
        (Company, Contact) => 2,
        (Company, Deal) => 6,
        (Company, Ticket) => 25,
        (Deal, Contact) => 3,
        (Deal, Company) => 5,
        (Deal, Ticket) => 27,
        (Ticket, Contact) => 16,
        (Ticket, Company) => 26,
        (Ticket, Deal) => 28,
        (Task, Contact) => 204,
        (Task, Company) => 192,
        (Task, Deal) => 216,
        (Task, Ticket) => 230,
        _ => return None,
    };
    Some(id)
}

/// The `associations[]` entry used by v3 object creation.
pub fn build_association_param(from: ObjectType, to: ObjectType, id: impl ToString) -> Result<Value> {
    let type_id = definition_id(from, to).ok_or_else(|| ApiError::InvalidParam {
        key: format!("{from}->{to}"),
        reason: "no HubSpot-defined association between these objects",
    })?;
    Ok(json!({
        "to": { "id": id.to_string() },
        "types": [{
            "associationCategory": ASSOCIATION_CATEGORY,
            "associationTypeId": type_id,
        }],
    }))
}
