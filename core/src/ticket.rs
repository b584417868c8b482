//! Tickets API (v3 objects).

use serde_json::{json, Map, Value};

use crate::association::{build_association_param, ObjectType};
use crate::connection::{CallOptions, Connection};
use crate::error::Result;
use crate::params::Params;
use crate::types::Ticket;

pub const TICKETS_PATH: &str = "/crm/v3/objects/tickets";
pub const TICKET_PATH: &str = "/crm/v3/objects/tickets/:ticket_id";

/// Records a new ticket is associated with at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketAssociations {
    pub contact_id: Option<String>,
    pub company_id: Option<String>,
    pub deal_id: Option<String>,
}

impl TicketAssociations {
    pub fn contact(mut self, id: impl ToString) -> Self {
        self.contact_id = Some(id.to_string());
        self
    }

    pub fn company(mut self, id: impl ToString) -> Self {
        self.company_id = Some(id.to_string());
        self
    }

    pub fn deal(mut self, id: impl ToString) -> Self {
        self.deal_id = Some(id.to_string());
        self
    }

    fn params(&self) -> Result<Vec<Value>> {
        [
            (ObjectType::Contact, &self.contact_id),
            (ObjectType::Company, &self.company_id),
            (ObjectType::Deal, &self.deal_id),
        ]
        .into_iter()
        .filter_map(|(to, id)| id.as_deref().filter(|id| !id.is_empty()).map(|id| (to, id)))
        .map(|(to, id)| build_association_param(ObjectType::Ticket, to, id))
        .collect()
    }
}

impl Ticket {
    pub fn create(
        conn: &Connection,
        properties: &Map<String, Value>,
        associations: &TicketAssociations,
    ) -> Result<Ticket> {
        let body = json!({
            "associations": associations.params()?,
            "properties": properties,
        });
        let response = conn.post_json(TICKETS_PATH, &Params::new(), &CallOptions::new().body(body))?;
        Ok(Ticket::from_response(&response))
    }

    pub fn update(
        conn: &Connection,
        ticket_id: impl ToString,
        properties: &Map<String, Value>,
    ) -> Result<Ticket> {
        let params = Params::new().with("ticket_id", ticket_id.to_string());
        let body = json!({ "properties": properties });
        let response = conn.patch_json(TICKET_PATH, &params, &CallOptions::new().body(body))?;
        Ok(Ticket::from_response(&response))
    }

    pub fn find(conn: &Connection, ticket_id: impl ToString) -> Result<Ticket> {
        let params = Params::new().with("ticket_id", ticket_id.to_string());
        let response = conn.get_json(TICKET_PATH, &params, &CallOptions::default())?;
        Ok(Ticket::from_response(&response))
    }
}
