//! Ticket property definitions.

use serde_json::{Map, Value};

use crate::connection::{CallOptions, Connection};
use crate::error::Result;
use crate::params::Params;
use crate::properties::{same, valid_property_params};

pub const CREATE_PROPERTY_PATH: &str = "/crm/v3/properties/ticket";

pub struct TicketProperties;

impl TicketProperties {
    /// Create a ticket property from the recognised fields of `params`.
    ///
    /// Returns `Ok(None)` without calling the API when no recognised field is present.
    pub fn create(conn: &Connection, params: &Map<String, Value>) -> Result<Option<Value>> {
        let definition = valid_property_params(params);
        if definition.is_empty() {
            return Ok(None);
        }
        conn.post_json(
            CREATE_PROPERTY_PATH,
            &Params::new(),
            &CallOptions::new().body(Value::Object(definition)),
        )
        .map(Some)
    }

    pub fn same(src: &Map<String, Value>, dst: &Map<String, Value>) -> bool {
        same(src, dst)
    }
}
