//! Tasks API (v3 engagements).

use serde_json::{json, Map, Value};

use crate::connection::{CallOptions, Connection};
use crate::error::Result;
use crate::params::Params;
use crate::types::Task;

pub const TASKS_PATH: &str = "/crm/v3/objects/tasks";
pub const SEARCH_PATH: &str = "/crm/v3/objects/tasks/search";
pub const TASK_PATH: &str = "/crm/v3/objects/tasks/:task_id";

pub const DEFAULT_TASK_FIELDS: &[&str] = &[
    "hs_timestamp",
    "hs_task_body",
    "hubspot_owner_id",
    "hs_task_subject",
    "hs_task_status",
    "hs_task_priority",
    "hs_task_type",
    "hs_task_reminders",
];

impl Task {
    /// Create a task. Status and type default to `NOT_STARTED` / `TODO`.
    ///
    /// `associations` are entries built with
    /// [`build_association_param`](crate::association::build_association_param).
    pub fn create(
        conn: &Connection,
        properties: &Map<String, Value>,
        associations: Vec<Value>,
    ) -> Result<Task> {
        let mut merged = Map::new();
        merged.insert("hs_task_status".to_string(), json!("NOT_STARTED"));
        merged.insert("hs_task_type".to_string(), json!("TODO"));
        merged.extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));

        let body = json!({ "associations": associations, "properties": merged });
        let response = conn.post_json(TASKS_PATH, &Params::new(), &CallOptions::new().body(body))?;
        Ok(Task::from_response(&response))
    }

    /// Fetch a task with the given properties (see [`DEFAULT_TASK_FIELDS`]).
    pub fn find(conn: &Connection, task_id: impl ToString, properties: &[&str]) -> Result<Task> {
        let params = Params::new()
            .with("task_id", task_id.to_string())
            .with("properties", properties);
        let response = conn.get_json(TASK_PATH, &params, &CallOptions::default())?;
        Ok(Task::from_response(&response))
    }

    /// Raw search response; `body` carries filter groups, sorts, paging.
    pub fn search(conn: &Connection, properties: &[&str], body: &Map<String, Value>) -> Result<Value> {
        let mut request = Map::new();
        request.insert("properties".to_string(), json!(properties));
        request.extend(body.iter().map(|(k, v)| (k.clone(), v.clone())));
        conn.post_json(
            SEARCH_PATH,
            &Params::new(),
            &CallOptions::new().body(Value::Object(request)),
        )
    }

    pub fn update(
        conn: &Connection,
        task_id: impl ToString,
        properties: &Map<String, Value>,
    ) -> Result<Task> {
        let params = Params::new().with("task_id", task_id.to_string());
        let body = json!({ "properties": properties });
        let response = conn.patch_json(TASK_PATH, &params, &CallOptions::new().body(body))?;
        Ok(Task::from_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::{build_association_param, ObjectType};
    use crate::config::Config;
    use crate::testing::RecordingTransport;

    fn connection(transport: &RecordingTransport) -> Connection {
        Connection::with_transport(Config::new().with_access_token("pat"), transport.clone())
    }

    #[test]
    fn create_fills_defaults_and_lets_callers_override() {
        let transport = RecordingTransport::new();
        transport.respond(201, r#"{"id":"64075014222","properties":{"hs_task_status":"WAITING"}}"#);
        let properties = json!({"hs_task_subject": "title of task", "hs_task_status": "WAITING"});
        let associations =
            vec![build_association_param(ObjectType::Task, ObjectType::Deal, 28806796888u64).unwrap()];
        let task = Task::create(
            &connection(&transport),
            properties.as_object().unwrap(),
            associations,
        )
        .unwrap();
        assert_eq!(task.id.as_deref(), Some("64075014222"));

        let body = transport.last_body();
        assert_eq!(body["properties"]["hs_task_status"], json!("WAITING"));
        assert_eq!(body["properties"]["hs_task_type"], json!("TODO"));
        assert_eq!(body["associations"][0]["types"][0]["associationTypeId"], json!(216));
    }

    #[test]
    fn find_requests_each_property() {
        let transport = RecordingTransport::new();
        transport.respond(200, r#"{"id":"1","properties":{}}"#);
        Task::find(&connection(&transport), 1, &["hs_task_subject", "hs_task_status"]).unwrap();
        assert_eq!(
            transport.last_request().url,
            "https://api.hubapi.com/crm/v3/objects/tasks/1\
             ?properties=hs_task_subject&properties=hs_task_status"
        );
    }

    #[test]
    fn search_merges_properties_into_the_body() {
        let transport = RecordingTransport::new();
        transport.respond(200, r#"{"total":0,"results":[]}"#);
        let body = json!({"filterGroups": [{"filters": [
            {"propertyName": "associations.ticket", "operator": "EQ", "value": "16676542642"}
        ]}]});
        let result = Task::search(
            &connection(&transport),
            &["hs_task_subject"],
            body.as_object().unwrap(),
        )
        .unwrap();
        assert_eq!(result["total"], json!(0));
        let sent = transport.last_body();
        assert_eq!(sent["properties"], json!(["hs_task_subject"]));
        assert_eq!(sent["filterGroups"], body["filterGroups"]);
    }
}
