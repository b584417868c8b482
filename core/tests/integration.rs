//! Lifecycle tests against the live mock server.
//!
//! Starts the fake HubSpot API on a random port, then drives every resource
//! through a real `Connection` backed by the ureq transport.

use std::net::SocketAddr;

use hubspot_core::{
    ApiError, CallOptions, Config, Connection, Deal, Params, Task, Ticket, TicketAssociations,
    TicketProperties,
};
use serde_json::{json, Map, Value};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
    });
    addr
}

fn connect(config: Config) -> Connection {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
    let addr = start_server();
    Connection::new(config.with_base_url(format!("http://{addr}")))
}

fn props(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn ticket_lifecycle() {
    let conn = connect(Config::new().with_hapikey("demo"));

    let created = Ticket::create(
        &conn,
        &props(json!({"subject": "printer on fire", "hs_pipeline": "0"})),
        &TicketAssociations::default(),
    )
    .unwrap();
    let id = created.id.clone().unwrap();
    assert_eq!(created.properties["subject"], json!("printer on fire"));

    let updated = Ticket::update(&conn, &id, &props(json!({"subject": "printer fixed"}))).unwrap();
    assert_eq!(updated.properties["subject"], json!("printer fixed"));
    assert_eq!(updated.properties["hs_pipeline"], json!("0"));

    let found = Ticket::find(&conn, &id).unwrap();
    assert_eq!(found.id.as_deref(), Some(id.as_str()));
    assert_eq!(found.properties["subject"], json!("printer fixed"));
}

#[test]
fn task_lifecycle_with_bearer_token() {
    let conn = connect(Config::new().with_access_token("pat-na1-test"));

    let task = Task::create(
        &conn,
        &props(json!({"hs_task_subject": "call back", "hs_task_body": "dial it"})),
        Vec::new(),
    )
    .unwrap();
    let id = task.id.clone().unwrap();
    assert_eq!(task.properties["hs_task_status"], json!("NOT_STARTED"));
    assert_eq!(task.properties["hs_body_preview"], json!("dial it"));

    let found = Task::find(&conn, &id, &["hs_task_subject", "hs_task_status"]).unwrap();
    assert_eq!(
        Value::Object(found.properties.clone()),
        json!({"hs_task_subject": "call back", "hs_task_status": "NOT_STARTED"})
    );

    Task::update(&conn, &id, &props(json!({"hs_task_status": "COMPLETED"}))).unwrap();
    let search = props(json!({"filterGroups": [{"filters": [
        {"propertyName": "hs_task_status", "operator": "EQ", "value": "COMPLETED"}
    ]}]}));
    let result = Task::search(&conn, &["hs_task_subject"], &search).unwrap();
    assert_eq!(result["total"], json!(1));
    assert_eq!(result["results"][0]["id"], json!(id));
}

#[test]
fn deal_lifecycle() {
    let conn = connect(Config::new().with_hapikey("demo"));

    let mut deal = Deal::create(
        &conn,
        62515,
        &[8954037],
        &[27136],
        &props(json!({"dealname": "Big", "amount": "10"})),
    )
    .unwrap();
    let id = deal.deal_id.clone().unwrap();
    assert_eq!(deal.portal_id, Some(62515));
    assert_eq!(deal.company_ids, Some(vec![8954037]));
    assert_eq!(deal.get("dealname"), Some(&json!("Big")));

    assert!(Deal::update(&conn, &id, &props(json!({"amount": "20"}))).unwrap());
    assert_eq!(Deal::find(&conn, &id).unwrap().get("amount"), Some(&json!("20")));

    deal.update_properties(&conn, &props(json!({"dealname": "Bigger"})))
        .unwrap();
    assert_eq!(deal.get("dealname"), Some(&json!("Bigger")));

    let page = Deal::all(&conn, &Params::new().with("limit", 10)).unwrap();
    assert_eq!(page.deals.len(), 1);
    assert!(!page.has_more);

    let recent = Deal::recent(&conn, &Params::new().with("count", 5)).unwrap();
    assert_eq!(recent[0].deal_id.as_deref(), Some(id.as_str()));

    deal.destroy(&conn).unwrap();
    assert!(deal.is_destroyed());
    assert!(matches!(Deal::find(&conn, &id), Err(ApiError::NotFound(_))));
    assert!(!Deal::update(&conn, &id, &props(json!({"amount": "30"}))).unwrap());
}

#[test]
fn missing_records_are_not_found() {
    let conn = connect(Config::new().with_hapikey("demo"));

    let err = Ticket::find(&conn, 404404).unwrap_err();
    let ApiError::NotFound(response) = err else {
        panic!("expected NotFound, got {err:?}");
    };
    assert_eq!(response.status, 404);
    assert_eq!(response.json().unwrap()["status"], json!("error"));
}

#[test]
fn suppressed_credentials_are_rejected() {
    let conn = connect(Config::new().with_hapikey("demo"));

    let err = conn
        .get_json(
            "/crm/v3/objects/tickets/:id",
            &Params::new().with("id", 1),
            &CallOptions::new().without_hapikey(),
        )
        .unwrap_err();
    let ApiError::RequestFailed(response) = err else {
        panic!("expected RequestFailed, got {err:?}");
    };
    assert_eq!(response.status, 401);
}

#[test]
fn ticket_property_definitions() {
    let conn = connect(Config::new().with_hapikey("demo"));
    let definition = props(json!({
        "name": "escalation_level",
        "label": "Escalation level",
        "description": "How far up the chain",
        "groupName": "Ticket Information",
        "type": "string",
        "fieldType": "text",
        "hidden": true
    }));

    let created = TicketProperties::create(&conn, &definition).unwrap().unwrap();
    assert_eq!(created["groupName"], json!("ticket_information"));
    assert!(created.get("hidden").is_some_and(|hidden| hidden == &json!(false)));

    let err = TicketProperties::create(&conn, &definition).unwrap_err();
    assert!(matches!(&err, ApiError::RequestFailed(response) if response.status == 409));

    assert!(TicketProperties::create(&conn, &props(json!({"hidden": true})))
        .unwrap()
        .is_none());
}
