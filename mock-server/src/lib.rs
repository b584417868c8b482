//! In-memory fake of the HubSpot endpoints the client core talks to.
//!
//! Covers v3 CRM objects (create/get/patch/search), ticket property
//! definitions and the v1 deals API. Every route requires either a `hapikey`
//! query parameter or a bearer token.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const PORTAL_ID: i64 = 62515;

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    next_change: u64,
    objects: HashMap<String, BTreeMap<u64, Value>>,
    properties: HashMap<String, BTreeMap<String, Value>>,
    deals: BTreeMap<u64, StoredDeal>,
}

#[derive(Debug, Clone)]
struct StoredDeal {
    deal: Value,
    changed: u64,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn touch(&mut self) -> u64 {
        self.next_change += 1;
        self.next_change
    }
}

pub type Db = Arc<RwLock<Store>>;

type ApiResult = Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/crm/v3/objects/{object_type}", post(create_object))
        .route("/crm/v3/objects/{object_type}/search", post(search_objects))
        .route(
            "/crm/v3/objects/{object_type}/{id}",
            get(get_object).patch(update_object),
        )
        .route("/crm/v3/properties/{object_type}", post(create_property))
        .route("/deals/v1/deal", post(create_deal))
        .route("/deals/v1/deal/paged", get(list_deals))
        .route("/deals/v1/deal/recent/modified", get(recent_deals))
        .route(
            "/deals/v1/deal/{deal_id}",
            get(get_deal).put(update_deal).delete(delete_deal),
        )
        .layer(middleware::from_fn(require_auth))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "status": "error", "message": message.into() })),
    )
}

fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .and_then(|query| serde_urlencoded::from_str(query).ok())
        .unwrap_or_default()
}

async fn require_auth(request: Request, next: Next) -> Response {
    let has_key = query_pairs(request.uri().query())
        .iter()
        .any(|(key, value)| key == "hapikey" && !value.is_empty());
    let has_token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer ") && value.len() > "Bearer ".len());
    if has_key || has_token {
        next.run(request).await
    } else {
        error(StatusCode::UNAUTHORIZED, "missing credentials").into_response()
    }
}

/// Requested property names, from repeated or comma-separated `properties`.
fn requested_properties(query: Option<&str>) -> Option<Vec<String>> {
    let names: Vec<String> = query_pairs(query)
        .into_iter()
        .filter(|(key, _)| key == "properties")
        .flat_map(|(_, value)| {
            value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    (!names.is_empty()).then_some(names)
}

fn select_properties(object: &Value, names: Option<&[String]>) -> Value {
    let Some(names) = names else {
        return object.clone();
    };
    let mut selected = object.clone();
    if let Some(Value::Object(properties)) = selected.get_mut("properties") {
        properties.retain(|key, _| names.iter().any(|name| name == key));
    }
    selected
}

// --- v3 objects ---

#[derive(Deserialize)]
struct ObjectInput {
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    associations: Vec<Value>,
}

async fn create_object(
    State(db): State<Db>,
    Path(object_type): Path<String>,
    Json(input): Json<ObjectInput>,
) -> ApiResult {
    let mut store = db.write().await;
    let id = store.next_id();
    let mut properties = input.properties;
    properties.insert("hs_object_id".to_string(), json!(id.to_string()));
    if let Some(body) = properties.get("hs_task_body").cloned() {
        properties.insert("hs_body_preview".to_string(), body);
    }
    let object = json!({
        "id": id.to_string(),
        "properties": properties,
        "associations": input.associations,
        "archived": false,
    });
    store
        .objects
        .entry(object_type)
        .or_default()
        .insert(id, object.clone());
    Ok((StatusCode::CREATED, Json(object)))
}

fn parse_id(raw: &str) -> Result<u64, (StatusCode, Json<Value>)> {
    raw.parse()
        .map_err(|_| error(StatusCode::NOT_FOUND, format!("object {raw} does not exist")))
}

async fn get_object(
    State(db): State<Db>,
    Path((object_type, id)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> ApiResult {
    let id = parse_id(&id)?;
    let store = db.read().await;
    let object = store
        .objects
        .get(&object_type)
        .and_then(|objects| objects.get(&id))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("object {id} does not exist")))?;
    let names = requested_properties(query.as_deref());
    Ok((StatusCode::OK, Json(select_properties(object, names.as_deref()))))
}

async fn update_object(
    State(db): State<Db>,
    Path((object_type, id)): Path<(String, String)>,
    Json(input): Json<ObjectInput>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let mut store = db.write().await;
    let object = store
        .objects
        .get_mut(&object_type)
        .and_then(|objects| objects.get_mut(&id))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("object {id} does not exist")))?;
    if let Some(Value::Object(properties)) = object.get_mut("properties") {
        properties.extend(input.properties);
    }
    Ok((StatusCode::OK, Json(object.clone())))
}

#[derive(Deserialize)]
struct SearchInput {
    #[serde(default)]
    properties: Vec<String>,
    #[serde(default, rename = "filterGroups")]
    filter_groups: Vec<FilterGroup>,
}

#[derive(Deserialize)]
struct FilterGroup {
    #[serde(default)]
    filters: Vec<Filter>,
}

#[derive(Deserialize)]
struct Filter {
    #[serde(rename = "propertyName")]
    property_name: String,
    operator: String,
    #[serde(default)]
    value: Value,
}

impl Filter {
    fn matches(&self, object: &Value) -> bool {
        let actual = object
            .get("properties")
            .and_then(|properties| properties.get(&self.property_name));
        match (self.operator.as_str(), actual) {
            ("EQ", Some(actual)) => value_text(actual) == value_text(&self.value),
            ("NEQ", actual) => actual.map(value_text) != Some(value_text(&self.value)),
            ("HAS_PROPERTY", actual) => actual.is_some_and(|value| !value.is_null()),
            _ => false,
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

async fn search_objects(
    State(db): State<Db>,
    Path(object_type): Path<String>,
    Json(input): Json<SearchInput>,
) -> ApiResult {
    let store = db.read().await;
    let names = (!input.properties.is_empty()).then_some(input.properties.as_slice());
    let results: Vec<Value> = store
        .objects
        .get(&object_type)
        .into_iter()
        .flat_map(|objects| objects.values())
        .filter(|object| {
            input.filter_groups.is_empty()
                || input
                    .filter_groups
                    .iter()
                    .any(|group| group.filters.iter().all(|filter| filter.matches(object)))
        })
        .map(|object| select_properties(object, names))
        .collect();
    Ok((
        StatusCode::OK,
        Json(json!({ "total": results.len(), "results": results })),
    ))
}

// --- property definitions ---

const REQUIRED_PROPERTY_FIELDS: [&str; 5] = ["name", "label", "type", "fieldType", "groupName"];

async fn create_property(
    State(db): State<Db>,
    Path(object_type): Path<String>,
    Json(definition): Json<Map<String, Value>>,
) -> ApiResult {
    if let Some(missing) = REQUIRED_PROPERTY_FIELDS
        .iter()
        .copied()
        .find(|field| definition.get(*field).map_or(true, Value::is_null))
    {
        return Err(error(
            StatusCode::BAD_REQUEST,
            format!("property definition is missing `{missing}`"),
        ));
    }
    let name = value_text(&definition["name"]);
    let mut store = db.write().await;
    let properties = store.properties.entry(object_type).or_default();
    if properties.contains_key(&name) {
        return Err(error(
            StatusCode::CONFLICT,
            format!("property {name} already exists"),
        ));
    }
    let mut created = definition;
    created.entry("options").or_insert_with(|| json!([]));
    created.insert("hidden".to_string(), json!(false));
    let created = Value::Object(created);
    properties.insert(name, created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

// --- v1 deals ---

#[derive(Deserialize)]
struct DealInput {
    #[serde(default, rename = "portalId")]
    portal_id: Option<i64>,
    #[serde(default)]
    associations: Option<Value>,
    #[serde(default)]
    properties: Vec<NamedValue>,
}

#[derive(Deserialize)]
struct NamedValue {
    name: String,
    value: Value,
}

fn versioned(properties: Vec<NamedValue>, into: &mut Map<String, Value>) {
    for NamedValue { name, value } in properties {
        into.insert(
            name,
            json!({ "value": value, "timestamp": 0, "source": "API" }),
        );
    }
}

async fn create_deal(State(db): State<Db>, Json(input): Json<DealInput>) -> ApiResult {
    let mut store = db.write().await;
    let id = store.next_id();
    let changed = store.touch();
    let mut properties = Map::new();
    versioned(input.properties, &mut properties);
    let deal = json!({
        "portalId": input.portal_id.unwrap_or(PORTAL_ID),
        "dealId": id,
        "isDeleted": false,
        "associations": input.associations.unwrap_or_else(|| json!({
            "associatedCompanyIds": [],
            "associatedVids": [],
        })),
        "properties": properties,
    });
    store.deals.insert(
        id,
        StoredDeal {
            deal: deal.clone(),
            changed,
        },
    );
    Ok((StatusCode::OK, Json(deal)))
}

fn deal_id(raw: &str) -> Result<u64, (StatusCode, Json<Value>)> {
    raw.parse()
        .map_err(|_| error(StatusCode::NOT_FOUND, format!("deal {raw} does not exist")))
}

async fn get_deal(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    let id = deal_id(&id)?;
    let store = db.read().await;
    store
        .deals
        .get(&id)
        .map(|stored| (StatusCode::OK, Json(stored.deal.clone())))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("deal {id} does not exist")))
}

async fn update_deal(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<DealInput>,
) -> ApiResult {
    let id = deal_id(&id)?;
    let mut store = db.write().await;
    if !store.deals.contains_key(&id) {
        return Err(error(StatusCode::NOT_FOUND, format!("deal {id} does not exist")));
    }
    let changed = store.touch();
    let stored = store
        .deals
        .get_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("deal {id} does not exist")))?;
    stored.changed = changed;
    if let Some(Value::Object(properties)) = stored.deal.get_mut("properties") {
        versioned(input.properties, properties);
    }
    Ok((StatusCode::OK, Json(stored.deal.clone())))
}

async fn delete_deal(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let id = deal_id(&id)?;
    let mut store = db.write().await;
    store
        .deals
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("deal {id} does not exist")))
}

struct PageQuery {
    limit: Option<usize>,
    count: Option<usize>,
    offset: Option<usize>,
}

impl PageQuery {
    fn parse(query: Option<&str>) -> Self {
        let pairs = query_pairs(query);
        let number = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .and_then(|(_, value)| value.parse().ok())
        };
        Self {
            limit: number("limit"),
            count: number("count"),
            offset: number("offset"),
        }
    }
}

fn page(deals: Vec<Value>, size: usize, offset: usize) -> (Vec<Value>, bool, usize) {
    let total = deals.len();
    let items: Vec<Value> = deals.into_iter().skip(offset).take(size).collect();
    let next = offset + items.len();
    (items, next < total, next)
}

async fn list_deals(State(db): State<Db>, RawQuery(query): RawQuery) -> ApiResult {
    let query = PageQuery::parse(query.as_deref());
    let store = db.read().await;
    let deals = store.deals.values().map(|stored| stored.deal.clone()).collect();
    let (deals, has_more, offset) = page(
        deals,
        query.limit.unwrap_or(100),
        query.offset.unwrap_or(0),
    );
    Ok((
        StatusCode::OK,
        Json(json!({ "deals": deals, "hasMore": has_more, "offset": offset })),
    ))
}

async fn recent_deals(State(db): State<Db>, RawQuery(query): RawQuery) -> ApiResult {
    let query = PageQuery::parse(query.as_deref());
    let store = db.read().await;
    let mut stored: Vec<&StoredDeal> = store.deals.values().collect();
    stored.sort_by(|a, b| b.changed.cmp(&a.changed));
    let total = stored.len();
    let deals = stored.into_iter().map(|stored| stored.deal.clone()).collect();
    let (results, has_more, offset) = page(
        deals,
        query.count.unwrap_or(20),
        query.offset.unwrap_or(0),
    );
    Ok((
        StatusCode::OK,
        Json(json!({
            "results": results,
            "hasMore": has_more,
            "offset": offset,
            "total": total,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_and_comma_separated_properties_are_both_read() {
        assert_eq!(
            requested_properties(Some("properties=a&properties=b,c&hapikey=x")),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(requested_properties(Some("hapikey=x")), None);
        assert_eq!(requested_properties(None), None);
    }

    #[test]
    fn select_properties_keeps_requested_names() {
        let object = json!({"id": "1", "properties": {"a": 1, "b": 2}});
        let names = vec!["b".to_string()];
        assert_eq!(
            select_properties(&object, Some(names.as_slice())),
            json!({"id": "1", "properties": {"b": 2}})
        );
        assert_eq!(select_properties(&object, None), object);
    }

    #[test]
    fn filters_compare_text_forms() {
        let object = json!({"properties": {"hs_pipeline": "0", "priority": 3}});
        let filter = |name: &str, operator: &str, value: Value| Filter {
            property_name: name.to_string(),
            operator: operator.to_string(),
            value,
        };
        assert!(filter("hs_pipeline", "EQ", json!("0")).matches(&object));
        assert!(filter("priority", "EQ", json!("3")).matches(&object));
        assert!(filter("priority", "NEQ", json!("4")).matches(&object));
        assert!(!filter("missing", "HAS_PROPERTY", Value::Null).matches(&object));
    }

    #[test]
    fn paging_reports_more_results() {
        let deals = (0..5).map(|n| json!(n)).collect();
        let (items, has_more, offset) = page(deals, 2, 2);
        assert_eq!(items, vec![json!(2), json!(3)]);
        assert!(has_more);
        assert_eq!(offset, 4);
    }
}
