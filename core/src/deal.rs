//! Deals API: v1 deal records plus v3 search.

use serde_json::{json, Map, Value};

use crate::connection::{CallOptions, Connection};
use crate::error::{ApiError, Result};
use crate::http::HttpMethod;
use crate::params::Params;
use crate::properties::hash_to_properties;
use crate::types::{records, Deal, DealPage, DealSearchPage};

pub const ALL_DEALS_PATH: &str = "/deals/v1/deal/paged";
pub const CREATE_DEAL_PATH: &str = "/deals/v1/deal";
pub const DEAL_PATH: &str = "/deals/v1/deal/:deal_id";
pub const RECENT_UPDATED_PATH: &str = "/deals/v1/deal/recent/modified";
pub const UPDATE_DEAL_PATH: &str = "/deals/v1/deal/:deal_id";
pub const DEAL_SEARCH_PATH: &str = "/crm/v3/objects/deals/search";

const DEFAULT_SEARCH_LIMIT: u32 = 100;

/// Options for [`Deal::find_by_search`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealSearch {
    /// Defaults to 100.
    pub limit: Option<u32>,
    pub after: Option<String>,
    pub properties: Vec<String>,
    pub filters: Vec<Value>,
    /// Defaults to most recently modified first.
    pub sorts: Vec<Value>,
}

impl DealSearch {
    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            "limit".to_string(),
            json!(self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)),
        );
        if let Some(after) = self.after.as_deref().filter(|after| !after.is_empty()) {
            body.insert("after".to_string(), json!(after));
        }
        body.insert("properties".to_string(), json!(self.properties));
        body.insert("filters".to_string(), json!(self.filters));
        let sorts = if self.sorts.is_empty() {
            json!([{ "propertyName": "hs_lastmodifieddate", "direction": "DESCENDING" }])
        } else {
            json!(self.sorts)
        };
        body.insert("sorts".to_string(), sorts);
        Value::Object(body)
    }
}

fn update_body(properties: &Map<String, Value>) -> Value {
    json!({ "properties": hash_to_properties(properties, "name") })
}

impl Deal {
    /// Create a deal associated with the given companies and contacts.
    pub fn create(
        conn: &Connection,
        portal_id: i64,
        company_ids: &[i64],
        vids: &[i64],
        properties: &Map<String, Value>,
    ) -> Result<Deal> {
        let body = json!({
            "portalId": portal_id,
            "associations": {
                "associatedCompanyIds": company_ids,
                "associatedVids": vids,
            },
            "properties": hash_to_properties(properties, "name"),
        });
        let response = conn.post_json(
            CREATE_DEAL_PATH,
            &Params::new(),
            &CallOptions::new().body(body),
        )?;
        Ok(Deal::from_response(&response))
    }

    pub fn find(conn: &Connection, deal_id: impl ToString) -> Result<Deal> {
        let params = Params::new().with("deal_id", deal_id.to_string());
        let response = conn.get_json(DEAL_PATH, &params, &CallOptions::default())?;
        Ok(Deal::from_response(&response))
    }

    /// One page of deals; `options` go to the query (`limit`, `offset`, `properties`, ...).
    pub fn all(conn: &Connection, options: &Params) -> Result<DealPage> {
        let response = conn.get_json(ALL_DEALS_PATH, options, &CallOptions::default())?;
        Ok(DealPage {
            deals: records(&response, "deals", Deal::from_response),
            offset: response.get("offset").and_then(Value::as_i64),
            has_more: response
                .get("hasMore")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    /// Recently modified deals; `options` accepts `count` and `offset`.
    pub fn recent(conn: &Connection, options: &Params) -> Result<Vec<Deal>> {
        let response = conn.get_json(RECENT_UPDATED_PATH, options, &CallOptions::default())?;
        Ok(records(&response, "results", Deal::from_response))
    }

    pub fn find_by_search(conn: &Connection, search: &DealSearch) -> Result<DealSearchPage> {
        let response = conn.post_json(
            DEAL_SEARCH_PATH,
            &Params::new(),
            &CallOptions::new().body(search.body()),
        )?;
        Ok(DealSearchPage {
            after: response
                .pointer("/paging/next/after")
                .and_then(Value::as_str)
                .map(str::to_string),
            deals: records(&response, "results", Deal::from_response),
        })
    }

    /// Update a deal's properties; an error answer from the API yields `false`.
    pub fn update(
        conn: &Connection,
        deal_id: impl ToString,
        properties: &Map<String, Value>,
    ) -> Result<bool> {
        match Deal::update_strict(conn, deal_id, properties) {
            Ok(updated) => Ok(updated),
            Err(err) if err.is_request_error() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Update a deal's properties, surfacing every error.
    pub fn update_strict(
        conn: &Connection,
        deal_id: impl ToString,
        properties: &Map<String, Value>,
    ) -> Result<bool> {
        let params = Params::new().with("deal_id", deal_id.to_string());
        let options = CallOptions::new().body(update_body(properties)).no_parse();
        let reply = conn.modify(HttpMethod::Put, UPDATE_DEAL_PATH, &params, &options)?;
        Ok(reply.is_success())
    }

    fn id_params(&self) -> Result<Params> {
        match self.deal_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => Ok(Params::new().with("deal_id", id)),
            None => Err(ApiError::InvalidParam {
                key: "deal_id".to_string(),
                reason: "deal has no id",
            }),
        }
    }

    /// Archive this deal.
    pub fn destroy(&mut self, conn: &Connection) -> Result<()> {
        let params = self.id_params()?;
        conn.delete_json(DEAL_PATH, &params, &CallOptions::default())?;
        self.destroyed = true;
        Ok(())
    }

    /// Update this deal remotely and merge `properties` into the local copy.
    pub fn update_properties(
        &mut self,
        conn: &Connection,
        properties: &Map<String, Value>,
    ) -> Result<&mut Self> {
        let params = self.id_params()?;
        conn.put_json(
            UPDATE_DEAL_PATH,
            &params,
            &CallOptions::new().body(update_body(properties)),
        )?;
        self.properties
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(self)
    }
}
