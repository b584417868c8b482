//! Request dispatch and response classification.
//!
//! # Design
//! `Connection` pairs an immutable [`Config`] with a [`Transport`]. Each
//! call builds an [`HttpRequest`] (`build_request`), executes it, logs the
//! exchange, and classifies the [`HttpResponse`] (`handle_response`). No
//! state survives between calls, so one connection can be cloned into many
//! threads.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Timeouts};
use crate::params::Params;
use crate::transport::{Transport, UreqTransport};
use crate::url::{generate_url, UrlOptions};

pub const FORMS_BASE_URL: &str = "https://forms.hubspot.com";
pub const TRACK_BASE_URL: &str = "https://track.hubspot.com";

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Per-call overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    pub base_url: Option<String>,
    /// `Some(false)` suppresses the `hapikey` query parameter.
    pub hapikey: Option<bool>,
    pub read_timeout: Option<Duration>,
    pub open_timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
    /// JSON payload for POST/PUT/PATCH.
    pub body: Option<Value>,
    /// Return the raw response instead of the decoded body.
    pub no_parse: bool,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn without_hapikey(mut self) -> Self {
        self.hapikey = Some(false);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = Some(timeout);
        self
    }

    pub fn no_parse(mut self) -> Self {
        self.no_parse = true;
        self
    }

    fn url_options(&self) -> UrlOptions {
        UrlOptions {
            base_url: self.base_url.clone(),
            hapikey: self.hapikey,
        }
    }
}

/// Outcome of a successful mutating call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(Value),
    Raw(HttpResponse),
}

impl Reply {
    /// The decoded body; a raw reply is decoded on demand.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Reply::Json(value) => Ok(value),
            Reply::Raw(response) => response.json(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Reply::Json(_) => true,
            Reply::Raw(response) => response.is_success(),
        }
    }
}

/// Synchronous HubSpot connection.
#[derive(Clone)]
pub struct Connection {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connection over the default `ureq` transport.
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }

    pub fn with_transport(config: Config, transport: impl Transport + 'static) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn generate_url(&self, path: &str, params: &Params, options: &UrlOptions) -> Result<String> {
        generate_url(&self.config, path, params, options)
    }

    /// Build the request for `method` without executing it.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
        options: &CallOptions,
    ) -> Result<HttpRequest> {
        let url = self.generate_url(path, params, &options.url_options())?;

        let mut headers = options.headers.clone();
        let body = match method {
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                set_header(&mut headers, "Content-Type", JSON_CONTENT_TYPE);
                let body = options.body.as_ref().unwrap_or(&Value::Null);
                Some(serde_json::to_string(body)?)
            }
            HttpMethod::Get | HttpMethod::Delete => None,
        };
        self.authorize(&mut headers);

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
            timeouts: self.timeouts(options),
        })
    }

    pub fn get_json(&self, path: &str, params: &Params, options: &CallOptions) -> Result<Value> {
        let request = self.build_request(HttpMethod::Get, path, params, options)?;
        handle_response(self.round_trip(&request)?)?.json()
    }

    pub fn post_json(&self, path: &str, params: &Params, options: &CallOptions) -> Result<Value> {
        self.modify(HttpMethod::Post, path, params, options)?.into_json()
    }

    pub fn put_json(&self, path: &str, params: &Params, options: &CallOptions) -> Result<Value> {
        self.modify(HttpMethod::Put, path, params, options)?.into_json()
    }

    pub fn patch_json(&self, path: &str, params: &Params, options: &CallOptions) -> Result<Value> {
        self.modify(HttpMethod::Patch, path, params, options)?.into_json()
    }

    /// POST/PUT/PATCH honouring `options.no_parse`.
    pub fn modify(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
        options: &CallOptions,
    ) -> Result<Reply> {
        let request = self.build_request(method, path, params, options)?;
        let response = handle_response(self.round_trip(&request)?)?;
        if options.no_parse {
            Ok(Reply::Raw(response))
        } else {
            response.json().map(Reply::Json)
        }
    }

    /// DELETE; returns the raw response once it is known to be a success.
    pub fn delete_json(
        &self,
        path: &str,
        params: &Params,
        options: &CallOptions,
    ) -> Result<HttpResponse> {
        let request = self.build_request(HttpMethod::Delete, path, params, options)?;
        handle_response(self.round_trip(&request)?)
    }

    /// Submit a form to the forms host. The response is not classified.
    pub fn submit_form(
        &self,
        path: &str,
        params: &Params,
        form: &impl Serialize,
    ) -> Result<HttpResponse> {
        let options = UrlOptions::default()
            .base_url(FORMS_BASE_URL)
            .without_hapikey();
        let url = self.generate_url(path, params, &options)?;
        let request = HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: vec![("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())],
            body: Some(serde_urlencoded::to_string(form)?),
            timeouts: self.timeouts(&CallOptions::default()),
        };
        self.round_trip(&request)
    }

    /// Fire a tracking event on the tracking host. The response is not classified.
    pub fn trigger_event(
        &self,
        path: &str,
        params: &Params,
        headers: &[(String, String)],
    ) -> Result<HttpResponse> {
        let options = UrlOptions::default()
            .base_url(TRACK_BASE_URL)
            .without_hapikey();
        let url = self.generate_url(path, params, &options)?;
        let request = HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: headers.to_vec(),
            body: None,
            timeouts: self.timeouts(&CallOptions::default()),
        };
        self.round_trip(&request)
    }

    /// POST a custom behavioral event. The response is not classified.
    pub fn trigger_custom_event(
        &self,
        path: &str,
        params: &Params,
        body: &Value,
        headers: &[(String, String)],
    ) -> Result<HttpResponse> {
        let url = self.generate_url(path, params, &UrlOptions::default().with_hapikey())?;
        let mut headers = headers.to_vec();
        set_header(&mut headers, "content-type", JSON_CONTENT_TYPE);
        self.authorize(&mut headers);
        let request = HttpRequest {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(serde_json::to_string(body)?),
            timeouts: self.timeouts(&CallOptions::default()),
        };
        self.round_trip(&request)
    }

    fn authorize(&self, headers: &mut Vec<(String, String)>) {
        if let Some(token) = self.config.access_token() {
            set_header(headers, "Authorization", &format!("Bearer {token}"));
        }
    }

    fn timeouts(&self, options: &CallOptions) -> Timeouts {
        Timeouts {
            read: options.read_timeout.or(self.config.read_timeout),
            open: options.open_timeout.or(self.config.open_timeout),
        }
    }

    fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "sending HubSpot request");
        let response = self.transport.execute(request)?;
        info!(
            method = %request.method,
            url = %request.url,
            body = request.body.as_deref().unwrap_or_default(),
            status = response.status,
            response = %response.body,
            "HubSpot: {}",
            request.url
        );
        Ok(response)
    }
}

/// Pass 2xx through; map 404 to `NotFound` and anything else to `RequestFailed`.
pub fn handle_response(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    if response.is_not_found() {
        return Err(ApiError::NotFound(Box::new(response)));
    }
    Err(ApiError::RequestFailed(Box::new(response)))
}

/// Replace any header with the same (case-insensitive) name, then append.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}
