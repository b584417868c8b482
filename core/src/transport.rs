//! Blocking HTTP round trip.
//!
//! The connection never talks to the network directly: it hands a finished
//! [`HttpRequest`] to a [`Transport`] and gets an [`HttpResponse`] back.
//! Status codes are returned as data; classifying them is the caller's job.

use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one request and returns the raw response.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a `ureq` agent.
///
/// An agent is configured per request so per-call timeouts apply. HTTP
/// error statuses are returned as responses, not as `Err`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    fn agent(request: &HttpRequest) -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(request.timeouts.open)
            .timeout_recv_response(request.timeouts.read)
            .timeout_recv_body(request.timeouts.read)
            .build()
            .new_agent()
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let agent = Self::agent(request);
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let mut response = match request.method {
            HttpMethod::Get => with_headers(agent.get(url), &request.headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(url), &request.headers).call(),
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                let builder = match request.method {
                    HttpMethod::Post => agent.post(url),
                    HttpMethod::Put => agent.put(url),
                    _ => agent.patch(url),
                };
                let builder = with_headers(builder, &request.headers);
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        }?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
