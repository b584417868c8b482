//! Immutable client configuration.
//!
//! A `Config` is built once and shared by every call made through a
//! [`Connection`](crate::Connection). Reconfiguring means building a new
//! connection.

use std::time::Duration;

use crate::error::{ApiError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

/// Credentials, base URL and default timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub access_token: Option<String>,
    pub hapikey: Option<String>,
    pub portal_id: Option<String>,
    pub base_url: String,
    pub read_timeout: Option<Duration>,
    pub open_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// An empty configuration pointing at the public API host.
    pub fn new() -> Self {
        Self {
            access_token: None,
            hapikey: None,
            portal_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            read_timeout: None,
            open_timeout: None,
        }
    }

    /// Read the configuration from `HUBSPOT_*` environment variables.
    ///
    /// Unset or empty variables leave the field unset. Timeouts are whole
    /// seconds.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let timeout = |name: &'static str| -> Result<Option<Duration>> {
            var(name)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|_| ApiError::InvalidConfig { field: name, value: raw })
                })
                .transpose()
        };

        Ok(Self {
            access_token: var("HUBSPOT_ACCESS_TOKEN"),
            hapikey: var("HUBSPOT_API_KEY"),
            portal_id: var("HUBSPOT_PORTAL_ID"),
            base_url: var("HUBSPOT_BASE_URL")
                .map(|url| normalize_base_url(&url))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            read_timeout: timeout("HUBSPOT_READ_TIMEOUT")?,
            open_timeout: timeout("HUBSPOT_OPEN_TIMEOUT")?,
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_hapikey(mut self, key: impl Into<String>) -> Self {
        self.hapikey = Some(key.into());
        self
    }

    pub fn with_portal_id(mut self, portal_id: impl ToString) -> Self {
        self.portal_id = Some(portal_id.to_string());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&base_url.into());
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = Some(timeout);
        self
    }

    /// The access token, if one is configured and non-empty.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }

    pub fn ensure_hapikey(&self) -> Result<&str> {
        ensure("hapikey", &self.hapikey)
    }

    pub fn ensure_portal_id(&self) -> Result<&str> {
        ensure("portal_id", &self.portal_id)
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn ensure<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::Configuration(field))
}
