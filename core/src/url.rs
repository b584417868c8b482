//! URL generation: placeholder interpolation and query serialization.
//!
//! # Design
//! `generate_url` works on private copies of the path and parameters. Path
//! placeholders (`:name`) consume their parameter; whatever is left is
//! serialized through [`QueryRule`], an ordered table keyed on the parameter
//! name.

use std::collections::HashSet;
use std::sync::LazyLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::params::{ParamValue, Params};

/// Characters kept verbatim by [`escape`]; everything else is percent-encoded.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b' ');

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(?<name>[^/?&#.:=]+)").expect("a valid regex"));

/// Per-call URL overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOptions {
    /// Replaces the configured base URL.
    pub base_url: Option<String>,
    /// `Some(false)` suppresses the `hapikey` query parameter.
    pub hapikey: Option<bool>,
}

impl UrlOptions {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn without_hapikey(mut self) -> Self {
        self.hapikey = Some(false);
        self
    }

    pub fn with_hapikey(mut self) -> Self {
        self.hapikey = Some(true);
        self
    }
}

/// Build the absolute URL for `path` with `params`.
///
/// Neither `path` nor `params` is modified.
pub fn generate_url(
    config: &Config,
    path: &str,
    params: &Params,
    options: &UrlOptions,
) -> Result<String> {
    let mut with_hapikey = options.hapikey != Some(false);
    if config.access_token().is_some() {
        with_hapikey = false;
    } else {
        config.ensure_hapikey()?;
    }

    let mut path = path.to_string();
    let mut params = params.clone();
    let base_url = options
        .base_url
        .as_deref()
        .unwrap_or(&config.base_url)
        .trim_end_matches('/');

    if with_hapikey {
        params.insert("hapikey", config.ensure_hapikey()?);
    }

    if path.contains(":portal_id") {
        params.insert("portal_id", config.ensure_portal_id()?);
    }

    path = interpolate(&path, &mut params);
    if path.contains(':') {
        return Err(ApiError::MissingInterpolation { path });
    }

    let query = params
        .iter()
        .map(|(key, value)| match value {
            ParamValue::List(values) => values
                .iter()
                .map(|value| param_string(key, value))
                .collect::<Result<Vec<_>>>()
                .map(|pairs| pairs.join("&")),
            value => param_string(key, value),
        })
        .collect::<Result<Vec<_>>>()?
        .join("&");

    let mut url = String::with_capacity(base_url.len() + path.len() + query.len() + 1);
    url.push_str(base_url);
    url.push_str(&path);
    if !query.is_empty() {
        url.push(if path.contains('?') { '&' } else { '?' });
        url.push_str(&query);
    }
    Ok(url)
}

/// Substitute every `:key` placeholder that has a matching parameter and drop
/// the consumed parameters. A name runs up to the next `/ ? & # . : =`.
fn interpolate(path: &str, params: &mut Params) -> String {
    let names: HashSet<&str> = PLACEHOLDER
        .captures_iter(path)
        .filter_map(|caps| caps.name("name"))
        .map(|name| name.as_str())
        .collect();

    let consumed: Vec<String> = params
        .keys()
        .filter(|key| names.contains(key))
        .map(str::to_string)
        .collect();

    let mut resolved = path.to_string();
    for key in consumed {
        let Some(value) = params.remove(&key) else {
            continue;
        };
        let escaped = escape(&value.to_string());
        resolved = PLACEHOLDER
            .replace_all(&resolved, |caps: &regex::Captures<'_>| {
                if &caps["name"] == key {
                    escaped.clone()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }
    resolved
}

/// Query key rules, evaluated top to bottom; the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRule {
    /// Key contains `range`: value must be a range, emitted as two pairs.
    Range,
    /// Key is `batch_<field>`: emitted under `<field>` in camelCase.
    Batch,
    /// Everything else: `key=value`.
    Plain,
}

impl QueryRule {
    pub const ORDER: [QueryRule; 3] = [QueryRule::Range, QueryRule::Batch, QueryRule::Plain];

    pub fn for_key(key: &str) -> QueryRule {
        Self::ORDER
            .into_iter()
            .find(|rule| rule.matches(key))
            .unwrap_or(QueryRule::Plain)
    }

    fn matches(self, key: &str) -> bool {
        match self {
            QueryRule::Range => key.contains("range"),
            QueryRule::Batch => key.starts_with("batch_"),
            QueryRule::Plain => true,
        }
    }

    /// Render one `key=value` segment for a single (non-sequence) value.
    pub fn encode(self, key: &str, value: &ParamValue) -> Result<String> {
        match self {
            QueryRule::Range => {
                let ParamValue::Range(begin, end) = value else {
                    return Err(ApiError::InvalidParam {
                        key: key.to_string(),
                        reason: "value must be a range",
                    });
                };
                Ok(format!(
                    "{key}={}&{key}={}",
                    converted_value(begin),
                    converted_value(end)
                ))
            }
            QueryRule::Batch => {
                let field = camelize(&key["batch_".len()..]);
                Ok(format!("{field}={}", converted_value(value)))
            }
            QueryRule::Plain => Ok(format!("{key}={}", converted_value(value))),
        }
    }
}

fn param_string(key: &str, value: &ParamValue) -> Result<String> {
    QueryRule::for_key(key).encode(key, value)
}

/// Timestamps become epoch milliseconds at whole-second precision; anything
/// else is escaped from its string form.
pub fn converted_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Time(time) => (time.timestamp() * 1000).to_string(),
        other => escape(&other.to_string()),
    }
}

/// Form-style escaping: spaces become `+`, `A-Za-z0-9_.-~` stay as is.
pub fn escape(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ESCAPE)
        .to_string()
        .replace(' ', "+")
}

/// `list_id` → `listId`: every `_` followed by a character is replaced by
/// that character upper-cased.
fn camelize(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(ch) = chars.next() {
        if ch == '_' {
            match chars.next() {
                Some(next) => out.extend(next.to_uppercase()),
                None => out.push('_'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
