//! The inbound event as this adapter sees it.
//!
//! The "bare" and "oneshot" executables get this straight out of the JSON
//! event, which has the same field names as an API Gateway proxy event. The
//! "proxy event" executable builds one from a `lambda_http::Request`.
//!
//! API Gateway hands us `null` instead of an empty map when there are no
//! query parameters or headers, and individual values can be `null` too, so
//! everything is optional and accessors treat `null` as missing.

use lambda_http::{Body, Request, RequestExt};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::AdapterError;

pub const AUTHORIZATION: &str = "Authorization";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    pub path: String,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, Option<String>>>,

    #[serde(default)]
    pub headers: Option<HashMap<String, Option<String>>>,
}

impl InboundRequest {
    pub fn new<S: Into<String>>(path: S) -> Self {
        InboundRequest {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), Some(value.into()));
        self
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), Some(value.into()));
        self
    }

    /// Get a query parameter. Absent maps, absent keys, and `null` values
    /// all come back as `None`.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()?
            .get(name)?
            .as_deref()
    }

    /// Get a query parameter that must be present and non-empty.
    pub fn required_query(&self, name: &str, label: &'static str) -> Result<&str, AdapterError> {
        match self.query(name) {
            Some(v) if !v.is_empty() => Ok(v),
            other => Err(AdapterError::missing_parameter(label, other)),
        }
    }

    /// Get a header value. Names are case-sensitive, as in the raw event;
    /// proxy requests get their names canonicalized on the way in.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref()?.get(name)?.as_deref()
    }

    /// The inbound credential, passed along verbatim and never checked.
    pub fn authorization(&self) -> Option<&str> {
        self.header(AUTHORIZATION)
    }

    /// The relay target URL, which every HTTP relay needs.
    pub fn relay_url(&self) -> Result<&str, AdapterError> {
        self.required_query("url", "URL")
    }

    /// Parse the body into a JSON object.
    pub fn decode_body(&self) -> Result<Map<String, Value>, AdapterError> {
        let text = self
            .body
            .as_deref()
            .ok_or_else(|| AdapterError::MalformedInput("request has no body".to_owned()))?;

        match serde_json::from_str(text)? {
            Value::Object(map) => Ok(map),
            other => Err(AdapterError::MalformedInput(format!(
                "expected a JSON object body, got `{}`",
                other
            ))),
        }
    }
}

/// `http` hands us lowercased header names; turn `x-aio-key` back into
/// `X-Aio-Key` so that lookups match the raw event's spelling.
fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl TryFrom<&Request> for InboundRequest {
    type Error = AdapterError;

    fn try_from(req: &Request) -> Result<Self, Self::Error> {
        let body = match req.body() {
            Body::Empty => None,
            Body::Text(t) => Some(t.clone()),
            Body::Binary(b) => Some(String::from_utf8(b.clone()).map_err(|_| {
                AdapterError::MalformedInput("request body is not UTF-8".to_owned())
            })?),
        };

        let query: HashMap<String, Option<String>> = req
            .query_string_parameters()
            .iter()
            .map(|(k, v)| (k.to_owned(), Some(v.to_owned())))
            .collect();

        let headers: HashMap<String, Option<String>> = req
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    canonical_header_name(k.as_str()),
                    v.to_str().ok().map(str::to_owned),
                )
            })
            .collect();

        Ok(InboundRequest {
            path: req.raw_http_path().to_owned(),
            body,
            query_string_parameters: Some(query),
            headers: Some(headers),
        })
    }
}
