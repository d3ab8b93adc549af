//! Relaying a transformed payload over HTTP.
//!
//! The actual network call goes through the `HttpTransport` trait so that
//! tests can substitute a fake. The status policy lives here, not in the
//! transport: anything outside 2xx is a failure, even if the body happens
//! to be JSON.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{error::AdapterError, RelayResponse};

pub const ACCEPT: &str = "application/json, text/plain, */*";
pub const CONTENT_TYPE: &str = "application/json";

/// Where a payload goes, and which credential goes with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayTarget {
    pub url: String,
    pub auth_header: &'static str,
    pub auth_value: Option<String>,
}

/// One fully-built outbound POST.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundPost {
    pub url: String,

    /// Header name/value pairs. A `None` value means that the header was
    /// requested but we have nothing to put in it.
    pub headers: Vec<(String, Option<String>)>,

    pub body: String,
}

impl OutboundPost {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_deref())
    }
}

/// What came back from the upstream, before any status policy is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, post: OutboundPost) -> Result<TransportResponse, AdapterError>;
}

/// The production transport.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, post: OutboundPost) -> Result<TransportResponse, AdapterError> {
        let mut builder = self.client.post(&post.url).body(post.body);

        for (name, value) in &post.headers {
            // reqwest can't send a header without a value, so a missing
            // credential just means no header.
            if let Some(value) = value {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| AdapterError::TransportFailure(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| AdapterError::TransportFailure(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

/// POST `payload` to `target` and apply the status policy to the result.
pub async fn relay_post(
    transport: &dyn HttpTransport,
    target: RelayTarget,
    payload: Value,
) -> Result<RelayResponse, AdapterError> {
    let post = OutboundPost {
        url: target.url,
        headers: vec![
            ("Accept".to_owned(), Some(ACCEPT.to_owned())),
            ("Content-Type".to_owned(), Some(CONTENT_TYPE.to_owned())),
            (target.auth_header.to_owned(), target.auth_value),
        ],
        body: serde_json::to_string(&payload)?,
    };

    debug!(url = %post.url, body = %post.body, "relaying POST");
    let resp = transport.post(post).await?;

    if !(200..300).contains(&resp.status) {
        warn!(status = resp.status, body = %resp.body, "upstream rejected relayed payload");
        return Err(AdapterError::UpstreamFailure {
            status: resp.status,
            body: resp.body,
        });
    }

    let parsed: Value = serde_json::from_str(&resp.body).map_err(|_| {
        AdapterError::UpstreamFailure {
            status: resp.status,
            body: resp.body.clone(),
        }
    })?;

    Ok(RelayResponse::ok(serde_json::to_string(&parsed)?))
}
