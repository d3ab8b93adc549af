//! Errors that can terminate a relayed request.
//!
//! Every failure anywhere in a handler collapses into exactly one of these.
//! None of them are retried. At the Lambda boundary they get boxed into
//! `lambda_runtime::Error` and the message is all the caller ever sees.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A required query parameter was absent or empty. `value` is the text
    /// that we got, or `null` if there was nothing at all.
    #[error("Invalid {name} query parameter '{value}'")]
    MissingParameter { name: &'static str, value: String },

    #[error("missing credential: no '{0}' header")]
    MissingCredential(&'static str),

    #[error("Unknown path '{0}'")]
    UnknownRoute(String),

    #[error("upstream responded with status {status}: {body}")]
    UpstreamFailure { status: u16, body: String },

    #[error("MQTT failure: {0}")]
    MqttFailure(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("no response from upstream within {0} ms")]
    Timeout(u64),
}

impl AdapterError {
    /// Build a `MissingParameter` error for a query parameter value that
    /// was absent or unusable.
    pub fn missing_parameter(name: &'static str, value: Option<&str>) -> Self {
        AdapterError::MissingParameter {
            name,
            value: value.unwrap_or("null").to_owned(),
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        AdapterError::MalformedInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_messages() {
        let e = AdapterError::missing_parameter("URL", None);
        assert_eq!(e.to_string(), "Invalid URL query parameter 'null'");

        let e = AdapterError::missing_parameter("'dataname'", Some(""));
        assert_eq!(e.to_string(), "Invalid 'dataname' query parameter ''");
    }

    #[test]
    fn unknown_route_message() {
        let e = AdapterError::UnknownRoute("/unknown".to_owned());
        assert_eq!(e.to_string(), "Unknown path '/unknown'");
    }
}
