//! Request handlers: the generic modulated one and the Adafruit one.

use tracing::debug;

use crate::{
    error::AdapterError,
    modulators::{self, Modulator},
    mqtt::{self, MqttCredentials},
    relay::{self, RelayTarget},
    request::{InboundRequest, AUTHORIZATION},
    routes::TransportKind,
    Adapter, RelayResponse,
};

/// Decode the body, run it through `modulate`, and POST the result to the
/// `url` query parameter with the inbound `Authorization` header.
///
/// A transformation failure ends the request without any outbound call.
pub async fn modulated(
    adapter: &Adapter,
    req: &InboundRequest,
    modulate: Modulator,
) -> Result<RelayResponse, AdapterError> {
    // The decoded map is owned, so the modulator gets its own working copy
    // to pick apart.
    let data = req.decode_body()?;

    let target = RelayTarget {
        url: req.relay_url()?.to_owned(),
        auth_header: AUTHORIZATION,
        auth_value: req.authorization().map(str::to_owned),
    };

    let payload = modulate(req, data)?;
    debug!(?payload, "modulated payload");
    relay::relay_post(adapter.http(), target, payload).await
}

/// Send one payload field to an Adafruit IO feed, over whichever transport
/// this deployment uses.
pub async fn adafruit(
    adapter: &Adapter,
    req: &InboundRequest,
    transport: TransportKind,
) -> Result<RelayResponse, AdapterError> {
    let data = req.decode_body()?;

    match transport {
        TransportKind::Http { auth_header } => {
            let target = RelayTarget {
                url: req.relay_url()?.to_owned(),
                auth_header,
                auth_value: req.authorization().map(str::to_owned),
            };

            let payload = modulators::adafruit(req, &data)?;
            relay::relay_post(adapter.http(), target, payload).await
        }

        TransportKind::Mqtt => {
            let username = req.required_query("username", "'username'")?;
            let feed = match req.query("feed") {
                Some(f) if !f.is_empty() => f,
                _ => req.required_query("field", "'field'")?,
            };
            let password = req
                .authorization()
                .ok_or(AdapterError::MissingCredential(AUTHORIZATION))?;

            let payload = modulators::adafruit(req, &data)?;
            let message = serde_json::to_vec(&payload)?;

            let credentials = MqttCredentials {
                username: username.to_owned(),
                password: password.to_owned(),
            };

            mqtt::relay_publish(adapter.mqtt(), &credentials, feed, &message).await
        }
    }
}
