//! Relaying to Adafruit IO over MQTT.
//!
//! Each request opens its own broker session, publishes a single message,
//! and closes the session again whether or not the publish worked. The
//! session lifecycle is split into a connector and a session trait so that
//! the "always disconnect" rule can be checked without a broker.

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::{error::AdapterError, RelayResponse};

pub const CREATED_BODY: &str = "{\"created\":true}";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttCredentials {
    pub username: String,
    pub password: String,
}

/// The Adafruit topic naming scheme.
pub fn feed_topic(username: &str, feed: &str) -> String {
    format!("{}/feeds/{}", username, feed)
}

#[async_trait]
pub trait MqttConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &MqttCredentials,
    ) -> Result<Box<dyn MqttSession>, AdapterError>;
}

#[async_trait]
pub trait MqttSession: Send {
    async fn publish(&mut self, topic: &str, message: &[u8]) -> Result<(), AdapterError>;

    /// Close the session. Errors here are only logged; by the time we
    /// disconnect, the outcome of the request is already decided.
    async fn disconnect(self: Box<Self>);
}

/// Connect, publish `message` to the user's feed, and disconnect.
pub async fn relay_publish(
    connector: &dyn MqttConnector,
    credentials: &MqttCredentials,
    feed: &str,
    message: &[u8],
) -> Result<RelayResponse, AdapterError> {
    let mut session = connector.connect(credentials).await?;

    let topic = feed_topic(&credentials.username, feed);
    let published = session.publish(&topic, message).await;
    session.disconnect().await;

    match published {
        Ok(()) => {
            info!(%topic, "published to MQTT feed");
            Ok(RelayResponse::ok(CREATED_BODY.to_owned()))
        }

        Err(e) => {
            warn!(%topic, error = %e, "MQTT publish failed");
            Err(e)
        }
    }
}

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Broker sessions using `rumqttc`.
#[derive(Clone, Debug)]
pub struct RumqttcConnector {
    host: String,
    port: u16,
}

impl RumqttcConnector {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        RumqttcConnector {
            host: host.into(),
            port,
        }
    }

    fn client_id(&self) -> String {
        let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("ttn-post-adapter-{}-{}", std::process::id(), n)
    }
}

#[async_trait]
impl MqttConnector for RumqttcConnector {
    async fn connect(
        &self,
        credentials: &MqttCredentials,
    ) -> Result<Box<dyn MqttSession>, AdapterError> {
        let mut options = MqttOptions::new(self.client_id(), self.host.clone(), self.port);
        options.set_credentials(credentials.username.clone(), credentials.password.clone());
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        // The event loop only connects once it is polled; drive it until we
        // hear back from the broker. On failure, dropping the event loop
        // closes the socket.
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(AdapterError::MqttFailure(format!(
                            "broker refused connection: {:?}",
                            ack.code
                        )));
                    }

                    debug!(host = %self.host, "connected to MQTT broker");
                    break;
                }

                Ok(_) => continue,

                Err(e) => return Err(AdapterError::MqttFailure(e.to_string())),
            }
        }

        Ok(Box::new(RumqttcSession { client, eventloop }))
    }
}

struct RumqttcSession {
    client: AsyncClient,
    eventloop: EventLoop,
}

#[async_trait]
impl MqttSession for RumqttcSession {
    async fn publish(&mut self, topic: &str, message: &[u8]) -> Result<(), AdapterError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, message.to_vec())
            .await
            .map_err(|e| AdapterError::MqttFailure(e.to_string()))?;

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::PubAck(_))) => return Ok(()),
                Ok(_) => continue,
                Err(e) => return Err(AdapterError::MqttFailure(e.to_string())),
            }
        }
    }

    async fn disconnect(self: Box<Self>) {
        let RumqttcSession {
            client,
            mut eventloop,
        } = *self;

        if let Err(e) = client.disconnect().await {
            debug!(error = %e, "could not queue MQTT disconnect");
            return;
        }

        // Flush the DISCONNECT packet out before we drop the connection.
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    }
}
