//! A Lambda-hosted adapter that relays The Things Network uplinks
//!
//! TTN's HTTP integration POSTs its uplink messages as-is, but the services
//! that we want to feed (OpenSensors, SlicingDice, Pyroclast, Adafruit IO)
//! each want their own JSON shape, and their own way of passing a
//! credential. This crate reshapes the uplink for the destination named by
//! the request path and relays it onwards.
//!
//! This common codebase is compiled into three executables:
//! `ttn-post-adapter-proxyevent` for the cloud deployment behind API Gateway,
//! `ttn-post-adapter-bare`, which takes the raw event JSON and is useful for
//! local testing, and `ttn-post-adapter-oneshot`, which handles a single
//! event given on the command line.
//!
//! Nothing is retried. Each request gets exactly one shot at the upstream,
//! bounded by the configured timeout.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod handler;
pub mod modulators;
pub mod mqtt;
pub mod relay;
pub mod request;
pub mod routes;

pub use config::Config;
pub use error::AdapterError;
pub use request::InboundRequest;

use crate::{
    mqtt::{MqttConnector, RumqttcConnector},
    relay::{HttpTransport, ReqwestTransport},
    routes::HandlerKind,
};

/// The result of a successful relay, in the shape Lambda callers expect.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub status_code: u16,

    /// JSON text.
    pub body: String,
}

impl RelayResponse {
    pub fn ok(body: String) -> Self {
        RelayResponse {
            status_code: 200,
            body,
        }
    }
}

/// Set up logging. We don't print the module name, or the time (CloudWatch
/// has it). `rumqttc` logs through `log`, so bridge that too.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    tracing_log::LogTracer::init()?;
    Ok(())
}

pub struct Adapter {
    config: Config,
    http: Arc<dyn HttpTransport>,
    mqtt: Arc<dyn MqttConnector>,
}

impl Adapter {
    /// Create the adapter for a Lambda deployment: logging, configuration
    /// from the environment, and the real network transports.
    pub async fn init() -> anyhow::Result<Self> {
        init_tracing()?;

        let config = Config::from_env()?;
        info!(?config, "starting TTN post adapter");

        let http = Arc::new(ReqwestTransport::new(reqwest::Client::new()));
        let mqtt = Arc::new(RumqttcConnector::new(
            config.mqtt_host.clone(),
            config.mqtt_port,
        ));

        Ok(Adapter::new(config, http, mqtt))
    }

    /// Create an adapter with explicit transports.
    pub fn new(
        config: Config,
        http: Arc<dyn HttpTransport>,
        mqtt: Arc<dyn MqttConnector>,
    ) -> Self {
        Adapter { config, http, mqtt }
    }

    pub fn http(&self) -> &dyn HttpTransport {
        self.http.as_ref()
    }

    pub fn mqtt(&self) -> &dyn MqttConnector {
        self.mqtt.as_ref()
    }

    /// Handle one inbound event.
    ///
    /// The path picks the destination; that's the only thing we look at
    /// before handing off. The handler runs under the request timeout, so a
    /// hung upstream can't hold the invocation until Lambda kills it.
    pub async fn dispatch(&self, req: InboundRequest) -> Result<RelayResponse, AdapterError> {
        debug!(?req, "inbound event");

        let route = match routes::lookup(&req.path) {
            Some(r) => r,
            None => {
                warn!(path = %req.path, "no handler for path");
                return Err(AdapterError::UnknownRoute(req.path));
            }
        };

        let transport = route.transport(&self.config);
        info!(path = %req.path, route = route.name, ?transport, "dispatching");

        let work = async {
            match route.handler {
                HandlerKind::Modulated(modulate) => {
                    handler::modulated(self, &req, modulate).await
                }
                HandlerKind::Adafruit => handler::adafruit(self, &req, transport).await,
            }
        };

        let result = match tokio::time::timeout(self.config.timeout(), work).await {
            Ok(r) => r,
            Err(_) => Err(AdapterError::Timeout(self.config.timeout_ms)),
        };

        if let Err(e) = &result {
            warn!(route = route.name, error = %e, "request failed");
        }

        result
    }
}
