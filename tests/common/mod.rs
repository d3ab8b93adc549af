//! Fake transports shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use ttn_post_adapter::{
    config::Config,
    mqtt::{MqttConnector, MqttCredentials, MqttSession},
    relay::{HttpTransport, OutboundPost, TransportResponse},
    Adapter, AdapterError, InboundRequest,
};

pub const TIME: &str = "2017-06-14T16:15:41.169291958Z";

pub fn post_data() -> Value {
    json!({
        "hardware_serial": "THE_DEVICE_EUI",
        "metadata": {"time": TIME},
        "payload_fields": {"temperature": 26.5}
    })
}

pub fn event(path: &str) -> InboundRequest {
    InboundRequest::new(path).with_body(post_data().to_string())
}

/// An HTTP transport that records every POST and answers with a canned
/// response, optionally after a delay.
pub struct FakeHttp {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
    pub seen: Mutex<Vec<OutboundPost>>,
}

impl FakeHttp {
    pub fn ok() -> Arc<Self> {
        Self::with_response(200, "{\"valid\":true}")
    }

    pub fn with_response(status: u16, body: &str) -> Arc<Self> {
        Arc::new(FakeHttp {
            status,
            body: body.to_owned(),
            delay: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn hanging() -> Arc<Self> {
        Arc::new(FakeHttp {
            status: 200,
            body: "{}".to_owned(),
            delay: Some(Duration::from_secs(3600)),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<OutboundPost> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeHttp {
    async fn post(&self, post: OutboundPost) -> Result<TransportResponse, AdapterError> {
        self.seen.lock().unwrap().push(post);

        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }

        Ok(TransportResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// An MQTT connector that records the session lifecycle.
#[derive(Default)]
pub struct FakeMqtt {
    pub events: Arc<Mutex<Vec<String>>>,
}

struct FakeMqttSession {
    events: Arc<Mutex<Vec<String>>>,
}

impl FakeMqtt {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeMqtt::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl MqttConnector for FakeMqtt {
    async fn connect(
        &self,
        credentials: &MqttCredentials,
    ) -> Result<Box<dyn MqttSession>, AdapterError> {
        self.events.lock().unwrap().push(format!(
            "connect {}:{}",
            credentials.username, credentials.password
        ));

        Ok(Box::new(FakeMqttSession {
            events: self.events.clone(),
        }))
    }
}

#[async_trait]
impl MqttSession for FakeMqttSession {
    async fn publish(&mut self, topic: &str, message: &[u8]) -> Result<(), AdapterError> {
        self.events.lock().unwrap().push(format!(
            "publish {} {}",
            topic,
            String::from_utf8_lossy(message)
        ));
        Ok(())
    }

    async fn disconnect(self: Box<Self>) {
        self.events.lock().unwrap().push("disconnect".to_owned());
    }
}

pub fn adapter(config: Config, http: Arc<FakeHttp>, mqtt: Arc<FakeMqtt>) -> Adapter {
    Adapter::new(config, http, mqtt)
}
