//! Deployment settings, read from the environment at startup.
//!
//! Lambda configuration is all environment variables, so that's all we
//! look at. Anything unset gets a default; anything set but unparseable is
//! a startup error rather than a silent fallback.

use anyhow::{anyhow, Context, Result};
use std::{env, str::FromStr, time::Duration};

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_mqtt_host() -> String {
    "io.adafruit.com".to_owned()
}

fn default_mqtt_port() -> u16 {
    1883
}

/// How the `adafruit` route delivers its data. Only one is active in any
/// given deployment.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AdafruitTransport {
    /// POST to the `url` query parameter with an `X-AIO-Key` header.
    #[default]
    Http,

    /// Publish to `<username>/feeds/<feed>` on the MQTT broker.
    Mqtt,
}

impl FromStr for AdafruitTransport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(AdafruitTransport::Http),
            "mqtt" => Ok(AdafruitTransport::Mqtt),
            other => Err(anyhow!("unknown Adafruit transport `{other}` (expected http or mqtt)")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Upper bound on the whole handling of one request, outbound call
    /// included.
    pub timeout_ms: u64,

    pub adafruit_transport: AdafruitTransport,

    pub mqtt_host: String,

    pub mqtt_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout_ms: default_timeout_ms(),
            adafruit_transport: AdafruitTransport::default(),
            mqtt_host: default_mqtt_host(),
            mqtt_port: default_mqtt_port(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(v) = lookup("TTN_ADAPTER_TIMEOUT_MS") {
            cfg.timeout_ms = v
                .parse()
                .with_context(|| format!("invalid TTN_ADAPTER_TIMEOUT_MS `{v}`"))?;
        }

        if let Some(v) = lookup("TTN_ADAPTER_ADAFRUIT_TRANSPORT") {
            cfg.adafruit_transport = v.parse()?;
        }

        if let Some(v) = lookup("TTN_ADAPTER_MQTT_HOST") {
            cfg.mqtt_host = v;
        }

        if let Some(v) = lookup("TTN_ADAPTER_MQTT_PORT") {
            cfg.mqtt_port = v
                .parse()
                .with_context(|| format!("invalid TTN_ADAPTER_MQTT_PORT `{v}`"))?;
        }

        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
