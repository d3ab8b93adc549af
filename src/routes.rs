//! The fixed table of destinations.
//!
//! Paths look like `/<name>`; the route key is the name without its
//! leading slash. Matching is exact and case-sensitive.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::{
    config::{AdafruitTransport, Config},
    modulators::{self, Modulator},
    request::AUTHORIZATION,
};

pub const AIO_KEY: &str = "X-AIO-Key";

#[derive(Clone, Copy)]
pub enum HandlerKind {
    /// The generic handler: decode, transform, POST with `Authorization`.
    Modulated(Modulator),

    /// Adafruit IO has its own handler, since it may not use HTTP at all.
    Adafruit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportKind {
    Http { auth_header: &'static str },
    Mqtt,
}

#[derive(Clone, Copy)]
pub struct Route {
    pub name: &'static str,
    pub handler: HandlerKind,
}

impl Route {
    /// How this route delivers its payload under the given deployment.
    pub fn transport(&self, config: &Config) -> TransportKind {
        match (self.handler, config.adafruit_transport) {
            (HandlerKind::Modulated(_), _) => TransportKind::Http {
                auth_header: AUTHORIZATION,
            },
            (HandlerKind::Adafruit, AdafruitTransport::Http) => {
                TransportKind::Http { auth_header: AIO_KEY }
            }
            (HandlerKind::Adafruit, AdafruitTransport::Mqtt) => TransportKind::Mqtt,
        }
    }
}

static ROUTES: Lazy<HashMap<&'static str, Route>> = Lazy::new(|| {
    [
        ("rename", HandlerKind::Modulated(modulators::rename)),
        ("opensensors", HandlerKind::Modulated(modulators::opensensors)),
        ("slicingdice", HandlerKind::Modulated(modulators::slicingdice)),
        ("pyroclast", HandlerKind::Modulated(modulators::pyroclast)),
        ("adafruit", HandlerKind::Adafruit),
    ]
    .into_iter()
    .map(|(name, handler)| (name, Route { name, handler }))
    .collect()
});

/// Find the route for a request path.
pub fn lookup(path: &str) -> Option<&'static Route> {
    ROUTES.get(path.strip_prefix('/')?)
}
