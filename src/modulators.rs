//! Per-destination payload transformations.
//!
//! These know nothing about transport. Each takes the inbound request (for
//! its query parameters) and an owned copy of the decoded TTN payload, and
//! returns the JSON that the destination wants. A TTN uplink looks roughly
//! like:
//!
//! ```json
//! {
//!   "dev_id": "my-node",
//!   "hardware_serial": "0004A30B001C0530",
//!   "metadata": {"time": "2017-06-14T16:15:41.169291958Z"},
//!   "payload_fields": {"temperature": 26.5}
//! }
//! ```
//!
//! We don't validate that shape. Missing bits mostly turn into JSON `null`,
//! except where there is nothing sensible to emit.

use serde_json::{json, Map, Number, Value};

use crate::{error::AdapterError, request::InboundRequest};

/// A payload transformation, as used by the generic modulated handler.
pub type Modulator = fn(&InboundRequest, Map<String, Value>) -> Result<Value, AdapterError>;

fn wrap_data(data: Map<String, Value>, fieldname: &str) -> Value {
    let mut wrapped = Map::with_capacity(1);
    wrapped.insert(fieldname.to_owned(), Value::Object(data));
    Value::Object(wrapped)
}

/// Look up a nested field, giving `null` if any step is missing.
fn lookup<'a>(data: &'a Map<String, Value>, path: &[&str]) -> &'a Value {
    let mut cur = match path.split_first() {
        Some((first, _)) => data.get(*first).unwrap_or(&Value::Null),
        None => return &Value::Null,
    };

    for key in &path[1..] {
        cur = cur.get(*key).unwrap_or(&Value::Null);
    }

    cur
}

/// Number text the way JavaScript prints it: whole floats lose their
/// fraction, so `20.0` is `"20"`.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

/// Wrap the whole payload under the field named by `dataname`.
pub fn rename(req: &InboundRequest, data: Map<String, Value>) -> Result<Value, AdapterError> {
    let fieldname = req.required_query("dataname", "'dataname'")?;
    Ok(wrap_data(data, fieldname))
}

/// OpenSensors wants a single text field called `data` and nothing else.
pub fn opensensors(_req: &InboundRequest, data: Map<String, Value>) -> Result<Value, AdapterError> {
    let fields = data.get("payload_fields").unwrap_or(&Value::Null);
    Ok(json!({ "data": serde_json::to_string(fields)? }))
}

/// SlicingDice insert, keyed by the device's hardware serial.
///
/// The serial is used as an entity name as-is; SlicingDice may not like it,
/// but that's its call.
pub fn slicingdice(_req: &InboundRequest, data: Map<String, Value>) -> Result<Value, AdapterError> {
    let entity = match data.get("hardware_serial") {
        Some(Value::String(s)) => s.clone(),
        other => {
            return Err(AdapterError::MalformedInput(format!(
                "`hardware_serial` must be a string, got `{}`",
                other.unwrap_or(&Value::Null)
            )))
        }
    };

    let mut record = Map::new();

    if let Some(dev_id) = data.get("dev_id") {
        record.insert("device-name".to_owned(), dev_id.clone());
    }

    record.insert(
        "temperature".to_owned(),
        json!([{
            "value": lookup(&data, &["payload_fields", "temperature"]),
            "date": lookup(&data, &["metadata", "time"]),
        }]),
    );
    record.insert("table".to_owned(), "sensor-data".into());

    let mut out = Map::with_capacity(2);
    out.insert("auto-create".to_owned(), json!(["table", "column"]));
    out.insert(entity, Value::Object(record));
    Ok(Value::Object(out))
}

/// Pyroclast takes the whole message under `value`.
pub fn pyroclast(_req: &InboundRequest, data: Map<String, Value>) -> Result<Value, AdapterError> {
    Ok(wrap_data(data, "value"))
}

/// The Adafruit IO data point for one field of the payload.
///
/// Adafruit stores feed values as text, so the field gets stringified: `26.5`
/// becomes `"26.5"`, while strings pass through without extra quotes.
pub fn adafruit(req: &InboundRequest, data: &Map<String, Value>) -> Result<Value, AdapterError> {
    let field = req.required_query("field", "'field'")?;

    let value = data
        .get("payload_fields")
        .and_then(|f| f.get(field))
        .ok_or_else(|| {
            AdapterError::MalformedInput(format!("payload has no `payload_fields.{field}`"))
        })?;

    let value = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_text(n),
        other => other.to_string(),
    };

    Ok(json!({
        "created_at": lookup(data, &["metadata", "time"]),
        "value": value,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttn() -> Map<String, Value> {
        match json!({
            "hardware_serial": "THE_DEVICE_EUI",
            "metadata": {"time": "2017-06-14T16:15:41.169291958Z"},
            "payload_fields": {"temperature": 26.5}
        }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn rename_wraps_payload() {
        let req = InboundRequest::new("/rename").with_query("dataname", "uplink");
        let out = rename(&req, ttn()).unwrap();
        assert_eq!(out, json!({ "uplink": Value::Object(ttn()) }));
    }

    #[test]
    fn rename_needs_dataname() {
        let req = InboundRequest::new("/rename");
        let err = rename(&req, ttn()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid 'dataname' query parameter 'null'"
        );

        let req = InboundRequest::new("/rename").with_query("dataname", "");
        assert!(matches!(
            rename(&req, ttn()),
            Err(AdapterError::MissingParameter { name: "'dataname'", .. })
        ));
    }

    #[test]
    fn opensensors_stringifies_fields() {
        let out = opensensors(&InboundRequest::default(), ttn()).unwrap();
        assert_eq!(out, json!({ "data": "{\"temperature\":26.5}" }));
    }

    #[test]
    fn opensensors_without_fields() {
        let mut data = ttn();
        data.remove("payload_fields");
        let out = opensensors(&InboundRequest::default(), data).unwrap();
        assert_eq!(out, json!({ "data": "null" }));
    }

    #[test]
    fn slicingdice_keys_by_serial() {
        let mut data = ttn();
        data.insert("dev_id".to_owned(), "node-1".into());
        let out = slicingdice(&InboundRequest::default(), data).unwrap();
        assert_eq!(
            out,
            json!({
                "auto-create": ["table", "column"],
                "THE_DEVICE_EUI": {
                    "device-name": "node-1",
                    "temperature": [{"value": 26.5, "date": "2017-06-14T16:15:41.169291958Z"}],
                    "table": "sensor-data"
                }
            })
        );
    }

    #[test]
    fn slicingdice_rejects_missing_serial() {
        let mut data = ttn();
        data.remove("hardware_serial");
        assert!(matches!(
            slicingdice(&InboundRequest::default(), data),
            Err(AdapterError::MalformedInput(_))
        ));
    }

    #[test]
    fn pyroclast_wraps_under_value() {
        let out = pyroclast(&InboundRequest::default(), ttn()).unwrap();
        assert_eq!(out, json!({ "value": Value::Object(ttn()) }));
    }

    #[test]
    fn adafruit_stringifies_value() {
        let req = InboundRequest::new("/adafruit").with_query("field", "temperature");
        let out = adafruit(&req, &ttn()).unwrap();
        assert_eq!(
            out,
            json!({"created_at": "2017-06-14T16:15:41.169291958Z", "value": "26.5"})
        );

        let mut data = ttn();
        data.insert("payload_fields".to_owned(), json!({"status": "ok"}));
        let req = InboundRequest::new("/adafruit").with_query("field", "status");
        assert_eq!(adafruit(&req, &data).unwrap()["value"], "ok");
    }

    #[test]
    fn adafruit_whole_floats_drop_the_fraction() {
        let mut data = ttn();
        data.insert(
            "payload_fields".to_owned(),
            json!({"temperature": 20.0, "count": 7, "ratio": -0.25}),
        );

        for (field, text) in [("temperature", "20"), ("count", "7"), ("ratio", "-0.25")] {
            let req = InboundRequest::new("/adafruit").with_query("field", field);
            assert_eq!(adafruit(&req, &data).unwrap()["value"], text);
        }
    }

    #[test]
    fn adafruit_missing_field() {
        let req = InboundRequest::new("/adafruit").with_query("field", "humidity");
        assert!(matches!(
            adafruit(&req, &ttn()),
            Err(AdapterError::MalformedInput(_))
        ));

        let req = InboundRequest::new("/adafruit");
        assert!(matches!(
            adafruit(&req, &ttn()),
            Err(AdapterError::MissingParameter { name: "'field'", .. })
        ));
    }

    #[test]
    fn transforms_are_repeatable() {
        let req = InboundRequest::new("/rename").with_query("dataname", "d");
        let mods: [Modulator; 4] = [rename, opensensors, slicingdice, pyroclast];

        for m in mods {
            assert_eq!(m(&req, ttn()).unwrap(), m(&req, ttn()).unwrap());
        }
    }
}
