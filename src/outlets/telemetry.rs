//! External telemetry service outlet.
//!
//! Forwards a flattened copy of each snapshot to a network telemetry
//! client. The client is a black box owning its own buffering and retry;
//! the outlet issues one fire-and-forget send per event and never blocks
//! beyond that call.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::Outlet;
use crate::error::OutletError;
use crate::fields::{FieldValue, Snapshot};
use crate::units::Unit;

/// Fire-and-forget send primitive of the telemetry backend client.
pub trait TelemetryClient: Send + Sync {
    fn send_now(&self, fields: Map<String, Value>);
}

pub struct TelemetryOutlet {
    client: Arc<dyn TelemetryClient>,
    identity: Map<String, Value>,
}

impl TelemetryOutlet {
    pub fn new(client: Arc<dyn TelemetryClient>) -> Self {
        let mut identity = Map::new();
        if let Some(hostname) = detect_hostname() {
            identity.insert("hostname".to_string(), Value::String(hostname));
        }

        Self { client, identity }
    }

    fn flatten(&self, snapshot: &Snapshot) -> Map<String, Value> {
        let mut fields = self.identity.clone();
        for (key, value) in snapshot.iter() {
            match value {
                FieldValue::Measurement(measurement) => {
                    let key = match measurement.unit {
                        Unit::Unitless => key.to_string(),
                        unit => format!("{}_{}", key, unit.suffix()),
                    };
                    fields.insert(key, json_number(measurement.value));
                }
                other => {
                    fields.insert(key.to_string(), json_value(other));
                }
            }
        }
        fields
    }
}

impl Outlet for TelemetryOutlet {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn handle(&self, snapshot: &Snapshot) -> Result<(), OutletError> {
        self.client.send_now(self.flatten(snapshot));
        Ok(())
    }
}

fn json_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(value) => Value::Bool(*value),
        FieldValue::Int(value) => Value::from(*value),
        FieldValue::Float(value) => json_number(*value),
        FieldValue::Str(value) => Value::String(value.clone()),
        // Handled by the caller; kept total for safety.
        FieldValue::Measurement(measurement) => json_number(measurement.value),
    }
}

fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn detect_hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldMap;
    use crate::units::Measurement;
    use std::sync::Mutex;

    struct CapturingClient {
        sent: Mutex<Vec<Map<String, Value>>>,
    }

    impl CapturingClient {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    impl TelemetryClient for CapturingClient {
        fn send_now(&self, fields: Map<String, Value>) {
            self.sent.lock().unwrap().push(fields);
        }
    }

    #[test]
    fn test_measurements_flatten_to_suffixed_keys() {
        let client = CapturingClient::new();
        let outlet = TelemetryOutlet::new(client.clone());

        let mut snapshot = FieldMap::new();
        snapshot.insert("key", "value");
        snapshot.insert("request_total", Measurement::seconds(0.25));
        snapshot.insert("body", Measurement::bytes(2048.0));

        outlet.handle(&snapshot).unwrap();

        let sent = client.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let event = &sent[0];
        assert_eq!(event["key"], Value::String("value".to_string()));
        assert_eq!(event["request_total_seconds"], Value::from(0.25));
        assert_eq!(event["body_bytes"], Value::from(2048.0));
        assert!(!event.contains_key("request_total"));
    }

    #[test]
    fn test_scalars_pass_through() {
        let client = CapturingClient::new();
        let outlet = TelemetryOutlet::new(client.clone());

        let mut snapshot = FieldMap::new();
        snapshot.insert("status", 200);
        snapshot.insert("cache_hit", true);
        snapshot.insert("missing", FieldValue::Null);

        outlet.handle(&snapshot).unwrap();

        let sent = client.sent.lock().unwrap();
        let event = &sent[0];
        assert_eq!(event["status"], Value::from(200));
        assert_eq!(event["cache_hit"], Value::Bool(true));
        assert_eq!(event["missing"], Value::Null);
    }
}
