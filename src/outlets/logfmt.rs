//! Structured-log outlet rendering one logfmt line per event.

use super::Outlet;
use crate::error::OutletError;
use crate::fields::{FieldValue, Snapshot};
use crate::units::{humanize_size, Measurement, Unit};

/// Serializes snapshots as space-joined `key=value` tokens onto a single
/// INFO record, tagged with the configured emitter name.
pub struct LogfmtOutlet {
    emitter: String,
}

impl LogfmtOutlet {
    pub fn new(emitter: impl Into<String>) -> Self {
        Self {
            emitter: emitter.into(),
        }
    }

    /// Render a full snapshot as one logfmt line.
    pub fn format_line(snapshot: &Snapshot) -> String {
        snapshot
            .iter()
            .map(|(key, value)| format_pair(key, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Outlet for LogfmtOutlet {
    fn name(&self) -> &'static str {
        "logfmt"
    }

    fn handle(&self, snapshot: &Snapshot) -> Result<(), OutletError> {
        let line = Self::format_line(snapshot);
        tracing::info!(emitter = %self.emitter, "{}", line);
        Ok(())
    }
}

// Values containing whitespace or '=' after rendering get quoted verbatim,
// with no escaping of embedded quotes.
fn format_pair(key: &str, value: &FieldValue) -> String {
    let rendered = render_value(value);
    if rendered.contains(char::is_whitespace) || rendered.contains('=') {
        format!("{}=\"{}\"", key, rendered)
    } else {
        format!("{}={}", key, rendered)
    }
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::Bool(true) => "true".to_string(),
        FieldValue::Bool(false) => "false".to_string(),
        FieldValue::Int(value) => value.to_string(),
        FieldValue::Float(value) => render_float(*value),
        FieldValue::Str(value) => value.clone(),
        FieldValue::Measurement(measurement) => render_measurement(measurement),
    }
}

fn render_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.4}", value)
    }
}

fn render_measurement(measurement: &Measurement) -> String {
    match measurement.unit {
        Unit::Seconds => format!("{:.3}s", measurement.value),
        Unit::Bytes => humanize_size(measurement.value as u64),
        Unit::Unitless => render_float(measurement.value),
    }
}
