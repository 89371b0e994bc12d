use serde::{Deserialize, Serialize};

use crate::anonymizer::{Anonymizer, DEFAULT_IPV4_MASK, DEFAULT_IPV6_MASK};
use crate::error::Result;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Identity attached to every emitted log line, analogous to the
    /// application name.
    #[serde(default = "default_emitter")]
    pub emitter: String,

    /// External telemetry service settings. The logfmt outlet is always
    /// active; this section only controls the network outlet.
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,

    #[serde(default)]
    pub anonymize_ips: AnonymizeConfig,

    /// Record task/function call arguments as event fields.
    #[serde(default = "default_capture_task_args")]
    pub capture_task_args: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    pub write_key: String,

    /// Dataset name; falls back to the emitter name when unset.
    #[serde(default)]
    pub dataset: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AnonymizeConfig {
    #[default]
    Off,
    /// Mask with the default IPv4/IPv6 masks.
    Default,
    /// Explicit address-shaped masks.
    Masks {
        ipv4_mask: String,
        ipv6_mask: String,
    },
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            emitter: default_emitter(),
            telemetry: None,
            anonymize_ips: AnonymizeConfig::default(),
            capture_task_args: default_capture_task_args(),
        }
    }
}

impl EventsConfig {
    /// Dataset the telemetry outlet should write to, when configured.
    pub fn dataset(&self) -> Option<&str> {
        self.telemetry
            .as_ref()
            .map(|telemetry| telemetry.dataset.as_deref().unwrap_or(&self.emitter))
    }

    /// Build the anonymizer this configuration asks for, if any.
    pub fn anonymizer(&self) -> Result<Option<Anonymizer>> {
        match &self.anonymize_ips {
            AnonymizeConfig::Off => Ok(None),
            AnonymizeConfig::Default => {
                Ok(Some(Anonymizer::new(DEFAULT_IPV4_MASK, DEFAULT_IPV6_MASK)?))
            }
            AnonymizeConfig::Masks { ipv4_mask, ipv6_mask } => {
                Ok(Some(Anonymizer::new(ipv4_mask, ipv6_mask)?))
            }
        }
    }
}

// Default value functions
fn default_emitter() -> String {
    "canonical".to_string()
}

fn default_capture_task_args() -> bool {
    true
}
