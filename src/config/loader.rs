use figment::providers::{Env, Format, Json, Toml, Yaml};
use figment::Figment;
use std::path::Path;

use super::schema::EventsConfig;
use crate::error::{ConfigError, Result};

/// Load configuration from conventional files merged with `EVENTS_`
/// environment variables. Later sources win; nested keys use `__` in the
/// environment (e.g. `EVENTS_TELEMETRY__WRITE_KEY`).
pub fn load_from_env_or_file() -> Result<EventsConfig> {
    let config: EventsConfig = Figment::new()
        .merge(Toml::file("events.toml"))
        .merge(Json::file("events.json"))
        .merge(Yaml::file("events.yaml"))
        .merge(Yaml::file("events.yml"))
        .merge(Env::prefixed("EVENTS_").split("__"))
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate(&config)?;

    Ok(config)
}

/// Load configuration from an explicit file path, still allowing
/// environment overrides.
pub fn load_from_path(path: &Path) -> Result<EventsConfig> {
    let figment = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Figment::new().merge(Json::file(path)),
        Some("yaml") | Some("yml") => Figment::new().merge(Yaml::file(path)),
        _ => Figment::new().merge(Toml::file(path)),
    };

    let config: EventsConfig = figment
        .merge(Env::prefixed("EVENTS_").split("__"))
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &EventsConfig) -> Result<()> {
    if config.emitter.trim().is_empty() {
        return Err(ConfigError::Validation("emitter must not be blank".into()).into());
    }

    if let Some(telemetry) = &config.telemetry {
        if telemetry.write_key.trim().is_empty() {
            return Err(ConfigError::MissingField("telemetry.write_key".into()).into());
        }
    }

    // Surfaces unparseable masks at load time instead of first use.
    config.anonymizer()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AnonymizeConfig, TelemetryConfig};
    use std::io::Write;

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "emitter = \"my_app\"\n\
             capture_task_args = false\n\n\
             [telemetry]\n\
             write_key = \"sekrit\"\n\n\
             [anonymize_ips]\n\
             mode = \"masks\"\n\
             ipv4_mask = \"255.255.0.0\"\n\
             ipv6_mask = \"ffff::\"\n"
        )
        .unwrap();

        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.emitter, "my_app");
        assert!(!config.capture_task_args);
        assert_eq!(config.dataset(), Some("my_app"));
        assert_eq!(
            config.anonymize_ips,
            AnonymizeConfig::Masks {
                ipv4_mask: "255.255.0.0".to_string(),
                ipv6_mask: "ffff::".to_string(),
            }
        );
        assert!(config.anonymizer().unwrap().is_some());
    }

    #[test]
    fn test_defaults() {
        let config = EventsConfig::default();
        assert_eq!(config.emitter, "canonical");
        assert!(config.telemetry.is_none());
        assert_eq!(config.anonymize_ips, AnonymizeConfig::Off);
        assert!(config.capture_task_args);
        assert_eq!(config.dataset(), None);
        assert!(config.anonymizer().unwrap().is_none());
    }

    #[test]
    fn test_blank_write_key_rejected() {
        let config = EventsConfig {
            telemetry: Some(TelemetryConfig {
                write_key: "  ".to_string(),
                dataset: None,
            }),
            ..EventsConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_mask_rejected() {
        let config = EventsConfig {
            anonymize_ips: AnonymizeConfig::Masks {
                ipv4_mask: "not-a-mask".to_string(),
                ipv6_mask: "ffff::".to_string(),
            },
            ..EventsConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_explicit_dataset_wins() {
        let config = EventsConfig {
            telemetry: Some(TelemetryConfig {
                write_key: "key".to_string(),
                dataset: Some("prod-events".to_string()),
            }),
            ..EventsConfig::default()
        };
        assert_eq!(config.dataset(), Some("prod-events"));
    }
}
