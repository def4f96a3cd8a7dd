// Copyright (c) 2026 The Chainseal Developers

//! Demo configuration
//!
//! A TOML file with the backend credentials and the device description.
//! `[service]` and `[validator]` must be present; device ids are generated
//! on first run and written back so later runs keep the same identity.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Backend connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Service {
    /// API auth token
    pub auth: String,

    /// Backend environment (dev / demo / prod)
    pub env: String,
}

/// Device identity and record settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Device {
    /// Device id, generated on first run
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,

    /// Display name for the device record
    #[serde(default = "default_name")]
    pub name: String,

    /// Device type key for the device record
    #[serde(default = "default_type", rename = "type")]
    pub device_type: String,

    /// Hardware id, defaults to the device id
    #[serde(default)]
    pub hw_id: Option<Uuid>,
}

impl Device {
    /// Hardware id for the device record
    pub fn hw_device_id(&self) -> Uuid {
        self.hw_id.unwrap_or(self.uuid)
    }
}

impl Default for Device {
    fn default() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: default_name(),
            device_type: default_type(),
            hw_id: None,
        }
    }
}

fn default_name() -> String {
    "Demo Device".to_string()
}

fn default_type() -> String {
    "demo-device".to_string()
}

/// On-premise validator settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Validator {
    /// Base address of the validation endpoint
    pub address: String,
}

/// Demo client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub service: Service,
    #[serde(default)]
    pub device: Device,
    pub validator: Validator,
}

impl Config {
    /// Load the config, generating and writing back missing device ids
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        let raw = fs::read_to_string(path).map_err(|_| {
            Error::Config(format!(
                "config file {} not found (set [service] auth / env and [validator] address)",
                path.display()
            ))
        })?;

        let mut config: Config =
            toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))?;

        // Pin generated ids so later runs keep the same identity
        if config.device.hw_id.is_none() {
            config.device.hw_id = Some(config.device.uuid);
        }

        let updated = toml::to_string(&config).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, updated)?;

        debug!(
            "Using device {} ({})",
            config.device.uuid, config.device.name
        );

        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MINIMAL: &str = r#"
[service]
auth = "secret-token"
env = "demo"

[validator]
address = "http://validator.local:8080/api/verify"
"#;

    #[test]
    fn minimal_config_generates_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.toml");
        fs::write(&path, MINIMAL).unwrap();

        let config = Config::load_or_init(&path).unwrap();

        assert_eq!(config.service.auth, "secret-token");
        assert_eq!(config.device.name, "Demo Device");
        assert_eq!(config.device.device_type, "demo-device");
        assert_eq!(config.device.hw_device_id(), config.device.uuid);
    }

    #[test]
    fn generated_ids_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.toml");
        fs::write(&path, MINIMAL).unwrap();

        let first = Config::load_or_init(&path).unwrap();
        let second = Config::load_or_init(&path).unwrap();

        assert_eq!(second.device.uuid, first.device.uuid);
        assert_eq!(second.device.hw_id, first.device.hw_id);
    }

    #[test]
    fn explicit_values_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.toml");

        let uuid = Uuid::new_v4();
        let hw = Uuid::new_v4();
        fs::write(
            &path,
            format!(
                r#"
[service]
auth = "secret-token"
env = "prod"

[device]
uuid = "{uuid}"
name = "Boiler 7"
type = "boiler"
hw_id = "{hw}"

[validator]
address = "http://validator.local:8080/api/verify"
"#
            ),
        )
        .unwrap();

        let config = Config::load_or_init(&path).unwrap();

        assert_eq!(config.device.uuid, uuid);
        assert_eq!(config.device.name, "Boiler 7");
        assert_eq!(config.device.device_type, "boiler");
        assert_eq!(config.device.hw_device_id(), hw);
    }

    #[test]
    fn missing_file_reports_required_keys() {
        let dir = tempfile::tempdir().unwrap();

        let res = Config::load_or_init(dir.path().join("none.toml"));
        assert!(matches!(res, Err(Error::Config(msg)) if msg.contains("[service]")));
    }
}
