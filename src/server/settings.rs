use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

// For explanation, see issue: https://github.com/serde-rs/serde/issues/368
fn default_listener_ip() -> String {
    "0.0.0.0".to_owned()
}
fn default_port() -> u16 {
    8080
}
fn default_connections_capacity() -> u16 {
    8
}
fn default_queue_capacity() -> u16 {
    64
}
fn default_timeout_ms() -> u64 {
    10_000
}

/// Environment variables with this prefix override the settings file.
pub const ENV_PREFIX: &str = "OVERLAY";

const DATA_DIR_NAME: &str = "overlay-node";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_listener_ip")]
    pub listener_ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connections_capacity")]
    pub connections_capacity: u16,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: u16,
    #[serde(default)]
    pub depth_vision: u8,
    #[serde(default)]
    pub network: String,
    #[serde(default = "default_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub receive_timeout_ms: u64,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listener_ip: default_listener_ip(),
            port: default_port(),
            connections_capacity: default_connections_capacity(),
            queue_capacity: default_queue_capacity(),
            depth_vision: 0,
            network: String::new(),
            send_timeout_ms: default_timeout_ms(),
            receive_timeout_ms: default_timeout_ms(),
            data_dir: None,
        }
    }
}

impl Settings {
    /// Reads the optional settings file, then the `OVERLAY_*` environment.
    pub fn new(file: Option<&Path>) -> Result<Self, ConfigError> {
        Settings::load(file, ENV_PREFIX)
    }

    fn load(file: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder.add_source(Environment::with_prefix(env_prefix)).build()?.try_deserialize()
    }

    pub fn listener_ip(&self) -> crate::Result<IpAddr> {
        self.listener_ip.parse().map_err(|_| crate::Error::InvalidIp(self.listener_ip.clone()))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// Where identities are stored: the configured directory, or the platform data directory.
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir().unwrap_or_else(std::env::temp_dir).join(DATA_DIR_NAME),
        }
    }
}
