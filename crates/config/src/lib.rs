//! MuClient Configuration Management
//!
//! Loads the client configuration from a plain `key = value` text file.
//! Lines starting with `#` and blank lines are skipped; keys this client
//! does not know are ignored.

use muclient_core::{ClientError, DirectionMap, ProtocolVersion};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Where [`ClientConfig::load_default`] looks
pub const DEFAULT_CONFIG_PATH: &str = "config/client.txt";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => ClientError::Io(e),
            other => ClientError::Config(other.to_string()),
        }
    }
}

/// Complete client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // ========== Connect Server ==========
    /// Connect Server host (from "connect_host")
    pub connect_host: String,
    /// Connect Server port (from "connect_port", default: 44405)
    pub connect_port: u16,

    // ========== Protocol ==========
    /// Negotiated protocol generation (from "protocol_version")
    pub protocol_version: ProtocolVersion,
    /// Five-character client version sent at login (from "client_version")
    pub client_version: String,
    /// Sixteen-character client serial sent at login (from "client_serial")
    pub client_serial: String,

    // ========== Account ==========
    pub username: String,
    pub password: String,
    /// Server to pick automatically from the server list (from "server_id")
    pub server_id: Option<u16>,
    /// Character to pick automatically (from "character")
    pub character: Option<String>,

    // ========== Behaviour ==========
    /// Client compass → server direction code (from "direction_map")
    pub direction_map: DirectionMap,
    /// Drop weather updates before dispatch (from "filter_weather")
    pub filter_weather: bool,
    /// Drop hit/damage packets before dispatch (from "filter_damage")
    pub filter_damage: bool,
    /// Resolve suspicious ids in item-drop-removed packets (from "item_drop_id_workaround")
    pub item_drop_id_workaround: bool,
    /// Polls while a request is in flight (from "request_attempts")
    pub request_attempts: u32,
    /// Milliseconds between polls (from "request_delay_ms")
    pub request_delay_ms: u64,
    /// TCP connect timeout in milliseconds (from "connect_timeout_ms")
    pub connect_timeout_ms: u64,

    // ========== Logging ==========
    /// Default tracing filter when `RUST_LOG` is unset (from "log_level")
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_host: "127.0.0.1".to_string(),
            connect_port: 44405,
            protocol_version: ProtocolVersion::Season6,
            client_version: "10404".to_string(),
            client_serial: "k1Pk2jcET48mxL3b".to_string(),
            username: String::new(),
            password: String::new(),
            server_id: None,
            character: None,
            direction_map: DirectionMap::CLASSIC,
            filter_weather: true,
            filter_damage: false,
            item_drop_id_workaround: false,
            request_attempts: 10,
            request_delay_ms: 300,
            connect_timeout_ms: 5000,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load configuration from [`DEFAULT_CONFIG_PATH`]
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    /// Parse configuration text; absent keys keep their defaults
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                config.parse_option(key.trim(), value.trim())?;
            } else {
                tracing::debug!("Ignoring config line without '=': {}", line);
            }
        }

        Ok(config)
    }

    fn parse_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "connect_host" => self.connect_host = value.to_string(),
            "connect_port" => self.connect_port = parse_value(key, value)?,
            "protocol_version" => {
                self.protocol_version = ProtocolVersion::parse(value).ok_or_else(|| invalid(key, value))?;
            }
            "client_version" => self.client_version = value.to_string(),
            "client_serial" => self.client_serial = value.to_string(),
            "username" => self.username = value.to_string(),
            "password" => self.password = value.to_string(),
            "server_id" => {
                self.server_id = if value.is_empty() {
                    None
                } else {
                    Some(parse_value(key, value)?)
                };
            }
            "character" => self.character = (!value.is_empty()).then(|| value.to_string()),
            "direction_map" => {
                let values = value
                    .split(',')
                    .map(|part| part.trim().parse::<u8>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| invalid(key, value))?;
                self.direction_map = DirectionMap::from_slice(&values).ok_or_else(|| invalid(key, value))?;
            }
            "filter_weather" => self.filter_weather = parse_bool(key, value)?,
            "filter_damage" => self.filter_damage = parse_bool(key, value)?,
            "item_drop_id_workaround" => self.item_drop_id_workaround = parse_bool(key, value)?,
            "request_attempts" => self.request_attempts = parse_value(key, value)?,
            "request_delay_ms" => self.request_delay_ms = parse_value(key, value)?,
            "connect_timeout_ms" => self.connect_timeout_ms = parse_value(key, value)?,
            "log_level" => self.log_level = value.to_string(),
            _ => tracing::debug!("Ignoring unknown config key: {}", key),
        }
        Ok(())
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_host.is_empty() {
            return Err(invalid("connect_host", &self.connect_host));
        }
        if self.connect_port == 0 {
            return Err(invalid("connect_port", "0"));
        }
        if self.request_attempts == 0 {
            return Err(invalid("request_attempts", "0"));
        }
        if DirectionMap::from_slice(&self.direction_map.0).is_none() {
            return Err(invalid("direction_map", &format!("{:?}", self.direction_map.0)));
        }
        if self.client_version.len() != 5 {
            tracing::warn!("client_version {:?} is not 5 characters long", self.client_version);
        }
        if self.client_serial.len() != 16 {
            tracing::warn!("client_serial is not 16 characters long");
        }
        if self.username.is_empty() {
            tracing::warn!("No username configured, login will fail");
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Log the effective configuration; the password is masked
    pub fn display(&self) {
        tracing::info!("Client configuration:");
        tracing::info!("  Connect server: {}:{}", self.connect_host, self.connect_port);
        tracing::info!("  Protocol: {}", self.protocol_version);
        tracing::info!("  Client version: {} serial: {}", self.client_version, self.client_serial);
        tracing::info!("  Account: {} / {}", self.username, "*".repeat(self.password.len()));
        match self.server_id {
            Some(id) => tracing::info!("  Auto server: {}", id),
            None => tracing::info!("  Auto server: off"),
        }
        tracing::info!("  Auto character: {}", self.character.as_deref().unwrap_or("off"));
        tracing::info!("  Direction map: {:?}", self.direction_map.0);
        tracing::info!(
            "  Filters: weather={} damage={}",
            self.filter_weather,
            self.filter_damage
        );
        tracing::info!("  Item drop id workaround: {}", self.item_drop_id_workaround);
        tracing::info!(
            "  Requests: {} attempts every {}ms, connect timeout {}ms",
            self.request_attempts,
            self.request_delay_ms,
            self.connect_timeout_ms
        );
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
