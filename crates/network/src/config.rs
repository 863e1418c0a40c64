//! # Session Configuration
//!
//! Transport and command-loop options for one client session.
//!
//! # Example
//!
//! ```rust
//! use muclient_network::SessionConfig;
//! use std::time::Duration;
//!
//! let config = SessionConfig {
//!     connect_host: "192.168.0.10".to_string(),
//!     connect_port: 44405,
//!     request_delay: Duration::from_millis(200),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use crate::handlers::PacketFilter;
use muclient_core::DirectionMap;
use std::time::Duration;

/// Session configuration options
///
/// # Default Values
///
/// - Connect Server at `127.0.0.1:44405`
/// - classic direction codes
/// - weather updates filtered, damage packets routed
/// - 10 polling attempts 300ms apart while a request is in flight
/// - 5-second connect timeout
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Connect Server host name or address
    pub connect_host: String,

    /// Connect Server port
    pub connect_port: u16,

    /// Client compass direction → server direction code
    pub direction_map: DirectionMap,

    /// Codes dropped before dispatch
    pub filter: PacketFilter,

    /// How often a command checks whether its request was answered
    ///
    /// # Notes
    /// - Total wait is `request_attempts * request_delay`
    /// - On timeout the request lock is force-released
    pub request_attempts: u32,

    /// Delay between two polls of the request lock
    pub request_delay: Duration,

    /// Upper bound for establishing a TCP connection
    pub connect_timeout: Duration,

    /// Idle time before the first TCP keepalive probe
    pub keepalive_idle: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_host: "127.0.0.1".to_string(),
            connect_port: 44405,
            direction_map: DirectionMap::CLASSIC,
            filter: PacketFilter {
                weather: true,
                damage: false,
            },
            request_attempts: 10,
            request_delay: Duration::from_millis(300),
            connect_timeout: Duration::from_secs(5),
            keepalive_idle: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    /// Validate the configuration
    ///
    /// # Checks
    /// - `connect_host` must not be empty
    /// - `connect_port` must be > 0
    /// - `request_attempts` must be > 0
    /// - `connect_timeout` must be > 0
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_host.trim().is_empty() {
            return Err("connect_host must not be empty".to_string());
        }

        if self.connect_port == 0 {
            return Err("connect_port must be > 0".to_string());
        }

        if self.request_attempts == 0 {
            return Err("request_attempts must be > 0".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be > 0".to_string());
        }

        if self.request_delay.is_zero() {
            tracing::warn!("request_delay is zero, commands will poll without pausing");
        }

        Ok(())
    }

    /// Longest time a command waits for its answer
    pub fn request_timeout(&self) -> Duration {
        self.request_delay * self.request_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.connect_port, 44405);
        assert_eq!(config.direction_map, DirectionMap::CLASSIC);
        assert!(config.filter.weather);
        assert!(!config.filter.damage);
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_config_validation() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = SessionConfig::default();
        config.connect_host = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.connect_port = 0;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.request_attempts = 0;
        assert!(config.validate().is_err());
    }
}
