//! MuClient - MU Online protocol client
//!
//! Usage: `muclient [config-file]` (default `config/client.txt`). Console
//! commands are read from stdin; `quit` or ctrl-c ends the session.

use anyhow::Context;
use muclient_config::{ClientConfig, ConfigError, DEFAULT_CONFIG_PATH};
use muclient_game::{BuiltinNames, Credentials, GameSettings};
use muclient_network::{PacketFilter, Session, SessionConfig};
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let (config, load_error) = load_config(path.as_deref()).context("failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("MuClient starting up");
    if let Some(e) = load_error {
        warn!("Configuration file not found: {}", e);
        warn!("Using default configuration");
    }

    config.validate().context("invalid configuration")?;
    config.display();

    let session = Session::new(
        session_config(&config),
        game_settings(&config),
        Arc::new(BuiltinNames),
    );

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            cancel.cancel();
        }
    });

    if let Err(e) = session.run(BufReader::new(tokio::io::stdin())).await {
        error!("Client error: {}", e);
        return Err(e.into());
    }

    info!("MuClient shut down");
    Ok(())
}

/// A missing config file falls back to defaults and the reason is returned
/// for logging once the subscriber is up; any other load error is fatal
fn load_config(path: Option<&str>) -> Result<(ClientConfig, Option<String>), ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match ClientConfig::load_from_file(path) {
        Ok(config) => Ok((config, None)),
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            Ok((ClientConfig::default(), Some(format!("{}: {}", path, e))))
        }
        Err(e) => Err(e),
    }
}

fn session_config(config: &ClientConfig) -> SessionConfig {
    SessionConfig {
        connect_host: config.connect_host.clone(),
        connect_port: config.connect_port,
        direction_map: config.direction_map,
        filter: PacketFilter {
            weather: config.filter_weather,
            damage: config.filter_damage,
        },
        request_attempts: config.request_attempts,
        request_delay: config.request_delay(),
        connect_timeout: config.connect_timeout(),
        ..SessionConfig::default()
    }
}

fn game_settings(config: &ClientConfig) -> GameSettings {
    GameSettings {
        version: config.protocol_version,
        credentials: Credentials {
            username: config.username.clone(),
            password: config.password.clone(),
            client_version: config.client_version.clone(),
            client_serial: config.client_serial.clone(),
        },
        auto_server_id: config.server_id,
        auto_character: config.character.clone(),
        item_drop_id_workaround: config.item_drop_id_workaround,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muclient_core::{DirectionMap, ProtocolVersion};
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_config_reaches_session_and_state() {
        let config = ClientConfig::parse(
            "connect_port = 55901\nprotocol_version = 0.75\nusername = hero\nserver_id = 3\n\
             filter_weather = false\nfilter_damage = true\nrequest_delay_ms = 50\n\
             direction_map = 0,1,2,3,4,5,6,7",
        )
        .unwrap();

        let session = session_config(&config);
        assert_eq!(session.connect_port, 55901);
        assert_eq!(session.filter, PacketFilter { weather: false, damage: true });
        assert_eq!(session.request_delay, Duration::from_millis(50));
        assert_eq!(session.direction_map, DirectionMap([0, 1, 2, 3, 4, 5, 6, 7]));
        assert!(session.validate().is_ok());

        let settings = game_settings(&config);
        assert_eq!(settings.version, ProtocolVersion::Version075);
        assert_eq!(settings.credentials.username, "hero");
        assert_eq!(settings.auto_server_id, Some(3));
        assert_eq!(settings.auto_character, None);
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let (config, error) = load_config(Some("/nonexistent/client.txt")).unwrap();
        assert!(error.is_some());
        assert_eq!(config.connect_port, 44405);
    }

    #[test]
    fn test_bad_config_value_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "connect_host = 10.0.0.5").unwrap();
        writeln!(file, "protocol_version = 0.9.7").unwrap();
        writeln!(file, "username = hero").unwrap();

        let path = file.path().to_str().unwrap();
        assert!(matches!(
            load_config(Some(path)),
            Err(ConfigError::InvalidValue { key, .. }) if key == "protocol_version"
        ));
    }
}
