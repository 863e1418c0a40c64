//! Connect server handlers: greeting, server list and game server address

use crate::handlers::HandlerRegistry;
use muclient_game::GameState;
use muclient_protocol::connect::{decode_connection_info, decode_hello, decode_server_list};
use muclient_protocol::packets::sub_codes;
use muclient_protocol::{ConnectServerCode, DecodeError, Frame};

type Handler = fn(&Frame<'_>, &GameState) -> Result<(), DecodeError>;

const HANDLERS: &[(u8, Option<u8>, Handler)] = &[
    (ConnectServerCode::Hello as u8, Some(sub_codes::HELLO), handle_hello),
    (ConnectServerCode::ServerInfo as u8, Some(sub_codes::SERVER_LIST), handle_server_list),
    (ConnectServerCode::ServerInfo as u8, Some(sub_codes::CONNECTION_INFO), handle_connection_info),
];

/// Fill `registry` with the connect server handlers
pub fn register(registry: &mut HandlerRegistry) {
    for &(code, sub_code, handler) in HANDLERS {
        // duplicates are reported by the registry
        let _ = registry.register(code, sub_code, handler);
    }
}

fn handle_hello(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    decode_hello(frame.packet, state.version())?;
    tracing::info!("Connect server greeting received");
    state.request_server_list();
    Ok(())
}

fn handle_server_list(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let servers = decode_server_list(frame.packet, state.version())?;
    for server in &servers {
        tracing::debug!("Server {} load {}%", server.server_id, server.load);
    }
    state.store_server_list(servers);

    if let Some(server_id) = state.settings().auto_server_id {
        state.select_server(server_id);
    }
    Ok(())
}

fn handle_connection_info(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let info = decode_connection_info(frame.packet, state.version())?;
    let (host, port) = (info.host.clone(), info.port);
    state.store_connection_info(info);
    state.switch_to_game_server(&host, port);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{Dispatcher, PacketFilter, RouteOutcome};
    use crate::testing::{recording_state, walk_to};
    use muclient_game::{ConnectionState, GameSettings};
    use muclient_protocol::ServerEntry;

    fn server_list_frame(entries: &[(u16, u8)]) -> Vec<u8> {
        let mut packet = vec![0xC2, 0x00, 0x00, 0xF4, 0x06];
        packet.extend((entries.len() as u16).to_be_bytes());
        for (id, load) in entries {
            packet.extend(id.to_le_bytes());
            packet.push(*load);
            packet.push(0);
        }
        let len = packet.len() as u16;
        packet[1..3].copy_from_slice(&len.to_be_bytes());
        packet
    }

    #[test]
    fn test_hello_then_server_list() {
        let (state, sink) = recording_state(GameSettings::default());
        walk_to(&state, ConnectionState::ConnectedToConnectServer);
        let dispatcher = Dispatcher::new(state.clone(), PacketFilter::default());

        assert_eq!(dispatcher.route(&[0xC1, 0x04, 0x00, 0x01]), RouteOutcome::Handled);
        assert_eq!(sink.sent(), vec![vec![0xC1, 0x04, 0xF4, 0x06]]);

        let frame = server_list_frame(&[(0, 20), (1, 80)]);
        assert_eq!(dispatcher.route(&frame), RouteOutcome::Handled);
        assert_eq!(
            state.servers(),
            vec![
                ServerEntry { server_id: 0, load: 20 },
                ServerEntry { server_id: 1, load: 80 }
            ]
        );
        assert_eq!(state.connection_state(), ConnectionState::ReceivedServerList);
    }

    #[test]
    fn test_auto_select_and_connection_info() {
        let settings = GameSettings {
            auto_server_id: Some(1),
            ..GameSettings::default()
        };
        let (state, sink) = recording_state(settings);
        walk_to(&state, ConnectionState::RequestingServerList);
        let dispatcher = Dispatcher::new(state.clone(), PacketFilter::default());

        dispatcher.route(&server_list_frame(&[(0, 20), (1, 80)]));
        assert_eq!(sink.sent(), vec![vec![0xC1, 0x06, 0xF4, 0x03, 0x01, 0x00]]);
        assert_eq!(state.connection_state(), ConnectionState::RequestingConnectionInfo);

        let mut info = vec![0xC1, 0x16, 0xF4, 0x03];
        let mut host = [0u8; 16];
        host[..9].copy_from_slice(b"127.0.0.1");
        info.extend(host);
        info.extend(55901u16.to_le_bytes());
        assert_eq!(dispatcher.route(&info), RouteOutcome::Handled);

        assert_eq!(sink.connects(), vec![("127.0.0.1".to_string(), 55901)]);
        assert_eq!(state.connection_state(), ConnectionState::ConnectingToGameServer);
    }

    #[test]
    fn test_short_server_list_changes_nothing() {
        let (state, _) = recording_state(GameSettings::default());
        walk_to(&state, ConnectionState::RequestingServerList);
        let dispatcher = Dispatcher::new(state.clone(), PacketFilter::default());

        assert_eq!(dispatcher.route(&[0xC2, 0x00, 0x06, 0xF4, 0x06, 0x00]), RouteOutcome::Dropped);
        assert!(state.servers().is_empty());
        assert_eq!(state.connection_state(), ConnectionState::RequestingServerList);
    }
}
