//! Connect server decoders

use crate::codecs::*;
use crate::error::DecodeError;
use crate::packet_structures::{ConnectionInfo, ServerEntry};
use muclient_core::ProtocolVersion;

const HELLO_LEN: usize = 4;
const SERVER_LIST_HEADER_LEN: usize = 7;
const SERVER_ENTRY_LEN: usize = 4;
const CONNECTION_INFO_LEN: usize = 22;

/// `C1 04 00 01`
pub fn decode_hello(packet: &[u8], _version: ProtocolVersion) -> Result<(), DecodeError> {
    require_len(packet, HELLO_LEN)
}

/// Server list, in wire order
///
/// # Packet Format
/// ```text
/// C2 len:u16 F4 06 count:u16be { server_id:u16le load:u8 pad }*
/// ```
///
/// Entries that do not fit completely in the frame are dropped.
pub fn decode_server_list(packet: &[u8], _version: ProtocolVersion) -> Result<Vec<ServerEntry>, DecodeError> {
    require_len(packet, SERVER_LIST_HEADER_LEN)?;
    let count = read_u16_be(packet, 5)? as usize;

    let mut servers = Vec::with_capacity(count.min(packet.len() / SERVER_ENTRY_LEN));
    for index in 0..count {
        let offset = SERVER_LIST_HEADER_LEN + index * SERVER_ENTRY_LEN;
        if read_bytes(packet, offset, SERVER_ENTRY_LEN).is_err() {
            tracing::debug!("Server list truncated after {} of {} entries", index, count);
            break;
        }
        servers.push(ServerEntry {
            server_id: read_u16_le(packet, offset)?,
            load: read_u8(packet, offset + 2)?,
        });
    }
    Ok(servers)
}

/// Address of a game server
///
/// # Packet Format
/// ```text
/// C1 16 F4 03 ip[16] port:u16le
/// ```
pub fn decode_connection_info(packet: &[u8], _version: ProtocolVersion) -> Result<ConnectionInfo, DecodeError> {
    require_len(packet, CONNECTION_INFO_LEN)?;
    Ok(ConnectionInfo {
        host: read_fixed_string(packet, 4, 16)?,
        port: read_u16_le(packet, 20)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const V: ProtocolVersion = ProtocolVersion::Season6;

    #[test]
    fn test_hello() {
        assert!(decode_hello(&[0xC1, 0x04, 0x00, 0x01], V).is_ok());
        assert!(decode_hello(&[0xC1, 0x03, 0x00], V).is_err());
    }

    #[test]
    fn test_server_list_order() {
        let packet = [
            0xC2, 0x00, 0x0F, 0xF4, 0x06, 0x00, 0x02,
            0x14, 0x00, 0x32, 0x00,
            0x00, 0x00, 0x05, 0x00,
        ];
        let servers = decode_server_list(&packet, V).unwrap();
        assert_eq!(
            servers,
            vec![
                ServerEntry { server_id: 20, load: 50 },
                ServerEntry { server_id: 0, load: 5 },
            ]
        );
    }

    #[test]
    fn test_server_list_drops_partial_entry() {
        let packet = [0xC2, 0x00, 0x0D, 0xF4, 0x06, 0x00, 0x02, 0x01, 0x00, 0x10, 0x00, 0x02, 0x00];
        let servers = decode_server_list(&packet, V).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].server_id, 1);
    }

    #[test]
    fn test_server_list_too_short() {
        assert_eq!(
            decode_server_list(&[0xC2, 0x00, 0x05, 0xF4, 0x06], V),
            Err(DecodeError::TooShort { expected: 7, actual: 5 })
        );
    }

    #[test]
    fn test_connection_info() {
        let mut packet = vec![0xC1, 0x16, 0xF4, 0x03];
        let mut ip = b"192.168.0.10".to_vec();
        ip.resize(16, 0);
        packet.extend_from_slice(&ip);
        packet.extend_from_slice(&55901u16.to_le_bytes());

        let info = decode_connection_info(&packet, V).unwrap();
        assert_eq!(info.host, "192.168.0.10");
        assert_eq!(info.port, 55901);
    }
}
