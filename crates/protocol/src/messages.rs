//! Chat, notice and weather decoders

use crate::codecs::*;
use crate::error::DecodeError;
use crate::packet_structures::{ChatMessage, ServerMessage};
use muclient_core::ProtocolVersion;

const CHAT_HEADER_LEN: usize = 13;
const SERVER_MESSAGE_HEADER_LEN: usize = 4;
const WEATHER_LEN: usize = 4;

fn decode_chat_line(packet: &[u8], whisper: bool) -> Result<ChatMessage, DecodeError> {
    require_len(packet, CHAT_HEADER_LEN)?;
    Ok(ChatMessage {
        sender: read_fixed_string(packet, 3, 10)?,
        message: read_string_to_end(packet, CHAT_HEADER_LEN)?,
        whisper,
    })
}

/// `C1 len 00 sender[10] message...`
pub fn decode_chat(packet: &[u8], _version: ProtocolVersion) -> Result<ChatMessage, DecodeError> {
    decode_chat_line(packet, false)
}

/// `C1 len 02 sender[10] message...`
pub fn decode_whisper(packet: &[u8], _version: ProtocolVersion) -> Result<ChatMessage, DecodeError> {
    decode_chat_line(packet, true)
}

/// `C1 len 0D type message...`
pub fn decode_server_message(packet: &[u8], _version: ProtocolVersion) -> Result<ServerMessage, DecodeError> {
    require_len(packet, SERVER_MESSAGE_HEADER_LEN)?;
    Ok(ServerMessage {
        kind: read_u8(packet, 3)?,
        message: read_string_to_end(packet, SERVER_MESSAGE_HEADER_LEN)?,
    })
}

/// `C1 04 0F weather`
pub fn decode_weather(packet: &[u8], _version: ProtocolVersion) -> Result<u8, DecodeError> {
    require_len(packet, WEATHER_LEN)?;
    read_u8(packet, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat() {
        let mut packet = vec![0xC1, 0x00, 0x00];
        packet.extend(b"Gandalf\0\0\0");
        packet.extend(b"you shall not pass\0");
        packet[1] = packet.len() as u8;

        let chat = decode_chat(&packet, ProtocolVersion::Season6).unwrap();
        assert_eq!(chat.sender, "Gandalf");
        assert_eq!(chat.message, "you shall not pass");
        assert!(!chat.whisper);
        assert!(decode_whisper(&packet, ProtocolVersion::Season6).unwrap().whisper);
    }

    #[test]
    fn test_server_message_and_weather() {
        let packet = b"\xC1\x09\x0D\x00Hello";
        let notice = decode_server_message(packet, ProtocolVersion::Version075).unwrap();
        assert_eq!(notice.kind, 0);
        assert_eq!(notice.message, "Hello");

        assert_eq!(decode_weather(&[0xC1, 0x04, 0x0F, 0x12], ProtocolVersion::Season6), Ok(0x12));
        assert!(decode_weather(&[0xC1, 0x03, 0x0F], ProtocolVersion::Season6).is_err());
    }
}
