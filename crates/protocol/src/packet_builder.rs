//! # Packet Builder
//!
//! Builders for every request the client sends. Each function appends one
//! complete frame (header and length included) to `buf`.
//!
//! ## Usage
//!
//! ```rust
//! use muclient_protocol::packet_builder::*;
//! use bytes::BytesMut;
//!
//! let mut buf = BytesMut::new();
//! build_server_list_request(&mut buf);
//! assert_eq!(&buf[..], &[0xC1, 0x04, 0xF4, 0x06]);
//! ```

use crate::codecs::{write_fixed_string, xor3};
use crate::frame::HeaderType;
use crate::packets::{request_codes, sub_codes};
use bytes::{BufMut, BytesMut};
use muclient_core::{ProtocolVersion, TilePosition};

/// Most steps one walk request can carry (4-bit step count)
pub const MAX_WALK_STEPS: usize = 15;

const USERNAME_LEN: usize = 10;
const PASSWORD_LEN_S6: usize = 20;
const PASSWORD_LEN_LEGACY: usize = 10;
const CLIENT_VERSION_LEN: usize = 5;
const CLIENT_SERIAL_LEN: usize = 16;
const CHARACTER_NAME_LEN: usize = 10;

/// Append the header of a short (C1/C3) frame with a precomputed length
fn put_short_header(buf: &mut BytesMut, header: HeaderType, len: usize, code: u8) {
    buf.put_u8(header as u8);
    buf.put_u8(len as u8);
    buf.put_u8(code);
}

/// Request the game server list
///
/// # Packet Format
/// ```text
/// C1 04 F4 06
/// ```
pub fn build_server_list_request(buf: &mut BytesMut) {
    put_short_header(buf, HeaderType::C1, 4, request_codes::SERVER_INFO);
    buf.put_u8(sub_codes::SERVER_LIST);
}

/// Request the address of one game server
///
/// # Packet Format
/// ```text
/// C1 06 F4 03 server_id:u16le
/// ```
pub fn build_connection_info_request(buf: &mut BytesMut, server_id: u16) {
    put_short_header(buf, HeaderType::C1, 6, request_codes::SERVER_INFO);
    buf.put_u8(sub_codes::CONNECTION_INFO);
    buf.put_u16_le(server_id);
}

/// Credentials and client identification
#[derive(Debug, Clone)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub tick_count: u32,
    pub client_version: &'a str,
    pub client_serial: &'a str,
}

/// Log in to the game server
///
/// # Packet Format
/// ```text
/// Season 6:  C3 3B F1 01 user[10] pass[20] tick:u32be version[5] serial[16]
/// 0.97/0.75: C3 31 F1 01 user[10] pass[10] tick:u32be version[5] serial[16]
/// ```
///
/// User name and password are Xor3-obfuscated.
pub fn build_login_request(buf: &mut BytesMut, version: ProtocolVersion, request: &LoginRequest<'_>) {
    let password_len = match version {
        ProtocolVersion::Season6 => PASSWORD_LEN_S6,
        ProtocolVersion::Version097 | ProtocolVersion::Version075 => PASSWORD_LEN_LEGACY,
    };
    let len = 4 + USERNAME_LEN + password_len + 4 + CLIENT_VERSION_LEN + CLIENT_SERIAL_LEN;

    put_short_header(buf, HeaderType::C3, len, request_codes::SESSION);
    buf.put_u8(sub_codes::LOGIN);

    let mut field = BytesMut::with_capacity(password_len);
    write_fixed_string(&mut field, request.username, USERNAME_LEN);
    xor3(&mut field);
    buf.put_slice(&field);

    field.clear();
    write_fixed_string(&mut field, request.password, password_len);
    xor3(&mut field);
    buf.put_slice(&field);

    buf.put_u32(request.tick_count);
    write_fixed_string(buf, request.client_version, CLIENT_VERSION_LEN);
    write_fixed_string(buf, request.client_serial, CLIENT_SERIAL_LEN);
}

/// `C1 04 F3 00`
pub fn build_character_list_request(buf: &mut BytesMut) {
    put_short_header(buf, HeaderType::C1, 4, request_codes::CHARACTER);
    buf.put_u8(sub_codes::CHARACTER_LIST);
}

/// `C1 0E F3 03 name[10]`
pub fn build_select_character_request(buf: &mut BytesMut, name: &str) {
    put_short_header(buf, HeaderType::C1, 4 + CHARACTER_NAME_LEN, request_codes::CHARACTER);
    buf.put_u8(sub_codes::CHARACTER_INFORMATION);
    write_fixed_string(buf, name, CHARACTER_NAME_LEN);
}

/// `C1 05 F1 02 type`
pub fn build_logout_request(buf: &mut BytesMut, logout_type: u8) {
    put_short_header(buf, HeaderType::C1, 5, request_codes::SESSION);
    buf.put_u8(sub_codes::LOGOUT);
    buf.put_u8(logout_type);
}

/// Ask to be placed on a tile directly
///
/// # Packet Format
/// ```text
/// C1 05 15 x y
/// ```
pub fn build_instant_move_request(buf: &mut BytesMut, target: TilePosition) {
    put_short_header(buf, HeaderType::C1, 5, request_codes::INSTANT_MOVE);
    buf.put_u8(target.x);
    buf.put_u8(target.y);
}

/// Walk from `source` along `directions` (server direction codes)
///
/// # Packet Format
/// ```text
/// C1 len D4 x y (rotation << 4 | steps) directions[(steps + 1) / 2]
/// ```
///
/// Two directions per byte, high nibble first. The final facing is the last
/// step's direction. Anything beyond [`MAX_WALK_STEPS`] is cut off.
pub fn build_walk_request(buf: &mut BytesMut, source: TilePosition, directions: &[u8]) {
    let directions = &directions[..directions.len().min(MAX_WALK_STEPS)];
    let packed_len = directions.len().div_ceil(2);
    let rotation = directions.last().copied().unwrap_or(0) & 0x0F;

    put_short_header(buf, HeaderType::C1, 6 + packed_len, request_codes::WALK);
    buf.put_u8(source.x);
    buf.put_u8(source.y);
    buf.put_u8((rotation << 4) | directions.len() as u8);
    for pair in directions.chunks(2) {
        let high = pair[0] & 0x0F;
        let low = pair.get(1).copied().unwrap_or(0) & 0x0F;
        buf.put_u8((high << 4) | low);
    }
}

/// Pick up a ground item; `raw_id` is echoed exactly as the server sent it
///
/// # Packet Format
/// ```text
/// C1 05 22 id:u16be
/// ```
pub fn build_pickup_request(buf: &mut BytesMut, raw_id: u16) {
    put_short_header(buf, HeaderType::C1, 5, request_codes::PICKUP_ITEM);
    buf.put_u16(raw_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::XOR3_KEY;

    #[test]
    fn test_connect_server_requests() {
        let mut buf = BytesMut::new();
        build_server_list_request(&mut buf);
        build_connection_info_request(&mut buf, 0x0102);
        assert_eq!(&buf[..], &[0xC1, 0x04, 0xF4, 0x06, 0xC1, 0x06, 0xF4, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_login_request_s6() {
        let mut buf = BytesMut::new();
        let request = LoginRequest {
            username: "user",
            password: "pass",
            tick_count: 1,
            client_version: "10404",
            client_serial: "k1Pk2jcET48mxL3b",
        };
        build_login_request(&mut buf, ProtocolVersion::Season6, &request);

        assert_eq!(buf.len(), 59);
        assert_eq!(&buf[..4], &[0xC3, 59, 0xF1, 0x01]);
        assert_eq!(buf[4], b'u' ^ XOR3_KEY[0]);
        // padding bytes are obfuscated too
        assert_eq!(buf[8], XOR3_KEY[1]);
        assert_eq!(buf[14], b'p' ^ XOR3_KEY[0]);
        assert_eq!(&buf[34..38], &[0, 0, 0, 1]);
        assert_eq!(&buf[38..43], b"10404");
        assert_eq!(&buf[43..59], b"k1Pk2jcET48mxL3b");
    }

    #[test]
    fn test_login_request_legacy_is_shorter() {
        let mut buf = BytesMut::new();
        let request = LoginRequest {
            username: "user",
            password: "pass",
            tick_count: 0,
            client_version: "07502",
            client_serial: "",
        };
        build_login_request(&mut buf, ProtocolVersion::Version075, &request);
        assert_eq!(buf.len(), 49);
        assert_eq!(buf[1], 49);
    }

    #[test]
    fn test_character_requests() {
        let mut buf = BytesMut::new();
        build_character_list_request(&mut buf);
        assert_eq!(&buf[..], &[0xC1, 0x04, 0xF3, 0x00]);

        buf.clear();
        build_select_character_request(&mut buf, "Hero");
        assert_eq!(buf.len(), 14);
        assert_eq!(&buf[..8], &[0xC1, 0x0E, 0xF3, 0x03, b'H', b'e', b'r', b'o']);
        assert!(buf[8..].iter().all(|b| *b == 0));

        buf.clear();
        build_logout_request(&mut buf, 1);
        assert_eq!(&buf[..], &[0xC1, 0x05, 0xF1, 0x02, 0x01]);
    }

    #[test]
    fn test_walk_request_packs_directions() {
        let mut buf = BytesMut::new();
        build_walk_request(&mut buf, TilePosition::new(10, 20), &[4, 4, 5]);
        assert_eq!(&buf[..], &[0xC1, 0x08, 0xD4, 10, 20, 0x53, 0x44, 0x50]);
    }

    #[test]
    fn test_walk_request_caps_steps() {
        let mut buf = BytesMut::new();
        build_walk_request(&mut buf, TilePosition::new(0, 0), &[1u8; 20]);
        assert_eq!(buf[5] & 0x0F, 15);
        assert_eq!(buf.len(), 6 + 8);
        assert_eq!(buf[1] as usize, buf.len());
    }

    #[test]
    fn test_move_and_pickup() {
        let mut buf = BytesMut::new();
        build_instant_move_request(&mut buf, TilePosition::new(7, 9));
        build_pickup_request(&mut buf, 0x8044);
        assert_eq!(&buf[..], &[0xC1, 0x05, 0x15, 7, 9, 0xC1, 0x05, 0x22, 0x80, 0x44]);
    }
}
