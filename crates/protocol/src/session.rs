//! Game server session decoders: greeting, login, logout, character list

use crate::codecs::*;
use crate::error::DecodeError;
use crate::packet_structures::{CharacterSummary, GameServerEntered, LoginResult, LogoutType};
use muclient_core::{ObjectId, ProtocolVersion};

const ENTERED_LEN: usize = 12;
const LOGIN_RESULT_LEN: usize = 5;
const LOGOUT_LEN: usize = 5;

/// `C1 0C F1 00 result player_id:u16be version[5]`
pub fn decode_game_server_entered(packet: &[u8], _version: ProtocolVersion) -> Result<GameServerEntered, DecodeError> {
    require_len(packet, ENTERED_LEN)?;
    Ok(GameServerEntered {
        success: read_u8(packet, 4)? == 1,
        player_id: ObjectId::from_raw(read_u16_be(packet, 5)?),
        server_version: read_fixed_string(packet, 7, 5)?,
    })
}

/// `C1 05 F1 01 result`
pub fn decode_login_result(packet: &[u8], _version: ProtocolVersion) -> Result<LoginResult, DecodeError> {
    require_len(packet, LOGIN_RESULT_LEN)?;
    Ok(LoginResult::from_u8(read_u8(packet, 4)?))
}

/// `C1 05 F1 02 type`
pub fn decode_logout(packet: &[u8], _version: ProtocolVersion) -> Result<LogoutType, DecodeError> {
    require_len(packet, LOGOUT_LEN)?;
    Ok(LogoutType::from_u8(read_u8(packet, 4)?))
}

/// Character list layout per generation
struct CharacterListLayout {
    header_len: usize,
    count_offset: usize,
    record_len: usize,
    legacy_class: bool,
}

impl CharacterListLayout {
    fn for_version(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::Season6 => Self {
                header_len: 8,
                count_offset: 6,
                record_len: 34,
                legacy_class: false,
            },
            ProtocolVersion::Version097 => Self {
                header_len: 6,
                count_offset: 4,
                record_len: 34,
                legacy_class: false,
            },
            ProtocolVersion::Version075 => Self {
                header_len: 5,
                count_offset: 4,
                record_len: 26,
                legacy_class: true,
            },
        }
    }
}

/// Characters on the account, in slot order as sent
///
/// # Record Format
/// ```text
/// slot name[10] pad level:u16le status appearance[18 | 9] ...
/// ```
///
/// Season 6 and 0.97 share the 34-byte record, 0.75 uses 26 bytes with a
/// shorter appearance block. Records cut off by the frame end are dropped.
pub fn decode_character_list(packet: &[u8], version: ProtocolVersion) -> Result<Vec<CharacterSummary>, DecodeError> {
    let layout = CharacterListLayout::for_version(version);
    require_len(packet, layout.header_len)?;
    let count = read_u8(packet, layout.count_offset)? as usize;

    let mut characters = Vec::with_capacity(count);
    for index in 0..count {
        let offset = layout.header_len + index * layout.record_len;
        let Ok(record) = read_bytes(packet, offset, layout.record_len) else {
            tracing::debug!("Character list truncated after {} of {} records", index, count);
            break;
        };
        let appearance = record[15];
        let class = if layout.legacy_class {
            appearance >> 4
        } else {
            (appearance >> 3) & 0x1F
        };
        characters.push(CharacterSummary {
            slot: record[0],
            name: read_fixed_string(record, 1, 10)?,
            level: read_u16_le(record, 12)?,
            status: record[14],
            class,
        });
    }
    Ok(characters)
}
