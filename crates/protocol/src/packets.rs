//! # MU Protocol Packet Codes
//!
//! Operation codes for both servers the client talks to.
//!
//! ## Addressing
//!
//! A packet is identified by its code byte plus, for codes listed in the
//! sub-code tables below, a second selector byte. Handlers are keyed on
//! `(code, sub-code)` where codes without a selector use "no sub-code".
//!
//! ## Servers
//!
//! - **Connect Server**: hands out the game server list and the address of
//!   the chosen game server. Only C1/C2 frames.
//! - **Game Server**: everything else. C1 to C4 frames.
//!
//! Inbound and outbound codes overlap (0x15 is both "object moved" and the
//! instant move request); direction decides the meaning.

/// Codes sent by a game server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GameServerCode {
    /// Public chat line from a nearby player
    ///
    /// # Packet Format
    /// ```text
    /// C1 len 00 name[10] message...
    /// ```
    ChatMessage = 0x00,

    /// Whisper addressed to this character
    WhisperMessage = 0x02,

    /// Golden/blue system notice
    ///
    /// # Packet Format
    /// ```text
    /// C1 len 0D type message...
    /// ```
    ServerMessage = 0x0D,

    /// Weather change, usually filtered
    WeatherUpdate = 0x0F,

    /// Damage dealt to an object; standard and extended layouts
    ObjectHit = 0x11,

    /// Player characters entering view range (variable-size records)
    AddCharactersToScope = 0x12,

    /// Monsters and NPCs entering view range
    AddNpcsToScope = 0x13,

    /// Objects leaving view range
    MapObjectOutOfScope = 0x14,

    /// Object placed on a tile without walking (teleport, knock-back)
    ObjectMoved = 0x15,

    /// Experience reward for a kill
    ExperienceGained = 0x16,

    /// An object died
    ObjectGotKilled = 0x17,

    /// Rotation/animation change
    ObjectAnimation = 0x18,

    /// Map change or in-map teleport
    ///
    /// Season 6 and 0.97 carry sub-code 0x0F; 0.75 does not, so the handler
    /// is registered without a sub-code and reached through fallback.
    MapChanged = 0x1C,

    /// Items and money appearing on the ground
    ItemsDropped = 0x20,

    /// Ground items disappearing
    ItemDropRemoved = 0x21,

    /// Answer to a pickup request
    ItemPickupResult = 0x22,

    /// Health and shield, current (0xFF) or maximum (0xFE)
    HealthShield = 0x26,

    /// Mana and ability, current (0xFF) or maximum (0xFE)
    ManaAbility = 0x27,

    /// Walk animation towards a target tile
    ObjectWalked = 0xD4,

    /// Session group: entered, login, logout
    Session = 0xF1,

    /// Character group: list, information, level, stats, skills
    Character = 0xF3,
}

impl GameServerCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::ChatMessage),
            0x02 => Some(Self::WhisperMessage),
            0x0D => Some(Self::ServerMessage),
            0x0F => Some(Self::WeatherUpdate),
            0x11 => Some(Self::ObjectHit),
            0x12 => Some(Self::AddCharactersToScope),
            0x13 => Some(Self::AddNpcsToScope),
            0x14 => Some(Self::MapObjectOutOfScope),
            0x15 => Some(Self::ObjectMoved),
            0x16 => Some(Self::ExperienceGained),
            0x17 => Some(Self::ObjectGotKilled),
            0x18 => Some(Self::ObjectAnimation),
            0x1C => Some(Self::MapChanged),
            0x20 => Some(Self::ItemsDropped),
            0x21 => Some(Self::ItemDropRemoved),
            0x22 => Some(Self::ItemPickupResult),
            0x26 => Some(Self::HealthShield),
            0x27 => Some(Self::ManaAbility),
            0xD4 => Some(Self::ObjectWalked),
            0xF1 => Some(Self::Session),
            0xF3 => Some(Self::Character),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Codes sent by the connect server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectServerCode {
    /// Greeting right after the TCP handshake (`C1 04 00 01`)
    Hello = 0x00,

    /// Server list and connection info group
    ServerInfo = 0xF4,
}

impl ConnectServerCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Hello),
            0xF4 => Some(Self::ServerInfo),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Selector bytes, grouped by the code they belong to
pub mod sub_codes {
    pub const HELLO: u8 = 0x01;

    pub const CONNECTION_INFO: u8 = 0x03;
    pub const SERVER_LIST: u8 = 0x06;

    pub const GAME_SERVER_ENTERED: u8 = 0x00;
    pub const LOGIN: u8 = 0x01;
    pub const LOGOUT: u8 = 0x02;

    pub const CHARACTER_LIST: u8 = 0x00;
    pub const CHARACTER_INFORMATION: u8 = 0x03;
    pub const RESPAWN_AFTER_DEATH: u8 = 0x04;
    pub const LEVEL_UPDATE: u8 = 0x05;
    pub const STAT_INCREASE_RESULT: u8 = 0x06;
    pub const SKILL_LIST: u8 = 0x11;
    pub const MASTER_STATS: u8 = 0x50;
    pub const MASTER_LEVEL_UPDATE: u8 = 0x51;

    pub const CURRENT: u8 = 0xFF;
    pub const MAXIMUM: u8 = 0xFE;

    pub const MAP_CHANGED: u8 = 0x0F;
}

/// Codes the client sends
pub mod request_codes {
    pub const SERVER_INFO: u8 = 0xF4;
    pub const SESSION: u8 = 0xF1;
    pub const CHARACTER: u8 = 0xF3;
    pub const INSTANT_MOVE: u8 = 0x15;
    pub const WALK: u8 = 0xD4;
    pub const PICKUP_ITEM: u8 = 0x22;
}

/// Game server codes whose frames carry a sub-code after the code byte
///
/// Fixed and version independent. 0x1C is listed even though 0.75 map
/// changes lack the selector; the fallback lookup covers that case.
pub const GAME_SERVER_SUB_CODES: [u8; 20] = [
    0x1C, 0x26, 0x27, 0x2C, 0x4A, 0x4C, 0x4D, 0x4E, 0xA3, 0xAA, 0xAF, 0xBF, 0xD0, 0xEC, 0xF1,
    0xF3, 0xF6, 0xF7, 0xF8, 0xFA,
];

/// Connect server codes whose frames carry a sub-code
pub const CONNECT_SERVER_SUB_CODES: [u8; 3] = [0x00, 0x05, 0xF4];

#[inline]
pub fn game_server_has_sub_code(code: u8) -> bool {
    GAME_SERVER_SUB_CODES.contains(&code)
}

#[inline]
pub fn connect_server_has_sub_code(code: u8) -> bool {
    CONNECT_SERVER_SUB_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_code_roundtrip() {
        for value in 0..=255u8 {
            if let Some(code) = GameServerCode::from_u8(value) {
                assert_eq!(code.as_u8(), value);
            }
        }
        assert_eq!(GameServerCode::from_u8(0xD4), Some(GameServerCode::ObjectWalked));
        assert_eq!(GameServerCode::from_u8(0x99), None);
    }

    #[test]
    fn test_sub_code_tables_are_separate() {
        assert!(game_server_has_sub_code(0xF3));
        assert!(game_server_has_sub_code(0x1C));
        assert!(!game_server_has_sub_code(0x00));
        assert!(!game_server_has_sub_code(0xD4));

        assert!(connect_server_has_sub_code(0x00));
        assert!(connect_server_has_sub_code(0xF4));
        assert!(!connect_server_has_sub_code(0xF3));
    }
}
