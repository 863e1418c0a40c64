//! # Decoded Packet Structures
//!
//! Normalized results of the inbound decoders. Every structure here is the
//! same whatever wire generation produced it: version differences end at the
//! decoder. Values absent from older generations (shield, ability, master
//! levels) come out as zero.

use muclient_core::{ObjectId, TilePosition};

// ============================================================================
// CONNECT SERVER
// ============================================================================

/// One entry of the connect server's game server list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerEntry {
    pub server_id: u16,
    /// Load in percent; 0xFF means the server is preparing/offline
    pub load: u8,
}

/// Address of the selected game server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
}

// ============================================================================
// SESSION
// ============================================================================

/// Greeting of a game server after the TCP handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameServerEntered {
    pub success: bool,
    pub player_id: ObjectId,
    pub server_version: String,
}

/// Answer to the login request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    InvalidPassword,
    Ok,
    AccountInvalid,
    AccountAlreadyConnected,
    ServerFull,
    AccountBlocked,
    WrongVersion,
    ConnectionError,
    TooManyFailedAttempts,
    NoPayment,
    Other(u8),
}

impl LoginResult {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::InvalidPassword,
            1 => Self::Ok,
            2 => Self::AccountInvalid,
            3 => Self::AccountAlreadyConnected,
            4 => Self::ServerFull,
            5 => Self::AccountBlocked,
            6 => Self::WrongVersion,
            7 => Self::ConnectionError,
            8 => Self::TooManyFailedAttempts,
            9 => Self::NoPayment,
            other => Self::Other(other),
        }
    }
}

/// Where the server sends the client after a logout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutType {
    CloseGame,
    BackToCharacterSelection,
    BackToServerSelection,
    Other(u8),
}

impl LogoutType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::CloseGame,
            1 => Self::BackToCharacterSelection,
            2 => Self::BackToServerSelection,
            other => Self::Other(other),
        }
    }
}

// ============================================================================
// CHARACTER
// ============================================================================

/// One slot of the character selection screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSummary {
    pub slot: u8,
    pub name: String,
    pub level: u16,
    pub status: u8,
    /// Class code extracted from the appearance bytes
    pub class: u8,
}

/// Primary attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacterStats {
    pub strength: u16,
    pub agility: u16,
    pub vitality: u16,
    pub energy: u16,
    pub leadership: u16,
}

/// Current and maximum values of the four vitals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vitals {
    pub health: u32,
    pub maximum_health: u32,
    pub shield: u32,
    pub maximum_shield: u32,
    pub mana: u32,
    pub maximum_mana: u32,
    pub ability: u32,
    pub maximum_ability: u32,
}

/// Full character snapshot sent when entering the world
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterInformation {
    pub position: TilePosition,
    pub map: u16,
    pub experience: u64,
    pub next_experience: u64,
    pub level_up_points: u16,
    pub stats: CharacterStats,
    pub vitals: Vitals,
    pub money: u32,
}

/// Character placed back on a map after dying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespawnAfterDeath {
    pub position: TilePosition,
    pub map: u16,
    pub direction: u8,
    pub health: u32,
    pub mana: u32,
    pub shield: u32,
    pub ability: u32,
    pub experience: u64,
    pub money: u32,
}

/// Level up notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUpdate {
    pub level: u16,
    pub level_up_points: u16,
    pub maximum_health: u32,
    pub maximum_mana: u32,
    pub maximum_shield: u32,
    pub maximum_ability: u32,
}

/// Attribute addressed by a stat increase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatAttribute {
    Strength,
    Agility,
    Vitality,
    Energy,
    Leadership,
    Unknown(u8),
}

impl StatAttribute {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Strength,
            1 => Self::Agility,
            2 => Self::Vitality,
            3 => Self::Energy,
            4 => Self::Leadership,
            other => Self::Unknown(other),
        }
    }
}

/// Answer to a stat point request
///
/// `dependent_maximum` is the new maximum health for vitality and the new
/// maximum mana for energy; zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatIncreaseResult {
    pub success: bool,
    pub attribute: StatAttribute,
    pub dependent_maximum: u32,
    pub maximum_shield: u32,
    pub maximum_ability: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillEntry {
    pub slot: u8,
    pub number: u16,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillUpdate {
    Added(SkillEntry),
    Removed(SkillEntry),
    /// Complete replacement of the skill list
    List(Vec<SkillEntry>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterStats {
    pub master_level: u16,
    pub master_experience: u64,
    pub next_master_experience: u64,
    pub master_points: u16,
    pub maximum_health: u32,
    pub maximum_mana: u32,
    pub maximum_shield: u32,
    pub maximum_ability: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterLevelUpdate {
    pub master_level: u16,
    pub gained_points: u16,
    pub master_points: u16,
    pub maximum_master_points: u16,
    pub maximum_health: u32,
    pub maximum_mana: u32,
    pub maximum_shield: u32,
    pub maximum_ability: u32,
}

// ============================================================================
// VITALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthShield {
    pub health: u32,
    pub shield: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManaAbility {
    pub mana: u32,
    pub ability: u32,
}

// ============================================================================
// SCOPE & MOVEMENT
// ============================================================================

/// Player character entering view range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePlayer {
    pub id: ObjectId,
    /// Tile the character is heading to (equals its tile when standing)
    pub position: TilePosition,
    pub name: String,
    pub class: u8,
}

/// Monster or NPC entering view range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeNpc {
    pub id: ObjectId,
    pub type_number: u16,
    pub position: TilePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMoved {
    pub id: ObjectId,
    pub position: TilePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectWalked {
    pub id: ObjectId,
    pub target: TilePosition,
    pub rotation: u8,
    pub step_count: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectKilled {
    pub killed: ObjectId,
    pub skill: u16,
    pub killer: ObjectId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperienceGained {
    pub killed: ObjectId,
    pub experience: u16,
    pub damage: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectAnimation {
    pub id: ObjectId,
    pub rotation: u8,
    pub animation: u8,
    pub target: ObjectId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHit {
    pub id: ObjectId,
    pub health_damage: u32,
    pub shield_damage: u32,
    pub kind: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapChanged {
    /// `false` for a teleport inside the current map
    pub is_map_change: bool,
    pub map: u16,
    pub position: TilePosition,
    pub rotation: u8,
}

// ============================================================================
// ITEMS
// ============================================================================

/// Item identity extracted from the raw item data bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemInfo {
    pub group: u8,
    pub index: u8,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DroppedKind {
    Money { amount: u32 },
    Item { info: ItemInfo, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedItem {
    pub id: ObjectId,
    pub position: TilePosition,
    pub kind: DroppedKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickupResult {
    Failed,
    Money { amount: u32 },
    Item { slot: u8, data: Vec<u8> },
}

// ============================================================================
// MESSAGES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub message: String,
    pub whisper: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    pub kind: u8,
    pub message: String,
}
