//! Scope and movement decoders
//!
//! Objects enter view range in batches of records. Season 6 appends a
//! variable number of effect bytes to every record, so each record's size
//! is only known after reading its prefix; older generations use fixed
//! records. Records that do not fit in the frame end the batch quietly.

use crate::codecs::*;
use crate::error::DecodeError;
use crate::packet_structures::*;
use muclient_core::{ObjectId, ProtocolVersion, TilePosition};

const BATCH_HEADER_LEN: usize = 5;

const MOVED_LEN: usize = 7;
const WALKED_LEN: usize = 8;
const KILLED_LEN: usize = 9;
const EXPERIENCE_LEN: usize = 9;
const ANIMATION_LEN: usize = 9;
const HIT_STANDARD_LEN: usize = 10;
const HIT_EXTENDED_LEN: usize = 16;
const OUT_OF_SCOPE_HEADER_LEN: usize = 4;
const MAP_CHANGED_LEN: usize = 11;
const MAP_CHANGED_075_LEN: usize = 7;

/// Offsets inside one character record
struct CharacterRecord {
    prefix_len: usize,
    effect_count_at: Option<usize>,
    name_at: usize,
    target_at: usize,
    legacy_class: bool,
}

impl CharacterRecord {
    fn for_version(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::Season6 => Self {
                prefix_len: 36,
                effect_count_at: Some(35),
                name_at: 22,
                target_at: 32,
                legacy_class: false,
            },
            ProtocolVersion::Version097 => Self {
                prefix_len: 36,
                effect_count_at: None,
                name_at: 22,
                target_at: 32,
                legacy_class: false,
            },
            ProtocolVersion::Version075 => Self {
                prefix_len: 26,
                effect_count_at: None,
                name_at: 13,
                target_at: 23,
                legacy_class: true,
            },
        }
    }
}

/// Player characters entering view range
///
/// # Record Format
/// ```text
/// Season 6: id:u16be x y appearance[18] name[10] tx ty rot effect_count effects[n]
/// 0.97:     id:u16be x y appearance[18] name[10] tx ty rot hero
/// 0.75:     id:u16be x y appearance[9]  name[10] tx ty rot
/// ```
pub fn decode_add_characters(packet: &[u8], version: ProtocolVersion) -> Result<Vec<ScopePlayer>, DecodeError> {
    require_len(packet, BATCH_HEADER_LEN)?;
    let count = read_u8(packet, 4)? as usize;
    let layout = CharacterRecord::for_version(version);

    let mut players = Vec::with_capacity(count);
    let mut offset = BATCH_HEADER_LEN;
    for index in 0..count {
        let Some(record) = read_record(packet, offset, layout.prefix_len, layout.effect_count_at) else {
            tracing::debug!("Character scope batch truncated after {} of {} records", index, count);
            break;
        };
        offset += record.len();

        let appearance = read_u8(record, 4)?;
        players.push(ScopePlayer {
            id: ObjectId::from_raw(read_u16_be(record, 0)?),
            position: TilePosition::new(read_u8(record, layout.target_at)?, read_u8(record, layout.target_at + 1)?),
            name: read_fixed_string(record, layout.name_at, 10)?,
            class: if layout.legacy_class {
                appearance >> 4
            } else {
                (appearance >> 3) & 0x1F
            },
        });
    }
    Ok(players)
}

/// Monsters and NPCs entering view range
///
/// # Record Format
/// ```text
/// Season 6: id:u16be type:u16be x y tx ty rot effect_count effects[n]
/// 0.97:     id:u16be type:u16be x y tx ty rot
/// 0.75:     id:u16be type:u8 x y tx ty rot
/// ```
pub fn decode_add_npcs(packet: &[u8], version: ProtocolVersion) -> Result<Vec<ScopeNpc>, DecodeError> {
    require_len(packet, BATCH_HEADER_LEN)?;
    let count = read_u8(packet, 4)? as usize;

    let (prefix_len, effect_count_at, target_at) = match version {
        ProtocolVersion::Season6 => (10, Some(9), 6),
        ProtocolVersion::Version097 => (9, None, 6),
        ProtocolVersion::Version075 => (8, None, 5),
    };

    let mut npcs = Vec::with_capacity(count);
    let mut offset = BATCH_HEADER_LEN;
    for index in 0..count {
        let Some(record) = read_record(packet, offset, prefix_len, effect_count_at) else {
            tracing::debug!("NPC scope batch truncated after {} of {} records", index, count);
            break;
        };
        offset += record.len();

        let type_number = match version {
            ProtocolVersion::Version075 => read_u8(record, 2)? as u16,
            _ => read_u16_be(record, 2)?,
        };
        npcs.push(ScopeNpc {
            id: ObjectId::from_raw(read_u16_be(record, 0)?),
            type_number,
            position: TilePosition::new(read_u8(record, target_at)?, read_u8(record, target_at + 1)?),
        });
    }
    Ok(npcs)
}

/// Id list shared by "out of scope" and "drop removed"
///
/// `C1 len code count ids:u16be[count]`; ids past the frame end are ignored.
pub fn decode_id_list(packet: &[u8], _version: ProtocolVersion) -> Result<Vec<ObjectId>, DecodeError> {
    require_len(packet, OUT_OF_SCOPE_HEADER_LEN)?;
    let count = read_u8(packet, 3)? as usize;

    let mut ids = Vec::with_capacity(count);
    for index in 0..count {
        match read_u16_be(packet, OUT_OF_SCOPE_HEADER_LEN + index * 2) {
            Ok(raw) => ids.push(ObjectId::from_raw(raw)),
            Err(_) => break,
        }
    }
    Ok(ids)
}

/// `C1 08 15 id:u16be x y`
pub fn decode_object_moved(packet: &[u8], _version: ProtocolVersion) -> Result<ObjectMoved, DecodeError> {
    require_len(packet, MOVED_LEN)?;
    Ok(ObjectMoved {
        id: ObjectId::from_raw(read_u16_be(packet, 3)?),
        position: TilePosition::new(read_u8(packet, 5)?, read_u8(packet, 6)?),
    })
}

/// `C1 len D4 id:u16be tx ty (rotation << 4 | steps) directions...`
pub fn decode_object_walked(packet: &[u8], _version: ProtocolVersion) -> Result<ObjectWalked, DecodeError> {
    require_len(packet, WALKED_LEN)?;
    let packed = read_u8(packet, 7)?;
    Ok(ObjectWalked {
        id: ObjectId::from_raw(read_u16_be(packet, 3)?),
        target: TilePosition::new(read_u8(packet, 5)?, read_u8(packet, 6)?),
        rotation: packed >> 4,
        step_count: packed & 0x0F,
    })
}

/// `C1 09 17 killed:u16be skill:u16be killer:u16be`
pub fn decode_object_killed(packet: &[u8], _version: ProtocolVersion) -> Result<ObjectKilled, DecodeError> {
    require_len(packet, KILLED_LEN)?;
    Ok(ObjectKilled {
        killed: ObjectId::from_raw(read_u16_be(packet, 3)?),
        skill: read_u16_be(packet, 5)?,
        killer: ObjectId::from_raw(read_u16_be(packet, 7)?),
    })
}

/// `C1 09 16 killed:u16be experience:u16be damage:u16be`
pub fn decode_experience_gained(packet: &[u8], _version: ProtocolVersion) -> Result<ExperienceGained, DecodeError> {
    require_len(packet, EXPERIENCE_LEN)?;
    Ok(ExperienceGained {
        killed: ObjectId::from_raw(read_u16_be(packet, 3)?),
        experience: read_u16_be(packet, 5)?,
        damage: read_u16_be(packet, 7)?,
    })
}

/// `C1 09 18 id:u16be rotation animation target:u16be`
pub fn decode_object_animation(packet: &[u8], _version: ProtocolVersion) -> Result<ObjectAnimation, DecodeError> {
    require_len(packet, ANIMATION_LEN)?;
    Ok(ObjectAnimation {
        id: ObjectId::from_raw(read_u16_be(packet, 3)?),
        rotation: read_u8(packet, 5)?,
        animation: read_u8(packet, 6)?,
        target: ObjectId::from_raw(read_u16_be(packet, 7)?),
    })
}

/// Damage dealt to an object
///
/// # Packet Format
/// ```text
/// Standard: C1 0A 11 id:u16be health:u16be kind shield:u16be
/// Extended: C1 10 11 id:u16be kind pad[2] health:u32le shield:u32le
/// ```
pub fn decode_object_hit(packet: &[u8], version: ProtocolVersion) -> Result<ObjectHit, DecodeError> {
    let id = |packet: &[u8]| read_u16_be(packet, 3).map(ObjectId::from_raw);
    match select_layout(packet, version, HIT_STANDARD_LEN, HIT_EXTENDED_LEN)? {
        Layout::Standard => Ok(ObjectHit {
            id: id(packet)?,
            health_damage: read_u16_be(packet, 5)? as u32,
            kind: read_u8(packet, 7)?,
            shield_damage: read_u16_be(packet, 8)? as u32,
        }),
        Layout::Extended => Ok(ObjectHit {
            id: id(packet)?,
            kind: read_u8(packet, 5)?,
            health_damage: read_u32_le(packet, 8)?,
            shield_damage: read_u32_le(packet, 12)?,
        }),
    }
}

/// Map change or teleport
///
/// # Packet Format
/// ```text
/// Season 6, 0.97: C3 0B 1C 0F is_map_change pad map:u16le x y rotation
/// 0.75:           C3 07 1C map x y rotation
/// ```
pub fn decode_map_changed(packet: &[u8], version: ProtocolVersion) -> Result<MapChanged, DecodeError> {
    match version {
        ProtocolVersion::Season6 | ProtocolVersion::Version097 => {
            require_len(packet, MAP_CHANGED_LEN)?;
            Ok(MapChanged {
                is_map_change: read_u8(packet, 4)? != 0,
                map: read_u16_le(packet, 6)?,
                position: TilePosition::new(read_u8(packet, 8)?, read_u8(packet, 9)?),
                rotation: read_u8(packet, 10)?,
            })
        }
        ProtocolVersion::Version075 => {
            require_len(packet, MAP_CHANGED_075_LEN)?;
            Ok(MapChanged {
                is_map_change: true,
                map: read_u8(packet, 3)? as u16,
                position: TilePosition::new(read_u8(packet, 4)?, read_u8(packet, 5)?),
                rotation: read_u8(packet, 6)?,
            })
        }
    }
}
