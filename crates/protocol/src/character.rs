//! Character group decoders (code 0xF3)
//!
//! Character information and respawn differ per generation; level, stat and
//! master updates come in a Standard (u16) and an Extended (u32) size told
//! apart by frame length.

use crate::codecs::*;
use crate::error::DecodeError;
use crate::packet_structures::*;
use muclient_core::{ProtocolVersion, TilePosition};

const INFO_S6_STANDARD_LEN: usize = 72;
const INFO_S6_EXTENDED_LEN: usize = 84;
const INFO_097_LEN: usize = 48;
const INFO_075_LEN: usize = 42;

const RESPAWN_STANDARD_LEN: usize = 28;
const RESPAWN_EXTENDED_LEN: usize = 36;
const RESPAWN_LEGACY_LEN: usize = 20;

const LEVEL_STANDARD_LEN: usize = 24;
const LEVEL_EXTENDED_LEN: usize = 32;

const STAT_STANDARD_LEN: usize = 12;
const STAT_EXTENDED_LEN: usize = 20;

const MASTER_STATS_STANDARD_LEN: usize = 32;
const MASTER_STATS_EXTENDED_LEN: usize = 40;

const MASTER_LEVEL_STANDARD_LEN: usize = 20;
const MASTER_LEVEL_EXTENDED_LEN: usize = 28;

const SKILL_HEADER_LEN: usize = 5;
const SKILL_ADDED: u8 = 0xFE;
const SKILL_REMOVED: u8 = 0xFF;

/// Character snapshot sent after selecting a character
///
/// # Packet Format (Season 6, Extended)
/// ```text
/// C3 len F3 03 x y map:u16le exp:u64be next:u64be points:u16le
///   str agi vit ene cmd (u16le) hp maxHp mana maxMana sd maxSd ag maxAg (u32le)
///   money:u32le ...
/// ```
pub fn decode_character_information(
    packet: &[u8],
    version: ProtocolVersion,
) -> Result<CharacterInformation, DecodeError> {
    match version {
        ProtocolVersion::Season6 => {
            match select_layout(packet, version, INFO_S6_STANDARD_LEN, INFO_S6_EXTENDED_LEN)? {
                Layout::Extended => decode_information_s6_extended(packet),
                Layout::Standard => decode_information_s6_standard(packet),
            }
        }
        ProtocolVersion::Version097 => decode_information_legacy(packet, INFO_097_LEN, true),
        ProtocolVersion::Version075 => decode_information_legacy(packet, INFO_075_LEN, false),
    }
}

fn decode_information_s6_extended(packet: &[u8]) -> Result<CharacterInformation, DecodeError> {
    Ok(CharacterInformation {
        position: TilePosition::new(read_u8(packet, 4)?, read_u8(packet, 5)?),
        map: read_u16_le(packet, 6)?,
        experience: read_u64_be(packet, 8)?,
        next_experience: read_u64_be(packet, 16)?,
        level_up_points: read_u16_le(packet, 24)?,
        stats: CharacterStats {
            strength: read_u16_le(packet, 26)?,
            agility: read_u16_le(packet, 28)?,
            vitality: read_u16_le(packet, 30)?,
            energy: read_u16_le(packet, 32)?,
            leadership: read_u16_le(packet, 34)?,
        },
        vitals: Vitals {
            health: read_u32_le(packet, 36)?,
            maximum_health: read_u32_le(packet, 40)?,
            mana: read_u32_le(packet, 44)?,
            maximum_mana: read_u32_le(packet, 48)?,
            shield: read_u32_le(packet, 52)?,
            maximum_shield: read_u32_le(packet, 56)?,
            ability: read_u32_le(packet, 60)?,
            maximum_ability: read_u32_le(packet, 64)?,
        },
        money: read_u32_le(packet, 68)?,
    })
}

fn decode_information_s6_standard(packet: &[u8]) -> Result<CharacterInformation, DecodeError> {
    Ok(CharacterInformation {
        position: TilePosition::new(read_u8(packet, 4)?, read_u8(packet, 5)?),
        map: read_u16_le(packet, 6)?,
        experience: read_u64_be(packet, 8)?,
        next_experience: read_u64_be(packet, 16)?,
        level_up_points: read_u16_le(packet, 24)?,
        stats: CharacterStats {
            strength: read_u16_le(packet, 26)?,
            agility: read_u16_le(packet, 28)?,
            vitality: read_u16_le(packet, 30)?,
            energy: read_u16_le(packet, 32)?,
            leadership: read_u16_le(packet, 62)?,
        },
        vitals: Vitals {
            health: read_u16_le(packet, 34)? as u32,
            maximum_health: read_u16_le(packet, 36)? as u32,
            mana: read_u16_le(packet, 38)? as u32,
            maximum_mana: read_u16_le(packet, 40)? as u32,
            shield: read_u16_le(packet, 42)? as u32,
            maximum_shield: read_u16_le(packet, 44)? as u32,
            ability: read_u16_le(packet, 46)? as u32,
            maximum_ability: read_u16_le(packet, 48)? as u32,
        },
        money: read_u32_le(packet, 52)?,
    })
}

/// 0.97 and 0.75: one-byte map number, u32 experience, no shield.
/// 0.75 has no ability either and moves money forward.
fn decode_information_legacy(
    packet: &[u8],
    minimum: usize,
    has_ability: bool,
) -> Result<CharacterInformation, DecodeError> {
    require_len(packet, minimum)?;

    let (ability, maximum_ability, money_offset) = if has_ability {
        (read_u16_le(packet, 34)? as u32, read_u16_le(packet, 36)? as u32, 40)
    } else {
        (0, 0, 36)
    };

    Ok(CharacterInformation {
        position: TilePosition::new(read_u8(packet, 4)?, read_u8(packet, 5)?),
        map: read_u8(packet, 6)? as u16,
        experience: read_u32_be(packet, 8)? as u64,
        next_experience: read_u32_be(packet, 12)? as u64,
        level_up_points: read_u16_le(packet, 16)?,
        stats: CharacterStats {
            strength: read_u16_le(packet, 18)?,
            agility: read_u16_le(packet, 20)?,
            vitality: read_u16_le(packet, 22)?,
            energy: read_u16_le(packet, 24)?,
            leadership: 0,
        },
        vitals: Vitals {
            health: read_u16_le(packet, 26)? as u32,
            maximum_health: read_u16_le(packet, 28)? as u32,
            mana: read_u16_le(packet, 30)? as u32,
            maximum_mana: read_u16_le(packet, 32)? as u32,
            shield: 0,
            maximum_shield: 0,
            ability,
            maximum_ability,
        },
        money: read_u32_le(packet, money_offset)?,
    })
}

/// Respawn after death
///
/// Season 6 selects Standard/Extended by length; 0.97 and 0.75 share one
/// legacy layout without shield and ability.
pub fn decode_respawn(packet: &[u8], version: ProtocolVersion) -> Result<RespawnAfterDeath, DecodeError> {
    let position = |packet: &[u8]| -> Result<TilePosition, DecodeError> {
        Ok(TilePosition::new(read_u8(packet, 4)?, read_u8(packet, 5)?))
    };

    if version < ProtocolVersion::Season6 {
        require_len(packet, RESPAWN_LEGACY_LEN)?;
        return Ok(RespawnAfterDeath {
            position: position(packet)?,
            map: read_u8(packet, 6)? as u16,
            direction: read_u8(packet, 7)?,
            health: read_u16_le(packet, 8)? as u32,
            mana: read_u16_le(packet, 10)? as u32,
            shield: 0,
            ability: 0,
            experience: read_u32_be(packet, 12)? as u64,
            money: read_u32_le(packet, 16)?,
        });
    }

    match select_layout(packet, version, RESPAWN_STANDARD_LEN, RESPAWN_EXTENDED_LEN)? {
        Layout::Extended => Ok(RespawnAfterDeath {
            position: position(packet)?,
            map: read_u8(packet, 6)? as u16,
            direction: read_u8(packet, 7)?,
            health: read_u32_le(packet, 8)?,
            mana: read_u32_le(packet, 12)?,
            shield: read_u32_le(packet, 16)?,
            ability: read_u32_le(packet, 20)?,
            experience: read_u64_be(packet, 24)?,
            money: read_u32_le(packet, 32)?,
        }),
        Layout::Standard => Ok(RespawnAfterDeath {
            position: position(packet)?,
            map: read_u8(packet, 6)? as u16,
            direction: read_u8(packet, 7)?,
            health: read_u16_le(packet, 8)? as u32,
            mana: read_u16_le(packet, 10)? as u32,
            shield: read_u16_le(packet, 12)? as u32,
            ability: read_u16_le(packet, 14)? as u32,
            experience: read_u64_be(packet, 16)?,
            money: read_u32_le(packet, 24)?,
        }),
    }
}

/// Read four consecutive maxima (health, mana, shield, ability) at `offset`
fn read_maxima(packet: &[u8], offset: usize, layout: Layout) -> Result<[u32; 4], DecodeError> {
    let mut values = [0u32; 4];
    for (index, value) in values.iter_mut().enumerate() {
        *value = match layout {
            Layout::Standard => read_u16_le(packet, offset + index * 2)? as u32,
            Layout::Extended => read_u32_le(packet, offset + index * 4)?,
        };
    }
    Ok(values)
}

/// Level up: new level, free points and maxima
pub fn decode_level_update(packet: &[u8], version: ProtocolVersion) -> Result<LevelUpdate, DecodeError> {
    let layout = select_layout(packet, version, LEVEL_STANDARD_LEN, LEVEL_EXTENDED_LEN)?;
    let [maximum_health, maximum_mana, maximum_shield, maximum_ability] = read_maxima(packet, 8, layout)?;
    Ok(LevelUpdate {
        level: read_u16_le(packet, 4)?,
        level_up_points: read_u16_le(packet, 6)?,
        maximum_health,
        maximum_mana,
        maximum_shield,
        maximum_ability,
    })
}

/// Stat point spent
///
/// Standard packs success into the high nibble and the attribute into the
/// low nibble of byte 4; Extended gives each its own byte.
pub fn decode_stat_increase(packet: &[u8], version: ProtocolVersion) -> Result<StatIncreaseResult, DecodeError> {
    match select_layout(packet, version, STAT_STANDARD_LEN, STAT_EXTENDED_LEN)? {
        Layout::Standard => {
            let result = read_u8(packet, 4)?;
            Ok(StatIncreaseResult {
                success: result >> 4 != 0,
                attribute: StatAttribute::from_u8(result & 0x0F),
                dependent_maximum: read_u16_le(packet, 6)? as u32,
                maximum_shield: read_u16_le(packet, 8)? as u32,
                maximum_ability: read_u16_le(packet, 10)? as u32,
            })
        }
        Layout::Extended => Ok(StatIncreaseResult {
            success: read_u8(packet, 5)? != 0,
            attribute: StatAttribute::from_u8(read_u8(packet, 4)?),
            dependent_maximum: read_u32_le(packet, 8)?,
            maximum_shield: read_u32_le(packet, 12)?,
            maximum_ability: read_u32_le(packet, 16)?,
        }),
    }
}

/// Master levels only exist from Season 6 on
fn require_master_levels(version: ProtocolVersion) -> Result<(), DecodeError> {
    if version < ProtocolVersion::Season6 {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    Ok(())
}

/// Master level statistics sent on entering the world
pub fn decode_master_stats(packet: &[u8], version: ProtocolVersion) -> Result<MasterStats, DecodeError> {
    require_master_levels(version)?;
    let layout = select_layout(packet, version, MASTER_STATS_STANDARD_LEN, MASTER_STATS_EXTENDED_LEN)?;
    let [maximum_health, maximum_mana, maximum_shield, maximum_ability] = read_maxima(packet, 24, layout)?;
    Ok(MasterStats {
        master_level: read_u16_le(packet, 4)?,
        master_experience: read_u64_be(packet, 6)?,
        next_master_experience: read_u64_be(packet, 14)?,
        master_points: read_u16_le(packet, 22)?,
        maximum_health,
        maximum_mana,
        maximum_shield,
        maximum_ability,
    })
}

pub fn decode_master_level_update(packet: &[u8], version: ProtocolVersion) -> Result<MasterLevelUpdate, DecodeError> {
    require_master_levels(version)?;
    let layout = select_layout(packet, version, MASTER_LEVEL_STANDARD_LEN, MASTER_LEVEL_EXTENDED_LEN)?;
    let [maximum_health, maximum_mana, maximum_shield, maximum_ability] = read_maxima(packet, 12, layout)?;
    Ok(MasterLevelUpdate {
        master_level: read_u16_le(packet, 4)?,
        gained_points: read_u16_le(packet, 6)?,
        master_points: read_u16_le(packet, 8)?,
        maximum_master_points: read_u16_le(packet, 10)?,
        maximum_health,
        maximum_mana,
        maximum_shield,
        maximum_ability,
    })
}

/// Skill list, single addition or single removal
///
/// # Packet Format
/// ```text
/// Season 6: C1 len F3 11 flag pad { slot number:u16le level }
/// 0.97/0.75: C1 len F3 11 flag { slot number level }
/// ```
///
/// `flag` is 0xFE for an addition, 0xFF for a removal and the record count
/// otherwise. 0.75 stores the skill level in the top five bits.
pub fn decode_skill_update(packet: &[u8], version: ProtocolVersion) -> Result<SkillUpdate, DecodeError> {
    require_len(packet, SKILL_HEADER_LEN)?;
    let flag = read_u8(packet, 4)?;

    let (records_offset, record_len) = match version {
        ProtocolVersion::Season6 => (6, 4),
        ProtocolVersion::Version097 | ProtocolVersion::Version075 => (5, 3),
    };

    let read_entry = |offset: usize| -> Result<SkillEntry, DecodeError> {
        match version {
            ProtocolVersion::Season6 => Ok(SkillEntry {
                slot: read_u8(packet, offset)?,
                number: read_u16_le(packet, offset + 1)?,
                level: read_u8(packet, offset + 3)?,
            }),
            ProtocolVersion::Version097 => Ok(SkillEntry {
                slot: read_u8(packet, offset)?,
                number: read_u8(packet, offset + 1)? as u16,
                level: read_u8(packet, offset + 2)?,
            }),
            ProtocolVersion::Version075 => Ok(SkillEntry {
                slot: read_u8(packet, offset)?,
                number: read_u8(packet, offset + 1)? as u16,
                level: read_u8(packet, offset + 2)? >> 3,
            }),
        }
    };

    match flag {
        SKILL_ADDED | SKILL_REMOVED => {
            require_len(packet, records_offset + record_len)?;
            let entry = read_entry(records_offset)?;
            Ok(if flag == SKILL_ADDED {
                SkillUpdate::Added(entry)
            } else {
                SkillUpdate::Removed(entry)
            })
        }
        count => {
            let mut skills = Vec::with_capacity(count as usize);
            for index in 0..count as usize {
                let offset = records_offset + index * record_len;
                if read_bytes(packet, offset, record_len).is_err() {
                    break;
                }
                skills.push(read_entry(offset)?);
            }
            Ok(SkillUpdate::List(skills))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S6: ProtocolVersion = ProtocolVersion::Season6;

    fn put_u16_le(packet: &mut [u8], offset: usize, value: u16) {
        packet[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn put_u32_le(packet: &mut [u8], offset: usize, value: u32) {
        packet[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn frame(len: usize, sub_code: u8) -> Vec<u8> {
        let mut packet = vec![0u8; len];
        packet[0] = 0xC3;
        packet[1] = len as u8;
        packet[2] = 0xF3;
        packet[3] = sub_code;
        packet
    }

    #[test]
    fn test_information_s6_extended() {
        let mut packet = frame(INFO_S6_EXTENDED_LEN, 0x03);
        packet[4] = 10;
        packet[5] = 20;
        put_u16_le(&mut packet, 6, 5);
        packet[8..16].copy_from_slice(&1_000_000u64.to_be_bytes());
        put_u16_le(&mut packet, 26, 30);
        put_u16_le(&mut packet, 34, 25);
        put_u32_le(&mut packet, 36, 100);
        put_u32_le(&mut packet, 40, 100);
        put_u32_le(&mut packet, 56, 70_000);
        put_u32_le(&mut packet, 68, 123_456);

        let info = decode_character_information(&packet, S6).unwrap();
        assert_eq!(info.position, TilePosition::new(10, 20));
        assert_eq!(info.map, 5);
        assert_eq!(info.experience, 1_000_000);
        assert_eq!(info.stats.strength, 30);
        assert_eq!(info.stats.leadership, 25);
        assert_eq!(info.vitals.health, 100);
        assert_eq!(info.vitals.maximum_health, 100);
        assert_eq!(info.vitals.maximum_shield, 70_000);
        assert_eq!(info.money, 123_456);
    }

    #[test]
    fn test_information_s6_standard() {
        let mut packet = frame(INFO_S6_STANDARD_LEN, 0x03);
        packet[4] = 130;
        packet[5] = 116;
        put_u16_le(&mut packet, 6, 0);
        put_u16_le(&mut packet, 34, 60);
        put_u16_le(&mut packet, 36, 110);
        put_u16_le(&mut packet, 62, 18);
        put_u32_le(&mut packet, 52, 999);

        let info = decode_character_information(&packet, S6).unwrap();
        assert_eq!(info.position, TilePosition::new(130, 116));
        assert_eq!(info.vitals.health, 60);
        assert_eq!(info.vitals.maximum_health, 110);
        assert_eq!(info.stats.leadership, 18);
        assert_eq!(info.money, 999);
    }

    #[test]
    fn test_information_legacy() {
        let mut packet = frame(INFO_075_LEN, 0x03);
        packet[4] = 1;
        packet[5] = 2;
        packet[6] = 3;
        put_u16_le(&mut packet, 26, 40);
        put_u16_le(&mut packet, 28, 45);
        put_u32_le(&mut packet, 36, 777);

        let info = decode_character_information(&packet, ProtocolVersion::Version075).unwrap();
        assert_eq!(info.map, 3);
        assert_eq!(info.vitals.health, 40);
        assert_eq!(info.vitals.maximum_ability, 0);
        assert_eq!(info.money, 777);

        // 0.75 frame is too short for the 0.97 layout
        assert_eq!(
            decode_character_information(&packet, ProtocolVersion::Version097),
            Err(DecodeError::TooShort { expected: INFO_097_LEN, actual: INFO_075_LEN })
        );
    }

    #[test]
    fn test_information_too_short() {
        let packet = frame(40, 0x03);
        assert_eq!(
            decode_character_information(&packet, S6),
            Err(DecodeError::TooShort { expected: INFO_S6_STANDARD_LEN, actual: 40 })
        );
    }

    #[test]
    fn test_respawn_layouts() {
        let mut packet = frame(RESPAWN_EXTENDED_LEN, 0x04);
        packet[4] = 125;
        packet[5] = 125;
        put_u32_le(&mut packet, 8, 500);
        put_u32_le(&mut packet, 16, 80);
        let respawn = decode_respawn(&packet, S6).unwrap();
        assert_eq!(respawn.position, TilePosition::new(125, 125));
        assert_eq!(respawn.health, 500);
        assert_eq!(respawn.shield, 80);

        let mut packet = frame(RESPAWN_LEGACY_LEN, 0x04);
        put_u16_le(&mut packet, 8, 90);
        let respawn = decode_respawn(&packet, ProtocolVersion::Version097).unwrap();
        assert_eq!(respawn.health, 90);
        assert_eq!(respawn.shield, 0);
    }

    #[test]
    fn test_level_update_layouts() {
        let mut packet = frame(LEVEL_STANDARD_LEN, 0x05);
        put_u16_le(&mut packet, 4, 51);
        put_u16_le(&mut packet, 6, 5);
        put_u16_le(&mut packet, 8, 300);
        put_u16_le(&mut packet, 10, 120);
        let update = decode_level_update(&packet, S6).unwrap();
        assert_eq!(update.level, 51);
        assert_eq!(update.maximum_health, 300);
        assert_eq!(update.maximum_mana, 120);

        let mut packet = frame(LEVEL_EXTENDED_LEN, 0x05);
        put_u32_le(&mut packet, 8, 100_000);
        put_u32_le(&mut packet, 20, 4_000);
        let update = decode_level_update(&packet, S6).unwrap();
        assert_eq!(update.maximum_health, 100_000);
        assert_eq!(update.maximum_ability, 4_000);

        // Extended-sized frame on an old version is read as Standard
        let update = decode_level_update(&packet, ProtocolVersion::Version097).unwrap();
        assert_eq!(update.maximum_health, (100_000u32 & 0xFFFF));
    }

    #[test]
    fn test_stat_increase() {
        let mut packet = frame(STAT_STANDARD_LEN, 0x06);
        packet[4] = 0x12;
        put_u16_le(&mut packet, 6, 210);
        let result = decode_stat_increase(&packet, S6).unwrap();
        assert!(result.success);
        assert_eq!(result.attribute, StatAttribute::Vitality);
        assert_eq!(result.dependent_maximum, 210);

        let mut packet = frame(STAT_EXTENDED_LEN, 0x06);
        packet[4] = 3;
        packet[5] = 0;
        let result = decode_stat_increase(&packet, S6).unwrap();
        assert!(!result.success);
        assert_eq!(result.attribute, StatAttribute::Energy);
    }

    #[test]
    fn test_master_updates() {
        let mut packet = frame(MASTER_STATS_STANDARD_LEN, 0x50);
        put_u16_le(&mut packet, 4, 12);
        put_u16_le(&mut packet, 22, 3);
        put_u16_le(&mut packet, 24, 4_000);
        let stats = decode_master_stats(&packet, S6).unwrap();
        assert_eq!(stats.master_level, 12);
        assert_eq!(stats.master_points, 3);
        assert_eq!(stats.maximum_health, 4_000);

        let mut packet = frame(MASTER_LEVEL_EXTENDED_LEN, 0x51);
        put_u16_le(&mut packet, 4, 13);
        put_u32_le(&mut packet, 12, 80_000);
        let update = decode_master_level_update(&packet, S6).unwrap();
        assert_eq!(update.master_level, 13);
        assert_eq!(update.maximum_health, 80_000);
    }

    #[test]
    fn test_master_updates_need_season6() {
        let packet = frame(MASTER_STATS_EXTENDED_LEN, 0x50);
        assert_eq!(
            decode_master_stats(&packet, ProtocolVersion::Version097),
            Err(DecodeError::UnsupportedVersion(ProtocolVersion::Version097))
        );
        let packet = frame(MASTER_LEVEL_EXTENDED_LEN, 0x51);
        assert_eq!(
            decode_master_level_update(&packet, ProtocolVersion::Version075),
            Err(DecodeError::UnsupportedVersion(ProtocolVersion::Version075))
        );
    }

    #[test]
    fn test_skill_update_s6() {
        let packet = [0xC1, 0x0E, 0xF3, 0x11, 0x02, 0x00, 0, 0x11, 0x00, 0, 1, 0x2C, 0x01, 2];
        let update = decode_skill_update(&packet, S6).unwrap();
        assert_eq!(
            update,
            SkillUpdate::List(vec![
                SkillEntry { slot: 0, number: 0x11, level: 0 },
                SkillEntry { slot: 1, number: 300, level: 2 },
            ])
        );

        let packet = [0xC1, 0x0A, 0xF3, 0x11, 0xFE, 0x00, 4, 0x05, 0x00, 0];
        assert_eq!(
            decode_skill_update(&packet, S6).unwrap(),
            SkillUpdate::Added(SkillEntry { slot: 4, number: 5, level: 0 })
        );
    }

    #[test]
    fn test_skill_update_legacy() {
        let packet = [0xC1, 0x08, 0xF3, 0x11, 0xFF, 2, 9, 0x18];
        assert_eq!(
            decode_skill_update(&packet, ProtocolVersion::Version075).unwrap(),
            SkillUpdate::Removed(SkillEntry { slot: 2, number: 9, level: 3 })
        );
        assert_eq!(
            decode_skill_update(&packet, ProtocolVersion::Version097).unwrap(),
            SkillUpdate::Removed(SkillEntry { slot: 2, number: 9, level: 0x18 })
        );

        let short = [0xC1, 0x07, 0xF3, 0x11, 0xFE, 2, 9];
        assert!(matches!(
            decode_skill_update(&short, ProtocolVersion::Version097),
            Err(DecodeError::TooShort { .. })
        ));
    }
}
