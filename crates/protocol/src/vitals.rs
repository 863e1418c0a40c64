//! Health/shield (0x26) and mana/ability (0x27) decoders
//!
//! The same layouts serve the current (sub-code 0xFF) and maximum (0xFE)
//! variants; the handler decides which pair of values it updates.

use crate::codecs::*;
use crate::error::DecodeError;
use crate::packet_structures::{HealthShield, ManaAbility};
use muclient_core::ProtocolVersion;

const HEALTH_STANDARD_LEN: usize = 9;
const HEALTH_EXTENDED_LEN: usize = 12;
const MANA_STANDARD_LEN: usize = 8;
const MANA_EXTENDED_LEN: usize = 12;

/// # Packet Format
/// ```text
/// Standard: C1 09 26 sub health:u16be flag shield:u16be
/// Extended: C1 0C 26 sub health:u32le shield:u32le
/// ```
pub fn decode_health_shield(packet: &[u8], version: ProtocolVersion) -> Result<HealthShield, DecodeError> {
    match select_layout(packet, version, HEALTH_STANDARD_LEN, HEALTH_EXTENDED_LEN)? {
        Layout::Standard => Ok(HealthShield {
            health: read_u16_be(packet, 4)? as u32,
            shield: read_u16_be(packet, 7)? as u32,
        }),
        Layout::Extended => Ok(HealthShield {
            health: read_u32_le(packet, 4)?,
            shield: read_u32_le(packet, 8)?,
        }),
    }
}

/// # Packet Format
/// ```text
/// Standard: C1 08 27 sub mana:u16be ability:u16be
/// Extended: C1 0C 27 sub mana:u32le ability:u32le
/// ```
pub fn decode_mana_ability(packet: &[u8], version: ProtocolVersion) -> Result<ManaAbility, DecodeError> {
    match select_layout(packet, version, MANA_STANDARD_LEN, MANA_EXTENDED_LEN)? {
        Layout::Standard => Ok(ManaAbility {
            mana: read_u16_be(packet, 4)? as u32,
            ability: read_u16_be(packet, 6)? as u32,
        }),
        Layout::Extended => Ok(ManaAbility {
            mana: read_u32_le(packet, 4)?,
            ability: read_u32_le(packet, 8)?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_standard() {
        let packet = [0xC1, 0x09, 0x26, 0xFF, 0x01, 0x2C, 0x00, 0x00, 0x32];
        let value = decode_health_shield(&packet, ProtocolVersion::Season6).unwrap();
        assert_eq!(value, HealthShield { health: 300, shield: 50 });
    }

    #[test]
    fn test_health_extended() {
        let mut packet = vec![0xC1, 0x0C, 0x26, 0xFE];
        packet.extend_from_slice(&150_000u32.to_le_bytes());
        packet.extend_from_slice(&20_000u32.to_le_bytes());
        let value = decode_health_shield(&packet, ProtocolVersion::Season6).unwrap();
        assert_eq!(value, HealthShield { health: 150_000, shield: 20_000 });
    }

    #[test]
    fn test_extended_size_on_legacy_version_reads_standard() {
        let packet = [0xC1, 0x0C, 0x26, 0xFF, 0x00, 0x64, 0x00, 0x00, 0x0A, 0, 0, 0];
        let value = decode_health_shield(&packet, ProtocolVersion::Version097).unwrap();
        assert_eq!(value, HealthShield { health: 100, shield: 10 });
    }

    #[test]
    fn test_health_too_short() {
        let packet = [0xC1, 0x08, 0x26, 0xFF, 0x00, 0x64, 0x00, 0x00];
        assert_eq!(
            decode_health_shield(&packet, ProtocolVersion::Season6),
            Err(DecodeError::TooShort { expected: 9, actual: 8 })
        );
    }

    #[test]
    fn test_mana_layouts() {
        let packet = [0xC1, 0x08, 0x27, 0xFF, 0x00, 0x50, 0x00, 0x19];
        assert_eq!(
            decode_mana_ability(&packet, ProtocolVersion::Version075).unwrap(),
            ManaAbility { mana: 80, ability: 25 }
        );

        let mut packet = vec![0xC1, 0x0C, 0x27, 0xFE];
        packet.extend_from_slice(&70_000u32.to_le_bytes());
        packet.extend_from_slice(&900u32.to_le_bytes());
        assert_eq!(
            decode_mana_ability(&packet, ProtocolVersion::Season6).unwrap(),
            ManaAbility { mana: 70_000, ability: 900 }
        );

        assert!(decode_mana_ability(&packet[..7], ProtocolVersion::Season6).is_err());
    }
}
