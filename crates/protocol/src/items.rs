//! Ground item decoders and item data interpretation

use crate::codecs::*;
use crate::error::DecodeError;
use crate::packet_structures::{DroppedItem, DroppedKind, ItemInfo, PickupResult};
use muclient_core::{ObjectId, ProtocolVersion, TilePosition};

/// Group/index pair the servers use for a pile of zen
pub const MONEY_GROUP: u8 = 14;
pub const MONEY_INDEX: u8 = 15;

const DROPPED_HEADER_LEN: usize = 5;
const DROPPED_PREFIX_LEN: usize = 4;
const ITEM_DATA_LEN_S6: usize = 12;
const ITEM_DATA_LEN_LEGACY: usize = 7;
const MIN_ITEM_DATA_LEN: usize = 6;

const PICKUP_HEADER_LEN: usize = 4;
const PICKUP_MONEY_LEN: usize = 8;
const PICKUP_FAILED: u8 = 0xFF;
const PICKUP_MONEY: u8 = 0xFE;

/// Size of one item data block for a generation
pub fn item_data_len(version: ProtocolVersion) -> usize {
    match version {
        ProtocolVersion::Season6 => ITEM_DATA_LEN_S6,
        ProtocolVersion::Version097 | ProtocolVersion::Version075 => ITEM_DATA_LEN_LEGACY,
    }
}

/// Extract group, index and level from item data
///
/// # Format
/// - Season 6: `index = d[0]`, `group = d[5] >> 4`
/// - 0.97/0.75: `index = d[0] & 0x1F`, `group = d[0] >> 5 | (d[5] & 0x80) >> 4`
/// - both: `level = d[1] >> 3 & 0x0F`
pub fn parse_item_info(data: &[u8], version: ProtocolVersion) -> Result<ItemInfo, DecodeError> {
    require_len(data, MIN_ITEM_DATA_LEN)?;
    let level = (data[1] >> 3) & 0x0F;
    let info = match version {
        ProtocolVersion::Season6 => ItemInfo {
            group: data[5] >> 4,
            index: data[0],
            level,
        },
        ProtocolVersion::Version097 | ProtocolVersion::Version075 => ItemInfo {
            group: (data[0] >> 5) | ((data[5] & 0x80) >> 4),
            index: data[0] & 0x1F,
            level,
        },
    };
    Ok(info)
}

/// Money pile or regular item
///
/// Money piles carry their amount in the durability byte: `d[4]` on Season
/// 6 and `d[2]` on older generations.
pub fn classify_item_data(data: &[u8], version: ProtocolVersion) -> Result<DroppedKind, DecodeError> {
    let info = parse_item_info(data, version)?;
    if info.group == MONEY_GROUP && info.index == MONEY_INDEX {
        let amount_at = match version {
            ProtocolVersion::Season6 => 4,
            ProtocolVersion::Version097 | ProtocolVersion::Version075 => 2,
        };
        return Ok(DroppedKind::Money {
            amount: data[amount_at] as u32,
        });
    }
    Ok(DroppedKind::Item {
        info,
        data: data.to_vec(),
    })
}

/// Items and money appearing on the ground
///
/// # Packet Format
/// ```text
/// C2 len:u16 20 count { id:u16be x y data[n] }*
/// ```
///
/// `n` is fixed per generation, except that a single-record batch spends all
/// remaining bytes on its item data.
pub fn decode_items_dropped(packet: &[u8], version: ProtocolVersion) -> Result<Vec<DroppedItem>, DecodeError> {
    require_len(packet, DROPPED_HEADER_LEN)?;
    let count = read_u8(packet, 4)? as usize;

    let data_len = if count == 1 {
        packet.len().saturating_sub(DROPPED_HEADER_LEN + DROPPED_PREFIX_LEN)
    } else {
        item_data_len(version)
    };
    let record_len = DROPPED_PREFIX_LEN + data_len;

    let mut items = Vec::with_capacity(count);
    for index in 0..count {
        let offset = DROPPED_HEADER_LEN + index * record_len;
        let Some(record) = read_record(packet, offset, record_len, None) else {
            tracing::debug!("Item drop batch truncated after {} of {} records", index, count);
            break;
        };
        items.push(DroppedItem {
            id: ObjectId::from_raw(read_u16_be(record, 0)?),
            position: TilePosition::new(read_u8(record, 2)?, read_u8(record, 3)?),
            kind: classify_item_data(&record[DROPPED_PREFIX_LEN..], version)?,
        });
    }
    Ok(items)
}

/// Answer to a pickup request
///
/// `C3 len 22 slot ...`: slot 0xFF is a failure, 0xFE is money with the new
/// total as `u32be` at 4, anything else is the inventory slot of the item.
pub fn decode_pickup_result(packet: &[u8], _version: ProtocolVersion) -> Result<PickupResult, DecodeError> {
    require_len(packet, PICKUP_HEADER_LEN)?;
    match read_u8(packet, 3)? {
        PICKUP_FAILED => Ok(PickupResult::Failed),
        PICKUP_MONEY => {
            require_len(packet, PICKUP_MONEY_LEN)?;
            Ok(PickupResult::Money {
                amount: read_u32_be(packet, 4)?,
            })
        }
        slot => Ok(PickupResult::Item {
            slot,
            data: packet[PICKUP_HEADER_LEN..].to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S6: ProtocolVersion = ProtocolVersion::Season6;

    fn s6_money_data(amount: u8) -> Vec<u8> {
        let mut data = vec![0u8; 12];
        data[0] = MONEY_INDEX;
        data[4] = amount;
        data[5] = MONEY_GROUP << 4;
        data
    }

    #[test]
    fn test_single_money_drop() {
        let mut packet = vec![0xC2, 0x00, 0x00, 0x20, 0x01, 0x80, 0x44, 130, 131];
        packet.extend(s6_money_data(50));
        let items = decode_items_dropped(&packet, S6).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.masked(), 0x44);
        assert_eq!(items[0].id.raw(), 0x8044);
        assert_eq!(items[0].position, TilePosition::new(130, 131));
        assert_eq!(items[0].kind, DroppedKind::Money { amount: 50 });
    }

    #[test]
    fn test_single_drop_uses_remaining_bytes() {
        // 0.97 item data is normally 7 bytes; a lone record may carry more
        let mut packet = vec![0xC2, 0x00, 0x00, 0x20, 0x01, 0x00, 0x10, 5, 6];
        packet.extend([0x21, 0x18, 0xFF, 0, 0, 0x80, 0, 0, 0, 0]);
        let items = decode_items_dropped(&packet, ProtocolVersion::Version097).unwrap();
        match &items[0].kind {
            DroppedKind::Item { info, data } => {
                assert_eq!(info.group, 9);
                assert_eq!(info.index, 1);
                assert_eq!(info.level, 3);
                assert_eq!(data.len(), 10);
            }
            other => panic!("expected item, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_drops_fixed_size() {
        let mut packet = vec![0xC2, 0x00, 0x00, 0x20, 0x02];
        packet.extend([0x00, 0x01, 10, 10]);
        packet.extend(s6_money_data(7));
        packet.extend([0x00, 0x02, 11, 11]);
        let mut sword = vec![0u8; 12];
        sword[0] = 3;
        packet.extend(sword);

        let items = decode_items_dropped(&packet, S6).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, DroppedKind::Money { amount: 7 });
        assert!(matches!(items[1].kind, DroppedKind::Item { info: ItemInfo { group: 0, index: 3, .. }, .. }));
    }

    #[test]
    fn test_legacy_money_encoding() {
        let data = [0xCF, 0x00, 0x2A, 0x00, 0x00, 0x80, 0x00];
        assert_eq!(
            classify_item_data(&data, ProtocolVersion::Version075).unwrap(),
            DroppedKind::Money { amount: 42 }
        );
        let info = parse_item_info(&data, ProtocolVersion::Version075).unwrap();
        assert_eq!((info.group, info.index), (14, 15));
    }

    #[test]
    fn test_item_data_too_short() {
        assert!(matches!(
            parse_item_info(&[1, 2, 3], S6),
            Err(DecodeError::TooShort { expected: 6, actual: 3 })
        ));
    }

    #[test]
    fn test_pickup_results() {
        assert_eq!(decode_pickup_result(&[0xC3, 0x04, 0x22, 0xFF], S6), Ok(PickupResult::Failed));
        assert_eq!(
            decode_pickup_result(&[0xC3, 0x08, 0x22, 0xFE, 0x00, 0x00, 0x27, 0x10], S6),
            Ok(PickupResult::Money { amount: 10_000 })
        );
        assert_eq!(
            decode_pickup_result(&[0xC3, 0x06, 0x22, 0x0C, 0x01, 0x02], S6),
            Ok(PickupResult::Item { slot: 12, data: vec![1, 2] })
        );
        assert!(decode_pickup_result(&[0xC3, 0x05, 0x22, 0xFE, 0x00], S6).is_err());
    }
}
