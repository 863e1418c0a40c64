//! # Name Oracles
//!
//! Lookups from protocol numbers to display names. The built-in tables only
//! cover a handful of well-known entries; anything else falls back to a
//! generic description.

use muclient_core::ProtocolVersion;
use muclient_protocol::ItemInfo;

pub trait NameOracle: Send + Sync {
    fn item_name(&self, item: &ItemInfo) -> String;

    fn npc_name(&self, type_number: u16) -> Option<String>;

    fn class_name(&self, class: u8, version: ProtocolVersion) -> Option<&'static str>;
}

const ITEM_NAMES: &[(u8, u8, &str)] = &[
    (0, 0, "Kris"),
    (0, 1, "Short Sword"),
    (0, 2, "Rapier"),
    (1, 0, "Small Axe"),
    (4, 0, "Short Bow"),
    (5, 0, "Skull Staff"),
    (6, 0, "Small Shield"),
    (12, 15, "Jewel of Chaos"),
    (13, 0, "Guardian Angel"),
    (13, 1, "Imp"),
    (13, 2, "Horn of Uniria"),
    (14, 0, "Apple"),
    (14, 1, "Small Healing Potion"),
    (14, 3, "Large Healing Potion"),
    (14, 4, "Small Mana Potion"),
    (14, 13, "Jewel of Bless"),
    (14, 14, "Jewel of Soul"),
    (14, 15, "Zen"),
    (14, 16, "Jewel of Life"),
];

const NPC_NAMES: &[(u16, &str)] = &[
    (0, "Bull Fighter"),
    (1, "Hound"),
    (2, "Budge Dragon"),
    (3, "Spider"),
    (14, "Skeleton"),
    (26, "Goblin"),
    (229, "Marlon"),
    (238, "Chaos Goblin"),
    (240, "Safety Guardian"),
    (241, "Royal Servant"),
    (242, "Elf Lala"),
    (243, "Eo the Craftsman"),
    (244, "Caren the Barmaid"),
    (245, "Izabel the Wizard"),
    (246, "Zienna the Weapons Merchant"),
    (247, "Guard"),
    (248, "Wandering Merchant"),
    (249, "Guard"),
    (250, "Pasi the Mage"),
    (251, "Hanzo the Blacksmith"),
    (253, "Potion Girl"),
    (254, "Pasi the Mage"),
    (255, "Lumen the Barmaid"),
];

/// Compiled-in names
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinNames;

impl NameOracle for BuiltinNames {
    fn item_name(&self, item: &ItemInfo) -> String {
        let base = ITEM_NAMES
            .iter()
            .find(|(group, index, _)| *group == item.group && *index == item.index)
            .map(|(_, _, name)| *name);
        match (base, item.level) {
            (Some(name), 0) => name.to_string(),
            (Some(name), level) => format!("{} +{}", name, level),
            (None, level) => format!("Item {}/{} +{}", item.group, item.index, level),
        }
    }

    fn npc_name(&self, type_number: u16) -> Option<String> {
        NPC_NAMES
            .iter()
            .find(|(number, _)| *number == type_number)
            .map(|(_, name)| name.to_string())
    }

    fn class_name(&self, class: u8, version: ProtocolVersion) -> Option<&'static str> {
        match version {
            // four-bit class codes: base class in the upper bits, evolution in bit 0
            ProtocolVersion::Version075 => match class {
                0 => Some("Dark Wizard"),
                1 => Some("Soul Master"),
                2 => Some("Dark Knight"),
                3 => Some("Blade Knight"),
                4 => Some("Fairy Elf"),
                5 => Some("Muse Elf"),
                6 => Some("Magic Gladiator"),
                _ => None,
            },
            ProtocolVersion::Version097 | ProtocolVersion::Season6 => match class {
                0 => Some("Dark Wizard"),
                2 => Some("Soul Master"),
                3 => Some("Grand Master"),
                4 => Some("Dark Knight"),
                6 => Some("Blade Knight"),
                7 => Some("Blade Master"),
                8 => Some("Fairy Elf"),
                10 => Some("Muse Elf"),
                11 => Some("High Elf"),
                12 => Some("Magic Gladiator"),
                13 => Some("Duel Master"),
                16 => Some("Dark Lord"),
                17 => Some("Lord Emperor"),
                20 => Some("Summoner"),
                22 => Some("Bloody Summoner"),
                23 => Some("Dimension Master"),
                24 => Some("Rage Fighter"),
                25 => Some("Fist Master"),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_names() {
        let names = BuiltinNames;
        let sword = ItemInfo { group: 0, index: 1, level: 0 };
        assert_eq!(names.item_name(&sword), "Short Sword");
        let sword = ItemInfo { level: 7, ..sword };
        assert_eq!(names.item_name(&sword), "Short Sword +7");
        let unknown = ItemInfo { group: 9, index: 30, level: 2 };
        assert_eq!(names.item_name(&unknown), "Item 9/30 +2");
    }

    #[test]
    fn test_npc_and_class_names() {
        let names = BuiltinNames;
        assert_eq!(names.npc_name(3).as_deref(), Some("Spider"));
        assert_eq!(names.npc_name(9999), None);
        assert_eq!(names.class_name(4, ProtocolVersion::Season6), Some("Dark Knight"));
        assert_eq!(names.class_name(2, ProtocolVersion::Version075), Some("Dark Knight"));
        assert_eq!(names.class_name(31, ProtocolVersion::Version097), None);
    }
}
