//! # Entity Scope Table
//!
//! Objects currently visible to the client, keyed by masked id.
//!
//! Each entry is an `Arc<ScopeObject>` that is created once and then mutated
//! in place, so a reference taken by the command task stays attached to the
//! live entity across updates.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use muclient_core::{ObjectId, TilePosition};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

/// Type-specific part of a scope entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    Player { name: String },
    /// Monsters and NPCs
    Npc { type_number: u16, name: Option<String> },
    Item { description: String, data: Vec<u8> },
    Money { amount: u32 },
}

impl ScopeKind {
    /// Items and money piles lying on the ground
    pub fn is_ground_object(&self) -> bool {
        matches!(self, ScopeKind::Item { .. } | ScopeKind::Money { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScopeKind::Player { .. } => "player",
            ScopeKind::Npc { .. } => "npc",
            ScopeKind::Item { .. } => "item",
            ScopeKind::Money { .. } => "money",
        }
    }

    /// Fold `update` into `self`, keeping names the update does not carry
    fn merge(&mut self, update: ScopeKind) {
        match (self, update) {
            (ScopeKind::Player { name }, ScopeKind::Player { name: new_name }) => {
                if !new_name.is_empty() {
                    *name = new_name;
                }
            }
            (
                ScopeKind::Npc { type_number, name },
                ScopeKind::Npc {
                    type_number: new_type,
                    name: new_name,
                },
            ) => {
                *type_number = new_type;
                if new_name.is_some() {
                    *name = new_name;
                }
            }
            (current, update) => *current = update,
        }
    }
}

/// Snapshot of one scope entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeEntity {
    pub id: ObjectId,
    pub position: TilePosition,
    pub last_update: Instant,
    pub kind: ScopeKind,
}

impl ScopeEntity {
    pub fn masked_id(&self) -> u16 {
        self.id.masked()
    }

    pub fn raw_id(&self) -> u16 {
        self.id.raw()
    }
}

/// Stable handle to a scope entity
#[derive(Debug)]
pub struct ScopeObject {
    masked_id: u16,
    entity: RwLock<ScopeEntity>,
}

impl ScopeObject {
    fn new(id: ObjectId, position: TilePosition, kind: ScopeKind) -> Self {
        Self {
            masked_id: id.masked(),
            entity: RwLock::new(ScopeEntity {
                id,
                position,
                last_update: Instant::now(),
                kind,
            }),
        }
    }

    pub fn masked_id(&self) -> u16 {
        self.masked_id
    }

    pub fn snapshot(&self) -> ScopeEntity {
        self.entity.read().clone()
    }

    pub fn position(&self) -> TilePosition {
        self.entity.read().position
    }

    pub fn raw_id(&self) -> u16 {
        self.entity.read().id.raw()
    }

    pub fn is_ground_object(&self) -> bool {
        self.entity.read().kind.is_ground_object()
    }

    fn apply(&self, id: ObjectId, position: TilePosition, kind: ScopeKind) {
        let mut entity = self.entity.write();
        entity.id = id;
        entity.position = position;
        entity.kind.merge(kind);
        entity.last_update = Instant::now();
    }

    fn move_to(&self, position: TilePosition) {
        let mut entity = self.entity.write();
        entity.position = position;
        entity.last_update = Instant::now();
    }
}

/// Concurrent table of visible objects
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    objects: Arc<DashMap<u16, Arc<ScopeObject>>>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entity or update the existing one in place
    pub fn add_or_update(&self, id: ObjectId, position: TilePosition, kind: ScopeKind) -> Arc<ScopeObject> {
        match self.objects.entry(id.masked()) {
            Entry::Occupied(entry) => {
                let object = entry.get().clone();
                object.apply(id, position, kind);
                object
            }
            Entry::Vacant(entry) => {
                tracing::trace!("Scope add {} {:#06x} at {}", kind.label(), id.masked(), position);
                let object = Arc::new(ScopeObject::new(id, position, kind));
                entry.insert(object.clone());
                object
            }
        }
    }

    pub fn remove(&self, masked_id: u16) -> bool {
        self.objects.remove(&masked_id).is_some()
    }

    /// Move an existing entity; returns `false` if it is not in scope
    pub fn try_update_position(&self, masked_id: u16, position: TilePosition) -> bool {
        match self.objects.get(&masked_id) {
            Some(object) => {
                object.move_to(position);
                true
            }
            None => false,
        }
    }

    /// Drop every entity except `keep`
    pub fn clear(&self, keep: Option<u16>) {
        match keep {
            Some(keep) => self.objects.retain(|masked_id, _| *masked_id == keep),
            None => self.objects.clear(),
        }
    }

    pub fn get(&self, masked_id: u16) -> Option<Arc<ScopeObject>> {
        self.objects.get(&masked_id).map(|object| object.value().clone())
    }

    pub fn contains(&self, masked_id: u16) -> bool {
        self.objects.contains_key(&masked_id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Snapshots of all entities, ordered by masked id
    pub fn snapshot(&self) -> Vec<ScopeEntity> {
        let mut entities: Vec<ScopeEntity> = self.objects.iter().map(|object| object.snapshot()).collect();
        entities.sort_by_key(|entity| entity.masked_id());
        entities
    }

    pub fn ground_items(&self) -> Vec<Arc<ScopeObject>> {
        self.objects
            .iter()
            .filter(|object| object.is_ground_object())
            .map(|object| object.value().clone())
            .collect()
    }

    /// Closest item or money pile to `from` (ties go to the lower id)
    pub fn nearest_ground_item(&self, from: TilePosition) -> Option<ScopeEntity> {
        self.ground_items()
            .iter()
            .map(|object| object.snapshot())
            .min_by_key(|entity| (from.distance_to(entity.position), entity.masked_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> ScopeKind {
        ScopeKind::Player { name: name.to_string() }
    }

    #[test]
    fn test_add_then_lookup() {
        let table = ScopeTable::new();
        let id = ObjectId::from_raw(0x8123);
        table.add_or_update(id, TilePosition::new(1, 2), player("Elf"));

        let entity = table.get(0x0123).unwrap().snapshot();
        assert_eq!(entity.masked_id(), 0x0123);
        assert_eq!(entity.raw_id(), 0x8123);
        assert_eq!(entity.position, TilePosition::new(1, 2));
        assert_eq!(entity.kind, player("Elf"));
        assert!(table.get(0x8123).is_none());
    }

    #[test]
    fn test_update_keeps_identity() {
        let table = ScopeTable::new();
        let id = ObjectId::from_raw(7);
        let first = table.add_or_update(id, TilePosition::new(1, 1), player("Knight"));
        let second = table.add_or_update(id, TilePosition::new(2, 2), player("Knight"));
        table.add_or_update(id, TilePosition::new(3, 3), player(""));

        assert_eq!(table.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        let current = table.get(7).unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(current.position(), TilePosition::new(3, 3));
        // an empty name does not erase the known one
        assert_eq!(current.snapshot().kind, player("Knight"));
    }

    #[test]
    fn test_npc_name_is_kept_when_absent() {
        let table = ScopeTable::new();
        let id = ObjectId::from_raw(300);
        let named = ScopeKind::Npc {
            type_number: 249,
            name: Some("Guard".into()),
        };
        table.add_or_update(id, TilePosition::new(5, 5), named);
        table.add_or_update(
            id,
            TilePosition::new(6, 5),
            ScopeKind::Npc {
                type_number: 249,
                name: None,
            },
        );
        assert_eq!(
            table.get(300).unwrap().snapshot().kind,
            ScopeKind::Npc {
                type_number: 249,
                name: Some("Guard".into())
            }
        );
    }

    #[test]
    fn test_try_update_position() {
        let table = ScopeTable::new();
        assert!(!table.try_update_position(1, TilePosition::new(9, 9)));
        table.add_or_update(ObjectId::from_raw(1), TilePosition::new(0, 0), ScopeKind::Money { amount: 5 });
        assert!(table.try_update_position(1, TilePosition::new(9, 9)));
        assert_eq!(table.get(1).unwrap().position(), TilePosition::new(9, 9));
    }

    #[test]
    fn test_clear_keep_self() {
        let table = ScopeTable::new();
        for raw in [10u16, 11, 12] {
            table.add_or_update(ObjectId::from_raw(raw), TilePosition::new(0, 0), player("x"));
        }
        table.clear(Some(10));
        assert_eq!(table.len(), 1);
        assert!(table.contains(10));

        table.clear(None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_nearest_ground_item() {
        let table = ScopeTable::new();
        let origin = TilePosition::new(100, 100);
        table.add_or_update(ObjectId::from_raw(1), TilePosition::new(101, 100), player("close"));
        table.add_or_update(ObjectId::from_raw(2), TilePosition::new(110, 110), ScopeKind::Money { amount: 1 });
        table.add_or_update(
            ObjectId::from_raw(0x8003),
            TilePosition::new(103, 98),
            ScopeKind::Item {
                description: "Short Sword".into(),
                data: vec![0; 12],
            },
        );

        let nearest = table.nearest_ground_item(origin).unwrap();
        assert_eq!(nearest.masked_id(), 3);
        assert_eq!(nearest.raw_id(), 0x8003);
        assert_eq!(table.ground_items().len(), 2);
    }

    #[test]
    fn test_kind_change_replaces_in_place() {
        let table = ScopeTable::new();
        let id = ObjectId::from_raw(4);
        let before = table.add_or_update(id, TilePosition::new(0, 0), ScopeKind::Money { amount: 1 });
        let after = table.add_or_update(
            id,
            TilePosition::new(0, 0),
            ScopeKind::Item {
                description: "Apple".into(),
                data: vec![],
            },
        );
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.snapshot().kind.label(), "item");
    }
}
