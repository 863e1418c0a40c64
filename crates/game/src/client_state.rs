//! # Client State
//!
//! Everything the client knows about its own character.
//!
//! Field groups sit behind separate `Mutex`es: the receive task writes them
//! while the command task reads them, and no operation needs two groups at
//! once.

use muclient_core::{TilePosition, UNASSIGNED_CHARACTER_ID};
use muclient_protocol::{CharacterStats, SkillEntry, SkillUpdate};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Current/maximum pair; the maximum never drops below 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VitalPair {
    current: u32,
    maximum: u32,
}

impl VitalPair {
    pub const fn new() -> Self {
        Self { current: 0, maximum: 1 }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn maximum(&self) -> u32 {
        self.maximum
    }

    pub fn set_current(&mut self, value: u32) {
        self.current = value;
    }

    pub fn set_maximum(&mut self, value: u32) {
        self.maximum = value.max(1);
    }

    /// Fill level in percent, capped at 100
    pub fn percent(&self) -> u32 {
        ((self.current as u64 * 100) / self.maximum as u64).min(100) as u32
    }
}

impl Default for VitalPair {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacterVitals {
    pub health: VitalPair,
    pub shield: VitalPair,
    pub mana: VitalPair,
    pub ability: VitalPair,
}

/// Level, experience and currency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub level: u16,
    pub level_up_points: u16,
    pub experience: u64,
    pub next_experience: u64,
    pub money: u32,
    pub master_level: u16,
    pub master_points: u16,
}

/// What the command task is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    AwaitingMoveConfirmation,
    AwaitingPickupConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    BeginMove,
    BeginPickup,
    MoveConfirmed,
    PickupConfirmed { succeeded: bool },
    ForceRelease,
}

/// One request in flight at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLock {
    state: RequestState,
    pickup_handled: bool,
    last_pickup_succeeded: bool,
}

impl RequestLock {
    pub const fn new() -> Self {
        Self {
            state: RequestState::Idle,
            pickup_handled: false,
            last_pickup_succeeded: false,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_walking(&self) -> bool {
        self.state == RequestState::AwaitingMoveConfirmation
    }

    pub fn pickup_handled(&self) -> bool {
        self.pickup_handled
    }

    pub fn last_pickup_succeeded(&self) -> bool {
        self.last_pickup_succeeded
    }

    /// Apply `event`; returns whether it changed anything
    ///
    /// Begin events only succeed from `Idle`. Confirmations that arrive
    /// while nothing is pending are ignored, except that a pickup result is
    /// always recorded.
    pub fn transition(&mut self, event: RequestEvent) -> bool {
        match (self.state, event) {
            (RequestState::Idle, RequestEvent::BeginMove) => {
                self.state = RequestState::AwaitingMoveConfirmation;
                true
            }
            (RequestState::Idle, RequestEvent::BeginPickup) => {
                self.state = RequestState::AwaitingPickupConfirmation;
                self.pickup_handled = false;
                true
            }
            (_, RequestEvent::BeginMove | RequestEvent::BeginPickup) => false,
            (RequestState::AwaitingMoveConfirmation, RequestEvent::MoveConfirmed) => {
                self.state = RequestState::Idle;
                true
            }
            (_, RequestEvent::MoveConfirmed) => false,
            (state, RequestEvent::PickupConfirmed { succeeded }) => {
                self.pickup_handled = true;
                self.last_pickup_succeeded = succeeded;
                if state == RequestState::AwaitingPickupConfirmation {
                    self.state = RequestState::Idle;
                }
                true
            }
            (RequestState::Idle, RequestEvent::ForceRelease) => false,
            (_, RequestEvent::ForceRelease) => {
                self.state = RequestState::Idle;
                true
            }
        }
    }
}

impl Default for RequestLock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct Location {
    map: u16,
    position: TilePosition,
}

/// The local character
pub struct ClientState {
    character_id: Mutex<u16>,
    character_name: Mutex<Option<String>>,
    class: Mutex<u8>,
    location: Mutex<Location>,
    vitals: Mutex<CharacterVitals>,
    stats: Mutex<CharacterStats>,
    progress: Mutex<Progress>,
    skills: Mutex<BTreeMap<u8, SkillEntry>>,
    in_game: AtomicBool,
    requests: Mutex<RequestLock>,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            character_id: Mutex::new(UNASSIGNED_CHARACTER_ID),
            character_name: Mutex::new(None),
            class: Mutex::new(0),
            location: Mutex::new(Location {
                map: 0,
                position: TilePosition::default(),
            }),
            vitals: Mutex::new(CharacterVitals::default()),
            stats: Mutex::new(CharacterStats::default()),
            progress: Mutex::new(Progress::default()),
            skills: Mutex::new(BTreeMap::new()),
            in_game: AtomicBool::new(false),
            requests: Mutex::new(RequestLock::new()),
        }
    }

    // ===== identity =====

    pub fn character_id(&self) -> u16 {
        *self.character_id.lock()
    }

    pub fn set_character_id(&self, masked_id: u16) {
        *self.character_id.lock() = masked_id;
    }

    /// Whether `masked_id` is the local character (never true before assignment)
    pub fn is_self(&self, masked_id: u16) -> bool {
        let own = self.character_id();
        own != UNASSIGNED_CHARACTER_ID && own == masked_id
    }

    pub fn character_name(&self) -> Option<String> {
        self.character_name.lock().clone()
    }

    pub fn set_character_name(&self, name: Option<String>) {
        *self.character_name.lock() = name;
    }

    /// Class code of the selected character
    pub fn class(&self) -> u8 {
        *self.class.lock()
    }

    pub fn set_class(&self, class: u8) {
        *self.class.lock() = class;
    }

    // ===== location =====

    pub fn position(&self) -> TilePosition {
        self.location.lock().position
    }

    pub fn set_position(&self, position: TilePosition) {
        self.location.lock().position = position;
    }

    pub fn map(&self) -> u16 {
        self.location.lock().map
    }

    pub fn set_map(&self, map: u16) {
        self.location.lock().map = map;
    }

    // ===== vitals =====

    pub fn vitals(&self) -> CharacterVitals {
        *self.vitals.lock()
    }

    pub fn update_vitals<F: FnOnce(&mut CharacterVitals)>(&self, update: F) {
        update(&mut self.vitals.lock());
    }

    // ===== stats & progress =====

    pub fn stats(&self) -> CharacterStats {
        *self.stats.lock()
    }

    pub fn set_stats(&self, stats: CharacterStats) {
        *self.stats.lock() = stats;
    }

    pub fn update_stats<F: FnOnce(&mut CharacterStats)>(&self, update: F) {
        update(&mut self.stats.lock());
    }

    pub fn progress(&self) -> Progress {
        *self.progress.lock()
    }

    pub fn update_progress<F: FnOnce(&mut Progress)>(&self, update: F) {
        update(&mut self.progress.lock());
    }

    // ===== skills =====

    pub fn skills(&self) -> Vec<SkillEntry> {
        self.skills.lock().values().copied().collect()
    }

    pub fn apply_skill_update(&self, update: &SkillUpdate) {
        let mut skills = self.skills.lock();
        match update {
            SkillUpdate::Added(entry) => {
                skills.insert(entry.slot, *entry);
            }
            SkillUpdate::Removed(entry) => {
                skills.remove(&entry.slot);
            }
            SkillUpdate::List(entries) => {
                skills.clear();
                skills.extend(entries.iter().map(|entry| (entry.slot, *entry)));
            }
        }
    }

    // ===== flags =====

    pub fn is_in_game(&self) -> bool {
        self.in_game.load(Ordering::Acquire)
    }

    pub fn set_in_game(&self, in_game: bool) {
        self.in_game.store(in_game, Ordering::Release);
    }

    pub fn requests(&self) -> RequestLock {
        *self.requests.lock()
    }

    pub fn is_walking(&self) -> bool {
        self.requests.lock().is_walking()
    }

    pub fn transition_request(&self, event: RequestEvent) -> bool {
        self.requests.lock().transition(event)
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}
