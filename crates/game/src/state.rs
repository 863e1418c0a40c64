//! # Game State
//!
//! The write API the packet handlers fold decoded events into, plus the
//! gated session requests (server selection, login, character selection,
//! movement and pickup).
//!
//! Every mutation is visible through the read accessors as soon as the call
//! returns. Outbound packets leave through a [`PacketSink`].

use crate::client_state::{ClientState, RequestEvent, VitalPair};
use crate::connection_state::{ConnectionState, ConnectionStateMachine};
use crate::names::NameOracle;
use crate::scope::{ScopeKind, ScopeTable};
use bytes::BytesMut;
use muclient_core::{ObjectId, ProtocolVersion, Result, TilePosition};
use muclient_protocol::packet_builder::{self, LoginRequest};
use muclient_protocol::{
    CharacterStats, CharacterSummary, ConnectionInfo, ItemInfo, LevelUpdate, MasterLevelUpdate, MasterStats,
    ServerEntry, SkillUpdate, StatAttribute,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Outbound side of the transport
pub trait PacketSink: Send + Sync {
    /// Queue one complete frame
    fn send(&self, packet: BytesMut) -> Result<()>;

    /// Drop the current connection and connect to a game server
    fn connect_game_server(&self, host: &str, port: u16) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_version: String,
    pub client_serial: String,
}

/// Session-wide settings the state updater needs
#[derive(Debug, Clone, Default)]
pub struct GameSettings {
    pub version: ProtocolVersion,
    pub credentials: Credentials,
    /// Server to select as soon as the list arrives
    pub auto_server_id: Option<u16>,
    /// Character to select as soon as the list arrives
    pub auto_character: Option<String>,
    /// Resolve suspicious ids in item-drop-removed packets
    pub item_drop_id_workaround: bool,
}

/// Shared client-side view of the session
pub struct GameState {
    settings: GameSettings,
    client: ClientState,
    scope: ScopeTable,
    connection: ConnectionStateMachine,
    servers: Mutex<Vec<ServerEntry>>,
    connection_info: Mutex<Option<ConnectionInfo>>,
    characters: Mutex<Vec<CharacterSummary>>,
    sink: Arc<dyn PacketSink>,
    names: Arc<dyn NameOracle>,
    started: Instant,
}

impl GameState {
    pub fn new(settings: GameSettings, sink: Arc<dyn PacketSink>, names: Arc<dyn NameOracle>) -> Self {
        tracing::debug!("Creating game state for protocol {}", settings.version);
        Self {
            settings,
            client: ClientState::new(),
            scope: ScopeTable::new(),
            connection: ConnectionStateMachine::new(),
            servers: Mutex::new(Vec::new()),
            connection_info: Mutex::new(None),
            characters: Mutex::new(Vec::new()),
            sink,
            names,
            started: Instant::now(),
        }
    }

    // ===== accessors =====

    pub fn version(&self) -> ProtocolVersion {
        self.settings.version
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn client(&self) -> &ClientState {
        &self.client
    }

    pub fn scope(&self) -> &ScopeTable {
        &self.scope
    }

    pub fn connection(&self) -> &ConnectionStateMachine {
        &self.connection
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.current()
    }

    pub fn names(&self) -> &dyn NameOracle {
        self.names.as_ref()
    }

    pub fn servers(&self) -> Vec<ServerEntry> {
        self.servers.lock().clone()
    }

    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        self.connection_info.lock().clone()
    }

    pub fn characters(&self) -> Vec<CharacterSummary> {
        self.characters.lock().clone()
    }

    /// Build a frame and hand it to the sink; failures are logged
    pub fn send<F: FnOnce(&mut BytesMut)>(&self, what: &str, build: F) -> bool {
        let mut buf = BytesMut::with_capacity(64);
        build(&mut buf);
        tracing::trace!("Sending {} ({} bytes)", what, buf.len());
        match self.sink.send(buf) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to send {}: {}", what, e);
                false
            }
        }
    }

    fn require_state(&self, required: ConnectionState, what: &str) -> bool {
        let current = self.connection.current();
        if current != required {
            tracing::warn!("Ignoring {}: expected state {}, current {}", what, required, current);
            return false;
        }
        true
    }

    // ===== position & identity =====

    /// Authoritative position; the own scope entry follows along
    pub fn set_position(&self, position: TilePosition) {
        self.client.set_position(position);
        let own = self.client.character_id();
        if self.client.is_self(own) {
            self.scope.try_update_position(own, position);
        }
    }

    pub fn set_map(&self, map: u16) {
        let previous = self.client.map();
        if previous != map {
            tracing::info!("Map changed {} -> {}", previous, map);
        }
        self.client.set_map(map);
    }

    pub fn set_character_id(&self, id: ObjectId) {
        tracing::debug!("Character id {:#06x} (raw {:#06x})", id.masked(), id.raw());
        self.client.set_character_id(id.masked());
    }

    pub fn is_self(&self, id: ObjectId) -> bool {
        self.client.is_self(id.masked())
    }

    /// Entering the world completes the login sequence
    pub fn set_in_game_status(&self, in_game: bool) {
        self.client.set_in_game(in_game);
        if in_game && !self.connection.is(ConnectionState::InGame) {
            self.connection.transition(ConnectionState::InGame);
        }
    }

    // ===== vitals =====

    pub fn update_current_health_shield(&self, health: u32, shield: u32) {
        self.client.update_vitals(|vitals| {
            vitals.health.set_current(health);
            vitals.shield.set_current(shield);
        });
    }

    pub fn update_maximum_health_shield(&self, health: u32, shield: u32) {
        self.client.update_vitals(|vitals| {
            vitals.health.set_maximum(health);
            vitals.shield.set_maximum(shield);
        });
    }

    pub fn update_current_mana_ability(&self, mana: u32, ability: u32) {
        self.client.update_vitals(|vitals| {
            vitals.mana.set_current(mana);
            vitals.ability.set_current(ability);
        });
    }

    pub fn update_maximum_mana_ability(&self, mana: u32, ability: u32) {
        self.client.update_vitals(|vitals| {
            vitals.mana.set_maximum(mana);
            vitals.ability.set_maximum(ability);
        });
    }

    fn update_maxima(&self, health: u32, mana: u32, shield: u32, ability: u32) {
        self.update_maximum_health_shield(health, shield);
        self.update_maximum_mana_ability(mana, ability);
    }

    // ===== stats & progress =====

    pub fn update_stats(&self, stats: CharacterStats) {
        self.client.set_stats(stats);
    }

    /// Apply a successful stat point investment
    pub fn increase_stat(&self, attribute: StatAttribute, dependent_maximum: u32, maximum_shield: u32, maximum_ability: u32) {
        if let StatAttribute::Unknown(code) = attribute {
            tracing::warn!("Stat increase for unknown attribute {}", code);
            return;
        }
        self.client.update_stats(|stats| {
            let slot = match attribute {
                StatAttribute::Strength => &mut stats.strength,
                StatAttribute::Agility => &mut stats.agility,
                StatAttribute::Vitality => &mut stats.vitality,
                StatAttribute::Energy => &mut stats.energy,
                StatAttribute::Leadership | StatAttribute::Unknown(_) => &mut stats.leadership,
            };
            *slot = slot.saturating_add(1);
        });
        self.client.update_progress(|progress| {
            progress.level_up_points = progress.level_up_points.saturating_sub(1);
        });
        self.client.update_vitals(|vitals| {
            match attribute {
                StatAttribute::Vitality => vitals.health.set_maximum(dependent_maximum),
                StatAttribute::Energy => vitals.mana.set_maximum(dependent_maximum),
                _ => {}
            }
            vitals.shield.set_maximum(maximum_shield);
            vitals.ability.set_maximum(maximum_ability);
        });
    }

    pub fn set_level_progress(&self, update: &LevelUpdate) {
        tracing::info!("Level up: {} ({} points available)", update.level, update.level_up_points);
        self.client.update_progress(|progress| {
            progress.level = update.level;
            progress.level_up_points = update.level_up_points;
        });
        self.update_maxima(
            update.maximum_health,
            update.maximum_mana,
            update.maximum_shield,
            update.maximum_ability,
        );
    }

    pub fn set_experience(&self, experience: u64, next_experience: u64) {
        self.client.update_progress(|progress| {
            progress.experience = experience;
            progress.next_experience = next_experience;
        });
    }

    pub fn set_level_up_points(&self, points: u16) {
        self.client.update_progress(|progress| progress.level_up_points = points);
    }

    pub fn add_experience(&self, amount: u64) {
        self.client.update_progress(|progress| {
            progress.experience = progress.experience.saturating_add(amount);
        });
    }

    pub fn set_money(&self, money: u32) {
        self.client.update_progress(|progress| progress.money = money);
    }

    pub fn apply_master_stats(&self, stats: &MasterStats) {
        self.client.update_progress(|progress| {
            progress.master_level = stats.master_level;
            progress.master_points = stats.master_points;
        });
        self.update_maxima(stats.maximum_health, stats.maximum_mana, stats.maximum_shield, stats.maximum_ability);
    }

    pub fn set_master_level(&self, update: &MasterLevelUpdate) {
        tracing::info!("Master level up: {} (+{} points)", update.master_level, update.gained_points);
        self.client.update_progress(|progress| {
            progress.master_level = update.master_level;
            progress.master_points = update.master_points;
        });
        self.update_maxima(
            update.maximum_health,
            update.maximum_mana,
            update.maximum_shield,
            update.maximum_ability,
        );
    }

    pub fn apply_skill_update(&self, update: &SkillUpdate) {
        match update {
            SkillUpdate::Added(skill) => tracing::debug!("Skill {} added in slot {}", skill.number, skill.slot),
            SkillUpdate::Removed(skill) => tracing::debug!("Skill {} removed from slot {}", skill.number, skill.slot),
            SkillUpdate::List(skills) => tracing::debug!("Skill list with {} entries", skills.len()),
        }
        self.client.apply_skill_update(update);
    }

    // ===== scope =====

    pub fn add_or_update_player_in_scope(&self, id: ObjectId, position: TilePosition, name: &str) {
        self.scope.add_or_update(id, position, ScopeKind::Player { name: name.to_string() });
    }

    pub fn add_or_update_npc_in_scope(&self, id: ObjectId, position: TilePosition, type_number: u16, name: Option<String>) {
        self.scope.add_or_update(id, position, ScopeKind::Npc { type_number, name });
    }

    pub fn add_or_update_item_in_scope(&self, id: ObjectId, position: TilePosition, info: &ItemInfo, data: Vec<u8>) {
        let description = self.names.item_name(info);
        tracing::debug!("Item dropped: {} at {}", description, position);
        self.scope.add_or_update(id, position, ScopeKind::Item { description, data });
    }

    pub fn add_or_update_money_in_scope(&self, id: ObjectId, position: TilePosition, amount: u32) {
        tracing::debug!("Money dropped: {} at {}", amount, position);
        self.scope.add_or_update(id, position, ScopeKind::Money { amount });
    }

    pub fn remove_from_scope(&self, masked_id: u16) -> bool {
        self.scope.remove(masked_id)
    }

    pub fn try_update_scope_position(&self, masked_id: u16, position: TilePosition) -> bool {
        self.scope.try_update_position(masked_id, position)
    }

    pub fn clear_scope(&self, keep_self: bool) {
        let keep = keep_self.then(|| self.client.character_id());
        self.scope.clear(keep);
    }

    /// Remove a dropped item by id, optionally resolving ids that some
    /// servers send wrong
    ///
    /// With the workaround enabled, an id that is not in scope, fits in one
    /// byte, and arrives while exactly one ground object is known removes
    /// that object instead.
    pub fn remove_dropped_item(&self, masked_id: u16) -> bool {
        if self.scope.remove(masked_id) {
            return true;
        }
        if !self.settings.item_drop_id_workaround || masked_id > 0x00FF {
            return false;
        }
        let ground = self.scope.ground_items();
        match ground.as_slice() {
            [only] => {
                tracing::warn!(
                    "Item drop removal for unknown id {:#06x}, removing lone ground object {:#06x}",
                    masked_id,
                    only.masked_id()
                );
                self.scope.remove(only.masked_id())
            }
            _ => false,
        }
    }

    // ===== request lock =====

    pub fn signal_movement_handled(&self) {
        if !self.client.transition_request(RequestEvent::MoveConfirmed) {
            tracing::warn!("Movement confirmation without a pending movement request");
        }
    }

    /// Release the movement lock if held; silent otherwise
    pub fn signal_movement_handled_if_walking(&self) -> bool {
        self.client.is_walking() && self.client.transition_request(RequestEvent::MoveConfirmed)
    }

    pub fn confirm_pickup(&self, succeeded: bool) {
        self.client.transition_request(RequestEvent::PickupConfirmed { succeeded });
    }

    pub fn force_release_requests(&self) {
        if self.client.transition_request(RequestEvent::ForceRelease) {
            tracing::debug!("Request lock force-released");
        }
    }

    fn begin_request(&self, event: RequestEvent, what: &str) -> bool {
        if !self.client.is_in_game() {
            tracing::warn!("Cannot {} outside the game", what);
            return false;
        }
        if !self.client.transition_request(event) {
            tracing::warn!("Cannot {}: another request is in flight", what);
            return false;
        }
        true
    }

    fn finish_send(&self, sent: bool) -> bool {
        if !sent {
            self.force_release_requests();
        }
        sent
    }

    /// Ask to be placed on `target`; takes the movement lock
    pub fn request_instant_move(&self, target: TilePosition) -> bool {
        if !self.begin_request(RequestEvent::BeginMove, "move") {
            return false;
        }
        let sent = self.send("instant move", |buf| packet_builder::build_instant_move_request(buf, target));
        self.finish_send(sent)
    }

    /// Walk from the current position along server direction codes
    pub fn request_walk(&self, directions: &[u8]) -> bool {
        if directions.is_empty() || !self.begin_request(RequestEvent::BeginMove, "walk") {
            return false;
        }
        let source = self.client.position();
        let sent = self.send("walk", |buf| packet_builder::build_walk_request(buf, source, directions));
        self.finish_send(sent)
    }

    /// Pick up the ground object with `raw_id`; takes the pickup lock
    pub fn request_pickup(&self, raw_id: u16) -> bool {
        if !self.begin_request(RequestEvent::BeginPickup, "pick up") {
            return false;
        }
        let sent = self.send("pickup", |buf| packet_builder::build_pickup_request(buf, raw_id));
        self.finish_send(sent)
    }

    // ===== connect server =====

    pub fn request_server_list(&self) -> bool {
        if !self.require_state(ConnectionState::ConnectedToConnectServer, "server list request") {
            return false;
        }
        if !self.send("server list request", packet_builder::build_server_list_request) {
            return false;
        }
        self.connection.transition(ConnectionState::RequestingServerList)
    }

    pub fn store_server_list(&self, servers: Vec<ServerEntry>) {
        tracing::info!("Received {} game servers", servers.len());
        *self.servers.lock() = servers;
        if self.connection.is(ConnectionState::RequestingServerList) {
            self.connection.transition(ConnectionState::ReceivedServerList);
        }
    }

    pub fn select_server(&self, server_id: u16) -> bool {
        if !self.require_state(ConnectionState::ReceivedServerList, "server selection") {
            return false;
        }
        if !self.servers.lock().iter().any(|server| server.server_id == server_id) {
            tracing::warn!("Server {} is not in the server list", server_id);
            return false;
        }
        tracing::info!("Selecting server {}", server_id);
        if !self.send("connection info request", |buf| {
            packet_builder::build_connection_info_request(buf, server_id)
        }) {
            return false;
        }
        self.connection.transition(ConnectionState::RequestingConnectionInfo)
    }

    pub fn store_connection_info(&self, info: ConnectionInfo) {
        tracing::info!("Game server address {}:{}", info.host, info.port);
        *self.connection_info.lock() = Some(info);
        if self.connection.is(ConnectionState::RequestingConnectionInfo) {
            self.connection.transition(ConnectionState::ReceivedConnectionInfo);
        }
    }

    /// Ask the transport to move over to the game server
    pub fn switch_to_game_server(&self, host: &str, port: u16) -> bool {
        if !self.connection.transition(ConnectionState::ConnectingToGameServer) {
            return false;
        }
        match self.sink.connect_game_server(host, port) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to switch to game server {}:{}: {}", host, port, e);
                false
            }
        }
    }

    // ===== game server session =====

    pub fn send_login_request(&self) -> bool {
        if !self.require_state(ConnectionState::ConnectedToGameServer, "login request") {
            return false;
        }
        let credentials = &self.settings.credentials;
        let request = LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
            tick_count: self.started.elapsed().as_millis() as u32,
            client_version: &credentials.client_version,
            client_serial: &credentials.client_serial,
        };
        tracing::info!("Logging in as {}", credentials.username);
        if !self.send("login request", |buf| {
            packet_builder::build_login_request(buf, self.settings.version, &request)
        }) {
            return false;
        }
        self.connection.transition(ConnectionState::Authenticating)
    }

    /// Login accepted; move on to character selection
    pub fn login_succeeded(&self) -> bool {
        self.connection.transition(ConnectionState::SelectingCharacter) && self.request_character_list()
    }

    pub fn request_character_list(&self) -> bool {
        if !self.require_state(ConnectionState::SelectingCharacter, "character list request") {
            return false;
        }
        self.send("character list request", packet_builder::build_character_list_request)
    }

    pub fn store_character_list(&self, characters: Vec<CharacterSummary>) {
        for character in &characters {
            tracing::info!(
                "Character slot {}: {} level {} ({})",
                character.slot,
                character.name,
                character.level,
                self.names
                    .class_name(character.class, self.settings.version)
                    .unwrap_or("unknown class")
            );
        }
        *self.characters.lock() = characters;
    }

    pub fn select_character(&self, name: &str) -> bool {
        if !self.require_state(ConnectionState::SelectingCharacter, "character selection") {
            return false;
        }
        let Some(class) = self
            .characters
            .lock()
            .iter()
            .find(|character| character.name == name)
            .map(|character| character.class)
        else {
            tracing::warn!("Character {} is not in the character list", name);
            return false;
        };
        tracing::info!("Selecting character {}", name);
        if !self.send("character selection", |buf| {
            packet_builder::build_select_character_request(buf, name)
        }) {
            return false;
        }
        self.client.set_character_name(Some(name.to_string()));
        self.client.set_class(class);
        true
    }

    /// Server-signalled exit from the world
    pub fn leave_game(&self) {
        self.client.set_in_game(false);
        self.force_release_requests();
        self.clear_scope(false);
        if self.connection.is(ConnectionState::InGame) {
            self.connection.transition(ConnectionState::ConnectedToGameServer);
        }
    }

    /// Logout to the character screen without reconnecting
    pub fn return_to_character_selection(&self) -> bool {
        self.leave_game();
        self.connection.transition(ConnectionState::Authenticating)
            && self.connection.transition(ConnectionState::SelectingCharacter)
            && self.request_character_list()
    }

    /// Ask the server to end the session; the answer arrives as a logout packet
    pub fn request_logout(&self, logout_type: u8) -> bool {
        if !self.require_state(ConnectionState::InGame, "logout request") {
            return false;
        }
        self.send("logout request", |buf| packet_builder::build_logout_request(buf, logout_type))
    }

    pub fn mark_disconnected(&self) {
        self.client.set_in_game(false);
        self.force_release_requests();
        self.scope.clear(None);
        if !self.connection.is(ConnectionState::Disconnected) {
            self.connection.transition(ConnectionState::Disconnected);
        }
    }

    /// One-line status for the console
    pub fn summary(&self) -> String {
        let vitals = self.client.vitals();
        let progress = self.client.progress();
        let pair = |vital: VitalPair| format!("{}/{}", vital.current(), vital.maximum());
        format!(
            "{} | {} lv {} | map {} at {} | hp {} sd {} mp {} ag {} | zen {} | {} in scope",
            self.connection.current(),
            self.client.character_name().unwrap_or_else(|| "-".to_string()),
            progress.level,
            self.client.map(),
            self.client.position(),
            pair(vitals.health),
            pair(vitals.shield),
            pair(vitals.mana),
            pair(vitals.ability),
            progress.money,
            self.scope.len(),
        )
    }
}
