//! # Game Server Handlers
//!
//! One function per packet key: decode with the pure decoder for the
//! negotiated version, then fold the result into [`GameState`]. A decoder
//! error returns before any state is touched.
//!
//! Movement, death and damage packets compare the subject against the own
//! character id and take a different branch for "me" and "someone else".

use crate::handlers::HandlerRegistry;
use muclient_game::GameState;
use muclient_protocol::packets::sub_codes;
use muclient_protocol::{
    character, items, messages, scope, session, vitals, DecodeError, DroppedKind, Frame, GameServerCode, LoginResult,
    LogoutType, PickupResult,
};

type Handler = fn(&Frame<'_>, &GameState) -> Result<(), DecodeError>;

const fn key(code: GameServerCode, sub_code: Option<u8>) -> (u8, Option<u8>) {
    (code as u8, sub_code)
}

const HANDLERS: &[((u8, Option<u8>), Handler)] = &[
    // messages
    (key(GameServerCode::ChatMessage, None), handle_chat),
    (key(GameServerCode::WhisperMessage, None), handle_whisper),
    (key(GameServerCode::ServerMessage, None), handle_server_message),
    (key(GameServerCode::WeatherUpdate, None), handle_weather),
    // scope & movement
    (key(GameServerCode::ObjectHit, None), handle_object_hit),
    (key(GameServerCode::AddCharactersToScope, None), handle_add_characters),
    (key(GameServerCode::AddNpcsToScope, None), handle_add_npcs),
    (key(GameServerCode::MapObjectOutOfScope, None), handle_out_of_scope),
    (key(GameServerCode::ObjectMoved, None), handle_object_moved),
    (key(GameServerCode::ExperienceGained, None), handle_experience_gained),
    (key(GameServerCode::ObjectGotKilled, None), handle_object_killed),
    (key(GameServerCode::ObjectAnimation, None), handle_object_animation),
    (key(GameServerCode::MapChanged, None), handle_map_changed),
    (key(GameServerCode::ObjectWalked, None), handle_object_walked),
    // items
    (key(GameServerCode::ItemsDropped, None), handle_items_dropped),
    (key(GameServerCode::ItemDropRemoved, None), handle_item_drop_removed),
    (key(GameServerCode::ItemPickupResult, None), handle_pickup_result),
    // vitals
    (key(GameServerCode::HealthShield, Some(sub_codes::CURRENT)), handle_current_health_shield),
    (key(GameServerCode::HealthShield, Some(sub_codes::MAXIMUM)), handle_maximum_health_shield),
    (key(GameServerCode::ManaAbility, Some(sub_codes::CURRENT)), handle_current_mana_ability),
    (key(GameServerCode::ManaAbility, Some(sub_codes::MAXIMUM)), handle_maximum_mana_ability),
    // session
    (key(GameServerCode::Session, Some(sub_codes::GAME_SERVER_ENTERED)), handle_game_server_entered),
    (key(GameServerCode::Session, Some(sub_codes::LOGIN)), handle_login_result),
    (key(GameServerCode::Session, Some(sub_codes::LOGOUT)), handle_logout),
    // character
    (key(GameServerCode::Character, Some(sub_codes::CHARACTER_LIST)), handle_character_list),
    (key(GameServerCode::Character, Some(sub_codes::CHARACTER_INFORMATION)), handle_character_information),
    (key(GameServerCode::Character, Some(sub_codes::RESPAWN_AFTER_DEATH)), handle_respawn),
    (key(GameServerCode::Character, Some(sub_codes::LEVEL_UPDATE)), handle_level_update),
    (key(GameServerCode::Character, Some(sub_codes::STAT_INCREASE_RESULT)), handle_stat_increase),
    (key(GameServerCode::Character, Some(sub_codes::SKILL_LIST)), handle_skill_update),
    (key(GameServerCode::Character, Some(sub_codes::MASTER_STATS)), handle_master_stats),
    (key(GameServerCode::Character, Some(sub_codes::MASTER_LEVEL_UPDATE)), handle_master_level_update),
];

/// Fill `registry` with the game server handlers
pub fn register(registry: &mut HandlerRegistry) {
    for &((code, sub_code), handler) in HANDLERS {
        // duplicates are reported by the registry
        let _ = registry.register(code, sub_code, handler);
    }
}

// ===== messages =====

fn handle_chat(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let chat = messages::decode_chat(frame.packet, state.version())?;
    tracing::info!("[chat] {}: {}", chat.sender, chat.message);
    Ok(())
}

fn handle_whisper(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let chat = messages::decode_whisper(frame.packet, state.version())?;
    tracing::info!("[whisper] {}: {}", chat.sender, chat.message);
    Ok(())
}

fn handle_server_message(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let notice = messages::decode_server_message(frame.packet, state.version())?;
    tracing::info!("[server:{}] {}", notice.kind, notice.message);
    Ok(())
}

fn handle_weather(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let weather = messages::decode_weather(frame.packet, state.version())?;
    tracing::trace!("Weather {:#04x}", weather);
    Ok(())
}

// ===== scope & movement =====

fn handle_object_hit(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let hit = scope::decode_object_hit(frame.packet, state.version())?;
    if state.is_self(hit.id) {
        tracing::info!(
            "Took {} damage ({} to shield), health {}",
            hit.health_damage,
            hit.shield_damage,
            state.client().vitals().health.current()
        );
    } else {
        tracing::debug!("Object {:#06x} took {} damage", hit.id.masked(), hit.health_damage);
    }
    Ok(())
}

fn handle_add_characters(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let players = scope::decode_add_characters(frame.packet, state.version())?;
    for player in players {
        state.add_or_update_player_in_scope(player.id, player.position, &player.name);
    }
    Ok(())
}

fn handle_add_npcs(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let npcs = scope::decode_add_npcs(frame.packet, state.version())?;
    for npc in npcs {
        let name = state.names().npc_name(npc.type_number);
        state.add_or_update_npc_in_scope(npc.id, npc.position, npc.type_number, name);
    }
    Ok(())
}

fn handle_out_of_scope(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    for id in scope::decode_id_list(frame.packet, state.version())? {
        if !state.remove_from_scope(id.masked()) {
            tracing::trace!("Out of scope for unknown object {:#06x}", id.masked());
        }
    }
    Ok(())
}

fn handle_object_moved(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let moved = scope::decode_object_moved(frame.packet, state.version())?;
    if state.is_self(moved.id) {
        tracing::debug!("Moved to {}", moved.position);
        state.set_position(moved.position);
        state.signal_movement_handled_if_walking();
    } else {
        state.try_update_scope_position(moved.id.masked(), moved.position);
    }
    Ok(())
}

fn handle_object_walked(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let walked = scope::decode_object_walked(frame.packet, state.version())?;
    if state.is_self(walked.id) {
        tracing::debug!("Walked to {} ({} steps)", walked.target, walked.step_count);
        state.set_position(walked.target);
        state.signal_movement_handled_if_walking();
    } else {
        state.try_update_scope_position(walked.id.masked(), walked.target);
    }
    Ok(())
}

fn handle_experience_gained(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let gained = scope::decode_experience_gained(frame.packet, state.version())?;
    tracing::info!(
        "Gained {} experience for {:#06x} ({} damage)",
        gained.experience,
        gained.killed.masked(),
        gained.damage
    );
    state.add_experience(gained.experience as u64);
    Ok(())
}

fn handle_object_killed(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let killed = scope::decode_object_killed(frame.packet, state.version())?;
    if state.is_self(killed.killed) {
        tracing::warn!("Killed by {:#06x}", killed.killer.masked());
        state.update_current_health_shield(0, 0);
    } else {
        tracing::debug!("Object {:#06x} died", killed.killed.masked());
        state.remove_from_scope(killed.killed.masked());
    }
    Ok(())
}

fn handle_object_animation(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let animation = scope::decode_object_animation(frame.packet, state.version())?;
    tracing::trace!(
        "Object {:#06x} animation {} towards {:#06x}",
        animation.id.masked(),
        animation.animation,
        animation.target.masked()
    );
    Ok(())
}

fn handle_map_changed(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let changed = scope::decode_map_changed(frame.packet, state.version())?;
    if changed.is_map_change {
        state.clear_scope(true);
    }
    state.set_map(changed.map);
    state.set_position(changed.position);
    Ok(())
}

// ===== items =====

fn handle_items_dropped(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    for item in items::decode_items_dropped(frame.packet, state.version())? {
        match item.kind {
            DroppedKind::Money { amount } => state.add_or_update_money_in_scope(item.id, item.position, amount),
            DroppedKind::Item { info, data } => state.add_or_update_item_in_scope(item.id, item.position, &info, data),
        }
    }
    Ok(())
}

fn handle_item_drop_removed(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    for id in scope::decode_id_list(frame.packet, state.version())? {
        if !state.remove_dropped_item(id.masked()) {
            tracing::trace!("Drop removal for unknown object {:#06x}", id.masked());
        }
    }
    Ok(())
}

fn handle_pickup_result(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    match items::decode_pickup_result(frame.packet, state.version())? {
        PickupResult::Failed => {
            tracing::info!("Pickup failed");
            state.confirm_pickup(false);
        }
        PickupResult::Money { amount } => {
            tracing::info!("Picked up zen, now {}", amount);
            state.set_money(amount);
            state.confirm_pickup(true);
        }
        PickupResult::Item { slot, .. } => {
            tracing::info!("Picked up item into slot {}", slot);
            state.confirm_pickup(true);
        }
    }
    Ok(())
}

// ===== vitals =====

fn handle_current_health_shield(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let values = vitals::decode_health_shield(frame.packet, state.version())?;
    state.update_current_health_shield(values.health, values.shield);
    Ok(())
}

fn handle_maximum_health_shield(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let values = vitals::decode_health_shield(frame.packet, state.version())?;
    state.update_maximum_health_shield(values.health, values.shield);
    Ok(())
}

fn handle_current_mana_ability(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let values = vitals::decode_mana_ability(frame.packet, state.version())?;
    state.update_current_mana_ability(values.mana, values.ability);
    Ok(())
}

fn handle_maximum_mana_ability(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let values = vitals::decode_mana_ability(frame.packet, state.version())?;
    state.update_maximum_mana_ability(values.mana, values.ability);
    Ok(())
}

// ===== session =====

fn handle_game_server_entered(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let entered = session::decode_game_server_entered(frame.packet, state.version())?;
    if !entered.success {
        tracing::warn!("Game server refused the connection");
        return Ok(());
    }
    tracing::info!("Entered game server (version {})", entered.server_version);
    state.set_character_id(entered.player_id);
    state.send_login_request();
    Ok(())
}

fn handle_login_result(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    match session::decode_login_result(frame.packet, state.version())? {
        LoginResult::Ok => {
            tracing::info!("Login successful");
            state.login_succeeded();
        }
        other => tracing::warn!("Login failed: {:?}", other),
    }
    Ok(())
}

fn handle_logout(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let logout = session::decode_logout(frame.packet, state.version())?;
    tracing::info!("Logout: {:?}", logout);
    match logout {
        LogoutType::BackToCharacterSelection => {
            state.return_to_character_selection();
        }
        LogoutType::CloseGame | LogoutType::BackToServerSelection | LogoutType::Other(_) => state.leave_game(),
    }
    Ok(())
}

// ===== character =====

fn handle_character_list(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let characters = session::decode_character_list(frame.packet, state.version())?;
    state.store_character_list(characters);
    if let Some(name) = &state.settings().auto_character {
        state.select_character(name);
    }
    Ok(())
}

fn handle_character_information(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let info = character::decode_character_information(frame.packet, state.version())?;
    let vitals = info.vitals;

    state.set_map(info.map);
    state.set_position(info.position);
    state.update_maximum_health_shield(vitals.maximum_health, vitals.maximum_shield);
    state.update_maximum_mana_ability(vitals.maximum_mana, vitals.maximum_ability);
    state.update_current_health_shield(vitals.health, vitals.shield);
    state.update_current_mana_ability(vitals.mana, vitals.ability);
    state.update_stats(info.stats);
    state.set_experience(info.experience, info.next_experience);
    state.set_level_up_points(info.level_up_points);
    state.set_money(info.money);
    state.set_in_game_status(true);

    tracing::info!("Entered the world on map {} at {}", info.map, info.position);
    Ok(())
}

fn handle_respawn(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let respawn = character::decode_respawn(frame.packet, state.version())?;
    state.clear_scope(true);
    state.set_map(respawn.map);
    state.set_position(respawn.position);
    state.update_current_health_shield(respawn.health, respawn.shield);
    state.update_current_mana_ability(respawn.mana, respawn.ability);
    state.client().update_progress(|progress| progress.experience = respawn.experience);
    state.set_money(respawn.money);
    tracing::info!("Respawned on map {} at {}", respawn.map, respawn.position);
    Ok(())
}

fn handle_level_update(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let update = character::decode_level_update(frame.packet, state.version())?;
    state.set_level_progress(&update);
    Ok(())
}

fn handle_stat_increase(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let result = character::decode_stat_increase(frame.packet, state.version())?;
    if result.success {
        state.increase_stat(
            result.attribute,
            result.dependent_maximum,
            result.maximum_shield,
            result.maximum_ability,
        );
    } else {
        tracing::warn!("Stat increase for {:?} refused", result.attribute);
    }
    Ok(())
}

fn handle_skill_update(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let update = character::decode_skill_update(frame.packet, state.version())?;
    state.apply_skill_update(&update);
    Ok(())
}

fn handle_master_stats(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let stats = character::decode_master_stats(frame.packet, state.version())?;
    state.apply_master_stats(&stats);
    Ok(())
}

fn handle_master_level_update(frame: &Frame<'_>, state: &GameState) -> Result<(), DecodeError> {
    let update = character::decode_master_level_update(frame.packet, state.version())?;
    state.set_master_level(&update);
    Ok(())
}
