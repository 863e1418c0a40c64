//! # Packet Handler System
//!
//! Routing of classified frames to the handler registered for their key.
//!
//! # Architecture
//!
//! ## Handler Registry
//!
//! Maps `(code, sub-code)` to a handler function. Handlers decode the frame
//! with a pure decoder and fold the result into [`GameState`]. Registration
//! happens once at construction; the first registration of a key wins.
//!
//! ## Dispatcher
//!
//! Owns one registry per server and the routing mode. For each frame it:
//!
//! 1. drops it if the policy filter suppresses its code (game server only)
//! 2. classifies it under the current routing mode
//! 3. looks up `(code, sub-code)`, falling back to `(code, none)`
//! 4. runs the handler and logs any decode error by severity
//!
//! Nothing is returned to the transport; one bad frame never ends the
//! stream.
//!
//! # Thread Safety
//!
//! Routing runs on the receive task only. The state it writes is shared
//! with the command task through the locks inside [`GameState`].

use muclient_game::GameState;
use muclient_protocol::{classify, ConnectServerCode, DecodeError, DispatchError, Frame, GameServerCode, RoutingMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Type for packet handler functions
///
/// Handlers run synchronously on the receive task and must not block or
/// perform I/O; outbound packets go through the state's packet sink.
pub type HandlerFunction = Arc<dyn Fn(&Frame<'_>, &GameState) -> Result<(), DecodeError> + Send + Sync>;

/// Registry key: code plus optional sub-code
pub type HandlerKey = (u8, Option<u8>);

/// Registry of packet handlers for one server
pub struct HandlerRegistry {
    name: &'static str,
    handlers: HashMap<HandlerKey, HandlerFunction>,
}

impl HandlerRegistry {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for `(code, sub_code)`
    ///
    /// # Errors
    /// `DuplicateHandlerRegistration` if the key is taken; the existing
    /// handler stays in place.
    pub fn register<F>(&mut self, code: u8, sub_code: Option<u8>, handler: F) -> Result<(), DispatchError>
    where
        F: Fn(&Frame<'_>, &GameState) -> Result<(), DecodeError> + Send + Sync + 'static,
    {
        let key = (code, sub_code);
        if self.handlers.contains_key(&key) {
            let err = DispatchError::DuplicateHandlerRegistration { code, sub_code };
            tracing::warn!("{} registry: {}", self.name, err);
            return Err(err);
        }
        tracing::trace!("{} registry: handler for {:#04x}/{:?}", self.name, code, sub_code);
        self.handlers.insert(key, Arc::new(handler));
        Ok(())
    }

    /// Exact match first, then the code-only entry
    pub fn lookup(&self, code: u8, sub_code: Option<u8>) -> Option<&HandlerFunction> {
        self.handlers.get(&(code, sub_code)).or_else(|| match sub_code {
            Some(_) => self.handlers.get(&(code, None)),
            None => None,
        })
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Codes dropped before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketFilter {
    pub weather: bool,
    pub damage: bool,
}

impl PacketFilter {
    fn suppresses(&self, code: u8) -> bool {
        (self.weather && code == GameServerCode::WeatherUpdate.as_u8())
            || (self.damage && code == GameServerCode::ObjectHit.as_u8())
    }
}

/// What happened to one routed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A handler ran to completion
    Handled,
    /// No handler for the key
    Unhandled,
    /// Suppressed by the policy filter
    Filtered,
    /// Classification or decoding failed
    Dropped,
}

pub struct Dispatcher {
    connect_handlers: HandlerRegistry,
    game_handlers: HandlerRegistry,
    mode: Mutex<RoutingMode>,
    filter: PacketFilter,
    state: Arc<GameState>,
}

impl Dispatcher {
    /// Dispatcher with the standard connect and game server handlers
    pub fn new(state: Arc<GameState>, filter: PacketFilter) -> Self {
        let mut connect_handlers = HandlerRegistry::new("connect server");
        crate::connect_handlers::register(&mut connect_handlers);
        let mut game_handlers = HandlerRegistry::new("game server");
        crate::game_handlers::register(&mut game_handlers);
        Self::with_registries(state, filter, connect_handlers, game_handlers)
    }

    pub fn with_registries(
        state: Arc<GameState>,
        filter: PacketFilter,
        connect_handlers: HandlerRegistry,
        game_handlers: HandlerRegistry,
    ) -> Self {
        tracing::debug!(
            "Dispatcher ready: {} connect server handlers, {} game server handlers",
            connect_handlers.handler_count(),
            game_handlers.handler_count()
        );
        Self {
            connect_handlers,
            game_handlers,
            mode: Mutex::new(RoutingMode::ConnectServer),
            filter,
            state,
        }
    }

    pub fn state(&self) -> &Arc<GameState> {
        &self.state
    }

    pub fn routing_mode(&self) -> RoutingMode {
        *self.mode.lock()
    }

    /// The only way the routing mode ever changes
    pub fn switch_to_game_server(&self) {
        let mut mode = self.mode.lock();
        if *mode != RoutingMode::GameServer {
            tracing::info!("Routing switched to game server");
            *mode = RoutingMode::GameServer;
        }
    }

    /// Route one complete, decrypted frame
    pub fn route(&self, buffer: &[u8]) -> RouteOutcome {
        let mode = self.routing_mode();

        if mode == RoutingMode::GameServer {
            if let Some(code) = game_server_code_of(buffer) {
                if self.filter.suppresses(code) {
                    tracing::trace!("Filtered packet {:#04x}", code);
                    return RouteOutcome::Filtered;
                }
            }
        }

        let frame = match classify(buffer, mode) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Dropping frame: {} ({:02X?})", e, &buffer[..buffer.len().min(8)]);
                return RouteOutcome::Dropped;
            }
        };

        let registry = match mode {
            RoutingMode::ConnectServer => &self.connect_handlers,
            RoutingMode::GameServer => &self.game_handlers,
        };

        let Some(handler) = registry.lookup(frame.code, frame.sub_code) else {
            let err = DispatchError::NoDecoderRegistered {
                code: frame.code,
                sub_code: frame.sub_code,
            };
            tracing::debug!("{} [{}, {} bytes]", err, code_name(mode, frame.code), frame.packet.len());
            return RouteOutcome::Unhandled;
        };

        match handler(&frame, &self.state) {
            Ok(()) => RouteOutcome::Handled,
            Err(source) => {
                self.on_decode_error(&frame, mode, source);
                RouteOutcome::Dropped
            }
        }
    }

    fn on_decode_error(&self, frame: &Frame<'_>, mode: RoutingMode, source: DecodeError) {
        let out_of_range = matches!(source, DecodeError::IndexOutOfRange { .. });
        let err = DispatchError::Decode {
            code: frame.code,
            sub_code: frame.sub_code,
            source,
        };
        if out_of_range {
            tracing::error!("{}", err);
        } else {
            tracing::warn!("{}", err);
        }

        if mode == RoutingMode::GameServer && is_movement_confirmation(frame.code) {
            if self.state.signal_movement_handled_if_walking() {
                tracing::debug!("Released movement lock after failed confirmation {:#04x}", frame.code);
            }
        }
    }
}

/// Code byte of a game server frame, without full classification
fn game_server_code_of(buffer: &[u8]) -> Option<u8> {
    match buffer.first()? {
        0xC1 | 0xC3 => buffer.get(2).copied(),
        0xC2 | 0xC4 => buffer.get(3).copied(),
        _ => None,
    }
}

/// Known opcode group name for logs, `unknown` otherwise
fn code_name(mode: RoutingMode, code: u8) -> String {
    let name = match mode {
        RoutingMode::ConnectServer => ConnectServerCode::from_u8(code).map(|c| format!("{:?}", c)),
        RoutingMode::GameServer => GameServerCode::from_u8(code).map(|c| format!("{:?}", c)),
    };
    name.unwrap_or_else(|| "unknown".to_string())
}

fn is_movement_confirmation(code: u8) -> bool {
    code == GameServerCode::ObjectMoved.as_u8() || code == GameServerCode::ObjectWalked.as_u8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{in_game_dispatcher, recording_state, RecordingSink};
    use muclient_core::{ProtocolVersion, TilePosition};
    use muclient_game::GameSettings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn(&Frame<'_>, &GameState) -> Result<(), DecodeError> + Send + Sync + 'static {
        let counter = counter.clone();
        move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn game_dispatcher(game_handlers: HandlerRegistry) -> (Dispatcher, Arc<RecordingSink>) {
        let (state, sink) = recording_state(GameSettings::default());
        let dispatcher = Dispatcher::with_registries(
            state,
            PacketFilter::default(),
            HandlerRegistry::new("connect server"),
            game_handlers,
        );
        dispatcher.switch_to_game_server();
        (dispatcher, sink)
    }

    #[test]
    fn test_duplicate_registration_first_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new("test");
        assert!(registry.register(0xF3, Some(0x03), counting_handler(&first)).is_ok());
        assert_eq!(
            registry.register(0xF3, Some(0x03), counting_handler(&second)).unwrap_err(),
            DispatchError::DuplicateHandlerRegistration { code: 0xF3, sub_code: Some(0x03) }
        );
        assert_eq!(registry.handler_count(), 1);

        let (dispatcher, _) = game_dispatcher(registry);
        assert_eq!(dispatcher.route(&[0xC1, 0x05, 0xF3, 0x03, 0x00]), RouteOutcome::Handled);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fallback_to_code_only_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new("test");
        registry.register(0xF3, None, counting_handler(&hits)).unwrap();
        let (dispatcher, _) = game_dispatcher(registry);

        assert_eq!(dispatcher.route(&[0xC1, 0x05, 0xF3, 0x22, 0x00]), RouteOutcome::Handled);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_other_sub_code_is_unhandled() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new("test");
        registry.register(0xF3, Some(0x03), counting_handler(&hits)).unwrap();
        let (dispatcher, _) = game_dispatcher(registry);

        assert_eq!(dispatcher.route(&[0xC1, 0x05, 0xF3, 0x04, 0x00]), RouteOutcome::Unhandled);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_code_names_follow_routing_mode() {
        assert_eq!(code_name(RoutingMode::GameServer, 0xF3), "Character");
        assert_eq!(code_name(RoutingMode::GameServer, 0xF4), "unknown");
        assert_eq!(code_name(RoutingMode::ConnectServer, 0xF4), "ServerInfo");
        assert_eq!(code_name(RoutingMode::ConnectServer, 0x99), "unknown");
    }

    #[test]
    fn test_malformed_frames_are_dropped() {
        let (dispatcher, _) = game_dispatcher(HandlerRegistry::new("test"));
        assert_eq!(dispatcher.route(&[0xC1, 0x02]), RouteOutcome::Dropped);
        assert_eq!(dispatcher.route(&[0xAA, 0x05, 0x00, 0x00]), RouteOutcome::Dropped);
        assert_eq!(dispatcher.route(&[]), RouteOutcome::Dropped);
    }

    #[test]
    fn test_policy_filter() {
        let (state, _) = recording_state(GameSettings::default());
        let filter = PacketFilter { weather: true, damage: true };
        let dispatcher = Dispatcher::new(state, filter);

        // connect server frames are never filtered
        assert_eq!(dispatcher.route(&[0xC1, 0x04, 0x0F, 0x01]), RouteOutcome::Unhandled);

        dispatcher.switch_to_game_server();
        assert_eq!(dispatcher.route(&[0xC1, 0x04, 0x0F, 0x01]), RouteOutcome::Filtered);
        assert_eq!(
            dispatcher.route(&[0xC1, 0x0A, 0x11, 0x00, 0x01, 0x00, 0x10, 0x00, 0x00, 0x00]),
            RouteOutcome::Filtered
        );
    }

    #[test]
    fn test_routing_mode_switch() {
        let (state, _) = recording_state(GameSettings::default());
        let dispatcher = Dispatcher::new(state, PacketFilter::default());
        assert_eq!(dispatcher.routing_mode(), RoutingMode::ConnectServer);
        dispatcher.switch_to_game_server();
        dispatcher.switch_to_game_server();
        assert_eq!(dispatcher.routing_mode(), RoutingMode::GameServer);
    }

    fn walking_dispatcher() -> Dispatcher {
        in_game_dispatcher(ProtocolVersion::Season6).0
    }

    #[test]
    fn test_movement_lock_released_on_truncated_object_moved() {
        let dispatcher = walking_dispatcher();
        let state = dispatcher.state().clone();

        assert!(state.request_instant_move(TilePosition::new(10, 10)));
        assert!(state.client().is_walking());
        assert_eq!(dispatcher.route(&[0xC1, 0x05, 0x15, 0x00, 0x10]), RouteOutcome::Dropped);
        assert!(!state.client().is_walking());
        assert!(state.request_instant_move(TilePosition::new(11, 11)));
    }

    #[test]
    fn test_movement_lock_released_on_truncated_object_walked() {
        let dispatcher = walking_dispatcher();
        let state = dispatcher.state().clone();

        assert!(state.request_walk(&[2, 2]));
        assert_eq!(dispatcher.route(&[0xC1, 0x06, 0xD4, 0x00, 0x10, 0x05]), RouteOutcome::Dropped);
        assert!(!state.client().is_walking());
        assert!(state.request_walk(&[2]));
    }

    #[test]
    fn test_other_decode_failures_keep_lock() {
        let dispatcher = walking_dispatcher();
        let state = dispatcher.state().clone();

        assert!(state.request_instant_move(TilePosition::new(10, 10)));
        assert_eq!(dispatcher.route(&[0xC1, 0x05, 0x26, 0xFF, 0x00]), RouteOutcome::Dropped);
        assert!(state.client().is_walking());
    }
}
