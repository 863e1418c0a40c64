//! # MuClient Game State Layer
//!
//! Everything the client believes about the world, and the write API the
//! packet handlers call into.
//!
//! ## Modules
//!
//! - `client_state` - The local character and the request lock
//! - `scope` - Concurrent table of visible objects
//! - `connection_state` - Session phase state machine
//! - `names` - Item, NPC and class name lookups
//! - `state` - `GameState`, the state updater shared by both session tasks

pub mod client_state;
pub mod scope;
pub mod connection_state;
pub mod names;
pub mod state;

// Re-export commonly used types
pub use client_state::{CharacterVitals, ClientState, Progress, RequestEvent, RequestLock, RequestState, VitalPair};
pub use connection_state::{ConnectionState, ConnectionStateMachine};
pub use names::{BuiltinNames, NameOracle};
pub use scope::{ScopeEntity, ScopeKind, ScopeObject, ScopeTable};
pub use state::{Credentials, GameSettings, GameState, PacketSink};
