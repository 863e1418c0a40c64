//! # MuClient Networking Layer
//!
//! Tokio-based session plumbing between the socket and the game state.
//!
//! ## Modules
//!
//! - [`config`] - Session options
//! - [`codec`] - MU frame delimiter for the TCP stream
//! - [`handlers`] - Handler registry and dispatcher
//! - [`connect_handlers`] - Connect Server packet handlers
//! - [`game_handlers`] - Game Server packet handlers
//! - [`session`] - Receive task, transport commands and teardown
//! - [`commands`] - Console command task

pub mod config;
pub mod codec;
pub mod handlers;
pub mod connect_handlers;
pub mod game_handlers;
pub mod session;
pub mod commands;

// Re-export commonly used items
pub use codec::MuFrameCodec;
pub use commands::{greedy_path, CommandError, CommandHandler, CommandOutcome};
pub use config::SessionConfig;
pub use handlers::{Dispatcher, HandlerFunction, HandlerRegistry, PacketFilter, RouteOutcome};
pub use session::{ChannelSink, Session, TransportCommand};
