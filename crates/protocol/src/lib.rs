//! # MuClient Protocol Library
//!
//! Wire-level knowledge of the MU Online client protocol for three
//! generations: Season 6, 0.97 and 0.75.
//!
//! ## Architecture
//!
//! ### 1. Codecs ([`codecs`])
//! Bounds-checked readers over a complete frame, fixed-width strings, the
//! Xor3 credential obfuscation and the Standard/Extended layout selector.
//!
//! ### 2. Packet Codes ([`packets`])
//! Code enumerations for both servers plus the fixed tables of codes that
//! carry a sub-code.
//!
//! ### 3. Frame Classifier ([`frame`])
//! Header inspection producing `(code, sub-code)` for routing.
//!
//! ### 4. Decoders
//! Pure functions `decode_*(packet, version) -> Result<T, DecodeError>`
//! grouped by area: [`connect`], [`session`], [`character`], [`vitals`],
//! [`scope`], [`items`], [`messages`]. Decoders never touch client state.
//!
//! ### 5. Packet Builder ([`packet_builder`])
//! Outbound requests.
//!
//! ## Offsets
//!
//! All offsets in this crate are absolute within the frame, header
//! included, so a layout reads the same as a hex dump of the packet.

pub mod codecs;
pub mod error;
pub mod packets;
pub mod frame;
pub mod packet_structures;
pub mod packet_builder;
pub mod connect;
pub mod session;
pub mod character;
pub mod vitals;
pub mod scope;
pub mod items;
pub mod messages;

// Re-export commonly used items
pub use error::*;
pub use frame::{classify, Frame, HeaderType, RoutingMode};
pub use packets::*;
pub use packet_structures::*;
