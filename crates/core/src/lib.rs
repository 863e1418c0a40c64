//! MuClient Core - Fundamental types shared by every client crate

mod error;
mod types;
mod positions;

pub use error::*;
pub use types::*;
pub use positions::*;
