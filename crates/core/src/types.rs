//! Core type definitions

use serde::{Deserialize, Serialize};

/// Bits of a wire object id that carry the identity.
///
/// The top bit is a status flag (for example "just spawned" on scope
/// additions) and must be stripped before an id is used as a key.
pub const OBJECT_ID_MASK: u16 = 0x7FFF;

/// Sentinel for "no character selected yet".
pub const UNASSIGNED_CHARACTER_ID: u16 = 0xFFFF;

/// Strip the status bit from a raw wire id.
#[inline]
pub const fn mask_id(raw: u16) -> u16 {
    raw & OBJECT_ID_MASK
}

/// Object id as it appeared on the wire plus its masked identity
///
/// Only constructible through [`ObjectId::from_raw`], so `masked` is always
/// `raw & 0x7FFF`. The raw value is kept because some outbound requests
/// (item pickup) must echo it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    masked: u16,
    raw: u16,
}

impl ObjectId {
    pub const fn from_raw(raw: u16) -> Self {
        Self {
            masked: mask_id(raw),
            raw,
        }
    }

    pub fn masked(&self) -> u16 {
        self.masked
    }

    pub fn raw(&self) -> u16 {
        self.raw
    }
}

impl From<u16> for ObjectId {
    fn from(raw: u16) -> Self {
        Self::from_raw(raw)
    }
}

/// Negotiated wire generation
///
/// Declaration order is chronological, so `version >= ProtocolVersion::Season6`
/// reads the way the protocol documents phrase it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// 0.75
    Version075 = 0,
    /// 0.97
    Version097 = 1,
    /// Season 6 episode 3
    Season6 = 2,
}

impl ProtocolVersion {
    /// Parse the textual form used in configuration files.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "season6" | "s6" => Some(Self::Season6),
            "0.97" | "097" => Some(Self::Version097),
            "0.75" | "075" => Some(Self::Version075),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Version075 => "0.75",
            Self::Version097 => "0.97",
            Self::Season6 => "season6",
        }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::Season6
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
