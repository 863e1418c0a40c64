//! Position types for map objects

use serde::{Deserialize, Serialize};

/// Tile position on a 256x256 map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: u8,
    pub y: u8,
}

impl TilePosition {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Number of single steps between two tiles when diagonal moves are allowed
    pub fn distance_to(self, other: TilePosition) -> u8 {
        let dx = (self.x as i16 - other.x as i16).unsigned_abs();
        let dy = (self.y as i16 - other.y as i16).unsigned_abs();
        dx.max(dy) as u8
    }

    /// Neighbouring tile in `direction`, clamped to the map edge
    pub fn step(self, direction: Direction) -> TilePosition {
        let (dx, dy) = direction.delta();
        TilePosition {
            x: (self.x as i16 + dx as i16).clamp(0, u8::MAX as i16) as u8,
            y: (self.y as i16 + dy as i16).clamp(0, u8::MAX as i16) as u8,
        }
    }
}

impl std::fmt::Display for TilePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Client-side compass direction
///
/// Servers number directions differently; [`DirectionMap`] translates these
/// values into the code a server expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Tile offset of one step; north decreases `y`
    pub fn delta(self) -> (i8, i8) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Greedy direction that reduces both axis distances at once
    ///
    /// Returns `None` when `from == to`.
    pub fn towards(from: TilePosition, to: TilePosition) -> Option<Direction> {
        let dx = (to.x as i16 - from.x as i16).signum();
        let dy = (to.y as i16 - from.y as i16).signum();
        match (dx, dy) {
            (0, -1) => Some(Direction::North),
            (1, -1) => Some(Direction::NorthEast),
            (1, 0) => Some(Direction::East),
            (1, 1) => Some(Direction::SouthEast),
            (0, 1) => Some(Direction::South),
            (-1, 1) => Some(Direction::SouthWest),
            (-1, 0) => Some(Direction::West),
            (-1, -1) => Some(Direction::NorthWest),
            _ => None,
        }
    }
}

/// Client direction → server direction code table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionMap(pub [u8; 8]);

impl DirectionMap {
    /// Server codes of the classic client: west is 0, counting counter-clockwise
    pub const CLASSIC: DirectionMap = DirectionMap([6, 5, 4, 3, 2, 1, 0, 7]);

    pub fn to_server(&self, direction: Direction) -> u8 {
        self.0[direction as usize]
    }

    /// Build a table from configuration values; every entry must be 0..=7
    pub fn from_slice(values: &[u8]) -> Option<Self> {
        if values.len() != 8 || values.iter().any(|v| *v > 7) {
            return None;
        }
        let mut table = [0u8; 8];
        table.copy_from_slice(values);
        Some(Self(table))
    }
}

impl Default for DirectionMap {
    fn default() -> Self {
        Self::CLASSIC
    }
}
