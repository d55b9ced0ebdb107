//! Planar coordinates and compass directions. North is +y, east is +x, in metres.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Bearing to `other` in degrees clockwise from north, in `[0, 360)`.
    pub fn bearing_to(&self, other: Position) -> f64 {
        let deg = (other.x - self.x).atan2(other.y - self.y).to_degrees();
        deg.rem_euclid(360.0)
    }

    /// Eight-point compass label for the bearing to `other`.
    pub fn compass_to(&self, other: Position) -> &'static str {
        const POINTS: [&str; 8] = [
            "north",
            "northeast",
            "east",
            "southeast",
            "south",
            "southwest",
            "west",
            "northwest",
        ];
        let sector = ((self.bearing_to(other) + 22.5) / 45.0).floor() as usize % 8;
        POINTS[sector]
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Position {
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Directions an exit can point in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
    Up,
    Down,
}

impl Direction {
    /// Parse a direction name or its abbreviation ("n", "ne", ...).
    pub fn parse(name: &str) -> Option<Self> {
        let dir = match name.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Direction::North,
            "northeast" | "ne" => Direction::Northeast,
            "east" | "e" => Direction::East,
            "southeast" | "se" => Direction::Southeast,
            "south" | "s" => Direction::South,
            "southwest" | "sw" => Direction::Southwest,
            "west" | "w" => Direction::West,
            "northwest" | "nw" => Direction::Northwest,
            "up" | "u" => Direction::Up,
            "down" | "d" => Direction::Down,
            _ => return None,
        };
        Some(dir)
    }

    /// Unit planar offset. Vertical exits do not move in the plane.
    pub fn unit(&self) -> (f64, f64) {
        const D: f64 = std::f64::consts::FRAC_1_SQRT_2;
        match self {
            Direction::North => (0.0, 1.0),
            Direction::Northeast => (D, D),
            Direction::East => (1.0, 0.0),
            Direction::Southeast => (D, -D),
            Direction::South => (0.0, -1.0),
            Direction::Southwest => (-D, -D),
            Direction::West => (-1.0, 0.0),
            Direction::Northwest => (-D, D),
            Direction::Up | Direction::Down => (0.0, 0.0),
        }
    }
}
