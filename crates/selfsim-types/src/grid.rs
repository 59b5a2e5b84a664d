//! Grid coordinates, compass directions, and neighborhoods.
//!
//! Rows grow southwards and columns grow eastwards, so `N` is a step of
//! `-1` rows and `E` a step of `+1` columns. Directions are listed
//! clockwise starting at north; that order is the canonical iteration
//! order for every neighbor table in the kernel.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A cell position on the toroidal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Row index, in `[0, rows)`.
    pub row: usize,
    /// Column index, in `[0, columns)`.
    pub col: usize,
}

impl Coord {
    /// Create a coordinate from a row and a column.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for Coord {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One of the eight compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// North: one row up.
    #[serde(rename = "N")]
    North,
    /// North-east.
    #[serde(rename = "NE")]
    NorthEast,
    /// East: one column right.
    #[serde(rename = "E")]
    East,
    /// South-east.
    #[serde(rename = "SE")]
    SouthEast,
    /// South: one row down.
    #[serde(rename = "S")]
    South,
    /// South-west.
    #[serde(rename = "SW")]
    SouthWest,
    /// West: one column left.
    #[serde(rename = "W")]
    West,
    /// North-west.
    #[serde(rename = "NW")]
    NorthWest,
}

impl Direction {
    /// All eight directions in clockwise order starting at north.
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// The four orthogonal directions in clockwise order starting at north.
    pub const ORTHOGONAL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Position of this direction within [`Direction::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::NorthEast => 1,
            Self::East => 2,
            Self::SouthEast => 3,
            Self::South => 4,
            Self::SouthWest => 5,
            Self::West => 6,
            Self::NorthWest => 7,
        }
    }

    /// Row and column delta of a single step in this direction.
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Self::North => (-1, 0),
            Self::NorthEast => (-1, 1),
            Self::East => (0, 1),
            Self::SouthEast => (1, 1),
            Self::South => (1, 0),
            Self::SouthWest => (1, -1),
            Self::West => (0, -1),
            Self::NorthWest => (-1, -1),
        }
    }

    /// The direction pointing the opposite way.
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::NorthEast => Self::SouthWest,
            Self::East => Self::West,
            Self::SouthEast => Self::NorthWest,
            Self::South => Self::North,
            Self::SouthWest => Self::NorthEast,
            Self::West => Self::East,
            Self::NorthWest => Self::SouthEast,
        }
    }

    /// Rotate 45 degrees clockwise.
    pub const fn clockwise(self) -> Self {
        match self {
            Self::North => Self::NorthEast,
            Self::NorthEast => Self::East,
            Self::East => Self::SouthEast,
            Self::SouthEast => Self::South,
            Self::South => Self::SouthWest,
            Self::SouthWest => Self::West,
            Self::West => Self::NorthWest,
            Self::NorthWest => Self::North,
        }
    }

    /// Rotate 45 degrees counter-clockwise.
    pub const fn counter_clockwise(self) -> Self {
        match self {
            Self::North => Self::NorthWest,
            Self::NorthEast => Self::North,
            Self::East => Self::NorthEast,
            Self::SouthEast => Self::East,
            Self::South => Self::SouthEast,
            Self::SouthWest => Self::South,
            Self::West => Self::SouthWest,
            Self::NorthWest => Self::West,
        }
    }

    /// Whether this is one of N, E, S, W.
    pub const fn is_orthogonal(self) -> bool {
        matches!(self, Self::North | Self::East | Self::South | Self::West)
    }

    /// Compass abbreviation ("N", "NE", ...).
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Error returned when a string is not a compass abbreviation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction: {0:?}")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "N" => Ok(Self::North),
            "NE" => Ok(Self::NorthEast),
            "E" => Ok(Self::East),
            "SE" => Ok(Self::SouthEast),
            "S" => Ok(Self::South),
            "SW" => Ok(Self::SouthWest),
            "W" => Ok(Self::West),
            "NW" => Ok(Self::NorthWest),
            _ => Err(ParseDirectionError(s.to_owned())),
        }
    }
}

/// Which neighbor set a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// All eight surrounding cells.
    #[default]
    Moore,
    /// The four orthogonally adjacent cells.
    VonNeumann,
}

impl Neighborhood {
    /// The directions covered by this neighborhood, clockwise from north.
    pub const fn directions(self) -> &'static [Direction] {
        match self {
            Self::Moore => &Direction::ALL,
            Self::VonNeumann => &Direction::ORTHOGONAL,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_all_order() {
        for (i, dir) in Direction::ALL.iter().enumerate() {
            assert_eq!(dir.index(), i);
        }
    }

    #[test]
    fn opposite_is_an_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            let (dr, dc) = dir.delta();
            let (or, oc) = dir.opposite().delta();
            assert_eq!((dr + or, dc + oc), (0, 0));
        }
    }

    #[test]
    fn rotation_round_trips() {
        for dir in Direction::ALL {
            assert_eq!(dir.clockwise().counter_clockwise(), dir);
            let mut turned = dir;
            for _ in 0..8 {
                turned = turned.clockwise();
            }
            assert_eq!(turned, dir);
        }
    }

    #[test]
    fn orthogonal_set_is_nesw() {
        let ortho: Vec<_> = Direction::ALL.into_iter().filter(|d| d.is_orthogonal()).collect();
        assert_eq!(ortho, Direction::ORTHOGONAL.to_vec());
    }

    #[test]
    fn parse_and_display_agree() {
        for dir in Direction::ALL {
            let parsed: Direction = dir.to_string().parse().unwrap();
            assert_eq!(parsed, dir);
        }
        assert_eq!("nw".parse::<Direction>().unwrap(), Direction::NorthWest);
        assert!("_".parse::<Direction>().is_err());
    }

    #[test]
    fn serde_uses_abbreviations() {
        let json = serde_json::to_string(&Direction::SouthEast).unwrap();
        assert_eq!(json, "\"SE\"");
    }

    #[test]
    fn neighborhood_sizes() {
        assert_eq!(Neighborhood::Moore.directions().len(), 8);
        assert_eq!(Neighborhood::VonNeumann.directions().len(), 4);
    }
}
