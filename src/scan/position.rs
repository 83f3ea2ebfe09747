use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Travel direction along a row; alternates every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScanPosition {
    pub row: u32,
    pub column: u32,
    pub direction: Direction,
}

impl ScanPosition {
    pub const START: ScanPosition = ScanPosition {
        row: 0,
        column: 0,
        direction: Direction::Forward,
    };
}

impl std::fmt::Display for ScanPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "row {}, column {}", self.row, self.column)
    }
}

/// Step of the raster being executed when a scan stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Maneuver {
    ReferenceHeading,
    Capture,
    Advance,
    HeadingCorrection,
    RowTransition,
}

impl std::fmt::Display for Maneuver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Maneuver::ReferenceHeading => "reference heading read",
            Maneuver::Capture => "sample capture",
            Maneuver::Advance => "advance",
            Maneuver::HeadingCorrection => "heading correction",
            Maneuver::RowTransition => "row transition",
        };
        f.write_str(name)
    }
}
