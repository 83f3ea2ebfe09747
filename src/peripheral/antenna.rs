use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::PeripheralError;

/// One of the switch's selectable antenna positions, sent as its ASCII digit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct AntennaState(u8);

impl AntennaState {
    pub const POSITIONS: u8 = 5;

    pub fn new(index: u8) -> Result<Self, PeripheralError> {
        if index < Self::POSITIONS {
            Ok(AntennaState(index))
        } else {
            Err(PeripheralError::InvalidAntenna(index.to_string()))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn command(self) -> String {
        self.0.to_string()
    }

    /// Positions swept at every sample stop. Position 2 is left out, matching
    /// the switch wiring used for the recorded datasets.
    pub fn default_sequence() -> Vec<AntennaState> {
        [0, 1, 3, 4].into_iter().map(AntennaState).collect()
    }
}

impl TryFrom<u8> for AntennaState {
    type Error = PeripheralError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        AntennaState::new(index)
    }
}

impl From<AntennaState> for u8 {
    fn from(state: AntennaState) -> Self {
        state.0
    }
}

impl FromStr for AntennaState {
    type Err = PeripheralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| PeripheralError::InvalidAntenna(s.to_string()))
            .and_then(AntennaState::new)
    }
}

impl std::fmt::Display for AntennaState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sequence_skips_position_two() {
        let seq: Vec<u8> = AntennaState::default_sequence()
            .into_iter()
            .map(u8::from)
            .collect();
        assert_eq!(seq, vec![0, 1, 3, 4]);
    }

    #[test]
    fn parses_and_rejects() {
        assert_eq!("3".parse::<AntennaState>().unwrap().command(), "3");
        assert!("5".parse::<AntennaState>().is_err());
        assert!("a".parse::<AntennaState>().is_err());
        assert!(serde_yaml::from_str::<Vec<AntennaState>>("[0, 7]").is_err());
    }
}
