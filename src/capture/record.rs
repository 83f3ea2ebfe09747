use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::peripheral::AntennaState;
use crate::scan::ScanPosition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AntennaReading {
    pub antenna: AntennaState,
    /// Mean of the power vector, in the pipeline's units (dB).
    pub power: f64,
}

/// Everything captured at one sample stop. Written once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SampleRecord {
    /// Capture timestamp key; also the stem of the record and photo files.
    pub id: String,
    pub captured_at: DateTime<Utc>,
    /// Absent for captures taken outside a scan.
    pub position: Option<ScanPosition>,
    /// Photo file name, absent when the camera failed.
    pub photo: Option<String>,
    /// One reading per antenna, in the order the antennas were selected.
    pub readings: Vec<AntennaReading>,
}

impl SampleRecord {
    pub fn powers(&self) -> Vec<f64> {
        self.readings.iter().map(|r| r.power).collect()
    }

    /// Antenna with the strongest reading.
    pub fn strongest(&self) -> Option<AntennaState> {
        self.readings
            .iter()
            .max_by(|a, b| a.power.total_cmp(&b.power))
            .map(|r| r.antenna)
    }
}

/// Timestamp key used to name sample files.
pub fn sample_key(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S_%3f").to_string()
}
