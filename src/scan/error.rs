use thiserror::Error;

use super::position::{Maneuver, ScanPosition};
use crate::capture::{CaptureError, StorageError};
use crate::motion::MotionError;

/// What went wrong inside a maneuver.
#[derive(Debug, Error)]
pub enum ScanFault {
    #[error(transparent)]
    Motion(#[from] MotionError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid scan plan: {0}")]
    InvalidPlan(String),
    #[error("scan aborted during {maneuver} at {position}: {source}")]
    Aborted {
        maneuver: Maneuver,
        position: ScanPosition,
        source: ScanFault,
    },
    #[error("failed to prepare scan output: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to write scan log: {0}")]
    Log(#[from] std::io::Error),
}

impl ScanError {
    /// Whether the scan was stopped on request rather than by a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ScanError::Aborted {
                source: ScanFault::Motion(MotionError::Cancelled),
                ..
            }
        )
    }
}
