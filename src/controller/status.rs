use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::capture::SampleRecord;
use crate::motion::Heading;
use crate::peripheral::AntennaState;
use crate::scan::{ScanPlan, ScanPosition};

/// Request for the robot, executed one at a time by the controller task.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Scan(ScanPlan),
    Capture,
    TakePhoto,
    SendAntenna(AntennaState),
    ReadHeading,
}

impl ControlCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::Scan(_) => "scan",
            ControlCommand::Capture => "capture",
            ControlCommand::TakePhoto => "take_photo",
            ControlCommand::SendAntenna(_) => "send_antenna",
            ControlCommand::ReadHeading => "read_heading",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ControllerMode {
    Idle,
    Scanning {
        plan: ScanPlan,
        started_at: DateTime<Utc>,
        /// Position of the most recent sample.
        position: Option<ScanPosition>,
    },
    Capturing,
    TakingPhoto,
    SendingAntenna {
        antenna: AntennaState,
    },
    ReadingHeading,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommandOutcome {
    pub command: String,
    pub success: bool,
    pub message: String,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ControllerStatus {
    pub mode: ControllerMode,
    /// Commands finished since start-up.
    pub completed: u64,
    pub samples_captured: u64,
    pub last_sample: Option<SampleRecord>,
    pub last_heading: Option<Heading>,
    pub last_photo: Option<String>,
    pub last_outcome: Option<CommandOutcome>,
}

impl Default for ControllerStatus {
    fn default() -> Self {
        Self {
            mode: ControllerMode::Idle,
            completed: 0,
            samples_captured: 0,
            last_sample: None,
            last_heading: None,
            last_photo: None,
            last_outcome: None,
        }
    }
}
