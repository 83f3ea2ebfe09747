//! Single-consumer command queue in front of the scan orchestrator.
//!
//! Operator requests (CLI, HTTP API) are enqueued here; only the consumer
//! task touches the robot, so motion commands never overlap.

mod error;
mod status;
mod worker;

pub use error::ControllerError;
pub use status::{CommandOutcome, ControlCommand, ControllerMode, ControllerStatus};
pub use worker::{spawn, ControllerHandle};
