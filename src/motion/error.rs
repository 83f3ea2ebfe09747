use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("no fresh orientation sample within {0:?}")]
    SensorTimeout(Duration),
    #[error("orientation feed closed")]
    FeedClosed,
    #[error("velocity command sink unavailable: {0}")]
    ActuatorUnavailable(String),
    #[error("motion cancelled")]
    Cancelled,
}

impl MotionError {
    /// Whether the error came from the orientation side rather than the actuator.
    pub fn is_sensor_fault(&self) -> bool {
        matches!(self, MotionError::SensorTimeout(_) | MotionError::FeedClosed)
    }
}
