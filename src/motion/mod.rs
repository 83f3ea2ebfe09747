mod actuator;
mod error;
mod heading;
mod orientation;
mod types;

pub use actuator::{MotionActuator, VelocitySink};
pub use error::MotionError;
pub use heading::{HeadingConfig, HeadingController};
pub use orientation::OrientationSource;
pub use types::{wrap_angle, Heading, Rotation, VelocityCommand};

#[cfg(feature = "ros")]
pub use orientation::FeedOrientation;
#[cfg(feature = "ros")]
pub use types::Quaternion;
