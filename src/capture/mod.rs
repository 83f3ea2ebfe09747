//! Synchronized capture at a sample stop: photo, antenna sweep, RF readings.

mod coordinator;
mod error;
mod record;
mod store;

pub use coordinator::{CaptureConfig, SampleCoordinator};
pub use error::{CaptureError, StorageError};
pub use record::{AntennaReading, SampleRecord};
pub use store::SampleStore;
