//! Raster scan: sample, advance, correct heading; shift rows and reverse.

mod error;
mod log;
mod orchestrator;
mod plan;
mod position;

pub use log::LOG_STEM;
pub use orchestrator::ScanOrchestrator;
pub use plan::{ScanConfig, ScanPlan};
pub use position::{Direction, ScanPosition};
