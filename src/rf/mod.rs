//! RF power measurement.
//!
//! The signal-processing chain lives outside this crate. Each reading activates
//! it once and reduces the returned power vector to its arithmetic mean.

mod error;
mod process;

use async_trait::async_trait;

pub use error::RfError;
pub use process::ProcessPowerSource;

#[async_trait]
pub trait PowerSource: Send {
    /// Latest power vector from the receive chain.
    async fn current_power_vector(&mut self) -> Result<Vec<f32>, RfError>;
}

/// Mean of a power vector, the scalar recorded per antenna position.
pub fn mean_power(vector: &[f32]) -> Result<f64, RfError> {
    if vector.is_empty() {
        return Err(RfError::EmptyVector);
    }
    let sum: f64 = vector.iter().map(|v| *v as f64).sum();
    Ok(sum / vector.len() as f64)
}
