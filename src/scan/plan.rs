use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::ScanError;

/// Size and speed of one raster scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScanPlan {
    pub rows: u32,
    pub columns: u32,
    /// Signed speed along the first row (m/s); negated every row.
    pub velocity: f64,
}

impl ScanPlan {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.rows == 0 || self.columns == 0 {
            return Err(ScanError::InvalidPlan(format!(
                "rows and columns must be at least 1 (got {}x{})",
                self.rows, self.columns
            )));
        }
        if !self.velocity.is_finite() || self.velocity == 0.0 {
            return Err(ScanError::InvalidPlan(format!(
                "velocity must be a non-zero number (got {})",
                self.velocity
            )));
        }
        Ok(())
    }

    pub fn samples(&self) -> u64 {
        self.rows as u64 * self.columns as u64
    }
}

fn default_rows() -> u32 {
    8
}

fn default_columns() -> u32 {
    76
}

fn default_velocity() -> f64 {
    0.125
}

fn default_step() -> Duration {
    Duration::from_secs(1)
}

fn default_row_shift_velocity() -> f64 {
    -0.5
}

fn default_pause() -> Duration {
    Duration::from_millis(100)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScanConfig {
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_columns")]
    pub columns: u32,
    #[serde(default = "default_velocity")]
    pub velocity: f64,
    /// How long each advance between sample stops lasts.
    #[serde(
        default = "default_step",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub step_duration: Duration,
    /// Speed of the sideways move between the two quarter turns of a row
    /// transition.
    #[serde(default = "default_row_shift_velocity")]
    pub row_shift_velocity: f64,
    #[serde(
        default = "default_step",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub row_shift_duration: Duration,
    #[serde(
        default = "default_pause",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub pause: Duration,
    /// Also shift into a new row after the final row.
    #[serde(default = "default_true")]
    pub transition_after_last_row: bool,
}

impl ScanConfig {
    pub fn plan(&self) -> ScanPlan {
        ScanPlan {
            rows: self.rows,
            columns: self.columns,
            velocity: self.velocity,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            columns: default_columns(),
            velocity: default_velocity(),
            step_duration: default_step(),
            row_shift_velocity: default_row_shift_velocity(),
            row_shift_duration: default_step(),
            pause: default_pause(),
            transition_after_last_row: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_plans() {
        let plan = ScanPlan {
            rows: 2,
            columns: 3,
            velocity: 0.1,
        };
        assert!(plan.validate().is_ok());
        assert_eq!(plan.samples(), 6);
        assert!(ScanPlan { rows: 0, ..plan }.validate().is_err());
        assert!(ScanPlan { velocity: 0.0, ..plan }.validate().is_err());
        assert!(ScanPlan { velocity: f64::NAN, ..plan }.validate().is_err());
    }

    #[test]
    fn config_defaults_and_overrides() {
        let config: ScanConfig =
            serde_yaml::from_str("rows: 2\nstep_duration: 500ms\ntransition_after_last_row: false\n")
                .unwrap();
        assert_eq!(config.rows, 2);
        assert_eq!(config.columns, 76);
        assert_eq!(config.step_duration, Duration::from_millis(500));
        assert_eq!(config.row_shift_duration, Duration::from_secs(1));
        assert!(!config.transition_after_last_row);
    }
}
