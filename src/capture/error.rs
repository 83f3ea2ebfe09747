use thiserror::Error;

use crate::peripheral::PeripheralError;
use crate::rf::RfError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("sample {0} already written")]
    Duplicate(String),
    #[error("sample not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("antenna {antenna}: {source}")]
    Antenna {
        antenna: String,
        source: PeripheralError,
    },
    #[error("RF reading for antenna {antenna}: {source}")]
    Rf { antenna: String, source: RfError },
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

impl CaptureError {
    pub fn is_sensor_timeout(&self) -> bool {
        matches!(
            self,
            CaptureError::Rf {
                source: RfError::Timeout(_),
                ..
            }
        )
    }
}
