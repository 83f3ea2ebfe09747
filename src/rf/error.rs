use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RfError {
    #[error("RF pipeline produced no vector within {0:?}")]
    Timeout(Duration),
    #[error("failed to start RF pipeline: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("RF pipeline exited with code {code}: {stderr}")]
    Pipeline { code: i32, stderr: String },
    #[error("unparseable power value '{0}'")]
    Parse(String),
    #[error("RF pipeline returned an empty power vector")]
    EmptyVector,
}
