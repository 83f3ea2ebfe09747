use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeripheralError {
    #[error("invalid antenna position '{0}' (expected 0..=4)")]
    InvalidAntenna(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("http error: {0}")]
    Http(#[from] hyper::Error),
    #[error("invalid url: {0}")]
    Url(#[from] hyper::http::uri::InvalidUri),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("link error: {0}")]
    Link(String),
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<PeripheralError>,
    },
}
