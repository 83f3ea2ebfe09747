use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("command queue is full")]
    Busy,
    #[error("controller has shut down")]
    Closed,
}
