use async_trait::async_trait;

use super::error::PeripheralError;
use super::status::LinkHealth;

/// Remote camera producing one JPEG per request.
#[async_trait]
pub trait PhotoService: Send + Sync {
    async fn take_photo(&self) -> Result<Vec<u8>, PeripheralError>;

    async fn ping(&self) -> LinkHealth;
}
