mod antenna;
mod channel;
mod error;
mod http;
mod photo;
mod status;

pub use antenna::AntennaState;
pub use channel::{CommandChannel, PeripheralLink, RetryPolicy};
pub use error::PeripheralError;
pub use http::{HttpAntennaLink, HttpPhotoService};
pub use photo::PhotoService;
pub use status::{ConnectivityStatus, LinkHealth, StatusMonitor};
