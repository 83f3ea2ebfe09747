pub mod api;
pub mod api_doc;
pub mod auth;
pub mod config;
pub mod server;

use std::sync::Arc;
use tokio::sync::watch;

use crate::controller::ControllerHandle;
use crate::peripheral::ConnectivityStatus;
use crate::scan::ScanPlan;

pub use config::WebConfig;
pub use server::run_server;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WebConfig>,
    pub controller: ControllerHandle,
    pub connectivity: watch::Receiver<ConnectivityStatus>,
    /// Plan used for fields a scan request leaves out.
    pub default_plan: ScanPlan,
}
