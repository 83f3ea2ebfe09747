use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::channel::PeripheralLink;
use super::photo::PhotoService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinkHealth {
    /// Not polled yet.
    #[default]
    Unknown,
    Good,
    /// Reachable but answered unexpectedly.
    Warning,
    Bad,
}

#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct ConnectivityStatus {
    pub photo_service: LinkHealth,
    pub antenna: LinkHealth,
    pub checked_at: Option<DateTime<Utc>>,
}

/// Periodically polls peripheral liveness for display. Results never feed
/// back into scan control.
pub struct StatusMonitor {
    photo: Arc<dyn PhotoService>,
    antenna: Arc<dyn PeripheralLink>,
    interval: Duration,
}

impl StatusMonitor {
    pub fn new(
        photo: Arc<dyn PhotoService>,
        antenna: Arc<dyn PeripheralLink>,
        interval: Duration,
    ) -> Self {
        Self {
            photo,
            antenna,
            interval,
        }
    }

    pub async fn poll_once(&self) -> ConnectivityStatus {
        let (photo_service, antenna) = tokio::join!(self.photo.ping(), self.antenna.check());
        ConnectivityStatus {
            photo_service,
            antenna,
            checked_at: Some(Utc::now()),
        }
    }

    /// Runs the poll loop on its own task until every receiver is dropped.
    pub fn spawn(self) -> (watch::Receiver<ConnectivityStatus>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(ConnectivityStatus::default());

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let status = self.poll_once().await;
                log::debug!(
                    "Connectivity: photo={:?} antenna={:?}",
                    status.photo_service,
                    status.antenna
                );
                if tx.send(status).is_err() {
                    break;
                }
            }
        });

        (rx, join)
    }
}
