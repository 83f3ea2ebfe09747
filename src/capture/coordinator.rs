use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Deserialize;

use super::error::CaptureError;
use super::record::{sample_key, AntennaReading, SampleRecord};
use super::store::SampleStore;
use crate::peripheral::{AntennaState, CommandChannel, PhotoService};
use crate::rf::{mean_power, PowerSource};
use crate::scan::ScanPosition;

fn default_sequence() -> Vec<AntennaState> {
    AntennaState::default_sequence()
}

fn default_settle() -> Duration {
    Duration::from_millis(10)
}

fn default_output_dir() -> String {
    "data".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_sequence")]
    pub antenna_sequence: Vec<AntennaState>,
    /// Pause after each antenna switch before the RF pipeline is read.
    #[serde(
        default = "default_settle",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub settle: Duration,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            antenna_sequence: default_sequence(),
            settle: default_settle(),
            output_dir: default_output_dir(),
        }
    }
}

/// Collects photo, antenna-switched RF readings and persists them as one
/// [`SampleRecord`] per stop.
pub struct SampleCoordinator {
    photo: Arc<dyn PhotoService>,
    antenna: CommandChannel,
    power: Box<dyn PowerSource>,
    sequence: Vec<AntennaState>,
    settle: Duration,
    last_id: Option<String>,
    collisions: u32,
}

impl SampleCoordinator {
    pub fn new(
        photo: Arc<dyn PhotoService>,
        antenna: CommandChannel,
        power: Box<dyn PowerSource>,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            photo,
            antenna,
            power,
            sequence: config.antenna_sequence.clone(),
            settle: config.settle,
            last_id: None,
            collisions: 0,
        }
    }

    pub fn sequence(&self) -> &[AntennaState] {
        &self.sequence
    }

    pub fn antenna(&self) -> &CommandChannel {
        &self.antenna
    }

    /// Captures one sample at the current stop and writes it to `store`.
    ///
    /// A failed photo is logged and recorded as missing. Antenna commands
    /// are retried per the channel's policy; an RF read failure aborts the
    /// capture without writing anything.
    pub async fn capture(
        &mut self,
        store: &SampleStore,
        position: Option<ScanPosition>,
    ) -> Result<SampleRecord, CaptureError> {
        let id = self.next_id();
        let captured_at = Utc::now();

        let jpeg = self.fetch_photo(&id).await;

        let mut readings = Vec::with_capacity(self.sequence.len());
        for antenna in self.sequence.clone() {
            let power = self.read_antenna(antenna).await?;
            log::debug!("Antenna {}: {:.2} dB", antenna, power);
            readings.push(AntennaReading { antenna, power });
        }

        let photo = jpeg.and_then(|jpeg| save_photo(store, &id, &jpeg));
        let record = SampleRecord {
            id,
            captured_at,
            position,
            photo,
            readings,
        };
        store.persist(&record)?;

        match &record.position {
            Some(p) => log::info!("Captured sample {} at {}", record.id, p),
            None => log::info!("Captured sample {}", record.id),
        }
        Ok(record)
    }

    /// Takes a photo outside of a capture. Returns the file name, or `None`
    /// when the camera failed.
    pub async fn take_photo(&mut self, store: &SampleStore) -> Option<String> {
        let id = self.next_id();
        let jpeg = self.fetch_photo(&id).await?;
        save_photo(store, &id, &jpeg)
    }

    async fn fetch_photo(&mut self, id: &str) -> Option<Vec<u8>> {
        match self.photo.take_photo().await {
            Ok(jpeg) => Some(jpeg),
            Err(e) => {
                log::warn!("Photo capture failed for sample {}: {}", id, e);
                None
            }
        }
    }

    async fn read_antenna(&mut self, antenna: AntennaState) -> Result<f64, CaptureError> {
        self.antenna
            .send_until_acked(&antenna.command())
            .await
            .map_err(|source| CaptureError::Antenna {
                antenna: antenna.to_string(),
                source,
            })?;

        tokio::time::sleep(self.settle).await;

        let rf = |source| CaptureError::Rf {
            antenna: antenna.to_string(),
            source,
        };
        let vector = self.power.current_power_vector().await.map_err(rf)?;
        mean_power(&vector).map_err(rf)
    }

    fn next_id(&mut self) -> String {
        self.next_id_at(Local::now())
    }

    /// Timestamp key, suffixed `_001`, `_002`, ... when captures land in the
    /// same millisecond so ids still sort in capture order.
    fn next_id_at(&mut self, now: DateTime<Local>) -> String {
        let key = sample_key(now);
        let id = match &self.last_id {
            Some(last) if last.starts_with(&key) => {
                self.collisions += 1;
                format!("{}_{:03}", key, self.collisions)
            }
            _ => {
                self.collisions = 0;
                key
            }
        };
        self.last_id = Some(id.clone());
        id
    }
}

/// Writes a JPEG next to the sample records. Failures are logged and the
/// sample is kept without a photo.
fn save_photo(store: &SampleStore, id: &str, jpeg: &[u8]) -> Option<String> {
    match store.write_photo(id, jpeg) {
        Ok(name) => {
            log::info!("Photo saved as {} ({} bytes)", name, jpeg.len());
            Some(name)
        }
        Err(e) => {
            log::error!("Failed to save photo for sample {}: {}", id, e);
            None
        }
    }
}
