use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::plan::ScanPlan;

/// File stem of the run log inside a run directory.
pub const LOG_STEM: &str = "scan_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RunState {
    Running,
    Completed,
    Aborted,
}

/// Run directory `<root>/runs/<run id>` and the YAML log kept in it.
pub struct ScanLog {
    dir: PathBuf,
    log: RunLog,
}

impl ScanLog {
    pub fn create(root: &Path, plan: ScanPlan) -> io::Result<Self> {
        let started_at = Utc::now();
        let run_id = generate_run_id(started_at);
        let dir = root.join("runs").join(&run_id);
        fs::create_dir_all(&dir)?;

        let scan_log = Self {
            dir,
            log: RunLog {
                run_id,
                state: RunState::Running,
                plan,
                reference_heading: None,
                started_at,
                completed_at: None,
                row_transitions: 0,
                samples: Vec::new(),
                error: None,
            },
        };
        scan_log.save()?;
        Ok(scan_log)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn set_reference_heading(&mut self, radians: f64) -> io::Result<()> {
        self.log.reference_heading = Some(radians);
        self.save()
    }

    pub fn add_sample(&mut self, id: &str) -> io::Result<()> {
        self.log.samples.push(id.to_string());
        self.save()
    }

    pub fn add_row_transition(&mut self) -> io::Result<()> {
        self.log.row_transitions += 1;
        self.save()
    }

    pub fn finish_with_state(&mut self, state: RunState, error: Option<String>) -> io::Result<()> {
        self.log.state = state;
        self.log.error = error;
        self.log.completed_at = Some(Utc::now());
        self.save()
    }

    fn save(&self) -> io::Result<()> {
        self.log.save(&self.dir.join(format!("{}.yaml", LOG_STEM)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunLog {
    pub run_id: String,
    pub state: RunState,
    pub plan: ScanPlan,
    pub reference_heading: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub row_transitions: u32,
    /// Ids of the sample records written, in capture order.
    pub samples: Vec<String>,
    pub error: Option<String>,
}

impl RunLog {
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_yaml::from_str(&contents)
            .map_err(|e| io::Error::other(format!("Failed to parse scan log: {}", e)))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        fs::write(
            path,
            serde_yaml::to_string(self)
                .map_err(|e| io::Error::other(format!("Failed to serialize log: {}", e)))?,
        )
    }
}

fn generate_run_id(start: DateTime<Utc>) -> String {
    let uuid = uuid::Uuid::new_v4();
    let timestamp = start.format("%Y%m%dT%H%M%SZ");
    format!("{}_{}", timestamp, uuid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_rewritten_on_every_update() {
        let tmp = tempfile::tempdir().unwrap();
        let plan = ScanPlan {
            rows: 1,
            columns: 2,
            velocity: 0.1,
        };
        let mut scan_log = ScanLog::create(tmp.path(), plan).unwrap();
        let path = scan_log.dir().join("scan_log.yaml");
        assert!(scan_log.dir().starts_with(tmp.path().join("runs")));
        assert_eq!(RunLog::load(&path).unwrap().state, RunState::Running);

        scan_log.add_sample("a").unwrap();
        scan_log.add_row_transition().unwrap();
        scan_log
            .finish_with_state(RunState::Aborted, Some("boom".into()))
            .unwrap();

        let saved = RunLog::load(&path).unwrap();
        assert_eq!(saved.samples, vec!["a"]);
        assert_eq!(saved.row_transitions, 1);
        assert_eq!(saved.state, RunState::Aborted);
        assert_eq!(saved.error.as_deref(), Some("boom"));
        assert!(saved.completed_at.is_some());
    }
}
