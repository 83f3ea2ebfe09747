use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{interval, sleep};

use super::error::{ScanError, ScanFault};
use super::log::{RunState, ScanLog};
use super::plan::{ScanConfig, ScanPlan};
use super::position::{Maneuver, ScanPosition};
use crate::abort::CancelFlag;
use crate::capture::{CaptureError, SampleCoordinator, SampleRecord, SampleStore, StorageError};
use crate::motion::{
    Heading, HeadingController, MotionActuator, MotionError, Rotation, VelocityCommand,
};
use crate::peripheral::{AntennaState, PeripheralError};

/// Mutable progress of one run.
struct ScanState {
    position: ScanPosition,
    velocity: f64,
    reference: Heading,
    row_transitions: u32,
}

impl ScanState {
    fn abort(&self, maneuver: Maneuver, fault: impl Into<ScanFault>) -> ScanError {
        ScanError::Aborted {
            maneuver,
            position: self.position,
            source: fault.into(),
        }
    }

    /// Flips the travel direction for the next row.
    fn reverse(&mut self) {
        self.velocity = -self.velocity;
        self.position.direction = self.position.direction.reversed();
    }
}

#[derive(Debug)]
pub struct ScanSummary {
    pub run_id: String,
    pub dir: PathBuf,
    pub reference: Heading,
    pub records: Vec<SampleRecord>,
    pub row_transitions: u32,
}

/// Owns the robot's motion and the capture peripherals; the only component
/// that issues velocity commands.
pub struct ScanOrchestrator {
    actuator: MotionActuator,
    heading: HeadingController,
    coordinator: SampleCoordinator,
    config: ScanConfig,
    output_root: PathBuf,
}

impl ScanOrchestrator {
    pub fn new(
        actuator: MotionActuator,
        heading: HeadingController,
        coordinator: SampleCoordinator,
        config: ScanConfig,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            actuator,
            heading,
            coordinator,
            config,
            output_root: output_root.into(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub async fn run(&mut self, plan: ScanPlan) -> Result<ScanSummary, ScanError> {
        self.run_with(plan, |_| {}).await
    }

    /// Runs the raster, calling `on_sample` after each record is persisted.
    ///
    /// On any failure the robot is stopped and the run log is closed as
    /// aborted before the error is returned.
    pub async fn run_with<F>(&mut self, plan: ScanPlan, mut on_sample: F) -> Result<ScanSummary, ScanError>
    where
        F: FnMut(&SampleRecord) + Send,
    {
        plan.validate()?;
        let mut scan_log = ScanLog::create(&self.output_root, plan)?;
        let store = SampleStore::open(scan_log.dir())?;
        log::info!(
            "Starting scan {}: {} rows x {} columns at {} m/s",
            scan_log.log().run_id,
            plan.rows,
            plan.columns,
            plan.velocity
        );

        let mut records = Vec::new();
        let result = self
            .raster(plan, &store, &mut scan_log, &mut records, &mut on_sample)
            .await;

        match result {
            Ok(state) => {
                note(scan_log.finish_with_state(RunState::Completed, None));
                log::info!(
                    "Scan {} completed: {} samples, {} row transitions",
                    scan_log.log().run_id,
                    records.len(),
                    state.row_transitions
                );
                Ok(ScanSummary {
                    run_id: scan_log.log().run_id.clone(),
                    dir: scan_log.dir().to_path_buf(),
                    reference: state.reference,
                    records,
                    row_transitions: state.row_transitions,
                })
            }
            Err(e) => {
                self.actuator.halt();
                note(scan_log.finish_with_state(RunState::Aborted, Some(e.to_string())));
                if e.is_cancelled() {
                    log::warn!("{}", e);
                } else {
                    log::error!("{}", e);
                }
                Err(e)
            }
        }
    }

    async fn raster<F>(
        &mut self,
        plan: ScanPlan,
        store: &SampleStore,
        scan_log: &mut ScanLog,
        records: &mut Vec<SampleRecord>,
        on_sample: &mut F,
    ) -> Result<ScanState, ScanError>
    where
        F: FnMut(&SampleRecord) + Send,
    {
        let mut state = ScanState {
            position: ScanPosition::START,
            velocity: plan.velocity,
            reference: Heading::from_radians(0.0),
            row_transitions: 0,
        };

        state.reference = self
            .heading
            .heading()
            .await
            .map_err(|e| state.abort(Maneuver::ReferenceHeading, e))?;
        log::info!("Reference heading {}", state.reference);
        note(scan_log.set_reference_heading(state.reference.radians()));

        for row in 0..plan.rows {
            state.position.row = row;
            for column in 0..plan.columns {
                state.position.column = column;

                let record = self
                    .coordinator
                    .capture(store, Some(state.position))
                    .await
                    .map_err(|e| state.abort(Maneuver::Capture, e))?;
                note(scan_log.add_sample(&record.id));
                on_sample(&record);
                records.push(record);

                self.actuator
                    .drive_for(VelocityCommand::linear(state.velocity), self.config.step_duration)
                    .await
                    .map_err(|e| state.abort(Maneuver::Advance, e))?;

                self.heading
                    .correct(&mut self.actuator, state.reference)
                    .await
                    .map_err(|e| state.abort(Maneuver::HeadingCorrection, e))?;
            }

            let last_row = row + 1 == plan.rows;
            if !last_row || self.config.transition_after_last_row {
                self.move_next_row()
                    .await
                    .map_err(|e| state.abort(Maneuver::RowTransition, e))?;
                state.row_transitions += 1;
                note(scan_log.add_row_transition());
            }

            state.reverse();
            sleep(self.config.pause).await;
        }

        Ok(state)
    }

    /// Quarter turn counter-clockwise, shift sideways, quarter turn back.
    async fn move_next_row(&mut self) -> Result<(), MotionError> {
        log::info!("Moving to next row");
        self.heading
            .turn(&mut self.actuator, Rotation::CounterClockwise)
            .await?;
        sleep(self.config.pause).await;
        self.actuator
            .drive_for(
                VelocityCommand::linear(self.config.row_shift_velocity),
                self.config.row_shift_duration,
            )
            .await?;
        self.heading
            .turn(&mut self.actuator, Rotation::Clockwise)
            .await?;
        Ok(())
    }

    pub async fn heading(&mut self) -> Result<Heading, MotionError> {
        let heading = self.heading.heading().await?;
        log::info!("Current heading: {} ({:.4} rad)", heading, heading.radians());
        Ok(heading)
    }

    /// Captures one sample where the robot stands, outside of any scan.
    pub async fn capture_here(&mut self) -> Result<SampleRecord, CaptureError> {
        let store = SampleStore::open(self.output_root.join("captures"))?;
        self.coordinator.capture(&store, None).await
    }

    pub async fn take_photo(&mut self) -> Result<Option<String>, StorageError> {
        let store = SampleStore::open(self.output_root.join("photos"))?;
        Ok(self.coordinator.take_photo(&store).await)
    }

    /// Takes a photo every `every` until `count` photos are saved or `cancel`
    /// is raised. Failed shots are skipped. Returns the saved file names.
    pub async fn photo_series(
        &mut self,
        every: Duration,
        count: Option<usize>,
        cancel: &CancelFlag,
    ) -> Result<Vec<String>, StorageError> {
        let store = SampleStore::open(self.output_root.join("photos"))?;
        log::info!("Taking a photo every {}", humantime::format_duration(every));

        let mut saved = Vec::new();
        let mut ticker = interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => break,
            }
            if let Some(name) = self.coordinator.take_photo(&store).await {
                saved.push(name);
            }
            if count.is_some_and(|n| saved.len() >= n) {
                break;
            }
        }
        log::info!("Photo series finished with {} photos", saved.len());
        Ok(saved)
    }

    /// Single antenna command, not retried.
    pub async fn send_antenna(&mut self, antenna: AntennaState) -> Result<(), PeripheralError> {
        let channel = self.coordinator.antenna();
        channel.send_once(&antenna.command()).await
    }

    pub fn stop(&mut self) -> Result<(), MotionError> {
        self.actuator.stop()
    }
}

/// Run-log writes never interrupt the robot.
fn note(result: io::Result<()>) {
    if let Err(e) = result {
        log::warn!("Failed to update scan log: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::CancelFlag;
    use crate::capture::CaptureConfig;
    use crate::motion::{HeadingConfig, OrientationSource};
    use crate::peripheral::{CommandChannel, RetryPolicy};
    use crate::scan::log::RunLog;
    use crate::scan::position::Direction;
    use crate::sim::SimRobot;
    use crate::testing::{FailingOrientation, FakeCamera, ScriptedLink, ScriptedPower};
    use std::sync::Arc;
    use std::time::Duration;

    fn orchestrator(
        robot: &SimRobot,
        orientation: Box<dyn OrientationSource>,
        cancel: &CancelFlag,
        root: &Path,
        config: ScanConfig,
    ) -> ScanOrchestrator {
        let actuator = MotionActuator::new(Box::new(robot.sink()), 10.0, cancel.clone());
        let heading = HeadingController::new(orientation, &HeadingConfig::default());
        let coordinator = SampleCoordinator::new(
            Arc::new(FakeCamera::new()),
            CommandChannel::new(
                Arc::new(ScriptedLink::failing(0)),
                Duration::from_secs(5),
                RetryPolicy::default(),
            ),
            Box::new(ScriptedPower::constant(-45.0)),
            &CaptureConfig::default(),
        );
        ScanOrchestrator::new(actuator, heading, coordinator, config, root)
    }

    fn plan(rows: u32, columns: u32, velocity: f64) -> ScanPlan {
        ScanPlan {
            rows,
            columns,
            velocity,
        }
    }

    fn only_run_log(root: &Path) -> RunLog {
        let mut runs: Vec<_> = std::fs::read_dir(root.join("runs"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(runs.len(), 1);
        RunLog::load(&runs.remove(0).join("scan_log.yaml")).unwrap()
    }

    /// Number of separate in-place rotations in a command stream.
    fn rotations(commands: &[VelocityCommand]) -> usize {
        let mut count = 0;
        let mut rotating = false;
        for c in commands {
            let now = c.linear == 0.0 && c.angular != 0.0;
            if now && !rotating {
                count += 1;
            }
            rotating = now;
        }
        count
    }

    #[tokio::test(start_paused = true)]
    async fn two_by_three_raster_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let robot = SimRobot::new(0.0);
        let cancel = CancelFlag::new();
        let mut scan = orchestrator(
            &robot,
            Box::new(robot.orientation()),
            &cancel,
            tmp.path(),
            ScanConfig::default(),
        );

        let summary = scan.run(plan(2, 3, 0.1)).await.unwrap();

        let positions: Vec<(u32, u32, Direction)> = summary
            .records
            .iter()
            .map(|r| {
                let p = r.position.unwrap();
                (p.row, p.column, p.direction)
            })
            .collect();
        assert_eq!(
            positions,
            vec![
                (0, 0, Direction::Forward),
                (0, 1, Direction::Forward),
                (0, 2, Direction::Forward),
                (1, 0, Direction::Reverse),
                (1, 1, Direction::Reverse),
                (1, 2, Direction::Reverse),
            ]
        );

        let published = robot.published();
        let translations: Vec<f64> = published
            .iter()
            .filter(|c| c.linear.abs() == 0.1)
            .map(|c| c.linear)
            .collect();
        assert_eq!(translations.len(), 60);
        assert!(translations[..30].iter().all(|v| *v == 0.1));
        assert!(translations[30..].iter().all(|v| *v == -0.1));

        assert_eq!(summary.row_transitions, 2);
        assert_eq!(rotations(&published), 4);
        assert!(published.last().unwrap().is_stop());

        let store = SampleStore::open(&summary.dir).unwrap();
        let stored: Vec<String> = store.records().unwrap().into_iter().map(|r| r.id).collect();
        let ids: Vec<String> = summary.records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(stored, ids);

        let run_log = only_run_log(tmp.path());
        assert_eq!(run_log.state, RunState::Completed);
        assert_eq!(run_log.samples, ids);
        assert_eq!(run_log.row_transitions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drift_is_corrected_after_every_advance() {
        let tmp = tempfile::tempdir().unwrap();
        let robot = SimRobot::new(0.0).with_drift(1.0);
        let config = ScanConfig {
            transition_after_last_row: false,
            ..ScanConfig::default()
        };
        let mut scan = orchestrator(
            &robot,
            Box::new(robot.orientation()),
            &CancelFlag::new(),
            tmp.path(),
            config,
        );

        let summary = scan.run(plan(2, 3, 0.1)).await.unwrap();

        assert_eq!(summary.records.len(), 6);
        assert_eq!(summary.row_transitions, 1);
        // one correction per advance plus the two quarter turns
        assert_eq!(rotations(&robot.published()), 6 + 2);
        let error = crate::motion::wrap_angle(robot.heading() - summary.reference.radians());
        assert!(error.abs() <= HeadingConfig::default().tolerance + 1e-9, "error {error}");
    }

    #[tokio::test(start_paused = true)]
    async fn raster_captures_every_cell() {
        for (transition_after_last_row, expected) in [(true, 3), (false, 2)] {
            let tmp = tempfile::tempdir().unwrap();
            let robot = SimRobot::new(-0.5);
            let config = ScanConfig {
                transition_after_last_row,
                step_duration: Duration::from_millis(300),
                ..ScanConfig::default()
            };
            let mut scan = orchestrator(
                &robot,
                Box::new(robot.orientation()),
                &CancelFlag::new(),
                tmp.path(),
                config,
            );

            let summary = scan.run(plan(3, 4, 0.125)).await.unwrap();

            assert_eq!(summary.records.len(), 12);
            assert_eq!(summary.row_transitions, expected);
            assert_eq!(rotations(&robot.published()), 2 * expected as usize);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_timeout_aborts_with_maneuver_and_position() {
        let tmp = tempfile::tempdir().unwrap();
        let robot = SimRobot::new(0.0);
        // reference read and the first correction succeed
        let orientation = FailingOrientation::after(2, Box::new(robot.orientation()));
        let mut scan = orchestrator(
            &robot,
            Box::new(orientation),
            &CancelFlag::new(),
            tmp.path(),
            ScanConfig::default(),
        );

        let err = scan.run(plan(2, 3, 0.1)).await.unwrap_err();

        match &err {
            ScanError::Aborted {
                maneuver,
                position,
                source,
            } => {
                assert_eq!(*maneuver, Maneuver::HeadingCorrection);
                assert_eq!((position.row, position.column), (0, 1));
                assert!(matches!(source, ScanFault::Motion(e) if e.is_sensor_fault()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err
            .to_string()
            .starts_with("scan aborted during heading correction at row 0, column 1: "));
        assert!(robot.published().last().unwrap().is_stop());

        let run_log = only_run_log(tmp.path());
        assert_eq!(run_log.state, RunState::Aborted);
        assert_eq!(run_log.samples.len(), 2);
        assert_eq!(run_log.error, Some(err.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_scan() {
        let tmp = tempfile::tempdir().unwrap();
        let robot = SimRobot::new(0.0);
        let cancel = CancelFlag::new();
        let mut scan = orchestrator(
            &robot,
            Box::new(robot.orientation()),
            &cancel,
            tmp.path(),
            ScanConfig::default(),
        );

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(2550)).await;
            trigger.cancel();
        });

        let err = scan.run(plan(2, 3, 0.1)).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(matches!(
            err,
            ScanError::Aborted {
                maneuver: Maneuver::Advance,
                ..
            }
        ));
        assert!(robot.published().last().unwrap().is_stop());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_plan_is_rejected_before_moving() {
        let tmp = tempfile::tempdir().unwrap();
        let robot = SimRobot::new(0.0);
        let mut scan = orchestrator(
            &robot,
            Box::new(robot.orientation()),
            &CancelFlag::new(),
            tmp.path(),
            ScanConfig::default(),
        );

        let err = scan.run(plan(0, 3, 0.1)).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidPlan(_)));
        assert!(robot.published().is_empty());
        assert!(!tmp.path().join("runs").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_operations_do_not_move_the_robot() {
        let tmp = tempfile::tempdir().unwrap();
        let robot = SimRobot::new(0.4);
        let mut scan = orchestrator(
            &robot,
            Box::new(robot.orientation()),
            &CancelFlag::new(),
            tmp.path(),
            ScanConfig::default(),
        );

        assert!((scan.heading().await.unwrap().radians() - 0.4).abs() < 1e-9);
        let record = scan.capture_here().await.unwrap();
        assert!(record.position.is_none());
        assert!(tmp.path().join("captures").join(format!("{}.yaml", record.id)).exists());
        let photo = scan.take_photo().await.unwrap().unwrap();
        assert!(tmp.path().join("photos").join(photo).exists());
        scan.send_antenna(AntennaState::new(2).unwrap()).await.unwrap();
        assert!(robot.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn photo_series_runs_on_a_fixed_period() {
        let tmp = tempfile::tempdir().unwrap();
        let robot = SimRobot::new(0.0);
        let cancel = CancelFlag::new();
        let mut scan = orchestrator(
            &robot,
            Box::new(robot.orientation()),
            &cancel,
            tmp.path(),
            ScanConfig::default(),
        );

        let started = tokio::time::Instant::now();
        let photos = scan
            .photo_series(Duration::from_secs(10), Some(3), &cancel)
            .await
            .unwrap();

        assert_eq!(photos.len(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(20));
        for name in &photos {
            assert!(tmp.path().join("photos").join(name).exists());
        }
        assert!(robot.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn photo_series_ends_on_cancel() {
        let tmp = tempfile::tempdir().unwrap();
        let robot = SimRobot::new(0.0);
        let cancel = CancelFlag::new();
        let mut scan = orchestrator(
            &robot,
            Box::new(robot.orientation()),
            &cancel,
            tmp.path(),
            ScanConfig::default(),
        );

        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            stopper.cancel();
        });
        let photos = scan
            .photo_series(Duration::from_secs(10), None, &cancel)
            .await
            .unwrap();

        assert_eq!(photos.len(), 3);
    }
}
