//! Scripted collaborators shared by unit tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::abort::CancelFlag;
use crate::capture::{CaptureConfig, SampleCoordinator};
use crate::motion::{
    Heading, HeadingConfig, HeadingController, MotionActuator, MotionError, OrientationSource,
    VelocityCommand, VelocitySink,
};
use crate::peripheral::{
    CommandChannel, LinkHealth, PeripheralError, PeripheralLink, PhotoService, RetryPolicy,
};
use crate::rf::{PowerSource, RfError};
use crate::scan::{ScanConfig, ScanOrchestrator};
use crate::sim::SimRobot;

pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

#[derive(Default)]
struct SinkLog {
    commands: Vec<VelocityCommand>,
    attempts: usize,
    fail_after: Option<usize>,
}

/// Velocity sink that records what it is sent.
#[derive(Clone, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<SinkLog>>,
}

impl RecordingSink {
    /// Successfully published commands.
    pub fn commands(&self) -> Vec<VelocityCommand> {
        self.log.lock().unwrap().commands.clone()
    }

    /// Every publish call, failed or not.
    pub fn attempts(&self) -> usize {
        self.log.lock().unwrap().attempts
    }

    /// Accept `n` commands, then reject everything.
    pub fn fail_after(&self, n: usize) {
        self.log.lock().unwrap().fail_after = Some(n);
    }
}

impl VelocitySink for RecordingSink {
    fn publish(&mut self, cmd: VelocityCommand) -> Result<(), MotionError> {
        let mut log = self.log.lock().unwrap();
        log.attempts += 1;
        if log.fail_after.is_some_and(|n| log.commands.len() >= n) {
            return Err(MotionError::ActuatorUnavailable("sink closed".into()));
        }
        log.commands.push(cmd);
        Ok(())
    }
}

#[derive(Default)]
struct LinkScript {
    failures: u32,
    hanging: u32,
    latencies: VecDeque<u64>,
    sent: Vec<String>,
}

/// Peripheral link that fails, hangs or lags on a script.
pub struct ScriptedLink {
    script: Mutex<LinkScript>,
}

impl ScriptedLink {
    /// Rejects the first `failures` sends, then acknowledges.
    pub fn failing(failures: u32) -> Self {
        Self {
            script: Mutex::new(LinkScript {
                failures,
                ..Default::default()
            }),
        }
    }

    /// The first `n` sends never complete.
    pub fn hanging_first(self, n: u32) -> Self {
        self.script.lock().unwrap().hanging = n;
        self
    }

    /// Per-call delay in milliseconds, in call order.
    pub fn with_latencies(self, millis: &[u64]) -> Self {
        self.script.lock().unwrap().latencies = millis.iter().copied().collect();
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.script.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl PeripheralLink for ScriptedLink {
    async fn send(&self, command: &str) -> Result<(), PeripheralError> {
        let (hang, latency, fail) = {
            let mut script = self.script.lock().unwrap();
            script.sent.push(command.to_string());
            let hang = script.hanging > 0;
            if hang {
                script.hanging -= 1;
            }
            let latency = script.latencies.pop_front().unwrap_or(0);
            let fail = script.failures > 0;
            if fail {
                script.failures -= 1;
            }
            (hang, latency, fail)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_millis(latency)).await;
        if fail {
            Err(PeripheralError::Link("scripted failure".into()))
        } else {
            Ok(())
        }
    }

    async fn check(&self) -> LinkHealth {
        LinkHealth::Good
    }
}

struct CameraState {
    health: LinkHealth,
    fail: bool,
    taken: usize,
}

pub struct FakeCamera {
    state: Mutex<CameraState>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CameraState {
                health: LinkHealth::Good,
                fail: false,
                taken: 0,
            }),
        }
    }

    pub fn set_health(&self, health: LinkHealth) {
        self.state.lock().unwrap().health = health;
    }

    pub fn fail_photos(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    pub fn photos_taken(&self) -> usize {
        self.state.lock().unwrap().taken
    }
}

#[async_trait]
impl PhotoService for FakeCamera {
    async fn take_photo(&self) -> Result<Vec<u8>, PeripheralError> {
        let mut state = self.state.lock().unwrap();
        state.taken += 1;
        if state.fail {
            Err(PeripheralError::Status(500))
        } else {
            Ok(JPEG.to_vec())
        }
    }

    async fn ping(&self) -> LinkHealth {
        self.state.lock().unwrap().health
    }
}

/// Power source replaying vectors in order; the last one repeats.
pub struct ScriptedPower {
    vectors: VecDeque<Vec<f32>>,
    latencies: VecDeque<u64>,
    failure: Option<(usize, RfError)>,
    calls: usize,
}

impl ScriptedPower {
    pub fn new(vectors: Vec<Vec<f32>>) -> Self {
        Self {
            vectors: vectors.into(),
            latencies: VecDeque::new(),
            failure: None,
            calls: 0,
        }
    }

    pub fn constant(power: f32) -> Self {
        Self::new(vec![vec![power]])
    }

    pub fn with_latencies(mut self, millis: &[u64]) -> Self {
        self.latencies = millis.iter().copied().collect();
        self
    }

    /// Returns `err` on the call with zero-based index `call`.
    pub fn failing_at(mut self, call: usize, err: RfError) -> Self {
        self.failure = Some((call, err));
        self
    }
}

#[async_trait]
impl PowerSource for ScriptedPower {
    async fn current_power_vector(&mut self) -> Result<Vec<f32>, RfError> {
        let call = self.calls;
        self.calls += 1;
        if let Some(ms) = self.latencies.pop_front() {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if self.failure.as_ref().is_some_and(|(at, _)| *at == call) {
            if let Some((_, err)) = self.failure.take() {
                return Err(err);
            }
        }
        let vector = if self.vectors.len() > 1 {
            self.vectors.pop_front().unwrap_or_default()
        } else {
            self.vectors.front().cloned().unwrap_or_default()
        };
        Ok(vector)
    }
}

/// Orientation source that passes through `reads` readings, then times out.
pub struct FailingOrientation {
    inner: Box<dyn OrientationSource>,
    reads: usize,
}

impl FailingOrientation {
    pub fn after(reads: usize, inner: Box<dyn OrientationSource>) -> Self {
        Self { inner, reads }
    }
}

#[async_trait]
impl OrientationSource for FailingOrientation {
    async fn current_heading(&mut self) -> Result<Heading, MotionError> {
        if self.reads == 0 {
            return Err(MotionError::SensorTimeout(Duration::from_secs(2)));
        }
        self.reads -= 1;
        self.inner.current_heading().await
    }
}

/// Orchestrator over a simulated robot with well-behaved fake peripherals.
pub fn sim_orchestrator(robot: &SimRobot, cancel: &CancelFlag, root: &Path) -> ScanOrchestrator {
    let actuator = MotionActuator::new(Box::new(robot.sink()), 10.0, cancel.clone());
    let heading = HeadingController::new(Box::new(robot.orientation()), &HeadingConfig::default());
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
    ScanOrchestrator::new(actuator, heading, coordinator, ScanConfig::default(), root)
}
