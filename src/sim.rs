//! Simulated robot and peripherals for dry runs.
//!
//! The robot integrates the last commanded velocity over (tokio) time, so it
//! behaves consistently under a paused test clock.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;

use crate::motion::{wrap_angle, Heading, MotionError, OrientationSource, VelocityCommand, VelocitySink};
use crate::peripheral::{AntennaState, LinkHealth, PeripheralError, PeripheralLink, PhotoService};
use crate::rf::{PowerSource, RfError};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// Wrapped yaw in radians.
    pub yaw: f64,
}

struct SimState {
    /// Unwrapped yaw.
    yaw: f64,
    x: f64,
    y: f64,
    /// Yaw gained per metre driven (rad/m).
    drift: f64,
    cmd: VelocityCommand,
    updated: Instant,
    published: Vec<VelocityCommand>,
}

impl SimState {
    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.updated).as_secs_f64();
        self.updated = now;
        if dt == 0.0 {
            return;
        }
        self.x += self.cmd.linear * self.yaw.cos() * dt;
        self.y += self.cmd.linear * self.yaw.sin() * dt;
        self.yaw += (self.cmd.angular + self.drift * self.cmd.linear.abs()) * dt;
    }
}

/// Differential-drive robot that follows its velocity commands, optionally
/// veering to the left while it drives.
#[derive(Clone)]
pub struct SimRobot {
    state: Arc<Mutex<SimState>>,
}

impl SimRobot {
    pub fn new(initial_heading: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                yaw: initial_heading,
                x: 0.0,
                y: 0.0,
                drift: 0.0,
                cmd: VelocityCommand::STOP,
                updated: Instant::now(),
                published: Vec::new(),
            })),
        }
    }

    /// Adds `rad_per_metre` of yaw for every metre driven, forward or back.
    pub fn with_drift(self, rad_per_metre: f64) -> Self {
        self.state.lock().unwrap().drift = rad_per_metre;
        self
    }

    pub fn orientation(&self) -> SimOrientation {
        SimOrientation {
            state: self.state.clone(),
        }
    }

    pub fn sink(&self) -> SimSink {
        SimSink {
            state: self.state.clone(),
        }
    }

    /// Every command the robot has received, in order.
    pub fn published(&self) -> Vec<VelocityCommand> {
        self.state.lock().unwrap().published.clone()
    }

    /// Current wrapped heading in radians.
    pub fn heading(&self) -> f64 {
        self.pose().yaw
    }

    pub fn pose(&self) -> Pose {
        let mut state = self.state.lock().unwrap();
        state.advance();
        Pose {
            x: state.x,
            y: state.y,
            yaw: wrap_angle(state.yaw),
        }
    }
}

pub struct SimOrientation {
    state: Arc<Mutex<SimState>>,
}

#[async_trait]
impl OrientationSource for SimOrientation {
    async fn current_heading(&mut self) -> Result<Heading, MotionError> {
        let mut state = self.state.lock().unwrap();
        state.advance();
        Ok(Heading::from_radians(state.yaw))
    }
}

pub struct SimSink {
    state: Arc<Mutex<SimState>>,
}

impl VelocitySink for SimSink {
    fn publish(&mut self, cmd: VelocityCommand) -> Result<(), MotionError> {
        let mut state = self.state.lock().unwrap();
        state.advance();
        state.cmd = cmd;
        state.published.push(cmd);
        Ok(())
    }
}

/// Antenna switch that remembers the selected position.
#[derive(Default)]
pub struct SimAntenna {
    selected: Mutex<Option<AntennaState>>,
}

impl SimAntenna {
    pub fn selected(&self) -> Option<AntennaState> {
        *self.selected.lock().unwrap()
    }
}

#[async_trait]
impl PeripheralLink for SimAntenna {
    async fn send(&self, command: &str) -> Result<(), PeripheralError> {
        let state: AntennaState = command.parse()?;
        *self.selected.lock().unwrap() = Some(state);
        Ok(())
    }

    async fn check(&self) -> LinkHealth {
        LinkHealth::Good
    }
}

/// Minimal JPEG (SOI, APP0 stub, EOI).
const PLACEHOLDER_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

pub struct SimCamera;

#[async_trait]
impl PhotoService for SimCamera {
    async fn take_photo(&self) -> Result<Vec<u8>, PeripheralError> {
        Ok(PLACEHOLDER_JPEG.to_vec())
    }

    async fn ping(&self) -> LinkHealth {
        LinkHealth::Good
    }
}

/// Power vectors that depend on the selected antenna and, when attached,
/// on the robot's distance to a transmitter at the origin.
pub struct SimPowerSource {
    antenna: Arc<SimAntenna>,
    robot: Option<SimRobot>,
    bins: usize,
}

impl SimPowerSource {
    pub fn new(antenna: Arc<SimAntenna>, robot: Option<SimRobot>) -> Self {
        Self {
            antenna,
            robot,
            bins: 16,
        }
    }
}

#[async_trait]
impl PowerSource for SimPowerSource {
    async fn current_power_vector(&mut self) -> Result<Vec<f32>, RfError> {
        let gain = self.antenna.selected().map_or(0.0, |a| -1.5 * a.index() as f64);
        let distance = self.robot.as_ref().map_or(1.0, |r| {
            let p = r.pose();
            (p.x * p.x + p.y * p.y).sqrt().max(0.1)
        });
        let level = -40.0 - 20.0 * distance.log10() + gain;
        Ok((0..self.bins)
            .map(|i| (level + 0.1 * (i % 3) as f64) as f32)
            .collect())
    }
}
