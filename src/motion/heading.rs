use std::f64::consts::FRAC_PI_2;

use serde::Deserialize;

use super::actuator::MotionActuator;
use super::error::MotionError;
use super::orientation::OrientationSource;
use super::types::{Heading, Rotation, VelocityCommand};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HeadingConfig {
    /// Yaw rate used for quarter turns (rad/s).
    #[serde(default = "default_speed")]
    pub turn_speed: f64,
    /// Yaw rate used while correcting drift (rad/s).
    #[serde(default = "default_speed")]
    pub correction_speed: f64,
    /// Correction stops once |target − heading| is within this band (rad).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_speed() -> f64 {
    0.25
}

fn default_tolerance() -> f64 {
    0.07
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            turn_speed: default_speed(),
            correction_speed: default_speed(),
            tolerance: default_tolerance(),
        }
    }
}

/// Maps a heading error (target − current, radians) to a yaw-rate command.
pub trait CorrectionLaw: Send + Sync {
    fn angular_velocity(&self, error: f64) -> f64;

    /// Errors at or below this magnitude need no correction.
    fn tolerance(&self) -> f64;
}

/// Fixed-magnitude correction toward the target.
#[derive(Debug, Clone, Copy)]
pub struct BangBang {
    pub speed: f64,
    pub tolerance: f64,
}

impl CorrectionLaw for BangBang {
    fn angular_velocity(&self, error: f64) -> f64 {
        if error < 0.0 {
            -self.speed.abs()
        } else {
            self.speed.abs()
        }
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TurnReport {
    pub start: Heading,
    /// Unwrapped target, start ± π/2.
    pub target: f64,
    pub end: Heading,
    pub ticks: usize,
}

pub struct HeadingController {
    orientation: Box<dyn OrientationSource>,
    turn_speed: f64,
    law: Box<dyn CorrectionLaw>,
}

impl HeadingController {
    pub fn new(orientation: Box<dyn OrientationSource>, config: &HeadingConfig) -> Self {
        Self {
            orientation,
            turn_speed: config.turn_speed.abs(),
            law: Box::new(BangBang {
                speed: config.correction_speed,
                tolerance: config.tolerance,
            }),
        }
    }

    pub fn with_law(mut self, law: Box<dyn CorrectionLaw>) -> Self {
        self.law = law;
        self
    }

    pub async fn heading(&mut self) -> Result<Heading, MotionError> {
        self.orientation.current_heading().await
    }

    /// Rotates in place by a quarter turn.
    ///
    /// The target is `start ± π/2` compared against the wrapped heading without
    /// unwrapping. A turn whose target lies beyond ±π therefore never sees the
    /// heading cross it and keeps rotating until the cancel flag is raised.
    /// Scans must start with enough margin from the seam for both turns of a
    /// row transition.
    ///
    /// A sensor error inside the loop leaves the last yaw-rate command active;
    /// the caller is responsible for stopping the robot.
    pub async fn turn(
        &mut self,
        actuator: &mut MotionActuator,
        rotation: Rotation,
    ) -> Result<TurnReport, MotionError> {
        let start = self.orientation.current_heading().await?;
        let target = start.radians() + rotation.sign() * FRAC_PI_2;
        let cmd = VelocityCommand::angular(rotation.sign() * self.turn_speed);
        log::info!(
            "Turning {:?} from {} (target {:.3} rad)",
            rotation,
            start,
            target
        );

        let mut yaw = start.radians();
        let mut ticks = 0;
        while !crossed(rotation, yaw, target) {
            actuator.tick(cmd).await?;
            yaw = self.orientation.current_heading().await?.radians();
            ticks += 1;
        }
        actuator.stop()?;

        let end = self.orientation.current_heading().await?;
        log::info!("Completed 90-degree turn at {} after {} ticks", end, ticks);
        Ok(TurnReport {
            start,
            target,
            end,
            ticks,
        })
    }

    /// Rotates toward `target` until the error is inside the law's tolerance.
    /// Returns the number of control ticks spent; zero if already aligned, in
    /// which case nothing is published.
    pub async fn correct(
        &mut self,
        actuator: &mut MotionActuator,
        target: Heading,
    ) -> Result<usize, MotionError> {
        let target = target.radians();
        let tolerance = self.law.tolerance();
        let mut yaw = self.orientation.current_heading().await?.radians();

        let mut ticks = 0;
        while (target - yaw).abs() > tolerance {
            let rate = self.law.angular_velocity(target - yaw);
            actuator.tick(VelocityCommand::angular(rate)).await?;
            yaw = self.orientation.current_heading().await?.radians();
            ticks += 1;
        }

        if ticks > 0 {
            actuator.stop()?;
            log::debug!(
                "Corrected heading to {:.3} rad (target {:.3}) in {} ticks",
                yaw,
                target,
                ticks
            );
        }
        Ok(ticks)
    }
}

fn crossed(rotation: Rotation, yaw: f64, target: f64) -> bool {
    match rotation {
        Rotation::CounterClockwise => yaw >= target,
        Rotation::Clockwise => yaw <= target,
    }
}
