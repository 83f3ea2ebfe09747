use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::abort::CancelFlag;

use super::error::MotionError;
use super::types::VelocityCommand;

/// Destination for velocity commands (linear.x, angular.z); other axes are zero.
pub trait VelocitySink: Send {
    fn publish(&mut self, cmd: VelocityCommand) -> Result<(), MotionError>;
}

/// Streams velocity commands to the robot at a fixed control rate.
///
/// Every public driving method ends with a zero-velocity command, including
/// when the cancel flag is raised mid-loop. If the sink itself fails, the stop
/// is still attempted before the error is returned.
pub struct MotionActuator {
    sink: Box<dyn VelocitySink>,
    period: Duration,
    cancel: CancelFlag,
}

impl MotionActuator {
    pub fn new(sink: Box<dyn VelocitySink>, rate_hz: f64, cancel: CancelFlag) -> Self {
        Self {
            sink,
            period: Duration::from_secs_f64(1.0 / rate_hz),
            cancel,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Drives with `cmd` for `duration`, then stops. Returns the number of ticks.
    pub async fn drive_for(
        &mut self,
        cmd: VelocityCommand,
        duration: Duration,
    ) -> Result<usize, MotionError> {
        let deadline = Instant::now() + duration;
        self.drive_while(cmd, || Instant::now() < deadline).await
    }

    /// Drives with `cmd` for as long as `keep_going` holds, then stops.
    pub async fn drive_while<F>(
        &mut self,
        cmd: VelocityCommand,
        mut keep_going: F,
    ) -> Result<usize, MotionError>
    where
        F: FnMut() -> bool,
    {
        let mut ticks = 0;
        while keep_going() {
            self.tick(cmd).await?;
            ticks += 1;
        }
        self.stop()?;
        Ok(ticks)
    }

    /// Publishes one command and waits out the control period.
    ///
    /// Does not stop afterwards unless the cancel flag fires or the sink
    /// fails; callers running their own loop must finish with [`stop`].
    ///
    /// [`stop`]: MotionActuator::stop
    pub async fn tick(&mut self, cmd: VelocityCommand) -> Result<(), MotionError> {
        if self.cancel.is_cancelled() {
            self.halt();
            return Err(MotionError::Cancelled);
        }

        if let Err(e) = self.sink.publish(cmd) {
            self.halt();
            return Err(e);
        }
        log::debug!("cmd linear={:.3} angular={:.3}", cmd.linear, cmd.angular);

        let cancelled = tokio::select! {
            _ = sleep(self.period) => false,
            _ = self.cancel.cancelled() => true,
        };
        if cancelled {
            self.halt();
            return Err(MotionError::Cancelled);
        }
        Ok(())
    }

    /// Publishes a single zero-velocity command.
    pub fn stop(&mut self) -> Result<(), MotionError> {
        self.sink.publish(VelocityCommand::STOP)
    }

    /// Best-effort stop used on error paths.
    pub fn halt(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Failed to stop robot: {}", e);
        }
    }
}
