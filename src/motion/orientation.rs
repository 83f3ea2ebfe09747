use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::error::MotionError;
use super::types::{Heading, Quaternion};

/// Produces the robot's current heading from the newest orientation sample.
#[async_trait]
pub trait OrientationSource: Send {
    /// Blocks until a sample newer than the previous call arrives.
    async fn current_heading(&mut self) -> Result<Heading, MotionError>;
}

/// Orientation source fed by a latest-value channel, e.g. an odometry subscription.
#[cfg_attr(not(feature = "ros"), allow(dead_code))]
pub struct FeedOrientation {
    rx: watch::Receiver<Option<Quaternion>>,
    timeout: Duration,
}

#[cfg_attr(not(feature = "ros"), allow(dead_code))]
impl FeedOrientation {
    pub fn new(rx: watch::Receiver<Option<Quaternion>>, timeout: Duration) -> Self {
        Self { rx, timeout }
    }
}

#[async_trait]
impl OrientationSource for FeedOrientation {
    async fn current_heading(&mut self) -> Result<Heading, MotionError> {
        let timeout = self.timeout;
        let rx = &mut self.rx;

        let fresh = async {
            loop {
                rx.changed().await.map_err(|_| MotionError::FeedClosed)?;
                if let Some(q) = *rx.borrow_and_update() {
                    return Ok(Heading::from_quaternion(q));
                }
            }
        };

        tokio::time::timeout(timeout, fresh)
            .await
            .map_err(|_| MotionError::SensorTimeout(timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn waits_for_a_fresh_sample() {
        let (tx, rx) = watch::channel(Some(Quaternion::from_yaw(0.1)));
        let mut source = FeedOrientation::new(rx, Duration::from_secs(2));

        // the initial value counts as already seen
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            tx.send_replace(Some(Quaternion::from_yaw(0.4)));
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let heading = source.current_heading().await.unwrap();
        assert!((heading.radians() - 0.4).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_samples() {
        let (_tx, rx) = watch::channel(None);
        let mut source = FeedOrientation::new(rx, Duration::from_secs(2));

        let err = source.current_heading().await.unwrap_err();
        assert!(matches!(err, MotionError::SensorTimeout(d) if d == Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn reports_closed_feed() {
        let (tx, rx) = watch::channel(None);
        drop(tx);
        let mut source = FeedOrientation::new(rx, Duration::from_secs(2));

        let err = source.current_heading().await.unwrap_err();
        assert!(matches!(err, MotionError::FeedClosed));
    }
}
