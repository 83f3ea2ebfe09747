use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::PeripheralError;
use super::status::LinkHealth;

/// Point-to-point link to the antenna-switch peripheral.
///
/// `Ok` means the transport acknowledged the write; there is no semantic
/// confirmation from the device.
#[async_trait]
pub trait PeripheralLink: Send + Sync {
    async fn send(&self, command: &str) -> Result<(), PeripheralError>;

    async fn check(&self) -> LinkHealth;
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    #[default]
    None,
    Fixed {
        #[serde(deserialize_with = "crate::config::duration::deserialize")]
        delay: Duration,
    },
    Exponential {
        #[serde(deserialize_with = "crate::config::duration::deserialize")]
        initial: Duration,
        #[serde(deserialize_with = "crate::config::duration::deserialize")]
        max: Duration,
    },
}

impl Backoff {
    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay } => *delay,
            Backoff::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                initial.saturating_mul(factor).min(*max)
            }
        }
    }
}

/// How often a failed peripheral command is re-sent. The default retries
/// forever with no pause between attempts.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct RetryPolicy {
    /// Total attempts including the first; unbounded when absent.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff,
        }
    }

    fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// Sends discrete commands over a [`PeripheralLink`], bounding each attempt
/// with a timeout and retrying according to a [`RetryPolicy`].
#[derive(Clone)]
pub struct CommandChannel {
    link: Arc<dyn PeripheralLink>,
    attempt_timeout: Duration,
    policy: RetryPolicy,
}

impl CommandChannel {
    pub fn new(link: Arc<dyn PeripheralLink>, attempt_timeout: Duration, policy: RetryPolicy) -> Self {
        Self {
            link,
            attempt_timeout,
            policy,
        }
    }

    pub fn link(&self) -> Arc<dyn PeripheralLink> {
        self.link.clone()
    }

    /// One attempt, bounded by the per-attempt timeout.
    pub async fn send_once(&self, command: &str) -> Result<(), PeripheralError> {
        tokio::time::timeout(self.attempt_timeout, self.link.send(command))
            .await
            .map_err(|_| PeripheralError::Timeout(self.attempt_timeout))?
    }

    /// One attempt, reported as success or failure.
    pub async fn send(&self, command: &str) -> bool {
        match self.send_once(command).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Peripheral command '{}' failed: {}", command, e);
                false
            }
        }
    }

    /// Re-sends `command` until acknowledged or the policy gives up.
    /// Returns the number of attempts made.
    ///
    /// Does not observe the cancel flag; with the default policy an
    /// unreachable peripheral stalls the caller indefinitely.
    pub async fn send_until_acked(&self, command: &str) -> Result<u32, PeripheralError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let err = match self.send_once(command).await {
                Ok(()) => {
                    log::info!("Sent: '{}' ({} attempts)", command, attempts);
                    return Ok(attempts);
                }
                Err(e) => e,
            };

            if !self.policy.allows(attempts) {
                return Err(PeripheralError::RetriesExhausted {
                    attempts,
                    last: Box::new(err),
                });
            }

            log::warn!(
                "Failed to send '{}' (attempt {}): {}, retrying",
                command,
                attempts,
                err
            );
            let delay = self.policy.backoff.delay(attempts);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
