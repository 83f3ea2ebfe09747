pub mod duration;

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::capture::CaptureConfig;
use crate::motion::HeadingConfig;
use crate::peripheral::RetryPolicy;
use crate::scan::ScanConfig;
use crate::web::WebConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub heading: HeadingConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub peripherals: PeripheralConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub rf: RfConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotBackend {
    #[default]
    Simulated,
    Ros,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    #[serde(default)]
    pub backend: RobotBackend,
    #[serde(default = "default_control_rate")]
    pub control_rate_hz: f64,
    /// Longest wait for a fresh odometry sample.
    #[serde(
        default = "default_orientation_timeout",
        deserialize_with = "duration::deserialize"
    )]
    pub orientation_timeout: Duration,
    #[serde(default)]
    pub ros: RosConfig,
    #[serde(default)]
    pub simulated: SimulatedRobotConfig,
}

fn default_control_rate() -> f64 {
    10.0
}

fn default_orientation_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            backend: RobotBackend::default(),
            control_rate_hz: default_control_rate(),
            orientation_timeout: default_orientation_timeout(),
            ros: RosConfig::default(),
            simulated: SimulatedRobotConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosConfig {
    #[serde(default = "default_node_name")]
    pub node_name: String,
    #[serde(default = "default_odom_topic")]
    pub odom_topic: String,
    #[serde(default = "default_cmd_vel_topic")]
    pub cmd_vel_topic: String,
}

fn default_node_name() -> String {
    "survey_o_mat".to_string()
}

fn default_odom_topic() -> String {
    "/odom".to_string()
}

fn default_cmd_vel_topic() -> String {
    "/mobile_base/commands/velocity".to_string()
}

impl Default for RosConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            odom_topic: default_odom_topic(),
            cmd_vel_topic: default_cmd_vel_topic(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulatedRobotConfig {
    /// Heading the simulated robot starts at (rad).
    #[serde(default)]
    pub initial_heading: f64,
    /// Yaw the simulated robot picks up per metre driven (rad/m).
    #[serde(default)]
    pub drift: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralBackend {
    #[default]
    Simulated,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeripheralConfig {
    #[serde(default)]
    pub backend: PeripheralBackend,
    /// Base URL of the photo service, e.g. `http://10.0.0.5:8000`.
    pub photo_url: Option<String>,
    /// Base URL of the antenna switch, e.g. `http://10.0.0.6`.
    pub antenna_url: Option<String>,
    /// Per-attempt timeout for antenna commands.
    #[serde(default = "default_request_timeout", deserialize_with = "duration::deserialize")]
    pub request_timeout: Duration,
    #[serde(default = "default_photo_timeout", deserialize_with = "duration::deserialize")]
    pub photo_timeout: Duration,
    #[serde(default = "default_ping_timeout", deserialize_with = "duration::deserialize")]
    pub ping_timeout: Duration,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_status_interval", deserialize_with = "duration::deserialize")]
    pub status_interval: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_photo_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_ping_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_status_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            backend: PeripheralBackend::default(),
            photo_url: None,
            antenna_url: None,
            request_timeout: default_request_timeout(),
            photo_timeout: default_photo_timeout(),
            ping_timeout: default_ping_timeout(),
            retry: RetryPolicy::default(),
            status_interval: default_status_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfBackend {
    #[default]
    Simulated,
    Process,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RfConfig {
    #[serde(default)]
    pub backend: RfBackend,
    /// Program printing one power vector per invocation.
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_rf_timeout", deserialize_with = "duration::deserialize")]
    pub timeout: Duration,
}

fn default_rf_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for RfConfig {
    fn default() -> Self {
        Self {
            backend: RfBackend::default(),
            command: None,
            args: Vec::new(),
            timeout: default_rf_timeout(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.capture.output_dir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(self.robot.control_rate_hz.is_finite() && self.robot.control_rate_hz > 0.0) {
            return invalid(format!(
                "robot.control_rate_hz must be positive (got {})",
                self.robot.control_rate_hz
            ));
        }
        for (name, value) in [
            ("heading.turn_speed", self.heading.turn_speed),
            ("heading.correction_speed", self.heading.correction_speed),
            ("heading.tolerance", self.heading.tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{} must be positive (got {})", name, value));
            }
        }
        self.scan
            .plan()
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("scan: {}", e)))?;
        if self.capture.antenna_sequence.is_empty() {
            return invalid("capture.antenna_sequence must not be empty".into());
        }
        if self.peripherals.retry.max_attempts == Some(0) {
            return invalid("peripherals.retry.max_attempts must be at least 1".into());
        }
        if self.peripherals.backend == PeripheralBackend::Http {
            if self.peripherals.photo_url.is_none() {
                return invalid("peripherals.photo_url is required for the http backend".into());
            }
            if self.peripherals.antenna_url.is_none() {
                return invalid("peripherals.antenna_url is required for the http backend".into());
            }
        }
        if self.rf.backend == RfBackend::Process && self.rf.command.is_none() {
            return invalid("rf.command is required for the process backend".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
robot:
  backend: ros
  control_rate_hz: 10
  orientation_timeout: 1500ms
  ros:
    odom_topic: /robot/odom
heading:
  tolerance: 0.05
scan:
  rows: 2
  columns: 3
  velocity: 0.1
peripherals:
  backend: http
  photo_url: http://10.0.0.5:8000
  antenna_url: http://10.0.0.6
  retry:
    max_attempts: 20
    backoff:
      kind: fixed
      delay: 250ms
capture:
  antenna_sequence: [0, 1, 2, 3, 4]
  settle: 100ms
  output_dir: /data/survey
rf:
  backend: process
  command: python3
  args: [signalpow.py, --once]
web:
  bind: 127.0.0.1:9000
  api_keys:
    - key: secret
      name: operator
      permissions: [run_scan, capture, send_antenna, stop]
"#;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_str("{}").unwrap();
        assert_eq!(config.robot.backend, RobotBackend::Simulated);
        assert_eq!(config.robot.ros.cmd_vel_topic, "/mobile_base/commands/velocity");
        assert_eq!(config.heading, HeadingConfig::default());
        assert_eq!(config.scan.rows, 8);
        assert_eq!(config.scan.columns, 76);
        assert_eq!(config.peripherals.request_timeout, Duration::from_secs(5));
        assert_eq!(config.peripherals.retry, RetryPolicy::default());
        let sequence: Vec<u8> = config.capture.antenna_sequence.iter().map(|a| a.index()).collect();
        assert_eq!(sequence, vec![0, 1, 3, 4]);
        assert_eq!(config.web.bind, "0.0.0.0:8080");
    }

    #[test]
    fn parses_full_file() {
        let config = Config::from_str(FULL).unwrap();
        assert_eq!(config.robot.backend, RobotBackend::Ros);
        assert_eq!(config.robot.orientation_timeout, Duration::from_millis(1500));
        assert_eq!(config.robot.ros.odom_topic, "/robot/odom");
        assert_eq!(config.heading.tolerance, 0.05);
        assert_eq!(config.heading.turn_speed, 0.25);
        assert_eq!(config.peripherals.retry.max_attempts, Some(20));
        assert_eq!(config.capture.antenna_sequence.len(), 5);
        assert_eq!(config.capture.settle, Duration::from_millis(100));
        assert_eq!(config.rf.args, vec!["signalpow.py", "--once"]);
        assert!(config.web.find_api_key("secret").is_some());
    }

    #[test]
    fn rejects_inconsistent_settings() {
        let cases = [
            "capture:\n  antenna_sequence: []\n",
            "heading:\n  tolerance: 0\n",
            "scan:\n  rows: 0\n",
            "robot:\n  control_rate_hz: -1\n",
            "peripherals:\n  backend: http\n",
            "rf:\n  backend: process\n",
            "peripherals:\n  retry:\n    max_attempts: 0\n",
        ];
        for yaml in cases {
            assert!(
                matches!(Config::from_str(yaml), Err(ConfigError::Invalid(_))),
                "accepted: {yaml}"
            );
        }
        assert!(matches!(
            Config::from_str("capture:\n  antenna_sequence: [7]\n"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
