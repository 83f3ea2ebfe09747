use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::error::RfError;
use super::PowerSource;

/// Runs the receive flow graph as a child process once per reading.
///
/// The process is expected to start the radio, let the averaging settle,
/// print one power vector to stdout and exit. Values may be separated by
/// whitespace or commas and optionally wrapped in brackets.
pub struct ProcessPowerSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessPowerSource {
    pub fn new(program: String, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
        }
    }
}

#[async_trait]
impl PowerSource for ProcessPowerSource {
    async fn current_power_vector(&mut self) -> Result<Vec<f32>, RfError> {
        log::debug!("Executing RF pipeline: {} {:?}", self.program, self.args);

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RfError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(RfError::Pipeline {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_vector(&String::from_utf8_lossy(&output.stdout))
    }
}

pub(super) fn parse_vector(text: &str) -> Result<Vec<f32>, RfError> {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == '[' || c == ']')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f32>().map_err(|_| RfError::Parse(s.to_string())))
        .collect()
}
