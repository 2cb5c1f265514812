//! Best-effort start of the Tika container through `docker compose`.
//!
//! Only used when [`crate::config::LaunchMode::DockerCompose`] is selected.
//! A failure here is reported to the caller, which logs it and goes on
//! polling: the server may well be running outside of compose.

use crate::error::TikaError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, info};

/// Grace period after `docker compose up -d` before polling starts.
const SETTLE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ComposeLauncher {
    service: String,
    project_dir: Option<PathBuf>,
    settle: Duration,
}

impl ComposeLauncher {
    pub fn new(service: impl Into<String>, project_dir: Option<PathBuf>) -> Self {
        Self {
            service: service.into(),
            project_dir,
            settle: SETTLE_DELAY,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn compose(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("docker");
        cmd.arg("compose").args(args);
        if let Some(ref dir) = self.project_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Start the service unless `docker compose ps` already lists it.
    pub async fn launch(&self) -> Result<(), TikaError> {
        let ps = self
            .compose(&["ps", "-q", self.service.as_str()])
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| TikaError::LaunchFailed(format!("docker compose ps: {e}")))?;

        if !String::from_utf8_lossy(&ps.stdout).trim().is_empty() {
            debug!("Container '{}' already running", self.service);
            return Ok(());
        }

        info!("Starting Tika container '{}'...", self.service);
        let status = self
            .compose(&["up", "-d"])
            .status()
            .await
            .map_err(|e| TikaError::LaunchFailed(format!("docker compose up: {e}")))?;
        if !status.success() {
            return Err(TikaError::LaunchFailed(format!(
                "docker compose up exited with {status}"
            )));
        }

        sleep(self.settle).await;
        Ok(())
    }
}
