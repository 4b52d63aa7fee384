// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Container runtime boundary.
//!
//! [`ContainerRuntime`] is the seam between the sandbox manager and the
//! actual container daemon. The production implementation drives the
//! `docker` CLI; tests substitute an in-memory fake.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::SandboxError;
use crate::sandbox::{ExecOutput, ExecStream, SANDBOX_VOLUME_MOUNT};

/// Operations the sandbox layer needs from a container daemon.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check daemon availability. Called once before the first sandbox is
    /// created; failure is fatal for the run.
    async fn ping(&self) -> Result<(), SandboxError>;

    /// Start a detached container and return its id. The volume, when
    /// given, is bind-mounted read-only at [`SANDBOX_VOLUME_MOUNT`].
    async fn start_container(
        &self,
        image: &str,
        volume_path: Option<&Path>,
        network: &str,
    ) -> Result<String, SandboxError>;

    /// Run a command to completion inside the container. Never fails:
    /// runtime-level errors come back as an [`ExecOutput`] with
    /// `exit_code = -1`.
    async fn exec_buffered(
        &self,
        container_id: &str,
        command: &str,
        timeout: Option<Duration>,
    ) -> ExecOutput;

    /// Spawn a command and return a live stream handle immediately.
    async fn exec_streaming(
        &self,
        container_id: &str,
        command: &str,
    ) -> Result<ExecStream, SandboxError>;

    /// Stop the container. A missing container is already stopped.
    async fn stop_container(&self, container_id: &str) -> Result<(), SandboxError>;

    /// Force-remove the container. A missing container is not an error.
    async fn remove_container(&self, container_id: &str) -> Result<(), SandboxError>;
}

/// Docker CLI runtime.
///
/// Shells out to `docker` rather than linking a daemon client: the CLI is
/// the stable interface across daemon versions and the sandbox needs only
/// run/exec/stop/rm.
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    fn classify_failure(stderr: &str, image: &str) -> SandboxError {
        let lower = stderr.to_lowercase();
        if lower.contains("cannot connect to the docker daemon")
            || lower.contains("is the docker daemon running")
        {
            return SandboxError::DaemonUnavailable {
                reason: stderr.trim().to_string(),
            };
        }
        if lower.contains("no such image")
            || lower.contains("pull access denied")
            || lower.contains("manifest unknown")
        {
            return SandboxError::ImageNotFound {
                image: image.to_string(),
            };
        }
        SandboxError::Runtime {
            reason: stderr.trim().to_string(),
        }
    }

    fn is_missing_container(stderr: &str) -> bool {
        stderr.to_lowercase().contains("no such container")
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn ping(&self) -> Result<(), SandboxError> {
        let output = Command::new(&self.binary)
            .args(["version", "--format", "{{.Server.Version}}"])
            .output()
            .await
            .map_err(|e| SandboxError::DaemonUnavailable {
                reason: format!("docker binary not runnable: {e}"),
            })?;
        if !output.status.success() {
            return Err(SandboxError::DaemonUnavailable {
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(
            "Docker daemon reachable (server {})",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    async fn start_container(
        &self,
        image: &str,
        volume_path: Option<&Path>,
        network: &str,
    ) -> Result<String, SandboxError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["run", "-d", "-t", "-i"]);
        cmd.arg(format!("--network={network}"));

        // Containers off the host network still need a route back to
        // locally hosted targets.
        if network != "host" {
            cmd.args(["--add-host", "host.docker.internal:host-gateway"]);
        }

        if let Some(volume) = volume_path {
            cmd.arg("-v");
            cmd.arg(format!(
                "{}:{}:ro",
                volume.display(),
                SANDBOX_VOLUME_MOUNT
            ));
        }

        cmd.arg(image);
        cmd.arg("/bin/bash");

        let output = cmd
            .output()
            .await
            .map_err(|e| SandboxError::DaemonUnavailable {
                reason: format!("docker binary not runnable: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::classify_failure(&stderr, image));
        }

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Started container {} from {}", container_id, image);
        Ok(container_id)
    }

    async fn exec_buffered(
        &self,
        container_id: &str,
        command: &str,
        timeout: Option<Duration>,
    ) -> ExecOutput {
        let started = Instant::now();
        let mut cmd = Command::new(&self.binary);
        cmd.args(["exec", container_id, "/bin/bash", "-c", command]);
        // The exec process must die with the dropped future on timeout
        cmd.kill_on_drop(true);

        let run = cmd.output();
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(io_result) => io_result,
                Err(_) => {
                    warn!(
                        "Command in container {} timed out after {:?}: {}",
                        container_id, limit, command
                    );
                    return ExecOutput::timeout(command, limit.as_secs());
                }
            },
            None => run.await,
        };

        match result {
            Ok(output) => ExecOutput {
                command: command.to_string(),
                exit_code: output.status.code().map(i64::from).unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                timed_out: false,
                duration_ms: started.elapsed().as_millis() as u64,
            },
            Err(e) => ExecOutput::failure(command, e, started.elapsed().as_millis() as u64),
        }
    }

    async fn exec_streaming(
        &self,
        container_id: &str,
        command: &str,
    ) -> Result<ExecStream, SandboxError> {
        let child = Command::new(&self.binary)
            .args(["exec", container_id, "/bin/bash", "-c", command])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::Runtime {
                reason: format!("failed to spawn streaming exec: {e}"),
            })?;

        Ok(ExecStream {
            command: command.to_string(),
            child,
        })
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), SandboxError> {
        let output = Command::new(&self.binary)
            .args(["stop", container_id])
            .output()
            .await
            .map_err(|e| SandboxError::Runtime {
                reason: format!("docker stop failed to run: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if Self::is_missing_container(&stderr) {
                return Ok(());
            }
            return Err(SandboxError::Runtime {
                reason: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), SandboxError> {
        let output = Command::new(&self.binary)
            .args(["rm", "-f", container_id])
            .output()
            .await
            .map_err(|e| SandboxError::Runtime {
                reason: format!("docker rm failed to run: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if Self::is_missing_container(&stderr) {
                return Ok(());
            }
            return Err(SandboxError::Runtime {
                reason: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemon_errors_are_classified_fatal() {
        let err = DockerCli::classify_failure(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock",
            "kali:latest",
        );
        assert!(matches!(err, SandboxError::DaemonUnavailable { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_image_is_not_fatal() {
        let err = DockerCli::classify_failure(
            "Unable to find image locally: No such image: nope:latest",
            "nope:latest",
        );
        assert!(matches!(err, SandboxError::ImageNotFound { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn missing_container_detection() {
        assert!(DockerCli::is_missing_container(
            "Error response from daemon: No such container: abc123"
        ));
        assert!(!DockerCli::is_missing_container("permission denied"));
    }
}
