// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Isolated command-execution sandboxes backed by a container runtime.
//!
//! One [`SandboxInstance`] is owned by one session; the [`SandboxManager`]
//! tracks all live instances in a process-wide registry. Commands run
//! either buffered (complete output) or streaming (live handle), and a
//! failed command always comes back as a structured result, never as a
//! raised error.

pub mod manager;
pub mod runtime;
pub mod shell;

pub use manager::{SandboxHandle, SandboxManager};
pub use runtime::{ContainerRuntime, DockerCli};
pub use shell::ShellRunner;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Path inside the container where the optional volume is mounted
pub const SANDBOX_VOLUME_MOUNT: &str = "/challenge";

/// Lifecycle states of a sandbox container.
///
/// Transitions are monotonic (`created → starting → running → stopped`)
/// except that `running → stopped` instances may be observed again after
/// a restart of the same container id. `running → error` marks an
/// unrecoverable runtime failure; only `cleanup` leaves `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxStatus {
    Created,
    Starting,
    Running,
    Stopped,
    Error,
}

impl std::fmt::Display for SandboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SandboxStatus::Created => "created",
            SandboxStatus::Starting => "starting",
            SandboxStatus::Running => "running",
            SandboxStatus::Stopped => "stopped",
            SandboxStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A tracked sandbox container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxInstance {
    pub id: Uuid,
    pub image: String,
    /// None until the container has been started
    pub container_id: Option<String>,
    pub status: SandboxStatus,
    pub last_command: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SandboxInstance {
    pub fn new(id: Uuid, image: &str) -> Self {
        Self {
            id,
            image: image.to_string(),
            container_id: None,
            status: SandboxStatus::Created,
            last_command: None,
            created_at: Utc::now(),
        }
    }
}

/// Completed (buffered) command execution result. Runtime failures are
/// folded into this shape with `exit_code = -1` so callers can always
/// distinguish "the target command failed" from "the orchestration
/// failed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutput {
    pub command: String,
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl ExecOutput {
    /// Fold a runtime-level failure into a structured result
    pub fn failure(command: &str, reason: impl std::fmt::Display, duration_ms: u64) -> Self {
        Self {
            command: command.to_string(),
            exit_code: -1,
            stdout: String::new(),
            stderr: format!("Execution error: {reason}"),
            timed_out: false,
            duration_ms,
        }
    }

    pub fn timeout(command: &str, timeout_secs: u64) -> Self {
        Self {
            command: command.to_string(),
            exit_code: -1,
            stdout: String::new(),
            stderr: format!("Command timed out after {timeout_secs} seconds"),
            timed_out: true,
            duration_ms: timeout_secs * 1000,
        }
    }
}

/// Live handle for a streaming command. The child's stdout/stderr pipes
/// are read directly by the caller; dropping the handle kills the
/// in-container exec process.
#[derive(Debug)]
pub struct ExecStream {
    pub command: String,
    pub child: tokio::process::Child,
}

/// Result of `execute`: either a completed buffered output or a live
/// stream handle for long-lived commands.
#[derive(Debug)]
pub enum ExecOutcome {
    Buffered(ExecOutput),
    Streaming(ExecStream),
}
