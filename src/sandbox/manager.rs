// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Sandbox lifecycle management.
//!
//! The manager owns the process-wide registry of live sandbox instances,
//! keyed by generated id and guarded by a single mutex. The registry lock
//! covers bookkeeping only; command execution happens with the lock
//! released, and concurrent execution against the same sandbox id must be
//! serialized by the caller.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::SandboxError;
use crate::sandbox::{
    ContainerRuntime, DockerCli, ExecOutcome, ExecOutput, SandboxInstance, SandboxStatus,
};

pub struct SandboxManager {
    runtime: Arc<dyn ContainerRuntime>,
    sandboxes: Mutex<HashMap<Uuid, SandboxInstance>>,
}

impl SandboxManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime,
            sandboxes: Mutex::new(HashMap::new()),
        }
    }

    /// Manager backed by the local Docker daemon via the CLI.
    pub fn with_docker() -> Self {
        Self::new(Arc::new(DockerCli::new()))
    }

    /// Verify the container daemon is reachable before any sandbox work.
    pub async fn preflight(&self) -> Result<(), SandboxError> {
        self.runtime.ping().await
    }

    /// Create and start a new sandbox. On failure the instance is never
    /// registered: the registry only ever holds containers that reached
    /// `running`.
    pub async fn create_sandbox(
        &self,
        image: &str,
        volume_path: Option<&Path>,
        network: &str,
    ) -> Result<Uuid, SandboxError> {
        let id = Uuid::new_v4();
        let mut instance = SandboxInstance::new(id, image);
        instance.status = SandboxStatus::Starting;

        match self.runtime.start_container(image, volume_path, network).await {
            Ok(container_id) => {
                instance.container_id = Some(container_id);
                instance.status = SandboxStatus::Running;
                info!("Sandbox {} running ({} on network {})", id, image, network);
                self.sandboxes.lock().await.insert(id, instance);
                Ok(id)
            }
            Err(e) => {
                instance.status = SandboxStatus::Error;
                warn!("Sandbox {} failed to start: {}", id, e);
                Err(e)
            }
        }
    }

    /// Execute a command in a running sandbox.
    ///
    /// Streaming mode returns a live handle immediately; buffered mode
    /// runs to completion. Runtime-level command failures (including a
    /// failed streaming spawn) are folded into a buffered result with
    /// `exit_code = -1`; this operation raises only for caller misuse
    /// (unknown id, sandbox not running).
    pub async fn execute(
        &self,
        id: Uuid,
        command: &str,
        streaming: bool,
        timeout: Option<Duration>,
    ) -> Result<ExecOutcome, SandboxError> {
        let container_id = {
            let mut sandboxes = self.sandboxes.lock().await;
            let instance = sandboxes
                .get_mut(&id)
                .ok_or(SandboxError::NotFound { id })?;
            if instance.status != SandboxStatus::Running {
                return Err(SandboxError::NotRunning {
                    id,
                    status: instance.status,
                });
            }
            instance.last_command = Some(command.to_string());
            // Running implies a started container
            instance.container_id.clone().ok_or(SandboxError::NotRunning {
                id,
                status: instance.status,
            })?
        };

        if streaming {
            match self.runtime.exec_streaming(&container_id, command).await {
                Ok(stream) => Ok(ExecOutcome::Streaming(stream)),
                Err(e) => Ok(ExecOutcome::Buffered(ExecOutput::failure(command, e, 0))),
            }
        } else {
            let output = self.runtime.exec_buffered(&container_id, command, timeout).await;
            Ok(ExecOutcome::Buffered(output))
        }
    }

    /// Stop a sandbox. Idempotent: an unknown id or already-stopped
    /// container is treated as already stopped, never an error.
    pub async fn stop(&self, id: Uuid) -> Result<(), SandboxError> {
        let mut sandboxes = self.sandboxes.lock().await;
        let Some(instance) = sandboxes.get_mut(&id) else {
            return Ok(());
        };
        if let Some(container_id) = instance.container_id.clone() {
            self.runtime.stop_container(&container_id).await?;
        }
        instance.status = SandboxStatus::Stopped;
        Ok(())
    }

    /// Remove a sandbox's container entirely. Idempotent like [`stop`];
    /// the only transition out of `error` is through here.
    ///
    /// [`stop`]: SandboxManager::stop
    pub async fn cleanup(&self, id: Uuid) -> Result<(), SandboxError> {
        let mut sandboxes = self.sandboxes.lock().await;
        let Some(instance) = sandboxes.get_mut(&id) else {
            return Ok(());
        };
        if let Some(container_id) = instance.container_id.take() {
            self.runtime.remove_container(&container_id).await?;
        }
        instance.status = SandboxStatus::Stopped;
        Ok(())
    }

    /// Stop every managed sandbox. Used on shutdown; failures are logged
    /// and skipped so one stuck container cannot block teardown.
    pub async fn stop_all(&self) {
        let ids: Vec<Uuid> = self.sandboxes.lock().await.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.stop(id).await {
                warn!("Failed to stop sandbox {}: {}", id, e);
            }
        }
    }

    /// Snapshot of a tracked instance.
    pub async fn get(&self, id: Uuid) -> Option<SandboxInstance> {
        self.sandboxes.lock().await.get(&id).cloned()
    }

    /// Snapshot of every tracked instance.
    pub async fn instances(&self) -> Vec<SandboxInstance> {
        self.sandboxes.lock().await.values().cloned().collect()
    }

    pub async fn status(&self, id: Uuid) -> Option<SandboxStatus> {
        self.sandboxes.lock().await.get(&id).map(|i| i.status)
    }
}

/// A session's reference to its sandbox: the shared manager plus the id
/// of the one instance this session exclusively uses.
#[derive(Clone)]
pub struct SandboxHandle {
    pub manager: Arc<SandboxManager>,
    pub id: Uuid,
}

impl SandboxHandle {
    pub fn new(manager: Arc<SandboxManager>, id: Uuid) -> Self {
        Self { manager, id }
    }

    pub async fn execute(
        &self,
        command: &str,
        streaming: bool,
        timeout: Option<Duration>,
    ) -> Result<ExecOutcome, SandboxError> {
        self.manager.execute(self.id, command, streaming, timeout).await
    }
}
