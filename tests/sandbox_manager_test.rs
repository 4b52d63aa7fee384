// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Haukka - Sandbox Manager Tests
 * Lifecycle, idempotent teardown, structured command failures
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use haukka_engine::errors::SandboxError;
use haukka_engine::sandbox::{
    ContainerRuntime, ExecOutcome, ExecOutput, ExecStream, SandboxManager, SandboxStatus,
};

/// In-memory runtime standing in for the container daemon.
#[derive(Default)]
struct FakeRuntime {
    fail_start: bool,
    stop_calls: AtomicU32,
    remove_calls: AtomicU32,
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), SandboxError> {
        Ok(())
    }

    async fn start_container(
        &self,
        image: &str,
        _volume_path: Option<&Path>,
        _network: &str,
    ) -> Result<String, SandboxError> {
        if self.fail_start {
            return Err(SandboxError::Runtime {
                reason: format!("cannot start {image}"),
            });
        }
        Ok("fake-container-1".to_string())
    }

    async fn exec_buffered(
        &self,
        _container_id: &str,
        command: &str,
        _timeout: Option<Duration>,
    ) -> ExecOutput {
        ExecOutput {
            command: command.to_string(),
            exit_code: 0,
            stdout: "fake output\n".to_string(),
            stderr: String::new(),
            timed_out: false,
            duration_ms: 1,
        }
    }

    async fn exec_streaming(
        &self,
        _container_id: &str,
        _command: &str,
    ) -> Result<ExecStream, SandboxError> {
        // The fake has no real child process to hand out
        Err(SandboxError::Runtime {
            reason: "streaming unsupported by fake runtime".to_string(),
        })
    }

    async fn stop_container(&self, _container_id: &str) -> Result<(), SandboxError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_container(&self, _container_id: &str) -> Result<(), SandboxError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn manager_with(runtime: FakeRuntime) -> (Arc<FakeRuntime>, SandboxManager) {
    let runtime = Arc::new(runtime);
    let manager = SandboxManager::new(runtime.clone());
    (runtime, manager)
}

#[tokio::test]
async fn create_registers_running_instance() {
    let (_runtime, manager) = manager_with(FakeRuntime::default());
    let id = manager
        .create_sandbox("kali:latest", None, "host")
        .await
        .unwrap();

    let instance = manager.get(id).await.unwrap();
    assert_eq!(instance.status, SandboxStatus::Running);
    assert_eq!(instance.container_id.as_deref(), Some("fake-container-1"));
    assert_eq!(instance.image, "kali:latest");
}

#[tokio::test]
async fn failed_start_leaves_no_half_registered_instance() {
    let (_runtime, manager) = manager_with(FakeRuntime {
        fail_start: true,
        ..FakeRuntime::default()
    });
    let result = manager.create_sandbox("kali:latest", None, "host").await;
    assert!(result.is_err());
    assert!(manager.instances().await.is_empty());
}

#[tokio::test]
async fn execute_records_last_command() {
    let (_runtime, manager) = manager_with(FakeRuntime::default());
    let id = manager.create_sandbox("kali:latest", None, "host").await.unwrap();

    let outcome = manager.execute(id, "id", false, None).await.unwrap();
    match outcome {
        ExecOutcome::Buffered(output) => {
            assert_eq!(output.exit_code, 0);
            assert_eq!(output.stdout, "fake output\n");
            assert!(!output.timed_out);
        }
        ExecOutcome::Streaming(_) => panic!("buffered execution expected"),
    }
    assert_eq!(
        manager.get(id).await.unwrap().last_command.as_deref(),
        Some("id")
    );
}

#[tokio::test]
async fn streaming_spawn_failure_becomes_structured_result() {
    let (_runtime, manager) = manager_with(FakeRuntime::default());
    let id = manager.create_sandbox("kali:latest", None, "host").await.unwrap();

    let outcome = manager.execute(id, "tail -f /var/log", true, None).await.unwrap();
    match outcome {
        ExecOutcome::Buffered(output) => {
            assert_eq!(output.exit_code, -1);
            assert!(output.stderr.contains("streaming unsupported"));
        }
        ExecOutcome::Streaming(_) => panic!("fake runtime cannot stream"),
    }
}

#[tokio::test]
async fn execute_on_unknown_id_is_not_found() {
    let (_runtime, manager) = manager_with(FakeRuntime::default());
    let result = manager.execute(Uuid::new_v4(), "id", false, None).await;
    assert!(matches!(result, Err(SandboxError::NotFound { .. })));
}

#[tokio::test]
async fn execute_after_stop_is_not_running() {
    let (_runtime, manager) = manager_with(FakeRuntime::default());
    let id = manager.create_sandbox("kali:latest", None, "host").await.unwrap();
    manager.stop(id).await.unwrap();

    let result = manager.execute(id, "id", false, None).await;
    match result {
        Err(SandboxError::NotRunning { status, .. }) => {
            assert_eq!(status, SandboxStatus::Stopped);
        }
        other => panic!("expected NotRunning, got {other:?}"),
    }
}

#[tokio::test]
async fn stop_and_cleanup_are_idempotent() {
    let (runtime, manager) = manager_with(FakeRuntime::default());
    let id = manager.create_sandbox("kali:latest", None, "host").await.unwrap();

    manager.stop(id).await.unwrap();
    manager.stop(id).await.unwrap();
    assert_eq!(manager.status(id).await, Some(SandboxStatus::Stopped));

    manager.cleanup(id).await.unwrap();
    manager.cleanup(id).await.unwrap();
    assert_eq!(manager.status(id).await, Some(SandboxStatus::Stopped));
    assert!(manager.get(id).await.unwrap().container_id.is_none());

    // The container was removed exactly once: the second cleanup had
    // nothing left to remove
    assert_eq!(runtime.remove_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn teardown_of_unknown_id_never_raises() {
    let (_runtime, manager) = manager_with(FakeRuntime::default());
    let ghost = Uuid::new_v4();
    manager.stop(ghost).await.unwrap();
    manager.cleanup(ghost).await.unwrap();
    assert!(manager.get(ghost).await.is_none());
}

#[tokio::test]
async fn stop_all_covers_every_instance() {
    let (runtime, manager) = manager_with(FakeRuntime::default());
    let first = manager.create_sandbox("kali:latest", None, "host").await.unwrap();
    let second = manager.create_sandbox("kali:latest", None, "host").await.unwrap();

    manager.stop_all().await;
    assert_eq!(manager.status(first).await, Some(SandboxStatus::Stopped));
    assert_eq!(manager.status(second).await, Some(SandboxStatus::Stopped));
    assert_eq!(runtime.stop_calls.load(Ordering::SeqCst), 2);
}
