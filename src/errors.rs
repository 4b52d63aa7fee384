// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Error Types
 * Production-ready error handling with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use thiserror::Error;
use uuid::Uuid;

use crate::sandbox::SandboxStatus;

/// Main engine error type with comprehensive error variants
#[derive(Error, Debug)]
pub enum EngineError {
    /// Sandbox lifecycle and runtime errors
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    /// Agent invoker (model call) errors
    #[error("Invoker error: {0}")]
    Invoker(#[from] InvokerError),

    /// Session context persistence errors
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// Cooperative interruption observed at a workflow checkpoint.
    /// This is a control-flow signal, not a fault; the workflow loop
    /// converts it to the `Interrupted` state and never leaks it further.
    #[error("Workflow interrupted {during}")]
    Interrupted { during: &'static str },

    /// Caller misuse (empty goal, bad target spec)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// General errors
    #[error("Engine error: {0}")]
    General(String),
}

/// Sandbox-specific errors with container state classification
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Sandbox {id} is not running (status: {status})")]
    NotRunning { id: Uuid, status: SandboxStatus },

    #[error("Sandbox {id} not found")]
    NotFound { id: Uuid },

    /// Container daemon unreachable. Fatal once a sandbox is required:
    /// the whole run cannot proceed without one.
    #[error("Container daemon unavailable: {reason}")]
    DaemonUnavailable { reason: String },

    #[error("Container image not found: {image}")]
    ImageNotFound { image: String },

    #[error("Container runtime error: {reason}")]
    Runtime { reason: String },
}

/// Agent invoker errors (model provider boundary)
#[derive(Error, Debug)]
pub enum InvokerError {
    #[error("Model API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Transport error reaching model provider: {0}")]
    Transport(String),

    #[error("Malformed model output: {reason}")]
    MalformedOutput { reason: String },

    #[error("Usage limit exceeded: {0}")]
    UsageLimitExceeded(String),
}

/// Context engine errors. File-append failures are swallowed by design;
/// these surface only for operations the caller explicitly requested.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Session directory error: {0}")]
    SessionDir(#[from] std::io::Error),
}

impl SandboxError {
    /// Daemon unavailability is fatal for the whole run; everything else
    /// is recoverable caller-level misuse or a per-command failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SandboxError::DaemonUnavailable { .. })
    }
}

impl InvokerError {
    /// Check if the error is retryable by the invoker's own retry policy
    pub fn is_retryable(&self) -> bool {
        match self {
            InvokerError::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 529),
            InvokerError::Transport(_) => true,
            InvokerError::MalformedOutput { .. } => false,
            InvokerError::UsageLimitExceeded(_) => false,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
