// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Workflow orchestration.
//!
//! The resumable, interruptible, human-gated state machine driving the
//! plan → route → execute → judge cycle for one session.

pub mod runner;
pub mod session;

pub use runner::{ApprovalCallback, WorkflowOutcome, WorkflowRunner, MAX_ITERATION};
pub use session::{InterruptHandle, Session, WorkflowState};
