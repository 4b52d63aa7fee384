// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session state and cooperative interruption.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Workflow state machine. `Done`, `Interrupted` and `Failed` are
/// terminal; `AwaitingApproval` only occurs between an execution that
/// returned a deferred request and its re-invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Planning,
    Routing,
    Executing,
    AwaitingApproval,
    Judging,
    Done,
    Interrupted,
    Failed,
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowState::Planning => "planning",
            WorkflowState::Routing => "routing",
            WorkflowState::Executing => "executing",
            WorkflowState::AwaitingApproval => "awaiting_approval",
            WorkflowState::Judging => "judging",
            WorkflowState::Done => "done",
            WorkflowState::Interrupted => "interrupted",
            WorkflowState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Cross-task interruption signal. Cloneable and safe to trigger from
/// another task or thread while the workflow loop runs; the loop observes
/// it cooperatively at step boundaries, never preemptively.
#[derive(Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption. Idempotent.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Re-arm for a new prompt in the same session.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// One end-to-end run of the workflow against one target for one goal.
pub struct Session {
    pub id: Uuid,
    pub target: String,
    pub state: WorkflowState,
    pub goal_achieved: bool,
    interrupt: InterruptHandle,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            target: String::new(),
            state: WorkflowState::Planning,
            goal_achieved: false,
            interrupt: InterruptHandle::new(),
        }
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_interrupted()
    }

    /// Clear the per-prompt flags for conversation continuity. The
    /// session id and accumulated context are untouched.
    pub fn reset(&mut self) {
        self.goal_achieved = false;
        self.interrupt.clear();
        self.state = WorkflowState::Planning;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_is_idempotent_and_visible_across_clones() {
        let handle = InterruptHandle::new();
        let clone = handle.clone();
        handle.interrupt();
        handle.interrupt();
        assert!(clone.is_interrupted());
    }

    #[test]
    fn reset_clears_flags_but_keeps_id() {
        let mut session = Session::new(Uuid::new_v4());
        let id = session.id;
        session.goal_achieved = true;
        session.interrupt_handle().interrupt();
        session.state = WorkflowState::Done;

        session.reset();
        assert!(!session.goal_achieved);
        assert!(!session.is_interrupted());
        assert_eq!(session.state, WorkflowState::Planning);
        assert_eq!(session.id, id);
    }
}
