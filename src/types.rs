// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Core data structures shared across the engine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a planned task. Tasks are created `pending` in a
/// batch during planning and mutated only by the execution step that
/// handles them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Failed,
    Success,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Failed => "failed",
            TaskStatus::Success => "success",
        }
    }
}

/// A single unit of work produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// What the task aims to accomplish
    pub goal: String,
    pub status: TaskStatus,
    /// Result or output produced by the task
    #[serde(default)]
    pub output: String,
}

impl Task {
    pub fn pending(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            status: TaskStatus::Pending,
            output: String::new(),
        }
    }
}

/// One shell command execution with its captured streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmdLog {
    /// Shell stdin (the command as typed)
    pub stdin: String,
    /// Shell stdout
    pub stdout: String,
    /// Shell stderr
    pub stderr: String,
}

/// How the judge should frame its verdict. The defaults mirror a canary
/// validation: anything that looks like a verified vulnerability or
/// undefined behavior counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationGoal {
    pub validation_type: String,
    pub validation_format: String,
}

impl Default for ValidationGoal {
    fn default() -> Self {
        Self {
            validation_type: "canary".to_string(),
            validation_format: "What looks more likely a vulnerability or undefined behavior \
                 that is verified with a tool."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_pending_starts_empty() {
        let task = Task::pending("enumerate endpoints");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.output.is_empty());
    }

    #[test]
    fn task_status_serializes_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
