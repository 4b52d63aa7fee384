// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Agent invoker contract: the opaque decision-making capability.
//!
//! The orchestrator depends only on this trait: a prompt plus
//! dependencies in, a typed structured output (or a deferred approval
//! request) out. Which model provider sits behind it is irrelevant to
//! the workflow; retries, if any, belong to the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::InvokerError;
use crate::types::{Task, ValidationGoal};

/// A registered capability as presented to the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDescription {
    pub name: String,
    pub description: String,
}

/// Caps on a single invocation. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageLimits {
    pub request_limit: Option<u32>,
    pub total_tokens_limit: Option<u64>,
}

/// Planner output: the ordered task batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerOutput {
    pub tasks: Vec<Task>,
}

/// Router output: which capability runs next, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterOutput {
    pub reasoning: String,
    pub next_capability: String,
}

/// Judge output: whether the goal is achieved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeOutput {
    pub reasoning: String,
    pub goal_achieved: bool,
    pub solution: String,
}

/// A completed capability invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub reasoning: String,
    pub state: String,
    pub raw_response: String,
}

/// One side-effecting tool call awaiting human approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// A capability's proposal: these calls need approval before their side
/// effects run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferredToolRequests {
    pub approvals: Vec<DeferredToolCall>,
}

/// Per-call-id approval decisions. A call absent from the map counts as
/// not approved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferredToolResults {
    pub approvals: HashMap<String, bool>,
}

impl DeferredToolResults {
    pub fn approved(&self, call_id: &str) -> bool {
        self.approvals.get(call_id).copied().unwrap_or(false)
    }

    /// Blanket decision over a request batch.
    pub fn decide_all(requests: &DeferredToolRequests, approve: bool) -> Self {
        let approvals = requests
            .approvals
            .iter()
            .map(|call| (call.call_id.clone(), approve))
            .collect();
        Self { approvals }
    }
}

/// What a capability-level invocation produced.
#[derive(Debug, Clone)]
pub enum CapabilityOutcome {
    Completed(CapabilityReport),
    Deferred(DeferredToolRequests),
}

/// A completed approval round: the original requests paired with the
/// per-call decisions, handed back to the capability for re-invocation.
#[derive(Debug, Clone)]
pub struct DeferredExchange {
    pub requests: DeferredToolRequests,
    pub results: DeferredToolResults,
}

/// Planning request: goal, target, and the capabilities available.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub goal: String,
    pub target: String,
    pub capabilities: Vec<CapabilityDescription>,
    pub usage_limits: UsageLimits,
}

/// Routing request: accumulated context plus the capability list.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub prompt: String,
    pub capabilities: Vec<CapabilityDescription>,
    pub usage_limits: UsageLimits,
}

/// Judging request: the full accumulated context.
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    pub context: String,
    pub validation: ValidationGoal,
    pub usage_limits: UsageLimits,
}

/// Capability-level request. `deferred_results` carries approval
/// decisions when a capability is re-invoked after the approval gate.
#[derive(Debug, Clone)]
pub struct ActRequest {
    pub capability: String,
    pub instructions: String,
    pub prompt: Option<String>,
    pub message_history: String,
    pub deferred_results: Option<DeferredToolResults>,
    pub usage_limits: UsageLimits,
}

/// The opaque decision-maker behind every workflow step.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn plan(&self, request: PlanRequest) -> Result<PlannerOutput, InvokerError>;

    async fn route(&self, request: RouteRequest) -> Result<RouterOutput, InvokerError>;

    async fn judge(&self, request: JudgeRequest) -> Result<JudgeOutput, InvokerError>;

    /// Capability-level invocation; may return a deferred approval
    /// request instead of a completed report.
    async fn act(&self, request: ActRequest) -> Result<CapabilityOutcome, InvokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_call_id_counts_as_denied() {
        let results = DeferredToolResults::default();
        assert!(!results.approved("tool_1"));
    }

    #[test]
    fn decide_all_covers_every_call() {
        let requests = DeferredToolRequests {
            approvals: vec![
                DeferredToolCall {
                    call_id: "a".into(),
                    tool_name: "send_payload".into(),
                    arguments: serde_json::json!({}),
                },
                DeferredToolCall {
                    call_id: "b".into(),
                    tool_name: "send_payload".into(),
                    arguments: serde_json::json!({}),
                },
            ],
        };
        let results = DeferredToolResults::decide_all(&requests, true);
        assert!(results.approved("a"));
        assert!(results.approved("b"));
    }
}
