// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Built-in capabilities and their dependency bundles.
//!
//! Each capability consumes a small, fixed dependency struct built by the
//! orchestrator immediately before invocation. The bundles are kept
//! structurally distinct on purpose: no shared base, each names exactly
//! what its capability touches.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::invoker::{
    ActRequest, AgentInvoker, CapabilityOutcome, CapabilityReport, DeferredExchange, UsageLimits,
};
use crate::errors::{EngineError, EngineResult};
use crate::protocol::Requester;
use crate::retrieval::KnowledgeRetriever;
use crate::sandbox::{SandboxHandle, ShellRunner};

/// Toolbox the orchestrator assembles freshly for every Execute step.
/// Capability factories pick the pieces their own deps struct needs.
pub struct CapabilityDeps {
    pub invoker: Arc<dyn AgentInvoker>,
    pub retriever: Arc<dyn KnowledgeRetriever>,
    pub requester: Arc<Requester>,
    pub sandbox: Option<SandboxHandle>,
    pub target: String,
    pub session_id: Uuid,
    pub exec_timeout: Duration,
    pub proxy: bool,
}

/// Result of one capability invocation: the outcome plus any tool
/// responses whose text belongs in the workflow context.
pub struct CapabilityRun {
    pub outcome: CapabilityOutcome,
    pub tool_responses: Vec<(String, String)>,
}

impl CapabilityRun {
    fn completed(report: CapabilityReport) -> Self {
        Self {
            outcome: CapabilityOutcome::Completed(report),
            tool_responses: Vec::new(),
        }
    }
}

/// A named, registered unit of execution the router can select.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &'static str;

    /// Invoke the capability. `approval` is set only on re-invocation
    /// after a deferred approval round.
    async fn run(
        &mut self,
        prompt: Option<&str>,
        message_history: &str,
        approval: Option<DeferredExchange>,
        usage_limits: UsageLimits,
    ) -> EngineResult<CapabilityRun>;
}

// ---------------------------------------------------------------------------
// webapp_recon
// ---------------------------------------------------------------------------

/// Dependencies for web application reconnaissance.
pub struct WebappReconDeps {
    pub invoker: Arc<dyn AgentInvoker>,
    pub retriever: Arc<dyn KnowledgeRetriever>,
    pub requester: Arc<Requester>,
    pub target: String,
    pub session_id: Uuid,
}

/// Probes the target with raw HTTP payloads. Payload delivery is
/// side-effecting and therefore approval-gated: the first invocation may
/// return a deferred request; after the human decision the capability is
/// re-invoked with the exchange, delivers only the approved calls, and
/// reports the skipped ones back so the agent can adapt.
pub struct WebappReconCapability {
    deps: WebappReconDeps,
    proxy: bool,
}

impl WebappReconCapability {
    pub fn new(deps: WebappReconDeps, proxy: bool) -> Self {
        Self { deps, proxy }
    }

    fn instructions(&self) -> String {
        format!(
            "You are the web application reconnaissance capability of a penetration-testing \
             workflow. Target: {target}. You analyze the accumulated context and probe the \
             target with raw HTTP/1.1 requests. To deliver a payload, request approval for a \
             send_payload call with arguments {{\"target_host\": \"host:port\", \
             \"raw_request\": \"...\", \"proxy\": true|false}}. Requests must carry a Host \
             header and a path starting with '/'.",
            target = self.deps.target
        )
    }

    /// Deliver approved payloads; record skips for everything else.
    async fn settle_approvals(&self, exchange: &DeferredExchange) -> Vec<(String, String)> {
        let mut tool_responses = Vec::new();
        for call in &exchange.requests.approvals {
            if call.tool_name != "send_payload" {
                warn!("Unknown deferred tool {}, skipping", call.tool_name);
                continue;
            }
            if !exchange.results.approved(&call.call_id) {
                tool_responses.push((
                    "send_payload".to_string(),
                    "Payload delivery was not approved; request not sent.".to_string(),
                ));
                continue;
            }

            let target_host = call.arguments["target_host"]
                .as_str()
                .unwrap_or(&self.deps.target)
                .to_string();
            let raw_request = call.arguments["raw_request"].as_str().unwrap_or("").to_string();
            let proxy = call.arguments["proxy"].as_bool().unwrap_or(self.proxy);

            let response = self
                .deps
                .requester
                .send_payload(&target_host, &raw_request, proxy)
                .await;
            tool_responses.push(("send_payload".to_string(), response));
        }
        tool_responses
    }
}

#[async_trait]
impl Capability for WebappReconCapability {
    fn name(&self) -> &'static str {
        "webapp_recon"
    }

    async fn run(
        &mut self,
        prompt: Option<&str>,
        message_history: &str,
        approval: Option<DeferredExchange>,
        usage_limits: UsageLimits,
    ) -> EngineResult<CapabilityRun> {
        let (history, deferred_results, tool_responses) = match &approval {
            Some(exchange) => {
                let tool_responses = self.settle_approvals(exchange).await;
                let mut history = message_history.to_string();
                for (tool, response) in &tool_responses {
                    history.push_str(&format!("\n[Tool response {tool}]\n{response}\n"));
                }
                (history, Some(exchange.results.clone()), tool_responses)
            }
            None => (message_history.to_string(), None, Vec::new()),
        };

        let outcome = self
            .deps
            .invoker
            .act(ActRequest {
                capability: self.name().to_string(),
                instructions: self.instructions(),
                prompt: prompt.map(str::to_string),
                message_history: history,
                deferred_results,
                usage_limits,
            })
            .await
            .map_err(EngineError::from)?;

        Ok(CapabilityRun {
            outcome,
            tool_responses,
        })
    }
}

// ---------------------------------------------------------------------------
// recon_shell
// ---------------------------------------------------------------------------

/// Dependencies for sandboxed shell reconnaissance.
pub struct ReconShellDeps {
    pub invoker: Arc<dyn AgentInvoker>,
    pub sandbox: Option<SandboxHandle>,
    pub session_id: Uuid,
    pub exec_timeout: Duration,
}

/// Runs reconnaissance commands inside the session's sandbox. The model
/// proposes a command (`state == "run_command"`), the runner executes it
/// buffered, and a second invocation folds the captured output into the
/// final report.
pub struct ReconShellCapability {
    deps: ReconShellDeps,
}

impl ReconShellCapability {
    pub fn new(deps: ReconShellDeps) -> Self {
        Self { deps }
    }

    fn instructions(&self) -> &'static str {
        "You are the shell reconnaissance capability of a penetration-testing workflow. \
         You operate inside an isolated Kali container. To run a command, report with \
         state \"run_command\" and the command line as raw_response. Otherwise report \
         your findings with state \"done\"."
    }
}

#[async_trait]
impl Capability for ReconShellCapability {
    fn name(&self) -> &'static str {
        "recon_shell"
    }

    async fn run(
        &mut self,
        prompt: Option<&str>,
        message_history: &str,
        _approval: Option<DeferredExchange>,
        usage_limits: UsageLimits,
    ) -> EngineResult<CapabilityRun> {
        let Some(handle) = self.deps.sandbox.clone() else {
            // Recoverable: the agent learns the sandbox is unavailable
            return Ok(CapabilityRun::completed(CapabilityReport {
                reasoning: "No sandbox is attached to this session.".to_string(),
                state: "sandbox_unavailable".to_string(),
                raw_response: String::new(),
            }));
        };

        let first = self
            .deps
            .invoker
            .act(ActRequest {
                capability: self.name().to_string(),
                instructions: self.instructions().to_string(),
                prompt: prompt.map(str::to_string),
                message_history: message_history.to_string(),
                deferred_results: None,
                usage_limits,
            })
            .await
            .map_err(EngineError::from)?;

        let report = match first {
            CapabilityOutcome::Completed(report) => report,
            deferred @ CapabilityOutcome::Deferred(_) => {
                return Ok(CapabilityRun {
                    outcome: deferred,
                    tool_responses: Vec::new(),
                })
            }
        };

        if report.state != "run_command" || report.raw_response.trim().is_empty() {
            return Ok(CapabilityRun::completed(report));
        }

        let command = report.raw_response.trim().to_string();
        let mut shell = ShellRunner::new(self.deps.session_id.to_string(), handle);
        let output = shell
            .run_command(&command, Some(self.deps.exec_timeout))
            .await?;
        info!(
            "Sandbox command finished (exit {}, timed_out={})",
            output.exit_code, output.timed_out
        );
        let rendered = shell.render_log();

        let follow_up = self
            .deps
            .invoker
            .act(ActRequest {
                capability: self.name().to_string(),
                instructions: self.instructions().to_string(),
                prompt: None,
                message_history: format!(
                    "{message_history}\n[Tool response sandboxed_shell]\n{rendered}"
                ),
                deferred_results: None,
                usage_limits,
            })
            .await
            .map_err(EngineError::from)?;

        let final_report = match follow_up {
            CapabilityOutcome::Completed(report) => report,
            CapabilityOutcome::Deferred(_) => {
                warn!("recon_shell requested approval on follow-up; treating as done");
                CapabilityReport {
                    reasoning: "Command executed.".to_string(),
                    state: "done".to_string(),
                    raw_response: rendered.clone(),
                }
            }
        };

        Ok(CapabilityRun {
            outcome: CapabilityOutcome::Completed(final_report),
            tool_responses: vec![("sandboxed_shell".to_string(), rendered)],
        })
    }
}

// ---------------------------------------------------------------------------
// knowledge_search
// ---------------------------------------------------------------------------

/// Dependencies for retrieval lookups.
pub struct KnowledgeSearchDeps {
    pub retriever: Arc<dyn KnowledgeRetriever>,
    pub target: String,
    pub session_id: Uuid,
}

/// Looks up indexed target/source material for the current question. No
/// model call: retrieval output feeds the next routing decision directly.
pub struct KnowledgeSearchCapability {
    deps: KnowledgeSearchDeps,
}

impl KnowledgeSearchCapability {
    pub fn new(deps: KnowledgeSearchDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Capability for KnowledgeSearchCapability {
    fn name(&self) -> &'static str {
        "knowledge_search"
    }

    async fn run(
        &mut self,
        prompt: Option<&str>,
        message_history: &str,
        _approval: Option<DeferredExchange>,
        _usage_limits: UsageLimits,
    ) -> EngineResult<CapabilityRun> {
        let query = prompt.unwrap_or(message_history);
        let chunks = self
            .deps
            .retriever
            .search(query, self.deps.session_id, 8)
            .await?;

        let raw_response = if chunks.is_empty() {
            format!("No indexed material found for {}.", self.deps.target)
        } else {
            chunks
                .iter()
                .map(|c| format!("--- {} (score {:.2})\n{}", c.source, c.score, c.content))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(CapabilityRun::completed(CapabilityReport {
            reasoning: format!("Retrieved {} chunk(s) from the knowledge index.", chunks.len()),
            state: "done".to_string(),
            raw_response,
        }))
    }
}

// ---------------------------------------------------------------------------
// router fallback
// ---------------------------------------------------------------------------

/// No-op fallback used when the routed capability has no registered
/// handler. Never raises: the miss is already recorded in the context and
/// the next routing round gets a chance to recover.
pub struct RouterFallbackCapability;

#[async_trait]
impl Capability for RouterFallbackCapability {
    fn name(&self) -> &'static str {
        "router"
    }

    async fn run(
        &mut self,
        _prompt: Option<&str>,
        _message_history: &str,
        _approval: Option<DeferredExchange>,
        _usage_limits: UsageLimits,
    ) -> EngineResult<CapabilityRun> {
        Ok(CapabilityRun::completed(CapabilityReport {
            reasoning: "Routed capability is not registered; no action taken.".to_string(),
            state: "noop".to_string(),
            raw_response: String::new(),
        }))
    }
}
