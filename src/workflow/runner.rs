// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! The workflow runner: plan → route → execute → judge, bounded by an
//! iteration budget and interruptible at every step boundary.
//!
//! Interruption is cooperative: a shared flag checked before and after
//! each step. In-flight model, sandbox or socket calls are never aborted
//! forcibly: a half-completed sandbox command is worse than a slightly
//! delayed stop.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::capabilities::CapabilityDeps;
use crate::agents::invoker::{
    AgentInvoker, CapabilityOutcome, DeferredExchange, DeferredToolRequests, DeferredToolResults,
    JudgeOutput, JudgeRequest, PlanRequest, RouteRequest, RouterOutput, UsageLimits,
};
use crate::agents::registry::{CapabilityRegistry, FALLBACK_CAPABILITY};
use crate::config::EngineConfig;
use crate::context::ContextEngine;
use crate::errors::{EngineError, EngineResult, SandboxError};
use crate::protocol::Requester;
use crate::retrieval::KnowledgeRetriever;
use crate::sandbox::{SandboxHandle, SandboxManager};
use crate::types::{Task, ValidationGoal};
use crate::workflow::session::{InterruptHandle, Session, WorkflowState};

/// Iteration budget for one prompt
pub const MAX_ITERATION: u32 = 3;

/// Human-in-the-loop approval hook. May block indefinitely awaiting user
/// input; the runner never times it out on its own.
pub type ApprovalCallback =
    Box<dyn Fn(DeferredToolRequests) -> BoxFuture<'static, DeferredToolResults> + Send + Sync>;

/// Final shape of one workflow run.
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub state: WorkflowState,
    pub iterations: u32,
    pub judge: Option<JudgeOutput>,
    pub failure: Option<String>,
}

pub struct WorkflowRunner {
    config: EngineConfig,
    invoker: Arc<dyn AgentInvoker>,
    retriever: Arc<dyn KnowledgeRetriever>,
    requester: Arc<Requester>,
    registry: CapabilityRegistry,
    context: ContextEngine,
    session: Session,
    sandbox: Option<SandboxHandle>,
    approval_callback: Option<ApprovalCallback>,
    max_iterations: u32,
    proxy: bool,
}

impl WorkflowRunner {
    pub fn new(
        config: EngineConfig,
        invoker: Arc<dyn AgentInvoker>,
        retriever: Arc<dyn KnowledgeRetriever>,
    ) -> Self {
        Self::with_session_id(config, invoker, retriever, Uuid::new_v4())
    }

    /// Build a runner for an explicit session id. If a context file for
    /// that id exists, the session resumes with its full narrative.
    pub fn with_session_id(
        config: EngineConfig,
        invoker: Arc<dyn AgentInvoker>,
        retriever: Arc<dyn KnowledgeRetriever>,
        session_id: Uuid,
    ) -> Self {
        let context = ContextEngine::new(session_id, &config.sessions.sessions_dir());
        let requester = Arc::new(Requester::from_config(&config.protocol, false));
        Self {
            config,
            invoker,
            retriever,
            requester,
            registry: CapabilityRegistry::builtin(),
            context,
            session: Session::new(session_id),
            sandbox: None,
            approval_callback: None,
            max_iterations: MAX_ITERATION,
            proxy: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn context(&self) -> &ContextEngine {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ContextEngine {
        &mut self.context
    }

    pub fn registry_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.registry
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.session.interrupt_handle()
    }

    pub fn set_max_iterations(&mut self, max_iterations: u32) {
        self.max_iterations = max_iterations;
    }

    /// Route payload delivery through the intercepting proxy.
    pub fn set_proxy(&mut self, proxy: bool) {
        self.proxy = proxy;
    }

    pub fn set_approval_callback<F, Fut>(&mut self, callback: F)
    where
        F: Fn(DeferredToolRequests) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = DeferredToolResults> + Send + 'static,
    {
        self.approval_callback = Some(Box::new(move |requests| Box::pin(callback(requests))));
    }

    /// Create this session's sandbox through the shared manager and
    /// attach it. Daemon unavailability surfaces unchanged: without a
    /// sandbox the run cannot proceed once one is required.
    pub async fn register_sandbox(
        &mut self,
        manager: Arc<SandboxManager>,
    ) -> Result<Uuid, SandboxError> {
        let sandbox_config = &self.config.sandbox;
        let id = manager
            .create_sandbox(
                &sandbox_config.image,
                sandbox_config.volume_path.as_deref(),
                &sandbox_config.network,
            )
            .await?;
        self.sandbox = Some(SandboxHandle::new(manager, id));
        Ok(id)
    }

    pub fn attach_sandbox(&mut self, handle: SandboxHandle) {
        self.sandbox = Some(handle);
    }

    /// Clear per-prompt flags for a new prompt in the same session. The
    /// accumulated context is kept: conversation continuity across
    /// prompts.
    pub fn reset(&mut self) {
        self.session.reset();
        info!("Workflow state reset for session {}", self.session.id);
    }

    fn checkpoint(&self, during: &'static str) -> EngineResult<()> {
        if self.session.is_interrupted() {
            return Err(EngineError::Interrupted { during });
        }
        Ok(())
    }

    /// Freshly constructed dependency toolbox for one Execute step.
    fn capability_deps(&self) -> CapabilityDeps {
        CapabilityDeps {
            invoker: self.invoker.clone(),
            retriever: self.retriever.clone(),
            requester: self.requester.clone(),
            sandbox: self.sandbox.clone(),
            target: self.context.target().to_string(),
            session_id: self.session.id,
            exec_timeout: Duration::from_secs(self.config.sandbox.exec_timeout_secs),
            proxy: self.proxy,
        }
    }

    /// Ask the planner for the task batch.
    pub async fn plan_tasks(&mut self, goal: &str, target: &str) -> EngineResult<Vec<Task>> {
        if goal.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "planning goal must not be empty".to_string(),
            ));
        }
        self.checkpoint("before planning")?;
        self.session.state = WorkflowState::Planning;
        self.session.target = target.to_string();
        self.context.set_target(target);

        let output = self
            .invoker
            .plan(PlanRequest {
                goal: goal.to_string(),
                target: target.to_string(),
                capabilities: self.registry.descriptions(),
                usage_limits: UsageLimits::default(),
            })
            .await?;

        self.checkpoint("during planning")?;
        self.context.set_tasks(output.tasks.clone());
        info!("Planner produced {} task(s)", output.tasks.len());
        Ok(output.tasks)
    }

    /// Ask the router which capability runs next. An unregistered answer
    /// never raises: the miss is recorded and the fallback entry is
    /// selected instead.
    pub async fn route_task(&mut self, prompt: &str) -> EngineResult<RouterOutput> {
        self.checkpoint("before routing")?;
        self.session.state = WorkflowState::Routing;

        let output = self
            .invoker
            .route(RouteRequest {
                prompt: format!("{prompt}\n{}", self.context.all_context()),
                capabilities: self.registry.descriptions(),
                usage_limits: UsageLimits::default(),
            })
            .await?;

        self.checkpoint("during routing")?;
        self.context.add_next_capability(&output);

        if !self.registry.contains(&output.next_capability) {
            warn!(
                "Routed capability '{}' is not registered, falling back",
                output.next_capability
            );
            self.context.add_not_found_capability(&output.next_capability);
            self.context.set_next_capability(FALLBACK_CAPABILITY);
        }
        Ok(output)
    }

    /// Resolve and run a capability. A deferred approval request is
    /// returned without touching the context; the completed report and
    /// any tool responses are appended in step order.
    pub async fn execute_capability(
        &mut self,
        capability: &str,
        prompt: Option<&str>,
        approval: Option<DeferredExchange>,
    ) -> EngineResult<CapabilityOutcome> {
        self.checkpoint("before capability execution")?;
        self.session.state = WorkflowState::Executing;

        let deps = self.capability_deps();
        let mut handler = self.registry.instantiate(capability, &deps);
        let history = self.context.all_context().to_string();
        let run = handler
            .run(prompt, &history, approval, UsageLimits::default())
            .await?;

        self.checkpoint("during capability execution")?;

        for (tool, response) in &run.tool_responses {
            self.context.add_tool_response(tool, response);
        }

        match &run.outcome {
            CapabilityOutcome::Completed(report) => {
                let rendered = serde_json::to_string(report)
                    .unwrap_or_else(|_| report.raw_response.clone());
                self.context.add_agent_response(&rendered);
            }
            CapabilityOutcome::Deferred(requests) => {
                // Not appended to context until approval settles
                info!(
                    "Capability '{}' deferred {} call(s) for approval",
                    capability,
                    requests.approvals.len()
                );
            }
        }

        Ok(run.outcome)
    }

    /// Gate deferred calls on the injected approval callback. Without a
    /// callback everything is denied: side effects need an explicit yes.
    async fn request_approval(
        &mut self,
        requests: &DeferredToolRequests,
    ) -> DeferredToolResults {
        self.session.state = WorkflowState::AwaitingApproval;
        match &self.approval_callback {
            Some(callback) => callback(requests.clone()).await,
            None => {
                warn!("No approval callback set; denying all deferred calls");
                DeferredToolResults::decide_all(requests, false)
            }
        }
    }

    /// Ask the judge whether the goal is achieved. Never mutates tasks.
    pub async fn judge(&mut self, validation: &ValidationGoal) -> EngineResult<JudgeOutput> {
        self.checkpoint("before judging")?;
        self.session.state = WorkflowState::Judging;

        let output = self
            .invoker
            .judge(JudgeRequest {
                context: self.context.all_context().to_string(),
                validation: validation.clone(),
                usage_limits: UsageLimits::default(),
            })
            .await?;

        self.checkpoint("during judging")?;
        self.context.add_judge_verdict(&format!(
            "goal_achieved: {}\nreasoning: {}\nsolution: {}",
            output.goal_achieved, output.reasoning, output.solution
        ));
        self.session.goal_achieved = output.goal_achieved;
        Ok(output)
    }

    /// Drive the full cycle for one prompt until the goal is achieved,
    /// the iteration budget runs out, or an interruption lands.
    ///
    /// Interruption and budget exhaustion are graceful endings, not run
    /// failures; only unrecoverable orchestration errors end the session
    /// in `Failed`, and the loop is never re-entered afterwards.
    pub async fn run_workflow(
        &mut self,
        prompt: &str,
        target: &str,
        validation: Option<ValidationGoal>,
    ) -> WorkflowOutcome {
        let validation = validation.unwrap_or_default();
        let mut iterations = 0u32;
        let mut last_judge = None;

        if let Err(e) = self.plan_tasks(prompt, target).await {
            return self.end_with_error(e, iterations, last_judge);
        }

        while !self.session.goal_achieved
            && iterations < self.max_iterations
            && !self.session.is_interrupted()
        {
            if let Err(e) = self.route_task(prompt).await {
                return self.end_with_error(e, iterations, last_judge);
            }
            info!(
                "Iteration {}: routing to '{}'",
                iterations + 1,
                self.context.next_capability()
            );

            let capability = self.context.next_capability().to_string();
            let outcome = match self
                .execute_capability(&capability, Some(prompt), None)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => return self.end_with_error(e, iterations, last_judge),
            };

            if let CapabilityOutcome::Deferred(requests) = outcome {
                let results = self.request_approval(&requests).await;
                let exchange = DeferredExchange {
                    requests,
                    results,
                };
                match self
                    .execute_capability(&capability, None, Some(exchange))
                    .await
                {
                    Ok(CapabilityOutcome::Deferred(_)) => {
                        warn!("Capability deferred again after approval; moving on");
                    }
                    Ok(CapabilityOutcome::Completed(_)) => {}
                    Err(e) => return self.end_with_error(e, iterations, last_judge),
                }
            }

            iterations += 1;

            match self.judge(&validation).await {
                Ok(output) => last_judge = Some(output),
                Err(e) => return self.end_with_error(e, iterations, last_judge),
            }
        }

        self.session.state = if self.session.is_interrupted() {
            warn!("Workflow interrupted by user");
            WorkflowState::Interrupted
        } else {
            WorkflowState::Done
        };

        WorkflowOutcome {
            state: self.session.state,
            iterations,
            judge: last_judge,
            failure: None,
        }
    }

    fn end_with_error(
        &mut self,
        error: EngineError,
        iterations: u32,
        judge: Option<JudgeOutput>,
    ) -> WorkflowOutcome {
        match error {
            EngineError::Interrupted { during } => {
                warn!("Workflow interrupted {during}");
                self.session.state = WorkflowState::Interrupted;
                WorkflowOutcome {
                    state: WorkflowState::Interrupted,
                    iterations,
                    judge,
                    failure: None,
                }
            }
            other => {
                error!("Workflow failed: {other}");
                self.session.state = WorkflowState::Failed;
                WorkflowOutcome {
                    state: WorkflowState::Failed,
                    iterations,
                    judge,
                    failure: Some(other.to_string()),
                }
            }
        }
    }
}
