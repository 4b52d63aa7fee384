// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Claude Messages API implementation of the agent invoker.
//!
//! Each workflow role (planner, router, judge, capability) gets a system
//! prompt demanding strict JSON matching its output schema; the response
//! text is parsed into the typed output. Transient API failures are the
//! invoker's problem, not the workflow's: a small bounded retry runs here.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::agents::invoker::{
    ActRequest, AgentInvoker, CapabilityDescription, CapabilityOutcome, CapabilityReport,
    DeferredToolCall, DeferredToolRequests, JudgeOutput, JudgeRequest, PlanRequest, PlannerOutput,
    RouteRequest, RouterOutput,
};
use crate::config::ModelConfig;
use crate::errors::InvokerError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const MAX_ATTEMPTS: u32 = 3;

pub struct ClaudeInvoker {
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ClaudeInvoker {
    pub fn new(api_key: String, config: &ModelConfig) -> Result<Self, InvokerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InvokerError::Transport(e.to_string()))?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Construct from the configured environment variable.
    pub fn from_env(config: &ModelConfig) -> Result<Self, InvokerError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            InvokerError::Transport(format!(
                "API key required. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;
        Self::new(api_key, config)
    }

    async fn chat(&self, system: &str, user_prompt: &str) -> Result<String, InvokerError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [{"role": "user", "content": user_prompt}],
        });

        let mut last_error = InvokerError::Transport("no attempt made".to_string());
        for attempt in 1..=MAX_ATTEMPTS {
            match self.chat_once(&body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    warn!("Model call attempt {}/{} failed: {}", attempt, MAX_ATTEMPTS, e);
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }

    async fn chat_once(&self, body: &serde_json::Value) -> Result<String, InvokerError> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| InvokerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvokerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InvokerError::MalformedOutput {
                reason: format!("response body was not JSON: {e}"),
            })?;

        let mut text = String::new();
        if let Some(blocks) = api_response["content"].as_array() {
            for block in blocks {
                if block["type"].as_str() == Some("text") {
                    text.push_str(block["text"].as_str().unwrap_or(""));
                }
            }
        }
        if text.is_empty() {
            return Err(InvokerError::MalformedOutput {
                reason: "no text content in model response".to_string(),
            });
        }
        debug!("Model returned {} chars", text.len());
        Ok(text)
    }

    async fn chat_json<T: for<'de> Deserialize<'de>>(
        &self,
        system: &str,
        user_prompt: &str,
    ) -> Result<T, InvokerError> {
        let text = self.chat(system, user_prompt).await?;
        let json = extract_json(&text).ok_or_else(|| InvokerError::MalformedOutput {
            reason: "no JSON object found in model output".to_string(),
        })?;
        serde_json::from_str(json).map_err(|e| InvokerError::MalformedOutput {
            reason: format!("model JSON did not match schema: {e}"),
        })
    }
}

/// Extract the outermost JSON object from free-form model text.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn render_capabilities(capabilities: &[CapabilityDescription]) -> String {
    capabilities
        .iter()
        .map(|c| format!("- {}: {}", c.name, c.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Raw act-level model output: either a finished report or a batch of
/// tool calls needing approval.
#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ActOutput {
    Report {
        reasoning: String,
        state: String,
        raw_response: String,
    },
    RequestApproval {
        calls: Vec<RequestedCall>,
    },
}

#[derive(Deserialize)]
struct RequestedCall {
    tool_name: String,
    arguments: serde_json::Value,
}

#[async_trait]
impl AgentInvoker for ClaudeInvoker {
    async fn plan(&self, request: PlanRequest) -> Result<PlannerOutput, InvokerError> {
        let system = format!(
            "You are the planner of a penetration-testing workflow against {target}. \
             Break the goal into a short ordered list of concrete tasks. \
             Available capabilities:\n{caps}\n\
             Respond with strict JSON only: \
             {{\"tasks\": [{{\"goal\": \"...\", \"status\": \"pending\", \"output\": \"\"}}]}}",
            target = request.target,
            caps = render_capabilities(&request.capabilities),
        );
        self.chat_json(&system, &request.goal).await
    }

    async fn route(&self, request: RouteRequest) -> Result<RouterOutput, InvokerError> {
        let system = format!(
            "You are the router of a penetration-testing workflow. Choose the single \
             capability best suited as the next step. Capabilities:\n{caps}\n\
             Respond with strict JSON only: \
             {{\"reasoning\": \"...\", \"next_capability\": \"...\"}}",
            caps = render_capabilities(&request.capabilities),
        );
        self.chat_json(&system, &request.prompt).await
    }

    async fn judge(&self, request: JudgeRequest) -> Result<JudgeOutput, InvokerError> {
        let system = format!(
            "You are the judge of a penetration-testing workflow. Validation type: {vtype}. \
             A goal counts as achieved when: {vformat}\n\
             Respond with strict JSON only: \
             {{\"reasoning\": \"...\", \"goal_achieved\": true|false, \"solution\": \"...\"}}",
            vtype = request.validation.validation_type,
            vformat = request.validation.validation_format,
        );
        self.chat_json(&system, &request.context).await
    }

    async fn act(&self, request: ActRequest) -> Result<CapabilityOutcome, InvokerError> {
        let system = format!(
            "{instructions}\n\
             Respond with strict JSON only, one of:\n\
             {{\"action\": \"report\", \"reasoning\": \"...\", \"state\": \"...\", \"raw_response\": \"...\"}}\n\
             {{\"action\": \"request_approval\", \"calls\": [{{\"tool_name\": \"...\", \"arguments\": {{...}}}}]}}",
            instructions = request.instructions,
        );

        let mut user_prompt = String::new();
        if let Some(prompt) = &request.prompt {
            user_prompt.push_str(prompt);
            user_prompt.push('\n');
        }
        user_prompt.push_str(&request.message_history);

        let output: ActOutput = self.chat_json(&system, &user_prompt).await?;
        match output {
            ActOutput::Report {
                reasoning,
                state,
                raw_response,
            } => Ok(CapabilityOutcome::Completed(CapabilityReport {
                reasoning,
                state,
                raw_response,
            })),
            ActOutput::RequestApproval { calls } => {
                let approvals = calls
                    .into_iter()
                    .map(|call| DeferredToolCall {
                        call_id: Uuid::new_v4().to_string(),
                        tool_name: call.tool_name,
                        arguments: call.arguments,
                    })
                    .collect();
                Ok(CapabilityOutcome::Deferred(DeferredToolRequests { approvals }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_skips_prose() {
        let text = "Sure, here is the plan:\n{\"tasks\": []}\nDone.";
        assert_eq!(extract_json(text), Some("{\"tasks\": []}"));
    }

    #[test]
    fn extract_json_rejects_textless_output() {
        assert!(extract_json("no json here").is_none());
    }

    #[test]
    fn act_output_parses_both_shapes() {
        let report: ActOutput = serde_json::from_str(
            r#"{"action":"report","reasoning":"r","state":"done","raw_response":"x"}"#,
        )
        .unwrap();
        assert!(matches!(report, ActOutput::Report { .. }));

        let approval: ActOutput = serde_json::from_str(
            r#"{"action":"request_approval","calls":[{"tool_name":"send_payload","arguments":{"raw_request":"GET / HTTP/1.1"}}]}"#,
        )
        .unwrap();
        assert!(matches!(approval, ActOutput::RequestApproval { .. }));
    }
}
