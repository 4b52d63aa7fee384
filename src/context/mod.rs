// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session context engine.
//!
//! One append-only ledger of everything that happened in a session,
//! consumed verbatim by every planning, routing and judging call. Each
//! append also lands in a per-session context file so a crashed or
//! restarted session can resume with its full narrative; file writes are
//! best-effort and the in-memory context stays authoritative for the
//! running process.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::agents::invoker::RouterOutput;
use crate::types::Task;

/// File section tag for operator-provided input
pub const FILE_TAG_USER: &str = "[user input]";
/// File section tag for model output
pub const FILE_TAG_AGENT: &str = "[ai agent]";

pub struct ContextEngine {
    session_id: Uuid,
    workflow_context: String,
    tasks: BTreeMap<usize, Task>,
    next_capability: String,
    target: String,
    assets: BTreeMap<String, String>,
    context_file_path: PathBuf,
}

impl ContextEngine {
    /// Create the engine for a session. If a context file for this
    /// session id already exists its content is loaded verbatim
    /// (session resume); otherwise a fresh file is initialized.
    pub fn new(session_id: Uuid, sessions_dir: &Path) -> Self {
        let session_dir = sessions_dir.join(session_id.to_string());
        if let Err(e) = std::fs::create_dir_all(&session_dir) {
            warn!("Could not create session directory {}: {}", session_dir.display(), e);
        }

        let mut engine = Self {
            session_id,
            workflow_context: String::new(),
            tasks: BTreeMap::new(),
            next_capability: String::new(),
            target: String::new(),
            assets: BTreeMap::new(),
            context_file_path: session_dir.join("context.txt"),
        };
        engine.initialize_file();
        engine
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn context_file_path(&self) -> &Path {
        &self.context_file_path
    }

    /// The complete accumulated context. O(len); callers that need
    /// bounded growth summarize externally; this engine never truncates
    /// on its own.
    pub fn all_context(&self) -> &str {
        &self.workflow_context
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn next_capability(&self) -> &str {
        &self.next_capability
    }

    pub fn tasks(&self) -> &BTreeMap<usize, Task> {
        &self.tasks
    }

    pub fn set_target(&mut self, target: &str) {
        self.workflow_context
            .push_str(&format!("\n\n[target]\n{target}\n"));
        self.target = target.to_string();
        self.append_to_file(FILE_TAG_USER, &format!("Target: {target}"));
    }

    /// Record the planner's task batch. Insertion order is planning
    /// order; tasks are never reordered afterwards.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        let rendered = render_tasks(&tasks);
        self.workflow_context
            .push_str(&format!("\n\n[planner tasks]\n{rendered}\n"));
        self.tasks = tasks.into_iter().enumerate().collect();
        self.append_to_file(FILE_TAG_AGENT, &format!("Planner agent new tasks:\n{rendered}"));
    }

    pub fn add_next_capability(&mut self, router_output: &RouterOutput) {
        self.next_capability = router_output.next_capability.clone();
        let rendered = format!(
            "next: {} ({})",
            router_output.next_capability, router_output.reasoning
        );
        self.workflow_context
            .push_str(&format!("\n\n[router agent]\n{rendered}\n"));
        self.append_to_file(FILE_TAG_AGENT, &format!("Router agent: {rendered}"));
    }

    /// Override the routed capability (registry fallback).
    pub fn set_next_capability(&mut self, name: &str) {
        self.next_capability = name.to_string();
    }

    pub fn add_not_found_capability(&mut self, name: &str) {
        self.workflow_context
            .push_str(&format!("\n\n[agent not found {name}]\n"));
        self.append_to_file(FILE_TAG_AGENT, &format!("Not found agent name: {name}"));
    }

    pub fn add_agent_response(&mut self, response: &str) {
        self.workflow_context
            .push_str(&format!("\n\n[ai agent]\n{response}\n"));
        self.append_to_file(FILE_TAG_AGENT, &format!("Agent response:\n{response}"));
    }

    /// Record the judge's verdict. Kept distinct from capability output
    /// so iteration counts stay legible in the ledger.
    pub fn add_judge_verdict(&mut self, verdict: &str) {
        self.workflow_context
            .push_str(&format!("\n\n[judge agent]\n{verdict}\n"));
        self.append_to_file(FILE_TAG_AGENT, &format!("Judge verdict:\n{verdict}"));
    }

    pub fn add_tool_response(&mut self, tool_name: &str, response: &str) {
        self.workflow_context
            .push_str(&format!("\n\n[Tool response {tool_name}]\n{response}\n"));
        self.append_to_file(&format!("[Tool use: {tool_name}]"), response);
    }

    /// Store an asset file, write-once per filename: the first content
    /// wins, later writes under the same name are ignored.
    pub fn add_asset_file(&mut self, file_name: &str, file_content: &str) {
        if self.assets.contains_key(file_name) {
            debug!("Asset {} already recorded, keeping first version", file_name);
            return;
        }
        self.assets
            .insert(file_name.to_string(), file_content.to_string());
        self.append_to_file(
            "[Tool use: file_asset]",
            &format!("Added asset file: {file_name}"),
        );
    }

    pub fn add_assets_to_context(&mut self) {
        let assets: Vec<(String, String)> = self
            .assets
            .iter()
            .map(|(name, content)| (name.clone(), content.clone()))
            .collect();
        for (name, content) in assets {
            self.workflow_context
                .push_str(&format!("\n[filename {name}]\n{content}\n"));
            self.append_to_file(
                "[Tool use: file_asset]",
                &format!("Asset file: {name}\n{content}"),
            );
        }
    }

    /// Load an existing context file verbatim, restoring the target from
    /// the header lines. Unknown tags are preserved as-is.
    fn load_from_file(&mut self) -> bool {
        let content = match std::fs::read_to_string(&self.context_file_path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Could not load context from {}: {}",
                    self.context_file_path.display(),
                    e
                );
                return false;
            }
        };

        for line in content.lines() {
            if let Some(target) = line.strip_prefix("Target:") {
                self.target = target.trim().to_string();
            } else if line.starts_with('=') {
                break;
            }
        }

        self.workflow_context = content;
        debug!(
            "Resumed session {} from {} ({} bytes)",
            self.session_id,
            self.context_file_path.display(),
            self.workflow_context.len()
        );
        true
    }

    fn initialize_file(&mut self) {
        if self.context_file_path.exists() && self.load_from_file() {
            return;
        }

        let header = format!(
            "Session ID: {}\nTarget: {}\n{}\n\n",
            self.session_id,
            self.target,
            "=".repeat(50)
        );
        if let Err(e) = std::fs::write(&self.context_file_path, header) {
            warn!(
                "Could not initialize context file {}: {}",
                self.context_file_path.display(),
                e
            );
        }
    }

    /// Append a tagged, blank-line-terminated section to the context
    /// file. Failures are logged and swallowed: file durability is
    /// best-effort.
    fn append_to_file(&self, section: &str, content: &str) {
        let result = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.context_file_path)
            .and_then(|mut file| writeln!(file, "{section}\n{content}\n"));
        if let Err(e) = result {
            warn!(
                "Could not append to context file {}: {}",
                self.context_file_path.display(),
                e
            );
        }
    }
}

fn render_tasks(tasks: &[Task]) -> String {
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| format!("{}. [{}] {}", i + 1, task.status.as_str(), task.goal))
        .collect::<Vec<_>>()
        .join("\n")
}
