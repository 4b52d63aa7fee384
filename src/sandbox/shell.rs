// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Sandboxed shell runner with a numbered command log.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::errors::SandboxError;
use crate::sandbox::{ExecOutcome, ExecOutput, SandboxHandle};
use crate::types::CmdLog;

/// Executes shell commands in a session's sandbox and keeps a numbered
/// log of every command with its captured streams, so capability output
/// can be replayed into the workflow context.
pub struct ShellRunner {
    pub session: String,
    handle: SandboxHandle,
    cmd_log: BTreeMap<usize, CmdLog>,
}

impl ShellRunner {
    pub fn new(session: impl Into<String>, handle: SandboxHandle) -> Self {
        Self {
            session: session.into(),
            handle,
            cmd_log: BTreeMap::new(),
        }
    }

    /// Run a command buffered, log it, and return the structured result.
    pub async fn run_command(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput, SandboxError> {
        let outcome = self.handle.execute(command, false, timeout).await?;
        let output = match outcome {
            ExecOutcome::Buffered(output) => output,
            // Buffered was requested; a stream here would be a runtime bug
            ExecOutcome::Streaming(stream) => {
                ExecOutput::failure(&stream.command, "unexpected streaming result", 0)
            }
        };

        let stderr = if output.timed_out {
            format!("Command timed out: {}", output.stderr)
        } else {
            output.stderr.clone()
        };

        let next = self.cmd_log.len() + 1;
        self.cmd_log.insert(
            next,
            CmdLog {
                stdin: command.to_string(),
                stdout: output.stdout.clone(),
                stderr,
            },
        );
        Ok(output)
    }

    pub fn cmd_log(&self) -> &BTreeMap<usize, CmdLog> {
        &self.cmd_log
    }

    /// Render the command log as text for the workflow context.
    pub fn render_log(&self) -> String {
        let mut out = String::new();
        for (number, entry) in &self.cmd_log {
            out.push_str(&format!("$ {} (#{number})\n", entry.stdin));
            if !entry.stdout.is_empty() {
                out.push_str(&entry.stdout);
                if !entry.stdout.ends_with('\n') {
                    out.push('\n');
                }
            }
            if !entry.stderr.is_empty() {
                out.push_str(&format!("[stderr] {}\n", entry.stderr));
            }
        }
        out
    }
}
