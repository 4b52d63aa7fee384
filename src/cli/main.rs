// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Haukka - AI Pentest Orchestration Engine
 * Standalone CLI: interactive chat sessions and batch evaluation runs
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::Write as IoWrite;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use haukka_engine::agents::{ClaudeInvoker, DeferredToolRequests, DeferredToolResults};
use haukka_engine::assets::add_assets_from_folder;
use haukka_engine::config::{load_config, EngineConfig};
use haukka_engine::network::check_target_alive;
use haukka_engine::retrieval::NoopRetriever;
use haukka_engine::sandbox::SandboxManager;
use haukka_engine::types::ValidationGoal;
use haukka_engine::workflow::{WorkflowOutcome, WorkflowRunner, WorkflowState};

/// Haukka - AI Pentest Orchestration Engine
#[derive(Parser)]
#[command(name = "haukka")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version = "0.3.0")]
#[command(about = "AI-driven pentest orchestration. Plan, route, execute, judge.", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session against a target
    Chat {
        /// Target URL or host:port
        target: String,

        /// Run a single goal instead of the interactive loop
        #[arg(long)]
        goal: Option<String>,

        /// Folder of text assets (notes, specs, captured requests) to
        /// feed into the session context
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Resume an existing session by id
        #[arg(long)]
        session: Option<Uuid>,

        /// Route payload delivery through the intercepting proxy
        #[arg(long)]
        proxy: bool,

        /// Skip sandbox creation (shell capability degrades gracefully)
        #[arg(long)]
        no_sandbox: bool,

        /// Approve side-effecting tool calls without prompting
        #[arg(long)]
        auto_approve: bool,
    },

    /// Batch run against a challenge manifest
    Eval {
        /// JSON manifest: [{"name": ..., "target": ..., "goal": ...}]
        manifest: PathBuf,

        /// Write per-challenge results as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip sandbox creation
        #[arg(long)]
        no_sandbox: bool,
    },
}

#[derive(Debug, Deserialize)]
struct ChallengeEntry {
    name: String,
    target: String,
    goal: String,
    #[serde(default)]
    validation_type: Option<String>,
    #[serde(default)]
    validation_format: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChallengeResult {
    name: String,
    target: String,
    state: String,
    goal_achieved: bool,
    iterations: u32,
}

fn init_tracing(verbose: bool, debug: bool, quiet: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("haukka={level},haukka_engine={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug, cli.quiet);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat {
            target,
            goal,
            assets,
            session,
            proxy,
            no_sandbox,
            auto_approve,
        } => {
            run_chat(
                config,
                target,
                goal,
                assets,
                session,
                proxy,
                no_sandbox,
                auto_approve,
            )
            .await
        }
        Commands::Eval {
            manifest,
            report,
            no_sandbox,
        } => run_eval(config, manifest, report, no_sandbox).await,
    }
}

/// Wire one session with one sandbox and drive the orchestrator.
#[allow(clippy::too_many_arguments)]
async fn run_chat(
    config: EngineConfig,
    target: String,
    goal: Option<String>,
    assets: Option<PathBuf>,
    session: Option<Uuid>,
    proxy: bool,
    no_sandbox: bool,
    auto_approve: bool,
) -> Result<()> {
    let invoker = Arc::new(
        ClaudeInvoker::from_env(&config.model).context("Model provider setup failed")?,
    );
    let retriever = Arc::new(NoopRetriever);

    let liveness = check_target_alive(&target, Duration::from_secs(5)).await;
    if !liveness.alive {
        warn!(
            "Target {} did not respond ({}); continuing anyway",
            target,
            liveness.error.as_deref().unwrap_or("no error detail")
        );
    }

    let mut runner = match session {
        Some(id) => WorkflowRunner::with_session_id(config.clone(), invoker, retriever, id),
        None => WorkflowRunner::new(config.clone(), invoker, retriever),
    };
    runner.set_proxy(proxy);

    let manager = if no_sandbox {
        None
    } else {
        let manager = Arc::new(SandboxManager::with_docker());
        manager
            .preflight()
            .await
            .context("Sandbox daemon unavailable")?;
        runner
            .register_sandbox(manager.clone())
            .await
            .context("Sandbox creation failed")?;
        Some(manager)
    };

    if let Some(folder) = &assets {
        add_assets_from_folder(runner.context_mut(), folder);
    }

    install_approval_callback(&mut runner, auto_approve);

    // Ctrl+C requests a cooperative stop; the loop honors it at the next
    // checkpoint.
    let interrupt = runner.interrupt_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterruption requested; stopping at the next checkpoint...");
            interrupt.interrupt();
        }
    });

    println!("Session {} against {}", runner.session().id, target);

    if let Some(goal) = goal {
        let outcome = runner.run_workflow(&goal, &target, None).await;
        print_outcome(&outcome);
    } else {
        let stdin = std::io::stdin();
        loop {
            print!("goal> ");
            std::io::stdout().flush().ok();
            let mut line = String::new();
            match stdin.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(_) => break,
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "exit" | "quit") {
                break;
            }
            runner.reset();
            let outcome = runner.run_workflow(line, &target, None).await;
            print_outcome(&outcome);
        }
    }

    if let Some(manager) = manager {
        manager.stop_all().await;
    }
    info!("Session context saved at {}", runner.context().context_file_path().display());
    Ok(())
}

async fn run_eval(
    config: EngineConfig,
    manifest_path: PathBuf,
    report_path: Option<PathBuf>,
    no_sandbox: bool,
) -> Result<()> {
    let manifest_raw = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
    let challenges: Vec<ChallengeEntry> =
        serde_json::from_str(&manifest_raw).context("Failed to parse challenge manifest")?;

    let invoker = Arc::new(
        ClaudeInvoker::from_env(&config.model).context("Model provider setup failed")?,
    );

    let manager = if no_sandbox {
        None
    } else {
        let manager = Arc::new(SandboxManager::with_docker());
        manager
            .preflight()
            .await
            .context("Sandbox daemon unavailable")?;
        Some(manager)
    };

    let mut results = Vec::new();
    for challenge in &challenges {
        println!("=== {} ({})", challenge.name, challenge.target);

        let mut runner = WorkflowRunner::new(
            config.clone(),
            invoker.clone(),
            Arc::new(NoopRetriever),
        );
        if let Some(manager) = &manager {
            runner
                .register_sandbox(manager.clone())
                .await
                .context("Sandbox creation failed")?;
        }
        // Batch runs have no human in the loop
        install_approval_callback(&mut runner, true);

        let validation = match (&challenge.validation_type, &challenge.validation_format) {
            (None, None) => None,
            (vtype, vformat) => {
                let defaults = ValidationGoal::default();
                Some(ValidationGoal {
                    validation_type: vtype.clone().unwrap_or(defaults.validation_type),
                    validation_format: vformat.clone().unwrap_or(defaults.validation_format),
                })
            }
        };

        let outcome = runner
            .run_workflow(&challenge.goal, &challenge.target, validation)
            .await;
        print_outcome(&outcome);

        results.push(ChallengeResult {
            name: challenge.name.clone(),
            target: challenge.target.clone(),
            state: outcome.state.to_string(),
            goal_achieved: matches!(outcome.state, WorkflowState::Done)
                && outcome.judge.as_ref().map(|j| j.goal_achieved).unwrap_or(false),
            iterations: outcome.iterations,
        });
    }

    let passed = results.iter().filter(|r| r.goal_achieved).count();
    println!("\n{}/{} challenges passed", passed, results.len());

    if let Some(path) = report_path {
        let rendered = serde_json::to_string_pretty(&results)?;
        std::fs::write(&path, rendered)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    if let Some(manager) = manager {
        manager.stop_all().await;
    }
    Ok(())
}

fn install_approval_callback(runner: &mut WorkflowRunner, auto_approve: bool) {
    runner.set_approval_callback(move |requests: DeferredToolRequests| async move {
        if auto_approve {
            warn!(
                "Auto-approving {} deferred call(s)",
                requests.approvals.len()
            );
            return DeferredToolResults::decide_all(&requests, true);
        }

        println!("\nThe agent requests approval for the following tool calls:");
        for call in &requests.approvals {
            println!("  [{}] {}", call.tool_name, call.arguments);
        }
        let approve = tokio::task::spawn_blocking(read_approval_input)
            .await
            .unwrap_or(false);
        DeferredToolResults::decide_all(&requests, approve)
    });
}

fn read_approval_input() -> bool {
    print!("Approve these tool executions? (y/N): ");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

fn print_outcome(outcome: &WorkflowOutcome) {
    match outcome.state {
        WorkflowState::Done => {
            if let Some(judge) = &outcome.judge {
                println!(
                    "Workflow done after {} iteration(s): goal_achieved={}",
                    outcome.iterations, judge.goal_achieved
                );
                if judge.goal_achieved {
                    println!("Solution: {}", judge.solution);
                } else {
                    println!("Judge reasoning: {}", judge.reasoning);
                }
            } else {
                println!("Workflow done after {} iteration(s)", outcome.iterations);
            }
        }
        WorkflowState::Interrupted => {
            println!("Workflow interrupted after {} iteration(s)", outcome.iterations);
        }
        WorkflowState::Failed => {
            println!(
                "Workflow failed: {}",
                outcome.failure.as_deref().unwrap_or("unknown error")
            );
        }
        other => println!("Workflow ended in unexpected state: {other}"),
    }
}
