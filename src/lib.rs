// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Haukka - AI Pentest Orchestration Engine
 * Exposes engine modules for embedding and testing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod assets;
pub mod config;
pub mod network;
pub mod retrieval;
pub mod types;

// Session context ledger
pub mod context;

// Isolated command execution
pub mod sandbox;

// Raw HTTP / TLS protocol layer
pub mod protocol;

// Agent invocation and capabilities
pub mod agents;

// Workflow orchestration
pub mod workflow;

// Production error handling
pub mod errors;
