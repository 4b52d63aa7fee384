// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Agent invocation layer.
//!
//! The engine never talks to a model provider directly: every decision
//! step goes through the [`AgentInvoker`] trait, and every executable
//! unit the router can select is a [`Capability`] resolved through the
//! [`CapabilityRegistry`].

pub mod capabilities;
pub mod claude;
pub mod invoker;
pub mod registry;

pub use capabilities::{Capability, CapabilityDeps, CapabilityRun};
pub use claude::ClaudeInvoker;
pub use invoker::{
    AgentInvoker, CapabilityDescription, CapabilityOutcome, CapabilityReport, DeferredExchange,
    DeferredToolCall, DeferredToolRequests, DeferredToolResults, JudgeOutput, PlannerOutput,
    RouterOutput, UsageLimits,
};
pub use registry::{CapabilityRegistry, FALLBACK_CAPABILITY};
