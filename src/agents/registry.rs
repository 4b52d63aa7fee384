// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Capability registry.
//!
//! Maps capability names to a human-readable description (used when
//! asking the router to choose) and a factory building the handler from
//! the per-call dependency toolbox. Unknown names never panic: lookup
//! misses fall back to the registry's explicit default entry.

use std::collections::HashMap;

use crate::agents::capabilities::{
    Capability, CapabilityDeps, KnowledgeSearchCapability, KnowledgeSearchDeps,
    ReconShellCapability, ReconShellDeps, RouterFallbackCapability, WebappReconCapability,
    WebappReconDeps,
};
use crate::agents::invoker::CapabilityDescription;

/// Name of the registry's default entry.
pub const FALLBACK_CAPABILITY: &str = "router";

type CapabilityFactory = Box<dyn Fn(&CapabilityDeps) -> Box<dyn Capability> + Send + Sync>;

struct RegisteredCapability {
    description: String,
    factory: CapabilityFactory,
}

pub struct CapabilityRegistry {
    entries: HashMap<String, RegisteredCapability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.register(
            FALLBACK_CAPABILITY,
            "Fallback entry used when a routed capability has no registered handler.",
            Box::new(|_deps| Box::new(RouterFallbackCapability)),
        );
        registry
    }

    /// Registry with the built-in capability set.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(
            "webapp_recon",
            "Web application reconnaissance: analyzes the target and delivers raw HTTP \
             payloads (approval-gated) to map behavior and find weaknesses.",
            Box::new(|deps| {
                Box::new(WebappReconCapability::new(
                    WebappReconDeps {
                        invoker: deps.invoker.clone(),
                        retriever: deps.retriever.clone(),
                        requester: deps.requester.clone(),
                        target: deps.target.clone(),
                        session_id: deps.session_id,
                    },
                    deps.proxy,
                ))
            }),
        );

        registry.register(
            "recon_shell",
            "Shell reconnaissance inside the isolated sandbox container: runs network and \
             enumeration tooling against the target.",
            Box::new(|deps| {
                Box::new(ReconShellCapability::new(ReconShellDeps {
                    invoker: deps.invoker.clone(),
                    sandbox: deps.sandbox.clone(),
                    session_id: deps.session_id,
                    exec_timeout: deps.exec_timeout,
                }))
            }),
        );

        registry.register(
            "knowledge_search",
            "Searches indexed target source and documentation for material relevant to \
             the current question.",
            Box::new(|deps| {
                Box::new(KnowledgeSearchCapability::new(KnowledgeSearchDeps {
                    retriever: deps.retriever.clone(),
                    target: deps.target.clone(),
                    session_id: deps.session_id,
                }))
            }),
        );

        registry
    }

    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        factory: CapabilityFactory,
    ) {
        self.entries.insert(
            name.to_string(),
            RegisteredCapability {
                description: description.to_string(),
                factory,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Descriptions presented to the router. The fallback entry is
    /// internal and never offered as a choice.
    pub fn descriptions(&self) -> Vec<CapabilityDescription> {
        let mut descriptions: Vec<CapabilityDescription> = self
            .entries
            .iter()
            .filter(|(name, _)| name.as_str() != FALLBACK_CAPABILITY)
            .map(|(name, entry)| CapabilityDescription {
                name: name.clone(),
                description: entry.description.clone(),
            })
            .collect();
        descriptions.sort_by(|a, b| a.name.cmp(&b.name));
        descriptions
    }

    /// Build the handler for `name`, or the fallback when `name` is not
    /// registered.
    pub fn instantiate(&self, name: &str, deps: &CapabilityDeps) -> Box<dyn Capability> {
        let entry = self
            .entries
            .get(name)
            .unwrap_or_else(|| &self.entries[FALLBACK_CAPABILITY]);
        (entry.factory)(deps)
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_core_capabilities() {
        let registry = CapabilityRegistry::builtin();
        assert!(registry.contains("webapp_recon"));
        assert!(registry.contains("recon_shell"));
        assert!(registry.contains("knowledge_search"));
        assert!(registry.contains(FALLBACK_CAPABILITY));
    }

    #[test]
    fn fallback_is_hidden_from_router() {
        let registry = CapabilityRegistry::builtin();
        let names: Vec<String> = registry.descriptions().into_iter().map(|d| d.name).collect();
        assert!(!names.contains(&FALLBACK_CAPABILITY.to_string()));
        assert!(names.contains(&"webapp_recon".to_string()));
    }
}
