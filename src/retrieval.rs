// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Knowledge retrieval boundary.
//!
//! Vector storage, chunking and embedding live outside the engine; the
//! workflow only consumes this lookup trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EngineError;

/// One retrieved snippet with its source and similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub source: String,
    pub content: String,
    pub score: f32,
}

#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn search(
        &self,
        query: &str,
        session_id: Uuid,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, EngineError>;
}

/// Retriever used when no index is configured: every lookup is empty.
pub struct NoopRetriever;

#[async_trait]
impl KnowledgeRetriever for NoopRetriever {
    async fn search(
        &self,
        _query: &str,
        _session_id: Uuid,
        _limit: usize,
    ) -> Result<Vec<RetrievedChunk>, EngineError> {
        Ok(Vec::new())
    }
}
