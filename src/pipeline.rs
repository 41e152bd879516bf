//! Query pipeline: retrieve → rerank → generate → normalize.
//!
//! Only `NotInitialized` can fail a query. The generation call is the
//! single suspension point on external I/O and is bounded by the
//! configured timeout; every failure kind degrades to the deterministic
//! local fallback instead of surfacing.

use std::sync::Arc;
use std::time::Duration;

use crate::answer::{normalize, NormalizedAnswer};
use crate::core::config::AppConfig;
use crate::core::errors::{GenerationError, SearchError};
use crate::llm::{GenerationProvider, GenerationRequest};
use crate::prompt::build_prompt;
use crate::rerank::Reranker;
use crate::search::SearchEngine;

pub struct QueryPipeline {
    search: Arc<SearchEngine>,
    reranker: Reranker,
    provider: Arc<dyn GenerationProvider>,
    config: Arc<AppConfig>,
}

impl QueryPipeline {
    pub fn new(
        search: Arc<SearchEngine>,
        reranker: Reranker,
        provider: Arc<dyn GenerationProvider>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            search,
            reranker,
            provider,
            config,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<NormalizedAnswer, SearchError> {
        let pool = self
            .search
            .search(question, self.config.search.pool_size)
            .await?;

        let outcome = self
            .reranker
            .select(question, pool, self.config.rerank.top_k)
            .await;
        tracing::debug!(
            mode = ?outcome.mode,
            hits = outcome.candidates.len(),
            "rerank finished"
        );

        let hits = outcome.candidates;
        if hits.is_empty() {
            return Ok(normalize(None, &hits));
        }

        let generation = &self.config.generation;
        let request = GenerationRequest {
            prompt: build_prompt(question, &hits),
            model_id: generation.model.clone(),
            temperature: generation.temperature,
            top_p: generation.top_p,
            max_tokens: generation.max_tokens,
        };

        let raw = match tokio::time::timeout(
            Duration::from_secs(generation.timeout_secs),
            self.provider.generate(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout),
        };

        match raw {
            Ok(text) => Ok(normalize(Some(&text), &hits)),
            Err(err) => {
                tracing::warn!("generation failed, using local fallback: {}", err);
                Ok(normalize(None, &hits))
            }
        }
    }
}
