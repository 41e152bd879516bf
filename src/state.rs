use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{self, AppConfig, AppPaths};
use crate::llm::{GenerationProvider, GroqProvider};
use crate::pipeline::QueryPipeline;
use crate::rerank::Reranker;
use crate::search::SearchEngine;

/// Shared application state: configuration, the retrieval engine and the
/// assembled query pipeline.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub search: Arc<SearchEngine>,
    pub pipeline: QueryPipeline,
}

impl AppState {
    pub fn initialize() -> Arc<Self> {
        let paths = Arc::new(AppPaths::new());
        let config = Arc::new(config::load_config(&paths));

        let api_key = config::groq_api_key();
        if api_key.is_none() {
            tracing::warn!("GROQ_API_KEY not set; every query will use the local fallback");
        }

        let provider: Arc<dyn GenerationProvider> = Arc::new(GroqProvider::new(
            config.generation.base_url.clone(),
            api_key,
            Duration::from_secs(config.generation.timeout_secs),
        ));

        let store_path = config
            .search
            .store_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| paths.store_path.clone());
        let search = Arc::new(SearchEngine::new(store_path));

        let reranker = Reranker::new(
            config.rerank.clone(),
            config.generation.model.clone(),
            provider.clone(),
        );

        let pipeline = QueryPipeline::new(
            search.clone(),
            reranker,
            provider,
            config.clone(),
        );

        Arc::new(AppState {
            paths,
            config,
            search,
            pipeline,
        })
    }
}
