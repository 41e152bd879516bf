//! Retrieval engine.
//!
//! BM25 over the active snapshot, with a token-overlap fallback that is
//! total by construction: whenever any chunk shares a token with the
//! query, retrieval returns at least one candidate instead of nothing.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::core::errors::{SearchError, StoreError};
use crate::corpus::{load_store, tokenize, Chunk, CorpusSnapshot, LoadReport};

/// A chunk annotated with a relevance score for one query. Higher is more
/// relevant. Created per query, never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk: Arc<Chunk>,
    pub score: f64,
}

pub struct SearchEngine {
    store_path: PathBuf,
    snapshot: RwLock<Option<Arc<CorpusSnapshot>>>,
    /// Serializes rebuilds; publication itself is a single swap under the
    /// write lock, so readers never see a partially built snapshot.
    reload_lock: Mutex<()>,
}

impl SearchEngine {
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store_path,
            snapshot: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    /// Rebuilds the snapshot from the store file and atomically replaces
    /// the active one.
    pub async fn reload(&self) -> Result<LoadReport, StoreError> {
        let _guard = self.reload_lock.lock().await;

        let (chunks, report) = load_store(&self.store_path)?;
        let snapshot = Arc::new(CorpusSnapshot::build(chunks));

        *self.snapshot.write().await = Some(snapshot);
        tracing::info!("index reloaded: {} chunks", report.chunks);
        Ok(report)
    }

    pub async fn chunk_count(&self) -> usize {
        self.snapshot
            .read()
            .await
            .as_ref()
            .map(|snapshot| snapshot.len())
            .unwrap_or(0)
    }

    pub async fn snapshot(&self) -> Result<Arc<CorpusSnapshot>, SearchError> {
        self.snapshot
            .read()
            .await
            .clone()
            .ok_or(SearchError::NotInitialized)
    }

    /// Top-k retrieval. Scores are non-increasing; ties keep chunk
    /// insertion order. An empty query yields an empty list, not an error.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Candidate>, SearchError> {
        let snapshot = self.snapshot().await?;
        Ok(search_snapshot(&snapshot, query, k))
    }
}

pub(crate) fn search_snapshot(
    snapshot: &CorpusSnapshot,
    query: &str,
    k: usize,
) -> Vec<Candidate> {
    let terms = tokenize(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let hits = rank(snapshot, snapshot.score_bm25(&terms), k);
    if !hits.is_empty() {
        return hits;
    }

    tracing::debug!("primary scoring returned no hits; using token-overlap fallback");
    rank(snapshot, snapshot.score_overlap(&terms), k)
}

fn rank(snapshot: &CorpusSnapshot, scores: Vec<f64>, k: usize) -> Vec<Candidate> {
    let mut scored: Vec<(usize, f64)> = scores
        .into_iter()
        .enumerate()
        .filter(|(_, score)| *score > 0.0)
        .collect();

    // Stable sort keeps insertion order among equal scores.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(index, score)| Candidate {
            chunk: snapshot.chunks()[index].clone(),
            score,
        })
        .collect()
}
