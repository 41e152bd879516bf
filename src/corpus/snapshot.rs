//! Immutable corpus snapshot with precomputed term statistics.
//!
//! A snapshot is built once per (re)load and never mutated afterwards, so
//! concurrent queries read it without locking. Reload publishes a fresh
//! snapshot by swapping a single `Arc` — readers see either the old or
//! the new corpus, never a mix.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use super::store::Chunk;
use super::tokenize::tokenize;

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

pub struct CorpusSnapshot {
    chunks: Vec<Arc<Chunk>>,
    /// Token list per chunk, aligned with `chunks`.
    tokens: Vec<Vec<String>>,
    /// term -> [(chunk index, term frequency)]
    postings: HashMap<String, Vec<(usize, u32)>>,
    avg_doc_len: f64,
}

impl CorpusSnapshot {
    pub fn build(chunks: Vec<Chunk>) -> Self {
        let chunks: Vec<Arc<Chunk>> = chunks.into_iter().map(Arc::new).collect();
        let tokens: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();

        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        for (index, chunk_tokens) in tokens.iter().enumerate() {
            let mut counts: HashMap<&str, u32> = HashMap::new();
            for token in chunk_tokens {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
            for (term, tf) in counts {
                postings.entry(term.to_string()).or_default().push((index, tf));
            }
        }
        // Postings in insertion order regardless of HashMap iteration.
        for entries in postings.values_mut() {
            entries.sort_unstable_by_key(|(index, _)| *index);
        }

        let total_len: usize = tokens.iter().map(Vec::len).sum();
        let avg_doc_len = if tokens.is_empty() {
            1.0
        } else {
            (total_len as f64 / tokens.len() as f64).max(1.0)
        };

        Self {
            chunks,
            tokens,
            postings,
            avg_doc_len,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    /// Okapi BM25 score of every chunk against the query terms. Dense
    /// output aligned with `chunks()`; non-matching chunks score 0.
    pub fn score_bm25(&self, terms: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.chunks.len()];
        let n = self.chunks.len() as f64;

        for term in terms {
            let Some(entries) = self.postings.get(term) else {
                continue;
            };
            let df = entries.len() as f64;
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();

            for &(index, tf) in entries {
                let tf = f64::from(tf);
                let doc_len = self.tokens[index].len() as f64;
                let denom = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len / self.avg_doc_len);
                scores[index] += idf * (tf * (BM25_K1 + 1.0)) / denom;
            }
        }

        scores
    }

    /// Token-overlap score of every chunk: shared-token count over chunk
    /// length. Total by construction, used when BM25 comes back empty.
    pub fn score_overlap(&self, terms: &[String]) -> Vec<f64> {
        let query_set: HashSet<&str> = terms.iter().map(String::as_str).collect();
        self.tokens
            .iter()
            .map(|chunk_tokens| {
                let common = chunk_tokens
                    .iter()
                    .filter(|token| query_set.contains(token.as_str()))
                    .count();
                common as f64 / chunk_tokens.len().max(1) as f64
            })
            .collect()
    }
}
