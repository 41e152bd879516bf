//! Candidate reranking.

mod engine;

pub use engine::{RerankMode, RerankOutcome, Reranker};
