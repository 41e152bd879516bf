//! Reranking engine.
//!
//! Narrows the retrieval pool to the final top-k. Two paths:
//! - heuristic: token overlap against the candidate text, with the
//!   original retrieval score as a small tie-breaker;
//! - model-assisted (opt-in): ask the generation provider to pick ids,
//!   falling open to the heuristic on any failure. A failed judgment is
//!   a degradation, never an error to the caller.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::core::config::RerankConfig;
use crate::corpus::tokenize;
use crate::llm::{GenerationProvider, GenerationRequest};
use crate::search::Candidate;

/// Snippet budget for heuristic scoring.
const HEURISTIC_TEXT_CHARS: usize = 800;
/// Snippet budget per candidate in the judgment listing.
const LISTING_SNIPPET_CHARS: usize = 350;
/// Weight of the original retrieval score when breaking overlap ties.
const ORIGINAL_SCORE_WEIGHT: f64 = 0.001;

/// Which path produced the final ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankMode {
    /// Pool already fit in k; order untouched.
    Passthrough,
    Heuristic,
    Model,
}

/// The returned order is final: downstream consumes it as-is.
#[derive(Debug, Clone)]
pub struct RerankOutcome {
    pub candidates: Vec<Candidate>,
    pub mode: RerankMode,
}

pub struct Reranker {
    config: RerankConfig,
    /// Model used for judgments when the config does not override it.
    default_model: String,
    provider: Arc<dyn GenerationProvider>,
}

impl Reranker {
    pub fn new(
        config: RerankConfig,
        default_model: String,
        provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            config,
            default_model,
            provider,
        }
    }

    pub async fn select(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        k: usize,
    ) -> RerankOutcome {
        if candidates.len() <= k {
            return RerankOutcome {
                candidates,
                mode: RerankMode::Passthrough,
            };
        }

        if !self.config.enabled {
            return RerankOutcome {
                candidates: heuristic_rank(query, &candidates, k),
                mode: RerankMode::Heuristic,
            };
        }

        match self.model_rank(query, &candidates, k).await {
            Some(selected) => RerankOutcome {
                candidates: selected,
                mode: RerankMode::Model,
            },
            None => RerankOutcome {
                candidates: heuristic_rank(query, &candidates, k),
                mode: RerankMode::Heuristic,
            },
        }
    }

    async fn model_rank(
        &self,
        query: &str,
        candidates: &[Candidate],
        k: usize,
    ) -> Option<Vec<Candidate>> {
        let listing = build_listing(candidates, self.config.max_listed);
        let model_id = self
            .config
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let request = GenerationRequest {
            prompt: build_judgment_prompt(query, &listing, k),
            model_id,
            temperature: 0.0,
            top_p: 0.95,
            max_tokens: self.config.max_tokens,
        };

        let raw = match self.provider.generate(request).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("rerank judgment failed, using heuristic: {}", err);
                return None;
            }
        };

        let top_ids = parse_top_ids(&raw);
        if top_ids.is_empty() {
            tracing::debug!("rerank judgment had no usable ids; raw: {}", raw);
            return None;
        }

        let by_id: HashMap<u64, &Candidate> = candidates
            .iter()
            .map(|candidate| (candidate.chunk.id, candidate))
            .collect();

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for id in top_ids {
            if let Some(candidate) = by_id.get(&id) {
                if seen.insert(id) {
                    selected.push((*candidate).clone());
                }
            }
            if selected.len() >= k {
                break;
            }
        }

        if selected.is_empty() {
            return None;
        }
        Some(selected)
    }
}

/// Pure function of (query, candidates, k): identical inputs always give
/// the identical order.
fn heuristic_rank(query: &str, candidates: &[Candidate], k: usize) -> Vec<Candidate> {
    let query_set: HashSet<String> = tokenize(query).into_iter().collect();

    let mut scored: Vec<(f64, &Candidate)> = candidates
        .iter()
        .map(|candidate| {
            let text: String = candidate
                .chunk
                .text
                .chars()
                .take(HEURISTIC_TEXT_CHARS)
                .collect();
            let tokens = tokenize(&text);
            let common = tokens
                .iter()
                .filter(|token| query_set.contains(token.as_str()))
                .count();
            let overlap = common as f64 / tokens.len().max(1) as f64;
            (overlap + candidate.score * ORIGINAL_SCORE_WEIGHT, candidate)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored
        .into_iter()
        .take(k)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

fn build_listing(candidates: &[Candidate], max_listed: usize) -> String {
    candidates
        .iter()
        .take(max_listed)
        .enumerate()
        .map(|(i, candidate)| {
            let snippet: String = candidate
                .chunk
                .text
                .chars()
                .take(LISTING_SNIPPET_CHARS)
                .map(|c| if c == '\n' { ' ' } else { c })
                .collect();
            format!(
                "{}. id:{} source:\"{}\" score:{:.4}\n   snippet: \"{}\"",
                i + 1,
                candidate.chunk.id,
                candidate.chunk.source,
                candidate.score,
                snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_judgment_prompt(query: &str, listing: &str, k: usize) -> String {
    format!(
        "Você é um avaliador de relevância técnico. Com base na pergunta e nos trechos abaixo, \
escolha os até {k} IDs que melhor respondem a pergunta. Seja conservador: escolha apenas os \
trechos que realmente contêm informação relevante para responder a pergunta.\n\
RETORNE APENAS UM JSON VÁLIDO no formato:\n{{ \"topIds\": [<id>, ...] }}\n\n\
Pergunta:\n{query}\n\n\
Trechos (id, source, snippet):\n{listing}\n\n\
Observação: responda SOMENTE com o JSON (sem texto extra)."
    )
}

/// Extracts the chosen ids from a judgment response. Tries the first
/// `{`..last `}` as JSON, then a bare `[1, 2, 3]` array as a rescue.
/// Unparsable input yields an empty list.
fn parse_top_ids(raw: &str) -> Vec<u64> {
    static ID_ARRAY: OnceLock<Regex> = OnceLock::new();

    let json_part = match (raw.find('{'), raw.rfind('}')) {
        (Some(first), Some(last)) if last >= first => &raw[first..=last],
        _ => raw.trim(),
    };

    if let Ok(parsed) = serde_json::from_str::<Value>(json_part) {
        if let Some(ids) = parsed.get("topIds").and_then(Value::as_array) {
            return ids.iter().filter_map(value_as_id).collect();
        }
    }

    let id_array = ID_ARRAY
        .get_or_init(|| Regex::new(r"\[\s*([0-9,\s]*?)\s*\]").expect("static regex"));
    if let Some(captures) = id_array.captures(raw) {
        return captures[1]
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect();
    }

    Vec::new()
}

fn value_as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::GenerationError;
    use crate::corpus::Chunk;
    use async_trait::async_trait;

    fn candidate(id: u64, source: &str, text: &str, score: f64) -> Candidate {
        Candidate {
            chunk: Arc::new(Chunk {
                id,
                source: source.to_string(),
                text: text.to_string(),
                start: 0,
                end: text.len(),
                length: text.chars().count(),
            }),
            score,
        }
    }

    struct ScriptedProvider {
        response: Result<String, GenerationError>,
    }

    #[async_trait]
    impl GenerationProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            self.response.clone()
        }
    }

    fn reranker(enabled: bool, response: Result<String, GenerationError>) -> Reranker {
        Reranker::new(
            RerankConfig {
                enabled,
                ..RerankConfig::default()
            },
            "test-model".to_string(),
            Arc::new(ScriptedProvider { response }),
        )
    }

    fn pool() -> Vec<Candidate> {
        vec![
            candidate(1, "A.pdf", "emissão de boleto bancário no módulo financeiro", 2.0),
            candidate(2, "B.pdf", "para resetar a senha acesse o menu de configurações", 1.5),
            candidate(3, "C.pdf", "senha de administrador e senha de usuário comum", 1.0),
            candidate(4, "D.pdf", "cadastro de novos produtos no estoque", 0.5),
        ]
    }

    #[tokio::test]
    async fn small_pool_passes_through_unchanged() {
        let reranker = reranker(false, Ok(String::new()));
        let pool = vec![candidate(1, "A.pdf", "um", 1.0), candidate(2, "B.pdf", "dois", 0.5)];

        let outcome = reranker.select("pergunta", pool.clone(), 3).await;
        assert_eq!(outcome.mode, RerankMode::Passthrough);
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].chunk.id, 1);
        assert_eq!(outcome.candidates[1].chunk.id, 2);
    }

    #[tokio::test]
    async fn disabled_rerank_uses_heuristic() {
        let reranker = reranker(false, Ok(String::new()));

        let outcome = reranker.select("resetar senha", pool(), 2).await;
        assert_eq!(outcome.mode, RerankMode::Heuristic);
        assert_eq!(outcome.candidates.len(), 2);
        // Both overlap hits beat the zero-overlap chunks; repeated "senha"
        // occurrences push chunk 3 above chunk 2.
        let ids: Vec<u64> = outcome.candidates.iter().map(|c| c.chunk.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn heuristic_is_deterministic() {
        let reranker = reranker(false, Ok(String::new()));

        let first = reranker.select("resetar senha", pool(), 3).await;
        let second = reranker.select("resetar senha", pool(), 3).await;
        let first_ids: Vec<u64> = first.candidates.iter().map(|c| c.chunk.id).collect();
        let second_ids: Vec<u64> = second.candidates.iter().map(|c| c.chunk.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[tokio::test]
    async fn model_judgment_maps_ids_back() {
        let reranker = reranker(true, Ok(r#"{"topIds": [3, 99, 2]}"#.to_string()));

        let outcome = reranker.select("senha", pool(), 2).await;
        assert_eq!(outcome.mode, RerankMode::Model);
        let ids: Vec<u64> = outcome.candidates.iter().map(|c| c.chunk.id).collect();
        // 99 is unknown and gets ignored.
        assert_eq!(ids, vec![3, 2]);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_heuristic() {
        let reranker = reranker(true, Err(GenerationError::RateLimit));

        let outcome = reranker.select("resetar senha", pool(), 2).await;
        assert_eq!(outcome.mode, RerankMode::Heuristic);
        assert!(!outcome.candidates.is_empty());
    }

    #[tokio::test]
    async fn garbage_judgment_falls_back_to_heuristic() {
        let reranker = reranker(true, Ok("desculpe, não consigo escolher".to_string()));

        let outcome = reranker.select("resetar senha", pool(), 2).await;
        assert_eq!(outcome.mode, RerankMode::Heuristic);
    }

    #[test]
    fn parse_top_ids_accepts_wrapped_json() {
        let ids = parse_top_ids("claro! aqui está: {\"topIds\": [5, \"7\"]} espero ter ajudado");
        assert_eq!(ids, vec![5, 7]);
    }

    #[test]
    fn parse_top_ids_rescues_bare_array() {
        let ids = parse_top_ids("topIds: [1, 2,\n 3]");
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn parse_top_ids_rejects_garbage() {
        assert!(parse_top_ids("nenhum trecho é relevante").is_empty());
    }
}
