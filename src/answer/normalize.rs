//! Normalization of generated output.
//!
//! The parser is an ordered chain of strategies, first success wins:
//! 1. no candidates → fixed "not found" answer
//! 2. failed/blank generation → deterministic derivation from candidates
//! 3. strict structured parse (first `{` .. last `}`)
//! 4. paragraph/bullet heuristic over flat text
//! 5. sentence extraction from candidates when no steps were derived
//!
//! Post-processing caps and dedup run on every path, so the answer shape
//! is bounded no matter which strategy produced it.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::search::Candidate;
use super::types::{AnswerOrigin, CanonicalAnswer, NormalizedAnswer};

const NOT_FOUND_INTRO: &str = "Não encontrei nada nos manuais relacionado a essa pergunta.";

const MAX_STEPS: usize = 3;
const MAX_SOURCES: usize = 3;
const INTRO_HARD_CAP_CHARS: usize = 1200;
const INTRO_SOFT_CAP_WORDS: usize = 18;
/// Used when a candidate has no extractable sentence.
const LEAD_FALLBACK_CHARS: usize = 140;

fn paragraph_split() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("static regex"))
}

fn step_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:\d{1,3}[.)]|[-•])\s+").expect("static regex"))
}

fn lead_sentence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 20-220 chars ending in terminal punctuation.
    RE.get_or_init(|| Regex::new(r"(?s)^\s*(.{19,219}?[.!?…])(?:\s|$)").expect("static regex"))
}

fn first_sentence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^\s*(.*?[.!?…])(?:\s|$)").expect("static regex"))
}

fn manual_filename() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // All-caps token sequence ending in a document extension, the shape
    // raw manual references take inside chunk text.
    RE.get_or_init(|| {
        Regex::new(r"[\p{Lu}\d][\p{Lu}\d_\-]{2,}\.(?i:pdf|docx?|txt|md)\b").expect("static regex")
    })
}

/// Normalizes raw generated output (or its absence) into the canonical
/// answer. Total: never fails, and for a failed generation the result is
/// a pure function of the candidates — repeated calls are byte-identical.
pub fn normalize(raw: Option<&str>, candidates: &[Candidate]) -> NormalizedAnswer {
    if candidates.is_empty() {
        return NormalizedAnswer {
            answer: CanonicalAnswer {
                intro: NOT_FOUND_INTRO.to_string(),
                steps: Vec::new(),
                extra: String::new(),
            },
            sources: Vec::new(),
            origin: AnswerOrigin::NotFound,
        };
    }

    let mut declared_sources: Vec<String> = Vec::new();
    let (mut draft, origin) = match raw.map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => (
            parse_generated(text, &mut declared_sources),
            AnswerOrigin::Generated,
        ),
        None => (CanonicalAnswer::default(), AnswerOrigin::LocalFallback),
    };

    if draft.steps.is_empty() {
        sentence_fallback(candidates, &mut draft);
    }

    finalize(&mut draft);

    let sources = if declared_sources.is_empty() {
        dedup_sources(candidates.iter().map(|c| c.chunk.source.clone()))
    } else {
        dedup_sources(declared_sources)
    };

    NormalizedAnswer {
        answer: draft,
        sources,
        origin,
    }
}

/// Strategies 3 and 4, in order.
fn parse_generated(raw: &str, declared_sources: &mut Vec<String>) -> CanonicalAnswer {
    if let Some(value) = extract_json_object(raw) {
        collect_declared_sources(&value, declared_sources);

        if let Some(structured) = structured_answer(&value) {
            return structured;
        }
        if let Some(flat) = flat_answer_text(&value) {
            return paragraph_heuristic(&flat);
        }
    }

    paragraph_heuristic(raw)
}

fn extract_json_object(raw: &str) -> Option<Value> {
    let first = raw.find('{')?;
    let last = raw.rfind('}')?;
    if last < first {
        return None;
    }
    serde_json::from_str::<Value>(&raw[first..=last])
        .ok()
        .filter(Value::is_object)
}

fn collect_declared_sources(value: &Value, declared: &mut Vec<String>) {
    if let Some(sources) = value.get("sources").and_then(Value::as_array) {
        declared.extend(
            sources
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string),
        );
    }
}

/// Nested `answer` object carrying any of the canonical fields.
fn structured_answer(value: &Value) -> Option<CanonicalAnswer> {
    let answer = value.get("answer")?.as_object()?;
    if !["intro", "steps", "extra"]
        .iter()
        .any(|key| answer.contains_key(*key))
    {
        return None;
    }

    let steps = answer
        .get("steps")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|step| step.trim().to_string())
                .filter(|step| !step.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Some(CanonicalAnswer {
        intro: string_field(answer.get("intro")),
        steps,
        extra: string_field(answer.get("extra")),
    })
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Flat `answer` string or `messages` list, handed back to the
/// paragraph heuristic as plain text.
fn flat_answer_text(value: &Value) -> Option<String> {
    if let Some(text) = value.get("answer").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.to_string());
        }
    }

    if let Some(messages) = value.get("messages").and_then(Value::as_array) {
        let joined = messages
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        if !joined.is_empty() {
            return Some(joined);
        }
    }

    None
}

/// Strategy 4: blank-line paragraphs; first becomes the intro, marker
/// and multi-line paragraphs become steps, the rest accumulates as extra.
fn paragraph_heuristic(text: &str) -> CanonicalAnswer {
    let mut answer = CanonicalAnswer::default();
    let mut extras: Vec<&str> = Vec::new();

    let mut paragraphs = paragraph_split()
        .split(text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty());

    answer.intro = paragraphs.next().unwrap_or_default().to_string();

    for paragraph in paragraphs {
        if step_marker().is_match(paragraph) {
            for line in paragraph.lines() {
                let step = step_marker().replace(line, "");
                let step = step.trim();
                if !step.is_empty() {
                    answer.steps.push(step.to_string());
                }
            }
        } else if paragraph.lines().filter(|line| !line.trim().is_empty()).count() > 1 {
            for line in paragraph.lines() {
                let line = line.trim();
                if !line.is_empty() {
                    answer.steps.push(line.to_string());
                }
            }
        } else {
            extras.push(paragraph);
        }
    }

    answer.extra = extras.join(" ");
    answer
}

/// Strategy 5: one lead sentence per candidate becomes a step; the first
/// one is promoted to intro when the intro is still empty.
fn sentence_fallback(candidates: &[Candidate], draft: &mut CanonicalAnswer) {
    let mut steps: Vec<String> = candidates
        .iter()
        .take(MAX_STEPS)
        .filter_map(|candidate| extract_lead_sentence(&candidate.chunk.text))
        .collect();

    if draft.intro.trim().is_empty() && !steps.is_empty() {
        draft.intro = steps.remove(0);
    }
    draft.steps = steps;
}

fn extract_lead_sentence(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(captures) = lead_sentence().captures(text) {
        return Some(captures[1].trim().to_string());
    }

    let clipped: String = text.chars().take(LEAD_FALLBACK_CHARS).collect();
    Some(clipped.trim().to_string())
}

/// Bounds applied on every path.
fn finalize(answer: &mut CanonicalAnswer) {
    answer.intro = answer.intro.trim().to_string();
    answer.extra = answer.extra.trim().to_string();
    answer.intro = cap_chars(&answer.intro, INTRO_HARD_CAP_CHARS);

    let mut seen = HashSet::new();
    let mut steps = Vec::new();
    for step in answer.steps.drain(..) {
        let step = step.trim().to_string();
        if step.is_empty() {
            continue;
        }
        if seen.insert(step.to_lowercase()) {
            steps.push(step);
        }
        if steps.len() == MAX_STEPS {
            break;
        }
    }
    answer.steps = steps;

    // Steps without an intro would break the contract; promote.
    if answer.intro.is_empty() && !answer.steps.is_empty() {
        answer.intro = answer.steps.remove(0);
    }

    answer.intro = clip_source_leak(&answer.intro);
    for step in &mut answer.steps {
        *step = clip_source_leak(step);
    }

    answer.intro = cap_words(&answer.intro, INTRO_SOFT_CAP_WORDS);
}

/// A fragment embedding a raw manual filename is cut to its first
/// sentence so chunk text does not leak through verbatim.
fn clip_source_leak(fragment: &str) -> String {
    if !manual_filename().is_match(fragment) {
        return fragment.to_string();
    }

    match first_sentence().captures(fragment) {
        Some(captures) => captures[1].trim().to_string(),
        None => fragment.to_string(),
    }
}

fn cap_chars(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }
    let clipped: String = text.chars().take(cap).collect();
    format!("{}...", clipped.trim_end())
}

fn cap_words(text: &str, cap: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= cap {
        return text.to_string();
    }
    format!("{}...", words[..cap].join(" "))
}

fn dedup_sources<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for name in names {
        let bare = strip_path(name.trim());
        if bare.is_empty() {
            continue;
        }
        if seen.insert(bare.to_lowercase()) {
            sources.push(bare.to_string());
        }
        if sources.len() == MAX_SOURCES {
            break;
        }
    }
    sources
}

fn strip_path(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Chunk;
    use std::sync::Arc;

    fn candidate(id: u64, source: &str, text: &str) -> Candidate {
        Candidate {
            chunk: Arc::new(Chunk {
                id,
                source: source.to_string(),
                text: text.to_string(),
                start: 0,
                end: text.len(),
                length: text.chars().count(),
            }),
            score: 1.0,
        }
    }

    #[test]
    fn empty_candidates_give_fixed_not_found() {
        let result = normalize(Some("qualquer coisa"), &[]);
        assert_eq!(result.origin, AnswerOrigin::NotFound);
        assert_eq!(result.answer.intro, NOT_FOUND_INTRO);
        assert!(result.answer.steps.is_empty());
        assert!(result.answer.extra.is_empty());
        assert!(result.sources.is_empty());
    }

    #[test]
    fn failed_generation_derives_from_candidates() {
        let candidates = vec![candidate(
            1,
            "A.pdf",
            "Para resetar a senha, clique em Configurações. Depois confirme a nova senha.",
        )];

        let result = normalize(None, &candidates);
        assert_eq!(result.origin, AnswerOrigin::LocalFallback);
        assert_eq!(
            result.answer.intro,
            "Para resetar a senha, clique em Configurações."
        );
        assert_eq!(result.sources, vec!["A.pdf"]);
    }

    #[test]
    fn deterministic_fallback_is_byte_identical() {
        let candidates = vec![
            candidate(1, "A.pdf", "Abra o menu Fiscal e selecione Notas. Em seguida clique em Emitir."),
            candidate(2, "B.pdf", "Confira o certificado digital antes de transmitir o arquivo."),
        ];

        let first = normalize(None, &candidates);
        let second = normalize(None, &candidates);
        assert_eq!(first, second);
    }

    #[test]
    fn blank_generation_counts_as_failed() {
        let candidates = vec![candidate(
            1,
            "A.pdf",
            "Verifique a conexão com a impressora antes de reimprimir o cupom.",
        )];

        let result = normalize(Some("   \n  "), &candidates);
        assert_eq!(result.origin, AnswerOrigin::LocalFallback);
        assert!(!result.answer.intro.is_empty());
    }

    #[test]
    fn structured_answer_is_adopted() {
        let raw = r#"Aqui está:
{"answer": {"intro": "Reinicie o serviço.", "steps": ["Abra o painel", "Clique em reiniciar"], "extra": "Aguarde um minuto."}, "sources": ["MANUAL_ADMIN.pdf"]}"#;
        let candidates = vec![candidate(1, "B.pdf", "texto do trecho de apoio aqui.")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.origin, AnswerOrigin::Generated);
        assert_eq!(result.answer.intro, "Reinicie o serviço.");
        assert_eq!(result.answer.steps, vec!["Abra o painel", "Clique em reiniciar"]);
        assert_eq!(result.answer.extra, "Aguarde um minuto.");
        assert_eq!(result.sources, vec!["MANUAL_ADMIN.pdf"]);
    }

    #[test]
    fn flat_answer_goes_through_paragraph_heuristic() {
        let raw = r#"{"answer": "Resumo curto.\n\n1. Primeiro passo\n2. Segundo passo"}"#;
        let candidates = vec![candidate(1, "A.pdf", "apoio")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.answer.intro, "Resumo curto.");
        assert_eq!(result.answer.steps, vec!["Primeiro passo", "Segundo passo"]);
    }

    #[test]
    fn plain_text_with_numbered_list() {
        let raw = "Resumo curto.\n\n1. Primeiro passo\n2. Segundo passo";
        let candidates = vec![candidate(1, "A.pdf", "apoio")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.answer.intro, "Resumo curto.");
        assert_eq!(result.answer.steps, vec!["Primeiro passo", "Segundo passo"]);
    }

    #[test]
    fn bulleted_and_parenthesis_markers_are_stripped() {
        let raw = "Resumo.\n\n- item um\n• item dois\n\n3) item três";
        let candidates = vec![candidate(1, "A.pdf", "apoio")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.answer.steps, vec!["item um", "item dois", "item três"]);
    }

    #[test]
    fn single_paragraphs_accumulate_into_extra() {
        let raw = "Resumo.\n\nObservação importante.\n\nOutra nota.";
        let candidates = vec![candidate(1, "A.pdf", "apoio com passos. e mais texto para extrair depois.")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.answer.extra, "Observação importante. Outra nota.");
    }

    #[test]
    fn messages_list_is_treated_as_paragraphs() {
        let raw = r#"{"messages": ["Resumo da resposta.", "1. Passo um\n2. Passo dois"]}"#;
        let candidates = vec![candidate(1, "A.pdf", "apoio")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.answer.intro, "Resumo da resposta.");
        assert_eq!(result.answer.steps, vec!["Passo um", "Passo dois"]);
    }

    #[test]
    fn garbage_text_still_normalizes() {
        let raw = "}{ ;;; ###";
        let candidates = vec![candidate(1, "A.pdf", "apoio com frase longa o bastante para virar passo.")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.origin, AnswerOrigin::Generated);
        assert!(!result.answer.intro.is_empty());
    }

    #[test]
    fn steps_are_capped_and_deduplicated() {
        let raw = "Resumo.\n\n1. Passo\n2. passo\n3. Outro\n4. Mais um\n5. Quinto";
        let candidates = vec![candidate(1, "A.pdf", "apoio")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.answer.steps, vec!["Passo", "Outro", "Mais um"]);
    }

    #[test]
    fn long_intro_is_word_capped() {
        let long = "uma palavra repetida ".repeat(20);
        let candidates = vec![candidate(1, "A.pdf", "apoio")];

        let result = normalize(Some(&long), &candidates);
        let words = result.answer.intro.split_whitespace().count();
        assert!(words <= INTRO_SOFT_CAP_WORDS + 1);
        assert!(result.answer.intro.ends_with("..."));
    }

    #[test]
    fn embedded_filename_clips_to_first_sentence() {
        let raw = "Consulte a seção três. Conforme MANUAL_FISCAL.pdf página 12 o resto segue igual";
        let candidates = vec![candidate(1, "A.pdf", "apoio")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.answer.intro, "Consulte a seção três.");
    }

    #[test]
    fn declared_sources_win_over_candidates() {
        let raw = r#"{"answer": {"intro": "Ok."}, "sources": ["docs/MANUAL_A.pdf", "MANUAL_A.PDF", "MANUAL_B.pdf", "MANUAL_C.pdf"]}"#;
        let candidates = vec![candidate(1, "OUTRO.pdf", "apoio")];

        let result = normalize(Some(raw), &candidates);
        // Path stripped, case-insensitive dedup, capped at three.
        assert_eq!(result.sources, vec!["MANUAL_A.pdf", "MANUAL_B.pdf", "MANUAL_C.pdf"]);
    }

    #[test]
    fn candidate_sources_deduplicate_preserving_order() {
        let candidates = vec![
            candidate(1, "B.pdf", "primeiro trecho de apoio com frase completa aqui."),
            candidate(2, "A.pdf", "segundo trecho de apoio com frase completa aqui."),
            candidate(3, "b.pdf", "terceiro trecho de apoio com frase completa aqui."),
        ];

        let result = normalize(None, &candidates);
        assert_eq!(result.sources, vec!["B.pdf", "A.pdf"]);
    }

    #[test]
    fn steps_imply_intro() {
        let raw = r#"{"answer": {"steps": ["Abra o menu de relatórios", "Exporte o arquivo"]}}"#;
        let candidates = vec![candidate(1, "A.pdf", "apoio")];

        let result = normalize(Some(raw), &candidates);
        assert_eq!(result.answer.intro, "Abra o menu de relatórios");
        assert_eq!(result.answer.steps, vec!["Exporte o arquivo"]);
    }

    #[test]
    fn short_chunk_uses_char_clip() {
        let candidates = vec![candidate(1, "A.pdf", "sem pontuação terminal nenhuma")];

        let result = normalize(None, &candidates);
        assert_eq!(result.answer.intro, "sem pontuação terminal nenhuma");
    }

    #[test]
    fn messages_view_numbers_steps() {
        let answer = CanonicalAnswer {
            intro: "Resumo.".to_string(),
            steps: vec!["um".to_string(), "dois".to_string()],
            extra: "nota".to_string(),
        };
        assert_eq!(answer.messages(), vec!["Resumo.", "1. um", "2. dois", "nota"]);
    }
}
