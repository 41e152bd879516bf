use serde::{Deserialize, Serialize};

/// The bounded answer contract: one short intro sentence, up to three
/// short steps, optional trailing remark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAnswer {
    pub intro: String,
    pub steps: Vec<String>,
    pub extra: String,
}

impl CanonicalAnswer {
    /// Flat presentation view. The structured shape is the single source
    /// of truth; this list is derived at the boundary and never stored.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if !self.intro.is_empty() {
            messages.push(self.intro.clone());
        }
        for (index, step) in self.steps.iter().enumerate() {
            messages.push(format!("{}. {}", index + 1, step));
        }
        if !self.extra.is_empty() {
            messages.push(self.extra.clone());
        }
        messages
    }
}

/// Which path produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    /// No relevant chunks at all.
    NotFound,
    /// Generation failed or came back blank; derived locally from the
    /// candidates, deterministically.
    LocalFallback,
    /// Parsed out of the model completion.
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedAnswer {
    pub answer: CanonicalAnswer,
    /// Bare document names, ≤ 3, first occurrence wins.
    pub sources: Vec<String>,
    pub origin: AnswerOrigin,
}
