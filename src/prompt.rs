//! Prompt construction for answer generation.
//!
//! Pure function of the question and the final passages; the pipeline
//! only consumes the resulting string.

use crate::search::Candidate;

/// Passages included in the context block.
const MAX_PASSAGES: usize = 3;
/// Per-passage character clip.
const PASSAGE_CHARS: usize = 900;

const SYSTEM_PROMPT: &str = "\
Você é um assistente de suporte técnico da empresa. Seja cordial, prático e direto.
Responda em português claro, como se fosse um atendente paciente que fala com alguém sem conhecimento técnico.
Sempre baseie sua resposta apenas nas informações fornecidas abaixo (NÃO INVENTE NADA).
Se a informação não estiver nos trechos, diga educadamente que não encontrou a informação e sugira próximos passos.";

pub fn build_prompt(query: &str, passages: &[Candidate]) -> String {
    let context = passages
        .iter()
        .take(MAX_PASSAGES)
        .enumerate()
        .map(|(i, passage)| {
            let text: String = passage.chunk.text.chars().take(PASSAGE_CHARS).collect();
            format!(
                "--- Trecho {} (fonte: {}) ---\n{}",
                i + 1,
                passage.chunk.source,
                text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{SYSTEM_PROMPT}\n\n\
Contexto extraído dos manuais (apenas os trechos abaixo):\n{context}\n\n\
Pergunta do usuário:\n{query}\n\n\
Instruções (LÊ E SEGUE À RISCA):\n\
1) RESPONDA APENAS EM PORTUGUÊS.\n\
2) RETORNE SOMENTE UM JSON VÁLIDO (SEM TEXTO EXTRA) com exatamente os campos:\n\
   {{\n\
     \"answer\": {{\n\
       \"intro\": \"<uma frase-resumo, máx 18 palavras>\",\n\
       \"steps\": [\"<até 3 passos curtos>\"],\n\
       \"extra\": \"<observação opcional>\"\n\
     }},\n\
     \"sources\": [\"NOME_DO_MANUAL.pdf\"]\n\
   }}\n\
3) Use APENAS as informações dos trechos fornecidos.\n\
4) \"sources\" deve listar só os nomes dos manuais (no máximo 3), sem caminhos.\n\
5) NÃO inclua trechos brutos no JSON; apenas o resumo, os passos e a lista de fontes.\n\n\
Pronto: retorne só o JSON."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Chunk;
    use std::sync::Arc;

    fn candidate(source: &str, text: &str) -> Candidate {
        Candidate {
            chunk: Arc::new(Chunk {
                id: 1,
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
    fn includes_question_and_labelled_passages() {
        let prompt = build_prompt(
            "como resetar a senha?",
            &[candidate("A.pdf", "Texto do manual."), candidate("B.pdf", "Outro texto.")],
        );

        assert!(prompt.contains("como resetar a senha?"));
        assert!(prompt.contains("Trecho 1 (fonte: A.pdf)"));
        assert!(prompt.contains("Trecho 2 (fonte: B.pdf)"));
    }

    #[test]
    fn caps_passages_at_three() {
        let passages: Vec<Candidate> = (0..5)
            .map(|i| candidate(&format!("M{i}.pdf"), "texto"))
            .collect();

        let prompt = build_prompt("pergunta", &passages);
        assert!(prompt.contains("Trecho 3"));
        assert!(!prompt.contains("Trecho 4"));
    }
}
