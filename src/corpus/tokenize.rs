/// Lexical tokenizer shared by indexing, retrieval and reranking.
///
/// Lowercases, drops punctuation while keeping accented letters, and
/// splits on whitespace. Both queries and chunk text go through here so
/// the two sides always agree on token boundaries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        let tokens = tokenize("Clique em Configurações, depois SALVAR!");
        assert_eq!(tokens, vec!["clique", "em", "configurações", "depois", "salvar"]);
    }

    #[test]
    fn keeps_accented_letters() {
        let tokens = tokenize("conexão já está ativa");
        assert_eq!(tokens, vec!["conexão", "já", "está", "ativa"]);
    }

    #[test]
    fn collapses_whitespace_and_empties() {
        assert!(tokenize("  \n\t ...  ").is_empty());
        assert_eq!(tokenize("a  -  b"), vec!["a", "b"]);
    }
}
