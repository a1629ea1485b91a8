//! Context window assembly from ranked chunks.

use super::types::RankedResult;

const SEPARATOR: &str = "\n\n";

/// Join the texts of the first `top_k` results with blank lines and cap the result at
/// `max_chars` characters.
///
/// Truncation is a hard cut on a character boundary. An empty ranking yields an empty string.
pub fn assemble(ranked: &[RankedResult], top_k: usize, max_chars: usize) -> String {
    let mut context = ranked
        .iter()
        .take(top_k)
        .map(|result| result.chunk_text.as_str())
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    if let Some((byte_idx, _)) = context.char_indices().nth(max_chars) {
        context.truncate(byte_idx);
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(texts: &[&str]) -> Vec<RankedResult> {
        texts
            .iter()
            .enumerate()
            .map(|(idx, text)| RankedResult {
                chunk_text: text.to_string(),
                score: 1.0 - idx as f32 * 0.1,
            })
            .collect()
    }

    #[test]
    fn joins_top_k_with_blank_lines() {
        let context = assemble(&results(&["a", "b", "c"]), 2, 100);
        assert_eq!(context, "a\n\nb");
    }

    #[test]
    fn truncates_to_character_budget() {
        let context = assemble(&results(&["abcdef", "ghi"]), 5, 4);
        assert_eq!(context, "abcd");
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        let context = assemble(&results(&["ééééé"]), 1, 3);
        assert_eq!(context, "ééé");
    }

    #[test]
    fn short_context_is_untouched() {
        assert_eq!(assemble(&results(&["short"]), 5, 1_000), "short");
    }

    #[test]
    fn empty_ranking_yields_empty_context() {
        assert_eq!(assemble(&[], 5, 100), "");
    }
}
