//! Summary-style questions ("summarize …", "overview …", "key points …").
//!
//! These are answered from a condensed version of the whole document rather than from the
//! top-k retrieved chunks, because no single passage is relevant to them.

const SUMMARY_PREFIXES: &[&str] = &["summarize", "summarise", "overview", "key points"];

/// Whether `question` asks for a summary of the document.
pub fn is_summary_request(question: &str) -> bool {
    let lower = question.trim_start().to_lowercase();
    SUMMARY_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Join per-passage summaries, skipping blanks and sentinel replies.
pub(crate) fn merge_summaries(parts: impl IntoIterator<Item = String>, sentinel: &str) -> String {
    parts
        .into_iter()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty() && part != sentinel)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_summary_prefixes() {
        assert!(is_summary_request("Summarize the policy"));
        assert!(is_summary_request("  overview of benefits"));
        assert!(is_summary_request("Key points please"));
        assert!(!is_summary_request("What is the summary period?"));
        assert!(!is_summary_request("Give me key points"));
    }

    #[test]
    fn merge_skips_blank_and_sentinel_parts() {
        let merged = merge_summaries(
            vec![" A. ".to_string(), String::new(), "N/A".into(), "B.".into()],
            "N/A",
        );
        assert_eq!(merged, "A. B.");
    }
}
