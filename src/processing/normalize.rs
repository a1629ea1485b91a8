//! Answer clean-up: strip LLM boilerplate and turn number words into digits.
//!
//! Best effort only. Every step is a regex rewrite that leaves unmatched text alone, so the
//! function cannot fail on arbitrary input.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENUMERATOR: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d+\.\s+"));
static BOLD_STARS: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\*(.*?)\*\*"));
static BOLD_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| compile(r"__(.*?)__"));
static DECIMAL_CITATION: LazyLock<Regex> = LazyLock::new(|| compile(r"\(\d+\.\d+\)"));
static BULLET: LazyLock<Regex> = LazyLock::new(|| compile(r"^[-*•]\s+"));
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| compile(r"[ \t]{2,}"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> = LazyLock::new(|| compile(r"[ \t]+([.,;:!?])"));

/// Phrases stripped from the start of an answer, in this order, each at most once.
const PREAMBLES: &[&str] = &[
    "based on the document,",
    "based on the context,",
    "based on the policy,",
    "according to the document,",
    "according to the policy,",
    "according to the context,",
    "the answer is:",
    "answer:",
];

const UNITS: &[(&str, u32)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
];

const TENS: &[(&str, u32)] = &[
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
];

const SCALES: &[(&str, u32)] = &[("hundred", 100), ("thousand", 1_000), ("million", 1_000_000)];

static COMPOUND_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    let tens = alternation(TENS);
    let ones = alternation(&UNITS[1..10]);
    compile(&format!(r"(?i)\b({tens})-({ones})\b"))
});

static NUMBER_WORD: LazyLock<Regex> = LazyLock::new(|| {
    let words = [alternation(UNITS), alternation(TENS), alternation(SCALES)].join("|");
    compile(&format!(r"(?i)\b({words})\b"))
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("normalizer pattern is valid")
}

fn alternation(table: &[(&str, u32)]) -> String {
    table
        .iter()
        .map(|(word, _)| *word)
        .collect::<Vec<_>>()
        .join("|")
}

fn value_of(word: &str) -> Option<u32> {
    let lower = word.to_lowercase();
    UNITS
        .iter()
        .chain(TENS)
        .chain(SCALES)
        .find(|(name, _)| *name == lower)
        .map(|(_, value)| *value)
}

/// Clean a raw model answer.
///
/// Steps, in order: trim; drop a leading `"1. "` enumerator; unwrap `**bold**`/`__bold__`;
/// remove `(12.3)`-style citations; drop one leading bullet; drop known preambles at the
/// start; tidy whitespace; replace number words with digits.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    text = ENUMERATOR.replace(&text, "").into_owned();
    text = BOLD_STARS.replace_all(&text, "$1").into_owned();
    text = BOLD_UNDERSCORES.replace_all(&text, "$1").into_owned();
    text = DECIMAL_CITATION.replace_all(&text, "").into_owned();
    text = BULLET.replace(text.trim_start(), "").into_owned();
    text = strip_preambles(&text);
    text = SPACE_RUNS.replace_all(&text, " ").into_owned();
    text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1").into_owned();
    words_to_digits(text.trim())
}

fn strip_preambles(text: &str) -> String {
    let mut rest = text.trim_start();
    for preamble in PREAMBLES {
        if starts_with_ignore_case(rest, preamble) {
            rest = rest[preamble.len()..].trim_start();
        }
    }
    rest.to_string()
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Replace whole-word number words (and hyphenated compounds such as `thirty-six`) with digits.
pub fn words_to_digits(text: &str) -> String {
    let compounds = COMPOUND_NUMBER.replace_all(text, |caps: &Captures| {
        match (value_of(&caps[1]), value_of(&caps[2])) {
            (Some(tens), Some(ones)) => (tens + ones).to_string(),
            _ => caps[0].to_string(),
        }
    });
    NUMBER_WORD
        .replace_all(&compounds, |caps: &Captures| {
            value_of(&caps[1]).map_or_else(|| caps[0].to_string(), |value| value.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_example() {
        assert_eq!(normalize("1. **Thirty-six** days (12.3)"), "36 days");
    }

    #[test]
    fn strips_preambles_case_insensitively() {
        assert_eq!(normalize("The answer is: thirty days."), "30 days.");
        assert_eq!(
            normalize("BASED ON THE DOCUMENT, claims take ninety days."),
            "claims take 90 days."
        );
        assert_eq!(
            normalize("According to the policy, the limit is two."),
            "the limit is 2."
        );
    }

    #[test]
    fn preamble_is_only_removed_at_start() {
        assert_eq!(
            normalize("It is ten days, based on the document, as stated."),
            "It is 10 days, based on the document, as stated."
        );
    }

    #[test]
    fn leading_decimals_are_not_enumerators() {
        assert_eq!(normalize("2.5 lakh per year"), "2.5 lakh per year");
        assert_eq!(normalize("3. 2.5 lakh"), "2.5 lakh");
    }

    #[test]
    fn strips_leading_bullet_once() {
        assert_eq!(normalize("- - five"), "- 5");
        assert_eq!(normalize("* twelve months"), "12 months");
    }

    #[test]
    fn keeps_words_containing_number_words() {
        assert_eq!(normalize("money is gone"), "money is gone");
        assert_eq!(normalize("Someone often weighs tension"), "Someone often weighs tension");
    }

    #[test]
    fn converts_scales_and_compounds() {
        assert_eq!(words_to_digits("Twenty-Four hours"), "24 hours");
        assert_eq!(words_to_digits("one hundred"), "1 100");
        assert_eq!(words_to_digits("a million thanks"), "a 1000000 thanks");
        assert_eq!(words_to_digits("eighty-one and fifty"), "81 and 50");
    }

    #[test]
    fn removes_citations_and_tidies_spacing() {
        assert_eq!(
            normalize("Covered up to 2 years (4.1) and more (7.25)."),
            "Covered up to 2 years and more."
        );
    }

    #[test]
    fn unwraps_emphasis() {
        assert_eq!(normalize("__Yes__, **thirty** days"), "Yes, 30 days");
    }

    #[test]
    fn blank_and_plain_inputs_survive() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("Not found in document."), "Not found in document.");
    }

    #[test]
    fn normalization_is_idempotent_on_canonical_text() {
        for input in [
            "36 days",
            "Not found in document.",
            "Claims must be filed within 90 days of the event.",
            "The premium is paid yearly.",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn handles_unicode_without_panicking() {
        assert_eq!(normalize("— één (1.2) ✓"), "— één ✓");
        assert_eq!(normalize("ü"), "ü");
    }
}
