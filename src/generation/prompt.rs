//! Prompt templates for grounded answers and document summaries.

use super::SENTINEL_ANSWER;

/// Word budget requested from the model when condensing passages.
pub const DEFAULT_SUMMARY_WORDS: usize = 100;

/// Configurable grounded prompt: instruction set, context block and question.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    instructions: Vec<String>,
    summary_words: usize,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            instructions: vec![
                "Answer strictly based on the context above.".into(),
                "Be concise: answer in one or two sentences.".into(),
                "Write numbers as digits, not words.".into(),
                format!("If the answer is not in the context, reply exactly \"{SENTINEL_ANSWER}\""),
                "Do not add information that is not in the context.".into(),
            ],
            summary_words: DEFAULT_SUMMARY_WORDS,
        }
    }
}

impl PromptTemplate {
    /// Template with an explicit instruction list.
    pub fn new(instructions: Vec<String>, summary_words: usize) -> Self {
        Self {
            instructions,
            summary_words: summary_words.max(1),
        }
    }

    /// Render the grounded question-answering prompt.
    pub fn render_answer(&self, question: &str, context: &str) -> String {
        let mut prompt = String::with_capacity(context.len() + question.len() + 512);
        prompt.push_str("Context:\n");
        prompt.push_str(context);
        prompt.push_str("\n\nInstructions:\n");
        for instruction in &self.instructions {
            prompt.push_str("- ");
            prompt.push_str(instruction);
            prompt.push('\n');
        }
        prompt.push_str("\nQuestion: ");
        prompt.push_str(question.trim());
        prompt.push('\n');
        prompt
    }

    /// Render the prompt used to condense one passage.
    pub fn render_summary(&self, passage: &str) -> String {
        format!(
            "Summarize the following text concisely in {} words or less:\n{}",
            self.summary_words, passage
        )
    }

    /// Render the prompt answering a summary-style request from a condensed summary.
    pub fn render_summary_answer(&self, request: &str, summary: &str) -> String {
        format!(
            "{} the following text concisely in {} words or less. Use digits for numbers.\n\
             Text:\n{}",
            capitalize(request.trim()),
            self.summary_words,
            summary
        )
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
