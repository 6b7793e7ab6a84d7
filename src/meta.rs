//! Operator-facing response diagnostics.

use crate::types::ResponsePayload;

/// Separator placed between diagnostic segments.
const SEGMENT_SEPARATOR: &str = " • ";

/// Summarizes the bookkeeping fields of a chat response.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMetaFormatter;

impl ResponseMetaFormatter {
    /// Renders the present fields of `response` in a fixed order:
    /// persona, retrieved document count, context marker, token usage.
    ///
    /// Absent fields are left out entirely.  Token usage appears only when the
    /// total is non-zero.
    pub fn format(response: &ResponsePayload) -> String {
        let mut parts = Vec::new();
        if let Some(character) = response.character.as_deref().filter(|c| !c.is_empty()) {
            parts.push(format!("Character: {character}"));
        }
        if let Some(count) = response.retrieved_docs_count {
            parts.push(format!("Docs: {count}"));
        }
        if response.context_used == Some(true) {
            parts.push("Used RAG context".to_string());
        }
        if let Some(usage) = response.usage
            && let Some(total) = usage.total_tokens.filter(|t| *t != 0)
        {
            let mut tokens = Vec::with_capacity(3);
            if let Some(prompt) = usage.prompt_tokens.filter(|t| *t != 0) {
                tokens.push(format!("P:{prompt}"));
            }
            if let Some(completion) = usage.completion_tokens.filter(|t| *t != 0) {
                tokens.push(format!("C:{completion}"));
            }
            tokens.push(format!("T:{total}"));
            parts.push(format!("Tokens {}", tokens.join(" / ")));
        }
        parts.join(SEGMENT_SEPARATOR)
    }
}
