use serde::{Deserialize, Serialize};

use crate::types::Usage;

/// Success body of `POST /chat/`.
///
/// Every field may be absent or null; the controller supplies fallbacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponsePayload {
    /// The assistant's answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Session the answer belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Persona the server answered as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,

    /// How many documents retrieval returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_docs_count: Option<i64>,

    /// Whether retrieved context made it into the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_used: Option<bool>,

    /// Token accounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ResponsePayload {
    /// Creates a response carrying `response` and `session_id`.
    pub fn new(response: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    /// Sets the persona.
    pub fn with_character(mut self, character: impl Into<String>) -> Self {
        self.character = Some(character.into());
        self
    }

    /// Sets the retrieved document count.
    pub fn with_retrieved_docs_count(mut self, count: i64) -> Self {
        self.retrieved_docs_count = Some(count);
        self
    }

    /// Sets whether context was used.
    pub fn with_context_used(mut self, context_used: bool) -> Self {
        self.context_used = Some(context_used);
        self
    }

    /// Sets the token usage.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}
