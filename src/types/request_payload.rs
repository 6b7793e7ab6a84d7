use serde::{Deserialize, Serialize};

/// Body of `POST /chat/`.
///
/// Optional fields are omitted, not null, when the server default applies.
/// `session_id` is always sent and is `null` before the first response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestPayload {
    /// Response language.
    pub lang: String,

    /// The operator's question.
    pub query: String,

    /// Session to continue, if one exists.
    pub session_id: Option<String>,

    /// Number of documents to retrieve.
    pub k: i64,

    /// Sampling temperature.
    pub temperature: f64,

    /// Interviewer persona.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,

    /// Custom system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Model override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}
