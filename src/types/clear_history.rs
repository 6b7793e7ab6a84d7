use serde::{Deserialize, Serialize};

/// Value of `status` the backend uses to acknowledge a cleared history.
pub const CLEAR_SUCCESS_STATUS: &str = "success";

/// Body of `POST /chat/clear`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearHistoryRequest {
    /// Session whose server-side history should be dropped.
    pub session_id: String,
}

impl ClearHistoryRequest {
    /// Creates a request for `session_id`.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

/// Reply to `POST /chat/clear`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearHistoryResponse {
    /// `"success"` when the history was dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Error text otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClearHistoryResponse {
    /// Returns true if the backend acknowledged the clear.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(CLEAR_SUCCESS_STATUS)
    }
}
