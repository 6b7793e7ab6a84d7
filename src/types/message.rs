use serde::{Deserialize, Serialize};

/// Who authored a transcript message.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The operator.
    User,
    /// The chat backend.
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One transcript entry.
///
/// Messages are immutable once created; sinks receive them by reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<String>,
}

impl Message {
    /// Creates a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            meta: None,
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attaches a meta line shown beneath the content.
    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        let meta = meta.into();
        self.meta = (!meta.is_empty()).then_some(meta);
        self
    }

    /// The author.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The full text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The meta line, if any.
    pub fn meta(&self) -> Option<&str> {
        self.meta.as_deref()
    }

    /// Splits the content into paragraphs.
    ///
    /// Paragraphs are separated by runs of two or more newlines; a single
    /// newline stays inside its paragraph.
    pub fn paragraphs(&self) -> Vec<&str> {
        split_paragraphs(&self.content)
    }
}

fn split_paragraphs(content: &str) -> Vec<&str> {
    let bytes = content.as_bytes();
    let mut paragraphs = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] != b'\n' {
            idx += 1;
            continue;
        }
        let run_start = idx;
        while idx < bytes.len() && bytes[idx] == b'\n' {
            idx += 1;
        }
        if idx - run_start >= 2 {
            paragraphs.push(&content[start..run_start]);
            start = idx;
        }
    }
    paragraphs.push(&content[start..]);
    paragraphs
}
