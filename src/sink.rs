//! Output capabilities the controller writes to.
//!
//! The controller never renders anything itself.  It hands transcript entries
//! to a [`TranscriptSink`], one-line status updates to a [`StatusSink`], and
//! developer-only response summaries to a [`DiagnosticSink`].

use std::fmt;
use std::sync::Mutex;

use crate::types::Message;

/// Target used for diagnostic log records.
pub const DIAGNOSTICS_TARGET: &str = "chatmycv::diagnostics";

/// Severity of a status update.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StatusLevel {
    /// Progress or neutral information.
    Info,
    /// An operation completed.
    Success,
    /// Nothing was done, but nothing broke either.
    Warning,
    /// An operation failed.
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLevel::Info => write!(f, "info"),
            StatusLevel::Success => write!(f, "success"),
            StatusLevel::Warning => write!(f, "warning"),
            StatusLevel::Error => write!(f, "error"),
        }
    }
}

/// Receives transcript entries in order.
pub trait TranscriptSink: Send + Sync {
    /// Appends one message.
    fn append(&self, message: &Message);

    /// Drops every locally buffered message.
    fn clear(&self);
}

/// Receives status updates; only the latest one is meant to be visible.
pub trait StatusSink: Send + Sync {
    /// Reports `text` at `level`.
    fn report(&self, text: &str, level: StatusLevel);
}

/// Receives developer-facing summaries that must stay out of the transcript.
pub trait DiagnosticSink: Send + Sync {
    /// Records a response summary.
    fn record(&self, summary: &str);
}

/// Diagnostic sink that emits `debug` records under [`DIAGNOSTICS_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn record(&self, summary: &str) {
        tracing::debug!(target: DIAGNOSTICS_TARGET, meta = summary, "chat response usage/meta");
    }
}

/// Transcript sink that keeps messages in memory.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    messages: Mutex<Vec<Message>>,
}

impl TranscriptBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the buffered messages.
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns the number of buffered messages.
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TranscriptSink for TranscriptBuffer {
    fn append(&self, message: &Message) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
    }

    fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
