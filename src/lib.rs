//! Client-side session and request lifecycle for the ChatMyCV backend.
//!
//! [`ChatClient`] is the entry point: it owns the persisted settings, the
//! server-issued session id, and the single in-flight request, and reports
//! everything through the sinks in [`sink`].

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod meta;
pub mod observability;
pub mod request;
pub mod session;
pub mod settings;
pub mod sink;
pub mod store;
pub mod transport;
pub mod types;
pub mod utils;

// Re-exports
pub use client::{CancelHandle, ChatClient, ClearOutcome, SendOutcome, Sinks, SkipReason};
pub use error::{Error, Result};
pub use meta::ResponseMetaFormatter;
pub use observability::register_biometrics;
pub use request::RequestBuilder;
pub use session::{SessionState, SessionTicket};
pub use settings::{Settings, SettingsInput};
pub use sink::{DiagnosticSink, StatusLevel, StatusSink, TracingDiagnostics, TranscriptBuffer, TranscriptSink};
pub use store::{ConfigurationStore, FileStorage, MemoryStorage, Storage};
pub use transport::{HttpReply, HttpTransport, Transport};
pub use types::*;
