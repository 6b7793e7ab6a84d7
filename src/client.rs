//! The chat controller.
//!
//! [`ChatClient`] owns the settings snapshot, the session id and the busy
//! flag, and drives one request at a time against the backend.  It reports
//! everything through the sinks in [`Sinks`]; no operation returns an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::meta::ResponseMetaFormatter;
use crate::observability::{
    CHAT_DROPPED_SUBMISSIONS, CHAT_REQUEST_DURATION, CHAT_REQUEST_ERRORS, CHAT_REQUESTS,
    CHAT_STALE_SESSION_UPDATES, CLEAR_REQUEST_ERRORS, CLEAR_REQUESTS, HEALTH_CHECK_FAILURES,
    HEALTH_CHECKS,
};
use crate::request::RequestBuilder;
use crate::session::SessionState;
use crate::settings::{DEFAULT_BACKEND_URL, Settings, SettingsInput};
use crate::sink::{DiagnosticSink, StatusLevel, StatusSink, TracingDiagnostics, TranscriptSink};
use crate::store::ConfigurationStore;
use crate::transport::{HttpReply, Transport};
use crate::types::{
    ClearHistoryRequest, ClearHistoryResponse, ErrorBody, HealthResponse, Message,
    ResponsePayload,
};

/// Path of the chat endpoint, relative to the backend root.
pub const CHAT_PATH: &str = "/chat/";

/// Path of the history-clearing endpoint.
pub const CLEAR_PATH: &str = "/chat/clear";

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/healthz";

/// Shown in place of an empty assistant answer.
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "[empty response]";

/// Prefix of assistant messages that report a failure.
pub const FAILURE_PREFIX: &str = "⚠️ ";

/// Status texts.
pub const STATUS_READY: &str = "Ready";
pub const STATUS_SENDING: &str = "Sending...";
pub const STATUS_RECEIVED: &str = "Response received";
pub const STATUS_STALE_REPLY: &str = "Discarded a reply from the previous session";
pub const STATUS_NO_SESSION: &str = "No active session to clear on server";
pub const STATUS_CLEARING: &str = "Clearing remote history...";
pub const STATUS_CLEARED: &str = "Remote history cleared";
pub const STATUS_CLEAR_FAILED: &str = "Failed to clear history";
pub const STATUS_NEW_SESSION: &str = "Started a new session";
pub const STATUS_LOCAL_CLEARED: &str = "Local history cleared";
pub const STATUS_HEALTHY: &str = "Backend is healthy";
pub const STATUS_UNHEALTHY: &str = "Backend reported an unhealthy status";

/// Why a submission was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The query was empty after trimming.
    EmptyQuery,
    /// Another request is in flight.
    Busy,
}

/// How a call to [`ChatClient::send`] ended.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Nothing was emitted and no request was made.
    Skipped(SkipReason),
    /// The backend answered.
    Answered(ResponsePayload),
    /// The request failed; the failure was already rendered.
    Failed(Error),
}

impl SendOutcome {
    /// Returns true if the submission was dropped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, SendOutcome::Skipped(_))
    }

    /// Returns true if the backend answered.
    pub fn is_answered(&self) -> bool {
        matches!(self, SendOutcome::Answered(_))
    }

    /// The failure, if the request failed.
    pub fn error(&self) -> Option<&Error> {
        match self {
            SendOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// How a call to [`ChatClient::clear_remote_history`] ended.
#[derive(Debug, Clone)]
pub enum ClearOutcome {
    /// No session exists; nothing was sent.
    NoSession,
    /// The backend dropped the session's history.
    Cleared,
    /// The request failed or the backend declined.
    Failed(Error),
}

/// The output capabilities a [`ChatClient`] writes to.
#[derive(Clone)]
pub struct Sinks {
    /// Receives transcript entries.
    pub transcript: Arc<dyn TranscriptSink>,
    /// Receives status updates.
    pub status: Arc<dyn StatusSink>,
    /// Receives response diagnostics.
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl Sinks {
    /// Creates sinks that log diagnostics through `tracing`.
    pub fn new(transcript: Arc<dyn TranscriptSink>, status: Arc<dyn StatusSink>) -> Self {
        Self {
            transcript,
            status,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replaces the diagnostic sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Cancels whatever chat request is in flight when invoked.
///
/// Obtained from [`ChatClient::cancel_handle`]; usable from signal handlers.
#[derive(Clone)]
pub struct CancelHandle {
    current: Arc<Mutex<CancellationToken>>,
}

impl CancelHandle {
    /// Cancels the in-flight request, if any.
    pub fn cancel(&self) {
        lock(&self.current).cancel();
    }
}

/// Drops the busy flag on every exit path, including panics and futures
/// dropped mid-flight.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    /// Attempt to acquire the busy flag.  Returns `None` if already busy.
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Single-flight controller for the chat backend.
///
/// All methods take `&self`.  Mutable state sits behind locks that are never
/// held across an await, so one client can be shared by concurrent tasks.
pub struct ChatClient<T: Transport> {
    transport: T,
    store: ConfigurationStore,
    sinks: Sinks,
    settings: Mutex<Settings>,
    session: Mutex<SessionState>,
    busy: AtomicBool,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl<T: Transport> ChatClient<T> {
    /// Creates a client, loading settings from `store`.
    pub fn new(transport: T, store: ConfigurationStore, sinks: Sinks) -> Self {
        let settings = store.load();
        Self {
            transport,
            store,
            sinks,
            settings: Mutex::new(settings),
            session: Mutex::new(SessionState::new()),
            busy: AtomicBool::new(false),
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    /// Reports the initial status.
    pub fn announce_ready(&self) {
        self.sinks.status.report(STATUS_READY, StatusLevel::Info);
    }

    /// Returns a snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        lock(&self.settings).clone()
    }

    /// Applies operator input to the settings and persists the result.
    pub fn update_settings(&self, input: &SettingsInput) -> Settings {
        let settings = {
            let mut current = lock(&self.settings);
            *current = input.resolve(&current);
            current.clone()
        };
        self.store.persist(&settings);
        settings
    }

    /// Returns the current session id, if any.
    pub fn session_id(&self) -> Option<String> {
        lock(&self.session).current().map(str::to_string)
    }

    /// Returns true while a chat request is in flight.
    pub fn is_sending(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Returns a handle that cancels the in-flight request.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            current: Arc::clone(&self.cancel),
        }
    }

    /// Cancels the in-flight request, if any.
    pub fn cancel(&self) {
        lock(&self.cancel).cancel();
    }

    /// Sends `query` to the backend.
    ///
    /// Empty queries and submissions made while another request is in flight
    /// are dropped without emitting anything.  Otherwise the query is echoed
    /// to the transcript immediately, the settings are persisted, and the
    /// answer or the failure is rendered once the request settles.
    pub async fn send(&self, query: &str) -> SendOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SendOutcome::Skipped(SkipReason::EmptyQuery);
        }
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            CHAT_DROPPED_SUBMISSIONS.click();
            tracing::debug!("dropping submission while a request is in flight");
            return SendOutcome::Skipped(SkipReason::Busy);
        };

        self.sinks.transcript.append(&Message::user(query));
        let settings = self.settings();
        self.store.persist(&settings);
        self.sinks.status.report(STATUS_SENDING, StatusLevel::Info);

        let ticket = lock(&self.session).ticket();
        let token = self.arm_cancellation();
        CHAT_REQUESTS.click();
        let start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            result = self.dispatch(query, &settings, ticket.id()) => result,
        };
        CHAT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                let applied = lock(&self.session).update_from(&ticket, response.session_id.as_deref());
                self.sinks
                    .diagnostics
                    .record(&ResponseMetaFormatter::format(&response));
                if !applied {
                    // The transcript now belongs to a newer session.
                    CHAT_STALE_SESSION_UPDATES.click();
                    self.sinks.status.report(STATUS_STALE_REPLY, StatusLevel::Info);
                    return SendOutcome::Answered(response);
                }
                let content = response
                    .response
                    .as_deref()
                    .filter(|text| !text.is_empty())
                    .unwrap_or(EMPTY_RESPONSE_PLACEHOLDER);
                self.sinks.transcript.append(&Message::assistant(content));
                self.sinks.status.report(STATUS_RECEIVED, StatusLevel::Success);
                SendOutcome::Answered(response)
            }
            Err(err) => {
                CHAT_REQUEST_ERRORS.click();
                tracing::error!(error = %err, "chat request failed");
                if lock(&self.session).is_current(&ticket) {
                    self.sinks
                        .transcript
                        .append(&Message::assistant(format!("{FAILURE_PREFIX}{}", err.message())));
                }
                self.sinks.status.report(err.message(), StatusLevel::Error);
                SendOutcome::Failed(err)
            }
        }
    }

    /// Asks the backend to drop the current session's history.
    ///
    /// Does not touch the busy flag and may run while a chat request is in
    /// flight.
    pub async fn clear_remote_history(&self) -> ClearOutcome {
        let Some(session_id) = self.session_id() else {
            self.sinks
                .status
                .report(STATUS_NO_SESSION, StatusLevel::Warning);
            return ClearOutcome::NoSession;
        };

        self.sinks.status.report(STATUS_CLEARING, StatusLevel::Info);
        CLEAR_REQUESTS.click();
        match self.request_clear(session_id).await {
            Ok(()) => {
                self.sinks.status.report(STATUS_CLEARED, StatusLevel::Success);
                ClearOutcome::Cleared
            }
            Err(err) => {
                CLEAR_REQUEST_ERRORS.click();
                tracing::warn!(error = %err, "clearing remote history failed");
                self.sinks.status.report(err.message(), StatusLevel::Error);
                ClearOutcome::Failed(err)
            }
        }
    }

    /// Forgets the session and the local transcript.
    ///
    /// A chat request still in flight keeps running, but neither its answer
    /// nor the session id it carries reaches the new session.
    pub fn start_new_session(&self) {
        lock(&self.session).reset();
        self.sinks.transcript.clear();
        self.sinks
            .status
            .report(STATUS_NEW_SESSION, StatusLevel::Success);
    }

    /// Clears the local transcript, keeping the session.
    pub fn reset_local_chat(&self) {
        self.sinks.transcript.clear();
        self.sinks
            .status
            .report(STATUS_LOCAL_CLEARED, StatusLevel::Info);
    }

    /// Probes the backend's health endpoint and reports the result.
    pub async fn check_health(&self) -> bool {
        HEALTH_CHECKS.click();
        match self.request_health().await {
            Ok(()) => {
                self.sinks.status.report(STATUS_HEALTHY, StatusLevel::Success);
                true
            }
            Err(err) => {
                HEALTH_CHECK_FAILURES.click();
                self.sinks.status.report(err.message(), StatusLevel::Error);
                false
            }
        }
    }

    fn arm_cancellation(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *lock(&self.cancel) = token.clone();
        token
    }

    async fn dispatch(
        &self,
        query: &str,
        settings: &Settings,
        session_id: Option<&str>,
    ) -> Result<ResponsePayload> {
        let url = endpoint(&settings.backend_url, CHAT_PATH)?;
        let payload = RequestBuilder::build(query, settings, session_id);
        let body = serde_json::to_value(&payload)?;
        let reply = self.transport.post_json(&url, &body).await?;
        if !reply.is_success() {
            return Err(server_error(&reply, || {
                format!("Request failed ({})", reply.status)
            }));
        }
        parse_body(&reply)
    }

    async fn request_clear(&self, session_id: String) -> Result<()> {
        let url = endpoint(&self.settings().backend_url, CLEAR_PATH)?;
        let body = serde_json::to_value(ClearHistoryRequest::new(session_id))?;
        let reply = self.transport.post_json(&url, &body).await?;
        if !reply.is_success() {
            return Err(server_error(&reply, || STATUS_CLEAR_FAILED.to_string()));
        }
        let result: ClearHistoryResponse = parse_body(&reply)?;
        if result.is_success() {
            Ok(())
        } else {
            Err(Error::rejected(
                result
                    .error
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| STATUS_CLEAR_FAILED.to_string()),
            ))
        }
    }

    async fn request_health(&self) -> Result<()> {
        let url = endpoint(&self.settings().backend_url, HEALTH_PATH)?;
        let reply = self.transport.get(&url).await?;
        if !reply.is_success() {
            return Err(server_error(&reply, || {
                format!("Health check failed ({})", reply.status)
            }));
        }
        let health: HealthResponse = parse_body(&reply)?;
        if health.is_healthy() {
            Ok(())
        } else {
            Err(Error::rejected(STATUS_UNHEALTHY))
        }
    }
}

/// Joins `path` onto the backend base URL.
///
/// `path` is absolute, so any path on the base URL is replaced.  A blank base
/// falls back to [`DEFAULT_BACKEND_URL`].
pub fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let base_url = match base_url.trim() {
        "" => DEFAULT_BACKEND_URL,
        trimmed => trimmed,
    };
    let base = Url::parse(base_url).map_err(|e| Error::invalid_backend_url(base_url, Some(e)))?;
    if base.cannot_be_a_base() {
        return Err(Error::invalid_backend_url(base_url, None));
    }
    base.join(path)
        .map_err(|e| Error::invalid_backend_url(base_url, Some(e)))
}

fn server_error(reply: &HttpReply, fallback: impl FnOnce() -> String) -> Error {
    let message = ErrorBody::message_from(&reply.body).unwrap_or_else(fallback);
    Error::server(reply.status, message)
}

fn parse_body<R: serde::de::DeserializeOwned>(reply: &HttpReply) -> Result<R> {
    serde_json::from_str(&reply.body).map_err(|e| {
        Error::malformed_response(
            format!("Failed to parse response: {}", e),
            Some(Box::new(e)),
        )
    })
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
