use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;

use chatmycv::client::{
    STATUS_CLEARED, STATUS_CLEARING, STATUS_LOCAL_CLEARED, STATUS_NEW_SESSION, STATUS_NO_SESSION,
    STATUS_RECEIVED, STATUS_SENDING, STATUS_STALE_REPLY,
};
use chatmycv::store::SETTINGS_KEY;
use chatmycv::{
    ChatClient, ClearOutcome, ConfigurationStore, DiagnosticSink, Error, HttpReply, MemoryStorage,
    Message, Result, SendOutcome, SettingsInput, Sinks, SkipReason, StatusLevel, StatusSink,
    Storage, TranscriptBuffer, Transport,
};

#[derive(Debug, Clone, PartialEq)]
struct Call {
    method: &'static str,
    url: String,
    body: Option<Value>,
}

/// Transport that replays scripted replies, optionally after a delay.
#[derive(Default)]
struct StubTransport {
    replies: Mutex<VecDeque<Result<HttpReply>>>,
    calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
}

impl StubTransport {
    fn new() -> Self {
        Self::default()
    }

    fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn reply(self, status: u16, body: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpReply::new(status, body)));
        self
    }

    fn reply_json(self, status: u16, body: Value) -> Self {
        self.reply(status, body.to_string())
    }

    fn fail(self, err: Error) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, call: Call) -> Result<HttpReply> {
        self.calls.lock().unwrap().push(call);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::transport("no scripted reply", None)));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<HttpReply> {
        self.respond(Call {
            method: "POST",
            url: url.to_string(),
            body: Some(body.clone()),
        })
        .await
    }

    async fn get(&self, url: &Url) -> Result<HttpReply> {
        self.respond(Call {
            method: "GET",
            url: url.to_string(),
            body: None,
        })
        .await
    }
}

#[derive(Default)]
struct RecordingStatus {
    reports: Mutex<Vec<(String, StatusLevel)>>,
}

impl RecordingStatus {
    fn reports(&self) -> Vec<(String, StatusLevel)> {
        self.reports.lock().unwrap().clone()
    }

    fn last(&self) -> Option<(String, StatusLevel)> {
        self.reports.lock().unwrap().last().cloned()
    }
}

impl StatusSink for RecordingStatus {
    fn report(&self, text: &str, level: StatusLevel) {
        self.reports.lock().unwrap().push((text.to_string(), level));
    }
}

#[derive(Default)]
struct RecordingDiagnostics {
    records: Mutex<Vec<String>>,
}

impl DiagnosticSink for RecordingDiagnostics {
    fn record(&self, summary: &str) {
        self.records.lock().unwrap().push(summary.to_string());
    }
}

/// Lets a test inspect storage the client writes to.
struct SharedStorage(Arc<MemoryStorage>);

impl Storage for SharedStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.0.set(key, value)
    }
}

struct Harness {
    client: ChatClient<Arc<StubTransport>>,
    transport: Arc<StubTransport>,
    transcript: Arc<TranscriptBuffer>,
    status: Arc<RecordingStatus>,
    diagnostics: Arc<RecordingDiagnostics>,
}

fn harness(transport: StubTransport) -> Harness {
    harness_with_store(transport, ConfigurationStore::in_memory())
}

fn harness_with_store(transport: StubTransport, store: ConfigurationStore) -> Harness {
    let transport = Arc::new(transport);
    let transcript = Arc::new(TranscriptBuffer::new());
    let status = Arc::new(RecordingStatus::default());
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let sinks = Sinks::new(transcript.clone(), status.clone()).with_diagnostics(diagnostics.clone());
    let client = ChatClient::new(transport.clone(), store, sinks);
    Harness {
        client,
        transport,
        transcript,
        status,
        diagnostics,
    }
}

fn answer(response: &str, session_id: &str) -> Value {
    json!({"response": response, "session_id": session_id})
}

#[tokio::test]
async fn empty_query_is_ignored() {
    let h = harness(StubTransport::new());
    for query in ["", "   ", "\n\t"] {
        let outcome = h.client.send(query).await;
        assert!(matches!(outcome, SendOutcome::Skipped(SkipReason::EmptyQuery)));
    }
    assert!(h.transport.calls().is_empty());
    assert!(h.transcript.is_empty());
    assert!(h.status.reports().is_empty());
}

#[tokio::test]
async fn successful_send_renders_answer_and_adopts_session() {
    let h = harness(StubTransport::new().reply_json(
        200,
        json!({
            "response": "I led the payments team.",
            "session_id": "abc123",
            "retrieved_docs_count": 3,
            "context_used": true
        }),
    ));

    let outcome = h.client.send("  What did you do at Acme?  ").await;
    assert!(outcome.is_answered());

    assert_eq!(
        h.transcript.messages(),
        vec![
            Message::user("What did you do at Acme?"),
            Message::assistant("I led the payments team."),
        ]
    );
    assert_eq!(h.client.session_id().as_deref(), Some("abc123"));
    assert_eq!(
        h.status.reports(),
        vec![
            (STATUS_SENDING.to_string(), StatusLevel::Info),
            (STATUS_RECEIVED.to_string(), StatusLevel::Success),
        ]
    );
    let records = h.diagnostics.records.lock().unwrap().clone();
    assert_eq!(records, vec!["Docs: 3 • Used RAG context".to_string()]);
    assert!(!h.client.is_sending());

    let calls = h.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "POST");
    assert_eq!(calls[0].url, "http://localhost:8000/chat/");
    assert_eq!(
        calls[0].body,
        Some(json!({
            "lang": "en",
            "query": "What did you do at Acme?",
            "session_id": null,
            "k": 5,
            "temperature": 0.7
        }))
    );
}

#[tokio::test]
async fn session_is_reused_and_retained() {
    let h = harness(
        StubTransport::new()
            .reply_json(200, answer("first", "abc123"))
            .reply_json(200, json!({"response": "second"}))
            .reply_json(200, json!({"response": "third", "session_id": ""})),
    );

    h.client.send("one").await;
    h.client.send("two").await;
    h.client.send("three").await;

    let calls = h.transport.calls();
    assert_eq!(calls[1].body.as_ref().unwrap()["session_id"], "abc123");
    assert_eq!(calls[2].body.as_ref().unwrap()["session_id"], "abc123");
    assert_eq!(h.client.session_id().as_deref(), Some("abc123"));
}

#[tokio::test]
async fn optional_settings_are_sent_only_when_set() {
    let h = harness(StubTransport::new().reply_json(200, answer("ok", "s1")));
    h.client.update_settings(&SettingsInput {
        character: Some("engineer".to_string()),
        model: Some("  ".to_string()),
        system_prompt: Some("Answer as the candidate.".to_string()),
        ..SettingsInput::default()
    });

    h.client.send("hi").await;
    let body = h.transport.calls()[0].body.clone().unwrap();
    assert_eq!(body["character"], "engineer");
    assert_eq!(body["system_prompt"], "Answer as the candidate.");
    assert!(body.get("model").is_none());
}

#[tokio::test]
async fn server_error_text_is_rendered() {
    let h = harness(StubTransport::new().reply_json(500, json!({"error": "overloaded"})));

    let outcome = h.client.send("hello").await;
    let err = outcome.error().unwrap();
    assert!(err.is_server_error());
    assert_eq!(err.status_code(), Some(500));

    assert_eq!(
        h.transcript.messages(),
        vec![Message::user("hello"), Message::assistant("⚠️ overloaded")]
    );
    assert_eq!(
        h.status.last(),
        Some(("overloaded".to_string(), StatusLevel::Error))
    );
    assert!(!h.client.is_sending());
}

#[tokio::test]
async fn unparseable_server_error_uses_status_code() {
    let h = harness(
        StubTransport::new()
            .reply(500, "<html>Internal Server Error</html>")
            .reply_json(502, json!({"error": ""})),
    );

    h.client.send("hello").await;
    h.client.send("again").await;
    let messages = h.transcript.messages();
    assert_eq!(messages[1].content(), "⚠️ Request failed (500)");
    assert_eq!(messages[3].content(), "⚠️ Request failed (502)");
}

#[tokio::test]
async fn malformed_success_body_is_a_failure() {
    let h = harness(StubTransport::new().reply(200, "definitely not json"));

    let outcome = h.client.send("hello").await;
    assert!(outcome.error().unwrap().is_malformed_response());
    let messages = h.transcript.messages();
    assert!(messages[1].content().starts_with("⚠️ Failed to parse response"));
    assert_eq!(h.client.session_id(), None);
}

#[tokio::test]
async fn transport_failures_are_rendered() {
    let h = harness(
        StubTransport::new()
            .fail(Error::transport("connection refused", None))
            .fail(Error::timeout(Some(60.0))),
    );

    h.client.send("one").await;
    h.client.send("two").await;
    let messages = h.transcript.messages();
    assert_eq!(messages[1].content(), "⚠️ connection refused");
    assert_eq!(messages[3].content(), "⚠️ Request timed out");
    assert_eq!(
        h.status.last(),
        Some(("Request timed out".to_string(), StatusLevel::Error))
    );
}

#[tokio::test]
async fn empty_answer_gets_placeholder() {
    let h = harness(
        StubTransport::new()
            .reply_json(200, json!({"response": "", "session_id": "s1"}))
            .reply_json(200, json!({})),
    );

    h.client.send("one").await;
    h.client.send("two").await;
    let messages = h.transcript.messages();
    assert_eq!(messages[1].content(), "[empty response]");
    assert_eq!(messages[3].content(), "[empty response]");
}

#[tokio::test]
async fn invalid_backend_url_fails_without_network() {
    let h = harness(StubTransport::new());
    h.client.update_settings(&SettingsInput {
        backend_url: Some("not a url".to_string()),
        ..SettingsInput::default()
    });

    let outcome = h.client.send("hello").await;
    assert!(outcome.error().unwrap().is_invalid_backend_url());
    assert!(h.transport.calls().is_empty());
    assert_eq!(
        h.transcript.messages()[1].content(),
        "⚠️ Backend URL is invalid"
    );
    assert_eq!(
        h.status.last(),
        Some(("Backend URL is invalid".to_string(), StatusLevel::Error))
    );
}

#[tokio::test]
async fn backend_path_is_replaced_by_endpoint() {
    let h = harness(StubTransport::new().reply_json(200, answer("ok", "s1")));
    h.client.update_settings(&SettingsInput {
        backend_url: Some("https://cv.example.com/api/".to_string()),
        ..SettingsInput::default()
    });

    h.client.send("hello").await;
    assert_eq!(h.transport.calls()[0].url, "https://cv.example.com/chat/");
}

#[tokio::test(start_paused = true)]
async fn submissions_while_sending_are_dropped() {
    let h = harness(
        StubTransport::delayed(Duration::from_secs(2)).reply_json(200, answer("first answer", "s1")),
    );

    let probe = async {
        tokio::task::yield_now().await;
        h.client.is_sending()
    };
    let (first, second, busy) = tokio::join!(h.client.send("first"), h.client.send("second"), probe);

    assert!(first.is_answered());
    assert!(matches!(second, SendOutcome::Skipped(SkipReason::Busy)));
    assert!(busy);
    assert_eq!(h.transport.calls().len(), 1);
    assert_eq!(
        h.transcript.messages(),
        vec![Message::user("first"), Message::assistant("first answer")]
    );
    assert!(!h.client.is_sending());
}

#[tokio::test(start_paused = true)]
async fn client_is_idle_after_a_slow_failure() {
    let h = harness(
        StubTransport::delayed(Duration::from_secs(5))
            .reply_json(503, json!({"error": "warming up"}))
            .reply_json(200, answer("ready now", "s1")),
    );

    let outcome = h.client.send("hello").await;
    assert!(outcome.error().is_some());
    assert!(!h.client.is_sending());

    let outcome = h.client.send("hello again").await;
    assert!(outcome.is_answered());
    assert_eq!(h.transport.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancel_settles_the_request() {
    let h = harness(
        StubTransport::delayed(Duration::from_secs(30))
            .reply_json(200, answer("too late", "s1"))
            .reply_json(200, answer("on time", "s2")),
    );

    let canceller = async {
        tokio::task::yield_now().await;
        h.client.cancel_handle().cancel();
    };
    let (outcome, ()) = tokio::join!(h.client.send("slow question"), canceller);

    assert!(outcome.error().unwrap().is_cancelled());
    assert_eq!(
        h.transcript.messages(),
        vec![
            Message::user("slow question"),
            Message::assistant("⚠️ Request cancelled"),
        ]
    );
    assert_eq!(h.client.session_id(), None);
    assert!(!h.client.is_sending());

    // A stale cancel does not leak into the next request.
    h.client.cancel();
    let outcome = h.client.send("next question").await;
    assert!(outcome.is_answered());
    assert_eq!(h.client.session_id().as_deref(), Some("s2"));
}

#[tokio::test(start_paused = true)]
async fn new_session_during_send_discards_the_stale_reply() {
    let h = harness(
        StubTransport::delayed(Duration::from_secs(2))
            .reply_json(200, answer("before reset", "old-session"))
            .reply_json(200, answer("after reset", "new-session")),
    );

    let reset = async {
        tokio::task::yield_now().await;
        h.client.start_new_session();
    };
    let (outcome, ()) = tokio::join!(h.client.send("question"), reset);

    assert!(outcome.is_answered());
    assert_eq!(h.client.session_id(), None);
    assert!(h.transcript.is_empty());
    assert_eq!(
        h.status.last(),
        Some((STATUS_STALE_REPLY.to_string(), StatusLevel::Info))
    );

    h.client.send("fresh question").await;
    let calls = h.transport.calls();
    assert_eq!(calls[1].body.as_ref().unwrap()["session_id"], Value::Null);
    assert_eq!(h.client.session_id().as_deref(), Some("new-session"));
}

#[tokio::test(start_paused = true)]
async fn failure_after_new_session_stays_out_of_the_transcript() {
    let h = harness(
        StubTransport::delayed(Duration::from_secs(2))
            .reply_json(500, json!({"error": "overloaded"})),
    );

    let reset = async {
        tokio::task::yield_now().await;
        h.client.start_new_session();
    };
    let (outcome, ()) = tokio::join!(h.client.send("question"), reset);

    assert!(outcome.error().unwrap().is_server_error());
    assert!(h.transcript.is_empty());
    assert_eq!(
        h.status.last(),
        Some(("overloaded".to_string(), StatusLevel::Error))
    );
    assert!(!h.client.is_sending());
}

#[tokio::test]
async fn unset_stored_values_are_sent_and_persisted_as_defaults() {
    let storage = Arc::new(MemoryStorage::with_entry(
        SETTINGS_KEY,
        r#"{"k": 0, "temperature": 0, "backendUrl": ""}"#,
    ));
    let store = ConfigurationStore::new(SharedStorage(storage.clone()));
    let h = harness_with_store(
        StubTransport::new().reply_json(200, answer("ok", "s1")),
        store,
    );

    h.client.send("hi").await;
    let call = &h.transport.calls()[0];
    assert_eq!(call.url, "http://localhost:8000/chat/");
    let body = call.body.clone().unwrap();
    assert_eq!(body["k"], 5);
    assert_eq!(body["temperature"], 0.7);

    let stored: Value = serde_json::from_str(&storage.get(SETTINGS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored["backendUrl"], "http://localhost:8000");
    assert_eq!(stored["temperature"], 0.7);
    assert_eq!(stored["k"], 5);
}

#[tokio::test]
async fn clear_without_session_makes_no_request() {
    let h = harness(StubTransport::new());

    let outcome = h.client.clear_remote_history().await;
    assert!(matches!(outcome, ClearOutcome::NoSession));
    assert!(h.transport.calls().is_empty());
    assert_eq!(
        h.status.reports(),
        vec![(STATUS_NO_SESSION.to_string(), StatusLevel::Warning)]
    );
}

#[tokio::test]
async fn clear_posts_session_id() {
    let h = harness(
        StubTransport::new()
            .reply_json(200, answer("hi", "abc123"))
            .reply_json(200, json!({"status": "success"})),
    );
    h.client.send("hello").await;

    let outcome = h.client.clear_remote_history().await;
    assert!(matches!(outcome, ClearOutcome::Cleared));

    let calls = h.transport.calls();
    assert_eq!(calls[1].url, "http://localhost:8000/chat/clear");
    assert_eq!(calls[1].body, Some(json!({"session_id": "abc123"})));
    assert_eq!(
        h.status.reports()[2..].to_vec(),
        vec![
            (STATUS_CLEARING.to_string(), StatusLevel::Info),
            (STATUS_CLEARED.to_string(), StatusLevel::Success),
        ]
    );
    // Clearing the server's history keeps the session and the transcript.
    assert_eq!(h.client.session_id().as_deref(), Some("abc123"));
    assert_eq!(h.transcript.len(), 2);
}

#[tokio::test]
async fn clear_failures_are_reported() {
    let h = harness(
        StubTransport::new()
            .reply_json(200, answer("hi", "abc123"))
            .reply_json(200, json!({"error": "unknown session"}))
            .reply_json(200, json!({"status": "pending"}))
            .reply(500, "oops")
            .reply_json(404, json!({"error": "no such session"})),
    );
    h.client.send("hello").await;

    let mut errors = Vec::new();
    for _ in 0..4 {
        let outcome = h.client.clear_remote_history().await;
        assert!(matches!(outcome, ClearOutcome::Failed(_)));
        errors.push(h.status.last().unwrap());
    }
    assert_eq!(
        errors,
        vec![
            ("unknown session".to_string(), StatusLevel::Error),
            ("Failed to clear history".to_string(), StatusLevel::Error),
            ("Failed to clear history".to_string(), StatusLevel::Error),
            ("no such session".to_string(), StatusLevel::Error),
        ]
    );
    // Nothing is written to the transcript on clear failures.
    assert_eq!(h.transcript.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn clear_may_run_while_a_send_is_in_flight() {
    let h = harness(
        StubTransport::delayed(Duration::from_secs(1))
            .reply_json(200, answer("hi", "abc123"))
            .reply_json(200, answer("still here", "abc123"))
            .reply_json(200, json!({"status": "success"})),
    );
    h.client.send("hello").await;

    let clear = async {
        tokio::task::yield_now().await;
        assert!(h.client.is_sending());
        h.client.clear_remote_history().await
    };
    let (sent, cleared) = tokio::join!(h.client.send("follow up"), clear);

    assert!(sent.is_answered());
    assert!(matches!(cleared, ClearOutcome::Cleared));
    let urls: Vec<String> = h.transport.calls().into_iter().map(|c| c.url).collect();
    assert_eq!(
        urls,
        vec![
            "http://localhost:8000/chat/",
            "http://localhost:8000/chat/",
            "http://localhost:8000/chat/clear",
        ]
    );
}

#[tokio::test]
async fn local_commands_report_status() {
    let h = harness(StubTransport::new().reply_json(200, answer("hi", "abc123")));
    h.client.send("hello").await;

    h.client.reset_local_chat();
    assert!(h.transcript.is_empty());
    assert_eq!(h.client.session_id().as_deref(), Some("abc123"));
    assert_eq!(
        h.status.last(),
        Some((STATUS_LOCAL_CLEARED.to_string(), StatusLevel::Info))
    );

    h.client.start_new_session();
    assert_eq!(h.client.session_id(), None);
    assert_eq!(
        h.status.last(),
        Some((STATUS_NEW_SESSION.to_string(), StatusLevel::Success))
    );
}

#[tokio::test]
async fn stored_settings_shape_requests_and_are_persisted() {
    let storage = Arc::new(MemoryStorage::with_entry(
        SETTINGS_KEY,
        r#"{"lang": "zhtw", "k": 2, "temperature": null}"#,
    ));
    let store = ConfigurationStore::new(SharedStorage(storage.clone()));
    let h = harness_with_store(
        StubTransport::new().reply_json(200, answer("ok", "s1")),
        store,
    );

    assert_eq!(h.client.settings().lang, "zhtw");
    h.client.send("hello").await;
    let body = h.transport.calls()[0].body.clone().unwrap();
    assert_eq!(body["lang"], "zhtw");
    assert_eq!(body["k"], 2);
    assert_eq!(body["temperature"], 0.7);

    let stored: Value = serde_json::from_str(&storage.get(SETTINGS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(
        stored,
        json!({
            "backendUrl": "http://localhost:8000",
            "lang": "zhtw",
            "character": "",
            "temperature": 0.7,
            "k": 2,
            "model": "",
            "systemPrompt": ""
        })
    );
}

#[tokio::test]
async fn update_settings_applies_capture_rules_and_persists() {
    let storage = Arc::new(MemoryStorage::new());
    let h = harness_with_store(
        StubTransport::new(),
        ConfigurationStore::new(SharedStorage(storage.clone())),
    );

    let settings = h.client.update_settings(&SettingsInput {
        backend_url: Some("   ".to_string()),
        temperature: Some("warm".to_string()),
        k: Some("0".to_string()),
        ..SettingsInput::default()
    });
    assert_eq!(settings.backend_url, "http://localhost:8000");
    assert_eq!(settings.temperature, 0.7);
    assert_eq!(settings.k, 5);
    assert_eq!(h.client.settings(), settings);

    let stored = storage.get(SETTINGS_KEY).unwrap().unwrap();
    let reloaded = ConfigurationStore::new(MemoryStorage::with_entry(SETTINGS_KEY, stored)).load();
    assert_eq!(reloaded, settings);
}

#[tokio::test]
async fn health_check_reports_result() {
    let h = harness(
        StubTransport::new()
            .reply_json(200, json!({"status": "ok"}))
            .reply_json(200, json!({"status": "degraded"}))
            .reply(503, ""),
    );

    assert!(h.client.check_health().await);
    assert_eq!(h.status.last().unwrap().1, StatusLevel::Success);
    assert!(!h.client.check_health().await);
    assert!(!h.client.check_health().await);
    assert_eq!(
        h.status.last(),
        Some(("Health check failed (503)".to_string(), StatusLevel::Error))
    );

    let calls = h.transport.calls();
    assert_eq!(calls[0].method, "GET");
    assert_eq!(calls[0].url, "http://localhost:8000/healthz");
    assert!(h.transcript.is_empty());
}
