//! Request counters and latency moments.

use biometrics::{Collector, Counter, Moments};

pub(crate) static CHAT_REQUESTS: Counter = Counter::new("chatmycv.chat.requests");
pub(crate) static CHAT_REQUEST_ERRORS: Counter = Counter::new("chatmycv.chat.request_errors");
pub(crate) static CHAT_DROPPED_SUBMISSIONS: Counter =
    Counter::new("chatmycv.chat.dropped_submissions");
pub(crate) static CHAT_STALE_SESSION_UPDATES: Counter =
    Counter::new("chatmycv.chat.stale_session_updates");
pub(crate) static CHAT_REQUEST_DURATION: Moments =
    Moments::new("chatmycv.chat.request_duration_seconds");

pub(crate) static CLEAR_REQUESTS: Counter = Counter::new("chatmycv.clear.requests");
pub(crate) static CLEAR_REQUEST_ERRORS: Counter = Counter::new("chatmycv.clear.request_errors");

pub(crate) static HEALTH_CHECKS: Counter = Counter::new("chatmycv.health.checks");
pub(crate) static HEALTH_CHECK_FAILURES: Counter = Counter::new("chatmycv.health.failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CHAT_REQUESTS);
    collector.register_counter(&CHAT_REQUEST_ERRORS);
    collector.register_counter(&CHAT_DROPPED_SUBMISSIONS);
    collector.register_counter(&CHAT_STALE_SESSION_UPDATES);
    collector.register_moments(&CHAT_REQUEST_DURATION);

    collector.register_counter(&CLEAR_REQUESTS);
    collector.register_counter(&CLEAR_REQUEST_ERRORS);

    collector.register_counter(&HEALTH_CHECKS);
    collector.register_counter(&HEALTH_CHECK_FAILURES);
}
