//! Turning a query and a settings snapshot into a chat request body.

use crate::settings::Settings;
use crate::types::RequestPayload;

/// Builds [`RequestPayload`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBuilder;

impl RequestBuilder {
    /// Builds the body for `query`.
    ///
    /// `query` is sent as given; callers trim it and reject empty queries
    /// before getting here.  A zero k or temperature goes out as its default.
    /// `character`, `system_prompt` and `model` are sent only when the trimmed
    /// setting is non-empty.
    pub fn build(query: &str, settings: &Settings, session_id: Option<&str>) -> RequestPayload {
        let settings = settings.clone().resolved();
        RequestPayload {
            lang: settings.lang.clone(),
            query: query.to_string(),
            session_id: session_id.map(str::to_string),
            k: settings.k,
            temperature: settings.temperature,
            character: non_empty(&settings.character),
            system_prompt: non_empty(&settings.system_prompt),
            model: non_empty(&settings.model),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
