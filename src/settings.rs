//! User-configurable settings.
//!
//! [`Settings`] is the fully resolved snapshot every request is built from.
//! [`SettingsInput`] is the raw, operator-typed form of the same fields; the
//! capture rules that turn one into the other live in
//! [`SettingsInput::resolve`].

use serde::{Deserialize, Serialize};

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default response language.
pub const DEFAULT_LANG: &str = "en";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default number of retrieved documents.
pub const DEFAULT_K: i64 = 5;

/// Languages the backend ships prompts for.
pub const KNOWN_LANGUAGES: &[&str] = &["en", "zhtw"];

/// Interviewer personas the backend ships prompts for.
pub const KNOWN_CHARACTERS: &[&str] = &["hr", "engineer"];

/// Resolved settings for the chat client.
///
/// Every field always holds a concrete value.  Empty strings in `character`,
/// `model` and `system_prompt` mean "leave it to the server".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Absolute base URL of the chat backend.
    pub backend_url: String,

    /// Two-letter response language.
    pub lang: String,

    /// Persona id; empty for none.
    pub character: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Number of documents to retrieve per query.
    pub k: i64,

    /// Model override; empty for the server default.
    pub model: String,

    /// Custom system prompt; empty for the server default.
    pub system_prompt: String,
}

impl Settings {
    /// Creates settings holding the built-in defaults.
    pub fn new() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
            character: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            k: DEFAULT_K,
            model: String::new(),
            system_prompt: String::new(),
        }
    }

    /// Sets the backend URL.
    pub fn with_backend_url(mut self, backend_url: impl Into<String>) -> Self {
        self.backend_url = backend_url.into();
        self
    }

    /// Sets the response language.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Sets the persona.
    pub fn with_character(mut self, character: impl Into<String>) -> Self {
        self.character = character.into();
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the retrieval count.
    pub fn with_k(mut self, k: i64) -> Self {
        self.k = k;
        self
    }

    /// Sets the model override.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Replaces values no request may carry with the built-in defaults.
    ///
    /// A blank backend URL, a zero or non-finite temperature and a zero k are
    /// the same "unset" the capture rules in [`SettingsInput::resolve`]
    /// recognize.
    pub fn resolved(mut self) -> Self {
        if self.backend_url.trim().is_empty() {
            self.backend_url = DEFAULT_BACKEND_URL.to_string();
        }
        if self.temperature == 0.0 || !self.temperature.is_finite() {
            self.temperature = DEFAULT_TEMPERATURE;
        }
        if self.k == 0 {
            self.k = DEFAULT_K;
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw settings as typed by the operator.
///
/// `None` leaves the corresponding setting untouched.  `Some` values go
/// through the capture rules in [`SettingsInput::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsInput {
    /// Backend URL text.
    pub backend_url: Option<String>,
    /// Language code.
    pub lang: Option<String>,
    /// Persona id.
    pub character: Option<String>,
    /// Temperature text.
    pub temperature: Option<String>,
    /// Retrieval count text.
    pub k: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// System prompt.
    pub system_prompt: Option<String>,
}

impl SettingsInput {
    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies this input on top of `current`.
    ///
    /// A blank backend URL and a temperature or k that is unparseable or zero
    /// fall back to the built-in defaults, not to `current`.
    pub fn resolve(&self, current: &Settings) -> Settings {
        let mut settings = current.clone();
        if let Some(backend_url) = &self.backend_url {
            let backend_url = backend_url.trim();
            settings.backend_url = if backend_url.is_empty() {
                DEFAULT_BACKEND_URL.to_string()
            } else {
                backend_url.to_string()
            };
        }
        if let Some(lang) = &self.lang {
            settings.lang = lang.trim().to_string();
        }
        if let Some(character) = &self.character {
            settings.character = character.trim().to_string();
        }
        if let Some(temperature) = &self.temperature {
            settings.temperature = parse_leading_float(temperature)
                .filter(|t| *t != 0.0)
                .unwrap_or(DEFAULT_TEMPERATURE);
        }
        if let Some(k) = &self.k {
            settings.k = parse_leading_int(k)
                .filter(|k| *k != 0)
                .unwrap_or(DEFAULT_K);
        }
        if let Some(model) = &self.model {
            settings.model = model.trim().to_string();
        }
        if let Some(system_prompt) = &self.system_prompt {
            settings.system_prompt = system_prompt.trim().to_string();
        }
        settings
    }
}

/// Parses the longest numeric prefix of `input`, ignoring leading whitespace.
fn parse_leading_float(input: &str) -> Option<f64> {
    let input = input.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = input.as_bytes();
    while end < bytes.len() {
        let c = bytes[end];
        match c {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 => {}
            b'+' | b'-' if seen_exp && matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    // Back off a dangling exponent or sign such as "1e" or "2e-".
    let mut candidate = &input[..end];
    while !candidate.is_empty() {
        if let Ok(value) = candidate.parse::<f64>() {
            return value.is_finite().then_some(value);
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    None
}

/// Parses the leading base-10 integer of `input`, ignoring leading whitespace.
fn parse_leading_int(input: &str) -> Option<i64> {
    let input = input.trim_start();
    let sign_len = usize::from(input.starts_with(['+', '-']));
    let digits = input[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    input[..sign_len + digits].parse().ok()
}
