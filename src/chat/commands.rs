//! Slash command parsing for the chat application.
//!
//! Input that starts with `/` controls the client instead of being sent to
//! the backend.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Forget the session and the local transcript.
    NewSession,

    /// Clear the local transcript only.
    ResetLocal,

    /// Ask the backend to drop the session's history.
    ClearRemote,

    /// Probe the backend's health endpoint.
    Health,

    /// Set the backend URL.  An empty value restores the default.
    Backend(String),

    /// Set the response language.
    Lang(String),

    /// Set or clear the persona.
    Character(Option<String>),

    /// Set the sampling temperature (raw text, resolved by the client).
    Temperature(String),

    /// Set the retrieval count (raw text, resolved by the client).
    K(String),

    /// Set or clear the model override.
    Model(Option<String>),

    /// Set or clear the system prompt.
    System(Option<String>),

    /// Show the current configuration.
    ShowConfig,

    /// Show the current session id.
    ShowSession,

    /// Save the local transcript to a file.
    SaveTranscript(String),

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a query.
///
/// # Examples
///
/// ```
/// # use chatmycv::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/lang zhtw").is_some());
/// assert!(parse_command("What did you build at your last job?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());
    let optional = || argument.map(str::to_string);

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "new" => ChatCommand::NewSession,
        "reset" => ChatCommand::ResetLocal,
        "clear" => ChatCommand::ClearRemote,
        "health" => ChatCommand::Health,
        "backend" => match argument {
            Some(url) => ChatCommand::Backend(url.to_string()),
            None => ChatCommand::Invalid("/backend requires a URL".to_string()),
        },
        "lang" => match argument {
            Some(lang) => ChatCommand::Lang(lang.to_string()),
            None => ChatCommand::Invalid("/lang requires a language code".to_string()),
        },
        "character" => ChatCommand::Character(optional()),
        "temperature" => match argument {
            Some(value) => ChatCommand::Temperature(value.to_string()),
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "k" => match argument {
            Some(value) => ChatCommand::K(value.to_string()),
            None => ChatCommand::Invalid("/k requires a value".to_string()),
        },
        "model" => ChatCommand::Model(optional()),
        "system" => ChatCommand::System(optional()),
        "config" => ChatCommand::ShowConfig,
        "session" => ChatCommand::ShowSession,
        "save" => match argument {
            Some(path) => ChatCommand::SaveTranscript(path.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new session (forgets the session id)
  /reset                 Clear the local transcript
  /clear                 Clear the session's history on the server
  /health                Check that the backend is reachable
  /backend <url>         Set the backend URL
  /lang <code>           Set the response language (en, zhtw)
  /character [id]        Set the interviewer persona (hr, engineer); no argument clears it
  /temperature <v>       Set the sampling temperature
  /k <n>                 Set how many documents to retrieve
  /model [name]          Override the model; no argument restores the server default
  /system [prompt]       Set the system prompt; no argument clears it
  /config                Show current configuration
  /session               Show the current session id
  /save <file>           Save the local transcript as JSON
  /help                  Show this help message
  /quit                  Exit the chat"#
}
