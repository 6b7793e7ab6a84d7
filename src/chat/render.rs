//! Terminal output for the chat application.
//!
//! [`TerminalRenderer`] is both the transcript sink and the status sink of the
//! terminal client.  Messages print paragraph by paragraph; status lines are
//! colored by level.  A copy of the transcript is kept so `/save` can write it.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::to_writer_pretty;
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::sink::{StatusLevel, StatusSink, TranscriptBuffer, TranscriptSink};
use crate::types::{Message, Role};

/// ANSI escape code for dim text (used for info status).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for speaker labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for success).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Label printed before assistant messages.
const ASSISTANT_LABEL: &str = "CV";

/// Renders transcript entries and status lines to the terminal.
#[derive(Debug)]
pub struct TerminalRenderer {
    use_color: bool,
    transcript: TranscriptBuffer,
}

impl TerminalRenderer {
    /// Creates a renderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a renderer with the specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            use_color,
            transcript: TranscriptBuffer::new(),
        }
    }

    /// The messages shown since the last clear.
    pub fn messages(&self) -> Vec<Message> {
        self.transcript.messages()
    }

    /// Prints a line of local, non-transcript information.
    pub fn print_info(&self, info: &str) {
        println!("{info}");
        flush();
    }

    /// Prints a local error.
    pub fn print_error(&self, error: &str) {
        eprintln!("Error: {error}");
    }

    /// Saves the transcript to `path` as pretty-printed JSON.
    pub fn save_transcript_to<P: AsRef<Path>>(
        &self,
        path: P,
        session_id: Option<&str>,
    ) -> Result<()> {
        let transcript = TranscriptFile::new(self.messages(), session_id);
        let file = File::create(path.as_ref())
            .map_err(|err| Error::storage("failed to create transcript file", err))?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })?;
        writer
            .flush()
            .map_err(|err| Error::storage("failed to write transcript file", err))
    }

    fn format_message(&self, message: &Message) -> String {
        let label = match message.role() {
            Role::User => "You",
            Role::Assistant => ASSISTANT_LABEL,
        };
        let label = if !self.use_color {
            format!("{label}:")
        } else if message.role() == Role::Assistant {
            format!("{ANSI_BOLD}{ANSI_CYAN}{label}:{ANSI_RESET}")
        } else {
            format!("{ANSI_BOLD}{label}:{ANSI_RESET}")
        };
        let body = message
            .paragraphs()
            .into_iter()
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("{label} {body}")
    }

    fn format_status(&self, text: &str, level: StatusLevel) -> String {
        if !self.use_color {
            return format!("[{level}] {text}");
        }
        let color = match level {
            StatusLevel::Info => ANSI_DIM,
            StatusLevel::Success => ANSI_GREEN,
            StatusLevel::Warning => ANSI_YELLOW,
            StatusLevel::Error => ANSI_RED,
        };
        format!("{color}{text}{ANSI_RESET}")
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSink for TerminalRenderer {
    fn append(&self, message: &Message) {
        self.transcript.append(message);
        // The operator's own input is already on screen.
        if message.role() == Role::Assistant {
            println!("{}\n", self.format_message(message));
            flush();
        }
    }

    fn clear(&self) {
        self.transcript.clear();
    }
}

impl StatusSink for TerminalRenderer {
    fn report(&self, text: &str, level: StatusLevel) {
        let line = self.format_status(text, level);
        match level {
            StatusLevel::Error => eprintln!("{line}"),
            _ => println!("{line}"),
        }
        flush();
    }
}

#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    #[serde(with = "crate::utils::time")]
    saved_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    messages: Vec<Message>,
}

impl TranscriptFile {
    fn new(messages: Vec<Message>, session_id: Option<&str>) -> Self {
        Self {
            version: 1,
            saved_at: OffsetDateTime::now_utc(),
            session_id: session_id.map(str::to_string),
            messages,
        }
    }
}

fn flush() {
    let _ = io::stdout().flush();
}
