//! Interactive terminal front end for the ChatMyCV client.
//!
//! - [`config`]: CLI argument parsing and terminal configuration
//! - [`commands`]: slash command parsing
//! - [`render`]: the terminal transcript and status sinks

mod commands;
mod config;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, StorageLocation};
pub use render::TerminalRenderer;
