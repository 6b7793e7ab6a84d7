//! Interactive terminal client for a ChatMyCV backend.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local backend with the stored settings
//! chatmycv-chat
//!
//! # Point at another backend and ask in Traditional Chinese
//! chatmycv-chat --backend-url https://cv.example.com --lang zhtw
//!
//! # Don't touch the persisted settings
//! chatmycv-chat --ephemeral --no-color
//! ```
//!
//! Ctrl+C cancels the request in flight.  Set `RUST_LOG=chatmycv=debug` to
//! see request and response diagnostics on stderr.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use chatmycv::chat::{
    ChatArgs, ChatCommand, ChatConfig, StorageLocation, TerminalRenderer, help_text, parse_command,
};
use chatmycv::settings::{KNOWN_CHARACTERS, KNOWN_LANGUAGES};
use chatmycv::{ChatClient, HttpTransport, Settings, SettingsInput, Sinks};

/// Main entry point for the chatmycv-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("chatmycv-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    let store = config.storage.open()?;
    let transport = HttpTransport::with_timeout(config.timeout)?;
    let renderer = Arc::new(TerminalRenderer::with_color(config.use_color));
    let sinks = Sinks::new(renderer.clone(), renderer.clone());
    let client = ChatClient::new(transport, store, sinks);
    if !config.settings.is_empty() {
        client.update_settings(&config.settings);
    }

    let cancel = client.cancel_handle();
    ctrlc::set_handler(move || cancel.cancel())?;

    let mut rl = DefaultEditor::new()?;

    println!("ChatMyCV (backend: {})", client.settings().backend_url);
    println!("Type /help for commands, /quit to exit\n");
    client.announce_ready();

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                let Some(cmd) = parse_command(line) else {
                    client.send(line).await;
                    continue;
                };
                match cmd {
                    ChatCommand::Quit => {
                        println!("Goodbye!");
                        break;
                    }
                    ChatCommand::Help => {
                        for line in help_text().lines() {
                            println!("    {}", line);
                        }
                    }
                    ChatCommand::NewSession => client.start_new_session(),
                    ChatCommand::ResetLocal => client.reset_local_chat(),
                    ChatCommand::ClearRemote => {
                        client.clear_remote_history().await;
                    }
                    ChatCommand::Health => {
                        client.check_health().await;
                    }
                    ChatCommand::Backend(url) => {
                        let settings = client.update_settings(&SettingsInput {
                            backend_url: Some(url),
                            ..SettingsInput::default()
                        });
                        renderer.print_info(&format!("Backend set to {}", settings.backend_url));
                    }
                    ChatCommand::Lang(lang) => {
                        if !KNOWN_LANGUAGES.contains(&lang.as_str()) {
                            renderer.print_info(&format!(
                                "Note: {lang} is not one of {}",
                                KNOWN_LANGUAGES.join(", ")
                            ));
                        }
                        let settings = client.update_settings(&SettingsInput {
                            lang: Some(lang),
                            ..SettingsInput::default()
                        });
                        renderer.print_info(&format!("Language set to {}", settings.lang));
                    }
                    ChatCommand::Character(character) => {
                        if let Some(id) = &character
                            && !KNOWN_CHARACTERS.contains(&id.as_str())
                        {
                            renderer.print_info(&format!(
                                "Note: {id} is not one of {}",
                                KNOWN_CHARACTERS.join(", ")
                            ));
                        }
                        let settings = client.update_settings(&SettingsInput {
                            character: Some(character.unwrap_or_default()),
                            ..SettingsInput::default()
                        });
                        renderer.print_info(&describe("Character", &settings.character));
                    }
                    ChatCommand::Temperature(value) => {
                        let settings = client.update_settings(&SettingsInput {
                            temperature: Some(value),
                            ..SettingsInput::default()
                        });
                        renderer.print_info(&format!("Temperature set to {}", settings.temperature));
                    }
                    ChatCommand::K(value) => {
                        let settings = client.update_settings(&SettingsInput {
                            k: Some(value),
                            ..SettingsInput::default()
                        });
                        renderer.print_info(&format!("k set to {}", settings.k));
                    }
                    ChatCommand::Model(model) => {
                        let settings = client.update_settings(&SettingsInput {
                            model: Some(model.unwrap_or_default()),
                            ..SettingsInput::default()
                        });
                        renderer.print_info(&describe("Model", &settings.model));
                    }
                    ChatCommand::System(prompt) => {
                        let settings = client.update_settings(&SettingsInput {
                            system_prompt: Some(prompt.unwrap_or_default()),
                            ..SettingsInput::default()
                        });
                        renderer.print_info(&describe("System prompt", &settings.system_prompt));
                    }
                    ChatCommand::ShowConfig => print_config(&client.settings(), &config.storage),
                    ChatCommand::ShowSession => match client.session_id() {
                        Some(id) => renderer.print_info(&format!("Session: {id}")),
                        None => renderer.print_info("No active session"),
                    },
                    ChatCommand::SaveTranscript(path) => {
                        match renderer.save_transcript_to(&path, client.session_id().as_deref()) {
                            Ok(()) => renderer.print_info(&format!("Transcript saved to {}", path)),
                            Err(err) => {
                                renderer.print_error(&format!("Failed to save transcript: {}", err))
                            }
                        }
                    }
                    ChatCommand::Invalid(msg) => renderer.print_error(&msg),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn describe(name: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{name} cleared (server default)")
    } else {
        format!("{name} set to {value}")
    }
}

fn print_config(settings: &Settings, storage: &StorageLocation) {
    let or_default = |value: &str| {
        if value.is_empty() {
            "(server default)".to_string()
        } else {
            value.to_string()
        }
    };
    println!("Current configuration:");
    println!("      Backend: {}", settings.backend_url);
    println!("     Language: {}", settings.lang);
    println!("    Character: {}", or_default(&settings.character));
    println!("  Temperature: {}", settings.temperature);
    println!("            k: {}", settings.k);
    println!("        Model: {}", or_default(&settings.model));
    println!("       System: {}", or_default(&settings.system_prompt));
    println!("      Storage: {}", storage.describe());
}
