//! Configuration types for the chat application.
//!
//! Command-line flags are parsed with `arrrg`.  Flags that name a setting
//! become a [`SettingsInput`] applied over the stored settings; the rest
//! configure the terminal session itself.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::error::Result;
use crate::settings::SettingsInput;
use crate::store::{ConfigurationStore, FileStorage};
use crate::transport::DEFAULT_TIMEOUT;

/// Command-line arguments for the chatmycv-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(optional, "Backend base URL (default: http://localhost:8000)", "URL")]
    pub backend_url: Option<String>,

    /// Response language.
    #[arrrg(optional, "Response language: en or zhtw (default: en)", "LANG")]
    pub lang: Option<String>,

    /// Interviewer persona.
    #[arrrg(optional, "Interviewer persona: hr or engineer", "ID")]
    pub character: Option<String>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature (default: 0.7)", "VALUE")]
    pub temperature: Option<String>,

    /// Retrieval count.
    #[arrrg(optional, "Documents to retrieve per query (default: 5)", "N")]
    pub k: Option<String>,

    /// Model override.
    #[arrrg(optional, "Model override (default: server's choice)", "MODEL")]
    pub model: Option<String>,

    /// System prompt.
    #[arrrg(optional, "Custom system prompt", "PROMPT")]
    pub system: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Directory holding the persisted settings.
    #[arrrg(optional, "Directory for persisted settings", "DIR")]
    pub storage_dir: Option<String>,

    /// Keep settings in memory only.
    #[arrrg(flag, "Do not read or write persisted settings")]
    pub ephemeral: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

impl ChatArgs {
    /// The settings named on the command line.
    pub fn settings_input(&self) -> SettingsInput {
        SettingsInput {
            backend_url: self.backend_url.clone(),
            lang: self.lang.clone(),
            character: self.character.clone(),
            temperature: self.temperature.clone(),
            k: self.k.clone(),
            model: self.model.clone(),
            system_prompt: self.system.clone(),
        }
    }
}

/// Where persisted settings live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// The platform configuration directory.
    Default,
    /// An explicit directory.
    Directory(PathBuf),
    /// Process memory; nothing survives exit.
    Ephemeral,
}

impl StorageLocation {
    /// Opens a configuration store at this location.
    pub fn open(&self) -> Result<ConfigurationStore> {
        Ok(match self {
            StorageLocation::Default => ConfigurationStore::new(FileStorage::default_location()?),
            StorageLocation::Directory(dir) => ConfigurationStore::new(FileStorage::new(dir)),
            StorageLocation::Ephemeral => ConfigurationStore::in_memory(),
        })
    }

    /// The directory settings are written to, or `None` for ephemeral storage
    /// and platforms without a configuration directory.
    pub fn directory(&self) -> Option<PathBuf> {
        match self {
            StorageLocation::Default => FileStorage::default_location()
                .ok()
                .map(|storage| storage.dir().to_path_buf()),
            StorageLocation::Directory(dir) => Some(FileStorage::new(dir).dir().to_path_buf()),
            StorageLocation::Ephemeral => None,
        }
    }

    /// Describes the location for display.
    pub fn describe(&self) -> String {
        match self.directory() {
            Some(dir) => dir.display().to_string(),
            None => "(memory only)".to_string(),
        }
    }
}

/// Terminal session configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Where settings are persisted.
    pub storage: StorageLocation,

    /// Settings given on the command line.
    pub settings: SettingsInput,
}

impl ChatConfig {
    /// Creates a configuration with colors on, the default timeout, and
    /// settings in the platform configuration directory.
    pub fn new() -> Self {
        Self {
            use_color: true,
            timeout: DEFAULT_TIMEOUT,
            storage: StorageLocation::Default,
            settings: SettingsInput::default(),
        }
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the storage location.
    pub fn with_storage(mut self, storage: StorageLocation) -> Self {
        self.storage = storage;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let storage = if args.ephemeral {
            StorageLocation::Ephemeral
        } else if let Some(dir) = &args.storage_dir {
            StorageLocation::Directory(PathBuf::from(dir))
        } else {
            StorageLocation::Default
        };
        let timeout = args
            .timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        ChatConfig {
            use_color: !args.no_color,
            timeout,
            storage,
            settings: args.settings_input(),
        }
    }
}
