//! SettingStore - persistent user settings for ticketcoach
//!
//! A small synchronous key-value store backed by a single JSON file under
//! the user config directory. It holds everything the user can change at
//! runtime without editing the static config file: the API credential,
//! model and provider URL overrides, per-channel transport modes, skill
//! overrides, UI language, and the webhook environment toggle.
//!
//! Reads are lenient: a missing or corrupt file yields default settings
//! rather than an error, so a bad write can never brick the tool.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Transport mode for a channel: streaming LLM call or webhook call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    Llm,
    Webhook,
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelMode::Llm => write!(f, "llm"),
            ChannelMode::Webhook => write!(f, "webhook"),
        }
    }
}

impl FromStr for ChannelMode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "llm" => Ok(ChannelMode::Llm),
            "webhook" => Ok(ChannelMode::Webhook),
            other => Err(eyre::eyre!("Unknown channel mode: '{}'. Expected llm or webhook", other)),
        }
    }
}

/// Output language for prompts and user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Zh,
}

impl Lang {
    /// Two-letter code used in prompt templates
    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Zh => "zh",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Lang {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "en" => Ok(Lang::En),
            "zh" => Ok(Lang::Zh),
            other => Err(eyre::eyre!("Unknown language: '{}'. Expected en or zh", other)),
        }
    }
}

/// Persisted user settings
///
/// Every field is optional; `None` means "fall back to the static config
/// default". Field names stay kebab-case on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// LLM API credential
    pub api_key: Option<String>,

    /// Chat-completions base URL override
    pub provider_url: Option<String>,

    /// Model identifier override
    pub model: Option<String>,

    /// Transport mode for the coach channel
    pub coach_mode: Option<ChannelMode>,

    /// Transport mode for the analyze channel
    pub analyze_mode: Option<ChannelMode>,

    /// Structured system-prompt mode vs free-form chat for the coach channel
    pub coach_skill_enabled: Option<bool>,

    /// Output language
    pub lang: Option<Lang>,

    /// Use the production webhook URL instead of the test URL
    pub production_webhook: Option<bool>,

    /// Custom coach system prompt, replacing the embedded default
    pub coach_skill: Option<String>,

    /// Custom analyze system prompt, replacing the embedded default
    pub analyze_skill: Option<String>,
}

/// The settings store: one JSON file, synchronous get/set
#[derive(Debug, Clone)]
pub struct SettingStore {
    path: PathBuf,
}

impl SettingStore {
    /// Open a store at the given file path, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }
        debug!(?path, "SettingStore::open: called");
        Ok(Self { path })
    }

    /// Default location: `<config dir>/ticketcoach/settings.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ticketcoach")
            .join("settings.json")
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; missing or unparseable files yield the defaults
    pub fn load(&self) -> Settings {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "load: corrupt settings file, using defaults");
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    /// Persist the full settings record
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
        fs::write(&self.path, content).context("Failed to write settings file")?;
        debug!(path = %self.path.display(), "save: settings written");
        Ok(())
    }

    /// Load, mutate, and persist in one step; returns the updated settings
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut settings = self.load();
        f(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}
