//! Configuration types and loading
//!
//! Static configuration comes from a YAML file with a fallback chain;
//! user-changeable values are overlaid from the settings store at call
//! time, so a `tc config set` takes effect on the next request without a
//! restart.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use settingstore::{ChannelMode, Lang, Settings};

/// Main ticketcoach configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Automation webhook configuration
    pub webhook: WebhookConfig,

    /// Per-channel defaults
    pub channels: ChannelsConfig,

    /// Rate-limit backoff configuration
    pub backoff: BackoffConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .ticketcoach.yml
        let local_config = PathBuf::from(".ticketcoach.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/ticketcoach/ticketcoach.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ticketcoach").join("ticketcoach.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    // Settings-overlay accessors: persisted user settings win over the
    // static config, which wins over the environment where applicable.

    pub fn api_key(&self, settings: &Settings) -> Option<String> {
        settings
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.llm.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn provider_url<'a>(&'a self, settings: &'a Settings) -> &'a str {
        settings.provider_url.as_deref().unwrap_or(&self.llm.base_url)
    }

    pub fn model<'a>(&'a self, settings: &'a Settings) -> &'a str {
        settings.model.as_deref().unwrap_or(&self.llm.model)
    }

    pub fn coach_mode(&self, settings: &Settings) -> ChannelMode {
        settings.coach_mode.unwrap_or(self.channels.coach_mode)
    }

    pub fn analyze_mode(&self, settings: &Settings) -> ChannelMode {
        settings.analyze_mode.unwrap_or(self.channels.analyze_mode)
    }

    pub fn coach_skill_enabled(&self, settings: &Settings) -> bool {
        settings.coach_skill_enabled.unwrap_or(self.channels.coach_skill_enabled)
    }

    pub fn lang(&self, settings: &Settings) -> Lang {
        settings.lang.unwrap_or(self.channels.lang)
    }

    /// Active webhook URL: production or test, by the persisted toggle
    pub fn webhook_url<'a>(&'a self, settings: &'a Settings) -> &'a str {
        if settings.production_webhook.unwrap_or(false) {
            &self.webhook.prod_url
        } else {
            &self.webhook.test_url
        }
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook.timeout_ms)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat-completions base URL; a host root is normalized at call time
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Environment variable consulted when no credential is stored
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open.bigmodel.cn/api/paas/v4/chat/completions".to_string(),
            model: "glm-4.7-flash".to_string(),
            api_key_env: "TICKETCOACH_API_KEY".to_string(),
        }
    }
}

/// Automation webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Endpoint used while the production toggle is off
    #[serde(rename = "test-url")]
    pub test_url: String,

    /// Endpoint used while the production toggle is on
    #[serde(rename = "prod-url")]
    pub prod_url: String,

    /// Hard timeout for the full exchange in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            test_url: "http://localhost:5678/webhook-test/ticketcoach".to_string(),
            prod_url: "http://localhost:5678/webhook/ticketcoach".to_string(),
            timeout_ms: 60_000,
        }
    }
}

/// Per-channel defaults, overridable through the settings store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Transport for the coach channel
    #[serde(rename = "coach-mode")]
    pub coach_mode: ChannelMode,

    /// Transport for the analyze channel
    #[serde(rename = "analyze-mode")]
    pub analyze_mode: ChannelMode,

    /// Structured system-prompt mode for the coach channel
    #[serde(rename = "coach-skill-enabled")]
    pub coach_skill_enabled: bool,

    /// Output language
    pub lang: Lang,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            coach_mode: ChannelMode::Llm,
            analyze_mode: ChannelMode::Webhook,
            coach_skill_enabled: true,
            lang: Lang::Zh,
        }
    }
}

/// Rate-limit backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Countdown length in ticks
    pub seconds: u64,

    /// Tick duration in milliseconds
    #[serde(rename = "tick-ms")]
    pub tick_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            seconds: 10,
            tick_ms: 1_000,
        }
    }
}

impl BackoffConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.model, "glm-4.7-flash");
        assert_eq!(config.channels.coach_mode, ChannelMode::Llm);
        assert_eq!(config.channels.analyze_mode, ChannelMode::Webhook);
        assert_eq!(config.backoff.seconds, 10);
        assert_eq!(config.webhook.timeout_ms, 60_000);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  base-url: https://api.example.com/v1
  model: glm-4-plus
  api-key-env: MY_KEY

webhook:
  test-url: http://n8n.local/webhook-test/x
  prod-url: http://n8n.local/webhook/x
  timeout-ms: 30000

channels:
  coach-mode: webhook
  analyze-mode: llm
  coach-skill-enabled: false
  lang: en

backoff:
  seconds: 5
  tick-ms: 200
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.base_url, "https://api.example.com/v1");
        assert_eq!(config.channels.coach_mode, ChannelMode::Webhook);
        assert_eq!(config.channels.analyze_mode, ChannelMode::Llm);
        assert!(!config.channels.coach_skill_enabled);
        assert_eq!(config.channels.lang, Lang::En);
        assert_eq!(config.backoff.seconds, 5);
        assert_eq!(config.backoff.tick(), Duration::from_millis(200));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  model: glm-z1-flash
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "glm-z1-flash");
        assert_eq!(config.llm.api_key_env, "TICKETCOACH_API_KEY");
        assert_eq!(config.backoff.seconds, 10);
    }

    #[test]
    fn test_settings_overlay() {
        let config = Config::default();
        let mut settings = Settings::default();

        assert_eq!(config.coach_mode(&settings), ChannelMode::Llm);
        assert_eq!(config.model(&settings), "glm-4.7-flash");
        assert!(config.webhook_url(&settings).contains("webhook-test"));

        settings.coach_mode = Some(ChannelMode::Webhook);
        settings.model = Some("glm-4-plus".to_string());
        settings.production_webhook = Some(true);

        assert_eq!(config.coach_mode(&settings), ChannelMode::Webhook);
        assert_eq!(config.model(&settings), "glm-4-plus");
        assert!(!config.webhook_url(&settings).contains("webhook-test"));
    }

    #[test]
    fn test_stored_api_key_wins() {
        let config = Config::default();
        let mut settings = Settings::default();
        settings.api_key = Some("sk-stored".to_string());

        assert_eq!(config.api_key(&settings).as_deref(), Some("sk-stored"));
    }
}
