//! CLI command definitions and setting-key plumbing

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{Context, Result, eyre};
use settingstore::Settings;
use tracing::debug;

use crate::ticket::TicketForm;

/// TicketCoach - JIRA ticket coaching and analysis from the terminal
#[derive(Parser)]
#[command(
    name = "tc",
    about = "Coach, analyze, and create JIRA tickets with LLM or webhook backends",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream coaching feedback for a ticket draft
    Coach {
        /// Path to the ticket draft (YAML)
        ticket: PathBuf,
    },

    /// Analyze a ticket draft for effort, risks, and subtasks
    Analyze {
        /// Path to the ticket draft (YAML)
        ticket: PathBuf,
    },

    /// Create the ticket through the automation webhook
    Create {
        /// Path to the ticket draft (YAML)
        ticket: PathBuf,
    },

    /// Score a ticket draft locally, no network
    Score {
        /// Path to the ticket draft (YAML)
        ticket: PathBuf,
    },

    /// Inspect and edit persisted settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Settings management subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show stored settings and effective values
    Show,

    /// Set a setting key
    Set {
        /// Setting key (see `tc config show` for the list)
        key: String,

        /// New value
        value: String,
    },

    /// Clear a setting key, falling back to the config default
    Unset {
        /// Setting key
        key: String,
    },
}

/// Load a ticket draft from a YAML file
pub fn load_ticket(path: &Path) -> Result<TicketForm> {
    debug!(?path, "load_ticket: called");
    let content =
        std::fs::read_to_string(path).context(format!("Failed to read ticket file: {}", path.display()))?;
    let form: TicketForm =
        serde_yaml::from_str(&content).context(format!("Failed to parse ticket file: {}", path.display()))?;
    Ok(form)
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ticketcoach")
        .join("logs")
        .join("ticketcoach.log")
}

/// Keys accepted by `tc config set`/`unset`
pub const SETTING_KEYS: &[&str] = &[
    "api-key",
    "provider-url",
    "model",
    "coach-mode",
    "analyze-mode",
    "coach-skill-enabled",
    "lang",
    "production-webhook",
    "coach-skill",
    "analyze-skill",
];

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" => Ok(false),
        other => Err(eyre!("Expected a boolean, got '{}'", other)),
    }
}

/// Apply `tc config set KEY VALUE` to a settings record
pub fn apply_setting(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    debug!(key, "apply_setting: called");
    match key {
        "api-key" => settings.api_key = Some(value.to_string()),
        "provider-url" => settings.provider_url = Some(value.to_string()),
        "model" => settings.model = Some(value.to_string()),
        "coach-mode" => settings.coach_mode = Some(value.parse()?),
        "analyze-mode" => settings.analyze_mode = Some(value.parse()?),
        "coach-skill-enabled" => settings.coach_skill_enabled = Some(parse_bool(value)?),
        "lang" => settings.lang = Some(value.parse()?),
        "production-webhook" => settings.production_webhook = Some(parse_bool(value)?),
        "coach-skill" => settings.coach_skill = Some(value.to_string()),
        "analyze-skill" => settings.analyze_skill = Some(value.to_string()),
        other => {
            return Err(eyre!(
                "Unknown setting '{}'. Valid keys: {}",
                other,
                SETTING_KEYS.join(", ")
            ));
        }
    }
    Ok(())
}

/// Apply `tc config unset KEY` to a settings record
pub fn clear_setting(settings: &mut Settings, key: &str) -> Result<()> {
    debug!(key, "clear_setting: called");
    match key {
        "api-key" => settings.api_key = None,
        "provider-url" => settings.provider_url = None,
        "model" => settings.model = None,
        "coach-mode" => settings.coach_mode = None,
        "analyze-mode" => settings.analyze_mode = None,
        "coach-skill-enabled" => settings.coach_skill_enabled = None,
        "lang" => settings.lang = None,
        "production-webhook" => settings.production_webhook = None,
        "coach-skill" => settings.coach_skill = None,
        "analyze-skill" => settings.analyze_skill = None,
        other => {
            return Err(eyre!(
                "Unknown setting '{}'. Valid keys: {}",
                other,
                SETTING_KEYS.join(", ")
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use settingstore::{ChannelMode, Lang};

    #[test]
    fn test_cli_parse_coach() {
        let cli = Cli::parse_from(["tc", "coach", "ticket.yml"]);
        assert!(matches!(cli.command, Command::Coach { ticket } if ticket == PathBuf::from("ticket.yml")));
    }

    #[test]
    fn test_cli_parse_config_set() {
        let cli = Cli::parse_from(["tc", "config", "set", "model", "glm-4-plus"]);
        if let Command::Config {
            command: ConfigCommand::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "model");
            assert_eq!(value, "glm-4-plus");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn test_cli_with_config_flag() {
        let cli = Cli::parse_from(["tc", "-c", "/path/to/tc.yml", "score", "t.yml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/tc.yml")));
    }

    #[test]
    fn test_apply_setting_typed_keys() {
        let mut settings = Settings::default();

        apply_setting(&mut settings, "coach-mode", "webhook").unwrap();
        apply_setting(&mut settings, "lang", "en").unwrap();
        apply_setting(&mut settings, "production-webhook", "on").unwrap();

        assert_eq!(settings.coach_mode, Some(ChannelMode::Webhook));
        assert_eq!(settings.lang, Some(Lang::En));
        assert_eq!(settings.production_webhook, Some(true));
    }

    #[test]
    fn test_apply_setting_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(apply_setting(&mut settings, "coach-mode", "http").is_err());
        assert!(apply_setting(&mut settings, "lang", "de").is_err());
        assert!(apply_setting(&mut settings, "coach-skill-enabled", "maybe").is_err());
        assert!(apply_setting(&mut settings, "nope", "x").is_err());
    }

    #[test]
    fn test_clear_setting() {
        let mut settings = Settings::default();
        settings.model = Some("glm-4-plus".to_string());

        clear_setting(&mut settings, "model").unwrap();
        assert!(settings.model.is_none());
        assert!(clear_setting(&mut settings, "nope").is_err());
    }

    #[test]
    fn test_every_listed_key_is_settable() {
        let mut settings = Settings::default();
        for key in SETTING_KEYS {
            let value = match *key {
                "coach-mode" | "analyze-mode" => "llm",
                "lang" => "zh",
                "coach-skill-enabled" | "production-webhook" => "true",
                _ => "value",
            };
            apply_setting(&mut settings, key, value).unwrap();
            clear_setting(&mut settings, key).unwrap();
        }
    }
}
