//! TicketCoach - JIRA ticket coaching CLI
//!
//! Entry point: dispatches the subcommands onto the channel orchestrator
//! and renders streaming output to the terminal.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use ticketcoach::channel::{ChannelKind, ChannelSnapshot, Outcome};
use ticketcoach::cli::{Cli, Command, ConfigCommand, apply_setting, clear_setting, load_ticket};
use ticketcoach::config::Config;
use ticketcoach::i18n;
use ticketcoach::llm::WebhookClient;
use ticketcoach::orchestrator::Orchestrator;
use ticketcoach::ticket::{ActionType, TaskPayload, TicketForm};

use settingstore::SettingStore;

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ticketcoach")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = match cli_log_level.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("ticketcoach.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store = SettingStore::open(SettingStore::default_path()).context("Failed to open settings store")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Coach { ticket } => {
            debug!(?ticket, "main: matched Coach command");
            let form = load_ticket(&ticket)?;
            cmd_channel(config, store, ChannelKind::Coach, ActionType::Coach, form).await
        }
        Command::Analyze { ticket } => {
            debug!(?ticket, "main: matched Analyze command");
            let form = load_ticket(&ticket)?;
            cmd_channel(config, store, ChannelKind::Analyze, ActionType::Analyze, form).await
        }
        Command::Create { ticket } => {
            debug!(?ticket, "main: matched Create command");
            let form = load_ticket(&ticket)?;
            cmd_create(&config, &store, form).await
        }
        Command::Score { ticket } => {
            debug!(?ticket, "main: matched Score command");
            let form = load_ticket(&ticket)?;
            cmd_score(&form)
        }
        Command::Config { command } => {
            debug!(?command, "main: matched Config command");
            cmd_config(&config, &store, command)
        }
    }
}

/// Submit a payload through a channel and render the streamed output
///
/// Ctrl+C cancels the in-flight request or an active backoff countdown.
async fn cmd_channel(
    config: Config,
    store: SettingStore,
    kind: ChannelKind,
    action: ActionType,
    form: TicketForm,
) -> Result<()> {
    debug!(?kind, ?action, "cmd_channel: called");
    let payload = TaskPayload::new(action, form.to_data());

    let orchestrator = Orchestrator::new(config, store);
    let controller = orchestrator.channel(kind).clone();
    let mut updates = controller.subscribe();

    let mut submit = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit(payload).await })
    };

    let mut printed = 0usize;
    let mut last_backoff = 0u64;

    let mut outcome = loop {
        tokio::select! {
            joined = &mut submit => break joined.context("channel task panicked")?,
            changed = updates.changed() => {
                if changed.is_ok() {
                    let snapshot = updates.borrow_and_update().clone();
                    render_progress(&snapshot, &mut printed, &mut last_backoff);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("cmd_channel: ctrl_c received, cancelling");
                controller.cancel().await;
            }
        }
    };

    // a rate-limited submission settles early; follow the countdown and
    // the automatic resubmission until the channel is idle
    if outcome == Outcome::Success {
        loop {
            let snapshot = controller.snapshot().await;
            render_progress(&snapshot, &mut printed, &mut last_backoff);
            if !snapshot.loading && snapshot.backoff_remaining == 0 {
                if snapshot.cancelled {
                    outcome = Outcome::Cancelled;
                } else if snapshot.had_error {
                    outcome = Outcome::Failed(snapshot.error_message.clone().unwrap_or_default());
                }
                break;
            }
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    debug!("cmd_channel: ctrl_c received, cancelling");
                    controller.cancel().await;
                }
            }
        }
    }

    debug!(?outcome, "cmd_channel: settled");
    match outcome {
        Outcome::Success => {
            let snapshot = controller.snapshot().await;
            render_progress(&snapshot, &mut printed, &mut last_backoff);
            if printed == 0 {
                // webhook responses without a message field print as JSON
                if let Some(response) = &snapshot.response {
                    println!("{}", serde_json::to_string_pretty(response)?);
                }
            } else {
                println!();
            }
            Ok(())
        }
        Outcome::Cancelled => {
            println!();
            println!("{}", "Cancelled".yellow());
            Ok(())
        }
        Outcome::Failed(message) => {
            println!();
            eprintln!("{} {}", "✗".red(), message);
            std::process::exit(1);
        }
    }
}

fn response_message(snapshot: &ChannelSnapshot) -> Option<&str> {
    snapshot.response.as_ref()?.get("message")?.as_str()
}

/// Print whatever the latest snapshot added: new message bytes and backoff
/// countdown changes
fn render_progress(snapshot: &ChannelSnapshot, printed: &mut usize, last_backoff: &mut u64) {
    if snapshot.backoff_remaining != *last_backoff {
        *last_backoff = snapshot.backoff_remaining;
        if *last_backoff > 0 {
            eprintln!("{} retrying in {}s", "Rate limited,".yellow(), last_backoff);
        }
    }

    if let Some(message) = response_message(snapshot) {
        match message.get(*printed..) {
            Some(delta) => {
                if !delta.is_empty() {
                    print!("{}", delta);
                    let _ = std::io::stdout().flush();
                }
            }
            None => {
                // the response restarted, e.g. after an auto-resubmit
                println!();
                print!("{}", message);
                let _ = std::io::stdout().flush();
            }
        }
        *printed = message.len();
    }
}

/// Create the ticket through the automation webhook
async fn cmd_create(config: &Config, store: &SettingStore, form: TicketForm) -> Result<()> {
    debug!("cmd_create: called");
    let settings = store.load();
    let lang = config.lang(&settings);

    if !form.can_submit() {
        eprintln!(
            "{} Ticket is not ready to submit (score {}/100). Run `tc score` for details.",
            "✗".red(),
            form.quality_score()
        );
        std::process::exit(1);
    }

    let payload = TaskPayload::new(ActionType::Create, form.to_data());
    let client = WebhookClient::new(config.webhook_url(&settings), config.webhook_timeout());

    println!("Creating ticket: {}", payload.data.summary.cyan());
    let value = match client.call(&payload).await {
        Ok(value) => value,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), i18n::error_message(lang, &e));
            std::process::exit(1);
        }
    };

    match value.get("jira_result") {
        Some(result) => println!("{} {}", "✓".green(), result),
        None => match value.get("message").and_then(|m| m.as_str()) {
            Some(message) => println!("{} {}", "✓".green(), message),
            None => println!("{}", serde_json::to_string_pretty(&value)?),
        },
    }
    Ok(())
}

/// Score a ticket draft locally
fn cmd_score(form: &TicketForm) -> Result<()> {
    debug!("cmd_score: called");
    let score = form.quality_score();
    let rendered = if score >= 80 {
        score.to_string().green()
    } else if score >= 50 {
        score.to_string().yellow()
    } else {
        score.to_string().red()
    };

    println!("Quality score: {}/100", rendered);
    let summary = form.summary.compose();
    if summary.is_empty() {
        println!("Summary: {}", "(empty)".dimmed());
    } else {
        println!("Summary: {}", summary);
    }
    if form.can_submit() {
        println!("Ready to submit: {}", "yes".green());
    } else {
        println!("Ready to submit: {}", "no".red());
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    if key.chars().count() <= 6 {
        "******".to_string()
    } else {
        let prefix: String = key.chars().take(6).collect();
        format!("{}…", prefix)
    }
}

/// Show or edit persisted settings
fn cmd_config(config: &Config, store: &SettingStore, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            debug!("cmd_config: matched Show command");
            let settings = store.load();
            println!("Settings file: {}", store.path().display());
            println!();
            println!(
                "api-key:              {}",
                settings.api_key.as_deref().map(mask_key).unwrap_or_else(|| "(unset)".to_string())
            );
            println!("provider-url:         {}", config.provider_url(&settings));
            println!("model:                {}", config.model(&settings));
            println!("coach-mode:           {}", config.coach_mode(&settings));
            println!("analyze-mode:         {}", config.analyze_mode(&settings));
            println!("coach-skill-enabled:  {}", config.coach_skill_enabled(&settings));
            println!("lang:                 {}", config.lang(&settings));
            println!(
                "production-webhook:   {}",
                settings.production_webhook.unwrap_or(false)
            );
            println!("webhook-url:          {}", config.webhook_url(&settings));
            println!(
                "coach-skill:          {}",
                if settings.coach_skill.is_some() { "(custom)" } else { "(default)" }
            );
            println!(
                "analyze-skill:        {}",
                if settings.analyze_skill.is_some() { "(custom)" } else { "(default)" }
            );
        }
        ConfigCommand::Set { key, value } => {
            debug!(%key, "cmd_config: matched Set command");
            store.update(|settings| {
                if let Err(e) = apply_setting(settings, &key, &value) {
                    eprintln!("{} {}", "✗".red(), e);
                    std::process::exit(1);
                }
            })?;
            println!("{} {} updated", "✓".green(), key);
        }
        ConfigCommand::Unset { key } => {
            debug!(%key, "cmd_config: matched Unset command");
            store.update(|settings| {
                if let Err(e) = clear_setting(settings, &key) {
                    eprintln!("{} {}", "✗".red(), e);
                    std::process::exit(1);
                }
            })?;
            println!("{} {} cleared", "✓".green(), key);
        }
    }
    Ok(())
}
