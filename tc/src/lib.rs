//! TicketCoach - JIRA ticket coaching and analysis engine
//!
//! TicketCoach drives two independent request channels over a ticket
//! draft: **coach** (writing guidance while the author drafts) and
//! **analyze** (effort, risk, and subtask review). Each channel fulfils a
//! request through one of two interchangeable transports, a streaming
//! chat-completions LLM call or a synchronous automation webhook, chosen
//! per submission from persisted settings.
//!
//! # Core Concepts
//!
//! - **Owned channel state**: each controller holds its own state and
//!   publishes immutable snapshots; observers never mutate anything
//! - **Generation guarding**: a new submission supersedes the old one,
//!   whose late callbacks are ignored rather than raced
//! - **Self-healing rate limits**: a 429 arms a visible countdown and
//!   resubmits automatically; the user never sees it as an error
//! - **Cancellation is not failure**: an aborted request settles clean,
//!   with neither the error flag nor a stale spinner left behind
//!
//! # Modules
//!
//! - [`channel`] - channel controllers, snapshots, and outcomes
//! - [`llm`] - SSE decoding, transports, and the error taxonomy
//! - [`ticket`] - ticket form model, payloads, and quality scoring
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod backoff;
pub mod channel;
pub mod cli;
pub mod config;
pub mod i18n;
pub mod llm;
pub mod orchestrator;
pub mod skills;
pub mod ticket;

// Re-export commonly used types
pub use channel::{ChannelController, ChannelKind, ChannelSnapshot, Outcome, TransportSelector};
pub use config::{BackoffConfig, ChannelsConfig, Config, LlmConfig, WebhookConfig};
pub use llm::{
    ChatError, SseDecoder, StreamingClient, StreamingTransport, Transport, WebhookClient, WebhookTransport,
    chat_endpoint, parse_body,
};
pub use orchestrator::{Orchestrator, SettingsSelector};
pub use ticket::{ActionType, SummaryParts, TaskPayload, TicketData, TicketForm};
