//! Transport seam between channel controllers and the network clients
//!
//! A transport is a strategy for fulfilling one channel request. The
//! controller depends only on this trait; the two variants are the
//! streaming LLM call and the synchronous webhook call.

use async_trait::async_trait;
use settingstore::Lang;
use tokio::sync::mpsc;
use tracing::debug;

use super::error::ChatError;
use super::stream::StreamingClient;
use super::webhook::WebhookClient;
use crate::ticket::TaskPayload;

/// One request-fulfillment strategy
///
/// `execute` performs the full network exchange for a payload. Streaming
/// implementations send each decoded fragment through `fragments` as it
/// arrives; the final structured response is returned either way.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        payload: &TaskPayload,
        fragments: mpsc::Sender<String>,
    ) -> Result<serde_json::Value, ChatError>;
}

/// Streaming LLM transport
///
/// In structured mode the channel's skill text becomes the system prompt
/// and the user message is assembled from the ticket fields; in free-form
/// mode the raw description/summary text is passed through unchanged,
/// turning the same transport into an open chat.
pub struct StreamingTransport {
    client: StreamingClient,
    system_prompt: Option<String>,
    lang: Lang,
}

impl StreamingTransport {
    pub fn new(client: StreamingClient, system_prompt: String, lang: Lang) -> Self {
        Self {
            client,
            system_prompt: Some(system_prompt),
            lang,
        }
    }

    /// Free-form mode: no system prompt, raw ticket text as the message
    pub fn free_form(client: StreamingClient, lang: Lang) -> Self {
        Self {
            client,
            system_prompt: None,
            lang,
        }
    }

    fn user_message(&self, payload: &TaskPayload) -> String {
        if self.system_prompt.is_some() {
            payload.review_request(self.lang)
        } else {
            payload.free_text()
        }
    }
}

#[async_trait]
impl Transport for StreamingTransport {
    async fn execute(
        &self,
        payload: &TaskPayload,
        fragments: mpsc::Sender<String>,
    ) -> Result<serde_json::Value, ChatError> {
        let user = self.user_message(payload);
        debug!(structured = self.system_prompt.is_some(), "execute: streaming transport");
        let full = self.client.stream_chat(self.system_prompt.as_deref(), &user, fragments).await?;
        Ok(serde_json::json!({ "markdown_msg": full, "message": full }))
    }
}

/// Synchronous webhook transport
pub struct WebhookTransport {
    client: WebhookClient,
}

impl WebhookTransport {
    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    async fn execute(
        &self,
        payload: &TaskPayload,
        _fragments: mpsc::Sender<String>,
    ) -> Result<serde_json::Value, ChatError> {
        debug!("execute: webhook transport");
        self.client.call(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{ActionType, TicketData};

    fn payload() -> TaskPayload {
        TaskPayload::new(
            ActionType::Coach,
            TicketData {
                project_name: "Hardware".to_string(),
                summary: "[GWM][ICC][SW][CAN][init]".to_string(),
                description: "raw text".to_string(),
                ..TicketData::default()
            },
        )
    }

    #[test]
    fn test_structured_mode_assembles_review_request() {
        let client = StreamingClient::new("https://api.example.com", "m", Some("k".to_string()));
        let transport = StreamingTransport::new(client, "skill".to_string(), Lang::En);
        let msg = transport.user_message(&payload());
        assert!(msg.contains("**Project**: Hardware"));
    }

    #[test]
    fn test_free_form_mode_passes_raw_text() {
        let client = StreamingClient::new("https://api.example.com", "m", Some("k".to_string()));
        let transport = StreamingTransport::free_form(client, Lang::En);
        assert_eq!(transport.user_message(&payload()), "raw text");
    }
}
