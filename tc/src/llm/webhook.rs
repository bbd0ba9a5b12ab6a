//! Webhook automation client
//!
//! POSTs the serialized payload to the configured automation endpoint and
//! awaits the full synchronous response under a hard timeout. The timeout
//! is enforced locally by racing the exchange against a timer, so a hung
//! downstream can never wedge a channel.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::error::ChatError;
use crate::ticket::TaskPayload;

/// Client for the automation webhook endpoint
pub struct WebhookClient {
    url: String,
    timeout: Duration,
    http: Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            http: Client::new(),
        }
    }

    /// POST the payload and return the parsed response value
    ///
    /// An empty body indicates a misconfigured downstream automation and is
    /// an error; a non-JSON body is wrapped as `{"message": text}` so the
    /// caller always receives a structured value.
    pub async fn call(&self, payload: &TaskPayload) -> Result<serde_json::Value, ChatError> {
        debug!(url = %self.url, action = ?payload.meta.action, "call: posting payload");

        let exchange = async {
            let response = self
                .http
                .post(&self.url)
                .header("content-type", "application/json")
                .json(payload)
                .send()
                .await
                .map_err(ChatError::from_reqwest)?;

            let status = response.status().as_u16();
            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(status, "call: webhook rejected request");
                return Err(ChatError::Http { status, body });
            }

            response.text().await.map_err(|e| ChatError::Protocol(e.to_string()))
        };

        let text = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "call: webhook timed out");
                return Err(ChatError::Timeout(self.timeout));
            }
        };

        parse_body(&text)
    }
}

/// Parse a webhook response body into a structured value
pub fn parse_body(text: &str) -> Result<serde_json::Value, ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyResponse);
    }
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(_) => Ok(serde_json::json!({ "message": text })),
    }
}
