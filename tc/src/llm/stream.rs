//! Streaming chat-completions client
//!
//! Performs the network half of the streaming transport: builds the chat
//! request, classifies HTTP failures, and drives the SSE decoder over the
//! response body, forwarding fragments in arrival order. All state
//! mutation happens in the calling channel controller.

use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::ChatError;
use super::sse::SseDecoder;

const CHAT_COMPLETIONS_SUFFIX: &str = "/chat/completions";

/// Normalize a configured base URL to a full chat-completions endpoint
///
/// A user-supplied "host root" URL stays valid: the path suffix is
/// appended unless already present, with any trailing slash stripped first.
pub fn chat_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(CHAT_COMPLETIONS_SUFFIX) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{CHAT_COMPLETIONS_SUFFIX}")
    }
}

/// Client for a chat-completions style streaming endpoint
pub struct StreamingClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    http: Client,
}

impl StreamingClient {
    pub fn new(base_url: &str, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: chat_endpoint(base_url),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http: Client::new(),
        }
    }

    /// Build the request body: model, streaming flag, optional system
    /// message, one user message
    fn build_request_body(&self, system: Option<&str>, user: &str) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": user }));

        serde_json::json!({
            "model": self.model,
            "stream": true,
            "messages": messages,
        })
    }

    /// POST the chat request and forward each decoded fragment
    ///
    /// Fails with `MissingCredential` before any network call when no API
    /// key is configured. Returns the full accumulated text on success. A
    /// dropped fragment receiver stops the read early without error;
    /// cancellation is handled by the caller dropping this future.
    pub async fn stream_chat(
        &self,
        system: Option<&str>,
        user: &str,
        fragments: mpsc::Sender<String>,
    ) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::MissingCredential)?;
        let body = self.build_request_body(system, user);
        debug!(endpoint = %self.endpoint, model = %self.model, "stream_chat: sending request");

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(ChatError::from_reqwest)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status, "stream_chat: request rejected");
            return Err(ChatError::from_status(status, body));
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut full = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ChatError::Protocol(e.to_string()))?;
            for fragment in decoder.feed(&chunk) {
                full.push_str(&fragment);
                if fragments.send(fragment).await.is_err() {
                    debug!("stream_chat: fragment receiver dropped, stopping read");
                    return Ok(full);
                }
            }
            if decoder.is_done() {
                break;
            }
        }

        debug!(chars = full.len(), "stream_chat: stream complete");
        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_endpoint_appends_suffix() {
        assert_eq!(chat_endpoint("https://api.example.com/v4"), "https://api.example.com/v4/chat/completions");
    }

    #[test]
    fn test_chat_endpoint_strips_trailing_slash() {
        assert_eq!(chat_endpoint("https://api.example.com/v4/"), "https://api.example.com/v4/chat/completions");
    }

    #[test]
    fn test_chat_endpoint_keeps_full_url() {
        let full = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
        assert_eq!(chat_endpoint(full), full);
        assert_eq!(chat_endpoint(&format!("{full}/")), full);
    }

    #[test]
    fn test_build_request_body_with_system() {
        let client = StreamingClient::new("https://api.example.com", "glm-4.7-flash", Some("key".to_string()));
        let body = client.build_request_body(Some("You are a reviewer"), "Review this");

        assert_eq!(body["model"], "glm-4.7-flash");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are a reviewer");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Review this");
    }

    #[test]
    fn test_build_request_body_without_system() {
        let client = StreamingClient::new("https://api.example.com", "glm-4.7-flash", Some("key".to_string()));
        let body = client.build_request_body(None, "hi");

        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_network() {
        let client = StreamingClient::new("https://api.example.com", "glm-4.7-flash", None);
        let (tx, _rx) = mpsc::channel(1);

        let err = client.stream_chat(None, "hi", tx).await.unwrap_err();
        assert!(matches!(err, ChatError::MissingCredential));
    }

    #[tokio::test]
    async fn test_blank_credential_counts_as_missing() {
        let client = StreamingClient::new("https://api.example.com", "glm-4.7-flash", Some("  ".to_string()));
        let (tx, _rx) = mpsc::channel(1);

        let err = client.stream_chat(None, "hi", tx).await.unwrap_err();
        assert!(matches!(err, ChatError::MissingCredential));
    }
}
