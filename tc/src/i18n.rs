//! Localized user-facing strings for orchestrator outcomes
//!
//! Only the messages the orchestrator itself surfaces live here; the
//! presentation layer's full string catalog is out of scope.

use settingstore::Lang;

use crate::llm::ChatError;

/// Human-readable, localized message for a transport error
pub fn error_message(lang: Lang, error: &ChatError) -> String {
    match (lang, error) {
        (Lang::Zh, ChatError::MissingCredential) => {
            "API Key 未配置，请运行 `tc config set api-key <key>` 进行设置。".to_string()
        }
        (Lang::En, ChatError::MissingCredential) => {
            "API key not set. Run `tc config set api-key <key>` to configure it.".to_string()
        }

        (Lang::Zh, ChatError::InvalidCredential) => "API Key 无效，请运行 `tc config set api-key` 进行更新。".to_string(),
        (Lang::En, ChatError::InvalidCredential) => {
            "API key was rejected. Run `tc config set api-key` to update it.".to_string()
        }

        (Lang::Zh, ChatError::RateLimited) => "请求频率超限，请稍候后重试。".to_string(),
        (Lang::En, ChatError::RateLimited) => "Rate limit exceeded, please retry shortly.".to_string(),

        (Lang::Zh, ChatError::ServiceUnavailable { .. }) => "LLM 服务暂时不可用，请稍后重试。".to_string(),
        (Lang::En, ChatError::ServiceUnavailable { .. }) => {
            "The LLM service is temporarily unavailable, please retry later.".to_string()
        }

        (Lang::Zh, ChatError::EmptyResponse) => "服务器返回空响应，请检查 n8n 工作流配置".to_string(),
        (Lang::En, ChatError::EmptyResponse) => {
            "Server returned empty response, please check n8n workflow configuration".to_string()
        }

        (Lang::Zh, ChatError::Timeout(_)) => "请求超时，请检查 n8n 服务是否运行".to_string(),
        (Lang::En, ChatError::Timeout(_)) => "Request timeout, please check if n8n service is running".to_string(),

        (Lang::Zh, ChatError::NetworkUnreachable) => "无法连接到服务器".to_string(),
        (Lang::En, ChatError::NetworkUnreachable) => "Cannot connect to the server".to_string(),

        (Lang::Zh, ChatError::Cancelled) => "请求已取消".to_string(),
        (Lang::En, ChatError::Cancelled) => "Request cancelled".to_string(),

        (_, ChatError::Http { status, body }) => {
            let body = body.trim();
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {body}")
            }
        }

        (Lang::Zh, other) => format!("请求失败: {other}"),
        (Lang::En, other) => format!("Request failed: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_both_languages_cover_taxonomy() {
        let errors = [
            ChatError::MissingCredential,
            ChatError::InvalidCredential,
            ChatError::ServiceUnavailable { status: 502 },
            ChatError::EmptyResponse,
            ChatError::Timeout(Duration::from_secs(60)),
            ChatError::NetworkUnreachable,
        ];
        for error in &errors {
            assert!(!error_message(Lang::En, error).is_empty());
            assert!(!error_message(Lang::Zh, error).is_empty());
        }
    }

    #[test]
    fn test_http_error_carries_status_and_body() {
        let msg = error_message(Lang::En, &ChatError::Http {
            status: 404,
            body: "not found".to_string(),
        });
        assert_eq!(msg, "HTTP 404: not found");

        let msg = error_message(Lang::Zh, &ChatError::Http {
            status: 404,
            body: String::new(),
        });
        assert_eq!(msg, "HTTP 404");
    }

    #[test]
    fn test_protocol_error_falls_through_to_generic() {
        let msg = error_message(Lang::En, &ChatError::Protocol("bad frame".to_string()));
        assert!(msg.starts_with("Request failed:"));
        assert!(msg.contains("bad frame"));
    }
}
