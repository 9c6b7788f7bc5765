use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::AdvisorConfig;
use crate::message::Message;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay endpoint is not configured")]
    NotConfigured,
    #[error("relay returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("relay reply is missing choices[0].message.content: {0}")]
    MalformedResponse(String),
    #[error("relay request failed: {0}")]
    Transport(String),
}

impl RelayError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, RelayError::NotConfigured)
    }
}

/// Submit an ordered transcript, receive the assistant's reply text.
#[async_trait]
pub trait ChatRelay: Send + Sync {
    async fn send(&self, messages: &[Message]) -> Result<String, RelayError>;
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    messages: &'a [Message],
}

#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl RelayClient {
    pub fn new(http: reqwest::Client, endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        Self { http, endpoint }
    }

    pub fn from_config(http: reqwest::Client, config: &AdvisorConfig) -> Self {
        Self::new(http, config.relay_endpoint().map(str::to_string))
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

#[async_trait]
impl ChatRelay for RelayClient {
    async fn send(&self, messages: &[Message]) -> Result<String, RelayError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(RelayError::NotConfigured);
        };

        let response = self
            .http
            .post(endpoint)
            .json(&RelayRequest { messages })
            .send()
            .await
            .map_err(|error| RelayError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| RelayError::Transport(error.to_string()))?;

        if !status.is_success() {
            return Err(RelayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_reply(&body)
    }
}

/// Pull `choices[0].message.content` out of a chat-completion payload.
pub fn parse_reply(body: &str) -> Result<String, RelayError> {
    let payload: Value = serde_json::from_str(body).map_err(|error| {
        RelayError::MalformedResponse(format!("invalid JSON ({})", error))
    })?;

    payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            RelayError::MalformedResponse(body.chars().take(200).collect::<String>())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_completion_payload() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Try Revitalift."}}]}"#;
        assert_eq!(parse_reply(body).unwrap(), "Try Revitalift.");
    }

    #[test]
    fn missing_fields_are_malformed() {
        for body in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{}}]}"#,
            r#"{"error":"quota"}"#,
            "not json",
        ] {
            assert!(
                matches!(parse_reply(body), Err(RelayError::MalformedResponse(_))),
                "{body}"
            );
        }
    }

    #[tokio::test]
    async fn unconfigured_client_fails_before_any_request() {
        let client = RelayClient::new(reqwest::Client::new(), Some("  ".to_string()));
        assert!(client.endpoint().is_none());

        let result = client.send(&[Message::user("hello")]).await;
        assert!(matches!(result, Err(RelayError::NotConfigured)));
    }

    #[test]
    fn request_body_wraps_messages() {
        let messages = vec![Message::system("ctx"), Message::user("hi")];
        let json = serde_json::to_value(RelayRequest {
            messages: &messages,
        })
        .unwrap();
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "ctx");
    }
}
