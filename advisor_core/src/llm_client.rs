use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Model every relayed conversation is sent to.
pub const RELAY_MODEL: &str = "gpt-4o";

/// Response-length cap applied to every relayed request.
pub const RELAY_MAX_COMPLETION_TOKENS: u32 = 300;

/// Raw upstream answer: status line plus the unparsed body.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The model provider the relay forwards to.
#[async_trait]
pub trait UpstreamModel: Send + Sync {
    /// `Err` only for transport-level failures; HTTP error statuses come back
    /// as an `UpstreamReply`.
    async fn complete(&self, messages: Vec<Value>) -> Result<UpstreamReply>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: &'static str,
    messages: Vec<Value>,
    max_completion_tokens: u32,
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct LlmClient {
    api_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(client: reqwest::Client, api_url: String, api_key: Option<String>) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_url)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl UpstreamModel for LlmClient {
    async fn complete(&self, messages: Vec<Value>) -> Result<UpstreamReply> {
        let request = ChatCompletionRequest {
            model: RELAY_MODEL,
            messages,
            max_completion_tokens: RELAY_MAX_COMPLETION_TOKENS,
        };

        let mut req = self.client.post(self.completions_url()).json(&request);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req.send().await.context("Failed to send upstream request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read upstream response body")?;

        Ok(UpstreamReply {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}
