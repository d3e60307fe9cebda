use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// The contract every provider implements: streaming chat with chunk
/// ordering preserved. A system message, if present, may be transported
/// as a provider-specific "system instruction" and stripped from the
/// turn list — callers must not depend on that transport detail.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Streams the assistant reply, invoking `on_chunk` once per chunk in
    /// arrival order, and returns the fully assembled text.
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String>;

    /// Used only at startup; the Agent Loop does not retry connectivity
    /// errors on its own — those surface as `error` events.
    async fn check_connection(&self) -> Result<()>;

    fn model_name(&self) -> String;
}

/// In-memory test double: returns canned responses in FIFO order,
/// splitting each into fixed-size chunks when streamed. The Agent Loop
/// and Prompt Builder are tested against this instead of a live
/// provider.
pub struct FakeLlmClient {
    responses: Mutex<VecDeque<String>>,
    model: String,
}

impl FakeLlmClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self { responses: Mutex::new(responses.into()), model: "fake-model".to_string() }
    }

    fn next_response(&self) -> Result<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("FakeLlmClient has no more canned responses"))
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<String> {
        self.next_response()
    }

    async fn chat_stream(
        &self,
        _messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        let response = self.next_response()?;
        const CHUNK_SIZE: usize = 16;
        let mut rest = response.as_str();
        while !rest.is_empty() {
            let boundary = (0..=CHUNK_SIZE.min(rest.len()))
                .rev()
                .find(|&i| rest.is_char_boundary(i))
                .unwrap_or(0);
            let (chunk, remainder) = rest.split_at(boundary.max(1));
            on_chunk(chunk);
            rest = remainder;
        }
        Ok(response)
    }

    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

fn messages_to_ollama(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            json!({ "role": role, "content": m.content })
        })
        .collect()
}

/// Reference adapter for an Ollama-compatible local server: NDJSON
/// streaming over `/api/chat`. External collaborator — not exercised by
/// the core's test suite, which uses `FakeLlmClient` instead.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), model: model.into() }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let endpoint = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        debug!(model = %self.model, turns = messages.len(), "sending blocking chat request to ollama");
        let payload = json!({ "model": self.model, "messages": messages_to_ollama(messages), "stream": false });
        let response = self.client.post(endpoint).json(&payload).send().await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            warn!(%status, "ollama returned a non-success status");
            return Err(anyhow!("ollama error ({status}): {body}"));
        }
        body.get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("ollama response missing message.content: {body}"))
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        let endpoint = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        debug!(model = %self.model, turns = messages.len(), "sending streaming chat request to ollama");
        let payload = json!({ "model": self.model, "messages": messages_to_ollama(messages), "stream": true });
        let mut response = self.client.post(endpoint).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await?;
            warn!(%status, "ollama returned a non-success status");
            return Err(anyhow!("ollama error ({status}): {body}"));
        }

        let mut full = String::new();
        while let Some(chunk) = response.chunk().await? {
            let text = String::from_utf8_lossy(&chunk);
            for line in text.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(line) {
                    if let Some(content) = parsed.get("message").and_then(|m| m.get("content")).and_then(|c| c.as_str()) {
                        if !content.is_empty() {
                            full.push_str(content);
                            on_chunk(content);
                        }
                    }
                }
            }
        }
        Ok(full)
    }

    async fn check_connection(&self) -> Result<()> {
        let endpoint = format!("{}/api/tags", self.base_url.trim_end_matches('/'));
        self.client.get(endpoint).send().await?.error_for_status()?;
        Ok(())
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

/// Reference adapter for an OpenRouter-compatible provider: SSE
/// streaming, bearer auth. External collaborator — not exercised by the
/// core's test suite.
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), api_key: api_key.into(), model: model.into() }
    }

    fn messages_json(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                };
                json!({ "role": role, "content": m.content })
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let payload = json!({ "model": self.model, "messages": Self::messages_json(messages), "stream": false });
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            warn!(%status, "openrouter returned a non-success status");
            return Err(anyhow!("openrouter error ({status}): {body}"));
        }
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("openrouter response missing choices[0].message.content: {body}"))
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(model = %self.model, turns = messages.len(), "sending streaming chat request to openrouter");
        let payload = json!({ "model": self.model, "messages": Self::messages_json(messages), "stream": true });
        let mut response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await?;
            warn!(%status, "openrouter returned a non-success status");
            return Err(anyhow!("openrouter error ({status}): {body}"));
        }

        let mut full = String::new();
        while let Some(chunk) = response.chunk().await? {
            let text = String::from_utf8_lossy(&chunk);
            for line in text.lines() {
                let Some(data) = line.strip_prefix("data: ") else { continue };
                if data == "[DONE]" {
                    continue;
                }
                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(data) {
                    if let Some(content) = parsed["choices"][0]["delta"]["content"].as_str() {
                        if !content.is_empty() {
                            full.push_str(content);
                            on_chunk(content);
                        }
                    }
                }
            }
        }
        Ok(full)
    }

    async fn check_connection(&self) -> Result<()> {
        let endpoint = format!("{}/models", self.base_url.trim_end_matches('/'));
        self.client
            .get(endpoint)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_client_returns_canned_responses_in_order() {
        let client = FakeLlmClient::new(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(client.chat(&[]).await.unwrap(), "first");
        assert_eq!(client.chat(&[]).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn fake_client_exhausted_errors() {
        let client = FakeLlmClient::new(vec![]);
        assert!(client.chat(&[]).await.is_err());
    }

    #[tokio::test]
    async fn fake_client_stream_preserves_chunk_order_and_total() {
        let client = FakeLlmClient::new(vec!["hello world this is a test".to_string()]);
        let mut seen = String::new();
        let full = client
            .chat_stream(&[], &mut |chunk| seen.push_str(chunk))
            .await
            .unwrap();
        assert_eq!(seen, full);
        assert_eq!(full, "hello world this is a test");
    }

}
