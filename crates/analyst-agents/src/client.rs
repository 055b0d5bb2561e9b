//! OpenAI-compatible chat-completions client.
//!
//! Works against anything that speaks the `/v1/chat/completions` shape:
//! OpenAI itself, vLLM, llama.cpp server, LM Studio. The raw `usage`
//! object rides along in the response payload so the engine's token
//! accounting sees it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use deliberation::{LlmProvider, ModelConfig, ProviderError, ProviderResponse, SharedLlmProvider};

use crate::config::AgentsConfig;

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions client with an optional bearer token.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(config: &AgentsConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
        })
    }

    pub fn shared(self) -> SharedLlmProvider {
        std::sync::Arc::new(self)
    }
}

#[async_trait]
impl LlmProvider for OpenAiChatClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &ModelConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = ChatRequest {
            model: model.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: model.max_tokens,
            temperature: model.temperature,
        };

        debug!(model = %model.model, url = %self.url, "chat completion request");

        let mut call = self.http.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, message });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        into_provider_response(reply)
    }
}

fn into_provider_response(reply: ChatResponse) -> Result<ProviderResponse, ProviderError> {
    let choice = reply
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Decode("no choices in response".to_string()))?;
    let text = choice.message.content.unwrap_or_default();
    let payload = match reply.usage {
        Some(usage) => json!({ "response_metadata": { "usage": usage } }),
        None => Value::Null,
    };
    Ok(ProviderResponse::new(text, payload))
}
