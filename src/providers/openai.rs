use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Completer;
use crate::config::{required, OpenAiConfig};
use crate::error::{check_status, ApiError};
use crate::model::chat::ChatMessage;

const SERVICE: &str = "OpenAI";

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(base_url: &str, api_key: String, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    pub fn from_config(config: &OpenAiConfig, client: reqwest::Client) -> Result<Self> {
        let key = required(&config.api_key, "OPENAI_KEY")?;
        Ok(Self::new(config.base_url(), key.to_string(), client))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl Completer for OpenAiProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ApiError> {
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ChatCompletionRequest { model, messages })
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;

        let completion: ChatCompletionResponse = check_status(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::malformed(SERVICE, e))?;

        let first = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::malformed(SERVICE, "response has no choices"))?;

        Ok(first.message.content.unwrap_or_default().trim().to_string())
    }
}
