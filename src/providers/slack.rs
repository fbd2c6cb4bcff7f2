use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::ChatPlatform;
use crate::config::{required, SlackConfig};
use crate::error::{check_status, ApiError};
use crate::model::chat::ChannelPost;

const SERVICE: &str = "Slack";
const SLACK_API: &str = "https://slack.com/api";

pub struct SlackProvider {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl SlackProvider {
    pub fn new(base_url: &str, token: String, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        }
    }

    pub fn from_config(config: &SlackConfig, client: reqwest::Client) -> Result<Self> {
        let token = required(&config.token, "SLACK_TOKEN")?;
        Ok(Self::new(SLACK_API, token.to_string(), client))
    }

    async fn get<T: DeserializeOwned>(&self, method: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let req = self
            .client
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.token)
            .query(query);
        self.call(req).await
    }

    async fn post<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, ApiError> {
        let req = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.token)
            .json(body);
        self.call(req).await
    }

    /// Slack reports most failures as HTTP 200 with `"ok": false`.
    async fn call<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let resp = req.send().await.map_err(|e| ApiError::transport(SERVICE, e))?;
        let body: Value = check_status(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::malformed(SERVICE, e))?;

        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let reason = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            return Err(ApiError::Rejected {
                service: SERVICE,
                reason,
            });
        }
        serde_json::from_value(body).map_err(|e| ApiError::malformed(SERVICE, e))
    }
}

#[derive(Deserialize)]
struct History {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    user: String,
    #[serde(default)]
    text: String,
    subtype: Option<String>,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<SlackFile>,
}

#[derive(Deserialize)]
struct SlackFile {
    url_private_download: Option<String>,
}

#[derive(Deserialize)]
struct Posted {}

#[async_trait]
impl ChatPlatform for SlackProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn channel_history(&self, channel: &str, oldest: i64) -> Result<Vec<ChannelPost>, ApiError> {
        let history: History = self
            .get(
                "conversations.history",
                &[("channel", channel.to_string()), ("oldest", oldest.to_string())],
            )
            .await?;

        // Slack returns newest first; joins and bot events carry a subtype.
        let mut posts: Vec<ChannelPost> = history
            .messages
            .into_iter()
            .filter(|m| m.subtype.is_none())
            .map(|m| ChannelPost {
                user: m.user,
                text: m.text,
            })
            .collect();
        posts.reverse();
        Ok(posts)
    }

    async fn latest_document(&self, user: &str, scan: u32) -> Result<Option<String>, ApiError> {
        let list: FileList = self
            .get(
                "files.list",
                &[
                    ("user", user.to_string()),
                    ("types", "documents".to_string()),
                    ("count", scan.to_string()),
                ],
            )
            .await?;

        let Some(url) = list.files.into_iter().next().and_then(|f| f.url_private_download) else {
            return Ok(None);
        };

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::transport(SERVICE, e))?;
        let text = check_status(SERVICE, resp)
            .await?
            .text()
            .await
            .map_err(|e| ApiError::malformed(SERVICE, e))?;
        Ok(Some(text))
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ApiError> {
        let _: Posted = self
            .post(
                "chat.postMessage",
                &serde_json::json!({ "channel": channel, "text": text }),
            )
            .await?;
        Ok(())
    }
}
