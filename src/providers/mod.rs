pub mod jira;
pub mod openai;
pub mod slack;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::chat::{ChannelPost, ChatMessage};
use crate::model::work_item::WorkItem;

/// Issue tracker holding the work items being refined.
#[async_trait]
pub trait Tracker: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_items(&self, filter: &str, limit: u32) -> Result<Vec<WorkItem>, ApiError>;
    async fn add_comment(&self, key: &str, body: &str) -> Result<(), ApiError>;
    async fn replace_description(&self, key: &str, body: &str) -> Result<(), ApiError>;
    /// Display name of the authenticated account.
    async fn whoami(&self) -> Result<String, ApiError>;
}

/// Text-completion service. Returns the first choice, trimmed.
#[async_trait]
pub trait Completer: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ApiError>;
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    fn name(&self) -> &str;
    /// Plain user messages posted after `oldest` (unix seconds), oldest first.
    async fn channel_history(&self, channel: &str, oldest: i64) -> Result<Vec<ChannelPost>, ApiError>;
    /// Text of the newest document uploaded by `user`, if any.
    async fn latest_document(&self, user: &str, scan: u32) -> Result<Option<String>, ApiError>;
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ApiError>;
}

/// Shared HTTP client. The timeout is the only limit on a hung call.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("backlog-doctor/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

#[cfg(test)]
pub mod tests;
