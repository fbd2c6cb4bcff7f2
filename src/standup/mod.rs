pub mod prompt;
pub mod transcript;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tracing::info;

use crate::config::StandupSettings;
use crate::model::chat::ChatMessage;
use crate::providers::{ChatPlatform, Completer};

use self::prompt::build_digest_prompt;
use self::transcript::clean_transcript;

/// Where the raw stand-up text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestSource {
    /// Last `lookback_hours` of plain messages in a prep channel.
    PrepChannel(String),
    /// Newest transcript document uploaded by the transcript bot.
    Transcript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    Posted { chars: usize },
    NothingToDigest,
}

pub struct StandupDigest<'a> {
    chat: &'a dyn ChatPlatform,
    completer: &'a dyn Completer,
    settings: &'a StandupSettings,
}

impl<'a> StandupDigest<'a> {
    pub fn new(
        chat: &'a dyn ChatPlatform,
        completer: &'a dyn Completer,
        settings: &'a StandupSettings,
    ) -> Self {
        Self {
            chat,
            completer,
            settings,
        }
    }

    pub async fn run(&self, source: &DigestSource, post_channel: &str) -> Result<DigestOutcome> {
        let raw = self.collect(source).await?;
        if raw.trim().is_empty() {
            info!(?source, "Nothing to digest yet");
            return Ok(DigestOutcome::NothingToDigest);
        }

        let messages = [ChatMessage::user(build_digest_prompt(&raw))];
        let digest = self
            .completer
            .complete(&self.settings.model, &messages)
            .await
            .with_context(|| format!("{} completion failed", self.completer.name()))?;

        self.chat
            .post_message(post_channel, digest.trim())
            .await
            .with_context(|| format!("Failed to post digest to {} channel {post_channel}", self.chat.name()))?;

        info!(channel = post_channel, "Digest posted");
        Ok(DigestOutcome::Posted {
            chars: digest.trim().chars().count(),
        })
    }

    async fn collect(&self, source: &DigestSource) -> Result<String> {
        match source {
            DigestSource::PrepChannel(channel) => {
                let oldest = (Utc::now() - Duration::hours(self.settings.lookback_hours)).timestamp();
                let posts = self
                    .chat
                    .channel_history(channel, oldest)
                    .await
                    .with_context(|| format!("Failed to read history of {channel}"))?;
                Ok(posts
                    .iter()
                    .map(|p| format!("{}: {}", p.user, p.text))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            DigestSource::Transcript => {
                let doc = self
                    .chat
                    .latest_document(&self.settings.transcript_user, self.settings.transcript_scan)
                    .await
                    .context("Failed to fetch latest transcript")?;
                Ok(doc.map(|d| clean_transcript(&d)).unwrap_or_default())
            }
        }
    }
}
