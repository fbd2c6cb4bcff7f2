use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::write_back::WriteBackMode;

const DEFAULT_JQL: &str = r#"project = SCRUM AND status = "REFINING""#;
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Slack user id of the meeting-transcript bot whose uploads feed `standup --from transcript`.
const DEFAULT_TRANSCRIPT_USER: &str = "U02EL0XC88H";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub jira: JiraConfig,
    pub openai: OpenAiConfig,
    pub slack: SlackConfig,
    pub refine: RefineSettings,
    pub standup: StandupSettings,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jira: JiraConfig::default(),
            openai: OpenAiConfig::default(),
            slack: SlackConfig::default(),
            refine: RefineSettings::default(),
            standup: StandupSettings::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct JiraConfig {
    /// Either a bare site name (`acme`) or a full host (`acme.atlassian.net`).
    pub domain: Option<String>,
    pub email: Option<String>,
    pub api_token: Option<String>,
}

impl JiraConfig {
    pub fn base_url(&self) -> Result<String> {
        let domain = required(&self.domain, "JIRA_DOMAIN")?;
        let host = domain
            .trim_start_matches("https://")
            .trim_end_matches('/');
        if host.contains('.') {
            Ok(format!("https://{host}"))
        } else {
            Ok(format!("https://{host}.atlassian.net"))
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl OpenAiConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SlackConfig {
    pub token: Option<String>,
    pub prep_channel: Option<String>,
    pub post_channel: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefineSettings {
    pub jql: String,
    pub max_issues: u32,
    pub mode: WriteBackMode,
    pub model: String,
    pub min_output_chars: usize,
    pub log_dir: PathBuf,
}

impl Default for RefineSettings {
    fn default() -> Self {
        Self {
            jql: DEFAULT_JQL.to_string(),
            max_issues: 10,
            mode: WriteBackMode::Update,
            model: DEFAULT_MODEL.to_string(),
            min_output_chars: 60,
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StandupSettings {
    pub model: String,
    pub lookback_hours: i64,
    pub transcript_user: String,
    pub transcript_scan: u32,
}

impl Default for StandupSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            lookback_hours: 24,
            transcript_user: DEFAULT_TRANSCRIPT_USER.to_string(),
            transcript_scan: 20,
        }
    }
}

impl AppConfig {
    /// Overlay credentials and channels from the environment. Non-empty
    /// variables win over file values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        overlay(&mut self.jira.domain, var("JIRA_DOMAIN"));
        overlay(&mut self.jira.email, var("JIRA_EMAIL"));
        overlay(&mut self.jira.api_token, var("JIRA_TOKEN"));
        overlay(&mut self.openai.api_key, var("OPENAI_KEY"));
        overlay(&mut self.openai.base_url, var("OPENAI_BASE_URL"));
        overlay(&mut self.slack.token, var("SLACK_TOKEN"));
        overlay(&mut self.slack.prep_channel, var("PREP_CHANNEL"));
        overlay(&mut self.slack.post_channel, var("POST_CHANNEL"));
    }
}

fn overlay(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Look up a credential, naming the environment key in the error.
pub fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Missing {key}: set it in the environment, .env, or config.toml"))
}

pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".backlog-doctor")
        .join("config.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?
    } else {
        AppConfig::default()
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}
