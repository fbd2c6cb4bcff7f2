use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use crate::config::{self, required, AppConfig, RefineSettings};
use crate::model::chat::ChatMessage;
use crate::model::write_back::WriteBackMode;
use crate::providers::jira::JiraProvider;
use crate::providers::openai::OpenAiProvider;
use crate::providers::slack::SlackProvider;
use crate::providers::{http_client, Completer, Tracker};
use crate::refine::log::{RunEvent, RunLog};
use crate::refine::BatchRefiner;
use crate::standup::{DigestOutcome, DigestSource, StandupDigest};

#[derive(Debug, Parser)]
#[command(name = "backlog-doctor", version, about = "Refine Jira tickets and stand-up notes through an LLM")]
pub struct Cli {
    /// Config file (default: ~/.backlog-doctor/config.toml)
    #[arg(long, global = true, env = "BACKLOG_DOCTOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rewrite matching tickets and write the result back (default)
    Refine(RefineArgs),
    /// Verify Jira and OpenAI credentials
    Check,
    /// Summarize stand-up notes and post the digest to Slack
    Standup(StandupArgs),
}

#[derive(Debug, Args, Default)]
pub struct RefineArgs {
    /// JQL filter selecting tickets to refine
    #[arg(long)]
    pub jql: Option<String>,
    /// Maximum tickets processed per run
    #[arg(long)]
    pub max_issues: Option<u32>,
    /// Post as a comment or replace the description
    #[arg(long, value_enum)]
    pub mode: Option<WriteBackMode>,
    #[arg(long)]
    pub model: Option<String>,
    /// Skip completions shorter than this many characters
    #[arg(long)]
    pub min_output_chars: Option<usize>,
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl RefineArgs {
    pub fn apply(self, settings: &mut RefineSettings) {
        if let Some(jql) = self.jql {
            settings.jql = jql;
        }
        if let Some(max) = self.max_issues {
            settings.max_issues = max;
        }
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(model) = self.model {
            settings.model = model;
        }
        if let Some(min) = self.min_output_chars {
            settings.min_output_chars = min;
        }
        if let Some(dir) = self.log_dir {
            settings.log_dir = dir;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Recent messages in the prep channel
    Prep,
    /// Latest uploaded meeting transcript
    Transcript,
}

#[derive(Debug, Args)]
pub struct StandupArgs {
    #[arg(long, value_enum, default_value_t = SourceKind::Prep)]
    pub from: SourceKind,
    #[arg(long)]
    pub prep_channel: Option<String>,
    #[arg(long)]
    pub post_channel: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
}

pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = config::load_config(cli.config.as_deref())?;
    match cli.command.unwrap_or(Command::Refine(RefineArgs::default())) {
        Command::Refine(args) => {
            args.apply(&mut config.refine);
            handle_refine(&config).await
        }
        Command::Check => handle_check(&config).await,
        Command::Standup(args) => handle_standup(&mut config, args).await,
    }
}

async fn handle_refine(config: &AppConfig) -> Result<()> {
    let log_dir = &config.refine.log_dir;
    let log = RunLog::create(log_dir, Utc::now())
        .with_context(|| format!("Failed to open run log in {}", log_dir.display()))?;
    info!(path = %log.path().display(), "Log file will be written");

    let (tracker, completer) = match refine_providers(config) {
        Ok(providers) => providers,
        Err(err) => {
            error!(error = %err, "Run failed");
            let _ = log.append(RunEvent::RunFailed {
                ts: Utc::now(),
                error: format!("{err:#}"),
            });
            return Err(err);
        }
    };

    let outcome = BatchRefiner::new(&tracker, &completer, &config.refine, &log)
        .run()
        .await?;

    info!(
        total = outcome.total(),
        processed = outcome.succeeded,
        skipped = outcome.skipped,
        errors = outcome.errored,
        "Run complete"
    );
    Ok(())
}

fn refine_providers(config: &AppConfig) -> Result<(JiraProvider, OpenAiProvider)> {
    let client = http_client(config.timeout_secs)?;
    let tracker = JiraProvider::from_config(&config.jira, client.clone())?;
    let completer = OpenAiProvider::from_config(&config.openai, client)?;
    Ok((tracker, completer))
}

async fn handle_check(config: &AppConfig) -> Result<()> {
    let client = http_client(config.timeout_secs)?;
    let mut failures = Vec::new();

    match JiraProvider::from_config(&config.jira, client.clone()) {
        Ok(jira) => match jira.whoami().await {
            Ok(name) => println!("Jira:   connected as {name}"),
            Err(e) => failures.push(format!("Jira: {e}")),
        },
        Err(e) => failures.push(format!("Jira: {e}")),
    }

    match OpenAiProvider::from_config(&config.openai, client) {
        Ok(openai) => {
            let hello = [ChatMessage::user("Say Hi!")];
            match openai.complete(&config.refine.model, &hello).await {
                Ok(reply) => println!("OpenAI: model says {reply:?}"),
                Err(e) => failures.push(format!("OpenAI: {e}")),
            }
        }
        Err(e) => failures.push(format!("OpenAI: {e}")),
    }

    if failures.is_empty() {
        return Ok(());
    }
    for failure in &failures {
        eprintln!("{failure}");
    }
    bail!("{} connectivity check(s) failed", failures.len());
}

async fn handle_standup(config: &mut AppConfig, args: StandupArgs) -> Result<()> {
    if let Some(model) = args.model {
        config.standup.model = model;
    }
    let post_channel = match args.post_channel {
        Some(channel) => channel,
        None => required(&config.slack.post_channel, "POST_CHANNEL")?.to_string(),
    };
    let source = match args.from {
        SourceKind::Prep => DigestSource::PrepChannel(match args.prep_channel {
            Some(channel) => channel,
            None => required(&config.slack.prep_channel, "PREP_CHANNEL")?.to_string(),
        }),
        SourceKind::Transcript => DigestSource::Transcript,
    };

    let client = http_client(config.timeout_secs)?;
    let chat = SlackProvider::from_config(&config.slack, client.clone())?;
    let completer = OpenAiProvider::from_config(&config.openai, client)?;

    match StandupDigest::new(&chat, &completer, &config.standup)
        .run(&source, &post_channel)
        .await?
    {
        DigestOutcome::Posted { chars } => println!("Digest posted to {post_channel} ({chars} chars)"),
        DigestOutcome::NothingToDigest => println!("Nothing to digest yet"),
    }
    Ok(())
}
