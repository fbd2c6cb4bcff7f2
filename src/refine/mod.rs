pub mod log;
pub mod prompt;

use std::fmt;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::RefineSettings;
use crate::error::ApiError;
use crate::model::chat::ChatMessage;
use crate::model::work_item::WorkItem;
use crate::model::write_back::WriteBackMode;
use crate::providers::{Completer, Tracker};

use self::log::{ItemError, ItemOutcome, RunEvent, RunLog, Stage};
use self::prompt::{build_request, is_acceptable};

/// Errors that end a refinement run. Per-item failures never show up here.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("Failed to fetch work items: {0}")]
    Fetch(#[source] ApiError),

    #[error("Failed to write run log: {0}")]
    Log(#[from] std::io::Error),
}

/// Final state of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Ok,
    SkippedOutputTooShort,
    /// `ERROR_<http status>` or `ERROR_UNKNOWN`.
    Error(String),
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::SkippedOutputTooShort => f.write_str("SKIPPED_OUTPUT_TOO_SHORT"),
            Self::Error(tag) => f.write_str(tag),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub succeeded: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl RunOutcome {
    fn record(&mut self, status: &ItemStatus) {
        match status {
            ItemStatus::Ok => self.succeeded += 1,
            ItemStatus::SkippedOutputTooShort => self.skipped += 1,
            ItemStatus::Error(_) => self.errored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.errored
    }
}

struct Processed {
    status: ItemStatus,
    completion_chars: usize,
    failure: Option<(Stage, ApiError)>,
}

impl Processed {
    fn failed(stage: Stage, err: ApiError, completion_chars: usize) -> Self {
        Self {
            status: ItemStatus::Error(err.status_tag()),
            completion_chars,
            failure: Some((stage, err)),
        }
    }
}

/// Fetches matching work items, rewrites each through the completer and
/// writes the result back to the tracker, one item at a time.
pub struct BatchRefiner<'a> {
    tracker: &'a dyn Tracker,
    completer: &'a dyn Completer,
    settings: &'a RefineSettings,
    log: &'a RunLog,
}

impl<'a> BatchRefiner<'a> {
    pub fn new(
        tracker: &'a dyn Tracker,
        completer: &'a dyn Completer,
        settings: &'a RefineSettings,
        log: &'a RunLog,
    ) -> Self {
        Self {
            tracker,
            completer,
            settings,
            log,
        }
    }

    /// Run one batch. A fatal error is recorded as `Run failed` before it is
    /// returned; that record is best-effort.
    pub async fn run(&self) -> Result<RunOutcome, RefineError> {
        match self.run_batch().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(error = %err, "Run failed");
                let _ = self.log.append(RunEvent::RunFailed {
                    ts: Utc::now(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_batch(&self) -> Result<RunOutcome, RefineError> {
        self.log.append(RunEvent::RunStarted {
            ts: Utc::now(),
            jql: self.settings.jql.clone(),
            max_issues: self.settings.max_issues,
            mode: self.settings.mode,
        })?;

        let items = self
            .tracker
            .fetch_items(&self.settings.jql, self.settings.max_issues)
            .await
            .map_err(RefineError::Fetch)?;

        info!(count = items.len(), tracker = self.tracker.name(), "Found issue(s) matching filter");
        self.log.append(RunEvent::IssuesFetched {
            ts: Utc::now(),
            count: items.len(),
        })?;

        let mut outcome = RunOutcome::default();
        for item in &items {
            let status = self.process_item(item).await?;
            outcome.record(&status);
        }

        info!(
            processed = outcome.succeeded,
            skipped = outcome.skipped,
            errors = outcome.errored,
            "Run summary"
        );
        self.log.append(RunEvent::RunSummary {
            ts: Utc::now(),
            processed: outcome.succeeded,
            skipped: outcome.skipped,
            errors: outcome.errored,
        })?;

        Ok(outcome)
    }

    async fn process_item(&self, item: &WorkItem) -> Result<ItemStatus, RefineError> {
        let request = build_request(item);
        let processed = self.transform_and_write(item, &request.messages()).await;

        if let Some((stage, err)) = &processed.failure {
            let details = err
                .details()
                .map(|d| serde_json::Value::Object(d.clone()))
                .unwrap_or(serde_json::Value::Null);
            error!(
                issue = %item.id,
                stage = ?stage,
                status = %processed.status,
                details = %details,
                "{} failed: {err}",
                item.id
            );
            self.log.append(ItemError {
                ts: Utc::now(),
                issue: item.id.clone(),
                status: processed.status.to_string(),
                stage: *stage,
                error_message: err.to_string(),
                details,
            })?;
        }

        self.log.append(ItemOutcome {
            ts: Utc::now(),
            issue: item.id.clone(),
            status: processed.status.to_string(),
            prompt_chars: request.prompt_chars(),
            completion_chars: processed.completion_chars,
            stage: processed.failure.as_ref().map(|(stage, _)| *stage),
        })?;

        match processed.status {
            ItemStatus::Ok => info!(issue = %item.id, mode = %self.settings.mode, "{} processed", item.id),
            ItemStatus::SkippedOutputTooShort => warn!(
                issue = %item.id,
                completion_chars = processed.completion_chars,
                min = self.settings.min_output_chars,
                "{} skipped: output too short",
                item.id
            ),
            ItemStatus::Error(_) => {}
        }

        Ok(processed.status)
    }

    async fn transform_and_write(
        &self,
        item: &WorkItem,
        messages: &[ChatMessage],
    ) -> Processed {
        let text = match self.completer.complete(&self.settings.model, messages).await {
            Ok(text) => text,
            Err(err) => return Processed::failed(Stage::Transform, err, 0),
        };
        let completion_chars = text.chars().count();

        if !is_acceptable(&text, self.settings.min_output_chars) {
            return Processed {
                status: ItemStatus::SkippedOutputTooShort,
                completion_chars,
                failure: None,
            };
        }

        match self.write_back(item, &text).await {
            Ok(()) => Processed {
                status: ItemStatus::Ok,
                completion_chars,
                failure: None,
            },
            Err(err) => Processed::failed(Stage::WriteBack, err, completion_chars),
        }
    }

    async fn write_back(&self, item: &WorkItem, text: &str) -> Result<(), ApiError> {
        match self.settings.mode {
            WriteBackMode::Comment => self.tracker.add_comment(&item.id, text).await,
            WriteBackMode::Update => self.tracker.replace_description(&item.id, text).await,
        }
    }
}
