use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::write_back::WriteBackMode;

/// Where in the per-item pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transform,
    WriteBack,
}

/// Run-level milestones, tagged by their `msg` text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg")]
pub enum RunEvent {
    #[serde(rename = "Log started")]
    LogStarted { ts: DateTime<Utc> },
    #[serde(rename = "Run started")]
    RunStarted {
        ts: DateTime<Utc>,
        jql: String,
        #[serde(rename = "maxIssues")]
        max_issues: u32,
        mode: WriteBackMode,
    },
    #[serde(rename = "Issues fetched")]
    IssuesFetched { ts: DateTime<Utc>, count: usize },
    #[serde(rename = "Run failed")]
    RunFailed { ts: DateTime<Utc>, error: String },
    #[serde(rename = "Run summary")]
    RunSummary {
        ts: DateTime<Utc>,
        processed: usize,
        skipped: usize,
        errors: usize,
    },
}

/// Exactly one of these is written per fetched item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub ts: DateTime<Utc>,
    pub issue: String,
    pub status: String,
    pub prompt_chars: usize,
    pub completion_chars: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

/// Extra line carrying the service's error payload for a failed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    pub ts: DateTime<Utc>,
    pub issue: String,
    pub status: String,
    pub stage: Stage,
    pub error_message: String,
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunLogEntry {
    Event(RunEvent),
    Outcome(ItemOutcome),
    Error(ItemError),
}

impl From<RunEvent> for RunLogEntry {
    fn from(event: RunEvent) -> Self {
        Self::Event(event)
    }
}

impl From<ItemOutcome> for RunLogEntry {
    fn from(outcome: ItemOutcome) -> Self {
        Self::Outcome(outcome)
    }
}

impl From<ItemError> for RunLogEntry {
    fn from(error: ItemError) -> Self {
        Self::Error(error)
    }
}

/// Append-only JSONL file for one run, named after the run's start time.
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn create(dir: &Path, started: DateTime<Utc>) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let log = Self {
            path: dir.join(format!("run-{}.jsonl", started.timestamp_millis())),
        };
        log.append(RunEvent::LogStarted { ts: started })?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: impl Into<RunLogEntry>) -> io::Result<()> {
        let line = serde_json::to_string(&entry.into()).map_err(io::Error::other)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

/// Read a run log back. Unparseable lines are skipped.
#[cfg(test)]
pub fn read_entries(path: &Path) -> io::Result<Vec<RunLogEntry>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn create_names_file_by_start_millis_and_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(&dir.path().join("logs"), ts()).unwrap();

        assert_eq!(
            log.path().file_name().unwrap().to_str().unwrap(),
            format!("run-{}.jsonl", ts().timestamp_millis())
        );
        let entries = read_entries(log.path()).unwrap();
        assert_eq!(entries, vec![RunLogEntry::Event(RunEvent::LogStarted { ts: ts() })]);
    }

    #[test]
    fn entries_are_flat_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(dir.path(), ts()).unwrap();
        log.append(ItemOutcome {
            ts: ts(),
            issue: "SCRUM-9".into(),
            status: "OK".into(),
            prompt_chars: 1200,
            completion_chars: 340,
            stage: None,
        })
        .unwrap();
        log.append(RunEvent::RunSummary {
            ts: ts(),
            processed: 1,
            skipped: 0,
            errors: 0,
        })
        .unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 3);

        let outcome: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(outcome["issue"], "SCRUM-9");
        assert_eq!(outcome["promptChars"], 1200);
        assert_eq!(outcome["completionChars"], 340);
        assert!(outcome.get("stage").is_none());

        let summary: Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(summary["msg"], "Run summary");
        assert_eq!(summary["processed"], 1);
    }

    #[test]
    fn untagged_entries_read_back_as_their_shape() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(dir.path(), ts()).unwrap();
        let error = ItemError {
            ts: ts(),
            issue: "SCRUM-3".into(),
            status: "ERROR_429".into(),
            stage: Stage::Transform,
            error_message: "OpenAI returned HTTP 429".into(),
            details: serde_json::json!({ "error": { "message": "slow down" } }),
        };
        let outcome = ItemOutcome {
            ts: ts(),
            issue: "SCRUM-3".into(),
            status: "ERROR_429".into(),
            prompt_chars: 10,
            completion_chars: 0,
            stage: Some(Stage::Transform),
        };
        log.append(error.clone()).unwrap();
        log.append(outcome.clone()).unwrap();

        let entries = read_entries(log.path()).unwrap();
        assert_eq!(entries[1], RunLogEntry::Error(error));
        assert_eq!(entries[2], RunLogEntry::Outcome(outcome));
    }

    #[test]
    fn append_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(dir.path(), ts()).unwrap();
        for count in 0..5 {
            log.append(RunEvent::IssuesFetched { ts: ts(), count }).unwrap();
        }
        assert_eq!(read_entries(log.path()).unwrap().len(), 6);
    }
}
