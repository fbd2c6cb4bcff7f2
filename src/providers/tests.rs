use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ChatPlatform, Completer, Tracker};
use crate::error::ApiError;
use crate::model::chat::{ChannelPost, ChatMessage};
use crate::model::work_item::WorkItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Comment(String, String),
    Description(String, String),
}

/// In-memory tracker that records every fetch and write.
pub struct FakeTracker {
    items: Vec<WorkItem>,
    fetch_status: Option<u16>,
    failing_writes: Vec<(String, u16)>,
    pub fetches: Arc<Mutex<Vec<(String, u32)>>>,
    pub writes: Arc<Mutex<Vec<Write>>>,
}

impl FakeTracker {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self {
            items,
            fetch_status: None,
            failing_writes: Vec::new(),
            fetches: Arc::new(Mutex::new(Vec::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_fetch_failure(mut self, status: u16) -> Self {
        self.fetch_status = Some(status);
        self
    }

    pub fn with_write_failure(mut self, key: &str, status: u16) -> Self {
        self.failing_writes.push((key.to_string(), status));
        self
    }

    fn write(&self, key: &str, record: Write) -> Result<(), ApiError> {
        if let Some((_, status)) = self.failing_writes.iter().find(|(k, _)| k == key) {
            return Err(ApiError::from_status(
                "FakeTracker",
                *status,
                r#"{"errorMessages":["write rejected"]}"#,
            ));
        }
        self.writes.lock().unwrap().push(record);
        Ok(())
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    fn name(&self) -> &str {
        "FakeTracker"
    }

    async fn fetch_items(&self, filter: &str, limit: u32) -> Result<Vec<WorkItem>, ApiError> {
        self.fetches.lock().unwrap().push((filter.to_string(), limit));
        if let Some(status) = self.fetch_status {
            return Err(ApiError::from_status("FakeTracker", status, ""));
        }
        Ok(self.items.iter().take(limit as usize).cloned().collect())
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<(), ApiError> {
        self.write(key, Write::Comment(key.into(), body.into()))
    }

    async fn replace_description(&self, key: &str, body: &str) -> Result<(), ApiError> {
        self.write(key, Write::Description(key.into(), body.into()))
    }

    async fn whoami(&self) -> Result<String, ApiError> {
        Ok("Fake User".into())
    }
}

/// Completer that replays scripted answers in call order.
pub struct FakeCompleter {
    script: Mutex<VecDeque<Result<String, ApiError>>>,
    pub calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl FakeCompleter {
    pub fn new(script: Vec<Result<String, ApiError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }
}

#[async_trait]
impl Completer for FakeCompleter {
    fn name(&self) -> &str {
        "FakeCompleter"
    }

    async fn complete(&self, _model: &str, messages: &[ChatMessage]) -> Result<String, ApiError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::malformed("FakeCompleter", "script exhausted")))
    }
}

/// Chat platform with a fixed history and transcript.
#[derive(Default)]
pub struct FakeChat {
    pub history: Vec<ChannelPost>,
    pub document: Option<String>,
    pub posted: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl ChatPlatform for FakeChat {
    fn name(&self) -> &str {
        "FakeChat"
    }

    async fn channel_history(&self, _channel: &str, _oldest: i64) -> Result<Vec<ChannelPost>, ApiError> {
        Ok(self.history.clone())
    }

    async fn latest_document(&self, _user: &str, _scan: u32) -> Result<Option<String>, ApiError> {
        Ok(self.document.clone())
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ApiError> {
        self.posted.lock().unwrap().push((channel.into(), text.into()));
        Ok(())
    }
}

pub fn item(id: &str, title: &str, description: Option<&str>) -> WorkItem {
    WorkItem::new(id, title, description.map(String::from))
}

#[tokio::test]
async fn fake_tracker_respects_limit() {
    let tracker = FakeTracker::new(vec![
        item("A-1", "one", None),
        item("A-2", "two", None),
        item("A-3", "three", None),
    ]);
    let items = tracker.fetch_items("any", 2).await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn tracker_usable_as_trait_object() {
    let trackers: Vec<Box<dyn Tracker>> = vec![Box::new(FakeTracker::new(vec![]))];
    let tracker = trackers.iter().find(|t| t.name() == "FakeTracker").unwrap();
    assert_eq!(tracker.whoami().await.unwrap(), "Fake User");
}

#[tokio::test]
async fn failing_write_leaves_no_record() {
    let tracker = FakeTracker::new(vec![]).with_write_failure("A-1", 403);
    let err = tracker.add_comment("A-1", "text").await.unwrap_err();
    assert_eq!(err.status_code(), Some(403));
    assert!(tracker.writes.lock().unwrap().is_empty());
}

#[test]
fn work_item_serialization_omits_missing_description() {
    let json = serde_json::to_string(&item("A-1", "t", None)).unwrap();
    assert!(!json.contains("description"));

    let back: WorkItem = serde_json::from_str(r#"{"id":"A-1","title":"t"}"#).unwrap();
    assert_eq!(back.description, None);
}
