use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Tracker key, e.g. `SCRUM-42`.
    pub id: String,
    pub title: String,
    /// Plain text flattened from the tracker's rich-text body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description,
        }
    }
}
