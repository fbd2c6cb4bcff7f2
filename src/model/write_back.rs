use std::fmt;

use serde::{Deserialize, Serialize};

/// Where refined text lands on the tracker. Fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
#[value(rename_all = "UPPERCASE")]
pub enum WriteBackMode {
    /// Append the text as a new comment.
    Comment,
    /// Replace the item's description.
    Update,
}

impl WriteBackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "COMMENT",
            Self::Update => "UPDATE",
        }
    }
}

impl fmt::Display for WriteBackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_uppercase_names() {
        assert_eq!(serde_json::to_string(&WriteBackMode::Comment).unwrap(), r#""COMMENT""#);
        let mode: WriteBackMode = serde_json::from_str(r#""UPDATE""#).unwrap();
        assert_eq!(mode, WriteBackMode::Update);
    }

    #[test]
    fn lowercase_is_rejected_in_config() {
        assert!(serde_json::from_str::<WriteBackMode>(r#""comment""#).is_err());
    }
}
