use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged message sent to a completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A message read back from a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPost {
    pub user: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let json = serde_json::to_value([ChatMessage::system("persona"), ChatMessage::user("ask")]).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "role": "system", "content": "persona" },
                { "role": "user", "content": "ask" }
            ])
        );
    }
}
