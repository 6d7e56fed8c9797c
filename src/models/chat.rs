use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text shown inside the transient placeholder while a reply is pending.
pub const THINKING_TEXT: &str = "Thinking...";

/// Speaker of a conversation turn. The lowercase serialized form is
/// shared by persisted history and the completion API wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Data URL for display, present on user messages with an attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Marks the in-flight placeholder; never written to storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_thinking: Option<bool>,
}

impl Message {
    pub fn user(content: &str, image: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.to_string(),
            image,
            is_thinking: None,
        }
    }

    pub fn model(content: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Model,
            content: content.to_string(),
            image: None,
            is_thinking: None,
        }
    }

    /// Placeholder appended to the live timeline while a request is in
    /// flight.
    pub fn thinking() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Model,
            content: THINKING_TEXT.to_string(),
            image: None,
            is_thinking: Some(true),
        }
    }

    pub fn is_thinking(&self) -> bool {
        self.is_thinking == Some(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionListItem {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub date: DateTime<Utc>,
}

impl From<&ChatSession> for ChatSessionListItem {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id.clone(),
            title: session.title.clone(),
            message_count: session.messages.len(),
            date: session.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thinking_flag_is_not_serialized_when_absent() {
        let message = Message::user("hello", None);
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("isThinking").is_none());
        assert!(json.get("image").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn list_item_reflects_session() {
        let session = ChatSession {
            id: "abc".to_string(),
            title: "Hello".to_string(),
            date: Utc::now(),
            messages: vec![Message::user("hi", None), Message::model("hey")],
        };
        let item = ChatSessionListItem::from(&session);
        assert_eq!(item.id, "abc");
        assert_eq!(item.message_count, 2);
    }
}
