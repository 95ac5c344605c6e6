//! Conversation data model
//!
//! Serde field names match the JSON the original web client stores, so
//! transcripts written by either side deserialize interchangeably.

use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
    Error,
}

/// Outcome of one analysis step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Complete,
    Error,
}

/// A finalized unit of analysis work within an assistant response.
///
/// `response` may itself be a JSON-encoded structured result (dataframe,
/// chart reference); it is opaque at this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub instruction: String,
    pub response: String,
    pub status: StepStatus,
}

/// One entry in the ordered conversation history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            steps: vec![],
        }
    }

    /// Create a finalized assistant message
    pub fn ai(content: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
            steps,
        }
    }

    /// Create a terminal error message
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Error,
            content: content.into(),
            steps: vec![],
        }
    }
}

/// Fallback conversation title when no user message exists yet
const DEFAULT_TITLE: &str = "New conversation";

/// How many characters of the first user message become the title
const TITLE_LEN: usize = 30;

/// One conversation: identity plus the ordered message history.
///
/// Owned by the session; every persistence write serializes the whole
/// aggregate, never a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "businessId")]
    pub business_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        business_id: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            business_id: business_id.into(),
            title: None,
            messages: vec![],
            created_at: Some(now.clone()),
            updated_at: Some(now),
        }
    }

    /// Create an empty conversation with a freshly minted id
    pub fn with_generated_id(user_id: impl Into<String>, business_id: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), user_id, business_id)
    }

    /// Derive a display title from the first user message
    pub fn derive_title(&self) -> String {
        let first = self
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or(DEFAULT_TITLE);

        if first.chars().count() > TITLE_LEN {
            let truncated: String = first.chars().take(TITLE_LEN).collect();
            format!("{}...", truncated)
        } else {
            first.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_value(ChatMessage::user("top products")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "user",
                "content": "top products",
                "steps": [],
            })
        );
    }

    #[test]
    fn test_ai_message_with_steps_round_trip() {
        let message = ChatMessage::ai(
            "top products",
            vec![
                Step {
                    instruction: "Generate SQL".to_string(),
                    response: "SELECT ...".to_string(),
                    status: StepStatus::Complete,
                },
                Step {
                    instruction: "Plot".to_string(),
                    response: "no backend".to_string(),
                    status: StepStatus::Error,
                },
            ],
        );
        let json = serde_json::to_string(&message).unwrap();
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
        assert!(json.contains("\"status\":\"error\""));
    }

    #[test]
    fn test_message_missing_steps_defaults_empty() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"type": "error", "content": "boom"}"#).unwrap();
        assert_eq!(message.role, Role::Error);
        assert!(message.steps.is_empty());
    }

    #[test]
    fn test_derive_title_short_message() {
        let mut conversation = Conversation::new("c1", "u1", "b1");
        conversation.messages.push(ChatMessage::user("top products"));
        assert_eq!(conversation.derive_title(), "top products");
    }

    #[test]
    fn test_derive_title_truncates_long_message() {
        let mut conversation = Conversation::new("c1", "u1", "b1");
        conversation.messages.push(ChatMessage::user(
            "show me the monthly revenue for every store in the north region",
        ));
        let title = conversation.derive_title();
        assert_eq!(title, "show me the monthly revenue fo...");
        assert_eq!(title.chars().count(), 33);
    }

    #[test]
    fn test_derive_title_skips_non_user_messages() {
        let mut conversation = Conversation::new("c1", "u1", "b1");
        conversation.messages.push(ChatMessage::error("boom"));
        assert_eq!(conversation.derive_title(), "New conversation");
    }

    #[test]
    fn test_conversation_wire_field_names() {
        let json = serde_json::to_value(Conversation::new("c1", "u1", "b1")).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("businessId").is_some());
        assert!(json.get("createdAt").is_some());
    }
}
