//! Persistence gateway for conversation transcripts
//!
//! The session treats the store as an external collaborator with
//! last-write-wins semantics: every write carries the full message history,
//! so out-of-order completion of two writes still converges on the later
//! snapshot. `HttpStore` talks to the remote conversation service;
//! `FileStore` is the local JSON-file fallback.

use crate::{
    error::{Error, Result},
    message::{ChatMessage, Conversation},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Listing entry for a stored conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "businessId")]
    pub business_id: String,
    pub title: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
}

/// External store for conversation transcripts.
///
/// All calls except the initial `fetch` are issued fire-and-forget by the
/// session; implementations should not assume the caller observes failures.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a conversation record (first write of a session)
    async fn create(&self, conversation: &Conversation) -> Result<()>;

    /// Replace the stored message history of an existing conversation
    async fn update(&self, id: &str, messages: &[ChatMessage]) -> Result<()>;

    /// Fetch a conversation by owner and id; `None` if it does not exist
    async fn fetch(&self, user_id: &str, id: &str) -> Result<Option<Conversation>>;

    /// Delete a conversation by id
    async fn delete(&self, id: &str) -> Result<()>;

    /// List a user's conversations, newest first
    async fn list(&self, user_id: &str) -> Result<Vec<ConversationSummary>>;
}

// ============================================================================
// Remote HTTP store
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    id: &'a str,
    #[serde(rename = "userId")]
    user_id: &'a str,
    #[serde(rename = "businessId")]
    business_id: &'a str,
    title: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    messages: &'a [ChatMessage],
}

/// Store backed by the remote conversation service
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    /// Create a store for the given service base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Store(format!("{}: {}", status.as_u16(), body)))
    }
}

#[async_trait]
impl ConversationStore for HttpStore {
    async fn create(&self, conversation: &Conversation) -> Result<()> {
        let title = conversation
            .title
            .clone()
            .unwrap_or_else(|| conversation.derive_title());
        let response = self
            .client
            .post(format!("{}/conversations", self.base_url))
            .json(&CreateRequest {
                id: &conversation.id,
                user_id: &conversation.user_id,
                business_id: &conversation.business_id,
                title: &title,
                messages: &conversation.messages,
            })
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, id: &str, messages: &[ChatMessage]) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/conversations/{}", self.base_url, id))
            .json(&UpdateRequest { messages })
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch(&self, user_id: &str, id: &str) -> Result<Option<Conversation>> {
        let response = self
            .client
            .get(format!("{}/conversations/{}/{}", self.base_url, user_id, id))
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response).await?;
        let conversation = response
            .json::<Conversation>()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(Some(conversation))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/conversations/{}", self.base_url, id))
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        let response = self
            .client
            .get(format!("{}/conversations/{}", self.base_url, user_id))
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        let response = Self::check(response).await?;
        response
            .json::<Vec<ConversationSummary>>()
            .await
            .map_err(|e| Error::Store(e.to_string()))
    }
}

// ============================================================================
// Local file fallback store
// ============================================================================

/// On-disk record, one JSON file per conversation
#[derive(Debug, Serialize, Deserialize)]
struct StoredConversation {
    id: String,
    user_id: String,
    business_id: String,
    title: String,
    messages: Vec<ChatMessage>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl StoredConversation {
    fn into_conversation(self) -> Conversation {
        Conversation {
            id: self.id,
            user_id: self.user_id,
            business_id: self.business_id,
            title: Some(self.title),
            messages: self.messages,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fallback store writing `conversation_<id>.json` files under a data dir
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default data directory for conversation files
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("atlas")
            .join("conversations")
    }

    fn path(&self, id: &str) -> PathBuf {
        self.root.join(format!("conversation_{}.json", id))
    }

    fn read_record(path: &Path) -> Result<StoredConversation> {
        let content = fs::read_to_string(path).map_err(|e| Error::Store(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Error::Store(e.to_string()))
    }

    fn write_record(&self, record: &StoredConversation) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| Error::Store(e.to_string()))?;
        let content =
            serde_json::to_string_pretty(record).map_err(|e| Error::Store(e.to_string()))?;
        fs::write(self.path(&record.id), content).map_err(|e| Error::Store(e.to_string()))
    }
}

#[async_trait]
impl ConversationStore for FileStore {
    async fn create(&self, conversation: &Conversation) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let record = StoredConversation {
            id: conversation.id.clone(),
            user_id: conversation.user_id.clone(),
            business_id: conversation.business_id.clone(),
            title: conversation
                .title
                .clone()
                .unwrap_or_else(|| conversation.derive_title()),
            messages: conversation.messages.clone(),
            created_at: conversation.created_at.clone().or_else(|| Some(now.clone())),
            updated_at: Some(now),
        };
        self.write_record(&record)
    }

    async fn update(&self, id: &str, messages: &[ChatMessage]) -> Result<()> {
        let path = self.path(id);
        if !path.exists() {
            return Err(Error::Store(format!("Conversation not found: {}", id)));
        }
        let mut record = Self::read_record(&path)?;
        record.messages = messages.to_vec();
        record.updated_at = Some(chrono::Utc::now().to_rfc3339());
        self.write_record(&record)
    }

    async fn fetch(&self, user_id: &str, id: &str) -> Result<Option<Conversation>> {
        let path = self.path(id);
        if !path.exists() {
            return Ok(None);
        }
        let record = Self::read_record(&path)?;
        if record.user_id != user_id {
            tracing::warn!("Conversation {} is not owned by {}", id, user_id);
            return Ok(None);
        }
        Ok(Some(record.into_conversation()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path(id);
        if !path.exists() {
            return Err(Error::Store(format!("Conversation not found: {}", id)));
        }
        fs::remove_file(path).map_err(|e| Error::Store(e.to_string()))
    }

    async fn list(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut summaries = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|e| Error::Store(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::Store(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path) {
                Ok(record) if record.user_id == user_id => {
                    summaries.push(ConversationSummary {
                        id: record.id,
                        user_id: record.user_id,
                        business_id: record.business_id,
                        title: record.title,
                        created_at: record.created_at,
                        updated_at: record.updated_at,
                    });
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }

        // RFC 3339 timestamps in UTC sort lexicographically
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChatMessage;

    fn temp_store() -> FileStore {
        let root = std::env::temp_dir()
            .join("atlas-store-tests")
            .join(uuid::Uuid::new_v4().to_string());
        FileStore::new(root)
    }

    fn sample_conversation(id: &str, user_id: &str) -> Conversation {
        let mut conversation = Conversation::new(id, user_id, "biz-1");
        conversation.messages.push(ChatMessage::user("top products"));
        conversation
            .messages
            .push(ChatMessage::ai("top products", vec![]));
        conversation
    }

    #[tokio::test]
    async fn test_create_then_fetch_round_trip() {
        let store = temp_store();
        let conversation = sample_conversation("c1", "u1");
        store.create(&conversation).await.unwrap();

        let fetched = store.fetch("u1", "c1").await.unwrap().unwrap();
        assert_eq!(fetched.messages, conversation.messages);
        assert_eq!(fetched.title.as_deref(), Some("top products"));
    }

    #[tokio::test]
    async fn test_fetch_missing_is_none() {
        let store = temp_store();
        assert!(store.fetch("u1", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_wrong_owner_is_none() {
        let store = temp_store();
        store.create(&sample_conversation("c1", "u1")).await.unwrap();
        assert!(store.fetch("someone-else", "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_messages_in_order() {
        let store = temp_store();
        let conversation = sample_conversation("c1", "u1");
        store.create(&conversation).await.unwrap();

        let mut messages = conversation.messages.clone();
        messages.push(ChatMessage::user("and by region?"));
        messages.push(ChatMessage::error("backend down"));
        store.update("c1", &messages).await.unwrap();

        let fetched = store.fetch("u1", "c1").await.unwrap().unwrap();
        assert_eq!(fetched.messages, messages);
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let store = temp_store();
        let err = store.update("ghost", &[]).await.unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {}", err);
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = temp_store();
        store.create(&sample_conversation("c1", "u1")).await.unwrap();
        store.delete("c1").await.unwrap();
        assert!(store.fetch("u1", "c1").await.unwrap().is_none());
        assert!(store.delete("c1").await.is_err());
    }

    #[tokio::test]
    async fn test_list_filters_owner_and_sorts_newest_first() {
        let store = temp_store();

        let mut first = sample_conversation("c1", "u1");
        first.updated_at = Some("2026-01-01T00:00:00+00:00".to_string());
        let mut second = sample_conversation("c2", "u1");
        second.updated_at = Some("2026-02-01T00:00:00+00:00".to_string());
        let other = sample_conversation("c3", "u2");

        store.create(&first).await.unwrap();
        store.create(&second).await.unwrap();
        store.create(&other).await.unwrap();

        // create() stamps updated_at itself; rewrite the two we control via
        // the raw records so ordering is deterministic.
        for (id, stamp) in [("c1", "2026-01-01T00:00:00+00:00"), ("c2", "2026-02-01T00:00:00+00:00")] {
            let path = store.path(id);
            let mut record = FileStore::read_record(&path).unwrap();
            record.updated_at = Some(stamp.to_string());
            store.write_record(&record).unwrap();
        }

        let summaries = store.list("u1").await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "c2");
        assert_eq!(summaries[1].id, "c1");
    }

    #[tokio::test]
    async fn test_list_empty_root() {
        let store = temp_store();
        assert!(store.list("u1").await.unwrap().is_empty());
    }
}
