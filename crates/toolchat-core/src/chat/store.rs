//! Chat persistence
//!
//! A chat is stored as one JSON document holding its id, creation time and
//! message history. Loading an id that was never saved yields a fresh, empty
//! chat, so callers never need a separate "create" step.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};
use crate::logging::Logger;
use crate::types::ChatMessage;

/// Preview shown for a chat without messages
pub const EMPTY_PREVIEW: &str = "New chat";

const PREVIEW_CHARS: usize = 50;

/// One persisted conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

impl ChatRecord {
    /// Empty chat created now
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> ChatSummary {
        let preview = self
            .messages
            .first()
            .map(|m| m.content.chars().take(PREVIEW_CHARS).collect())
            .unwrap_or_else(|| EMPTY_PREVIEW.to_string());

        ChatSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            preview,
        }
    }
}

/// Listing entry for a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub preview: String,
}

fn newest_first(mut summaries: Vec<ChatSummary>) -> Vec<ChatSummary> {
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    summaries
}

/// Storage backend for chats
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Load a chat; an unknown id gives a new empty record
    async fn load(&self, id: &str) -> StoreResult<ChatRecord>;

    /// Create or replace a chat
    async fn save(&self, record: &ChatRecord) -> StoreResult<()>;

    /// Summaries of every chat, newest first
    async fn list(&self) -> StoreResult<Vec<ChatSummary>>;

    /// Remove a chat
    async fn delete(&self, id: &str) -> StoreResult<()>;
}

/// In-memory chat store
#[derive(Default)]
pub struct MemoryChatStore {
    chats: RwLock<HashMap<String, ChatRecord>>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn load(&self, id: &str) -> StoreResult<ChatRecord> {
        Ok(self
            .chats
            .read()
            .get(id)
            .cloned()
            .unwrap_or_else(|| ChatRecord::new(id)))
    }

    async fn save(&self, record: &ChatRecord) -> StoreResult<()> {
        self.chats.write().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<ChatSummary>> {
        Ok(newest_first(
            self.chats.read().values().map(ChatRecord::summary).collect(),
        ))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.chats
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// Chat store keeping one `<id>.json` file per chat in a directory
pub struct FileChatStore {
    dir: PathBuf,
    logger: Arc<dyn Logger>,
}

impl FileChatStore {
    pub fn new(dir: impl Into<PathBuf>, logger: Arc<dyn Logger>) -> Self {
        Self {
            dir: dir.into(),
            logger,
        }
    }

    /// Default chat directory (~/.local/share/toolchat/chats on Linux)
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("toolchat")
            .join("chats")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> StoreResult<PathBuf> {
        let usable = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.contains('\0');
        if !usable {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl ChatStore for FileChatStore {
    async fn load(&self, id: &str) -> StoreResult<ChatRecord> {
        let path = self.path_for(id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.logger.debug(&format!(
                    "[FileChatStore] Chat {} not found, creating new chat",
                    id
                ));
                Ok(ChatRecord::new(id))
            }
            Err(e) => {
                self.logger
                    .error(&format!("[FileChatStore] Error loading chat {}: {}", id, e));
                Err(e.into())
            }
        }
    }

    async fn save(&self, record: &ChatRecord) -> StoreResult<()> {
        let path = self.path_for(&record.id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let content = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, content).await?;
        self.logger
            .debug(&format!("[FileChatStore] Chat {} saved", record.id));
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<ChatSummary>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<ChatRecord>(&content) {
                Ok(record) => summaries.push(record.summary()),
                Err(e) => self.logger.warn(&format!(
                    "[FileChatStore] Skipping unreadable chat file {}: {}",
                    path.display(),
                    e
                )),
            }
        }

        Ok(newest_first(summaries))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use chrono::Duration;

    fn record(id: &str, first: Option<&str>, age_minutes: i64) -> ChatRecord {
        ChatRecord {
            id: id.to_string(),
            messages: first.map(ChatMessage::user).into_iter().collect(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn test_summary_preview() {
        let long = "x".repeat(80);
        assert_eq!(record("a", Some(&long), 0).summary().preview.len(), 50);
        assert_eq!(record("b", Some("hi"), 0).summary().preview, "hi");
        assert_eq!(record("c", None, 0).summary().preview, EMPTY_PREVIEW);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryChatStore::new();
        let fresh = store.load("abc").await.unwrap();
        assert_eq!(fresh.id, "abc");
        assert!(fresh.messages.is_empty());
        assert!(store.list().await.unwrap().is_empty());

        store.save(&record("old", Some("first"), 10)).await.unwrap();
        store.save(&record("new", None, 0)).await.unwrap();

        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["new", "old"]);

        store.delete("old").await.unwrap();
        assert!(matches!(store.delete("old").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChatStore::new(dir.path().join("chats"), Arc::new(NoOpLogger));

        // Listing a directory that does not exist yet is empty.
        assert!(store.list().await.unwrap().is_empty());

        let mut chat = store.load("c1").await.unwrap();
        chat.messages.push(ChatMessage::user("What is in /tmp?"));
        chat.messages.push(ChatMessage::assistant("Two files."));
        store.save(&chat).await.unwrap();

        assert!(dir.path().join("chats").join("c1.json").exists());
        let loaded = store.load("c1").await.unwrap();
        assert_eq!(loaded, chat);
    }

    #[tokio::test]
    async fn test_file_store_list_sorted_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(MemoryLogger::new());
        let store = FileChatStore::new(dir.path(), logger.clone());

        store.save(&record("older", Some("hello"), 60)).await.unwrap();
        store.save(&record("newer", None, 1)).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let summaries = store.list().await.unwrap();
        let ids: Vec<_> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);
        assert_eq!(summaries[0].preview, EMPTY_PREVIEW);
        assert_eq!(summaries[1].preview, "hello");
        assert!(logger.contains(LogLevel::Warn, "broken.json"));
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChatStore::new(dir.path(), Arc::new(NoOpLogger));

        for id in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(store.load(id).await, Err(StoreError::InvalidId(_))));
        }
        assert!(matches!(store.delete("missing").await, Err(StoreError::NotFound(_))));
    }
}
