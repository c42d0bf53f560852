//! Conversation state shared by chat stages.

use crate::stages::backend::KvCache;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Bot => write!(f, "bot"),
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: Role,
    pub text: String,
}

impl ChatEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }
}

/// Handle to an entry returned by [`ChatHistory::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub usize);

/// Ordered chat entries plus the backend cache that matches them.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    entries: Vec<ChatEntry>,
    kv_cache: Option<KvCache>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a system prompt entry.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.append(Role::System, prompt);
        history
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) -> EntryId {
        self.entries.push(ChatEntry::new(role, text));
        EntryId(self.entries.len() - 1)
    }

    pub fn entry(&self, id: EntryId) -> Option<&ChatEntry> {
        self.entries.get(id.0)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut ChatEntry> {
        self.entries.get_mut(id.0)
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kv_cache(&self) -> Option<&KvCache> {
        self.kv_cache.as_ref()
    }

    pub fn set_kv_cache(&mut self, kv_cache: Option<KvCache>) {
        self.kv_cache = kv_cache;
    }

    /// Drop every entry except system prompts, and the cache with them.
    pub fn reset(&mut self) {
        self.entries.retain(|e| e.role == Role::System);
        self.kv_cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_handles() {
        let mut history = ChatHistory::new();
        let a = history.append(Role::User, "hi");
        let b = history.append(Role::Bot, "");

        assert_ne!(a, b);
        history.entry_mut(b).unwrap().text.push_str("hello");
        assert_eq!(history.entry(b).unwrap().text, "hello");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_reset_keeps_system_prompt() {
        let mut history = ChatHistory::with_system_prompt("be brief");
        history.append(Role::User, "hi");
        history.set_kv_cache(Some(KvCache::new(12)));

        history.reset();
        assert_eq!(history.entries(), &[ChatEntry::new(Role::System, "be brief")]);
        assert!(history.kv_cache().is_none());
    }

    #[test]
    fn test_role_serde_lowercase() {
        let entry: ChatEntry = serde_json::from_str(r#"{"role":"user","text":"hey"}"#).unwrap();
        assert_eq!(entry, ChatEntry::user("hey"));
        assert_eq!(Role::Bot.to_string(), "bot");
    }
}
