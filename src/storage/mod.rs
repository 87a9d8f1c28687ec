// src/storage/mod.rs

//! Durable key-value persistence for entry lists and summaries.
//! All storage goes through the `PersistenceAdapter` trait - no direct DB
//! calls in engine logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::StorageError;
use crate::types::{ConversationSummary, MemoryEntry};

pub mod sqlite;

pub use sqlite::SqliteAdapter;

/// Everything loaded from durable storage at startup.
#[derive(Debug, Default)]
pub struct PersistedState {
    pub entries: HashMap<String, Vec<MemoryEntry>>,
    pub summaries: HashMap<String, ConversationSummary>,
}

/// Trait for any durable backend holding the two keyed collections
/// (`thread_id -> MemoryEntry[]` and `thread_id -> ConversationSummary`).
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Replace one thread's persisted entries and summary.
    async fn save_thread(
        &self,
        thread_id: &str,
        entries: &[MemoryEntry],
        summary: Option<&ConversationSummary>,
    ) -> Result<(), StorageError>;

    /// Load every thread, dropping entries created before `cutoff`
    /// (retention cleanup). Rows that fail to deserialize are skipped.
    async fn load_all(&self, cutoff: DateTime<Utc>) -> Result<PersistedState, StorageError>;

    /// Remove a thread's entries and summary from durable storage.
    async fn remove_thread(&self, thread_id: &str) -> Result<(), StorageError>;
}
