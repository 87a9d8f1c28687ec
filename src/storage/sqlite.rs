// src/storage/sqlite.rs

//! Implements `PersistenceAdapter` for SQLite. One row per thread in each of
//! the two tables, JSON payloads, ISO-8601 timestamps inside the payload.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage::{PersistedState, PersistenceAdapter};
use crate::types::{ConversationSummary, MemoryEntry};

pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memory_entries (
                thread_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_summaries (
                thread_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PersistenceAdapter for SqliteAdapter {
    async fn save_thread(
        &self,
        thread_id: &str,
        entries: &[MemoryEntry],
        summary: Option<&ConversationSummary>,
    ) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(entries)?;

        sqlx::query(
            r#"
            INSERT INTO memory_entries (thread_id, payload, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT(thread_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(thread_id)
        .bind(&payload)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if let Some(summary) = summary {
            let payload = serde_json::to_string(summary)?;
            sqlx::query(
                r#"
                INSERT INTO conversation_summaries (thread_id, payload, updated_at)
                VALUES ($1, $2, $3)
                ON CONFLICT(thread_id) DO UPDATE SET
                    payload = excluded.payload,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(thread_id)
            .bind(&payload)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        }

        debug!("Persisted {} entries for thread {}", entries.len(), thread_id);
        Ok(())
    }

    async fn load_all(&self, cutoff: DateTime<Utc>) -> Result<PersistedState, StorageError> {
        let mut state = PersistedState::default();

        let rows = sqlx::query("SELECT thread_id, payload FROM memory_entries")
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let thread_id: String = row.get("thread_id");
            let payload: String = row.get("payload");
            match serde_json::from_str::<Vec<MemoryEntry>>(&payload) {
                Ok(entries) => {
                    // Retention cleanup: expired entries never become queryable.
                    let retained: Vec<MemoryEntry> = entries
                        .into_iter()
                        .filter(|entry| entry.created_at >= cutoff)
                        .collect();
                    if !retained.is_empty() {
                        state.entries.insert(thread_id, retained);
                    }
                }
                Err(e) => {
                    warn!("Skipping undecodable entries for thread {}: {}", thread_id, e);
                }
            }
        }

        let rows = sqlx::query("SELECT thread_id, payload FROM conversation_summaries")
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let thread_id: String = row.get("thread_id");
            let payload: String = row.get("payload");
            match serde_json::from_str::<ConversationSummary>(&payload) {
                Ok(summary) => {
                    state.summaries.insert(thread_id, summary);
                }
                Err(e) => {
                    warn!("Skipping undecodable summary for thread {}: {}", thread_id, e);
                }
            }
        }

        debug!(
            "Loaded {} threads and {} summaries from storage",
            state.entries.len(),
            state.summaries.len()
        );
        Ok(state)
    }

    async fn remove_thread(&self, thread_id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM memory_entries WHERE thread_id = $1")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM conversation_summaries WHERE thread_id = $1")
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::summarize;
    use crate::types::MemoryKind;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;

    async fn setup_adapter() -> SqliteAdapter {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool.");
        let adapter = SqliteAdapter::new(pool);
        adapter.run_migrations().await.unwrap();
        adapter
    }

    fn entry(thread_id: &str, age_days: i64) -> MemoryEntry {
        let created = Utc::now() - chrono::Duration::days(age_days);
        MemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            kind: MemoryKind::Fact,
            content: "Water boils at 100 degrees Celsius".into(),
            importance: 4,
            category: "fact".into(),
            metadata: HashMap::new(),
            created_at: created,
            last_accessed_at: created,
            access_count: 1,
        }
    }

    #[tokio::test]
    async fn test_round_trip_preserves_entries_and_summary() {
        let adapter = setup_adapter().await;
        let entries = vec![entry("t1", 0), entry("t1", 2)];
        let summary = summarize("t1", &entries, Utc::now());

        adapter.save_thread("t1", &entries, Some(&summary)).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        let state = adapter.load_all(cutoff).await.unwrap();

        let loaded = &state.entries["t1"];
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, entries[0].id);
        assert_eq!(loaded[0].content, entries[0].content);
        assert_eq!(loaded[0].access_count, entries[0].access_count);
        assert_eq!(state.summaries["t1"], summary);
    }

    #[tokio::test]
    async fn test_load_drops_entries_past_retention() {
        let adapter = setup_adapter().await;
        let entries = vec![entry("t1", 0), entry("t1", 45)];
        adapter.save_thread("t1", &entries, None).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        let state = adapter.load_all(cutoff).await.unwrap();
        assert_eq!(state.entries["t1"].len(), 1);
        assert_eq!(state.entries["t1"][0].id, entries[0].id);
    }

    #[tokio::test]
    async fn test_thread_with_only_expired_entries_is_absent() {
        let adapter = setup_adapter().await;
        adapter.save_thread("t1", &[entry("t1", 45)], None).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        let state = adapter.load_all(cutoff).await.unwrap();
        assert!(!state.entries.contains_key("t1"));
    }

    #[tokio::test]
    async fn test_undecodable_row_is_skipped_not_fatal() {
        let adapter = setup_adapter().await;
        adapter.save_thread("good", &[entry("good", 0)], None).await.unwrap();
        sqlx::query("INSERT INTO memory_entries (thread_id, payload, updated_at) VALUES ('bad', 'not json', '')")
            .execute(&adapter.pool)
            .await
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        let state = adapter.load_all(cutoff).await.unwrap();
        assert!(state.entries.contains_key("good"));
        assert!(!state.entries.contains_key("bad"));
    }

    #[tokio::test]
    async fn test_remove_thread_deletes_both_collections() {
        let adapter = setup_adapter().await;
        let entries = vec![entry("t1", 0)];
        let summary = summarize("t1", &entries, Utc::now());
        adapter.save_thread("t1", &entries, Some(&summary)).await.unwrap();

        adapter.remove_thread("t1").await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        let state = adapter.load_all(cutoff).await.unwrap();
        assert!(state.entries.is_empty());
        assert!(state.summaries.is_empty());
    }

    #[tokio::test]
    async fn test_payload_timestamps_are_iso8601() {
        let adapter = setup_adapter().await;
        adapter.save_thread("t1", &[entry("t1", 0)], None).await.unwrap();

        let row = sqlx::query("SELECT payload FROM memory_entries WHERE thread_id = 't1'")
            .fetch_one(&adapter.pool)
            .await
            .unwrap();
        let payload: String = row.get("payload");
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        let created_at = value[0]["created_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created_at).is_ok());
    }
}
