// src/store.rs

//! Per-thread bounded entry storage.
//!
//! Each thread's state sits behind its own `Mutex`, so appends, pruning, and
//! read-through scoring for one thread are serialized while distinct threads
//! proceed in parallel. Read paths never create a thread; writes do.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::types::{CandidateMemory, ConversationSummary, MemoryEntry};

/// Everything the engine holds for one conversation.
#[derive(Debug, Default)]
pub struct ThreadState {
    pub entries: Vec<MemoryEntry>,
    pub summary: Option<ConversationSummary>,
}

impl ThreadState {
    /// Assigns identity and timestamps to candidates and appends them.
    /// Candidates with empty content are dropped. Returns how many landed.
    pub fn append_candidates(
        &mut self,
        thread_id: &str,
        candidates: Vec<CandidateMemory>,
        now: DateTime<Utc>,
    ) -> usize {
        let mut appended = 0;
        for candidate in candidates {
            if candidate.content.trim().is_empty() {
                continue;
            }
            self.entries.push(MemoryEntry {
                id: Uuid::new_v4().to_string(),
                thread_id: thread_id.to_string(),
                kind: candidate.kind,
                content: candidate.content,
                importance: candidate.importance.min(10),
                category: candidate.category,
                metadata: candidate.metadata,
                created_at: now,
                last_accessed_at: now,
                access_count: 1,
            });
            appended += 1;
        }
        appended
    }

    /// Enforces the cap: keep the entries with the highest
    /// `importance + 0.1 × access_count`, drop the rest regardless of age.
    pub fn prune(&mut self, cap: usize) -> usize {
        if self.entries.len() <= cap {
            return 0;
        }
        self.entries.sort_by(|a, b| {
            b.retention_score()
                .partial_cmp(&a.retention_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let dropped = self.entries.len() - cap;
        self.entries.truncate(cap);
        dropped
    }
}

/// Owns the per-thread entry lists and summaries.
pub struct MemoryStore {
    cap: usize,
    threads: RwLock<HashMap<String, Arc<Mutex<ThreadState>>>>,
}

impl MemoryStore {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            threads: RwLock::new(HashMap::new()),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Get-or-create a thread handle. Write path only.
    pub async fn handle(&self, thread_id: &str) -> Arc<Mutex<ThreadState>> {
        {
            let threads = self.threads.read().await;
            if let Some(state) = threads.get(thread_id) {
                return state.clone();
            }
        }
        let mut threads = self.threads.write().await;
        threads
            .entry(thread_id.to_string())
            .or_insert_with(|| {
                debug!("Created memory thread: {}", thread_id);
                Arc::new(Mutex::new(ThreadState::default()))
            })
            .clone()
    }

    /// Looks a thread up without creating it. Read path.
    pub async fn get(&self, thread_id: &str) -> Option<Arc<Mutex<ThreadState>>> {
        self.threads.read().await.get(thread_id).cloned()
    }

    /// Removes a thread's entries and summary in one step.
    pub async fn clear(&self, thread_id: &str) -> bool {
        self.threads.write().await.remove(thread_id).is_some()
    }

    pub async fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Installs previously persisted state. Used once at startup; existing
    /// in-memory threads with the same id are replaced.
    pub async fn restore(
        &self,
        entries: HashMap<String, Vec<MemoryEntry>>,
        summaries: HashMap<String, ConversationSummary>,
    ) {
        let mut threads = self.threads.write().await;
        for (thread_id, thread_entries) in entries {
            let summary = summaries.get(&thread_id).cloned();
            let state = ThreadState {
                entries: thread_entries,
                summary,
            };
            threads.insert(thread_id, Arc::new(Mutex::new(state)));
        }
        // Summaries whose entries all expired still answer get_summary until
        // the next write replaces them.
        for (thread_id, summary) in summaries {
            if !threads.contains_key(&thread_id) {
                let state = ThreadState {
                    entries: Vec::new(),
                    summary: Some(summary),
                };
                threads.insert(thread_id, Arc::new(Mutex::new(state)));
            }
        }
    }
}
