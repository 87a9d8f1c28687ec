// src/service.rs

//! Public API and orchestration for the memory engine.
//!
//! Write path: extract -> append + prune -> recompute summary -> persist.
//! Read path: fetch -> rank (read-through) -> compose narrative.
//! No failure on either path ever reaches the caller of `process_turn`;
//! storage trouble degrades to "fewer memories than ideal".

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;
use crate::context::compose_narrative;
use crate::extraction::extract_candidates;
use crate::scoring::RelevanceScorer;
use crate::storage::PersistenceAdapter;
use crate::store::MemoryStore;
use crate::summary::{empty_summary, summarize};
use crate::types::{
    ConversationSummary, MemoryEntry, MemoryQuery, RelevantContext, ThreadStats, TurnContext,
    TurnRole,
};

/// The conversational memory engine.
pub struct MemoryService {
    config: MemoryConfig,
    store: MemoryStore,
    scorer: RelevanceScorer,
    persistence: Option<Arc<dyn PersistenceAdapter>>,
}

impl MemoryService {
    /// Creates a volatile engine with no durable backend.
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            store: MemoryStore::new(config.max_entries_per_thread),
            scorer: RelevanceScorer::new(),
            persistence: None,
            config,
        }
    }

    /// Creates an engine backed by durable storage and loads prior state.
    /// A failed load is logged and treated as "no prior state".
    pub async fn with_persistence(
        config: MemoryConfig,
        adapter: Arc<dyn PersistenceAdapter>,
    ) -> Self {
        info!("Initializing memory engine with durable storage");
        let service = Self {
            store: MemoryStore::new(config.max_entries_per_thread),
            scorer: RelevanceScorer::new(),
            persistence: Some(adapter.clone()),
            config,
        };

        let cutoff = Utc::now() - Duration::days(service.config.retention_days);
        match adapter.load_all(cutoff).await {
            Ok(state) => {
                let thread_count = state.entries.len();
                service.store.restore(state.entries, state.summaries).await;
                info!("Loaded {} threads from durable storage", thread_count);
            }
            Err(e) => {
                warn!("Failed to load persisted memories, starting empty: {}", e);
            }
        }
        service
    }

    // ===== Write path =====

    /// Records one chat turn. Extraction that matches nothing writes
    /// nothing; extraction or persistence failures never reach the caller.
    pub async fn process_turn(
        &self,
        thread_id: &str,
        text: &str,
        role: TurnRole,
        context: &TurnContext,
    ) {
        let candidates = extract_candidates(text, role, context);
        if candidates.is_empty() {
            debug!("No memories extracted for thread {}", thread_id);
            return;
        }

        let handle = self.store.handle(thread_id).await;
        let (entries_snapshot, summary) = {
            let mut state = handle.lock().await;
            let now = Utc::now();
            let appended = state.append_candidates(thread_id, candidates, now);
            let dropped = state.prune(self.config.max_entries_per_thread);
            if dropped > 0 {
                debug!("Pruned {} low-scoring entries from thread {}", dropped, thread_id);
            }

            let summary = summarize(thread_id, &state.entries, now);
            state.summary = Some(summary.clone());
            debug!("Recorded {} memories for thread {}", appended, thread_id);
            (state.entries.clone(), summary)
        };

        self.persist(thread_id, &entries_snapshot, &summary).await;
    }

    // ===== Read path =====

    /// Ranked memories plus summary and rendered narrative for one turn.
    /// Unknown threads produce an empty, valid result.
    pub async fn get_relevant_context(&self, query: &MemoryQuery) -> RelevantContext {
        let limit = query.limit.unwrap_or(self.config.default_limit);
        let threshold = query
            .relevance_threshold
            .unwrap_or(self.config.default_relevance_threshold);
        let now = Utc::now();

        let Some(handle) = self.store.get(&query.thread_id).await else {
            let summary = empty_summary(&query.thread_id, now);
            let narrative = compose_narrative(&[], &summary, query);
            return RelevantContext {
                entries: Vec::new(),
                summary,
                narrative,
            };
        };

        let (ranked, summary) = {
            let mut state = handle.lock().await;
            let ranked =
                self.scorer
                    .rank(&mut state.entries, &query.context, threshold, limit, now);
            let summary = state
                .summary
                .get_or_insert_with(|| empty_summary(&query.thread_id, now))
                .clone();
            (ranked, summary)
        };

        let narrative = compose_narrative(&ranked, &summary, query);
        RelevantContext {
            entries: ranked,
            summary,
            narrative,
        }
    }

    /// The thread's summary, or the new-conversation default when nothing
    /// was ever written (or the thread was cleared).
    pub async fn get_summary(&self, thread_id: &str) -> ConversationSummary {
        match self.store.get(thread_id).await {
            Some(handle) => {
                let state = handle.lock().await;
                state
                    .summary
                    .clone()
                    .unwrap_or_else(|| empty_summary(thread_id, Utc::now()))
            }
            None => empty_summary(thread_id, Utc::now()),
        }
    }

    /// Removes all memories and the summary for a thread, in memory and on
    /// disk.
    pub async fn clear(&self, thread_id: &str) {
        let removed = self.store.clear(thread_id).await;
        if let Some(persistence) = &self.persistence {
            if let Err(e) = persistence.remove_thread(thread_id).await {
                warn!("Failed to clear persisted memories for {}: {}", thread_id, e);
            }
        }
        if removed {
            info!("Cleared memories for thread {}", thread_id);
        }
    }

    pub async fn list_threads(&self) -> Vec<String> {
        self.store.thread_ids().await
    }

    /// Per-thread counters for monitoring.
    pub async fn stats(&self, thread_id: &str) -> ThreadStats {
        let Some(handle) = self.store.get(thread_id).await else {
            return ThreadStats::default();
        };
        let state = handle.lock().await;
        ThreadStats {
            entry_count: state.entries.len(),
            total_accesses: state
                .entries
                .iter()
                .map(|e| e.access_count as u64)
                .sum(),
            oldest_entry_at: state.entries.iter().map(|e| e.created_at).min(),
            phase: state
                .summary
                .as_ref()
                .map(|s| s.flow.phase)
                .unwrap_or_default(),
        }
    }

    // ===== Internal =====

    async fn persist(
        &self,
        thread_id: &str,
        entries: &[MemoryEntry],
        summary: &ConversationSummary,
    ) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        // No retry: the next successful write replaces the whole row anyway.
        if let Err(e) = persistence.save_thread(thread_id, entries, Some(summary)).await {
            warn!("Failed to persist thread {}: {}", thread_id, e);
        }
    }
}
