// src/types.rs

//! Core data model: memory entries, per-turn context tags, queries, and the
//! derived conversation summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of memory kinds the engine extracts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Fact,
    Preference,
    Context,
    LearningProgress,
    Concept,
    QuestionPattern,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Fact => "fact",
            MemoryKind::Preference => "preference",
            MemoryKind::Context => "context",
            MemoryKind::LearningProgress => "learning_progress",
            MemoryKind::Concept => "concept",
            MemoryKind::QuestionPattern => "question_pattern",
        }
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

// Parse TurnRole from strings defensively (CLI/text interop)
impl FromStr for TurnRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "assistant" => TurnRole::Assistant,
            _ => TurnRole::User,
        })
    }
}

/// Lightweight context tags the chat layer supplies on every turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl TurnContext {
    /// True when no tag is set at all.
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.subject.is_none()
            && self.age_group.is_none()
            && self.board.is_none()
            && self.grade.is_none()
    }

    /// Copies the present tags into an entry metadata map.
    pub fn apply_to(&self, metadata: &mut HashMap<String, String>) {
        if let Some(mode) = &self.mode {
            metadata.insert("mode".into(), mode.clone());
        }
        if let Some(subject) = &self.subject {
            metadata.insert("subject".into(), subject.clone());
        }
        if let Some(age_group) = &self.age_group {
            metadata.insert("age_group".into(), age_group.clone());
        }
        if let Some(board) = &self.board {
            metadata.insert("board".into(), board.clone());
        }
        if let Some(grade) = &self.grade {
            metadata.insert("grade".into(), grade.clone());
        }
    }
}

/// One atomic extracted fact/preference/progress signal for a thread.
///
/// Immutable after creation except for `last_accessed_at`/`access_count`,
/// which the scorer bumps on read-through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub thread_id: String,
    pub kind: MemoryKind,
    pub content: String,
    /// 0-10, fixed at creation.
    pub importance: u8,
    /// Grouping label for summaries and pruning tie-breaks
    /// (e.g. "learning_style", "difficulty", "mastery").
    pub category: String,
    /// Context tags plus extractor-specific fields.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u32,
}

impl MemoryEntry {
    /// Score used by the pruning policy: lowest-scoring entries drop first,
    /// regardless of age.
    pub fn retention_score(&self) -> f32 {
        self.importance as f32 + 0.1 * self.access_count as f32
    }

    /// Mark the entry as accessed "now". Called only by the read path.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Age of the entry in whole days at `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.created_at).num_days()
    }
}

/// Extractor output before the store assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMemory {
    pub kind: MemoryKind,
    pub content: String,
    pub importance: u8,
    pub category: String,
    pub metadata: HashMap<String, String>,
}

impl CandidateMemory {
    pub fn new(
        kind: MemoryKind,
        content: impl Into<String>,
        importance: u8,
        category: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            importance: importance.min(10),
            category: category.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Coarse conversation-progress stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationPhase {
    #[default]
    Introduction,
    Exploration,
    Practice,
    Review,
}

impl ConversationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationPhase::Introduction => "introduction",
            ConversationPhase::Exploration => "exploration",
            ConversationPhase::Practice => "practice",
            ConversationPhase::Review => "review",
        }
    }
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strength/struggle signals plus simple counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProgressIndicators {
    pub strength_areas: Vec<String>,
    pub struggling_areas: Vec<String>,
    pub questions_asked: usize,
    pub concepts_learned: usize,
}

/// Where the conversation is and what to do next.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationFlow {
    pub phase: ConversationPhase,
    pub next_suggested_action: String,
}

/// Per-thread materialized view over the full entry list. Replaced wholesale
/// after every accepted write, never patched incrementally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSummary {
    pub thread_id: String,
    pub overall_topic: String,
    pub key_subjects: Vec<String>,
    pub concepts_covered: Vec<String>,
    pub user_preferences: Vec<String>,
    pub progress: ProgressIndicators,
    pub flow: ConversationFlow,
    pub last_updated: DateTime<Utc>,
}

/// Read-path input. Not persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    pub thread_id: String,
    pub current_message: String,
    pub context: TurnContext,
    pub limit: Option<usize>,
    pub relevance_threshold: Option<f32>,
}

impl MemoryQuery {
    pub fn new(thread_id: impl Into<String>, current_message: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            current_message: current_message.into(),
            ..Default::default()
        }
    }
}

/// What a read returns: ranked entries, the summary, and a rendered
/// narrative block for the downstream generator.
#[derive(Debug, Clone, Serialize)]
pub struct RelevantContext {
    pub entries: Vec<MemoryEntry>,
    pub summary: ConversationSummary,
    pub narrative: String,
}

/// Lightweight per-thread counters for monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ThreadStats {
    pub entry_count: usize,
    pub total_accesses: u64,
    pub oldest_entry_at: Option<DateTime<Utc>>,
    pub phase: ConversationPhase,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(importance: u8, access_count: u32) -> MemoryEntry {
        MemoryEntry {
            id: "e1".into(),
            thread_id: "t1".into(),
            kind: MemoryKind::Fact,
            content: "something".into(),
            importance,
            category: "fact".into(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
            last_accessed_at: Utc::now(),
            access_count,
        }
    }

    #[test]
    fn test_retention_score_weighs_access_count() {
        assert!((entry(5, 1).retention_score() - 5.1).abs() < 1e-6);
        // ten reads outweigh one point of importance
        assert!(entry(5, 20).retention_score() > entry(6, 1).retention_score());
    }

    #[test]
    fn test_touch_bumps_access_stats() {
        let mut e = entry(5, 1);
        let before = e.last_accessed_at;
        let now = Utc::now() + chrono::Duration::seconds(5);
        e.touch(now);
        assert_eq!(e.access_count, 2);
        assert!(e.last_accessed_at > before);
    }

    #[test]
    fn test_turn_role_parses_defensively() {
        assert_eq!("Assistant".parse::<TurnRole>(), Ok(TurnRole::Assistant));
        assert_eq!("user".parse::<TurnRole>(), Ok(TurnRole::User));
        assert_eq!("garbage".parse::<TurnRole>(), Ok(TurnRole::User));
    }

    #[test]
    fn test_candidate_importance_is_clamped() {
        let c = CandidateMemory::new(MemoryKind::Fact, "x", 14, "fact");
        assert_eq!(c.importance, 10);
    }

    #[test]
    fn test_phase_serializes_lowercase() {
        let json = serde_json::to_string(&ConversationPhase::Practice).unwrap();
        assert_eq!(json, "\"practice\"");
    }
}
