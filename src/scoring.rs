// src/scoring.rs
// Read-time relevance: importance, recency decay, context match, popularity

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{MemoryEntry, TurnContext};

/// Multi-factor relevance scoring over stored entries.
///
/// Scores are computed only at read time and never stored. Entries that
/// survive filtering get their access stats bumped in place (read-through),
/// so popular memories self-reinforce over repeated retrieval.
pub struct RelevanceScorer {
    recency_weight: f32,
    recency_window_days: f32,
    subject_match_bonus: f32,
    mode_match_bonus: f32,
    board_match_bonus: f32,
    popularity_divisor: f32,
    popularity_cap: f32,
}

impl RelevanceScorer {
    pub fn new() -> Self {
        Self {
            recency_weight: 0.3,       // linear decay to zero over the window
            recency_window_days: 7.0,
            subject_match_bonus: 0.4,
            mode_match_bonus: 0.2,
            board_match_bonus: 0.2,
            popularity_divisor: 10.0,
            popularity_cap: 0.2,
        }
    }

    /// Normalized 0-1 relevance of `entry` for the query context.
    pub fn score(&self, entry: &MemoryEntry, context: &TurnContext, now: DateTime<Utc>) -> f32 {
        let importance = entry.importance as f32 / 10.0;

        let age_days =
            now.signed_duration_since(entry.created_at).num_seconds() as f32 / 86_400.0;
        let recency_fraction =
            ((self.recency_window_days - age_days) / self.recency_window_days).clamp(0.0, 1.0);
        let recency = recency_fraction * self.recency_weight;

        // The three match components are independent and additive.
        let mut match_bonus = 0.0;
        if tag_matches(entry, "subject", context.subject.as_deref()) {
            match_bonus += self.subject_match_bonus;
        }
        if tag_matches(entry, "mode", context.mode.as_deref()) {
            match_bonus += self.mode_match_bonus;
        }
        if tag_matches(entry, "board", context.board.as_deref()) {
            match_bonus += self.board_match_bonus;
        }

        let popularity =
            (entry.access_count as f32 / self.popularity_divisor).min(self.popularity_cap);

        (importance + recency + match_bonus + popularity).min(1.0)
    }

    /// Filters by `threshold`, sorts descending, truncates to `limit`, and
    /// touches every survivor. Runs under the owning thread's lock so the
    /// access-count bump is atomic with respect to pruning.
    pub fn rank(
        &self,
        entries: &mut [MemoryEntry],
        context: &TurnContext,
        threshold: f32,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<MemoryEntry> {
        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, self.score(entry, context, now)))
            .filter(|(_, score)| *score >= threshold)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        if !scored.is_empty() {
            debug!(
                "Ranked {} entries - top score {:.3}",
                scored.len(),
                scored.first().map(|(_, s)| *s).unwrap_or(0.0)
            );
        }

        scored
            .into_iter()
            .map(|(idx, _)| {
                entries[idx].touch(now);
                entries[idx].clone()
            })
            .collect()
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn tag_matches(entry: &MemoryEntry, key: &str, wanted: Option<&str>) -> bool {
    match (entry.metadata.get(key), wanted) {
        (Some(have), Some(want)) => have.eq_ignore_ascii_case(want),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryKind;
    use std::collections::HashMap;

    fn entry(importance: u8, age_days: i64, access_count: u32) -> MemoryEntry {
        let now = Utc::now();
        MemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: "t1".into(),
            kind: MemoryKind::Fact,
            content: "stored fact".into(),
            importance,
            category: "fact".into(),
            metadata: HashMap::new(),
            created_at: now - chrono::Duration::days(age_days),
            last_accessed_at: now,
            access_count,
        }
    }

    #[test]
    fn test_fresh_entry_gets_full_recency_bonus() {
        let scorer = RelevanceScorer::new();
        let now = Utc::now();
        let fresh = entry(5, 0, 1);
        let stale = entry(5, 10, 1);

        let fresh_score = scorer.score(&fresh, &TurnContext::default(), now);
        let stale_score = scorer.score(&stale, &TurnContext::default(), now);
        // 0.5 importance + 0.3 recency + 0.1 popularity
        assert!((fresh_score - 0.9).abs() < 0.01);
        // recency fully decayed past 7 days
        assert!((stale_score - 0.6).abs() < 0.01);
    }

    #[test]
    fn test_match_bonuses_are_additive() {
        let scorer = RelevanceScorer::new();
        let now = Utc::now();
        let mut e = entry(0, 10, 1);
        e.metadata.insert("subject".into(), "math".into());
        e.metadata.insert("mode".into(), "learning".into());
        e.metadata.insert("board".into(), "cbse".into());

        let context = TurnContext {
            subject: Some("Math".into()),
            mode: Some("learning".into()),
            board: Some("CBSE".into()),
            ..Default::default()
        };
        let score = scorer.score(&e, &context, now);
        // 0.0 importance + 0.0 recency + 0.8 match + 0.1 popularity
        assert!((score - 0.9).abs() < 0.01);
    }

    #[test]
    fn test_popularity_bonus_is_capped() {
        let scorer = RelevanceScorer::new();
        let now = Utc::now();
        let moderately_read = entry(0, 10, 2);
        let heavily_read = entry(0, 10, 500);

        assert!(
            (scorer.score(&moderately_read, &TurnContext::default(), now) - 0.2).abs() < 0.01
        );
        assert!((scorer.score(&heavily_read, &TurnContext::default(), now) - 0.2).abs() < 0.01);
    }

    #[test]
    fn test_score_never_exceeds_one() {
        let scorer = RelevanceScorer::new();
        let now = Utc::now();
        let mut e = entry(10, 0, 100);
        e.metadata.insert("subject".into(), "math".into());
        let context = TurnContext {
            subject: Some("math".into()),
            ..Default::default()
        };
        assert_eq!(scorer.score(&e, &context, now), 1.0);
    }

    #[test]
    fn test_rank_filters_sorts_and_touches() {
        let scorer = RelevanceScorer::new();
        let now = Utc::now();
        let mut entries = vec![entry(2, 10, 1), entry(9, 10, 1), entry(6, 10, 1)];

        let ranked = scorer.rank(&mut entries, &TurnContext::default(), 0.5, 10, now);

        // importance 2 scores 0.3, below the 0.5 threshold
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].importance, 9);
        assert_eq!(ranked[1].importance, 6);
        // survivors were touched in place, the filtered entry was not
        assert_eq!(ranked[0].access_count, 2);
        assert!(entries.iter().all(|e| match e.importance {
            2 => e.access_count == 1,
            _ => e.access_count == 2,
        }));
    }

    #[test]
    fn test_rank_respects_limit() {
        let scorer = RelevanceScorer::new();
        let now = Utc::now();
        let mut entries: Vec<MemoryEntry> = (1..=8).map(|i| entry(i, 10, 1)).collect();

        let ranked = scorer.rank(&mut entries, &TurnContext::default(), 0.0, 3, now);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].importance, 8);
        // entries outside the limit keep their stats
        assert_eq!(
            entries.iter().filter(|e| e.access_count == 2).count(),
            3
        );
    }

    #[test]
    fn test_empty_result_when_threshold_excludes_everything() {
        let scorer = RelevanceScorer::new();
        let now = Utc::now();
        let mut entries = vec![entry(1, 10, 1)];
        let ranked = scorer.rank(&mut entries, &TurnContext::default(), 0.9, 10, now);
        assert!(ranked.is_empty());
        assert_eq!(entries[0].access_count, 1);
    }
}
