// src/summary.rs

//! Folds a thread's full entry list into a `ConversationSummary`.
//!
//! Always a full recomputation over the current entries, never an
//! incremental patch. Total on the empty list: the result is the
//! "new conversation" default summary.

use chrono::{DateTime, Utc};

use crate::types::{
    ConversationFlow, ConversationPhase, ConversationSummary, MemoryEntry, MemoryKind,
    ProgressIndicators,
};

const GENERAL_TOPIC: &str = "General learning conversation";

/// Recomputes the summary for `thread_id` from scratch.
pub fn summarize(
    thread_id: &str,
    entries: &[MemoryEntry],
    now: DateTime<Utc>,
) -> ConversationSummary {
    let mut key_subjects: Vec<String> = Vec::new();
    let mut subject_counts: Vec<(String, usize)> = Vec::new();
    let mut concepts_covered: Vec<String> = Vec::new();
    let mut user_preferences: Vec<String> = Vec::new();
    let mut strength_areas: Vec<String> = Vec::new();
    let mut struggling_areas: Vec<String> = Vec::new();
    let mut questions_asked = 0;

    for entry in entries {
        if let Some(subject) = non_empty(entry.metadata.get("subject")) {
            push_unique(&mut key_subjects, subject);
            match subject_counts.iter_mut().find(|(s, _)| s == subject) {
                Some((_, count)) => *count += 1,
                None => subject_counts.push((subject.to_string(), 1)),
            }
        }
        if let Some(concept) = non_empty(entry.metadata.get("concept")) {
            push_unique(&mut concepts_covered, concept);
        }
        if entry.kind == MemoryKind::Preference {
            push_unique(&mut user_preferences, &entry.content);
        }
        match entry.category.as_str() {
            "mastery" => push_unique(&mut strength_areas, &entry.content),
            "difficulty" => push_unique(&mut struggling_areas, &entry.content),
            _ => {}
        }
        if entry.kind == MemoryKind::QuestionPattern {
            questions_asked += 1;
        }
    }

    let overall_topic = subject_counts
        .iter()
        .max_by_key(|(_, count)| *count)
        .map(|(subject, _)| format!("Learning {subject}"))
        .unwrap_or_else(|| GENERAL_TOPIC.to_string());

    let concepts_learned = concepts_covered.len();
    let progress = ProgressIndicators {
        strength_areas,
        struggling_areas,
        questions_asked,
        concepts_learned,
    };

    let flow = ConversationFlow {
        phase: infer_phase(questions_asked, concepts_learned),
        next_suggested_action: suggest_next_action(&progress),
    };

    ConversationSummary {
        thread_id: thread_id.to_string(),
        overall_topic,
        key_subjects,
        concepts_covered,
        user_preferences,
        progress,
        flow,
        last_updated: now,
    }
}

/// The summary a thread has before anything was written to it.
pub fn empty_summary(thread_id: &str, now: DateTime<Utc>) -> ConversationSummary {
    summarize(thread_id, &[], now)
}

/// Deterministic phase ladder over question/concept counts.
fn infer_phase(questions_asked: usize, concepts_learned: usize) -> ConversationPhase {
    if questions_asked == 0 {
        ConversationPhase::Introduction
    } else if questions_asked < 3 {
        ConversationPhase::Exploration
    } else if concepts_learned > 3 {
        ConversationPhase::Practice
    } else {
        ConversationPhase::Review
    }
}

fn suggest_next_action(progress: &ProgressIndicators) -> String {
    if progress.struggling_areas.len() > progress.strength_areas.len() {
        "Revisit recent topics with simpler explanations and more examples".to_string()
    } else if progress.strength_areas.len() > 3 {
        "Introduce more challenging material to build on demonstrated strengths".to_string()
    } else {
        "Continue at the current level of difficulty".to_string()
    }
}

fn non_empty(value: Option<&String>) -> Option<&String> {
    value.filter(|v| !v.trim().is_empty())
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}
