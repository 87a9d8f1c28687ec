// src/context.rs

//! Renders ranked entries plus the summary into the flat text block handed
//! to the downstream generator. This narrative is the only externally
//! visible product of a read.

use crate::types::{ConversationSummary, MemoryEntry, MemoryQuery};

/// Fixed narrative for a thread with no usable memories.
pub const NEW_CONVERSATION_NARRATIVE: &str =
    "This is the beginning of a new conversation - no prior context is available.";

/// Fixed closing instruction for the downstream generator.
const INSTRUCTION_LINE: &str =
    "Use this student context naturally in your response; do not recite it back.";

/// Builds the context block. An empty ranked list collapses to the single
/// new-conversation sentence - no partial sections are emitted.
pub fn compose_narrative(
    entries: &[MemoryEntry],
    summary: &ConversationSummary,
    query: &MemoryQuery,
) -> String {
    if entries.is_empty() {
        return NEW_CONVERSATION_NARRATIVE.to_string();
    }

    let mut block = String::new();

    block.push_str("STUDENT CONTEXT:\n");
    block.push_str(&format!("Topic: {}\n", summary.overall_topic));
    block.push_str(&format!("Phase: {}\n", summary.flow.phase));
    if !summary.key_subjects.is_empty() {
        block.push_str(&format!("Subjects covered: {}\n", summary.key_subjects.join(", ")));
    }
    if !summary.concepts_covered.is_empty() {
        block.push_str(&format!(
            "Concepts covered: {}\n",
            summary.concepts_covered.join(", ")
        ));
    }

    if !summary.progress.strength_areas.is_empty() {
        block.push_str(&format!(
            "Strengths: {}\n",
            summary.progress.strength_areas.join("; ")
        ));
    }
    if !summary.progress.struggling_areas.is_empty() {
        block.push_str(&format!(
            "Struggling with: {}\n",
            summary.progress.struggling_areas.join("; ")
        ));
    }
    if !summary.user_preferences.is_empty() {
        block.push_str(&format!(
            "Preferences: {}\n",
            summary.user_preferences.join("; ")
        ));
    }

    block.push_str("\nRELEVANT MEMORIES:\n");
    for category in categories_in_rank_order(entries) {
        block.push_str(&format!("[{category}]\n"));
        for entry in entries.iter().filter(|e| e.category == category) {
            block.push_str(&format!("- {}\n", entry.content));
        }
    }

    let mut session_lines: Vec<String> = Vec::new();
    if let Some(subject) = &query.context.subject {
        session_lines.push(format!("Subject: {subject}"));
    }
    if let Some(mode) = &query.context.mode {
        session_lines.push(format!("Mode: {mode}"));
    }
    if let Some(grade) = &query.context.grade {
        session_lines.push(format!("Grade: {grade}"));
    }
    if let Some(board) = &query.context.board {
        session_lines.push(format!("Board: {board}"));
    }
    if !session_lines.is_empty() {
        block.push_str("\nCURRENT SESSION:\n");
        for line in session_lines {
            block.push_str(&line);
            block.push('\n');
        }
    }

    block.push_str(&format!(
        "\nSuggested next action: {}\n",
        summary.flow.next_suggested_action
    ));
    block.push_str(INSTRUCTION_LINE);

    block
}

/// Distinct categories in order of first appearance in the ranked list.
fn categories_in_rank_order(entries: &[MemoryEntry]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for entry in entries {
        if !categories.iter().any(|c| c == &entry.category) {
            categories.push(entry.category.clone());
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::summarize;
    use crate::types::{MemoryKind, MemoryQuery, TurnContext};
    use chrono::Utc;
    use std::collections::HashMap;

    fn entry(kind: MemoryKind, category: &str, content: &str) -> MemoryEntry {
        let now = Utc::now();
        MemoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: "t1".into(),
            kind,
            content: content.into(),
            importance: 5,
            category: category.into(),
            metadata: HashMap::new(),
            created_at: now,
            last_accessed_at: now,
            access_count: 1,
        }
    }

    #[test]
    fn test_empty_entries_collapse_to_single_sentence() {
        let summary = summarize("t1", &[], Utc::now());
        let query = MemoryQuery::new("t1", "hello");
        let narrative = compose_narrative(&[], &summary, &query);
        assert_eq!(narrative, NEW_CONVERSATION_NARRATIVE);
        assert!(!narrative.contains("RELEVANT MEMORIES"));
    }

    #[test]
    fn test_block_groups_entries_by_category() {
        let entries = vec![
            entry(MemoryKind::LearningProgress, "difficulty", "Struggling with: fractions"),
            entry(MemoryKind::Preference, "learning_style", "Prefers visual learning"),
            entry(MemoryKind::LearningProgress, "difficulty", "Struggling with: decimals"),
        ];
        let summary = summarize("t1", &entries, Utc::now());
        let query = MemoryQuery {
            thread_id: "t1".into(),
            current_message: "more fractions".into(),
            context: TurnContext {
                subject: Some("math".into()),
                mode: Some("learning".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let narrative = compose_narrative(&entries, &summary, &query);

        assert!(narrative.starts_with("STUDENT CONTEXT:"));
        assert!(narrative.contains("Phase: introduction"));
        let difficulty_section = narrative.find("[difficulty]").unwrap();
        let style_section = narrative.find("[learning_style]").unwrap();
        // first-appearance order is preserved
        assert!(difficulty_section < style_section);
        assert!(narrative.contains("- Struggling with: fractions"));
        assert!(narrative.contains("- Struggling with: decimals"));
        assert!(narrative.contains("Subject: math"));
        assert!(narrative.contains("Mode: learning"));
        assert!(narrative.contains("Suggested next action:"));
        assert!(narrative.ends_with(INSTRUCTION_LINE));
    }

    #[test]
    fn test_no_empty_sections_for_missing_data() {
        let entries = vec![entry(MemoryKind::Fact, "fact", "Water boils at 100 degrees Celsius")];
        let summary = summarize("t1", &entries, Utc::now());
        let query = MemoryQuery::new("t1", "boiling");

        let narrative = compose_narrative(&entries, &summary, &query);
        assert!(!narrative.contains("Strengths:"));
        assert!(!narrative.contains("Struggling with:"));
        assert!(!narrative.contains("Preferences:"));
        assert!(!narrative.contains("CURRENT SESSION:"));
        assert!(!narrative.contains("Subjects covered:"));
    }
}
