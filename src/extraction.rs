// src/extraction.rs

//! Heuristic extraction of memory candidates from a single chat turn.
//!
//! Each extractor is an independent pure function over `(text, context)`
//! registered in a per-role list. Extractors never fail: malformed or empty
//! input yields an empty candidate list.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{CandidateMemory, MemoryKind, TurnContext, TurnRole};

/// A registered pattern matcher. Pure and order-independent.
pub type Extractor = fn(&str, &TurnContext) -> Vec<CandidateMemory>;

const USER_EXTRACTORS: &[Extractor] = &[
    extract_learning_style,
    extract_subject_affinity,
    extract_learning_progress,
    extract_question_pattern,
];

const ASSISTANT_EXTRACTORS: &[Extractor] = &[extract_concepts, extract_facts];

const SHARED_EXTRACTORS: &[Extractor] = &[extract_context_info];

/// Runs every extractor registered for `role` plus the shared ones.
/// A message that matches no pattern yields zero candidates, never an error.
pub fn extract_candidates(
    text: &str,
    role: TurnRole,
    context: &TurnContext,
) -> Vec<CandidateMemory> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let role_extractors = match role {
        TurnRole::User => USER_EXTRACTORS,
        TurnRole::Assistant => ASSISTANT_EXTRACTORS,
    };

    role_extractors
        .iter()
        .chain(SHARED_EXTRACTORS)
        .flat_map(|extractor| extractor(text, context))
        .collect()
}

// ============================================================================
// Keyword families
// ============================================================================

/// (cue, style label) pairs for learning-style preferences.
const LEARNING_STYLE_CUES: &[(&str, &str)] = &[
    ("visual", "visual"),
    ("diagram", "visual"),
    ("picture", "visual"),
    ("chart", "visual"),
    ("video", "visual"),
    ("step by step", "step-by-step"),
    ("step-by-step", "step-by-step"),
    ("example", "example-driven"),
    ("hands-on", "hands-on"),
    ("practice problem", "hands-on"),
    ("story", "narrative"),
    ("real-life", "real-world"),
    ("real world", "real-world"),
];

/// Subject words the affinity matcher recognizes.
const KNOWN_SUBJECTS: &[&str] = &[
    "math",
    "mathematics",
    "maths",
    "science",
    "physics",
    "chemistry",
    "biology",
    "history",
    "geography",
    "english",
    "hindi",
    "computer science",
    "coding",
    "programming",
    "economics",
    "art",
    "music",
];

const STRONG_AFFINITY_CUES: &[&str] = &["love", "favorite", "favourite"];
const MILD_AFFINITY_CUES: &[&str] = &["like", "enjoy", "interested in", "fun"];

const STRUGGLE_CUES: &[&str] = &[
    "don't understand",
    "dont understand",
    "do not understand",
    "confused",
    "confusing",
    "struggling",
    "struggle",
    "stuck",
    "too hard",
    "so hard",
    "difficult",
    "makes no sense",
    "doesn't make sense",
    "i'm lost",
    "im lost",
    "help me",
    "can't figure",
    "cannot figure",
];

const MASTERY_CUES: &[&str] = &[
    "i understand",
    "now i get",
    "got it",
    "i get it",
    "makes sense",
    "that's easy",
    "thats easy",
    "this is easy",
    "figured it out",
    "i know how",
    "i can do",
];

// ============================================================================
// User-turn extractors
// ============================================================================

/// Learning-style preference, e.g. "I learn better with diagrams".
fn extract_learning_style(text: &str, context: &TurnContext) -> Vec<CandidateMemory> {
    let lower = text.to_lowercase();
    let Some((_, style)) = LEARNING_STYLE_CUES
        .iter()
        .find(|(cue, _)| lower.contains(cue))
    else {
        return Vec::new();
    };

    let mut candidate = CandidateMemory::new(
        MemoryKind::Preference,
        format!("Prefers {style} learning"),
        7,
        "learning_style",
    );
    context.apply_to(&mut candidate.metadata);
    candidate
        .metadata
        .insert("learning_style".into(), (*style).to_string());
    vec![candidate]
}

/// Subject affinity, e.g. "I love science". Strong verbs score higher.
fn extract_subject_affinity(text: &str, context: &TurnContext) -> Vec<CandidateMemory> {
    let lower = text.to_lowercase();

    let strong = STRONG_AFFINITY_CUES.iter().any(|cue| lower.contains(cue));
    let mild = MILD_AFFINITY_CUES.iter().any(|cue| lower.contains(cue));
    if !strong && !mild {
        return Vec::new();
    }

    let Some(subject) = KNOWN_SUBJECTS.iter().find(|s| lower.contains(*s)) else {
        return Vec::new();
    };

    let importance = if strong { 8 } else { 6 };
    let mut candidate = CandidateMemory::new(
        MemoryKind::Preference,
        format!("Shows interest in {subject}"),
        importance,
        "subject_interest",
    );
    context.apply_to(&mut candidate.metadata);
    candidate
        .metadata
        .insert("subject".into(), (*subject).to_string());
    vec![candidate]
}

/// Struggle and mastery signals. Struggle wins when both families match.
fn extract_learning_progress(text: &str, context: &TurnContext) -> Vec<CandidateMemory> {
    let lower = text.to_lowercase();

    let (category, importance, content) =
        if STRUGGLE_CUES.iter().any(|cue| lower.contains(cue)) {
            ("difficulty", 9, format!("Struggling with: {}", snippet(text)))
        } else if MASTERY_CUES.iter().any(|cue| lower.contains(cue)) {
            ("mastery", 7, format!("Demonstrated understanding: {}", snippet(text)))
        } else {
            return Vec::new();
        };

    let mut candidate =
        CandidateMemory::new(MemoryKind::LearningProgress, content, importance, category);
    context.apply_to(&mut candidate.metadata);
    vec![candidate]
}

/// Question pattern, classified by the leading interrogative word.
fn extract_question_pattern(text: &str, context: &TurnContext) -> Vec<CandidateMemory> {
    if !text.contains('?') {
        return Vec::new();
    }

    let question = first_question_sentence(text);
    let question_type = classify_question(&question);

    let mut candidate = CandidateMemory::new(
        MemoryKind::QuestionPattern,
        format!("Asked: {}", snippet(&question)),
        5,
        "question",
    );
    context.apply_to(&mut candidate.metadata);
    candidate
        .metadata
        .insert("question_type".into(), question_type.to_string());
    vec![candidate]
}

/// The sentence ending at the first `?`, without earlier sentences.
fn first_question_sentence(text: &str) -> String {
    let up_to_mark = match text.find('?') {
        Some(idx) => &text[..idx],
        None => text,
    };
    let start = up_to_mark
        .rfind(['.', '!', '\n'])
        .map(|i| i + 1)
        .unwrap_or(0);
    format!("{}?", up_to_mark[start..].trim())
}

fn classify_question(question: &str) -> &'static str {
    let lower = question.to_lowercase();
    let first_word = lower
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric());

    match first_word {
        "what" | "when" | "where" | "who" | "whom" | "whose" | "which" => "factual",
        "how" => "procedural",
        "why" => "conceptual",
        "compare" | "analyze" | "analyse" | "evaluate" => "analytical",
        _ if lower.contains("difference between")
            || lower.contains("versus")
            || lower.contains(" vs ") =>
        {
            "analytical"
        }
        _ => "general",
    }
}

// ============================================================================
// Assistant-turn extractors
// ============================================================================

static CONCEPT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bconcept of ([a-z][a-z0-9\-]*(?: [a-z][a-z0-9\-]*){0,3})",
        r"(?i)\btheory of ([a-z][a-z0-9\-]*(?: [a-z][a-z0-9\-]*){0,3})",
        r"(?i)\bprinciple of ([a-z][a-z0-9\-]*(?: [a-z][a-z0-9\-]*){0,3})",
        r"(?i)\b([a-z][a-z0-9\-]*(?: [a-z][a-z0-9\-]*){0,2}) is (?:defined as|called|known as)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

/// Max concepts a single verbose reply may contribute.
const MAX_CONCEPTS_PER_MESSAGE: usize = 3;

/// Named concepts the assistant introduced ("the concept of X", "X is
/// defined as ...").
fn extract_concepts(text: &str, context: &TurnContext) -> Vec<CandidateMemory> {
    let mut seen: Vec<String> = Vec::new();
    let mut candidates = Vec::new();

    for pattern in CONCEPT_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let concept = caps[1].trim().to_lowercase();
            if concept.is_empty() || seen.contains(&concept) {
                continue;
            }
            seen.push(concept.clone());

            let mut candidate = CandidateMemory::new(
                MemoryKind::Concept,
                format!("Covered the concept of {concept}"),
                6,
                "concept",
            );
            context.apply_to(&mut candidate.metadata);
            candidate.metadata.insert("concept".into(), concept);
            candidates.push(candidate);

            if candidates.len() >= MAX_CONCEPTS_PER_MESSAGE {
                return candidates;
            }
        }
    }

    candidates
}

/// Minimum trimmed length for a sentence to count as substantial.
const MIN_FACT_SENTENCE_LEN: usize = 20;
const MAX_FACTS_PER_MESSAGE: usize = 3;

/// First few substantial sentences of an assistant reply, one fact each.
fn extract_facts(text: &str, context: &TurnContext) -> Vec<CandidateMemory> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| sentence.len() > MIN_FACT_SENTENCE_LEN)
        .take(MAX_FACTS_PER_MESSAGE)
        .map(|sentence| {
            let mut candidate =
                CandidateMemory::new(MemoryKind::Fact, sentence.to_string(), 4, "fact");
            context.apply_to(&mut candidate.metadata);
            candidate
        })
        .collect()
}

// ============================================================================
// Shared extractor
// ============================================================================

/// Records the active subject/mode whenever the turn carries context tags.
fn extract_context_info(_text: &str, context: &TurnContext) -> Vec<CandidateMemory> {
    if context.is_empty() {
        return Vec::new();
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(subject) = &context.subject {
        parts.push(format!("studying {subject}"));
    }
    if let Some(mode) = &context.mode {
        parts.push(format!("in {mode} mode"));
    }
    if let Some(grade) = &context.grade {
        parts.push(format!("grade {grade}"));
    }
    if let Some(board) = &context.board {
        parts.push(format!("{board} board"));
    }
    if let Some(age_group) = &context.age_group {
        parts.push(format!("age group {age_group}"));
    }

    let content = format!("Currently {}", parts.join(", "));
    let mut candidate = CandidateMemory::new(MemoryKind::Context, content, 3, "context");
    context.apply_to(&mut candidate.metadata);
    vec![candidate]
}

// ============================================================================
// Helpers
// ============================================================================

const SNIPPET_MAX_CHARS: usize = 120;

/// Trimmed prefix of the raw message, safe for entry content.
fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SNIPPET_MAX_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}
