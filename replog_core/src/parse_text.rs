//! Deterministic free-text parser.
//!
//! Conservative by design: only two shapes produce sets, "Exercise 135x5" and
//! "3x5 at 225" with an inferable exercise in the surrounding text. Anything
//! else is dropped with a warning issue rather than guessed at.

use crate::registry::Registry;
use crate::types::{IssueRecord, IssueType, RawExercise, RawSet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Tokens that can never be exercise names
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "maybe", "did", "not", "some", "the", "at", "then", "felt", "strong", "tomorrow", "i",
        "we", "a", "an", "and", "or", "is", "it", "to", "go", "went", "up", "no", "yes", "today",
        "sets", "set", "could", "sure", "unknown",
    ]
    .into_iter()
    .collect()
});

/// "Exercise Name 135x5" (optional unit before the x)
static NAMED_SET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([^0-9\n]+?)\s+(\d+(?:\.\d+)?)\s*(?:lb|kg)?\s*[x\u{d7}]\s*(\d+)")
        .expect("static pattern")
});

/// "3x5 at 225": N sets of M reps at a weight
static SETS_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*[x\u{d7}]\s*(\d+)\s+at\s+(\d+(?:\.\d+)?)").expect("static pattern")
});

/// "sets at 135": a weight with no reps, never yields a set
static WEIGHT_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:sets?\s+)?at\s+(\d+(?:\.\d+)?)").expect("static pattern")
});

const TEXT_DEFAULT_UNIT: &str = "lb";

fn is_plausible_exercise_name(name: &str) -> bool {
    let n = name.trim().to_lowercase();
    n.len() >= 2 && !STOP_WORDS.contains(n.as_str())
}

/// Last whole-word occurrence of `alias` in `text` (both lowercase), allowing
/// a plural 's'. Word boundaries are non-letter so "row" never matches inside
/// "tomorrow". Returns the byte position of the match start.
fn last_whole_word(text: &str, alias: &str) -> Option<usize> {
    let mut best = None;
    let mut from = 0;
    while let Some(rel) = text[from..].find(alias) {
        let start = from + rel;
        let end = start + alias.len();
        let before_ok = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_lowercase());
        let mut rest = text[end..].chars();
        let after = match rest.next() {
            Some('s') => rest.next(),
            other => other,
        };
        let after_ok = after.map_or(true, |c| !c.is_ascii_lowercase());
        if before_ok && after_ok {
            best = Some(start);
        }
        from = end;
    }
    best
}

fn title_case(id: &str) -> String {
    id.split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Infer an exercise from already-seen text via the global alias table,
/// preferring the most recently mentioned one.
fn infer_exercise_from_context(registry: &Registry, text_before: &str) -> Option<String> {
    let t = text_before.to_lowercase();
    let mut found: Vec<(usize, String)> = Vec::new();
    for (alias, eid) in registry.global_aliases() {
        if let Some(pos) = last_whole_word(&t, alias) {
            found.push((pos, title_case(eid)));
        }
    }
    found.sort_by_key(|(pos, _)| *pos);
    found.pop().map(|(_, display)| display)
}

fn weighted_set(weight: f64, reps: i64) -> RawSet {
    RawSet {
        weight: Some(weight),
        reps,
        unit: Some(TEXT_DEFAULT_UNIT.to_string()),
        ..Default::default()
    }
}

/// Parse free text into exercise blocks.
///
/// Returns the blocks plus the warning issues accumulated along the way. An
/// empty block list means nothing parseable was found; the caller decides
/// whether that is blocking.
pub fn parse_text(registry: &Registry, content: &str) -> (Vec<RawExercise>, Vec<IssueRecord>) {
    let mut issues = Vec::new();
    let mut result: Vec<RawExercise> = Vec::new();
    let mut current: Option<RawExercise> = None;
    let mut text_so_far = String::new();
    // f64 is not hashable; linear scan is fine at text-note scale
    let mut weights_used: Vec<f64> = Vec::new();

    fn flush(current: &mut Option<RawExercise>, result: &mut Vec<RawExercise>) {
        if let Some(block) = current.take() {
            if !block.sets.is_empty() {
                result.push(block);
            }
        }
    }

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        text_so_far.push(' ');
        text_so_far.push_str(line);

        // "3x5 at 225" means 3 sets of 225x5
        for caps in SETS_AT.captures_iter(line) {
            let full = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let num_sets: i64 = caps[1].parse().unwrap_or(1);
            let reps: i64 = caps[2].parse().unwrap_or(0);
            let weight: f64 = caps[3].parse().unwrap_or(0.0);
            if !weights_used.contains(&weight) {
                weights_used.push(weight);
            }
            let cut = text_so_far.find(full).unwrap_or(0);
            match infer_exercise_from_context(registry, &text_so_far[..cut]) {
                Some(name) => {
                    if current.as_ref().map(|c| c.name != name).unwrap_or(false) {
                        flush(&mut current, &mut result);
                    }
                    let block = current.get_or_insert_with(|| RawExercise::new(name.clone()));
                    block.name = name;
                    for _ in 0..num_sets.max(1) {
                        block.sets.push(weighted_set(weight, reps));
                    }
                }
                None => issues.push(IssueRecord::warning(
                    IssueType::AmbiguousExercise,
                    "text",
                    format!(
                        "Found '{}' but could not infer exercise from context. \
                         Add exercise name (e.g. 'Squat 225x5').",
                        full.trim()
                    ),
                )),
            }
        }

        // Weight with no reps: warn once per distinct weight
        for caps in WEIGHT_ONLY.captures_iter(line) {
            let w: f64 = caps[1].parse().unwrap_or(0.0);
            let captured = weights_used.contains(&w)
                || result
                    .iter()
                    .chain(current.iter())
                    .flat_map(|b| b.sets.iter())
                    .any(|s| s.weight == Some(w) && s.reps > 0);
            if !captured {
                weights_used.push(w);
                issues.push(IssueRecord::warning(
                    IssueType::IncompleteSet,
                    "text",
                    format!(
                        "Found weight {w} but reps could not be determined; set omitted. \
                         Add format like '135x5' or '3x5 at 135'."
                    ),
                ));
            }
        }

        // "Exercise Name 135x5"
        let mut line_contributed = false;
        if let Some(caps) = NAMED_SET.captures(line) {
            let name = caps[1].trim().to_string();
            let weight: f64 = caps[2].parse().unwrap_or(0.0);
            let reps: i64 = caps[3].parse().unwrap_or(0);
            if !is_plausible_exercise_name(&name) {
                issues.push(
                    IssueRecord::warning(
                        IssueType::InvalidExerciseName,
                        "text",
                        format!(
                            "'{name}' does not look like an exercise name; line ignored. \
                             Use a clear exercise name (e.g. Bench Press 135x5)."
                        ),
                    )
                    .with_excerpt(line.chars().take(80).collect::<String>()),
                );
                continue;
            }
            if current.as_ref().map(|c| c.name != name).unwrap_or(false) {
                flush(&mut current, &mut result);
            }
            let block = current.get_or_insert_with(|| RawExercise::new(name.clone()));
            block.name = name;
            block.sets.push(weighted_set(weight, reps));
            if !weights_used.contains(&weight) {
                weights_used.push(weight);
            }
            line_contributed = true;
        }

        // Dropped lines: a lone stop word or a bare number
        if !line_contributed {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() == 1 {
                let token = tokens[0];
                if STOP_WORDS.contains(token.to_lowercase().as_str()) {
                    issues.push(
                        IssueRecord::warning(
                            IssueType::InvalidExerciseName,
                            "text",
                            format!("Line dropped: '{line}' is not a valid exercise name."),
                        )
                        .with_excerpt(line.chars().take(80).collect::<String>()),
                    );
                } else if let Ok(w) = token.parse::<f64>() {
                    if !weights_used.contains(&w) {
                        issues.push(
                            IssueRecord::warning(
                                IssueType::IncompleteSet,
                                "text",
                                format!(
                                    "Found weight {w} but reps could not be determined; \
                                     set omitted."
                                ),
                            )
                            .with_excerpt(line.chars().take(80).collect::<String>()),
                        );
                    }
                }
            }
        }
    }

    flush(&mut current, &mut result);
    (result, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;

    #[test]
    fn test_named_sets_group_into_blocks() {
        let text = "Bench Press 135x5\nBench Press 135x5\nSquat 225x5\n";
        let (blocks, issues) = parse_text(default_registry(), text);
        assert!(issues.is_empty());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "Bench Press");
        assert_eq!(blocks[0].sets.len(), 2);
        assert_eq!(blocks[0].sets[0].weight, Some(135.0));
        assert_eq!(blocks[0].sets[0].unit.as_deref(), Some("lb"));
        assert_eq!(blocks[1].name, "Squat");
    }

    #[test]
    fn test_sets_at_expands_with_context() {
        let text = "Did squats today\n3x5 at 225\n";
        let (blocks, issues) = parse_text(default_registry(), text);
        assert!(issues.is_empty());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "Back Squat");
        assert_eq!(blocks[0].sets.len(), 3);
        assert_eq!(blocks[0].sets[0].weight, Some(225.0));
        assert_eq!(blocks[0].sets[0].reps, 5);
    }

    #[test]
    fn test_sets_at_without_context_is_ambiguous() {
        let (blocks, issues) = parse_text(default_registry(), "3x5 at 225\n");
        assert!(blocks.is_empty());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueType::AmbiguousExercise);
    }

    #[test]
    fn test_prose_without_alias_is_ambiguous() {
        let text = "maybe tomorrow\n3x5 at 185\n";
        let (blocks, issues) = parse_text(default_registry(), text);
        assert!(blocks.is_empty());
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueType::AmbiguousExercise));
    }

    #[test]
    fn test_most_recent_mention_wins() {
        let text = "bench press then squats\n3x5 at 315\n";
        let (blocks, _) = parse_text(default_registry(), text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "Back Squat");
    }

    #[test]
    fn test_weight_only_is_incomplete_set() {
        let (blocks, issues) = parse_text(default_registry(), "some sets at 135\n");
        assert!(blocks.is_empty());
        assert!(issues.iter().any(|i| i.kind == IssueType::IncompleteSet));
    }

    #[test]
    fn test_stop_word_lines_dropped_with_issue() {
        let (blocks, issues) = parse_text(default_registry(), "Maybe\nBench Press 135x5\n");
        assert_eq!(blocks.len(), 1);
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueType::InvalidExerciseName));
    }

    #[test]
    fn test_unicode_multiplication_sign() {
        let (blocks, _) = parse_text(default_registry(), "Deadlift 315\u{d7}3\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].sets[0].weight, Some(315.0));
        assert_eq!(blocks[0].sets[0].reps, 3);
    }

    #[test]
    fn test_empty_input() {
        let (blocks, issues) = parse_text(default_registry(), "");
        assert!(blocks.is_empty());
        assert!(issues.is_empty());
    }
}
