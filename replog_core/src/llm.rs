//! Pluggable LLM parsing for messy text logs.
//!
//! The pipeline never talks to a model itself. Callers hand in an
//! implementation of [`LlmParser`]; this module supplies the shared contract:
//! the extraction prompt and the tolerant JSON response decoder that any
//! provider can reuse.

use crate::types::{RawExercise, RawSession, RawSet};
use crate::{Error, Result};
use serde_json::Value;

/// Extraction prompt shared by providers. The response contract matches what
/// [`parse_workout_response`] accepts.
pub const WORKOUT_EXTRACTION_PROMPT: &str = r#"You extract workout sessions from unstructured text. Return ONLY valid JSON, no markdown or explanation.
Format: { "sessions": [ { "date": "YYYY-MM-DD", "exercises": [ { "name": "Exercise Name", "sets": [ { "reps": number, "weight": number or null, "unit": "lb" or "kg" (only when weight present), "load_type": "weighted"|"bodyweight"|"bodyweight_plus", "added_weight": number only for bodyweight_plus } ] } ] } ] }
- date: use the provided hint if text has no date.
- Each set: "reps" is required. Skip sets without valid reps.
- weight: null for bodyweight; number for weighted. For bodyweight_plus (e.g. +25 lb) use weight=null and "added_weight": 25 with "unit" for the added weight; do NOT put added weight in "weight"."#;

/// A model-backed parser for free text. Implementations call whatever
/// provider they like and typically finish with [`parse_workout_response`].
pub trait LlmParser {
    /// Parse `content` into raw sessions. `date_hint` is the caller's
    /// session date suggestion in YYYY-MM-DD, forwarded to the model.
    fn parse(&self, content: &str, date_hint: Option<&str>) -> Result<Vec<RawSession>>;
}

/// Strip a markdown code fence and cut out the first balanced `{...}` object.
fn extract_json_object(text: &str) -> Result<Value> {
    let mut text = text.trim();
    if let Some(stripped) = text.strip_prefix("```") {
        let body = match stripped.find('\n') {
            Some(i) => &stripped[i + 1..],
            None => stripped,
        };
        text = body.trim_end().trim_end_matches("```").trim_end();
    }
    let start = text
        .find('{')
        .ok_or_else(|| Error::Llm("no JSON object found in model response".into()))?;
    let mut depth = 0usize;
    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let object = &text[start..start + i + 1];
                    return serde_json::from_str(object)
                        .map_err(|e| Error::Llm(format!("model returned invalid JSON: {e}")));
                }
            }
            _ => {}
        }
    }
    Err(Error::Llm("unbalanced braces in model response".into()))
}

fn str_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Weight can arrive as a number or a numeric string
fn loose_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn decode_set(entry: &Value) -> Option<RawSet> {
    let reps = loose_f64(entry.get("reps")?)? as i64;
    if reps < 1 {
        return None;
    }

    let weight_field = entry.get("weight").filter(|v| !v.is_null());
    let weight = weight_field.and_then(loose_f64);
    let added_weight = entry
        .get("added_weight")
        .filter(|v| !v.is_null())
        .and_then(loose_f64);

    let mut load_type = str_field(entry, "load_type")
        .map(|s| s.to_lowercase())
        .filter(|lt| matches!(lt.as_str(), "weighted" | "bodyweight" | "bodyweight_plus"));
    if load_type.is_none() {
        load_type = Some(if weight_field.is_some() {
            if weight.is_some() {
                "weighted".to_string()
            } else if added_weight.is_some() {
                "bodyweight_plus".to_string()
            } else {
                "bodyweight".to_string()
            }
        } else if added_weight.is_some() {
            "bodyweight_plus".to_string()
        } else {
            "bodyweight".to_string()
        });
    }
    let load_type = load_type?;

    let unit = str_field(entry, "unit");

    let mut set = RawSet {
        reps,
        ..Default::default()
    };
    match load_type.as_str() {
        "bodyweight_plus" if added_weight.is_some() => {
            set.load_type = Some("bodyweight_plus".into());
            set.added_weight = added_weight;
            set.added_weight_unit = Some(unit.unwrap_or_else(|| "lb".into()));
        }
        "bodyweight" | "bodyweight_plus" => {
            // bodyweight_plus without a usable added weight degrades
            set.load_type = Some("bodyweight".into());
            set.unit = unit;
        }
        _ => match weight {
            Some(w) => {
                set.load_type = Some("weighted".into());
                set.weight = Some(w);
                set.unit = Some(unit.unwrap_or_else(|| "lb".into()));
            }
            None if weight_field.is_none() => {
                set.load_type = Some("bodyweight".into());
                set.unit = unit;
            }
            // Declared weighted but the weight is garbage: skip the set
            None => return None,
        },
    }
    Some(set)
}

/// Decode a model response into raw sessions.
///
/// Tolerant of fenced output and surrounding prose. Sets without valid reps
/// are skipped; exercises and sessions that end up empty are dropped.
pub fn parse_workout_response(text: &str) -> Result<Vec<RawSession>> {
    let data = extract_json_object(text)?;
    let sessions = data
        .get("sessions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut out = Vec::new();
    for sess in sessions {
        let date = str_field(sess, "date");
        let mut raw = RawSession {
            date,
            exercises: Vec::new(),
        };
        let blocks = sess
            .get("exercises")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for block in blocks {
            let name = str_field(block, "name").unwrap_or_else(|| "Unknown".into());
            let mut ex = RawExercise::new(name);
            let entries = block
                .get("sets")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for entry in entries {
                if let Some(set) = decode_set(entry) {
                    ex.sets.push(set);
                }
            }
            if !ex.sets.is_empty() {
                raw.exercises.push(ex);
            }
        }
        if !raw.exercises.is_empty() {
            out.push(raw);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_clean_response() {
        let text = r#"{
            "sessions": [{
                "date": "2025-02-01",
                "exercises": [{
                    "name": "Bench Press",
                    "sets": [{"reps": 5, "weight": 135, "unit": "lb", "load_type": "weighted"}]
                }]
            }]
        }"#;
        let sessions = parse_workout_response(text).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].date.as_deref(), Some("2025-02-01"));
        let set = &sessions[0].exercises[0].sets[0];
        assert_eq!(set.weight, Some(135.0));
        assert_eq!(set.load_type.as_deref(), Some("weighted"));
    }

    #[test]
    fn test_strips_markdown_fence_and_prose() {
        let text = "Here you go:\n```json\n{\"sessions\": [{\"exercises\": [{\"name\": \"Squat\", \"sets\": [{\"reps\": 5, \"weight\": 225}]}]}]}\n```";
        let sessions = parse_workout_response(text).unwrap();
        assert_eq!(sessions[0].exercises[0].name, "Squat");
        // Missing load_type with a numeric weight infers weighted, default lb
        let set = &sessions[0].exercises[0].sets[0];
        assert_eq!(set.load_type.as_deref(), Some("weighted"));
        assert_eq!(set.unit.as_deref(), Some("lb"));
    }

    #[test]
    fn test_skips_sets_without_valid_reps() {
        let text = r#"{"sessions": [{"exercises": [{"name": "Dip", "sets": [
            {"weight": 135},
            {"reps": 0, "weight": 135},
            {"reps": 8, "weight": null, "added_weight": 25, "unit": "kg", "load_type": "bodyweight_plus"}
        ]}]}]}"#;
        let sessions = parse_workout_response(text).unwrap();
        let sets = &sessions[0].exercises[0].sets;
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].load_type.as_deref(), Some("bodyweight_plus"));
        assert_eq!(sets[0].added_weight, Some(25.0));
        assert_eq!(sets[0].added_weight_unit.as_deref(), Some("kg"));
    }

    #[test]
    fn test_null_weight_means_bodyweight() {
        let text = r#"{"sessions": [{"exercises": [{"name": "Pull Up", "sets": [
            {"reps": 10, "weight": null}
        ]}]}]}"#;
        let sessions = parse_workout_response(text).unwrap();
        assert_eq!(
            sessions[0].exercises[0].sets[0].load_type.as_deref(),
            Some("bodyweight")
        );
    }

    #[test]
    fn test_empty_sessions_are_dropped() {
        let text = r#"{"sessions": [{"exercises": [{"name": "Squat", "sets": []}]}]}"#;
        assert!(parse_workout_response(text).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_input_is_llm_error() {
        assert!(parse_workout_response("no json here").is_err());
        assert!(parse_workout_response("{\"sessions\": [").is_err());
    }
}
