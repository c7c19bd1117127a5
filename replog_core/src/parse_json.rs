//! JSON parser.
//!
//! Accepts two shapes: a flat array of set objects (one undated session,
//! grouped by exercise name in first-seen order) or a `{"sessions": [...]}`
//! document with nested exercises and sets. Unrecognized rows are skipped.

use crate::types::{RawExercise, RawSession, RawSet};
use serde_json::Value;

/// First non-null value among several keys
fn pick<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

fn pick_str(obj: &Value, keys: &[&str]) -> Option<String> {
    pick(obj, keys)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn pick_f64(obj: &Value, keys: &[&str]) -> Option<f64> {
    pick(obj, keys).and_then(Value::as_f64)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Clamp a free-form unit string to "lb"/"kg", defaulting to "lb"
fn clamp_unit(unit: Option<String>) -> String {
    let u: String = unit
        .map(|u| u.trim().chars().take(2).collect::<String>().to_lowercase())
        .unwrap_or_default();
    if u == "kg" {
        "kg".to_string()
    } else {
        "lb".to_string()
    }
}

fn load_type_hint(obj: &Value) -> Option<String> {
    let explicit = pick_str(obj, &["load_type", "load type"]).map(|s| s.to_lowercase());
    if explicit.is_some() {
        return explicit;
    }
    // A "type" field only counts when it unambiguously names a load variant
    pick_str(obj, &["type"])
        .map(|s| s.to_lowercase())
        .filter(|t| matches!(t.as_str(), "bodyweight" | "bodyweight_plus" | "bw"))
}

/// Build one RawSet from a flat-array row
fn set_from_flat_row(row: &Value) -> RawSet {
    let weight = pick_f64(row, &["weight", "Weight"]);
    let hint = load_type_hint(row).unwrap_or_default();
    let has_added = pick(row, &["added_weight", "added weight"]).is_some();
    let reps = pick_f64(row, &["reps", "Reps"]).unwrap_or(0.0) as i64;

    let mut set = RawSet {
        reps,
        ..Default::default()
    };
    if matches!(hint.as_str(), "bodyweight" | "bw") {
        set.load_type = Some("bodyweight".into());
    } else if matches!(hint.as_str(), "bodyweight_plus" | "bodyweight +" | "weighted bw")
        || has_added
    {
        set.load_type = Some("bodyweight_plus".into());
        set.added_weight = Some(round2(
            pick_f64(row, &["added_weight", "added weight"]).unwrap_or(0.0),
        ));
        set.added_weight_unit = Some(clamp_unit(pick_str(
            row,
            &["added_weight_unit", "added weight unit", "unit", "Unit"],
        )));
    } else if weight.is_none() {
        set.load_type = Some("bodyweight".into());
    } else if weight == Some(0.0) && hint != "weighted" {
        // Zero weight with no explicit hint reads as a bodyweight set
        set.load_type = Some("bodyweight".into());
    } else {
        set.load_type = Some("weighted".into());
        set.weight = Some(weight.unwrap_or(0.0));
        set.unit = pick_str(row, &["unit", "Unit"]);
    }

    set.rpe = pick_f64(row, &["rpe", "RPE"]);
    set.set_type = pick_str(row, &["set_type"]).map(|s| s.to_lowercase());
    set
}

fn parse_flat_array(rows: &[Value]) -> Vec<RawSession> {
    let mut session = RawSession::default();
    for row in rows {
        if !row.is_object() {
            continue;
        }
        let name = match pick_str(row, &["exercise", "Exercise", "name"]) {
            Some(n) => n,
            None => continue,
        };
        let set = set_from_flat_row(row);
        match session.exercises.iter_mut().find(|e| e.name == name) {
            Some(block) => block.sets.push(set),
            None => {
                let mut block = RawExercise::new(name);
                block.sets.push(set);
                session.exercises.push(block);
            }
        }
    }
    if session.exercises.is_empty() {
        Vec::new()
    } else {
        vec![session]
    }
}

/// Build one RawSet from a nested-session set entry; a bare number means a
/// bodyweight set of that many reps.
fn set_from_nested(entry: &Value) -> Option<RawSet> {
    if let Some(reps) = entry.as_f64() {
        return Some(RawSet {
            reps: reps as i64,
            load_type: Some("bodyweight".into()),
            ..Default::default()
        });
    }
    if !entry.is_object() {
        return None;
    }

    let mut set = RawSet {
        reps: pick_f64(entry, &["reps"]).unwrap_or(0.0) as i64,
        rpe: pick_f64(entry, &["rpe"]),
        notes: pick_str(entry, &["notes"]),
        ..Default::default()
    };
    set.set_type = pick_str(entry, &["set_type"])
        .or_else(|| {
            pick_str(entry, &["type"]).filter(|t| {
                matches!(
                    t.to_lowercase().as_str(),
                    "warmup" | "working" | "top" | "backoff"
                )
            })
        })
        .map(|s| s.to_lowercase());

    let weight = pick_f64(entry, &["weight"]);
    let hint = pick_str(entry, &["load_type", "load type"])
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let has_added = pick(entry, &["added_weight", "added weight"]).is_some();

    if matches!(hint.as_str(), "bodyweight" | "bw") {
        set.load_type = Some("bodyweight".into());
    } else if hint == "bodyweight_plus" || has_added {
        set.load_type = Some("bodyweight_plus".into());
        set.added_weight = Some(round2(
            pick_f64(entry, &["added_weight", "added weight"]).unwrap_or(0.0),
        ));
        set.added_weight_unit = Some(clamp_unit(pick_str(
            entry,
            &["added_weight_unit", "added weight unit", "unit"],
        )));
    } else if weight.is_none() {
        set.load_type = Some("bodyweight".into());
    } else {
        set.load_type = Some(if hint.is_empty() {
            "weighted".to_string()
        } else {
            hint
        });
        set.weight = weight;
        set.unit = pick_str(entry, &["unit"]);
    }
    Some(set)
}

fn parse_sessions_doc(sessions: &[Value]) -> Vec<RawSession> {
    let mut out = Vec::new();
    for sess in sessions {
        let obj = match sess.as_object() {
            Some(o) => o,
            None => continue,
        };
        let date = obj
            .get("date")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut raw = RawSession {
            date,
            exercises: Vec::new(),
        };
        let blocks = obj
            .get("exercises")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for block in blocks {
            if !block.is_object() {
                continue;
            }
            let name = match pick_str(block, &["exercise", "exercise_name", "name", "exercise_raw"])
            {
                Some(n) => n,
                None => continue,
            };
            let entries = block
                .get("sets")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut ex = RawExercise::new(name);
            for entry in entries {
                if let Some(set) = set_from_nested(entry) {
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
    out
}

/// Parse JSON content into raw sessions; empty on unrecognized structure.
pub fn parse_json(content: &str) -> Vec<RawSession> {
    let data: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    match &data {
        Value::Array(rows) => parse_flat_array(rows),
        Value::Object(obj) => match obj.get("sessions").and_then(Value::as_array) {
            Some(sessions) => parse_sessions_doc(sessions),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_array_groups_by_name() {
        let content = r#"[
            {"exercise": "Bench Press", "weight": 135, "reps": 5},
            {"exercise": "Squat", "weight": 225, "reps": 5},
            {"exercise": "Bench Press", "weight": 145, "reps": 3}
        ]"#;
        let sessions = parse_json(content);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].date, None);
        assert_eq!(sessions[0].exercises.len(), 2);
        assert_eq!(sessions[0].exercises[0].name, "Bench Press");
        assert_eq!(sessions[0].exercises[0].sets.len(), 2);
    }

    #[test]
    fn test_flat_array_zero_weight_reads_as_bodyweight() {
        let content = r#"[
            {"exercise": "Pull Up", "weight": 0, "reps": 10},
            {"exercise": "Bar Hold", "weight": 0, "reps": 1, "load_type": "weighted"}
        ]"#;
        let sessions = parse_json(content);
        let ex = &sessions[0].exercises;
        assert_eq!(ex[0].sets[0].load_type.as_deref(), Some("bodyweight"));
        assert_eq!(ex[1].sets[0].load_type.as_deref(), Some("weighted"));
        assert_eq!(ex[1].sets[0].weight, Some(0.0));
    }

    #[test]
    fn test_flat_array_added_weight_implies_bodyweight_plus() {
        let content = r#"[
            {"exercise": "Dip", "reps": 8, "added_weight": 25, "unit": "kg"}
        ]"#;
        let sessions = parse_json(content);
        let set = &sessions[0].exercises[0].sets[0];
        assert_eq!(set.load_type.as_deref(), Some("bodyweight_plus"));
        assert_eq!(set.added_weight, Some(25.0));
        assert_eq!(set.added_weight_unit.as_deref(), Some("kg"));
    }

    #[test]
    fn test_nested_sessions_with_dates() {
        let content = r#"{
            "sessions": [
                {
                    "date": "2025-02-01",
                    "exercises": [
                        {"name": "Squat", "sets": [
                            {"weight": 225, "reps": 5, "type": "warmup"},
                            {"weight": 245, "reps": 5}
                        ]},
                        {"name": "Pull Up", "sets": [10, 8]}
                    ]
                }
            ]
        }"#;
        let sessions = parse_json(content);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].date.as_deref(), Some("2025-02-01"));
        let squat = &sessions[0].exercises[0];
        assert_eq!(squat.sets[0].set_type.as_deref(), Some("warmup"));
        let pullup = &sessions[0].exercises[1];
        assert_eq!(pullup.sets.len(), 2);
        assert_eq!(pullup.sets[0].load_type.as_deref(), Some("bodyweight"));
        assert_eq!(pullup.sets[0].reps, 10);
    }

    #[test]
    fn test_nested_null_weight_is_bodyweight() {
        let content = r#"{
            "sessions": [
                {"exercises": [{"name": "Push Up", "sets": [{"reps": 20}]}]}
            ]
        }"#;
        let sessions = parse_json(content);
        let set = &sessions[0].exercises[0].sets[0];
        assert_eq!(set.load_type.as_deref(), Some("bodyweight"));
    }

    #[test]
    fn test_invalid_json_or_shape_is_empty() {
        assert!(parse_json("not json").is_empty());
        assert!(parse_json("{\"foo\": 1}").is_empty());
        assert!(parse_json("[{\"weight\": 135, \"reps\": 5}]").is_empty());
        assert!(parse_json("42").is_empty());
    }
}
