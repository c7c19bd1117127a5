//! CSV parser.
//!
//! Accepts exporter-style CSV with columns exercise/weight/reps plus optional
//! unit, rpe, set_type and date. Header matching is case-insensitive with a
//! substring fallback ("Workout Date" finds the date column). Rows that
//! cannot yield a set are dropped rather than failing the whole file.

use crate::types::{RawExercise, RawSession, RawSet};
use tracing::debug;

/// Column indexes located from the header row
struct Columns {
    exercise: usize,
    weight: usize,
    reps: usize,
    unit: Option<usize>,
    rpe: Option<usize>,
    set_type: Option<usize>,
    date: Option<usize>,
}

fn locate_columns(headers: &csv::StringRecord) -> Option<Columns> {
    let lowered: Vec<String> = headers
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let exact = |name: &str| lowered.iter().position(|h| h == name);
    let containing = |needle: &str| lowered.iter().position(|h| h.contains(needle));

    let exercise = exact("exercise")
        .or_else(|| exact("exercise name"))
        .or_else(|| containing("exercise"))?;
    let weight = exact("weight").or_else(|| containing("weight"))?;
    let reps = exact("reps")
        .or_else(|| exact("rep"))
        .or_else(|| containing("rep"))?;
    Some(Columns {
        exercise,
        weight,
        reps,
        unit: exact("unit").or_else(|| exact("units")),
        rpe: exact("rpe"),
        set_type: exact("set_type").or_else(|| exact("set type")),
        date: exact("date")
            .or_else(|| exact("workout date"))
            .or_else(|| containing("date")),
    })
}

/// How one weight cell parsed
enum WeightCell {
    Weighted(f64),
    Bodyweight,
    BodyweightPlus(f64),
    Unparseable,
}

fn parse_weight_cell(val: &str) -> WeightCell {
    let v = val.trim();
    if v.is_empty() {
        // Empty cell is treated as a zero-weight weighted set
        return WeightCell::Weighted(0.0);
    }
    let lower = v.to_lowercase();
    if matches!(lower.as_str(), "bodyweight" | "bw" | "-" | "\u{2014}") {
        return WeightCell::Bodyweight;
    }
    if let Some(rest) = v.strip_prefix('+') {
        let rest = rest.trim();
        if rest.is_empty() {
            return WeightCell::BodyweightPlus(0.0);
        }
        return match rest.parse::<f64>() {
            Ok(added) => WeightCell::BodyweightPlus(added),
            Err(_) => WeightCell::Unparseable,
        };
    }
    match v.parse::<f64>() {
        Ok(w) => WeightCell::Weighted(w),
        Err(_) => WeightCell::Unparseable,
    }
}

fn lb_ish(unit: &str) -> bool {
    matches!(unit, "lb" | "lbs" | "pound" | "pounds")
}

/// One parsed row before session grouping
struct Row {
    date: Option<String>,
    exercise: String,
    set: RawSet,
}

fn parse_row(record: &csv::StringRecord, cols: &Columns) -> Option<Row> {
    let get = |i: usize| record.get(i).unwrap_or("").trim();

    let exercise = get(cols.exercise).to_string();
    if exercise.is_empty() {
        return None;
    }
    // Reps may arrive as "5.0"; truncate like an exporter would
    let reps = get(cols.reps).parse::<f64>().ok()? as i64;

    let mut set = RawSet {
        reps,
        ..Default::default()
    };
    let unit_val = cols
        .unit
        .map(|i| get(i).to_lowercase())
        .filter(|u| !u.is_empty() && !matches!(u.as_str(), "bodyweight" | "bw" | "-"));

    match parse_weight_cell(get(cols.weight)) {
        WeightCell::Weighted(w) => {
            set.load_type = Some("weighted".into());
            set.weight = Some(w);
            set.unit = unit_val;
        }
        WeightCell::Bodyweight => {
            set.load_type = Some("bodyweight".into());
        }
        WeightCell::BodyweightPlus(added) => {
            set.load_type = Some("bodyweight_plus".into());
            set.added_weight = Some((added * 100.0).round() / 100.0);
            set.added_weight_unit = Some(match unit_val.as_deref() {
                Some(u) if !lb_ish(u) => "kg".to_string(),
                _ => "lb".to_string(),
            });
        }
        WeightCell::Unparseable => return None,
    }

    if let Some(i) = cols.rpe {
        let v = get(i);
        if !v.is_empty() {
            set.rpe = v.parse::<f64>().ok();
        }
    }
    if let Some(i) = cols.set_type {
        let v = get(i);
        if !v.is_empty() {
            set.set_type = Some(v.to_lowercase());
        }
    }

    let date = cols
        .date
        .map(|i| get(i).to_string())
        .filter(|d| !d.is_empty());

    Some(Row {
        date,
        exercise,
        set,
    })
}

/// Append a set to the session, starting a new exercise block unless the name
/// continues the current run.
fn push_set(session: &mut RawSession, exercise: &str, set: RawSet) {
    match session.exercises.last_mut() {
        Some(block) if block.name == exercise => block.sets.push(set),
        _ => {
            let mut block = RawExercise::new(exercise);
            block.sets.push(set);
            session.exercises.push(block);
        }
    }
}

/// Parse CSV content into raw sessions.
///
/// With a date column, rows group into one session per distinct date in
/// first-seen order, and dateless rows are dropped. Without one, the whole
/// file is a single undated session. Returns empty when the header is missing
/// required columns or no row parses.
pub fn parse_csv(content: &str) -> Vec<RawSession> {
    let cleaned: String = content
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(cleaned.as_bytes());
    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(_) => return Vec::new(),
    };
    let cols = match locate_columns(&headers) {
        Some(c) => c,
        None => {
            debug!("csv missing required exercise/weight/reps columns");
            return Vec::new();
        }
    };

    let mut rows = Vec::new();
    for record in reader.records().flatten() {
        if let Some(row) = parse_row(&record, &cols) {
            rows.push(row);
        }
    }
    if rows.is_empty() {
        return Vec::new();
    }

    if cols.date.is_some() {
        // One session per distinct date, first-seen order
        let mut sessions: Vec<RawSession> = Vec::new();
        for row in rows {
            let date = match row.date {
                Some(d) => d,
                None => continue,
            };
            let idx = match sessions
                .iter()
                .position(|s| s.date.as_deref() == Some(date.as_str()))
            {
                Some(i) => i,
                None => {
                    sessions.push(RawSession {
                        date: Some(date),
                        exercises: Vec::new(),
                    });
                    sessions.len() - 1
                }
            };
            push_set(&mut sessions[idx], &row.exercise, row.set);
        }
        sessions.retain(|s| !s.exercises.is_empty());
        return sessions;
    }

    let mut session = RawSession::default();
    for row in rows {
        push_set(&mut session, &row.exercise, row.set);
    }
    if session.exercises.is_empty() {
        Vec::new()
    } else {
        vec![session]
    }
}
