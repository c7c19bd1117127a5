//! Normalization: units, dates, and the canonical set/exercise/session
//! builders driven by the ingestion pipeline.

use crate::resolve::resolve_exercise;
use crate::types::{
    AddedLoad, ExerciseMapping, ExerciseRecord, Load, RawExercise, RawSet, SessionRecord,
    SetRecord, SetType, Unit,
};
use crate::{Registry, Result};
use chrono::NaiveDate;

/// Round to 2 decimals, the precision of all canonical weights
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Normalize a unit label. No conversion arithmetic, label mapping only;
/// anything unrecognized falls back to the caller's default.
pub fn normalize_unit(unit: Option<&str>, default: Unit) -> Unit {
    match unit.map(|u| u.trim().to_lowercase()).as_deref() {
        Some("lb") | Some("lbs") | Some("pound") | Some("pounds") => Unit::Lb,
        Some("kg") | Some("kilo") | Some("kilogram") | Some("kilograms") => Unit::Kg,
        _ => default,
    }
}

/// Date formats tried after ISO, in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y"];

/// Normalize a raw date string to a date, falling back to the caller-supplied
/// hint when the value is absent or unparseable.
pub fn normalize_date(value: Option<&str>, hint: Option<NaiveDate>) -> Option<NaiveDate> {
    let s = match value.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return hint,
    };
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    hint
}

/// Build a canonical SetRecord from a loosely-typed parser set.
///
/// Field population is driven by the load_type hint: bodyweight sets carry no
/// weight, bodyweight_plus sets carry an added load, everything else
/// (including absent or legacy hints) is treated as weighted.
pub fn normalize_set(raw: &RawSet, set_index: u32, default_unit: Unit) -> Result<SetRecord> {
    let load_type = raw
        .load_type
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "weighted".to_string());

    let reps = raw.reps.max(0) as u32;
    let set_type = raw.set_type.as_deref().and_then(SetType::parse);
    let notes = raw.notes.clone();

    let load = match load_type.as_str() {
        "bodyweight" => Load::Bodyweight,
        "bodyweight_plus" => {
            let value = round2(raw.added_weight.unwrap_or(0.0));
            let unit = normalize_unit(
                raw.added_weight_unit.as_deref().or(raw.unit.as_deref()),
                default_unit,
            );
            Load::BodyweightPlus {
                added_load: AddedLoad { value, unit },
            }
        }
        // "assisted" and unknown hints take the weighted path
        _ => Load::Weighted {
            weight: raw.weight.map(round2),
            unit: Some(normalize_unit(raw.unit.as_deref(), default_unit)),
        },
    };

    SetRecord::new(set_index, load, reps, raw.rpe, set_type, notes)
}

/// Build an ExerciseRecord: resolve the name, normalize every set in order.
pub fn normalize_exercise(
    registry: &Registry,
    raw: &RawExercise,
    default_unit: Unit,
    source: Option<&str>,
) -> Result<ExerciseRecord> {
    let resolution = resolve_exercise(registry, &raw.name, source);
    let mut sets = Vec::with_capacity(raw.sets.len());
    for (i, raw_set) in raw.sets.iter().enumerate() {
        sets.push(normalize_set(raw_set, i as u32 + 1, default_unit)?);
    }
    Ok(ExerciseRecord {
        exercise_raw: raw.name.clone(),
        exercise_id: resolution.exercise_id,
        exercise_display: resolution.display,
        mapping: ExerciseMapping {
            strategy: resolution.strategy,
            score: resolution.score,
        },
        sets,
    })
}

/// Build a SessionRecord from parser exercise blocks.
pub fn normalize_session(
    registry: &Registry,
    session_id: String,
    date: Option<NaiveDate>,
    raw_exercises: &[RawExercise],
    default_unit: Unit,
    source: Option<&str>,
) -> Result<SessionRecord> {
    let mut exercises = Vec::with_capacity(raw_exercises.len());
    for raw in raw_exercises {
        exercises.push(normalize_exercise(registry, raw, default_unit, source)?);
    }
    Ok(SessionRecord {
        session_id,
        date,
        title: None,
        notes: None,
        exercises,
    })
}

/// Format a set for summaries; bodyweight sets never show as "0x<reps>".
pub fn format_set_display(set: &SetRecord) -> String {
    match &set.load {
        Load::Bodyweight => format!("BW\u{d7}{}", set.reps),
        Load::BodyweightPlus { added_load } => format!(
            "BW+{}{}\u{d7}{}",
            added_load.value,
            added_load.unit.as_str(),
            set.reps
        ),
        Load::Weighted {
            weight: Some(w),
            unit: Some(u),
        } => format!("{}{}\u{d7}{}", w, u.as_str(), set.reps),
        _ => format!("?\u{d7}{}", set.reps),
    }
}
