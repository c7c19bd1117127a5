//! Core domain types for the Replog canonicalization pipeline.
//!
//! This module defines:
//! - The canonical workout log schema (sessions, exercises, sets)
//! - The issue taxonomy shared by ingestion and metrics
//! - Transient parser intermediates (raw sessions/exercises/sets)

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Units and enumerations
// ============================================================================

/// Weight unit. Only label normalization is performed; no conversion.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Lb,
    Kg,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Lb => "lb",
            Unit::Kg => "kg",
        }
    }
}

/// Classification of a set within an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SetType {
    Warmup,
    Working,
    Top,
    Backoff,
}

impl SetType {
    /// Parse a loose string; anything outside the taxonomy is dropped.
    pub fn parse(s: &str) -> Option<SetType> {
        match s.trim().to_lowercase().as_str() {
            "warmup" => Some(SetType::Warmup),
            "working" => Some(SetType::Working),
            "top" => Some(SetType::Top),
            "backoff" => Some(SetType::Backoff),
            _ => None,
        }
    }
}

/// Final status of an ingest or metrics call
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    NeedsClarification,
    Error,
}

// ============================================================================
// Canonical set schema
// ============================================================================

/// Added load on top of bodyweight (bodyweight_plus sets)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AddedLoad {
    pub value: f64,
    pub unit: Unit,
}

/// Load variant of a set, tagged by `load_type`.
///
/// `Weighted` keeps weight/unit optional so canonical sessions produced by
/// other systems (metrics input) with a null weight stay representable;
/// [`SetRecord::new`] rejects that combination for logs built here.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "load_type", rename_all = "snake_case")]
pub enum Load {
    Weighted {
        #[serde(default)]
        weight: Option<f64>,
        #[serde(default)]
        unit: Option<Unit>,
    },
    Bodyweight,
    BodyweightPlus { added_load: AddedLoad },
    Assisted,
}

/// A single performed set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    /// 1-based index within the exercise
    pub set_index: u32,
    #[serde(flatten)]
    pub load: Load,
    pub reps: u32,
    pub rpe: Option<f64>,
    pub set_type: Option<SetType>,
    pub notes: Option<String>,
}

impl SetRecord {
    /// Validated construction: weighted sets must carry weight and unit.
    pub fn new(
        set_index: u32,
        load: Load,
        reps: u32,
        rpe: Option<f64>,
        set_type: Option<SetType>,
        notes: Option<String>,
    ) -> Result<SetRecord> {
        if let Load::Weighted { weight, unit } = &load {
            if weight.is_none() {
                return Err(Error::Validation(
                    "weight required when load_type is weighted".into(),
                ));
            }
            if unit.is_none() {
                return Err(Error::Validation(
                    "unit required when load_type is weighted".into(),
                ));
            }
        }
        Ok(SetRecord {
            set_index,
            load,
            reps,
            rpe,
            set_type,
            notes,
        })
    }
}

// ============================================================================
// Canonical exercise and session schema
// ============================================================================

/// How an exercise name was resolved against the registry
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MapStrategy {
    SourcePack,
    GlobalAlias,
    RegistryDisplay,
    RegistryAlias,
    Unmapped,
}

/// Resolution metadata carried on each canonical exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseMapping {
    pub strategy: MapStrategy,
    /// 0.0 (unmapped) to 1.0 (exact source-pack hit)
    pub score: f64,
}

/// A canonical exercise block: one name, ordered sets
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseRecord {
    /// Verbatim input string
    pub exercise_raw: String,
    /// snake_case id, or "unmapped:<slug>"
    pub exercise_id: String,
    pub exercise_display: String,
    pub mapping: ExerciseMapping,
    pub sets: Vec<SetRecord>,
}

impl ExerciseRecord {
    pub fn is_unmapped(&self) -> bool {
        self.exercise_id.starts_with("unmapped:")
    }
}

/// A canonical training session. A null date is valid but penalized.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub session_id: String,
    pub date: Option<NaiveDate>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub exercises: Vec<ExerciseRecord>,
}

/// The fully normalized workout log. Immutable once built.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CanonicalLog {
    pub sessions: Vec<SessionRecord>,
}

// ============================================================================
// Issue taxonomy
// ============================================================================

/// Issue severity: warnings inform the confidence score, blocking issues
/// always force needs_clarification.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Blocking,
}

/// Issue taxonomy shared by the pipeline and the metrics engine
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    ParseError,
    UnsupportedType,
    LlmParseError,
    LlmUnavailable,
    MissingDate,
    MissingDateAutofilled,
    InvalidExerciseName,
    IncompleteSet,
    AmbiguousExercise,
    AmbiguousSetFormat,
    UnmappedExercise,
    PayloadTooLarge,
}

/// A single data-quality finding, accumulated into results instead of raised
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IssueRecord {
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: IssueType,
    /// Structured path string, e.g. "sessions[0].exercises[2]"
    pub location: String,
    pub message: String,
    pub raw_excerpt: Option<String>,
    /// For unmapped_exercise: up to 3 close registry ids
    pub suggested_exercise_ids: Option<Vec<String>>,
}

impl IssueRecord {
    pub fn warning(kind: IssueType, location: impl Into<String>, message: impl Into<String>) -> Self {
        IssueRecord {
            severity: Severity::Warning,
            kind,
            location: location.into(),
            message: message.into(),
            raw_excerpt: None,
            suggested_exercise_ids: None,
        }
    }

    pub fn blocking(kind: IssueType, location: impl Into<String>, message: impl Into<String>) -> Self {
        IssueRecord {
            severity: Severity::Blocking,
            kind,
            location: location.into(),
            message: message.into(),
            raw_excerpt: None,
            suggested_exercise_ids: None,
        }
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.raw_excerpt = Some(excerpt.into());
        self
    }
}

// ============================================================================
// Parser intermediates (transient)
// ============================================================================

/// Loosely-typed set as produced by the format parsers. Discarded after
/// canonicalization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSet {
    pub weight: Option<f64>,
    pub unit: Option<String>,
    pub reps: i64,
    pub rpe: Option<f64>,
    pub set_type: Option<String>,
    pub notes: Option<String>,
    /// Parser hint: "weighted", "bodyweight", "bodyweight_plus"
    pub load_type: Option<String>,
    pub added_weight: Option<f64>,
    pub added_weight_unit: Option<String>,
}

/// Parser-level exercise block: raw name plus its sets in input order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawExercise {
    pub name: String,
    pub sets: Vec<RawSet>,
}

impl RawExercise {
    pub fn new(name: impl Into<String>) -> Self {
        RawExercise {
            name: name.into(),
            sets: Vec::new(),
        }
    }
}

/// Parser-level session: optional raw date string plus exercise blocks
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSession {
    pub date: Option<String>,
    pub exercises: Vec<RawExercise>,
}
