//! Ingest workflow: parse (CSV/JSON/text), normalize, validate.
//!
//! Stateless by contract. Nothing here persists; the caller receives the
//! canonical log, the issue list, a deterministic confidence score and a
//! canonical hash, and decides what to store.

use crate::hash::canonical_sha256;
use crate::llm::LlmParser;
use crate::normalize::{normalize_date, normalize_session};
use crate::parse_csv::parse_csv;
use crate::parse_json::parse_json;
use crate::parse_text::parse_text;
use crate::registry::Registry;
use crate::resolve::suggest_exercises;
use crate::types::{
    CanonicalLog, IssueRecord, IssueType, RawSession, Severity, Status, Unit,
};
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Version stamp carried in every ingest signature
pub const PARSER_VERSION: &str = "1.0.0";

/// Confidence never drops below this, whatever the issue count
pub const CONFIDENCE_FLOOR: f64 = 0.25;
/// Status ok requires confidence at or above this
pub const CONFIDENCE_THRESHOLD: f64 = 0.70;

// ============================================================================
// Input types
// ============================================================================

/// Declared payload format. Unknown strings deserialize to `Other` and are
/// rejected with an unsupported_type issue rather than a hard error.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Csv,
    Json,
    #[serde(other)]
    Other,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    #[default]
    Normal,
    Strict,
}

/// Accepted for forward compatibility; no strategy is applied yet.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupeStrategy {
    #[default]
    None,
    ByHash,
    ByDateExercise,
}

fn default_unit() -> Unit {
    Unit::Lb
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Caller profile. `user_id` is a client-side correlation id only; there is
/// no server-side identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserInput {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_unit")]
    pub default_unit: Unit,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for UserInput {
    fn default() -> Self {
        UserInput {
            user_id: None,
            default_unit: Unit::Lb,
            timezone: default_timezone(),
        }
    }
}

/// Where the payload came from. `app` selects a source alias pack.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogSource {
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogInput {
    pub content_type: ContentType,
    pub content: String,
    #[serde(default)]
    pub source: Option<LogSource>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IngestOptions {
    /// YYYY-MM-DD fallback date for sessions that carry none
    #[serde(default)]
    pub session_date_hint: Option<String>,
    #[serde(default)]
    pub allow_llm: bool,
    #[serde(default)]
    pub strictness: Strictness,
    #[serde(default)]
    pub dedupe_strategy: DedupeStrategy,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestInput {
    pub user: UserInput,
    pub log_input: LogInput,
    #[serde(default)]
    pub options: IngestOptions,
}

// ============================================================================
// Output types
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestSummary {
    pub sessions_detected: usize,
    pub exercises_detected: usize,
    pub sets_detected: usize,
    pub unmapped_exercises: usize,
    pub confidence: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IngestSignature {
    /// Hex SHA-256 of the canonical log; empty when nothing was produced
    pub canonical_sha256: String,
    pub parser_version: String,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestMeta {
    pub llm_available: bool,
    pub llm_used: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestOutput {
    pub status: Status,
    pub user_id: String,
    /// Minted only for status ok with at least one session; usable as a
    /// client-side storage key
    pub log_id: Option<String>,
    pub canonical_log: CanonicalLog,
    pub issues: Vec<IssueRecord>,
    pub summary: IngestSummary,
    pub signature: IngestSignature,
    pub meta: IngestMeta,
}

// ============================================================================
// Confidence policy
// ============================================================================

fn penalty(kind: IssueType) -> Option<f64> {
    match kind {
        IssueType::MissingDate | IssueType::MissingDateAutofilled => Some(0.15),
        IssueType::InvalidExerciseName => Some(0.20),
        IssueType::IncompleteSet => Some(0.10),
        IssueType::AmbiguousExercise | IssueType::AmbiguousSetFormat => Some(0.15),
        IssueType::UnmappedExercise => Some(0.10),
        _ => None,
    }
}

/// Deterministic confidence from the issue list alone: start at 1.0, apply
/// per-issue penalties, round to 2 decimals, clamp to [floor, 1.0].
pub fn compute_confidence(issues: &[IssueRecord]) -> f64 {
    let mut c = 1.0;
    for issue in issues {
        if let Some(p) = penalty(issue.kind) {
            c -= p;
        }
    }
    let rounded = (c * 100.0).round() / 100.0;
    rounded.clamp(CONFIDENCE_FLOOR, 1.0)
}

// ============================================================================
// Canonicalization
// ============================================================================

fn generate_id(prefix: &str, hex_len: usize) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..hex_len])
}

/// Normalize raw sessions into a canonical log, accumulating date and
/// mapping issues along the way.
pub fn build_canonical_log(
    registry: &Registry,
    raw_sessions: &[RawSession],
    default_unit: Unit,
    date_hint: Option<NaiveDate>,
    source: Option<&str>,
) -> Result<(CanonicalLog, Vec<IssueRecord>)> {
    let mut issues = Vec::new();
    let mut sessions = Vec::with_capacity(raw_sessions.len());

    for (i, raw) in raw_sessions.iter().enumerate() {
        let session_id = generate_id("sess", 8);
        let norm_date = match raw.date.as_deref() {
            Some(d) => normalize_date(Some(d), date_hint),
            None => date_hint,
        };
        if norm_date.is_none() {
            issues.push(IssueRecord::warning(
                IssueType::MissingDate,
                format!("session_{i}"),
                "Session date not provided; session stored with date null. \
                 Provide session_date_hint to set a date.",
            ));
        } else if raw.date.is_none() && date_hint.is_some() {
            issues.push(IssueRecord::warning(
                IssueType::MissingDateAutofilled,
                format!("session_{i}"),
                "Session date was missing; used session_date_hint.",
            ));
        }

        let session = normalize_session(
            registry,
            session_id,
            norm_date,
            &raw.exercises,
            default_unit,
            source,
        )?;
        for (j, ex) in session.exercises.iter().enumerate() {
            if ex.is_unmapped() {
                let suggested = suggest_exercises(registry, &ex.exercise_raw, 3);
                let mut issue = IssueRecord::warning(
                    IssueType::UnmappedExercise,
                    format!("sessions[{i}].exercises[{j}]"),
                    format!(
                        "Exercise not in mapping dictionary; stored as {}. \
                         Add an exact synonym if this is a known lift.",
                        ex.exercise_id
                    ),
                )
                .with_excerpt(ex.exercise_raw.clone());
                if !suggested.is_empty() {
                    issue.suggested_exercise_ids = Some(suggested);
                }
                issues.push(issue);
            }
        }
        sessions.push(session);
    }

    Ok((CanonicalLog { sessions }, issues))
}

// ============================================================================
// Ingest entry point
// ============================================================================

fn excerpt(content: &str) -> Option<String> {
    let trimmed: String = content.chars().take(200).collect::<String>().trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn text_parse_error(content: &str) -> IssueRecord {
    let mut issue = IssueRecord::blocking(
        IssueType::ParseError,
        "text",
        "No valid sets could be extracted from text. Use format 'Exercise 135x5' or \
         '3x5 at 225' with exercise name in context. Use CSV/JSON or set allow_llm=true \
         if an LLM parser is configured.",
    );
    issue.raw_excerpt = excerpt(content);
    issue
}

/// Fill in the date hint for parser sessions that carry no date string.
///
/// Structured inputs get the hint substituted up front, so the autofill
/// issue only fires for sessions a downstream parser itself left dateless.
fn substitute_hint(mut sessions: Vec<RawSession>, hint: Option<&str>) -> Vec<RawSession> {
    if let Some(hint) = hint {
        for session in &mut sessions {
            if session.date.is_none() {
                session.date = Some(hint.to_string());
            }
        }
    }
    sessions
}

/// Run the full stateless ingest: parse, normalize, validate, score.
///
/// `llm` is consulted only for text content with `allow_llm` set. Errors
/// surface as issues in the output wherever the pipeline can keep going;
/// `Err` is reserved for internal failures (serialization, invalid state).
pub fn ingest_log(
    registry: &Registry,
    input: &IngestInput,
    llm: Option<&dyn LlmParser>,
) -> Result<IngestOutput> {
    let options = &input.options;
    let hint_str = options.session_date_hint.as_deref();
    let date_hint = hint_str.and_then(|s| normalize_date(Some(s), None));
    let user_id = input
        .user
        .user_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| generate_id("req", 12));

    let llm_available = llm.is_some();
    let mut llm_used = false;

    if options.dedupe_strategy != DedupeStrategy::None {
        debug!(strategy = ?options.dedupe_strategy, "dedupe strategy accepted but not applied");
    }

    let content = &input.log_input.content;
    let mut issues: Vec<IssueRecord> = Vec::new();
    let mut raw_sessions: Vec<RawSession> = Vec::new();

    match input.log_input.content_type {
        ContentType::Csv => {
            let parsed = parse_csv(content);
            if parsed.is_empty() {
                let mut issue = IssueRecord::blocking(
                    IssueType::ParseError,
                    "csv",
                    "CSV could not be parsed or required columns (exercise, weight, reps) missing.",
                );
                issue.raw_excerpt = excerpt(content);
                issues.push(issue);
            } else {
                raw_sessions = substitute_hint(parsed, hint_str);
            }
        }
        ContentType::Json => {
            let parsed = parse_json(content);
            if parsed.is_empty() {
                let mut issue = IssueRecord::blocking(
                    IssueType::ParseError,
                    "json",
                    "JSON could not be parsed or has no recognized structure.",
                );
                issue.raw_excerpt = excerpt(content);
                issues.push(issue);
            } else {
                raw_sessions = substitute_hint(parsed, hint_str);
            }
        }
        ContentType::Text => {
            if let (true, Some(parser)) = (options.allow_llm, llm) {
                match parser.parse(content, hint_str) {
                    Ok(sessions) => {
                        raw_sessions = sessions;
                        llm_used = true;
                    }
                    Err(e) => {
                        issues.push(IssueRecord::blocking(
                            IssueType::LlmParseError,
                            "text",
                            e.to_string(),
                        ));
                    }
                }
            } else {
                if options.allow_llm {
                    issues.push(IssueRecord::warning(
                        IssueType::LlmUnavailable,
                        "text",
                        "allow_llm=true but no LLM parser is configured; \
                         falling back to deterministic parser.",
                    ));
                }
                let (blocks, text_issues) = parse_text(registry, content);
                issues.extend(text_issues);
                if blocks.is_empty() {
                    issues.push(text_parse_error(content));
                } else {
                    raw_sessions = vec![RawSession {
                        date: hint_str.map(str::to_string),
                        exercises: blocks,
                    }];
                }
            }
        }
        ContentType::Other => {
            issues.push(IssueRecord::blocking(
                IssueType::UnsupportedType,
                "log_input",
                "Unsupported content_type; expected text, csv or json.",
            ));
        }
    }

    // Nothing parsed: short-circuit with an empty log and no hash
    if raw_sessions.is_empty() && !issues.is_empty() {
        let status = if issues.iter().any(|i| i.severity == Severity::Blocking) {
            Status::NeedsClarification
        } else {
            Status::Error
        };
        info!(?status, issues = issues.len(), "ingest produced no sessions");
        return Ok(IngestOutput {
            status,
            user_id,
            log_id: None,
            canonical_log: CanonicalLog::default(),
            issues,
            summary: IngestSummary::default(),
            signature: IngestSignature {
                canonical_sha256: String::new(),
                parser_version: PARSER_VERSION.to_string(),
            },
            meta: IngestMeta {
                llm_available,
                llm_used,
            },
        });
    }

    let source_app = input
        .log_input
        .source
        .as_ref()
        .and_then(|s| s.app.as_deref());
    let (canonical_log, build_issues) = build_canonical_log(
        registry,
        &raw_sessions,
        input.user.default_unit,
        date_hint,
        source_app,
    )?;
    issues.extend(build_issues);

    let sessions_detected = canonical_log.sessions.len();
    let exercises_detected: usize = canonical_log
        .sessions
        .iter()
        .map(|s| s.exercises.len())
        .sum();
    let sets_detected: usize = canonical_log
        .sessions
        .iter()
        .flat_map(|s| s.exercises.iter())
        .map(|e| e.sets.len())
        .sum();
    let unmapped_exercises = canonical_log
        .sessions
        .iter()
        .flat_map(|s| s.exercises.iter())
        .filter(|e| e.is_unmapped())
        .count();
    let confidence = compute_confidence(&issues);

    // In strict mode a missing date escalates to blocking, after the
    // warning has already been priced into the confidence score
    if options.strictness == Strictness::Strict
        && issues.iter().any(|i| i.kind == IssueType::MissingDate)
    {
        issues.push(IssueRecord::blocking(
            IssueType::MissingDate,
            "session",
            "Session date is required when strictness=strict. Provide \
             session_date_hint or structured input with date.",
        ));
    }

    let has_blocking = issues.iter().any(|i| i.severity == Severity::Blocking);
    let status = if has_blocking
        || exercises_detected == 0
        || sets_detected == 0
        || confidence < CONFIDENCE_THRESHOLD
    {
        Status::NeedsClarification
    } else {
        Status::Ok
    };

    let sha = canonical_sha256(&canonical_log)?;
    let log_id = if status == Status::Ok && !canonical_log.sessions.is_empty() {
        Some(generate_id("log", 12))
    } else {
        None
    };

    info!(
        ?status,
        sessions = sessions_detected,
        sets = sets_detected,
        unmapped = unmapped_exercises,
        confidence,
        "ingest complete"
    );

    Ok(IngestOutput {
        status,
        user_id,
        log_id,
        canonical_log,
        issues,
        summary: IngestSummary {
            sessions_detected,
            exercises_detected,
            sets_detected,
            unmapped_exercises,
            confidence,
        },
        signature: IngestSignature {
            canonical_sha256: sha,
            parser_version: PARSER_VERSION.to_string(),
        },
        meta: IngestMeta {
            llm_available,
            llm_used,
        },
    })
}
