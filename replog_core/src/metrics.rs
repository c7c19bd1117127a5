//! Deterministic metrics over canonical logs: tonnage, e1rm, PRs, flags.
//!
//! Stateless like ingest: callers pass canonical sessions (or whole log
//! bundles) in and get weekly plus per-exercise aggregates back. Everything
//! is computed from the payload alone, so identical input always produces
//! identical output.

use crate::normalize::round2;
use crate::types::{
    IssueRecord, IssueType, Load, SessionRecord, SetRecord, SetType, Status, Unit,
};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Version stamp carried in every metrics signature
pub const METRICS_VERSION: &str = "1.0.0";

/// Default payload guardrails
pub const MAX_SESSIONS: usize = 500;
pub const MAX_SETS: usize = 10_000;

// ============================================================================
// Input types
// ============================================================================

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum E1rmFormula {
    #[default]
    Epley,
    Brzycki,
}

/// Accepted for API parity; weekly output always carries both tonnage and
/// hard-set counts regardless.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMetric {
    #[default]
    Tonnage,
    HardSets,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsOptions {
    #[serde(default)]
    pub group_by: Option<Vec<String>>,
    #[serde(default)]
    pub e1rm_formula: E1rmFormula,
    #[serde(default)]
    pub volume_metric: VolumeMetric,
    #[serde(default = "default_true")]
    pub include_prs: bool,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        MetricsOptions {
            group_by: None,
            e1rm_formula: E1rmFormula::default(),
            volume_metric: VolumeMetric::default(),
            include_prs: true,
        }
    }
}

/// A stored ingest result handed back for analysis
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogBundle {
    #[serde(default)]
    pub log_id: Option<String>,
    pub canonical_json: crate::types::CanonicalLog,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsInput {
    pub user_id: String,
    /// Canonical sessions directly; takes precedence over `logs`
    #[serde(default)]
    pub sessions: Option<Vec<SessionRecord>>,
    #[serde(default)]
    pub logs: Option<Vec<LogBundle>>,
    /// Inclusive window; derived from the data when absent
    #[serde(default)]
    pub range: Option<DateRange>,
    #[serde(default)]
    pub options: MetricsOptions,
}

fn default_max_sessions() -> usize {
    MAX_SESSIONS
}

fn default_max_sets() -> usize {
    MAX_SETS
}

/// Payload guardrails, overridable from config
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_max_sets")]
    pub max_sets: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_sessions: MAX_SESSIONS,
            max_sets: MAX_SETS,
        }
    }
}

// ============================================================================
// Output types
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TopSetRecord {
    pub exercise_id: String,
    pub weight: f64,
    pub unit: Unit,
    pub reps: u32,
    pub e1rm: Option<f64>,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrRecord {
    pub exercise_id: String,
    /// Currently always "e1rm_pr"
    pub kind: String,
    pub weight: f64,
    pub unit: Unit,
    pub reps: u32,
    pub e1rm: Option<f64>,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeeklyMetrics {
    /// Monday of the ISO week
    pub week_start: NaiveDate,
    /// Distinct training dates in the week
    pub sessions: usize,
    pub hard_sets: u32,
    /// None when the week has no tonnage in that unit
    pub tonnage_lb: Option<f64>,
    pub tonnage_kg: Option<f64>,
    /// Bodyweight sets, excluded from tonnage entirely
    pub tonnage_excluded_sets: u32,
    /// Sets with no usable load (assisted, weighted with null weight)
    pub tonnage_unknown_sets: u32,
    pub top_sets: Vec<TopSetRecord>,
    pub prs: Vec<PrRecord>,
    pub flags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSummary {
    pub exercise_id: String,
    pub sessions: usize,
    pub best_e1rm: Option<f64>,
    pub total_hard_sets: u32,
    pub rep_ranges: Option<BTreeMap<String, u32>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetricsSignature {
    pub metrics_version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsOutput {
    pub status: Status,
    pub user_id: String,
    pub range: DateRange,
    pub weekly: Vec<WeeklyMetrics>,
    pub exercise_summaries: Vec<ExerciseSummary>,
    pub issues: Vec<IssueRecord>,
    pub signature: MetricsSignature,
}

// ============================================================================
// e1rm
// ============================================================================

fn e1rm_epley(weight: f64, reps: u32) -> f64 {
    weight * (1.0 + reps as f64 / 30.0)
}

fn e1rm_brzycki(weight: f64, reps: u32) -> f64 {
    weight * (36.0 / (37.0 - reps as f64))
}

/// Estimated 1RM, rounded to 2 decimals. A single is its own e1rm; zero reps
/// yields zero.
pub fn e1rm(weight: f64, reps: u32, formula: E1rmFormula) -> f64 {
    if reps == 0 {
        return 0.0;
    }
    if reps == 1 {
        return weight;
    }
    let raw = match formula {
        E1rmFormula::Epley => e1rm_epley(weight, reps),
        E1rmFormula::Brzycki => e1rm_brzycki(weight, reps),
    };
    round2(raw)
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday() as u64;
    date - Days::new(back)
}

/// A set counts as hard unless it is explicitly a warmup
fn is_hard_set(set_type: Option<SetType>) -> bool {
    !matches!(set_type, Some(SetType::Warmup))
}

// ============================================================================
// Aggregation
// ============================================================================

/// Tonnage contribution of one set
enum TonnageClass {
    Lb(f64),
    Kg(f64),
    /// Bodyweight: excluded by definition
    Excluded,
    /// No usable load (assisted, weighted with null weight)
    Unknown,
}

/// One set flattened for aggregation
struct FlatSet {
    reps: u32,
    hard: bool,
    e1: Option<f64>,
    tonnage: TonnageClass,
    /// (weight, unit) when the set has a display weight; drives top sets
    /// and PRs
    display: Option<(f64, Unit)>,
}

fn flatten_set(set: &SetRecord, formula: E1rmFormula) -> FlatSet {
    let reps = set.reps;
    let hard = is_hard_set(set.set_type);
    match &set.load {
        Load::Bodyweight => FlatSet {
            reps,
            hard,
            e1: None,
            tonnage: TonnageClass::Excluded,
            display: None,
        },
        Load::BodyweightPlus { added_load } => {
            let t = added_load.value * reps as f64;
            FlatSet {
                reps,
                hard,
                e1: Some(e1rm(added_load.value, reps, formula)),
                tonnage: match added_load.unit {
                    Unit::Lb => TonnageClass::Lb(t),
                    Unit::Kg => TonnageClass::Kg(t),
                },
                display: Some((added_load.value, added_load.unit)),
            }
        }
        Load::Weighted {
            weight: Some(w),
            unit,
        } => {
            let unit = unit.unwrap_or(Unit::Lb);
            let t = w * reps as f64;
            FlatSet {
                reps,
                hard,
                e1: Some(e1rm(*w, reps, formula)),
                tonnage: match unit {
                    Unit::Lb => TonnageClass::Lb(t),
                    Unit::Kg => TonnageClass::Kg(t),
                },
                display: Some((*w, unit)),
            }
        }
        Load::Weighted { weight: None, .. } | Load::Assisted => FlatSet {
            reps,
            hard,
            e1: None,
            tonnage: TonnageClass::Unknown,
            display: None,
        },
    }
}

#[derive(Default)]
struct WeekAgg {
    session_dates: BTreeSet<NaiveDate>,
    hard_sets: u32,
    tonnage_lb: f64,
    tonnage_kg: f64,
    excluded_sets: u32,
    unknown_sets: u32,
}

/// A set eligible for top-set and PR reporting
struct BestSet {
    date: NaiveDate,
    weight: f64,
    unit: Unit,
    reps: u32,
    e1: Option<f64>,
}

#[derive(Default)]
struct ExerciseAgg {
    session_dates: BTreeSet<NaiveDate>,
    best_e1rm: Option<f64>,
    total_hard_sets: u32,
    rep_ranges: BTreeMap<String, u32>,
    best_sets: Vec<BestSet>,
}

fn rep_bucket(reps: u32) -> &'static str {
    match reps {
        0..=5 => "1-5",
        6..=8 => "6-8",
        9..=12 => "9-12",
        _ => "12+",
    }
}

fn gather_sessions(input: &MetricsInput) -> Vec<SessionRecord> {
    if let Some(sessions) = &input.sessions {
        return sessions.clone();
    }
    input
        .logs
        .iter()
        .flatten()
        .flat_map(|log| log.canonical_json.sessions.iter().cloned())
        .collect()
}

fn fallback_range() -> DateRange {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    DateRange {
        start: epoch,
        end: epoch,
    }
}

fn too_large_output(input: &MetricsInput, range: DateRange, issue: IssueRecord) -> MetricsOutput {
    MetricsOutput {
        status: Status::NeedsClarification,
        user_id: input.user_id.clone(),
        range,
        weekly: Vec::new(),
        exercise_summaries: Vec::new(),
        issues: vec![issue],
        signature: MetricsSignature {
            metrics_version: METRICS_VERSION.to_string(),
        },
    }
}

/// Compute weekly and per-exercise metrics with the default guardrails.
pub fn compute_metrics(input: &MetricsInput) -> MetricsOutput {
    compute_metrics_with_limits(input, Limits::default())
}

/// Compute weekly and per-exercise metrics.
///
/// Dateless sessions are skipped. Oversized payloads return
/// needs_clarification with a blocking payload_too_large issue instead of
/// partial results.
pub fn compute_metrics_with_limits(input: &MetricsInput, limits: Limits) -> MetricsOutput {
    let opts = &input.options;
    let all = gather_sessions(input);

    // Keep dated sessions inside the requested window
    let sessions: Vec<&SessionRecord> = match input.range {
        Some(range) => all
            .iter()
            .filter(|s| {
                s.date
                    .map(|d| range.start <= d && d <= range.end)
                    .unwrap_or(false)
            })
            .collect(),
        None => all.iter().filter(|s| s.date.is_some()).collect(),
    };
    let range = input.range.unwrap_or_else(|| {
        let dates: Vec<NaiveDate> = sessions.iter().filter_map(|s| s.date).collect();
        match (dates.iter().min(), dates.iter().max()) {
            (Some(&start), Some(&end)) => DateRange { start, end },
            _ => fallback_range(),
        }
    });

    let total_sets: usize = sessions
        .iter()
        .flat_map(|s| s.exercises.iter())
        .map(|e| e.sets.len())
        .sum();
    if sessions.len() > limits.max_sessions {
        return too_large_output(
            input,
            range,
            IssueRecord::blocking(
                IssueType::PayloadTooLarge,
                "sessions",
                format!(
                    "Payload exceeds maximum sessions ({} > {}).",
                    sessions.len(),
                    limits.max_sessions
                ),
            ),
        );
    }
    if total_sets > limits.max_sets {
        return too_large_output(
            input,
            range,
            IssueRecord::blocking(
                IssueType::PayloadTooLarge,
                "sets",
                format!(
                    "Payload exceeds maximum sets ({} > {}).",
                    total_sets, limits.max_sets
                ),
            ),
        );
    }

    let mut weeks: BTreeMap<NaiveDate, WeekAgg> = BTreeMap::new();
    let mut exercises: BTreeMap<String, ExerciseAgg> = BTreeMap::new();
    let mut e1rm_pr: BTreeMap<String, f64> = BTreeMap::new();

    for session in &sessions {
        let date = match session.date {
            Some(d) => d,
            None => continue,
        };
        let week = week_start(date);
        for ex in &session.exercises {
            if ex.sets.is_empty() {
                continue;
            }
            let wk = weeks.entry(week).or_default();
            wk.session_dates.insert(date);
            let agg = exercises.entry(ex.exercise_id.clone()).or_default();
            agg.session_dates.insert(date);

            for set in &ex.sets {
                let flat = flatten_set(set, opts.e1rm_formula);
                if flat.hard {
                    wk.hard_sets += 1;
                    agg.total_hard_sets += 1;
                }
                match flat.tonnage {
                    TonnageClass::Lb(t) => wk.tonnage_lb += t,
                    TonnageClass::Kg(t) => wk.tonnage_kg += t,
                    TonnageClass::Excluded => wk.excluded_sets += 1,
                    TonnageClass::Unknown => wk.unknown_sets += 1,
                }
                if let Some(e1) = flat.e1 {
                    if e1 > 0.0 && agg.best_e1rm.map(|b| e1 > b).unwrap_or(true) {
                        agg.best_e1rm = Some(e1);
                    }
                    if e1 > 0.0 && e1 > e1rm_pr.get(&ex.exercise_id).copied().unwrap_or(0.0) {
                        e1rm_pr.insert(ex.exercise_id.clone(), e1);
                    }
                }
                *agg.rep_ranges.entry(rep_bucket(flat.reps).to_string()).or_default() += 1;
                if let Some((weight, unit)) = flat.display {
                    agg.best_sets.push(BestSet {
                        date,
                        weight,
                        unit,
                        reps: flat.reps,
                        e1: flat.e1,
                    });
                }
            }
        }
    }

    // Weekly rollup with week-over-week volume spike detection. A zero
    // tonnage week keeps the previous baseline alive.
    let mut weekly = Vec::with_capacity(weeks.len());
    let mut prev_hard: Option<u32> = None;
    let mut prev_lb: Option<f64> = None;
    let mut prev_kg: Option<f64> = None;
    for (week, agg) in &weeks {
        let spike_hard = prev_hard
            .map(|p| p > 0 && agg.hard_sets as f64 > p as f64 * 1.25)
            .unwrap_or(false);
        let spike_lb = prev_lb
            .map(|p| p > 0.0 && agg.tonnage_lb > 0.0 && agg.tonnage_lb > p * 1.25)
            .unwrap_or(false);
        let spike_kg = prev_kg
            .map(|p| p > 0.0 && agg.tonnage_kg > 0.0 && agg.tonnage_kg > p * 1.25)
            .unwrap_or(false);
        let flags = if spike_hard || spike_lb || spike_kg {
            vec!["volume_spike".to_string()]
        } else {
            Vec::new()
        };
        prev_hard = Some(agg.hard_sets);
        if agg.tonnage_lb > 0.0 {
            prev_lb = Some(agg.tonnage_lb);
        }
        if agg.tonnage_kg > 0.0 {
            prev_kg = Some(agg.tonnage_kg);
        }

        let mut top_sets = Vec::new();
        let mut prs = Vec::new();
        if opts.include_prs {
            for (ex_id, ex_agg) in &exercises {
                for best in &ex_agg.best_sets {
                    if week_start(best.date) == *week {
                        top_sets.push(TopSetRecord {
                            exercise_id: ex_id.clone(),
                            weight: best.weight,
                            unit: best.unit,
                            reps: best.reps,
                            e1rm: best.e1,
                            date: best.date,
                        });
                    }
                }
                if let Some(&pr) = e1rm_pr.get(ex_id) {
                    // First set in the week matching the global best; a PR
                    // weight repeated in a later week shows up again there
                    if let Some(best) = ex_agg
                        .best_sets
                        .iter()
                        .find(|b| week_start(b.date) == *week && b.e1 == Some(pr))
                    {
                        prs.push(PrRecord {
                            exercise_id: ex_id.clone(),
                            kind: "e1rm_pr".to_string(),
                            weight: best.weight,
                            unit: best.unit,
                            reps: best.reps,
                            e1rm: best.e1,
                            date: best.date,
                        });
                    }
                }
            }
        }

        weekly.push(WeeklyMetrics {
            week_start: *week,
            sessions: agg.session_dates.len(),
            hard_sets: agg.hard_sets,
            tonnage_lb: (agg.tonnage_lb > 0.0).then_some(agg.tonnage_lb),
            tonnage_kg: (agg.tonnage_kg > 0.0).then_some(agg.tonnage_kg),
            tonnage_excluded_sets: agg.excluded_sets,
            tonnage_unknown_sets: agg.unknown_sets,
            top_sets,
            prs,
            flags,
        });
    }

    let exercise_summaries = exercises
        .iter()
        .map(|(ex_id, agg)| ExerciseSummary {
            exercise_id: ex_id.clone(),
            sessions: agg.session_dates.len(),
            best_e1rm: agg.best_e1rm,
            total_hard_sets: agg.total_hard_sets,
            rep_ranges: (!agg.rep_ranges.is_empty()).then(|| agg.rep_ranges.clone()),
        })
        .collect();

    info!(
        sessions = sessions.len(),
        sets = total_sets,
        weeks = weekly.len(),
        "metrics computed"
    );

    MetricsOutput {
        status: Status::Ok,
        user_id: input.user_id.clone(),
        range,
        weekly,
        exercise_summaries,
        issues: Vec::new(),
        signature: MetricsSignature {
            metrics_version: METRICS_VERSION.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AddedLoad, ExerciseMapping, ExerciseRecord, MapStrategy};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn weighted(weight: f64, reps: u32, set_type: Option<SetType>) -> SetRecord {
        SetRecord::new(
            1,
            Load::Weighted {
                weight: Some(weight),
                unit: Some(Unit::Lb),
            },
            reps,
            None,
            set_type,
            None,
        )
        .unwrap()
    }

    fn exercise(id: &str, sets: Vec<SetRecord>) -> ExerciseRecord {
        ExerciseRecord {
            exercise_raw: id.to_string(),
            exercise_id: id.to_string(),
            exercise_display: id.to_string(),
            mapping: ExerciseMapping {
                strategy: MapStrategy::RegistryDisplay,
                score: 0.9,
            },
            sets,
        }
    }

    fn session(date: &str, exercises: Vec<ExerciseRecord>) -> SessionRecord {
        SessionRecord {
            session_id: format!("sess_{date}"),
            date: Some(d(date)),
            title: None,
            notes: None,
            exercises,
        }
    }

    fn input(sessions: Vec<SessionRecord>) -> MetricsInput {
        MetricsInput {
            user_id: "u1".into(),
            sessions: Some(sessions),
            logs: None,
            range: None,
            options: MetricsOptions::default(),
        }
    }

    #[test]
    fn test_e1rm_formulas() {
        assert_eq!(e1rm(100.0, 5, E1rmFormula::Epley), 116.67);
        assert_eq!(e1rm(100.0, 5, E1rmFormula::Brzycki), 112.5);
        assert_eq!(e1rm(315.0, 1, E1rmFormula::Epley), 315.0);
        assert_eq!(e1rm(315.0, 1, E1rmFormula::Brzycki), 315.0);
        assert_eq!(e1rm(135.0, 0, E1rmFormula::Epley), 0.0);
    }

    #[test]
    fn test_week_start_is_monday() {
        assert_eq!(week_start(d("2025-02-05")), d("2025-02-03")); // Wed -> Mon
        assert_eq!(week_start(d("2025-02-03")), d("2025-02-03")); // Mon
        assert_eq!(week_start(d("2025-02-09")), d("2025-02-03")); // Sun
    }

    #[test]
    fn test_tonnage_exclusions() {
        // 135x5 + 45x3 weighted, one bodyweight set, one assisted set
        let bw = SetRecord::new(2, Load::Bodyweight, 10, None, None, None).unwrap();
        let assisted = SetRecord::new(3, Load::Assisted, 8, None, None, None).unwrap();
        let sessions = vec![session(
            "2025-02-03",
            vec![
                exercise("barbell_bench_press", vec![weighted(135.0, 5, None), weighted(45.0, 3, None)]),
                exercise("pull_up", vec![bw, assisted]),
            ],
        )];
        let out = compute_metrics(&input(sessions));
        assert_eq!(out.status, Status::Ok);
        let week = &out.weekly[0];
        assert_eq!(week.tonnage_lb, Some(135.0 * 5.0 + 45.0 * 3.0)); // 810
        assert_eq!(week.tonnage_kg, None);
        assert_eq!(week.tonnage_excluded_sets, 1);
        assert_eq!(week.tonnage_unknown_sets, 1);
        assert_eq!(week.hard_sets, 4);
        assert_eq!(week.sessions, 1);
    }

    #[test]
    fn test_units_never_mix() {
        let kg_set = SetRecord::new(
            1,
            Load::Weighted {
                weight: Some(100.0),
                unit: Some(Unit::Kg),
            },
            5,
            None,
            None,
            None,
        )
        .unwrap();
        let sessions = vec![session(
            "2025-02-03",
            vec![
                exercise("back_squat", vec![weighted(225.0, 5, None)]),
                exercise("deadlift", vec![kg_set]),
            ],
        )];
        let out = compute_metrics(&input(sessions));
        let week = &out.weekly[0];
        assert_eq!(week.tonnage_lb, Some(1125.0));
        assert_eq!(week.tonnage_kg, Some(500.0));
    }

    #[test]
    fn test_warmups_are_not_hard_sets() {
        let sessions = vec![session(
            "2025-02-03",
            vec![exercise(
                "back_squat",
                vec![
                    weighted(135.0, 5, Some(SetType::Warmup)),
                    weighted(225.0, 5, Some(SetType::Working)),
                    weighted(245.0, 3, None),
                ],
            )],
        )];
        let out = compute_metrics(&input(sessions));
        assert_eq!(out.weekly[0].hard_sets, 2);
        assert_eq!(out.exercise_summaries[0].total_hard_sets, 2);
        // Warmup tonnage still counts
        assert_eq!(
            out.weekly[0].tonnage_lb,
            Some(135.0 * 5.0 + 225.0 * 5.0 + 245.0 * 3.0)
        );
    }

    #[test]
    fn test_volume_spike_flag() {
        // 1000 lb week then 2000 lb week: >1.25x triggers the flag once
        let sessions = vec![
            session(
                "2025-02-03",
                vec![exercise("back_squat", vec![weighted(200.0, 5, None)])],
            ),
            session(
                "2025-02-10",
                vec![exercise("back_squat", vec![weighted(400.0, 5, None)])],
            ),
        ];
        let out = compute_metrics(&input(sessions));
        assert_eq!(out.weekly.len(), 2);
        assert!(out.weekly[0].flags.is_empty());
        assert_eq!(out.weekly[1].flags, vec!["volume_spike".to_string()]);
    }

    #[test]
    fn test_no_spike_on_first_week_or_small_increase() {
        let sessions = vec![
            session(
                "2025-02-03",
                vec![exercise("back_squat", vec![weighted(200.0, 5, None)])],
            ),
            session(
                "2025-02-10",
                vec![exercise(
                    "back_squat",
                    vec![weighted(200.0, 5, None), weighted(40.0, 5, None)],
                )],
            ),
        ];
        let out = compute_metrics(&input(sessions));
        // 1000 -> 1200 is a 20% increase, no flag; hard sets 1 -> 2 is a
        // 100% increase, which does flag
        assert_eq!(out.weekly[1].flags, vec!["volume_spike".to_string()]);
    }

    #[test]
    fn test_e1rm_pr_recurs_when_matched_again() {
        let sessions = vec![
            session(
                "2025-02-03",
                vec![exercise("back_squat", vec![weighted(300.0, 5, None)])],
            ),
            session(
                "2025-02-10",
                vec![exercise("back_squat", vec![weighted(300.0, 5, None)])],
            ),
        ];
        let out = compute_metrics(&input(sessions));
        // Both weeks contain a set matching the global best e1rm
        assert_eq!(out.weekly[0].prs.len(), 1);
        assert_eq!(out.weekly[1].prs.len(), 1);
        assert_eq!(out.weekly[0].prs[0].kind, "e1rm_pr");
        assert_eq!(out.weekly[0].prs[0].e1rm, Some(350.0));
    }

    #[test]
    fn test_bodyweight_plus_scores_on_added_load() {
        let plus = SetRecord::new(
            1,
            Load::BodyweightPlus {
                added_load: AddedLoad {
                    value: 25.0,
                    unit: Unit::Lb,
                },
            },
            6,
            None,
            None,
            None,
        )
        .unwrap();
        let sessions = vec![session("2025-02-03", vec![exercise("pull_up", vec![plus])])];
        let out = compute_metrics(&input(sessions));
        let week = &out.weekly[0];
        assert_eq!(week.tonnage_lb, Some(150.0));
        assert_eq!(week.top_sets.len(), 1);
        assert_eq!(week.top_sets[0].weight, 25.0);
        let summary = &out.exercise_summaries[0];
        assert_eq!(summary.best_e1rm, Some(e1rm(25.0, 6, E1rmFormula::Epley)));
    }

    #[test]
    fn test_rep_range_buckets() {
        let sessions = vec![session(
            "2025-02-03",
            vec![exercise(
                "back_squat",
                vec![
                    weighted(225.0, 3, None),
                    weighted(185.0, 8, None),
                    weighted(155.0, 12, None),
                    weighted(95.0, 20, None),
                ],
            )],
        )];
        let out = compute_metrics(&input(sessions));
        let ranges = out.exercise_summaries[0].rep_ranges.clone().unwrap();
        assert_eq!(ranges.get("1-5"), Some(&1));
        assert_eq!(ranges.get("6-8"), Some(&1));
        assert_eq!(ranges.get("9-12"), Some(&1));
        assert_eq!(ranges.get("12+"), Some(&1));
    }

    #[test]
    fn test_session_cap_guardrail() {
        let base = session(
            "2025-02-03",
            vec![exercise("back_squat", vec![weighted(225.0, 5, None)])],
        );
        let over: Vec<SessionRecord> = (0..MAX_SESSIONS + 1).map(|_| base.clone()).collect();
        let out = compute_metrics(&input(over));
        assert_eq!(out.status, Status::NeedsClarification);
        assert!(out.weekly.is_empty());
        assert_eq!(out.issues[0].kind, IssueType::PayloadTooLarge);
        assert_eq!(out.issues[0].location, "sessions");

        let at_cap: Vec<SessionRecord> = (0..MAX_SESSIONS).map(|_| base.clone()).collect();
        let out = compute_metrics(&input(at_cap));
        assert_eq!(out.status, Status::Ok);
    }

    #[test]
    fn test_dateless_sessions_skipped_and_range_derived() {
        let mut dateless = session("2025-02-03", vec![]);
        dateless.date = None;
        let sessions = vec![
            dateless,
            session(
                "2025-02-05",
                vec![exercise("deadlift", vec![weighted(315.0, 5, None)])],
            ),
            session(
                "2025-02-12",
                vec![exercise("deadlift", vec![weighted(315.0, 5, None)])],
            ),
        ];
        let out = compute_metrics(&input(sessions));
        assert_eq!(
            out.range,
            DateRange {
                start: d("2025-02-05"),
                end: d("2025-02-12")
            }
        );
        assert_eq!(out.weekly.len(), 2);
    }

    #[test]
    fn test_range_filter_is_inclusive() {
        let sessions = vec![
            session(
                "2025-02-03",
                vec![exercise("deadlift", vec![weighted(315.0, 5, None)])],
            ),
            session(
                "2025-02-10",
                vec![exercise("deadlift", vec![weighted(315.0, 5, None)])],
            ),
        ];
        let mut inp = input(sessions);
        inp.range = Some(DateRange {
            start: d("2025-02-03"),
            end: d("2025-02-03"),
        });
        let out = compute_metrics(&inp);
        assert_eq!(out.weekly.len(), 1);
        assert_eq!(out.weekly[0].week_start, d("2025-02-03"));
    }

    #[test]
    fn test_empty_input_is_ok() {
        let out = compute_metrics(&input(vec![]));
        assert_eq!(out.status, Status::Ok);
        assert!(out.weekly.is_empty());
        assert!(out.exercise_summaries.is_empty());
        assert_eq!(out.range, fallback_range());
        assert_eq!(out.signature.metrics_version, METRICS_VERSION);
    }

    #[test]
    fn test_deterministic_output() {
        let sessions = vec![session(
            "2025-02-03",
            vec![
                exercise("deadlift", vec![weighted(315.0, 5, None)]),
                exercise("back_squat", vec![weighted(225.0, 5, None)]),
            ],
        )];
        let a = compute_metrics(&input(sessions.clone()));
        let b = compute_metrics(&input(sessions));
        assert_eq!(a.weekly, b.weekly);
        assert_eq!(a.exercise_summaries, b.exercise_summaries);
        // Summaries come back sorted by exercise id
        assert_eq!(a.exercise_summaries[0].exercise_id, "back_squat");
        assert_eq!(a.exercise_summaries[1].exercise_id, "deadlift");
    }
}
