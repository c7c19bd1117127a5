//! Registry search: deterministic, exact-strategy matching with filters.
//!
//! No fuzzy scoring. A query matches via one of four strategies with fixed
//! scores, and results sort by score, exactness, then display name, so the
//! same query always returns the same list.

use crate::registry::Registry;
use serde::{Deserialize, Serialize};

const SCORE_DISPLAY_EXACT: f64 = 1.0;
const SCORE_ALIAS_EXACT: f64 = 0.95;
const SCORE_STARTS_WITH: f64 = 0.90;
const SCORE_CONTAINS: f64 = 0.85;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    DisplayExact,
    AliasExact,
    StartsWith,
    Contains,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub movement_pattern: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MatchMetadata {
    pub strategy: MatchStrategy,
    pub score: f64,
    /// The display or alias text that matched
    pub matched_text: String,
    pub normalized_query: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub exercise_id: String,
    pub display: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub equipment: Vec<String>,
    pub movement_pattern: Option<String>,
    #[serde(rename = "match")]
    pub match_meta: MatchMetadata,
    pub is_exact_match: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchOutput {
    pub query: String,
    pub count: usize,
    pub results: Vec<SearchHit>,
}

/// Normalize a query for matching: lowercase, strip punctuation, collapse
/// whitespace, plus a couple of deterministic plural fixes.
pub fn normalize_search_query(q: &str) -> String {
    let mut s = String::with_capacity(q.len());
    let mut pending_space = false;
    for c in q.trim().to_lowercase().chars() {
        let is_punct = matches!(
            c,
            '-' | '_' | '/' | '.' | ',' | ';' | ':' | '!' | '\'' | '(' | ')' | '[' | ']' | '{'
                | '}'
        );
        if c.is_whitespace() || is_punct {
            pending_space = true;
        } else {
            if pending_space && !s.is_empty() {
                s.push(' ');
            }
            pending_space = false;
            s.push(c);
        }
    }
    if let Some(stripped) = s.strip_suffix("pushdowns") {
        let mut out = stripped.to_string();
        out.push_str("pushdown");
        out
    } else if let Some(stripped) = s.strip_suffix("flyes") {
        let mut out = stripped.to_string();
        out.push_str("fly");
        out
    } else {
        s
    }
}

/// Search the registry. Filters narrow first, then each entry gets its best
/// matching strategy; sort is score desc, exact desc, display asc.
pub fn search_exercises(registry: &Registry, input: &SearchQuery) -> SearchOutput {
    let raw_query = input.query.trim().to_string();
    let norm_query = normalize_search_query(&raw_query);
    let limit = input.limit.unwrap_or(20);
    if norm_query.is_empty() || registry.entries().is_empty() {
        return SearchOutput {
            query: raw_query,
            count: 0,
            results: Vec::new(),
        };
    }
    let equipment_filter = input
        .equipment
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let movement_filter = input
        .movement_pattern
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut hits: Vec<SearchHit> = Vec::new();
    for entry in registry.entries() {
        if let Some(eq) = &equipment_filter {
            let found = entry
                .equipment
                .iter()
                .any(|e| e.trim().to_lowercase() == *eq);
            if !found {
                continue;
            }
        }
        if let Some(mv) = &movement_filter {
            let pattern = entry
                .movement_pattern
                .as_deref()
                .map(|p| p.trim().to_lowercase())
                .unwrap_or_default();
            if pattern != *mv {
                continue;
            }
        }

        let display = entry.display.trim();
        let display_norm = normalize_search_query(display);
        let alias_norms: Vec<String> = entry
            .aliases
            .iter()
            .map(|a| normalize_search_query(a))
            .collect();

        let found = if norm_query == display_norm {
            Some((MatchStrategy::DisplayExact, SCORE_DISPLAY_EXACT, display.to_string()))
        } else if let Some(i) = alias_norms.iter().position(|a| *a == norm_query) {
            Some((
                MatchStrategy::AliasExact,
                SCORE_ALIAS_EXACT,
                entry.aliases[i].trim().to_string(),
            ))
        } else if display_norm.starts_with(&norm_query) {
            Some((MatchStrategy::StartsWith, SCORE_STARTS_WITH, display.to_string()))
        } else if let Some(i) = alias_norms
            .iter()
            .position(|a| !a.is_empty() && a.starts_with(&norm_query))
        {
            Some((
                MatchStrategy::StartsWith,
                SCORE_STARTS_WITH,
                entry.aliases[i].trim().to_string(),
            ))
        } else if display_norm.contains(&norm_query) {
            Some((MatchStrategy::Contains, SCORE_CONTAINS, display.to_string()))
        } else if let Some(i) = alias_norms
            .iter()
            .position(|a| !a.is_empty() && a.contains(&norm_query))
        {
            Some((
                MatchStrategy::Contains,
                SCORE_CONTAINS,
                entry.aliases[i].trim().to_string(),
            ))
        } else {
            None
        };

        let (strategy, score, matched_text) = match found {
            Some(f) => f,
            None => continue,
        };
        let is_exact_match = matches!(
            strategy,
            MatchStrategy::DisplayExact | MatchStrategy::AliasExact
        );
        hits.push(SearchHit {
            exercise_id: entry.exercise_id.clone(),
            display: (!display.is_empty()).then(|| display.to_string()),
            aliases: (!entry.aliases.is_empty()).then(|| entry.aliases.clone()),
            equipment: entry.equipment.clone(),
            movement_pattern: entry
                .movement_pattern
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            match_meta: MatchMetadata {
                strategy,
                score,
                matched_text,
                normalized_query: norm_query.clone(),
            },
            is_exact_match,
        });
    }

    hits.sort_by(|a, b| {
        b.match_meta
            .score
            .partial_cmp(&a.match_meta.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.is_exact_match.cmp(&a.is_exact_match))
            .then(a.display.cmp(&b.display))
    });
    hits.truncate(limit);

    SearchOutput {
        query: raw_query,
        count: hits.len(),
        results: hits,
    }
}
