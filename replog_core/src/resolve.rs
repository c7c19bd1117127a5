//! Exercise name resolution against the registry.
//!
//! Resolution is a strict precedence chain with exact matching at every step
//! (case-insensitive, trimmed). No fuzzy or substring matching is used, so
//! related-but-distinct lifts ("Incline Barbell Bench Press" vs "Barbell
//! Bench Press") can never collapse onto one id.

use crate::registry::Registry;
use crate::types::MapStrategy;

/// Outcome of resolving one raw exercise name
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    /// Canonical snake_case id, or "unmapped:<slug>"
    pub exercise_id: String,
    pub display: String,
    pub strategy: MapStrategy,
    /// 0.0 (unmapped) to 1.0 (source-pack hit)
    pub score: f64,
}

/// Resolve a raw exercise name.
///
/// Precedence: source pack (1.0) -> global alias (0.95) -> registry display
/// (0.90) -> registry alias (0.85) -> unmapped (0.0).
pub fn resolve_exercise(registry: &Registry, raw: &str, source: Option<&str>) -> Resolution {
    let key = raw.trim();
    let key_lower = key.to_lowercase();

    // 1) Source pack (exact exporter string)
    if let Some(source) = source {
        if let Some(pack) = registry.source_pack(source) {
            if let Some(eid) = pack.get(&key_lower) {
                let display = registry
                    .entry_by_id(eid)
                    .map(|e| e.display.clone())
                    .unwrap_or_else(|| key.to_string());
                return Resolution {
                    exercise_id: eid.clone(),
                    display,
                    strategy: MapStrategy::SourcePack,
                    score: 1.0,
                };
            }
        }
    }

    // 2) Global legacy aliases
    if let Some(eid) = registry.global_alias(&key_lower) {
        return Resolution {
            exercise_id: eid.to_string(),
            display: key.to_string(),
            strategy: MapStrategy::GlobalAlias,
            score: 0.95,
        };
    }

    // 3) Registry display name
    if let Some(entry) = registry.lookup_display(key) {
        return Resolution {
            exercise_id: entry.exercise_id.clone(),
            display: entry.display.clone(),
            strategy: MapStrategy::RegistryDisplay,
            score: 0.90,
        };
    }

    // 4) Registry alias
    if let Some(entry) = registry.lookup_alias(key) {
        return Resolution {
            exercise_id: entry.exercise_id.clone(),
            display: entry.display.clone(),
            strategy: MapStrategy::RegistryAlias,
            score: 0.85,
        };
    }

    // 5) Unmapped
    Resolution {
        exercise_id: format!("unmapped:{}", slug_exercise(raw)),
        display: key.to_string(),
        strategy: MapStrategy::Unmapped,
        score: 0.0,
    }
}

/// Turn a raw exercise name into a slug for unmapped ids: lowercase, strip
/// punctuation, collapse whitespace/hyphens to underscores.
pub fn slug_exercise(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for c in lowered.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_sep = true;
        }
        // other punctuation is stripped
    }
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

/// Up to `max` registry ids whose display or alias is an exact substring of
/// `raw` (or vice versa), alphabetical. Used only to annotate
/// unmapped_exercise issues; never to auto-resolve.
pub fn suggest_exercises(registry: &Registry, raw: &str, max: usize) -> Vec<String> {
    let raw_lower = raw.trim().to_lowercase();
    if raw_lower.is_empty() {
        return Vec::new();
    }
    let mut seen = std::collections::BTreeSet::new();
    for entry in registry.entries() {
        if seen.contains(&entry.exercise_id) {
            continue;
        }
        let display_lower = entry.display.to_lowercase();
        if raw_lower.contains(&display_lower) || display_lower.contains(&raw_lower) {
            seen.insert(entry.exercise_id.clone());
            continue;
        }
        for alias in &entry.aliases {
            let alias_lower = alias.to_lowercase();
            if raw_lower.contains(&alias_lower) || alias_lower.contains(&raw_lower) {
                seen.insert(entry.exercise_id.clone());
                break;
            }
        }
    }
    seen.into_iter().take(max).collect()
}
