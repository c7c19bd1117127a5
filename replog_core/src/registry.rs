//! Exercise registry: the controlled vocabulary of known lifts.
//!
//! The registry holds display names, exact aliases, equipment, and movement
//! patterns, plus the global legacy alias table and per-app source packs
//! (exporter string -> exercise_id). A built-in registry ships in code and is
//! cached in a lazily-initialized static; registry and alias-pack JSON files
//! can be loaded from disk instead.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Cached built-in registry - built once and reused across all operations
static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(build_default_registry);

/// Get a reference to the cached built-in registry
///
/// Populated at most once; never mutated afterward, so concurrent readers
/// always see the fully-built structure.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

/// One entry of the controlled vocabulary
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub exercise_id: String,
    pub display: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Registry files may carry a single string or a list here
    #[serde(default, deserialize_with = "string_or_list")]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub movement_pattern: Option<String>,
}

/// Registry plus its exact-match lookup indexes and alias packs
#[derive(Clone, Debug)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
    /// lower-cased display -> entry index
    by_display: HashMap<String, usize>,
    /// lower-cased alias -> entry index (display names win collisions)
    by_alias: HashMap<String, usize>,
    /// legacy exact synonym -> exercise_id
    global_aliases: HashMap<String, String>,
    /// source app name -> (lower-cased exporter string -> exercise_id)
    source_packs: HashMap<String, HashMap<String, String>>,
}

impl Registry {
    /// Build a registry with its lookup indexes from entries and the global
    /// alias table. Display names are indexed first; aliases never shadow a
    /// display name, and the first entry wins per key.
    pub fn new(entries: Vec<RegistryEntry>, global_aliases: HashMap<String, String>) -> Self {
        let mut by_display = HashMap::new();
        let mut by_alias = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            let display = entry.display.trim().to_lowercase();
            if !display.is_empty() {
                by_display.entry(display).or_insert(i);
            }
        }
        for (i, entry) in entries.iter().enumerate() {
            for alias in &entry.aliases {
                let key = alias.trim().to_lowercase();
                if key.is_empty() || by_display.contains_key(&key) {
                    continue;
                }
                by_alias.entry(key).or_insert(i);
            }
        }
        Registry {
            entries,
            by_display,
            by_alias,
            global_aliases,
            source_packs: HashMap::new(),
        }
    }

    /// Register an alias pack for a source app (keys lower-cased)
    pub fn add_source_pack(&mut self, source: impl Into<String>, pack: HashMap<String, String>) {
        let key = source.into().trim().to_lowercase();
        let pack = pack
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .collect();
        self.source_packs.insert(key, pack);
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn entry_by_id(&self, exercise_id: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.exercise_id == exercise_id)
    }

    /// Exact case-insensitive display lookup
    pub fn lookup_display(&self, name: &str) -> Option<&RegistryEntry> {
        self.by_display
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.entries[i])
    }

    /// Exact case-insensitive alias lookup
    pub fn lookup_alias(&self, name: &str) -> Option<&RegistryEntry> {
        self.by_alias
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.entries[i])
    }

    /// Exact global legacy alias lookup (key must already be lower-cased)
    pub fn global_alias(&self, key: &str) -> Option<&str> {
        self.global_aliases.get(key).map(String::as_str)
    }

    pub fn global_aliases(&self) -> &HashMap<String, String> {
        &self.global_aliases
    }

    /// Source pack lookup for an app name, if one is registered
    pub fn source_pack(&self, source: &str) -> Option<&HashMap<String, String>> {
        self.source_packs.get(&source.trim().to_lowercase())
    }

    /// Load a registry from a data directory containing
    /// `exercise_registry.json` and optional `aliases/<source>.json` packs.
    ///
    /// A missing registry file yields an empty vocabulary (only the global
    /// alias table resolves); a malformed file is an error.
    pub fn load_from_dir(dir: &Path) -> Result<Registry> {
        let registry_path = dir.join("exercise_registry.json");
        let entries: Vec<RegistryEntry> = if registry_path.exists() {
            let contents = std::fs::read_to_string(&registry_path)?;
            serde_json::from_str(&contents)?
        } else {
            tracing::warn!("No registry file at {:?}, using empty vocabulary", registry_path);
            Vec::new()
        };
        let mut registry = Registry::new(entries, global_alias_table());

        let aliases_dir = dir.join("aliases");
        if aliases_dir.is_dir() {
            for entry in std::fs::read_dir(&aliases_dir)? {
                let path = entry?.path();
                if path.extension().map(|e| e == "json") != Some(true) {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let contents = std::fs::read_to_string(&path)?;
                let pack: HashMap<String, String> = serde_json::from_str(&contents)
                    .map_err(|e| Error::Registry(format!("Bad alias pack {:?}: {}", path, e)))?;
                tracing::debug!("Loaded alias pack '{}' ({} entries)", stem, pack.len());
                registry.add_source_pack(stem, pack);
            }
        }

        tracing::info!(
            "Loaded registry from {:?}: {} entries, {} alias packs",
            dir,
            registry.entries.len(),
            registry.source_packs.len()
        );
        Ok(registry)
    }

    /// Load a registry per configuration: from `data.registry_dir` when set,
    /// otherwise a copy of the built-in registry.
    pub fn from_config(config: &crate::Config) -> Result<Registry> {
        match &config.data.registry_dir {
            Some(dir) => Registry::load_from_dir(dir),
            None => Ok(default_registry().clone()),
        }
    }

    /// Validate the registry for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if entry.exercise_id.is_empty() {
                errors.push(format!("Entry '{}' has empty exercise_id", entry.display));
            }
            if entry.display.is_empty() {
                errors.push(format!("Entry '{}' has empty display", entry.exercise_id));
            }
            if !seen.insert(entry.exercise_id.as_str()) {
                errors.push(format!("Duplicate exercise_id '{}'", entry.exercise_id));
            }
        }
        for (alias, eid) in &self.global_aliases {
            if alias.trim().is_empty() || eid.trim().is_empty() {
                errors.push(format!("Global alias '{}' -> '{}' is empty", alias, eid));
            }
        }
        errors
    }
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }
    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringOrList::One(s)) => {
            let s = s.trim().to_string();
            if s.is_empty() {
                Vec::new()
            } else {
                vec![s]
            }
        }
        Some(StringOrList::Many(v)) => v
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    })
}

/// Exact legacy synonym -> exercise_id. Convention: snake_case ids that keep
/// their specificity (barbell_bench_press, back_squat, seated_row).
pub fn global_alias_table() -> HashMap<String, String> {
    let pairs: &[(&str, &str)] = &[
        ("barbell bench press", "barbell_bench_press"),
        ("bench press", "barbell_bench_press"),
        ("bench", "barbell_bench_press"),
        ("back squat", "back_squat"),
        ("squat", "back_squat"),
        ("squats", "back_squat"),
        ("deadlift", "deadlift"),
        ("romanian deadlift", "romanian_deadlift"),
        ("rdl", "romanian_deadlift"),
        ("barbell row", "barbell_row"),
        ("seated row", "seated_row"),
        ("overhead press", "overhead_press"),
        ("ohp", "overhead_press"),
        ("lat pulldown", "lat_pulldown"),
        ("pull up", "pull_up"),
        ("pull ups", "pull_up"),
        ("pull-up", "pull_up"),
        ("pullups", "pull_up"),
        ("pullup", "pull_up"),
        ("chin-up", "chin_up"),
        ("chin up", "chin_up"),
        ("dumbbell curl", "dumbbell_curl"),
        ("tricep pushdown", "triceps_pushdown"),
        ("leg press", "leg_press"),
        ("leg curl", "leg_curl"),
        ("leg extension", "leg_extension"),
    ];
    pairs
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

fn entry(
    exercise_id: &str,
    display: &str,
    aliases: &[&str],
    equipment: &[&str],
    movement_pattern: &str,
) -> RegistryEntry {
    RegistryEntry {
        exercise_id: exercise_id.into(),
        display: display.into(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        equipment: equipment.iter().map(|s| s.to_string()).collect(),
        movement_pattern: Some(movement_pattern.into()),
    }
}

/// Builds the built-in registry of common barbell/dumbbell/machine lifts
///
/// **Note**: prefer [`default_registry()`] which returns a cached reference.
/// This function is retained for testing and custom registry creation.
pub fn build_default_registry() -> Registry {
    let entries = vec![
        entry(
            "barbell_bench_press",
            "Barbell Bench Press",
            &["flat barbell bench press", "bb bench press"],
            &["barbell", "bench"],
            "horizontal_push",
        ),
        entry(
            "incline_barbell_bench_press",
            "Incline Barbell Bench Press",
            &["incline bench press", "incline barbell bench"],
            &["barbell", "bench"],
            "horizontal_push",
        ),
        entry(
            "dumbbell_bench_press",
            "Dumbbell Bench Press",
            &["db bench press", "flat dumbbell press"],
            &["dumbbell", "bench"],
            "horizontal_push",
        ),
        entry(
            "smith_machine_bench_press",
            "Smith Machine Bench Press",
            &["smith bench press"],
            &["machine", "bench"],
            "horizontal_push",
        ),
        entry(
            "back_squat",
            "Back Squat",
            &["barbell back squat", "high bar squat", "low bar squat"],
            &["barbell"],
            "squat",
        ),
        entry(
            "front_squat",
            "Front Squat",
            &["barbell front squat"],
            &["barbell"],
            "squat",
        ),
        entry(
            "deadlift",
            "Deadlift",
            &["conventional deadlift", "barbell deadlift"],
            &["barbell"],
            "hinge",
        ),
        entry(
            "romanian_deadlift",
            "Romanian Deadlift",
            &["romanian dl"],
            &["barbell"],
            "hinge",
        ),
        entry(
            "barbell_row",
            "Barbell Row",
            &["bent over row", "bent-over barbell row"],
            &["barbell"],
            "horizontal_pull",
        ),
        entry(
            "seated_row",
            "Seated Row",
            &["seated cable row", "cable row"],
            &["cable"],
            "horizontal_pull",
        ),
        entry(
            "overhead_press",
            "Overhead Press",
            &["military press", "standing barbell press"],
            &["barbell"],
            "vertical_push",
        ),
        entry(
            "lat_pulldown",
            "Lat Pulldown",
            &["wide grip lat pulldown"],
            &["cable"],
            "vertical_pull",
        ),
        entry(
            "pull_up",
            "Pull Up",
            &["wide grip pull up"],
            &["bodyweight"],
            "vertical_pull",
        ),
        entry("chin_up", "Chin Up", &[], &["bodyweight"], "vertical_pull"),
        entry(
            "dumbbell_curl",
            "Dumbbell Curl",
            &["db curl", "bicep curl"],
            &["dumbbell"],
            "isolation",
        ),
        entry(
            "triceps_pushdown",
            "Triceps Pushdown",
            &["cable pushdown", "rope pushdown"],
            &["cable"],
            "isolation",
        ),
        entry("leg_press", "Leg Press", &[], &["machine"], "squat"),
        entry("leg_curl", "Leg Curl", &[], &["machine"], "isolation"),
        entry(
            "leg_extension",
            "Leg Extension",
            &[],
            &["machine"],
            "isolation",
        ),
        entry(
            "barbell_hip_thrust",
            "Barbell Hip Thrust",
            &["hip thrust"],
            &["barbell", "bench"],
            "hinge",
        ),
    ];
    Registry::new(entries, global_alias_table())
}
