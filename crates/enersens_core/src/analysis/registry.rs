//! Modification log loading and typed modification records

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, RegistryError};
use crate::model::{BuildingId, ModificationRecord, RawModificationRow, Scope, parameter_change};

use super::pattern::ObjectPattern;
use super::scope::{ScopeMappingCache, ScopeResolver};

/// File name prefix written by the modification generator
pub const MODIFICATION_LOG_PREFIX: &str = "modifications_detail_";

/// Category assigned to rows that carry no category and match no pattern
pub const UNCATEGORIZED: &str = "uncategorized";

// ============================================================================
// Category registry
// ============================================================================

/// Typed `category → [object type pattern]` registry.
///
/// Validated on construction; categories are kept in name order, which is
/// also the order `classify` tries them in.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    entries: Vec<(String, Vec<ObjectPattern>)>,
}

impl CategoryRegistry {
    pub fn new<I, C, P>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (C, Vec<P>)>,
        C: Into<String>,
        P: AsRef<str>,
    {
        let mut validated: Vec<(String, Vec<ObjectPattern>)> = Vec::new();

        for (category, patterns) in entries {
            let category = category.into().trim().to_string();
            if category.is_empty() {
                return Err(RegistryError::EmptyCategoryName);
            }
            if validated.iter().any(|(name, _)| *name == category) {
                return Err(RegistryError::DuplicateCategory { category });
            }
            if patterns.is_empty() {
                return Err(RegistryError::NoPatterns { category });
            }

            let mut compiled: Vec<ObjectPattern> = Vec::with_capacity(patterns.len());
            for pattern in &patterns {
                let pattern = pattern.as_ref().trim();
                if pattern.is_empty() {
                    return Err(RegistryError::EmptyPattern { category });
                }
                if compiled.iter().any(|p| p.as_str().eq_ignore_ascii_case(pattern)) {
                    return Err(RegistryError::DuplicatePattern {
                        category,
                        pattern: pattern.to_string(),
                    });
                }
                compiled.push(ObjectPattern::new(pattern)?);
            }
            validated.push((category, compiled));
        }

        validated.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self { entries: validated })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == category)
    }

    pub fn patterns(&self, category: &str) -> Option<&[ObjectPattern]> {
        self.entries
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, patterns)| patterns.as_slice())
    }

    /// First category with a pattern matching `object_type`
    pub fn classify(&self, object_type: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.matches(object_type)))
            .map(|(name, _)| name.as_str())
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for CategoryRegistry {
    type Error = RegistryError;

    fn try_from(map: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        Self::new(map)
    }
}

impl From<CategoryRegistry> for BTreeMap<String, Vec<String>> {
    fn from(registry: CategoryRegistry) -> Self {
        registry
            .entries
            .into_iter()
            .map(|(name, patterns)| {
                let sources = patterns.iter().map(|p| p.as_str().to_string()).collect();
                (name, sources)
            })
            .collect()
    }
}

impl Serialize for CategoryRegistry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BTreeMap::<String, Vec<String>>::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CategoryRegistry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        Self::try_from(map).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Modification log files
// ============================================================================

/// Newest `modifications_detail_*` file in `dir`
pub fn find_latest_modification_log(dir: &Path) -> Result<PathBuf, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }

    // Only the file name is a pattern; the directory is matched literally
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = Path::new(&escaped).join(format!("{MODIFICATION_LOG_PREFIX}*"));
    let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| LoadError::Parse {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    entries
        .flatten()
        .filter(|path| path.is_file())
        .map(|path| {
            let modified = path
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .max()
        .map(|(_, path)| path)
        .ok_or_else(|| LoadError::NoModificationFiles {
            dir: dir.to_path_buf(),
        })
}

/// Parse a modification log written as a JSON array of rows
pub fn read_modification_log(path: &Path) -> Result<Vec<RawModificationRow>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

// ============================================================================
// Modification registry
// ============================================================================

/// Counts describing a loaded modification log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub total_rows: usize,
    /// Rows with numeric original and new values
    pub numeric_rows: usize,
    /// Rows dropped because their category is not registered
    pub filtered_rows: usize,
    pub building_scoped: usize,
    pub zone_scoped: usize,
    pub equipment_scoped: usize,
    pub buildings: usize,
}

/// Records derived from one modification log
#[derive(Debug, Clone, Default)]
pub struct ModificationSet {
    pub records: Vec<ModificationRecord>,
    pub summary: LoadSummary,
}

impl ModificationSet {
    pub fn by_scope(&self, scope: Scope) -> impl Iterator<Item = &ModificationRecord> {
        self.records.iter().filter(move |r| r.scope == scope)
    }

    pub fn buildings(&self) -> Vec<BuildingId> {
        let mut buildings: Vec<BuildingId> = self
            .records
            .iter()
            .map(|r| r.building_id.clone())
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        buildings.sort();
        buildings
    }
}

/// Turns raw log rows into [`ModificationRecord`]s annotated with scope
#[derive(Debug)]
pub struct ModificationRegistry<'a> {
    resolver: &'a ScopeResolver,
    categories: &'a CategoryRegistry,
    cache: ScopeMappingCache,
}

impl<'a> ModificationRegistry<'a> {
    pub fn new(resolver: &'a ScopeResolver, categories: &'a CategoryRegistry) -> Self {
        Self {
            resolver,
            categories,
            cache: ScopeMappingCache::new(),
        }
    }

    /// Parse every row. Non-numeric rows are kept with missing deltas;
    /// rows outside a non-empty category registry are dropped.
    pub fn load(&mut self, rows: &[RawModificationRow]) -> ModificationSet {
        let mut summary = LoadSummary {
            total_rows: rows.len(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let category = self.category_for(row);
            if !self.categories.is_empty() && !self.categories.contains(&category) {
                summary.filtered_rows += 1;
                continue;
            }

            let original = row.original_value.as_ref().and_then(|v| v.as_f64());
            let new = row.new_value.as_ref().and_then(|v| v.as_f64());
            let (param_delta, param_pct_change) = parameter_change(original, new);

            let mapping = self.cache.get_or_resolve(
                self.resolver,
                &row.object_name,
                &row.object_type,
                &row.building_id,
            );

            if param_delta.is_some() {
                summary.numeric_rows += 1;
            }
            match mapping.scope {
                Scope::Building => summary.building_scoped += 1,
                Scope::Zone => summary.zone_scoped += 1,
                Scope::Equipment => summary.equipment_scoped += 1,
            }

            records.push(ModificationRecord {
                building_id: row.building_id.clone(),
                variant_id: row.variant_id.clone(),
                category,
                object_type: row.object_type.clone(),
                object_name: row.object_name.clone(),
                field_name: row.field_name.clone(),
                original_value: row.original_value.clone(),
                new_value: row.new_value.clone(),
                param_delta,
                param_pct_change,
                scope: mapping.scope,
                affected_zones: mapping.affected_zones,
            });
        }

        let mut set = ModificationSet { records, summary };
        set.summary.buildings = set.buildings().len();

        tracing::info!(
            rows = set.summary.total_rows,
            numeric = set.summary.numeric_rows,
            filtered = set.summary.filtered_rows,
            building = set.summary.building_scoped,
            zone = set.summary.zone_scoped,
            equipment = set.summary.equipment_scoped,
            "loaded modification records"
        );
        set
    }

    /// Number of distinct scope resolutions performed so far
    pub fn resolved_objects(&self) -> usize {
        self.cache.len()
    }

    fn category_for(&self, row: &RawModificationRow) -> String {
        let category = row.category.trim();
        if !category.is_empty() {
            return category.to_string();
        }
        self.categories
            .classify(&row.object_type)
            .unwrap_or(UNCATEGORIZED)
            .to_string()
    }
}
