//! Simulation output tables supplied by external loaders

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::BuildingId;

/// Temporal resolution of a set of simulation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Hourly,
    #[default]
    Daily,
    Monthly,
    Annual,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value of one output variable. Rows without a zone are building-level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub building_id: BuildingId,
    #[serde(default, rename = "Zone", alias = "zone", skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(rename = "Variable", alias = "variable")]
    pub variable: String,
    #[serde(rename = "Value", alias = "value")]
    pub value: f64,
}

impl ResultRow {
    pub fn building(building_id: impl Into<BuildingId>, variable: &str, value: f64) -> Self {
        Self {
            building_id: building_id.into(),
            zone: None,
            variable: variable.to_string(),
            value,
        }
    }

    pub fn zone(
        building_id: impl Into<BuildingId>,
        zone: &str,
        variable: &str,
        value: f64,
    ) -> Self {
        Self {
            building_id: building_id.into(),
            zone: Some(zone.to_string()),
            variable: variable.to_string(),
            value,
        }
    }
}

/// Long-format output table for one result category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn building_rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|row| row.zone.is_none())
    }

    pub fn zone_rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|row| row.zone.is_some())
    }

    pub fn has_zone_rows(&self) -> bool {
        self.zone_rows().next().is_some()
    }
}

impl FromIterator<ResultRow> for ResultTable {
    fn from_iter<I: IntoIterator<Item = ResultRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Base and modified output tables, keyed by result category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResults {
    pub base: FxHashMap<String, ResultTable>,
    pub modified: FxHashMap<String, ResultTable>,
}

impl SimulationResults {
    pub fn is_empty(&self) -> bool {
        self.base.values().all(ResultTable::is_empty)
            && self.modified.values().all(ResultTable::is_empty)
    }

    /// Categories present on both sides, sorted
    pub fn shared_categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self
            .base
            .keys()
            .filter(|category| self.modified.contains_key(*category))
            .map(String::as_str)
            .collect();
        categories.sort_unstable();
        categories
    }

    pub fn has_zone_rows(&self) -> bool {
        self.base.values().any(ResultTable::has_zone_rows)
            && self.modified.values().any(ResultTable::has_zone_rows)
    }
}

/// CVRMSE (in percent) per building for the baseline and modified models
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationScores {
    #[serde(default)]
    pub baseline: FxHashMap<BuildingId, f64>,
    #[serde(default)]
    pub modified: FxHashMap<BuildingId, f64>,
}

impl ValidationScores {
    /// `1 / (1 + cvrmse / 100)`, using the modified score when present.
    /// Buildings without a score are weighted 1.0.
    pub fn accuracy_weight(&self, building_id: &BuildingId) -> f64 {
        self.modified
            .get(building_id)
            .or_else(|| self.baseline.get(building_id))
            .filter(|cvrmse| cvrmse.is_finite())
            .map_or(1.0, |cvrmse| 1.0 / (1.0 + cvrmse / 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_weight_prefers_modified() {
        let building = BuildingId::from("b1");
        let scores = ValidationScores {
            baseline: FxHashMap::from_iter([(building.clone(), 30.0)]),
            modified: FxHashMap::from_iter([(building.clone(), 25.0)]),
        };
        assert!((scores.accuracy_weight(&building) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_weight_falls_back() {
        let building = BuildingId::from("b1");
        let scores = ValidationScores {
            baseline: FxHashMap::from_iter([(building.clone(), 100.0)]),
            modified: FxHashMap::default(),
        };
        assert!((scores.accuracy_weight(&building) - 0.5).abs() < 1e-12);
        assert_eq!(scores.accuracy_weight(&BuildingId::from("other")), 1.0);
    }

    #[test]
    fn test_row_column_names() {
        let json = r#"[{"building_id": "b1", "Zone": "CORE", "Variable": "Zone Mean Air Temperature", "Value": 21.5}]"#;
        let table: ResultTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.rows[0].zone.as_deref(), Some("CORE"));
        assert!(table.has_zone_rows());
        assert_eq!(table.building_rows().count(), 0);
    }
}
