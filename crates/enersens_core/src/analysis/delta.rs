//! Output deltas between baseline and modified simulation results.
//!
//! Deltas are computed per building from building-level rows and per
//! (building, zone) from zone-level rows. Zone deltas roll up to building
//! level with a mixed policy keyed on the variable name:
//!
//! - percentage changes are averaged across zones,
//! - `Temperature` variables are averaged, volume-weighted when weights are
//!   available for every zone,
//! - everything else (energy-like) is summed.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::model::{BuildingId, DeltaTable, OutputDelta, ResultRow, ResultTable, ZoneKey};

use super::scope::TopologyRegistry;

/// How repeated rows (time steps) of one variable are collapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    #[default]
    Sum,
    Mean,
    Max,
}

impl AggregationMethod {
    /// `None` for an empty slice
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            Self::Sum => values.iter().sum(),
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Zone volume weights used for temperature roll-ups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneWeights {
    weights: FxHashMap<ZoneKey, f64>,
}

impl ZoneWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, building_id: BuildingId, zone: &str, weight: f64) {
        self.weights
            .insert(ZoneKey::new(building_id, zone.to_ascii_uppercase()), weight);
    }

    pub fn get(&self, building_id: &BuildingId, zone: &str) -> Option<f64> {
        self.weights
            .get(&ZoneKey::new(building_id.clone(), zone.to_ascii_uppercase()))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weights from the zone volumes recorded in building topology
    pub fn from_topology(topology: &TopologyRegistry) -> Self {
        let mut weights = Self::new();
        for (building_id, building) in topology {
            for (zone, volume) in &building.zone_volumes {
                weights.insert(building_id.clone(), zone, *volume);
            }
        }
        weights
    }
}

/// True when a variable is aggregated as a temperature
pub fn is_temperature_variable(variable: &str) -> bool {
    variable.contains("Temperature")
}

/// Computes output deltas from per-category result tables
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaCalculator {
    pub aggregation: AggregationMethod,
}

type DeltaKey = (BuildingId, Option<String>, String);

impl DeltaCalculator {
    pub fn new(aggregation: AggregationMethod) -> Self {
        Self { aggregation }
    }

    /// Per-building deltas from rows without a zone
    pub fn building_deltas(
        &self,
        base: &FxHashMap<String, ResultTable>,
        modified: &FxHashMap<String, ResultTable>,
        variables: &[String],
    ) -> DeltaTable {
        self.deltas(base, modified, variables, false)
    }

    /// Per-(building, zone) deltas from rows with a zone
    pub fn zone_deltas(
        &self,
        base: &FxHashMap<String, ResultTable>,
        modified: &FxHashMap<String, ResultTable>,
        variables: &[String],
    ) -> DeltaTable {
        self.deltas(base, modified, variables, true)
    }

    fn deltas(
        &self,
        base: &FxHashMap<String, ResultTable>,
        modified: &FxHashMap<String, ResultTable>,
        variables: &[String],
        zone_level: bool,
    ) -> DeltaTable {
        let mut categories: Vec<&String> = base.keys().chain(modified.keys()).collect();
        categories.sort_unstable();
        categories.dedup();

        let mut base_values: BTreeMap<DeltaKey, Vec<f64>> = BTreeMap::new();
        let mut modified_values: BTreeMap<DeltaKey, Vec<f64>> = BTreeMap::new();

        for category in categories {
            let (Some(base_table), Some(modified_table)) = (base.get(category), modified.get(category))
            else {
                tracing::warn!(category = %category, "result category missing on one side, skipping");
                continue;
            };
            collect_values(base_table, variables, zone_level, &mut base_values);
            collect_values(modified_table, variables, zone_level, &mut modified_values);
        }

        let mut deltas = Vec::new();
        for (key, base_series) in &base_values {
            let Some(modified_series) = modified_values.get(key) else {
                tracing::debug!(building = %key.0, variable = %key.2, "no modified values for key");
                continue;
            };
            let (Some(base_value), Some(modified_value)) = (
                self.aggregation.apply(base_series),
                self.aggregation.apply(modified_series),
            ) else {
                continue;
            };
            let (building_id, zone, variable) = key.clone();
            deltas.push(OutputDelta::new(building_id, zone, variable, base_value, modified_value));
        }

        tracing::debug!(
            zone_level,
            deltas = deltas.len(),
            "computed output deltas"
        );
        DeltaTable::new(deltas)
    }

    /// Roll zone deltas up to building level using the mixed policy
    /// described in the module docs
    pub fn aggregate_zones_to_building(
        zone_deltas: &DeltaTable,
        weights: Option<&ZoneWeights>,
    ) -> DeltaTable {
        let mut groups: BTreeMap<(BuildingId, String), Vec<&OutputDelta>> = BTreeMap::new();
        for delta in zone_deltas.iter().filter(|d| d.zone.is_some()) {
            groups
                .entry((delta.building_id.clone(), delta.output_variable.clone()))
                .or_default()
                .push(delta);
        }

        groups
            .into_iter()
            .map(|((building_id, variable), zones)| {
                let pct_change = mean(zones.iter().map(|d| d.pct_change));

                let (base_value, modified_value, delta) = if is_temperature_variable(&variable) {
                    let zone_weights = weights.and_then(|w| {
                        zones
                            .iter()
                            .map(|d| {
                                w.get(&building_id, d.zone.as_deref().unwrap_or_default())
                                    .filter(|weight| *weight > 0.0)
                            })
                            .collect::<Option<Vec<f64>>>()
                    });
                    match zone_weights {
                        Some(ws) => (
                            weighted_mean(zones.iter().map(|d| d.base_value), &ws),
                            weighted_mean(zones.iter().map(|d| d.modified_value), &ws),
                            weighted_mean(zones.iter().map(|d| d.delta), &ws),
                        ),
                        None => (
                            mean(zones.iter().map(|d| d.base_value)),
                            mean(zones.iter().map(|d| d.modified_value)),
                            mean(zones.iter().map(|d| d.delta)),
                        ),
                    }
                } else {
                    (
                        zones.iter().map(|d| d.base_value).sum(),
                        zones.iter().map(|d| d.modified_value).sum(),
                        zones.iter().map(|d| d.delta).sum(),
                    )
                };

                OutputDelta {
                    building_id,
                    zone: None,
                    output_variable: variable,
                    base_value,
                    modified_value,
                    delta,
                    pct_change,
                }
            })
            .collect()
    }

    /// Add rolled-up zone deltas for every building that has no building-level
    /// rows of its own. Buildings with building rows are left untouched.
    /// Returns the buildings that were filled in.
    pub fn fill_missing_buildings(
        building_deltas: &mut DeltaTable,
        zone_deltas: &DeltaTable,
        weights: Option<&ZoneWeights>,
    ) -> Vec<BuildingId> {
        let covered: FxHashSet<BuildingId> =
            building_deltas.iter().map(|d| d.building_id.clone()).collect();
        let mut filled = BTreeSet::new();
        for delta in Self::aggregate_zones_to_building(zone_deltas, weights).deltas {
            if covered.contains(&delta.building_id) {
                continue;
            }
            filled.insert(delta.building_id.clone());
            building_deltas.deltas.push(delta);
        }
        filled.into_iter().collect()
    }
}

fn collect_values(
    table: &ResultTable,
    variables: &[String],
    zone_level: bool,
    out: &mut BTreeMap<DeltaKey, Vec<f64>>,
) {
    let rows: Box<dyn Iterator<Item = &ResultRow>> = if zone_level {
        Box::new(table.zone_rows())
    } else {
        Box::new(table.building_rows())
    };

    for row in rows.filter(|row| row.value.is_finite()) {
        let Some(variable) = match_variable(&row.variable, variables) else {
            continue;
        };
        let zone = if zone_level { row.zone.clone() } else { None };
        out.entry((row.building_id.clone(), zone, variable))
            .or_default()
            .push(row.value);
    }
}

/// Name a row's values are collected under, or `None` when the row is not
/// requested. An exact (case-insensitive) match uses the requested spelling.
/// A substring match keeps the row's own variable name, so distinct meters
/// matching one request stay separate series.
fn match_variable(row_variable: &str, requested: &[String]) -> Option<String> {
    if requested.is_empty() {
        return Some(row_variable.to_string());
    }
    if let Some(exact) = requested.iter().find(|v| v.eq_ignore_ascii_case(row_variable)) {
        return Some(exact.clone());
    }
    let lowered = row_variable.to_ascii_lowercase();
    requested
        .iter()
        .any(|v| lowered.contains(&v.to_ascii_lowercase()))
        .then(|| row_variable.to_string())
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn weighted_mean(values: impl Iterator<Item = f64>, weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    values.zip(weights).map(|(v, w)| v * w).sum::<f64>() / total
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEATING: &str = "Heating:EnergyTransfer";
    const TEMP: &str = "Zone Mean Air Temperature";

    fn tables(rows: Vec<ResultRow>) -> FxHashMap<String, ResultTable> {
        FxHashMap::from_iter([("zones".to_string(), ResultTable::new(rows))])
    }

    fn base_zone_rows() -> Vec<ResultRow> {
        vec![
            ResultRow::zone("b1", "Core", HEATING, 60.0),
            ResultRow::zone("b1", "Core", HEATING, 40.0),
            ResultRow::zone("b1", "East", HEATING, 50.0),
            ResultRow::zone("b1", "Core", TEMP, 20.0),
            ResultRow::zone("b1", "East", TEMP, 22.0),
        ]
    }

    fn modified_zone_rows() -> Vec<ResultRow> {
        vec![
            ResultRow::zone("b1", "Core", HEATING, 55.0),
            ResultRow::zone("b1", "Core", HEATING, 35.0),
            ResultRow::zone("b1", "East", HEATING, 60.0),
            ResultRow::zone("b1", "Core", TEMP, 21.0),
            ResultRow::zone("b1", "East", TEMP, 24.0),
        ]
    }

    #[test]
    fn test_aggregation_methods() {
        let values = [1.0, 4.0, 2.0];
        assert_eq!(AggregationMethod::Sum.apply(&values), Some(7.0));
        assert!((AggregationMethod::Mean.apply(&values).unwrap() - 7.0 / 3.0).abs() < 1e-12);
        assert_eq!(AggregationMethod::Max.apply(&values), Some(4.0));
        assert_eq!(AggregationMethod::Sum.apply(&[]), None);
    }

    #[test]
    fn test_zone_deltas_sum_time_steps() {
        let calc = DeltaCalculator::new(AggregationMethod::Sum);
        let deltas = calc.zone_deltas(
            &tables(base_zone_rows()),
            &tables(modified_zone_rows()),
            &[HEATING.to_string()],
        );

        assert_eq!(deltas.len(), 2);
        let core = deltas.get(&BuildingId::from("b1"), Some("Core"), HEATING).unwrap();
        assert_eq!(core.base_value, 100.0);
        assert_eq!(core.modified_value, 90.0);
        assert_eq!(core.delta, -10.0);
        assert!((core.pct_change + 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_variable_exact_match_uses_requested_name() {
        let calc = DeltaCalculator::default();
        let deltas = calc.zone_deltas(
            &tables(base_zone_rows()),
            &tables(modified_zone_rows()),
            &["heating:energytransfer".to_string()],
        );
        assert_eq!(deltas.output_variables(), vec!["heating:energytransfer".to_string()]);
    }

    #[test]
    fn test_substring_match_keeps_meters_apart() {
        let base = tables(vec![
            ResultRow::building("b1", "Electricity:Facility", 100.0),
            ResultRow::building("b1", "InteriorLights:Electricity", 40.0),
            ResultRow::building("b1", "NaturalGas:Facility", 70.0),
        ]);
        let modified = tables(vec![
            ResultRow::building("b1", "Electricity:Facility", 110.0),
            ResultRow::building("b1", "InteriorLights:Electricity", 30.0),
            ResultRow::building("b1", "NaturalGas:Facility", 75.0),
        ]);

        let deltas = DeltaCalculator::default().building_deltas(&base, &modified, &["Electricity".to_string()]);
        assert_eq!(
            deltas.output_variables(),
            vec!["Electricity:Facility".to_string(), "InteriorLights:Electricity".to_string()]
        );
        let b1 = BuildingId::from("b1");
        assert_eq!(deltas.get(&b1, None, "Electricity:Facility").unwrap().delta, 10.0);
        assert_eq!(deltas.get(&b1, None, "InteriorLights:Electricity").unwrap().delta, -10.0);
    }

    #[test]
    fn test_fill_missing_buildings_only_adds_zone_only_buildings() {
        let mut base_rows = base_zone_rows();
        base_rows.push(ResultRow::building("b1", HEATING, 400.0));
        base_rows.push(ResultRow::zone("b2", "Core", HEATING, 80.0));
        let mut modified_rows = modified_zone_rows();
        modified_rows.push(ResultRow::building("b1", HEATING, 420.0));
        modified_rows.push(ResultRow::zone("b2", "Core", HEATING, 100.0));

        let calc = DeltaCalculator::default();
        let base = tables(base_rows);
        let modified = tables(modified_rows);
        let zone = calc.zone_deltas(&base, &modified, &[HEATING.to_string()]);
        let mut building = calc.building_deltas(&base, &modified, &[HEATING.to_string()]);
        assert_eq!(building.len(), 1);

        let filled = DeltaCalculator::fill_missing_buildings(&mut building, &zone, None);
        assert_eq!(filled, vec![BuildingId::from("b2")]);
        assert_eq!(building.len(), 2);
        assert_eq!(building.get(&BuildingId::from("b1"), None, HEATING).unwrap().delta, 20.0);
        let b2 = building.get(&BuildingId::from("b2"), None, HEATING).unwrap();
        assert_eq!(b2.delta, 20.0);
        assert!((b2.pct_change - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_category_is_skipped() {
        let calc = DeltaCalculator::default();
        let mut modified = tables(vec![ResultRow::building("b1", HEATING, 90.0)]);
        modified.insert(
            "extra".to_string(),
            ResultTable::new(vec![ResultRow::building("b1", HEATING, 1000.0)]),
        );
        let base = tables(vec![ResultRow::building("b1", HEATING, 100.0)]);

        let deltas = calc.building_deltas(&base, &modified, &[]);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas.deltas[0].delta, -10.0);
    }

    #[test]
    fn test_building_deltas_ignore_zone_rows() {
        let calc = DeltaCalculator::default();
        let mut base_rows = base_zone_rows();
        base_rows.push(ResultRow::building("b1", HEATING, 150.0));
        let mut modified_rows = modified_zone_rows();
        modified_rows.push(ResultRow::building("b1", HEATING, 150.0));

        let deltas = calc.building_deltas(&tables(base_rows), &tables(modified_rows), &[]);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas.deltas[0].delta, 0.0);
    }

    #[test]
    fn test_zone_energy_sums_to_building_delta() {
        let calc = DeltaCalculator::default();
        let zone = calc.zone_deltas(
            &tables(base_zone_rows()),
            &tables(modified_zone_rows()),
            &[],
        );
        let building = DeltaCalculator::aggregate_zones_to_building(&zone, None);

        let zone_sum: f64 = zone
            .iter()
            .filter(|d| d.output_variable == HEATING)
            .map(|d| d.delta)
            .sum();
        let heating = building.get(&BuildingId::from("b1"), None, HEATING).unwrap();
        assert_eq!(heating.delta, zone_sum);
        assert_eq!(heating.base_value, 150.0);
        assert_eq!(heating.modified_value, 150.0);
        // Core -10%, East +20%
        assert!((heating.pct_change - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_temperature_is_averaged() {
        let calc = DeltaCalculator::default();
        let zone = calc.zone_deltas(
            &tables(base_zone_rows()),
            &tables(modified_zone_rows()),
            &[TEMP.to_string()],
        );

        let unweighted = DeltaCalculator::aggregate_zones_to_building(&zone, None);
        let temp = unweighted.get(&BuildingId::from("b1"), None, TEMP).unwrap();
        assert!((temp.base_value - 21.0).abs() < 1e-12);
        assert!((temp.delta - 1.5).abs() < 1e-12);

        let mut weights = ZoneWeights::new();
        weights.insert(BuildingId::from("b1"), "core", 3.0);
        weights.insert(BuildingId::from("b1"), "EAST", 1.0);
        let weighted = DeltaCalculator::aggregate_zones_to_building(&zone, Some(&weights));
        let temp = weighted.get(&BuildingId::from("b1"), None, TEMP).unwrap();
        assert!((temp.base_value - 20.5).abs() < 1e-12);
        assert!((temp.delta - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_partial_weights_fall_back_to_mean() {
        let calc = DeltaCalculator::default();
        let zone = calc.zone_deltas(
            &tables(base_zone_rows()),
            &tables(modified_zone_rows()),
            &[TEMP.to_string()],
        );
        let mut weights = ZoneWeights::new();
        weights.insert(BuildingId::from("b1"), "Core", 3.0);

        let building = DeltaCalculator::aggregate_zones_to_building(&zone, Some(&weights));
        let temp = building.get(&BuildingId::from("b1"), None, TEMP).unwrap();
        assert!((temp.base_value - 21.0).abs() < 1e-12);
    }
}
