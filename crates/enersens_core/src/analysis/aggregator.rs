//! Multi-level sensitivity passes.
//!
//! Each [`Level`] is an independent pass over the same inputs:
//!
//! | Level | Parameters | Outputs | Scoring |
//! |---|---|---|---|
//! | zone-to-zone | zone records fanned out per affected zone | that zone's deltas | single, 1.0 |
//! | zone-to-building | zone records per building and category | building deltas | single, 0.7 |
//! | equipment-to-zone | each equipment record | owning zone's deltas | single, 0.8 |
//! | building-to-building | building records per category, one mean per building | building deltas | Pearson |
//!
//! A pass whose inputs are missing is skipped with a warning. Results of all
//! passes are concatenated and sorted by score, highest first.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::Result;
use crate::model::{
    BuildingId, DeltaTable, Level, ModificationRecord, OutputDelta, Scope, SensitivityResult,
    ValidationScores, sort_by_score,
};

use super::progress::{AnalysisProgress, check_cancelled, set_level_steps, step};
use super::scorer::{SensitivityScore, SensitivityScorer};

/// Everything a pass reads
#[derive(Debug, Clone, Copy)]
pub struct AggregationInputs<'a> {
    pub records: &'a [ModificationRecord],
    pub building_deltas: &'a DeltaTable,
    pub zone_deltas: &'a DeltaTable,
}

/// One group of parameter changes scored against a set of outputs
#[derive(Debug, Clone)]
struct ParameterGroup {
    building_id: Option<BuildingId>,
    parameter: String,
    category: String,
    affected_zones: Vec<String>,
    param_changes: Vec<f64>,
}

impl ParameterGroup {
    fn mean_change(&self) -> f64 {
        mean(&self.param_changes)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MultiLevelAggregator {
    scorer: SensitivityScorer,
    levels: Vec<Level>,
    validation: Option<ValidationScores>,
}

impl MultiLevelAggregator {
    pub fn new(scorer: SensitivityScorer, levels: &[Level]) -> Self {
        Self {
            scorer,
            levels: levels.to_vec(),
            validation: None,
        }
    }

    /// Scale every score by the accuracy weight of its building
    pub fn with_validation(mut self, validation: ValidationScores) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Run every configured level and return the combined, sorted results
    pub fn run(
        &self,
        inputs: &AggregationInputs<'_>,
        progress: Option<&AnalysisProgress>,
    ) -> Result<Vec<SensitivityResult>> {
        let mut results = Vec::new();
        for &level in &self.levels {
            check_cancelled(progress)?;
            if let Some(p) = progress {
                p.begin_level(level);
            }
            let level_results = self.run_level(level, inputs, progress)?;
            tracing::info!(level = %level, results = level_results.len(), "level complete");
            results.extend(level_results);
            if let Some(p) = progress {
                p.finish_level();
            }
        }
        sort_by_score(&mut results);
        Ok(results)
    }

    pub fn run_level(
        &self,
        level: Level,
        inputs: &AggregationInputs<'_>,
        progress: Option<&AnalysisProgress>,
    ) -> Result<Vec<SensitivityResult>> {
        match level {
            Level::ZoneToZone => self.zone_to_zone(inputs, progress),
            Level::ZoneToBuilding => self.zone_to_building(inputs, progress),
            Level::EquipmentToZone => self.equipment_to_zone(inputs, progress),
            Level::BuildingToBuilding => self.building_to_building(inputs, progress),
        }
    }

    fn zone_to_zone(
        &self,
        inputs: &AggregationInputs<'_>,
        progress: Option<&AnalysisProgress>,
    ) -> Result<Vec<SensitivityResult>> {
        let level = Level::ZoneToZone;
        if inputs.zone_deltas.is_empty() {
            tracing::warn!(level = %level, "no zone-level output deltas, skipping");
            return Ok(Vec::new());
        }

        // One entry per (building, zone, category) after fanning out affected zones
        let mut groups: BTreeMap<(BuildingId, String, String), Vec<f64>> = BTreeMap::new();
        for (record, pct) in scoped_changes(inputs.records, Scope::Zone) {
            for zone in &record.affected_zones {
                groups
                    .entry((record.building_id.clone(), zone.clone(), record.category.clone()))
                    .or_default()
                    .push(pct);
            }
        }
        if groups.is_empty() {
            tracing::warn!(level = %level, "no zone-scoped numeric modifications, skipping");
            return Ok(Vec::new());
        }

        set_level_steps(progress, groups.len());
        let mut results = Vec::new();
        for ((building_id, zone, category), param_changes) in groups {
            let scored = step(progress, || {
                let outputs: Vec<&OutputDelta> =
                    inputs.zone_deltas.for_zone(&building_id, &zone).collect();
                if outputs.is_empty() {
                    tracing::debug!(building = %building_id, zone = %zone, "no deltas for zone");
                }
                let group = ParameterGroup {
                    building_id: Some(building_id.clone()),
                    parameter: category.clone(),
                    category: category.clone(),
                    affected_zones: vec![zone.clone()],
                    param_changes,
                };
                self.score_single_group(level, &group, &outputs)
            })?;
            results.extend(scored);
        }
        Ok(results)
    }

    fn zone_to_building(
        &self,
        inputs: &AggregationInputs<'_>,
        progress: Option<&AnalysisProgress>,
    ) -> Result<Vec<SensitivityResult>> {
        let level = Level::ZoneToBuilding;
        if inputs.building_deltas.is_empty() {
            tracing::warn!(level = %level, "no building-level output deltas, skipping");
            return Ok(Vec::new());
        }

        let mut groups: BTreeMap<(BuildingId, String), (Vec<f64>, BTreeSet<String>)> =
            BTreeMap::new();
        for (record, pct) in scoped_changes(inputs.records, Scope::Zone) {
            let (changes, zones) = groups
                .entry((record.building_id.clone(), record.category.clone()))
                .or_default();
            changes.push(pct);
            zones.extend(record.affected_zones.iter().cloned());
        }
        if groups.is_empty() {
            tracing::warn!(level = %level, "no zone-scoped numeric modifications, skipping");
            return Ok(Vec::new());
        }

        set_level_steps(progress, groups.len());
        let mut results = Vec::new();
        for ((building_id, category), (param_changes, zones)) in groups {
            let scored = step(progress, || {
                let outputs: Vec<&OutputDelta> =
                    inputs.building_deltas.for_building(&building_id).collect();
                let group = ParameterGroup {
                    building_id: Some(building_id.clone()),
                    parameter: category.clone(),
                    category: category.clone(),
                    affected_zones: zones.into_iter().collect(),
                    param_changes,
                };
                self.score_single_group(level, &group, &outputs)
            })?;
            results.extend(scored);
        }
        Ok(results)
    }

    fn equipment_to_zone(
        &self,
        inputs: &AggregationInputs<'_>,
        progress: Option<&AnalysisProgress>,
    ) -> Result<Vec<SensitivityResult>> {
        let level = Level::EquipmentToZone;
        if inputs.zone_deltas.is_empty() {
            tracing::warn!(level = %level, "no zone-level output deltas, skipping");
            return Ok(Vec::new());
        }

        let candidates: Vec<(&ModificationRecord, f64)> =
            scoped_changes(inputs.records, Scope::Equipment).collect();
        if candidates.is_empty() {
            tracing::warn!(level = %level, "no equipment-scoped numeric modifications, skipping");
            return Ok(Vec::new());
        }

        set_level_steps(progress, candidates.len());
        let mut results = Vec::new();
        for (record, pct) in candidates {
            let scored = step(progress, || {
                let Some(zone) = record.affected_zones.first() else {
                    return Vec::new();
                };
                let group = ParameterGroup {
                    building_id: Some(record.building_id.clone()),
                    parameter: record.qualified_key(),
                    category: record.category.clone(),
                    affected_zones: vec![zone.clone()],
                    param_changes: vec![pct],
                };
                let outputs: Vec<&OutputDelta> =
                    inputs.zone_deltas.for_zone(&record.building_id, zone).collect();
                self.score_single_group(level, &group, &outputs)
            })?;
            results.extend(scored);
        }
        Ok(results)
    }

    fn building_to_building(
        &self,
        inputs: &AggregationInputs<'_>,
        progress: Option<&AnalysisProgress>,
    ) -> Result<Vec<SensitivityResult>> {
        let level = Level::BuildingToBuilding;
        if inputs.building_deltas.is_empty() {
            tracing::warn!(level = %level, "no building-level output deltas, skipping");
            return Ok(Vec::new());
        }

        // category -> building -> parameter changes
        let mut categories: BTreeMap<String, BTreeMap<BuildingId, Vec<f64>>> = BTreeMap::new();
        for (record, pct) in scoped_changes(inputs.records, Scope::Building) {
            categories
                .entry(record.category.clone())
                .or_default()
                .entry(record.building_id.clone())
                .or_default()
                .push(pct);
        }
        if categories.is_empty() {
            tracing::warn!(level = %level, "no building-scoped numeric modifications, skipping");
            return Ok(Vec::new());
        }

        let variables = inputs.building_deltas.output_variables();
        let categories: Vec<(String, BTreeMap<BuildingId, Vec<f64>>)> =
            categories.into_iter().collect();

        set_level_steps(progress, categories.len());
        let score_category = |(category, buildings): &(String, BTreeMap<BuildingId, Vec<f64>>)|
         -> Result<Vec<SensitivityResult>> {
            step(progress, || {
                self.score_across_buildings(category, buildings, &variables, inputs.building_deltas)
            })
        };

        #[cfg(feature = "parallel")]
        let per_category: Result<Vec<Vec<SensitivityResult>>> =
            categories.par_iter().map(score_category).collect();

        #[cfg(not(feature = "parallel"))]
        let per_category: Result<Vec<Vec<SensitivityResult>>> =
            categories.iter().map(score_category).collect();

        Ok(per_category?.into_iter().flatten().collect())
    }

    fn score_across_buildings(
        &self,
        category: &str,
        buildings: &BTreeMap<BuildingId, Vec<f64>>,
        variables: &[String],
        building_deltas: &DeltaTable,
    ) -> Vec<SensitivityResult> {
        let level = Level::BuildingToBuilding;
        let mut results = Vec::new();

        for variable in variables {
            let mut param_changes = Vec::new();
            let mut output_changes = Vec::new();
            let mut paired = Vec::new();
            for (building_id, changes) in buildings {
                let Some(delta) = building_deltas.get(building_id, None, variable) else {
                    continue;
                };
                // A zero base has no defined percentage change
                if delta.base_value == 0.0 {
                    tracing::debug!(
                        building = %building_id,
                        variable = %variable,
                        "zero-base output excluded from correlation"
                    );
                    continue;
                }
                param_changes.push(mean(changes));
                output_changes.push(delta.pct_change);
                paired.push(building_id);
            }
            if paired.is_empty() {
                continue;
            }

            let score = if paired.len() >= self.scorer.min_samples {
                self.scorer.score(&param_changes, &output_changes)
            } else {
                tracing::warn!(
                    category,
                    variable = %variable,
                    buildings = paired.len(),
                    required = self.scorer.min_samples,
                    "too few buildings for correlation, using single-observation scoring"
                );
                self.scorer.score_single(
                    level,
                    mean(&param_changes),
                    mean(&output_changes),
                    paired.len(),
                )
            };
            let Some(score) = score else {
                continue;
            };

            let weight = match &self.validation {
                Some(v) => mean(&paired.iter().map(|b| v.accuracy_weight(b)).collect::<Vec<_>>()),
                None => 1.0,
            };
            let group = ParameterGroup {
                building_id: None,
                parameter: category.to_string(),
                category: category.to_string(),
                affected_zones: Vec::new(),
                param_changes,
            };
            results.push(build_result(level, &group, variable, None, score.weighted(weight)));
        }
        results
    }

    /// Score one group against each output delta with the single-observation path
    fn score_single_group(
        &self,
        level: Level,
        group: &ParameterGroup,
        outputs: &[&OutputDelta],
    ) -> Vec<SensitivityResult> {
        let mean_param = group.mean_change();
        let weight = self.weight_for(group.building_id.as_ref());
        outputs
            .iter()
            .filter_map(|delta| {
                let score = self.scorer.score_single(
                    level,
                    mean_param,
                    delta.pct_change,
                    group.param_changes.len(),
                )?;
                Some(build_result(
                    level,
                    group,
                    &delta.output_variable,
                    delta.zone.as_deref(),
                    score.weighted(weight),
                ))
            })
            .collect()
    }

    fn weight_for(&self, building_id: Option<&BuildingId>) -> f64 {
        match (&self.validation, building_id) {
            (Some(v), Some(b)) => v.accuracy_weight(b),
            _ => 1.0,
        }
    }
}

/// Numeric records of one scope with their parameter change
fn scoped_changes(
    records: &[ModificationRecord],
    scope: Scope,
) -> impl Iterator<Item = (&ModificationRecord, f64)> {
    records
        .iter()
        .filter(move |r| r.scope == scope)
        .filter_map(|r| r.param_pct_change.filter(|p| p.is_finite()).map(|p| (r, p)))
}

fn build_result(
    level: Level,
    group: &ParameterGroup,
    output_variable: &str,
    output_zone: Option<&str>,
    score: SensitivityScore,
) -> SensitivityResult {
    SensitivityResult {
        level,
        source_scope: level.source_scope(),
        target_scope: level.target_scope(),
        building_id: group.building_id.clone(),
        parameter: group.parameter.clone(),
        category: group.category.clone(),
        output_variable: output_variable.to_string(),
        output_zone: output_zone.map(str::to_string),
        sensitivity_score: score.sensitivity_score,
        correlation: score.correlation,
        p_value: score.p_value,
        n_samples: score.n_samples,
        mean_param_change: score.mean_param_change,
        mean_output_change: score.mean_output_change,
        elasticity: score.elasticity,
        confidence_level: score.confidence_level,
        affected_zones: group.affected_zones.clone(),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
