//! Report structure derived from the combined result list.
//!
//! Everything here is a pure aggregation over [`SensitivityResult`]s; no
//! scoring happens in this module.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::model::{BuildingId, ConfidenceLevel, Level, ResultType, SensitivityResult, sort_by_score};

/// Run description and coverage counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: Timestamp,
    pub result_type: ResultType,
    pub levels: Vec<Level>,
    pub output_variables: Vec<String>,
    pub validation_weighted: bool,
    pub n_modifications: usize,
    pub n_buildings: usize,
    pub n_zones: usize,
    pub n_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub n_results: usize,
    pub mean_sensitivity: f64,
    pub max_sensitivity: f64,
    /// Category with the highest mean score
    pub dominant_category: Option<String>,
    pub confidence_histogram: BTreeMap<ConfidenceLevel, usize>,
}

/// A zone ranked by its mean zone-to-building score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneImpact {
    pub building_id: BuildingId,
    pub zone: String,
    pub mean_sensitivity: f64,
    pub n_results: usize,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelComparison {
    pub level: Level,
    pub mean_sensitivity: f64,
    pub n_results: usize,
}

/// Equipment-to-zone results collapsed per equipment parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentImpact {
    pub building_id: Option<BuildingId>,
    pub parameter: String,
    pub zone: Option<String>,
    pub mean_sensitivity: f64,
    pub max_sensitivity: f64,
    pub n_results: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CrossLevelInsights {
    pub most_impactful_zones: Vec<ZoneImpact>,
    pub level_comparison: Vec<LevelComparison>,
    pub top_equipment: Vec<EquipmentImpact>,
}

/// Zone-to-zone findings for one zone of one building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInsight {
    pub building_id: BuildingId,
    pub zone: String,
    pub n_results: usize,
    pub mean_sensitivity: f64,
    pub top_category: String,
    pub top_output_variable: String,
    pub top_sensitivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub metadata: ReportMetadata,
    pub summary_by_level: BTreeMap<Level, LevelSummary>,
    pub top_sensitivities_by_level: BTreeMap<Level, Vec<SensitivityResult>>,
    pub cross_level_insights: CrossLevelInsights,
    pub zone_specific_insights: Vec<ZoneInsight>,
    pub detailed_results: Vec<SensitivityResult>,
}

impl SensitivityReport {
    /// Build the report. `results` are re-sorted by score.
    pub fn build(mut metadata: ReportMetadata, mut results: Vec<SensitivityResult>, top_n: usize) -> Self {
        sort_by_score(&mut results);
        metadata.n_results = results.len();

        Self {
            metadata,
            summary_by_level: summarize_levels(&results),
            top_sensitivities_by_level: top_by_level(&results, top_n),
            cross_level_insights: CrossLevelInsights {
                most_impactful_zones: most_impactful_zones(&results, top_n),
                level_comparison: level_comparison(&results),
                top_equipment: top_equipment(&results, top_n),
            },
            zone_specific_insights: zone_insights(&results),
            detailed_results: results,
        }
    }

    pub fn results_for(&self, level: Level) -> impl Iterator<Item = &SensitivityResult> {
        self.detailed_results.iter().filter(move |r| r.level == level)
    }
}

pub fn summarize_levels(results: &[SensitivityResult]) -> BTreeMap<Level, LevelSummary> {
    let mut by_level: BTreeMap<Level, Vec<&SensitivityResult>> = BTreeMap::new();
    for result in results {
        by_level.entry(result.level).or_default().push(result);
    }

    by_level
        .into_iter()
        .map(|(level, level_results)| {
            let scores: Vec<f64> = level_results.iter().map(|r| r.sensitivity_score).collect();

            let mut per_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
            let mut confidence_histogram: BTreeMap<ConfidenceLevel, usize> =
                ConfidenceLevel::ALL.iter().map(|c| (*c, 0)).collect();
            for result in &level_results {
                per_category
                    .entry(result.category.as_str())
                    .or_default()
                    .push(result.sensitivity_score);
                *confidence_histogram.entry(result.confidence_level).or_default() += 1;
            }
            // Ties resolve to the first category by name
            let dominant_category = per_category
                .into_iter()
                .map(|(category, scores)| (category, mean(&scores)))
                .fold(None::<(&str, f64)>, |best, (category, score)| match best {
                    Some((_, best_score)) if best_score >= score => best,
                    _ => Some((category, score)),
                })
                .map(|(category, _)| category.to_string());

            let summary = LevelSummary {
                n_results: level_results.len(),
                mean_sensitivity: mean(&scores),
                max_sensitivity: scores.iter().copied().fold(0.0, f64::max),
                dominant_category,
                confidence_histogram,
            };
            (level, summary)
        })
        .collect()
}

/// Highest-scoring `n` results of each level
pub fn top_by_level(results: &[SensitivityResult], n: usize) -> BTreeMap<Level, Vec<SensitivityResult>> {
    let mut by_level: BTreeMap<Level, Vec<SensitivityResult>> = BTreeMap::new();
    for result in results {
        by_level.entry(result.level).or_default().push(result.clone());
    }
    for level_results in by_level.values_mut() {
        sort_by_score(level_results);
        level_results.truncate(n);
    }
    by_level
}

/// Zones appearing in zone-to-building results, ranked by mean score
pub fn most_impactful_zones(results: &[SensitivityResult], n: usize) -> Vec<ZoneImpact> {
    let mut zones: BTreeMap<(BuildingId, String), (Vec<f64>, Vec<String>)> = BTreeMap::new();
    for result in results.iter().filter(|r| r.level == Level::ZoneToBuilding) {
        let Some(building_id) = &result.building_id else {
            continue;
        };
        for zone in &result.affected_zones {
            let (scores, categories) = zones
                .entry((building_id.clone(), zone.clone()))
                .or_default();
            scores.push(result.sensitivity_score);
            if !categories.contains(&result.category) {
                categories.push(result.category.clone());
            }
        }
    }

    let mut ranked: Vec<ZoneImpact> = zones
        .into_iter()
        .map(|((building_id, zone), (scores, mut categories))| {
            categories.sort();
            ZoneImpact {
                building_id,
                zone,
                mean_sensitivity: mean(&scores),
                n_results: scores.len(),
                categories,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.mean_sensitivity.total_cmp(&a.mean_sensitivity));
    ranked.truncate(n);
    ranked
}

/// Mean score per level, highest first
pub fn level_comparison(results: &[SensitivityResult]) -> Vec<LevelComparison> {
    let mut comparison: Vec<LevelComparison> = summarize_levels(results)
        .into_iter()
        .map(|(level, summary)| LevelComparison {
            level,
            mean_sensitivity: summary.mean_sensitivity,
            n_results: summary.n_results,
        })
        .collect();
    comparison.sort_by(|a, b| b.mean_sensitivity.total_cmp(&a.mean_sensitivity));
    comparison
}

pub fn top_equipment(results: &[SensitivityResult], n: usize) -> Vec<EquipmentImpact> {
    type Key = (Option<BuildingId>, String, Option<String>);
    let mut equipment: BTreeMap<Key, Vec<f64>> = BTreeMap::new();
    for result in results.iter().filter(|r| r.level == Level::EquipmentToZone) {
        equipment
            .entry((
                result.building_id.clone(),
                result.parameter.clone(),
                result.affected_zones.first().cloned(),
            ))
            .or_default()
            .push(result.sensitivity_score);
    }

    let mut ranked: Vec<EquipmentImpact> = equipment
        .into_iter()
        .map(|((building_id, parameter, zone), scores)| EquipmentImpact {
            building_id,
            parameter,
            zone,
            mean_sensitivity: mean(&scores),
            max_sensitivity: scores.iter().copied().fold(0.0, f64::max),
            n_results: scores.len(),
        })
        .collect();
    ranked.sort_by(|a, b| b.max_sensitivity.total_cmp(&a.max_sensitivity));
    ranked.truncate(n);
    ranked
}

/// Per-zone summary of zone-to-zone results, ordered by building then zone
pub fn zone_insights(results: &[SensitivityResult]) -> Vec<ZoneInsight> {
    let mut zones: BTreeMap<(BuildingId, String), Vec<&SensitivityResult>> = BTreeMap::new();
    for result in results.iter().filter(|r| r.level == Level::ZoneToZone) {
        let (Some(building_id), Some(zone)) = (&result.building_id, &result.output_zone) else {
            continue;
        };
        zones
            .entry((building_id.clone(), zone.clone()))
            .or_default()
            .push(result);
    }

    zones
        .into_iter()
        .filter_map(|((building_id, zone), zone_results)| {
            let top = zone_results
                .iter()
                .copied()
                .reduce(|best, r| if r.sensitivity_score > best.sensitivity_score { r } else { best })?;
            let scores: Vec<f64> = zone_results.iter().map(|r| r.sensitivity_score).collect();
            Some(ZoneInsight {
                building_id,
                zone,
                n_results: zone_results.len(),
                mean_sensitivity: mean(&scores),
                top_category: top.category.clone(),
                top_output_variable: top.output_variable.clone(),
                top_sensitivity: top.sensitivity_score,
            })
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scope;

    fn result(level: Level, category: &str, score: f64, zones: &[&str]) -> SensitivityResult {
        SensitivityResult {
            level,
            source_scope: level.source_scope(),
            target_scope: level.target_scope(),
            building_id: Some(BuildingId::from("b1")),
            parameter: category.to_string(),
            category: category.to_string(),
            output_variable: "Heating".to_string(),
            output_zone: zones.first().map(|z| z.to_string()),
            sensitivity_score: score,
            correlation: 1.0,
            p_value: 0.05,
            n_samples: 1,
            mean_param_change: 10.0,
            mean_output_change: 5.0,
            elasticity: 0.5,
            confidence_level: ConfidenceLevel::Medium,
            affected_zones: zones.iter().map(|z| z.to_string()).collect(),
        }
    }

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            generated_at: Timestamp::UNIX_EPOCH,
            result_type: ResultType::Daily,
            levels: Level::ALL.to_vec(),
            output_variables: Vec::new(),
            validation_weighted: false,
            n_modifications: 0,
            n_buildings: 1,
            n_zones: 2,
            n_results: 0,
        }
    }

    #[test]
    fn test_dominant_category_uses_mean_score() {
        let results = vec![
            result(Level::ZoneToZone, "hvac", 3.0, &["Core"]),
            result(Level::ZoneToZone, "hvac", 0.1, &["Core"]),
            result(Level::ZoneToZone, "lighting", 2.0, &["Core"]),
        ];
        let summary = summarize_levels(&results);
        let zone = &summary[&Level::ZoneToZone];
        assert_eq!(zone.n_results, 3);
        assert_eq!(zone.max_sensitivity, 3.0);
        assert_eq!(zone.dominant_category.as_deref(), Some("lighting"));
        assert_eq!(zone.confidence_histogram[&ConfidenceLevel::Medium], 3);
        assert_eq!(zone.confidence_histogram[&ConfidenceLevel::High], 0);
    }

    #[test]
    fn test_most_impactful_zones_ranking() {
        let results = vec![
            result(Level::ZoneToBuilding, "hvac", 1.0, &["Core", "East"]),
            result(Level::ZoneToBuilding, "loads", 3.0, &["East"]),
            result(Level::ZoneToZone, "loads", 10.0, &["Core"]),
        ];
        let zones = most_impactful_zones(&results, 10);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].zone, "East");
        assert_eq!(zones[0].mean_sensitivity, 2.0);
        assert_eq!(zones[0].categories, vec!["hvac".to_string(), "loads".to_string()]);
        assert_eq!(zones[1].zone, "Core");
    }

    #[test]
    fn test_report_sections() {
        let results = vec![
            result(Level::ZoneToZone, "hvac", 1.0, &["Core"]),
            result(Level::ZoneToZone, "loads", 2.0, &["Core"]),
            result(Level::ZoneToZone, "loads", 0.5, &["East"]),
            result(Level::EquipmentToZone, "hvac*Coil*C1*Cap", 0.9, &["Core"]),
        ];
        let report = SensitivityReport::build(metadata(), results, 2);

        assert_eq!(report.metadata.n_results, 4);
        assert_eq!(report.detailed_results[0].sensitivity_score, 2.0);
        assert_eq!(report.top_sensitivities_by_level[&Level::ZoneToZone].len(), 2);
        assert_eq!(report.cross_level_insights.level_comparison[0].level, Level::ZoneToZone);
        assert_eq!(report.cross_level_insights.top_equipment.len(), 1);
        assert_eq!(report.results_for(Level::EquipmentToZone).count(), 1);

        let core = &report.zone_specific_insights[0];
        assert_eq!(core.zone, "Core");
        assert_eq!(core.top_category, "loads");
        assert_eq!(core.n_results, 2);
        assert_eq!(report.detailed_results[0].source_scope, Scope::Zone);
    }

    #[test]
    fn test_report_serializes_level_keys() {
        let report = SensitivityReport::build(
            metadata(),
            vec![result(Level::ZoneToBuilding, "hvac", 1.0, &["Core"])],
            5,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["summary_by_level"]["zone-to-building"].is_object());
        assert_eq!(
            json["summary_by_level"]["zone-to-building"]["confidence_histogram"]["medium"],
            1
        );
    }
}
