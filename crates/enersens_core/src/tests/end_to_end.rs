//! Full runs through `run_analysis`
//!
//! These tests verify that:
//! - Perfectly linear building-level changes score with full correlation
//! - Zone, zone-to-building and equipment levels all emit results from one log
//! - Validation weighting scales scores by model accuracy

use crate::analysis::{AnalysisConfig, TopologyRegistry, run_analysis};
use crate::model::{
    BuildingId, ConfidenceLevel, Level, RawModificationRow, ResultRow, ResultType, Scope,
    SimulationResults, ValidationScores,
};
use crate::source::{InMemorySource, ResultsCache};

use super::fixtures::{ELECTRICITY, HEATING, cache, office_topology, results, row};

fn five_building_study() -> (Vec<RawModificationRow>, SimulationResults) {
    let mut rows = Vec::new();
    let mut base = Vec::new();
    let mut modified = Vec::new();
    for (i, pct) in [10.0, 20.0, 30.0, 40.0, 50.0].into_iter().enumerate() {
        let building = format!("b{}", i + 1);
        rows.push(row(
            &building,
            "hvac",
            "ZoneHVAC:IdealLoadsAirSystem",
            "ALL_ZONES",
            100.0,
            100.0 + pct,
        ));
        base.push(ResultRow::building(building.as_str(), ELECTRICITY, 1000.0));
        modified.push(ResultRow::building(
            building.as_str(),
            ELECTRICITY,
            1000.0 * (1.0 + 1.5 * pct / 100.0),
        ));
    }
    (rows, results("energy", base, modified))
}

#[test]
fn test_five_building_linear_hvac_scenario() {
    let (rows, results) = five_building_study();
    let mut cache = cache(results);

    let report = run_analysis(
        &AnalysisConfig::default(),
        &rows,
        TopologyRegistry::default(),
        &mut cache,
        None,
    )
    .unwrap();

    let result = report
        .results_for(Level::BuildingToBuilding)
        .find(|r| r.category == "hvac" && r.output_variable == ELECTRICITY)
        .unwrap();

    assert!((result.correlation - 1.0).abs() < 1e-9);
    assert!((result.elasticity - 1.5).abs() < 1e-9);
    assert!((result.sensitivity_score - 2.5).abs() < 1e-9);
    assert!(result.p_value < 0.01);
    assert_eq!(result.confidence_level, ConfidenceLevel::High);
    assert_eq!(result.n_samples, 5);
    assert_eq!(result.building_id, None);
    assert_eq!(result.source_scope, Scope::Building);

    assert_eq!(report.metadata.n_buildings, 5);
    assert_eq!(report.metadata.n_modifications, 5);
    assert_eq!(report.metadata.output_variables, vec![ELECTRICITY.to_string()]);
    assert_eq!(
        report.summary_by_level[&Level::BuildingToBuilding]
            .dominant_category
            .as_deref(),
        Some("hvac")
    );
}

#[test]
fn test_zone_and_equipment_levels() {
    let rows = vec![
        row("b1", "loads", "People", "Core_ZN People", 10.0, 12.0),
        row("b1", "loads", "People", "East_ZN People", 10.0, 11.0),
        row("b1", "hvac", "AirTerminal:SingleDuct:VAV:Reheat", "East VAV Box", 0.5, 0.4),
    ];
    let base = vec![
        ResultRow::zone("b1", "Core_ZN", HEATING, 100.0),
        ResultRow::zone("b1", "East_ZN", HEATING, 50.0),
    ];
    let modified = vec![
        ResultRow::zone("b1", "Core_ZN", HEATING, 90.0),
        ResultRow::zone("b1", "East_ZN", HEATING, 60.0),
    ];
    let mut cache = cache(results("zones", base, modified));

    let report = run_analysis(
        &AnalysisConfig::default(),
        &rows,
        office_topology("b1"),
        &mut cache,
        None,
    )
    .unwrap();

    let zone_to_zone: Vec<_> = report.results_for(Level::ZoneToZone).collect();
    assert_eq!(zone_to_zone.len(), 2);
    let core = zone_to_zone
        .iter()
        .find(|r| r.output_zone.as_deref() == Some("Core_ZN"))
        .unwrap();
    assert_eq!(core.correlation, -1.0);
    assert!((core.mean_param_change - 20.0).abs() < 1e-9);

    // No building rows, so the building change is the mean zone change: (-10 + 20) / 2
    let zone_to_building: Vec<_> = report.results_for(Level::ZoneToBuilding).collect();
    assert_eq!(zone_to_building.len(), 1);
    assert!((zone_to_building[0].mean_param_change - 15.0).abs() < 1e-9);
    assert_eq!(zone_to_building[0].correlation, 0.7);
    assert_eq!(
        zone_to_building[0].affected_zones,
        vec!["Core_ZN".to_string(), "East_ZN".to_string()]
    );

    let equipment: Vec<_> = report.results_for(Level::EquipmentToZone).collect();
    assert_eq!(equipment.len(), 1);
    assert_eq!(equipment[0].output_zone.as_deref(), Some("East_ZN"));
    assert_eq!(equipment[0].correlation, -0.8);
    assert_eq!(equipment[0].confidence_level, ConfidenceLevel::Medium);

    assert!(report.results_for(Level::BuildingToBuilding).next().is_none());
    assert_eq!(report.metadata.n_zones, 2);
    assert_eq!(report.cross_level_insights.most_impactful_zones.len(), 2);
    assert_eq!(report.zone_specific_insights.len(), 2);
}

#[test]
fn test_validation_weighting() {
    let (rows, results) = five_building_study();
    let validation = ValidationScores {
        modified: (1..=5)
            .map(|i| (BuildingId::new(format!("b{i}")), 25.0))
            .collect(),
        ..Default::default()
    };
    let mut cache = ResultsCache::new(
        InMemorySource::new(ResultType::Daily, results).with_validation(validation),
    );

    let config = AnalysisConfig::default()
        .with_levels(&[Level::BuildingToBuilding])
        .with_validation_weighting(true);
    let report = run_analysis(&config, &rows, TopologyRegistry::default(), &mut cache, None).unwrap();

    assert!(report.metadata.validation_weighted);
    let result = &report.detailed_results[0];
    assert!((result.sensitivity_score - 2.5 * 0.8).abs() < 1e-9);
}

#[test]
fn test_output_variable_filter_and_cache_reuse() {
    let (rows, results) = five_building_study();
    let mut cache = cache(results);
    let config = AnalysisConfig::default().with_output_variables(&["Gas"]);

    let report = run_analysis(&config, &rows, TopologyRegistry::default(), &mut cache, None).unwrap();
    assert!(report.detailed_results.is_empty());
    assert_eq!(report.metadata.output_variables, vec!["Gas".to_string()]);

    run_analysis(
        &AnalysisConfig::default(),
        &rows,
        TopologyRegistry::default(),
        &mut cache,
        None,
    )
    .unwrap();
    assert_eq!(cache.len(), 1);
}
