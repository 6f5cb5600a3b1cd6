//! End-to-end analysis run: records, deltas, levels, report

use jiff::Timestamp;
use rustc_hash::FxHashSet;

use crate::error::Result;
use crate::model::RawModificationRow;
use crate::source::{ResultsCache, SimulationResultsSource};

use super::aggregator::{AggregationInputs, MultiLevelAggregator};
use super::config::AnalysisConfig;
use super::delta::{DeltaCalculator, ZoneWeights};
use super::insights::{ReportMetadata, SensitivityReport};
use super::progress::{AnalysisProgress, check_cancelled};
use super::registry::ModificationRegistry;
use super::scope::{ScopeResolver, TopologyRegistry};
use super::scorer::SensitivityScorer;

/// Run every configured level over `rows` and build the report.
///
/// Validation scores and simulation results are read through `cache`, so
/// repeated runs over the same study load each result set once. Missing
/// inputs for a level skip that level; only cancellation, invalid scope
/// rules and load failures are errors.
pub fn run_analysis<S: SimulationResultsSource>(
    config: &AnalysisConfig,
    rows: &[RawModificationRow],
    topology: TopologyRegistry,
    cache: &mut ResultsCache<S>,
    progress: Option<&AnalysisProgress>,
) -> Result<SensitivityReport> {
    tracing::info!(
        rows = rows.len(),
        buildings = topology.len(),
        levels = config.levels.len(),
        "starting sensitivity analysis"
    );

    let resolver = ScopeResolver::new(&config.scope_rules, topology)?;
    let modifications = ModificationRegistry::new(&resolver, &config.categories).load(rows);
    check_cancelled(progress)?;

    let validation = if config.use_validation_weighting {
        let scores = cache.source().load_validation_scores()?;
        if scores.is_none() {
            tracing::warn!("validation weighting requested but no validation scores found");
        }
        scores
    } else {
        None
    };

    let results = cache.get_or_load(config.result_type, &config.result_categories)?;
    if results.is_empty() {
        tracing::warn!(result_type = %config.result_type, "no simulation results loaded");
    }

    let calculator = DeltaCalculator::new(config.aggregation);
    let zone_deltas =
        calculator.zone_deltas(&results.base, &results.modified, &config.output_variables);
    let mut building_deltas =
        calculator.building_deltas(&results.base, &results.modified, &config.output_variables);
    if !zone_deltas.is_empty() {
        let weights = ZoneWeights::from_topology(resolver.topology());
        let filled = DeltaCalculator::fill_missing_buildings(
            &mut building_deltas,
            &zone_deltas,
            (!weights.is_empty()).then_some(&weights),
        );
        if !filled.is_empty() {
            tracing::info!(
                buildings = filled.len(),
                "aggregated zone deltas for buildings without building-level rows"
            );
        }
    }
    check_cancelled(progress)?;

    if let Some(p) = progress {
        p.reset(config.levels.len());
    }

    let mut aggregator =
        MultiLevelAggregator::new(SensitivityScorer::new(config.min_samples), &config.levels);
    let weighted = validation.is_some();
    if let Some(scores) = validation {
        aggregator = aggregator.with_validation(scores);
    }

    let inputs = AggregationInputs {
        records: &modifications.records,
        building_deltas: &building_deltas,
        zone_deltas: &zone_deltas,
    };
    let sensitivity = aggregator.run(&inputs, progress)?;

    let output_variables = if config.output_variables.is_empty() {
        let mut variables = building_deltas.output_variables();
        variables.extend(zone_deltas.output_variables());
        variables.sort_unstable();
        variables.dedup();
        variables
    } else {
        config.output_variables.clone()
    };

    let zones: FxHashSet<(&str, &str)> = modifications
        .records
        .iter()
        .flat_map(|r| r.affected_zones.iter().map(|z| (r.building_id.as_str(), z.as_str())))
        .collect();

    let metadata = ReportMetadata {
        generated_at: Timestamp::now(),
        result_type: config.result_type,
        levels: config.levels.clone(),
        output_variables,
        validation_weighted: weighted,
        n_modifications: modifications.records.len(),
        n_buildings: modifications.summary.buildings,
        n_zones: zones.len(),
        n_results: sensitivity.len(),
    };

    tracing::info!(
        results = sensitivity.len(),
        modifications = metadata.n_modifications,
        "sensitivity analysis complete"
    );
    Ok(SensitivityReport::build(metadata, sensitivity, config.top_n))
}
