//! Multi-level modification sensitivity analysis.
//!
//! A run goes through five stages:
//!
//! 1. [`ScopeResolver`] classifies each modified object as building-, zone- or
//!    equipment-scoped against static building topology.
//! 2. [`ModificationRegistry`] turns raw log rows into typed
//!    [`ModificationRecord`](crate::model::ModificationRecord)s with parameter
//!    changes and scope attached.
//! 3. [`DeltaCalculator`] collapses base and modified result tables into
//!    per-building and per-zone output deltas.
//! 4. [`MultiLevelAggregator`] joins records and deltas for each
//!    [`Level`](crate::model::Level) and scores them with [`SensitivityScorer`].
//! 5. [`SensitivityReport`] summarizes the combined results.
//!
//! [`run_analysis`] drives all five:
//!
//! ```ignore
//! use enersens_core::analysis::{AnalysisConfig, run_analysis};
//! use enersens_core::source::{InMemorySource, ResultsCache};
//!
//! let mut cache = ResultsCache::new(InMemorySource::new(result_type, results));
//! let report = run_analysis(&AnalysisConfig::default(), &rows, topology, &mut cache, None)?;
//!
//! for summary in report.summary_by_level.values() {
//!     println!("{} results, max {:.2}", summary.n_results, summary.max_sensitivity);
//! }
//! ```

mod aggregator;
mod config;
mod delta;
mod engine;
mod insights;
mod pattern;
mod progress;
mod registry;
mod scope;
mod scorer;

pub use aggregator::{AggregationInputs, MultiLevelAggregator};
pub use config::AnalysisConfig;
pub use delta::{AggregationMethod, DeltaCalculator, ZoneWeights, is_temperature_variable};
pub use engine::run_analysis;
pub use insights::{
    CrossLevelInsights, EquipmentImpact, LevelComparison, LevelSummary, ReportMetadata,
    SensitivityReport, ZoneImpact, ZoneInsight, level_comparison, most_impactful_zones,
    summarize_levels, top_by_level, top_equipment, zone_insights,
};
pub use pattern::ObjectPattern;
pub use progress::{AnalysisProgress, ProgressListener, ProgressSnapshot, check_cancelled};
pub use registry::{
    CategoryRegistry, LoadSummary, MODIFICATION_LOG_PREFIX, ModificationRegistry,
    ModificationSet, UNCATEGORIZED, find_latest_modification_log, read_modification_log,
};
pub use scope::{
    BuildingTopology, ScopeMapping, ScopeMappingCache, ScopeResolver, ScopeRules,
    TopologyRegistry,
};
pub use scorer::{
    CHANGE_GATE, DEFAULT_MIN_SAMPLES, SensitivityScore, SensitivityScorer, elasticity, pearson,
};
