//! Sensitivity results produced by a multi-level analysis

use serde::{Deserialize, Serialize};

use super::{BuildingId, ConfidenceLevel, Level, Scope};

/// How strongly one parameter group drives one output at one level.
///
/// Built by the scorer and the aggregator; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub level: Level,
    pub source_scope: Scope,
    pub target_scope: Scope,
    /// Building the result belongs to; `None` for cross-building results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_id: Option<BuildingId>,
    pub parameter: String,
    pub category: String,
    pub output_variable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_zone: Option<String>,
    pub sensitivity_score: f64,
    pub correlation: f64,
    pub p_value: f64,
    pub n_samples: usize,
    pub mean_param_change: f64,
    pub mean_output_change: f64,
    pub elasticity: f64,
    pub confidence_level: ConfidenceLevel,
    #[serde(default)]
    pub affected_zones: Vec<String>,
}

/// Sort by `sensitivity_score`, highest first. Ties keep their order.
pub fn sort_by_score(results: &mut [SensitivityResult]) {
    results.sort_by(|a, b| b.sensitivity_score.total_cmp(&a.sensitivity_score));
}
