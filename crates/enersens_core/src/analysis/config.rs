//! Configuration for a multi-level sensitivity analysis run

use serde::{Deserialize, Serialize};

use crate::model::{Level, ResultType};

use super::delta::AggregationMethod;
use super::registry::CategoryRegistry;
use super::scope::ScopeRules;
use super::scorer::DEFAULT_MIN_SAMPLES;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Output variables to analyze; empty means every variable found
    #[serde(default)]
    pub output_variables: Vec<String>,
    /// How repeated rows of one variable are collapsed
    #[serde(default)]
    pub aggregation: AggregationMethod,
    /// Temporal resolution of the results to load
    #[serde(default)]
    pub result_type: ResultType,
    /// Result categories to load; empty means all of them
    #[serde(default)]
    pub result_categories: Vec<String>,
    /// Parameter categories to analyze; empty means every logged category
    #[serde(default)]
    pub categories: CategoryRegistry,
    #[serde(default)]
    pub scope_rules: ScopeRules,
    /// Levels to run, in order
    #[serde(default = "default_levels")]
    pub levels: Vec<Level>,
    /// Scale scores by `1 / (1 + cvrmse / 100)` of the building's model
    #[serde(default)]
    pub use_validation_weighting: bool,
    /// Entries per level in the report's top list
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Samples required for the correlation path
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

fn default_levels() -> Vec<Level> {
    Level::ALL.to_vec()
}

fn default_top_n() -> usize {
    10
}

fn default_min_samples() -> usize {
    DEFAULT_MIN_SAMPLES
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            output_variables: Vec::new(),
            aggregation: AggregationMethod::default(),
            result_type: ResultType::default(),
            result_categories: Vec::new(),
            categories: CategoryRegistry::default(),
            scope_rules: ScopeRules::default(),
            levels: default_levels(),
            use_validation_weighting: false,
            top_n: default_top_n(),
            min_samples: default_min_samples(),
        }
    }
}

impl AnalysisConfig {
    pub fn runs(&self, level: Level) -> bool {
        self.levels.contains(&level)
    }

    pub fn with_levels(mut self, levels: &[Level]) -> Self {
        self.levels = levels.to_vec();
        self
    }

    pub fn with_output_variables<S: AsRef<str>>(mut self, variables: &[S]) -> Self {
        self.output_variables = variables.iter().map(|v| v.as_ref().to_string()).collect();
        self
    }

    pub fn with_validation_weighting(mut self, enabled: bool) -> Self {
        self.use_validation_weighting = enabled;
        self
    }
}
