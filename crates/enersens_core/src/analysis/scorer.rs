//! Sensitivity scoring for paired parameter/output percentage changes.
//!
//! Two paths exist:
//!
//! - **Correlation path** (n ≥ `min_samples`): Pearson correlation with a
//!   two-tailed Student's t significance test.
//! - **Single-observation path**: used when a level only has one instance per
//!   group. The "correlation" is sign agreement scaled by the level's
//!   attenuation, with a fixed p-value and `Medium` confidence. Both
//!   changes must exceed [`CHANGE_GATE`] in magnitude or nothing is emitted.
//!
//! Both paths share `elasticity = mean(output) / mean(param)` (0 when the
//! denominator is 0) and `score = |correlation| * (1 + |elasticity|)`.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::model::{ConfidenceLevel, Level};

/// Minimum |mean change| (in percent) for single-observation scoring
pub const CHANGE_GATE: f64 = 0.01;

/// Default sample size needed for the correlation path
pub const DEFAULT_MIN_SAMPLES: usize = 3;

/// Statistics for one (parameter, output) pairing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityScore {
    pub correlation: f64,
    pub p_value: f64,
    pub elasticity: f64,
    pub sensitivity_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub n_samples: usize,
    pub mean_param_change: f64,
    pub mean_output_change: f64,
}

impl SensitivityScore {
    /// Scale the score by a model accuracy weight
    #[must_use]
    pub fn weighted(mut self, weight: f64) -> Self {
        self.sensitivity_score *= weight;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SensitivityScorer {
    pub min_samples: usize,
}

impl Default for SensitivityScorer {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

impl SensitivityScorer {
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples: min_samples.max(DEFAULT_MIN_SAMPLES),
        }
    }

    /// Correlation-path score. Non-finite pairs are dropped first; returns
    /// `None` when the slices differ in length or too few pairs remain.
    pub fn score(&self, param_pct_changes: &[f64], output_pct_changes: &[f64]) -> Option<SensitivityScore> {
        if param_pct_changes.len() != output_pct_changes.len() {
            return None;
        }
        let (xs, ys): (Vec<f64>, Vec<f64>) = param_pct_changes
            .iter()
            .zip(output_pct_changes)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(x, y)| (*x, *y))
            .unzip();
        if xs.len() < self.min_samples {
            return None;
        }

        let (correlation, p_value) = pearson(&xs, &ys)?;
        let mean_param_change = mean(&xs);
        let mean_output_change = mean(&ys);
        let elasticity = elasticity(mean_param_change, mean_output_change);

        Some(SensitivityScore {
            correlation,
            p_value,
            elasticity,
            sensitivity_score: correlation.abs() * (1.0 + elasticity.abs()),
            confidence_level: ConfidenceLevel::from_p_value(p_value),
            n_samples: xs.len(),
            mean_param_change,
            mean_output_change,
        })
    }

    /// Single-observation score for `level`
    pub fn score_single(
        &self,
        level: Level,
        mean_param_change: f64,
        mean_output_change: f64,
        n_samples: usize,
    ) -> Option<SensitivityScore> {
        if !mean_param_change.is_finite() || !mean_output_change.is_finite() {
            return None;
        }
        if mean_param_change.abs() <= CHANGE_GATE || mean_output_change.abs() <= CHANGE_GATE {
            return None;
        }

        let correlation =
            mean_param_change.signum() * mean_output_change.signum() * level.attenuation();
        let elasticity = elasticity(mean_param_change, mean_output_change);

        Some(SensitivityScore {
            correlation,
            p_value: level.placeholder_p_value(),
            elasticity,
            sensitivity_score: correlation.abs() * (1.0 + elasticity.abs()),
            confidence_level: ConfidenceLevel::Medium,
            n_samples: n_samples.max(1),
            mean_param_change,
            mean_output_change,
        })
    }
}

/// Ratio of mean output change to mean parameter change, 0 when undefined
pub fn elasticity(mean_param_change: f64, mean_output_change: f64) -> f64 {
    if mean_param_change == 0.0 {
        0.0
    } else {
        mean_output_change / mean_param_change
    }
}

/// Pearson correlation and two-tailed p-value.
///
/// A constant input has no defined correlation and is reported as `(0, 1)`.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len();
    if n != ys.len() || n < 3 {
        return None;
    }

    let mean_x = mean(xs);
    let mean_y = mean(ys);
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return Some((0.0, 1.0));
    }

    let r = (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);
    Some((r, two_tailed_p(r, n)))
}

fn two_tailed_p(r: f64, n: usize) -> f64 {
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= f64::EPSILON {
        return 0.0;
    }
    let t = r * (df / denom).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
