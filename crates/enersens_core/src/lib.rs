//! Multi-level modification sensitivity analysis for building-energy simulations
//!
//! This crate measures how parameter modifications applied to building models
//! (recorded in a modification log) drive changes in simulated outputs. It
//! supports:
//! - Scope resolution of modified objects (building, zone, equipment)
//! - Output deltas per building and per zone, with zone-to-building roll-up
//! - Pearson scoring across buildings with a two-tailed significance test
//! - Attenuated single-observation scoring for zone and equipment levels
//! - Optional weighting by model validation accuracy (CVRMSE)
//! - A report with per-level summaries and cross-level insights
//!
//! All I/O goes through [`source::SimulationResultsSource`]; the engine itself
//! only transforms in-memory tables.

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod error;
pub mod source;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use analysis::{AnalysisConfig, AnalysisProgress, SensitivityReport, run_analysis};
pub use error::{AnalysisError, LoadError, RegistryError, Result};
pub use source::{InMemorySource, ResultsCache, SimulationResultsSource};
