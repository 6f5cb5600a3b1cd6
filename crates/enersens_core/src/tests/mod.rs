//! Scenario tests for the sensitivity engine
//!
//! Tests are organized by topic:
//! - `fixtures` - Shared builders for logs, topology and result tables
//! - `end_to_end` - Full runs through `run_analysis`
//! - `aggregation` - Zone-to-building roll-up properties
//! - `scoring` - Scoring properties and single-observation edge cases
//! - `cancellation` - Cooperative cancellation and progress

mod end_to_end;
mod fixtures;
