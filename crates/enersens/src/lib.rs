//! Command-line front end for the enersens sensitivity engine
//!
//! Reads a study directory (modification log, base and modified results,
//! optional topology and validation scores), runs the multi-level analysis
//! and writes the report as JSON.

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod data;
pub mod logging;
pub mod study;
pub mod util;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{LogSettings, Settings};
pub use data::StudyDirectory;
pub use logging::init_logging;
pub use study::{StudyRun, run_study};
