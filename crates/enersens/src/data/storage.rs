//! Study directory storage
//!
//! Directory structure:
//! <study>/
//!   modifications/
//!     modifications_detail_20250101_120000.json   # newest file wins
//!   results/
//!     base_daily.json        # category -> rows
//!     modified_daily.json
//!   topology.json            # building -> zones/equipment/volumes (optional)
//!   validation.json          # baseline/modified CVRMSE per building (optional)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use enersens_core::analysis::{TopologyRegistry, find_latest_modification_log, read_modification_log};
use enersens_core::error::LoadError;
use enersens_core::model::{RawModificationRow, ResultTable, ResultType, SimulationResults, ValidationScores};
use enersens_core::source::SimulationResultsSource;
use enersens_core::SensitivityReport;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::util::io::atomic_write;

/// Failures reading settings or writing a report. Study inputs fail with
/// the engine's [`LoadError`] instead.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read settings {path}: {source}")]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings in {path}: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("failed to serialize report for {path}: {source}")]
    SerializeReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write report {path}: {source}")]
    WriteReport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// File the failure refers to
    pub fn path(&self) -> &Path {
        match self {
            Self::ReadSettings { path, .. }
            | Self::InvalidSettings { path, .. }
            | Self::SerializeReport { path, .. }
            | Self::WriteReport { path, .. } => path,
        }
    }
}

type CategoryTables = FxHashMap<String, ResultTable>;

/// A study laid out on disk, readable as a [`SimulationResultsSource`]
#[derive(Debug, Clone)]
pub struct StudyDirectory {
    root: PathBuf,
}

impl StudyDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modifications_dir(&self) -> PathBuf {
        self.root.join("modifications")
    }

    fn results_path(&self, side: &str, result_type: ResultType) -> PathBuf {
        self.root
            .join("results")
            .join(format!("{side}_{}.json", result_type.as_str()))
    }

    fn topology_path(&self) -> PathBuf {
        self.root.join("topology.json")
    }

    fn validation_path(&self) -> PathBuf {
        self.root.join("validation.json")
    }

    /// Default report location inside the study
    pub fn default_report_path(&self) -> PathBuf {
        self.root.join("sensitivity_report.json")
    }

    /// Rows of the newest modification log
    pub fn load_modifications(&self) -> Result<Vec<RawModificationRow>, LoadError> {
        let path = find_latest_modification_log(&self.modifications_dir())?;
        tracing::info!(path = %path.display(), "reading modification log");
        read_modification_log(&path)
    }

    /// Building topology; an absent file means no zone or equipment mapping
    pub fn load_topology(&self) -> Result<TopologyRegistry, LoadError> {
        let path = self.topology_path();
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "no topology file, every modification resolves to building scope"
            );
            return Ok(TopologyRegistry::default());
        }
        read_json(&path)
    }

    fn load_tables(
        &self,
        side: &str,
        result_type: ResultType,
        categories: &[String],
    ) -> Result<CategoryTables, LoadError> {
        let path = self.results_path(side, result_type);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "results file not found");
            return Ok(CategoryTables::default());
        }

        let mut tables: CategoryTables = read_json(&path)?;
        if !categories.is_empty() {
            for category in categories {
                if !tables.contains_key(category) {
                    tracing::warn!(side, category = %category, "result category not found");
                }
            }
            tables.retain(|name, _| categories.contains(name));
        }
        Ok(tables)
    }

    /// Write the report as pretty JSON, atomically
    pub fn write_report(path: &Path, report: &SensitivityReport) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(report).map_err(|source| {
            StorageError::SerializeReport {
                path: path.to_path_buf(),
                source,
            }
        })?;
        atomic_write(path, &json).map_err(|source| StorageError::WriteReport {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl SimulationResultsSource for StudyDirectory {
    fn load_simulation_results(
        &self,
        result_type: ResultType,
        categories: &[String],
    ) -> Result<SimulationResults, LoadError> {
        Ok(SimulationResults {
            base: self.load_tables("base", result_type, categories)?,
            modified: self.load_tables("modified", result_type, categories)?,
        })
    }

    fn load_validation_scores(&self) -> Result<Option<ValidationScores>, LoadError> {
        let path = self.validation_path();
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
