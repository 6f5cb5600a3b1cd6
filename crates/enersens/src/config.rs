//! Settings file (`enersens.yaml`)
//!
//! ```yaml
//! study_dir: ./studies/office
//! output: ./reports/office.json
//! analysis:
//!   result_type: daily
//!   aggregation: sum
//!   output_variables: [Electricity:Facility, Heating:EnergyTransfer]
//!   categories:
//!     hvac: ["ZoneHVAC:*", "Coil:*"]
//!     lighting: ["Lights"]
//!   use_validation_weighting: true
//! logging:
//!   level: info
//!   stderr_warnings: true
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use enersens_core::AnalysisConfig;
use serde::{Deserialize, Serialize};

use crate::data::{StorageError, StudyDirectory};

pub const SETTINGS_FILE: &str = "enersens.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LogSettings,
}

/// Log filtering, see [`crate::logging`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Base level when `--log-level` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Echo warnings and errors to stderr
    #[serde(default)]
    pub stderr_warnings: bool,
    /// Level per tracing target, e.g. `enersens_core::analysis::scope: debug`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, String>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let content = fs::read_to_string(path).map_err(|source| StorageError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        serde_saphyr::from_str(&content).map_err(|e| StorageError::InvalidSettings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Explicit file if given, else `enersens.yaml` in the working directory
    /// when present, else defaults
    pub fn discover(path: Option<&Path>) -> Result<Self, StorageError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(SETTINGS_FILE).is_file() => Self::load(Path::new(SETTINGS_FILE)),
            None => Ok(Self::default()),
        }
    }

    pub fn study(&self) -> StudyDirectory {
        StudyDirectory::new(self.study_dir.clone().unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.study().default_report_path())
    }
}
