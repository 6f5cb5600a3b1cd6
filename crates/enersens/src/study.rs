//! Run an analysis over a study directory and write the report

use std::path::PathBuf;

use enersens_core::model::Level;
use enersens_core::{AnalysisProgress, ResultsCache, SensitivityReport, run_analysis};

use crate::config::Settings;
use crate::data::StudyDirectory;

/// Outcome of [`run_study`]
#[derive(Debug)]
pub struct StudyRun {
    pub report: SensitivityReport,
    pub output: PathBuf,
}

pub fn run_study(settings: &Settings, progress: Option<&AnalysisProgress>) -> color_eyre::Result<StudyRun> {
    let study = settings.study();
    tracing::info!(study = %study.root().display(), "loading study");

    let rows = study.load_modifications()?;
    let topology = study.load_topology()?;
    let mut cache = ResultsCache::new(study);

    let report = run_analysis(&settings.analysis, &rows, topology, &mut cache, progress)?;

    for level in Level::ALL {
        match report.summary_by_level.get(&level) {
            Some(summary) => tracing::info!(
                level = %level,
                results = summary.n_results,
                mean = summary.mean_sensitivity,
                max = summary.max_sensitivity,
                dominant = summary.dominant_category.as_deref().unwrap_or("-"),
                "level summary"
            ),
            None if settings.analysis.runs(level) => {
                tracing::info!(level = %level, "level produced no results")
            }
            None => {}
        }
    }

    let output = settings.output_path();
    StudyDirectory::write_report(&output, &report)?;
    tracing::info!(path = %output.display(), "report written");

    Ok(StudyRun { report, output })
}
