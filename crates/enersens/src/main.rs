use std::path::PathBuf;

use clap::Parser;
use enersens::{Settings, init_logging, run_study};
use enersens_core::AnalysisProgress;

#[derive(Parser, Debug)]
#[command(name = "enersens")]
#[command(about = "Multi-level modification sensitivity analysis for building-energy simulations")]
struct Args {
    /// Settings file (default: ./enersens.yaml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Study directory containing modifications/ and results/
    #[arg(short, long)]
    study_dir: Option<PathBuf>,

    /// Report path (default: <study-dir>/sensitivity_report.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to the data directory holding the log file (default: ~/.enersens/)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error); overrides `logging.level`
    #[arg(short, long)]
    log_level: Option<String>,

    /// Echo warnings (skipped levels, missing results) to stderr
    #[arg(long)]
    warnings: bool,

    /// Weight scores by model validation accuracy
    #[arg(short, long)]
    weighted: bool,

    /// Entries per level in the report's top lists
    #[arg(long)]
    top_n: Option<usize>,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".enersens")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);

    let mut settings = Settings::discover(args.config.as_deref())?;
    if args.warnings {
        settings.logging.stderr_warnings = true;
    }
    let level = args
        .log_level
        .or_else(|| settings.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    init_logging(&data_dir, &level, &settings.logging)?;

    if let Some(study_dir) = args.study_dir {
        settings.study_dir = Some(study_dir);
    }
    if let Some(output) = args.output {
        settings.output = Some(output);
    }
    if args.weighted {
        settings.analysis.use_validation_weighting = true;
    }
    if let Some(top_n) = args.top_n {
        settings.analysis.top_n = top_n;
    }

    let progress = AnalysisProgress::default().with_listener(|p| {
        let snapshot = p.snapshot();
        if snapshot.current_level.is_none() {
            tracing::debug!(
                levels_completed = snapshot.levels_completed,
                levels_total = snapshot.levels_total,
                fraction = snapshot.fraction(),
                "analysis progress"
            );
        }
    });
    let run = run_study(&settings, Some(&progress))?;

    for (level, summary) in &run.report.summary_by_level {
        println!(
            "{:<22} {:>5} results  mean {:>8.3}  max {:>8.3}  dominant {}",
            level.as_str(),
            summary.n_results,
            summary.mean_sensitivity,
            summary.max_sensitivity,
            summary.dominant_category.as_deref().unwrap_or("-"),
        );
    }
    println!("report written to {}", run.output.display());

    tracing::info!("enersens finished");
    Ok(())
}
