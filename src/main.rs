use levelscope::analyzer::AnalysisReport;
use levelscope::config::{load_config, AppConfig};
use levelscope::pipeline::Pipeline;
use levelscope::source::{build_source, fetch_all, LevelSource};
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());

    // Load configuration from file
    let config: AppConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing_subscriber::fmt::init();
            error!("Config load error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging once; every stage logs through this subscriber.
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    info!("Starting level analysis pipeline");

    let pipeline = match Pipeline::from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut sources: Vec<Box<dyn LevelSource>> = Vec::new();
    for source_cfg in &config.sources {
        match build_source(source_cfg) {
            Ok(source) => sources.push(source),
            Err(e) => warn!("Skipping source {}: {}", source_cfg.name, e),
        }
    }

    info!("Fetching levels from {} sources...", sources.len());
    let raw_levels = match fetch_all(&sources).await {
        Ok(levels) => levels,
        Err(e) => {
            error!("Ingestion aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Collected {} raw level records", raw_levels.len());

    if let Err(e) = tokio::task::block_in_place(|| pipeline.archive_raw(&raw_levels)) {
        error!("Failed to archive raw data: {}", e);
        return ExitCode::FAILURE;
    }

    // Persistence is the only blocking I/O in the run.
    let output = match tokio::task::block_in_place(|| pipeline.run(&raw_levels)) {
        Ok(output) => output,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Snapshot written: {}", output.snapshot.name);
    match pipeline.index().list() {
        Ok(history) => info!("Snapshot index holds {} snapshots", history.len()),
        Err(e) => warn!("Failed to read snapshot index: {}", e),
    }
    log_summary(&output.report);

    match serde_json::to_string_pretty(&output.report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Failed to render report: {}", e);
            return ExitCode::FAILURE;
        }
    }

    info!("Pipeline finished");
    ExitCode::SUCCESS
}

fn log_summary(report: &AnalysisReport) {
    let perf = &report.performance_metrics;
    info!("Total levels analyzed: {}", perf.total_levels);
    info!("Average clear rate: {}", fmt_metric(perf.average_clear_rate, "%"));
    info!("Average engagement score: {}", fmt_metric(perf.average_engagement_score, ""));
    for (difficulty, count) in &report.difficulty_distribution.difficulty_distribution {
        info!("{}: {} levels", difficulty, count);
    }
}

fn fmt_metric(value: Option<f64>, unit: &str) -> String {
    value
        .map(|v| format!("{v:.2}{unit}"))
        .unwrap_or_else(|| "undefined".to_string())
}
