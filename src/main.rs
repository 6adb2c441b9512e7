//! CLI entry point for the Victorian crime and housing analysis.
//!
//! Provides subcommands for running the suburb pipeline, the LGA pipeline, or
//! both, writing intermediate workbooks, charts and correlation series.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use vic_crime_housing::config::PipelineConfig;
use vic_crime_housing::output::{RunSummary, write_run_summary};
use vic_crime_housing::pipeline::{local_areas_data_processing, run_all, suburb_data_processing};

#[derive(Parser)]
#[command(name = "vic_crime_housing")]
#[command(about = "Relates crime and house prices across Victoria", long_about = None)]
struct Cli {
    /// JSON config file; built-in defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the source datasets and intermediate workbooks
    #[arg(short, long, global = true)]
    datasets_dir: Option<PathBuf>,

    /// Directory charts are written under
    #[arg(short, long, global = true)]
    plots_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// Wrangle and correlate only, without drawing charts
    #[arg(long, default_value_t = false)]
    skip_plots: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the suburb pipeline followed by the LGA pipeline
    Run(RunArgs),
    /// Suburb incidents, prices and crime rates
    Suburbs(RunArgs),
    /// LGA crime, property sales and their join
    Lgas(RunArgs),
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/vic_crime_housing.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("vic_crime_housing.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let result = match &cli.command {
        Commands::Run(args) => run_all(&config, args.skip_plots),
        Commands::Suburbs(args) => suburb_data_processing(&config, args.skip_plots),
        Commands::Lgas(args) => local_areas_data_processing(&config, args.skip_plots),
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = ?e, "Pipeline failed");
            return Err(e);
        }
    };

    report(&config, &summary)
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.datasets_dir {
        config.datasets_dir = dir.clone();
    }
    if let Some(dir) = &cli.plots_dir {
        config.plots_dir = dir.clone();
    }

    info!(
        datasets = %config.datasets_dir.display(),
        plots = %config.plots_dir.display(),
        suburb_years = ?config.suburb_years,
        lga_years = ?config.lga_years,
        "Configuration loaded"
    );
    Ok(config)
}

fn report(config: &PipelineConfig, summary: &RunSummary) -> Result<()> {
    for series in &summary.correlations {
        for year in &series.years {
            info!(
                x = %series.x,
                y = %series.y,
                year = year.year,
                coefficient = ?year.coefficient,
                strength = year.strength.as_deref().unwrap_or("undefined"),
                "Correlation"
            );
        }
    }

    write_run_summary(&config.dataset("run_summary.json"), summary)
}
