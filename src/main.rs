//! # Tracking error and chart for one result file
//! backtest-analyzer analyze output/test_1_output.json --chart test_1.svg
//!
//! # Check an output folder for the expected fields
//! backtest-analyzer check output/
//!
//! # Tracking error for every result file in a folder
//! backtest-analyzer summary output/ [--json]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use backtest_analyzer::metrics::tracking_error_line;
use backtest_analyzer::ResultAnalyzer;

#[derive(Parser)]
#[command(name = "backtest-analyzer")]
#[command(about = "Tracking error analysis for hedging backtest results")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the tracking error of a result file and optionally chart it
    Analyze {
        /// Path to the JSON result file
        file: PathBuf,

        /// Write the value/price comparison chart to this SVG file
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Print the full deviation summary
        #[arg(short, long)]
        summary: bool,
    },

    /// Check that every file in an output folder has the expected fields
    Check {
        /// Output folder to check
        folder: PathBuf,
    },

    /// Compute the tracking error of every JSON file in a folder
    Summary {
        /// Folder containing result files
        folder: PathBuf,

        /// Print one JSON array instead of text lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("backtest_analyzer=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let analyzer = ResultAnalyzer::from_config_file(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Analyze {
            file,
            chart,
            summary,
        } => cmd_analyze(&analyzer, file, chart, summary),
        Commands::Check { folder } => cmd_check(&analyzer, folder),
        Commands::Summary { folder, json } => cmd_summary(&analyzer, folder, json),
    }
}

fn cmd_analyze(
    analyzer: &ResultAnalyzer,
    file: PathBuf,
    chart_path: Option<PathBuf>,
    summary: bool,
) -> Result<()> {
    let series = analyzer
        .load(&file)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    if summary {
        let report = backtest_analyzer::TrackingSummary::from_series(&series)
            .context("Failed to compute tracking summary")?;
        println!("{}", report.summary());
    } else {
        let te = backtest_analyzer::tracking_error(&series)
            .context("Failed to compute tracking error")?;
        println!("{}", tracking_error_line(te));
    }

    if let Some(path) = chart_path {
        analyzer
            .chart(&series)
            .save_svg(&path)
            .with_context(|| format!("Failed to write chart to {}", path.display()))?;
        println!("Chart written to {}", path.display());
    }

    Ok(())
}

fn cmd_check(analyzer: &ResultAnalyzer, folder: PathBuf) -> Result<()> {
    println!("Checking output structure");
    let report = analyzer
        .check_folder(&folder)
        .with_context(|| format!("Failed to check {}", folder.display()))?;

    for file in &report.files {
        for line in file.report_lines() {
            println!("{}", line);
        }
    }
    println!();
    println!("{}", report.summary());

    Ok(())
}

fn cmd_summary(analyzer: &ResultAnalyzer, folder: PathBuf, json: bool) -> Result<()> {
    let batch = analyzer
        .summarize_folder(&folder)
        .with_context(|| format!("Failed to summarise {}", folder.display()))?;

    if json {
        let entries: Vec<_> = batch.iter().map(|e| e.to_json()).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if batch.is_empty() {
        println!("No result files in {}", folder.display());
    }
    for entry in &batch {
        println!("{}", entry.line());
    }

    Ok(())
}
