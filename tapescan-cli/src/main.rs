//! Tapescan CLI — refresh the data set and report on it.
//!
//! Commands:
//! - `refresh` — load the consolidation tape (cached), select the most
//!   traded instruments, enrich with industry data, fetch intraday history,
//!   and write the CSV tables
//! - `trends` — detect trend initiations from the persisted price table
//! - `stats` — pooled summary statistics over the persisted price table

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tapescan_core::data::{HttpTapeDownloader, StdoutProgress, YahooProvider};
use tapescan_core::export::read_price_table;
use tapescan_core::stats::compute_stats;
use tapescan_core::trend::{closing_series_by_symbol, detect_trends, DEFAULT_TREND_WINDOW};
use tapescan_runner::{run_pipeline, PipelineConfig};

#[derive(Parser)]
#[command(
    name = "tapescan",
    about = "Tapescan — most-traded instruments, intraday history, trend initiations"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used if it does not exist.
    #[arg(long, default_value = "tapescan.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the instrument and price tables from the tape and provider.
    Refresh {
        /// Discard the cached consolidation file and download it again.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Bar interval (e.g. 15m, 1h, 1d). Overrides the config file.
        #[arg(long)]
        interval: Option<String>,

        /// Trailing period (e.g. 1d, 5d, 1y). Overrides the config file.
        #[arg(long)]
        period: Option<String>,

        /// Number of instruments to select. Overrides the config file.
        #[arg(long)]
        top: Option<usize>,
    },
    /// Report the first sustained runs in the persisted price table.
    Trends {
        /// Run length that counts as a sustained trend.
        #[arg(long, default_value_t = DEFAULT_TREND_WINDOW)]
        window: usize,
    },
    /// Pooled summary statistics over the persisted price table.
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Refresh {
            force,
            interval,
            period,
            top,
        } => run_refresh(config, force, interval, period, top),
        Commands::Trends { window } => run_trends(&config, window),
        Commands::Stats => run_stats(&config),
    }
}

fn run_refresh(
    mut config: PipelineConfig,
    force: bool,
    interval: Option<String>,
    period: Option<String>,
    top: Option<usize>,
) -> Result<()> {
    if let Some(interval) = interval {
        config.fetch.interval = interval;
    }
    if let Some(period) = period {
        config.fetch.period = period;
    }
    if let Some(top) = top {
        config.selection.top_n = top;
    }

    if force && config.tape.cache_path.exists() {
        fs::remove_file(&config.tape.cache_path).with_context(|| {
            format!(
                "removing cached tape {}",
                config.tape.cache_path.display()
            )
        })?;
    }

    let downloader = HttpTapeDownloader::new();
    let provider = YahooProvider::new();

    let report = run_pipeline(&config, &downloader, &provider, Some(&StdoutProgress), None)?;

    println!(
        "\nSelected {} instruments -> {}",
        report.instruments.len(),
        report.instruments_path.display()
    );
    println!(
        "Fetched {} price rows -> {}",
        report.price_rows,
        report.prices_path.display()
    );
    if !report.is_complete() {
        println!("Partial result: {}", report.diagnostic);
    }

    Ok(())
}

fn run_trends(config: &PipelineConfig, window: usize) -> Result<()> {
    let prices_path = config.prices_path();
    let points = read_price_table(&prices_path).with_context(|| {
        format!(
            "reading price table {} (run `tapescan refresh` first)",
            prices_path.display()
        )
    })?;

    let report = detect_trends(&closing_series_by_symbol(&points), window);

    println!("First downward initiations:");
    if report.downward.is_empty() {
        println!("  (none detected)");
    }
    for (symbol, at) in &report.downward {
        println!("  {symbol}  {at}");
    }

    println!("\nFirst upward initiations:");
    if report.upward.is_empty() {
        println!("  (none detected)");
    }
    for (symbol, at) in &report.upward {
        println!("  {symbol}  {at}");
    }

    Ok(())
}

fn run_stats(config: &PipelineConfig) -> Result<()> {
    let prices_path = config.prices_path();
    let points = read_price_table(&prices_path).with_context(|| {
        format!(
            "reading price table {} (run `tapescan refresh` first)",
            prices_path.display()
        )
    })?;

    match compute_stats(&points) {
        Some(stats) => {
            println!("Mean daily variation: {:.2}%", stats.mean_change_pct);
            println!("Variation std dev:    {:.2}%", stats.change_std_dev_pct);
            println!("Mean volume:          {:.0}", stats.mean_volume);
        }
        None => println!("Price table is empty — nothing to summarize."),
    }

    Ok(())
}
