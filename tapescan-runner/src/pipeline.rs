//! End-to-end pipeline: tape → selection → enrichment → intraday → tables.
//!
//! Stages run strictly in sequence. Per-symbol failures never discard what
//! was already accumulated: the tables on disk always reflect the
//! best-effort result, and the report's diagnostic says what was cut short.

use crate::config::PipelineConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tapescan_core::data::{
    enrich_industries, load_consolidated, select_top, CancelFlag, FetchProgress, IntradayFetcher,
    MarketDataProvider, TapeDownloader,
};
use tapescan_core::domain::Instrument;
use tapescan_core::export::{write_instruments, write_price_table, write_price_table_with_industry};

/// What one pipeline run produced.
#[derive(Debug)]
pub struct PipelineReport {
    pub instruments: Vec<Instrument>,
    pub price_rows: usize,
    /// Empty on full success; otherwise names the symbol that cut the
    /// intraday fetch short.
    pub diagnostic: String,
    pub instruments_path: PathBuf,
    pub prices_path: PathBuf,
}

impl PipelineReport {
    pub fn is_complete(&self) -> bool {
        self.diagnostic.is_empty()
    }
}

/// Run the whole pipeline against the given collaborators.
pub fn run_pipeline(
    config: &PipelineConfig,
    downloader: &dyn TapeDownloader,
    provider: &dyn MarketDataProvider,
    progress: Option<&dyn FetchProgress>,
    cancel: Option<CancelFlag>,
) -> Result<PipelineReport> {
    let table = load_consolidated(&config.tape_request(), &config.tape.cache_path, downloader)
        .context("loading the consolidation tape")?;

    let mut instruments =
        select_top(&table, &config.selection_params()).context("selecting instruments")?;

    enrich_industries(&mut instruments, provider, progress);

    fs::create_dir_all(&config.output.dir).with_context(|| {
        format!("creating output directory {}", config.output.dir.display())
    })?;

    let instruments_path = config.instruments_path();
    write_instruments(&instruments_path, &instruments)
        .context("writing the instrument table")?;

    let symbols: Vec<String> = instruments.iter().map(|i| i.symbol.clone()).collect();
    let mut fetcher = IntradayFetcher::new(provider, config.backoff());
    if let Some(cancel) = cancel {
        fetcher = fetcher.with_cancel(cancel);
    }
    let fetch = fetcher.fetch(&symbols, &config.fetch.interval, &config.fetch.period, progress);

    let prices_path = config.prices_path();
    write_price_table(&prices_path, &fetch.points).context("writing the price table")?;
    write_price_table_with_industry(&config.joined_prices_path(), &fetch.points, &instruments)
        .context("writing the industry-joined price table")?;

    Ok(PipelineReport {
        price_rows: fetch.points.len(),
        diagnostic: fetch.diagnostic,
        instruments,
        instruments_path,
        prices_path,
    })
}
