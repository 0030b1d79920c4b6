//! Integration tests for the full pipeline against deterministic
//! collaborators: a fixture downloader standing in for the exchange and a
//! scripted provider standing in for the market-data vendor.

use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tapescan_core::data::{MarketDataProvider, ProviderError, TapeDownloader, TapeError};
use tapescan_core::domain::{PricePoint, INDUSTRY_UNAVAILABLE};
use tapescan_core::export::{read_instruments, read_price_table};
use tapescan_core::stats::compute_stats;
use tapescan_core::trend::{closing_series_by_symbol, detect_trends};
use tapescan_runner::{run_pipeline, PipelineConfig};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_dir() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("tapescan_pipeline_{}_{id}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

// Title line first: the default configuration expects the header on row 1.
const TAPE_BODY: &[u8] = b"Daily consolidation 2025-01-27\n\
TckrSymb;SgmtNm;TradQty\n\
PETR4;CASH;500\n\
VALE3;CASH;900\n\
OPT11;EQUITY OPTIONS;9999\n\
ITUB4;CASH;700\n";

struct FixtureDownloader {
    calls: AtomicUsize,
}

impl FixtureDownloader {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TapeDownloader for FixtureDownloader {
    fn download(&self, _url: &str, dest: &Path) -> Result<(), TapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        fs::write(dest, TAPE_BODY).map_err(|e| TapeError::Io(e.to_string()))
    }
}

/// Serves canned industries and daily closing runs per symbol.
struct FixtureProvider {
    industries: HashMap<String, String>,
    closes: HashMap<String, Vec<f64>>,
    failing: Vec<String>,
    intraday_attempts: Mutex<Vec<String>>,
}

impl FixtureProvider {
    fn new() -> Self {
        Self {
            industries: HashMap::new(),
            closes: HashMap::new(),
            failing: Vec::new(),
            intraday_attempts: Mutex::new(Vec::new()),
        }
    }

    fn with_industry(mut self, symbol: &str, industry: &str) -> Self {
        self.industries.insert(symbol.into(), industry.into());
        self
    }

    fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.closes.insert(symbol.into(), closes.to_vec());
        self
    }

    fn failing_intraday(mut self, symbol: &str) -> Self {
        self.failing.push(symbol.into());
        self
    }

    fn intraday_attempts_for(&self, symbol: &str) -> usize {
        self.intraday_attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == symbol)
            .count()
    }
}

impl MarketDataProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    fn industry(&self, symbol: &str) -> Result<String, ProviderError> {
        self.industries
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::MissingField {
                symbol: symbol.to_string(),
                field: "industry".into(),
            })
    }

    fn intraday(
        &self,
        symbol: &str,
        _interval: &str,
        _period: &str,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        self.intraday_attempts.lock().unwrap().push(symbol.to_string());

        if self.failing.iter().any(|s| s == symbol) {
            return Err(ProviderError::Status {
                symbol: symbol.to_string(),
                status: 429,
            });
        }

        let closes = self.closes.get(symbol).cloned().unwrap_or_default();
        Ok(closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                timestamp: NaiveDate::from_ymd_opt(2025, 1, (i + 1) as u32)
                    .unwrap()
                    .and_time(NaiveTime::MIN),
                symbol: symbol.to_string(),
                volume: 1000,
                open: close,
                high: close,
                low: close,
                close,
            })
            .collect())
    }
}

fn test_config(dir: &Path) -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.tape.cache_path = dir.join("tape.csv");
    cfg.output.dir = dir.join("out");
    cfg.fetch.backoff_secs = 0;
    cfg.selection.top_n = 3;
    cfg
}

#[test]
fn full_run_writes_tables_and_feeds_trend_detection() {
    let dir = temp_dir();
    let cfg = test_config(&dir);
    let downloader = FixtureDownloader::new();
    let provider = FixtureProvider::new()
        .with_industry("VALE3.SA", "Metals & Mining")
        .with_industry("PETR4.SA", "Oil & Gas Integrated")
        .with_closes("VALE3.SA", &[10.0, 9.0, 8.0, 7.0])
        .with_closes("ITUB4.SA", &[5.0, 5.5, 6.0, 6.5]);
    // PETR4.SA has no scripted closes: a successful empty series.

    let report = run_pipeline(&cfg, &downloader, &provider, None, None).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.price_rows, 8);
    assert_eq!(downloader.call_count(), 1);

    // Selection: options row filtered out, ranked by traded quantity.
    let instruments = read_instruments(&report.instruments_path).unwrap();
    let tickers: Vec<&str> = instruments.iter().map(|i| i.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["VALE3", "ITUB4", "PETR4"]);
    assert_eq!(instruments[0].industry, "Metals & Mining");
    // The lookup failure stays isolated to its own symbol.
    assert_eq!(instruments[1].industry, INDUSTRY_UNAVAILABLE);
    assert_eq!(instruments[2].industry, "Oil & Gas Integrated");

    // Trend detection runs off the persisted table.
    let points = read_price_table(&report.prices_path).unwrap();
    let trends = detect_trends(&closing_series_by_symbol(&points), 3);
    assert_eq!(trends.downward["VALE3.SA"], "2025-01-03");
    assert_eq!(trends.upward["ITUB4.SA"], "2025-01-03");
    assert!(!trends.downward.contains_key("ITUB4.SA"));

    // And so do the summary stats.
    let stats = compute_stats(&points).unwrap();
    assert!(stats.mean_volume > 0.0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn second_run_reuses_the_tape_cache() {
    let dir = temp_dir();
    let cfg = test_config(&dir);
    let downloader = FixtureDownloader::new();
    let provider = FixtureProvider::new();

    run_pipeline(&cfg, &downloader, &provider, None, None).unwrap();
    run_pipeline(&cfg, &downloader, &provider, None, None).unwrap();

    assert_eq!(downloader.call_count(), 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn retry_exhaustion_persists_the_partial_result() {
    let dir = temp_dir();
    let cfg = test_config(&dir);
    let downloader = FixtureDownloader::new();
    let provider = FixtureProvider::new()
        .with_closes("VALE3.SA", &[10.0, 11.0])
        .failing_intraday("ITUB4.SA")
        .with_closes("PETR4.SA", &[20.0, 21.0]);

    let report = run_pipeline(&cfg, &downloader, &provider, None, None).unwrap();

    assert!(!report.is_complete());
    assert!(report.diagnostic.contains("ITUB4.SA"));

    // Rows accumulated before the abort are on disk; nothing after.
    let points = read_price_table(&report.prices_path).unwrap();
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p.symbol == "VALE3.SA"));

    // One attempt plus one retry for the failing symbol, none afterwards.
    assert_eq!(provider.intraday_attempts_for("ITUB4.SA"), 2);
    assert_eq!(provider.intraday_attempts_for("PETR4.SA"), 0);

    // The instrument table was still written in full.
    let instruments = read_instruments(&report.instruments_path).unwrap();
    assert_eq!(instruments.len(), 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn joined_price_table_carries_the_industry_column() {
    let dir = temp_dir();
    let cfg = test_config(&dir);
    let downloader = FixtureDownloader::new();
    let provider = FixtureProvider::new()
        .with_industry("VALE3.SA", "Metals & Mining")
        .with_closes("VALE3.SA", &[10.0, 11.0]);

    run_pipeline(&cfg, &downloader, &provider, None, None).unwrap();

    let joined = fs::read_to_string(cfg.joined_prices_path()).unwrap();
    let mut lines = joined.lines();
    assert_eq!(
        lines.next().unwrap(),
        "datetime,symbol,volume,open,high,low,close,industry"
    );
    assert!(lines.next().unwrap().ends_with("Metals & Mining"));

    let _ = fs::remove_dir_all(&dir);
}
