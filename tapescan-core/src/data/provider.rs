//! Market-data provider capability and structured error types.
//!
//! The provider is a black box with two operations: industry classification
//! for a symbol, and an OHLCV series for a symbol at an interval/period.
//! Abstracting it behind a trait lets tests substitute a deterministic
//! fixture for the live network dependency.

use crate::domain::PricePoint;
use thiserror::Error;

/// Per-symbol errors from the external provider.
///
/// The fetch layer treats every variant the same way — a first-attempt
/// failure is handled as suspected rate limiting, since the provider gives
/// no distinguishing signal.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("provider returned HTTP {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("response format changed: {0}")]
    FormatChanged(String),

    #[error("field '{field}' missing for {symbol}")]
    MissingField { symbol: String, field: String },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },
}

/// Trait for market-data providers.
///
/// Implementations handle the specifics of one concrete source. They do not
/// retry internally — the retry/backoff policy belongs to the fetch layer,
/// which applies it exactly once per symbol.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Industry classification for a symbol.
    fn industry(&self, symbol: &str) -> Result<String, ProviderError>;

    /// OHLCV series for a symbol at the given interval over the given
    /// period. An empty series is a valid outcome, not an error.
    fn intraday(
        &self,
        symbol: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<PricePoint>, ProviderError>;
}

/// Progress callback for multi-symbol operations.
pub trait FetchProgress: Send {
    /// Called when starting to process a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol completes.
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<(), ProviderError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<(), ProviderError>,
    ) {
        match result {
            Ok(()) => println!("  OK: {symbol}"),
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nFetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
