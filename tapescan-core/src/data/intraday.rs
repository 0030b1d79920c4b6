//! Intraday price acquisition with a fixed-cooldown retry.
//!
//! Symbols are processed strictly one at a time, in input order. The
//! per-symbol state machine is Attempt → Backoff → Retry → Abort: a failed
//! attempt is treated as suspected rate limiting (the provider gives no
//! distinguishing signal), so the fetcher sleeps for the cooldown window and
//! retries exactly once. A second failure aborts the remaining batch —
//! continuing to hammer a rate-limiting provider for the other symbols would
//! make things worse. Whatever was accumulated up to that point is returned
//! untouched, with a diagnostic naming the failing symbol.

use crate::data::provider::{FetchProgress, MarketDataProvider, ProviderError};
use crate::domain::PricePoint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Cooldown applied before the single retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub cooldown: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(120),
        }
    }
}

impl BackoffPolicy {
    pub fn from_secs(secs: u64) -> Self {
        Self {
            cooldown: Duration::from_secs(secs),
        }
    }

    /// Zero-duration cooldown, for tests.
    pub fn none() -> Self {
        Self {
            cooldown: Duration::ZERO,
        }
    }
}

/// Cooperative cancellation, checked before each symbol's first attempt.
/// An in-flight request or cooldown sleep is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of one batch fetch: the accumulated rows in per-symbol
/// contiguous blocks, plus a diagnostic that is empty on full success.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub points: Vec<PricePoint>,
    pub diagnostic: String,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.diagnostic.is_empty()
    }
}

/// Sequential multi-symbol fetcher.
pub struct IntradayFetcher<'a> {
    provider: &'a dyn MarketDataProvider,
    backoff: BackoffPolicy,
    cancel: Option<CancelFlag>,
}

impl<'a> IntradayFetcher<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider, backoff: BackoffPolicy) -> Self {
        Self {
            provider,
            backoff,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Fetch the series for each symbol in order, concatenating the results.
    ///
    /// A symbol whose successful response is empty contributes no rows and
    /// is not a failure. Retry exhaustion on one symbol stops the batch: no
    /// attempt is made for any later symbol.
    pub fn fetch(
        &self,
        symbols: &[String],
        interval: &str,
        period: &str,
        progress: Option<&dyn FetchProgress>,
    ) -> FetchReport {
        let total = symbols.len();
        let mut report = FetchReport::default();
        let mut succeeded = 0;

        for (i, symbol) in symbols.iter().enumerate() {
            if let Some(cancel) = &self.cancel {
                if cancel.is_cancelled() {
                    report.diagnostic = format!("fetch cancelled before {symbol}");
                    break;
                }
            }

            if let Some(p) = progress {
                p.on_start(symbol, i, total);
            }

            match self.fetch_one(symbol, interval, period) {
                Ok(points) => {
                    succeeded += 1;
                    if let Some(p) = progress {
                        p.on_complete(symbol, i, total, &Ok(()));
                    }
                    report.points.extend(points);
                }
                Err(e) => {
                    report.diagnostic =
                        format!("fetch aborted at {symbol}: retry after cooldown failed: {e}");
                    if let Some(p) = progress {
                        p.on_complete(symbol, i, total, &Err(e));
                    }
                    break;
                }
            }
        }

        if let Some(p) = progress {
            p.on_batch_complete(succeeded, total - succeeded, total);
        }

        report
    }

    /// One symbol's state machine: Attempt, then Backoff and a single Retry.
    fn fetch_one(
        &self,
        symbol: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        match self.provider.intraday(symbol, interval, period) {
            Ok(points) => Ok(points),
            Err(first) => {
                eprintln!(
                    "WARNING: fetch failed for {symbol} ({first}); cooling down {}s before retrying",
                    self.backoff.cooldown.as_secs()
                );
                thread::sleep(self.backoff.cooldown);
                self.provider.intraday(symbol, interval, period)
            }
        }
    }
}
