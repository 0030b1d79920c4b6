//! Domain types shared across the pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Sentinel industry classification recorded when a lookup fails or the
/// provider carries no classification for the symbol.
pub const INDUSTRY_UNAVAILABLE: &str = "unavailable";

/// A selected instrument: one of the most actively traded symbols of the
/// consolidation file, augmented for external lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Provider-facing symbol: the exchange ticker with the market suffix
    /// appended. All external lookups use this form.
    pub symbol: String,
    /// Raw exchange ticker as it appears in the consolidation file.
    pub ticker: String,
    /// Exchange segment the row was selected from.
    pub segment: String,
    /// Traded quantity the ranking was based on.
    pub traded_qty: u64,
    /// Industry classification, or [`INDUSTRY_UNAVAILABLE`].
    pub industry: String,
}

/// One OHLCV observation for one instrument.
///
/// Within one fetch batch at most one point exists per (symbol, timestamp),
/// and a symbol's points are ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub volume: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Aligned (timestamp, close) pairs for one symbol, ascending by time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClosingSeries {
    pub timestamps: Vec<NaiveDateTime>,
    pub closes: Vec<f64>,
}

impl ClosingSeries {
    pub fn push(&mut self, timestamp: NaiveDateTime, close: f64) {
        self.timestamps.push(timestamp);
        self.closes.push(close);
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}
