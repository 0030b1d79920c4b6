//! Trend-initiation detection over closing-price series.
//!
//! A trend initiation is the earliest point at which `window` consecutive
//! closes form a strictly monotonic run. Upward and downward runs are
//! detected in two independent passes, so a symbol that falls and then
//! rebounds can appear in both mappings. Strict inequality is required at
//! every step: a flat pair breaks a run in both directions.

use crate::domain::{ClosingSeries, PricePoint};
use chrono::{NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;

/// Run length that counts as a sustained trend.
pub const DEFAULT_TREND_WINDOW: usize = 3;

/// Trend initiations per direction: symbol → formatted timestamp of the
/// first sustained run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendReport {
    pub downward: BTreeMap<String, String>,
    pub upward: BTreeMap<String, String>,
}

impl TrendReport {
    pub fn is_empty(&self) -> bool {
        self.downward.is_empty() && self.upward.is_empty()
    }
}

/// Detect trend initiations for every symbol independently.
///
/// Symbols with fewer than `window` observations contribute no entry to
/// either mapping. Windows shorter than two cannot describe a move and
/// detect nothing.
pub fn detect_trends(
    series_by_symbol: &BTreeMap<String, ClosingSeries>,
    window: usize,
) -> TrendReport {
    let mut report = TrendReport::default();
    if window < 2 {
        return report;
    }

    for (symbol, series) in series_by_symbol {
        if series.len() < window {
            continue;
        }
        if let Some(ts) = first_run(series, window, |a, b| a > b) {
            report.downward.insert(symbol.clone(), format_trend_timestamp(ts));
        }
        if let Some(ts) = first_run(series, window, |a, b| a < b) {
            report.upward.insert(symbol.clone(), format_trend_timestamp(ts));
        }
    }

    report
}

/// Timestamp of the first index whose trailing `window` closes are strictly
/// monotonic under `step`.
fn first_run(
    series: &ClosingSeries,
    window: usize,
    step: impl Fn(f64, f64) -> bool,
) -> Option<NaiveDateTime> {
    let closes = &series.closes;
    for i in (window - 1)..closes.len() {
        let start = i + 1 - window;
        if (start..i).all(|j| step(closes[j], closes[j + 1])) {
            return series.timestamps.get(i).copied();
        }
    }
    None
}

/// Daily-granularity timestamps (midnight) render as a bare date.
pub fn format_trend_timestamp(ts: NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Group a concatenated price table into per-symbol closing series,
/// preserving each symbol's row order (ascending by time within a block).
pub fn closing_series_by_symbol(points: &[PricePoint]) -> BTreeMap<String, ClosingSeries> {
    let mut map: BTreeMap<String, ClosingSeries> = BTreeMap::new();
    for point in points {
        map.entry(point.symbol.clone())
            .or_default()
            .push(point.timestamp, point.close);
    }
    map
}
