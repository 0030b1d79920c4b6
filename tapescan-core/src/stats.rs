//! Pooled summary statistics over a price table.
//!
//! Feeds the stat cards of the presentation layer: mean close-to-close
//! variation, its dispersion, and mean traded volume.

use crate::domain::PricePoint;

#[derive(Debug, Clone, PartialEq)]
pub struct MarketStats {
    /// Mean close-to-close change, percent, pooled across symbols.
    pub mean_change_pct: f64,
    /// Population standard deviation of the close-to-close changes.
    pub change_std_dev_pct: f64,
    /// Mean volume per observation.
    pub mean_volume: f64,
}

/// Compute stats over a concatenated price table (per-symbol contiguous
/// blocks). Changes are only taken between consecutive points of the same
/// symbol; a zero previous close contributes no change. Returns `None` for
/// an empty table.
pub fn compute_stats(points: &[PricePoint]) -> Option<MarketStats> {
    if points.is_empty() {
        return None;
    }

    let mut changes: Vec<f64> = Vec::new();
    for pair in points.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.symbol != next.symbol || prev.close == 0.0 {
            continue;
        }
        changes.push((next.close - prev.close) / prev.close * 100.0);
    }

    let mean_change_pct = mean(&changes);
    let variance = changes
        .iter()
        .map(|c| (c - mean_change_pct).powi(2))
        .sum::<f64>()
        / changes.len().max(1) as f64;

    let total_volume: u64 = points.iter().map(|p| p.volume).sum();

    Some(MarketStats {
        mean_change_pct,
        change_std_dev_pct: variance.sqrt(),
        mean_volume: total_volume as f64 / points.len() as f64,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
