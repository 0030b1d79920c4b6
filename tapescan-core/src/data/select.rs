//! Instrument selection: segment filter and liquidity ranking.

use crate::data::tape::{ConsolidatedTable, TapeError};
use crate::domain::{Instrument, INDUSTRY_UNAVAILABLE};
use std::cmp::Reverse;

/// How candidates are filtered and ranked out of the consolidation table.
#[derive(Debug, Clone)]
pub struct SelectionParams {
    pub symbol_column: String,
    pub segment_column: String,
    pub rank_column: String,
    /// Case-sensitive substring a row's segment field must contain.
    pub segment_marker: String,
    pub top_n: usize,
    /// Appended to each ticker to form the provider-facing symbol.
    pub market_suffix: String,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            symbol_column: "TckrSymb".into(),
            segment_column: "SgmtNm".into(),
            rank_column: "TradQty".into(),
            segment_marker: "CASH".into(),
            top_n: 15,
            market_suffix: ".SA".into(),
        }
    }
}

/// Filter the table to the configured segment and take the `top_n` rows by
/// traded quantity, descending. The sort is stable, so ties keep original
/// row order. Rows with an empty segment field are excluded, not matched.
pub fn select_top(
    table: &ConsolidatedTable,
    params: &SelectionParams,
) -> Result<Vec<Instrument>, TapeError> {
    let sym_idx = table.column_index(&params.symbol_column)?;
    let seg_idx = table.column_index(&params.segment_column)?;
    let qty_idx = table.column_index(&params.rank_column)?;

    let mut selected: Vec<Instrument> = table
        .rows
        .iter()
        .filter_map(|row| {
            let segment = row.get(seg_idx)?;
            if segment.is_empty() || !segment.contains(&params.segment_marker) {
                return None;
            }
            let ticker = row.get(sym_idx)?.clone();
            if ticker.is_empty() {
                return None;
            }
            // Unparsable quantities rank last rather than failing the load.
            let traded_qty = row
                .get(qty_idx)
                .and_then(|q| q.trim().parse::<u64>().ok())
                .unwrap_or(0);

            Some(Instrument {
                symbol: format!("{ticker}{}", params.market_suffix),
                ticker,
                segment: segment.clone(),
                traded_qty,
                industry: INDUSTRY_UNAVAILABLE.to_string(),
            })
        })
        .collect();

    selected.sort_by_key(|inst| Reverse(inst.traded_qty));
    selected.truncate(params.top_n);
    Ok(selected)
}
