//! Industry enrichment: one metadata lookup per instrument.
//!
//! Lookups are independent; a failed symbol keeps the sentinel value and
//! never aborts the batch.

use crate::data::provider::{FetchProgress, MarketDataProvider};
use crate::domain::{Instrument, INDUSTRY_UNAVAILABLE};

/// Fill in the industry classification for each instrument, in input order.
/// Every instrument ends up with a value: either the provider's
/// classification or [`INDUSTRY_UNAVAILABLE`].
pub fn enrich_industries(
    instruments: &mut [Instrument],
    provider: &dyn MarketDataProvider,
    progress: Option<&dyn FetchProgress>,
) {
    let total = instruments.len();
    let mut failed = 0;

    for (i, inst) in instruments.iter_mut().enumerate() {
        if let Some(p) = progress {
            p.on_start(&inst.symbol, i, total);
        }

        match provider.industry(&inst.symbol) {
            Ok(industry) => {
                inst.industry = industry;
                if let Some(p) = progress {
                    p.on_complete(&inst.symbol, i, total, &Ok(()));
                }
            }
            Err(e) => {
                inst.industry = INDUSTRY_UNAVAILABLE.to_string();
                failed += 1;
                if let Some(p) = progress {
                    p.on_complete(&inst.symbol, i, total, &Err(e));
                }
            }
        }
    }

    if let Some(p) = progress {
        p.on_batch_complete(total - failed, failed, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::ProviderError;
    use crate::domain::PricePoint;

    struct ScriptedProvider;

    impl MarketDataProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn industry(&self, symbol: &str) -> Result<String, ProviderError> {
            match symbol {
                "VALE3.SA" => Ok("Metals & Mining".into()),
                "PETR4.SA" => Ok("Oil & Gas Integrated".into()),
                _ => Err(ProviderError::MissingField {
                    symbol: symbol.to_string(),
                    field: "industry".into(),
                }),
            }
        }

        fn intraday(
            &self,
            _symbol: &str,
            _interval: &str,
            _period: &str,
        ) -> Result<Vec<PricePoint>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn instrument(ticker: &str) -> Instrument {
        Instrument {
            symbol: format!("{ticker}.SA"),
            ticker: ticker.into(),
            segment: "CASH".into(),
            traded_qty: 100,
            industry: INDUSTRY_UNAVAILABLE.into(),
        }
    }

    #[test]
    fn every_instrument_gets_a_value_despite_failures() {
        let mut instruments = vec![
            instrument("VALE3"),
            instrument("GHOST9"),
            instrument("PETR4"),
        ];

        enrich_industries(&mut instruments, &ScriptedProvider, None);

        assert_eq!(instruments.len(), 3);
        assert_eq!(instruments[0].industry, "Metals & Mining");
        assert_eq!(instruments[1].industry, INDUSTRY_UNAVAILABLE);
        assert_eq!(instruments[2].industry, "Oil & Gas Integrated");
    }
}
