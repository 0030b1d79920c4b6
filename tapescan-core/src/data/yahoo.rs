//! Yahoo Finance market-data provider.
//!
//! Implements the provider capability against Yahoo's v8 chart API (OHLCV
//! series at an interval over a trailing range) and v10 quoteSummary API
//! (industry classification from the asset profile). Yahoo Finance has no
//! official API and is subject to unannounced format changes.
//!
//! The provider performs a single request per call: retry and backoff are
//! the fetch layer's responsibility.

use crate::data::provider::{MarketDataProvider, ProviderError};
use crate::domain::PricePoint;
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance v10 quoteSummary API response.
#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryModules>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryModules {
    #[serde(rename = "assetProfile")]
    asset_profile: Option<AssetProfile>,
}

#[derive(Debug, Deserialize)]
struct AssetProfile {
    industry: Option<String>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Chart API URL for a symbol, interval, and trailing range.
    fn chart_url(symbol: &str, interval: &str, period: &str) -> String {
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?interval={interval}&range={period}&includePrePost=false"
        )
    }

    /// quoteSummary API URL for a symbol's asset profile.
    fn quote_summary_url(symbol: &str) -> String {
        format!(
            "https://query2.finance.yahoo.com/v10/finance/quoteSummary/{symbol}\
             ?modules=assetProfile"
        )
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        symbol: &str,
        url: &str,
    ) -> Result<T, ProviderError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json().map_err(|e| {
            ProviderError::FormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })
    }

    /// Parse the chart API response into price points.
    ///
    /// An empty series (no timestamps, or every bar null) is a valid
    /// outcome and parses to an empty vector.
    fn parse_chart(
        symbol: &str,
        interval: &str,
        resp: ChartResponse,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                ProviderError::FormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => ProviderError::FormatChanged("empty result with no error".into()),
        })?;

        let data = match result.into_iter().next() {
            Some(data) => data,
            None => return Ok(Vec::new()),
        };

        let timestamps = match data.timestamp {
            Some(ts) => ts,
            None => return Ok(Vec::new()),
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::FormatChanged("no quote data".into()))?;

        let daily = is_daily_or_coarser(interval);
        let mut points = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let datetime = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| {
                    ProviderError::FormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Null bars are holidays / halted sessions.
            let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close)
            else {
                continue;
            };

            // Daily bars carry the session-open epoch; present them at date
            // granularity like the rest of the pipeline expects.
            let timestamp = if daily {
                datetime.date().and_time(chrono::NaiveTime::MIN)
            } else {
                datetime
            };

            points.push(PricePoint {
                timestamp,
                symbol: symbol.to_string(),
                volume: volume.unwrap_or(0),
                open,
                high,
                low,
                close,
            });
        }

        Ok(points)
    }

    fn parse_industry(
        symbol: &str,
        resp: QuoteSummaryResponse,
    ) -> Result<String, ProviderError> {
        let result = resp
            .quote_summary
            .result
            .ok_or_else(|| match resp.quote_summary.error {
                Some(err) if err.code == "Not Found" => ProviderError::SymbolNotFound {
                    symbol: symbol.to_string(),
                },
                Some(err) => {
                    ProviderError::FormatChanged(format!("{}: {}", err.code, err.description))
                }
                None => ProviderError::FormatChanged("empty result with no error".into()),
            })?;

        result
            .into_iter()
            .next()
            .and_then(|m| m.asset_profile)
            .and_then(|p| p.industry)
            .ok_or_else(|| ProviderError::MissingField {
                symbol: symbol.to_string(),
                field: "industry".into(),
            })
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn industry(&self, symbol: &str) -> Result<String, ProviderError> {
        let resp = self.get_json(symbol, &Self::quote_summary_url(symbol))?;
        Self::parse_industry(symbol, resp)
    }

    fn intraday(
        &self,
        symbol: &str,
        interval: &str,
        period: &str,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        let resp = self.get_json(symbol, &Self::chart_url(symbol, interval, period))?;
        Self::parse_chart(symbol, interval, resp)
    }
}

/// Intervals at or above one day produce date-granularity timestamps.
fn is_daily_or_coarser(interval: &str) -> bool {
    matches!(interval, "1d" | "5d" | "1wk" | "1mo" | "3mo")
}
