//! Data acquisition: consolidated tape, provider capability, enrichment,
//! and the intraday fetch state machine.

pub mod enrich;
pub mod intraday;
pub mod provider;
pub mod select;
pub mod tape;
pub mod yahoo;

pub use enrich::enrich_industries;
pub use intraday::{BackoffPolicy, CancelFlag, FetchReport, IntradayFetcher};
pub use provider::{FetchProgress, MarketDataProvider, ProviderError, StdoutProgress};
pub use select::{select_top, SelectionParams};
pub use tape::{
    load_consolidated, BadLinePolicy, ConsolidatedTable, HttpTapeDownloader, TapeDownloader,
    TapeEncoding, TapeError, TapeRequest,
};
pub use yahoo::YahooProvider;
