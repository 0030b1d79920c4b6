//! Pipeline configuration, loadable from a TOML file.
//!
//! Every field has a default, so a missing file (or a file that only
//! overrides a couple of values) yields a usable configuration. The
//! defaults describe the B3 daily consolidation snapshot the project
//! started from.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tapescan_core::data::{
    BackoffPolicy, BadLinePolicy, SelectionParams, TapeEncoding, TapeRequest,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub tape: TapeSection,
    pub selection: SelectionSection,
    pub fetch: FetchSection,
    pub output: OutputSection,
}

/// Where the consolidation file comes from and how it is parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TapeSection {
    pub url: String,
    /// Field delimiter; must be a single ASCII character.
    pub delimiter: char,
    pub encoding: TapeEncoding,
    /// Zero-based index of the header row; rows before it are discarded.
    pub header_row: usize,
    pub bad_lines: BadLinePolicy,
    pub cache_path: PathBuf,
}

impl Default for TapeSection {
    fn default() -> Self {
        Self {
            url: "https://github.com/robsonglima/StockMarket_B3/blob/5c7977ff8b2f087ce8232a937cc39855d4adbed9/TradeInformationConsolidatedFile_20250127_1.csv?raw=true".into(),
            delimiter: ';',
            encoding: TapeEncoding::Latin1,
            header_row: 1,
            bad_lines: BadLinePolicy::Skip,
            cache_path: PathBuf::from("data/consolidated.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSection {
    pub symbol_column: String,
    pub segment_column: String,
    pub rank_column: String,
    pub segment_marker: String,
    pub top_n: usize,
    pub market_suffix: String,
}

impl Default for SelectionSection {
    fn default() -> Self {
        let params = SelectionParams::default();
        Self {
            symbol_column: params.symbol_column,
            segment_column: params.segment_column,
            rank_column: params.rank_column,
            segment_marker: params.segment_marker,
            top_n: params.top_n,
            market_suffix: params.market_suffix,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub interval: String,
    pub period: String,
    /// Cooldown before the single retry, in seconds.
    pub backoff_secs: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            interval: "1d".into(),
            period: "1y".into(),
            backoff_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
    pub instruments_file: String,
    pub prices_file: String,
    pub prices_with_industry_file: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            instruments_file: "instruments.csv".into(),
            prices_file: "intraday.csv".into(),
            prices_with_industry_file: "intraday_industry.csv".into(),
        }
    }
}

impl PipelineConfig {
    /// Load a config file, failing on unreadable or invalid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Load a config file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn tape_request(&self) -> TapeRequest {
        TapeRequest {
            url: self.tape.url.clone(),
            delimiter: self.tape.delimiter as u8,
            encoding: self.tape.encoding,
            header_row: self.tape.header_row,
            bad_lines: self.tape.bad_lines,
        }
    }

    pub fn selection_params(&self) -> SelectionParams {
        SelectionParams {
            symbol_column: self.selection.symbol_column.clone(),
            segment_column: self.selection.segment_column.clone(),
            rank_column: self.selection.rank_column.clone(),
            segment_marker: self.selection.segment_marker.clone(),
            top_n: self.selection.top_n,
            market_suffix: self.selection.market_suffix.clone(),
        }
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::from_secs(self.fetch.backoff_secs)
    }

    pub fn instruments_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.instruments_file)
    }

    pub fn prices_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.prices_file)
    }

    pub fn joined_prices_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.prices_with_industry_file)
    }
}
