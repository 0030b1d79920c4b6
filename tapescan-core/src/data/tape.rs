//! Consolidated-tape acquisition: download, disk cache, CSV parsing.
//!
//! The daily consolidation file is downloaded once and kept on disk; later
//! loads parse the cached copy without touching the network. A cache that
//! fails to parse is overwritten by a fresh download. Both the download and
//! the parse are terminal on failure — there is no retry loop here.

use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes copied from the response body to disk per read. The body is never
/// held in memory whole.
const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Errors from the tape-loading layer.
#[derive(Debug, Error)]
pub enum TapeError {
    #[error("download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("consolidation file parse failed: {0}")]
    Parse(String),

    #[error("column '{name}' not found in consolidation header")]
    MissingColumn { name: String },

    #[error("cache I/O error: {0}")]
    Io(String),
}

/// Text encoding of the consolidation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapeEncoding {
    Latin1,
    Utf8,
}

/// What to do with rows whose field count differs from the header's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadLinePolicy {
    Skip,
    Fail,
}

/// Parameters for one consolidation-file load.
#[derive(Debug, Clone)]
pub struct TapeRequest {
    pub url: String,
    pub delimiter: u8,
    pub encoding: TapeEncoding,
    /// Zero-based index of the header row; rows before it are discarded.
    pub header_row: usize,
    pub bad_lines: BadLinePolicy,
}

/// The consolidation file in memory: ordered header plus data rows, all
/// exchange fields passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ConsolidatedTable {
    /// Index of a named column.
    pub fn column_index(&self, name: &str) -> Result<usize, TapeError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TapeError::MissingColumn { name: name.to_string() })
    }
}

/// Capability to bring the remote file onto disk. Abstracted so tests can
/// serve fixtures and count network calls.
pub trait TapeDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<(), TapeError>;
}

/// reqwest-backed downloader. Streams the response body to the destination
/// in fixed-size chunks through a temp file renamed into place.
pub struct HttpTapeDownloader {
    client: reqwest::blocking::Client,
}

impl HttpTapeDownloader {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpTapeDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl TapeDownloader for HttpTapeDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<(), TapeError> {
        let mut resp = self.client.get(url).send().map_err(|e| TapeError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TapeError::Download {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let tmp = dest.with_extension("download.tmp");
        let file = fs::File::create(&tmp).map_err(|e| TapeError::Io(format!("create {}: {e}", tmp.display())))?;
        let mut writer = BufWriter::new(file);

        let mut buf = [0u8; DOWNLOAD_CHUNK_SIZE];
        loop {
            let n = resp.read(&mut buf).map_err(|e| TapeError::Download {
                url: url.to_string(),
                reason: format!("body read: {e}"),
            })?;
            if n == 0 {
                break;
            }
            writer
                .write_all(&buf[..n])
                .map_err(|e| TapeError::Io(format!("write {}: {e}", tmp.display())))?;
        }
        writer
            .flush()
            .map_err(|e| TapeError::Io(format!("flush {}: {e}", tmp.display())))?;

        fs::rename(&tmp, dest).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            TapeError::Io(format!("atomic rename failed: {e}"))
        })
    }
}

/// Load the consolidation table, preferring the on-disk cache.
///
/// A readable cache short-circuits the network entirely. A missing or
/// unparseable cache triggers exactly one download, which overwrites the
/// cache before being parsed with the same parameters.
pub fn load_consolidated(
    req: &TapeRequest,
    cache_path: &Path,
    downloader: &dyn TapeDownloader,
) -> Result<ConsolidatedTable, TapeError> {
    if cache_path.exists() {
        match parse_tape_file(cache_path, req) {
            Ok(table) => return Ok(table),
            Err(e) => {
                eprintln!(
                    "WARNING: cached tape at {} unreadable ({e}); downloading a fresh copy",
                    cache_path.display()
                );
            }
        }
    }

    downloader.download(&req.url, cache_path)?;
    parse_tape_file(cache_path, req)
}

fn parse_tape_file(path: &Path, req: &TapeRequest) -> Result<ConsolidatedTable, TapeError> {
    let raw = fs::read(path).map_err(|e| TapeError::Io(format!("read {}: {e}", path.display())))?;
    let text = decode(&raw, req.encoding)?;
    parse_tape(&text, req)
}

/// Latin-1 maps each byte to the same Unicode scalar value, so decoding is
/// a direct byte-to-char widening.
fn decode(raw: &[u8], encoding: TapeEncoding) -> Result<String, TapeError> {
    match encoding {
        TapeEncoding::Latin1 => Ok(raw.iter().map(|&b| b as char).collect()),
        TapeEncoding::Utf8 => std::str::from_utf8(raw)
            .map(str::to_string)
            .map_err(|e| TapeError::Parse(format!("invalid UTF-8: {e}"))),
    }
}

/// Tokenize the tape text into a table.
pub fn parse_tape(text: &str, req: &TapeRequest) -> Result<ConsolidatedTable, TapeError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(req.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut headers: Vec<String> = Vec::new();
    let mut have_header = false;
    let mut rows: Vec<Vec<String>> = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| TapeError::Parse(format!("row {}: {e}", i + 1)))?;

        if !have_header {
            if i == req.header_row {
                headers = record.iter().map(str::to_string).collect();
                have_header = true;
            }
            continue;
        }

        if record.len() != headers.len() {
            match req.bad_lines {
                BadLinePolicy::Skip => continue,
                BadLinePolicy::Fail => {
                    return Err(TapeError::Parse(format!(
                        "row {}: expected {} fields, found {}",
                        i + 1,
                        headers.len(),
                        record.len()
                    )))
                }
            }
        }

        rows.push(record.iter().map(str::to_string).collect());
    }

    if !have_header {
        return Err(TapeError::Parse(format!(
            "no header row at index {}",
            req.header_row
        )));
    }

    // A single-column header means the delimiter never matched: the file is
    // not a consolidation tape (truncated download, HTML error page, ...).
    if headers.len() < 2 {
        return Err(TapeError::Parse(format!(
            "delimiter {:?} not found in header row",
            req.delimiter as char
        )));
    }

    Ok(ConsolidatedTable { headers, rows })
}
