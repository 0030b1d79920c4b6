//! CSV table persistence — the data interface to the presentation layer.
//!
//! Two tables are produced: the instrument table (semicolon-delimited) and
//! the intraday price table (comma-delimited), plus a variant of the price
//! table with the industry classification joined in by symbol. Readers are
//! exact inverses of the writers so trend detection can run off persisted
//! storage.

use crate::domain::{Instrument, PricePoint, INDUSTRY_UNAVAILABLE};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed table: {0}")]
    Malformed(String),
}

const INSTRUMENT_HEADER: [&str; 5] = ["symbol", "ticker", "segment", "traded_qty", "industry"];
const PRICE_HEADER: [&str; 7] = ["datetime", "symbol", "volume", "open", "high", "low", "close"];

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write the instrument table, semicolon-delimited.
pub fn write_instruments(path: &Path, instruments: &[Instrument]) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_path(path)?;
    wtr.write_record(INSTRUMENT_HEADER)?;
    for inst in instruments {
        wtr.write_record([
            &inst.symbol,
            &inst.ticker,
            &inst.segment,
            &inst.traded_qty.to_string(),
            &inst.industry,
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read the instrument table back, field for field.
pub fn read_instruments(path: &Path) -> Result<Vec<Instrument>, ExportError> {
    let mut rdr = csv::ReaderBuilder::new().delimiter(b';').from_path(path)?;
    expect_header(rdr.headers()?, &INSTRUMENT_HEADER)?;

    let mut instruments = Vec::new();
    for record in rdr.records() {
        let record = record?;
        instruments.push(Instrument {
            symbol: field(&record, 0)?.to_string(),
            ticker: field(&record, 1)?.to_string(),
            segment: field(&record, 2)?.to_string(),
            traded_qty: field(&record, 3)?
                .parse()
                .map_err(|e| ExportError::Malformed(format!("traded_qty: {e}")))?,
            industry: field(&record, 4)?.to_string(),
        });
    }
    Ok(instruments)
}

/// Write the price table, comma-delimited, in the canonical column order.
pub fn write_price_table(path: &Path, points: &[PricePoint]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(PRICE_HEADER)?;
    for p in points {
        wtr.write_record(price_record(p))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the price table with an `industry` column joined in by symbol.
/// Symbols absent from the instrument list get the sentinel value.
pub fn write_price_table_with_industry(
    path: &Path,
    points: &[PricePoint],
    instruments: &[Instrument],
) -> Result<(), ExportError> {
    let industries: HashMap<&str, &str> = instruments
        .iter()
        .map(|i| (i.symbol.as_str(), i.industry.as_str()))
        .collect();

    let mut wtr = csv::Writer::from_path(path)?;
    let mut header: Vec<&str> = PRICE_HEADER.to_vec();
    header.push("industry");
    wtr.write_record(&header)?;

    for p in points {
        let mut record = price_record(p);
        record.push(
            industries
                .get(p.symbol.as_str())
                .copied()
                .unwrap_or(INDUSTRY_UNAVAILABLE)
                .to_string(),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read the price table back. Rows keep file order, which preserves the
/// per-symbol contiguous blocks the fetcher wrote.
pub fn read_price_table(path: &Path) -> Result<Vec<PricePoint>, ExportError> {
    let mut rdr = csv::Reader::from_path(path)?;
    expect_header(rdr.headers()?, &PRICE_HEADER)?;

    let mut points = Vec::new();
    for record in rdr.records() {
        let record = record?;
        points.push(PricePoint {
            timestamp: parse_datetime(field(&record, 0)?)?,
            symbol: field(&record, 1)?.to_string(),
            volume: parse_num(field(&record, 2)?, "volume")?,
            open: parse_num(field(&record, 3)?, "open")?,
            high: parse_num(field(&record, 4)?, "high")?,
            low: parse_num(field(&record, 5)?, "low")?,
            close: parse_num(field(&record, 6)?, "close")?,
        });
    }
    Ok(points)
}

fn price_record(p: &PricePoint) -> Vec<String> {
    vec![
        p.timestamp.format(DATETIME_FORMAT).to_string(),
        p.symbol.clone(),
        p.volume.to_string(),
        format!("{:.6}", p.open),
        format!("{:.6}", p.high),
        format!("{:.6}", p.low),
        format!("{:.6}", p.close),
    ]
}

fn expect_header(actual: &csv::StringRecord, expected: &[&str]) -> Result<(), ExportError> {
    if actual.iter().ne(expected.iter().copied()) {
        return Err(ExportError::Malformed(format!(
            "unexpected header: {actual:?}"
        )));
    }
    Ok(())
}

fn field<'r>(record: &'r csv::StringRecord, index: usize) -> Result<&'r str, ExportError> {
    record
        .get(index)
        .ok_or_else(|| ExportError::Malformed(format!("missing field {index}")))
}

/// Accepts both full datetimes and bare dates (daily granularity).
fn parse_datetime(text: &str) -> Result<NaiveDateTime, ExportError> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, DATETIME_FORMAT) {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|e| ExportError::Malformed(format!("datetime '{text}': {e}")))
}

fn parse_num<T: std::str::FromStr>(text: &str, name: &str) -> Result<T, ExportError>
where
    T::Err: std::fmt::Display,
{
    text.parse()
        .map_err(|e| ExportError::Malformed(format!("{name} '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("tapescan_export_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_instruments() -> Vec<Instrument> {
        vec![
            Instrument {
                symbol: "VALE3.SA".into(),
                ticker: "VALE3".into(),
                segment: "CASH".into(),
                traded_qty: 900,
                industry: "Metals & Mining".into(),
            },
            Instrument {
                symbol: "PETR4.SA".into(),
                ticker: "PETR4".into(),
                segment: "CASH".into(),
                traded_qty: 500,
                industry: INDUSTRY_UNAVAILABLE.into(),
            },
        ]
    }

    fn sample_points() -> Vec<PricePoint> {
        let ts = |h: u32, m: u32| {
            NaiveDate::from_ymd_opt(2025, 1, 27)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        };
        vec![
            PricePoint {
                timestamp: ts(10, 0),
                symbol: "VALE3.SA".into(),
                volume: 1200,
                open: 61.25,
                high: 61.5,
                low: 61.0,
                close: 61.4,
            },
            PricePoint {
                timestamp: ts(10, 15),
                symbol: "VALE3.SA".into(),
                volume: 800,
                open: 61.4,
                high: 61.6,
                low: 61.3,
                close: 61.55,
            },
            PricePoint {
                timestamp: ts(10, 0),
                symbol: "PETR4.SA".into(),
                volume: 2000,
                open: 38.1,
                high: 38.2,
                low: 37.9,
                close: 38.0,
            },
        ]
    }

    #[test]
    fn instrument_table_round_trips_field_for_field() {
        let dir = temp_dir();
        let path = dir.join("instruments.csv");
        let instruments = sample_instruments();

        write_instruments(&path, &instruments).unwrap();
        let reloaded = read_instruments(&path).unwrap();

        assert_eq!(reloaded, instruments);

        // The file really is semicolon-delimited.
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("symbol;ticker;segment;traded_qty;industry"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn price_table_round_trips() {
        let dir = temp_dir();
        let path = dir.join("intraday.csv");
        let points = sample_points();

        write_price_table(&path, &points).unwrap();
        let reloaded = read_price_table(&path).unwrap();

        assert_eq!(reloaded, points);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("datetime,symbol,volume,open,high,low,close"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn industry_join_matches_by_symbol() {
        let dir = temp_dir();
        let path = dir.join("intraday_industry.csv");
        let mut points = sample_points();
        points.push(PricePoint {
            symbol: "GHOST9.SA".into(),
            ..points[0].clone()
        });

        write_price_table_with_industry(&path, &points, &sample_instruments()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(
            lines[0],
            "datetime,symbol,volume,open,high,low,close,industry"
        );
        assert!(lines[1].ends_with("Metals & Mining"));
        // The unknown symbol falls back to the sentinel.
        assert!(lines[4].ends_with(INDUSTRY_UNAVAILABLE));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn bare_dates_parse_at_midnight() {
        let parsed = parse_datetime("2025-01-27").unwrap();
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2025, 1, 27)
                .unwrap()
                .and_time(NaiveTime::MIN)
        );
    }

    #[test]
    fn foreign_header_is_rejected() {
        let dir = temp_dir();
        let path = dir.join("other.csv");
        fs::write(&path, "a,b,c\n1,2,3\n").unwrap();

        let err = read_price_table(&path).unwrap_err();
        assert!(matches!(err, ExportError::Malformed(_)));

        let _ = fs::remove_dir_all(&dir);
    }
}
