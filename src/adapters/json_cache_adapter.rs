//! JSON file cache adapter.
//!
//! One file per instrument at `<dir>/<prefix>.<code>.json`, holding an
//! array of daily records. Numeric fields arrive as JSON numbers or
//! strings; values that fail to coerce become NaN rather than load errors.
//! An unparseable file or date is an error for that instrument only.

use crate::domain::bar::DailyBar;
use crate::domain::error::RpscreenError;
use crate::domain::series::InstrumentSeries;
use crate::ports::cache_port::CachePort;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_PREFIXES: [&str; 2] = ["sh", "sz"];

pub struct JsonCacheAdapter {
    cache_dir: PathBuf,
    prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CacheRecord {
    date: String,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    open: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    high: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    low: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    close: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    volume: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    amount: f64,
}

fn nan() -> f64 {
    f64::NAN
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

/// Dates are ISO-8601, sometimes with a time suffix ("2024-01-15T00:00:00.000").
fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl JsonCacheAdapter {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self::with_prefixes(
            cache_dir,
            DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        )
    }

    pub fn with_prefixes(cache_dir: PathBuf, prefixes: Vec<String>) -> Self {
        Self {
            cache_dir,
            prefixes,
        }
    }

    fn cache_path(&self, prefix: &str, code: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}.json", prefix, code))
    }

    fn parse_series(
        &self,
        path: &PathBuf,
        code: &str,
        exchange: &str,
    ) -> Result<InstrumentSeries, RpscreenError> {
        let content = fs::read_to_string(path).map_err(|e| RpscreenError::CacheRead {
            code: code.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;

        let records: Vec<CacheRecord> =
            serde_json::from_str(&content).map_err(|e| RpscreenError::CacheParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut bars = Vec::with_capacity(records.len());
        for record in records {
            let date =
                parse_record_date(&record.date).ok_or_else(|| RpscreenError::CacheParse {
                    file: path.display().to_string(),
                    reason: format!("invalid date {:?}", record.date),
                })?;
            bars.push(DailyBar {
                date,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
                amount: record.amount,
            });
        }

        Ok(InstrumentSeries::new(
            code.to_string(),
            exchange.to_string(),
            bars,
        ))
    }
}

impl CachePort for JsonCacheAdapter {
    fn load_series(&self, code: &str) -> Result<InstrumentSeries, RpscreenError> {
        for prefix in &self.prefixes {
            let path = self.cache_path(prefix, code);
            if path.exists() {
                return self.parse_series(&path, code, prefix);
            }
        }
        Err(RpscreenError::CodeNotFound {
            code: code.to_string(),
        })
    }

    fn list_codes(&self) -> Result<Vec<String>, RpscreenError> {
        let entries = fs::read_dir(&self.cache_dir).map_err(|e| RpscreenError::CacheDir {
            dir: self.cache_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut codes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RpscreenError::CacheDir {
                dir: self.cache_dir.display().to_string(),
                reason: e.to_string(),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            // "<prefix>.<code>.json"
            let mut parts = name_str.split('.');
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(prefix), Some(code), Some("json"), None)
                    if self.prefixes.iter().any(|p| p == prefix) =>
                {
                    codes.push(code.to_string());
                }
                _ => {}
            }
        }

        if codes.is_empty() {
            return Err(RpscreenError::CacheEmpty {
                dir: self.cache_dir.display().to_string(),
            });
        }

        codes.sort();
        codes.dedup();
        Ok(codes)
    }

    fn data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RpscreenError> {
        let series = self.load_series(code)?;
        Ok(series
            .date_range()
            .map(|(first, last)| (first, last, series.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_cache() -> (TempDir, JsonCacheAdapter) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("sh.600000.json"),
            r#"[
                {"date":"2024-01-16T00:00:00.000","code":"sh.600000","open":"10.1","high":"10.4","low":"10.0","close":"10.3","volume":"120000","amount":"1230000"},
                {"date":"2024-01-15","open":10.0,"high":10.2,"low":9.8,"close":10.1,"volume":100000,"amount":1010000}
            ]"#,
        )
        .unwrap();
        fs::write(
            path.join("sz.000001.json"),
            r#"[{"date":"2024-01-15","open":"5.0","high":"5.1","low":"4.9","close":"bad","volume":"","amount":null}]"#,
        )
        .unwrap();
        fs::write(path.join("sh.600001.json"), "not json at all").unwrap();
        fs::write(path.join("notes.txt"), "ignore me").unwrap();

        (dir, JsonCacheAdapter::new(path))
    }

    #[test]
    fn load_series_sorts_and_coerces() {
        let (_dir, adapter) = setup_cache();
        let series = adapter.load_series("600000").unwrap();

        assert_eq!(series.exchange, "sh");
        assert_eq!(series.len(), 2);
        let (first, last) = series.date_range().unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(series.latest_close(), 10.3);
    }

    #[test]
    fn unparseable_numeric_becomes_nan() {
        let (_dir, adapter) = setup_cache();
        let series = adapter.load_series("000001").unwrap();

        let bar = &series.bars()[0];
        assert!(bar.close.is_nan());
        assert!(bar.volume.is_nan());
        assert!(bar.amount.is_nan());
        assert_eq!(bar.open, 5.0);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let (_dir, adapter) = setup_cache();
        let err = adapter.load_series("600001").unwrap_err();
        assert!(matches!(err, RpscreenError::CacheParse { .. }));
    }

    #[test]
    fn unknown_code_is_not_found() {
        let (_dir, adapter) = setup_cache();
        let err = adapter.load_series("699999").unwrap_err();
        assert!(matches!(err, RpscreenError::CodeNotFound { .. }));
    }

    #[test]
    fn list_codes_scans_known_prefixes() {
        let (_dir, adapter) = setup_cache();
        let codes = adapter.list_codes().unwrap();
        assert_eq!(codes, vec!["000001", "600000", "600001"]);
    }

    #[test]
    fn missing_dir_is_a_cache_dir_error() {
        let adapter = JsonCacheAdapter::new(PathBuf::from("/nonexistent/rpscreen-cache"));
        let err = adapter.list_codes().unwrap_err();
        assert!(matches!(err, RpscreenError::CacheDir { .. }));
    }

    #[test]
    fn empty_dir_is_a_cache_empty_error() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonCacheAdapter::new(dir.path().to_path_buf());
        let err = adapter.list_codes().unwrap_err();
        assert!(matches!(err, RpscreenError::CacheEmpty { .. }));
    }

    #[test]
    fn invalid_date_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("sh.600002.json"),
            r#"[{"date":"the other day","close":10.0}]"#,
        )
        .unwrap();
        let adapter = JsonCacheAdapter::new(dir.path().to_path_buf());
        let err = adapter.load_series("600002").unwrap_err();
        assert!(matches!(err, RpscreenError::CacheParse { .. }));
    }

    #[test]
    fn data_range_reports_bar_count() {
        let (_dir, adapter) = setup_cache();
        let (first, last, count) = adapter.data_range("600000").unwrap().unwrap();
        assert_eq!(count, 2);
        assert!(first < last);
    }
}
