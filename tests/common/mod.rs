#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use rpscreen::domain::bar::DailyBar;
use rpscreen::domain::error::RpscreenError;
use rpscreen::domain::series::InstrumentSeries;
use rpscreen::ports::cache_port::CachePort;
use std::collections::HashMap;

pub struct MockCachePort {
    pub data: HashMap<String, InstrumentSeries>,
    pub errors: HashMap<String, String>,
}

impl MockCachePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: InstrumentSeries) -> Self {
        self.data.insert(series.code.clone(), series);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl CachePort for MockCachePort {
    fn load_series(&self, code: &str) -> Result<InstrumentSeries, RpscreenError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(RpscreenError::CacheParse {
                file: format!("sh.{}.json", code),
                reason: reason.clone(),
            });
        }
        self.data
            .get(code)
            .cloned()
            .ok_or_else(|| RpscreenError::CodeNotFound {
                code: code.to_string(),
            })
    }

    fn list_codes(&self) -> Result<Vec<String>, RpscreenError> {
        let mut codes: Vec<String> = self
            .data
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
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

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive daily bars ending at `end`, one per close.
pub fn series_ending(code: &str, end: NaiveDate, closes: &[f64]) -> InstrumentSeries {
    let start = end - Days::new(closes.len() as u64 - 1);
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| DailyBar::from_close(start + Days::new(i as u64), close))
        .collect();
    InstrumentSeries::new(code.to_string(), "sh".to_string(), bars)
}

/// Linearly trending series: close[i] = start_close + step * i.
pub fn linear_series(
    code: &str,
    end: NaiveDate,
    bars: usize,
    start_close: f64,
    step: f64,
) -> InstrumentSeries {
    let closes: Vec<f64> = (0..bars).map(|i| start_close + step * i as f64).collect();
    series_ending(code, end, &closes)
}
