//! Daily bar representation.

use chrono::NaiveDate;

/// One day of trading for one instrument. Price fields that failed to parse
/// upstream are carried as `f64::NAN`, never as errors.
#[derive(Debug, Clone)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

impl DailyBar {
    /// Bar with only a meaningful close, for series built from close-only data.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            amount: 0.0,
        }
    }

    pub fn has_close(&self) -> bool {
        !self.close.is_nan()
    }
}
