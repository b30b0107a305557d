//! Date-ordered price history for one instrument.

use crate::domain::bar::DailyBar;
use chrono::NaiveDate;

/// Ordered daily bars for one instrument. The constructor sorts by date and
/// drops duplicate dates, so downstream code can rely on a strictly
/// increasing date index.
#[derive(Debug, Clone)]
pub struct InstrumentSeries {
    pub code: String,
    pub exchange: String,
    bars: Vec<DailyBar>,
}

impl InstrumentSeries {
    pub fn new(code: String, exchange: String, mut bars: Vec<DailyBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self {
            code,
            exchange,
            bars,
        }
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&DailyBar> {
        self.bars.last()
    }

    /// Latest close, NaN when the series is empty or the last close is missing.
    pub fn latest_close(&self) -> f64 {
        self.bars.last().map_or(f64::NAN, |b| b.close)
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }

    /// Index of the first bar dated on or after `date`, if any.
    pub fn first_index_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.bars.partition_point(|b| b.date < date);
        (idx < self.bars.len()).then_some(idx)
    }

    /// Maximum close over `[start, end)` bar indices, skipping missing closes.
    /// `None` when the range is empty or holds no valid close.
    pub fn max_close(&self, start: usize, end: usize) -> Option<f64> {
        let end = end.min(self.bars.len());
        if start >= end {
            return None;
        }
        self.bars[start..end]
            .iter()
            .filter(|b| b.has_close())
            .map(|b| b.close)
            .reduce(f64::max)
    }
}
