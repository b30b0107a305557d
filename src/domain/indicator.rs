//! Rolling moving averages and lookback percentage changes.
//!
//! ma_w[i] = mean(close[i-w+1..=i]), O(n) sliding window.
//! Warmup: first (w-1) bars are invalid, as is any bar whose trailing
//! window contains a missing close.

use crate::domain::bar::DailyBar;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct MaPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaSeries {
    pub window: usize,
    pub values: Vec<MaPoint>,
}

impl MaSeries {
    /// Value at bar index `i`, `None` while warming up or over missing data.
    pub fn at(&self, i: usize) -> Option<f64> {
        self.values
            .get(i)
            .and_then(|p| p.valid.then_some(p.value))
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.last().and_then(|p| p.valid.then_some(p.value))
    }
}

pub fn calculate_ma(bars: &[DailyBar], window: usize) -> MaSeries {
    if window == 0 || bars.is_empty() {
        return MaSeries {
            window,
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0_f64;
    let mut missing_in_window = 0usize;

    for (i, bar) in bars.iter().enumerate() {
        if bar.close.is_nan() {
            missing_in_window += 1;
        } else {
            sum += bar.close;
        }
        if i >= window {
            let leaving = bars[i - window].close;
            if leaving.is_nan() {
                missing_in_window -= 1;
            } else {
                sum -= leaving;
            }
        }

        let valid = i + 1 >= window && missing_in_window == 0;
        values.push(MaPoint {
            date: bar.date,
            valid,
            value: if valid { sum / window as f64 } else { 0.0 },
        });
    }

    MaSeries { window, values }
}

/// Period-over-period change per bar: close[i]/close[i-p] - 1.
/// NaN while warming up, when either close is missing, or when the base
/// close is zero.
pub fn pct_change(bars: &[DailyBar], period: usize) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if period == 0 || i < period {
                return f64::NAN;
            }
            let base = bars[i - period].close;
            if base.is_nan() || bar.close.is_nan() || base == 0.0 {
                f64::NAN
            } else {
                bar.close / base - 1.0
            }
        })
        .collect()
}

/// Change of the latest bar against the bar `period` bars earlier.
pub fn latest_pct_change(bars: &[DailyBar], period: usize) -> f64 {
    if period == 0 || bars.len() <= period {
        return f64::NAN;
    }
    let base = bars[bars.len() - 1 - period].close;
    let last = bars[bars.len() - 1].close;
    if base.is_nan() || last.is_nan() || base == 0.0 {
        f64::NAN
    } else {
        last / base - 1.0
    }
}
