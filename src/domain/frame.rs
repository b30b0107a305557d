//! Per-instrument indicator frame: the price series plus derived columns.

use crate::domain::indicator::{calculate_ma, MaSeries};
use crate::domain::series::InstrumentSeries;
use std::collections::{BTreeMap, HashMap};

/// An [`InstrumentSeries`] augmented with its moving averages and, once the
/// cross-sectional pass has run, the latest-row RPS score per period.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub series: InstrumentSeries,
    mas: HashMap<usize, MaSeries>,
    pub rps: BTreeMap<usize, f64>,
}

impl IndicatorFrame {
    pub fn new(series: InstrumentSeries, ma_windows: &[usize]) -> Self {
        let mas = ma_windows
            .iter()
            .map(|&window| (window, calculate_ma(series.bars(), window)))
            .collect();
        Self {
            series,
            mas,
            rps: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Moving average value at bar index `i`, `None` when the window was not
    /// configured or the value is still warming up.
    pub fn ma_at(&self, window: usize, i: usize) -> Option<f64> {
        self.mas.get(&window).and_then(|s| s.at(i))
    }

    pub fn latest_ma(&self, window: usize) -> Option<f64> {
        self.mas.get(&window).and_then(|s| s.latest())
    }

    pub fn rps_score(&self, period: usize) -> Option<f64> {
        self.rps.get(&period).copied()
    }
}
