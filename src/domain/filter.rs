//! Trend/momentum filter predicates and the two screening profiles.
//!
//! Every condition is a pure predicate over one instrument's
//! [`IndicatorFrame`]. Missing data (warming-up moving average, absent RPS
//! score, empty window) makes the individual condition false; conditions
//! never panic on short or gappy series. Trailing windows count bars, i.e.
//! trading days.

use crate::domain::frame::IndicatorFrame;
use crate::domain::series::InstrumentSeries;
use chrono::{Datelike, NaiveDate};

/// Shared evaluation context: the as-of date and the start of its calendar
/// year, against which the year-to-date conditions are anchored.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext {
    pub as_of: NaiveDate,
    pub year_start: NaiveDate,
}

impl FilterContext {
    pub fn new(as_of: NaiveDate) -> Self {
        let year_start =
            NaiveDate::from_ymd_opt(as_of.year(), 1, 1).expect("January 1 is a valid date");
        Self { as_of, year_start }
    }
}

/// One named predicate of a screening profile.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// rps_a + rps_b > threshold.
    RpsSum {
        periods: (usize, usize),
        threshold: f64,
    },
    /// (max close over the trailing `days` bars - latest close) / max <= limit.
    Drawdown { days: usize, limit: f64 },
    /// Latest close above `entry_ma`, and the `ordered` windows' averages
    /// strictly descending (shorter above longer, diverging upward).
    MaAlignment {
        entry_ma: usize,
        ordered: Vec<usize>,
    },
    /// Close above both averages on at least `threshold` of the last `days` bars.
    MaCrossover {
        days: usize,
        short_ma: usize,
        long_ma: usize,
        threshold: usize,
    },
    /// Latest close >= `fraction` of the max close over the trailing `days` bars.
    YearHighFraction { days: usize, fraction: f64 },
    /// Max close of the last `days` bars >= the year-to-date high set before
    /// that window.
    RecentNewHigh { days: usize },
    /// Either the shorter average has risen through the last five bars while
    /// staying above the longer, or the latest bar shows both averages rising
    /// with the shorter on top.
    MaTrend { short_ma: usize, long_ma: usize },
    /// Latest close above the given moving average.
    PriceAboveMa { window: usize },
    /// Max gain since the start of the calendar year <= cap (as a fraction).
    /// False when the gain is not computable.
    YearlyGainCap { cap: f64 },
}

impl Condition {
    pub fn evaluate(&self, frame: &IndicatorFrame, ctx: &FilterContext) -> bool {
        match *self {
            Condition::RpsSum {
                periods: (a, b),
                threshold,
            } => match (frame.rps_score(a), frame.rps_score(b)) {
                (Some(x), Some(y)) => x + y > threshold,
                _ => false,
            },
            Condition::Drawdown { days, limit } => check_drawdown(frame, days, limit),
            Condition::MaAlignment {
                entry_ma,
                ref ordered,
            } => check_ma_alignment(frame, entry_ma, ordered),
            Condition::MaCrossover {
                days,
                short_ma,
                long_ma,
                threshold,
            } => check_ma_crossover(frame, days, short_ma, long_ma, threshold),
            Condition::YearHighFraction { days, fraction } => {
                check_year_high_fraction(frame, days, fraction)
            }
            Condition::RecentNewHigh { days } => check_recent_new_high(frame, days, ctx),
            Condition::MaTrend { short_ma, long_ma } => check_ma_trend(frame, short_ma, long_ma),
            Condition::PriceAboveMa { window } => match frame.latest_ma(window) {
                Some(ma) => frame.series.latest_close() > ma,
                None => false,
            },
            Condition::YearlyGainCap { cap } => {
                max_yearly_gain(&frame.series, ctx.year_start).is_some_and(|gain| gain <= cap)
            }
        }
    }
}

fn check_drawdown(frame: &IndicatorFrame, days: usize, limit: f64) -> bool {
    let n = frame.len();
    let current = frame.series.latest_close();
    if current.is_nan() {
        return false;
    }
    match frame.series.max_close(n.saturating_sub(days), n) {
        Some(max) if max > 0.0 => (max - current) / max <= limit,
        _ => false,
    }
}

fn check_ma_alignment(frame: &IndicatorFrame, entry_ma: usize, ordered: &[usize]) -> bool {
    let above_entry = match frame.latest_ma(entry_ma) {
        Some(ma) => frame.series.latest_close() > ma,
        None => return false,
    };
    if !above_entry {
        return false;
    }
    ordered.windows(2).all(|pair| {
        match (frame.latest_ma(pair[0]), frame.latest_ma(pair[1])) {
            (Some(shorter), Some(longer)) => shorter > longer,
            _ => false,
        }
    })
}

fn check_ma_crossover(
    frame: &IndicatorFrame,
    days: usize,
    short_ma: usize,
    long_ma: usize,
    threshold: usize,
) -> bool {
    let n = frame.len();
    let start = n.saturating_sub(days);
    let bars = frame.series.bars();

    let hits = (start..n)
        .filter(|&i| {
            let close = bars[i].close;
            if close.is_nan() {
                return false;
            }
            match (frame.ma_at(short_ma, i), frame.ma_at(long_ma, i)) {
                (Some(short), Some(long)) => close > short && close > long,
                _ => false,
            }
        })
        .count();

    hits >= threshold
}

fn check_year_high_fraction(frame: &IndicatorFrame, days: usize, fraction: f64) -> bool {
    let n = frame.len();
    let current = frame.series.latest_close();
    if current.is_nan() {
        return false;
    }
    match frame.series.max_close(n.saturating_sub(days), n) {
        Some(high) => current >= fraction * high,
        None => false,
    }
}

fn check_recent_new_high(frame: &IndicatorFrame, days: usize, ctx: &FilterContext) -> bool {
    let n = frame.len();
    let recent_start = n.saturating_sub(days);
    let Some(ytd_start) = frame.series.first_index_on_or_after(ctx.year_start) else {
        return false;
    };
    if ytd_start >= recent_start {
        // No year-to-date history outside the recent window to compare against.
        return false;
    }
    match (
        frame.series.max_close(recent_start, n),
        frame.series.max_close(ytd_start, recent_start),
    ) {
        (Some(recent_high), Some(prior_high)) => recent_high >= prior_high,
        _ => false,
    }
}

fn check_ma_trend(frame: &IndicatorFrame, short_ma: usize, long_ma: usize) -> bool {
    let n = frame.len();
    if n < 2 {
        return false;
    }

    let sustained = n >= 5
        && (n - 5..n).all(|i| {
            let above = matches!(
                (frame.ma_at(short_ma, i), frame.ma_at(long_ma, i)),
                (Some(short), Some(long)) if short > long
            );
            let rising = i == n - 5
                || matches!(
                    (frame.ma_at(short_ma, i - 1), frame.ma_at(short_ma, i)),
                    (Some(prev), Some(curr)) if curr > prev
                );
            above && rising
        });
    if sustained {
        return true;
    }

    // Fresh turn: both averages up on the latest bar, shorter on top.
    matches!(
        (
            frame.ma_at(short_ma, n - 2),
            frame.ma_at(short_ma, n - 1),
            frame.ma_at(long_ma, n - 2),
            frame.ma_at(long_ma, n - 1),
        ),
        (Some(short_prev), Some(short), Some(long_prev), Some(long))
            if short > short_prev && long > long_prev && short > long
    )
}

/// Max gain since the start of the calendar year, as a fraction of the first
/// close of the year. `None` when the series has no bar before `year_start`
/// or the base close is unusable.
pub fn max_yearly_gain(series: &InstrumentSeries, year_start: NaiveDate) -> Option<f64> {
    let first = series.bars().first()?;
    if first.date >= year_start {
        return None;
    }
    let ytd_start = series.first_index_on_or_after(year_start)?;
    let base = series.bars()[ytd_start].close;
    if base.is_nan() || base <= 0.0 {
        return None;
    }
    let high = series.max_close(ytd_start, series.len())?;
    Some((high - base) / base)
}

/// A named conjunction of conditions plus the indicator inputs it needs.
#[derive(Debug, Clone)]
pub struct FilterProfile {
    pub name: String,
    pub ma_windows: Vec<usize>,
    pub rps_periods: Vec<usize>,
    pub conditions: Vec<Condition>,
}

impl FilterProfile {
    /// Broad first-pass selection: new highs with aligned long averages and
    /// a capped year-to-date run-up.
    pub fn first_pass() -> Self {
        Self {
            name: "first-pass".into(),
            ma_windows: vec![40, 60, 120, 250],
            rps_periods: vec![50, 120, 250],
            conditions: vec![
                Condition::RecentNewHigh { days: 20 },
                Condition::RpsSum {
                    periods: (120, 250),
                    threshold: 185.0,
                },
                Condition::MaAlignment {
                    entry_ma: 40,
                    ordered: vec![60, 120, 250],
                },
                Condition::Drawdown {
                    days: 20,
                    limit: 0.30,
                },
                Condition::YearlyGainCap { cap: 0.50 },
            ],
        }
    }

    /// Stricter follow-on selection: persistent closes above the long
    /// averages plus a short-average uptrend near the yearly high.
    pub fn strict() -> Self {
        Self {
            name: "strict".into(),
            ma_windows: vec![10, 20, 200, 250],
            rps_periods: vec![120, 250],
            conditions: vec![
                Condition::RpsSum {
                    periods: (120, 250),
                    threshold: 185.0,
                },
                Condition::Drawdown {
                    days: 14,
                    limit: 0.25,
                },
                Condition::MaCrossover {
                    days: 30,
                    short_ma: 200,
                    long_ma: 250,
                    threshold: 25,
                },
                Condition::MaCrossover {
                    days: 10,
                    short_ma: 20,
                    long_ma: 20,
                    threshold: 9,
                },
                Condition::MaCrossover {
                    days: 4,
                    short_ma: 10,
                    long_ma: 20,
                    threshold: 3,
                },
                Condition::YearHighFraction {
                    days: 250,
                    fraction: 0.8,
                },
                Condition::MaTrend {
                    short_ma: 10,
                    long_ma: 20,
                },
                Condition::PriceAboveMa { window: 20 },
            ],
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "first-pass" => Some(Self::first_pass()),
            "strict" => Some(Self::strict()),
            _ => None,
        }
    }

    /// True when every condition holds for the instrument.
    pub fn evaluate(&self, frame: &IndicatorFrame, ctx: &FilterContext) -> bool {
        self.conditions.iter().all(|c| c.evaluate(frame, ctx))
    }
}
