//! Screening orchestrator: freeze the universe, rank it, fan out the filter.
//!
//! Two-phase pipeline: the indicator frames and the cross-sectional RPS
//! tables are fully built before any per-instrument decision runs, so the
//! fan-out reads immutable shared state and needs no locking.

use crate::domain::error::RpscreenError;
use crate::domain::filter::{max_yearly_gain, FilterContext, FilterProfile};
use crate::domain::frame::IndicatorFrame;
use crate::domain::indicator::latest_pct_change;
use crate::domain::rps::compute_rps;
use crate::domain::series::InstrumentSeries;
use crate::domain::universe::{load_universe, SkippedCode, MIN_HISTORY_BARS};
use crate::ports::cache_port::CachePort;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// RPS lookback periods reported by the single-instrument lookup.
pub const DEFAULT_RPS_PERIODS: [usize; 3] = [50, 120, 250];

#[derive(Debug, Clone)]
pub struct ScreenConfig {
    pub profile: FilterProfile,
    pub min_history: usize,
    /// Worker threads for the filter fan-out; 0 lets rayon decide.
    pub workers: usize,
    /// Evaluation date; defaults to the latest bar date in the universe.
    pub as_of: Option<NaiveDate>,
}

impl ScreenConfig {
    pub fn new(profile: FilterProfile) -> Self {
        Self {
            profile,
            min_history: MIN_HISTORY_BARS,
            workers: 0,
            as_of: None,
        }
    }
}

/// One selected instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningResult {
    pub code: String,
    /// Period -> percentile score for every period the profile computes.
    pub rps: BTreeMap<usize, f64>,
    /// Max gain since the start of the calendar year, in percent.
    pub max_yearly_gain: Option<f64>,
}

#[derive(Debug)]
pub struct ScreenOutcome {
    pub results: Vec<ScreeningResult>,
    /// Instruments that entered filtering.
    pub evaluated: usize,
    pub skipped: Vec<SkippedCode>,
    pub as_of: NaiveDate,
}

/// Run the full screen against a cache.
pub fn run_screen(
    port: &dyn CachePort,
    config: &ScreenConfig,
) -> Result<ScreenOutcome, RpscreenError> {
    let loaded = load_universe(port, config.min_history)?;
    if loaded.series.is_empty() {
        return Err(RpscreenError::EmptyUniverse);
    }

    let as_of = match config.as_of {
        Some(date) => date,
        None => latest_universe_date(&loaded.series).ok_or(RpscreenError::EmptyUniverse)?,
    };
    let ctx = FilterContext::new(as_of);

    let mut frames: BTreeMap<String, IndicatorFrame> = loaded
        .series
        .into_iter()
        .map(|(code, series)| (code, IndicatorFrame::new(series, &config.profile.ma_windows)))
        .collect();

    attach_rps_scores(&mut frames, &config.profile.rps_periods);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| RpscreenError::WorkerPool {
            reason: e.to_string(),
        })?;

    let mut results: Vec<ScreeningResult> = pool.install(|| {
        frames
            .par_iter()
            .filter_map(|(code, frame)| {
                config
                    .profile
                    .evaluate(frame, &ctx)
                    .then(|| ScreeningResult {
                        code: code.clone(),
                        rps: frame.rps.clone(),
                        max_yearly_gain: max_yearly_gain(&frame.series, ctx.year_start)
                            .map(|gain| gain * 100.0),
                    })
            })
            .collect()
    });

    // Completion order is nondeterministic; the output order must not be.
    results.sort_by(|a, b| a.code.cmp(&b.code));

    Ok(ScreenOutcome {
        results,
        evaluated: frames.len(),
        skipped: loaded.skipped,
        as_of,
    })
}

/// RPS scores for a single instrument, ranked against every cached series.
///
/// No minimum-history gate here: every instrument with a valid change for a
/// period participates in that period's ranking. Periods for which the
/// target has no valid change map to `None`.
pub fn rps_for_code(
    port: &dyn CachePort,
    code: &str,
    periods: &[usize],
) -> Result<BTreeMap<usize, Option<f64>>, RpscreenError> {
    let loaded = load_universe(port, 0)?;
    if !loaded.series.contains_key(code) {
        return Err(RpscreenError::CodeNotFound { code: code.into() });
    }

    let mut scores = BTreeMap::new();
    for &period in periods {
        let changes = universe_changes(&loaded.series, period);
        let table = compute_rps(&changes);
        scores.insert(period, table.get(code).copied());
    }
    Ok(scores)
}

fn latest_universe_date(series: &BTreeMap<String, InstrumentSeries>) -> Option<NaiveDate> {
    series
        .values()
        .filter_map(|s| s.latest().map(|bar| bar.date))
        .max()
}

fn universe_changes(
    series: &BTreeMap<String, InstrumentSeries>,
    period: usize,
) -> Vec<(String, f64)> {
    series
        .iter()
        .map(|(code, s)| (code.clone(), latest_pct_change(s.bars(), period)))
        .collect()
}

fn attach_rps_scores(frames: &mut BTreeMap<String, IndicatorFrame>, periods: &[usize]) {
    for &period in periods {
        let changes: Vec<(String, f64)> = frames
            .iter()
            .map(|(code, frame)| (code.clone(), latest_pct_change(frame.series.bars(), period)))
            .collect();
        for (code, score) in compute_rps(&changes) {
            if let Some(frame) = frames.get_mut(&code) {
                frame.rps.insert(period, score);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::DailyBar;
    use approx::assert_relative_eq;
    use chrono::Days;
    use std::collections::HashMap;

    struct FakeCache {
        data: HashMap<String, InstrumentSeries>,
    }

    impl CachePort for FakeCache {
        fn load_series(&self, code: &str) -> Result<InstrumentSeries, RpscreenError> {
            self.data
                .get(code)
                .cloned()
                .ok_or_else(|| RpscreenError::CodeNotFound { code: code.into() })
        }

        fn list_codes(&self) -> Result<Vec<String>, RpscreenError> {
            let mut codes: Vec<String> = self.data.keys().cloned().collect();
            codes.sort();
            Ok(codes)
        }

        fn data_range(
            &self,
            code: &str,
        ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RpscreenError> {
            Ok(self.data.get(code).and_then(|s| {
                s.date_range().map(|(first, last)| (first, last, s.len()))
            }))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series_ending(code: &str, end: NaiveDate, closes: &[f64]) -> InstrumentSeries {
        let start = end - Days::new(closes.len() as u64 - 1);
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyBar::from_close(start + Days::new(i as u64), close))
            .collect();
        InstrumentSeries::new(code.into(), "sh".into(), bars)
    }

    fn linear_series(code: &str, end: NaiveDate, bars: usize, start_close: f64, step: f64) -> InstrumentSeries {
        let closes: Vec<f64> = (0..bars).map(|i| start_close + step * i as f64).collect();
        series_ending(code, end, &closes)
    }

    #[test]
    fn attach_rps_scores_ranks_each_period() {
        let end = date(2024, 6, 28);
        let mut frames = BTreeMap::new();
        for (code, step) in [("600001", 0.10), ("600002", -0.02), ("600003", 0.30)] {
            frames.insert(
                code.to_string(),
                IndicatorFrame::new(linear_series(code, end, 300, 100.0, step), &[]),
            );
        }

        attach_rps_scores(&mut frames, &[50, 120]);

        for frame in frames.values() {
            assert_eq!(frame.rps.len(), 2);
        }
        assert_relative_eq!(frames["600003"].rps[&50], 100.0);
        assert_relative_eq!(frames["600002"].rps[&50], 100.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn rps_for_code_reports_all_periods() {
        let end = date(2024, 6, 28);
        let cache = FakeCache {
            data: HashMap::from([
                (
                    "600001".to_string(),
                    linear_series("600001", end, 300, 100.0, 0.2),
                ),
                (
                    "600002".to_string(),
                    linear_series("600002", end, 300, 100.0, -0.05),
                ),
            ]),
        };

        let scores = rps_for_code(&cache, "600001", &DEFAULT_RPS_PERIODS).unwrap();

        assert_eq!(scores.len(), 3);
        for score in scores.values() {
            assert_relative_eq!(score.unwrap(), 100.0);
        }
    }

    #[test]
    fn rps_for_code_short_series_has_no_score() {
        let end = date(2024, 6, 28);
        let cache = FakeCache {
            data: HashMap::from([
                (
                    "600001".to_string(),
                    linear_series("600001", end, 300, 100.0, 0.2),
                ),
                (
                    "600002".to_string(),
                    linear_series("600002", end, 60, 100.0, -0.05),
                ),
            ]),
        };

        let scores = rps_for_code(&cache, "600002", &DEFAULT_RPS_PERIODS).unwrap();

        assert!(scores[&50].is_some());
        assert_eq!(scores[&120], None);
        assert_eq!(scores[&250], None);
    }

    #[test]
    fn rps_for_code_unknown_code_is_an_error() {
        let cache = FakeCache {
            data: HashMap::from([(
                "600001".to_string(),
                linear_series("600001", date(2024, 6, 28), 300, 100.0, 0.2),
            )]),
        };

        let err = rps_for_code(&cache, "699999", &DEFAULT_RPS_PERIODS).unwrap_err();
        assert!(matches!(err, RpscreenError::CodeNotFound { .. }));
    }

    #[test]
    fn empty_cache_is_fatal() {
        let cache = FakeCache {
            data: HashMap::new(),
        };
        let config = ScreenConfig::new(FilterProfile::first_pass());
        let err = run_screen(&cache, &config).unwrap_err();
        assert!(matches!(err, RpscreenError::EmptyUniverse));
    }

    #[test]
    fn as_of_defaults_to_latest_universe_date() {
        let cache = FakeCache {
            data: HashMap::from([
                (
                    "600001".to_string(),
                    linear_series("600001", date(2024, 6, 27), 300, 100.0, 0.1),
                ),
                (
                    "600002".to_string(),
                    linear_series("600002", date(2024, 6, 28), 300, 100.0, 0.1),
                ),
            ]),
        };
        let config = ScreenConfig::new(FilterProfile::first_pass());

        let outcome = run_screen(&cache, &config).unwrap();
        assert_eq!(outcome.as_of, date(2024, 6, 28));
    }

    #[test]
    fn top_ranked_uptrends_pass_first_pass_sorted_by_code() {
        // 20 rising series with distinct slopes. Only the two strongest can
        // clear rps120 + rps250 > 185 (ranks 19 and 20 of 20); the slopes are
        // gentle enough that the yearly-gain cap holds for everyone.
        let end = date(2024, 6, 28);
        let mut data = HashMap::new();
        for k in 0..20usize {
            // "600020" gets the weakest slope, "600001" the strongest
            let code = format!("{:06}", 600020 - k);
            let step = 0.10 + 0.01 * k as f64;
            data.insert(code.clone(), linear_series(&code, end, 400, 100.0, step));
        }
        let cache = FakeCache { data };
        let config = ScreenConfig::new(FilterProfile::first_pass());

        let outcome = run_screen(&cache, &config).unwrap();

        let result_codes: Vec<&str> =
            outcome.results.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(result_codes, vec!["600001", "600002"]);
        assert_eq!(outcome.evaluated, 20);

        let top = &outcome.results[0];
        assert_relative_eq!(top.rps[&250], 100.0);
        assert_relative_eq!(top.rps[&120], 100.0);
        assert!(top.max_yearly_gain.unwrap() < 50.0);
    }
}
