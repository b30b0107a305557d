//! Universe loading: every cached instrument with enough history.
//!
//! Unreadable or malformed caches are logged and skipped; only a wholly
//! empty cache aborts the run.

use crate::domain::error::RpscreenError;
use crate::domain::series::InstrumentSeries;
use crate::ports::cache_port::CachePort;
use std::collections::BTreeMap;

/// Minimum bar count for an instrument to enter ranking and filtering.
pub const MIN_HISTORY_BARS: usize = 250;

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub enum SkipReason {
    Unreadable { reason: String },
    InsufficientBars { bars: usize },
}

pub struct UniverseLoadResult {
    pub series: BTreeMap<String, InstrumentSeries>,
    pub skipped: Vec<SkippedCode>,
}

/// Load every cached instrument, dropping those that cannot be read or have
/// fewer than `min_history` bars.
pub fn load_universe(
    port: &dyn CachePort,
    min_history: usize,
) -> Result<UniverseLoadResult, RpscreenError> {
    let codes = port.list_codes()?;

    let mut series = BTreeMap::new();
    let mut skipped = Vec::new();

    for code in codes {
        let loaded = match port.load_series(&code) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", code, e);
                skipped.push(SkippedCode {
                    code,
                    reason: SkipReason::Unreadable {
                        reason: e.to_string(),
                    },
                });
                continue;
            }
        };

        if loaded.len() < min_history {
            eprintln!(
                "warning: skipping {} (only {} bars, minimum {} required)",
                code,
                loaded.len(),
                min_history
            );
            skipped.push(SkippedCode {
                code,
                reason: SkipReason::InsufficientBars { bars: loaded.len() },
            });
            continue;
        }

        series.insert(code, loaded);
    }

    Ok(UniverseLoadResult { series, skipped })
}
