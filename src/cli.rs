//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_report_adapter::{default_output_path, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_cache_adapter::{JsonCacheAdapter, DEFAULT_PREFIXES};
use crate::domain::error::RpscreenError;
use crate::domain::filter::FilterProfile;
use crate::domain::screener::{self, ScreenConfig, ScreeningResult, DEFAULT_RPS_PERIODS};
use crate::domain::universe::MIN_HISTORY_BARS;
use crate::ports::cache_port::CachePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "rpscreen", about = "Relative price strength stock screener")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Screen the cached universe with a filter profile
    Screen {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Filter profile: first-pass or strict
        #[arg(short, long)]
        profile: Option<String>,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Output CSV path (default: <profile>_selected_<yymmdd>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Evaluation date (default: latest bar in the cache)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Worker threads for filter evaluation (0 = automatic)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Report RPS scores for a single instrument
    Rps {
        /// Six-digit instrument code
        code: String,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List cached instrument codes
    ListCodes {
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show the cached date range for an instrument
    Info {
        /// Six-digit instrument code
        code: String,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Screen {
            config,
            profile,
            cache_dir,
            output,
            as_of,
            workers,
        } => run_screen(
            config.as_ref(),
            profile.as_deref(),
            cache_dir,
            output,
            as_of,
            workers,
        ),
        Command::Rps {
            code,
            cache_dir,
            config,
        } => run_rps(&code, cache_dir, config.as_ref()),
        Command::ListCodes { cache_dir, config } => run_list_codes(cache_dir, config.as_ref()),
        Command::Info {
            code,
            cache_dir,
            config,
        } => run_info(&code, cache_dir, config.as_ref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = RpscreenError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Six digits, nothing else.
pub fn validate_instrument_code(input: &str) -> Result<(), RpscreenError> {
    if input.len() == 6 && input.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(RpscreenError::InvalidCode {
            input: input.to_string(),
        })
    }
}

pub fn resolve_cache_dir(
    override_dir: Option<PathBuf>,
    config: Option<&dyn ConfigPort>,
) -> PathBuf {
    override_dir
        .or_else(|| {
            config
                .and_then(|c| c.get_string("cache", "dir"))
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("stock_cache"))
}

pub fn resolve_prefixes(config: Option<&dyn ConfigPort>) -> Vec<String> {
    config
        .and_then(|c| c.get_string("cache", "prefixes"))
        .map(|s| {
            s.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_else(|| DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect())
}

pub fn build_screen_config(
    config: Option<&dyn ConfigPort>,
    profile_override: Option<&str>,
    workers_override: Option<usize>,
    as_of_override: Option<NaiveDate>,
) -> Result<ScreenConfig, RpscreenError> {
    let profile_name = profile_override
        .map(|p| p.to_string())
        .or_else(|| config.and_then(|c| c.get_string("screen", "profile")))
        .unwrap_or_else(|| "first-pass".to_string());

    let profile =
        FilterProfile::by_name(&profile_name).ok_or_else(|| RpscreenError::ConfigInvalid {
            section: "screen".into(),
            key: "profile".into(),
            reason: format!("unknown profile {:?} (expected first-pass or strict)", profile_name),
        })?;

    let min_history = match config {
        Some(c) => {
            let value = c.get_int("screen", "min_history", MIN_HISTORY_BARS as i64);
            usize::try_from(value).map_err(|_| RpscreenError::ConfigInvalid {
                section: "screen".into(),
                key: "min_history".into(),
                reason: "must be non-negative".into(),
            })?
        }
        None => MIN_HISTORY_BARS,
    };

    let workers = match workers_override {
        Some(w) => w,
        None => {
            let value = config.map_or(0, |c| c.get_int("screen", "workers", 0));
            usize::try_from(value).map_err(|_| RpscreenError::ConfigInvalid {
                section: "screen".into(),
                key: "workers".into(),
                reason: "must be non-negative".into(),
            })?
        }
    };

    let as_of = match as_of_override {
        Some(date) => Some(date),
        None => match config.and_then(|c| c.get_string("screen", "as_of")) {
            Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                RpscreenError::ConfigInvalid {
                    section: "screen".into(),
                    key: "as_of".into(),
                    reason: "invalid date format (expected YYYY-MM-DD)".into(),
                }
            })?),
            None => None,
        },
    };

    Ok(ScreenConfig {
        profile,
        min_history,
        workers,
        as_of,
    })
}

/// Aligned console rendering of the result set.
pub fn format_results_table(results: &[ScreeningResult], rps_periods: &[usize]) -> String {
    let mut out = String::new();

    let _ = write!(out, "{:<8}", "code");
    for period in rps_periods {
        let _ = write!(out, "  {:>8}", format!("rps{}", period));
    }
    let _ = writeln!(out, "  {:>18}", "max_yearly_return");

    for result in results {
        let _ = write!(out, "{:<8}", result.code);
        for period in rps_periods {
            match result.rps.get(period) {
                Some(score) => {
                    let _ = write!(out, "  {:>8.2}", score);
                }
                None => {
                    let _ = write!(out, "  {:>8}", "n/a");
                }
            }
        }
        match result.max_yearly_gain {
            Some(gain) => {
                let _ = writeln!(out, "  {:>18.2}", gain);
            }
            None => {
                let _ = writeln!(out, "  {:>18}", "n/a");
            }
        }
    }

    out
}

fn load_optional_config(path: Option<&PathBuf>) -> Result<Option<FileConfigAdapter>, ExitCode> {
    match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            load_config(p).map(Some)
        }
        None => Ok(None),
    }
}

fn run_screen(
    config_path: Option<&PathBuf>,
    profile_override: Option<&str>,
    cache_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    as_of: Option<NaiveDate>,
    workers: Option<usize>,
) -> ExitCode {
    let adapter = match load_optional_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config_port = adapter.as_ref().map(|a| a as &dyn ConfigPort);

    let screen_config = match build_screen_config(config_port, profile_override, workers, as_of) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let cache_dir = resolve_cache_dir(cache_dir, config_port);
    let prefixes = resolve_prefixes(config_port);
    let cache = JsonCacheAdapter::with_prefixes(cache_dir.clone(), prefixes);

    eprintln!(
        "Screening cache {} with profile {}",
        cache_dir.display(),
        screen_config.profile.name
    );

    let outcome = match screener::run_screen(&cache, &screen_config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!(
        "Evaluated {} instruments as of {} ({} skipped), {} selected",
        outcome.evaluated,
        outcome.as_of,
        outcome.skipped.len(),
        outcome.results.len()
    );

    if outcome.results.is_empty() {
        eprintln!("No instruments passed the {} profile", screen_config.profile.name);
    } else {
        println!("\nSelected instruments:");
        print!(
            "{}",
            format_results_table(&outcome.results, &screen_config.profile.rps_periods)
        );
    }

    let output_dir = config_port
        .and_then(|c| c.get_string("output", "dir"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let output_path = output.unwrap_or_else(|| {
        default_output_path(
            &output_dir,
            &screen_config.profile.name,
            Local::now().date_naive(),
        )
    });

    let report = CsvReportAdapter::new(output_path);
    if let Err(e) = report.write(&outcome.results, &screen_config.profile.rps_periods) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("\nResults written to: {}", report.path().display());

    ExitCode::SUCCESS
}

fn run_rps(code: &str, cache_dir: Option<PathBuf>, config_path: Option<&PathBuf>) -> ExitCode {
    if let Err(e) = validate_instrument_code(code) {
        eprintln!("error: {e}");
        eprintln!("usage: rpscreen rps <6-digit instrument code>");
        return (&e).into();
    }

    let adapter = match load_optional_config(config_path) {
        Ok(a) => a,
        Err(exit) => return exit,
    };
    let config_port = adapter.as_ref().map(|a| a as &dyn ConfigPort);

    let cache_dir = resolve_cache_dir(cache_dir, config_port);
    let cache = JsonCacheAdapter::with_prefixes(cache_dir, resolve_prefixes(config_port));

    let scores = match screener::rps_for_code(&cache, code, &DEFAULT_RPS_PERIODS) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    println!("RPS data for {}:", code);
    for (period, score) in &scores {
        match score {
            Some(value) => println!("RPS{}: {:.2}", period, value),
            None => println!("RPS{}: n/a", period),
        }
    }
    ExitCode::SUCCESS
}

fn run_list_codes(cache_dir: Option<PathBuf>, config_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_optional_config(config_path) {
        Ok(a) => a,
        Err(exit) => return exit,
    };
    let config_port = adapter.as_ref().map(|a| a as &dyn ConfigPort);

    let cache_dir = resolve_cache_dir(cache_dir, config_port);
    let cache = JsonCacheAdapter::with_prefixes(cache_dir, resolve_prefixes(config_port));

    let codes = match cache.list_codes() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for code in &codes {
        println!("{}", code);
    }
    eprintln!("{} instruments cached", codes.len());
    ExitCode::SUCCESS
}

fn run_info(code: &str, cache_dir: Option<PathBuf>, config_path: Option<&PathBuf>) -> ExitCode {
    if let Err(e) = validate_instrument_code(code) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let adapter = match load_optional_config(config_path) {
        Ok(a) => a,
        Err(exit) => return exit,
    };
    let config_port = adapter.as_ref().map(|a| a as &dyn ConfigPort);

    let cache_dir = resolve_cache_dir(cache_dir, config_port);
    let cache = JsonCacheAdapter::with_prefixes(cache_dir, resolve_prefixes(config_port));

    match cache.data_range(code) {
        Ok(Some((first, last, count))) => {
            println!("{}: {} bars, {} to {}", code, count, first, last);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("{}: no data found", code);
            ExitCode::from(5)
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
