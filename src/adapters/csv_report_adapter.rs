//! CSV report adapter: one row per selected instrument.

use crate::domain::error::RpscreenError;
use crate::domain::screener::ScreeningResult;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub struct CsvReportAdapter {
    output_path: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    pub fn path(&self) -> &Path {
        &self.output_path
    }
}

/// `<dir>/<profile>_selected_<yymmdd>.csv`
pub fn default_output_path(dir: &Path, profile: &str, run_date: NaiveDate) -> PathBuf {
    dir.join(format!(
        "{}_selected_{}.csv",
        profile,
        run_date.format("%y%m%d")
    ))
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        results: &[ScreeningResult],
        rps_periods: &[usize],
    ) -> Result<(), RpscreenError> {
        let mut writer =
            csv::Writer::from_path(&self.output_path).map_err(|e| RpscreenError::Report {
                reason: format!("{}: {}", self.output_path.display(), e),
            })?;

        let mut header = vec!["code".to_string()];
        header.extend(rps_periods.iter().map(|p| format!("rps{}", p)));
        header.push("max_yearly_return".to_string());
        writer
            .write_record(&header)
            .map_err(|e| RpscreenError::Report {
                reason: e.to_string(),
            })?;

        for result in results {
            let mut row = vec![result.code.clone()];
            for period in rps_periods {
                row.push(match result.rps.get(period) {
                    Some(score) => format!("{:.2}", score),
                    None => String::new(),
                });
            }
            row.push(match result.max_yearly_gain {
                Some(gain) => format!("{:.2}", gain),
                None => String::new(),
            });
            writer.write_record(&row).map_err(|e| RpscreenError::Report {
                reason: e.to_string(),
            })?;
        }

        writer.flush().map_err(|e| RpscreenError::Report {
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
