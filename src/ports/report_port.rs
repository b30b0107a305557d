//! Result reporting port trait.

use crate::domain::error::RpscreenError;
use crate::domain::screener::ScreeningResult;

/// Port for persisting a finished screening run.
pub trait ReportPort {
    fn write(
        &self,
        results: &[ScreeningResult],
        rps_periods: &[usize],
    ) -> Result<(), RpscreenError>;
}
