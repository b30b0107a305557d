//! Price-cache access port trait.

use crate::domain::error::RpscreenError;
use crate::domain::series::InstrumentSeries;
use chrono::NaiveDate;

pub trait CachePort {
    /// Load the full cached history for one instrument code.
    fn load_series(&self, code: &str) -> Result<InstrumentSeries, RpscreenError>;

    /// All instrument codes present in the cache, sorted.
    fn list_codes(&self) -> Result<Vec<String>, RpscreenError>;

    /// First date, last date and bar count for a cached instrument.
    fn data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RpscreenError>;
}
