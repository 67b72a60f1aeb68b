//! Data access port trait.

use crate::domain::error::NavlensError;
use crate::domain::series::TimeSeries;
use chrono::NaiveDate;
use std::fmt;

/// Which store a series lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    /// Fund NAV history.
    Fund,
    /// Base index closing levels.
    Index,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKind::Fund => f.write_str("fund"),
            SeriesKind::Index => f.write_str("index"),
        }
    }
}

/// Supplies materialized daily value series. Implementations return
/// [`NavlensError::NoData`] when the identifier has no stored observations.
pub trait DataPort {
    fn fetch_series(&self, id: &str, kind: SeriesKind) -> Result<TimeSeries, NavlensError>;

    fn list_series(&self, kind: SeriesKind) -> Result<Vec<String>, NavlensError>;

    fn get_data_range(
        &self,
        id: &str,
        kind: SeriesKind,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, NavlensError> {
        match self.fetch_series(id, kind) {
            Ok(series) => Ok(series
                .start_date()
                .zip(series.end_date())
                .map(|(start, end)| (start, end, series.len()))),
            Err(NavlensError::NoData { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
