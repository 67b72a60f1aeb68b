//! Fund NAV column selection.

use crate::domain::series::TimeSeries;
use chrono::NaiveDate;
use tracing::warn;

/// One stored fund observation. Either NAV column may be absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavRow {
    pub date: NaiveDate,
    pub nav: Option<f64>,
    pub cumulative_nav: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavSource {
    Cumulative,
    Unit,
}

/// Builds the fund's value series from cumulative NAV when any row has one,
/// otherwise from unit NAV.
pub fn select_nav(fund_id: &str, rows: &[NavRow]) -> (TimeSeries, NavSource) {
    if rows.iter().any(|r| r.cumulative_nav.is_some()) {
        let series = TimeSeries::from_pairs(
            rows.iter()
                .filter_map(|r| r.cumulative_nav.map(|v| (r.date, v))),
        );
        return (series, NavSource::Cumulative);
    }
    if !rows.is_empty() {
        warn!(fund = fund_id, "no cumulative NAV, falling back to unit NAV");
    }
    let series = TimeSeries::from_pairs(rows.iter().filter_map(|r| r.nav.map(|v| (r.date, v))));
    (series, NavSource::Unit)
}
