//! Report output port trait.

use crate::domain::error::NavlensError;
use crate::domain::holding::{HoldingPeriodRecord, HoldingPeriodSummary};
use crate::domain::metrics::PerformanceRecord;
use crate::domain::series::TimeSeries;
use crate::domain::table::Table;
use std::path::PathBuf;

/// Port for persisting analysis output. Each method returns the location
/// written.
pub trait ReportPort {
    fn write_table(&self, name: &str, table: &Table) -> Result<PathBuf, NavlensError>;

    fn write_performance(
        &self,
        name: &str,
        records: &[PerformanceRecord],
    ) -> Result<PathBuf, NavlensError>;

    fn write_holding_summaries(
        &self,
        name: &str,
        summaries: &[HoldingPeriodSummary],
    ) -> Result<PathBuf, NavlensError>;

    fn write_holding_records(
        &self,
        name: &str,
        records: &[HoldingPeriodRecord],
    ) -> Result<PathBuf, NavlensError>;

    /// Default implementation: a one-column table keyed by date.
    fn write_series(&self, name: &str, series: &TimeSeries) -> Result<PathBuf, NavlensError> {
        let mut table = Table::new("date", vec!["value".to_string()]);
        for p in series.points() {
            table.push_row(p.date.to_string(), vec![Some(p.value)]);
        }
        self.write_table(name, &table)
    }
}
