//! CSV report writer.
//!
//! Every output is written as `<dir>/<name>.csv`. Record sets go through
//! serde; tables are written cell by cell with empty fields for gaps.

use crate::domain::error::NavlensError;
use crate::domain::holding::{HoldingPeriodRecord, HoldingPeriodSummary};
use crate::domain::metrics::PerformanceRecord;
use crate::domain::table::Table;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

fn report_err(e: csv::Error) -> NavlensError {
    NavlensError::Report {
        reason: e.to_string(),
    }
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn target(&self, name: &str) -> Result<PathBuf, NavlensError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| NavlensError::Report {
            reason: format!("cannot create {}: {}", self.output_dir.display(), e),
        })?;
        Ok(self.output_dir.join(format!("{name}.csv")))
    }

    fn write_records<T: Serialize>(
        &self,
        name: &str,
        records: &[T],
    ) -> Result<PathBuf, NavlensError> {
        let path = self.target(name)?;
        let mut writer = csv::Writer::from_path(&path).map_err(report_err)?;
        for record in records {
            writer.serialize(record).map_err(report_err)?;
        }
        writer.flush()?;
        debug!(path = %path.display(), rows = records.len(), "report written");
        Ok(path)
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_table(&self, name: &str, table: &Table) -> Result<PathBuf, NavlensError> {
        let path = self.target(name)?;
        let mut writer = csv::Writer::from_path(&path).map_err(report_err)?;

        let mut header = vec![table.label_header.clone()];
        header.extend(table.columns.iter().cloned());
        writer.write_record(&header).map_err(report_err)?;

        for row in &table.rows {
            let mut fields = vec![row.label.clone()];
            fields.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
            );
            writer.write_record(&fields).map_err(report_err)?;
        }
        writer.flush()?;
        debug!(path = %path.display(), rows = table.len(), "table written");
        Ok(path)
    }

    fn write_performance(
        &self,
        name: &str,
        records: &[PerformanceRecord],
    ) -> Result<PathBuf, NavlensError> {
        self.write_records(name, records)
    }

    fn write_holding_summaries(
        &self,
        name: &str,
        summaries: &[HoldingPeriodSummary],
    ) -> Result<PathBuf, NavlensError> {
        self.write_records(name, summaries)
    }

    fn write_holding_records(
        &self,
        name: &str,
        records: &[HoldingPeriodRecord],
    ) -> Result<PathBuf, NavlensError> {
        self.write_records(name, records)
    }
}
