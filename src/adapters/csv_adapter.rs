//! CSV file data adapter.
//!
//! Layout: `<base>/funds/<id>.csv` with `date,nav,cumulative_nav` columns
//! and `<base>/indices/<id>.csv` with `date,close`. A plain `value` column
//! is accepted for either kind. Column order is free; empty cells are
//! skipped.

use crate::domain::error::NavlensError;
use crate::domain::nav::{NavRow, select_nav};
use crate::domain::series::TimeSeries;
use crate::ports::data_port::{DataPort, SeriesKind};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn kind_dir(&self, kind: SeriesKind) -> PathBuf {
        match kind {
            SeriesKind::Fund => self.base_path.join("funds"),
            SeriesKind::Index => self.base_path.join("indices"),
        }
    }

    fn csv_path(&self, id: &str, kind: SeriesKind) -> PathBuf {
        self.kind_dir(kind).join(format!("{id}.csv"))
    }
}

fn parse_cell(
    record: &csv::StringRecord,
    idx: Option<usize>,
    line: usize,
) -> Result<Option<f64>, NavlensError> {
    let Some(raw) = idx.and_then(|i| record.get(i)).map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|e| NavlensError::Database {
        reason: format!("invalid number {raw:?} on line {line}: {e}"),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self, id: &str, kind: SeriesKind) -> Result<TimeSeries, NavlensError> {
        let path = self.csv_path(id, kind);
        if !path.exists() {
            return Err(NavlensError::NoData { id: id.to_string() });
        }
        let content = fs::read_to_string(&path).map_err(|e| NavlensError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| NavlensError::Database {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

        let date_idx = column("date").ok_or_else(|| NavlensError::Database {
            reason: format!("missing date column in {}", path.display()),
        })?;
        let value_idx = column("value");
        let nav_idx = column("nav");
        let cum_idx = column("cumulative_nav");
        let close_idx = column("close");

        let mut rows = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| NavlensError::Database {
                reason: format!("CSV parse error: {}", e),
            })?;
            let date_str = record.get(date_idx).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                NavlensError::Database {
                    reason: format!("invalid date {date_str:?} on line {line}: {e}"),
                }
            })?;

            let row = match kind {
                SeriesKind::Fund => NavRow {
                    date,
                    nav: parse_cell(&record, nav_idx.or(value_idx), line)?,
                    cumulative_nav: parse_cell(&record, cum_idx, line)?,
                },
                SeriesKind::Index => NavRow {
                    date,
                    nav: parse_cell(&record, close_idx.or(value_idx), line)?,
                    cumulative_nav: None,
                },
            };
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(NavlensError::NoData { id: id.to_string() });
        }
        let series = match kind {
            SeriesKind::Fund => select_nav(id, &rows).0,
            SeriesKind::Index => {
                TimeSeries::from_pairs(rows.iter().filter_map(|r| r.nav.map(|v| (r.date, v))))
            }
        };
        Ok(series)
    }

    fn list_series(&self, kind: SeriesKind) -> Result<Vec<String>, NavlensError> {
        let dir = self.kind_dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|e| NavlensError::Database {
            reason: format!("failed to read directory {}: {}", dir.display(), e),
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| NavlensError::Database {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(id) = name_str.strip_suffix(".csv") {
                ids.push(id.to_string());
            }
        }

        ids.sort();
        Ok(ids)
    }
}
