#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use navlens::domain::error::NavlensError;
use navlens::domain::holding::{HoldingPeriodRecord, HoldingPeriodSummary};
use navlens::domain::metrics::PerformanceRecord;
use navlens::domain::series::TimeSeries;
use navlens::domain::table::Table;
use navlens::ports::data_port::{DataPort, SeriesKind};
use navlens::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

pub struct MockDataPort {
    pub funds: HashMap<String, TimeSeries>,
    pub indices: HashMap<String, TimeSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            funds: HashMap::new(),
            indices: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_fund(mut self, id: &str, series: TimeSeries) -> Self {
        self.funds.insert(id.to_string(), series);
        self
    }

    pub fn with_index(mut self, id: &str, series: TimeSeries) -> Self {
        self.indices.insert(id.to_string(), series);
        self
    }

    pub fn with_error(mut self, id: &str, reason: &str) -> Self {
        self.errors.insert(id.to_string(), reason.to_string());
        self
    }

    fn store(&self, kind: SeriesKind) -> &HashMap<String, TimeSeries> {
        match kind {
            SeriesKind::Fund => &self.funds,
            SeriesKind::Index => &self.indices,
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, id: &str, kind: SeriesKind) -> Result<TimeSeries, NavlensError> {
        if let Some(reason) = self.errors.get(id) {
            return Err(NavlensError::Database {
                reason: reason.clone(),
            });
        }
        self.store(kind)
            .get(id)
            .cloned()
            .ok_or_else(|| NavlensError::NoData { id: id.to_string() })
    }

    fn list_series(&self, kind: SeriesKind) -> Result<Vec<String>, NavlensError> {
        let mut ids: Vec<String> = self.store(kind).keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Keeps everything it is asked to write, keyed by output name.
#[derive(Default)]
pub struct RecordingReportPort {
    pub tables: RefCell<HashMap<String, Table>>,
    pub performance: RefCell<HashMap<String, Vec<PerformanceRecord>>>,
    pub summaries: RefCell<HashMap<String, Vec<HoldingPeriodSummary>>>,
    pub windows: RefCell<HashMap<String, Vec<HoldingPeriodRecord>>>,
}

impl RecordingReportPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Table {
        self.tables
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no table named {name}"))
    }
}

impl ReportPort for RecordingReportPort {
    fn write_table(&self, name: &str, table: &Table) -> Result<PathBuf, NavlensError> {
        self.tables
            .borrow_mut()
            .insert(name.to_string(), table.clone());
        Ok(PathBuf::from(format!("{name}.csv")))
    }

    fn write_performance(
        &self,
        name: &str,
        records: &[PerformanceRecord],
    ) -> Result<PathBuf, NavlensError> {
        self.performance
            .borrow_mut()
            .insert(name.to_string(), records.to_vec());
        Ok(PathBuf::from(format!("{name}.csv")))
    }

    fn write_holding_summaries(
        &self,
        name: &str,
        summaries: &[HoldingPeriodSummary],
    ) -> Result<PathBuf, NavlensError> {
        self.summaries
            .borrow_mut()
            .insert(name.to_string(), summaries.to_vec());
        Ok(PathBuf::from(format!("{name}.csv")))
    }

    fn write_holding_records(
        &self,
        name: &str,
        records: &[HoldingPeriodRecord],
    ) -> Result<PathBuf, NavlensError> {
        self.windows
            .borrow_mut()
            .insert(name.to_string(), records.to_vec());
        Ok(PathBuf::from(format!("{name}.csv")))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One value per calendar day starting at `start`.
pub fn daily_series(start: NaiveDate, values: &[f64]) -> TimeSeries {
    TimeSeries::from_pairs(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + chrono::Duration::days(i as i64), *v)),
    )
}

/// `count` weekdays starting at (or after) `start`.
pub fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut day = start;
    while dates.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(day);
        }
        day += chrono::Duration::days(1);
    }
    dates
}

/// Business-day series whose value oscillates around a steady drift so
/// that returns have non-zero dispersion and drawdowns occur.
pub fn wave_series(start: NaiveDate, count: usize, drift: f64, amplitude: f64) -> TimeSeries {
    TimeSeries::from_pairs(business_days(start, count).into_iter().enumerate().map(|(i, d)| {
        let t = i as f64;
        (d, 1.0 * (1.0 + drift).powf(t) * (1.0 + amplitude * (t / 7.0).sin()))
    }))
}

/// Business-day series growing by a constant daily rate.
pub fn geometric_series(start: NaiveDate, count: usize, daily_return: f64) -> TimeSeries {
    TimeSeries::from_pairs(
        business_days(start, count)
            .into_iter()
            .enumerate()
            .map(|(i, d)| (d, (1.0 + daily_return).powi(i as i32))),
    )
}
