//! Subject-versus-benchmark comparison tables.
//!
//! Three views are built here: returns over fixed calendar windows, a
//! periodic return curve aligned per benchmark, and a year by month grid of
//! monthly returns with yearly aggregates and win rates.

use crate::domain::frequency::{Frequency, last_day_of_month};
use crate::domain::resample::Resampler;
use crate::domain::series::{Point, TimeSeries, compound};
use crate::domain::table::Table;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const SINCE_INCEPTION: &str = "Since inception";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    SinceInception,
    CalendarYear(i32),
    YearToDate,
    MonthToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindow {
    pub kind: WindowKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalendarWindow {
    pub fn label(&self) -> String {
        let name = match self.kind {
            WindowKind::SinceInception => SINCE_INCEPTION.to_string(),
            WindowKind::CalendarYear(year) => year.to_string(),
            WindowKind::YearToDate => "Year to date".to_string(),
            WindowKind::MonthToDate => "Month to date".to_string(),
        };
        format!(
            "{name} {}-{}",
            self.start.format("%Y/%m/%d"),
            self.end.format("%Y/%m/%d")
        )
    }
}

/// The fixed window set for a subject history running from `start` to
/// `end`: since inception, each completed calendar year, year to date and
/// month to date. The first calendar year starts at `start`.
pub fn calendar_windows(start: NaiveDate, end: NaiveDate) -> Vec<CalendarWindow> {
    let mut windows = vec![CalendarWindow {
        kind: WindowKind::SinceInception,
        start,
        end,
    }];

    for year in start.year()..end.year() {
        let year_start = if year == start.year() {
            start
        } else {
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(start)
        };
        windows.push(CalendarWindow {
            kind: WindowKind::CalendarYear(year),
            start: year_start,
            end: last_day_of_month(year, 12),
        });
    }

    if let Some(ytd_start) = NaiveDate::from_ymd_opt(end.year(), 1, 1) {
        windows.push(CalendarWindow {
            kind: WindowKind::YearToDate,
            start: ytd_start,
            end,
        });
    }
    if let Some(mtd_start) = end.with_day(1) {
        windows.push(CalendarWindow {
            kind: WindowKind::MonthToDate,
            start: mtd_start,
            end,
        });
    }
    windows
}

/// Return of `series` clipped to `[start, end]`; `None` with fewer than two
/// points inside the window.
pub fn period_return(series: &TimeSeries, start: NaiveDate, end: NaiveDate) -> Option<f64> {
    let clipped = series.between(start, end);
    if clipped.len() < 2 {
        return None;
    }
    let first = clipped.first()?.value;
    let last = clipped.last()?.value;
    Some(last / first - 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarPeriodRow {
    pub window: CalendarWindow,
    pub subject: Option<f64>,
    pub benchmarks: Vec<Option<f64>>,
    /// Subject minus the primary (first) benchmark.
    pub excess: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarPeriodTable {
    pub subject_id: String,
    pub benchmark_ids: Vec<String>,
    pub rows: Vec<CalendarPeriodRow>,
}

impl CalendarPeriodTable {
    pub fn to_table(&self) -> Table {
        let mut columns = vec![self.subject_id.clone()];
        columns.extend(self.benchmark_ids.iter().cloned());
        columns.push("excess".to_string());

        let mut table = Table::new("period", columns);
        for row in &self.rows {
            let mut values = vec![row.subject];
            values.extend(row.benchmarks.iter().copied());
            values.push(row.excess);
            table.push_row(row.window.label(), values);
        }
        table
    }
}

/// Windows are derived from the subject's own range and applied unchanged
/// to every benchmark. The first benchmark is the primary one.
pub fn calendar_period_table(
    subject_id: &str,
    subject: &TimeSeries,
    benchmarks: &[(String, TimeSeries)],
) -> CalendarPeriodTable {
    let mut table = CalendarPeriodTable {
        subject_id: subject_id.to_string(),
        benchmark_ids: benchmarks.iter().map(|(id, _)| id.clone()).collect(),
        rows: Vec::new(),
    };
    let (Some(start), Some(end)) = (subject.start_date(), subject.end_date()) else {
        return table;
    };

    for window in calendar_windows(start, end) {
        let subject_return = period_return(subject, window.start, window.end);
        let bench_returns: Vec<Option<f64>> = benchmarks
            .iter()
            .map(|(_, s)| period_return(s, window.start, window.end))
            .collect();
        let excess = match (subject_return, bench_returns.first().copied().flatten()) {
            (Some(s), Some(b)) => Some(s - b),
            _ => None,
        };
        table.rows.push(CalendarPeriodRow {
            window,
            subject: subject_return,
            benchmarks: bench_returns,
            excess,
        });
    }
    table
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnCurveRow {
    pub date: NaiveDate,
    pub subject: f64,
    /// `None` where the benchmark has no return on this label.
    pub benchmarks: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnCurve {
    pub frequency: Frequency,
    pub subject_id: String,
    pub benchmark_ids: Vec<String>,
    pub rows: Vec<ReturnCurveRow>,
}

impl ReturnCurve {
    pub fn to_table(&self) -> Table {
        let mut columns = vec![self.subject_id.clone()];
        columns.extend(self.benchmark_ids.iter().cloned());
        let mut table = Table::new("date", columns);
        for row in &self.rows {
            let mut values = vec![Some(row.subject)];
            values.extend(row.benchmarks.iter().copied());
            table.push_row(row.date.to_string(), values);
        }
        table
    }
}

/// Period returns of the subject, with each benchmark's return on the same
/// period label. Each series is resampled on its own.
pub fn return_curve(
    subject_id: &str,
    subject: &TimeSeries,
    benchmarks: &[(String, TimeSeries)],
    frequency: Frequency,
    resampler: &Resampler,
) -> ReturnCurve {
    let subject_returns = resampler.period_returns(subject, frequency);
    let bench_lookups: Vec<HashMap<NaiveDate, f64>> = benchmarks
        .iter()
        .map(|(_, s)| {
            resampler
                .period_returns(s, frequency)
                .into_iter()
                .map(|p| (p.date, p.value))
                .collect()
        })
        .collect();

    let rows = subject_returns
        .iter()
        .map(|p| ReturnCurveRow {
            date: p.date,
            subject: p.value,
            benchmarks: bench_lookups.iter().map(|l| l.get(&p.date).copied()).collect(),
        })
        .collect();

    ReturnCurve {
        frequency,
        subject_id: subject_id.to_string(),
        benchmark_ids: benchmarks.iter().map(|(id, _)| id.clone()).collect(),
        rows,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyGridRow {
    /// The year, or [`SINCE_INCEPTION`] for the aggregate row.
    pub label: String,
    pub months: [Option<f64>; 12],
    pub yearly: f64,
    pub benchmark_yearly: Option<f64>,
    pub benchmark_win_rate: Option<f64>,
    pub comparison_yearly: Option<f64>,
    pub comparison_win_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyGrid {
    pub subject_id: String,
    pub benchmark_id: Option<String>,
    pub comparison_id: Option<String>,
    pub rows: Vec<MonthlyGridRow>,
}

impl MonthlyGrid {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_table(&self) -> Table {
        let mut columns: Vec<String> = MONTH_NAMES.iter().map(|m| m.to_string()).collect();
        columns.push("year".to_string());
        columns.push("benchmark".to_string());
        columns.push("win_rate_vs_benchmark".to_string());
        if let Some(cmp) = &self.comparison_id {
            columns.push(cmp.clone());
            columns.push(format!("win_rate_vs_{cmp}"));
        }

        let mut table = Table::new(self.subject_id.clone(), columns);
        for row in &self.rows {
            let mut values: Vec<Option<f64>> = row.months.to_vec();
            values.push(Some(row.yearly));
            values.push(row.benchmark_yearly);
            values.push(row.benchmark_win_rate);
            if self.comparison_id.is_some() {
                values.push(row.comparison_yearly);
                values.push(row.comparison_win_rate);
            }
            table.push_row(row.label.clone(), values);
        }
        table
    }
}

// Compounded reference return and subject win rate over the subject's
// months that also have a reference return.
fn aggregate_against(
    subject: &[Point],
    reference: &HashMap<NaiveDate, f64>,
) -> (Option<f64>, Option<f64>) {
    let pairs: Vec<(f64, f64)> = subject
        .iter()
        .filter_map(|p| reference.get(&p.date).map(|&r| (p.value, r)))
        .collect();
    if pairs.is_empty() {
        return (None, None);
    }
    let compounded = compound(pairs.iter().map(|(_, r)| *r));
    let wins = pairs.iter().filter(|(s, r)| s > r).count();
    (Some(compounded), Some(wins as f64 / pairs.len() as f64))
}

/// Pivots monthly subject returns into one row per year, plus a final
/// since-inception row compounding the whole history. Benchmark and
/// comparison aggregates only use months where both the subject and the
/// reference have a return: a month missing from the reference is left
/// out of the win rate rather than counted as a loss, and the
/// since-inception reference return compounds only those shared months,
/// not the reference's full history.
pub fn monthly_grid(
    subject_id: &str,
    subject: &TimeSeries,
    benchmark: Option<(&str, &TimeSeries)>,
    comparison: Option<(&str, &TimeSeries)>,
    resampler: &Resampler,
) -> MonthlyGrid {
    let monthly = |s: &TimeSeries| -> HashMap<NaiveDate, f64> {
        resampler
            .period_returns(s, Frequency::Monthly)
            .into_iter()
            .map(|p| (p.date, p.value))
            .collect()
    };
    let subject_returns = resampler.period_returns(subject, Frequency::Monthly);
    let bench_returns = benchmark.map(|(_, s)| monthly(s));
    let cmp_returns = comparison.map(|(_, s)| monthly(s));

    let mut grid = MonthlyGrid {
        subject_id: subject_id.to_string(),
        benchmark_id: benchmark.map(|(id, _)| id.to_string()),
        comparison_id: comparison.map(|(id, _)| id.to_string()),
        rows: Vec::new(),
    };
    if subject_returns.is_empty() {
        return grid;
    }

    let mut by_year: BTreeMap<i32, Vec<Point>> = BTreeMap::new();
    for p in &subject_returns {
        by_year.entry(p.date.year()).or_default().push(*p);
    }

    let split = |points: &[Point], reference: &Option<HashMap<NaiveDate, f64>>| match reference {
        Some(r) => aggregate_against(points, r),
        None => (None, None),
    };

    for (year, points) in &by_year {
        let mut months = [None; 12];
        for p in points {
            months[p.date.month0() as usize] = Some(p.value);
        }
        let (benchmark_yearly, benchmark_win_rate) = split(points.as_slice(), &bench_returns);
        let (comparison_yearly, comparison_win_rate) = split(points.as_slice(), &cmp_returns);
        grid.rows.push(MonthlyGridRow {
            label: year.to_string(),
            months,
            yearly: compound(points.iter().map(|p| p.value)),
            benchmark_yearly,
            benchmark_win_rate,
            comparison_yearly,
            comparison_win_rate,
        });
    }

    let (benchmark_yearly, benchmark_win_rate) = split(subject_returns.as_slice(), &bench_returns);
    let (comparison_yearly, comparison_win_rate) = split(subject_returns.as_slice(), &cmp_returns);
    grid.rows.push(MonthlyGridRow {
        label: SINCE_INCEPTION.to_string(),
        months: [None; 12],
        yearly: compound(subject_returns.iter().map(|p| p.value)),
        benchmark_yearly,
        benchmark_win_rate,
        comparison_yearly,
        comparison_win_rate,
    });
    grid
}
