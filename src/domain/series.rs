//! Dated value series.
//!
//! A [`TimeSeries`] holds strictly ascending, unique dates with positive finite
//! values. Return streams can be negative, so they are plain `Vec<Point>`.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub date: NaiveDate,
    pub value: f64,
}

impl Point {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    points: Vec<Point>,
}

impl TimeSeries {
    /// Normalizes raw points: non-finite and non-positive values are dropped,
    /// dates are sorted, and the last value wins for a repeated date.
    pub fn new(points: Vec<Point>) -> Self {
        let deduped: BTreeMap<NaiveDate, f64> = points
            .into_iter()
            .filter(|p| p.value.is_finite() && p.value > 0.0)
            .map(|p| (p.date, p.value))
            .collect();
        let points: Vec<Point> = deduped
            .into_iter()
            .map(|(date, value)| Point { date, value })
            .collect();
        Self::from_sorted(points)
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(pairs.into_iter().map(|(d, v)| Point::new(d, v)).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    // Caller guarantees ascending unique dates and valid values.
    fn from_sorted(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.first().map(|p| p.date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.last().map(|p| p.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Points with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> TimeSeries {
        let points = self
            .points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();
        Self::from_sorted(points)
    }

    /// Simple period-over-period returns, each dated at the later point.
    pub fn pct_change(&self) -> Vec<Point> {
        self.points
            .windows(2)
            .map(|w| Point {
                date: w[1].date,
                value: w[1].value / w[0].value - 1.0,
            })
            .collect()
    }
}

/// Compounds `(1 + r)` over a return stream and subtracts one.
pub fn compound(returns: impl IntoIterator<Item = f64>) -> f64 {
    returns.into_iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Inner-joins several return streams on date. Only dates present in every
/// stream survive; the values are returned in stream order.
pub fn inner_join(streams: &[&[Point]]) -> Vec<(NaiveDate, Vec<f64>)> {
    let Some((head, rest)) = streams.split_first() else {
        return Vec::new();
    };
    let lookups: Vec<HashMap<NaiveDate, f64>> = rest
        .iter()
        .map(|s| s.iter().map(|p| (p.date, p.value)).collect())
        .collect();

    head.iter()
        .filter_map(|p| {
            let mut row = Vec::with_capacity(streams.len());
            row.push(p.value);
            for lookup in &lookups {
                row.push(*lookup.get(&p.date)?);
            }
            Some((p.date, row))
        })
        .collect()
}
