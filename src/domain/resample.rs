//! Frequency conversion of daily value series.

use crate::domain::error::NavlensError;
use crate::domain::frequency::{Frequency, PeriodRules};
use crate::domain::series::{Point, TimeSeries};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResampleMethod {
    /// Last observed value in each period.
    #[default]
    Last,
    /// Compound the period's returns and rebuild values from the first
    /// original observation.
    CumReturn,
}

impl fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResampleMethod::Last => f.write_str("last"),
            ResampleMethod::CumReturn => f.write_str("cum_return"),
        }
    }
}

impl FromStr for ResampleMethod {
    type Err = NavlensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last" => Ok(ResampleMethod::Last),
            "cum_return" | "cumreturn" | "cumulative" => Ok(ResampleMethod::CumReturn),
            _ => Err(NavlensError::InvalidResampleMethod {
                value: s.to_string(),
            }),
        }
    }
}

/// Resampling parameters bundled once and reused for every series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resampler {
    pub method: ResampleMethod,
    pub rules: PeriodRules,
}

impl Resampler {
    pub fn new(method: ResampleMethod, rules: PeriodRules) -> Self {
        Self { method, rules }
    }

    pub fn resample(&self, series: &TimeSeries, frequency: Frequency) -> TimeSeries {
        resample(series, frequency, self.method, &self.rules)
    }

    /// Resamples then takes simple period returns.
    pub fn period_returns(&self, series: &TimeSeries, frequency: Frequency) -> Vec<Point> {
        self.resample(series, frequency).pct_change()
    }
}

/// Converts `series` to `frequency`. Output points are dated at their
/// period-end label. Daily is the identity.
pub fn resample(
    series: &TimeSeries,
    frequency: Frequency,
    method: ResampleMethod,
    rules: &PeriodRules,
) -> TimeSeries {
    if series.is_empty() {
        return TimeSeries::empty();
    }
    if frequency == Frequency::Daily {
        return series.clone();
    }

    match method {
        ResampleMethod::Last => {
            let mut out: Vec<Point> = Vec::new();
            for p in series.points() {
                let label = rules.period_end(frequency, p.date);
                match out.last_mut() {
                    Some(last) if last.date == label => last.value = p.value,
                    _ => out.push(Point::new(label, p.value)),
                }
            }
            TimeSeries::new(out)
        }
        ResampleMethod::CumReturn => {
            let returns = series.pct_change();
            if returns.is_empty() {
                return TimeSeries::empty();
            }

            let mut period_growth: Vec<Point> = Vec::new();
            for r in &returns {
                let label = rules.period_end(frequency, r.date);
                match period_growth.last_mut() {
                    Some(last) if last.date == label => last.value *= 1.0 + r.value,
                    _ => period_growth.push(Point::new(label, 1.0 + r.value)),
                }
            }

            let base = series.first().map(|p| p.value).unwrap_or(1.0);
            let mut level = base;
            let points = period_growth
                .into_iter()
                .map(|g| {
                    level *= g.value;
                    Point::new(g.date, level)
                })
                .collect();
            TimeSeries::new(points)
        }
    }
}
