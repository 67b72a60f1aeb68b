//! Rolling holding-period simulation.
//!
//! Every overlapping window of `L` points is an investment bought at the
//! window's first value and sold at its last. Results are full enumerations,
//! never samples.

use crate::domain::error::NavlensError;
use crate::domain::metrics::{max_drawdown_of, sample_std};
use crate::domain::series::TimeSeries;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const DEFAULT_HOLDING_PERIODS: [usize; 5] = [30, 60, 90, 180, 360];

/// How much history a holding length needs before it is simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldingPolicy {
    /// Extra points required beyond the holding length.
    pub buffer: usize,
    /// Buffer applied to the longest configured holding length instead.
    pub relaxed_buffer: usize,
    /// Subject points required before any holding analysis runs.
    pub min_history: usize,
}

impl Default for HoldingPolicy {
    fn default() -> Self {
        Self {
            buffer: 10,
            relaxed_buffer: 5,
            min_history: 100,
        }
    }
}

impl HoldingPolicy {
    pub fn required_points(&self, length: usize, longest: Option<usize>) -> usize {
        if longest == Some(length) {
            length + self.relaxed_buffer
        } else {
            length + self.buffer
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingPeriodRecord {
    pub buy_date: NaiveDate,
    pub sell_date: NaiveDate,
    pub holding_length: usize,
    pub holding_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub days_held: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HoldingPeriodResult {
    pub holding_length: usize,
    pub records: Vec<HoldingPeriodRecord>,
}

impl HoldingPeriodResult {
    pub fn empty(holding_length: usize) -> Self {
        Self {
            holding_length,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn holding_returns(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.holding_return).collect()
    }
}

/// Distribution statistics of holding returns. `mean_sharpe` and
/// `mean_max_drawdown` are only known for full simulations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingPeriodSummary {
    pub subject_id: String,
    pub holding_length: usize,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub win_rate: f64,
    pub mean_sharpe: Option<f64>,
    pub mean_max_drawdown: Option<f64>,
    pub is_valid: bool,
}

impl HoldingPeriodSummary {
    pub fn from_result(subject_id: &str, result: &HoldingPeriodResult) -> Self {
        let mut summary =
            Self::from_returns(subject_id, result.holding_length, &result.holding_returns());
        if !result.is_empty() {
            let n = result.len() as f64;
            summary.mean_sharpe =
                Some(result.records.iter().map(|r| r.sharpe_ratio).sum::<f64>() / n);
            summary.mean_max_drawdown =
                Some(result.records.iter().map(|r| r.max_drawdown).sum::<f64>() / n);
        }
        summary
    }

    pub fn from_returns(subject_id: &str, holding_length: usize, returns: &[f64]) -> Self {
        let count = returns.len();
        if count == 0 {
            return Self {
                subject_id: subject_id.to_string(),
                holding_length,
                count: 0,
                mean: 0.0,
                median: 0.0,
                std: 0.0,
                min: 0.0,
                max: 0.0,
                win_rate: 0.0,
                mean_sharpe: None,
                mean_max_drawdown: None,
                is_valid: false,
            };
        }

        let mut sorted = returns.to_vec();
        sorted.sort_by(f64::total_cmp);
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };
        let wins = returns.iter().filter(|&&r| r > 0.0).count();

        Self {
            subject_id: subject_id.to_string(),
            holding_length,
            count,
            mean: returns.iter().sum::<f64>() / count as f64,
            median,
            std: sample_std(returns),
            min: sorted[0],
            max: sorted[count - 1],
            win_rate: wins as f64 / count as f64,
            mean_sharpe: None,
            mean_max_drawdown: None,
            is_valid: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingSimulator {
    pub risk_free_rate: f64,
    pub trading_days: f64,
    pub policy: HoldingPolicy,
}

impl Default for HoldingSimulator {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            trading_days: 252.0,
            policy: HoldingPolicy::default(),
        }
    }
}

impl HoldingSimulator {
    pub fn new(risk_free_rate: f64, trading_days: f64, policy: HoldingPolicy) -> Self {
        Self {
            risk_free_rate,
            trading_days,
            policy,
        }
    }

    /// Simulates every window of `holding_length` points. An empty result
    /// when the series is shorter than `holding_length + buffer`.
    pub fn simulate(
        &self,
        series: &TimeSeries,
        holding_length: usize,
    ) -> Result<HoldingPeriodResult, NavlensError> {
        check_length(holding_length)?;
        let required = self.policy.required_points(holding_length, None);
        Ok(self.simulate_windows(series, holding_length, required))
    }

    /// Simulates each length independently. The longest length gets the
    /// relaxed buffer; lengths without output are left out of the map.
    pub fn simulate_many(
        &self,
        series: &TimeSeries,
        lengths: &[usize],
    ) -> Result<BTreeMap<usize, HoldingPeriodResult>, NavlensError> {
        for &length in lengths {
            check_length(length)?;
        }
        let longest = lengths.iter().copied().max();

        let results: Vec<HoldingPeriodResult> = lengths
            .par_iter()
            .map(|&length| {
                let required = self.policy.required_points(length, longest);
                self.simulate_windows(series, length, required)
            })
            .collect();

        Ok(results
            .into_iter()
            .filter(|r| !r.is_empty())
            .map(|r| (r.holding_length, r))
            .collect())
    }

    /// Holding returns only, for use as a comparison distribution.
    pub fn benchmark_returns(
        &self,
        series: &TimeSeries,
        holding_length: usize,
    ) -> Result<Vec<f64>, NavlensError> {
        check_length(holding_length)?;
        let values = series.values();
        if values.len() < self.policy.required_points(holding_length, None) {
            return Ok(Vec::new());
        }
        Ok(values
            .iter()
            .zip(&values[holding_length..])
            .map(|(buy, sell)| sell / buy - 1.0)
            .collect())
    }

    fn simulate_windows(
        &self,
        series: &TimeSeries,
        holding_length: usize,
        required: usize,
    ) -> HoldingPeriodResult {
        let n = series.len();
        if n < required {
            warn!(
                holding_length,
                required,
                available = n,
                "insufficient data for holding period"
            );
            return HoldingPeriodResult::empty(holding_length);
        }

        let points = series.points();
        let values = series.values();
        let records = (0..n - holding_length)
            .map(|i| {
                let window = &values[i..=i + holding_length];
                let buy = &points[i];
                let sell = &points[i + holding_length];
                self.window_record(window, buy.date, sell.date, holding_length)
            })
            .collect::<Vec<_>>();

        debug!(holding_length, windows = records.len(), "holding period simulated");
        HoldingPeriodResult {
            holding_length,
            records,
        }
    }

    fn window_record(
        &self,
        window: &[f64],
        buy_date: NaiveDate,
        sell_date: NaiveDate,
        holding_length: usize,
    ) -> HoldingPeriodRecord {
        let first = window[0];
        let last = window[window.len() - 1];
        let holding_return = last / first - 1.0;
        let days_held = (sell_date - buy_date).num_days();

        let annual_return = if days_held > 0 {
            (1.0 + holding_return).powf(self.trading_days / days_held as f64) - 1.0
        } else {
            0.0
        };

        let returns: Vec<f64> = window.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let (annual_volatility, sharpe_ratio) = if returns.len() > 1 {
            let vol = sample_std(&returns) * self.trading_days.sqrt();
            let hurdle = self.risk_free_rate * holding_length as f64 / self.trading_days;
            let sharpe = if vol > 0.0 {
                (annual_return - hurdle) / vol
            } else {
                0.0
            };
            (vol, sharpe)
        } else {
            (0.0, 0.0)
        };

        let (max_drawdown, _, _) = max_drawdown_of(window);

        HoldingPeriodRecord {
            buy_date,
            sell_date,
            holding_length,
            holding_return,
            annual_return,
            annual_volatility,
            max_drawdown,
            sharpe_ratio,
            days_held,
        }
    }

    /// Simulates a subject and summarizes it next to each benchmark's
    /// holding-return distribution.
    pub fn analyze(
        &self,
        subject_id: &str,
        series: &TimeSeries,
        lengths: &[usize],
        benchmarks: &[(String, TimeSeries)],
    ) -> Result<HoldingAnalysis, NavlensError> {
        for &length in lengths {
            check_length(length)?;
        }
        let mut analysis = HoldingAnalysis::empty(subject_id);
        if series.len() < self.policy.min_history {
            warn!(
                subject = subject_id,
                points = series.len(),
                min_history = self.policy.min_history,
                "insufficient history for holding analysis"
            );
            return Ok(analysis);
        }

        let results = self.simulate_many(series, lengths)?;
        for (length, result) in &results {
            info!(
                subject = subject_id,
                holding_length = length,
                windows = result.len(),
                "simulated"
            );
            analysis
                .subject
                .insert(*length, HoldingPeriodSummary::from_result(subject_id, result));
        }

        for (benchmark_id, benchmark) in benchmarks {
            let mut per_length = BTreeMap::new();
            for &length in results.keys() {
                let returns = self.benchmark_returns(benchmark, length)?;
                if returns.is_empty() {
                    debug!(
                        benchmark = %benchmark_id,
                        holding_length = length,
                        "no benchmark distribution"
                    );
                    continue;
                }
                per_length.insert(
                    length,
                    HoldingPeriodSummary::from_returns(benchmark_id, length, &returns),
                );
            }
            analysis.benchmarks.insert(benchmark_id.clone(), per_length);
        }

        analysis.results = results;
        Ok(analysis)
    }
}

fn check_length(holding_length: usize) -> Result<(), NavlensError> {
    if holding_length == 0 {
        return Err(NavlensError::InvalidHoldingLength {
            length: holding_length,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HoldingAnalysis {
    pub subject_id: String,
    pub results: BTreeMap<usize, HoldingPeriodResult>,
    pub subject: BTreeMap<usize, HoldingPeriodSummary>,
    pub benchmarks: BTreeMap<String, BTreeMap<usize, HoldingPeriodSummary>>,
}

impl HoldingAnalysis {
    pub fn empty(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Subject summaries followed by benchmark summaries, each ordered by
    /// holding length.
    pub fn summaries(&self) -> Vec<HoldingPeriodSummary> {
        self.subject
            .values()
            .chain(self.benchmarks.values().flat_map(|m| m.values()))
            .cloned()
            .collect()
    }

    pub fn records(&self) -> Vec<HoldingPeriodRecord> {
        self.results
            .values()
            .flat_map(|r| r.records.iter().cloned())
            .collect()
    }
}
