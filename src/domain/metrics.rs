//! Performance metrics for value series.
//!
//! The free functions operate on an already-resampled series; the frequency
//! argument only selects the annualization factor. [`PerformanceCalculator`]
//! does the resampling and merges return-class and risk-class metrics that
//! may come from different frequencies.

use crate::domain::frequency::{AnnualizationFactors, Frequency};
use crate::domain::resample::Resampler;
use crate::domain::series::TimeSeries;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const DAYS_PER_YEAR: f64 = 365.25;

/// `S[-1] / S[0] - 1`, or 0 with fewer than two points.
pub fn total_return(series: &TimeSeries) -> f64 {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => last.value / first.value - 1.0,
        _ => 0.0,
    }
}

pub fn annual_return(
    series: &TimeSeries,
    frequency: Frequency,
    factors: &AnnualizationFactors,
) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    // No elapsed calendar time means no annual rate, whatever the frequency.
    let days = match (series.start_date(), series.end_date()) {
        (Some(start), Some(end)) => (end - start).num_days(),
        _ => 0,
    };
    if days <= 0 {
        return 0.0;
    }
    let years = match frequency {
        Frequency::Daily => days as f64 / DAYS_PER_YEAR,
        _ => (series.len() - 1) as f64 / factors.factor(frequency),
    };
    if years <= 0.0 {
        return 0.0;
    }
    annualize(total_return(series), years)
}

fn annualize(total: f64, years: f64) -> f64 {
    let growth = 1.0 + total;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(1.0 / years) - 1.0
}

pub fn annual_volatility(
    series: &TimeSeries,
    frequency: Frequency,
    factors: &AnnualizationFactors,
) -> f64 {
    let returns: Vec<f64> = series.pct_change().iter().map(|p| p.value).collect();
    sample_std(&returns) * factors.factor(frequency).sqrt()
}

/// Sample standard deviation (n - 1); 0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Drawdown {
    /// Non-positive fraction of the running peak.
    pub value: f64,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Deepest fall below the running maximum, with the index of the peak that
/// preceded it and the index of the trough. `(0, None, None)` when the
/// values never fall below their running maximum.
pub fn max_drawdown_of(values: &[f64]) -> (f64, Option<usize>, Option<usize>) {
    let mut peak_idx = 0usize;
    let mut worst = 0.0_f64;
    let mut worst_peak = None;
    let mut worst_trough = None;

    for (i, &v) in values.iter().enumerate() {
        if v > values[peak_idx] {
            peak_idx = i;
        }
        let peak = values[peak_idx];
        if peak > 0.0 {
            let dd = (v - peak) / peak;
            if dd < worst {
                worst = dd;
                worst_peak = Some(peak_idx);
                worst_trough = Some(i);
            }
        }
    }
    (worst, worst_peak, worst_trough)
}

pub fn max_drawdown(series: &TimeSeries) -> Drawdown {
    let points = series.points();
    let values = series.values();
    let (value, start, end) = max_drawdown_of(&values);
    Drawdown {
        value,
        start: start.map(|i| points[i].date),
        end: end.map(|i| points[i].date),
    }
}

pub fn sharpe_ratio(annual_return: f64, annual_volatility: f64, risk_free_rate: f64) -> f64 {
    if annual_volatility == 0.0 {
        return 0.0;
    }
    (annual_return - risk_free_rate) / annual_volatility
}

pub fn calmar_ratio(annual_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown == 0.0 {
        return 0.0;
    }
    annual_return / max_drawdown.abs()
}

/// Which frequencies feed the return-class and risk-class metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyMode {
    Single(Frequency),
    Mixed { returns: Frequency, risk: Frequency },
}

impl Default for FrequencyMode {
    fn default() -> Self {
        FrequencyMode::Mixed {
            returns: Frequency::Daily,
            risk: Frequency::Weekly,
        }
    }
}

impl FrequencyMode {
    pub fn return_frequency(&self) -> Frequency {
        match self {
            FrequencyMode::Single(f) => *f,
            FrequencyMode::Mixed { returns, .. } => *returns,
        }
    }

    pub fn risk_frequency(&self) -> Frequency {
        match self {
            FrequencyMode::Single(f) => *f,
            FrequencyMode::Mixed { risk, .. } => *risk,
        }
    }
}

impl fmt::Display for FrequencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyMode::Single(freq) => write!(f, "{freq}"),
            FrequencyMode::Mixed { returns, risk } => write!(f, "mixed({returns}/{risk})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRecord {
    pub subject_id: String,
    pub return_frequency: String,
    pub risk_frequency: String,
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub max_drawdown: f64,
    pub drawdown_start: Option<NaiveDate>,
    pub drawdown_end: Option<NaiveDate>,
    pub sharpe_ratio: f64,
    pub calmar_ratio: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sample_count: usize,
    /// False when the zero values above mean "not enough data".
    pub is_valid: bool,
}

impl PerformanceRecord {
    pub fn empty(subject_id: &str, mode: FrequencyMode) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            return_frequency: mode.return_frequency().to_string(),
            risk_frequency: mode.risk_frequency().to_string(),
            total_return: 0.0,
            annual_return: 0.0,
            annual_volatility: 0.0,
            max_drawdown: 0.0,
            drawdown_start: None,
            drawdown_end: None,
            sharpe_ratio: 0.0,
            calmar_ratio: 0.0,
            start_date: None,
            end_date: None,
            sample_count: 0,
            is_valid: false,
        }
    }
}

/// Every metric at a single frequency.
#[derive(Debug, Clone, PartialEq)]
struct FrequencyMetrics {
    total_return: f64,
    annual_return: f64,
    annual_volatility: f64,
    drawdown: Drawdown,
    sharpe_ratio: f64,
    calmar_ratio: f64,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub subject_id: String,
    pub mode: FrequencyMode,
    pub resampler: Resampler,
    pub risk_free_bits: u64,
    /// Periods per year, daily through yearly.
    pub factor_bits: [u64; 5],
}

/// Memoized records keyed by subject and computation parameters. Entries
/// never expire; series are assumed immutable for the cache's lifetime.
#[derive(Debug, Default)]
pub struct MetricsCache {
    entries: Mutex<HashMap<CacheKey, PerformanceRecord>>,
}

impl MetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<PerformanceRecord> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, record: PerformanceRecord) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, record);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceCalculator {
    pub risk_free_rate: f64,
    pub factors: AnnualizationFactors,
    pub resampler: Resampler,
    cache: Option<Arc<MetricsCache>>,
}

impl PerformanceCalculator {
    pub fn new(risk_free_rate: f64, factors: AnnualizationFactors, resampler: Resampler) -> Self {
        Self {
            risk_free_rate,
            factors,
            resampler,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<MetricsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<MetricsCache>> {
        self.cache.as_ref()
    }

    fn cache_key(&self, subject_id: &str, mode: FrequencyMode) -> CacheKey {
        CacheKey {
            subject_id: subject_id.to_string(),
            mode,
            resampler: self.resampler,
            risk_free_bits: self.risk_free_rate.to_bits(),
            factor_bits: Frequency::ALL.map(|f| self.factors.factor(f).to_bits()),
        }
    }

    /// Computes a record for a daily `series`. Return-class metrics come
    /// from the mode's return frequency and risk-class metrics (volatility,
    /// drawdown, Sharpe, Calmar) from its risk frequency.
    pub fn evaluate(
        &self,
        subject_id: &str,
        series: &TimeSeries,
        mode: FrequencyMode,
    ) -> PerformanceRecord {
        let key = self.cache_key(subject_id, mode);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                debug!(subject = subject_id, %mode, "metrics cache hit");
                return hit;
            }
        }

        let record = self.compute(subject_id, series, mode);
        if let Some(cache) = &self.cache {
            cache.insert(key, record.clone());
        }
        record
    }

    fn compute(
        &self,
        subject_id: &str,
        series: &TimeSeries,
        mode: FrequencyMode,
    ) -> PerformanceRecord {
        let return_freq = mode.return_frequency();
        let risk_freq = mode.risk_frequency();

        let Some(returns) = self.metrics_at(series, return_freq) else {
            warn!(
                subject = subject_id,
                frequency = %return_freq,
                points = series.len(),
                "insufficient data after resampling"
            );
            return PerformanceRecord::empty(subject_id, mode);
        };
        let risk = if risk_freq == return_freq {
            returns.clone()
        } else {
            match self.metrics_at(series, risk_freq) {
                Some(m) => m,
                None => {
                    warn!(
                        subject = subject_id,
                        frequency = %risk_freq,
                        points = series.len(),
                        "insufficient data after resampling"
                    );
                    return PerformanceRecord::empty(subject_id, mode);
                }
            }
        };

        PerformanceRecord {
            subject_id: subject_id.to_string(),
            return_frequency: return_freq.to_string(),
            risk_frequency: risk_freq.to_string(),
            total_return: returns.total_return,
            annual_return: returns.annual_return,
            annual_volatility: risk.annual_volatility,
            max_drawdown: risk.drawdown.value,
            drawdown_start: risk.drawdown.start,
            drawdown_end: risk.drawdown.end,
            sharpe_ratio: risk.sharpe_ratio,
            calmar_ratio: risk.calmar_ratio,
            start_date: returns.start_date,
            end_date: returns.end_date,
            sample_count: returns.sample_count,
            is_valid: true,
        }
    }

    fn metrics_at(&self, series: &TimeSeries, frequency: Frequency) -> Option<FrequencyMetrics> {
        let resampled = self.resampler.resample(series, frequency);
        if resampled.len() < 2 {
            return None;
        }
        let annual_ret = annual_return(&resampled, frequency, &self.factors);
        let annual_vol = annual_volatility(&resampled, frequency, &self.factors);
        let drawdown = max_drawdown(&resampled);
        Some(FrequencyMetrics {
            total_return: total_return(&resampled),
            annual_return: annual_ret,
            annual_volatility: annual_vol,
            drawdown,
            sharpe_ratio: sharpe_ratio(annual_ret, annual_vol, self.risk_free_rate),
            calmar_ratio: calmar_ratio(annual_ret, drawdown.value),
            start_date: resampled.start_date(),
            end_date: resampled.end_date(),
            sample_count: resampled.len(),
        })
    }

    /// One single-frequency record per frequency, daily through yearly.
    pub fn evaluate_all_frequencies(
        &self,
        subject_id: &str,
        series: &TimeSeries,
    ) -> Vec<PerformanceRecord> {
        Frequency::ALL
            .iter()
            .map(|&f| self.evaluate(subject_id, series, FrequencyMode::Single(f)))
            .collect()
    }

    /// Evaluates independent subjects in parallel; output order follows input.
    pub fn evaluate_batch(
        &self,
        subjects: &[(String, TimeSeries)],
        mode: FrequencyMode,
    ) -> Vec<PerformanceRecord> {
        subjects
            .par_iter()
            .map(|(id, series)| self.evaluate(id, series, mode))
            .collect()
    }
}
