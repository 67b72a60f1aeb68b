//! Analysis configuration.
//!
//! Reads and validates every analysis parameter once, before any series is
//! loaded. Each failure names its section and key.

use crate::domain::error::NavlensError;
use crate::domain::frequency::{
    AnnualizationFactors, Frequency, MonthEnd, PeriodRules, parse_weekday,
};
use crate::domain::holding::{DEFAULT_HOLDING_PERIODS, HoldingPolicy, HoldingSimulator};
use crate::domain::metrics::{FrequencyMode, MetricsCache, PerformanceCalculator};
use crate::domain::resample::{ResampleMethod, Resampler};
use crate::ports::config_port::ConfigPort;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
    #[default]
    Csv,
    Sqlite,
    Postgres,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Csv => f.write_str("csv"),
            DataSource::Sqlite => f.write_str("sqlite"),
            DataSource::Postgres => f.write_str("postgres"),
        }
    }
}

impl FromStr for DataSource {
    type Err = NavlensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(DataSource::Csv),
            "sqlite" => Ok(DataSource::Sqlite),
            "postgres" | "postgresql" => Ok(DataSource::Postgres),
            other => Err(NavlensError::config_invalid(
                "data",
                "source",
                format!("unknown data source {other:?}, expected csv, sqlite or postgres"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub risk_free_rate: f64,
    pub return_frequency: Frequency,
    pub risk_frequency: Frequency,
    pub resample_method: ResampleMethod,
    pub holding_periods: Vec<usize>,
    pub holding_policy: HoldingPolicy,
    pub trading_days: f64,
    pub factors: AnnualizationFactors,
    pub period_rules: PeriodRules,
    pub data_source: DataSource,
    pub csv_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            return_frequency: Frequency::Daily,
            risk_frequency: Frequency::Weekly,
            resample_method: ResampleMethod::Last,
            holding_periods: DEFAULT_HOLDING_PERIODS.to_vec(),
            holding_policy: HoldingPolicy::default(),
            trading_days: 252.0,
            factors: AnnualizationFactors::default(),
            period_rules: PeriodRules::default(),
            data_source: DataSource::Csv,
            csv_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("reports"),
        }
    }
}

/// Parses `section.key` with `FromStr`, falling back to `default` when the
/// key is absent.
fn parse_key<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, NavlensError>
where
    T: FromStr,
{
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            NavlensError::config_invalid(section, key, format!("cannot parse {raw:?}"))
        }),
    }
}

/// Like [`parse_key`], but errors from domain parsers are reported against
/// the key they came from.
fn parse_domain<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, NavlensError>
where
    T: FromStr<Err = NavlensError>,
{
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e: NavlensError| NavlensError::config_invalid(section, key, e.to_string())),
    }
}

fn positive(section: &str, key: &str, value: f64) -> Result<f64, NavlensError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(NavlensError::config_invalid(
            section,
            key,
            format!("{key} must be positive"),
        ));
    }
    Ok(value)
}

/// Parses `30,60,90`. Lengths must be positive integers.
pub fn parse_holding_periods(input: &str) -> Result<Vec<usize>, NavlensError> {
    let mut periods = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        let length: usize = token.parse().map_err(|_| {
            NavlensError::config_invalid(
                "analysis",
                "holding_periods",
                format!("invalid length {token:?}"),
            )
        })?;
        if length == 0 {
            return Err(NavlensError::config_invalid(
                "analysis",
                "holding_periods",
                "holding lengths must be positive",
            ));
        }
        if !periods.contains(&length) {
            periods.push(length);
        }
    }
    Ok(periods)
}

impl AnalysisConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, NavlensError> {
        let defaults = AnalysisConfig::default();

        let risk_free_rate =
            parse_key(config, "analysis", "risk_free_rate", defaults.risk_free_rate)?;
        if !(0.0..1.0).contains(&risk_free_rate) {
            return Err(NavlensError::config_invalid(
                "analysis",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }

        let return_frequency =
            parse_domain(config, "analysis", "return_frequency", defaults.return_frequency)?;
        let risk_frequency =
            parse_domain(config, "analysis", "risk_frequency", defaults.risk_frequency)?;
        let resample_method =
            parse_domain(config, "analysis", "resample_method", defaults.resample_method)?;

        let holding_periods = match config.get_string("analysis", "holding_periods") {
            Some(raw) => parse_holding_periods(&raw)?,
            None => defaults.holding_periods,
        };

        let policy = defaults.holding_policy;
        let holding_policy = HoldingPolicy {
            buffer: parse_key(config, "analysis", "holding_buffer", policy.buffer)?,
            relaxed_buffer: parse_key(config, "analysis", "relaxed_buffer", policy.relaxed_buffer)?,
            min_history: parse_key(config, "analysis", "min_history", policy.min_history)?,
        };
        if holding_policy.relaxed_buffer > holding_policy.buffer {
            return Err(NavlensError::config_invalid(
                "analysis",
                "relaxed_buffer",
                "relaxed_buffer must not exceed holding_buffer",
            ));
        }

        let trading_days = positive(
            "analysis",
            "trading_days",
            parse_key(config, "analysis", "trading_days", defaults.trading_days)?,
        )?;

        let factors = read_factors(config)?;
        let period_rules = read_period_rules(config)?;

        let data_source = parse_domain(config, "data", "source", defaults.data_source)?;
        let csv_dir = config
            .get_string("data", "csv_dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.csv_dir);
        let output_dir = config
            .get_string("output", "dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        Ok(Self {
            risk_free_rate,
            return_frequency,
            risk_frequency,
            resample_method,
            holding_periods,
            holding_policy,
            trading_days,
            factors,
            period_rules,
            data_source,
            csv_dir,
            output_dir,
        })
    }

    pub fn frequency_mode(&self) -> FrequencyMode {
        if self.return_frequency == self.risk_frequency {
            FrequencyMode::Single(self.return_frequency)
        } else {
            FrequencyMode::Mixed {
                returns: self.return_frequency,
                risk: self.risk_frequency,
            }
        }
    }

    pub fn resampler(&self) -> Resampler {
        Resampler::new(self.resample_method, self.period_rules)
    }

    pub fn calculator(&self) -> PerformanceCalculator {
        PerformanceCalculator::new(self.risk_free_rate, self.factors, self.resampler())
            .with_cache(Arc::new(MetricsCache::new()))
    }

    pub fn simulator(&self) -> HoldingSimulator {
        HoldingSimulator::new(self.risk_free_rate, self.trading_days, self.holding_policy)
    }
}

fn read_factors(config: &dyn ConfigPort) -> Result<AnnualizationFactors, NavlensError> {
    let d = AnnualizationFactors::default();
    let read = |key: &str, default: f64| -> Result<f64, NavlensError> {
        positive("annualization", key, parse_key(config, "annualization", key, default)?)
    };
    Ok(AnnualizationFactors {
        daily: read("daily", d.daily)?,
        weekly: read("weekly", d.weekly)?,
        monthly: read("monthly", d.monthly)?,
        quarterly: read("quarterly", d.quarterly)?,
        yearly: read("yearly", d.yearly)?,
    })
}

fn read_period_rules(config: &dyn ConfigPort) -> Result<PeriodRules, NavlensError> {
    let d = PeriodRules::default();
    let week_end = match config.get_string("periods", "week_end_day") {
        Some(raw) => parse_weekday(&raw)
            .map_err(|e| NavlensError::config_invalid("periods", "week_end_day", e.to_string()))?,
        None => d.week_end,
    };
    let month_end: MonthEnd = parse_domain(config, "periods", "month_end", d.month_end)?;
    let quarter_end_month = parse_key(config, "periods", "quarter_end_month", d.quarter_end_month)?;
    let year_end_month = parse_key(config, "periods", "year_end_month", d.year_end_month)?;
    PeriodRules::new(week_end, month_end, quarter_end_month, year_end_month)
        .map_err(|e| NavlensError::config_invalid("periods", "end_month", e.to_string()))
}
