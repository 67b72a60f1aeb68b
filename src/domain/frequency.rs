//! Sampling frequencies, annualization factors and period-end rules.

use crate::domain::error::NavlensError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = NavlensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            "quarterly" | "q" => Ok(Frequency::Quarterly),
            "yearly" | "annual" | "y" | "a" => Ok(Frequency::Yearly),
            _ => Err(NavlensError::InvalidFrequency {
                value: s.to_string(),
            }),
        }
    }
}

/// Periods per year for each frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnualizationFactors {
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
    pub quarterly: f64,
    pub yearly: f64,
}

impl Default for AnnualizationFactors {
    fn default() -> Self {
        Self {
            daily: 252.0,
            weekly: 52.0,
            monthly: 12.0,
            quarterly: 4.0,
            yearly: 1.0,
        }
    }
}

impl AnnualizationFactors {
    pub fn factor(&self, frequency: Frequency) -> f64 {
        match frequency {
            Frequency::Daily => self.daily,
            Frequency::Weekly => self.weekly,
            Frequency::Monthly => self.monthly,
            Frequency::Quarterly => self.quarterly,
            Frequency::Yearly => self.yearly,
        }
    }
}

/// Month-end convention for monthly buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MonthEnd {
    /// Last calendar day of the month.
    #[default]
    Calendar,
    /// Last weekday of the month.
    Business,
}

impl FromStr for MonthEnd {
    type Err = NavlensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "" | "M" | "ME" => Ok(MonthEnd::Calendar),
            "BM" | "BME" => Ok(MonthEnd::Business),
            other => Err(NavlensError::InvalidPeriodRule {
                rule: other.to_string(),
                reason: "expected ME, M, BME or BM".into(),
            }),
        }
    }
}

/// Accepts `FRI`, `friday` or `5` (Monday = 1).
pub fn parse_weekday(s: &str) -> Result<Weekday, NavlensError> {
    let weekday = match s.trim().to_lowercase().as_str() {
        "mon" | "monday" | "1" => Weekday::Mon,
        "tue" | "tuesday" | "2" => Weekday::Tue,
        "wed" | "wednesday" | "3" => Weekday::Wed,
        "thu" | "thursday" | "4" => Weekday::Thu,
        "fri" | "friday" | "5" => Weekday::Fri,
        "sat" | "saturday" | "6" => Weekday::Sat,
        "sun" | "sunday" | "7" => Weekday::Sun,
        other => {
            return Err(NavlensError::InvalidPeriodRule {
                rule: other.to_string(),
                reason: "unrecognised week-ending day".into(),
            });
        }
    };
    Ok(weekday)
}

/// Where each frequency's periods end. Resolved once from configuration and
/// passed to every resampling call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodRules {
    pub week_end: Weekday,
    pub month_end: MonthEnd,
    pub quarter_end_month: u32,
    pub year_end_month: u32,
}

impl Default for PeriodRules {
    fn default() -> Self {
        Self {
            week_end: Weekday::Fri,
            month_end: MonthEnd::Calendar,
            quarter_end_month: 12,
            year_end_month: 12,
        }
    }
}

impl PeriodRules {
    pub fn new(
        week_end: Weekday,
        month_end: MonthEnd,
        quarter_end_month: u32,
        year_end_month: u32,
    ) -> Result<Self, NavlensError> {
        for (name, month) in [
            ("quarter_end_month", quarter_end_month),
            ("year_end_month", year_end_month),
        ] {
            if !(1..=12).contains(&month) {
                return Err(NavlensError::InvalidPeriodRule {
                    rule: format!("{name}={month}"),
                    reason: "month must be between 1 and 12".into(),
                });
            }
        }
        Ok(Self {
            week_end,
            month_end,
            quarter_end_month,
            year_end_month,
        })
    }

    /// The label of the period containing `date`: the period's end date.
    pub fn period_end(&self, frequency: Frequency, date: NaiveDate) -> NaiveDate {
        match frequency {
            Frequency::Daily => date,
            Frequency::Weekly => {
                let target = self.week_end.num_days_from_monday() as i64;
                let current = date.weekday().num_days_from_monday() as i64;
                date + Duration::days((target - current).rem_euclid(7))
            }
            Frequency::Monthly => match self.month_end {
                MonthEnd::Calendar => last_day_of_month(date.year(), date.month()),
                MonthEnd::Business => {
                    let this_month = last_business_day(date.year(), date.month());
                    if date <= this_month {
                        this_month
                    } else {
                        let (y, m) = add_months(date.year(), date.month(), 1);
                        last_business_day(y, m)
                    }
                }
            },
            Frequency::Quarterly => {
                let offset = (self.quarter_end_month as i32 - date.month() as i32).rem_euclid(3);
                let (y, m) = add_months(date.year(), date.month(), offset as u32);
                last_day_of_month(y, m)
            }
            Frequency::Yearly => {
                let offset = (self.year_end_month as i32 - date.month() as i32).rem_euclid(12);
                let (y, m) = add_months(date.year(), date.month(), offset as u32);
                last_day_of_month(y, m)
            }
        }
    }
}

fn add_months(year: i32, month: u32, months: u32) -> (i32, u32) {
    let zero_based = month - 1 + months;
    (year + (zero_based / 12) as i32, zero_based % 12 + 1)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (y, m) = add_months(year, month, 1);
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn last_business_day(year: i32, month: u32) -> NaiveDate {
    let mut day = last_day_of_month(year, month);
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day = day - Duration::days(1);
    }
    day
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_frequency_tags() {
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!("y".parse::<Frequency>().unwrap(), Frequency::Yearly);
        assert!(matches!(
            "fortnightly".parse::<Frequency>(),
            Err(NavlensError::InvalidFrequency { .. })
        ));
    }

    #[test]
    fn default_factors() {
        let f = AnnualizationFactors::default();
        assert_eq!(f.factor(Frequency::Daily), 252.0);
        assert_eq!(f.factor(Frequency::Weekly), 52.0);
        assert_eq!(f.factor(Frequency::Monthly), 12.0);
        assert_eq!(f.factor(Frequency::Quarterly), 4.0);
        assert_eq!(f.factor(Frequency::Yearly), 1.0);
    }

    #[test]
    fn weekday_aliases() {
        assert_eq!(parse_weekday("FRI").unwrap(), Weekday::Fri);
        assert_eq!(parse_weekday("monday").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("7").unwrap(), Weekday::Sun);
        assert!(parse_weekday("funday").is_err());
    }

    #[test]
    fn month_end_aliases() {
        assert_eq!("m".parse::<MonthEnd>().unwrap(), MonthEnd::Calendar);
        assert_eq!("BME".parse::<MonthEnd>().unwrap(), MonthEnd::Business);
        assert!("QS".parse::<MonthEnd>().is_err());
    }

    #[test]
    fn rejects_out_of_range_months() {
        assert!(PeriodRules::new(Weekday::Fri, MonthEnd::Calendar, 13, 12).is_err());
        assert!(PeriodRules::new(Weekday::Fri, MonthEnd::Calendar, 3, 0).is_err());
    }

    #[test]
    fn weekly_rolls_forward_to_week_end() {
        let rules = PeriodRules::default();
        // 2024-01-01 is a Monday; the Friday is the 5th.
        assert_eq!(rules.period_end(Frequency::Weekly, d(2024, 1, 1)), d(2024, 1, 5));
        assert_eq!(rules.period_end(Frequency::Weekly, d(2024, 1, 5)), d(2024, 1, 5));
        assert_eq!(rules.period_end(Frequency::Weekly, d(2024, 1, 6)), d(2024, 1, 12));
    }

    #[test]
    fn monthly_calendar_and_business() {
        let mut rules = PeriodRules::default();
        assert_eq!(rules.period_end(Frequency::Monthly, d(2024, 2, 10)), d(2024, 2, 29));
        rules.month_end = MonthEnd::Business;
        // 2024-03-31 is a Sunday, last business day is Friday the 29th.
        assert_eq!(rules.period_end(Frequency::Monthly, d(2024, 3, 15)), d(2024, 3, 29));
        assert_eq!(rules.period_end(Frequency::Monthly, d(2024, 3, 30)), d(2024, 4, 30));
    }

    #[test]
    fn quarterly_and_yearly_respect_end_month() {
        let rules = PeriodRules::default();
        assert_eq!(rules.period_end(Frequency::Quarterly, d(2024, 2, 1)), d(2024, 3, 31));
        assert_eq!(rules.period_end(Frequency::Quarterly, d(2024, 12, 1)), d(2024, 12, 31));
        assert_eq!(rules.period_end(Frequency::Yearly, d(2024, 7, 1)), d(2024, 12, 31));

        let fiscal = PeriodRules::new(Weekday::Fri, MonthEnd::Calendar, 1, 6).unwrap();
        assert_eq!(fiscal.period_end(Frequency::Quarterly, d(2024, 2, 1)), d(2024, 4, 30));
        assert_eq!(fiscal.period_end(Frequency::Quarterly, d(2024, 12, 1)), d(2025, 1, 31));
        assert_eq!(fiscal.period_end(Frequency::Yearly, d(2024, 7, 1)), d(2025, 6, 30));
        assert_eq!(fiscal.period_end(Frequency::Yearly, d(2024, 6, 30)), d(2024, 6, 30));
    }

    #[test]
    fn daily_is_identity() {
        let rules = PeriodRules::default();
        assert_eq!(rules.period_end(Frequency::Daily, d(2024, 5, 4)), d(2024, 5, 4));
    }
}
