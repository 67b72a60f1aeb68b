//! Synthetic benchmark indices built from weighted component returns.

use crate::domain::error::NavlensError;
use crate::domain::series::{inner_join, Point, TimeSeries};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeComponent {
    pub component_id: String,
    pub weight: f64,
    pub description: Option<String>,
}

impl CompositeComponent {
    pub fn new(component_id: impl Into<String>, weight: f64) -> Self {
        Self {
            component_id: component_id.into(),
            weight,
            description: None,
        }
    }
}

/// Static composite definition. Weights need not sum to one; they are
/// normalized over whichever components actually contribute returns.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeIndexSpec {
    id: String,
    components: Vec<CompositeComponent>,
}

impl CompositeIndexSpec {
    pub fn new(
        id: impl Into<String>,
        components: Vec<CompositeComponent>,
    ) -> Result<Self, NavlensError> {
        let id = id.into();
        for c in &components {
            if c.component_id.trim().is_empty() {
                return Err(NavlensError::InvalidComposite {
                    id,
                    reason: "component with empty identifier".into(),
                });
            }
            if !c.weight.is_finite() || c.weight < 0.0 {
                return Err(NavlensError::InvalidComposite {
                    id,
                    reason: format!(
                        "weight for {} must be finite and non-negative",
                        c.component_id
                    ),
                });
            }
        }
        if !components.iter().any(|c| c.weight > 0.0) {
            return Err(NavlensError::InvalidComposite {
                id,
                reason: "no component has a non-zero weight".into(),
            });
        }
        Ok(Self { id, components })
    }

    /// Parses `"000933:0.8, 000012:0.2"`.
    pub fn parse(id: impl Into<String>, input: &str) -> Result<Self, NavlensError> {
        let id = id.into();
        let mut components = Vec::new();
        for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (code, weight) = token.rsplit_once(':').ok_or_else(|| {
                NavlensError::InvalidComposite {
                    id: id.clone(),
                    reason: format!("expected CODE:WEIGHT, got {token:?}"),
                }
            })?;
            let weight: f64 = weight.trim().parse().map_err(|_| NavlensError::InvalidComposite {
                id: id.clone(),
                reason: format!("invalid weight in {token:?}"),
            })?;
            components.push(CompositeComponent::new(code.trim(), weight));
        }
        Self::new(id, components)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn components(&self) -> &[CompositeComponent] {
        &self.components
    }

    /// Components that can contribute, in declaration order.
    pub fn weighted_components(&self) -> impl Iterator<Item = &CompositeComponent> {
        self.components.iter().filter(|c| c.weight != 0.0)
    }
}

/// Builds a composite value series from `(component series, weight)` pairs.
///
/// Components with zero weight or fewer than two points are ignored. Only
/// dates on which every remaining component has a return survive; the
/// surviving weights are rescaled to sum to one. The result starts at 1.0 on
/// the latest component observation preceding the first common return date.
pub fn build(components: &[(&TimeSeries, f64)]) -> TimeSeries {
    let contributing: Vec<(Vec<Point>, f64)> = components
        .iter()
        .filter(|(_, w)| *w != 0.0 && w.is_finite())
        .map(|(s, w)| (s.pct_change(), *w))
        .filter(|(r, _)| !r.is_empty())
        .collect();
    if contributing.is_empty() {
        return TimeSeries::empty();
    }

    let weight_sum: f64 = contributing.iter().map(|(_, w)| w).sum();
    if weight_sum == 0.0 {
        return TimeSeries::empty();
    }
    let weights: Vec<f64> = contributing.iter().map(|(_, w)| w / weight_sum).collect();

    let streams: Vec<&[Point]> = contributing.iter().map(|(r, _)| r.as_slice()).collect();
    let joined = inner_join(&streams);
    let Some((first_date, _)) = joined.first() else {
        return TimeSeries::empty();
    };

    let Some(anchor) = anchor_date(components, *first_date) else {
        return TimeSeries::empty();
    };

    let mut level = 1.0;
    let mut points = Vec::with_capacity(joined.len() + 1);
    points.push(Point::new(anchor, level));
    for (date, returns) in &joined {
        let blended: f64 = returns.iter().zip(&weights).map(|(r, w)| r * w).sum();
        level *= 1.0 + blended;
        points.push(Point::new(*date, level));
    }
    TimeSeries::new(points)
}

// Latest observation strictly before `first` across the contributing
// components.
fn anchor_date(components: &[(&TimeSeries, f64)], first: NaiveDate) -> Option<NaiveDate> {
    components
        .iter()
        .filter(|(s, w)| *w != 0.0 && w.is_finite() && s.len() >= 2)
        .filter_map(|(s, _)| s.points().iter().rev().find(|p| p.date < first).map(|p| p.date))
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(values: &[(u32, f64)]) -> TimeSeries {
        TimeSeries::from_pairs(values.iter().map(|&(day, v)| (d(2024, 1, day), v)))
    }

    #[test]
    fn spec_rejects_all_zero_weights() {
        let err = CompositeIndexSpec::new(
            "X",
            vec![CompositeComponent::new("A", 0.0), CompositeComponent::new("B", 0.0)],
        )
        .unwrap_err();
        assert!(matches!(err, NavlensError::InvalidComposite { .. }));
    }

    #[test]
    fn spec_rejects_negative_weight() {
        assert!(CompositeIndexSpec::new("X", vec![CompositeComponent::new("A", -0.5)]).is_err());
    }

    #[test]
    fn spec_parses_component_list() {
        let spec = CompositeIndexSpec::parse("MED", "000933:0.8, 000012:0.2").unwrap();
        assert_eq!(spec.id(), "MED");
        assert_eq!(spec.components().len(), 2);
        assert_eq!(spec.components()[0].component_id, "000933");
        assert!((spec.components()[1].weight - 0.2).abs() < 1e-12);
    }

    #[test]
    fn spec_parse_rejects_missing_weight() {
        assert!(CompositeIndexSpec::parse("MED", "000933").is_err());
        assert!(CompositeIndexSpec::parse("MED", "000933:abc").is_err());
    }

    #[test]
    fn offsetting_components_blend_to_flat() {
        let a = series(&[(1, 1.0), (2, 1.1)]);
        let b = series(&[(1, 1.0), (2, 0.9)]);
        let out = build(&[(&a, 0.5), (&b, 0.5)]);
        assert_eq!(out.dates(), vec![d(2024, 1, 1), d(2024, 1, 2)]);
        for v in out.values() {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn weights_are_normalized() {
        let a = series(&[(1, 1.0), (2, 1.1)]);
        let b = series(&[(1, 1.0), (2, 0.9)]);
        let out = build(&[(&a, 3.0), (&b, 1.0)]);
        // 0.75 * 0.1 + 0.25 * -0.1 = 0.05
        assert!((out.values()[1] - 1.05).abs() < 1e-12);
    }

    #[test]
    fn only_common_dates_survive() {
        let a = series(&[(1, 1.0), (2, 1.1), (3, 1.21), (4, 1.331)]);
        let b = series(&[(1, 1.0), (3, 1.0), (4, 1.0)]);
        let out = build(&[(&a, 0.5), (&b, 0.5)]);
        // b has returns on the 3rd and 4th only.
        assert_eq!(out.dates(), vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]);
        assert!((out.values()[2] - 1.05 * 1.05).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_component_is_ignored() {
        let a = series(&[(1, 1.0), (2, 1.1)]);
        let b = series(&[(5, 1.0), (6, 0.5)]);
        let out = build(&[(&a, 1.0), (&b, 0.0)]);
        assert_eq!(out.len(), 2);
        assert!((out.values()[1] - 1.1).abs() < 1e-12);
    }

    #[test]
    fn empty_when_no_common_dates() {
        let a = series(&[(1, 1.0), (2, 1.1)]);
        let b = series(&[(5, 1.0), (6, 0.5)]);
        assert!(build(&[(&a, 0.5), (&b, 0.5)]).is_empty());
    }

    #[test]
    fn empty_when_nothing_contributes() {
        let a = series(&[(1, 1.0)]);
        assert!(build(&[(&a, 1.0)]).is_empty());
        assert!(build(&[]).is_empty());
        let b = series(&[(1, 1.0), (2, 1.1)]);
        assert!(build(&[(&b, 0.0)]).is_empty());
    }

    #[test]
    fn repeated_builds_are_bit_identical() {
        let a = series(&[(1, 1.0), (2, 1.013), (3, 0.997), (4, 1.021)]);
        let b = series(&[(1, 3.0), (2, 3.1), (3, 3.05), (4, 2.99)]);
        let first = build(&[(&a, 0.7), (&b, 0.3)]);
        let second = build(&[(&a, 0.7), (&b, 0.3)]);
        let bits = |s: &TimeSeries| s.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
    }
}
