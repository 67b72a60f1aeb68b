//! Subject lists.
//!
//! Parses identifier lists from configuration and loads each subject's
//! series, skipping subjects without usable data instead of failing the run.

use crate::domain::error::NavlensError;
use crate::domain::series::TimeSeries;
use crate::ports::data_port::{DataPort, SeriesKind};
use std::collections::HashSet;
use tracing::{info, warn};

/// Fewest points for which any metric is defined.
pub const MIN_SERIES_POINTS: usize = 2;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UniverseError {
    #[error("empty token in identifier list")]
    EmptyToken,

    #[error("duplicate identifier: {0}")]
    DuplicateCode(String),
}

/// Splits a comma-separated identifier list. Identifiers keep their case.
pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let code = token.trim();
        if code.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(code.to_string()) {
            return Err(UniverseError::DuplicateCode(code.to_string()));
        }
        codes.push(code.to_string());
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientPoints { points: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSubject {
    pub id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedSubjects {
    pub subjects: Vec<(String, TimeSeries)>,
    pub skipped: Vec<SkippedSubject>,
}

/// Fetches every fund in `ids`, in order. Collaborator failures other than
/// missing data abort the load.
pub fn load_subjects(
    data_port: &dyn DataPort,
    ids: &[String],
    min_points: usize,
) -> Result<LoadedSubjects, NavlensError> {
    let mut loaded = LoadedSubjects::default();

    for id in ids {
        let series = match data_port.fetch_series(id, SeriesKind::Fund) {
            Ok(series) => series,
            Err(NavlensError::NoData { .. }) => {
                warn!(subject = %id, "skipping subject: no data found");
                loaded.skipped.push(SkippedSubject {
                    id: id.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        if series.len() < min_points {
            warn!(
                subject = %id,
                points = series.len(),
                minimum = min_points,
                "skipping subject: insufficient data"
            );
            loaded.skipped.push(SkippedSubject {
                id: id.clone(),
                reason: SkipReason::InsufficientPoints {
                    points: series.len(),
                },
            });
            continue;
        }

        info!(subject = %id, points = series.len(), "loaded");
        loaded.subjects.push((id.clone(), series));
    }

    Ok(loaded)
}
