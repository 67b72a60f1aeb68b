//! Domain error types.
//!
//! Data shortfalls are never errors here: they surface as empty series or
//! zero-valued records. Only caller mistakes (bad configuration, bad
//! parameters) and collaborator failures (I/O, database) are reported.

/// Top-level error type for navlens.
#[derive(Debug, thiserror::Error)]
pub enum NavlensError {
    #[error("invalid frequency: {value}")]
    InvalidFrequency { value: String },

    #[error("invalid resample method: {value}")]
    InvalidResampleMethod { value: String },

    #[error("invalid period rule {rule}: {reason}")]
    InvalidPeriodRule { rule: String, reason: String },

    #[error("holding length must be positive, got {length}")]
    InvalidHoldingLength { length: usize },

    #[error("invalid composite index {id}: {reason}")]
    InvalidComposite { id: String, reason: String },

    #[error("unknown index: {id}")]
    UnknownIndex { id: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {id}")]
    NoData { id: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NavlensError {
    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        NavlensError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&NavlensError> for std::process::ExitCode {
    fn from(err: &NavlensError) -> Self {
        let code: u8 = match err {
            NavlensError::Io(_) => 1,
            NavlensError::ConfigParse { .. }
            | NavlensError::ConfigMissing { .. }
            | NavlensError::ConfigInvalid { .. } => 2,
            NavlensError::Database { .. } | NavlensError::DatabaseQuery { .. } => 3,
            NavlensError::InvalidFrequency { .. }
            | NavlensError::InvalidResampleMethod { .. }
            | NavlensError::InvalidPeriodRule { .. }
            | NavlensError::InvalidHoldingLength { .. }
            | NavlensError::InvalidComposite { .. }
            | NavlensError::UnknownIndex { .. } => 4,
            NavlensError::NoData { .. } => 5,
            NavlensError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
