//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for momtrader.
#[derive(Debug, thiserror::Error)]
pub enum MomtraderError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("bar {bar} out of range (table has {len} bars)")]
    IndexOutOfRange { bar: usize, len: usize },

    #[error("unknown instrument column: {column}")]
    UnknownColumn { column: String },

    #[error("invalid price {price} for {column} at bar {bar} ({date})")]
    InvalidPrice {
        bar: usize,
        column: String,
        date: NaiveDate,
        price: f64,
    },

    #[error("invalid order: {reason}")]
    Order { reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MomtraderError {
    pub fn data(reason: impl Into<String>) -> Self {
        MomtraderError::Data {
            reason: reason.into(),
        }
    }
}

impl From<csv::Error> for MomtraderError {
    fn from(err: csv::Error) -> Self {
        MomtraderError::data(format!("CSV error: {err}"))
    }
}

impl From<&MomtraderError> for std::process::ExitCode {
    fn from(err: &MomtraderError) -> Self {
        let code: u8 = match err {
            MomtraderError::Io(_) => 1,
            MomtraderError::ConfigParse { .. }
            | MomtraderError::ConfigMissing { .. }
            | MomtraderError::ConfigInvalid { .. } => 2,
            MomtraderError::Data { .. } => 3,
            MomtraderError::InvalidPrice { .. } | MomtraderError::Order { .. } => 4,
            MomtraderError::IndexOutOfRange { .. } | MomtraderError::UnknownColumn { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
