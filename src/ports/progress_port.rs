//! Progress event port for verbose engine runs.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressAction {
    Buy,
    Sell,
    CloseOut,
}

impl std::fmt::Display for ProgressAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressAction::Buy => write!(f, "buying"),
            ProgressAction::Sell => write!(f, "selling"),
            ProgressAction::CloseOut => write!(f, "inventory"),
        }
    }
}

/// One order's outcome as seen by an observer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub date: NaiveDate,
    pub column: String,
    pub action: ProgressAction,
    pub units: i64,
    pub price: f64,
    pub balance: f64,
    pub net_wealth: f64,
}

pub trait ProgressPort {
    fn emit(&self, event: &ProgressEvent);
}
