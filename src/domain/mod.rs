//! Core domain types and logic.

pub mod error;
pub mod price_table;
pub mod execution;
pub mod portfolio;
pub mod backtest;
pub mod momentum;
pub mod trade_book;
pub mod position_tracker;
pub mod universe;
pub mod config_validation;
