//! Concrete adapter implementations for ports.

pub mod console_progress;
pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
