//! Trade book export port trait.

use crate::domain::error::MomtraderError;
use crate::domain::trade_book::TradeBook;
use std::path::Path;

/// Port for writing a finished trade book.
pub trait ReportPort {
    fn write(&self, book: &TradeBook, output_path: &Path) -> Result<(), MomtraderError>;
}
