//! CSV trade book writer.
//!
//! Columns: `date,STD_YM`, one price column per code, then `p_<code>` phase
//! labels, `r_<code>` realized returns (blank where none) and the running
//! `acc_rtn`.

use crate::domain::error::MomtraderError;
use crate::domain::trade_book::TradeBook;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }

    pub fn write_to<W: Write>(&self, book: &TradeBook, out: W) -> Result<(), MomtraderError> {
        let mut wtr = csv::Writer::from_writer(out);
        let codes = book.codes();

        let mut header = vec!["date".to_string(), "STD_YM".to_string()];
        header.extend(codes.iter().cloned());
        header.extend(codes.iter().map(|c| format!("p_{c}")));
        header.extend(codes.iter().map(|c| format!("r_{c}")));
        header.push("acc_rtn".to_string());
        wtr.write_record(&header)?;

        for bar in 0..book.len() {
            let mut record = Vec::with_capacity(header.len());
            record.push(book.dates()[bar].format("%Y-%m-%d").to_string());
            record.push(book.std_ym(bar).to_string());
            for i in 0..codes.len() {
                record.push(book.price(bar, i).to_string());
            }
            for (i, code) in codes.iter().enumerate() {
                record.push(book.phase(bar, i).label(code));
            }
            for i in 0..codes.len() {
                record.push(
                    book.realized_return(bar, i)
                        .map(|r| r.to_string())
                        .unwrap_or_default(),
                );
            }
            record.push(book.acc_rtn()[bar].to_string());
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, book: &TradeBook, output_path: &Path) -> Result<(), MomtraderError> {
        let file = std::fs::File::create(output_path)?;
        self.write_to(book, file)
    }
}
