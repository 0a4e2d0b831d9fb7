//! Wide CSV price file adapter.
//!
//! Layout: a `date` column (`%Y-%m-%d`) followed by one close-price column per
//! instrument, benchmark included, one row per bar.

use crate::domain::error::MomtraderError;
use crate::domain::price_table::{RawColumn, RawPrices};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Result<String, MomtraderError> {
        fs::read_to_string(&self.path).map_err(|e| {
            MomtraderError::data(format!("failed to read {}: {}", self.path.display(), e))
        })
    }

    fn header(rdr: &mut csv::Reader<&[u8]>) -> Result<Vec<String>, MomtraderError> {
        let headers = rdr.headers()?;
        match headers.get(0) {
            Some(first) if first.trim().eq_ignore_ascii_case("date") => {}
            _ => return Err(MomtraderError::data("first column must be 'date'")),
        }
        Ok(headers.iter().skip(1).map(|h| h.trim().to_string()).collect())
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        universe: &[String],
        start: Option<NaiveDate>,
    ) -> Result<RawPrices, MomtraderError> {
        let content = self.read()?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let header = Self::header(&mut rdr)?;

        for code in universe {
            if !header.contains(code) {
                return Err(MomtraderError::UnknownColumn {
                    column: code.clone(),
                });
            }
        }

        // (record field index, column name) in file order
        let selected: Vec<(usize, &String)> = header
            .iter()
            .enumerate()
            .filter(|(_, name)| universe.contains(*name))
            .map(|(i, name)| (i + 1, name))
            .collect();

        let mut dates = Vec::new();
        let mut series: Vec<Vec<f64>> = vec![Vec::new(); selected.len()];

        for (row, result) in rdr.records().enumerate() {
            let line = row + 2;
            let record = result?;

            let date_str = record.get(0).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                MomtraderError::data(format!("line {line}, column date: invalid date {date_str:?}: {e}"))
            })?;
            if start.is_some_and(|s| date < s) {
                continue;
            }

            for (slot, &(field, name)) in selected.iter().enumerate() {
                let raw = record.get(field).unwrap_or("").trim();
                let price: f64 = raw.parse().map_err(|_| {
                    MomtraderError::data(format!(
                        "line {line}, column {name}: invalid price {raw:?}"
                    ))
                })?;
                series[slot].push(price);
            }
            dates.push(date);
        }

        if dates.is_empty() {
            return Err(MomtraderError::data(format!(
                "no rows in {} on or after the start date",
                self.path.display()
            )));
        }

        Ok(RawPrices {
            dates,
            columns: selected
                .into_iter()
                .zip(series)
                .map(|((_, name), prices)| RawColumn {
                    name: name.clone(),
                    prices,
                })
                .collect(),
        })
    }

    fn list_instruments(&self) -> Result<Vec<String>, MomtraderError> {
        let content = self.read()?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        Self::header(&mut rdr)
    }
}
