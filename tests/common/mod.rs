#![allow(dead_code)]

use chrono::NaiveDate;
use momtrader::domain::error::MomtraderError;
use momtrader::domain::price_table::{RawColumn, RawPrices};
use momtrader::ports::data_port::DataPort;
use momtrader::ports::progress_port::{ProgressEvent, ProgressPort};
use std::cell::RefCell;

/// In-memory wide price source.
pub struct MockDataPort {
    pub prices: RawPrices,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(prices: RawPrices) -> Self {
        Self {
            prices,
            error: None,
        }
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        universe: &[String],
        start: Option<NaiveDate>,
    ) -> Result<RawPrices, MomtraderError> {
        if let Some(reason) = &self.error {
            return Err(MomtraderError::data(reason.clone()));
        }
        for code in universe {
            if !self.prices.columns.iter().any(|c| &c.name == code) {
                return Err(MomtraderError::UnknownColumn {
                    column: code.clone(),
                });
            }
        }

        let keep: Vec<usize> = (0..self.prices.dates.len())
            .filter(|&i| start.is_none_or(|s| self.prices.dates[i] >= s))
            .collect();
        Ok(RawPrices {
            dates: keep.iter().map(|&i| self.prices.dates[i]).collect(),
            columns: self
                .prices
                .columns
                .iter()
                .filter(|c| universe.contains(&c.name))
                .map(|c| RawColumn {
                    name: c.name.clone(),
                    prices: keep.iter().map(|&i| c.prices[i]).collect(),
                })
                .collect(),
        })
    }

    fn list_instruments(&self) -> Result<Vec<String>, MomtraderError> {
        if let Some(reason) = &self.error {
            return Err(MomtraderError::data(reason.clone()));
        }
        Ok(self.prices.columns.iter().map(|c| c.name.clone()).collect())
    }
}

/// Collects every progress event it is given.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: RefCell<Vec<ProgressEvent>>,
}

impl ProgressPort for RecordingProgress {
    fn emit(&self, event: &ProgressEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Month-start and month-end bars from January to June 2024, with June
/// split over two bars. `A` trends up then dips in May, `B` drifts down then
/// recovers, the benchmark is flat.
pub fn six_month_prices() -> RawPrices {
    let dates = [
        "2024-01-02",
        "2024-01-31",
        "2024-02-01",
        "2024-02-29",
        "2024-03-01",
        "2024-03-29",
        "2024-04-01",
        "2024-04-30",
        "2024-05-02",
        "2024-05-31",
        "2024-06-03",
        "2024-06-28",
    ]
    .iter()
    .map(|s| date(s))
    .collect();

    RawPrices::new(dates)
        .with_column(
            "A",
            vec![10.0, 11.0, 11.0, 12.0, 12.0, 13.0, 13.0, 14.0, 13.0, 12.0, 15.0, 15.0],
        )
        .with_column(
            "B",
            vec![20.0, 19.0, 19.0, 18.0, 18.0, 17.0, 17.0, 16.0, 16.0, 17.0, 17.0, 17.0],
        )
        .with_column("close", vec![100.0; 12])
}

/// Daily calendar dates starting at `start`.
pub fn daily_dates(start: &str, n: usize) -> Vec<NaiveDate> {
    let start = date(start);
    (0..n)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}
