//! Immutable price table with derived return and momentum columns.
//!
//! For every instrument `i` the table carries:
//!
//! - `acc[t]`      = prod(1 + pct_change[1..=t]) - 1
//! - `log_acc[t]`  = sum(ln(1 + pct_change[1..=t]))
//! - `am[t]`       = price[t] / price[t-1] - 1 (absolute momentum)
//! - `rm[t]`       = am[i][t] - am[benchmark][t] (relative momentum)
//! - `mean_acc[t]` = acc[i][t] - acc[benchmark][t]
//!
//! `rm` and `mean_acc` do not exist for the benchmark itself. Every derived
//! value is 0 at bar 0, and anything non-finite resolves to 0.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use super::error::MomtraderError;

pub const DEFAULT_BENCHMARK: &str = "close";

/// One raw price column as delivered by a data port.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub prices: Vec<f64>,
}

/// Raw, time-aligned price input.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrices {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<RawColumn>,
}

impl RawPrices {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        RawPrices {
            dates,
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, name: &str, prices: Vec<f64>) -> Self {
        self.columns.push(RawColumn {
            name: name.to_string(),
            prices,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentRole {
    Benchmark,
    Constituent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub acc: Vec<f64>,
    pub log_acc: Vec<f64>,
    pub am: Vec<f64>,
    pub rm: Option<Vec<f64>>,
    pub mean_acc: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub role: InstrumentRole,
    pub prices: Vec<f64>,
    pub derived: DerivedSeries,
}

impl Instrument {
    pub fn is_benchmark(&self) -> bool {
        self.role == InstrumentRole::Benchmark
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    instruments: Vec<Instrument>,
    benchmark: usize,
    column_index: HashMap<String, usize>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceTable {
    /// Build the table and all derived columns from raw input.
    ///
    /// The benchmark is derived first; the other columns read its `am` and
    /// `acc` to produce `rm` and `mean_acc`. Column order is preserved.
    pub fn build(raw: RawPrices, benchmark: &str) -> Result<Self, MomtraderError> {
        validate_raw(&raw)?;

        let benchmark_pos = raw
            .columns
            .iter()
            .position(|c| c.name == benchmark)
            .ok_or_else(|| {
                MomtraderError::data(format!("benchmark column '{benchmark}' not found"))
            })?;

        let bench_prices = &raw.columns[benchmark_pos].prices;
        let bench_pct = pct_change(bench_prices);
        let bench_acc = cumulative_return(&bench_pct);
        let bench_am = absolute_momentum(bench_prices);

        let instruments: Vec<Instrument> = raw
            .columns
            .into_iter()
            .enumerate()
            .map(|(idx, col)| {
                let pct = pct_change(&col.prices);
                let acc = cumulative_return(&pct);
                let log_acc = log_cumulative_return(&pct);
                let am = absolute_momentum(&col.prices);

                let (role, rm, mean_acc) = if idx == benchmark_pos {
                    (InstrumentRole::Benchmark, None, None)
                } else {
                    (
                        InstrumentRole::Constituent,
                        Some(difference(&am, &bench_am)),
                        Some(difference(&acc, &bench_acc)),
                    )
                };

                Instrument {
                    name: col.name,
                    role,
                    prices: col.prices,
                    derived: DerivedSeries {
                        acc,
                        log_acc,
                        am,
                        rm,
                        mean_acc,
                    },
                }
            })
            .collect();

        let column_index = instruments
            .iter()
            .enumerate()
            .map(|(i, inst)| (inst.name.clone(), i))
            .collect();
        let date_index = raw
            .dates
            .iter()
            .enumerate()
            .map(|(i, &d)| (d, i))
            .collect();

        Ok(PriceTable {
            dates: raw.dates,
            instruments,
            benchmark: benchmark_pos,
            column_index,
            date_index,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn benchmark(&self) -> &Instrument {
        &self.instruments[self.benchmark]
    }

    /// Non-benchmark instruments in column order.
    pub fn constituents(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter().filter(|i| !i.is_benchmark())
    }

    pub fn instrument(&self, column: &str) -> Result<&Instrument, MomtraderError> {
        self.column_index
            .get(column)
            .map(|&i| &self.instruments[i])
            .ok_or_else(|| MomtraderError::UnknownColumn {
                column: column.to_string(),
            })
    }

    pub fn date(&self, bar: usize) -> Result<NaiveDate, MomtraderError> {
        self.dates
            .get(bar)
            .copied()
            .ok_or(MomtraderError::IndexOutOfRange {
                bar,
                len: self.dates.len(),
            })
    }

    pub fn price(&self, bar: usize, column: &str) -> Result<f64, MomtraderError> {
        let inst = self.instrument(column)?;
        inst.prices
            .get(bar)
            .copied()
            .ok_or(MomtraderError::IndexOutOfRange {
                bar,
                len: self.dates.len(),
            })
    }

    pub fn bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// First bar dated on or after `date`.
    pub fn first_bar_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let pos = self.dates.partition_point(|&d| d < date);
        (pos < self.dates.len()).then_some(pos)
    }
}

fn validate_raw(raw: &RawPrices) -> Result<(), MomtraderError> {
    if raw.dates.is_empty() {
        return Err(MomtraderError::data("price series is empty"));
    }
    if raw.columns.is_empty() {
        return Err(MomtraderError::data("no instrument columns"));
    }

    for pair in raw.dates.windows(2) {
        if pair[1] <= pair[0] {
            return Err(MomtraderError::data(format!(
                "dates must be strictly ascending: {} follows {}",
                pair[1], pair[0]
            )));
        }
    }

    let mut seen = HashSet::new();
    for col in &raw.columns {
        if !seen.insert(col.name.as_str()) {
            return Err(MomtraderError::data(format!(
                "duplicate column: {}",
                col.name
            )));
        }
        if col.prices.len() != raw.dates.len() {
            return Err(MomtraderError::data(format!(
                "column {} has {} prices for {} dates",
                col.name,
                col.prices.len(),
                raw.dates.len()
            )));
        }
        if let Some(bar) = col.prices.iter().position(|p| !p.is_finite()) {
            return Err(MomtraderError::data(format!(
                "non-numeric price in {} at {}",
                col.name, raw.dates[bar]
            )));
        }
    }
    Ok(())
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Bar-over-bar percent change; NaN at bar 0.
fn pct_change(prices: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(prices.len());
    for i in 0..prices.len() {
        if i == 0 {
            out.push(f64::NAN);
        } else {
            out.push(prices[i] / prices[i - 1] - 1.0);
        }
    }
    out
}

fn cumulative_return(pct: &[f64]) -> Vec<f64> {
    let mut product = 1.0;
    pct.iter()
        .map(|&p| {
            let factor = 1.0 + p;
            if factor.is_finite() {
                product *= factor;
            }
            finite_or_zero(product - 1.0)
        })
        .collect()
}

fn log_cumulative_return(pct: &[f64]) -> Vec<f64> {
    let mut sum = 0.0;
    pct.iter()
        .map(|&p| {
            let term = (1.0 + p).ln();
            if term.is_finite() {
                sum += term;
            }
            finite_or_zero(sum)
        })
        .collect()
}

fn absolute_momentum(prices: &[f64]) -> Vec<f64> {
    pct_change(prices).into_iter().map(finite_or_zero).collect()
}

fn difference(lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    lhs.iter()
        .zip(rhs)
        .map(|(a, b)| finite_or_zero(a - b))
        .collect()
}
