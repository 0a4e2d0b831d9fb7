//! Momentum signal frames and the monthly relative-momentum ranking.
//!
//! [`build_signals`] slices the price table from the base date onward and
//! buckets every bar by year-month (`STD_YM`). [`rank_relative_momentum`]
//! then scores each instrument at the last bar of every bucket and picks the
//! instruments that get armed (`Ready`) in the trade book.

use chrono::{Datelike, NaiveDate};
use std::fmt;

use super::error::MomtraderError;
use super::price_table::PriceTable;

/// Year-month bucket of a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub code: String,
    pub close_price: f64,
    pub std_ym: YearMonth,
    /// Filled by downstream consumers; always 0 here.
    pub daily_return: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalFrame {
    pub code: String,
    pub rows: Vec<SignalRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumSignals {
    pub dates: Vec<NaiveDate>,
    pub frames: Vec<SignalFrame>,
    /// Distinct buckets in first-seen order.
    pub ym_keys: Vec<YearMonth>,
    /// Table bar that row 0 of every frame corresponds to.
    pub start_bar: usize,
}

impl MomentumSignals {
    pub fn codes(&self) -> Vec<String> {
        self.frames.iter().map(|f| f.code.clone()).collect()
    }
}

/// Build one signal frame per ticker from `base_date` onward.
pub fn build_signals(
    table: &PriceTable,
    universe: &[String],
    base_date: NaiveDate,
) -> Result<MomentumSignals, MomtraderError> {
    let start_bar = table.first_bar_on_or_after(base_date).ok_or_else(|| {
        MomtraderError::data(format!("no bars on or after base date {base_date}"))
    })?;
    let dates = &table.dates()[start_bar..];

    let mut frames = Vec::with_capacity(universe.len());
    for code in universe {
        let inst = table.instrument(code)?;
        let rows = dates
            .iter()
            .zip(&inst.prices[start_bar..])
            .map(|(&date, &close_price)| SignalRow {
                date,
                code: code.clone(),
                close_price,
                std_ym: YearMonth::of(date),
                daily_return: 0.0,
            })
            .collect();
        frames.push(SignalFrame {
            code: code.clone(),
            rows,
        });
    }

    let mut ym_keys: Vec<YearMonth> = Vec::new();
    for &date in dates {
        let ym = YearMonth::of(date);
        if !ym_keys.contains(&ym) {
            ym_keys.push(ym);
        }
    }

    Ok(MomentumSignals {
        dates: dates.to_vec(),
        frames,
        ym_keys,
        start_bar,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConfig {
    pub lookback_months: usize,
    pub top_n: usize,
    /// Drop instruments whose own momentum is not positive.
    pub absolute_filter: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        RankingConfig {
            lookback_months: 1,
            top_n: 3,
            absolute_filter: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumScore {
    pub code: String,
    pub absolute: f64,
    pub relative: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRanking {
    pub std_ym: YearMonth,
    /// Signal-frame row (not table bar) of the bucket's last bar.
    pub row: usize,
    /// All scores, best first.
    pub scores: Vec<MomentumScore>,
    pub selected: Vec<String>,
}

/// Rank instruments at the end of every bucket that has `lookback_months`
/// earlier buckets to compare against.
pub fn rank_relative_momentum(
    table: &PriceTable,
    signals: &MomentumSignals,
    config: &RankingConfig,
) -> Vec<MonthlyRanking> {
    let month_ends = month_end_rows(signals);
    let bench = &table.benchmark().prices[signals.start_bar..];
    let mut rankings = Vec::new();

    for m in config.lookback_months..month_ends.len() {
        let (std_ym, end) = month_ends[m];
        let (_, anchor) = month_ends[m - config.lookback_months];
        let bench_momentum = period_return(bench[anchor], bench[end]);

        let mut scores: Vec<MomentumScore> = signals
            .frames
            .iter()
            .map(|frame| {
                let absolute =
                    period_return(frame.rows[anchor].close_price, frame.rows[end].close_price);
                MomentumScore {
                    code: frame.code.clone(),
                    absolute,
                    relative: absolute - bench_momentum,
                }
            })
            .collect();
        scores.sort_by(|a, b| {
            b.relative
                .total_cmp(&a.relative)
                .then_with(|| a.code.cmp(&b.code))
        });

        let selected = scores
            .iter()
            .filter(|s| !config.absolute_filter || s.absolute > 0.0)
            .take(config.top_n)
            .map(|s| s.code.clone())
            .collect();

        rankings.push(MonthlyRanking {
            std_ym,
            row: end,
            scores,
            selected,
        });
    }
    rankings
}

/// Last row of each bucket, in bucket order.
fn month_end_rows(signals: &MomentumSignals) -> Vec<(YearMonth, usize)> {
    let mut ends: Vec<(YearMonth, usize)> = Vec::new();
    for (row, &date) in signals.dates.iter().enumerate() {
        let ym = YearMonth::of(date);
        match ends.last_mut() {
            Some((last, end)) if *last == ym => *end = row,
            _ => ends.push((ym, row)),
        }
    }
    ends
}

fn period_return(from: f64, to: f64) -> f64 {
    let r = to / from - 1.0;
    if r.is_finite() { r } else { 0.0 }
}
