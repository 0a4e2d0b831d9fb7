//! Trade book: per-bar, per-instrument phases and realized returns.

use chrono::NaiveDate;

use super::error::MomtraderError;
use super::momentum::{MomentumSignals, MonthlyRanking, YearMonth};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Empty,
    Ready,
    Buy,
}

impl Phase {
    /// Column text used in exported books: "", "ready <code>", "buy <code>".
    pub fn label(&self, code: &str) -> String {
        match self {
            Phase::Empty => String::new(),
            Phase::Ready => format!("ready {code}"),
            Phase::Buy => format!("buy {code}"),
        }
    }
}

/// Dense row-major (bar, instrument) grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    bars: usize,
    instruments: usize,
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(bars: usize, instruments: usize) -> Self {
        Grid {
            bars,
            instruments,
            cells: vec![T::default(); bars * instruments],
        }
    }

    pub fn get(&self, bar: usize, instrument: usize) -> &T {
        &self.cells[bar * self.instruments + instrument]
    }

    pub fn set(&mut self, bar: usize, instrument: usize, value: T) {
        self.cells[bar * self.instruments + instrument] = value;
    }

    pub fn column(&self, instrument: usize) -> impl Iterator<Item = &T> + '_ {
        (0..self.bars).map(move |bar| self.get(bar, instrument))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeBook {
    dates: Vec<NaiveDate>,
    std_ym: Vec<YearMonth>,
    codes: Vec<String>,
    prices: Grid<f64>,
    phases: Grid<Phase>,
    returns: Grid<Option<f64>>,
    acc_rtn: Vec<f64>,
}

impl TradeBook {
    /// `prices[i]` is the series for `codes[i]`, aligned to `dates`.
    pub fn new(
        dates: Vec<NaiveDate>,
        codes: Vec<String>,
        prices: Vec<Vec<f64>>,
    ) -> Result<Self, MomtraderError> {
        if codes.len() != prices.len() {
            return Err(MomtraderError::data(format!(
                "{} codes but {} price series",
                codes.len(),
                prices.len()
            )));
        }
        let bars = dates.len();
        let mut grid = Grid::new(bars, codes.len());
        for (i, series) in prices.iter().enumerate() {
            if series.len() != bars {
                return Err(MomtraderError::data(format!(
                    "{} has {} prices for {} dates",
                    codes[i],
                    series.len(),
                    bars
                )));
            }
            for (bar, &p) in series.iter().enumerate() {
                grid.set(bar, i, p);
            }
        }

        Ok(TradeBook {
            std_ym: dates.iter().map(|&d| YearMonth::of(d)).collect(),
            phases: Grid::new(bars, codes.len()),
            returns: Grid::new(bars, codes.len()),
            acc_rtn: vec![1.0; bars],
            dates,
            codes,
            prices: grid,
        })
    }

    pub fn from_signals(signals: &MomentumSignals) -> Self {
        let codes = signals.codes();
        let bars = signals.dates.len();
        let mut prices = Grid::new(bars, codes.len());
        for (i, frame) in signals.frames.iter().enumerate() {
            for (bar, row) in frame.rows.iter().enumerate() {
                prices.set(bar, i, row.close_price);
            }
        }
        TradeBook {
            dates: signals.dates.clone(),
            std_ym: signals.dates.iter().map(|&d| YearMonth::of(d)).collect(),
            phases: Grid::new(bars, codes.len()),
            returns: Grid::new(bars, codes.len()),
            acc_rtn: vec![1.0; bars],
            codes,
            prices,
        }
    }

    /// Arm the selected instruments on each ranking's bar.
    pub fn seed_ready(&mut self, rankings: &[MonthlyRanking]) {
        for ranking in rankings {
            for code in &ranking.selected {
                if let Some(i) = self.code_index(code) {
                    if ranking.row < self.len() {
                        self.phases.set(ranking.row, i, Phase::Ready);
                    }
                }
            }
        }
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

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn code_index(&self, code: &str) -> Option<usize> {
        self.codes.iter().position(|c| c == code)
    }

    pub fn std_ym(&self, bar: usize) -> YearMonth {
        self.std_ym[bar]
    }

    pub fn price(&self, bar: usize, instrument: usize) -> f64 {
        *self.prices.get(bar, instrument)
    }

    pub fn phase(&self, bar: usize, instrument: usize) -> Phase {
        *self.phases.get(bar, instrument)
    }

    pub fn set_phase(&mut self, bar: usize, instrument: usize, phase: Phase) {
        self.phases.set(bar, instrument, phase);
    }

    pub fn phases_of(&self, instrument: usize) -> Vec<Phase> {
        self.phases.column(instrument).copied().collect()
    }

    pub fn realized_return(&self, bar: usize, instrument: usize) -> Option<f64> {
        *self.returns.get(bar, instrument)
    }

    pub fn set_realized_return(&mut self, bar: usize, instrument: usize, value: f64) {
        self.returns.set(bar, instrument, Some(value));
    }

    pub fn acc_rtn(&self) -> &[f64] {
        &self.acc_rtn
    }

    pub fn set_acc_rtn(&mut self, bar: usize, value: f64) {
        self.acc_rtn[bar] = value;
    }

    pub fn final_acc_rtn(&self) -> f64 {
        self.acc_rtn.last().copied().unwrap_or(1.0)
    }
}
