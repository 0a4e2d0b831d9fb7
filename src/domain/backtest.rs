//! Event-driven backtest engine over a [`PriceTable`].
//!
//! Orders are addressed by (bar, instrument column). The engine owns one
//! [`PortfolioState`] per run and mutates it strictly in call order.

use chrono::NaiveDate;

use super::error::MomtraderError;
use super::execution::{TradeCosts, UnitPolicy};
use super::portfolio::PortfolioState;
use super::price_table::PriceTable;
use super::trade_book::{Phase, TradeBook};
use crate::ports::progress_port::{ProgressAction, ProgressEvent, ProgressPort};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_amount: f64,
    pub costs: TradeCosts,
    pub unit_policy: UnitPolicy,
    pub verbose: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_amount: 10_000_000.0,
            costs: TradeCosts::default(),
            unit_policy: UnitPolicy::default(),
            verbose: false,
        }
    }
}

/// Outcome of one executed order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFill {
    pub date: NaiveDate,
    pub units: i64,
    pub price: f64,
    /// Cash moved by the order: spent for buys, received for sells.
    pub cash_flow: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub final_balance: f64,
    pub performance_pct: f64,
    pub trades: usize,
}

pub struct BacktestEngine<'a> {
    table: &'a PriceTable,
    config: BacktestConfig,
    state: PortfolioState,
    progress: Option<&'a dyn ProgressPort>,
}

impl<'a> BacktestEngine<'a> {
    pub fn new(table: &'a PriceTable, config: BacktestConfig) -> Self {
        let state = PortfolioState::new(config.initial_amount);
        BacktestEngine {
            table,
            config,
            state,
            progress: None,
        }
    }

    /// Progress events are only emitted when the config is verbose.
    pub fn with_progress(mut self, progress: &'a dyn ProgressPort) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn table(&self) -> &PriceTable {
        self.table
    }

    pub fn balance(&self) -> f64 {
        self.state.amount
    }

    pub fn get_date_price(&self, bar: usize, column: &str) -> Result<(NaiveDate, f64), MomtraderError> {
        let date = self.table.date(bar)?;
        let price = self.table.price(bar, column)?;
        Ok((date, price))
    }

    pub fn net_wealth(&self, bar: usize, column: &str) -> Result<f64, MomtraderError> {
        let (_, price) = self.get_date_price(bar, column)?;
        Ok(self.state.net_wealth(price))
    }

    pub fn place_buy(
        &mut self,
        bar: usize,
        column: &str,
        units: Option<i64>,
        amount: Option<f64>,
    ) -> Result<OrderFill, MomtraderError> {
        let (date, price) = self.tradable_price(bar, column)?;
        let units = self.config.unit_policy.resolve(bar, units, amount, price)?;
        let cash_flow = self.state.buy(units, price, &self.config.costs);
        self.report(date, column, ProgressAction::Buy, units, price);
        Ok(OrderFill {
            date,
            units,
            price,
            cash_flow,
        })
    }

    pub fn place_sell(
        &mut self,
        bar: usize,
        column: &str,
        units: Option<i64>,
        amount: Option<f64>,
    ) -> Result<OrderFill, MomtraderError> {
        let (date, price) = self.tradable_price(bar, column)?;
        let units = self.config.unit_policy.resolve(bar, units, amount, price)?;
        let cash_flow = self.state.sell(units, price, &self.config.costs);
        self.report(date, column, ProgressAction::Sell, units, price);
        Ok(OrderFill {
            date,
            units,
            price,
            cash_flow,
        })
    }

    /// Liquidate all holdings at `bar` and summarize the run.
    pub fn close_out(&mut self, bar: usize, column: &str) -> Result<RunSummary, MomtraderError> {
        let (date, price) = self.tradable_price(bar, column)?;
        let units = self.state.units;
        self.state.liquidate(price);
        self.report(date, column, ProgressAction::CloseOut, units, price);
        Ok(RunSummary {
            final_balance: self.state.amount,
            performance_pct: self.state.performance_pct(),
            trades: self.state.trades,
        })
    }

    fn tradable_price(&self, bar: usize, column: &str) -> Result<(NaiveDate, f64), MomtraderError> {
        let (date, price) = self.get_date_price(bar, column)?;
        if price <= 0.0 {
            return Err(MomtraderError::InvalidPrice {
                bar,
                column: column.to_string(),
                date,
                price,
            });
        }
        Ok((date, price))
    }

    fn report(&self, date: NaiveDate, column: &str, action: ProgressAction, units: i64, price: f64) {
        if !self.config.verbose {
            return;
        }
        if let Some(progress) = self.progress {
            progress.emit(&ProgressEvent {
                date,
                column: column.to_string(),
                action,
                units,
                price,
                balance: self.state.amount,
                net_wealth: self.state.net_wealth(price),
            });
        }
    }
}

/// Drive one instrument's phases through the engine.
///
/// Buys as many units as cash allows on a `Buy` bar while flat, sells every
/// held unit on an `Empty` bar, and closes out on the book's last bar.
pub fn replay_book(
    engine: &mut BacktestEngine<'_>,
    book: &TradeBook,
    code: &str,
) -> Result<RunSummary, MomtraderError> {
    let i = book
        .code_index(code)
        .ok_or_else(|| MomtraderError::UnknownColumn {
            column: code.to_string(),
        })?;
    if book.is_empty() {
        return Err(MomtraderError::data("trade book is empty"));
    }

    let mut last_bar = 0;
    for (row, &date) in book.dates().iter().enumerate() {
        let bar = engine.table().bar_index(date).ok_or_else(|| {
            MomtraderError::data(format!("trade book date {date} is not in the price table"))
        })?;
        last_bar = bar;

        match book.phase(row, i) {
            Phase::Buy if engine.state().units == 0 => {
                let (_, price) = engine.get_date_price(bar, code)?;
                let cash = engine.balance();
                let units = engine.config().costs.affordable_units(cash, price);
                if units > 0 {
                    engine.place_buy(bar, code, Some(units), Some(cash))?;
                } else {
                    tracing::warn!(%date, code, cash, price, "not enough cash to enter");
                }
            }
            Phase::Empty if engine.state().units > 0 => {
                let units = engine.state().units;
                engine.place_sell(bar, code, Some(units), None)?;
            }
            _ => {}
        }
    }

    engine.close_out(last_bar, code)
}
