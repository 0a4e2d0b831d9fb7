//! Portfolio state: cash, held units and the trade counter.
//!
//! No margin or inventory checks are applied. Cash may go negative and
//! holdings may go short; callers own that risk.

use super::execution::TradeCosts;

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub initial_amount: f64,
    pub amount: f64,
    pub units: i64,
    pub trades: usize,
    /// Reserved; not driven by any operation yet.
    pub position: i8,
}

impl PortfolioState {
    pub fn new(initial_amount: f64) -> Self {
        PortfolioState {
            initial_amount,
            amount: initial_amount,
            units: 0,
            trades: 0,
            position: 0,
        }
    }

    /// Returns the cash spent.
    pub fn buy(&mut self, units: i64, price: f64, costs: &TradeCosts) -> f64 {
        let cost = costs.buy_cost(units, price);
        self.amount -= cost;
        self.units += units;
        self.trades += 1;
        cost
    }

    /// Returns the cash received.
    pub fn sell(&mut self, units: i64, price: f64, costs: &TradeCosts) -> f64 {
        let proceeds = costs.sell_proceeds(units, price);
        self.amount += proceeds;
        self.units -= units;
        self.trades += 1;
        proceeds
    }

    /// Liquidate every held unit at `price` without costs.
    pub fn liquidate(&mut self, price: f64) -> f64 {
        let proceeds = self.units as f64 * price;
        self.amount += proceeds;
        self.units = 0;
        self.trades += 1;
        proceeds
    }

    pub fn net_wealth(&self, price: f64) -> f64 {
        self.units as f64 * price + self.amount
    }

    pub fn performance_pct(&self) -> f64 {
        (self.amount - self.initial_amount) / self.initial_amount * 100.0
    }
}
