//! Trade cost model and order sizing.

use super::error::MomtraderError;

/// Fixed (`ftc`) and proportional (`ptc`) cost charged on every buy and sell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TradeCosts {
    pub fixed: f64,
    pub proportional: f64,
}

impl TradeCosts {
    pub fn new(fixed: f64, proportional: f64) -> Self {
        TradeCosts {
            fixed,
            proportional,
        }
    }

    /// Cash leaving the account for a buy: units * price * (1 + ptc) + ftc.
    pub fn buy_cost(&self, units: i64, price: f64) -> f64 {
        units as f64 * price * (1.0 + self.proportional) + self.fixed
    }

    /// Cash entering the account for a sell: units * price * (1 - ptc) - ftc.
    pub fn sell_proceeds(&self, units: i64, price: f64) -> f64 {
        units as f64 * price * (1.0 - self.proportional) - self.fixed
    }

    /// Largest whole unit count whose buy cost fits in `cash`.
    pub fn affordable_units(&self, cash: f64, price: f64) -> i64 {
        let budget = cash - self.fixed;
        if budget <= 0.0 || price <= 0.0 {
            return 0;
        }
        (budget / (price * (1.0 + self.proportional))).floor() as i64
    }
}

/// How an order's unit count is resolved from its `units`/`amount` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitPolicy {
    /// Explicit units win; otherwise `floor(amount / price)`.
    #[default]
    WhenUnspecified,
    /// Bar 0 always sizes from `amount`; later bars take `units` verbatim
    /// and ignore `amount`.
    EntryBarOnly,
}

impl UnitPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "when_unspecified" => Some(UnitPolicy::WhenUnspecified),
            "entry_bar_only" => Some(UnitPolicy::EntryBarOnly),
            _ => None,
        }
    }

    /// Resolve the unit count for an order at `bar`. `price` must already be
    /// known to be positive.
    pub fn resolve(
        &self,
        bar: usize,
        units: Option<i64>,
        amount: Option<f64>,
        price: f64,
    ) -> Result<i64, MomtraderError> {
        let from_amount = |amount: Option<f64>| {
            amount
                .map(|a| (a / price).floor() as i64)
                .ok_or_else(|| MomtraderError::Order {
                    reason: format!("bar {bar}: an amount is required to size the order"),
                })
        };

        match self {
            UnitPolicy::WhenUnspecified => match units {
                Some(u) => Ok(u),
                None => from_amount(amount),
            },
            UnitPolicy::EntryBarOnly => {
                if bar == 0 {
                    from_amount(amount)
                } else {
                    units.ok_or_else(|| MomtraderError::Order {
                        reason: format!("bar {bar}: explicit units are required after bar 0"),
                    })
                }
            }
        }
    }
}
