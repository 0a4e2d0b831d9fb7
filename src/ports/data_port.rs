//! Data access port trait.

use crate::domain::error::MomtraderError;
use crate::domain::price_table::RawPrices;
use chrono::NaiveDate;

pub trait DataPort {
    /// Fetch time-aligned prices for `universe` (which should include the
    /// benchmark column), keeping only dates on or after `start` when given.
    fn fetch_prices(
        &self,
        universe: &[String],
        start: Option<NaiveDate>,
    ) -> Result<RawPrices, MomtraderError>;

    /// Every instrument column the source can supply.
    fn list_instruments(&self) -> Result<Vec<String>, MomtraderError>;
}
