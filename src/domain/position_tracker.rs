//! Phase state machine over a trade book.
//!
//! Three passes, each strictly in bar order:
//!
//! 1. [`track_positions`] turns `Ready` signals into `Buy` runs. Entry happens
//!    on the bar after a `Ready`; the position is held while the bar's
//!    year-month equals the entry bar's, then reverts to `Empty`.
//! 2. [`compute_returns`] records `exit / entry - 1` on every bar where a
//!    `Buy` run ends.
//! 3. [`aggregate_returns`] compounds the mean exit return of each bar into
//!    the book's running `acc_rtn`.

use chrono::NaiveDate;

use super::momentum::YearMonth;
use super::trade_book::{Phase, TradeBook};

/// Per-instrument tracking state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionTracker {
    std_ym: Option<YearMonth>,
    buy_phase: bool,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the phase of one bar given the (already resolved) previous bar.
    pub fn step(&mut self, current: Phase, previous: Option<Phase>, ym: YearMonth) -> Phase {
        let mut phase = current;

        if phase == Phase::Empty && previous == Some(Phase::Ready) {
            self.std_ym = Some(ym);
            self.buy_phase = true;
        }

        if phase == Phase::Empty && self.buy_phase && self.std_ym == Some(ym) {
            phase = Phase::Buy;
        }

        if phase == Phase::Empty {
            self.std_ym = None;
            self.buy_phase = false;
        }

        phase
    }
}

/// Rewrite every instrument's phase column in place.
pub fn track_positions(book: &mut TradeBook) {
    for i in 0..book.codes().len() {
        let mut tracker = PositionTracker::new();
        for bar in 0..book.len() {
            let previous = bar.checked_sub(1).map(|b| book.phase(b, i));
            let phase = tracker.step(book.phase(bar, i), previous, book.std_ym(bar));
            book.set_phase(bar, i, phase);
        }
    }
}

/// One completed holding period.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedTrade {
    pub code: String,
    pub entry_date: Option<NaiveDate>,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub return_pct: f64,
}

/// Record realized returns on exit bars. Bars before the start of the book
/// count as `Empty`.
pub fn compute_returns(book: &mut TradeBook) -> Vec<RealizedTrade> {
    let n = book.codes().len();
    let mut entry_price = vec![0.0_f64; n];
    let mut entry_date: Vec<Option<NaiveDate>> = vec![None; n];
    let mut trades = Vec::new();

    let phase_at = |book: &TradeBook, bar: usize, back: usize, i: usize| -> Phase {
        bar.checked_sub(back)
            .map(|b| book.phase(b, i))
            .unwrap_or(Phase::Empty)
    };

    for bar in 0..book.len() {
        for i in 0..n {
            let current = book.phase(bar, i);
            let prev1 = phase_at(book, bar, 1, i);
            let prev2 = phase_at(book, bar, 2, i);

            if current == Phase::Buy && prev1 == Phase::Ready && prev2 == Phase::Empty {
                entry_price[i] = book.price(bar, i);
                entry_date[i] = Some(book.dates()[bar]);
            } else if current == Phase::Empty && prev1 == Phase::Buy {
                let exit_price = book.price(bar, i);
                let rtn = exit_price / entry_price[i] - 1.0;
                let rtn = if rtn.is_finite() { rtn } else { 0.0 };
                book.set_realized_return(bar, i, rtn);
                trades.push(RealizedTrade {
                    code: book.codes()[i].clone(),
                    entry_date: entry_date[i],
                    exit_date: book.dates()[bar],
                    entry_price: entry_price[i],
                    exit_price,
                    return_pct: rtn,
                });
            }

            if current == Phase::Empty {
                entry_price[i] = 0.0;
                entry_date[i] = None;
            }
        }
    }
    trades
}

/// Compound each bar's mean exit return into `acc_rtn`; returns the final value.
pub fn aggregate_returns(book: &mut TradeBook) -> f64 {
    let mut acc_rtn = 1.0;
    for bar in 0..book.len() {
        let mut sum = 0.0;
        let mut count = 0usize;
        for i in 0..book.codes().len() {
            let exited = bar > 0
                && book.phase(bar, i) == Phase::Empty
                && book.phase(bar - 1, i) == Phase::Buy;
            if exited {
                count += 1;
                sum += book.realized_return(bar, i).unwrap_or(0.0);
            }
        }
        if count > 0 {
            acc_rtn *= sum / count as f64 + 1.0;
        }
        book.set_acc_rtn(bar, acc_rtn);
    }
    acc_rtn
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerOutcome {
    pub trades: Vec<RealizedTrade>,
    pub acc_rtn: f64,
}

/// Run all three passes.
pub fn run(book: &mut TradeBook) -> TrackerOutcome {
    track_positions(book);
    let trades = compute_returns(book);
    let acc_rtn = aggregate_returns(book);
    TrackerOutcome { trades, acc_rtn }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn book_with_phases(dates: Vec<NaiveDate>, prices: Vec<f64>, phases: &[Phase]) -> TradeBook {
        let mut book = TradeBook::new(dates, vec!["X".into()], vec![prices]).unwrap();
        for (bar, &p) in phases.iter().enumerate() {
            book.set_phase(bar, 0, p);
        }
        book
    }

    #[test]
    fn step_enters_after_ready() {
        let jan = YearMonth { year: 2024, month: 1 };
        let feb = YearMonth { year: 2024, month: 2 };
        let mut t = PositionTracker::new();

        assert_eq!(t.step(Phase::Empty, None, jan), Phase::Empty);
        assert_eq!(t.step(Phase::Ready, Some(Phase::Empty), jan), Phase::Ready);
        assert_eq!(t.step(Phase::Empty, Some(Phase::Ready), feb), Phase::Buy);
        assert_eq!(t.step(Phase::Empty, Some(Phase::Buy), feb), Phase::Buy);
        let mar = YearMonth { year: 2024, month: 3 };
        assert_eq!(t.step(Phase::Empty, Some(Phase::Buy), mar), Phase::Empty);
        assert_eq!(t, PositionTracker::new());
    }

    #[test]
    fn no_entry_on_first_bar() {
        let jan = YearMonth { year: 2024, month: 1 };
        let mut t = PositionTracker::new();
        assert_eq!(t.step(Phase::Empty, None, jan), Phase::Empty);
    }

    #[test]
    fn holds_for_the_entry_month_only() {
        let dates = vec![
            d(2024, 1, 30),
            d(2024, 1, 31),
            d(2024, 2, 1),
            d(2024, 2, 2),
            d(2024, 3, 1),
        ];
        let mut book = book_with_phases(
            dates,
            vec![90.0, 95.0, 100.0, 110.0, 120.0],
            &[Phase::Empty, Phase::Ready],
        );
        track_positions(&mut book);
        assert_eq!(
            book.phases_of(0),
            vec![Phase::Empty, Phase::Ready, Phase::Buy, Phase::Buy, Phase::Empty]
        );
    }

    #[test]
    fn ready_inside_a_hold_extends_it() {
        let dates = vec![
            d(2024, 1, 31),
            d(2024, 2, 1),
            d(2024, 2, 29),
            d(2024, 3, 1),
            d(2024, 3, 4),
            d(2024, 4, 1),
        ];
        let mut book = book_with_phases(
            dates,
            vec![10.0, 10.0, 11.0, 12.0, 13.0, 14.0],
            &[Phase::Ready, Phase::Empty, Phase::Ready],
        );
        let outcome = run(&mut book);
        assert_eq!(
            book.phases_of(0),
            vec![
                Phase::Ready,
                Phase::Buy,
                Phase::Ready,
                Phase::Buy,
                Phase::Buy,
                Phase::Empty
            ]
        );
        // one exit, priced against the first entry
        assert_eq!(outcome.trades.len(), 1);
        assert_abs_diff_eq!(outcome.trades[0].entry_price, 10.0);
        assert_abs_diff_eq!(outcome.acc_rtn, 1.4, epsilon = 1e-12);
    }

    #[test]
    fn returns_on_exit_bar() {
        let dates = vec![
            d(2024, 1, 30),
            d(2024, 1, 31),
            d(2024, 2, 1),
            d(2024, 2, 2),
            d(2024, 3, 1),
        ];
        let mut book = book_with_phases(
            dates,
            vec![90.0, 95.0, 100.0, 110.0, 120.0],
            &[Phase::Empty, Phase::Ready, Phase::Buy, Phase::Buy, Phase::Empty],
        );
        let trades = compute_returns(&mut book);
        let acc = aggregate_returns(&mut book);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_date, Some(d(2024, 2, 1)));
        assert_eq!(trades[0].exit_date, d(2024, 3, 1));
        assert_abs_diff_eq!(book.realized_return(4, 0).unwrap(), 0.20, epsilon = 1e-12);
        for bar in 0..4 {
            assert_eq!(book.realized_return(bar, 0), None);
        }
        assert_abs_diff_eq!(acc, 1.20, epsilon = 1e-12);
        assert_eq!(&book.acc_rtn()[..4], &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn ready_on_first_bar_counts_as_fresh_entry() {
        let dates = vec![d(2024, 1, 31), d(2024, 2, 1), d(2024, 3, 1)];
        let mut book = book_with_phases(
            dates,
            vec![50.0, 100.0, 90.0],
            &[Phase::Ready, Phase::Buy, Phase::Empty],
        );
        let trades = compute_returns(&mut book);
        assert_abs_diff_eq!(trades[0].return_pct, -0.10, epsilon = 1e-12);
    }

    #[test]
    fn exit_without_entry_price_resolves_to_zero() {
        let dates = vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)];
        let mut book = book_with_phases(
            dates,
            vec![1.0, 2.0, 3.0],
            &[Phase::Buy, Phase::Buy, Phase::Empty],
        );
        let trades = compute_returns(&mut book);
        assert_eq!(trades.len(), 1);
        assert_eq!(book.realized_return(2, 0), Some(0.0));
        assert_eq!(aggregate_returns(&mut book), 1.0);
    }

    #[test]
    fn aggregate_averages_simultaneous_exits() {
        let dates = vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3), d(2024, 2, 1)];
        let mut book = TradeBook::new(
            dates,
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 1.0, 1.0, 1.3], vec![1.0, 1.0, 1.0, 0.9]],
        )
        .unwrap();
        for i in 0..2 {
            book.set_phase(1, i, Phase::Ready);
            book.set_phase(2, i, Phase::Buy);
        }
        let trades = compute_returns(&mut book);
        assert_eq!(trades.len(), 2);
        // mean of +30% and -10%
        assert_abs_diff_eq!(aggregate_returns(&mut book), 1.10, epsilon = 1e-12);
    }
}
