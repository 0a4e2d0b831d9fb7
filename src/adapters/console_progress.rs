//! Progress adapter that logs engine events through `tracing`.

use crate::ports::progress_port::{ProgressEvent, ProgressPort};

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    pub fn new() -> Self {
        ConsoleProgress
    }

    /// The three report lines for one event: the order, the cash balance,
    /// and the net wealth at the order price.
    pub fn lines(event: &ProgressEvent) -> [String; 3] {
        let date = event.date.format("%Y-%m-%d");
        [
            format!(
                "{date} | {} {} units of {} at {:.2}",
                event.action, event.units, event.column, event.price
            ),
            format!("{date} | current balance {:.2}", event.balance),
            format!("{date} | current net wealth {:.2}", event.net_wealth),
        ]
    }
}

impl ProgressPort for ConsoleProgress {
    fn emit(&self, event: &ProgressEvent) {
        for line in Self::lines(event) {
            tracing::info!("{line}");
        }
    }
}
