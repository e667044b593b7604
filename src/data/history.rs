use std::sync::Arc;

use log::debug;
use tokio::sync::Mutex;

pub const HISTORY_CAPACITY: usize = 4;

pub type SharedHistory = Arc<Mutex<RollingHistory>>;

/// Ordered (date, price) pairs, oldest first.
///
/// Slot 0 is pinned: overflow evicts slot 1, so the first recorded quote stays
/// as a reference while the remaining slots roll.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RollingHistory {
    dates: Vec<String>,
    prices: Vec<String>,
}

impl RollingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedHistory {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Appends without looking at the capacity.
    pub fn append_unconditional(&mut self, date: &str, price: &str) {
        self.dates.push(date.to_string());
        self.prices.push(price.to_string());

        debug!("History append {date} : {price}, len={}", self.len());
    }

    pub fn append_with_eviction(&mut self, date: &str, price: &str) {
        if self.dates.len() == HISTORY_CAPACITY {
            let evicted_date = self.dates.remove(1);
            let evicted_price = self.prices.remove(1);

            debug!("History evict {evicted_date} : {evicted_price}");
        }

        self.append_unconditional(date, price);
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Display lines for the first `max_lines` slots.
    pub fn lines(&self, max_lines: usize) -> Vec<String> {
        self.dates
            .iter()
            .zip(self.prices.iter())
            .take(max_lines.min(HISTORY_CAPACITY))
            .map(|(date, price)| format!("{date} : {price}"))
            .collect()
    }

    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.dates
            .iter()
            .cloned()
            .zip(self.prices.iter().cloned())
            .collect()
    }
}
