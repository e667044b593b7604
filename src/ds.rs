use async_trait::async_trait;
use chrono::NaiveDate;

use crate::data::quote::Quote;

pub mod stock_price;

/// Somewhere quotes can be looked up by exact stock name and trading date.
///
/// Failures are absorbed by the source: callers only ever see zero or one
/// quote.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, stock_name: &str, date: &NaiveDate) -> Vec<Quote>;
}
