use chrono::NaiveDate;

/// One day's price record for a named stock.
///
/// Numeric fields are kept as the text the API returned so the page shows
/// them exactly as formatted at the source.
#[derive(Clone, Debug, PartialEq)]
pub struct Quote {
    pub stock_name: String,
    pub close_price: String,
    pub change_amount: String,
    pub change_rate: String,
    pub high_price: String,
    pub low_price: String,
    /// The date that was requested, not a date read back from the response.
    pub date: NaiveDate,
}
